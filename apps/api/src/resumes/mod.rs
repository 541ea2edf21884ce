pub mod handlers;
pub mod schema;
pub mod storage;
