pub mod handlers;
pub mod title;
