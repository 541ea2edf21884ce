pub mod analysis;
pub mod job;
pub mod pagination;
pub mod resume;
pub mod user;
