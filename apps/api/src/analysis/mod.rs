pub mod engine;
pub mod handlers;
pub mod normalize;
pub mod prompts;
pub mod response;
