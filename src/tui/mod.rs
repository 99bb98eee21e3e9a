pub mod handlers;
pub mod types;
pub mod view;
