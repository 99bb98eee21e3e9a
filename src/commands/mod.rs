pub mod catalog;
pub mod chat;
pub mod config;
pub mod history;
pub mod routine;
pub mod selection;
pub mod tui;
