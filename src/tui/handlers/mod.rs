pub mod async_ops;
pub mod command;
pub mod key;
pub mod message;

pub use async_ops::*;
pub use command::dispatch;
pub use key::*;
pub use message::*;
