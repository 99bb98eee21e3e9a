pub mod conversation;
pub mod kv;
pub mod selection;

pub use conversation::{ConversationEntry, ConversationStore, Role, WireMessage};
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use selection::SelectionStore;
