use serde::{Deserialize, Serialize};

use crate::errors::CliError;
use crate::store::kv::{CONVERSATION_KEY, KeyValueStore, load_json, save_json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub content: String,
    /// Sent to the model but never shown in the transcript.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
}

/// `{role, content}` as the proxy expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl WireMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// Append-only chat log mirrored into storage.
#[derive(Debug)]
pub struct ConversationStore {
    entries: Vec<ConversationEntry>,
    storage: Box<dyn KeyValueStore>,
}

impl ConversationStore {
    /// Load the persisted log without writing it back. Unreadable logs start empty.
    pub fn replay(storage: Box<dyn KeyValueStore>) -> Self {
        let entries = load_json(storage.as_ref(), CONVERSATION_KEY).unwrap_or_default();
        Self { entries, storage }
    }

    pub fn append(&mut self, role: Role, text: impl Into<String>) -> Result<&ConversationEntry, CliError> {
        self.push(role, text.into(), false)
    }

    pub fn append_hidden(
        &mut self,
        role: Role,
        text: impl Into<String>,
    ) -> Result<&ConversationEntry, CliError> {
        self.push(role, text.into(), true)
    }

    fn push(&mut self, role: Role, content: String, hidden: bool) -> Result<&ConversationEntry, CliError> {
        let mut next = self.entries.clone();
        next.push(ConversationEntry {
            role,
            content,
            hidden,
        });
        self.commit(next)?;
        let idx = self.entries.len() - 1;
        Ok(&self.entries[idx])
    }

    pub fn clear(&mut self) -> Result<(), CliError> {
        self.commit(Vec::new())
    }

    /// Everything persisted, hidden turns included.
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    /// The rendered transcript, in storage order.
    pub fn visible(&self) -> impl Iterator<Item = &ConversationEntry> {
        self.entries.iter().filter(|e| !e.hidden)
    }

    pub fn wire_messages(&self) -> Vec<WireMessage> {
        self.entries
            .iter()
            .map(|e| WireMessage::new(e.role.as_str(), e.content.clone()))
            .collect()
    }

    fn commit(&mut self, next: Vec<ConversationEntry>) -> Result<(), CliError> {
        save_json(self.storage.as_ref(), CONVERSATION_KEY, &next)?;
        self.entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::kv::{FlakyStore, MemoryStore};
    use pretty_assertions::assert_eq;

    fn persisted_len(storage: &MemoryStore) -> usize {
        load_json::<Vec<ConversationEntry>>(storage, CONVERSATION_KEY)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    #[test]
    fn hidden_append_grows_log_but_not_transcript() {
        let storage = MemoryStore::new();
        let mut store = ConversationStore::replay(Box::new(storage.clone()));
        store.append(Role::User, "hi").unwrap();
        let rendered = store.visible().count();
        let persisted = persisted_len(&storage);

        store.append_hidden(Role::User, "long instruction").unwrap();

        assert_eq!(persisted_len(&storage), persisted + 1);
        assert_eq!(store.visible().count(), rendered);
    }

    #[test]
    fn replay_reproduces_written_order() {
        let storage = MemoryStore::new();
        let mut store = ConversationStore::replay(Box::new(storage.clone()));
        store.append(Role::User, "one").unwrap();
        store.append_hidden(Role::User, "two").unwrap();
        store.append(Role::Assistant, "three").unwrap();

        let reloaded = ConversationStore::replay(Box::new(storage));
        assert_eq!(reloaded.entries(), store.entries());
        let visible: Vec<_> = reloaded.visible().map(|e| e.content.as_str()).collect();
        assert_eq!(visible, vec!["one", "three"]);
    }

    #[test]
    fn entries_without_hidden_flag_load_as_visible() {
        let storage = MemoryStore::new();
        storage
            .set(
                CONVERSATION_KEY,
                r#"[{"role":"user","content":"a"},{"role":"assistant","content":"b"}]"#,
            )
            .unwrap();
        let store = ConversationStore::replay(Box::new(storage));
        assert_eq!(store.visible().count(), 2);
    }

    #[test]
    fn unknown_role_or_garbage_yields_empty_log() {
        let storage = MemoryStore::new();
        storage
            .set(CONVERSATION_KEY, r#"[{"role":"system","content":"x"}]"#)
            .unwrap();
        assert!(ConversationStore::replay(Box::new(storage.clone())).entries().is_empty());
        storage.set(CONVERSATION_KEY, "oops").unwrap();
        assert!(ConversationStore::replay(Box::new(storage)).entries().is_empty());
    }

    #[test]
    fn wire_messages_drop_visibility_flag() {
        let mut store = ConversationStore::replay(Box::new(MemoryStore::new()));
        store.append(Role::User, "hi").unwrap();
        store.append_hidden(Role::User, "secret").unwrap();
        assert_eq!(
            store.wire_messages(),
            vec![WireMessage::new("user", "hi"), WireMessage::new("user", "secret")]
        );
        let wire = serde_json::to_value(&store.wire_messages()[1]).unwrap();
        assert!(wire.get("hidden").is_none());
    }

    #[test]
    fn visible_entries_serialize_without_flag() {
        let entry = ConversationEntry {
            role: Role::Assistant,
            content: "ok".into(),
            hidden: false,
        };
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            r#"{"role":"assistant","content":"ok"}"#
        );
    }

    #[test]
    fn clear_empties_persisted_log() {
        let storage = MemoryStore::new();
        let mut store = ConversationStore::replay(Box::new(storage.clone()));
        store.append(Role::User, "hi").unwrap();
        store.clear().unwrap();
        assert_eq!(persisted_len(&storage), 0);
    }

    #[test]
    fn failed_write_appends_nothing() {
        let storage = FlakyStore::default();
        let mut store = ConversationStore::replay(Box::new(storage.clone()));
        store.append(Role::User, "kept").unwrap();

        storage.reject_writes(true);
        assert!(matches!(
            store.append(Role::Assistant, "lost"),
            Err(CliError::Storage(_))
        ));
        assert!(store.append_hidden(Role::User, "lost too").is_err());
        assert!(store.clear().is_err());
        let visible: Vec<_> = store.visible().map(|e| e.content.as_str()).collect();
        assert_eq!(visible, vec!["kept"]);

        storage.reject_writes(false);
        store.append(Role::Assistant, "next").unwrap();
        let reloaded = ConversationStore::replay(Box::new(storage));
        let contents: Vec<_> = reloaded.entries().iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["kept", "next"]);
    }
}
