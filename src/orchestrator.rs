use serde::Serialize;

use crate::api::{ApiClient, ApiResponse};
use crate::catalog::Product;
use crate::errors::CliError;
use crate::parse::response::{extract_model, extract_reply, extract_usage_line};
use crate::persona::Persona;
use crate::store::{ConversationStore, Role, SelectionStore, WireMessage};

pub const ROUTINE_USER_PROMPT: &str = "Generate a routine for me!";
pub const EMPTY_SELECTION_MESSAGE: &str =
    "Please select at least one product to generate a routine.";
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't generate a response. Please try again.";

pub const TEMPERATURE: f64 = 0.7;
pub const CHAT_MAX_TOKENS: u32 = 500;
pub const ROUTINE_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRequestKind {
    Chat(String),
    Routine,
}

/// Body posted to the proxy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatPayload {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Begin {
    /// Request is pending; the payload must be sent and the result fed to `settle`.
    Send(ChatPayload),
    /// Answered locally without a request.
    Answered,
    /// Nothing to do: blank input, or a request is already pending.
    Ignored,
}

/// How a request ended. The assistant turn is already recorded in every case.
#[derive(Debug)]
pub enum Settled {
    Reply,
    Fallback,
    /// The proxy or transport error, kept so headless callers can exit with its code.
    Failed(CliError),
}

/// Idle → Pending → Settled, one request at a time.
#[derive(Debug)]
pub struct ChatOrchestrator {
    model: String,
    persona: Persona,
    pending: bool,
}

impl ChatOrchestrator {
    pub fn new(model: impl Into<String>, persona: Persona) -> Self {
        Self {
            model: model.into(),
            persona,
            pending: false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    pub fn set_persona(&mut self, persona: Persona) {
        self.persona = persona;
    }

    pub fn begin(
        &mut self,
        kind: ChatRequestKind,
        selection: &SelectionStore,
        conversation: &mut ConversationStore,
    ) -> Result<Begin, CliError> {
        if self.pending {
            return Ok(Begin::Ignored);
        }

        let max_tokens = match kind {
            ChatRequestKind::Chat(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(Begin::Ignored);
                }
                conversation.append(Role::User, text)?;
                CHAT_MAX_TOKENS
            }
            ChatRequestKind::Routine => {
                if selection.is_empty() {
                    conversation.append(Role::Assistant, EMPTY_SELECTION_MESSAGE)?;
                    return Ok(Begin::Answered);
                }
                conversation.append(Role::User, ROUTINE_USER_PROMPT)?;
                conversation.append_hidden(Role::User, routine_instruction(selection.items()))?;
                ROUTINE_MAX_TOKENS
            }
        };

        self.pending = true;
        Ok(Begin::Send(self.payload(conversation, max_tokens)))
    }

    fn payload(&self, conversation: &ConversationStore, max_tokens: u32) -> ChatPayload {
        let mut messages = Vec::with_capacity(conversation.entries().len() + 1);
        messages.push(WireMessage::new("system", self.persona.system_prompt()));
        messages.extend(conversation.wire_messages());
        ChatPayload {
            model: self.model.clone(),
            messages,
            temperature: TEMPERATURE,
            max_tokens,
        }
    }

    /// Record the outcome of the pending request. Always returns to idle.
    pub fn settle(
        &mut self,
        result: Result<ApiResponse, CliError>,
        conversation: &mut ConversationStore,
    ) -> Result<Settled, CliError> {
        self.pending = false;
        let (settled, text) = match result {
            Ok(resp) => match extract_reply(&resp.json) {
                Some(reply) => (Settled::Reply, reply),
                None => (Settled::Fallback, FALLBACK_REPLY.to_string()),
            },
            Err(err) => {
                tracing::error!(error = %err, "chat request failed");
                let text = format!("Error: {err}");
                (Settled::Failed(err), text)
            }
        };
        conversation.append(Role::Assistant, text)?;
        Ok(settled)
    }
}

pub async fn send(api: &ApiClient, payload: &ChatPayload) -> Result<ApiResponse, CliError> {
    let body = serde_json::to_value(payload)?;
    let res = api.post_json(&body).await?;
    let model = extract_model(&res.json).unwrap_or_else(|| payload.model.clone());
    tracing::info!(
        elapsed_ms = res.elapsed_ms as u64,
        model = %model,
        usage = %extract_usage_line(&res.json),
        "chat reply received"
    );
    Ok(res)
}

/// Begin, send and settle in one go. Used by the headless subcommands.
pub async fn run_to_completion(
    orchestrator: &mut ChatOrchestrator,
    api: &ApiClient,
    kind: ChatRequestKind,
    selection: &SelectionStore,
    conversation: &mut ConversationStore,
) -> Result<Option<Settled>, CliError> {
    let payload = match orchestrator.begin(kind, selection, conversation)? {
        Begin::Send(payload) => payload,
        Begin::Answered | Begin::Ignored => return Ok(None),
    };
    let result = send(api, &payload).await;
    orchestrator.settle(result, conversation).map(Some)
}

/// The detailed, model-facing request that accompanies "Generate a routine for me!".
pub fn routine_instruction(products: &[Product]) -> String {
    let mut text = String::from(
        "Create a personalized skincare routine using only the following selected products:\n\n",
    );
    for (idx, product) in products.iter().enumerate() {
        text.push_str(&format!(
            "{}. {} by {}\n   Category: {}\n   Description: {}\n",
            idx + 1,
            product.name,
            product.brand,
            product.category,
            product.description
        ));
    }
    text.push_str(
        "\nFormat the routine as numbered steps in the order they should be applied. \
         For each step:\n\
         - say whether it belongs to the morning (AM), evening (PM), or both\n\
         - reference the product by its exact name\n\
         - give a one-sentence reason the step helps\n\
         If a selected product does not belong in a daily routine, say so briefly.",
    );
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::sample_product;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Fixture {
        orchestrator: ChatOrchestrator,
        selection: SelectionStore,
        conversation: ConversationStore,
    }

    fn fixture() -> Fixture {
        let storage = MemoryStore::new();
        Fixture {
            orchestrator: ChatOrchestrator::new("gpt-4o", Persona::Glow),
            selection: SelectionStore::restore(Box::new(storage.clone())),
            conversation: ConversationStore::replay(Box::new(storage)),
        }
    }

    fn ok_reply(text: &str) -> Result<ApiResponse, CliError> {
        Ok(ApiResponse {
            elapsed_ms: 1,
            json: json!({ "choices": [ { "message": { "content": text } } ] }),
        })
    }

    #[test]
    fn routine_with_empty_selection_sends_nothing() {
        let mut f = fixture();
        let begin = f
            .orchestrator
            .begin(ChatRequestKind::Routine, &f.selection, &mut f.conversation)
            .unwrap();
        assert_eq!(begin, Begin::Answered);
        assert!(!f.orchestrator.is_pending());
        let entries = f.conversation.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].role, Role::Assistant);
        assert_eq!(entries[0].content, EMPTY_SELECTION_MESSAGE);
    }

    #[test]
    fn routine_payload_carries_hidden_instruction() {
        let mut f = fixture();
        f.selection.toggle(&sample_product(1, "Foaming Cleanser", "cleanser")).unwrap();
        f.selection.toggle(&sample_product(2, "Night Serum", "serum")).unwrap();

        let Begin::Send(payload) = f
            .orchestrator
            .begin(ChatRequestKind::Routine, &f.selection, &mut f.conversation)
            .unwrap()
        else {
            panic!("expected a request");
        };

        assert!(f.orchestrator.is_pending());
        assert_eq!(payload.max_tokens, ROUTINE_MAX_TOKENS);
        assert_eq!(payload.temperature, TEMPERATURE);
        assert_eq!(payload.messages[0].role, "system");
        assert_eq!(payload.messages[0].content, Persona::Glow.system_prompt());
        assert_eq!(payload.messages[1], WireMessage::new("user", ROUTINE_USER_PROMPT));
        let instruction = &payload.messages[2].content;
        assert!(instruction.contains("1. Foaming Cleanser by CeraVe"));
        assert!(instruction.contains("Category: serum"));
        assert!(instruction.contains("(AM)"));

        let visible: Vec<_> = f.conversation.visible().map(|e| e.content.clone()).collect();
        assert_eq!(visible, vec![ROUTINE_USER_PROMPT.to_string()]);
    }

    #[test]
    fn chat_payload_includes_history_and_chat_budget() {
        let mut f = fixture();
        f.conversation.append(Role::User, "earlier").unwrap();
        f.conversation.append(Role::Assistant, "reply").unwrap();
        let Begin::Send(payload) = f
            .orchestrator
            .begin(
                ChatRequestKind::Chat("  is retinol ok?  ".into()),
                &f.selection,
                &mut f.conversation,
            )
            .unwrap()
        else {
            panic!("expected a request");
        };
        assert_eq!(payload.max_tokens, CHAT_MAX_TOKENS);
        assert_eq!(payload.messages.len(), 4);
        assert_eq!(payload.messages[3], WireMessage::new("user", "is retinol ok?"));
        let body = serde_json::to_value(&payload).unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 500);
    }

    #[test]
    fn blank_chat_and_second_submit_are_ignored() {
        let mut f = fixture();
        assert_eq!(
            f.orchestrator
                .begin(ChatRequestKind::Chat("   ".into()), &f.selection, &mut f.conversation)
                .unwrap(),
            Begin::Ignored
        );
        assert!(matches!(
            f.orchestrator
                .begin(ChatRequestKind::Chat("hi".into()), &f.selection, &mut f.conversation)
                .unwrap(),
            Begin::Send(_)
        ));
        assert_eq!(
            f.orchestrator
                .begin(ChatRequestKind::Chat("again".into()), &f.selection, &mut f.conversation)
                .unwrap(),
            Begin::Ignored
        );
        assert_eq!(f.conversation.entries().len(), 1);
    }

    #[test]
    fn settle_appends_reply_and_returns_to_idle() {
        let mut f = fixture();
        f.orchestrator
            .begin(ChatRequestKind::Chat("hi".into()), &f.selection, &mut f.conversation)
            .unwrap();
        let settled = f.orchestrator.settle(ok_reply("Hello!"), &mut f.conversation).unwrap();
        assert!(matches!(settled, Settled::Reply));
        assert!(!f.orchestrator.is_pending());
        assert_eq!(f.conversation.entries().last().unwrap().content, "Hello!");
    }

    #[test]
    fn settle_without_text_uses_fallback() {
        let mut f = fixture();
        let settled = f
            .orchestrator
            .settle(
                Ok(ApiResponse { elapsed_ms: 0, json: json!({ "choices": [] }) }),
                &mut f.conversation,
            )
            .unwrap();
        assert!(matches!(settled, Settled::Fallback));
        assert_eq!(f.conversation.entries()[0].content, FALLBACK_REPLY);
    }

    #[test]
    fn settle_with_blank_text_uses_fallback() {
        let mut f = fixture();
        f.orchestrator
            .begin(ChatRequestKind::Chat("hi".into()), &f.selection, &mut f.conversation)
            .unwrap();
        let settled = f.orchestrator.settle(ok_reply("  "), &mut f.conversation).unwrap();
        assert!(matches!(settled, Settled::Fallback));
        let visible: Vec<_> = f.conversation.visible().map(|e| e.content.as_str()).collect();
        assert_eq!(visible, vec!["hi", FALLBACK_REPLY]);
    }

    #[test]
    fn server_error_appends_one_assistant_turn_and_reenables_submit() {
        let mut f = fixture();
        f.orchestrator
            .begin(ChatRequestKind::Chat("hi".into()), &f.selection, &mut f.conversation)
            .unwrap();
        let before = f.conversation.entries().len();
        let settled = f
            .orchestrator
            .settle(
                Err(CliError::Server("Request failed with status 500".into())),
                &mut f.conversation,
            )
            .unwrap();
        assert!(matches!(settled, Settled::Failed(CliError::Server(_))));
        assert!(!f.orchestrator.is_pending());
        assert_eq!(f.conversation.entries().len(), before + 1);
        let last = f.conversation.entries().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.contains("Request failed with status 500"));
    }
}
