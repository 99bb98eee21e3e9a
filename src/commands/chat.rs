use std::io::{self, Read};

use clap::Args;
use serde_json::json;

use crate::app::Runtime;
use crate::errors::CliError;
use crate::orchestrator::{ChatRequestKind, Settled, run_to_completion};
use crate::store::{ConversationStore, Role};

#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Prompt text
    pub prompt: Option<String>,
    /// Read prompt from stdin
    #[arg(long)]
    pub stdin: bool,
}

pub async fn handle(runtime: &Runtime, args: ChatArgs) -> Result<(), CliError> {
    let prompt = resolve_prompt(&args)?;
    let api = runtime.api_client()?;
    let mut orchestrator = runtime.orchestrator()?;
    let selection = runtime.selection_store()?;
    let mut conversation = runtime.conversation_store()?;
    runtime.output.print_verbose(&format!(
        "proxy={} persona={} history={}",
        api.endpoint(),
        orchestrator.persona().key(),
        conversation.entries().len()
    ));

    let settled = run_to_completion(
        &mut orchestrator,
        &api,
        ChatRequestKind::Chat(prompt),
        &selection,
        &mut conversation,
    )
    .await?;
    report_last_turn(runtime, &conversation, settled)
}

/// Print the assistant turn just appended; a failed request still exits non-zero.
pub fn report_last_turn(
    runtime: &Runtime,
    conversation: &ConversationStore,
    settled: Option<Settled>,
) -> Result<(), CliError> {
    let kind_label = match settled {
        Some(Settled::Failed(err)) => return Err(err),
        Some(Settled::Reply) => "reply",
        Some(Settled::Fallback) => "fallback",
        None => "local",
    };
    let reply = conversation
        .visible()
        .filter(|e| e.role == Role::Assistant)
        .last()
        .map(|e| e.content.clone())
        .unwrap_or_default();

    runtime
        .output
        .emit(&json!({ "kind": kind_label, "reply": reply }), || {
            vec![reply.clone()]
        })
}

fn resolve_prompt(args: &ChatArgs) -> Result<String, CliError> {
    if args.stdin {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .map_err(|e| CliError::Generic(format!("Failed reading stdin: {e}")))?;
        let trimmed = input.trim().to_string();
        if trimmed.is_empty() {
            return Err(CliError::Usage(
                "No prompt provided via stdin. Pipe text or pass a prompt argument.".to_string(),
            ));
        }
        return Ok(trimmed);
    }

    match &args.prompt {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(CliError::Usage(
            "Missing prompt. Use `glowguide chat \"...\"` or pass `--stdin`.".to_string(),
        )),
    }
}
