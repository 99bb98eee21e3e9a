use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;

use crate::app::Runtime;
use crate::commands::chat::report_last_turn;
use crate::errors::CliError;
use crate::modal::escape_markup;
use crate::orchestrator::{ChatRequestKind, run_to_completion};
use crate::store::{ConversationEntry, ConversationStore, Role};

#[derive(Debug, Args)]
pub struct RoutineArgs {
    /// Also write the visible transcript as an HTML page
    #[arg(long = "export-html", value_name = "PATH")]
    pub export_html: Option<PathBuf>,
}

pub async fn handle(runtime: &Runtime, args: RoutineArgs) -> Result<(), CliError> {
    let api = runtime.api_client()?;
    let mut orchestrator = runtime.orchestrator()?;
    let selection = runtime.selection_store()?;
    let mut conversation = runtime.conversation_store()?;
    runtime
        .output
        .print_verbose(&format!("routine for {} selected products", selection.len()));

    let settled = run_to_completion(
        &mut orchestrator,
        &api,
        ChatRequestKind::Routine,
        &selection,
        &mut conversation,
    )
    .await?;

    if let Some(path) = args.export_html.as_deref() {
        export_html(path, &conversation)?;
        runtime
            .output
            .print_verbose(&format!("transcript written to {}", path.display()));
    }
    report_last_turn(runtime, &conversation, settled)
}

fn export_html(path: &Path, conversation: &ConversationStore) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render_transcript_html(conversation.visible()))?;
    Ok(())
}

/// Hidden turns never reach the export; every text field is entity-escaped.
pub fn render_transcript_html<'a>(entries: impl Iterator<Item = &'a ConversationEntry>) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Skincare routine</title>\n</head>\n<body>\n<main class=\"chat-window\">\n",
    );
    for entry in entries {
        let (class, label) = match entry.role {
            Role::User => ("user", "You"),
            Role::Assistant => ("assistant", "Advisor"),
        };
        html.push_str(&format!(
            "<div class=\"msg {class}\"><strong>{label}:</strong> {}</div>\n",
            escape_markup(&entry.content).replace('\n', "<br>")
        ));
    }
    html.push_str("</main>\n</body>\n</html>\n");
    html
}
