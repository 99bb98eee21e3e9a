use clap::Subcommand;
use serde_json::json;

use crate::app::Runtime;
use crate::errors::CliError;

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// Print the conversation
    Show {
        /// Include turns that are sent to the model but never displayed
        #[arg(long)]
        all: bool,
    },
    /// Delete the conversation
    Clear,
}

pub async fn handle(runtime: &Runtime, command: HistoryCommand) -> Result<(), CliError> {
    let mut conversation = runtime.conversation_store()?;
    match command {
        HistoryCommand::Show { all } => {
            let entries: Vec<_> = if all {
                conversation.entries().iter().collect()
            } else {
                conversation.visible().collect()
            };
            runtime.output.emit(&json!({ "entries": entries }), || {
                if entries.is_empty() {
                    return vec!["(no conversation yet)".to_string()];
                }
                entries
                    .iter()
                    .map(|e| {
                        let marker = if e.hidden { " (hidden)" } else { "" };
                        format!("[{}{marker}] {}", e.role.as_str(), e.content)
                    })
                    .collect()
            })
        }
        HistoryCommand::Clear => {
            conversation.clear()?;
            runtime
                .output
                .emit(&json!({ "ok": true }), || vec!["Conversation cleared.".to_string()])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_runtime;
    use crate::store::Role;

    #[tokio::test]
    async fn clear_empties_persisted_history() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = test_runtime(dir.path());
        let mut conv = runtime.conversation_store().unwrap();
        conv.append(Role::User, "hello").unwrap();
        conv.append_hidden(Role::User, "context").unwrap();

        handle(&runtime, HistoryCommand::Show { all: true }).await.unwrap();
        handle(&runtime, HistoryCommand::Clear).await.unwrap();
        assert!(runtime.conversation_store().unwrap().entries().is_empty());
    }
}
