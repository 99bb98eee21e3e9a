use serde::Serialize;

use crate::errors::CliError;

/// How headless subcommands report results.
#[derive(Debug, Clone)]
pub struct OutputMode {
    pub json: bool,
    pub quiet: bool,
    pub verbose: bool,
    pub debug: bool,
}

impl OutputMode {
    /// Print `value` as one JSON line in `--json` mode, otherwise the human lines.
    pub fn emit<T, F>(&self, value: &T, human: F) -> Result<(), CliError>
    where
        T: Serialize,
        F: FnOnce() -> Vec<String>,
    {
        if self.json {
            println!("{}", serde_json::to_string(value)?);
            return Ok(());
        }
        for line in human() {
            self.print_human(&line);
        }
        Ok(())
    }

    pub fn print_human(&self, message: &str) {
        if self.json || self.quiet {
            return;
        }
        println!("{message}");
    }

    pub fn print_verbose(&self, message: &str) {
        if !self.verbose || self.json || self.quiet {
            return;
        }
        eprintln!("{message}");
    }
}

pub fn print_error(error: &CliError, mode: &OutputMode) {
    if mode.json {
        let payload = serde_json::json!({
            "error": error.to_string(),
            "code": error.exit_code()
        });
        println!(
            "{}",
            serde_json::to_string(&payload)
                .unwrap_or_else(|_| "{\"error\":\"unknown\"}".to_string())
        );
        return;
    }

    eprintln!("Error: {error}");
}
