//! Rendering command outcomes for the terminal.

use aquos_core::{AquosError, Command, Reply};
use serde::Serialize;

/// The result of one command, as printed.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub command: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Outcome {
    pub fn new(command: &Command, result: &Result<Reply, AquosError>) -> Self {
        match result {
            Ok(reply) => Self {
                command: command.to_string(),
                ok: true,
                reply: Some(reply.text().to_string()),
                error: None,
            },
            Err(e) => Self {
                command: command.to_string(),
                ok: false,
                reply: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// One line of output, plain or JSON.
    pub fn render(&self, json: bool) -> String {
        if json {
            return serde_json::to_string(self).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"));
        }
        match (&self.reply, &self.error) {
            (Some(reply), _) => reply.clone(),
            (None, Some(error)) => format!("error: {error}"),
            (None, None) => String::new(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
