//! AI gateway
//!
//! The conversational model runs as an external CLI process. The gateway
//! formats the prompt, enforces a hard timeout, and parses the loosely
//! structured reply into a message plus a list of actions.

use crate::utils::errors::{AiError, OrderBuddyError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    pub speaker: Option<String>,
    pub content: String,
}

/// Everything the model needs to answer one message
#[derive(Debug, Clone)]
pub struct AiRequest {
    pub system_prompt: String,
    /// Menus, current orders and other state serialized as text
    pub context: String,
    pub history: Vec<HistoryMessage>,
    pub speaker_name: String,
    pub message: String,
}

/// One structured action requested by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub actions: Vec<AiAction>,
}

impl AiResponse {
    /// The model may decline to answer chatter that is not addressed to it
    pub fn is_empty(&self) -> bool {
        self.message.trim().is_empty() && self.actions.is_empty()
    }
}

#[async_trait]
pub trait AiGateway: Send + Sync {
    async fn invoke(&self, request: AiRequest) -> Result<AiResponse, OrderBuddyError>;
}

/// Gateway backed by a CLI process, fed over stdin
pub struct ProcessGateway {
    command: String,
    model: String,
    working_dir: Option<String>,
    timeout: Duration,
}

impl ProcessGateway {
    pub fn new(
        command: String,
        model: String,
        working_dir: Option<String>,
        timeout_seconds: u64,
    ) -> Self {
        Self {
            command,
            model,
            working_dir,
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    fn format_prompt(&self, request: &AiRequest) -> String {
        let mut prompt = String::new();
        prompt.push_str(&request.system_prompt);
        prompt.push_str("\n\n");

        if !request.context.is_empty() {
            prompt.push_str(&request.context);
            prompt.push_str("\n\n");
        }

        if !request.history.is_empty() {
            prompt.push_str("Conversation so far:\n");
            for entry in &request.history {
                match &entry.speaker {
                    Some(speaker) => {
                        prompt.push_str(&format!("[{}] {}: {}\n", entry.role, speaker, entry.content))
                    }
                    None => prompt.push_str(&format!("[{}] {}\n", entry.role, entry.content)),
                }
            }
            prompt.push('\n');
        }

        prompt.push_str(&format!("{}: {}\n", request.speaker_name, request.message));
        prompt
    }
}

#[async_trait]
impl AiGateway for ProcessGateway {
    async fn invoke(&self, request: AiRequest) -> Result<AiResponse, OrderBuddyError> {
        let prompt = self.format_prompt(&request);

        let mut command = Command::new(&self.command);
        command
            .arg("-p")
            .arg("--model")
            .arg(&self.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| AiError::Spawn(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(|e| AiError::Spawn(e.to_string()))?;
        }

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| AiError::Spawn(e.to_string()))?,
            Err(_) => {
                // kill_on_drop reaps the stuck process
                return Err(AiError::Timeout {
                    seconds: self.timeout.as_secs(),
                }
                .into());
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            // A failed run that still produced output is salvaged
            if stdout.trim().is_empty() {
                return Err(AiError::NonZeroExit {
                    code: output.status.code().unwrap_or(-1),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                }
                .into());
            }
            tracing::warn!(
                code = output.status.code().unwrap_or(-1),
                "AI process exited non-zero but produced output"
            );
        }

        Ok(parse_ai_output(&stdout))
    }
}

/// Drop surrounding markdown code fences, keeping the fenced body
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let without_open = match trimmed.find('\n') {
        Some(pos) => &trimmed[pos + 1..],
        None => return trimmed.to_string(),
    };
    let body = without_open
        .rfind("```")
        .map(|pos| &without_open[..pos])
        .unwrap_or(without_open);
    body.trim().to_string()
}

/// Find the last balanced JSON object in the text that contains a
/// "message" key. Brace counting skips string contents and escapes.
pub fn extract_last_json_object(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut candidates = Vec::new();

    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = balanced_end(bytes, i) {
                candidates.push(&text[i..=end]);
                i = end + 1;
                continue;
            }
        }
        i += 1;
    }

    candidates
        .into_iter()
        .rev()
        .filter_map(|c| serde_json::from_str::<Value>(c).ok())
        .find(|v| v.get("message").is_some())
}

fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse raw model output. Anything that is not a recognizable JSON
/// reply is treated as a plain-text message with no actions.
pub fn parse_ai_output(stdout: &str) -> AiResponse {
    let cleaned = strip_code_fences(stdout);

    if let Some(value) = extract_last_json_object(&cleaned) {
        if let Ok(response) = serde_json::from_value::<AiResponse>(value) {
            return response;
        }
    }

    AiResponse {
        message: cleaned,
        actions: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_plain_json_reply() {
        let out = parse_ai_output(r#"{"message": "added one fried rice", "actions": []}"#);
        assert_eq!(out.message, "added one fried rice");
        assert!(out.actions.is_empty());
    }

    #[test]
    fn test_parse_fenced_json_reply() {
        let raw = "```json\n{\"message\": \"done\", \"actions\": [{\"type\": \"create_order\", \"items\": []}]}\n```";
        let out = parse_ai_output(raw);
        assert_eq!(out.message, "done");
        assert_eq!(out.actions.len(), 1);
        assert_eq!(out.actions[0].kind, "create_order");
    }

    #[test]
    fn test_parse_picks_last_json_object_with_message() {
        let raw = r#"thinking about {"items": 3} first
{"message": "first draft"}
final answer: {"message": "final", "actions": []}"#;
        let out = parse_ai_output(raw);
        assert_eq!(out.message, "final");
    }

    #[test]
    fn test_braces_inside_strings_do_not_confuse_extraction() {
        let raw = r#"{"message": "use {curly} braces \"freely\"", "actions": []}"#;
        let out = parse_ai_output(raw);
        assert_eq!(out.message, "use {curly} braces \"freely\"");
    }

    #[test]
    fn test_non_json_output_becomes_plain_message() {
        let out = parse_ai_output("Sorry, I did not catch that.");
        assert_eq!(out.message, "Sorry, I did not catch that.");
        assert!(out.actions.is_empty());
    }

    #[test]
    fn test_empty_reply_means_no_response_needed() {
        let out = parse_ai_output(r#"{"message": "", "actions": []}"#);
        assert!(out.is_empty());
    }

    #[test]
    fn test_action_payload_fields_are_preserved() {
        let raw = json!({
            "message": "noted",
            "actions": [{"type": "remove_item", "item_name": "iced tea", "quantity": 1}]
        })
        .to_string();
        let out = parse_ai_output(&raw);
        assert_eq!(out.actions[0].kind, "remove_item");
        assert_eq!(out.actions[0].data["item_name"], "iced tea");
        assert_eq!(out.actions[0].data["quantity"], 1);
    }

    #[test]
    fn test_strip_code_fences_without_language_tag() {
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn test_json_without_message_key_ignored() {
        let out = parse_ai_output(r#"{"status": "ok"}"#);
        assert_eq!(out.message, r#"{"status": "ok"}"#);
    }
}
