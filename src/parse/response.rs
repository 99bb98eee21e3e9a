use serde_json::Value;

/// Extract the reply text from a chat-completion response (`choices[0].message.content`).
/// Blank content counts as no reply.
pub fn extract_reply(payload: &Value) -> Option<String> {
    payload
        .get("choices")
        .and_then(|v| v.get(0))
        .and_then(|v| v.get("message"))
        .and_then(|v| v.get("content"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
}

/// Model name echoed back by the proxy, if any.
pub fn extract_model(payload: &Value) -> Option<String> {
    payload
        .get("model")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Extract usage statistics and format as a display string
pub fn extract_usage_line(payload: &Value) -> String {
    if let Some(usage) = payload.get("usage") {
        let input = usage
            .get("prompt_tokens")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let output = usage
            .get("completion_tokens")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let total = usage
            .get("total_tokens")
            .and_then(|v| v.as_u64())
            .unwrap_or(input + output);
        return format!("usage(prompt={input}, completion={output}, total={total})");
    }
    "usage(unknown)".to_string()
}
