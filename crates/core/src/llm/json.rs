use serde_json::Value;

pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        // Remove Markdown fences (```json ... ``` or ``` ... ```).
        let mut inner = trimmed;
        if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    // Best-effort extraction: first '{' to last '}'.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

/// Parses the first JSON object found in free text. Anything that is not an object is `None`.
pub fn parse_object(text: &str) -> Option<Value> {
    let json_str = extract_json(text)?;
    match serde_json::from_str::<Value>(&json_str) {
        Ok(v) if v.is_object() => Some(v),
        Ok(_) => None,
        Err(err) => {
            tracing::debug!(error = %err, "LLM text is not valid JSON");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_json_handles_fenced_blocks() {
        let body = "{\"a\":1}";
        let fenced = format!("```json\n{body}\n```\n");
        assert_eq!(extract_json(&fenced), Some(body.to_string()));
    }

    #[test]
    fn extract_json_falls_back_to_braces() {
        let s = "prefix {\"a\":1} suffix";
        assert_eq!(extract_json(s), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn parse_object_reads_summary_reply() {
        let text = "Here you go:\n{\"summary\": \"Win rate 65%, drawdown 12%.\"}";
        assert_eq!(
            parse_object(text),
            Some(json!({"summary": "Win rate 65%, drawdown 12%."}))
        );
    }

    #[test]
    fn parse_object_rejects_prose_and_broken_json() {
        assert_eq!(parse_object("I cannot help with that."), None);
        assert_eq!(parse_object("{\"topStocks\": [,]}"), None);
    }
}
