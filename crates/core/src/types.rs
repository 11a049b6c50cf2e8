use serde::{Deserialize, Serialize};
use tracing::warn;

/// A function call requested by the model. Serializes to the
/// OpenAI-compatible wire format:
/// `{id, type: "function", function: {name, arguments}}`
/// where `arguments` is a JSON string, not an object.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl Serialize for ToolCallRequest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("type", "function")?;
        map.serialize_entry("function", &serde_json::json!({
            "name": self.name,
            "arguments": self.arguments.to_string()
        }))?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for ToolCallRequest {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let obj = value.as_object().ok_or_else(|| serde::de::Error::custom("expected object"))?;

        let id = obj.get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        if let Some(func) = obj.get("function").and_then(|v| v.as_object()) {
            let name = func.get("name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let arguments = match func.get("arguments") {
                Some(serde_json::Value::String(s)) => {
                    serde_json::from_str(s).unwrap_or_else(|e| {
                        warn!(error = %e, raw = %s, "Tool call arguments are not valid JSON, using empty object");
                        serde_json::Value::Object(serde_json::Map::new())
                    })
                }
                Some(v) => v.clone(),
                None => serde_json::Value::Object(serde_json::Map::new()),
            };
            return Ok(ToolCallRequest { id, name, arguments });
        }

        // Flat format: {id, name, arguments}
        let name = obj.get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let arguments = obj.get("arguments")
            .cloned()
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        Ok(ToolCallRequest { id, name, arguments })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LLMResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub finish_reason: String,
    pub usage: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn tool_result(tool_call_id: &str, content: &str) -> Self {
        Self {
            role: "tool".to_string(),
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.to_string()),
            name: None,
        }
    }
}

/// One fenced code block lifted out of an assistant message.
/// `language` is the fence tag when present (` ```js `), None for bare fences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: Option<String>,
    pub code: String,
}

impl CodeBlock {
    pub fn new(language: Option<&str>, code: &str) -> Self {
        Self {
            language: language.map(|l| l.to_string()),
            code: code.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_call_roundtrip_wire_format() {
        let call = ToolCallRequest {
            id: "call_1".to_string(),
            name: "ask_html_assistant".to_string(),
            arguments: serde_json::json!({"message": "find the login button"}),
        };
        let wire = serde_json::to_value(&call).unwrap();
        assert_eq!(wire["type"], "function");
        assert_eq!(wire["function"]["name"], "ask_html_assistant");
        // arguments travel as a string
        assert!(wire["function"]["arguments"].is_string());

        let back: ToolCallRequest = serde_json::from_value(wire).unwrap();
        assert_eq!(back.name, "ask_html_assistant");
        assert_eq!(back.arguments["message"], "find the login button");
    }

    #[test]
    fn test_tool_call_deserialize_flat_format() {
        let back: ToolCallRequest = serde_json::from_value(serde_json::json!({
            "id": "c2",
            "name": "ask_code_generator",
            "arguments": {"message": "click it", "context_html": "<button>"}
        }))
        .unwrap();
        assert_eq!(back.name, "ask_code_generator");
        assert_eq!(back.arguments["context_html"], "<button>");
    }

    #[test]
    fn test_tool_call_bad_arguments_fall_back_to_empty() {
        let back: ToolCallRequest = serde_json::from_value(serde_json::json!({
            "id": "c3",
            "function": {"name": "ask_html_assistant", "arguments": "{not json"}
        }))
        .unwrap();
        assert!(back.arguments.as_object().unwrap().is_empty());
    }
}
