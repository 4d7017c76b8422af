//! Schema-constrained generation.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::{CompletionRequest, LlmError, LlmProvider, LlmResult, Message};
use crate::config::RepairConfig;

/// Produces a JSON object conforming to a schema.
#[async_trait]
pub trait StructuredGenerator: Send + Sync {
    async fn generate_structured(&self, schema: &Value, prompt: &str) -> LlmResult<Value>;
}

/// [`StructuredGenerator`] over a plain completion provider.
///
/// The schema goes in the system prompt and the first JSON object in the
/// reply is taken as the answer.
pub struct LlmStructuredGenerator {
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl LlmStructuredGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Generator for tool-call repair, asking `config.model`.
    pub fn from_config(provider: Arc<dyn LlmProvider>, config: &RepairConfig) -> Self {
        Self::new(provider, config.model.clone())
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl StructuredGenerator for LlmStructuredGenerator {
    #[tracing::instrument(skip_all, fields(provider = %self.provider.name(), model = %self.model))]
    async fn generate_structured(&self, schema: &Value, prompt: &str) -> LlmResult<Value> {
        let system = format!(
            "Respond with a single JSON object and nothing else. \
             The object must conform to this JSON schema:\n{}",
            schema
        );
        let request = CompletionRequest::new(&self.model, vec![Message::user(prompt)])
            .with_system(system)
            .with_temperature(0.0);

        let response = self.provider.complete(request).await?;
        let value = extract_json_object(&response.content).ok_or_else(|| {
            LlmError::InvalidResponse("no JSON object in model output".to_string())
        })?;
        Ok(value)
    }
}

/// First balanced `{…}` in `text` that parses as a JSON object.
///
/// Tolerates prose and markdown fences around the object.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut start = 0;

    while let Some(offset) = text[start..].find('{') {
        let open = start + offset;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (i, &b) in bytes.iter().enumerate().skip(open) {
            if in_string {
                match b {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        if let Ok(value @ Value::Object(_)) =
                            serde_json::from_str::<Value>(&text[open..=i])
                        {
                            return Some(value);
                        }
                        break;
                    }
                }
                _ => {}
            }
        }

        start = open + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionResponse, Usage};
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_extract_plain_and_fenced() {
        assert_eq!(
            extract_json_object(r#"{"path": "/a"}"#),
            Some(json!({"path": "/a"}))
        );
        assert_eq!(
            extract_json_object("Here you go:\n```json\n{\"paths\": [\"/a\", \"/b\"]}\n```\n"),
            Some(json!({"paths": ["/a", "/b"]}))
        );
    }

    #[test]
    fn test_extract_braces_in_strings() {
        assert_eq!(
            extract_json_object(r#"{"content": "fn main() { \"}\" }"}"#),
            Some(json!({"content": "fn main() { \"}\" }"}))
        );
    }

    #[test]
    fn test_extract_skips_invalid_candidates() {
        assert_eq!(
            extract_json_object("{not json} then {\"ok\": true}"),
            Some(json!({"ok": true}))
        );
        assert_eq!(extract_json_object("no object here"), None);
        assert_eq!(extract_json_object("[1, 2]"), None);
    }

    struct Canned {
        reply: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl LlmProvider for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
            self.seen.lock().unwrap().push(request);
            Ok(CompletionResponse {
                content: self.reply.clone(),
                model: "canned-1".into(),
                stop_reason: None,
                usage: Usage::default(),
            })
        }
    }

    #[tokio::test]
    async fn test_generator_prompts_with_schema() {
        let provider = Arc::new(Canned {
            reply: "```json\n{\"path\": \"/fixed\"}\n```".into(),
            seen: Mutex::new(Vec::new()),
        });
        let generator = LlmStructuredGenerator::new(provider.clone(), "default");
        let schema = json!({"type": "object", "required": ["path"]});

        let value = generator.generate_structured(&schema, "fix it").await.unwrap();
        assert_eq!(value, json!({"path": "/fixed"}));

        let seen = provider.seen.lock().unwrap();
        assert!(seen[0].system.as_deref().unwrap().contains("\"required\""));
        assert_eq!(seen[0].messages[0].content, "fix it");
    }

    #[tokio::test]
    async fn test_from_config_uses_repair_model() {
        let provider = Arc::new(Canned {
            reply: "{\"path\": \"/\"}".into(),
            seen: Mutex::new(Vec::new()),
        });
        let config = RepairConfig {
            model: "repair-small".into(),
            ..RepairConfig::default()
        };
        let generator = LlmStructuredGenerator::from_config(provider.clone(), &config);
        assert_eq!(generator.model(), "repair-small");

        generator.generate_structured(&json!({}), "fix").await.unwrap();
        assert_eq!(provider.seen.lock().unwrap()[0].model, "repair-small");
    }

    #[tokio::test]
    async fn test_generator_rejects_non_json() {
        let provider = Arc::new(Canned {
            reply: "sorry, I can't".into(),
            seen: Mutex::new(Vec::new()),
        });
        let generator = LlmStructuredGenerator::new(provider, "default");
        assert!(matches!(
            generator.generate_structured(&json!({}), "x").await,
            Err(LlmError::InvalidResponse(_))
        ));
    }
}
