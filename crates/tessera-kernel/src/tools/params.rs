//! Tool parameter structs.
//!
//! Each derives `JsonSchema` so the schema sent to the model and the one
//! arguments are checked against come from the same definition.

use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{ToolError, ToolResult};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListFilesParams {
    #[schemars(description = "Directory path to list")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ReadFilesParams {
    #[schemars(description = "Paths of the files to read")]
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateFileParams {
    #[schemars(description = "Path of the new file")]
    pub path: String,
    #[schemars(description = "Full content of the new file")]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EditFileParams {
    #[schemars(description = "Path of the file to edit")]
    pub path: String,
    #[schemars(description = "Code snippet with the changes to apply")]
    pub content: String,
    #[schemars(description = "What the change does, in one sentence")]
    pub instruction: String,
}

/// JSON schema for `P`.
pub fn schema<P: JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(P)).unwrap_or_default()
}

/// Decode raw argument text, mapping any mismatch to a schema violation.
pub fn parse<P: DeserializeOwned>(tool: &str, raw: &str) -> ToolResult<P> {
    serde_json::from_str(raw).map_err(|e| ToolError::schema_violation(tool, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_shape() {
        let schema = schema::<EditFileParams>();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 3);
        assert_eq!(schema["properties"]["instruction"]["type"], "string");
        assert_eq!(schema["additionalProperties"], false);
    }

    #[test]
    fn test_parse_rejects_mismatch() {
        let ok: ReadFilesParams = parse("read_files", r#"{"paths": ["/a"]}"#).unwrap();
        assert_eq!(ok.paths, vec!["/a"]);

        for bad in [
            r#"{"paths": "/a"}"#,
            r#"{"path": ["/a"]}"#,
            r#"{"paths": ["/a"], "extra": 1}"#,
            "not json",
        ] {
            assert!(matches!(
                parse::<ReadFilesParams>("read_files", bad),
                Err(ToolError::SchemaViolation { .. })
            ));
        }
    }
}
