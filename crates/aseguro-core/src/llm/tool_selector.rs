//! Tool selection: decide whether a query is a policy consultation or a
//! multi-insurer comparison.

use super::{ChatMessage, Generator};
use crate::cancel::cancellable;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Tool chosen for a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolChoice {
    /// Single-query retrieval-augmented answer
    ConsultPolicy,
    /// Feature comparison across named insurers
    ComparePolicies {
        feature: String,
        insurers: Vec<String>,
    },
}

/// Selects a tool with one call to the generation service
pub struct ToolSelector {
    generator: Arc<dyn Generator>,
}

impl ToolSelector {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Choose a tool for `query`. Upstream errors propagate; callers fall
    /// back to [`ToolChoice::ConsultPolicy`].
    pub async fn select(&self, query: &str, cancel: &CancellationToken) -> Result<ToolChoice> {
        let messages = vec![
            ChatMessage::system(
                "Eres un enrutador de herramientas para un asistente de seguros vehiculares. \
                 Responde ÚNICAMENTE con JSON válido.",
            ),
            ChatMessage::user(build_selection_prompt(query)),
        ];

        let response = cancellable(cancel, "tool selection", self.generator.complete(messages)).await?;
        let choice = parse_tool_choice(&response);
        tracing::debug!(?choice, "tool selected");
        Ok(choice)
    }
}

fn build_selection_prompt(query: &str) -> String {
    format!(
        r#"Herramientas disponibles:
- consult_policy: preguntas generales sobre pólizas (coberturas, exclusiones, definiciones).
- compare_policies: comparar UNA característica entre varias aseguradoras nombradas.

Consulta: "{}"

Devuelve JSON con uno de estos formatos:
{{"tool": "consult_policy"}}
{{"tool": "compare_policies", "feature": "deducible", "insurers": ["RIMAC", "MAPFRE"]}}

JSON:"#,
        query
    )
}

/// Lenient parse of the selector reply; anything unusable means consult.
pub fn parse_tool_choice(response: &str) -> ToolChoice {
    #[derive(Deserialize)]
    struct RawChoice {
        tool: String,
        #[serde(default)]
        feature: Option<String>,
        #[serde(default)]
        insurers: Vec<String>,
    }

    let json_str = match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => return ToolChoice::ConsultPolicy,
    };

    let raw: RawChoice = match serde_json::from_str(json_str) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("Failed to parse tool selection JSON: {}, consulting", e);
            return ToolChoice::ConsultPolicy;
        }
    };

    if raw.tool.trim() != "compare_policies" {
        return ToolChoice::ConsultPolicy;
    }

    let feature = raw.feature.map(|f| f.trim().to_string()).unwrap_or_default();
    let insurers: Vec<String> = raw
        .insurers
        .into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect();

    if feature.is_empty() || insurers.is_empty() {
        return ToolChoice::ConsultPolicy;
    }

    ToolChoice::ComparePolicies { feature, insurers }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compare() {
        let reply = r#"```json
{"tool": "compare_policies", "feature": "deducible", "insurers": ["rimac", " MAPFRE "]}
```"#;
        assert_eq!(
            parse_tool_choice(reply),
            ToolChoice::ComparePolicies {
                feature: "deducible".to_string(),
                insurers: vec!["rimac".to_string(), "MAPFRE".to_string()],
            }
        );
    }

    #[test]
    fn test_parse_consult() {
        assert_eq!(
            parse_tool_choice(r#"{"tool": "consult_policy"}"#),
            ToolChoice::ConsultPolicy
        );
    }

    #[test]
    fn test_incomplete_compare_falls_back() {
        assert_eq!(
            parse_tool_choice(r#"{"tool": "compare_policies", "feature": "robo", "insurers": []}"#),
            ToolChoice::ConsultPolicy
        );
        assert_eq!(
            parse_tool_choice(r#"{"tool": "compare_policies", "insurers": ["RIMAC"]}"#),
            ToolChoice::ConsultPolicy
        );
    }

    #[test]
    fn test_garbage_falls_back() {
        assert_eq!(parse_tool_choice("no sé"), ToolChoice::ConsultPolicy);
        assert_eq!(parse_tool_choice("{not json}"), ToolChoice::ConsultPolicy);
        assert_eq!(
            parse_tool_choice(r#"{"tool": "delete_everything"}"#),
            ToolChoice::ConsultPolicy
        );
    }
}
