//! JSON output formatter

use aseguro_core::AssistantResponse;

pub fn format_response(response: &AssistantResponse) -> String {
    serde_json::to_string_pretty(response).unwrap_or_else(|_| "{}".to_string()) + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use aseguro_core::BlockReason;

    #[test]
    fn test_blocked_is_tagged() {
        let response = AssistantResponse::Blocked {
            reply: "No puedo ayudarte con eso.".to_string(),
            reason: BlockReason::Lexical {
                term: "hackear".to_string(),
            },
        };
        let value: serde_json::Value =
            serde_json::from_str(&format_response(&response)).unwrap();
        assert_eq!(value["kind"], "blocked");
        assert_eq!(value["reason"]["gate"], "lexical");
        assert_eq!(value["reason"]["term"], "hackear");
    }
}
