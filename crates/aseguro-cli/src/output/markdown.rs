//! Markdown output formatter

use aseguro_core::{AssistantResponse, ComparisonOutcome, ComparisonResult};

pub fn format_response(response: &AssistantResponse) -> String {
    let mut output = String::new();

    match response {
        AssistantResponse::Blocked { reply, reason } => {
            output.push_str(&format!("> {}\n\n", reply));
            output.push_str(&format!("*Blocked: `{}`*\n", reason.trigger()));
        }
        AssistantResponse::Chitchat { reply, .. } => {
            output.push_str(reply);
            output.push('\n');
        }
        AssistantResponse::Answer { text, sources } => {
            output.push_str(text.trim_end());
            output.push_str("\n\n## Sources\n\n");
            for source in sources {
                output.push_str(&format!(
                    "- **{}** (Pág {})",
                    source.insurer,
                    source.page.as_deref().unwrap_or("?")
                ));
                if let Some(file) = &source.source {
                    output.push_str(&format!(" `{}`", file));
                }
                output.push('\n');
            }
        }
        AssistantResponse::NoInformation { text } => {
            output.push_str(&format!("*{}*\n", text));
        }
        AssistantResponse::Comparison(ComparisonOutcome::Table(table)) => {
            output.push_str(&format_table(table));
        }
        AssistantResponse::Comparison(ComparisonOutcome::Failed { error }) => {
            output.push_str(&format!("*Comparison failed: {}*\n", error));
        }
        AssistantResponse::Failed { reason } => {
            output.push_str(&format!("*Failed: {}*\n", reason));
        }
    }

    output
}

fn format_table(table: &ComparisonResult) -> String {
    let mut output = format!("# {}\n\n", table.feature);
    output.push_str("| Aseguradora | Valor | Detalles | Fuente |\n");
    output.push_str("|---|---|---|---|\n");
    for row in &table.comparison {
        output.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            cell(&row.insurer),
            cell(&row.value),
            cell(&row.details),
            cell(&row.source)
        ));
    }
    output
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use aseguro_core::ComparisonRow;

    #[test]
    fn test_table_escapes_pipes() {
        let table = ComparisonResult {
            feature: "deducible".to_string(),
            comparison: vec![ComparisonRow {
                insurer: "RIMAC".to_string(),
                value: "10% | mín. US$ 150".to_string(),
                details: String::new(),
                source: "Pág 12".to_string(),
            }],
        };
        let md = format_response(&AssistantResponse::Comparison(ComparisonOutcome::Table(
            table,
        )));
        assert!(md.starts_with("# deducible"));
        assert!(md.contains("| RIMAC | 10% \\| mín. US$ 150 |  | Pág 12 |"));
    }
}
