//! System-prompt assembly
//!
//! The system prompt an agent sees is its configured prompt plus a live
//! inventory snapshot and the function catalogue with calling instructions.
//! The snapshot is best-effort; a data-store hiccup degrades to a prompt
//! without numbers instead of failing the chat.

use stocka_types::{AgentConfig, InventorySummary};

/// The calling convention shown to the model, verbatim
const CALL_INSTRUCTIONS: &str = "\
To run one of these queries, reply with a single line of the form:

EXECUTE_FUNCTION: functionName(arg1, arg2)

Use at most one function call per reply. String arguments do not need \
quotes. Omit optional arguments to use their defaults. After the result \
comes back it will be appended to your reply, so keep any surrounding \
text short.";

/// Assemble the full system prompt for one chat turn
pub fn build_system_prompt(
    agent: &AgentConfig,
    snapshot: Option<&InventorySummary>,
    catalog: &str,
) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str(agent.system_prompt.trim());

    if let Some(summary) = snapshot {
        prompt.push_str("\n\n## Current inventory snapshot\n");
        prompt.push_str(&format!(
            "{} products across {} categories, {} units in stock, total value ${:.2}. {} products are low on stock.",
            summary.total_products,
            summary.category_count,
            summary.total_quantity,
            summary.total_value,
            summary.low_stock_count,
        ));
    }

    prompt.push_str("\n\n## Available inventory functions\n");
    prompt.push_str(catalog);
    prompt.push_str("\n\n");
    prompt.push_str(CALL_INSTRUCTIONS);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> AgentConfig {
        AgentConfig {
            id: "a1".into(),
            name: "stock assistant".into(),
            provider_id: Some("p1".into()),
            system_prompt: "You are a helpful inventory assistant.".into(),
            model: None,
            temperature: None,
            max_tokens: None,
            active: true,
        }
    }

    #[test]
    fn test_prompt_contains_catalog_and_instructions() {
        let prompt = build_system_prompt(&agent(), None, "- searchProducts(query): find products");
        assert!(prompt.starts_with("You are a helpful inventory assistant."));
        assert!(prompt.contains("searchProducts(query)"));
        assert!(prompt.contains("EXECUTE_FUNCTION: functionName(arg1, arg2)"));
    }

    #[test]
    fn test_snapshot_is_rendered_when_present() {
        let summary = InventorySummary {
            total_products: 120,
            total_quantity: 4500,
            total_value: 98765.43,
            low_stock_count: 7,
            category_count: 9,
        };
        let prompt = build_system_prompt(&agent(), Some(&summary), "- fns");
        assert!(prompt.contains("120 products across 9 categories"));
        assert!(prompt.contains("$98765.43"));
        assert!(prompt.contains("7 products are low on stock"));
    }

    #[test]
    fn test_missing_snapshot_is_omitted() {
        let prompt = build_system_prompt(&agent(), None, "- fns");
        assert!(!prompt.contains("inventory snapshot"));
    }
}
