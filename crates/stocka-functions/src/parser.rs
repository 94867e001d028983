//! Call-directive grammar
//!
//! Wire format: `EXECUTE_FUNCTION: <name>(<comma-separated literals>)`,
//! case-insensitive, one directive per response. Parsing produces a
//! structured [`FunctionCall`]; dispatch never sees the text form, so a
//! different wire format (e.g. native JSON tool calls) can be added without
//! touching execution.

use crate::error::FunctionCallError;
use regex::Regex;
use std::sync::OnceLock;
use stocka_types::{ArgValue, FunctionCall, FunctionName, ParamSpec, ParamType};

fn directive_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)EXECUTE_FUNCTION:\s*([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)")
            .expect("directive regex is valid")
    })
}

/// Find the first call directive in a model response.
///
/// Returns `None` when the text contains no directive; the caller then
/// passes the raw text through unmodified. A present-but-invalid directive
/// returns `Some(Err(..))` so the failure can be folded into the reply.
pub fn parse_directive(text: &str) -> Option<Result<FunctionCall, FunctionCallError>> {
    let captures = directive_regex().captures(text)?;
    let name_text = &captures[1];
    let args_text = &captures[2];

    let Some(name) = FunctionName::from_str_safe(name_text) else {
        let available = FunctionName::all()
            .iter()
            .map(|f| f.signature())
            .collect::<Vec<_>>()
            .join(", ");
        return Some(Err(FunctionCallError::UnknownFunction {
            name: name_text.to_string(),
            available,
        }));
    };

    Some(bind_args(name, args_text).map(|args| FunctionCall::new(name, args)))
}

/// Remove the first call directive from a model response, collapsing the
/// whitespace it leaves behind. Used when folding an executed result back
/// into the visible reply.
pub fn strip_directive(text: &str) -> String {
    match directive_regex().find(text) {
        None => text.to_string(),
        Some(found) => {
            let before = text[..found.start()].trim_end();
            let after = text[found.end()..].trim_start();
            if before.is_empty() {
                after.to_string()
            } else if after.is_empty() {
                before.to_string()
            } else {
                format!("{before}\n{after}")
            }
        }
    }
}

/// Split the inner argument text on commas, trim, and strip one layer of
/// surrounding quotes
fn split_raw_args(args_text: &str) -> Vec<String> {
    if args_text.trim().is_empty() {
        return Vec::new();
    }
    args_text
        .split(',')
        .map(|raw| {
            let trimmed = raw.trim();
            trimmed
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .or_else(|| {
                    trimmed
                        .strip_prefix('\'')
                        .and_then(|s| s.strip_suffix('\''))
                })
                .unwrap_or(trimmed)
                .to_string()
        })
        .collect()
}

/// Positionally bind raw argument text against the declared parameter table
fn bind_args(
    function: FunctionName,
    args_text: &str,
) -> Result<Vec<ArgValue>, FunctionCallError> {
    let raw = split_raw_args(args_text);
    let params = function.params();
    let mut bound = Vec::with_capacity(params.len());

    for (index, param) in params.iter().enumerate() {
        let value_text = raw.get(index).map(String::as_str).filter(|s| !s.is_empty());
        match value_text {
            Some(text) => bound.push(coerce(function, param, text)?),
            None if param.required => {
                return Err(FunctionCallError::MissingParameter {
                    function,
                    param: param.name,
                });
            }
            None => {
                // Optional parameter without a value takes its declared default.
                let default = param.default.clone().unwrap_or_else(|| match param.param_type {
                    ParamType::String => ArgValue::Text(String::new()),
                    ParamType::Number => ArgValue::Number(0.0),
                });
                bound.push(default);
            }
        }
    }

    Ok(bound)
}

fn coerce(
    function: FunctionName,
    param: &ParamSpec,
    text: &str,
) -> Result<ArgValue, FunctionCallError> {
    match param.param_type {
        ParamType::String => Ok(ArgValue::Text(text.to_string())),
        ParamType::Number => text
            .parse::<f64>()
            .map(ArgValue::Number)
            .map_err(|_| FunctionCallError::NotANumber {
                function,
                param: param.name,
                value: text.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_directive_yields_none() {
        assert!(parse_directive("The warehouse looks well stocked today.").is_none());
    }

    #[test]
    fn test_simple_directive_binds_string() {
        let call = parse_directive("EXECUTE_FUNCTION: searchProducts(blue pens)")
            .unwrap()
            .unwrap();
        assert_eq!(call.name, FunctionName::SearchProducts);
        assert_eq!(call.text_arg(0), Some("blue pens"));
    }

    #[test]
    fn test_directive_embedded_in_prose() {
        let text = "Let me check the stock.\nEXECUTE_FUNCTION: getLowStockItems(5)\nOne moment.";
        let call = parse_directive(text).unwrap().unwrap();
        assert_eq!(call.name, FunctionName::GetLowStockItems);
        assert_eq!(call.number_arg(0), Some(5.0));
    }

    #[test]
    fn test_case_insensitive_name_and_keyword() {
        let call = parse_directive("execute_function: SEARCHPRODUCTS('ink')")
            .unwrap()
            .unwrap();
        assert_eq!(call.name, FunctionName::SearchProducts);
        assert_eq!(call.text_arg(0), Some("ink"));
    }

    #[test]
    fn test_quotes_are_stripped() {
        let call = parse_directive(r#"EXECUTE_FUNCTION: getProductsByCategory("Stationery")"#)
            .unwrap()
            .unwrap();
        assert_eq!(call.text_arg(0), Some("Stationery"));
    }

    #[test]
    fn test_optional_parameter_takes_default() {
        let call = parse_directive("EXECUTE_FUNCTION: getHighValueItems()")
            .unwrap()
            .unwrap();
        assert_eq!(call.number_arg(0), Some(1000.0));
    }

    #[test]
    fn test_missing_required_parameter_names_it() {
        let err = parse_directive("EXECUTE_FUNCTION: getProductsByCategory()")
            .unwrap()
            .unwrap_err();
        match err {
            FunctionCallError::MissingParameter { param, .. } => assert_eq!(param, "category"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_numeric_argument_names_parameter() {
        let err = parse_directive("EXECUTE_FUNCTION: getLowStockItems(lots)")
            .unwrap()
            .unwrap_err();
        match err {
            FunctionCallError::NotANumber { param, value, .. } => {
                assert_eq!(param, "threshold");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_function_lists_catalogue() {
        let err = parse_directive("EXECUTE_FUNCTION: dropAllTables()")
            .unwrap()
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("dropAllTables"));
        assert!(message.contains("searchProducts"));
    }

    #[test]
    fn test_only_first_directive_is_recognized() {
        let text = "EXECUTE_FUNCTION: getTotalInventoryValue()\nEXECUTE_FUNCTION: searchProducts(x)";
        let call = parse_directive(text).unwrap().unwrap();
        assert_eq!(call.name, FunctionName::GetTotalInventoryValue);
    }

    #[test]
    fn test_strip_directive_collapses_whitespace() {
        let text = "Let me check.\nEXECUTE_FUNCTION: getLowStockItems(5)\nOne moment.";
        assert_eq!(strip_directive(text), "Let me check.\nOne moment.");
        assert_eq!(
            strip_directive("EXECUTE_FUNCTION: getInventorySummary()"),
            ""
        );
        assert_eq!(strip_directive("no directive here"), "no directive here");
    }

    #[test]
    fn test_multiple_arguments_split_on_commas() {
        // Extra positions beyond the table are ignored.
        let call = parse_directive("EXECUTE_FUNCTION: getRecentTransactions( 25 , extra )")
            .unwrap()
            .unwrap();
        assert_eq!(call.args.len(), 1);
        assert_eq!(call.number_arg(0), Some(25.0));
    }
}
