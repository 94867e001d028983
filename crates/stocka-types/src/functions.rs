//! The callable function catalogue with type-safe names
//!
//! Every database query the model may trigger is declared here as an enum
//! variant with a parameter table, so that parsing, dispatch, caching and
//! invalidation all agree on one set of names instead of scattered strings.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Names of the registered read-only inventory queries.
///
/// The wire grammar matches these case-insensitively, so
/// `SEARCHPRODUCTS` and `searchProducts` resolve to the same variant.
#[derive(
    Debug,
    Clone,
    Copy,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum FunctionName {
    /// Free-text product search across name, SKU and category
    #[strum(serialize = "searchProducts")]
    #[serde(rename = "searchProducts")]
    SearchProducts,

    /// All products in a given category
    #[strum(serialize = "getProductsByCategory")]
    #[serde(rename = "getProductsByCategory")]
    GetProductsByCategory,

    /// Single product lookup by SKU
    #[strum(serialize = "getProductBySku")]
    #[serde(rename = "getProductBySku")]
    GetProductBySku,

    /// Products at or below a stock threshold
    #[strum(serialize = "getLowStockItems")]
    #[serde(rename = "getLowStockItems")]
    GetLowStockItems,

    /// Products whose total value exceeds a threshold
    #[strum(serialize = "getHighValueItems")]
    #[serde(rename = "getHighValueItems")]
    GetHighValueItems,

    /// Total monetary value of the inventory
    #[strum(serialize = "getTotalInventoryValue")]
    #[serde(rename = "getTotalInventoryValue")]
    GetTotalInventoryValue,

    /// Aggregate inventory statistics
    #[strum(serialize = "getInventorySummary")]
    #[serde(rename = "getInventorySummary")]
    GetInventorySummary,

    /// Most recent stock transactions
    #[strum(serialize = "getRecentTransactions")]
    #[serde(rename = "getRecentTransactions")]
    GetRecentTransactions,

    /// Transaction aggregates over a trailing window
    #[strum(serialize = "getTransactionStats")]
    #[serde(rename = "getTransactionStats")]
    GetTransactionStats,

    /// Warehouse slot occupancy by zone
    #[strum(serialize = "getWarehouseOccupancy")]
    #[serde(rename = "getWarehouseOccupancy")]
    GetWarehouseOccupancy,
}

/// Declared type of a function parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamType {
    String,
    Number,
}

/// One positional parameter in a function signature
#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub param_type: ParamType,
    pub required: bool,
    /// Substituted when an optional parameter is omitted
    pub default: Option<ArgValue>,
}

impl ParamSpec {
    /// A required parameter with no default
    pub fn required(name: &'static str, param_type: ParamType) -> Self {
        Self {
            name,
            param_type,
            required: true,
            default: None,
        }
    }

    /// An optional numeric parameter with a default value
    pub fn optional_number(name: &'static str, default: f64) -> Self {
        Self {
            name,
            param_type: ParamType::Number,
            required: false,
            default: Some(ArgValue::Number(default)),
        }
    }
}

/// A parsed argument value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Text(String),
    Number(f64),
}

impl ArgValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl std::fmt::Display for ArgValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A validated call: the structured form every wire format is parsed into
/// before dispatch. `args` is positional, aligned with [`FunctionName::params`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: FunctionName,
    pub args: Vec<ArgValue>,
}

impl FunctionCall {
    pub fn new(name: FunctionName, args: Vec<ArgValue>) -> Self {
        Self { name, args }
    }

    /// Positional string argument accessor
    pub fn text_arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(ArgValue::as_text)
    }

    /// Positional numeric argument accessor
    pub fn number_arg(&self, index: usize) -> Option<f64> {
        self.args.get(index).and_then(ArgValue::as_number)
    }
}

impl FunctionName {
    /// Ordered parameter table for this function
    pub fn params(&self) -> Vec<ParamSpec> {
        match self {
            Self::SearchProducts => vec![ParamSpec::required("query", ParamType::String)],
            Self::GetProductsByCategory => {
                vec![ParamSpec::required("category", ParamType::String)]
            }
            Self::GetProductBySku => vec![ParamSpec::required("sku", ParamType::String)],
            Self::GetLowStockItems => vec![ParamSpec::optional_number("threshold", 10.0)],
            Self::GetHighValueItems => vec![ParamSpec::optional_number("threshold", 1000.0)],
            Self::GetTotalInventoryValue => vec![],
            Self::GetInventorySummary => vec![],
            Self::GetRecentTransactions => vec![ParamSpec::optional_number("limit", 10.0)],
            Self::GetTransactionStats => vec![ParamSpec::optional_number("days", 30.0)],
            Self::GetWarehouseOccupancy => vec![],
        }
    }

    /// Short description used in the model-facing catalogue listing
    pub fn description(&self) -> &'static str {
        match self {
            Self::SearchProducts => "Search products by free text over name, SKU and category",
            Self::GetProductsByCategory => "List all products in a category",
            Self::GetProductBySku => "Look up one product by its SKU",
            Self::GetLowStockItems => "List products at or below a stock threshold",
            Self::GetHighValueItems => "List products whose total value exceeds a threshold",
            Self::GetTotalInventoryValue => "Total monetary value of all stock",
            Self::GetInventorySummary => "Aggregate statistics for the whole inventory",
            Self::GetRecentTransactions => "Most recent stock movements",
            Self::GetTransactionStats => "Transaction totals over the last N days",
            Self::GetWarehouseOccupancy => "Warehouse slot occupancy per zone",
        }
    }

    /// `name(param, param)` signature string for prompts and error listings
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params()
            .iter()
            .map(|p| {
                if p.required {
                    p.name.to_string()
                } else {
                    match &p.default {
                        Some(d) => format!("{}={d}", p.name),
                        None => format!("{}?", p.name),
                    }
                }
            })
            .collect();
        format!("{}({})", self, params.join(", "))
    }

    /// Every registered function name
    pub fn all() -> Vec<FunctionName> {
        Self::iter().collect()
    }

    /// Parse a name from the wire, case-insensitively
    pub fn from_str_safe(s: &str) -> Option<Self> {
        s.parse::<Self>().ok()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_name_round_trip() {
        let name = FunctionName::SearchProducts;
        assert_eq!(name.to_string(), "searchProducts");
        let parsed: FunctionName = "searchProducts".parse().unwrap();
        assert_eq!(parsed, name);
    }

    #[test]
    fn test_serde_uses_wire_names() {
        // Display, cache keys, the catalogue and serde must all agree on
        // the camelCase wire name.
        let json = serde_json::to_value(FunctionName::SearchProducts).unwrap();
        assert_eq!(json, "searchProducts");
        let parsed: FunctionName = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, FunctionName::SearchProducts);
        assert_eq!(
            serde_json::to_value(FunctionName::GetWarehouseOccupancy).unwrap(),
            "getWarehouseOccupancy"
        );
    }

    #[test]
    fn test_case_insensitive_parse() {
        let parsed = FunctionName::from_str_safe("SEARCHPRODUCTS").unwrap();
        assert_eq!(parsed, FunctionName::SearchProducts);
        let parsed = FunctionName::from_str_safe("getlowstockitems").unwrap();
        assert_eq!(parsed, FunctionName::GetLowStockItems);
    }

    #[test]
    fn test_unknown_name_rejected() {
        assert!(FunctionName::from_str_safe("dropAllTables").is_none());
    }

    #[test]
    fn test_param_tables() {
        let params = FunctionName::GetHighValueItems.params();
        assert_eq!(params.len(), 1);
        assert!(!params[0].required);
        assert_eq!(params[0].default, Some(ArgValue::Number(1000.0)));

        assert!(FunctionName::GetTotalInventoryValue.params().is_empty());

        let params = FunctionName::GetProductsByCategory.params();
        assert!(params[0].required);
        assert_eq!(params[0].param_type, ParamType::String);
    }

    #[test]
    fn test_signature_rendering() {
        assert_eq!(
            FunctionName::GetLowStockItems.signature(),
            "getLowStockItems(threshold=10)"
        );
        assert_eq!(
            FunctionName::SearchProducts.signature(),
            "searchProducts(query)"
        );
    }

    #[test]
    fn test_catalogue_is_complete() {
        assert_eq!(FunctionName::all().len(), 10);
    }
}
