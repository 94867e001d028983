//! Function registry and call parser for the agent layer
//!
//! A model response may embed one `EXECUTE_FUNCTION: name(args)` directive.
//! This crate finds it, binds the textual arguments against the declared
//! parameter table, runs the query through the result cache, reports every
//! call to the performance monitor, and renders the result as short
//! human-readable text. Parse and execution failures surface as an `error`
//! field on the outcome, never as a panic or error past this boundary.

pub mod error;
pub mod format;
pub mod parser;
pub mod reader;
pub mod registry;

pub use error::FunctionCallError;
pub use parser::{parse_directive, strip_directive};
pub use reader::InventoryReader;
pub use registry::{FunctionCallOutcome, FunctionRegistry, RegistryConfig};
