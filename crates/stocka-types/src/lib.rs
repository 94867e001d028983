pub mod chat;
pub mod functions;
pub mod inventory;
pub mod provider;
pub mod records;

pub use chat::*;
pub use functions::*;
pub use inventory::*;
pub use provider::*;
pub use records::*;
