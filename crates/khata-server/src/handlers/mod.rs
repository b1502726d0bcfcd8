//! HTTP request handlers organized by domain

pub mod accounts;
pub mod categories;
pub mod imports;
pub mod ledger;
pub mod profiles;
pub mod rules;

// Re-export all handlers for use in router
pub use accounts::*;
pub use categories::*;
pub use imports::*;
pub use ledger::*;
pub use profiles::*;
pub use rules::*;
