//! HTTP handlers for audit API operations.

pub mod discrepancies;
pub mod events;
pub mod health;
pub mod runs;

pub use discrepancies::*;
pub use events::*;
pub use health::*;
pub use runs::*;
