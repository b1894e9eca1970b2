//! Domain entities and value objects
//!
//! - `TokenRecord` - one authenticated session's credential and expiry
//! - `ConnectionStatus` - derived view of the session slot

mod token;

pub use token::{ConnectionStatus, TokenRecord};
