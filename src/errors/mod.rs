//! # Error Handling
//!
//! Error taxonomy shared by the credential, token and annotation layers.

pub mod types;

pub use types::{Error, Result};
