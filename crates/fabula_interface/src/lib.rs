//! Trait definitions for fabula provider drivers and environment capabilities.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod traits;

pub use traits::{CredentialReselector, ProviderDriver, StructuredTask};
