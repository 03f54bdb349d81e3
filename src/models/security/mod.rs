//! Secret handling for configuration values.

mod error;
mod secret;

pub use error::SecurityError;
pub use secret::{SecretString, SecretValue};
