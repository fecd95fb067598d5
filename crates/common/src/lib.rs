//! Types shared by the consent gateway crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
