//! Argus Redaction
//!
//! Replaces sensitive values in case data with stable placeholder tokens
//! and reverses the substitution on final output.
//!
//! - [`mask`] / [`mask_with`]: walk a JSON value and substitute every
//!   pattern match and every value under a sensitive key
//! - [`unmask`]: restore originals in text, total and idempotent
//! - [`remask`]: re-apply placeholders to human-edited text
//!
//! # Example
//!
//! ```rust,ignore
//! use argus_redaction::{mask, unmask};
//!
//! let (redacted, map) = mask(&serde_json::json!({"name": "Jane Roe"}));
//! assert_eq!(redacted["name"], "[NAME_000]");
//! assert_eq!(unmask("[NAME_000] opened the account", &map), "Jane Roe opened the account");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod mask;
mod patterns;
mod reverse;

pub use error::RedactionError;
pub use mask::{mask, mask_with};
pub use patterns::{is_sensitive_key, SENSITIVE_KEYS};
pub use reverse::{remask, unmask, unmask_strict, unresolved_placeholders};
