//! Reference sanitizers for GuardSpine evidence.
//!
//! - [`RegexSanitizer`]: in-process patterns with salted HMAC tokens
//! - [`CommandSanitizer`]: external program fed through a temp file
//! - [`RemoteSanitizer`]: HTTP sanitization service

pub mod command;
pub mod error;
pub mod pattern;
pub mod remote;

pub use command::{CommandSanitizer, CommandSanitizerConfig};
pub use error::{RedactionError, Result};
pub use pattern::{PatternRule, RegexSanitizer, DEFAULT_RULES};
pub use remote::{RemoteSanitizer, RemoteSanitizerConfig};
