//! # Code Resolver
//!
//! Turns whatever the counter captured (a typed string, a keyboard-wedge
//! scanner burst, the text a camera decoder produced) into a catalog
//! identifier, or says it could not.
//!
//! ```text
//! raw token ──► CodeResolver::resolve ──┬──► Resolution::Identifier("BRK001") ──► Engine
//!                                       └──► Resolution::NotRecognized         ──► "scan again"
//! ```
//!
//! The engine only ever receives `Resolution::Identifier`. It never parses
//! raw scanner payloads, so swapping Code128 labels for QR stickers touches
//! nothing but the resolver.

use serde::{Deserialize, Serialize};

use crate::validation::validate_identifier;

/// Result of resolving a raw token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "identifier", rename_all = "camelCase")]
pub enum Resolution {
    /// Token maps to this identifier (it may still be absent from the catalog).
    Identifier(String),
    /// Token is not a usable identifier.
    NotRecognized,
}

impl Resolution {
    /// The resolved identifier, if any.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Resolution::Identifier(id) => Some(id),
            Resolution::NotRecognized => None,
        }
    }
}

/// Maps a raw token to a candidate identifier.
pub trait CodeResolver: Send + Sync {
    fn resolve(&self, raw: &str) -> Resolution;
}

/// Resolver for typed input and keyboard-wedge barcode scanners.
///
/// ## Cleanup Steps
/// ```text
/// "]C0BRK001\r\n"
///      │ strip whitespace / control chars (scanners append CR or LF)
///      ▼
/// "]C0BRK001"
///      │ strip AIM symbology prefix (]C0 = Code128, ]Q1 = QR, ...)
///      ▼
/// "BRK001"
///      │ identifier format check
///      ▼
/// Resolution::Identifier("BRK001")
/// ```
#[derive(Debug, Clone)]
pub struct ManualEntryResolver {
    strip_symbology_prefix: bool,
}

impl Default for ManualEntryResolver {
    fn default() -> Self {
        ManualEntryResolver {
            strip_symbology_prefix: true,
        }
    }
}

impl ManualEntryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps `]xx` prefixes instead of stripping them.
    pub fn keep_symbology_prefix(mut self) -> Self {
        self.strip_symbology_prefix = false;
        self
    }
}

impl CodeResolver for ManualEntryResolver {
    fn resolve(&self, raw: &str) -> Resolution {
        let token = raw.trim_matches(|c: char| c.is_whitespace() || c.is_control());

        let token = if self.strip_symbology_prefix {
            strip_aim_prefix(token)
        } else {
            token
        };

        match validate_identifier(token) {
            Ok(()) => Resolution::Identifier(token.to_string()),
            Err(_) => Resolution::NotRecognized,
        }
    }
}

/// AIM symbology identifiers are `]` followed by two ASCII characters.
fn strip_aim_prefix(token: &str) -> &str {
    let bytes = token.as_bytes();
    if bytes.len() > 3
        && bytes[0] == b']'
        && bytes[1].is_ascii_alphabetic()
        && bytes[2].is_ascii_alphanumeric()
    {
        &token[3..]
    } else {
        token
    }
}
