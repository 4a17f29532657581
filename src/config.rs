//! Configuration types for the Flat OPC codec.
//!
//! # Examples
//!
//! ```rust
//! use opcpack::config::{DirectParseMode, FlatOptions};
//!
//! // Create with defaults
//! let options = FlatOptions::default();
//!
//! // Or customize
//! let options = FlatOptions::new()
//!     .with_direct_parse(DirectParseMode::Strict)
//!     .with_progid(Some("Word.Document"));
//! ```

use serde::{Deserialize, Serialize};

/// How [`FlatCodec::parse`](crate::flat::FlatCodec::parse) treats a document whose
/// parse result lacks relationship parts.
///
/// Direct parsing consumes relationship-part elements into relationship sets
/// without storing the parts themselves, so its result is not structurally
/// complete whenever the document has relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectParseMode {
    /// Return the incomplete package as is.
    #[default]
    Permissive,
    /// Fail with [`OpcError::PackageIntegrity`](crate::OpcError::PackageIntegrity).
    Strict,
    /// Stage the package through the archive form, which yields a complete one.
    AutoStage,
}

/// Configuration options for reading and writing Flat OPC documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatOptions {
    /// Behaviour of the direct parse entry point
    pub direct_parse: DirectParseMode,
    /// `progid` of the `mso-application` processing instruction written ahead of
    /// the package element, if any
    pub progid: Option<String>,
    /// Column at which base64 payloads are wrapped; 0 disables wrapping
    pub binary_line_width: usize,
}

impl Default for FlatOptions {
    fn default() -> Self {
        Self {
            direct_parse: DirectParseMode::Permissive,
            progid: None,
            binary_line_width: 76,
        }
    }
}

impl FlatOptions {
    /// Create a new `FlatOptions` with default values.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the direct parse behaviour.
    #[inline]
    pub fn with_direct_parse(mut self, mode: DirectParseMode) -> Self {
        self.direct_parse = mode;
        self
    }

    /// Set the `mso-application` progid, e.g. `Word.Document`.
    #[inline]
    pub fn with_progid(mut self, progid: Option<&str>) -> Self {
        self.progid = progid.map(str::to_string);
        self
    }

    /// Set the base64 line width.
    #[inline]
    pub fn with_binary_line_width(mut self, width: usize) -> Self {
        self.binary_line_width = width;
        self
    }
}
