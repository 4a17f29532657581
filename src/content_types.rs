//! Content-Type Table of a package.
//!
//! Implements the OPC content type discovery algorithm using Default and Override
//! elements from `[Content_Types].xml`, and the reverse mapping used when a package
//! is written back out.

use crate::constants::{content_type as ct, namespace};
use crate::error::{OpcError, Result};
use crate::escape::escape_xml;
use crate::packuri::PackURI;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;

/// Package-wide mapping from extension (Default) or exact partname (Override) to
/// content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTypeMap {
    /// Maps lower-cased file extensions to default content types
    defaults: HashMap<String, String>,

    /// Maps specific partnames to override content types
    overrides: HashMap<String, String>,
}

impl ContentTypeMap {
    /// Create an empty map.
    pub fn empty() -> Self {
        Self {
            defaults: HashMap::new(),
            overrides: HashMap::new(),
        }
    }

    /// Create a map with the standard `rels` and `xml` defaults every package carries.
    pub fn new() -> Self {
        let mut map = Self::empty();
        map.add_default("rels", ct::OPC_RELATIONSHIPS);
        map.add_default("xml", ct::XML);
        map
    }

    /// Parse content types from `[Content_Types].xml`.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut map = Self::empty();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let is_default = match e.local_name().as_ref() {
                        b"Default" => Some(true),
                        b"Override" => Some(false),
                        _ => None,
                    };

                    if let Some(is_default) = is_default {
                        let mut key = None;
                        let mut content_type = None;

                        for attr in e.attributes() {
                            let attr = attr?;
                            let value = attr
                                .unescape_value()
                                .map_err(|e| OpcError::Xml(e.to_string()))?;
                            match attr.key.as_ref() {
                                b"Extension" | b"PartName" => key = Some(value.into_owned()),
                                b"ContentType" => content_type = Some(value.into_owned()),
                                _ => {},
                            }
                        }

                        match (key, content_type) {
                            (Some(ext), Some(ct)) if is_default => map.add_default(&ext, ct),
                            (Some(partname), Some(ct)) => map.add_override(partname, ct),
                            _ => {},
                        }
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(OpcError::Xml(format!("Content types parse error: {}", e)));
                },
                _ => {},
            }
            buf.clear();
        }

        Ok(map)
    }

    /// Add a default content type mapping for a file extension.
    pub fn add_default(&mut self, extension: &str, content_type: impl Into<String>) {
        self.defaults
            .insert(extension.to_lowercase(), content_type.into());
    }

    /// Add an override content type mapping for a specific partname.
    pub fn add_override(&mut self, partname: impl Into<String>, content_type: impl Into<String>) {
        self.overrides.insert(partname.into(), content_type.into());
    }

    /// Remove the override registered for a partname, if any.
    pub fn remove_override(&mut self, partname: &str) -> Option<String> {
        self.overrides.remove(partname)
    }

    pub fn default_for(&self, extension: &str) -> Option<&str> {
        self.defaults
            .get(&extension.to_lowercase())
            .map(String::as_str)
    }

    pub fn override_for(&self, partname: &str) -> Option<&str> {
        self.overrides.get(partname).map(String::as_str)
    }

    /// Resolve the content type of a part.
    ///
    /// Precedence: an explicit type supplied by the caller, then an Override
    /// registered for this exact partname, then the Default for its extension.
    /// Fails with [`OpcError::UnknownContentType`] when none applies.
    pub fn resolve(&self, pack_uri: &PackURI, explicit: Option<&str>) -> Result<String> {
        if let Some(ct) = explicit {
            return Ok(ct.to_string());
        }

        if let Some(ct) = self.override_for(pack_uri.as_str()) {
            return Ok(ct.to_string());
        }

        self.default_for(pack_uri.ext())
            .map(str::to_string)
            .ok_or_else(|| OpcError::UnknownContentType(pack_uri.to_string()))
    }

    /// Make sure `pack_uri` resolves to `content_type`.
    ///
    /// Uses a Default mapping if the extension/type pair is a well-known one and no
    /// other Default claims the extension, otherwise an Override for the partname.
    pub fn register(&mut self, pack_uri: &PackURI, content_type: &str) {
        let ext = pack_uri.ext();
        let default = self.default_for(ext);

        if default == Some(content_type) {
            // A stale override would shadow the default
            self.overrides.remove(pack_uri.as_str());
            return;
        }

        if default.is_none() && !ext.is_empty() && Self::is_default_content_type(ext, content_type)
        {
            self.add_default(ext, content_type);
            self.overrides.remove(pack_uri.as_str());
        } else {
            self.add_override(pack_uri.as_str(), content_type);
        }
    }

    /// Check if an extension/content-type pair is a standard default.
    fn is_default_content_type(ext: &str, content_type: &str) -> bool {
        matches!(
            (ext.to_lowercase().as_str(), content_type),
            ("rels", ct::OPC_RELATIONSHIPS)
                | ("xml", ct::XML)
                | ("png", ct::PNG)
                | ("jpg", ct::JPEG)
                | ("jpeg", ct::JPEG)
                | ("gif", ct::GIF)
                | ("emf", ct::X_EMF)
                | ("wmf", ct::X_WMF)
                | ("bin", ct::OCTET_STREAM)
        )
    }

    pub fn defaults(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defaults.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.overrides.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Generate the XML for `[Content_Types].xml`.
    ///
    /// Defaults are sorted by extension and Overrides by partname so the output
    /// is deterministic.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + 128 * (self.defaults.len() + self.overrides.len()));

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(r#"<Types xmlns=""#);
        xml.push_str(namespace::OPC_CONTENT_TYPES);
        xml.push_str(r#"">"#);

        let mut exts: Vec<_> = self.defaults.iter().collect();
        exts.sort();
        for (ext, content_type) in exts {
            xml.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(content_type)
            ));
        }

        let mut partnames: Vec<_> = self.overrides.iter().collect();
        partnames.sort();
        for (partname, content_type) in partnames {
            xml.push_str(&format!(
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(partname),
                escape_xml(content_type)
            ));
        }

        xml.push_str("</Types>");
        xml
    }
}

impl Default for ContentTypeMap {
    fn default() -> Self {
        Self::new()
    }
}
