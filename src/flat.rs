//! Flat OPC form of a package.
//!
//! A Flat OPC document is a single XML document holding every part of a package
//! as a `pkg:part` element, with XML payloads inlined under `pkg:xmlData` and
//! everything else base64-encoded under `pkg:binaryData`.
//!
//! Relationship parts are not stored as parts by [`FlatCodec::parse`]: their
//! content is read into the relationship set of their source instead. A store
//! produced that way is therefore not structurally complete whenever the document
//! has relationships. [`FlatCodec::parse_staged`] saves the direct result to the
//! archive form and loads it back, which yields a complete store.

use crate::archive::ArchiveCodec;
use crate::config::{DirectParseMode, FlatOptions};
use crate::constants::{flat, namespace};
use crate::error::{OpcError, Result};
use crate::escape::escape_xml;
use crate::packuri::PackURI;
use crate::rel::Relationships;
use crate::store::PartStore;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashSet;
use std::io::Cursor;
use tracing::{debug, trace, warn};

/// Reads and writes the single-document Flat OPC form.
#[derive(Debug, Clone, Default)]
pub struct FlatCodec {
    options: FlatOptions,
}

/// A `pkg:part` element read from the document.
struct FlatPart {
    partname: PackURI,
    content_type: Option<String>,
    blob: Vec<u8>,
}

impl FlatCodec {
    pub fn new(options: FlatOptions) -> Self {
        Self { options }
    }

    #[inline]
    pub fn options(&self) -> &FlatOptions {
        &self.options
    }

    /// Parse a Flat OPC document directly into a store.
    ///
    /// Ordinary parts are added in document order. Relationship-part elements
    /// (reserved `_rels/*.rels` names) are read into their source's relationship set
    /// and are not stored as parts; those whose source is absent are dropped. What happens to the resulting
    /// incomplete store is governed by [`FlatOptions::direct_parse`].
    ///
    /// # Errors
    ///
    /// - [`OpcError::Xml`] for malformed XML or a document without a package element
    /// - [`OpcError::Base64`] for an undecodable binary payload
    /// - [`OpcError::DuplicatePart`] if two part elements share a partname
    /// - [`OpcError::PackageIntegrity`] in [`DirectParseMode::Strict`] when the
    ///   result is incomplete
    pub fn parse(&self, text: &str) -> Result<PartStore> {
        let store = Self::parse_direct(text)?;

        match self.options.direct_parse {
            DirectParseMode::Permissive => Ok(store),
            DirectParseMode::Strict => {
                store.check_integrity()?;
                Ok(store)
            },
            DirectParseMode::AutoStage => Self::stage(store, &mut Vec::new()),
        }
    }

    /// Parse a Flat OPC document by staging it through the archive form.
    ///
    /// The direct parse result is saved into `scratch` (cleared first) and the
    /// returned store is loaded back from it, so it is structurally complete and
    /// lists the relationship parts among its parts.
    pub fn parse_staged(&self, text: &str, scratch: &mut Vec<u8>) -> Result<PartStore> {
        let store = Self::parse_direct(text)?;
        Self::stage(store, scratch)
    }

    fn stage(store: PartStore, scratch: &mut Vec<u8>) -> Result<PartStore> {
        scratch.clear();
        ArchiveCodec::save_to_writer(&store, Cursor::new(&mut *scratch))?;
        drop(store);

        debug!(size = scratch.len(), "staged flat package through archive form");
        ArchiveCodec::load(scratch)
    }

    fn parse_direct(text: &str) -> Result<PartStore> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut store = PartStore::new();
        let mut rels_parts: Vec<FlatPart> = Vec::new();
        let mut rels_names: HashSet<PackURI> = HashSet::new();
        let mut current: Option<FlatPart> = None;
        let mut seen_package = false;

        loop {
            match reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    flat::PACKAGE => seen_package = true,
                    flat::PART => current = Some(Self::part_header(&e)?),
                    flat::XML_DATA => {
                        let span = reader.read_to_end(e.name())?;
                        let inner = Self::inner_text(text, span.start as usize, span.end as usize)?;
                        if let Some(part) = current.as_mut() {
                            part.blob = inner.trim().as_bytes().to_vec();
                        }
                    },
                    flat::BINARY_DATA => {
                        let span = reader.read_to_end(e.name())?;
                        let inner = Self::inner_text(text, span.start as usize, span.end as usize)?;
                        let compact: Vec<u8> = inner
                            .bytes()
                            .filter(|b| !b.is_ascii_whitespace())
                            .collect();
                        let blob = STANDARD.decode(compact)?;
                        if let Some(part) = current.as_mut() {
                            part.blob = blob;
                        }
                    },
                    _ => {},
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    flat::PACKAGE => seen_package = true,
                    flat::PART => {
                        let part = Self::part_header(&e)?;
                        Self::accept(&mut store, &mut rels_parts, &mut rels_names, part)?;
                    },
                    _ => {},
                },
                Event::End(e) if e.local_name().as_ref() == flat::PART => {
                    if let Some(part) = current.take() {
                        Self::accept(&mut store, &mut rels_parts, &mut rels_names, part)?;
                    }
                },
                Event::Eof => break,
                _ => {},
            }
        }

        if !seen_package {
            return Err(OpcError::Xml("missing pkg:package element".to_string()));
        }

        for rels_part in rels_parts {
            let Some(source) = rels_part.partname.source_uri() else {
                continue;
            };
            if !store.is_source(&source) {
                warn!(rels = %rels_part.partname, source = %source, "dropping relationships of absent source");
                continue;
            }
            let rels = Relationships::from_xml(&rels_part.blob, source.base_uri())?;
            store.set_relationships(source, rels);
        }

        debug!(
            parts = store.part_count(),
            sources = store.sources().len(),
            "parsed flat package"
        );
        Ok(store)
    }

    fn part_header(e: &BytesStart<'_>) -> Result<FlatPart> {
        let mut name = None;
        let mut content_type = None;

        for attr in e.attributes() {
            let attr = attr?;
            match attr.key.local_name().as_ref() {
                flat::NAME => {
                    let value = attr.unescape_value().map_err(|e| OpcError::Xml(e.to_string()))?;
                    name = Some(value.into_owned());
                },
                flat::CONTENT_TYPE => {
                    let value = attr.unescape_value().map_err(|e| OpcError::Xml(e.to_string()))?;
                    content_type = Some(value.into_owned());
                },
                _ => {},
            }
        }

        let name = name.ok_or_else(|| OpcError::Xml("pkg:part without pkg:name".to_string()))?;
        Ok(FlatPart {
            partname: PackURI::new(name)?,
            content_type,
            blob: Vec::new(),
        })
    }

    /// Route a part element: reserved `_rels/*.rels` names go to `rels_parts`,
    /// everything else is added to the store.
    fn accept(
        store: &mut PartStore,
        rels_parts: &mut Vec<FlatPart>,
        rels_names: &mut HashSet<PackURI>,
        part: FlatPart,
    ) -> Result<()> {
        if part.partname.is_rels_part() {
            if !rels_names.insert(part.partname.clone()) {
                return Err(OpcError::DuplicatePart(part.partname.to_string()));
            }
            trace!(partname = %part.partname, "read relationship part element");
            rels_parts.push(part);
            return Ok(());
        }

        let content_type = store
            .content_types()
            .resolve(&part.partname, part.content_type.as_deref())?;
        trace!(partname = %part.partname, size = part.blob.len(), "read part element");
        store.add_part(part.partname, content_type, part.blob)?;
        Ok(())
    }

    fn inner_text(text: &str, start: usize, end: usize) -> Result<&str> {
        text.get(start..end)
            .ok_or_else(|| OpcError::Xml(format!("element content out of range at {}", start)))
    }

    /// Write a store as a Flat OPC document.
    ///
    /// Exactly the store's parts are written, in [`PartStore::parts`] order;
    /// relationship parts appear only if the store holds them. XML payloads are
    /// inlined without their byte order mark and XML declaration. Other payloads,
    /// and XML payloads that are not valid UTF-8, are written base64-encoded.
    pub fn serialize(&self, store: &PartStore) -> Result<String> {
        let p = flat::PREFIX;
        let mut xml = String::with_capacity(
            store.parts().iter().map(|part| part.blob().len()).sum::<usize>() + 1024,
        );

        xml.push_str("<?xml version=\"1.0\" standalone=\"yes\"?>\n");
        if let Some(progid) = &self.options.progid {
            xml.push_str(&format!("<?mso-application progid=\"{}\"?>\n", escape_xml(progid)));
        }
        xml.push_str(&format!("<{p}:package xmlns:{p}=\"{}\">\n", namespace::FLAT_PACKAGE));

        let mut binary = 0usize;
        for part in store.parts() {
            let name = escape_xml(part.partname().as_str());
            let content_type = escape_xml(part.content_type());

            let inline = if part.is_xml() {
                std::str::from_utf8(part.blob()).ok()
            } else {
                None
            };

            match inline {
                Some(body) => {
                    xml.push_str(&format!(
                        "  <{p}:part {p}:name=\"{name}\" {p}:contentType=\"{content_type}\">\n    <{p}:xmlData>\n"
                    ));
                    xml.push_str(strip_declaration(body));
                    xml.push_str(&format!("\n    </{p}:xmlData>\n  </{p}:part>\n"));
                },
                None => {
                    binary += 1;
                    xml.push_str(&format!(
                        "  <{p}:part {p}:name=\"{name}\" {p}:contentType=\"{content_type}\" {p}:compression=\"store\">\n    <{p}:binaryData>"
                    ));
                    self.push_base64(&mut xml, part.blob());
                    xml.push_str(&format!("</{p}:binaryData>\n  </{p}:part>\n"));
                },
            }
        }

        xml.push_str(&format!("</{p}:package>\n"));

        debug!(parts = store.part_count(), binary, "serialized flat package");
        Ok(xml)
    }

    fn push_base64(&self, xml: &mut String, blob: &[u8]) {
        let encoded = STANDARD.encode(blob);
        let width = self.options.binary_line_width;
        if width == 0 || encoded.len() <= width {
            xml.push_str(&encoded);
            return;
        }

        // base64 output is ASCII, so any byte offset is a char boundary
        let mut start = 0;
        while start < encoded.len() {
            let end = (start + width).min(encoded.len());
            xml.push_str(&encoded[start..end]);
            if end < encoded.len() {
                xml.push('\n');
            }
            start = end;
        }
    }
}

/// Strip a leading byte order mark and XML declaration from an XML payload.
fn strip_declaration(xml: &str) -> &str {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml).trim_start();
    let is_declaration = xml.starts_with("<?xml")
        && xml[5..].starts_with(|c: char| c.is_ascii_whitespace() || c == '?');
    if !is_declaration {
        return xml.trim_end();
    }

    match memchr::memmem::find(xml.as_bytes(), b"?>") {
        Some(end) => xml[end + 2..].trim(),
        None => xml.trim_end(),
    }
}
