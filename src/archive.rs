//! Archive (ZIP) form of a package.
//!
//! [`ArchiveCodec::load`] turns archive bytes into a [`PartStore`];
//! [`ArchiveCodec::save`] writes a store back out. Saving always refreshes or
//! synthesizes relationship parts from the in-memory relationship sets, so a saved
//! archive is structurally complete and so is any store loaded from one.

use crate::constants::content_type as ct;
use crate::content_types::ContentTypeMap;
use crate::error::{OpcError, Result};
use crate::packuri::{CONTENT_TYPES_URI, PackURI};
use crate::part::Part;
use crate::phys_pkg::{PhysPkgReader, PhysPkgWriter};
use crate::rel::Relationships;
use crate::store::PartStore;
use std::borrow::Cow;
use std::io::{Cursor, Read, Seek, Write};
use tracing::{debug, warn};

/// Reads and writes the compressed multi-entry archive form.
pub struct ArchiveCodec;

impl ArchiveCodec {
    /// Load a package from archive bytes.
    pub fn load(bytes: &[u8]) -> Result<PartStore> {
        Self::load_from_reader(Cursor::new(bytes))
    }

    /// Load a package from a seekable reader.
    ///
    /// Every member except `[Content_Types].xml` becomes a part, in archive order,
    /// with its content type resolved through the Content-Type Table. Every
    /// relationship part whose source is present is also read into that source's
    /// relationship set.
    ///
    /// Fails with [`OpcError::MalformedArchive`] if the archive or one of its
    /// reserved members cannot be read, and with [`OpcError::UnknownContentType`]
    /// if a member has no resolvable content type.
    pub fn load_from_reader<R: Read + Seek>(reader: R) -> Result<PartStore> {
        let members = PhysPkgReader::new(reader)?.read_all()?;

        let content_types_member = CONTENT_TYPES_URI.trim_start_matches('/');
        let content_types_xml = members
            .iter()
            .find(|(name, _)| name == content_types_member)
            .map(|(_, blob)| blob)
            .ok_or_else(|| OpcError::MalformedArchive(format!("missing {}", CONTENT_TYPES_URI)))?;
        let content_types = ContentTypeMap::from_xml(content_types_xml)
            .map_err(|e| OpcError::MalformedArchive(format!("{}: {}", CONTENT_TYPES_URI, e)))?;

        let mut store = PartStore::with_content_types(content_types);
        let mut rels_parts = Vec::new();

        for (name, blob) in members {
            if name == content_types_member {
                continue;
            }

            let partname = PackURI::from_membername(&name)?;
            let content_type = store.content_types().resolve(&partname, None)?;
            if partname.is_rels_part() {
                rels_parts.push(partname.clone());
            }
            store
                .insert_loaded_part(Part::new(partname, content_type, blob))
                .map_err(|e| OpcError::MalformedArchive(e.to_string()))?;
        }

        for rels_uri in rels_parts {
            let Some(source) = rels_uri.source_uri() else {
                continue;
            };
            if !store.is_source(&source) {
                warn!(rels = %rels_uri, source = %source, "relationship part without source, kept as plain part");
                continue;
            }

            let blob = store.get_part(&rels_uri)?.blob();
            let rels = Relationships::from_xml(blob, source.base_uri())
                .map_err(|e| OpcError::MalformedArchive(format!("{}: {}", rels_uri, e)))?;
            store.set_relationships(source, rels);
        }

        debug!(
            parts = store.part_count(),
            sources = store.sources().len(),
            "loaded archive package"
        );
        Ok(store)
    }

    /// Save a package to archive bytes.
    pub fn save(store: &PartStore) -> Result<Vec<u8>> {
        Ok(Self::save_to_writer(store, Cursor::new(Vec::new()))?.into_inner())
    }

    /// Save a package into a seekable sink and hand the sink back.
    ///
    /// Writes `[Content_Types].xml`, then every part in [`PartStore::parts`] order.
    /// A relationship part of a known source whose payload no longer matches the
    /// source's relationship set is rewritten from the set; sources that own
    /// relationships but have no relationship part get one appended.
    pub fn save_to_writer<W: Write + Seek>(store: &PartStore, sink: W) -> Result<W> {
        let mut writer = PhysPkgWriter::new(sink);

        let mut content_types = store.content_types().clone();
        if content_types.default_for("rels").is_none() {
            content_types.add_default("rels", ct::OPC_RELATIONSHIPS);
        }
        let content_types_uri = PackURI::new(CONTENT_TYPES_URI)?;
        writer.write(&content_types_uri, content_types.to_xml().as_bytes())?;

        let mut refreshed = 0usize;
        for part in store.parts() {
            let blob: Cow<'_, [u8]> = match part.partname().source_uri() {
                Some(source) if store.is_source(&source) && !store.rels_part_matches(&source) => {
                    refreshed += 1;
                    Cow::Owned(Self::rels_xml(store, &source).into_bytes())
                },
                _ => Cow::Borrowed(part.blob()),
            };
            writer.write(part.partname(), &blob)?;
        }

        let mut synthesized = 0usize;
        for source in store.sources() {
            let rels_uri = source.rels_uri();
            if !store.contains_part(&rels_uri) {
                synthesized += 1;
                writer.write(&rels_uri, Self::rels_xml(store, source).as_bytes())?;
            }
        }

        debug!(
            parts = store.part_count(),
            refreshed,
            synthesized,
            "saved archive package"
        );
        writer.finish()
    }

    fn rels_xml(store: &PartStore, source: &PackURI) -> String {
        match store.relationships(source) {
            Some(rels) => rels.to_xml(),
            None => Relationships::for_source(source).to_xml(),
        }
    }
}
