//! The in-memory package model.
//!
//! This module provides [`PartStore`], which owns every part and relationship of an
//! OPC package. Parts live in an insertion-ordered arena with a partname index, and
//! relationships are kept as an edge table keyed by source partname, so the
//! relationship graph (which may contain cycles) never forms an ownership cycle.

use crate::constants::{content_type as ct, relationship_type};
use crate::content_types::ContentTypeMap;
use crate::error::{OpcError, Result};
use crate::packuri::PackURI;
use crate::part::Part;
use crate::rel::{Relationship, Relationships};
use std::collections::HashMap;
use tracing::trace;

/// Main API type for working with an OPC package in memory.
///
/// A store is created empty, by [`ArchiveCodec::load`](crate::archive::ArchiveCodec::load)
/// or by [`FlatCodec::parse`](crate::flat::FlatCodec::parse), and is mutated only through
/// explicit part and relationship operations. Failed operations leave it unchanged.
#[derive(Debug, PartialEq)]
pub struct PartStore {
    /// All parts in insertion order
    parts: Vec<Part>,

    /// Partname to position in `parts`
    index: HashMap<String, usize>,

    /// Relationship sets keyed by source partname ("/" for the package)
    rels: HashMap<PackURI, Relationships>,

    /// Content-Type Table
    content_types: ContentTypeMap,
}

impl PartStore {
    /// Create a new empty package.
    pub fn new() -> Self {
        Self::with_content_types(ContentTypeMap::new())
    }

    /// Create an empty package around an existing Content-Type Table.
    pub fn with_content_types(content_types: ContentTypeMap) -> Self {
        Self {
            parts: Vec::new(),
            index: HashMap::new(),
            rels: HashMap::new(),
            content_types,
        }
    }

    /// Add a new part, failing with [`OpcError::DuplicatePart`] if the partname is taken.
    pub fn add_part(
        &mut self,
        partname: PackURI,
        content_type: impl Into<String>,
        blob: Vec<u8>,
    ) -> Result<&Part> {
        if self.contains_part(&partname) {
            return Err(OpcError::DuplicatePart(partname.to_string()));
        }
        Ok(self.add_or_replace_part(partname, content_type, blob))
    }

    /// Add a part, silently overwriting any part already stored under the partname.
    ///
    /// A replaced part keeps its position in [`PartStore::parts`].
    pub fn add_or_replace_part(
        &mut self,
        partname: PackURI,
        content_type: impl Into<String>,
        blob: Vec<u8>,
    ) -> &Part {
        let content_type = content_type.into();
        self.content_types.register(&partname, &content_type);

        let key = partname.to_string();
        let part = Part::new(partname, content_type, blob);
        let pos = match self.index.get(&key) {
            Some(&pos) => {
                trace!(partname = %key, "replacing part");
                self.parts[pos] = part;
                pos
            },
            None => {
                trace!(partname = %key, "adding part");
                self.parts.push(part);
                self.index.insert(key, self.parts.len() - 1);
                self.parts.len() - 1
            },
        };
        &self.parts[pos]
    }

    /// Store a part read from a serialized package without touching the
    /// Content-Type Table, which already describes it.
    pub(crate) fn insert_loaded_part(&mut self, part: Part) -> Result<()> {
        let key = part.partname().to_string();
        if self.index.contains_key(&key) {
            return Err(OpcError::DuplicatePart(key));
        }
        self.parts.push(part);
        self.index.insert(key, self.parts.len() - 1);
        Ok(())
    }

    /// Remove a part.
    ///
    /// Also drops the part's own relationship set, its relationship part and its
    /// content type override. Relationships from other sources that target the
    /// removed part are left as they are.
    pub fn remove_part(&mut self, partname: &PackURI) -> Option<Part> {
        let pos = self.index.remove(partname.as_str())?;
        let part = self.parts.remove(pos);
        for (i, p) in self.parts.iter().enumerate().skip(pos) {
            self.index.insert(p.partname().to_string(), i);
        }

        self.content_types.remove_override(partname.as_str());
        if self.rels.remove(partname).is_some() {
            trace!(partname = %partname, "dropped relationship set of removed part");
        }
        let rels_uri = partname.rels_uri();
        if self.contains_part(&rels_uri) {
            self.remove_part(&rels_uri);
        }

        Some(part)
    }

    /// Get a part by its partname.
    pub fn part(&self, partname: &PackURI) -> Option<&Part> {
        self.index.get(partname.as_str()).map(|&pos| &self.parts[pos])
    }

    /// Get a part by its partname, failing with [`OpcError::PartNotFound`].
    pub fn get_part(&self, partname: &PackURI) -> Result<&Part> {
        self.part(partname)
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    /// Check if a part exists in the package.
    #[inline]
    pub fn contains_part(&self, partname: &PackURI) -> bool {
        self.index.contains_key(partname.as_str())
    }

    /// All parts, in insertion order. The order is stable across calls.
    #[inline]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Partnames of all parts, in insertion order.
    pub fn partnames(&self) -> impl Iterator<Item = &PackURI> {
        self.parts.iter().map(Part::partname)
    }

    #[inline]
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Add a relationship to a source (the package or an existing part).
    ///
    /// Fails with [`OpcError::PartNotFound`] for an unknown source and with
    /// [`OpcError::InvalidRelationship`] if `r_id` is already used by the source.
    pub fn add_relationship(
        &mut self,
        source: &PackURI,
        r_id: impl Into<String>,
        reltype: impl Into<String>,
        target_ref: impl Into<String>,
        is_external: bool,
    ) -> Result<&Relationship> {
        self.ensure_source(source)?;
        self.rels
            .entry(source.clone())
            .or_insert_with(|| Relationships::for_source(source))
            .add_relationship(reltype, target_ref, r_id, is_external)
    }

    /// Relate a source to a target part, reusing an existing relationship of the
    /// same type and target. Returns the rId.
    pub fn relate_to(&mut self, source: &PackURI, target: &PackURI, reltype: &str) -> Result<String> {
        self.ensure_source(source)?;
        let target_ref = target.relative_ref(source.base_uri());
        Ok(self
            .rels
            .entry(source.clone())
            .or_insert_with(|| Relationships::for_source(source))
            .get_or_add(reltype, &target_ref))
    }

    /// Relate a source to an external URL. Returns the rId.
    pub fn relate_to_ext(&mut self, source: &PackURI, target_url: &str, reltype: &str) -> Result<String> {
        self.ensure_source(source)?;
        Ok(self
            .rels
            .entry(source.clone())
            .or_insert_with(|| Relationships::for_source(source))
            .get_or_add_ext_rel(reltype, target_url))
    }

    /// Remove a relationship by source and rId.
    pub fn remove_relationship(&mut self, source: &PackURI, r_id: &str) -> Result<Relationship> {
        let rels = self
            .rels
            .get_mut(source)
            .ok_or_else(|| OpcError::RelationshipNotFound(format!("{} {}", source, r_id)))?;
        let rel = rels
            .remove(r_id)
            .ok_or_else(|| OpcError::RelationshipNotFound(format!("{} {}", source, r_id)))?;
        if rels.is_empty() {
            self.rels.remove(source);
        }
        Ok(rel)
    }

    /// Get the relationship set owned by a source, if it owns any relationship.
    pub fn relationships(&self, source: &PackURI) -> Option<&Relationships> {
        self.rels.get(source).filter(|rels| !rels.is_empty())
    }

    /// Replace the relationship set of a source wholesale. Empty sets are dropped.
    pub(crate) fn set_relationships(&mut self, source: PackURI, rels: Relationships) {
        if rels.is_empty() {
            self.rels.remove(&source);
        } else {
            self.rels.insert(source, rels);
        }
    }

    /// Every source owning at least one relationship: the package first, then
    /// parts in [`PartStore::parts`] order.
    pub fn sources(&self) -> Vec<&PackURI> {
        let mut sources = Vec::with_capacity(self.rels.len());
        if let Some((source, _)) = self.rels.get_key_value(&PackURI::package()) {
            sources.push(source);
        }
        sources.extend(
            self.partnames()
                .filter(|name| self.relationships(name).is_some()),
        );
        sources
    }

    /// Check if a partname is a valid relationship source.
    #[inline]
    pub fn is_source(&self, source: &PackURI) -> bool {
        source.is_package() || self.contains_part(source)
    }

    fn ensure_source(&self, source: &PackURI) -> Result<()> {
        if self.is_source(source) {
            Ok(())
        } else {
            Err(OpcError::PartNotFound(source.to_string()))
        }
    }

    /// Get the main document part via the package-level officeDocument relationship.
    pub fn main_document_part(&self) -> Result<&Part> {
        let rels = self.relationships(&PackURI::package()).ok_or_else(|| {
            OpcError::RelationshipNotFound("package has no relationships".to_string())
        })?;
        let rel = rels.part_with_reltype(relationship_type::OFFICE_DOCUMENT)?;
        self.get_part(&rel.target_partname()?)
    }

    #[inline]
    pub fn content_types(&self) -> &ContentTypeMap {
        &self.content_types
    }

    #[inline]
    pub fn content_types_mut(&mut self) -> &mut ContentTypeMap {
        &mut self.content_types
    }

    /// Sources whose relationship part is absent or out of date.
    ///
    /// A relationship part is up to date when its payload parses to a set equal to
    /// the source's in-memory relationship set.
    pub fn missing_relationship_parts(&self) -> Vec<PackURI> {
        self.sources()
            .into_iter()
            .filter(|source| !self.has_current_rels_part(source))
            .cloned()
            .collect()
    }

    fn has_current_rels_part(&self, source: &PackURI) -> bool {
        self.relationships(source).is_none() || self.rels_part_matches(source)
    }

    /// True if the source's relationship part exists and parses to exactly the
    /// source's relationship set (an empty set for a source without relationships).
    pub(crate) fn rels_part_matches(&self, source: &PackURI) -> bool {
        let Some(part) = self.part(&source.rels_uri()) else {
            return false;
        };
        let Ok(stored) = Relationships::from_xml(part.blob(), source.base_uri()) else {
            return false;
        };
        match self.relationships(source) {
            Some(rels) => &stored == rels,
            None => stored.is_empty(),
        }
    }

    /// True if every relationship-owning source has an up-to-date relationship part.
    pub fn is_structurally_complete(&self) -> bool {
        self.sources()
            .into_iter()
            .all(|source| self.has_current_rels_part(source))
    }

    /// Fail with [`OpcError::PackageIntegrity`] unless the store is structurally complete.
    pub fn check_integrity(&self) -> Result<()> {
        match self.missing_relationship_parts().first() {
            None => Ok(()),
            Some(source) => Err(OpcError::PackageIntegrity(format!(
                "relationship part {} for source {} is missing or out of date",
                source.rels_uri(),
                source
            ))),
        }
    }

    /// Write every source's relationship set into its relationship part,
    /// creating the part where needed. Afterwards the store is structurally complete.
    pub fn synchronize_relationship_parts(&mut self) {
        let pending: Vec<(PackURI, String)> = self
            .missing_relationship_parts()
            .into_iter()
            .filter_map(|source| {
                self.relationships(&source)
                    .map(|rels| (source.rels_uri(), rels.to_xml()))
            })
            .collect();

        for (rels_uri, xml) in pending {
            self.add_or_replace_part(rels_uri, ct::OPC_RELATIONSHIPS, xml.into_bytes());
        }
    }

    /// Produce an independent deep copy; see [`crate::cloner::clone_package`].
    pub fn deep_clone(&self) -> Result<PartStore> {
        crate::cloner::clone_package(self)
    }
}

impl Default for PartStore {
    fn default() -> Self {
        Self::new()
    }
}
