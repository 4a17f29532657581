//! Relationship-related objects for OPC packages.
//!
//! This module provides types for managing relationships between parts in an OPC package,
//! including internal and external relationships, and the `.rels` XML form they are
//! persisted in.

use crate::constants::{namespace, target_mode};
use crate::error::{OpcError, Result};
use crate::escape::escape_xml;
use crate::packuri::PackURI;
use quick_xml::Reader;
use quick_xml::events::Event;
use smallvec::SmallVec;

/// A single relationship from a source to a target.
///
/// Identified by an rId unique within its source. Can be either internal
/// (pointing to another part) or external (pointing to an external URL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1", "rId2")
    r_id: String,

    /// Relationship type URI
    reltype: String,

    /// Target reference - either a part URI or external URL
    target_ref: String,

    /// Base URI for resolving relative references
    base_uri: String,

    /// Whether this is an external relationship
    is_external: bool,
}

impl Relationship {
    /// Create a new relationship.
    pub fn new(
        r_id: impl Into<String>,
        reltype: impl Into<String>,
        target_ref: impl Into<String>,
        base_uri: impl Into<String>,
        is_external: bool,
    ) -> Self {
        Self {
            r_id: r_id.into(),
            reltype: reltype.into(),
            target_ref: target_ref.into(),
            base_uri: base_uri.into(),
            is_external,
        }
    }

    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Get the target reference.
    ///
    /// For internal relationships, this is a relative part reference.
    /// For external relationships, this is an absolute URL.
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    #[inline]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }

    /// The `TargetMode` attribute value for this relationship.
    #[inline]
    pub fn target_mode(&self) -> &'static str {
        if self.is_external {
            target_mode::EXTERNAL
        } else {
            target_mode::INTERNAL
        }
    }

    /// Get the absolute target partname for internal relationships.
    ///
    /// Returns an error if this is an external relationship.
    pub fn target_partname(&self) -> Result<PackURI> {
        if self.is_external {
            return Err(OpcError::InvalidRelationship(
                "Cannot get target_partname for external relationship".to_string(),
            ));
        }
        PackURI::from_rel_ref(&self.base_uri, &self.target_ref)
    }
}

/// Relationship set of a single source, kept in insertion order.
///
/// Order is observable: it is the order of the `.rels` XML and takes part in
/// equality, so a set read back from its own XML compares equal to itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationships {
    /// Base URI for resolving relative references
    base_uri: String,

    rels: SmallVec<[Relationship; 8]>,
}

impl Relationships {
    /// Create a new empty relationships collection.
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            rels: SmallVec::new(),
        }
    }

    /// Create an empty collection for the given source.
    pub fn for_source(source: &PackURI) -> Self {
        Self::new(source.base_uri())
    }

    #[inline]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Add a relationship to the collection.
    ///
    /// Fails with [`OpcError::InvalidRelationship`] if `r_id` is already used.
    pub fn add_relationship(
        &mut self,
        reltype: impl Into<String>,
        target_ref: impl Into<String>,
        r_id: impl Into<String>,
        is_external: bool,
    ) -> Result<&Relationship> {
        let r_id = r_id.into();
        if self.get(&r_id).is_some() {
            return Err(OpcError::InvalidRelationship(format!(
                "Duplicate relationship id '{}'",
                r_id
            )));
        }

        let rel = Relationship::new(r_id, reltype, target_ref, self.base_uri.clone(), is_external);
        self.rels.push(rel);
        Ok(&self.rels[self.rels.len() - 1])
    }

    /// Get a relationship by its ID.
    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|rel| rel.r_id() == r_id)
    }

    /// Get or add an internal relationship to a target part, returning its rId.
    ///
    /// If a relationship of the given type to the target already exists its rId
    /// is reused; otherwise a new one is created with the next available rId.
    pub fn get_or_add(&mut self, reltype: &str, target_ref: &str) -> String {
        self.find_or_insert(reltype, target_ref, false)
    }

    /// Get or add an external relationship, returning its rId.
    pub fn get_or_add_ext_rel(&mut self, reltype: &str, target_ref: &str) -> String {
        self.find_or_insert(reltype, target_ref, true)
    }

    fn find_or_insert(&mut self, reltype: &str, target_ref: &str, is_external: bool) -> String {
        if let Some(rel) = self.rels.iter().find(|rel| {
            rel.reltype() == reltype
                && rel.target_ref() == target_ref
                && rel.is_external() == is_external
        }) {
            return rel.r_id().to_string();
        }

        let r_id = self.next_r_id();
        let rel = Relationship::new(
            r_id.clone(),
            reltype,
            target_ref,
            self.base_uri.clone(),
            is_external,
        );
        self.rels.push(rel);
        r_id
    }

    /// Get the next available relationship ID.
    ///
    /// Generates IDs in the format "rId1", "rId2", etc., filling in gaps
    /// if any exist.
    pub fn next_r_id(&self) -> String {
        let mut used_numbers: SmallVec<[u32; 16]> = self
            .rels
            .iter()
            .filter_map(|rel| {
                rel.r_id()
                    .strip_prefix("rId")
                    .and_then(|digits| atoi_simd::parse::<u32, false, false>(digits.as_bytes()).ok())
            })
            .collect();

        used_numbers.sort_unstable();

        let mut next_num = 1u32;
        for &num in &used_numbers {
            match num.cmp(&next_num) {
                std::cmp::Ordering::Equal => next_num += 1,
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Less => {},
            }
        }

        format!("rId{}", next_num)
    }

    /// Get the relationship of a specific type.
    ///
    /// Returns an error if no relationship of the type is found,
    /// or if multiple relationships of the type exist.
    pub fn part_with_reltype(&self, reltype: &str) -> Result<&Relationship> {
        let mut matching = self.rels.iter().filter(|rel| rel.reltype() == reltype);

        match (matching.next(), matching.next()) {
            (None, _) => Err(OpcError::RelationshipNotFound(format!(
                "No relationship of type '{}'",
                reltype
            ))),
            (Some(rel), None) => Ok(rel),
            (Some(_), Some(_)) => Err(OpcError::InvalidRelationship(format!(
                "Multiple relationships of type '{}'",
                reltype
            ))),
        }
    }

    /// Get an iterator over all relationships, in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Remove a relationship by its ID.
    pub fn remove(&mut self, r_id: &str) -> Option<Relationship> {
        let pos = self.rels.iter().position(|rel| rel.r_id() == r_id)?;
        Some(self.rels.remove(pos))
    }

    /// Serialize relationships to the XML of a .rels part, in insertion order.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(128 + self.rels.len() * 160);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(r#"<Relationships xmlns=""#);
        xml.push_str(namespace::OPC_RELATIONSHIPS);
        xml.push_str(r#"">"#);

        for rel in &self.rels {
            let target_mode = if rel.is_external() {
                r#" TargetMode="External""#
            } else {
                ""
            };

            xml.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
                escape_xml(rel.r_id()),
                escape_xml(rel.reltype()),
                escape_xml(rel.target_ref()),
                target_mode
            ));
        }

        xml.push_str("</Relationships>");
        xml
    }

    /// Parse the XML of a .rels part.
    ///
    /// `base_uri` is the directory of the source the relationships belong to.
    /// Elements missing any of `Id`, `Type` or `Target` are skipped.
    pub fn from_xml(rels_xml: &[u8], base_uri: &str) -> Result<Self> {
        let mut rels = Self::new(base_uri);
        let mut reader = Reader::from_reader(rels_xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    if e.local_name().as_ref() == b"Relationship" {
                        let mut r_id = None;
                        let mut reltype = None;
                        let mut target_ref = None;
                        let mut is_external = false;

                        for attr in e.attributes() {
                            let attr = attr?;
                            let value = attr
                                .unescape_value()
                                .map_err(|e| OpcError::Xml(e.to_string()))?;
                            match attr.key.as_ref() {
                                b"Id" => r_id = Some(value.into_owned()),
                                b"Type" => reltype = Some(value.into_owned()),
                                b"Target" => target_ref = Some(value.into_owned()),
                                b"TargetMode" => is_external = value == target_mode::EXTERNAL,
                                _ => {},
                            }
                        }

                        if let (Some(id), Some(rt), Some(tr)) = (r_id, reltype, target_ref) {
                            rels.add_relationship(rt, tr, id, is_external)?;
                        }
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpcError::Xml(format!("Rels parse error: {}", e))),
                _ => {},
            }
            buf.clear();
        }

        Ok(rels)
    }
}

impl Default for Relationships {
    fn default() -> Self {
        Self::new("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::relationship_type as rt;

    #[test]
    fn test_relationship_creation() {
        let rel = Relationship::new("rId1", "http://example.com/rel", "target.xml", "/word", false);

        assert_eq!(rel.r_id(), "rId1");
        assert_eq!(rel.reltype(), "http://example.com/rel");
        assert_eq!(rel.target_mode(), target_mode::INTERNAL);
        assert_eq!(rel.target_partname().unwrap().as_str(), "/word/target.xml");
    }

    #[test]
    fn test_external_has_no_target_partname() {
        let rel = Relationship::new("rId1", rt::HYPERLINK, "https://example.com", "/word", true);
        assert!(matches!(
            rel.target_partname(),
            Err(OpcError::InvalidRelationship(_))
        ));
    }

    #[test]
    fn test_next_r_id_fills_gaps() {
        let mut rels = Relationships::new("/word");
        assert_eq!(rels.next_r_id(), "rId1");

        rels.add_relationship("type1", "target1", "rId1", false).unwrap();
        rels.add_relationship("type1", "target3", "rId3", false).unwrap();
        assert_eq!(rels.next_r_id(), "rId2");

        rels.add_relationship("type1", "target2", "rId2", false).unwrap();
        assert_eq!(rels.next_r_id(), "rId4");
    }

    #[test]
    fn test_duplicate_r_id_rejected() {
        let mut rels = Relationships::new("/");
        rels.add_relationship("type1", "a.xml", "rId1", false).unwrap();
        let err = rels.add_relationship("type2", "b.xml", "rId1", false);
        assert!(matches!(err, Err(OpcError::InvalidRelationship(_))));
        assert_eq!(rels.len(), 1);
    }

    #[test]
    fn test_get_or_add() {
        let mut rels = Relationships::new("/word");

        assert_eq!(rels.get_or_add("type1", "target1"), "rId1");
        assert_eq!(rels.get_or_add("type1", "target1"), "rId1");
        assert_eq!(rels.get_or_add("type1", "target2"), "rId2");
        assert_eq!(rels.get_or_add_ext_rel("type1", "target1"), "rId3");
    }

    #[test]
    fn test_part_with_reltype() {
        let mut rels = Relationships::new("/");
        rels.add_relationship(rt::OFFICE_DOCUMENT, "word/document.xml", "rId1", false)
            .unwrap();
        rels.add_relationship(rt::STYLES, "a.xml", "rId2", false).unwrap();
        rels.add_relationship(rt::STYLES, "b.xml", "rId3", false).unwrap();

        assert_eq!(rels.part_with_reltype(rt::OFFICE_DOCUMENT).unwrap().r_id(), "rId1");
        assert!(matches!(
            rels.part_with_reltype(rt::STYLES),
            Err(OpcError::InvalidRelationship(_))
        ));
        assert!(matches!(
            rels.part_with_reltype(rt::THEME),
            Err(OpcError::RelationshipNotFound(_))
        ));
    }

    #[test]
    fn test_xml_keeps_order_and_modes() {
        let mut rels = Relationships::new("/word");
        rels.add_relationship(rt::STYLES, "styles.xml", "rId10", false).unwrap();
        rels.add_relationship(rt::HYPERLINK, "https://example.com/?a=1&b=2", "rId2", true)
            .unwrap();

        let xml = rels.to_xml();
        assert!(xml.contains(r#"TargetMode="External""#));
        assert!(xml.contains("a=1&amp;b=2"));

        let parsed = Relationships::from_xml(xml.as_bytes(), "/word").unwrap();
        assert_eq!(parsed, rels);
        let ids: Vec<&str> = parsed.iter().map(Relationship::r_id).collect();
        assert_eq!(ids, ["rId10", "rId2"]);
        assert!(parsed.get("rId2").unwrap().is_external());
    }

    #[test]
    fn test_remove() {
        let mut rels = Relationships::new("/");
        rels.add_relationship("t", "a.xml", "rId1", false).unwrap();
        assert!(rels.remove("rId1").is_some());
        assert!(rels.remove("rId1").is_none());
        assert!(rels.is_empty());
    }
}
