//! Open Packaging Convention (OPC) objects related to package parts.
//!
//! A part is the fundamental unit of content in an OPC package: a unique
//! partname, a content type and a payload. Relationships are not stored on the
//! part itself; the owning [`PartStore`](crate::store::PartStore) keeps them in
//! an edge table keyed by source partname.

use crate::packuri::PackURI;

/// A named payload inside a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// The partname (URI) of this part
    partname: PackURI,

    /// The content type of this part
    content_type: String,

    /// The binary content of this part. XML parts hold UTF-8 encoded text.
    blob: Vec<u8>,
}

impl Part {
    /// Create a new Part.
    pub fn new(partname: PackURI, content_type: impl Into<String>, blob: Vec<u8>) -> Self {
        Self {
            partname,
            content_type: content_type.into(),
            blob,
        }
    }

    /// Get the partname of this part.
    #[inline]
    pub fn partname(&self) -> &PackURI {
        &self.partname
    }

    /// Get the content type of this part.
    #[inline]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Get the binary content of this part.
    #[inline]
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// True if this part holds a serialized relationship set.
    #[inline]
    pub fn is_rels_part(&self) -> bool {
        self.partname.is_rels_part()
    }

    /// True if the content type declares XML content.
    #[inline]
    pub fn is_xml(&self) -> bool {
        is_xml_content_type(&self.content_type)
    }

    /// Get the XML content as a UTF-8 string.
    pub fn xml_str(&self) -> crate::Result<&str> {
        std::str::from_utf8(&self.blob).map_err(Into::into)
    }
}

/// Check if a content type represents XML content ("+xml" or "/xml" suffix).
#[inline]
pub fn is_xml_content_type(content_type: &str) -> bool {
    content_type.ends_with("+xml") || content_type.ends_with("/xml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::content_type as ct;

    #[test]
    fn test_blob_part() {
        let partname = PackURI::new("/word/media/image1.png").unwrap();
        let content = vec![0x89, 0x50, 0x4E, 0x47];
        let part = Part::new(partname, ct::PNG, content.clone());

        assert_eq!(part.content_type(), "image/png");
        assert_eq!(part.blob(), content.as_slice());
        assert!(!part.is_xml());
        assert!(!part.is_rels_part());
    }

    #[test]
    fn test_rels_part_detection() {
        let part = Part::new(
            PackURI::new("/_rels/.rels").unwrap(),
            ct::OPC_RELATIONSHIPS,
            Vec::new(),
        );
        assert!(part.is_rels_part());
        assert!(part.is_xml());
    }

    #[test]
    fn test_is_xml_content_type() {
        assert!(is_xml_content_type(ct::XML));
        assert!(is_xml_content_type(ct::WML_DOCUMENT_MAIN));
        assert!(!is_xml_content_type(ct::PNG));
    }
}
