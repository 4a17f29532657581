//! Provides the PackURI value type and utilities for working with package URIs.
//!
//! A PackURI represents a part name within an OPC package, following the URI format
//! defined by the Open Packaging Conventions specification.

use crate::error::{OpcError, Result};

/// The package pseudo-partname, representing the package itself
pub const PACKAGE_URI: &str = "/";

/// The URI for the [Content_Types].xml part
pub const CONTENT_TYPES_URI: &str = "/[Content_Types].xml";

/// Directory segment that holds relationship parts
const RELS_DIR: &str = "_rels";

/// Extension of relationship parts
const RELS_EXT: &str = ".rels";

/// Represents a package URI, which is a partname within an OPC package.
///
/// PackURIs always begin with a forward slash and use forward slashes as path separators.
/// They provide access to the base URI (directory), filename, extension, the archive
/// member name and the reserved relationship-part name derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackURI {
    /// The full pack URI string (e.g., "/word/document.xml")
    uri: String,
}

impl PackURI {
    /// Create a new PackURI from a string.
    ///
    /// Fails with [`OpcError::InvalidPackUri`] if the URI doesn't start with a forward slash.
    pub fn new<S: Into<String>>(uri: S) -> Result<Self> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(OpcError::InvalidPackUri(format!(
                "PackURI must begin with slash, got '{}'",
                uri
            )));
        }
        Ok(PackURI { uri })
    }

    /// The package pseudo-partname `/`.
    pub fn package() -> Self {
        PackURI {
            uri: PACKAGE_URI.to_string(),
        }
    }

    /// Create a PackURI from an archive member name (leading slash added).
    pub fn from_membername(membername: &str) -> Result<Self> {
        Self::new(format!("/{}", membername.trim_start_matches('/')))
    }

    /// Create a PackURI from a relative reference and a base URI.
    ///
    /// This translates a relative reference (like "../styles.xml") onto a base URI
    /// (like "/word") to produce an absolute PackURI (like "/styles.xml").
    /// References that are already absolute are only normalized.
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Result<Self> {
        let joined = if relative_ref.starts_with('/') {
            relative_ref.to_string()
        } else {
            Self::join_paths(base_uri, relative_ref)
        };
        Self::new(Self::normalize_path(&joined))
    }

    /// True for the package pseudo-partname.
    #[inline]
    pub fn is_package(&self) -> bool {
        self.uri == PACKAGE_URI
    }

    /// Get the base URI (directory portion) of this PackURI.
    ///
    /// For example, "/ppt/slides" for "/ppt/slides/slide1.xml".
    /// For the package pseudo-partname "/", returns "/".
    pub fn base_uri(&self) -> &str {
        match self.uri.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.uri[..pos],
        }
    }

    /// Get the filename portion of this PackURI.
    ///
    /// For the package pseudo-partname "/", returns an empty string.
    pub fn filename(&self) -> &str {
        match self.uri.rfind('/') {
            Some(pos) => &self.uri[pos + 1..],
            None => "",
        }
    }

    /// Get the extension portion of this PackURI, without the leading period.
    pub fn ext(&self) -> &str {
        let filename = self.filename();
        match filename.rfind('.') {
            Some(pos) => &filename[pos + 1..],
            None => "",
        }
    }

    /// Get the membername (URI with leading slash stripped).
    ///
    /// This is the form used as the Zip file membername for the package item.
    pub fn membername(&self) -> &str {
        &self.uri[1..]
    }

    /// Get the relative reference from a base URI to this PackURI.
    ///
    /// For example, PackURI("/ppt/slideLayouts/slideLayout1.xml") would return
    /// "../slideLayouts/slideLayout1.xml" for base_uri "/ppt/slides".
    pub fn relative_ref(&self, base_uri: &str) -> String {
        if base_uri == "/" {
            return self.membername().to_string();
        }

        let from_parts: Vec<&str> = base_uri.split('/').filter(|s| !s.is_empty()).collect();
        let to_parts: Vec<&str> = self.uri.split('/').filter(|s| !s.is_empty()).collect();

        let common = from_parts
            .iter()
            .zip(to_parts.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut segments: Vec<&str> = Vec::with_capacity(from_parts.len() + to_parts.len());
        segments.extend(std::iter::repeat_n("..", from_parts.len() - common));
        segments.extend(to_parts.iter().skip(common));
        segments.join("/")
    }

    /// Get the PackURI of the .rels part corresponding to this PackURI.
    ///
    /// For example, "/word/_rels/document.xml.rels" for "/word/document.xml"
    /// and "/_rels/.rels" for the package itself.
    pub fn rels_uri(&self) -> PackURI {
        let rels_filename = format!("{}{}", self.filename(), RELS_EXT);
        let uri = if self.base_uri() == "/" {
            format!("/{}/{}", RELS_DIR, rels_filename)
        } else {
            format!("{}/{}/{}", self.base_uri(), RELS_DIR, rels_filename)
        };
        PackURI { uri }
    }

    /// True if this PackURI has the reserved relationship-part form.
    pub fn is_rels_part(&self) -> bool {
        self.source_uri().is_some()
    }

    /// Get the source whose relationships this relationship part holds.
    ///
    /// Inverse of [`PackURI::rels_uri`]: "/_rels/.rels" maps to the package,
    /// "/word/_rels/document.xml.rels" to "/word/document.xml". Returns `None`
    /// for names that are not relationship parts.
    pub fn source_uri(&self) -> Option<PackURI> {
        let source_filename = self.filename().strip_suffix(RELS_EXT)?;
        let base = self.base_uri();
        let source_dir = if base == "/_rels" {
            "/"
        } else {
            base.strip_suffix("/_rels")?
        };

        if source_filename.is_empty() {
            // Only the package itself owns a nameless .rels
            return (source_dir == "/").then(PackURI::package);
        }

        let uri = if source_dir == "/" {
            format!("/{}", source_filename)
        } else {
            format!("{}/{}", source_dir, source_filename)
        };
        Some(PackURI { uri })
    }

    /// Get the full URI string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    fn join_paths(base: &str, rel: &str) -> String {
        if base.ends_with('/') {
            format!("{}{}", base, rel)
        } else {
            format!("{}/{}", base, rel)
        }
    }

    /// Resolve "." and ".." segments; the result always starts with a slash.
    fn normalize_path(path: &str) -> String {
        let mut parts: Vec<&str> = Vec::new();

        for part in path.split('/') {
            match part {
                "" | "." => {},
                ".." => {
                    parts.pop();
                },
                _ => parts.push(part),
            }
        }

        format!("/{}", parts.join("/"))
    }
}

impl std::fmt::Display for PackURI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uri)
    }
}

impl AsRef<str> for PackURI {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

impl TryFrom<&str> for PackURI {
    type Error = OpcError;

    fn try_from(value: &str) -> Result<Self> {
        PackURI::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packuri_new() {
        assert!(PackURI::new("/word/document.xml").is_ok());
        assert!(matches!(
            PackURI::new("word/document.xml"),
            Err(OpcError::InvalidPackUri(_))
        ));
    }

    #[test]
    fn test_base_uri_and_filename() {
        let uri = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert_eq!(uri.base_uri(), "/ppt/slides");
        assert_eq!(uri.filename(), "slide1.xml");
        assert_eq!(uri.ext(), "xml");

        let root = PackURI::package();
        assert_eq!(root.base_uri(), "/");
        assert_eq!(root.filename(), "");
        assert_eq!(root.membername(), "");
    }

    #[test]
    fn test_rels_uri() {
        assert_eq!(PackURI::package().rels_uri().as_str(), "/_rels/.rels");

        let doc = PackURI::new("/word/document.xml").unwrap();
        assert_eq!(doc.rels_uri().as_str(), "/word/_rels/document.xml.rels");

        let top = PackURI::new("/thumbnail.jpeg").unwrap();
        assert_eq!(top.rels_uri().as_str(), "/_rels/thumbnail.jpeg.rels");
    }

    #[test]
    fn test_source_uri_inverts_rels_uri() {
        for source in ["/", "/word/document.xml", "/thumbnail.jpeg", "/a/b/c.xml"] {
            let source = PackURI::new(source).unwrap();
            assert_eq!(source.rels_uri().source_uri(), Some(source.clone()));
        }
    }

    #[test]
    fn test_source_uri_rejects_ordinary_parts() {
        for name in ["/word/document.xml", "/word/_rels/.rels", "/rels/a.xml.rels", "/x.rels"] {
            let uri = PackURI::new(name).unwrap();
            assert_eq!(uri.source_uri(), None, "{name}");
            assert!(!uri.is_rels_part());
        }
    }

    #[test]
    fn test_from_rel_ref() {
        let uri = PackURI::from_rel_ref("/word", "../customXml/item1.xml").unwrap();
        assert_eq!(uri.as_str(), "/customXml/item1.xml");

        let uri = PackURI::from_rel_ref("/", "word/document.xml").unwrap();
        assert_eq!(uri.as_str(), "/word/document.xml");

        let uri = PackURI::from_rel_ref("/word", "/media/image1.png").unwrap();
        assert_eq!(uri.as_str(), "/media/image1.png");
    }

    #[test]
    fn test_relative_ref() {
        let uri = PackURI::new("/ppt/slideLayouts/slideLayout1.xml").unwrap();
        assert_eq!(uri.relative_ref("/ppt/slides"), "../slideLayouts/slideLayout1.xml");
        assert_eq!(uri.relative_ref("/"), "ppt/slideLayouts/slideLayout1.xml");
        assert_eq!(uri.relative_ref("/ppt"), "slideLayouts/slideLayout1.xml");
    }

    #[test]
    fn test_membername_round_trip() {
        let uri = PackURI::from_membername("word/_rels/document.xml.rels").unwrap();
        assert_eq!(uri.as_str(), "/word/_rels/document.xml.rels");
        assert_eq!(uri.membername(), "word/_rels/document.xml.rels");
    }
}
