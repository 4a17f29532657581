//! Deep copies of a package.

use crate::error::Result;
use crate::store::PartStore;
use tracing::debug;

/// Produce an independent deep copy of a structurally complete package.
///
/// The source is checked first and nothing is produced if it fails
/// [`PartStore::check_integrity`]. The copy gets the source's Content-Type
/// Table, every part in [`PartStore::parts`] order with its own copy of the
/// payload, and every relationship set as is. Relationship targets are not
/// re-validated.
///
/// # Errors
///
/// Returns [`OpcError::PackageIntegrity`](crate::OpcError::PackageIntegrity) if
/// some source has no up-to-date relationship part.
pub fn clone_package(source: &PartStore) -> Result<PartStore> {
    source.check_integrity()?;

    let mut target = PartStore::with_content_types(source.content_types().clone());
    for part in source.parts() {
        target.insert_loaded_part(part.clone())?;
    }
    for owner in source.sources() {
        if let Some(rels) = source.relationships(owner) {
            target.set_relationships(owner.clone(), rels.clone());
        }
    }

    debug!(
        parts = target.part_count(),
        sources = target.sources().len(),
        "cloned package"
    );
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveCodec;
    use crate::constants::{content_type as ct, relationship_type as rt};
    use crate::error::OpcError;
    use crate::fixtures;
    use crate::flat::FlatCodec;
    use crate::packuri::PackURI;

    fn uri(s: &str) -> PackURI {
        PackURI::new(s).unwrap()
    }

    fn staged_fixture() -> PartStore {
        FlatCodec::default()
            .parse_staged(&fixtures::hello_world_flat(), &mut Vec::new())
            .unwrap()
    }

    #[test]
    fn test_clone_staged_package() {
        let source = staged_fixture();
        let copy = clone_package(&source).unwrap();

        assert_eq!(copy, source);
        assert!(copy.partnames().eq(source.partnames()));
        assert!(copy.is_structurally_complete());
        assert_eq!(
            copy.main_document_part().unwrap().blob(),
            source.main_document_part().unwrap().blob()
        );
    }

    #[test]
    fn test_clone_archive_package() {
        let source = ArchiveCodec::load(&fixtures::hello_world_docx()).unwrap();
        let copy = source.deep_clone().unwrap();
        assert_eq!(copy, source);
    }

    #[test]
    fn test_clone_rejects_direct_parse_result() {
        let direct = FlatCodec::default()
            .parse(&fixtures::hello_world_flat())
            .unwrap();
        assert!(matches!(
            clone_package(&direct),
            Err(OpcError::PackageIntegrity(_))
        ));
    }

    #[test]
    fn test_clone_rejects_stale_relationship_part() {
        let mut source = staged_fixture();
        source
            .add_relationship(&PackURI::package(), "rId7", rt::HYPERLINK, "https://example.com", true)
            .unwrap();
        assert!(matches!(
            source.deep_clone(),
            Err(OpcError::PackageIntegrity(_))
        ));

        source.synchronize_relationship_parts();
        assert!(source.deep_clone().is_ok());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut source = staged_fixture();
        let mut copy = clone_package(&source).unwrap();
        let styles = uri("/word/styles.xml");
        let document = uri("/word/document.xml");

        copy.add_part(uri("/word/footer1.xml"), ct::XML, b"<w:ftr/>".to_vec())
            .unwrap();
        copy.add_or_replace_part(styles.clone(), ct::WML_STYLES, b"<w:styles/>".to_vec());
        copy.remove_relationship(&document, "rId4").unwrap();
        assert_eq!(source.part_count(), 8);
        assert!(!source.contains_part(&uri("/word/footer1.xml")));
        assert_ne!(source.get_part(&styles).unwrap().blob(), b"<w:styles/>");
        assert_eq!(source.relationships(&document).unwrap().len(), 5);

        source.remove_part(&uri("/word/settings.xml"));
        assert!(copy.contains_part(&uri("/word/settings.xml")));
        assert_eq!(copy.part_count(), 9);
    }
}
