//! opcpack - Open Packaging Conventions packages in memory
//!
//! This library holds an OPC package (the container format behind .docx, .xlsx
//! and .pptx) as an in-memory store of parts and relationships, and converts it
//! between its two serialized forms: the ZIP archive form and the single-document
//! Flat OPC form.
//!
//! # Features
//!
//! - **Part store**: insertion-ordered parts, relationship sets per source and the
//!   Content-Type Table
//! - **Archive codec**: load and save the ZIP form, refreshing relationship parts
//! - **Flat codec**: direct and staged parsing of Flat OPC documents, and writing them
//! - **Cloning**: deep copies gated on structural completeness
//!
//! # Example - Flat document to archive
//!
//! ```no_run
//! use opcpack::{ArchiveCodec, FlatCodec};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let text = std::fs::read_to_string("document.xml")?;
//!
//! // Staging yields a structurally complete store
//! let mut scratch = Vec::new();
//! let store = FlatCodec::default().parse_staged(&text, &mut scratch)?;
//! for part in store.parts() {
//!     println!("{} ({})", part.partname(), part.content_type());
//! }
//!
//! let docx = ArchiveCodec::save(&store)?;
//! std::fs::write("document.docx", docx)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Building a package
//!
//! ```
//! use opcpack::constants::{content_type, relationship_type};
//! use opcpack::{PackURI, PartStore};
//!
//! # fn main() -> opcpack::Result<()> {
//! let mut store = PartStore::new();
//! let document = PackURI::new("/word/document.xml")?;
//! store.add_part(document.clone(), content_type::WML_DOCUMENT_MAIN, b"<w:document/>".to_vec())?;
//! store.relate_to(&PackURI::package(), &document, relationship_type::OFFICE_DOCUMENT)?;
//!
//! assert!(!store.is_structurally_complete());
//! store.synchronize_relationship_parts();
//! let copy = store.deep_clone()?;
//! assert_eq!(copy.part_count(), 2);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod cloner;
pub mod config;
pub mod constants;
pub mod content_types;
pub mod error;
pub mod escape;
pub mod flat;
pub mod packuri;
pub mod part;
pub mod phys_pkg;
pub mod rel;
pub mod store;

#[cfg(test)]
mod fixtures;

pub use archive::ArchiveCodec;
pub use cloner::clone_package;
pub use config::{DirectParseMode, FlatOptions};
pub use content_types::ContentTypeMap;
pub use error::{OpcError, Result};
pub use flat::FlatCodec;
pub use packuri::PackURI;
pub use part::Part;
pub use rel::{Relationship, Relationships};
pub use store::PartStore;
