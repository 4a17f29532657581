//! Provides a general interface to a physical OPC package (ZIP file).
//!
//! This module handles the low-level reading and writing of archive members.
//! Every ZIP handle is owned by the reader or writer wrapping it and is released
//! when that value is dropped, on success and error paths alike.

use crate::error::{OpcError, Result};
use crate::packuri::PackURI;
use std::io::{Read, Seek, Write};
use tracing::trace;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Physical package reader that provides access to members of a ZIP-based OPC package.
pub struct PhysPkgReader<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> PhysPkgReader<R> {
    /// Open a ZIP archive.
    ///
    /// Fails with [`OpcError::MalformedArchive`] if the data is not a readable archive.
    pub fn new(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)
            .map_err(|e| OpcError::MalformedArchive(format!("cannot open archive: {}", e)))?;
        Ok(Self { archive })
    }

    /// Number of members in the archive (directories included).
    #[inline]
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Read every file member, in central-directory order.
    ///
    /// Directory entries are skipped. Returns `(membername, content)` pairs.
    pub fn read_all(&mut self) -> Result<Vec<(String, Vec<u8>)>> {
        let mut members = Vec::with_capacity(self.archive.len());

        for i in 0..self.archive.len() {
            let mut file = self.archive.by_index(i).map_err(|e| {
                OpcError::MalformedArchive(format!("unreadable entry #{}: {}", i, e))
            })?;
            if file.is_dir() {
                continue;
            }

            let name = file.name().to_string();
            let mut blob = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
            file.read_to_end(&mut blob)
                .map_err(|e| OpcError::MalformedArchive(format!("unreadable entry {}: {}", name, e)))?;

            trace!(member = %name, size = blob.len(), "read archive member");
            members.push((name, blob));
        }

        Ok(members)
    }
}

/// Physical package writer for creating OPC packages.
///
/// Writes members with Deflate compression into any seekable sink.
pub struct PhysPkgWriter<W: Write + Seek> {
    archive: ZipWriter<W>,
}

impl<W: Write + Seek> PhysPkgWriter<W> {
    /// Create a new package writer over `sink`.
    pub fn new(sink: W) -> Self {
        Self {
            archive: ZipWriter::new(sink),
        }
    }

    /// Write a part to the package.
    pub fn write(&mut self, pack_uri: &PackURI, blob: &[u8]) -> Result<()> {
        trace!(member = pack_uri.membername(), size = blob.len(), "write archive member");
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.archive.start_file(pack_uri.membername(), options)?;
        self.archive.write_all(blob)?;
        Ok(())
    }

    /// Finish writing and return the sink.
    pub fn finish(self) -> Result<W> {
        Ok(self.archive.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_round_trip() {
        let mut writer = PhysPkgWriter::new(Cursor::new(Vec::new()));
        let pack_uri = PackURI::new("/test.txt").unwrap();
        writer.write(&pack_uri, b"Hello, World!").unwrap();
        let zip_data = writer.finish().unwrap().into_inner();

        let mut reader = PhysPkgReader::new(Cursor::new(zip_data.as_slice())).unwrap();
        let members = reader.read_all().unwrap();
        assert_eq!(members, vec![("test.txt".to_string(), b"Hello, World!".to_vec())]);
    }

    #[test]
    fn test_members_keep_write_order() {
        let mut writer = PhysPkgWriter::new(Cursor::new(Vec::new()));
        for name in ["/[Content_Types].xml", "/word/document.xml", "/_rels/.rels"] {
            writer.write(&PackURI::new(name).unwrap(), b"<x/>").unwrap();
        }
        let zip_data = writer.finish().unwrap().into_inner();

        let mut reader = PhysPkgReader::new(Cursor::new(zip_data)).unwrap();
        assert_eq!(reader.len(), 3);
        let names: Vec<String> = reader.read_all().unwrap().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["[Content_Types].xml", "word/document.xml", "_rels/.rels"]);
    }

    #[test]
    fn test_not_an_archive() {
        let result = PhysPkgReader::new(Cursor::new(b"definitely not a zip".as_slice()));
        assert!(matches!(result, Err(OpcError::MalformedArchive(_))));
    }
}
