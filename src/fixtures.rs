//! The "HelloWorld" document in its two serialized forms, for tests.
//!
//! [`hello_world_docx`] is the archive form: `[Content_Types].xml` plus eight parts,
//! two of which are relationship parts. [`hello_world_flat`] is the same document
//! as Word writes it in Flat OPC form, relationship parts included as ordinary
//! `pkg:part` elements.

use crate::constants::{content_type as ct, namespace};
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const CONTENT_TYPES: &str = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/word/settings.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml"/><Override PartName="/word/webSettings.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.webSettings+xml"/><Override PartName="/word/fontTable.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.fontTable+xml"/><Override PartName="/word/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/webSettings" Target="webSettings.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings" Target="settings.xml"/><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="theme/theme1.xml"/><Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/fontTable" Target="fontTable.xml"/></Relationships>"#;

const DOCUMENT: &str = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>Hello World!</w:t></w:r></w:p><w:sectPr/></w:body></w:document>"#;

const STYLES: &str = r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style></w:styles>"#;

const SETTINGS: &str = r#"<w:settings xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:zoom w:percent="100"/></w:settings>"#;

const WEB_SETTINGS: &str = r#"<w:webSettings xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:optimizeForBrowser/></w:webSettings>"#;

const FONT_TABLE: &str = r#"<w:fonts xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:font w:name="Calibri"/></w:fonts>"#;

const THEME: &str = r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements/></a:theme>"#;

/// The document's parts as `(partname, content type, xml body)`, in archive order.
pub fn hello_world_parts() -> [(&'static str, &'static str, &'static str); 8] {
    [
        ("/_rels/.rels", ct::OPC_RELATIONSHIPS, PACKAGE_RELS),
        ("/word/document.xml", ct::WML_DOCUMENT_MAIN, DOCUMENT),
        ("/word/_rels/document.xml.rels", ct::OPC_RELATIONSHIPS, DOCUMENT_RELS),
        ("/word/theme/theme1.xml", ct::OFC_THEME, THEME),
        ("/word/settings.xml", ct::WML_SETTINGS, SETTINGS),
        ("/word/styles.xml", ct::WML_STYLES, STYLES),
        ("/word/webSettings.xml", ct::WML_WEB_SETTINGS, WEB_SETTINGS),
        ("/word/fontTable.xml", ct::WML_FONT_TABLE, FONT_TABLE),
    ]
}

/// Archive form of the document.
pub fn hello_world_docx() -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    writer.start_file("[Content_Types].xml", options).unwrap();
    write!(writer, "{}\r\n{}", DECLARATION, CONTENT_TYPES).unwrap();

    for (partname, _, body) in hello_world_parts() {
        writer.start_file(partname.trim_start_matches('/'), options).unwrap();
        write!(writer, "{}\r\n{}", DECLARATION, body).unwrap();
    }

    writer.finish().unwrap().into_inner()
}

/// Flat OPC form of the document.
pub fn hello_world_flat() -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" standalone=\"yes\"?>\r\n");
    xml.push_str("<?mso-application progid=\"Word.Document\"?>\r\n");
    xml.push_str(&format!(r#"<pkg:package xmlns:pkg="{}">"#, namespace::FLAT_PACKAGE));

    for (partname, content_type, body) in hello_world_parts() {
        let padding = if content_type == ct::OPC_RELATIONSHIPS {
            r#" pkg:padding="512""#
        } else {
            ""
        };
        xml.push_str(&format!(
            "\r\n  <pkg:part pkg:name=\"{}\" pkg:contentType=\"{}\"{}>\r\n    <pkg:xmlData>\r\n      {}\r\n    </pkg:xmlData>\r\n  </pkg:part>",
            partname, content_type, padding, body
        ));
    }

    xml.push_str("\r\n</pkg:package>");
    xml
}
