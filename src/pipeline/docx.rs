//! Packaged-document renderer: translated text as a minimal `.docx`.
//!
//! A WordprocessingML package is a zip archive of XML parts. Only three are
//! mandatory for word processors to open the file:
//!
//! | part                  | role                                      |
//! |-----------------------|-------------------------------------------|
//! | `[Content_Types].xml` | maps extensions/parts to MIME types       |
//! | `_rels/.rels`         | points the package at its main document   |
//! | `word/document.xml`   | the body: one paragraph per input line    |
//!
//! Parts are modelled first ([`DocxPackage`]) and zipped in a separate step,
//! so tests can inspect the XML without unpacking an archive.

use crate::error::TranslateError;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;

const DOCUMENT_CLOSE: &str = "</w:body></w:document>";

/// One named entry of the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePart {
    pub name: &'static str,
    pub content: String,
}

/// The parts of a package, in archive order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocxPackage {
    pub parts: Vec<PackagePart>,
}

impl DocxPackage {
    pub fn part(&self, name: &str) -> Option<&PackagePart> {
        self.parts.iter().find(|p| p.name == name)
    }

    /// Zip the parts with deflate compression.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TranslateError> {
        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

            for part in &self.parts {
                zip.start_file(part.name, options).map_err(render_err)?;
                zip.write_all(part.content.as_bytes()).map_err(|e| TranslateError::Render {
                    format: "docx",
                    detail: format!("writing {}: {e}", part.name),
                })?;
            }
            zip.finish().map_err(render_err)?;
        }
        debug!("DOCX: {} parts, {} bytes", self.parts.len(), buffer.len());
        Ok(buffer)
    }
}

fn render_err(e: zip::result::ZipError) -> TranslateError {
    TranslateError::Render {
        format: "docx",
        detail: e.to_string(),
    }
}

/// Model a package whose body has one paragraph per `\n`-separated line.
pub fn build_docx(text: &str) -> DocxPackage {
    DocxPackage {
        parts: vec![
            PackagePart {
                name: "[Content_Types].xml",
                content: CONTENT_TYPES.to_string(),
            },
            PackagePart {
                name: "_rels/.rels",
                content: PACKAGE_RELS.to_string(),
            },
            PackagePart {
                name: "word/document.xml",
                content: document_xml(text),
            },
        ],
    }
}

/// Body part: one `<w:p>` per line, blank lines included.
pub fn document_xml(text: &str) -> String {
    let mut xml = String::with_capacity(DOCUMENT_OPEN.len() + text.len() * 2 + 128);
    xml.push_str(DOCUMENT_OPEN);
    for line in text.split('\n') {
        xml.push_str(r#"<w:p><w:r><w:t xml:space="preserve">"#);
        xml.push_str(&escape_xml(line));
        xml.push_str("</w:t></w:r></w:p>");
    }
    xml.push_str(DOCUMENT_CLOSE);
    xml
}

/// Escape markup characters and drop code points XML 1.0 cannot carry.
///
/// `\r` is dropped as well: parsers normalise it to a line feed, which would
/// split a paragraph the PDF keeps on one line.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\r' => {}
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c if is_xml_char(c) => out.push(c),
            _ => {}
        }
    }
    out
}

fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn markup_is_escaped() {
        assert_eq!(escape_xml("a<b & c>d"), "a&lt;b &amp; c&gt;d");
    }

    #[test]
    fn invalid_xml_chars_are_dropped() {
        assert_eq!(escape_xml("a\u{0}b\u{1b}c\u{FFFE}"), "abc");
        assert_eq!(escape_xml("tab\there"), "tab\there");
    }

    #[test]
    fn carriage_returns_are_dropped() {
        assert_eq!(escape_xml("Hola\r"), "Hola");
        let xml = document_xml("Hola\r\nMundo\r\n");
        assert!(!xml.contains('\r'));
        assert!(xml.contains(r#"<w:t xml:space="preserve">Hola</w:t>"#));
        assert!(xml.contains(r#"<w:t xml:space="preserve">Mundo</w:t>"#));
    }

    #[test]
    fn one_paragraph_per_line_including_blank() {
        let xml = document_xml("Hola\n\nMundo");
        assert_eq!(xml.matches("<w:p>").count(), 3);
        assert!(xml.contains(r#"<w:t xml:space="preserve"></w:t>"#));
        assert!(xml.contains(r#"<w:t xml:space="preserve">Mundo</w:t>"#));
    }

    #[test]
    fn package_order_puts_content_types_first() {
        let pkg = build_docx("x");
        let names: Vec<&str> = pkg.parts.iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec!["[Content_Types].xml", "_rels/.rels", "word/document.xml"]
        );
        assert!(pkg
            .part("[Content_Types].xml")
            .unwrap()
            .content
            .contains(r#"PartName="/word/document.xml""#));
    }

    #[test]
    fn archive_contains_mandatory_parts() {
        let bytes = build_docx("Tom & Jerry\n<tag>").to_bytes().unwrap();
        assert!(bytes.starts_with(b"PK"));

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 3);
        assert_eq!(archive.by_index(0).unwrap().name(), "[Content_Types].xml");
        archive.by_name("_rels/.rels").unwrap();

        let mut body = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert!(body.contains("Tom &amp; Jerry"));
        assert!(body.contains("&lt;tag&gt;"));
    }
}
