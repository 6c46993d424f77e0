//! PDF renderer: lay translated text out as a paginated PDF.
//!
//! The document is built as an explicit object model ([`PdfDocument`] of
//! [`PdfObject`]s) and serialised in a separate pass, which is where object
//! numbers, stream lengths and the cross-reference offsets are computed. No
//! offset is ever hard-coded.
//!
//! ```text
//!  1  Catalog ──► 2  Pages ──► [4, 6, 8, …]
//!  3  Font (Helvetica, WinAnsiEncoding)
//!  4  Page 0 ──► 5  Content 0
//!  6  Page 1 ──► 7  Content 1
//!  …
//! ```
//!
//! Each input line becomes exactly one `Tj` operation. Helvetica in a
//! standard Type1 font only covers WinAnsi (cp1252), so characters outside
//! that set are replaced with `?` rather than emitted as garbage bytes.

use crate::error::TranslateError;
use tracing::debug;

const HEADER: &[u8] = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n";
const FONT_RESOURCE: &str = "F1";

/// Page geometry and typography, in PDF points.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfLayout {
    pub page_width: f32,
    pub page_height: f32,
    /// x of the first glyph on every line.
    pub margin_left: f32,
    /// Baseline of the first line on every page.
    pub top: f32,
    /// Lowest baseline allowed on a page.
    pub bottom_margin: f32,
    pub font_size: f32,
    /// Baseline-to-baseline distance.
    pub leading: f32,
}

impl Default for PdfLayout {
    /// US Letter, 12 pt Helvetica on 14 pt leading.
    fn default() -> Self {
        Self {
            page_width: 612.0,
            page_height: 792.0,
            margin_left: 50.0,
            top: 750.0,
            bottom_margin: 50.0,
            font_size: 12.0,
            leading: 14.0,
        }
    }
}

impl PdfLayout {
    /// Lines that fit between `top` and `bottom_margin`, first line included.
    pub fn lines_per_page(&self) -> usize {
        let usable = (self.top - self.bottom_margin).max(0.0);
        (usable / self.leading).floor() as usize + 1
    }

    pub fn validate(&self) -> Result<(), TranslateError> {
        let all = [
            self.page_width,
            self.page_height,
            self.margin_left,
            self.top,
            self.bottom_margin,
            self.font_size,
            self.leading,
        ];
        if all.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(TranslateError::InvalidConfig(
                "PDF layout values must be finite and non-negative".into(),
            ));
        }
        if self.page_width == 0.0 || self.page_height == 0.0 {
            return Err(TranslateError::InvalidConfig(
                "PDF page size must be non-zero".into(),
            ));
        }
        if self.font_size == 0.0 || self.leading == 0.0 {
            return Err(TranslateError::InvalidConfig(
                "PDF font size and leading must be > 0".into(),
            ));
        }
        if self.top > self.page_height || self.bottom_margin > self.top {
            return Err(TranslateError::InvalidConfig(format!(
                "PDF text area is empty: top {} / bottom margin {} on a {}pt page",
                self.top, self.bottom_margin, self.page_height
            )));
        }
        Ok(())
    }
}

/// Reference to an object by its 1-based number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjRef(pub usize);

/// One indirect object of the document.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    Catalog {
        pages: ObjRef,
    },
    Pages {
        kids: Vec<ObjRef>,
    },
    Font {
        base_font: &'static str,
    },
    Page {
        parent: ObjRef,
        contents: ObjRef,
        font: ObjRef,
        media_box: [f32; 2],
    },
    /// Uncompressed content stream.
    Content(Vec<u8>),
}

impl PdfObject {
    fn write_body(&self, out: &mut Vec<u8>) {
        match self {
            PdfObject::Catalog { pages } => {
                push_str(out, &format!("<< /Type /Catalog /Pages {} 0 R >>", pages.0));
            }
            PdfObject::Pages { kids } => {
                let kids: Vec<String> = kids.iter().map(|k| format!("{} 0 R", k.0)).collect();
                push_str(
                    out,
                    &format!(
                        "<< /Type /Pages /Kids [{}] /Count {} >>",
                        kids.join(" "),
                        kids.len()
                    ),
                );
            }
            PdfObject::Font { base_font } => {
                push_str(
                    out,
                    &format!(
                        "<< /Type /Font /Subtype /Type1 /BaseFont /{base_font} /Encoding /WinAnsiEncoding >>"
                    ),
                );
            }
            PdfObject::Page {
                parent,
                contents,
                font,
                media_box,
            } => {
                push_str(
                    out,
                    &format!(
                        "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] \
                         /Resources << /Font << /{FONT_RESOURCE} {} 0 R >> >> /Contents {} 0 R >>",
                        parent.0, media_box[0], media_box[1], font.0, contents.0
                    ),
                );
            }
            PdfObject::Content(data) => {
                push_str(out, &format!("<< /Length {} >>\nstream\n", data.len()));
                out.extend_from_slice(data);
                out.extend_from_slice(b"\nendstream");
            }
        }
    }
}

/// A complete document; object `i` in `objects` is numbered `i + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfDocument {
    pub objects: Vec<PdfObject>,
    pub root: ObjRef,
}

impl PdfDocument {
    pub fn page_count(&self) -> usize {
        self.objects
            .iter()
            .filter(|o| matches!(o, PdfObject::Page { .. }))
            .count()
    }

    /// Serialise with a byte-accurate cross-reference table.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1024 + self.objects.len() * 256);
        out.extend_from_slice(HEADER);

        let mut offsets = Vec::with_capacity(self.objects.len());
        for (i, obj) in self.objects.iter().enumerate() {
            offsets.push(out.len());
            push_str(&mut out, &format!("{} 0 obj\n", i + 1));
            obj.write_body(&mut out);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_at = out.len();
        let size = self.objects.len() + 1;
        push_str(&mut out, &format!("xref\n0 {size}\n"));
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets {
            push_str(&mut out, &format!("{offset:010} 00000 n \n"));
        }
        push_str(
            &mut out,
            &format!(
                "trailer\n<< /Size {size} /Root {} 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
                self.root.0
            ),
        );
        out
    }
}

fn push_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
}

/// Lay `text` out one line per `\n`-separated line, paginating by `layout`.
///
/// Always produces at least one page; empty text yields a single empty line.
pub fn build_pdf(text: &str, layout: &PdfLayout) -> PdfDocument {
    let lines: Vec<&str> = text.split('\n').collect();
    let per_page = layout.lines_per_page().max(1);
    let pages: Vec<&[&str]> = lines.chunks(per_page).collect();

    const CATALOG: ObjRef = ObjRef(1);
    const PAGES: ObjRef = ObjRef(2);
    const FONT: ObjRef = ObjRef(3);

    let mut kids = Vec::with_capacity(pages.len());
    let mut page_objects = Vec::with_capacity(pages.len() * 2);
    for (i, page_lines) in pages.iter().enumerate() {
        let page_ref = ObjRef(4 + 2 * i);
        let content_ref = ObjRef(5 + 2 * i);
        kids.push(page_ref);
        page_objects.push(PdfObject::Page {
            parent: PAGES,
            contents: content_ref,
            font: FONT,
            media_box: [layout.page_width, layout.page_height],
        });
        page_objects.push(PdfObject::Content(content_stream(page_lines, layout)));
    }

    debug!("PDF: {} lines on {} pages", lines.len(), pages.len());

    let mut objects = vec![
        PdfObject::Catalog { pages: PAGES },
        PdfObject::Pages { kids },
        PdfObject::Font {
            base_font: "Helvetica",
        },
    ];
    objects.extend(page_objects);
    PdfDocument {
        objects,
        root: CATALOG,
    }
}

fn content_stream(lines: &[&str], layout: &PdfLayout) -> Vec<u8> {
    let mut data = Vec::with_capacity(64 + lines.iter().map(|l| l.len() + 8).sum::<usize>());
    push_str(
        &mut data,
        &format!(
            "BT\n/{FONT_RESOURCE} {} Tf\n{} TL\n{} {} Td\n",
            layout.font_size, layout.leading, layout.margin_left, layout.top
        ),
    );
    for line in lines {
        data.push(b'(');
        data.extend_from_slice(&escape_string(&encode_win_ansi(line)));
        data.extend_from_slice(b") Tj\nT*\n");
    }
    data.extend_from_slice(b"ET");
    data
}

/// Encode to WinAnsi (cp1252). Tabs become spaces, carriage returns are
/// dropped, anything else outside the code page becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\r' => {}
            '\t' => out.push(b' '),
            ' '..='~' => out.push(c as u8),
            '\u{A0}'..='\u{FF}' => out.push(c as u32 as u8),
            _ => out.push(win_ansi_special(c).unwrap_or(b'?')),
        }
    }
    out
}

/// The 0x80–0x9F block, where cp1252 departs from Latin-1.
fn win_ansi_special(c: char) -> Option<u8> {
    let byte = match c {
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

/// Backslash-escape the string delimiters `(` `)` and the escape char `\`.
pub fn escape_string(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 8);
    for &b in bytes {
        if matches!(b, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[test]
    fn default_layout_fits_51_lines() {
        assert_eq!(PdfLayout::default().lines_per_page(), 51);
        assert!(PdfLayout::default().validate().is_ok());
    }

    #[test]
    fn inverted_margins_are_rejected() {
        let layout = PdfLayout {
            bottom_margin: 800.0,
            ..PdfLayout::default()
        };
        assert!(matches!(
            layout.validate(),
            Err(TranslateError::InvalidConfig(_))
        ));
        let layout = PdfLayout {
            leading: 0.0,
            ..PdfLayout::default()
        };
        assert!(layout.validate().is_err());
    }

    #[test]
    fn delimiters_are_escaped() {
        assert_eq!(escape_string(br"a(b)c\d"), br"a\(b\)c\\d".to_vec());
    }

    #[test]
    fn win_ansi_maps_latin1_and_specials() {
        assert_eq!(encode_win_ansi("caf\u{e9}"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("\u{20AC}5"), vec![0x80, b'5']);
        assert_eq!(encode_win_ansi("\u{201C}hi\u{201D}"), vec![0x93, b'h', b'i', 0x94]);
        assert_eq!(encode_win_ansi("\u{65e5}\t\r"), b"? ".to_vec());
    }

    #[test]
    fn one_tj_per_line() {
        let doc = build_pdf("Hola\nMundo", &PdfLayout::default());
        let bytes = doc.to_bytes();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(count(&bytes, b") Tj"), 2);
        assert!(find(&bytes, b"(Hola) Tj\nT*\n(Mundo) Tj").is_some());
    }

    #[test]
    fn escaped_text_is_embedded() {
        let bytes = build_pdf("f(x) = a\\b", &PdfLayout::default()).to_bytes();
        assert!(find(&bytes, br"(f\(x\) = a\\b) Tj").is_some());
    }

    #[test]
    fn paginates_at_page_capacity() {
        let layout = PdfLayout::default();
        let full: Vec<String> = (0..51).map(|i| format!("line {i}")).collect();
        let doc = build_pdf(&full.join("\n"), &layout);
        assert_eq!(doc.page_count(), 1);

        let over: Vec<String> = (0..52).map(|i| format!("line {i}")).collect();
        let doc = build_pdf(&over.join("\n"), &layout);
        assert_eq!(doc.page_count(), 2);
        let bytes = doc.to_bytes();
        assert_eq!(count(&bytes, b") Tj"), 52);
        assert!(find(&bytes, b"/Kids [4 0 R 6 0 R] /Count 2").is_some());
    }

    #[test]
    fn empty_text_is_a_single_blank_page() {
        let doc = build_pdf("", &PdfLayout::default());
        assert_eq!(doc.page_count(), 1);
        assert_eq!(count(&doc.to_bytes(), b"() Tj"), 1);
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let lines: Vec<String> = (0..120).map(|i| format!("({i})")).collect();
        let doc = build_pdf(&lines.join("\n"), &PdfLayout::default());
        let bytes = doc.to_bytes();
        assert!(bytes.starts_with(b"%PDF-1.4\n"));
        assert!(bytes.ends_with(b"%%EOF\n"));

        let xref_at = find(&bytes, b"\nxref\n").unwrap() + 1;
        let tail = std::str::from_utf8(&bytes[xref_at..]).unwrap();
        let startxref: usize = tail
            .lines()
            .skip_while(|l| *l != "startxref")
            .nth(1)
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(startxref, xref_at);

        let n = doc.objects.len();
        assert!(tail.contains(&format!("/Size {}", n + 1)));
        let entries: Vec<&str> = tail.lines().skip(3).take(n).collect();
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.len() + 1, 20, "entry {i} is not 20 bytes");
            let offset: usize = entry[..10].parse().unwrap();
            let expected = format!("{} 0 obj\n", i + 1);
            assert!(
                bytes[offset..].starts_with(expected.as_bytes()),
                "object {} not at {offset}",
                i + 1
            );
        }
    }

    #[test]
    fn stream_length_matches_data() {
        let doc = build_pdf("abc", &PdfLayout::default());
        let PdfObject::Content(data) = &doc.objects[4] else {
            panic!("object 5 should be a content stream");
        };
        let bytes = doc.to_bytes();
        let header = format!("<< /Length {} >>\nstream\n", data.len());
        let at = find(&bytes, header.as_bytes()).unwrap() + header.len();
        assert_eq!(&bytes[at..at + data.len()], data.as_slice());
        assert!(bytes[at + data.len()..].starts_with(b"\nendstream"));
    }
}
