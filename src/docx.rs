//! Minimal WordprocessingML output: one plain run per paragraph, a fixed
//! US-Letter section, and the three boilerplate package parts.
//!
//! Headings, emphasis, lists and images in the source are flattened to
//! plain paragraphs.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::error::Error;
use crate::html;
use crate::model::{Document, MimeKind};
use crate::package;
use crate::progress::Progress;
use crate::render::LINE_BREAK;

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const FONT_NAME: &str = "Calibri";
/// Half-points, so 11pt.
pub const FONT_SIZE_HALF_POINTS: u32 = 22;
/// Twips after each paragraph.
pub const SPACE_AFTER_TWIPS: u32 = 120;
pub const PAGE_WIDTH_TWIPS: u32 = 12240;
pub const PAGE_HEIGHT_TWIPS: u32 = 15840;
pub const MARGIN_TWIPS: u32 = 1440;

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const PACKAGE_RELS_PART: &str = "_rels/.rels";
pub const DOCUMENT_PART: &str = "word/document.xml";
pub const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

// The document references no other parts.
const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
</Relationships>"#;

/// Splits extracted text into paragraph strings.
///
/// Plain text is line oriented: every newline or [`LINE_BREAK`] ends a
/// paragraph and the text is otherwise kept as is. HTML text breaks on blank
/// lines and [`LINE_BREAK`]; single newlines inside a paragraph become
/// spaces. Paragraphs that are blank after trimming are dropped either way.
pub fn split_paragraphs(text: &str, kind: MimeKind) -> Vec<String> {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    match kind {
        MimeKind::PlainText => text
            .split(['\n', LINE_BREAK])
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect(),
        MimeKind::Html => {
            let mut out = Vec::new();
            for piece in text.split(LINE_BREAK) {
                let mut current: Vec<&str> = Vec::new();
                for line in piece.split('\n') {
                    if line.is_empty() {
                        push_paragraph(&current, &mut out);
                        current.clear();
                    } else {
                        current.push(line);
                    }
                }
                push_paragraph(&current, &mut out);
            }
            out
        }
    }
}

fn push_paragraph(lines: &[&str], out: &mut Vec<String>) {
    let joined = lines.join(" ");
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Escapes the five XML special characters. Characters XML 1.0 cannot
/// represent at all are dropped.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if is_xml_char(c) => out.push(c),
            _ => {}
        }
    }
    out
}

/// The `word/document.xml` part for the given paragraphs. Output depends
/// only on the input.
pub fn document_xml(paragraphs: &[String]) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    let _ = writeln!(xml, "<w:document xmlns:w=\"{WML_NS}\">");
    xml.push_str("  <w:body>\n");
    for paragraph in paragraphs {
        let space = if paragraph.starts_with(char::is_whitespace)
            || paragraph.ends_with(char::is_whitespace)
        {
            " xml:space=\"preserve\""
        } else {
            ""
        };
        let _ = write!(
            xml,
            concat!(
                "    <w:p>\n",
                "      <w:pPr>\n",
                "        <w:spacing w:after=\"{after}\"/>\n",
                "      </w:pPr>\n",
                "      <w:r>\n",
                "        <w:rPr>\n",
                "          <w:rFonts w:ascii=\"{font}\" w:hAnsi=\"{font}\"/>\n",
                "          <w:sz w:val=\"{size}\"/>\n",
                "        </w:rPr>\n",
                "        <w:t{space}>{text}</w:t>\n",
                "      </w:r>\n",
                "    </w:p>\n",
            ),
            after = SPACE_AFTER_TWIPS,
            font = FONT_NAME,
            size = FONT_SIZE_HALF_POINTS,
            space = space,
            text = escape_xml(paragraph),
        );
    }
    let _ = write!(
        xml,
        concat!(
            "    <w:sectPr>\n",
            "      <w:pgSz w:w=\"{w}\" w:h=\"{h}\"/>\n",
            "      <w:pgMar w:top=\"{m}\" w:right=\"{m}\" w:bottom=\"{m}\" w:left=\"{m}\"/>\n",
            "    </w:sectPr>\n",
            "  </w:body>\n",
            "</w:document>",
        ),
        w = PAGE_WIDTH_TWIPS,
        h = PAGE_HEIGHT_TWIPS,
        m = MARGIN_TWIPS,
    );
    xml
}

fn rendered_text(doc: &Document) -> Cow<'_, str> {
    match doc.mime_kind {
        MimeKind::Html => Cow::Owned(html::extract_text(&doc.content)),
        MimeKind::PlainText => Cow::Borrowed(&doc.content),
    }
}

/// Paragraphs a document contributes to its DOCX body.
pub fn paragraphs_of(doc: &Document) -> Vec<String> {
    split_paragraphs(&rendered_text(doc), doc.mime_kind)
}

pub(crate) fn convert(doc: &Document, progress: &mut Progress) -> Result<Vec<u8>, Error> {
    progress.report(10);
    let text = rendered_text(doc);
    progress.report(30);

    let paragraphs = split_paragraphs(&text, doc.mime_kind);
    let xml = document_xml(&paragraphs);
    log::debug!("DOCX body has {} paragraph(s)", paragraphs.len());
    progress.report(60);

    let bytes = package::package(&[
        (CONTENT_TYPES_PART, CONTENT_TYPES_XML.as_bytes()),
        (PACKAGE_RELS_PART, PACKAGE_RELS_XML.as_bytes()),
        (DOCUMENT_PART, xml.as_bytes()),
        (DOCUMENT_RELS_PART, DOCUMENT_RELS_XML.as_bytes()),
    ])?;
    progress.report(100);
    Ok(bytes)
}
