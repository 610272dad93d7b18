mod common;

use common::{docx_paragraph_texts, zip_entry, zip_entry_names};
use pagesmith::{
    ConversionOptions, DOCX_MIME, Document, ErrorKind, Format, convert_file, convert_to_docx,
    paragraphs_of,
};

fn docx(doc: &Document) -> Vec<u8> {
    let out = convert_to_docx(doc, &ConversionOptions::new(Format::Docx), |_| {})
        .expect("DOCX conversion succeeds");
    assert_eq!(out.mime(), DOCX_MIME);
    out.bytes
}

#[test]
fn package_has_exactly_the_four_parts() {
    let bytes = docx(&Document::plain_text("hello"));
    assert_eq!(
        zip_entry_names(&bytes),
        vec![
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "word/_rels/document.xml.rels",
        ]
    );
}

#[test]
fn content_types_declare_defaults_and_main_part() {
    let bytes = docx(&Document::plain_text("hello"));
    let xml = zip_entry(&bytes, "[Content_Types].xml");
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let defaults: Vec<_> = doc
        .descendants()
        .filter(|n| n.tag_name().name() == "Default")
        .filter_map(|n| n.attribute("Extension"))
        .collect();
    assert_eq!(defaults, vec!["rels", "xml"]);
    let override_part = doc
        .descendants()
        .find(|n| n.tag_name().name() == "Override")
        .and_then(|n| n.attribute("PartName"));
    assert_eq!(override_part, Some("/word/document.xml"));
}

#[test]
fn relationships_point_at_the_document_only() {
    let bytes = docx(&Document::plain_text("hello"));
    let rels = zip_entry(&bytes, "_rels/.rels");
    let doc = roxmltree::Document::parse(&rels).unwrap();
    let targets: Vec<_> = doc
        .descendants()
        .filter_map(|n| n.attribute("Target"))
        .collect();
    assert_eq!(targets, vec!["word/document.xml"]);

    let doc_rels = zip_entry(&bytes, "word/_rels/document.xml.rels");
    let doc = roxmltree::Document::parse(&doc_rels).unwrap();
    assert_eq!(doc.root_element().children().filter(|n| n.is_element()).count(), 0);
}

#[test]
fn html_paragraphs_are_not_merged() {
    let bytes = docx(&Document::html("<p>A</p><p>B</p>"));
    assert_eq!(docx_paragraph_texts(&bytes), vec!["A", "B"]);
}

#[test]
fn html_is_flattened_to_plain_paragraphs() {
    let html = "<h1>Title</h1><ul><li>one</li><li><b>two</b></li></ul>\
                <p>Line<br>break &amp; more</p><img src=\"data:image/png;base64,AAAA\">";
    let bytes = docx(&Document::html(html));
    assert_eq!(
        docx_paragraph_texts(&bytes),
        vec!["Title", "one", "two", "Line", "break & more"]
    );
}

#[test]
fn non_breaking_spaces_are_kept() {
    let doc = Document::html("<p>a&nbsp;&nbsp;&nbsp;b</p>");
    assert_eq!(paragraphs_of(&doc), vec!["a\u{a0}\u{a0}\u{a0}b"]);
    assert_eq!(docx_paragraph_texts(&docx(&doc)), vec!["a\u{a0}\u{a0}\u{a0}b"]);
}

#[test]
fn blank_line_splits_plain_text() {
    let bytes = docx(&Document::plain_text("Hello\n\nWorld"));
    assert_eq!(docx_paragraph_texts(&bytes), vec!["Hello", "World"]);
}

#[test]
fn plain_paragraph_count_matches_non_empty_lines() {
    let text = "first line\nsecond line\n   \nthird\nfourth";
    let bytes = docx(&Document::plain_text(text));
    let expected = text.lines().filter(|l| !l.trim().is_empty()).count();
    assert_eq!(docx_paragraph_texts(&bytes).len(), expected);
}

#[test]
fn reserved_characters_are_escaped_and_round_trip() {
    let text = r#"Tom & "Jerry" <cat> 'mouse'"#;
    let bytes = docx(&Document::plain_text(text));
    let xml = zip_entry(&bytes, "word/document.xml");
    assert!(xml.contains(
        "<w:t>Tom &amp; &quot;Jerry&quot; &lt;cat&gt; &apos;mouse&apos;</w:t>"
    ));
    assert_eq!(docx_paragraph_texts(&bytes), vec![text]);
}

#[test]
fn runs_use_fixed_font_and_spacing() {
    let bytes = docx(&Document::plain_text("styled"));
    let xml = zip_entry(&bytes, "word/document.xml");
    assert!(xml.contains("<w:spacing w:after=\"120\"/>"));
    assert!(xml.contains("<w:rFonts w:ascii=\"Calibri\" w:hAnsi=\"Calibri\"/>"));
    assert!(xml.contains("<w:sz w:val=\"22\"/>"));
}

#[test]
fn section_is_us_letter_with_inch_margins() {
    let bytes = docx(&Document::plain_text("x"));
    let xml = zip_entry(&bytes, "word/document.xml");
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let w = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
    let pg_sz = doc.descendants().find(|n| n.tag_name().name() == "pgSz").unwrap();
    assert_eq!(pg_sz.attribute((w, "w")), Some("12240"));
    assert_eq!(pg_sz.attribute((w, "h")), Some("15840"));
    let pg_mar = doc.descendants().find(|n| n.tag_name().name() == "pgMar").unwrap();
    for side in ["top", "right", "bottom", "left"] {
        assert_eq!(pg_mar.attribute((w, side)), Some("1440"), "{side}");
    }
}

#[test]
fn document_xml_is_deterministic() {
    let doc = Document::html("<p>Same</p><p>input &amp; output</p>");
    let first = docx(&doc);
    let second = docx(&doc);
    assert_eq!(
        zip_entry(&first, "word/document.xml"),
        zip_entry(&second, "word/document.xml")
    );
    assert_eq!(first, second);
}

#[test]
fn empty_document_still_packages() {
    let bytes = docx(&Document::plain_text("\n\n   \n"));
    assert!(docx_paragraph_texts(&bytes).is_empty());
    assert!(zip_entry(&bytes, "word/document.xml").contains("<w:sectPr>"));
}

#[test]
fn progress_hits_fixed_milestones() {
    let mut seen = Vec::new();
    convert_to_docx(
        &Document::plain_text("a"),
        &ConversionOptions::new(Format::Docx),
        |p| seen.push(p),
    )
    .unwrap();
    assert_eq!(seen, vec![10, 30, 60, 100]);
}

#[test]
fn conversion_leaves_the_document_untouched() {
    let doc = Document::html("<p>keep</p>");
    let before = doc.clone();
    docx(&doc);
    assert_eq!(doc, before);
}

#[test]
fn convert_file_writes_a_package_next_to_the_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("page.html");
    let output = dir.path().join("page.docx");
    std::fs::write(&input, "<p>From disk</p>").unwrap();

    convert_file(&input, &output, &ConversionOptions::new(Format::Docx)).unwrap();
    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(docx_paragraph_texts(&bytes), vec!["From disk"]);
}

#[test]
fn convert_file_rejects_unknown_extensions() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("data.csv");
    std::fs::write(&input, "a,b").unwrap();

    let err = convert_file(&input, &dir.path().join("data.docx"), &ConversionOptions::new(Format::Docx))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(!dir.path().join("data.docx").exists());
}
