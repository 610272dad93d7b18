mod common;

use common::{StubEngine, pdf_page_count};
use pagesmith::layout::{CONTAINER_PADDING, CONTAINER_WIDTH, IMAGE_WIDTH_MM, PRINTABLE_HEIGHT_MM};
use pagesmith::{
    BlockContent, ConversionOptions, Converter, Document, ErrorKind, FontSet, Format,
    GlyphRenderer, PDF_MIME, paginate,
};

fn pdf_options() -> ConversionOptions {
    ConversionOptions::new(Format::Pdf)
}

fn expected_pages(width_px: u32, height_px: u32) -> usize {
    let px_per_mm = f64::from(width_px) / IMAGE_WIDTH_MM;
    (f64::from(height_px) / px_per_mm / PRINTABLE_HEIGHT_MM).ceil() as usize
}

#[test]
fn output_is_a_pdf() {
    let converter = Converter::with_engine(StubEngine::new(600));
    let out = converter
        .convert(&Document::plain_text("hello"), &pdf_options(), &mut |_: u8| {})
        .unwrap();
    assert_eq!(out.mime(), PDF_MIME);
    assert!(out.bytes.starts_with(b"%PDF"));
    assert_eq!(pdf_page_count(&out.bytes), 1);
}

#[test]
fn page_count_follows_bitmap_height() {
    let width = (CONTAINER_WIDTH * 2.0) as u32;
    for height in [1, 2000, 2316, 5000, 12_000] {
        let converter = Converter::with_engine(StubEngine::new(height));
        let out = converter
            .convert(&Document::plain_text("x"), &pdf_options(), &mut |_: u8| {})
            .unwrap();
        assert_eq!(
            pdf_page_count(&out.bytes),
            expected_pages(width, height),
            "bitmap height {height}"
        );
    }
}

#[test]
fn slices_cover_every_row_once() {
    let slices = paginate(1588, 9000).unwrap();
    assert_eq!(slices.len(), expected_pages(1588, 9000));
    assert_eq!(slices.iter().map(|s| s.height_px).sum::<u32>(), 9000);
    assert!(slices.iter().all(|s| s.height_mm <= PRINTABLE_HEIGHT_MM + 1e-9));
}

#[test]
fn progress_hits_fixed_milestones() {
    let converter = Converter::with_engine(StubEngine::new(100));
    let mut seen = Vec::new();
    converter
        .convert(&Document::html("<p>x</p>"), &pdf_options(), &mut |p: u8| seen.push(p))
        .unwrap();
    assert_eq!(seen, vec![10, 30, 60, 90, 100]);
}

#[test]
fn container_is_unmounted_after_success() {
    let converter = Converter::with_engine(StubEngine::new(100));
    converter
        .convert(&Document::plain_text("x"), &pdf_options(), &mut |_: u8| {})
        .unwrap();
    assert_eq!(converter.viewport().mounted(), 0);
}

#[test]
fn container_is_unmounted_after_render_failure() {
    let converter = Converter::with_engine(StubEngine::failing_on(100, "boom"));
    let mut seen = Vec::new();
    let err = converter
        .convert(&Document::plain_text("boom"), &pdf_options(), &mut |p: u8| seen.push(p))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(seen, vec![10, 30]);
    assert_eq!(converter.viewport().mounted(), 0);
}

#[test]
fn empty_bitmap_is_a_layout_error() {
    let converter = Converter::with_engine(StubEngine::new(0));
    let err = converter
        .convert(&Document::plain_text(""), &pdf_options(), &mut |_: u8| {})
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Layout);
    assert_eq!(converter.viewport().mounted(), 0);
}

#[test]
fn html_container_uses_fixed_geometry() {
    let engine = StubEngine::new(100);
    Converter::with_engine(&engine)
        .convert(&Document::html("<h1>Title</h1><p>Body</p>"), &pdf_options(), &mut |_: u8| {})
        .unwrap();
    let seen = engine.seen.borrow();
    assert_eq!(seen.len(), 1);
    let container = &seen[0];
    assert_eq!(container.width, CONTAINER_WIDTH);
    assert_eq!(container.padding, CONTAINER_PADDING);
    assert!(container.left < 0.0);
    let texts: Vec<_> = container
        .blocks
        .iter()
        .filter_map(|b| match &b.content {
            BlockContent::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec!["Title", "Body"]);
    assert!(container.blocks[0].style.bold);
}

#[test]
fn dropping_styles_flattens_headings() {
    let engine = StubEngine::new(100);
    let options = pdf_options().with_preserve_styles(false);
    Converter::with_engine(&engine)
        .convert(&Document::html("<h1>Title</h1>"), &options, &mut |_: u8| {})
        .unwrap();
    let seen = engine.seen.borrow();
    assert!(!seen[0].blocks[0].style.bold);
}

#[test]
fn images_are_left_out_when_disabled() {
    let html = "<p>x</p><img src=\"data:image/png;base64,AAAA\">";
    let engine = StubEngine::new(100);
    let converter = Converter::with_engine(&engine);
    converter.convert(&Document::html(html), &pdf_options(), &mut |_: u8| {}).unwrap();
    converter
        .convert(&Document::html(html), &pdf_options().with_include_images(false), &mut |_: u8| {})
        .unwrap();
    let seen = engine.seen.borrow();
    let has_image = |i: usize| {
        seen[i].blocks.iter().any(|b| matches!(b.content, BlockContent::Image { .. }))
    };
    assert!(has_image(0));
    assert!(!has_image(1));
}

#[test]
fn plain_text_is_rendered_preformatted() {
    let engine = StubEngine::new(100);
    let text = "col1\tcol2\n  indented";
    Converter::with_engine(&engine)
        .convert(&Document::plain_text(text), &pdf_options(), &mut |_: u8| {})
        .unwrap();
    let seen = engine.seen.borrow();
    let block = &seen[0].blocks[0];
    assert_eq!(
        block.content,
        BlockContent::Text { text: text.to_string(), preserve_whitespace: true }
    );
    assert!(block.style.monospace);
}

#[test]
fn real_renderer_paginates_long_text() {
    let Some(converter) = real_converter() else { return };
    let text: String = (1..=200).map(|i| format!("Line number {i}\n")).collect();
    let out = converter
        .convert(&Document::plain_text(text), &pdf_options(), &mut |_: u8| {})
        .unwrap();
    assert!(pdf_page_count(&out.bytes) > 1);

    let short = converter
        .convert(&Document::html("<p>Hello</p>"), &pdf_options(), &mut |_: u8| {})
        .unwrap();
    assert_eq!(pdf_page_count(&short.bytes), 1);
    assert_eq!(converter.viewport().mounted(), 0);
}

fn real_converter() -> Option<Converter<GlyphRenderer>> {
    match FontSet::discover() {
        Ok(fonts) => Some(Converter::with_engine(GlyphRenderer::with_fonts(fonts))),
        Err(e) => {
            eprintln!("skipping: {e}");
            None
        }
    }
}

#[test]
fn oversized_documents_fail_with_a_render_error() {
    let Some(converter) = real_converter() else { return };
    let line = "0123456789".repeat(8);
    let text: String = (0..5_000).map(|_| format!("{line}\n")).collect();
    let mut seen = Vec::new();
    let err = converter
        .convert(&Document::plain_text(text), &pdf_options(), &mut |p: u8| seen.push(p))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(seen, vec![10, 30]);
    assert_eq!(converter.viewport().mounted(), 0);
}

#[test]
fn broken_inline_images_do_not_fail_the_document() {
    let Some(converter) = real_converter() else { return };
    let html = r#"<p>Report</p><img src="data:image/png;base64,AAAA" alt="chart"><p>More</p>"#;
    let out = converter
        .convert(&Document::html(html), &pdf_options(), &mut |_: u8| {})
        .unwrap();
    assert!(out.bytes.starts_with(b"%PDF"));
    assert_eq!(pdf_page_count(&out.bytes), 1);

    let local = r#"<p>x</p><img src="file:///etc/logo.png">"#;
    let err = converter
        .convert(&Document::html(local), &pdf_options(), &mut |_: u8| {})
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
}
