//! Convert plain-text and HTML documents to PDF or DOCX.
//!
//! PDF output is produced by laying the document out in an off-screen
//! container, rasterising it and paginating the bitmap onto A4 pages. DOCX
//! output flattens the document to plain paragraphs in a minimal Office Open
//! XML package.

mod convert;
mod docx;
mod error;
mod fonts;
mod html;
mod model;
mod package;
mod pdf;
mod progress;
mod render;
mod session;
mod validate;

pub use convert::{ConversionFailure, ConversionOutcome, Converter};
pub use docx::{document_xml, escape_xml, paragraphs_of, split_paragraphs};
pub use error::{Error, ErrorKind};
pub use fonts::FontSet;
pub use model::{
    ConversionOptions, DOCX_MIME, Document, FileId, Format, MimeKind, Output, PDF_MIME,
};
pub use pdf::{PageSlice, PdfConverter, paginate};
pub use render::{
    Block, BlockContent, Container, GlyphRenderer, LINE_BREAK, Mounted, RenderEngine, TextStyle,
    Viewport,
};
pub use session::{FileEntry, FileStatus, Session, Summary};
pub use validate::{MAX_FILE_SIZE, format_file_size, output_file_name, validate_upload};

use std::path::Path;

/// Page geometry and fixed layout constants.
pub mod layout {
    pub use crate::docx::{
        FONT_SIZE_HALF_POINTS, MARGIN_TWIPS, PAGE_HEIGHT_TWIPS, PAGE_WIDTH_TWIPS,
        SPACE_AFTER_TWIPS,
    };
    pub use crate::pdf::{
        IMAGE_WIDTH_MM, MARGIN_MM, PAGE_HEIGHT_MM, PAGE_WIDTH_MM, PRINTABLE_HEIGHT_MM,
        RASTER_SCALE,
    };
    pub use crate::render::{BASE_FONT_SIZE, CONTAINER_PADDING, CONTAINER_WIDTH, LINE_HEIGHT};
}

/// Names of the parts inside a generated DOCX package.
pub mod parts {
    pub use crate::docx::{CONTENT_TYPES_PART, DOCUMENT_PART, DOCUMENT_RELS_PART, PACKAGE_RELS_PART};
}

pub fn convert_to_pdf(
    doc: &Document,
    options: &ConversionOptions,
    mut on_progress: impl FnMut(u8),
) -> Result<Output, Error> {
    let options = ConversionOptions { format: Format::Pdf, ..*options };
    Converter::new().convert(doc, &options, &mut on_progress)
}

pub fn convert_to_docx(
    doc: &Document,
    options: &ConversionOptions,
    mut on_progress: impl FnMut(u8),
) -> Result<Output, Error> {
    let options = ConversionOptions { format: Format::Docx, ..*options };
    Converter::new().convert(doc, &options, &mut on_progress)
}

/// Converts the file at `input` and writes the result to `output`. The
/// input's kind is inferred from its extension and validated like an upload.
pub fn convert_file(input: &Path, output: &Path, options: &ConversionOptions) -> Result<(), Error> {
    let bytes = std::fs::read(input)?;
    let name = input.display().to_string();
    let kind = validate_upload(&name, MimeKind::mime_for_path(input), bytes.len() as u64)?;
    let doc = Document {
        content: String::from_utf8_lossy(&bytes).into_owned(),
        mime_kind: kind,
        size_bytes: bytes.len() as u64,
    };
    let result = Converter::new().convert(&doc, options, &mut |_| {})?;
    std::fs::write(output, result.bytes).map_err(Error::Io)
}
