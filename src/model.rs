use std::fmt;
use std::path::Path;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MimeKind {
    Html,
    PlainText,
}

impl MimeKind {
    /// Maps a declared MIME type onto a supported kind. Parameters such as
    /// `; charset=utf-8` are ignored.
    pub fn from_mime(mime: &str) -> Option<MimeKind> {
        let essence = mime.split(';').next().unwrap_or(mime).trim();
        match essence.to_ascii_lowercase().as_str() {
            "text/html" => Some(MimeKind::Html),
            "text/plain" => Some(MimeKind::PlainText),
            _ => None,
        }
    }

    /// Guesses the MIME type a browser would report for a file name.
    pub fn mime_for_path(path: &Path) -> &'static str {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("html" | "htm") => "text/html",
            Some("txt" | "text") => "text/plain",
            _ => "application/octet-stream",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            MimeKind::Html => "text/html",
            MimeKind::PlainText => "text/plain",
        }
    }
}

/// An uploaded document. Converters only ever borrow it.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub content: String,
    pub mime_kind: MimeKind,
    pub size_bytes: u64,
}

impl Document {
    pub fn new(content: impl Into<String>, mime_kind: MimeKind) -> Self {
        let content = content.into();
        let size_bytes = content.len() as u64;
        Document { content, mime_kind, size_bytes }
    }

    pub fn html(content: impl Into<String>) -> Self {
        Document::new(content, MimeKind::Html)
    }

    pub fn plain_text(content: impl Into<String>) -> Self {
        Document::new(content, MimeKind::PlainText)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    Pdf,
    Docx,
}

impl Format {
    pub fn mime(self) -> &'static str {
        match self {
            Format::Pdf => PDF_MIME,
            Format::Docx => DOCX_MIME,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Pdf => "pdf",
            Format::Docx => "docx",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConversionOptions {
    pub format: Format,
    /// Lay out HTML with default element styling in the PDF path. DOCX is
    /// always flattened to plain paragraphs.
    pub preserve_styles: bool,
    /// Draw `data:` URI images in the PDF path. DOCX never carries images.
    pub include_images: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        ConversionOptions { format: Format::Pdf, preserve_styles: true, include_images: true }
    }
}

impl ConversionOptions {
    pub fn new(format: Format) -> Self {
        ConversionOptions { format, ..Default::default() }
    }

    pub fn with_preserve_styles(mut self, preserve: bool) -> Self {
        self.preserve_styles = preserve;
        self
    }

    pub fn with_include_images(mut self, include: bool) -> Self {
        self.include_images = include;
        self
    }
}

/// Converted bytes tagged with their format.
#[derive(Clone, Debug, PartialEq)]
pub struct Output {
    pub format: Format,
    pub bytes: Vec<u8>,
}

impl Output {
    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Identity of a file within a [`Session`](crate::Session).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u64);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
