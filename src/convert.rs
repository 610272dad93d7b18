use crate::docx;
use crate::error::{Error, ErrorKind};
use crate::model::{ConversionOptions, Document, FileId, Format, Output};
use crate::pdf::PdfConverter;
use crate::progress::Progress;
use crate::render::{GlyphRenderer, RenderEngine, Viewport};

/// A failed conversion, reduced to what a caller needs to show it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<Error> for ConversionFailure {
    fn from(e: Error) -> Self {
        let message = e.to_string();
        ConversionFailure {
            kind: e.kind(),
            message: if message.is_empty() { "Conversion failed".to_string() } else { message },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConversionOutcome {
    pub id: FileId,
    pub result: Result<Output, ConversionFailure>,
}

/// Routes documents to the PDF or DOCX pipeline by requested format.
pub struct Converter<E = GlyphRenderer> {
    pdf: PdfConverter<E>,
}

impl Default for Converter<GlyphRenderer> {
    fn default() -> Self {
        Converter::new()
    }
}

impl Converter<GlyphRenderer> {
    pub fn new() -> Self {
        Converter { pdf: PdfConverter::new() }
    }
}

impl<E: RenderEngine> Converter<E> {
    pub fn with_engine(engine: E) -> Self {
        Converter { pdf: PdfConverter::with_engine(engine) }
    }

    /// Where PDF conversions mount their off-screen containers.
    pub fn viewport(&self) -> &Viewport {
        self.pdf.viewport()
    }

    pub fn convert(
        &self,
        doc: &Document,
        options: &ConversionOptions,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<Output, Error> {
        let mut progress = Progress::new(on_progress);
        let bytes = match options.format {
            Format::Pdf => self.pdf.convert(doc, options, &mut progress)?,
            Format::Docx => docx::convert(doc, &mut progress)?,
        };
        Ok(Output { format: options.format, bytes })
    }

    /// Like [`Converter::convert`], but never fails: errors come back as a
    /// tagged [`ConversionFailure`] carrying the file's identity.
    pub fn dispatch(
        &self,
        id: FileId,
        doc: &Document,
        options: &ConversionOptions,
        on_progress: &mut dyn FnMut(u8),
    ) -> ConversionOutcome {
        let result = self.convert(doc, options, on_progress).map_err(|e| {
            log::warn!("{} conversion of {id} failed: {e}", options.format);
            ConversionFailure::from(e)
        });
        ConversionOutcome { id, result }
    }
}
