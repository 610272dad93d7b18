use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::RgbaImage;
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, TextStr};

use crate::error::Error;
use crate::html;
use crate::model::{ConversionOptions, Document, MimeKind};
use crate::progress::Progress;
use crate::render::{
    BASE_FONT_SIZE, Block, BlockContent, Container, GlyphRenderer, RenderEngine, TextStyle,
    Viewport,
};

pub const PAGE_WIDTH_MM: f64 = 210.0;
pub const PAGE_HEIGHT_MM: f64 = 297.0;
/// Left, right and top margin; the bottom margin is implied by pagination.
pub const MARGIN_MM: f64 = 10.0;
pub const RASTER_SCALE: f32 = 2.0;

const PT_PER_MM: f64 = 72.0 / 25.4;

/// Width the bitmap is scaled to on the page.
pub const IMAGE_WIDTH_MM: f64 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
/// Vertical space each page shows of the bitmap.
pub const PRINTABLE_HEIGHT_MM: f64 = PAGE_HEIGHT_MM - 2.0 * MARGIN_MM;

/// One page's share of the rasterised bitmap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSlice {
    pub top_px: u32,
    pub height_px: u32,
    pub height_mm: f64,
}

/// Splits a bitmap of `width`×`height` pixels into page-sized slices.
///
/// The bitmap is scaled to [`IMAGE_WIDTH_MM`]; page *k* shows the rows that
/// fall in `[k·P, (k+1)·P)` where `P` is [`PRINTABLE_HEIGHT_MM`], so the page
/// count is `ceil(image_height_mm / P)`.
pub fn paginate(width: u32, height: u32) -> Result<Vec<PageSlice>, Error> {
    if width == 0 || height == 0 {
        return Err(Error::Layout(format!(
            "rendered content has no area ({width}x{height} px)"
        )));
    }
    let px_per_mm = f64::from(width) / IMAGE_WIDTH_MM;
    let image_height_mm = f64::from(height) / px_per_mm;
    let px_per_page = PRINTABLE_HEIGHT_MM * px_per_mm;
    let pages = (image_height_mm / PRINTABLE_HEIGHT_MM).ceil().max(1.0) as u32;

    let mut slices = Vec::with_capacity(pages as usize);
    for k in 0..pages {
        let top = (f64::from(k) * px_per_page).floor() as u32;
        if top >= height {
            break;
        }
        let bottom = ((f64::from(k + 1) * px_per_page).floor() as u32)
            .min(height)
            .max(top + 1);
        let height_px = bottom - top;
        slices.push(PageSlice {
            top_px: top,
            height_px,
            height_mm: f64::from(height_px) / px_per_mm,
        });
    }
    Ok(slices)
}

fn mm_to_pt(mm: f64) -> f32 {
    (mm * PT_PER_MM) as f32
}

/// RGB rows `[top, top + rows)` of the bitmap, zlib-compressed for FlateDecode.
fn compress_rows(bitmap: &RgbaImage, top: u32, rows: u32) -> Result<Vec<u8>, Error> {
    let width = bitmap.width();
    let mut rgb = Vec::with_capacity((width * rows * 3) as usize);
    for y in top..top + rows {
        for x in 0..width {
            let [r, g, b, a] = bitmap.get_pixel(x, y).0;
            // Composite over white; the page behind the image is white too.
            let blend = |c: u8| ((u32::from(c) * u32::from(a) + 255 * (255 - u32::from(a))) / 255) as u8;
            rgb.extend_from_slice(&[blend(r), blend(g), blend(b)]);
        }
    }
    let failed = |e: std::io::Error| Error::Unknown(format!("image compression failed: {e}"));
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&rgb).map_err(failed)?;
    encoder.finish().map_err(failed)
}

/// Lays the slices out on A4 pages, one image XObject per page.
pub(crate) fn assemble(bitmap: &RgbaImage, slices: &[PageSlice]) -> Result<Pdf, Error> {
    if slices.is_empty() {
        return Err(Error::Layout("no pages to assemble".into()));
    }

    let mut pdf = Pdf::new();
    let mut next = 1;
    let mut alloc = || {
        let r = Ref::new(next);
        next += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();
    let page_ids: Vec<(Ref, Ref, Ref)> = slices.iter().map(|_| (alloc(), alloc(), alloc())).collect();

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().map(|(page, _, _)| *page))
        .count(page_ids.len() as i32);
    pdf.document_info(info_id).producer(TextStr("pagesmith"));

    let page_w = mm_to_pt(PAGE_WIDTH_MM);
    let page_h = mm_to_pt(PAGE_HEIGHT_MM);
    let image_name = Name(b"Im1");

    for (slice, &(page_id, content_id, image_id)) in slices.iter().zip(&page_ids) {
        let data = compress_rows(bitmap, slice.top_px, slice.height_px)?;
        {
            let mut image = pdf.image_xobject(image_id, &data);
            image.filter(Filter::FlateDecode);
            image.width(bitmap.width() as i32);
            image.height(slice.height_px as i32);
            image.color_space().device_rgb();
            image.bits_per_component(8);
        }

        let w = mm_to_pt(IMAGE_WIDTH_MM);
        let h = mm_to_pt(slice.height_mm);
        let x = mm_to_pt(MARGIN_MM);
        let y = page_h - mm_to_pt(MARGIN_MM) - h;

        let mut content = Content::new();
        content.save_state();
        content.transform([w, 0.0, 0.0, h, x, y]);
        content.x_object(image_name);
        content.restore_state();
        pdf.stream(content_id, &content.finish());

        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, page_w, page_h))
            .parent(pages_id)
            .contents(content_id);
        page.resources().x_objects().pair(image_name, image_id);
    }

    Ok(pdf)
}

/// Builds the off-screen container for a document.
pub(crate) fn build_container(doc: &Document, options: &ConversionOptions) -> Container {
    let blocks = match doc.mime_kind {
        MimeKind::Html => {
            html::layout_blocks(&doc.content, options.preserve_styles, options.include_images)
        }
        MimeKind::PlainText => vec![Block {
            content: BlockContent::Text {
                text: doc.content.clone(),
                preserve_whitespace: true,
            },
            style: TextStyle::monospace(),
            margin_top: BASE_FONT_SIZE,
            margin_bottom: BASE_FONT_SIZE,
            indent: 0.0,
            marker: None,
        }],
    };
    Container::new(blocks)
}

/// Renders documents off-screen and paginates the bitmap into a PDF.
pub struct PdfConverter<E = GlyphRenderer> {
    engine: E,
    viewport: Viewport,
}

impl Default for PdfConverter<GlyphRenderer> {
    fn default() -> Self {
        PdfConverter::new()
    }
}

impl PdfConverter<GlyphRenderer> {
    pub fn new() -> Self {
        PdfConverter::with_engine(GlyphRenderer::new())
    }
}

impl<E: RenderEngine> PdfConverter<E> {
    pub fn with_engine(engine: E) -> Self {
        PdfConverter { engine, viewport: Viewport::new() }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn convert(
        &self,
        doc: &Document,
        options: &ConversionOptions,
        progress: &mut Progress,
    ) -> Result<Vec<u8>, Error> {
        progress.report(10);
        let mounted = self.viewport.mount(build_container(doc, options));
        progress.report(30);

        let bitmap = self.engine.rasterize(mounted.container(), RASTER_SCALE)?;
        log::debug!("rasterised {}x{} px", bitmap.width(), bitmap.height());
        progress.report(60);

        let slices = paginate(bitmap.width(), bitmap.height())?;
        let pdf = assemble(&bitmap, &slices)?;
        log::info!("assembled {} PDF page(s)", slices.len());
        progress.report(90);

        let bytes = pdf.finish();
        progress.report(100);
        Ok(bytes)
    }
}
