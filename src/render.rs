//! Off-screen rendering: the container model, the viewport it is mounted
//! into while it is rasterised, and the built-in glyph rasteriser.
//!
//! Geometry is in CSS pixels; the rasteriser multiplies by the requested
//! scale (2× for PDF output) when it allocates the bitmap.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::error::Error;
use crate::fonts::FontSet;

/// A4 width at 96 DPI.
pub const CONTAINER_WIDTH: f32 = 794.0;
pub const CONTAINER_PADDING: f32 = 40.0;
pub const BASE_FONT_SIZE: f32 = 14.0;
pub const LINE_HEIGHT: f32 = 1.6;
/// Where the container sits while mounted; never inside the visible area.
pub const OFFSCREEN_LEFT: f32 = -9999.0;

/// `<br>` inside extracted text.
pub const LINE_BREAK: char = '\u{2028}';

/// Longest canvas edge a browser will allocate, in device pixels.
pub const MAX_CANVAS_DIMENSION: u32 = 32_767;
/// Largest canvas a browser will allocate, in device pixels.
pub const MAX_CANVAS_AREA: u64 = 268_435_456;

const TAB_STOP: usize = 8;
const RULE_THICKNESS: f32 = 2.0;
const TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);
const RULE_COLOR: Rgba<u8> = Rgba([160, 160, 160, 255]);
const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub bold: bool,
    pub monospace: bool,
}

impl TextStyle {
    pub fn body() -> Self {
        TextStyle { size: BASE_FONT_SIZE, bold: false, monospace: false }
    }

    pub fn monospace() -> Self {
        TextStyle { monospace: true, ..TextStyle::body() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BlockContent {
    Text { text: String, preserve_whitespace: bool },
    Image { src: String, alt: String },
    Rule,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub content: BlockContent,
    pub style: TextStyle,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub indent: f32,
    /// List bullet or number, drawn left of the content box.
    pub marker: Option<String>,
}

impl Block {
    pub fn text(text: impl Into<String>, style: TextStyle) -> Self {
        Block {
            content: BlockContent::Text { text: text.into(), preserve_whitespace: false },
            style,
            margin_top: 0.0,
            margin_bottom: 0.0,
            indent: 0.0,
            marker: None,
        }
    }
}

/// The detached layout root a document is rendered into.
#[derive(Clone, Debug, PartialEq)]
pub struct Container {
    pub width: f32,
    pub padding: f32,
    pub left: f32,
    pub line_height: f32,
    pub blocks: Vec<Block>,
}

impl Container {
    pub fn new(blocks: Vec<Block>) -> Self {
        Container {
            width: CONTAINER_WIDTH,
            padding: CONTAINER_PADDING,
            left: OFFSCREEN_LEFT,
            line_height: LINE_HEIGHT,
            blocks,
        }
    }

    pub fn content_width(&self) -> f32 {
        (self.width - 2.0 * self.padding).max(0.0)
    }
}

/// Stands in for the live document tree. Layout needs the container to be
/// mounted; [`Mounted`] unmounts it again when dropped.
#[derive(Debug, Default)]
pub struct Viewport {
    mounted: AtomicUsize,
}

impl Viewport {
    pub fn new() -> Self {
        Viewport::default()
    }

    pub fn mount(&self, container: Container) -> Mounted<'_> {
        let count = self.mounted.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!(
            "mounted off-screen container ({} blocks, {count} mounted)",
            container.blocks.len()
        );
        Mounted { viewport: self, container }
    }

    /// Number of containers currently mounted.
    pub fn mounted(&self) -> usize {
        self.mounted.load(Ordering::SeqCst)
    }
}

pub struct Mounted<'v> {
    viewport: &'v Viewport,
    container: Container,
}

impl Mounted<'_> {
    pub fn container(&self) -> &Container {
        &self.container
    }
}

impl Drop for Mounted<'_> {
    fn drop(&mut self) {
        let remaining = self.viewport.mounted.fetch_sub(1, Ordering::SeqCst) - 1;
        log::debug!("unmounted off-screen container ({remaining} mounted)");
    }
}

/// Turns a mounted container into a bitmap.
pub trait RenderEngine {
    fn rasterize(&self, container: &Container, scale: f32) -> Result<RgbaImage, Error>;
}

impl<E: RenderEngine + ?Sized> RenderEngine for &E {
    fn rasterize(&self, container: &Container, scale: f32) -> Result<RgbaImage, Error> {
        (**self).rasterize(container, scale)
    }
}

/// Resolves an `<img src>` the way a canvas with CORS loading would: inline
/// `data:` images load, remote images are skipped, local files taint.
/// Images that fail to decode are skipped like a broken image in a page.
pub(crate) fn load_image(src: &str) -> Result<Option<RgbaImage>, Error> {
    let lower = src.trim_start().to_ascii_lowercase();
    if lower.starts_with("file:") {
        return Err(Error::Render(format!(
            "image {src} would taint the canvas; local files cannot be rasterised"
        )));
    }
    if !lower.starts_with("data:") {
        log::warn!("Skipping image that cannot be fetched: {src}");
        return Ok(None);
    }
    let Some((header, payload)) = src.split_once(',') else {
        log::warn!("Skipping malformed data URI image");
        return Ok(None);
    };
    if !header.to_ascii_lowercase().ends_with(";base64") {
        log::warn!("Skipping non-base64 data URI image");
        return Ok(None);
    }
    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = match STANDARD.decode(payload) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Skipping data URI image with invalid base64: {e}");
            return Ok(None);
        }
    };
    match image::load_from_memory(&bytes) {
        Ok(img) => Ok(Some(img.to_rgba8())),
        Err(e) => {
            log::warn!("Skipping data URI image that cannot be decoded: {e}");
            Ok(None)
        }
    }
}

/// Rejects bitmaps larger than a browser canvas can hold.
pub(crate) fn check_canvas(width: u32, height: u32) -> Result<(), Error> {
    let area = u64::from(width) * u64::from(height);
    if width > MAX_CANVAS_DIMENSION || height > MAX_CANVAS_DIMENSION || area > MAX_CANVAS_AREA {
        return Err(Error::Render(format!(
            "content is too large to rasterise ({width}x{height} px exceeds the canvas limit)"
        )));
    }
    Ok(())
}

enum Placed {
    Lines { lines: Vec<String>, font: FontKind, size: f32, line_h: f32 },
    Image(RgbaImage, f32, f32),
    Rule(f32),
    Nothing,
}

#[derive(Clone, Copy)]
enum FontKind {
    Regular,
    Bold,
    Mono,
}

struct PlacedBlock {
    x: f32,
    y: f32,
    marker: Option<String>,
    placed: Placed,
}

/// Rasterises containers with system fonts through `ab_glyph`.
pub struct GlyphRenderer {
    fonts: OnceLock<Result<FontSet, String>>,
}

impl Default for GlyphRenderer {
    fn default() -> Self {
        GlyphRenderer::new()
    }
}

impl GlyphRenderer {
    /// Fonts are discovered on first use.
    pub fn new() -> Self {
        GlyphRenderer { fonts: OnceLock::new() }
    }

    pub fn with_fonts(fonts: FontSet) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Ok(fonts));
        GlyphRenderer { fonts: cell }
    }

    fn fonts(&self) -> Result<&FontSet, Error> {
        self.fonts
            .get_or_init(|| FontSet::discover().map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| Error::Render(e.clone()))
    }

    fn layout(&self, fonts: &FontSet, container: &Container) -> Result<(Vec<PlacedBlock>, f32), Error> {
        let mut placed = Vec::with_capacity(container.blocks.len());
        let mut y = container.padding;
        let mut prev_margin = 0.0f32;

        for block in &container.blocks {
            y += prev_margin.max(block.margin_top);
            let x = container.padding + block.indent;
            let width = (container.content_width() - block.indent).max(1.0);

            let place_text = |text: &str, preserve: bool, kind: FontKind| {
                let font = pick(fonts, kind);
                let size = block.style.size;
                let measure = |s: &str| text_width(font, size, s);
                let lines = wrap_text(text, preserve, width, &measure);
                let line_h = size * container.line_height;
                let height = line_h * lines.len() as f32;
                (Placed::Lines { lines, font: kind, size, line_h }, height)
            };

            let (item, height) = match &block.content {
                BlockContent::Text { text, preserve_whitespace } => {
                    let kind = if block.style.monospace {
                        FontKind::Mono
                    } else if block.style.bold {
                        FontKind::Bold
                    } else {
                        FontKind::Regular
                    };
                    place_text(text, *preserve_whitespace, kind)
                }
                BlockContent::Image { src, alt } => match load_image(src)? {
                    Some(img) if img.width() > 0 && img.height() > 0 => {
                        let draw_w = (img.width() as f32).min(width);
                        let draw_h = img.height() as f32 * draw_w / img.width() as f32;
                        (Placed::Image(img, draw_w, draw_h), draw_h)
                    }
                    // Broken images show their alt text, as in a browser.
                    _ if !alt.trim().is_empty() => place_text(alt, false, FontKind::Regular),
                    _ => (Placed::Nothing, 0.0),
                },
                BlockContent::Rule => (Placed::Rule(width), RULE_THICKNESS),
            };

            placed.push(PlacedBlock { x, y, marker: block.marker.clone(), placed: item });
            y += height;
            prev_margin = block.margin_bottom;
        }

        y += prev_margin + container.padding;
        Ok((placed, y))
    }
}

impl RenderEngine for GlyphRenderer {
    fn rasterize(&self, container: &Container, scale: f32) -> Result<RgbaImage, Error> {
        let fonts = self.fonts()?;
        let (placed, height) = self.layout(fonts, container)?;

        let px_w = (container.width * scale).ceil() as u32;
        let px_h = (height * scale).ceil() as u32;
        if px_w == 0 || px_h == 0 {
            return Err(Error::Layout(format!("container has no area ({px_w}x{px_h})")));
        }
        check_canvas(px_w, px_h)?;
        log::debug!("rasterising {px_w}x{px_h} px at {scale}x");
        let mut canvas = RgbaImage::from_pixel(px_w, px_h, BACKGROUND);

        for block in &placed {
            let x = block.x * scale;
            let y = block.y * scale;
            match &block.placed {
                Placed::Lines { lines, font, size, line_h } => {
                    let face = pick(fonts, *font);
                    let px_scale = em_scale(face, size * scale);
                    let lead = (line_h * scale - px_scale.y) / 2.0;
                    if let Some(marker) = &block.marker {
                        let marker = format!("{marker} ");
                        let mw = text_width(pick(fonts, FontKind::Regular), *size, &marker) * scale;
                        draw_text_mut(
                            &mut canvas,
                            TEXT_COLOR,
                            (x - mw) as i32,
                            (y + lead) as i32,
                            em_scale(pick(fonts, FontKind::Regular), size * scale),
                            pick(fonts, FontKind::Regular),
                            &marker,
                        );
                    }
                    for (i, line) in lines.iter().enumerate() {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let top = y + i as f32 * line_h * scale + lead;
                        draw_text_mut(&mut canvas, TEXT_COLOR, x as i32, top as i32, px_scale, face, line);
                    }
                }
                Placed::Image(img, w, h) => {
                    let w = ((w * scale).round() as u32).max(1);
                    let h = ((h * scale).round() as u32).max(1);
                    let resized = imageops::resize(img, w, h, FilterType::Triangle);
                    imageops::overlay(&mut canvas, &resized, x as i64, y as i64);
                }
                Placed::Rule(w) => {
                    let w = ((w * scale) as u32).max(1);
                    let h = ((RULE_THICKNESS * scale) as u32).max(1);
                    draw_filled_rect_mut(&mut canvas, Rect::at(x as i32, y as i32).of_size(w, h), RULE_COLOR);
                }
                Placed::Nothing => {}
            }
        }

        Ok(canvas)
    }
}

fn pick(fonts: &FontSet, kind: FontKind) -> &FontVec {
    match kind {
        FontKind::Regular => &fonts.regular,
        FontKind::Bold => &fonts.bold,
        FontKind::Mono => &fonts.mono,
    }
}

/// `PxScale` for a CSS font size, which is an em size rather than the
/// ascent-to-descent height `ab_glyph` scales by.
fn em_scale(font: &FontVec, size_px: f32) -> PxScale {
    let upem = font.units_per_em().unwrap_or(1000.0);
    PxScale::from(size_px * font.height_unscaled() / upem)
}

fn text_width(font: &FontVec, size_px: f32, text: &str) -> f32 {
    let scaled = font.as_scaled(em_scale(font, size_px));
    let mut width = 0.0;
    let mut prev = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(p) = prev {
            width += scaled.kern(p, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

/// Breaks block text into display lines no wider than `max_width`.
///
/// Normal text is expected to be whitespace-collapsed already; preserved
/// text keeps its spaces, expands tabs and breaks on every newline.
pub(crate) fn wrap_text(
    text: &str,
    preserve_whitespace: bool,
    max_width: f32,
    measure: &dyn Fn(&str) -> f32,
) -> Vec<String> {
    let mut out = Vec::new();
    let hard_lines: Vec<&str> = if preserve_whitespace {
        text.split(['\n', LINE_BREAK]).collect()
    } else {
        text.split(LINE_BREAK).collect()
    };
    for line in hard_lines {
        let line = if preserve_whitespace {
            expand_tabs(line.trim_end_matches('\r'))
        } else {
            line.trim_matches(|c: char| c.is_ascii_whitespace()).to_string()
        };
        wrap_line(&line, max_width, measure, &mut out);
    }
    out
}

fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = TAB_STOP - column % TAB_STOP;
            out.extend(std::iter::repeat_n(' ', pad));
            column += pad;
        } else {
            out.push(c);
            column += 1;
        }
    }
    out
}

fn tokens(line: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_space = None;
    for (i, c) in line.char_indices() {
        let space = c.is_ascii_whitespace();
        if in_space.is_some_and(|s| s != space) {
            out.push(&line[start..i]);
            start = i;
        }
        in_space = Some(space);
    }
    if start < line.len() {
        out.push(&line[start..]);
    }
    out
}

fn wrap_line(line: &str, max_width: f32, measure: &dyn Fn(&str) -> f32, out: &mut Vec<String>) {
    let mut current = String::new();
    let mut width = 0.0;

    for token in tokens(line) {
        let w = measure(token);
        let is_space = token.starts_with(|c: char| c.is_ascii_whitespace());
        if width + w > max_width && !current.is_empty() {
            out.push(current.trim_end_matches(|c: char| c.is_ascii_whitespace()).to_string());
            current.clear();
            width = 0.0;
            if is_space {
                continue;
            }
        }
        if w <= max_width || is_space {
            current.push_str(token);
            width += w;
            continue;
        }
        // A single word wider than the line breaks anywhere.
        for c in token.chars() {
            let mut buf = [0u8; 4];
            let cw = measure(c.encode_utf8(&mut buf));
            if width + cw > max_width && !current.is_empty() {
                out.push(std::mem::take(&mut current));
                width = 0.0;
            }
            current.push(c);
            width += cw;
        }
    }
    out.push(current);
}
