#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{Cursor, Read};

use image::{Rgba, RgbaImage};
use pagesmith::{BlockContent, Container, Error, RenderEngine};

/// Renders every container as a blank bitmap of a fixed height, unless a
/// text block contains `fail_on`.
pub struct StubEngine {
    pub height: u32,
    pub fail_on: Option<&'static str>,
    pub seen: RefCell<Vec<Container>>,
}

impl StubEngine {
    pub fn new(height: u32) -> Self {
        StubEngine { height, fail_on: None, seen: RefCell::new(Vec::new()) }
    }

    pub fn failing_on(height: u32, needle: &'static str) -> Self {
        StubEngine { height, fail_on: Some(needle), seen: RefCell::new(Vec::new()) }
    }
}

impl RenderEngine for StubEngine {
    fn rasterize(&self, container: &Container, scale: f32) -> Result<RgbaImage, Error> {
        self.seen.borrow_mut().push(container.clone());
        if let Some(needle) = self.fail_on {
            let hit = container.blocks.iter().any(|b| {
                matches!(&b.content, BlockContent::Text { text, .. } if text.contains(needle))
            });
            if hit {
                return Err(Error::Render("engine fault".into()));
            }
        }
        let width = (container.width * scale) as u32;
        Ok(RgbaImage::from_pixel(width, self.height, Rgba([255, 255, 255, 255])))
    }
}

/// Page count from the page tree's `/Count` entry.
pub fn pdf_page_count(pdf: &[u8]) -> usize {
    let text = String::from_utf8_lossy(pdf);
    let start = text.find("/Count ").expect("PDF has no page tree count") + "/Count ".len();
    text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .expect("page count is a number")
}

pub fn zip_entry(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("output is a zip");
    let mut content = String::new();
    archive
        .by_name(name)
        .unwrap_or_else(|_| panic!("{name} missing from package"))
        .read_to_string(&mut content)
        .expect("entry is UTF-8");
    content
}

pub fn zip_entry_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("output is a zip");
    (0..archive.len())
        .map(|i| archive.by_index(i).expect("entry").name().to_string())
        .collect()
}

/// Text of every `w:t` in `word/document.xml`, one entry per paragraph.
pub fn docx_paragraph_texts(bytes: &[u8]) -> Vec<String> {
    let xml = zip_entry(bytes, "word/document.xml");
    let doc = roxmltree::Document::parse(&xml).expect("document.xml is well-formed");
    doc.descendants()
        .filter(|n| n.tag_name().name() == "p")
        .map(|p| {
            p.descendants()
                .filter(|n| n.tag_name().name() == "t")
                .filter_map(|n| n.text())
                .collect()
        })
        .collect()
}
