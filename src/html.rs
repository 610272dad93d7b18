//! HTML to layout blocks, approximating a browser's default stylesheet.

use scraper::{ElementRef, Html};

use crate::render::{BASE_FONT_SIZE, Block, BlockContent, LINE_BREAK, TextStyle};

const LIST_INDENT: f32 = 40.0;

/// Content of these elements is never rendered.
const HIDDEN: &[&str] = &[
    "head", "script", "style", "template", "noscript", "title", "meta", "link",
];

const BLOCKS: &[&str] = &[
    "html", "body", "address", "article", "aside", "blockquote", "center", "dd", "details",
    "dialog", "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "hgroup", "li", "main", "menu", "nav", "ol", "p",
    "pre", "section", "summary", "table", "tbody", "thead", "tfoot", "tr", "caption", "ul",
    "listing", "plaintext", "xmp",
];

#[derive(Clone, Copy)]
struct Frame {
    style: TextStyle,
    margin_top: f32,
    margin_bottom: f32,
    indent: f32,
    preserve: bool,
}

struct Builder {
    blocks: Vec<Block>,
    text: String,
    pending_marker: Option<String>,
    preserve_styles: bool,
    include_images: bool,
}

/// Lays out an HTML fragment or document as a flat list of blocks.
pub(crate) fn layout_blocks(html: &str, preserve_styles: bool, include_images: bool) -> Vec<Block> {
    let doc = Html::parse_document(html);
    let mut builder = Builder {
        blocks: Vec::new(),
        text: String::new(),
        pending_marker: None,
        preserve_styles,
        include_images,
    };
    let root = Frame {
        style: TextStyle::body(),
        margin_top: 0.0,
        margin_bottom: 0.0,
        indent: 0.0,
        preserve: false,
    };
    builder.walk(doc.root_element(), root, None);
    builder.flush(root);
    builder.blocks
}

/// Rendered text of an HTML document: blocks separated by a blank line,
/// `<br>` as [`LINE_BREAK`], markup stripped and entities decoded.
pub(crate) fn extract_text(html: &str) -> String {
    layout_blocks(html, false, false)
        .into_iter()
        .filter_map(|b| match b.content {
            BlockContent::Text { text, .. } => Some(text),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn heading(level: u8) -> (f32, f32) {
    // (font size in em, vertical margin in em)
    match level {
        1 => (2.0, 0.67),
        2 => (1.5, 0.83),
        3 => (1.17, 1.0),
        4 => (1.0, 1.33),
        5 => (0.83, 1.67),
        _ => (0.67, 2.33),
    }
}

impl Builder {
    fn frame_for(&self, name: &str, parent: Frame) -> Frame {
        let em = parent.style.size;
        let mut frame = Frame { margin_top: 0.0, margin_bottom: 0.0, ..parent };
        if !self.preserve_styles {
            if matches!(name, "pre" | "listing" | "plaintext" | "xmp") {
                frame.preserve = true;
            }
            if matches!(name, "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "pre" | "li") {
                frame.margin_top = BASE_FONT_SIZE;
                frame.margin_bottom = BASE_FONT_SIZE;
            }
            return frame;
        }
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name.as_bytes()[1] - b'0';
                let (size, margin) = heading(level);
                frame.style = TextStyle { size: em * size, bold: true, ..parent.style };
                frame.margin_top = em * size * margin;
                frame.margin_bottom = em * size * margin;
            }
            "p" | "dl" | "figure" => {
                frame.margin_top = em;
                frame.margin_bottom = em;
            }
            "blockquote" => {
                frame.margin_top = em;
                frame.margin_bottom = em;
                frame.indent += LIST_INDENT;
            }
            "ul" | "ol" | "menu" => {
                frame.margin_top = em;
                frame.margin_bottom = em;
                frame.indent += LIST_INDENT;
            }
            "dd" => frame.indent += LIST_INDENT,
            "dt" | "th" | "caption" | "summary" => frame.style.bold = true,
            "pre" | "listing" | "plaintext" | "xmp" => {
                frame.style = TextStyle { monospace: true, ..parent.style };
                frame.preserve = true;
                frame.margin_top = em;
                frame.margin_bottom = em;
            }
            _ => {}
        }
        frame
    }

    fn walk(&mut self, element: ElementRef, frame: Frame, list: Option<&mut ListState>) {
        let mut list = list;
        for child in element.children() {
            if let Some(el) = ElementRef::wrap(child) {
                let name = el.value().name();
                if HIDDEN.contains(&name) || el.value().attr("hidden").is_some() {
                    continue;
                }
                match name {
                    "br" => self.text.push(LINE_BREAK),
                    "hr" => {
                        self.flush(frame);
                        self.blocks.push(Block {
                            content: BlockContent::Rule,
                            style: frame.style,
                            margin_top: frame.style.size * 0.5,
                            margin_bottom: frame.style.size * 0.5,
                            indent: frame.indent,
                            marker: None,
                        });
                    }
                    "img" => {
                        if !self.include_images {
                            continue;
                        }
                        let src = el.value().attr("src").unwrap_or("").trim();
                        if src.is_empty() {
                            continue;
                        }
                        self.flush(frame);
                        self.blocks.push(Block {
                            content: BlockContent::Image {
                                src: src.to_string(),
                                alt: el.value().attr("alt").unwrap_or("").to_string(),
                            },
                            style: frame.style,
                            margin_top: 0.0,
                            margin_bottom: 0.0,
                            indent: frame.indent,
                            marker: None,
                        });
                    }
                    "td" | "th" => {
                        if !self.text.is_empty() && !self.text.ends_with(' ') {
                            self.text.push(' ');
                        }
                        let inner = if name == "th" && self.preserve_styles {
                            Frame { style: TextStyle { bold: true, ..frame.style }, ..frame }
                        } else {
                            frame
                        };
                        self.walk(el, inner, None);
                    }
                    "ul" | "ol" | "menu" => {
                        let inner = self.frame_for(name, frame);
                        self.flush(frame);
                        let mut state = ListState {
                            ordered: name == "ol",
                            next: el
                                .value()
                                .attr("start")
                                .and_then(|s| s.trim().parse().ok())
                                .unwrap_or(1),
                        };
                        self.walk(el, inner, Some(&mut state));
                        self.flush(inner);
                    }
                    "li" => {
                        let inner = self.frame_for(name, frame);
                        self.flush(frame);
                        if let Some(state) = list.as_deref_mut() {
                            self.pending_marker = Some(state.marker());
                        } else {
                            self.pending_marker = Some("\u{2022}".to_string());
                        }
                        self.walk(el, inner, None);
                        self.flush(inner);
                        self.pending_marker = None;
                    }
                    _ if BLOCKS.contains(&name) => {
                        let inner = self.frame_for(name, frame);
                        self.flush(frame);
                        self.walk(el, inner, None);
                        self.flush(inner);
                    }
                    _ => self.walk(el, frame, None),
                }
            } else if let Some(text) = child.value().as_text() {
                if frame.preserve {
                    self.text.push_str(text);
                } else {
                    push_collapsed(&mut self.text, text);
                }
            }
        }
    }

    /// Closes the current run of inline content as a block in `frame`.
    fn flush(&mut self, frame: Frame) {
        let text = std::mem::take(&mut self.text);
        let text = if frame.preserve {
            text.trim_start_matches('\n')
                .trim_end_matches(|c: char| c.is_ascii_whitespace())
                .to_string()
        } else {
            text.trim_matches(|c: char| c == ' ').to_string()
        };
        if text.chars().all(|c| c.is_ascii_whitespace()) {
            return;
        }
        self.blocks.push(Block {
            content: BlockContent::Text { text, preserve_whitespace: frame.preserve },
            style: frame.style,
            margin_top: frame.margin_top,
            margin_bottom: frame.margin_bottom,
            indent: frame.indent,
            marker: self.pending_marker.take(),
        });
    }
}

struct ListState {
    ordered: bool,
    next: i64,
}

impl ListState {
    fn marker(&mut self) -> String {
        if self.ordered {
            let n = self.next;
            self.next += 1;
            format!("{n}.")
        } else {
            "\u{2022}".to_string()
        }
    }
}

/// Appends text with HTML whitespace collapsing, which only applies to
/// ASCII whitespace: `&nbsp;` and [`LINE_BREAK`] are kept.
fn push_collapsed(out: &mut String, text: &str) {
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !out.is_empty() && !out.ends_with(' ') && !out.ends_with(LINE_BREAK) {
                out.push(' ');
            }
        } else {
            out.push(c);
        }
    }
}
