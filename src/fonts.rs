//! System font discovery for the glyph renderer.
//!
//! Font directories are indexed once per process by family name and
//! weight. `PAGESMITH_FONTS` (a path list) is searched before the platform
//! directories.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ab_glyph::FontVec;
use ttf_parser::Face;

use crate::error::Error;

const FONTS_ENV: &str = "PAGESMITH_FONTS";

/// Stand-ins for `Arial, sans-serif`, most specific first.
pub(crate) const SANS_FAMILIES: &[&str] = &[
    "arial",
    "helvetica",
    "liberation sans",
    "arimo",
    "dejavu sans",
    "noto sans",
    "freesans",
    "verdana",
];

/// Stand-ins for the generic `monospace` family.
pub(crate) const MONO_FAMILIES: &[&str] = &[
    "courier new",
    "liberation mono",
    "cousine",
    "dejavu sans mono",
    "noto sans mono",
    "menlo",
    "consolas",
    "freemono",
];

#[cfg(target_os = "macos")]
const SYSTEM_DIRS: &[&str] = &[
    "/Library/Fonts",
    "/System/Library/Fonts",
    "/System/Library/Fonts/Supplemental",
];
#[cfg(target_os = "macos")]
const HOME_DIRS: &[&str] = &["Library/Fonts"];

#[cfg(target_os = "linux")]
const SYSTEM_DIRS: &[&str] = &["/usr/share/fonts", "/usr/local/share/fonts"];
#[cfg(target_os = "linux")]
const HOME_DIRS: &[&str] = &[".local/share/fonts", ".fonts"];

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
const SYSTEM_DIRS: &[&str] = &[];
#[cfg(not(any(target_os = "macos", target_os = "linux")))]
const HOME_DIRS: &[&str] = &[];

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct FaceKey {
    /// Lowercased name table family (ID 1).
    family: String,
    bold: bool,
    italic: bool,
}

#[derive(Clone, Debug)]
struct FaceLocation {
    path: PathBuf,
    /// Face number inside a collection; 0 for plain font files.
    index: u32,
}

#[derive(Default)]
struct FontIndex {
    faces: HashMap<FaceKey, FaceLocation>,
    /// Canonical directories already scanned; symlinks may form cycles.
    visited: HashSet<PathBuf>,
}

impl FontIndex {
    fn global() -> &'static FontIndex {
        static INDEX: OnceLock<FontIndex> = OnceLock::new();
        INDEX.get_or_init(|| {
            let mut index = FontIndex::default();
            for dir in search_path() {
                index.add_dir(&dir);
            }
            log::debug!("font index holds {} faces", index.faces.len());
            index
        })
    }

    /// Indexes every font under `dir`. Faces already present are kept, so
    /// directories added first take precedence.
    fn add_dir(&mut self, dir: &Path) {
        let Ok(canonical) = dir.canonicalize() else {
            return;
        };
        if !self.visited.insert(canonical) {
            return;
        }
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
        paths.sort();
        for path in paths {
            if path.is_dir() {
                self.add_dir(&path);
            } else {
                self.add_file(path);
            }
        }
    }

    fn add_file(&mut self, path: PathBuf) {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let collection = match ext.as_deref() {
            Some("ttf" | "otf") => false,
            Some("ttc") => true,
            _ => return,
        };
        let Ok(data) = std::fs::read(&path) else {
            return;
        };
        let faces = if collection { ttf_parser::fonts_in_collection(&data).unwrap_or(1) } else { 1 };
        for index in 0..faces {
            let Some(key) = face_key(&data, index) else {
                continue;
            };
            self.faces
                .entry(key)
                .or_insert_with(|| FaceLocation { path: path.clone(), index });
        }
    }

    fn lookup(&self, family: &str, bold: bool) -> Option<&FaceLocation> {
        self.faces.get(&FaceKey { family: family.to_string(), bold, italic: false })
    }

    /// First family in `families` that is installed. A missing bold face
    /// falls back to the regular one.
    fn find(&self, families: &[&str], bold: bool) -> Option<&FaceLocation> {
        families
            .iter()
            .find_map(|f| self.lookup(f, bold))
            .or_else(|| if bold { self.find(families, false) } else { None })
    }

    /// Any upright regular face, alphabetically first by family.
    fn any_regular(&self) -> Option<&FaceLocation> {
        self.faces
            .iter()
            .filter(|(key, _)| !key.bold && !key.italic)
            .min_by(|(a, _), (b, _)| a.family.cmp(&b.family))
            .map(|(_, location)| location)
    }
}

fn face_key(data: &[u8], index: u32) -> Option<FaceKey> {
    let face = Face::parse(data, index).ok()?;
    // ID 1 keeps "DejaVu Sans Mono" apart from "DejaVu Sans"; the
    // typographic family (ID 16) would merge them.
    let family = face
        .names()
        .into_iter()
        .filter(|n| n.name_id == ttf_parser::name_id::FAMILY && n.is_unicode())
        .find_map(|n| n.to_string())?;
    Some(FaceKey { family: family.to_lowercase(), bold: face.is_bold(), italic: face.is_italic() })
}

fn search_path() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = std::env::var_os(FONTS_ENV)
        .map(|val| std::env::split_paths(&val).filter(|p| !p.as_os_str().is_empty()).collect())
        .unwrap_or_default();
    dirs.extend(SYSTEM_DIRS.iter().map(PathBuf::from));
    if let Some(home) = std::env::var_os("HOME") {
        dirs.extend(HOME_DIRS.iter().map(|d| Path::new(&home).join(d)));
    }
    #[cfg(windows)]
    {
        let windir = std::env::var_os("WINDIR").map(PathBuf::from);
        dirs.push(windir.unwrap_or_else(|| PathBuf::from("C:\\Windows")).join("Fonts"));
    }
    dirs
}

fn load(location: &FaceLocation) -> Option<FontVec> {
    let data = std::fs::read(&location.path).ok()?;
    FontVec::try_from_vec_and_index(data, location.index)
        .map_err(|e| log::warn!("Unusable font {}: {e}", location.path.display()))
        .ok()
}

/// The faces the glyph renderer draws with.
pub struct FontSet {
    pub regular: FontVec,
    pub bold: FontVec,
    pub mono: FontVec,
}

impl FontSet {
    /// Resolves body, bold and monospace faces from the system font index.
    pub fn discover() -> Result<FontSet, Error> {
        let index = FontIndex::global();
        let resolve = |families: &[&str], bold: bool, role: &str| -> Result<FontVec, Error> {
            index
                .find(families, bold)
                .or_else(|| {
                    log::warn!("No {role} font found, falling back to the first installed face");
                    index.any_regular()
                })
                .and_then(load)
                .ok_or_else(|| {
                    Error::Render(format!(
                        "no usable system font found; point {FONTS_ENV} at a font directory"
                    ))
                })
        };

        Ok(FontSet {
            regular: resolve(SANS_FAMILIES, false, "sans-serif")?,
            bold: resolve(SANS_FAMILIES, true, "bold sans-serif")?,
            mono: resolve(MONO_FAMILIES, false, "monospace")?,
        })
    }

    /// Builds a set from raw font files. Missing bold or mono faces reuse
    /// the regular one.
    pub fn from_data(
        regular: Vec<u8>,
        bold: Option<Vec<u8>>,
        mono: Option<Vec<u8>>,
    ) -> Result<FontSet, Error> {
        let parse = |data: Vec<u8>| {
            FontVec::try_from_vec(data).map_err(|e| Error::Render(format!("invalid font: {e}")))
        };
        let bold = bold.unwrap_or_else(|| regular.clone());
        let mono = mono.unwrap_or_else(|| regular.clone());
        Ok(FontSet { regular: parse(regular)?, bold: parse(bold)?, mono: parse(mono)? })
    }
}
