//! Files queued for conversion and their per-file state machine.
//!
//! ```text
//! Pending --convert--> Converting --ok--> Completed
//!                           \------err--> Error --retry--> Pending
//! ```
//!
//! State only changes through the methods below or the progress callback of
//! a running conversion. Batches convert strictly one file at a time.

use crate::convert::Converter;
use crate::error::{Error, ErrorKind};
use crate::model::{ConversionOptions, Document, FileId, Format, Output};
use crate::render::{GlyphRenderer, RenderEngine};
use crate::validate::{output_file_name, preview, validate_upload};

#[derive(Clone, Debug, PartialEq)]
pub enum FileStatus {
    Pending,
    Converting { progress: u8 },
    Completed { output: Output },
    Error { kind: ErrorKind, message: String },
}

impl FileStatus {
    /// Percentage to display for this state.
    pub fn progress(&self) -> u8 {
        match self {
            FileStatus::Pending | FileStatus::Error { .. } => 0,
            FileStatus::Converting { progress } => *progress,
            FileStatus::Completed { .. } => 100,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FileEntry {
    pub id: FileId,
    pub name: String,
    pub document: Document,
    pub preview: String,
    status: FileStatus,
}

impl FileEntry {
    pub fn status(&self) -> &FileStatus {
        &self.status
    }

    pub fn output(&self) -> Option<&Output> {
        match &self.status {
            FileStatus::Completed { output } => Some(output),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub pending: usize,
    pub converting: usize,
    pub completed: usize,
    pub failed: usize,
}

pub struct Session<E = GlyphRenderer> {
    converter: Converter<E>,
    options: ConversionOptions,
    files: Vec<FileEntry>,
    next_id: u64,
}

impl Default for Session<GlyphRenderer> {
    fn default() -> Self {
        Session::new()
    }
}

impl Session<GlyphRenderer> {
    pub fn new() -> Self {
        Session::with_converter(Converter::new())
    }
}

impl<E: RenderEngine> Session<E> {
    pub fn with_converter(converter: Converter<E>) -> Self {
        Session { converter, options: ConversionOptions::default(), files: Vec::new(), next_id: 1 }
    }

    /// Styling and image options applied to every conversion; the format
    /// is chosen per request.
    pub fn with_options(mut self, options: ConversionOptions) -> Self {
        self.options = options;
        self
    }

    /// The converter files are run through; its viewport shows whether any
    /// container is still mounted.
    pub fn converter(&self) -> &Converter<E> {
        &self.converter
    }

    /// Validates an upload and queues it as pending. Bytes that are not
    /// valid UTF-8 are decoded lossily.
    pub fn add(&mut self, name: &str, mime: &str, bytes: &[u8]) -> Result<FileId, Error> {
        let mime_kind = validate_upload(name, mime, bytes.len() as u64)?;
        let content = String::from_utf8_lossy(bytes).into_owned();
        let id = FileId(self.next_id);
        self.next_id += 1;
        log::info!("queued {name} as {id} ({})", mime_kind.mime());
        self.files.push(FileEntry {
            id,
            name: name.to_string(),
            preview: preview(&content),
            document: Document { content, mime_kind, size_bytes: bytes.len() as u64 },
            status: FileStatus::Pending,
        });
        Ok(id)
    }

    pub fn get(&self, id: FileId) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn remove(&mut self, id: FileId) -> Option<FileEntry> {
        let idx = self.files.iter().position(|f| f.id == id)?;
        Some(self.files.remove(idx))
    }

    /// Drops every file and its converted output.
    pub fn clear(&mut self) {
        log::debug!("clearing {} file(s)", self.files.len());
        self.files.clear();
    }

    /// Moves a failed file back to pending.
    pub fn retry(&mut self, id: FileId) -> Result<(), Error> {
        let entry = self.entry_mut(id)?;
        if !matches!(entry.status, FileStatus::Error { .. }) {
            return Err(Error::Validation(format!("{id} has not failed")));
        }
        entry.status = FileStatus::Pending;
        Ok(())
    }

    pub fn convert(&mut self, id: FileId, format: Format) -> Result<&FileStatus, Error> {
        self.convert_observed(id, format, &mut |_, _| {})
    }

    /// Converts one pending file, reporting progress to `observer` as well
    /// as recording it on the entry. A failed conversion is not an `Err`;
    /// it leaves the file in [`FileStatus::Error`].
    pub fn convert_observed(
        &mut self,
        id: FileId,
        format: Format,
        observer: &mut dyn FnMut(FileId, u8),
    ) -> Result<&FileStatus, Error> {
        let options = ConversionOptions { format, ..self.options };
        let Session { converter, files, .. } = self;
        let entry = files
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| Error::Validation(format!("no file with id {id}")))?;
        if entry.status != FileStatus::Pending {
            return Err(Error::Validation(format!("{} is not pending", entry.name)));
        }

        entry.status = FileStatus::Converting { progress: 0 };
        observer(id, 0);
        let document = &entry.document;
        let status = &mut entry.status;
        let outcome = converter.dispatch(id, document, &options, &mut |p| {
            *status = FileStatus::Converting { progress: p };
            observer(id, p);
        });

        entry.status = match outcome.result {
            Ok(output) => {
                log::info!("{} converted to {} ({} bytes)", entry.name, format, output.len());
                FileStatus::Completed { output }
            }
            Err(failure) => FileStatus::Error { kind: failure.kind, message: failure.message },
        };
        Ok(&entry.status)
    }

    pub fn convert_all(&mut self, format: Format) -> Vec<FileId> {
        self.convert_all_observed(format, &mut |_, _| {})
    }

    /// Converts every pending file in queue order, one at a time. A failure
    /// does not stop the batch. Returns the ids that were attempted.
    pub fn convert_all_observed(
        &mut self,
        format: Format,
        observer: &mut dyn FnMut(FileId, u8),
    ) -> Vec<FileId> {
        let pending: Vec<FileId> = self
            .files
            .iter()
            .filter(|f| f.status == FileStatus::Pending)
            .map(|f| f.id)
            .collect();
        for &id in &pending {
            if let Err(e) = self.convert_observed(id, format, observer) {
                log::warn!("skipping {id}: {e}");
            }
        }
        pending
    }

    pub fn completed(&self) -> impl Iterator<Item = (&FileEntry, &Output)> {
        self.files.iter().filter_map(|f| f.output().map(|o| (f, o)))
    }

    /// File name to save a completed conversion under.
    pub fn download_name(&self, id: FileId) -> Option<String> {
        let entry = self.get(id)?;
        let output = entry.output()?;
        Some(output_file_name(&entry.name, output.format))
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary { total: self.files.len(), ..Summary::default() };
        for file in &self.files {
            match file.status {
                FileStatus::Pending => summary.pending += 1,
                FileStatus::Converting { .. } => summary.converting += 1,
                FileStatus::Completed { .. } => summary.completed += 1,
                FileStatus::Error { .. } => summary.failed += 1,
            }
        }
        summary
    }

    fn entry_mut(&mut self, id: FileId) -> Result<&mut FileEntry, Error> {
        self.files
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| Error::Validation(format!("no file with id {id}")))
    }
}
