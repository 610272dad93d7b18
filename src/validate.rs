use crate::error::Error;
use crate::model::{Format, MimeKind};

/// Upload ceiling, 10 MiB.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

const PREVIEW_CHARS: usize = 500;

/// Checks an upload against the size cap and the MIME allow-list.
///
/// This is the only place either rule is enforced; converters trust the
/// `Document` they are handed.
pub fn validate_upload(name: &str, mime: &str, size_bytes: u64) -> Result<MimeKind, Error> {
    if size_bytes > MAX_FILE_SIZE {
        return Err(Error::Validation(format!(
            "{name}: File size exceeds 10MB limit. Current size: {}",
            format_file_size(size_bytes)
        )));
    }
    MimeKind::from_mime(mime).ok_or_else(|| {
        Error::Validation(format!(
            "{name}: Unsupported file type: {mime}. Only HTML and TXT files are supported."
        ))
    })
}

/// Human-readable size with up to two decimals, e.g. `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut unit = 0;
    let mut divisor = 1u64;
    while unit + 1 < UNITS.len() && bytes >= divisor * 1024 {
        divisor *= 1024;
        unit += 1;
    }
    let value = format!("{:.2}", bytes as f64 / divisor as f64);
    let value = value.trim_end_matches('0').trim_end_matches('.');
    format!("{value} {}", UNITS[unit])
}

/// First 500 characters of the content, with an ellipsis when truncated.
pub fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

/// Replaces the trailing extension of `name` with the one for `format`.
pub fn output_file_name(name: &str, format: Format) -> String {
    let stem = match name.rfind('.') {
        Some(dot) => {
            let ext = &name[dot + 1..];
            if ext.is_empty() || ext.contains('/') { name } else { &name[..dot] }
        }
        None => name,
    };
    format!("{stem}.{}", format.extension())
}
