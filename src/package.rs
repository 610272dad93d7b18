use std::io::{Cursor, Write};

use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Writes `parts` into an in-memory zip archive, in the given order.
///
/// Entries carry the zip epoch as their timestamp so identical parts always
/// produce an identical archive.
pub(crate) fn package(parts: &[(&str, &[u8])]) -> Result<Vec<u8>, ZipError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    for (name, data) in parts {
        zip.start_file(*name, options)?;
        zip.write_all(data)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn entries_keep_their_order_and_contents() {
        let bytes = package(&[
            ("b.txt", b"second".as_slice()),
            ("a/c.xml", b"<x/>".as_slice()),
        ])
        .unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names = Vec::new();
        for i in 0..archive.len() {
            names.push(archive.by_index(i).unwrap().name().to_string());
        }
        assert_eq!(names, vec!["b.txt", "a/c.xml"]);

        let mut content = String::new();
        archive.by_name("a/c.xml").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "<x/>");
    }

    #[test]
    fn output_is_deterministic() {
        let parts = [("x", b"same".as_slice())];
        assert_eq!(package(&parts).unwrap(), package(&parts).unwrap());
    }
}
