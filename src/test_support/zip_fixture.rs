//! Builds small ZIP archives on disk for importer tests.

use std::io::Write;
use std::path::{Path, PathBuf};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Writes a ZIP archive at `dir/name` holding `members` in order.
///
/// # Panics
///
/// Panics on any IO error; only used from tests.
#[allow(clippy::expect_used)]
pub fn write_zip(dir: &Path, name: &str, members: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).expect("create zip fixture");
    let mut writer = ZipWriter::new(file);

    for (member, content) in members {
        writer
            .start_file(*member, SimpleFileOptions::default())
            .expect("start zip member");
        writer.write_all(content).expect("write zip member");
    }

    writer.finish().expect("finish zip fixture");
    path
}

/// Encodes `text` as ISO-8859-1; panics on characters above U+00FF.
#[must_use]
pub fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or_else(|_| panic!("{c:?} is not Latin-1")))
        .collect()
}
