// src/test_support.rs
// Helpers shared by the test modules.

use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::FileOptions;
use zip::ZipWriter;

/// Builds a zip archive in memory. Names ending in '/' become directories.
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for (name, content) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, FileOptions::default()).unwrap();
        } else {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
    }

    writer.finish().unwrap().into_inner()
}

/// Writes `zip_bytes(entries)` to `path`.
pub fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    std::fs::write(path, zip_bytes(entries)).unwrap();
}

/// Overwrites the start of an entry's compressed data so reading it fails.
///
/// 0xFF as the first deflate byte is a reserved block type.
pub fn corrupt_entry(archive: &mut [u8], name: &str) {
    let needle = name.as_bytes();
    // The first occurrence of the name is in the entry's local file header
    let name_at = archive
        .windows(needle.len())
        .position(|window| window == needle)
        .expect("entry is in the archive");
    let header = name_at - 30;
    let name_len = u16::from_le_bytes([archive[header + 26], archive[header + 27]]) as usize;
    let extra_len = u16::from_le_bytes([archive[header + 28], archive[header + 29]]) as usize;
    let data = header + 30 + name_len + extra_len;
    for byte in &mut archive[data..data + 3] {
        *byte = 0xFF;
    }
}
