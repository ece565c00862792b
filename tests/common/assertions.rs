//! Custom assertions for archive and response checks

use std::io::{Cursor, Read};
use std::path::Path;

/// Every entry of a ZIP as (name, contents), in archive order
pub fn zip_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("response should be a ZIP");
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).expect("readable entry");
            let mut body = Vec::new();
            file.read_to_end(&mut body).expect("entry contents");
            (file.name().to_string(), body)
        })
        .collect()
}

/// Assert `dir` is missing or holds nothing
pub fn assert_dir_empty(dir: &Path) {
    if let Ok(mut entries) = std::fs::read_dir(dir) {
        let leftover = entries.next();
        assert!(
            leftover.is_none(),
            "{} should be empty, found {:?}",
            dir.display(),
            leftover
        );
    }
}

/// Header value as a string, panicking if absent
pub fn header<'a>(response: &'a reqwest::Response, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing header {}", name))
        .to_str()
        .expect("ASCII header")
}
