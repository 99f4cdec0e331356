use std::path::{Path, PathBuf};

/// Build a concat demuxer manifest, one `file '<path>'` line per input.
///
/// Inside single quotes the demuxer takes everything literally, so an
/// embedded quote has to close the string, be escaped, and reopen it.
pub fn concat_manifest(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|path| format!("file '{}'\n", quote_path(path)))
        .collect()
}

fn quote_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}
