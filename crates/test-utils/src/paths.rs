//! Path utilities for locating test data and naming synthetic files.

use std::path::PathBuf;

/// Returns the workspace root directory.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Searches for a real data file.
///
/// Checks, in order:
/// 1. Environment variable `TEST_DATA_DIR` (if set)
/// 2. `crates/xrit-loader/testdata/`
/// 3. `testdata/` at the workspace root
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(test_data_dir) = std::env::var("TEST_DATA_DIR") {
        candidates.push(PathBuf::from(test_data_dir).join(name));
    }

    let root = workspace_root();
    candidates.extend([
        root.join("crates/xrit-loader/testdata").join(name),
        root.join("testdata").join(name),
    ]);

    candidates.into_iter().find(|p| p.exists())
}

/// EUMETSAT style HRIT file name, e.g.
/// `H-000-MSG2__-MSG2________-IR_108___-000004___-201010111400-__`.
///
/// `segment` is the segment field (a number, `PRO______` or `EPI______`),
/// already padded or not; padding is applied here.
pub fn hrit_file_name(platform: &str, channel: &str, segment: &str, time: &str) -> String {
    format!(
        "H-000-{:_<6}-{:_<12}-{:_<9}-{:_<9}-{}-__",
        platform, platform, channel, segment, time
    )
}

/// Creates a temporary directory for synthetic segment files.
///
/// The directory is removed when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("hrit_test_")
        .tempdir()
        .expect("Failed to create temporary test directory")
}
