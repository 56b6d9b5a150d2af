//! Where PaperSage stores its own data (config, paper catalog).
//!
//! Downloaded papers are never kept here; they live in temp files for one request.

use std::path::PathBuf;

/// Overrides the data directory when set (handy for scripts and CI).
pub const DATA_DIR_ENV: &str = "PAPERSAGE_DATA_DIR";

/// Returns the directory where PaperSage stores config and the catalog.
/// On macOS: `~/Library/Application Support/PaperSage/`.
/// Creates the directory if it doesn't exist; returns `None` if we can't determine the path.
pub fn app_data_dir() -> Option<PathBuf> {
    data_dir_from(std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
}

fn data_dir_from(override_dir: Option<PathBuf>) -> Option<PathBuf> {
    let dir = match override_dir {
        Some(dir) => dir,
        None => directories::ProjectDirs::from("app", "PaperSage", "PaperSage")?
            .data_local_dir()
            .to_path_buf(),
    };
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_is_created_and_used() {
        let tmp = tempfile::TempDir::new().unwrap();
        let wanted = tmp.path().join("nested").join("data");
        assert_eq!(data_dir_from(Some(wanted.clone())), Some(wanted.clone()));
        assert!(wanted.is_dir());
    }
}
