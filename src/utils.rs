use crate::error::Result;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the data directory from the environment or use the default
pub fn get_data_dir() -> PathBuf {
    std::env::var("PRICEBOARD_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(crate::constants::DEFAULT_DATA_DIR))
}

/// Get the indicator config path from the environment or use the default
pub fn get_config_path() -> PathBuf {
    std::env::var("PRICEBOARD_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(crate::constants::DEFAULT_CONFIG_PATH))
}

/// Serialize `value` to pretty JSON and write it through a temp-file rename,
/// so readers never observe a partially written file. Parent directories are
/// created on demand.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_json_atomic_creates_parents_and_no_tmp_left() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");

        write_json_atomic(&path, &vec![1, 2, 3]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: Vec<i32> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, vec![1, 2, 3]);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
