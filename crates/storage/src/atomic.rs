//! Atomic file replacement
//!
//! Files are written to a sibling temp file and renamed over the target, so
//! readers see either the old content or the new content, never a partial
//! write. In `sync` mode the temp file is fsynced before the rename.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Temp file name used while replacing `path`
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace the content of `path` atomically, creating parent directories
pub(crate) fn write_atomic(path: &Path, bytes: &[u8], sync: bool) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let tmp_path = temp_path(path);
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        if sync {
            file.sync_all()?;
        }
    }
    fs::rename(&tmp_path, path)
}
