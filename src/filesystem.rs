//! Filesystem helpers for image work directories.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Create `path` and any missing parents, like `mkdir -p`.
///
/// A path still holding `${...}` came from a build variable that was never
/// expanded; creating it would litter the work directory, so it is rejected.
pub fn mkdirhier(path: &Path) -> Result<()> {
    if path.to_string_lossy().contains("${") {
        return Err(Error::UnexpandedVariable(path.to_path_buf()));
    }
    fs::create_dir_all(path)?;
    Ok(())
}
