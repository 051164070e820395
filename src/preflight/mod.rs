//! Preflight checks for native tools.
//!
//! [`NativeDispatcher::run_native`] stops at the first missing tool. Before a
//! long image build it is friendlier to check every tool the build needs and
//! list all missing recipes at once.
//!
//! # Example
//!
//! ```rust,no_run
//! use native_imager::{preflight, NativeDispatcher, VariableStore};
//! use std::path::Path;
//!
//! let store = VariableStore::new();
//! store.set_vars_source("imgdata");
//! let dispatcher = NativeDispatcher::new(&store);
//! preflight::check_native_tools(&dispatcher, Path::new("recipe-sysroot-native"), &["mkfs.ext4", "sfdisk"])?;
//! # Ok::<(), native_imager::Error>(())
//! ```

use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::native::{recipe_for, NativeDispatcher};

/// Tools needed to assemble a partitioned disk image with an EFI partition.
pub const DISK_IMAGE_TOOLS: &[&str] = &["sfdisk", "mkfs.ext4", "mkfs.vfat", "mmd", "mcopy"];

/// Check that every program in `programs` can be found for `native_sysroot`.
///
/// # Returns
///
/// * `Ok(())` if all tools are found or assumed provided
/// * `Err(Error::Configuration)` listing each missing tool and its recipe
pub fn check_native_tools(
    dispatcher: &NativeDispatcher<'_>,
    native_sysroot: &Path,
    programs: &[&str],
) -> Result<()> {
    let paths = dispatcher.native_search_path(native_sysroot)?;
    let mut missing = Vec::new();

    for program in programs {
        match dispatcher.find_executable(program, &paths)? {
            Some(location) => debug!(program, ?location, "native tool available"),
            None => missing.push(*program),
        }
    }

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|tool| match recipe_for(tool) {
                Some(recipe) => format!("  {tool} (add: {recipe}-native)"),
                None => format!("  {tool} (no known recipe)"),
            })
            .collect::<Vec<_>>()
            .join("\n");
        return Err(Error::Configuration(format!(
            "Missing native tools in {}:\n{msg}",
            native_sysroot.display()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VariableStore;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn test_reports_every_missing_tool() {
        let tmp = TempDir::new().unwrap();
        let env = tmp.path().join("img.env");
        fs::write(&env, "ASSUME_PROVIDED=\"dosfstools-native\"\n").unwrap();
        let sysroot = tmp.path().join("sysroot");
        fs::create_dir_all(sysroot.join("usr/sbin")).unwrap();
        let sfdisk = sysroot.join("usr/sbin/sfdisk");
        fs::write(&sfdisk, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&sfdisk, fs::Permissions::from_mode(0o755)).unwrap();

        let store = VariableStore::new();
        store.set_vars_source(&env);
        let dispatcher = NativeDispatcher::new(&store);

        let err = check_native_tools(&dispatcher, &sysroot, DISK_IMAGE_TOOLS).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("mkfs.ext4 (add: e2fsprogs-native)"));
        assert!(msg.contains("mmd (add: mtools-native)"));
        assert!(msg.contains("mcopy (add: mtools-native)"));
        assert!(!msg.contains("sfdisk"));
        assert!(!msg.contains("mkfs.vfat"));
    }

    #[test]
    fn test_all_present() {
        let tmp = TempDir::new().unwrap();
        let env = tmp.path().join("img.env");
        fs::write(&env, "ASSUME_PROVIDED=\"util-linux-native\"\n").unwrap();

        let store = VariableStore::new();
        store.set_vars_source(&env);
        let dispatcher = NativeDispatcher::new(&store);

        assert!(check_native_tools(&dispatcher, tmp.path(), &["sfdisk", "mkswap"]).is_ok());
    }
}
