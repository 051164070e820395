//! mtools file operations for FAT image manipulation.

use std::path::Path;

use crate::error::Result;
use crate::native::NativeDispatcher;

/// Create a directory in a FAT image using mmd.
pub fn mmd(dispatcher: &NativeDispatcher<'_>, sysroot: &Path, image: &Path, dir: &str) -> Result<()> {
    dispatcher.exec_native_cmd(
        &format!("mmd -i {} ::{}", image.display(), dir),
        sysroot,
        None,
    )?;
    Ok(())
}

/// Copy a file into a FAT image using mcopy.
pub fn mcopy(
    dispatcher: &NativeDispatcher<'_>,
    sysroot: &Path,
    image: &Path,
    src: &Path,
    dest: &str,
) -> Result<()> {
    dispatcher.exec_native_cmd(
        &format!("mcopy -i {} -s {} ::{}", image.display(), src.display(), dest),
        sysroot,
        None,
    )?;
    Ok(())
}
