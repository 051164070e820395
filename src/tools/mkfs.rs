//! Filesystem formatters run from the native sysroot.

use std::path::Path;

use crate::error::Result;
use crate::native::NativeDispatcher;

/// Create an ext4 filesystem in `image`, populated from `rootfs`.
///
/// `pseudo` should be set when the rootfs holds root-owned files recorded by
/// the privilege-emulation wrapper.
pub fn mkfs_ext4(
    dispatcher: &NativeDispatcher<'_>,
    sysroot: &Path,
    rootfs: &Path,
    image: &Path,
    label: &str,
    pseudo: Option<&str>,
) -> Result<()> {
    dispatcher.exec_native_cmd(
        &format!(
            "mkfs.ext4 -F -q -L {label} -d {} {}",
            rootfs.display(),
            image.display()
        ),
        sysroot,
        pseudo,
    )?;
    Ok(())
}

/// Create a FAT filesystem in `image` with a fixed volume id.
pub fn mkfs_vfat(
    dispatcher: &NativeDispatcher<'_>,
    sysroot: &Path,
    image: &Path,
    label: &str,
    volume_id: &str,
) -> Result<()> {
    dispatcher.exec_native_cmd(
        &format!(
            "mkfs.vfat -n {label} -i {} {}",
            volume_id.replace('-', ""),
            image.display()
        ),
        sysroot,
        None,
    )?;
    Ok(())
}
