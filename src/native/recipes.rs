//! Which recipe builds which native executable.

/// Executable basename to the recipe that provides it.
pub const NATIVE_RECIPES: &[(&str, &str)] = &[
    ("bmaptool", "bmaptool"),
    ("dumpe2fs", "e2fsprogs"),
    ("grub-mkimage", "grub-efi"),
    ("isohybrid", "syslinux"),
    ("mcopy", "mtools"),
    ("mdel", "mtools"),
    ("mdeltree", "mtools"),
    ("mdir", "mtools"),
    ("mkdosfs", "dosfstools"),
    ("mkisofs", "cdrtools"),
    ("mkfs.btrfs", "btrfs-tools"),
    ("mkfs.erofs", "erofs-utils"),
    ("mkfs.ext2", "e2fsprogs"),
    ("mkfs.ext3", "e2fsprogs"),
    ("mkfs.ext4", "e2fsprogs"),
    ("mkfs.vfat", "dosfstools"),
    ("mksquashfs", "squashfs-tools"),
    ("mkswap", "util-linux"),
    ("mmd", "mtools"),
    ("parted", "parted"),
    ("sfdisk", "util-linux"),
    ("sgdisk", "gptfdisk"),
    ("syslinux", "syslinux"),
    ("tar", "tar"),
];

/// Recipe that provides `program`, if it is a known native tool.
pub fn recipe_for(program: &str) -> Option<&'static str> {
    NATIVE_RECIPES
        .iter()
        .find(|(tool, _)| *tool == program)
        .map(|(_, recipe)| *recipe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_recipes() {
        assert_eq!(recipe_for("mkfs.ext4"), Some("e2fsprogs"));
        assert_eq!(recipe_for("sgdisk"), Some("gptfdisk"));
        assert_eq!(recipe_for("mcopy"), Some("mtools"));
        assert_eq!(recipe_for("ls"), None);
    }

    #[test]
    fn test_table_has_no_duplicate_tools() {
        for (i, (tool, recipe)) in NATIVE_RECIPES.iter().enumerate() {
            assert!(!tool.is_empty());
            assert!(!recipe.is_empty());
            assert!(NATIVE_RECIPES[i + 1..].iter().all(|(other, _)| other != tool));
        }
    }
}
