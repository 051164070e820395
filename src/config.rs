//! Settings file for the command line tool.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::vars::VariableStore;

/// File name looked up in the working directory.
pub const LOCAL_CONFIG: &str = "native-imager.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// `.env` file or directory of them.
    pub vars: Option<PathBuf>,
    /// Image used when a lookup does not name one.
    pub image_name: Option<String>,
    pub native_sysroot: Option<PathBuf>,
    /// Privilege-emulation wrapper prefix, e.g. `"pseudo "`.
    pub pseudo: Option<String>,
}

impl Settings {
    /// Read settings from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("reading settings '{}': {e}", path.display()))
        })?;
        toml::from_str(&text).map_err(|e| {
            Error::Configuration(format!("parsing settings '{}': {e}", path.display()))
        })
    }

    /// Load the first settings file that exists.
    ///
    /// An explicit path must exist. Otherwise `./native-imager.toml` and then
    /// `<config dir>/native-imager/config.toml` are tried; none means
    /// empty settings.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidates = [
            Some(PathBuf::from(LOCAL_CONFIG)),
            dirs::config_dir().map(|dir| dir.join("native-imager").join("config.toml")),
        ];
        match candidates.into_iter().flatten().find(|path| path.is_file()) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Assign the externally supplied store settings.
    pub fn apply_to(&self, store: &VariableStore) {
        if let Some(vars) = &self.vars {
            store.set_vars_source(vars);
        }
        if let Some(image) = &self.image_name {
            store.set_default_image(image);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_and_apply() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("native-imager.toml");
        fs::write(
            &path,
            "vars = \"/build/imgdata\"\nimage_name = \"core-image-minimal\"\npseudo = \"pseudo \"\n",
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.vars.as_deref(), Some(Path::new("/build/imgdata")));
        assert_eq!(settings.pseudo.as_deref(), Some("pseudo "));
        assert_eq!(settings.native_sysroot, None);

        let store = VariableStore::new();
        settings.apply_to(&store);
        assert_eq!(store.default_image().as_deref(), Some("core-image-minimal"));
        assert_eq!(store.vars_source().as_deref(), Some(Path::new("/build/imgdata")));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        fs::write(&path, "varz = \"oops\"\n").unwrap();
        assert!(matches!(Settings::load(&path), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let tmp = TempDir::new().unwrap();
        assert!(Settings::discover(Some(&tmp.path().join("missing.toml"))).is_err());
    }
}
