//! Lazy, memoizing store of build variables.
//!
//! Variables come from environment dump files (`<image>.env`) written by the
//! build orchestrator. The store is pointed at either one such file or a
//! directory holding several, and parses a file only when a variable of that
//! image is first requested.
//!
//! ```rust,no_run
//! use native_imager::VariableStore;
//!
//! let store = VariableStore::new();
//! store.set_vars_source("build/tmp/sysroots/x86_64/imgdata");
//! let rootfs = store.get("IMAGE_ROOTFS")?;
//! # Ok::<(), native_imager::Error>(())
//! ```

pub mod parse;

use std::collections::HashMap;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// File extension of environment dump files.
pub const ENV_EXTENSION: &str = "env";

/// Command the operator runs to produce an environment dump.
const GENERATE_HINT: &str = "bitbake -c rootfs_wicenv";

/// `None` is the default image.
type ImageKey = Option<String>;
type Submap = Arc<HashMap<String, String>>;

#[derive(Default)]
struct State {
    default_image: Option<String>,
    vars_source: Option<PathBuf>,
    images: HashMap<ImageKey, Submap>,
    parses: usize,
}

/// Build variables keyed by image name.
///
/// Population and lookup happen under one lock, so two threads asking for the
/// same image for the first time never parse its file twice.
#[derive(Default)]
pub struct VariableStore {
    state: Mutex<State>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Image used when a lookup does not name one.
    pub fn set_default_image(&self, image: impl Into<String>) {
        self.lock().default_image = Some(image.into());
    }

    /// File or directory the variables are read from.
    pub fn set_vars_source(&self, source: impl Into<PathBuf>) {
        self.lock().vars_source = Some(source.into());
    }

    pub fn default_image(&self) -> Option<String> {
        self.lock().default_image.clone()
    }

    pub fn vars_source(&self) -> Option<PathBuf> {
        self.lock().vars_source.clone()
    }

    /// Look up `var` for the default image.
    pub fn get(&self, var: &str) -> Result<Option<String>> {
        self.get_var(var, None, true)
    }

    /// Look up `var` for a named image.
    pub fn get_for(&self, var: &str, image: &str) -> Result<Option<String>> {
        self.get_var(var, Some(image), true)
    }

    /// Look up `var`, parsing the image's dump file on first access.
    ///
    /// With `use_cache` false the image's variables are dropped after the
    /// lookup, so the next access rereads the file.
    pub fn get_var(&self, var: &str, image: Option<&str>, use_cache: bool) -> Result<Option<String>> {
        let mut state = self.lock();
        let image: ImageKey = image.map(str::to_string).or_else(|| state.default_image.clone());

        let mut populated_key = image.clone();
        if !state.images.contains_key(&image) {
            populated_key = state.populate(var, image.as_deref(), use_cache)?;
        }

        let key = if state.images.contains_key(&image) {
            image
        } else {
            populated_key
        };
        let value = state
            .images
            .get(&key)
            .and_then(|vars| vars.get(var).cloned());

        if !use_cache {
            debug!(image = ?key, "evicting cached variables");
            state.images.remove(&key);
        }

        Ok(value)
    }

    /// Drop cached variables for `image` (`None` is the default image).
    pub fn evict(&self, image: Option<&str>) {
        self.lock().images.remove(&image.map(str::to_string));
    }

    /// True when variables for `image` are already parsed.
    pub fn is_cached(&self, image: Option<&str>) -> bool {
        self.lock().images.contains_key(&image.map(str::to_string))
    }

    /// Number of dump files parsed so far.
    #[cfg(test)]
    fn parse_count(&self) -> usize {
        self.lock().parses
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic mid-populate leaves at worst a missing entry; keep going.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl State {
    /// Parse the dump file for `image` and return the key it was stored under.
    fn populate(&mut self, var: &str, image: Option<&str>, use_cache: bool) -> Result<ImageKey> {
        let source = self.vars_source.clone().ok_or_else(|| {
            Error::Configuration(format!(
                "Build environment not provided. Run '{GENERATE_HINT} <image>' \
                 and pass --vars /path/to/<image>.env."
            ))
        })?;

        let (file, image_key) = resolve_env_file(&source, image)?;

        if !file.is_file() {
            return Err(Error::Configuration(format!(
                "Couldn't get variable {var} from {}. Generate the vars file with \
                 '{GENERATE_HINT} {}' and pass it using --vars.",
                file.display(),
                image_key.as_deref().unwrap_or("<image>")
            )));
        }

        debug!(file = %file.display(), image = ?image_key, "parsing build variables");
        let unreadable = |e: std::io::Error| {
            Error::Configuration(format!(
                "Couldn't read variables from {}: {e}. Regenerate it with \
                 '{GENERATE_HINT} {}' and pass it using --vars.",
                file.display(),
                image_key.as_deref().unwrap_or("<image>")
            ))
        };
        let reader = BufReader::new(fs::File::open(&file).map_err(unreadable)?);
        let mut vars = HashMap::new();
        parse::parse_into(reader, &mut vars).map_err(unreadable)?;
        self.parses += 1;
        debug!(vars = vars.len(), parses = self.parses, "build variables parsed");
        let vars = Arc::new(vars);
        self.images.insert(image_key.clone(), Arc::clone(&vars));

        // The first image ever parsed doubles as the default set.
        if use_cache {
            let named = self.images.keys().filter(|key| key.is_some()).count();
            if named == 1 {
                self.images.insert(None, vars);
            }
        }

        Ok(image_key)
    }
}

/// Pick the dump file for `image` and the key its variables belong under.
fn resolve_env_file(source: &Path, image: Option<&str>) -> Result<(PathBuf, ImageKey)> {
    if source.is_file() {
        let key = match image {
            Some(image) => Some(image.to_string()),
            None => source
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_string),
        };
        return Ok((source.to_path_buf(), key));
    }

    if !source.is_dir() {
        return Err(Error::Configuration(format!(
            "The supplied vars path {} does not exist.",
            source.display()
        )));
    }

    if let Some(image) = image {
        let file = source.join(format!("{image}.{ENV_EXTENSION}"));
        return Ok((file, Some(image.to_string())));
    }

    let mut env_files = list_env_files(source)?;
    match env_files.len() {
        0 => Err(Error::Configuration(format!(
            "No .env files found in {}. Run '{GENERATE_HINT} <image>' to generate one.",
            source.display()
        ))),
        1 => {
            let file = env_files.remove(0);
            let key = file
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_string);
            Ok((file, key))
        }
        _ => Err(Error::Configuration(format!(
            "Multiple .env files found in {}. Select one with --image-name or point \
             --vars to the specific file.",
            source.display()
        ))),
    }
}

fn list_env_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            Error::Configuration(format!(
                "Couldn't list {}: {e}. Point --vars at a readable directory or at \
                 the <image>.env file written by '{GENERATE_HINT} <image>'.",
                dir.display()
            ))
        })?;
        let path = entry.path();
        let is_env = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(&format!(".{ENV_EXTENSION}")));
        if is_env && !entry.file_type().is_dir() {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}
