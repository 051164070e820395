//! Dispatch of native tools from a toolchain sysroot.
//!
//! Image assembly calls formatters and partitioners that the build produced
//! for the host (`mkfs.ext4`, `parted`, `mcopy`, ...). They live in a native
//! sysroot, not on the host `PATH`. [`NativeDispatcher`] finds them there,
//! runs them with a `PATH` that puts the sysroot first, and turns
//! "command not found" into an error naming the recipe that is missing.

pub mod recipes;

use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::process::{self, CmdOutput, Invocation};
use crate::vars::VariableStore;

pub use recipes::{recipe_for, NATIVE_RECIPES};

/// Exit code a shell reports for an unknown command.
pub const EXIT_NOT_FOUND: i32 = 127;

/// Sysroot subdirectories searched, in order. `usr/bin/<target>` goes
/// between `usr/bin` and `bin`.
const SYSROOT_DIRS: &[&str] = &["sbin", "usr/sbin", "usr/bin"];

/// How a native tool was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolLocation {
    /// Listed in `ASSUME_PROVIDED`; no path search was done.
    AssumeProvided,
    Found(PathBuf),
}

/// Runs native tools using paths taken from a [`VariableStore`].
pub struct NativeDispatcher<'a> {
    vars: &'a VariableStore,
}

impl<'a> NativeDispatcher<'a> {
    pub fn new(vars: &'a VariableStore) -> Self {
        Self { vars }
    }

    pub fn vars(&self) -> &VariableStore {
        self.vars
    }

    /// Colon-separated search path for tools in `native_sysroot`.
    ///
    /// Segments depending on `TARGET_SYS` and `HOSTTOOLS_DIR` are left out
    /// when the variable is unset.
    pub fn native_search_path(&self, native_sysroot: &Path) -> Result<String> {
        let hosttools_dir = self.vars.get("HOSTTOOLS_DIR")?;
        let target_sys = self.vars.get("TARGET_SYS")?;

        let mut paths: Vec<String> = SYSROOT_DIRS
            .iter()
            .map(|dir| native_sysroot.join(dir).display().to_string())
            .collect();
        if let Some(target) = target_sys.filter(|t| !t.is_empty()) {
            paths.push(native_sysroot.join("usr/bin").join(target).display().to_string());
        }
        paths.push(native_sysroot.join("bin").display().to_string());
        if let Some(dir) = hosttools_dir.filter(|d| !d.is_empty()) {
            paths.push(dir);
        }
        Ok(paths.join(":"))
    }

    /// Locate `program` on `paths`, honouring `ASSUME_PROVIDED`.
    pub fn find_executable(&self, program: &str, paths: &str) -> Result<Option<ToolLocation>> {
        let recipe = recipe_for(program).unwrap_or(program);
        if let Some(provided) = self.vars.get("ASSUME_PROVIDED")? {
            let wanted = format!("{recipe}-native");
            if provided.split_whitespace().any(|p| p == wanted) {
                debug!(program, recipe, "assumed provided by the host");
                return Ok(Some(ToolLocation::AssumeProvided));
            }
        }

        let cwd = std::env::current_dir()?;
        Ok(which::which_in(program, Some(paths), cwd)
            .ok()
            .map(ToolLocation::Found))
    }

    /// Run a native tool through the shell with the sysroot on `PATH`.
    ///
    /// Only the last `;`-separated statement of `cmd_and_args` names the
    /// program; earlier statements (typically `export`s) still run.
    /// `pseudo` is a privilege-emulation wrapper prefixed to the whole line.
    ///
    /// Exit code 127 becomes [`Error::NativeToolMissing`]. So does exit code 1
    /// under `pseudo` when the output is the wrapper's own
    /// `Can't find '<prog>' in $PATH.` message. That match is tied to the
    /// wrapper's exact wording and is only a heuristic. Any other exit code
    /// is returned as is.
    pub fn run_native(
        &self,
        cmd_and_args: &str,
        native_sysroot: &Path,
        pseudo: Option<&str>,
    ) -> Result<CmdOutput> {
        let program = cmd_and_args
            .rsplit(';')
            .next()
            .and_then(|last| last.split_whitespace().next())
            .ok_or(Error::EmptyCommand)?
            .to_string();
        let pseudo = pseudo.filter(|p| !p.is_empty());

        let full_cmd = match pseudo {
            Some(prefix) => format!("{prefix}{cmd_and_args}"),
            None => cmd_and_args.to_string(),
        };

        let native_paths = self.native_search_path(native_sysroot)?;
        let native_cmd = format!(
            "export PATH={}:\"$PATH\";{full_cmd}",
            shell_quote(&native_paths)
        );
        debug!(cmd = %native_cmd, "exec_native_cmd");

        let result = match self.find_executable(&program, &native_paths)? {
            Some(_) => {
                let result = process::run(&Invocation::shell(native_cmd))?;
                CmdOutput {
                    code: result.code,
                    output: result.output.trim().to_string(),
                }
            }
            None => CmdOutput {
                code: EXIT_NOT_FOUND,
                output: format!("can't find native executable {program} in {native_paths}"),
            },
        };
        debug!(program = %program, code = result.code, output = %result.output, "native command finished");

        let pseudo_not_found = pseudo.is_some()
            && result.code == 1
            && result.output == format!("Can't find '{program}' in $PATH.");
        if result.code == EXIT_NOT_FOUND || pseudo_not_found {
            error!(program = %program, output = %result.output, "native program not found");
            return Err(Error::NativeToolMissing {
                recipe: recipe_for(&program),
                program,
            });
        }

        Ok(result)
    }

    /// Like [`run_native`](Self::run_native) but any nonzero exit is an error.
    /// Returns the trimmed output.
    pub fn exec_native_cmd(
        &self,
        cmd_and_args: &str,
        native_sysroot: &Path,
        pseudo: Option<&str>,
    ) -> Result<String> {
        let result = self.run_native(cmd_and_args, native_sysroot, pseudo)?;
        if !result.success() {
            return Err(Error::CommandFailed {
                command: cmd_and_args.to_string(),
                code: result.code,
                output: result.output,
            });
        }
        Ok(result.output)
    }
}

/// Single-quote `value` for `/bin/sh`.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
