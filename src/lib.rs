//! Build-variable resolution and native tool dispatch for disk image assembly.
//!
//! An image build consumes configuration produced by the build orchestrator
//! and calls native, host-built tools (filesystem formatters, partitioners,
//! bootloader installers) to write the image. This crate covers the two
//! pieces every image plugin leans on:
//!
//! - **Variable store** - lazy, cached lookup of build variables from
//!   `<image>.env` dump files
//! - **Native dispatch** - run a tool out of the native sysroot and turn
//!   "command not found" into an error naming the recipe to add
//! - **Process runner** - the blocking, output-capturing executor under both
//!
//! # Architecture
//!
//! ```text
//! image planner (caller)
//!     │
//!     ├── VariableStore::get ──────────── <image>.env files
//!     │
//!     └── NativeDispatcher::run_native
//!             │
//!             ├── VariableStore (HOSTTOOLS_DIR, TARGET_SYS, ASSUME_PROVIDED)
//!             └── process::run ─────────── /bin/sh -c "export PATH=...; tool"
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use native_imager::{NativeDispatcher, VariableStore};
//! use std::path::Path;
//!
//! let store = VariableStore::new();
//! store.set_vars_source("tmp/sysroots/imgdata/core-image-minimal.env");
//!
//! let sysroot = store.get("RECIPE_SYSROOT_NATIVE")?.unwrap_or_default();
//! let dispatcher = NativeDispatcher::new(&store);
//! let out = dispatcher.exec_native_cmd("parted -s disk.img print", Path::new(&sysroot), None)?;
//! println!("{out}");
//! # Ok::<(), native_imager::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod filesystem;
pub mod native;
pub mod preflight;
pub mod process;
pub mod tools;
pub mod vars;

pub use error::{Error, Result};
pub use native::{NativeDispatcher, ToolLocation};
pub use process::{CmdOutput, Invocation};
pub use vars::VariableStore;
