//! Error type shared by variable resolution and native command dispatch.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced to the image build.
///
/// None of these are transient: the enclosing build step should stop and
/// report the message, which always tells the operator what to do next.
#[derive(Debug, Error)]
pub enum Error {
    /// Variable source missing, ambiguous or unusable.
    #[error("{0}")]
    Configuration(String),

    /// The OS could not find the program at all.
    #[error("Cannot run command: {command}, lost dependency?")]
    ProcessStart { command: String },

    /// The program exists but could not be started.
    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to run an empty command")]
    EmptyCommand,

    /// A native tool is absent from the sysroot search path.
    #[error("{}", native_missing_message(.program, .recipe))]
    NativeToolMissing {
        program: String,
        recipe: Option<&'static str>,
    },

    #[error("'{command}' returned {code} instead of 0\noutput: {output}")]
    CommandFailed {
        command: String,
        code: i32,
        output: String,
    },

    #[error("directory name {} contains an unexpanded variable reference", .0.display())]
    UnexpandedVariable(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the failure means a required program is not installed.
    pub fn is_missing_dependency(&self) -> bool {
        matches!(
            self,
            Error::ProcessStart { .. } | Error::NativeToolMissing { .. }
        )
    }
}

fn native_missing_message(program: &str, recipe: &Option<&'static str>) -> String {
    let mut msg = format!(
        "A native program {program} required to build the image was not found (see details above).\n\n"
    );
    match recipe {
        Some(recipe) => msg.push_str(&format!(
            "Please make sure the native tools recipe has {recipe}-native in its DEPENDS, \
             rebuild it and try again.\n"
        )),
        None => msg.push_str(&format!(
            "No known recipe builds a native {program}. Please file a bug so one can be added.\n"
        )),
    }
    msg
}

pub type Result<T> = std::result::Result<T, Error>;
