use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use native_imager::config::Settings;
use native_imager::{preflight, NativeDispatcher, VariableStore};
use tracing_subscriber::EnvFilter;

fn usage() -> &'static str {
    "Usage:\n  native-imager [--config <file>] [--vars <path>] [--image-name <name>] [--sysroot <dir>] [-v] <command>\n\nCommands:\n  get-var <NAME>\n  run-native <command line...>\n  check-native [tool...]"
}

#[derive(Default)]
struct GlobalArgs {
    config: Option<PathBuf>,
    vars: Option<PathBuf>,
    image_name: Option<String>,
    sysroot: Option<PathBuf>,
    verbose: bool,
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (global, rest) = parse_global(&args)?;

    let default_level = if global.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::discover(global.config.as_deref()).context("loading settings")?;
    let store = VariableStore::new();
    settings.apply_to(&store);
    if let Some(vars) = &global.vars {
        store.set_vars_source(vars);
    }
    if let Some(image) = &global.image_name {
        store.set_default_image(image);
    }

    match rest {
        [cmd, name] if cmd == "get-var" => get_var(&store, name),
        [cmd, line @ ..] if cmd == "run-native" && !line.is_empty() => {
            let sysroot = native_sysroot(&store, &global, &settings)?;
            run_native(&store, &settings, &sysroot, &line.join(" "))
        }
        [cmd, tools @ ..] if cmd == "check-native" => {
            let sysroot = native_sysroot(&store, &global, &settings)?;
            check_native(&store, &sysroot, tools)
        }
        _ => bail!(usage()),
    }
}

fn parse_global(args: &[String]) -> Result<(GlobalArgs, &[String])> {
    let mut global = GlobalArgs::default();
    let mut rest = args;
    loop {
        match rest {
            [flag, value, tail @ ..] if flag == "--config" => {
                global.config = Some(PathBuf::from(value));
                rest = tail;
            }
            [flag, value, tail @ ..] if flag == "--vars" => {
                global.vars = Some(PathBuf::from(value));
                rest = tail;
            }
            [flag, value, tail @ ..] if flag == "--image-name" => {
                global.image_name = Some(value.clone());
                rest = tail;
            }
            [flag, value, tail @ ..] if flag == "--sysroot" => {
                global.sysroot = Some(PathBuf::from(value));
                rest = tail;
            }
            [flag, tail @ ..] if flag == "-v" || flag == "--verbose" => {
                global.verbose = true;
                rest = tail;
            }
            [flag, ..] if flag.starts_with('-') => {
                bail!("unknown or incomplete option '{}'\n\n{}", flag, usage())
            }
            _ => return Ok((global, rest)),
        }
    }
}

/// `--sysroot`, then the settings file, then the build's own native sysroot.
fn native_sysroot(store: &VariableStore, global: &GlobalArgs, settings: &Settings) -> Result<PathBuf> {
    if let Some(dir) = global.sysroot.clone().or_else(|| settings.native_sysroot.clone()) {
        return Ok(dir);
    }
    match store.get("STAGING_DIR_NATIVE")? {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => bail!("no native sysroot: pass --sysroot or set native_sysroot in the settings file"),
    }
}

fn get_var(store: &VariableStore, name: &str) -> Result<()> {
    match store.get(name)? {
        Some(value) => {
            println!("{value}");
            Ok(())
        }
        None => {
            println!();
            std::process::exit(1);
        }
    }
}

fn run_native(
    store: &VariableStore,
    settings: &Settings,
    sysroot: &Path,
    line: &str,
) -> Result<()> {
    let dispatcher = NativeDispatcher::new(store);
    let result = dispatcher
        .run_native(line, sysroot, settings.pseudo.as_deref())
        .with_context(|| format!("running '{line}' from '{}'", sysroot.display()))?;
    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    if !result.success() {
        std::process::exit(result.code.clamp(1, 255));
    }
    Ok(())
}

fn check_native(store: &VariableStore, sysroot: &Path, tools: &[String]) -> Result<()> {
    let dispatcher = NativeDispatcher::new(store);
    let tools: Vec<&str> = if tools.is_empty() {
        preflight::DISK_IMAGE_TOOLS.to_vec()
    } else {
        tools.iter().map(String::as_str).collect()
    };
    preflight::check_native_tools(&dispatcher, sysroot, &tools)?;
    println!("all {} native tools available", tools.len());
    Ok(())
}
