//! Command-line shell around the translator library.
//!
//! Handles everything the core deliberately does not: argument parsing,
//! discovery of `.vm` files under a path, choosing the output location, and
//! file I/O. Errors go to stderr and exit non-zero.

use std::env;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use hack_vm_translator::{translate, SourceUnit, TranslateOptions};

struct Args {
  input: PathBuf,
  output: Option<PathBuf>,
  include_bootstrap: bool,
}

fn parse_args() -> Result<Args, String> {
  let mut args = env::args().skip(1);
  let mut input = None;
  let mut output = None;
  let mut include_bootstrap = true;

  while let Some(arg) = args.next() {
    match arg.as_str() {
      "-o" | "--output" => {
        let value = args
          .next()
          .ok_or_else(|| format!("`{arg}` expects a file path"))?;
        output = Some(PathBuf::from(value));
      }
      "--no-bootstrap" => include_bootstrap = false,
      _ if arg.starts_with('-') => return Err(format!("unknown option `{arg}`")),
      _ => {
        if input.is_some() {
          return Err("more than one input path given".to_string());
        }
        input = Some(PathBuf::from(arg));
      }
    }
  }

  let input = input.ok_or_else(|| "no input path given".to_string())?;
  Ok(Args {
    input,
    output,
    include_bootstrap,
  })
}

/// A single `.vm` file yields one unit; a directory yields one unit per
/// `.vm` file it contains, sorted by name so the output is deterministic.
fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>, String> {
  if input.is_file() {
    return Ok(vec![input.to_path_buf()]);
  }

  if input.is_dir() {
    let entries =
      fs::read_dir(input).map_err(|err| format!("cannot read {}: {err}", input.display()))?;
    let mut files: Vec<PathBuf> = entries
      .filter_map(|entry| entry.ok())
      .map(|entry| entry.path())
      .filter(|path| path.extension() == Some(OsStr::new("vm")))
      .collect();
    files.sort();
    if files.is_empty() {
      return Err(format!("no .vm files found in {}", input.display()));
    }
    return Ok(files);
  }

  Err(format!("{} is not a file or directory", input.display()))
}

fn unit_name(path: &Path) -> String {
  path
    .file_stem()
    .map(|stem| stem.to_string_lossy().into_owned())
    .unwrap_or_default()
}

/// Default output: `Foo.vm` becomes `Foo.asm`; a directory `Dir/` becomes
/// `Dir/Dir.asm`.
fn default_output(input: &Path) -> PathBuf {
  if input.is_dir() {
    let name = unit_name(input);
    input.join(format!("{name}.asm"))
  } else {
    input.with_extension("asm")
  }
}

fn run(args: &Args) -> Result<(), String> {
  let mut units = Vec::new();
  for path in collect_inputs(&args.input)? {
    let source =
      fs::read_to_string(&path).map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    units.push(SourceUnit::new(unit_name(&path), source));
  }

  let options = TranslateOptions {
    include_bootstrap: args.include_bootstrap,
  };
  let asm = translate(&units, options).map_err(|err| err.to_string())?;

  let output = args
    .output
    .clone()
    .unwrap_or_else(|| default_output(&args.input));
  fs::write(&output, asm).map_err(|err| format!("cannot write {}: {err}", output.display()))?;

  Ok(())
}

fn main() {
  let args = match parse_args() {
    Ok(args) => args,
    Err(message) => {
      let program = env::args().next().unwrap_or_else(|| "hack-vm-translator".to_string());
      eprintln!("{message}");
      eprintln!("usage: {program} <file.vm | directory> [-o <file.asm>] [--no-bootstrap]");
      process::exit(1);
    }
  };

  if let Err(message) = run(&args) {
    eprintln!("{message}");
    process::exit(1);
  }
}
