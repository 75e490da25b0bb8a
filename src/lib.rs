//! Crate root: wires together the VM translation pipeline.
//!
//! The stages are intentionally small and composable so they can be evolved
//! independently:
//! - `parser` turns raw VM lines into structured commands.
//! - `symbols` scopes user labels and statics, and mints generated labels.
//! - `codegen` lowers each command into Hack assembly.
//! - `composer` sequences units into one program, bootstrap first.
//! - `error` holds the diagnostics shared by the other modules.
//!
//! File discovery and I/O are deliberately left to the binary; the library
//! takes named source strings and returns the assembly text.

pub mod composer;
pub mod error;
pub mod parser;
pub mod symbols;

mod codegen;

pub use composer::{SourceUnit, TranslateOptions};
pub use error::{TranslateError, TranslateResult};

/// Translate the given units into one Hack assembly program.
pub fn translate(units: &[SourceUnit], options: TranslateOptions) -> TranslateResult<String> {
  let lines = composer::compose(units, options)?;
  let mut asm = String::new();
  for line in &lines {
    asm.push_str(line);
    asm.push('\n');
  }
  Ok(asm)
}
