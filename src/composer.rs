//! Program composition: sequence one or many units into a single stream.
//!
//! The composer owns the two pieces of state that outlive a unit: the output
//! stream and the label allocator. Per-unit scoping (current function, label
//! table, static namespace) lives in the `CodeWriter` and is rebuilt for
//! every unit, so nothing leaks across file boundaries.

use crate::codegen::CodeWriter;
use crate::error::TranslateResult;
use crate::parser::parse_unit;
use crate::symbols::LabelAllocator;

/// One self-contained source of VM commands. The name doubles as the static
/// variable namespace, so it must be stable and unique per unit.
#[derive(Debug, Clone)]
pub struct SourceUnit {
  pub name: String,
  pub source: String,
}

impl SourceUnit {
  pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      source: source.into(),
    }
  }
}

/// Configuration recognized by the translation core.
#[derive(Debug, Clone, Copy)]
pub struct TranslateOptions {
  /// Emit stack-pointer initialization and the `Sys.init` call up front.
  /// When false, the caller is responsible for having set up SP, and for
  /// whatever entry point the program starts at.
  pub include_bootstrap: bool,
}

impl Default for TranslateOptions {
  fn default() -> Self {
    Self {
      include_bootstrap: true,
    }
  }
}

/// Translate the units in order into one assembly line stream, bootstrap
/// first when requested. The first error aborts the run; no partial output
/// is returned.
pub fn compose(units: &[SourceUnit], options: TranslateOptions) -> TranslateResult<Vec<String>> {
  let mut allocator = LabelAllocator::new();
  let mut out = Vec::new();

  if options.include_bootstrap {
    CodeWriter::new("Sys", &mut allocator, &mut out).bootstrap();
  }

  for unit in units {
    let commands = parse_unit(&unit.name, &unit.source)?;
    let mut writer = CodeWriter::new(&unit.name, &mut allocator, &mut out);
    for command in &commands {
      writer.write(command)?;
    }
    writer.finish()?;
  }

  Ok(out)
}
