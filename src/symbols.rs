//! Symbol and label management.
//!
//! Three naming concerns live here: globally unique generated labels (for
//! comparison branches and call return addresses), user labels scoped to
//! their enclosing function, and static variables scoped to their unit.
//! Generated names use characters that cannot appear in a VM label, so user
//! labels can never collide with them.

use std::collections::HashMap;

use crate::error::{TranslateError, TranslateResult};

/// Mints program-wide unique ids for generated labels. One allocator is
/// shared across every unit of a run; it must never be reset per file.
#[derive(Debug, Default)]
pub struct LabelAllocator {
  next: u32,
}

impl LabelAllocator {
  pub fn new() -> Self {
    Self::default()
  }

  fn fresh(&mut self) -> u32 {
    let id = self.next;
    self.next += 1;
    id
  }

  /// A pair of branch targets for one comparison: (true-case, join point).
  pub fn comparison_pair(&mut self) -> (String, String) {
    let id = self.fresh();
    (format!("CMP_TRUE_{id}"), format!("CMP_END_{id}"))
  }

  /// A fresh return-address label for one `call`.
  pub fn return_address(&mut self) -> String {
    format!("RET_{}", self.fresh())
  }
}

/// The assembly symbol for a user label inside a function.
pub fn flow_label(function: &str, label: &str) -> String {
  format!("{function}${label}")
}

/// The assembly symbol backing `static <index>` in the given unit. The Hack
/// assembler allocates the slot on first use, so emitting a stable symbol is
/// all the translator has to do.
pub fn static_symbol(unit: &str, index: u16) -> String {
  format!("{unit}.{index}")
}

/// Tracks label definitions and references within one unit so that forward
/// references can be checked once the unit is fully translated.
#[derive(Debug, Default)]
pub struct LabelTable {
  defined: HashMap<String, usize>,
  referenced: Vec<Reference>,
}

#[derive(Debug)]
struct Reference {
  symbol: String,
  label: String,
  line: usize,
}

impl LabelTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record a `label` definition. Duplicate definitions of the same scoped
  /// symbol are rejected immediately.
  pub fn define(
    &mut self,
    unit: &str,
    line: usize,
    symbol: String,
    label: &str,
  ) -> TranslateResult<()> {
    if self.defined.insert(symbol, line).is_some() {
      return Err(TranslateError::DuplicateLabel {
        unit: unit.to_string(),
        line,
        label: label.to_string(),
      });
    }
    Ok(())
  }

  /// Record a `goto`/`if-goto` target. Resolution is deferred to `finish`
  /// because forward references are legal.
  pub fn reference(&mut self, line: usize, symbol: String, label: &str) {
    self.referenced.push(Reference {
      symbol,
      label: label.to_string(),
      line,
    });
  }

  /// End-of-unit check: every referenced label must have been defined.
  pub fn finish(self, unit: &str) -> TranslateResult<()> {
    for reference in self.referenced {
      if !self.defined.contains_key(&reference.symbol) {
        return Err(TranslateError::UndefinedLabel {
          unit: unit.to_string(),
          line: reference.line,
          label: reference.label,
        });
      }
    }
    Ok(())
  }
}
