//! Shared error types used across the translation pipeline.
//!
//! Every error is fatal to the run and pins down the offending spot with the
//! unit (file) name and the 1-based source line, so a user can jump straight
//! to the bad VM command.

use snafu::Snafu;

pub type TranslateResult<T> = Result<T, TranslateError>;

/// Terminal failures produced while translating VM code.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum TranslateError {
  #[snafu(display("{unit}:{line}: malformed command: {message}"))]
  MalformedCommand {
    unit: String,
    line: usize,
    message: String,
  },

  #[snafu(display("{unit}:{line}: segment `{segment}` does not support this operation"))]
  InvalidSegmentOperation {
    unit: String,
    line: usize,
    segment: String,
  },

  #[snafu(display(
    "{unit}:{line}: index {index} is out of range for segment `{segment}` (max {limit})"
  ))]
  OperandOutOfRange {
    unit: String,
    line: usize,
    segment: String,
    index: u16,
    limit: u16,
  },

  #[snafu(display("{unit}:{line}: label `{label}` is already defined in this function"))]
  DuplicateLabel {
    unit: String,
    line: usize,
    label: String,
  },

  #[snafu(display("{unit}:{line}: label `{label}` cannot be resolved"))]
  UndefinedLabel {
    unit: String,
    line: usize,
    label: String,
  },

  #[snafu(display("{unit}:{line}: `return` outside of any function"))]
  ReturnOutsideFunction { unit: String, line: usize },
}

impl TranslateError {
  /// Construct a `MalformedCommand`; the parser builds these in a dozen
  /// places, so keep the call sites short.
  pub fn malformed(unit: &str, line: usize, message: impl Into<String>) -> Self {
    Self::MalformedCommand {
      unit: unit.to_string(),
      line,
      message: message.into(),
    }
  }
}
