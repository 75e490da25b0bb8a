//! Line-oriented parser for Hack VM source.
//!
//! Each input line is either blank, a comment, or exactly one VM command.
//! The parser strips `//` comments and surrounding whitespace, splits the
//! remainder on whitespace, and classifies the first token against the fixed
//! command vocabulary. It knows nothing about scoping or segment limits;
//! those checks belong to the code writer.

use crate::error::{TranslateError, TranslateResult};

/// The nine stack-machine operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
  Add,
  Sub,
  Neg,
  Eq,
  Gt,
  Lt,
  And,
  Or,
  Not,
}

impl ArithmeticOp {
  fn from_token(token: &str) -> Option<Self> {
    match token {
      "add" => Some(Self::Add),
      "sub" => Some(Self::Sub),
      "neg" => Some(Self::Neg),
      "eq" => Some(Self::Eq),
      "gt" => Some(Self::Gt),
      "lt" => Some(Self::Lt),
      "and" => Some(Self::And),
      "or" => Some(Self::Or),
      "not" => Some(Self::Not),
      _ => None,
    }
  }

  /// The VM mnemonic, used in diagnostics and emitted comments.
  pub fn mnemonic(&self) -> &'static str {
    match self {
      Self::Add => "add",
      Self::Sub => "sub",
      Self::Neg => "neg",
      Self::Eq => "eq",
      Self::Gt => "gt",
      Self::Lt => "lt",
      Self::And => "and",
      Self::Or => "or",
      Self::Not => "not",
    }
  }
}

/// The eight virtual memory segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
  Constant,
  Local,
  Argument,
  This,
  That,
  Pointer,
  Temp,
  Static,
}

impl Segment {
  fn from_token(token: &str) -> Option<Self> {
    match token {
      "constant" => Some(Self::Constant),
      "local" => Some(Self::Local),
      "argument" => Some(Self::Argument),
      "this" => Some(Self::This),
      "that" => Some(Self::That),
      "pointer" => Some(Self::Pointer),
      "temp" => Some(Self::Temp),
      "static" => Some(Self::Static),
      _ => None,
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      Self::Constant => "constant",
      Self::Local => "local",
      Self::Argument => "argument",
      Self::This => "this",
      Self::That => "that",
      Self::Pointer => "pointer",
      Self::Temp => "temp",
      Self::Static => "static",
    }
  }
}

/// One structured VM command. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  Arithmetic(ArithmeticOp),
  Push(Segment, u16),
  Pop(Segment, u16),
  Label(String),
  Goto(String),
  IfGoto(String),
  Function(String, u16),
  Call(String, u16),
  Return,
}

/// A parsed command together with the 1-based line it came from, so that
/// later stages can report precise diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCommand {
  pub line: usize,
  pub command: Command,
}

/// Parse one unit's source text into an ordered command list.
pub fn parse_unit(unit: &str, source: &str) -> TranslateResult<Vec<SourceCommand>> {
  let mut commands = Vec::new();

  for (index, raw) in source.lines().enumerate() {
    let line = index + 1;
    if let Some(command) = parse_line(unit, line, raw)? {
      commands.push(SourceCommand { line, command });
    }
  }

  Ok(commands)
}

/// Parse a single raw line. Returns `Ok(None)` for blank and comment lines.
pub fn parse_line(unit: &str, line: usize, raw: &str) -> TranslateResult<Option<Command>> {
  let text = raw
    .split_once("//")
    .map(|(code, _)| code)
    .unwrap_or(raw)
    .trim();

  if text.is_empty() {
    return Ok(None);
  }

  let tokens: Vec<&str> = text.split_whitespace().collect();
  let keyword = tokens[0];

  if let Some(op) = ArithmeticOp::from_token(keyword) {
    expect_arity(unit, line, &tokens, 1)?;
    return Ok(Some(Command::Arithmetic(op)));
  }

  let command = match keyword {
    "push" | "pop" => {
      expect_arity(unit, line, &tokens, 3)?;
      let segment = Segment::from_token(tokens[1]).ok_or_else(|| {
        TranslateError::malformed(unit, line, format!("unknown segment `{}`", tokens[1]))
      })?;
      let index = parse_index(unit, line, tokens[2])?;
      if keyword == "push" {
        Command::Push(segment, index)
      } else {
        Command::Pop(segment, index)
      }
    }
    "label" => {
      expect_arity(unit, line, &tokens, 2)?;
      Command::Label(tokens[1].to_string())
    }
    "goto" => {
      expect_arity(unit, line, &tokens, 2)?;
      Command::Goto(tokens[1].to_string())
    }
    "if-goto" => {
      expect_arity(unit, line, &tokens, 2)?;
      Command::IfGoto(tokens[1].to_string())
    }
    "function" => {
      expect_arity(unit, line, &tokens, 3)?;
      Command::Function(tokens[1].to_string(), parse_index(unit, line, tokens[2])?)
    }
    "call" => {
      expect_arity(unit, line, &tokens, 3)?;
      Command::Call(tokens[1].to_string(), parse_index(unit, line, tokens[2])?)
    }
    "return" => {
      expect_arity(unit, line, &tokens, 1)?;
      Command::Return
    }
    _ => {
      return Err(TranslateError::malformed(
        unit,
        line,
        format!("unknown command `{keyword}`"),
      ));
    }
  };

  Ok(Some(command))
}

fn expect_arity(unit: &str, line: usize, tokens: &[&str], expected: usize) -> TranslateResult<()> {
  if tokens.len() == expected {
    return Ok(());
  }

  let message = if tokens.len() < expected {
    format!(
      "`{}` expects {} operand(s), found {}",
      tokens[0],
      expected - 1,
      tokens.len() - 1
    )
  } else {
    format!(
      "`{}` has extra operands: `{}`",
      tokens[0],
      tokens[expected..].join(" ")
    )
  };

  Err(TranslateError::malformed(unit, line, message))
}

fn parse_index(unit: &str, line: usize, token: &str) -> TranslateResult<u16> {
  token.parse::<u16>().map_err(|_| {
    TranslateError::malformed(unit, line, format!("`{token}` is not a non-negative integer"))
  })
}
