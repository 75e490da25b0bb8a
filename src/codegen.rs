//! Code generation: lower structured VM commands into Hack assembly.
//!
//! The emitter follows the standard Hack memory map: `SP`/`LCL`/`ARG`/
//! `THIS`/`THAT` hold the stack pointer and segment bases, `R5`..`R12` back
//! the temp segment, and `R13`/`R14` serve as scratch for pops and returns.
//! Every translated command is preceded by a `//` comment carrying the
//! original VM command, which makes the output diffable against the source.
//!
//! One `CodeWriter` translates exactly one unit: it owns the unit's scoping
//! state (current function, label table) but borrows the output stream and
//! the label allocator, both of which outlive it.

use crate::error::{TranslateError, TranslateResult};
use crate::parser::{ArithmeticOp, Command, Segment, SourceCommand};
use crate::symbols::{flow_label, static_symbol, LabelAllocator, LabelTable};

/// Highest valid index for the `temp` segment (R5..R12).
const TEMP_LIMIT: u16 = 7;
/// Highest valid index for the `pointer` segment (0 = THIS, 1 = THAT).
const POINTER_LIMIT: u16 = 1;
/// Highest valid index for `static`; the Hack static area is RAM[16..255].
const STATIC_LIMIT: u16 = 239;

/// Per-unit translator. Create one per input unit, feed it every command in
/// order, then call [`CodeWriter::finish`] to run the deferred label check.
pub struct CodeWriter<'a> {
  unit: &'a str,
  function: Option<String>,
  labels: LabelTable,
  allocator: &'a mut LabelAllocator,
  out: &'a mut Vec<String>,
}

impl<'a> CodeWriter<'a> {
  pub fn new(unit: &'a str, allocator: &'a mut LabelAllocator, out: &'a mut Vec<String>) -> Self {
    Self {
      unit,
      function: None,
      labels: LabelTable::new(),
      allocator,
      out,
    }
  }

  /// Translate one command, appending its assembly to the output stream.
  pub fn write(&mut self, command: &SourceCommand) -> TranslateResult<()> {
    let line = command.line;
    match &command.command {
      Command::Arithmetic(op) => self.arithmetic(*op),
      Command::Push(segment, index) => self.push(line, *segment, *index)?,
      Command::Pop(segment, index) => self.pop(line, *segment, *index)?,
      Command::Label(label) => self.label(line, label)?,
      Command::Goto(label) => self.goto(line, label)?,
      Command::IfGoto(label) => self.if_goto(line, label)?,
      Command::Function(name, locals) => self.function(name, *locals),
      Command::Call(name, args) => self.call(name, *args),
      Command::Return => self.emit_return(line)?,
    }
    Ok(())
  }

  /// End-of-unit check: every referenced flow label must have a definition.
  pub fn finish(self) -> TranslateResult<()> {
    self.labels.finish(self.unit)
  }

  /// Emit the program prologue: point SP at the stack origin, then hand
  /// control to `Sys.init` through a regular call so it gets a full frame.
  pub fn bootstrap(&mut self) {
    self.emit("// bootstrap");
    self.emit("@256");
    self.emit("D=A");
    self.emit("@SP");
    self.emit("M=D");
    self.call("Sys.init", 0);
  }

  fn emit(&mut self, instruction: impl Into<String>) {
    self.out.push(instruction.into());
  }

  // Advances SP and stores D in the new top slot.
  fn emit_push_d(&mut self) {
    self.emit("@SP");
    self.emit("M=M+1");
    self.emit("A=M-1");
    self.emit("M=D");
  }

  // Pops the top of stack into D.
  fn emit_pop_d(&mut self) {
    self.emit("@SP");
    self.emit("AM=M-1");
    self.emit("D=M");
  }

  fn arithmetic(&mut self, op: ArithmeticOp) {
    self.emit(format!("// {}", op.mnemonic()));
    match op {
      ArithmeticOp::Neg => self.unary('-'),
      ArithmeticOp::Not => self.unary('!'),
      ArithmeticOp::Add => self.binary("D+M"),
      ArithmeticOp::Sub => self.binary("M-D"),
      ArithmeticOp::And => self.binary("D&M"),
      ArithmeticOp::Or => self.binary("D|M"),
      ArithmeticOp::Eq => self.compare("JEQ"),
      ArithmeticOp::Gt => self.compare("JGT"),
      ArithmeticOp::Lt => self.compare("JLT"),
    }
  }

  fn unary(&mut self, op: char) {
    self.emit("@SP");
    self.emit("A=M-1");
    self.emit(format!("M={op}M"));
  }

  // `comp` must be a legal C-instruction computation; the Hack comp table
  // only spells the commutative forms D-first (`D+M`, `D&M`, `D|M`).
  fn binary(&mut self, comp: &str) {
    self.emit_pop_d();
    self.emit("A=A-1");
    self.emit(format!("M={comp}"));
  }

  /// Comparisons compute second-from-top minus top, branch on the result,
  /// and overwrite the new top with all-ones (true) or zero (false). The
  /// branch targets come from the global allocator so that no two
  /// comparisons in a program share labels.
  fn compare(&mut self, jump: &str) {
    let (true_label, end_label) = self.allocator.comparison_pair();
    self.emit_pop_d();
    self.emit("A=A-1");
    self.emit("D=M-D");
    self.emit(format!("@{true_label}"));
    self.emit(format!("D;{jump}"));
    self.emit("D=0");
    self.emit(format!("@{end_label}"));
    self.emit("0;JMP");
    self.emit(format!("({true_label})"));
    self.emit("D=-1");
    self.emit(format!("({end_label})"));
    self.emit("@SP");
    self.emit("A=M-1");
    self.emit("M=D");
  }

  fn push(&mut self, line: usize, segment: Segment, index: u16) -> TranslateResult<()> {
    self.emit(format!("// push {} {}", segment.name(), index));
    match segment {
      Segment::Constant => {
        self.emit(format!("@{index}"));
        self.emit("D=A");
        self.emit_push_d();
      }
      Segment::Local | Segment::Argument | Segment::This | Segment::That => {
        self.emit(format!("@{}", base_register(segment)));
        self.emit("D=M");
        self.emit(format!("@{index}"));
        self.emit("A=D+A");
        self.emit("D=M");
        self.emit_push_d();
      }
      Segment::Pointer | Segment::Temp | Segment::Static => {
        let symbol = self.direct_symbol(line, segment, index)?;
        self.emit(format!("@{symbol}"));
        self.emit("D=M");
        self.emit_push_d();
      }
    }
    Ok(())
  }

  fn pop(&mut self, line: usize, segment: Segment, index: u16) -> TranslateResult<()> {
    if segment == Segment::Constant {
      return Err(TranslateError::InvalidSegmentOperation {
        unit: self.unit.to_string(),
        line,
        segment: segment.name().to_string(),
      });
    }

    self.emit(format!("// pop {} {}", segment.name(), index));
    match segment {
      Segment::Local | Segment::Argument | Segment::This | Segment::That => {
        // Destination address goes through R13; the popped value would
        // otherwise clobber the address computation.
        self.emit(format!("@{}", base_register(segment)));
        self.emit("D=M");
        self.emit(format!("@{index}"));
        self.emit("D=D+A");
        self.emit("@R13");
        self.emit("M=D");
        self.emit_pop_d();
        self.emit("@R13");
        self.emit("A=M");
        self.emit("M=D");
      }
      Segment::Pointer | Segment::Temp | Segment::Static => {
        let symbol = self.direct_symbol(line, segment, index)?;
        self.emit_pop_d();
        self.emit(format!("@{symbol}"));
        self.emit("M=D");
      }
      Segment::Constant => unreachable!("rejected above"),
    }
    Ok(())
  }

  /// Resolve the fixed assembly symbol for the directly addressed segments.
  fn direct_symbol(&self, line: usize, segment: Segment, index: u16) -> TranslateResult<String> {
    let symbol = match segment {
      Segment::Pointer => {
        self.check_range(line, segment, index, POINTER_LIMIT)?;
        if index == 0 { "THIS" } else { "THAT" }.to_string()
      }
      Segment::Temp => {
        self.check_range(line, segment, index, TEMP_LIMIT)?;
        format!("R{}", index + 5)
      }
      Segment::Static => {
        self.check_range(line, segment, index, STATIC_LIMIT)?;
        static_symbol(self.unit, index)
      }
      _ => unreachable!("segment has no direct symbol"),
    };
    Ok(symbol)
  }

  fn check_range(
    &self,
    line: usize,
    segment: Segment,
    index: u16,
    limit: u16,
  ) -> TranslateResult<()> {
    if index > limit {
      return Err(TranslateError::OperandOutOfRange {
        unit: self.unit.to_string(),
        line,
        segment: segment.name().to_string(),
        index,
        limit,
      });
    }
    Ok(())
  }

  /// The scoped symbol for a flow label, or an error when no function is in
  /// scope to provide one.
  fn scoped_label(&self, line: usize, label: &str) -> TranslateResult<String> {
    match &self.function {
      Some(function) => Ok(flow_label(function, label)),
      None => Err(TranslateError::UndefinedLabel {
        unit: self.unit.to_string(),
        line,
        label: label.to_string(),
      }),
    }
  }

  fn label(&mut self, line: usize, label: &str) -> TranslateResult<()> {
    let symbol = self.scoped_label(line, label)?;
    self.labels.define(self.unit, line, symbol.clone(), label)?;
    self.emit(format!("// label {label}"));
    self.emit(format!("({symbol})"));
    Ok(())
  }

  fn goto(&mut self, line: usize, label: &str) -> TranslateResult<()> {
    let symbol = self.scoped_label(line, label)?;
    self.labels.reference(line, symbol.clone(), label);
    self.emit(format!("// goto {label}"));
    self.emit(format!("@{symbol}"));
    self.emit("0;JMP");
    Ok(())
  }

  fn if_goto(&mut self, line: usize, label: &str) -> TranslateResult<()> {
    let symbol = self.scoped_label(line, label)?;
    self.labels.reference(line, symbol.clone(), label);
    self.emit(format!("// if-goto {label}"));
    self.emit_pop_d();
    self.emit(format!("@{symbol}"));
    // Branch iff the popped value is non-zero.
    self.emit("D;JNE");
    Ok(())
  }

  fn function(&mut self, name: &str, locals: u16) {
    self.function = Some(name.to_string());
    self.emit(format!("// function {name} {locals}"));
    self.emit(format!("({name})"));
    for _ in 0..locals {
      self.emit("@SP");
      self.emit("M=M+1");
      self.emit("A=M-1");
      self.emit("M=0");
    }
  }

  /// Caller side of the frame protocol: push the return address and the four
  /// segment bases, reposition ARG below the pushed arguments, point LCL at
  /// the new stack top, and jump. The offset 5 covers the return address
  /// plus the four saved registers.
  fn call(&mut self, name: &str, args: u16) {
    let return_label = self.allocator.return_address();
    self.emit(format!("// call {name} {args}"));
    self.emit(format!("@{return_label}"));
    self.emit("D=A");
    self.emit_push_d();
    for register in ["LCL", "ARG", "THIS", "THAT"] {
      self.emit(format!("@{register}"));
      self.emit("D=M");
      self.emit_push_d();
    }
    self.emit("@SP");
    self.emit("D=M");
    self.emit(format!("@{}", u32::from(args) + 5));
    self.emit("D=D-A");
    self.emit("@ARG");
    self.emit("M=D");
    self.emit("@SP");
    self.emit("D=M");
    self.emit("@LCL");
    self.emit("M=D");
    self.emit(format!("@{name}"));
    self.emit("0;JMP");
    self.emit(format!("({return_label})"));
  }

  /// Callee side: stash the frame base and return address in R13/R14, plant
  /// the return value in the caller's ARG slot 0, collapse the stack to just
  /// past it, then restore THAT/THIS/ARG/LCL in reverse save order and jump.
  /// The return address must be read before the return value is stored: for
  /// a zero-argument call, ARG slot 0 is the return-address slot.
  fn emit_return(&mut self, line: usize) -> TranslateResult<()> {
    if self.function.is_none() {
      return Err(TranslateError::ReturnOutsideFunction {
        unit: self.unit.to_string(),
        line,
      });
    }

    self.emit("// return");
    self.emit("@LCL");
    self.emit("D=M");
    self.emit("@R13");
    self.emit("M=D");
    self.emit("@5");
    self.emit("A=D-A");
    self.emit("D=M");
    self.emit("@R14");
    self.emit("M=D");
    self.emit_pop_d();
    self.emit("@ARG");
    self.emit("A=M");
    self.emit("M=D");
    self.emit("@ARG");
    self.emit("D=M+1");
    self.emit("@SP");
    self.emit("M=D");
    for register in ["THAT", "THIS", "ARG", "LCL"] {
      self.emit("@R13");
      self.emit("AM=M-1");
      self.emit("D=M");
      self.emit(format!("@{register}"));
      self.emit("M=D");
    }
    self.emit("@R14");
    self.emit("A=M");
    self.emit("0;JMP");
    Ok(())
  }
}

fn base_register(segment: Segment) -> &'static str {
  match segment {
    Segment::Local => "LCL",
    Segment::Argument => "ARG",
    Segment::This => "THIS",
    Segment::That => "THAT",
    _ => unreachable!("segment has no base register"),
  }
}
