//! End-to-end tests: translate VM programs and execute the resulting Hack
//! assembly on a small emulator to check the observable machine state.

use hack_vm_translator::{translate, SourceUnit, TranslateError, TranslateOptions};

/// Minimal Hack machine: a two-pass assembler for the emitted text plus an
/// interpreter for A- and C-instructions. Just enough to observe RAM after a
/// translated program has run.
mod emulator {
  use std::collections::HashMap;

  const STACK_ORIGIN: i16 = 256;
  const VARIABLE_BASE: u16 = 16;

  enum Instruction {
    Address(u16),
    Compute {
      dest: (bool, bool, bool), // (A, D, M)
      comp: String,
      jump: String,
    },
  }

  pub struct Machine {
    rom: Vec<Instruction>,
    symbols: HashMap<String, u16>,
    ram: Vec<i16>,
    a: i16,
    d: i16,
    pc: usize,
  }

  impl Machine {
    /// Assemble the program. First pass records `(LABEL)` addresses, second
    /// pass encodes instructions and allocates variable symbols from 16 up.
    pub fn assemble(asm: &str) -> Self {
      let mut symbols: HashMap<String, u16> = HashMap::new();
      for (name, address) in [
        ("SP", 0),
        ("LCL", 1),
        ("ARG", 2),
        ("THIS", 3),
        ("THAT", 4),
        ("SCREEN", 16384),
        ("KBD", 24576),
      ] {
        symbols.insert(name.to_string(), address);
      }
      for register in 0..16 {
        symbols.insert(format!("R{register}"), register);
      }

      let lines: Vec<&str> = asm
        .lines()
        .map(|line| {
          line
            .split_once("//")
            .map(|(code, _)| code)
            .unwrap_or(line)
            .trim()
        })
        .filter(|line| !line.is_empty())
        .collect();

      let mut address = 0u16;
      for line in &lines {
        if let Some(label) = line.strip_prefix('(') {
          let label = label.strip_suffix(')').expect("unterminated label");
          symbols.insert(label.to_string(), address);
        } else {
          address += 1;
        }
      }

      let mut next_variable = VARIABLE_BASE;
      let mut rom = Vec::new();
      for line in &lines {
        if line.starts_with('(') {
          continue;
        }
        if let Some(symbol) = line.strip_prefix('@') {
          let value = match symbol.parse::<u16>() {
            Ok(number) => number,
            Err(_) => *symbols.entry(symbol.to_string()).or_insert_with(|| {
              let slot = next_variable;
              next_variable += 1;
              slot
            }),
          };
          rom.push(Instruction::Address(value));
        } else {
          rom.push(parse_compute(line));
        }
      }

      Self {
        rom,
        symbols,
        ram: vec![0; 32768],
        a: 0,
        d: 0,
        pc: 0,
      }
    }

    /// Assemble and run with the stack pointer pre-set, for programs that
    /// carry no bootstrap of their own.
    pub fn run_without_bootstrap(asm: &str) -> Self {
      let mut machine = Self::assemble(asm);
      machine.set_ram(0, STACK_ORIGIN);
      machine.run(100_000);
      machine
    }

    pub fn set_ram(&mut self, address: usize, value: i16) {
      self.ram[address] = value;
    }

    pub fn ram(&self, address: usize) -> i16 {
      self.ram[address]
    }

    pub fn sp(&self) -> i16 {
      self.ram[0]
    }

    /// Top of the stack (the last pushed value).
    pub fn top(&self) -> i16 {
      self.ram[self.sp() as usize - 1]
    }

    /// RAM address an assembler symbol resolved to.
    pub fn address_of(&self, symbol: &str) -> usize {
      self.symbols[symbol] as usize
    }

    /// Execute until the program counter runs off the end of the ROM or the
    /// step budget is exhausted (programs ending in a halt loop never exit).
    pub fn run(&mut self, max_steps: usize) {
      for _ in 0..max_steps {
        if self.pc >= self.rom.len() {
          return;
        }
        self.step();
      }
    }

    fn step(&mut self) {
      match &self.rom[self.pc] {
        Instruction::Address(value) => {
          self.a = *value as i16;
          self.pc += 1;
        }
        Instruction::Compute { dest, comp, jump } => {
          let address = self.a as u16 as usize;
          let m = self.ram[address];
          let value = compute(comp, self.a, self.d, m);

          let (dest_a, dest_d, dest_m) = *dest;
          if dest_m {
            self.ram[address] = value;
          }
          if dest_d {
            self.d = value;
          }
          if dest_a {
            self.a = value;
          }

          let taken = match jump.as_str() {
            "" => false,
            "JGT" => value > 0,
            "JEQ" => value == 0,
            "JGE" => value >= 0,
            "JLT" => value < 0,
            "JNE" => value != 0,
            "JLE" => value <= 0,
            "JMP" => true,
            other => panic!("unknown jump `{other}`"),
          };

          if taken {
            self.pc = self.a as u16 as usize;
          } else {
            self.pc += 1;
          }
        }
      }
    }
  }

  fn parse_compute(line: &str) -> Instruction {
    let (dest_text, rest) = match line.split_once('=') {
      Some((dest, rest)) => (dest, rest),
      None => ("", line),
    };
    let (comp, jump) = match rest.split_once(';') {
      Some((comp, jump)) => (comp, jump),
      None => (rest, ""),
    };
    Instruction::Compute {
      dest: (
        dest_text.contains('A'),
        dest_text.contains('D'),
        dest_text.contains('M'),
      ),
      comp: comp.to_string(),
      jump: jump.to_string(),
    }
  }

  fn compute(comp: &str, a: i16, d: i16, m: i16) -> i16 {
    // The a-bit selects between the A register and RAM[A]; normalizing the
    // mnemonic lets one table serve both forms.
    let operand = if comp.contains('M') { m } else { a };
    match comp.replace('M', "A").as_str() {
      "0" => 0,
      "1" => 1,
      "-1" => -1,
      "D" => d,
      "A" => operand,
      "!D" => !d,
      "!A" => !operand,
      "-D" => d.wrapping_neg(),
      "-A" => operand.wrapping_neg(),
      "D+1" => d.wrapping_add(1),
      "A+1" => operand.wrapping_add(1),
      "D-1" => d.wrapping_sub(1),
      "A-1" => operand.wrapping_sub(1),
      "D+A" => d.wrapping_add(operand),
      "D-A" => d.wrapping_sub(operand),
      "A-D" => operand.wrapping_sub(d),
      "D&A" => d & operand,
      "D|A" => d | operand,
      other => panic!("unknown computation `{other}`"),
    }
  }
}

use emulator::Machine;

fn translate_single(source: &str) -> String {
  translate(
    &[SourceUnit::new("Main", source)],
    TranslateOptions {
      include_bootstrap: false,
    },
  )
  .unwrap()
}

#[test]
fn adds_two_constants() {
  let asm = translate_single("push constant 2\npush constant 3\nadd");
  let machine = Machine::run_without_bootstrap(&asm);
  assert_eq!(machine.sp(), 257);
  assert_eq!(machine.top(), 5);
}

#[test]
fn arithmetic_stack_effects() {
  // Unary ops keep the depth, binary ops shrink it by one.
  let asm = translate_single("push constant 6\npush constant 2\nsub\nneg\nnot");
  let machine = Machine::run_without_bootstrap(&asm);
  assert_eq!(machine.sp(), 257);
  // 6-2=4, neg -> -4, not -> 3
  assert_eq!(machine.top(), 3);
}

#[test]
fn comparisons_yield_all_ones_or_zero() {
  let asm = translate_single("push constant 2\npush constant 3\nlt");
  let machine = Machine::run_without_bootstrap(&asm);
  assert_eq!(machine.top(), -1);

  let asm = translate_single("push constant 2\npush constant 3\neq");
  let machine = Machine::run_without_bootstrap(&asm);
  assert_eq!(machine.top(), 0);

  let asm = translate_single("push constant 7\npush constant 3\ngt");
  let machine = Machine::run_without_bootstrap(&asm);
  assert_eq!(machine.top(), -1);
}

#[test]
fn ordering_is_second_from_top_op_top() {
  let asm = translate_single("push constant 10\npush constant 4\nsub");
  let machine = Machine::run_without_bootstrap(&asm);
  assert_eq!(machine.top(), 6);
}

#[test]
fn push_constant_then_pop_local() {
  let asm = translate_single("push constant 7\npop local 0");
  let mut machine = Machine::assemble(&asm);
  machine.set_ram(0, 256);
  machine.set_ram(1, 300); // LCL
  machine.run(1_000);
  assert_eq!(machine.sp(), 256, "stack depth unchanged");
  assert_eq!(machine.ram(300), 7, "local slot 0 holds the value");
}

#[test]
fn pointer_and_temp_round_trip() {
  let asm = translate_single(
    "push constant 3000\npop pointer 0\npush constant 11\npop temp 3\npush temp 3\npop this 2",
  );
  let machine = Machine::run_without_bootstrap(&asm);
  assert_eq!(machine.ram(3), 3000, "pointer 0 sets THIS");
  assert_eq!(machine.ram(8), 11, "temp 3 is R8");
  assert_eq!(machine.ram(3002), 11, "this 2 lands at THIS+2");
}

#[test]
fn statics_are_distinct_across_units() {
  let units = [
    SourceUnit::new("Main", "push constant 1\npop static 3"),
    SourceUnit::new("Other", "push constant 2\npop static 3"),
  ];
  let asm = translate(
    &units,
    TranslateOptions {
      include_bootstrap: false,
    },
  )
  .unwrap();

  let machine = Machine::run_without_bootstrap(&asm);
  let main_slot = machine.address_of("Main.3");
  let other_slot = machine.address_of("Other.3");
  assert_ne!(main_slot, other_slot);
  assert_eq!(machine.ram(main_slot), 1);
  assert_eq!(machine.ram(other_slot), 2);
}

#[test]
fn branching_within_a_function() {
  // Sums 1..=3 with a loop driven by if-goto.
  let source = "\
function Main.sum 2
push constant 0
pop local 0
push constant 1
pop local 1
label LOOP
push local 1
push constant 3
gt
if-goto DONE
push local 0
push local 1
add
pop local 0
push local 1
push constant 1
add
pop local 1
goto LOOP
label DONE
push local 0
";
  let asm = translate_single(source);
  let mut machine = Machine::assemble(&asm);
  machine.set_ram(0, 256);
  machine.set_ram(1, 256); // LCL for the hand-entered frame
  machine.run(100_000);
  assert_eq!(machine.top(), 6);
}

#[test]
fn call_and_return_restore_the_caller_frame() {
  let source = "\
function Sys.init 0
push constant 10
push constant 20
call Main.add 2
label HALT
goto HALT
function Main.add 0
push argument 0
push argument 1
add
return
";
  let asm = translate(
    &[SourceUnit::new("Main", source)],
    TranslateOptions {
      include_bootstrap: true,
    },
  )
  .unwrap();

  let mut machine = Machine::assemble(&asm);
  machine.run(100_000);

  // Bootstrap: SP=256, then the Sys.init frame occupies 256..261. Inside
  // Sys.init the two arguments sat at 261/262; after the call returns the
  // stack holds exactly the return value in the first argument slot.
  assert_eq!(machine.sp(), 262);
  assert_eq!(machine.ram(261), 30);
}

#[test]
fn nested_calls_preserve_locals() {
  let source = "\
function Sys.init 0
push constant 5
call Main.double 1
label HALT
goto HALT
function Main.double 1
push argument 0
pop local 0
push local 0
push local 0
add
return
";
  let asm = translate(&[SourceUnit::new("Main", source)], TranslateOptions::default()).unwrap();
  let mut machine = Machine::assemble(&asm);
  machine.run(100_000);
  assert_eq!(machine.top(), 10);
}

#[test]
fn function_zeroes_its_locals() {
  let source = "\
function Sys.init 0
push constant 99
pop temp 0
call Main.zero 0
label HALT
goto HALT
function Main.zero 2
push local 0
push local 1
add
return
";
  let asm = translate(&[SourceUnit::new("Main", source)], TranslateOptions::default()).unwrap();
  let mut machine = Machine::assemble(&asm);
  // Pre-poison the region the locals will land in.
  for address in 256..350 {
    machine.set_ram(address, -7);
  }
  machine.run(100_000);
  assert_eq!(machine.top(), 0, "locals start zeroed");
}

#[test]
fn no_bootstrap_means_no_sp_init_and_no_sys_init() {
  let asm = translate_single("push constant 2\npush constant 3\nadd");
  assert!(!asm.contains("Sys.init"));
  assert!(!asm.contains("// bootstrap"));
  assert!(!asm.contains("@256"));
}

#[test]
fn bootstrap_is_emitted_by_default() {
  let asm = translate(
    &[SourceUnit::new("Main", "function Sys.init 0\nlabel HALT\ngoto HALT")],
    TranslateOptions::default(),
  )
  .unwrap();
  assert!(asm.starts_with("// bootstrap\n@256\n"));
  assert!(asm.contains("@Sys.init"));
}

#[test]
fn malformed_line_reports_unit_and_line() {
  let result = translate(
    &[SourceUnit::new("Main", "push constant 1\npus constant 1")],
    TranslateOptions::default(),
  );
  match result {
    Err(TranslateError::MalformedCommand { unit, line, .. }) => {
      assert_eq!(unit, "Main");
      assert_eq!(line, 2);
    }
    other => panic!("expected MalformedCommand, got {other:?}"),
  }
}
