/*!

  Maps each `Command`, given the shared `TranslationContext`, to the Hack
  assembly that realizes it. Emission goes straight into the context's
  output buffer; every generated block is preceded by a comment echoing the
  canonical source text of the command.

  Stack discipline: a push nets the stack pointer +1 and a pop nets it −1,
  always. The `AM=M+1` / `A=A-1` idiom bumps SP and lands A on the new top
  cell in two instructions; its mirror `AM=M-1` drops SP and lands A on the
  popped cell. Comparisons encode true as all-ones (−1) and false as zero,
  which is what lets `if-goto` test "non-zero" with a single `JNE`.

  Every generated label suffix is drawn from the context's run-wide counter,
  so no two constructs, in the same module or across modules, can declare
  the same label.

*/

use std::convert::TryFrom;

use string_cache::DefaultAtom;

use crate::assembly::Instruction::{self, Compute};
use crate::command::{
  ArithmeticOp, Command, PointerRegister, Register, Segment, TEMP_BASE, TEMP_SIZE,
};
use crate::context::TranslationContext;
use crate::error::TranslationError;
use crate::parser::SourcedCommand;

/// The function the bootstrap transfers control to.
pub const ENTRY_FUNCTION: &str = "Sys.init";

/// Initial value of the stack pointer, set by the bootstrap.
pub const STACK_BASE: u16 = 256;

/// A call site saves the caller's frame as five cells: the return address
/// followed by these four register values, in this order. `return` walks
/// them back in reverse.
const SAVED_REGISTERS: [Register; 4] =
  [Register::LCL, Register::ARG, Register::THIS, Register::THAT];

/// Cells in a saved frame: return address + the four saved registers.
const FRAME_SIZE: u16 = 5;

fn at_c(value: u16) -> Instruction {
  Instruction::at_value(value)
}

fn at_r(register: Register) -> Instruction {
  Instruction::at_register(register)
}

fn at_s(name: &DefaultAtom) -> Instruction {
  Instruction::at_name(name.clone())
}

/// Pushes the value in D: write it at the stack top, net SP +1.
fn push_d() -> Vec<Instruction> {
  vec![
    at_r(Register::SP),
    Compute("AM=M+1"),
    Compute("A=A-1"),
    Compute("M=D"),
  ]
}

/// Pops the stack top into D, net SP −1. Leaves A on the popped cell.
fn pop_to_d() -> Vec<Instruction> {
  vec![
    at_r(Register::SP),
    Compute("AM=M-1"),
    Compute("D=M"),
  ]
}

/// Push from one of the four base-register segments: value at base + index.
fn indirect_push(base: Register, index: u16) -> Vec<Instruction> {
  let mut code = vec![
    at_r(base),
    Compute("D=M"),
    at_c(index),
    Compute("A=D+A"),
    Compute("D=M"),
  ];
  code.extend(push_d());
  code
}

/// Pop into one of the four base-register segments. The destination address
/// is computed first and parked in R13, because popping clobbers both A
/// and D.
fn indirect_pop(base: Register, index: u16) -> Vec<Instruction> {
  let mut code = vec![
    at_r(base),
    Compute("D=M"),
    at_c(index),
    Compute("D=D+A"),
    at_r(Register::R13),
    Compute("M=D"),
  ];
  code.extend(pop_to_d());
  code.extend(vec![
    at_r(Register::R13),
    Compute("A=M"),
    Compute("M=D"),
  ]);
  code
}

/// Push from a directly addressed cell (static symbol, temp, pointer).
fn direct_push(target: Instruction) -> Vec<Instruction> {
  let mut code = vec![target, Compute("D=M")];
  code.extend(push_d());
  code
}

/// Pop into a directly addressed cell (static symbol, temp, pointer).
fn direct_pop(target: Instruction) -> Vec<Instruction> {
  let mut code = pop_to_d();
  code.extend(vec![target, Compute("M=D")]);
  code
}

fn generate_push(
  segment: Segment,
  index:   u16,
  line:    u32,
  context: &mut TranslationContext,
) -> Result<(), TranslationError>
{
  match segment {

    Segment::Constant => {
      let mut code = vec![at_c(index), Compute("D=A")];
      code.extend(push_d());
      context.emit_all(code);
    }

    Segment::Static => {
      let symbol = context.static_symbol(index);
      context.emit_all(direct_push(at_s(&symbol)));
    }

    Segment::Temp => {
      if index >= TEMP_SIZE {
        return Err(TranslationError::TempIndex {
          module: context.module().clone(),
          line,
          index,
        });
      }
      context.emit_all(direct_push(at_c(TEMP_BASE + index)));
    }

    Segment::Pointer => {
      let pointer = PointerRegister::try_from(index).map_err(|_| {
        TranslationError::PointerIndex {
          module: context.module().clone(),
          line,
          index,
        }
      })?;
      context.emit_all(direct_push(at_r(pointer.register())));
    }

    Segment::Local    => context.emit_all(indirect_push(Register::LCL, index)),
    Segment::Argument => context.emit_all(indirect_push(Register::ARG, index)),
    Segment::This     => context.emit_all(indirect_push(Register::THIS, index)),
    Segment::That     => context.emit_all(indirect_push(Register::THAT, index)),

  } // end match segment

  Ok(())
}

fn generate_pop(
  segment: Segment,
  index:   u16,
  line:    u32,
  context: &mut TranslationContext,
) -> Result<(), TranslationError>
{
  match segment {

    Segment::Constant => {
      return Err(TranslationError::ConstantPop {
        module: context.module().clone(),
        line,
      });
    }

    Segment::Static => {
      let symbol = context.static_symbol(index);
      context.emit_all(direct_pop(at_s(&symbol)));
    }

    Segment::Temp => {
      if index >= TEMP_SIZE {
        return Err(TranslationError::TempIndex {
          module: context.module().clone(),
          line,
          index,
        });
      }
      context.emit_all(direct_pop(at_c(TEMP_BASE + index)));
    }

    Segment::Pointer => {
      let pointer = PointerRegister::try_from(index).map_err(|_| {
        TranslationError::PointerIndex {
          module: context.module().clone(),
          line,
          index,
        }
      })?;
      context.emit_all(direct_pop(at_r(pointer.register())));
    }

    Segment::Local    => context.emit_all(indirect_pop(Register::LCL, index)),
    Segment::Argument => context.emit_all(indirect_pop(Register::ARG, index)),
    Segment::This     => context.emit_all(indirect_pop(Register::THIS, index)),
    Segment::That     => context.emit_all(indirect_pop(Register::THAT, index)),

  } // end match segment

  Ok(())
}

/// Binary op: pop y into D, then combine into x's cell in place. Net SP −1.
fn binary_op(combine: &'static str) -> Vec<Instruction> {
  let mut code = pop_to_d();
  code.extend(vec![Compute("A=A-1"), Compute(combine)]);
  code
}

/// Unary op: rewrite the top cell in place. Net SP unchanged.
fn unary_op(transform: &'static str) -> Vec<Instruction> {
  vec![
    at_r(Register::SP),
    Compute("A=M-1"),
    Compute(transform),
  ]
}

/// Comparison: compute x − y, then branch to write −1 (true) or 0 (false)
/// into the new top cell. Both branch targets share one drawn suffix.
fn comparison(jump: &'static str, context: &mut TranslationContext) {
  let drawn      = context.next_label_index();
  let true_label = DefaultAtom::from(format!("CMP_TRUE_{}", drawn).as_str());
  let end_label  = DefaultAtom::from(format!("CMP_END_{}", drawn).as_str());

  let mut code = pop_to_d();
  code.extend(vec![
    Compute("A=A-1"),
    Compute("D=M-D"), // D = x - y
    at_s(&true_label),
    Compute(jump),
    Compute("D=0"),
    at_s(&end_label),
    Compute("0;JMP"),
    Instruction::Label(true_label),
    Compute("D=-1"),
    Instruction::Label(end_label),
    at_r(Register::SP),
    Compute("A=M-1"),
    Compute("M=D"),
  ]);
  context.emit_all(code);
}

fn generate_arithmetic(op: ArithmeticOp, context: &mut TranslationContext) {
  match op {
    ArithmeticOp::Add => context.emit_all(binary_op("M=M+D")),
    ArithmeticOp::Sub => context.emit_all(binary_op("M=M-D")),
    ArithmeticOp::And => context.emit_all(binary_op("M=M&D")),
    ArithmeticOp::Or  => context.emit_all(binary_op("M=M|D")),
    ArithmeticOp::Neg => context.emit_all(unary_op("M=-M")),
    ArithmeticOp::Not => context.emit_all(unary_op("M=!M")),
    ArithmeticOp::Eq  => comparison("D;JEQ", context),
    ArithmeticOp::Gt  => comparison("D;JGT", context),
    ArithmeticOp::Lt  => comparison("D;JLT", context),
  }
}

fn generate_goto(label: &DefaultAtom, context: &mut TranslationContext) {
  context.emit_all(vec![at_s(label), Compute("0;JMP")]);
}

/// Pop; jump iff the popped value is non-zero. False is all-zero and true is
/// all-ones, so the test is `JNE`; `JGT` would misread true.
fn generate_if_goto(label: &DefaultAtom, context: &mut TranslationContext) {
  let mut code = pop_to_d();
  code.extend(vec![at_s(label), Compute("D;JNE")]);
  context.emit_all(code);
}

/// The call protocol. Pushes the return address and the caller's four
/// segment registers, repoints ARG and LCL for the callee, jumps to the
/// callee's entry label, and declares the return point immediately after.
fn generate_call(
  function:  &DefaultAtom,
  arg_count: u16,
  context:   &mut TranslationContext,
) {
  let drawn        = context.next_label_index();
  let return_label =
    DefaultAtom::from(format!("{}$ret.{}", function, drawn).as_str());

  // Push the return address; the assembler resolves it to a code location.
  let mut code = vec![at_s(&return_label), Compute("D=A")];
  code.extend(push_d());

  // Save the caller's frame: the register values, not their addresses.
  for register in SAVED_REGISTERS.iter() {
    code.push(at_r(*register));
    code.push(Compute("D=M"));
    code.extend(push_d());
  }

  // ARG = SP - 5 - arg_count: the callee's view of its parameters.
  code.extend(vec![
    at_r(Register::SP),
    Compute("D=M"),
    at_c(FRAME_SIZE),
    Compute("D=D-A"),
    at_c(arg_count),
    Compute("D=D-A"),
    at_r(Register::ARG),
    Compute("M=D"),
  ]);

  // LCL = SP: the callee's locals start at the current top.
  code.extend(vec![
    at_r(Register::SP),
    Compute("D=M"),
    at_r(Register::LCL),
    Compute("M=D"),
  ]);

  // Transfer to the callee; control resumes at the label declared below.
  code.extend(vec![at_s(function), Compute("0;JMP")]);
  code.push(Instruction::Label(return_label));

  context.emit_all(code);
}

/// Function entry: declare the entry label, then zero-initialize the local
/// slots with a counted loop. A zero count falls straight through.
fn generate_function(
  name:        &DefaultAtom,
  local_count: u16,
  context:     &mut TranslationContext,
) {
  let drawn      = context.next_label_index();
  let loop_label = DefaultAtom::from(format!("LOCALS_LOOP_{}", drawn).as_str());
  let end_label  = DefaultAtom::from(format!("LOCALS_END_{}", drawn).as_str());

  context.emit_all(vec![
    Instruction::Label(name.clone()),
    at_c(local_count),
    Compute("D=A"),
    Instruction::Label(loop_label.clone()),
    at_s(&end_label),
    Compute("D;JEQ"),
    at_r(Register::SP),
    Compute("AM=M+1"),
    Compute("A=A-1"),
    Compute("M=0"),
    Compute("D=D-1"),
    at_s(&loop_label),
    Compute("0;JMP"),
    Instruction::Label(end_label),
  ]);
}

/// The return protocol. Ordering constraints are load-bearing: the frame
/// base is captured before SP moves, the return address is captured before
/// the return value overwrites `*ARG` (they can share a cell when
/// `arg_count` is 0), and LCL is restored last because the walk back down
/// the frame is driven off the value captured from it.
fn generate_return(context: &mut TranslationContext) {
  context.emit_all(vec![
    // frame = LCL, parked in R13
    at_r(Register::LCL),
    Compute("D=M"),
    at_r(Register::R13),
    Compute("M=D"),
    // return address = *(frame - 5), parked in R14
    at_c(FRAME_SIZE),
    Compute("A=D-A"),
    Compute("D=M"),
    at_r(Register::R14),
    Compute("M=D"),
    // *ARG = top of stack: the return value lands in the caller's slot
    at_r(Register::SP),
    Compute("A=M-1"),
    Compute("D=M"),
    at_r(Register::ARG),
    Compute("A=M"),
    Compute("M=D"),
    // SP = ARG + 1: the whole callee frame is discarded in one step
    at_r(Register::ARG),
    Compute("D=M+1"),
    at_r(Register::SP),
    Compute("M=D"),
    // restore THAT, THIS, ARG, LCL from frame-1 .. frame-4
    at_r(Register::R13),
    Compute("AM=M-1"),
    Compute("D=M"),
    at_r(Register::THAT),
    Compute("M=D"),
    at_r(Register::R13),
    Compute("AM=M-1"),
    Compute("D=M"),
    at_r(Register::THIS),
    Compute("M=D"),
    at_r(Register::R13),
    Compute("AM=M-1"),
    Compute("D=M"),
    at_r(Register::ARG),
    Compute("M=D"),
    at_r(Register::R13),
    Compute("AM=M-1"),
    Compute("D=M"),
    at_r(Register::LCL),
    Compute("M=D"),
    // jump to the captured return address
    at_r(Register::R14),
    Compute("A=M"),
    Compute("0;JMP"),
  ]);
}

/// Translates one command, appending to the context's output. The echo
/// comment always precedes the block; on a structural error nothing else is
/// emitted and the error names the offending module and line.
pub fn generate(
  sourced: &SourcedCommand,
  context: &mut TranslationContext,
) -> Result<(), TranslationError>
{
  context.emit(Instruction::Comment(sourced.command.to_string()));

  match &sourced.command {

    Command::Push { segment, index } => {
      generate_push(*segment, *index, sourced.line, context)
    }

    Command::Pop { segment, index } => {
      generate_pop(*segment, *index, sourced.line, context)
    }

    Command::Arithmetic(op) => {
      generate_arithmetic(*op, context);
      Ok(())
    }

    Command::Label(name) => {
      context.emit(Instruction::Label(name.clone()));
      Ok(())
    }

    Command::Goto(name) => {
      generate_goto(name, context);
      Ok(())
    }

    Command::IfGoto(name) => {
      generate_if_goto(name, context);
      Ok(())
    }

    Command::Call { function, arg_count } => {
      generate_call(function, *arg_count, context);
      Ok(())
    }

    Command::Function { name, local_count } => {
      generate_function(name, *local_count, context);
      Ok(())
    }

    Command::Return => {
      generate_return(context);
      Ok(())
    }

  } // end match command
}

/// The fixed prologue for a multi-module program: point SP at the stack
/// base, then enter the program through the full call protocol so the entry
/// function sees an ordinary frame and may itself return.
pub fn generate_bootstrap(context: &mut TranslationContext) {
  context.emit(Instruction::Comment("bootstrap".to_string()));
  context.emit_all(vec![
    at_c(STACK_BASE),
    Compute("D=A"),
    at_r(Register::SP),
    Compute("M=D"),
  ]);
  generate_call(&DefaultAtom::from(ENTRY_FUNCTION), 0, context);
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sourced(command: Command) -> SourcedCommand {
    SourcedCommand { line: 1, command }
  }

  fn rendered(context: &TranslationContext) -> Vec<String> {
    context.code().iter().map(|i| i.to_string()).collect()
  }

  #[test]
  fn push_constant_emits_the_canonical_block() {
    let mut context = TranslationContext::new();
    generate(
      &sourced(Command::Push { segment: Segment::Constant, index: 7 }),
      &mut context,
    )
    .unwrap();
    assert_eq!(
      rendered(&context),
      vec!["// push constant 7", "@7", "D=A", "@SP", "AM=M+1", "A=A-1", "M=D"]
    );
  }

  #[test]
  fn static_cells_are_namespaced_by_module() {
    let mut context = TranslationContext::new();
    context.enter_module(&DefaultAtom::from("Main"));
    generate(
      &sourced(Command::Pop { segment: Segment::Static, index: 4 }),
      &mut context,
    )
    .unwrap();
    assert!(rendered(&context).contains(&"@Main.4".to_string()));
  }

  #[test]
  fn pop_constant_is_a_structural_error() {
    let mut context = TranslationContext::new();
    context.enter_module(&DefaultAtom::from("Main"));
    let result = generate(
      &sourced(Command::Pop { segment: Segment::Constant, index: 3 }),
      &mut context,
    );
    match result {
      Err(TranslationError::ConstantPop { line: 1, .. }) => {}
      other => panic!("expected ConstantPop, got {:?}", other),
    }
  }

  #[test]
  fn pointer_index_out_of_range_is_a_structural_error() {
    for command in vec![
      Command::Push { segment: Segment::Pointer, index: 2 },
      Command::Pop { segment: Segment::Pointer, index: 2 },
    ] {
      let mut context = TranslationContext::new();
      let result = generate(&sourced(command), &mut context);
      match result {
        Err(TranslationError::PointerIndex { index: 2, .. }) => {}
        other => panic!("expected PointerIndex, got {:?}", other),
      }
    }
  }

  #[test]
  fn temp_index_out_of_range_is_a_structural_error() {
    let mut context = TranslationContext::new();
    let result = generate(
      &sourced(Command::Push { segment: Segment::Temp, index: 8 }),
      &mut context,
    );
    assert!(matches!(result, Err(TranslationError::TempIndex { index: 8, .. })));
  }

  #[test]
  fn pointer_segment_aliases_this_and_that() {
    let mut context = TranslationContext::new();
    generate(
      &sourced(Command::Push { segment: Segment::Pointer, index: 0 }),
      &mut context,
    )
    .unwrap();
    generate(
      &sourced(Command::Pop { segment: Segment::Pointer, index: 1 }),
      &mut context,
    )
    .unwrap();
    let lines = rendered(&context);
    assert!(lines.contains(&"@THIS".to_string()));
    assert!(lines.contains(&"@THAT".to_string()));
  }

  #[test]
  fn successive_comparisons_draw_distinct_labels() {
    let mut context = TranslationContext::new();
    generate(&sourced(Command::Arithmetic(ArithmeticOp::Eq)), &mut context).unwrap();
    generate(&sourced(Command::Arithmetic(ArithmeticOp::Eq)), &mut context).unwrap();

    let declarations: Vec<String> = context
      .code()
      .iter()
      .filter(|i| i.is_label_declaration())
      .map(|i| i.to_string())
      .collect();
    assert_eq!(
      declarations,
      vec!["(CMP_TRUE_0)", "(CMP_END_0)", "(CMP_TRUE_1)", "(CMP_END_1)"]
    );
  }

  #[test]
  fn call_builds_the_return_label_from_the_callee_name() {
    let mut context = TranslationContext::new();
    generate(
      &sourced(Command::Call {
        function: DefaultAtom::from("Mult.double"),
        arg_count: 0,
      }),
      &mut context,
    )
    .unwrap();
    let lines = rendered(&context);
    assert!(lines.contains(&"@Mult.double$ret.0".to_string()));
    assert!(lines.contains(&"(Mult.double$ret.0)".to_string()));
    // arg_count 0 still subtracts the frame size, then zero.
    assert!(lines.contains(&"@5".to_string()));
    assert!(lines.contains(&"@0".to_string()));
  }

  #[test]
  fn user_labels_pass_through_unrenamed() {
    let mut context = TranslationContext::new();
    context.enter_module(&DefaultAtom::from("Main"));
    generate(&sourced(Command::Label(DefaultAtom::from("LOOP"))), &mut context)
      .unwrap();
    assert_eq!(rendered(&context), vec!["// label LOOP", "(LOOP)"]);
  }

  #[test]
  fn bootstrap_enters_through_the_call_protocol() {
    let mut context = TranslationContext::new();
    generate_bootstrap(&mut context);
    let lines = rendered(&context);
    assert_eq!(lines[1], "@256");
    assert!(lines.contains(&"@Sys.init".to_string()));
    // The full protocol, not a bare jump: the caller frame is saved.
    assert!(lines.contains(&"@LCL".to_string()));
    assert!(lines.contains(&format!("@{}$ret.0", ENTRY_FUNCTION)));
  }
}
