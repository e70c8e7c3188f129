/*!

  The structured form of a single VM source command together with its operand
  vocabulary. A `Command` is a closed tagged variant; the code generator
  dispatches over it with an exhaustive `match`, so a keyword that parses is
  guaranteed to reach an emission rule rather than fall through to a no-op.

  Keywords and segment names serialize to and from their lowercase textual
  form via the `strum` derives. Parsing is case-insensitive: the parser
  lowercases a token before looking it up, which is also why `Display` is the
  canonical (lowercase) spelling used in source-echo comments.

*/

use std::fmt::{Display, Formatter};

use num_enum::TryFromPrimitive;
use string_cache::DefaultAtom;
use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};

/// The eight logical storage regions a `push`/`pop` can address. Only `Temp`
/// has a fixed numeric base; the rest resolve through a register, a symbol,
/// or the literal index itself (see the code generator).
#[derive(
  StrumDisplay, IntoStaticStr, EnumString,
  Clone,        Copy,          Eq, PartialEq, Debug, Hash
)]
#[strum(serialize_all = "lowercase")]
pub enum Segment {
  Constant,
  Static,
  Local,
  Argument,
  This,
  That,
  Temp,
  Pointer,
}

impl Segment {
  /// The register holding the segment's base address, for the four segments
  /// addressed indirectly. The other four segments have no base register.
  pub fn base_register(&self) -> Option<Register> {
    match self {
      Segment::Local    => Some(Register::LCL),
      Segment::Argument => Some(Register::ARG),
      Segment::This     => Some(Register::THIS),
      Segment::That     => Some(Register::THAT),
      _                 => None
    }
  }
}

/// Base address of the `temp` segment: RAM[5] through RAM[12].
pub const TEMP_BASE: u16 = 5;

/// Number of cells in the `temp` segment.
pub const TEMP_SIZE: u16 = 8;

/// The memory-mapped registers the generated code addresses by name. The
/// downstream assembler predefines all of these symbols.
#[derive(
  StrumDisplay, IntoStaticStr,
  Clone,        Copy,          Eq, PartialEq, Debug, Hash
)]
pub enum Register {
  /// Stack pointer: RAM[SP] is the first unused stack cell.
  SP,
  /// Base of the current function's `local` segment.
  LCL,
  /// Base of the current function's `argument` segment.
  ARG,
  /// Base of the `this` segment.
  THIS,
  /// Base of the `that` segment.
  THAT,
  /// Scratch register used by `pop` and `return`.
  R13,
  /// Scratch register used by `return` for the return address.
  R14,
  /// Unused scratch register, reserved for the translator.
  R15,
}

/**
  The two registers the `pointer` segment aliases. Converting from the
  numeric segment index is how `pointer 0` and `pointer 1` resolve; any
  other index has no variant, so the conversion fails and the command is
  rejected as structurally invalid.
*/
#[derive(TryFromPrimitive, Clone, Copy, Eq, PartialEq, Debug)]
#[repr(u16)]
pub enum PointerRegister {
  This = 0,
  That = 1,
}

impl PointerRegister {
  pub fn register(&self) -> Register {
    match self {
      PointerRegister::This => Register::THIS,
      PointerRegister::That => Register::THAT,
    }
  }
}

/// The nine arithmetic-logical stack operations.
#[derive(
  StrumDisplay, IntoStaticStr, EnumString,
  Clone,        Copy,          Eq, PartialEq, Debug, Hash
)]
#[strum(serialize_all = "lowercase")]
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

/// One parsed VM command. Label, function, and module-qualified names are
/// interned; clones are cheap.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
  Push { segment: Segment, index: u16 },
  Pop { segment: Segment, index: u16 },
  Arithmetic(ArithmeticOp),
  Label(DefaultAtom),
  Goto(DefaultAtom),
  IfGoto(DefaultAtom),
  Call { function: DefaultAtom, arg_count: u16 },
  Function { name: DefaultAtom, local_count: u16 },
  Return,
}

impl Display for Command {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Command::Push { segment, index } => {
        write!(f, "push {} {}", segment, index)
      }

      Command::Pop { segment, index } => {
        write!(f, "pop {} {}", segment, index)
      }

      Command::Arithmetic(op) => {
        write!(f, "{}", op)
      }

      Command::Label(name) => {
        write!(f, "label {}", name)
      }

      Command::Goto(name) => {
        write!(f, "goto {}", name)
      }

      Command::IfGoto(name) => {
        write!(f, "if-goto {}", name)
      }

      Command::Call { function, arg_count } => {
        write!(f, "call {} {}", function, arg_count)
      }

      Command::Function { name, local_count } => {
        write!(f, "function {} {}", name, local_count)
      }

      Command::Return => {
        write!(f, "return")
      }

    }
  }
}
