/*!

  The typed form of emitted Hack assembly. Every line the translator produces
  is one of four shapes: an `@`-load of a constant or symbol, a computation
  line, a parenthesized label declaration, or a source-echo comment. Labels
  and symbolic loads are the only parts the translator constructs at runtime,
  so those carry interned names; computation lines come from the fixed Hack
  computation set and are carried as the literal `dest=comp;jump` mnemonic.

  `Display` renders the exact textual grammar the downstream assembler
  accepts. Symbol-to-address resolution is entirely the assembler's job.

*/

use std::fmt::{Display, Formatter};

use string_cache::DefaultAtom;

use crate::command::Register;

/// The operand of an `@` instruction: a literal constant or a symbolic name
/// left for the assembler to resolve.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Target {
  Value(u16),
  Name(DefaultAtom),
}

impl Display for Target {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Target::Value(value) => write!(f, "{}", value),
      Target::Name(name)   => write!(f, "{}", name),
    }
  }
}

/// One emitted assembly line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Instruction {
  /// `@target`: load a constant or a symbol's address into A.
  Address(Target),
  /// One `dest=comp;jump` line from the Hack computation set.
  Compute(&'static str),
  /// `(LABEL)`: a declaration consumed by the assembler, not an instruction.
  Label(DefaultAtom),
  /// `// text`: the source-echo line preceding each generated block.
  Comment(String),
}

impl Instruction {
  pub fn at_value(value: u16) -> Instruction {
    Instruction::Address(Target::Value(value))
  }

  pub fn at_name(name: DefaultAtom) -> Instruction {
    Instruction::Address(Target::Name(name))
  }

  pub fn at_register(register: Register) -> Instruction {
    let name: &'static str = register.into();
    Instruction::Address(Target::Name(DefaultAtom::from(name)))
  }

  /// True for `(LABEL)` lines. Used when checking declaration uniqueness.
  pub fn is_label_declaration(&self) -> bool {
    match self {
      Instruction::Label(_) => true,
      _                     => false
    }
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Instruction::Address(target) => {
        write!(f, "@{}", target)
      }

      Instruction::Compute(mnemonic) => {
        write!(f, "{}", mnemonic)
      }

      Instruction::Label(name) => {
        write!(f, "({})", name)
      }

      Instruction::Comment(text) => {
        write!(f, "// {}", text)
      }

    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn instructions_render_the_assembler_grammar() {
    assert_eq!(Instruction::at_value(256).to_string(), "@256");
    assert_eq!(Instruction::at_register(Register::SP).to_string(), "@SP");
    assert_eq!(
      Instruction::at_name(DefaultAtom::from("Main.3")).to_string(),
      "@Main.3"
    );
    assert_eq!(Instruction::Compute("AM=M+1").to_string(), "AM=M+1");
    assert_eq!(
      Instruction::Label(DefaultAtom::from("CMP_END_4")).to_string(),
      "(CMP_END_4)"
    );
    assert_eq!(
      Instruction::Comment("push constant 7".to_string()).to_string(),
      "// push constant 7"
    );
  }
}
