/*!

  A translator from Hack-platform stack VM code to Hack assembly.

  The translation pipeline is this:
  ```text
  lines -> [`parser::parse_module`] -> `Command`s ->⋯

  ⋯-> [`codegen::generate`] + `TranslationContext` -> `Instruction`s ->⋯

  ⋯-> [`driver::Translation`] -> assembly text
  ```
  The driver threads one `TranslationContext` through every module of a
  program, which is what keeps generated labels unique and static cells
  namespaced once multiple modules are concatenated into a single output.
  Resolving symbols to numeric addresses is the downstream assembler's job;
  the emitted text is exactly its input grammar.

*/

#[cfg(feature = "trace_translation")]
#[macro_use]
extern crate prettytable;
#[cfg(feature = "trace_translation")]
#[macro_use]
extern crate lazy_static;

pub mod assembly;
pub mod codegen;
pub mod command;
pub mod context;
pub mod driver;
pub mod error;
pub mod parser;

pub use assembly::{Instruction, Target};
pub use command::{ArithmeticOp, Command, PointerRegister, Register, Segment};
pub use context::TranslationContext;
pub use driver::{Module, Program, Translation};
pub use error::{ParseWarning, TranslationError};
pub use parser::{parse, parse_module, SourcedCommand};
