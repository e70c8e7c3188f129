/*!

  The error taxonomy of a translation run.

  Two severities exist. A `TranslationError` is fatal: a structurally
  invalid command must not produce code, and rather than emit a partial or
  miscompiled program the whole run aborts and no output is handed back. A
  `ParseWarning` records a line the parser skipped; skipped lines never
  abort a run and never change the emitted output.

*/

use std::fmt::{Display, Formatter};

use string_cache::DefaultAtom;
use thiserror::Error;

/// Fatal conditions. The structural variants carry the module and source
/// line of the offending command.
#[derive(Error, Debug)]
pub enum TranslationError {
  #[error("{module}, line {line}: cannot pop into the constant segment")]
  ConstantPop { module: DefaultAtom, line: u32 },

  #[error("{module}, line {line}: pointer index must be 0 or 1, found {index}")]
  PointerIndex { module: DefaultAtom, line: u32, index: u16 },

  #[error("{module}, line {line}: temp index must be in 0..=7, found {index}")]
  TempIndex { module: DefaultAtom, line: u32, index: u16 },

  #[error("failed to load VM source: {0}")]
  Io(#[from] std::io::Error),
}

/// A line the parser could not understand: an unknown keyword, missing
/// operands, or trailing junk. Collected per run so a caller can report
/// them; the line itself produces no emitted instruction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseWarning {
  pub module: DefaultAtom,
  pub line:   u32,
  pub text:   String,
}

impl Display for ParseWarning {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "{}, line {}: skipped unrecognized line `{}`",
      self.module, self.line, self.text
    )
  }
}
