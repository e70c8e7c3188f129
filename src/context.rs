/*!

  The mutable state threaded through every code generator call: the name of
  the module currently being translated (which namespaces its `static`
  segment), the run-wide label counter, and the growing output buffer.

  The context is owned by the driver and borrowed mutably for the duration
  of translating one command; the generator never retains it across calls.
  The label counter is the only source of generated-label suffixes and is
  never reset, not even between modules: suffix uniqueness must span the
  whole concatenated program, otherwise two modules that each contain a
  comparison or a function would both declare the same label and the
  downstream assembler would reject the output.

*/

use string_cache::DefaultAtom;

use crate::assembly::Instruction;

pub struct TranslationContext {
  /// Names the static segment: `static i` in this module loads `module.i`.
  module        : DefaultAtom,
  /// Monotonically increasing over the lifetime of a run.
  label_counter : usize,
  /// The single output sequence all modules append to.
  code          : Vec<Instruction>,
}

impl TranslationContext {

  pub fn new() -> TranslationContext {
    TranslationContext {
      module        : DefaultAtom::from(""),
      label_counter : 0,
      code          : Vec::new(),
    }
  }

  /// Enters `module`'s static namespace. The label counter is deliberately
  /// left alone; see the module documentation.
  pub fn enter_module(&mut self, module: &DefaultAtom) {
    self.module = module.clone();
  }

  pub fn module(&self) -> &DefaultAtom {
    &self.module
  }

  /// Draws the next value of the run-wide label counter.
  pub fn next_label_index(&mut self) -> usize {
    let drawn = self.label_counter;
    self.label_counter += 1;
    drawn
  }

  /// Total labels drawn so far. Reported by the trace table.
  pub fn labels_drawn(&self) -> usize {
    self.label_counter
  }

  /// The symbol naming cell `index` of this module's static segment.
  pub fn static_symbol(&self, index: u16) -> DefaultAtom {
    DefaultAtom::from(format!("{}.{}", self.module, index).as_str())
  }

  pub fn emit(&mut self, instruction: Instruction) {
    self.code.push(instruction);
  }

  pub fn emit_all<I>(&mut self, instructions: I)
    where I: IntoIterator<Item = Instruction>
  {
    self.code.extend(instructions);
  }

  pub fn code(&self) -> &[Instruction] {
    &self.code
  }

  pub fn instruction_count(&self) -> usize {
    self.code.len()
  }

  pub fn into_code(self) -> Vec<Instruction> {
    self.code
  }
}
