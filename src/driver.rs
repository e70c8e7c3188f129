/*!

  Links one or more modules into a single translated program.

  The driver owns the `TranslationContext` and the `Program`; each module's
  parsed commands are fed through the code generator against that one shared
  context, so the label counter and the output buffer span the whole run
  while the static namespace tracks the module currently being translated.

  A single-module translation is just that module's stream. A multi-module
  translation is prefixed with the bootstrap (stack pointer initialization
  plus a protocol-correct call to the entry function) and concatenates the
  modules in the order the loader supplied them.

*/

use std::fmt::{Display, Formatter};

#[cfg(feature = "trace_translation")]
use prettytable::{format as TableFormat, Table};
use string_cache::DefaultAtom;

use crate::assembly::Instruction;
use crate::codegen::{generate, generate_bootstrap};
use crate::context::TranslationContext;
use crate::error::{ParseWarning, TranslationError};
use crate::parser::parse_module;

/// One unit of VM source, analogous to a compilation unit. Its name scopes
/// the `static` segment.
pub struct Module {
  pub name:  DefaultAtom,
  pub lines: Vec<String>,
}

impl Module {
  pub fn new(name: &str, source: &str) -> Module {
    Module {
      name:  DefaultAtom::from(name),
      lines: source.lines().map(String::from).collect(),
    }
  }
}

/// An ordered sequence of modules, built by the loader and consumed once.
pub struct Program {
  pub modules: Vec<Module>,
}

impl Program {
  pub fn new(modules: Vec<Module>) -> Program {
    Program { modules }
  }

  /// A program of exactly one module; translated without bootstrap.
  pub fn single(name: &str, source: &str) -> Program {
    Program {
      modules: vec![Module::new(name, source)],
    }
  }
}

#[cfg(feature = "trace_translation")]
struct ModuleTrace {
  name:         DefaultAtom,
  commands:     usize,
  skipped:      usize,
  instructions: usize,
  labels:       usize,
}

/// The result of a run: the full output sequence plus every line skipped
/// along the way. A structural error aborts the run and no partial output
/// is returned.
pub struct Translation {
  pub code:     Vec<Instruction>,
  pub warnings: Vec<ParseWarning>,
}

impl Translation {

  pub fn translate(program: &Program) -> Result<Translation, TranslationError> {
    #[cfg(feature = "trace_translation")]
    let translation_time = std::time::Instant::now();

    let mut context  = TranslationContext::new();
    let mut warnings = Vec::new();

    #[cfg(feature = "trace_translation")]
    let mut module_rows: Vec<ModuleTrace> = Vec::new();

    if program.modules.len() > 1 {
      generate_bootstrap(&mut context);
    }

    for module in &program.modules {
      context.enter_module(&module.name);
      let (commands, module_warnings) = parse_module(&module.name, &module.lines);

      #[cfg(feature = "trace_translation")]
      let instructions_before = context.instruction_count();
      #[cfg(feature = "trace_translation")]
      let labels_before = context.labels_drawn();

      for command in &commands {
        generate(command, &mut context)?;
      }

      #[cfg(feature = "trace_translation")]
      module_rows.push(ModuleTrace {
        name:         module.name.clone(),
        commands:     commands.len(),
        skipped:      module_warnings.len(),
        instructions: context.instruction_count() - instructions_before,
        labels:       context.labels_drawn() - labels_before,
      });

      warnings.extend(module_warnings);
    } // end for each module

    #[cfg(feature = "trace_translation")]
    print_trace(&module_rows, context.instruction_count(), translation_time.elapsed());

    Ok(Translation {
      code: context.into_code(),
      warnings,
    })
  }

  /// The emitted program as assembler-ready text, one instruction per line.
  pub fn to_text(&self) -> String {
    format!("{}", self)
  }
}

impl Display for Translation {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    for instruction in &self.code {
      writeln!(f, "{}", instruction)?;
    }
    Ok(())
  }
}

#[cfg(feature = "trace_translation")]
fn print_trace(rows: &[ModuleTrace], total: usize, elapsed: std::time::Duration) {
  let mut table = Table::new();
  table.set_format(*TABLE_DISPLAY_FORMAT);
  table.set_titles(
    row![ub->"Module", ubr->"Commands", ubr->"Skipped", ubr->"Instructions", ubr->"Labels"]
  );

  for row in rows {
    table.add_row(
      row![row.name, r->row.commands, r->row.skipped, r->row.instructions, r->row.labels]
    );
  }

  println!("{}", table);
  println!(
    "Translated {} module(s) to {} instructions in {:?}.\n",
    rows.len(),
    total,
    elapsed
  );
}

#[cfg(feature = "trace_translation")]
lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

#[cfg(test)]
mod tests {
  use super::*;

  fn rendered(translation: &Translation) -> Vec<String> {
    translation.code.iter().map(|i| i.to_string()).collect()
  }

  #[test]
  fn single_module_gets_no_bootstrap() {
    let program     = Program::single("Main", "push constant 1");
    let translation = Translation::translate(&program).unwrap();
    let lines       = rendered(&translation);
    assert_eq!(lines[0], "// push constant 1");
    assert!(!lines.contains(&"@Sys.init".to_string()));
  }

  #[test]
  fn multi_module_program_starts_with_bootstrap() {
    let program = Program::new(vec![
      Module::new("First", "push constant 1"),
      Module::new("Second", "push constant 2"),
    ]);
    let translation = Translation::translate(&program).unwrap();
    let lines       = rendered(&translation);
    assert_eq!(lines[0], "// bootstrap");
    assert_eq!(lines[1], "@256");
    assert!(lines.contains(&"@Sys.init".to_string()));
  }

  #[test]
  fn static_namespaces_differ_between_modules() {
    let program = Program::new(vec![
      Module::new("First", "pop static 0"),
      Module::new("Second", "pop static 0"),
    ]);
    let translation = Translation::translate(&program).unwrap();
    let lines       = rendered(&translation);
    assert!(lines.contains(&"@First.0".to_string()));
    assert!(lines.contains(&"@Second.0".to_string()));
  }

  #[test]
  fn warnings_surface_without_aborting() {
    let program     = Program::single("Main", "mystery 1 2\npush constant 3");
    let translation = Translation::translate(&program).unwrap();
    assert_eq!(translation.warnings.len(), 1);
    assert!(rendered(&translation).contains(&"@3".to_string()));
  }

  #[test]
  fn structural_errors_abort_the_whole_run() {
    let program = Program::single("Main", "push constant 1\npop constant 1");
    assert!(Translation::translate(&program).is_err());
  }

  #[test]
  fn translation_text_ends_each_line_with_a_newline() {
    let program     = Program::single("Main", "push constant 1");
    let translation = Translation::translate(&program).unwrap();
    let text        = translation.to_text();
    assert!(text.starts_with("// push constant 1\n@1\n"));
    assert!(text.ends_with("M=D\n"));
  }
}
