/*!

  The command-line loader around the translator core.

  One path argument: a `.vm` file is translated as a single module with no
  bootstrap; a directory is swept for `.vm` files (sorted, for a
  deterministic module order) and translated as one multi-module program.
  The output lands beside the input as `<stem>.asm`, and nothing is written
  when translation fails.

*/

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use vmtranslator::{Module, Program, Translation, TranslationError};

fn main() {
  let args: Vec<String> = env::args().collect();
  if args.len() < 2 {
    show_usage();
    process::exit(1);
  }

  if let Err(error) = run(Path::new(&args[1])) {
    eprintln!("Error: {}", error);
    process::exit(1);
  }
}

fn show_usage() {
  println!("Please provide the .vm file or directory to translate.");
  println!("Example: vmtranslator test.vm");
  println!("Example: vmtranslator test-folder");
}

fn run(input: &Path) -> Result<(), TranslationError> {
  let program = match input.is_dir() {
    true  => load_directory(input)?,
    false => load_file(input)?,
  };

  let translation = Translation::translate(&program)?;
  for warning in &translation.warnings {
    eprintln!("Warning: {}", warning);
  }

  fs::write(output_path(input), translation.to_text())?;
  Ok(())
}

/// The module takes its name from the file stem; `Foo.vm` contributes the
/// static namespace `Foo`.
fn module_name(path: &Path) -> Result<&str, TranslationError> {
  path
    .file_stem()
    .and_then(|stem| stem.to_str())
    .ok_or_else(|| {
      io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("cannot derive a module name from {}", path.display()),
      )
      .into()
    })
}

fn load_file(path: &Path) -> Result<Program, TranslationError> {
  if path.extension().and_then(|e| e.to_str()) != Some("vm") {
    return Err(
      io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("{} is not a .vm file", path.display()),
      )
      .into(),
    );
  }
  let source = fs::read_to_string(path)?;
  Ok(Program::single(module_name(path)?, &source))
}

fn load_directory(path: &Path) -> Result<Program, TranslationError> {
  let mut files: Vec<PathBuf> = Vec::new();
  for entry in fs::read_dir(path)? {
    let entry_path = entry?.path();
    if entry_path.extension().and_then(|e| e.to_str()) == Some("vm") {
      files.push(entry_path);
    }
  }
  files.sort();

  if files.is_empty() {
    return Err(
      io::Error::new(
        io::ErrorKind::NotFound,
        format!("no .vm files found in {}", path.display()),
      )
      .into(),
    );
  }

  let mut modules = Vec::with_capacity(files.len());
  for file in &files {
    let source = fs::read_to_string(file)?;
    modules.push(Module::new(module_name(file)?, &source));
  }
  Ok(Program::new(modules))
}

/// `Foo.vm` becomes `Foo.asm`; a directory `prog/` becomes `prog/prog.asm`.
fn output_path(input: &Path) -> PathBuf {
  match input.is_dir() {
    true => {
      let name = input
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("out");
      input.join(format!("{}.asm", name))
    }
    false => input.with_extension("asm"),
  }
}
