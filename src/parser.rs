/*!

  Turns raw VM source lines into `Command` values.

  One line holds at most one command. Blank lines and `//` comments parse to
  nothing, and a line the grammar does not recognize (an unknown keyword,
  missing operands, trailing junk) is skipped rather than aborting the run:
  `parse` returns `None` and `parse_module` records a `ParseWarning` so the
  caller can report what was dropped. Keywords and segment names are matched
  case-insensitively; indices are decimal.

*/

use std::str::FromStr;

use nom::{
  branch::alt,
  bytes::complete::{is_a, tag_no_case},
  character::complete::{digit1, space1},
  combinator::{all_consuming, map, map_res, verify},
  sequence::tuple,
  IResult,
};
use string_cache::DefaultAtom;

use crate::command::{ArithmeticOp, Command, Segment};
use crate::error::ParseWarning;

/// The two-character comment marker. Everything from it to the end of the
/// line is insignificant.
const COMMENT_MARKER: &str = "//";

/// A command tagged with the 1-based source line it came from, for error
/// reporting out of the code generator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourcedCommand {
  pub line:    u32,
  pub command: Command,
}

fn index(input: &str) -> IResult<&str, u16> {
  map_res(digit1, |digits: &str| digits.parse())(input)
}

fn segment(input: &str) -> IResult<&str, Segment> {
  map_res(
    alt((
      tag_no_case("constant"),
      tag_no_case("static"),
      tag_no_case("local"),
      tag_no_case("argument"),
      tag_no_case("this"),
      tag_no_case("that"),
      tag_no_case("temp"),
      tag_no_case("pointer"),
    )),
    |name: &str| Segment::from_str(&name.to_lowercase()),
  )(input)
}

/// The characters a label or function symbol may contain. A symbol must not
/// begin with a digit; the assembler reserves that spelling for constants.
fn symbol(input: &str) -> IResult<&str, DefaultAtom> {
  map(
    verify(
      is_a("abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_.$:0123456789"),
      |sym: &str| !sym.as_bytes()[0].is_ascii_digit(),
    ),
    DefaultAtom::from,
  )(input)
}

fn push(input: &str) -> IResult<&str, Command> {
  map(
    tuple((tag_no_case("push"), space1, segment, space1, index)),
    |(_, _, segment, _, index)| Command::Push { segment, index },
  )(input)
}

fn pop(input: &str) -> IResult<&str, Command> {
  // `pop constant` parses; the code generator rejects it as structural so
  // the offending line can be named instead of silently dropped.
  map(
    tuple((tag_no_case("pop"), space1, segment, space1, index)),
    |(_, _, segment, _, index)| Command::Pop { segment, index },
  )(input)
}

fn arithmetic(input: &str) -> IResult<&str, Command> {
  map_res(
    alt((
      tag_no_case("add"),
      tag_no_case("sub"),
      tag_no_case("neg"),
      tag_no_case("eq"),
      tag_no_case("gt"),
      tag_no_case("lt"),
      tag_no_case("and"),
      tag_no_case("or"),
      tag_no_case("not"),
    )),
    |op: &str| {
      ArithmeticOp::from_str(&op.to_lowercase()).map(Command::Arithmetic)
    },
  )(input)
}

fn branching(input: &str) -> IResult<&str, Command> {
  map(
    tuple((
      alt((tag_no_case("if-goto"), tag_no_case("label"), tag_no_case("goto"))),
      space1,
      symbol,
    )),
    |(keyword, _, name)| match keyword.to_lowercase().as_str() {
      "label" => Command::Label(name),
      "goto"  => Command::Goto(name),
      _       => Command::IfGoto(name),
    },
  )(input)
}

fn call(input: &str) -> IResult<&str, Command> {
  map(
    tuple((tag_no_case("call"), space1, symbol, space1, index)),
    |(_, _, function, _, arg_count)| Command::Call { function, arg_count },
  )(input)
}

fn function(input: &str) -> IResult<&str, Command> {
  map(
    tuple((tag_no_case("function"), space1, symbol, space1, index)),
    |(_, _, name, _, local_count)| Command::Function { name, local_count },
  )(input)
}

fn return_command(input: &str) -> IResult<&str, Command> {
  map(tag_no_case("return"), |_| Command::Return)(input)
}

fn command(input: &str) -> IResult<&str, Command> {
  alt((
    push,
    pop,
    arithmetic,
    branching,
    function,
    call,
    return_command,
  ))(input)
}

/// Strips the comment suffix, if any, and surrounding whitespace, leaving
/// only the significant text of the line.
fn significant_text(line: &str) -> &str {
  line
    .split_once(COMMENT_MARKER)
    .map(|(text, _)| text)
    .unwrap_or(line)
    .trim()
}

/// Parses one raw source line. Blank lines, comment lines, and lines the
/// grammar does not recognize all produce `None`.
pub fn parse(line: &str) -> Option<Command> {
  let text = significant_text(line);
  if text.is_empty() {
    return None;
  }
  match all_consuming(command)(text) {
    Ok((_, parsed)) => Some(parsed),
    Err(_)          => None
  }
}

/// Parses a whole module's lines in order, numbering commands with their
/// 1-based source line and recording a warning for every skipped line.
pub fn parse_module(
  module: &DefaultAtom,
  lines:  &[String],
) -> (Vec<SourcedCommand>, Vec<ParseWarning>)
{
  let mut commands: Vec<SourcedCommand> = Vec::new();
  let mut warnings: Vec<ParseWarning>   = Vec::new();

  for (number, line) in lines.iter().enumerate() {
    let text = significant_text(line);
    if text.is_empty() {
      continue;
    }

    match all_consuming(command)(text) {

      Ok((_, parsed)) => {
        commands.push(SourcedCommand {
          line:    number as u32 + 1,
          command: parsed,
        });
      }

      Err(_) => {
        warnings.push(ParseWarning {
          module: module.clone(),
          line:   number as u32 + 1,
          text:   text.to_string(),
        });
      }

    } // end match parse result
  }

  (commands, warnings)
}

#[cfg(test)]
mod tests {
  use crate::command::Segment::*;

  use super::*;

  #[test]
  fn parses_push_and_pop() {
    assert_eq!(
      parse("push constant 7"),
      Some(Command::Push { segment: Constant, index: 7 })
    );
    assert_eq!(
      parse("pop local 2"),
      Some(Command::Pop { segment: Local, index: 2 })
    );
    // Multiple separating spaces are tolerated.
    assert_eq!(
      parse("push  pointer  1"),
      Some(Command::Push { segment: Pointer, index: 1 })
    );
  }

  #[test]
  fn keywords_are_case_insensitive() {
    assert_eq!(
      parse("PUSH Constant 7"),
      Some(Command::Push { segment: Constant, index: 7 })
    );
    assert_eq!(parse("Add"), Some(Command::Arithmetic(ArithmeticOp::Add)));
    assert_eq!(parse("RETURN"), Some(Command::Return));
  }

  #[test]
  fn comments_and_blank_lines_parse_to_nothing() {
    assert_eq!(parse(""), None);
    assert_eq!(parse("   "), None);
    assert_eq!(parse("// a full comment line"), None);
    assert_eq!(
      parse("push constant 7 // trailing comment"),
      Some(Command::Push { segment: Constant, index: 7 })
    );
  }

  #[test]
  fn branching_and_function_commands_parse() {
    assert_eq!(parse("label LOOP"), Some(Command::Label(DefaultAtom::from("LOOP"))));
    assert_eq!(parse("goto END"), Some(Command::Goto(DefaultAtom::from("END"))));
    assert_eq!(
      parse("if-goto Main.f$WHILE"),
      Some(Command::IfGoto(DefaultAtom::from("Main.f$WHILE")))
    );
    assert_eq!(
      parse("call Sys.init 0"),
      Some(Command::Call { function: DefaultAtom::from("Sys.init"), arg_count: 0 })
    );
    assert_eq!(
      parse("function Mult.double 2"),
      Some(Command::Function { name: DefaultAtom::from("Mult.double"), local_count: 2 })
    );
  }

  #[test]
  fn malformed_lines_are_skipped() {
    assert_eq!(parse("frobnicate local 2"), None); // unknown keyword
    assert_eq!(parse("push local"), None);         // missing index
    assert_eq!(parse("push local 2 extra"), None); // trailing junk
    assert_eq!(parse("label 3LOOP"), None);        // symbol starts with digit
    assert_eq!(parse("push local 99999"), None);   // index overflows u16
  }

  #[test]
  fn parse_module_numbers_lines_and_collects_warnings() {
    let module = DefaultAtom::from("Main");
    let lines: Vec<String> = [
      "// comment",
      "push constant 1",
      "",
      "bogus line here",
      "add",
    ]
    .iter()
    .map(|line| line.to_string())
    .collect();

    let (commands, warnings) = parse_module(&module, &lines);

    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].line, 2);
    assert_eq!(commands[1].line, 5);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].line, 4);
    assert_eq!(warnings[0].text, "bogus line here");
  }
}
