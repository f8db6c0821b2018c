use memmap::Mmap;
use std::error::Error;
use std::fmt::Display;
use std::fs::File;

#[derive(Debug)]
pub(crate) enum ParseErrorKind {
    UnknownInstruction(usize, String),
    UsageError(usize, &'static str),
    FileOpenError(String),
}

impl ParseErrorKind {
    fn throw<T>(self) -> Result<T, ParseError> {
        let msg = match &self {
            ParseErrorKind::UnknownInstruction(line, opcode) => {
                format!("L{}: unknown instruction {}", line, opcode)
            }
            ParseErrorKind::UsageError(line, usage) => {
                format!("L{}: usage: {}", line, usage)
            }
            ParseErrorKind::FileOpenError(file_name) => {
                format!("Error: Can't open file {}", file_name)
            }
        };
        Err(ParseError { msg, kind: self })
    }
}

/// A fatal condition raised while turning a script line into an instruction.
///
/// The message is the exact diagnostic line the interpreter prints on stderr.
#[derive(Debug)]
pub struct ParseError {
    pub(crate) msg: String,
    #[allow(dead_code)]
    pub(crate) kind: ParseErrorKind,
}

impl Error for ParseError {}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.msg)
    }
}

/// The closed set of opcodes the interpreter understands. `push` carries its
/// argument already validated and parsed.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Op {
    Push(i32),
    Pall,
    Pint,
    Pop,
    Swap,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Nop,
}

/// One parsed script line: the opcode plus the 1-based physical line it came
/// from, kept for error attribution.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Instruction {
    pub op: Op,
    pub line: usize,
}

/// Checks a token against the integer literal grammar: an optional single
/// leading `+` or `-`, then one or more decimal digits. Pure, no parsing.
pub fn is_integer_literal(token: &str) -> bool {
    let digits = token.strip_prefix(&['+', '-'][..]).unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Splits one raw line into an opcode token and at most one argument token.
/// Further tokens on the line are consumed silently. Blank lines and lines
/// whose first token starts with `#` yield no instruction.
pub fn tokenize(line: &str) -> Option<(&str, Option<&str>)> {
    let mut tokens = line.split_whitespace();
    let opcode = tokens.next()?;
    if opcode.starts_with('#') {
        return None;
    }
    Some((opcode, tokens.next()))
}

/// The component responsible for reading the script file and producing
/// instructions one line at a time.
///
/// Iteration is streaming on purpose: a line is parsed only when the
/// interpreter loop reaches it, so output from earlier lines is already on
/// stdout when a later line turns out to be malformed.
#[derive(Debug)]
pub struct Parser {
    // `None` stands for a zero-byte script; mapping an empty file fails on
    // most platforms.
    source: Option<Mmap>,
    offset: usize,
    line: usize,
}

impl Parser {
    pub fn new(file_name: &str) -> Result<Parser, ParseError> {
        let file = match File::open(file_name) {
            Ok(file) => file,
            Err(_) => return ParseErrorKind::FileOpenError(file_name.to_string()).throw(),
        };
        let len = match file.metadata() {
            Ok(metadata) => metadata.len(),
            Err(_) => return ParseErrorKind::FileOpenError(file_name.to_string()).throw(),
        };
        let source = if len == 0 {
            None
        } else {
            match unsafe { Mmap::map(&file) } {
                Ok(source) => Some(source),
                Err(_) => return ParseErrorKind::FileOpenError(file_name.to_string()).throw(),
            }
        };

        Ok(Parser {
            source,
            offset: 0,
            line: 0,
        })
    }

    /// Rewinds the parser to the top of the script without re-mapping it.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.line = 0;
    }

    /// The 1-based physical line number of the most recently read line.
    pub fn line(&self) -> usize {
        self.line
    }

    fn next_line(&mut self) -> Option<(usize, &[u8])> {
        let source: &[u8] = self.source.as_deref().unwrap_or(&[]);
        if self.offset >= source.len() {
            return None;
        }
        self.line += 1;
        let rest = &source[self.offset..];
        let end = rest
            .iter()
            .position(|&byte| byte == b'\n')
            .unwrap_or(rest.len());
        self.offset += end + 1;

        Some((self.line, &rest[..end]))
    }

    /// Produces the next instruction of the script, skipping blank and
    /// comment lines (which still advance the line counter). `None` at
    /// end-of-input.
    pub fn next_instruction(&mut self) -> Option<Result<Instruction, ParseError>> {
        loop {
            let (line, bytes) = self.next_line()?;
            let text = String::from_utf8_lossy(bytes);
            let (opcode, arg) = match tokenize(&text) {
                Some(tokens) => tokens,
                None => continue,
            };

            return Some(Self::instruction(opcode, arg, line));
        }
    }

    fn instruction(opcode: &str, arg: Option<&str>, line: usize) -> Result<Instruction, ParseError> {
        let op = match opcode {
            "push" => {
                let arg = arg.unwrap_or("");
                if !is_integer_literal(arg) {
                    return ParseErrorKind::UsageError(line, "push integer").throw();
                }
                match arg.parse::<i32>() {
                    Ok(value) => Op::Push(value),
                    // grammatically valid but outside the i32 range
                    Err(_) => return ParseErrorKind::UsageError(line, "push integer").throw(),
                }
            }
            "pall" => Op::Pall,
            "pint" => Op::Pint,
            "pop" => Op::Pop,
            "swap" => Op::Swap,
            "add" => Op::Add,
            "sub" => Op::Sub,
            "mul" => Op::Mul,
            "div" => Op::Div,
            "mod" => Op::Mod,
            "nop" => Op::Nop,
            _ => return ParseErrorKind::UnknownInstruction(line, opcode.to_string()).throw(),
        };

        Ok(Instruction { op, line })
    }
}

impl Iterator for &mut Parser {
    type Item = Result<Instruction, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_instruction()
    }
}

#[cfg(test)]
mod tests {
    use super::{is_integer_literal, tokenize, Instruction, Op, ParseError, Parser};

    #[test]
    fn integer_literal_grammar() {
        assert!(is_integer_literal("0"));
        assert!(is_integer_literal("123"));
        assert!(is_integer_literal("-5"));
        assert!(is_integer_literal("+5"));
        assert!(is_integer_literal("007"));

        assert!(!is_integer_literal(""));
        assert!(!is_integer_literal("-"));
        assert!(!is_integer_literal("+"));
        assert!(!is_integer_literal("--5"));
        assert!(!is_integer_literal("12a"));
        assert!(!is_integer_literal("3.5"));
        assert!(!is_integer_literal(" 5"));
    }

    #[test]
    fn tokenize_splits_opcode_and_argument() {
        assert_eq!(tokenize("push 1"), Some(("push", Some("1"))));
        assert_eq!(tokenize("  pall \t "), Some(("pall", None)));
        assert_eq!(tokenize("push\t42\r"), Some(("push", Some("42"))));
    }

    #[test]
    fn tokenize_ignores_extra_tokens() {
        assert_eq!(tokenize("push 1 2 3"), Some(("push", Some("1"))));
    }

    #[test]
    fn tokenize_skips_comments_and_blanks() {
        assert_eq!(tokenize(""), None);
        assert_eq!(tokenize("   \t  "), None);
        assert_eq!(tokenize("# a comment"), None);
        assert_eq!(tokenize("#push 1"), None);
    }

    fn collect(file_name: &str) -> Result<Vec<Instruction>, ParseError> {
        let mut parser = Parser::new(file_name)?;
        let mut instructions = vec![];
        for instr in &mut parser {
            instructions.push(instr?);
        }
        Ok(instructions)
    }

    #[test]
    fn parse_all_opcodes() -> Result<(), ParseError> {
        let instructions = collect("resources/parse_all.monty")?;
        let results = vec![
            Instruction { op: Op::Push(1), line: 2 },
            Instruction { op: Op::Push(-3), line: 3 },
            Instruction { op: Op::Push(7), line: 5 },
            Instruction { op: Op::Pall, line: 6 },
            Instruction { op: Op::Pint, line: 7 },
            Instruction { op: Op::Swap, line: 8 },
            Instruction { op: Op::Add, line: 9 },
            Instruction { op: Op::Push(2), line: 10 },
            Instruction { op: Op::Sub, line: 11 },
            Instruction { op: Op::Push(4), line: 12 },
            Instruction { op: Op::Mul, line: 13 },
            Instruction { op: Op::Push(3), line: 14 },
            Instruction { op: Op::Div, line: 15 },
            Instruction { op: Op::Push(2), line: 16 },
            Instruction { op: Op::Mod, line: 17 },
            Instruction { op: Op::Nop, line: 18 },
            Instruction { op: Op::Pop, line: 19 },
        ];

        assert_eq!(instructions, results);
        Ok(())
    }

    #[test]
    fn unknown_instruction_is_line_tagged() {
        let err = collect("resources/unknown.monty").unwrap_err();

        assert_eq!(err.to_string(), "L2: unknown instruction pop2");
    }

    #[test]
    fn bad_push_argument_is_line_tagged() {
        let err = collect("resources/bad_push.monty").unwrap_err();

        assert_eq!(err.to_string(), "L5: usage: push integer");
    }

    #[test]
    fn push_without_argument_is_a_usage_error() {
        let err = Parser::instruction("push", None, 3).unwrap_err();

        assert_eq!(err.to_string(), "L3: usage: push integer");
    }

    #[test]
    fn push_out_of_range_is_a_usage_error() {
        let err = Parser::instruction("push", Some("2147483648"), 1).unwrap_err();

        assert_eq!(err.to_string(), "L1: usage: push integer");
    }

    #[test]
    fn opcode_match_is_case_sensitive() {
        let err = Parser::instruction("PALL", None, 1).unwrap_err();

        assert_eq!(err.to_string(), "L1: unknown instruction PALL");
    }

    #[test]
    fn empty_file_yields_no_instructions() -> Result<(), ParseError> {
        assert!(collect("resources/empty.monty")?.is_empty());
        Ok(())
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let err = Parser::new("resources/no_such_file.monty").unwrap_err();

        assert_eq!(
            err.to_string(),
            "Error: Can't open file resources/no_such_file.monty"
        );
    }

    #[test]
    fn reset_rewinds_to_the_top() -> Result<(), ParseError> {
        let mut parser = Parser::new("resources/push_pall.monty")?;
        while let Some(instr) = parser.next_instruction() {
            instr?;
        }
        parser.reset();

        let first = parser.next_instruction().expect("script is not empty")?;
        assert_eq!(first, Instruction { op: Op::Push(1), line: 1 });
        Ok(())
    }
}
