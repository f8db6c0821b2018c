use crate::parser::{Instruction, Op, ParseError, Parser};
use crate::stack::Stack;
use std::error::Error;
use std::fmt::Display;
use std::io::{stdout, Write};

/// Configuration options for the interpreter
#[derive(Debug)]
pub struct VmConfig {
    file_name: String,
    suppress_output: bool,
}

impl VmConfig {
    /// Creates a new interpreter config for the given script file
    pub fn new(file_name: &str) -> VmConfig {
        VmConfig {
            file_name: file_name.to_string(),
            suppress_output: false,
        }
    }

    /// Returns a configuration that runs the script without writing anything
    /// the script produces to stdout. Fatal conditions are unaffected.
    pub fn suppressed(file_name: &str) -> VmConfig {
        VmConfig {
            file_name: file_name.to_string(),
            suppress_output: true,
        }
    }
}

#[derive(Debug)]
pub(crate) enum VmErrorKind {
    Parse(ParseError),
    PopEmptyStack(usize),
    PintEmptyStack(usize),
    StackTooShort(usize, &'static str),
    DivisionByZero(usize),
    IoError(usize),
}

impl VmErrorKind {
    fn throw<T>(self) -> Result<T, VmError> {
        let msg = match &self {
            VmErrorKind::Parse(err) => err.msg.clone(),
            VmErrorKind::PopEmptyStack(line) => {
                format!("L{}: can't pop an empty stack", line)
            }
            VmErrorKind::PintEmptyStack(line) => {
                format!("L{}: can't pint, stack empty", line)
            }
            VmErrorKind::StackTooShort(line, opcode) => {
                format!("L{}: can't {}, stack too short", line, opcode)
            }
            VmErrorKind::DivisionByZero(line) => {
                format!("L{}: division by zero", line)
            }
            VmErrorKind::IoError(line) => {
                format!("L{}: output error", line)
            }
        };
        Err(VmError { msg, kind: self })
    }
}

/// A fatal condition raised while executing a script. The message is the
/// exact diagnostic line the interpreter prints on stderr before exiting.
#[derive(Debug)]
pub struct VmError {
    pub(crate) msg: String,
    #[allow(dead_code)]
    pub(crate) kind: VmErrorKind,
}

impl Error for VmError {}

impl Display for VmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.msg)
    }
}

/// The interpreter loop: owns the stack and pulls instructions from the
/// parser one line at a time, executing each as it arrives.
#[derive(Debug)]
pub struct Vm {
    config: VmConfig,
    parser: Parser,
    stack: Stack,
}

impl Vm {
    /// Creates a new interpreter over the script named in `config`.
    pub fn new(config: VmConfig) -> Result<Vm, VmError> {
        let parser = match Parser::new(&config.file_name) {
            Ok(parser) => parser,
            Err(err) => return VmErrorKind::Parse(err).throw(),
        };

        Ok(Vm {
            config,
            parser,
            stack: Stack::new(),
        })
    }

    /// Executes the script from top to bottom, stopping at the first fatal
    /// condition. A clean run to end-of-input returns `Ok(())`; the stack is
    /// released when the `Vm` is dropped, on either outcome.
    pub fn run(&mut self) -> Result<(), VmError> {
        while let Some(instr) = self.parser.next_instruction() {
            let instr = match instr {
                Ok(instr) => instr,
                Err(err) => return VmErrorKind::Parse(err).throw(),
            };
            self.exec(&instr)?;
        }

        Ok(())
    }

    /// Resets the interpreter state without re-mapping the source file.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.parser.reset();
    }

    /// Executes a single instruction against the current stack.
    pub fn exec(&mut self, instr: &Instruction) -> Result<(), VmError> {
        match instr.op {
            Op::Push(value) => {
                self.stack.push(value);

                Ok(())
            }
            Op::Pall => {
                if self.config.suppress_output {
                    return Ok(());
                }

                self.pall(&mut stdout(), instr.line)
            }
            Op::Pint => {
                if self.stack.is_empty() {
                    return VmErrorKind::PintEmptyStack(instr.line).throw();
                }
                if self.config.suppress_output {
                    return Ok(());
                }

                self.pint(&mut stdout(), instr.line)
            }
            Op::Pop => {
                if self.stack.pop().is_some() {
                    return Ok(());
                }

                VmErrorKind::PopEmptyStack(instr.line).throw()
            }
            Op::Swap => {
                if let Some(top) = self.stack.pop() {
                    if let Some(second) = self.stack.pop() {
                        self.stack.push(top);
                        self.stack.push(second);

                        return Ok(());
                    }
                }

                VmErrorKind::StackTooShort(instr.line, "swap").throw()
            }
            Op::Add => {
                if let Some(top) = self.stack.pop() {
                    if let Some(second) = self.stack.pop() {
                        self.stack.push(second.wrapping_add(top));

                        return Ok(());
                    }
                }

                VmErrorKind::StackTooShort(instr.line, "add").throw()
            }
            Op::Sub => {
                if let Some(top) = self.stack.pop() {
                    if let Some(second) = self.stack.pop() {
                        self.stack.push(second.wrapping_sub(top));

                        return Ok(());
                    }
                }

                VmErrorKind::StackTooShort(instr.line, "sub").throw()
            }
            Op::Mul => {
                if let Some(top) = self.stack.pop() {
                    if let Some(second) = self.stack.pop() {
                        self.stack.push(second.wrapping_mul(top));

                        return Ok(());
                    }
                }

                VmErrorKind::StackTooShort(instr.line, "mul").throw()
            }
            Op::Div => {
                if let Some(top) = self.stack.pop() {
                    if let Some(second) = self.stack.pop() {
                        if top == 0 {
                            return VmErrorKind::DivisionByZero(instr.line).throw();
                        }
                        self.stack.push(second.wrapping_div(top));

                        return Ok(());
                    }
                }

                VmErrorKind::StackTooShort(instr.line, "div").throw()
            }
            Op::Mod => {
                if let Some(top) = self.stack.pop() {
                    if let Some(second) = self.stack.pop() {
                        if top == 0 {
                            return VmErrorKind::DivisionByZero(instr.line).throw();
                        }
                        self.stack.push(second.wrapping_rem(top));

                        return Ok(());
                    }
                }

                VmErrorKind::StackTooShort(instr.line, "mod").throw()
            }
            Op::Nop => Ok(()),
        }
    }

    /// Writes every stack element to `out`, one per line, top to bottom.
    /// Writes nothing on an empty stack.
    fn pall<W: Write>(&self, out: &mut W, line: usize) -> Result<(), VmError> {
        for value in self.stack.iter() {
            if writeln!(out, "{}", value).is_err() {
                return VmErrorKind::IoError(line).throw();
            }
        }
        if out.flush().is_err() {
            return VmErrorKind::IoError(line).throw();
        }

        Ok(())
    }

    /// Writes the top of the stack to `out` without removing it.
    fn pint<W: Write>(&self, out: &mut W, line: usize) -> Result<(), VmError> {
        match self.stack.peek() {
            Some(value) => {
                if writeln!(out, "{}", value).is_err() || out.flush().is_err() {
                    return VmErrorKind::IoError(line).throw();
                }

                Ok(())
            }
            None => VmErrorKind::PintEmptyStack(line).throw(),
        }
    }
}
