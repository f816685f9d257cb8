use crate::context::{Context, ContextError, Relation, Value};
use crate::io::{Console, RandomSource, StdConsole, ThreadRandom};
use crate::lexer::{numeric_literal, LexError, LexErrorKind, Lexer, Token};
use crate::program::{OpGroup, Opcode, Program};
use crate::source::Source;
use crate::validate::{validate, BlockReport};
use std::error::Error;
use std::fmt::Display;
use tracing::{debug, trace, warn};
use wasm_bindgen::JsValue;

/// Configuration options for the virtual machine
#[derive(Debug, Clone, PartialEq)]
pub struct VmConfig {
    source: Source,
    debug: bool,
    suppress_output: bool,
}

impl VmConfig {
    /// Creates a new config with the given arguments
    ///
    /// - `source` where the program text comes from
    /// - `debug` emit a trace event with the stack for every executed instruction
    /// - `suppress_output` discard everything the program writes
    pub fn new(source: Source, debug: bool, suppress_output: bool) -> VmConfig {
        VmConfig {
            source,
            debug,
            suppress_output,
        }
    }

    /// Returns a default configuration running the given source file
    ///
    /// `file_name` - the name of the source file on disk
    pub fn default_file(file_name: &str) -> VmConfig {
        VmConfig::new(Source::File(file_name.to_string()), false, false)
    }

    /// Returns a default configuration running the given source file, suppressing output
    ///
    /// `file_name` - the name of the source file on disk
    pub fn default_file_suppressed(file_name: &str) -> VmConfig {
        VmConfig::new(Source::File(file_name.to_string()), false, true)
    }

    /// Returns a default configuration running the given program text
    ///
    /// `source` - the program as a string
    pub fn default_text(source: &str) -> VmConfig {
        VmConfig::new(Source::Text(source.to_string()), false, false)
    }

    /// Returns a default configuration running the given program text, suppressing output
    ///
    /// `source` - the program as a string
    pub fn default_text_suppressed(source: &str) -> VmConfig {
        VmConfig::new(Source::Text(source.to_string()), false, true)
    }

    /// Returns a debug configuration running the given source file
    ///
    /// `file_name` - the name of the source file on disk
    pub fn debug_file(file_name: &str) -> VmConfig {
        VmConfig::new(Source::File(file_name.to_string()), true, false)
    }

    pub fn source(&self) -> &Source {
        &self.source
    }
}

#[derive(Debug)]
pub(crate) enum VmErrorKind {
    InvalidInvocation(usize),
    SourceUnavailable(LexError),
    NonNumeric(Token),
    EmptyStack(Token),
    InsufficientOperands(Token, ContextError),
    MalformedString(Token),
    UnknownVariable(Token),
    UnknownInstruction(Token),
    UnbalancedBlock(BlockReport),
    InvalidSourceName(String),
    UnknownLabel(Token),
    IOError(Token, std::io::Error),
}

impl Display for VmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl VmErrorKind {
    fn throw<T>(self) -> Result<T, VmError> {
        Err(self.error())
    }

    fn error(self) -> VmError {
        let msg = match &self {
            VmErrorKind::InvalidInvocation(count) => format!("invalid number of parameters, expected a single source file but got {}", count),
            VmErrorKind::SourceUnavailable(err) => match err.kind {
                LexErrorKind::FileOpenError(_) => format!("cannot open source, {}", err.msg),
                LexErrorKind::MemoryMapError(_) => format!("cannot read source, {}", err.msg),
            },
            VmErrorKind::NonNumeric(token) => format!("the argument at line {} is not a number", token.line),
            VmErrorKind::EmptyStack(token) => format!("the stack is empty, line {}", token.line),
            VmErrorKind::InsufficientOperands(token, ContextError::DivisionByZero) => format!("invalid operation. the stack is either composed of less than 2 elements or the top element has a value of zero, line {}", token.line),
            VmErrorKind::InsufficientOperands(token, _) => format!("the stack is composed of less than 2 elements, line {}", token.line),
            VmErrorKind::MalformedString(token) => format!("the argument at line {} is not a string", token.line),
            VmErrorKind::UnknownVariable(token) => format!("the variable at line {} doesn't exist", token.line),
            VmErrorKind::UnknownInstruction(token) => format!("unknown token `{}` in line {}", token.text, token.line),
            VmErrorKind::UnbalancedBlock(report) => report.to_string(),
            VmErrorKind::InvalidSourceName(name) => format!("the file extension of `{}` is not valid, expected {}", name, crate::source::SOURCE_EXTENSION),
            VmErrorKind::UnknownLabel(token) => format!("the label at line {} doesn't exist", token.line),
            VmErrorKind::IOError(token, err) => format!("console error at line {}: {}", token.line, err),
        };
        VmError { msg, kind: self }
    }

    fn code(&self) -> i32 {
        match self {
            VmErrorKind::InvalidInvocation(_) => 1,
            VmErrorKind::SourceUnavailable(_) => 2,
            VmErrorKind::NonNumeric(_) => 3,
            VmErrorKind::EmptyStack(_) => 4,
            VmErrorKind::InsufficientOperands(..) => 5,
            VmErrorKind::MalformedString(_) => 6,
            VmErrorKind::UnknownVariable(_) => 7,
            VmErrorKind::UnknownInstruction(_) => 8,
            VmErrorKind::UnbalancedBlock(_) => 9,
            VmErrorKind::InvalidSourceName(_) => 10,
            VmErrorKind::UnknownLabel(_) => 11,
            VmErrorKind::IOError(..) => 12,
        }
    }

    fn line(&self) -> Option<usize> {
        match self {
            VmErrorKind::NonNumeric(token)
            | VmErrorKind::EmptyStack(token)
            | VmErrorKind::InsufficientOperands(token, _)
            | VmErrorKind::MalformedString(token)
            | VmErrorKind::UnknownVariable(token)
            | VmErrorKind::UnknownInstruction(token)
            | VmErrorKind::UnknownLabel(token)
            | VmErrorKind::IOError(token, _) => Some(token.line),
            VmErrorKind::UnbalancedBlock(report) => report.first_line(),
            VmErrorKind::InvalidInvocation(_)
            | VmErrorKind::SourceUnavailable(_)
            | VmErrorKind::InvalidSourceName(_) => None,
        }
    }
}

/// A fatal error. The first one ends the run.
#[derive(Debug)]
pub struct VmError {
    msg: String,
    pub(crate) kind: VmErrorKind,
}

impl VmError {
    /// The CLI was not given exactly one source file
    pub fn invalid_invocation(count: usize) -> VmError {
        VmErrorKind::InvalidInvocation(count).error()
    }

    /// The source file does not follow the naming convention
    pub fn invalid_source_name(file_name: &str) -> VmError {
        VmErrorKind::InvalidSourceName(file_name.to_string()).error()
    }

    /// The process exit code for this error
    pub fn code(&self) -> i32 {
        self.kind.code()
    }

    /// The source line the error was raised at, if it belongs to one
    pub fn line(&self) -> Option<usize> {
        self.kind.line()
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}

impl From<VmError> for JsValue {
    fn from(err: VmError) -> JsValue {
        JsValue::from(format!("fsnail error occurred: {}", err))
    }
}

impl Display for VmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ERROR {}: {}", self.code(), self.msg)
    }
}

impl Error for VmError {}

/// What the dispatcher does after an instruction ran
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum Step {
    Next,
    SkipArgument,
    Jump(usize),
    Halt,
}

/// The root component for the virtual machine
pub struct Vm<C = StdConsole, R = ThreadRandom> {
    config: VmConfig,
    program: Program,
    context: Context,
    console: C,
    random: R,
    instruction_pointer: usize,
    done: bool,
}

impl Vm {
    /// Creates a virtual machine talking to stdin and stdout
    ///
    /// - `config` The configuration of the virtual machine
    pub fn new(config: VmConfig) -> Result<Vm, VmError> {
        Vm::with_io(config, StdConsole, ThreadRandom::default())
    }
}

impl<C: Console, R: RandomSource> Vm<C, R> {
    /// Creates a virtual machine with the given console and random source. Loads, tokenizes and
    /// validates the program, nothing is executed before validation succeeds.
    pub fn with_io(config: VmConfig, console: C, random: R) -> Result<Vm<C, R>, VmError> {
        let lexer = match config.source() {
            Source::File(file_name) => match Lexer::new(file_name) {
                Ok(content) => content,
                Err(err) => return VmErrorKind::SourceUnavailable(err).throw(),
            },
            Source::Text(text) => Lexer::from_text(text),
        };
        let program = Program::new(lexer.produce_tokens());
        let report = validate(&program);
        if !report.is_ok() {
            return VmErrorKind::UnbalancedBlock(report).throw();
        }
        debug!(
            tokens = program.len(),
            labels = program.labels().len(),
            "program loaded"
        );

        Ok(Vm {
            config,
            program,
            context: Context::new(),
            console,
            random,
            instruction_pointer: 0,
            done: false,
        })
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    /// Returns the next instruction to be executed in a `Some` variant. None if the program has
    /// reached its end.
    pub fn next_instruction(&self) -> Option<usize> {
        if self.done {
            return None;
        }
        if self.instruction_pointer < self.program.len() {
            Some(self.instruction_pointer)
        } else {
            None
        }
    }

    /// Executes all instructions - runs the program.
    pub fn run(&mut self) -> Result<(), VmError> {
        while let Some(ip) = self.next_instruction() {
            self.exec(ip)?;
        }

        Ok(())
    }

    /// Resets the stack, the variables and the instruction pointer without re-reading the source
    pub fn reset(&mut self) {
        self.context.reset();
        self.instruction_pointer = 0;
        self.done = false;
    }

    fn token(&self, ip: usize) -> Token {
        self.program
            .token(ip)
            .cloned()
            .unwrap_or_else(|| Token::new(Opcode::Halt.name(), 0))
    }

    /// Turns a refused stack or variable operation into the error reported for `ip`
    fn check(&self, ip: usize, result: Result<(), ContextError>) -> Result<Step, VmError> {
        let err = match result {
            Ok(()) => return Ok(Step::Next),
            Err(err) => err,
        };
        let token = self.token(ip);
        let op = self.program.op(ip).unwrap_or(Opcode::Unknown);
        match err {
            ContextError::EmptyStack => match op {
                Opcode::ToInt
                | Opcode::Inc
                | Opcode::Dec
                | Opcode::Out
                | Opcode::OutInt
                | Opcode::OutChar => VmErrorKind::InsufficientOperands(token, err).throw(),
                _ => VmErrorKind::EmptyStack(token).throw(),
            },
            ContextError::InsufficientOperands | ContextError::DivisionByZero => {
                VmErrorKind::InsufficientOperands(token, err).throw()
            }
            ContextError::UnknownVariable => VmErrorKind::UnknownVariable(token).throw(),
        }
    }

    /// The text of the argument following `ip`
    fn argument(&self, ip: usize) -> Option<String> {
        self.program.argument(ip).map(|token| token.text.clone())
    }

    fn emit(&mut self, ip: usize, text: &str) -> Result<(), VmError> {
        if self.config.suppress_output {
            return Ok(());
        }
        match self.console.write_str(text) {
            Ok(()) => Ok(()),
            Err(err) => VmErrorKind::IOError(self.token(ip), err).throw(),
        }
    }

    /// Blocks until the console delivers a line `parse` accepts
    fn read<F>(&mut self, ip: usize, parse: F) -> Result<Value, VmError>
    where
        F: Fn(&str) -> Option<Value>,
    {
        loop {
            match self.console.read_line() {
                Ok(Some(line)) => {
                    if let Some(value) = parse(&line) {
                        return Ok(value);
                    }
                    warn!(line = self.token(ip).line, input = %line.trim_end(), "rejected input, retrying");
                }
                Ok(None) => {
                    let err = std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "the input was closed",
                    );
                    return VmErrorKind::IOError(self.token(ip), err).throw();
                }
                Err(err) => return VmErrorKind::IOError(self.token(ip), err).throw(),
            }
        }
    }

    fn stack(&mut self, ip: usize, op: Opcode) -> Result<Step, VmError> {
        let result = match op {
            Opcode::Push => {
                let value = self.argument(ip).and_then(|text| numeric_literal(&text));
                return match value {
                    Some(value) => {
                        self.context.push(value);
                        Ok(Step::SkipArgument)
                    }
                    None => VmErrorKind::NonNumeric(self.token(ip)).throw(),
                };
            }
            Opcode::Pop => self.context.pop().map(|_| ()),
            Opcode::Dup => self.context.dup(),
            Opcode::Clear => {
                self.context.clear();
                Ok(())
            }
            Opcode::Swap => self.context.swap(),
            _ => return VmErrorKind::UnknownInstruction(self.token(ip)).throw(),
        };
        self.check(ip, result)
    }

    fn arithmetic(&mut self, ip: usize, op: Opcode) -> Result<Step, VmError> {
        let result = match op {
            Opcode::Sum => self.context.sum(),
            Opcode::Sub => self.context.sub(),
            Opcode::Mult => self.context.mult(),
            Opcode::Div => self.context.div(),
            Opcode::Rem => self.context.rem(),
            Opcode::ToInt => self.context.to_int(),
            Opcode::Inc => self.context.inc(),
            Opcode::Dec => self.context.dec(),
            _ => return VmErrorKind::UnknownInstruction(self.token(ip)).throw(),
        };
        self.check(ip, result)
    }

    fn bitwise(&mut self, ip: usize, op: Opcode) -> Result<Step, VmError> {
        let result = match op {
            Opcode::And => self.context.and(),
            Opcode::Or => self.context.or(),
            Opcode::Not => self.context.not(),
            Opcode::Xor => self.context.xor(),
            Opcode::LeftShift => self.context.left_shift(),
            Opcode::RightShift => self.context.right_shift(),
            _ => return VmErrorKind::UnknownInstruction(self.token(ip)).throw(),
        };
        self.check(ip, result)
    }

    fn logic(&mut self, ip: usize, op: Opcode) -> Result<Step, VmError> {
        let condition = match op {
            Opcode::EndIf => return Ok(Step::Next),
            Opcode::IfEq => self.context.compare(Relation::Equal),
            Opcode::IfDif => self.context.compare(Relation::Different),
            Opcode::IfGr => self.context.compare(Relation::Greater),
            Opcode::IfLw => self.context.compare(Relation::Lower),
            Opcode::IfTrue => self.context.truth(1.0),
            Opcode::IfFalse => self.context.truth(0.0),
            _ => return VmErrorKind::UnknownInstruction(self.token(ip)).throw(),
        };
        let condition = match condition {
            Ok(condition) => condition,
            Err(err) => return self.check(ip, Err(err)),
        };
        if condition {
            return Ok(Step::Next);
        }
        match self.program.matching_endif(ip) {
            Some(endif) => Ok(Step::Jump(endif + 1)),
            None => {
                let report = BlockReport::unmatched_opener(self.token(ip).line);
                VmErrorKind::UnbalancedBlock(report).throw()
            }
        }
    }

    fn flow(&mut self, ip: usize, op: Opcode) -> Result<Step, VmError> {
        match op {
            Opcode::Goto => {
                let target = self
                    .argument(ip)
                    .and_then(|name| self.program.resolve_label(&name));
                match target {
                    Some(index) => Ok(Step::Jump(index + 1)),
                    None => VmErrorKind::UnknownLabel(self.token(ip)).throw(),
                }
            }
            Opcode::Label => match self.program.argument(ip) {
                Some(_) => Ok(Step::SkipArgument),
                None => VmErrorKind::UnknownLabel(self.token(ip)).throw(),
            },
            Opcode::Halt => Ok(Step::Halt),
            _ => VmErrorKind::UnknownInstruction(self.token(ip)).throw(),
        }
    }

    fn io(&mut self, ip: usize, op: Opcode) -> Result<Step, VmError> {
        match op {
            Opcode::Print | Opcode::PrintLine => {
                let text = self.argument(ip);
                let text = match text.as_deref().and_then(crate::lexer::unquote) {
                    Some(text) if op == Opcode::PrintLine => format!("{}\n", text),
                    Some(text) => text.to_string(),
                    None => return VmErrorKind::MalformedString(self.token(ip)).throw(),
                };
                self.emit(ip, &text)?;

                Ok(Step::SkipArgument)
            }
            Opcode::In => {
                let value = self.read(ip, |line| {
                    line.split_whitespace()
                        .next()
                        .and_then(|word| word.parse::<Value>().ok())
                })?;
                self.context.push(value);

                Ok(Step::Next)
            }
            Opcode::InChar => {
                let value = self.read(ip, |line| {
                    line.chars()
                        .find(|c| !c.is_whitespace())
                        .map(|c| c as u32 as Value)
                })?;
                self.context.push(value);

                Ok(Step::Next)
            }
            Opcode::Out | Opcode::OutInt | Opcode::OutChar => {
                let top = match self.context.top() {
                    Some(top) => top,
                    None => return self.check(ip, Err(ContextError::EmptyStack)),
                };
                let text = match op {
                    Opcode::Out => format!("{:.3}", top),
                    Opcode::OutInt => format!("{}", top as i32),
                    _ => char::from_u32(top as i32 as u32)
                        .unwrap_or(char::REPLACEMENT_CHARACTER)
                        .to_string(),
                };
                self.emit(ip, &text)?;

                Ok(Step::Next)
            }
            Opcode::ScreenClear => {
                if !self.config.suppress_output {
                    if let Err(err) = self.console.clear_screen() {
                        return VmErrorKind::IOError(self.token(ip), err).throw();
                    }
                }

                Ok(Step::Next)
            }
            Opcode::Stack => {
                let text = render_stack(self.context.stack());
                self.emit(ip, &text)?;

                Ok(Step::Next)
            }
            _ => VmErrorKind::UnknownInstruction(self.token(ip)).throw(),
        }
    }

    fn variable(&mut self, ip: usize, op: Opcode) -> Result<Step, VmError> {
        if op == Opcode::VarClear {
            self.context.clear_vars();
            return Ok(Step::Next);
        }
        let name = match self.argument(ip) {
            Some(name) => name,
            None => return VmErrorKind::UnknownVariable(self.token(ip)).throw(),
        };
        let result = match op {
            Opcode::Var => {
                self.context.declare_var(&name);
                Ok(())
            }
            Opcode::Del => self.context.delete_var(&name),
            Opcode::Store => self.context.store_var(&name),
            Opcode::PopStore => self.context.pop_store_var(&name),
            Opcode::Load => self.context.load_var(&name),
            _ => return VmErrorKind::UnknownInstruction(self.token(ip)).throw(),
        };
        self.check(ip, result).map(|_| Step::SkipArgument)
    }

    fn math(&mut self, ip: usize, op: Opcode) -> Result<Step, VmError> {
        let result = match op {
            Opcode::Abs => self.context.abs(),
            Opcode::Pow => self.context.pow(),
            Opcode::Ln => self.context.ln(),
            Opcode::Log => self.context.log(),
            Opcode::LogTwo => self.context.log_two(),
            Opcode::Ceil => self.context.ceil(),
            Opcode::Sqrt => self.context.sqrt(),
            Opcode::Sin => self.context.sin(),
            Opcode::Cos => self.context.cos(),
            Opcode::Tan => self.context.tan(),
            _ => return VmErrorKind::UnknownInstruction(self.token(ip)).throw(),
        };
        self.check(ip, result)
    }

    fn misc(&mut self, ip: usize, op: Opcode) -> Result<Step, VmError> {
        match op {
            Opcode::RandInt => {
                let upper = self
                    .argument(ip)
                    .and_then(|text| numeric_literal(&text))
                    .map(|value| value as i32);
                match upper {
                    Some(upper) if upper >= 1 => {
                        let value = self.random.randint(upper);
                        self.context.push(value as Value);

                        Ok(Step::SkipArgument)
                    }
                    _ => VmErrorKind::NonNumeric(self.token(ip)).throw(),
                }
            }
            _ => VmErrorKind::UnknownInstruction(self.token(ip)).throw(),
        }
    }

    /// Executes the instruction at `ip` and moves the instruction pointer on
    ///
    /// `ip` - index of the token to execute
    pub fn exec(&mut self, ip: usize) -> Result<(), VmError> {
        let op = self.program.op(ip).unwrap_or(Opcode::Halt);
        if self.config.debug {
            let token = self.token(ip);
            trace!(
                ip,
                line = token.line,
                token = %token.text,
                stack = ?self.context.stack(),
                "exec"
            );
        }
        let step = match op.group() {
            OpGroup::Stack => self.stack(ip, op),
            OpGroup::Arithmetic => self.arithmetic(ip, op),
            OpGroup::Bitwise => self.bitwise(ip, op),
            OpGroup::Logic => self.logic(ip, op),
            OpGroup::Flow => self.flow(ip, op),
            OpGroup::IO => self.io(ip, op),
            OpGroup::Variable => self.variable(ip, op),
            OpGroup::Math => self.math(ip, op),
            OpGroup::Misc => self.misc(ip, op),
        }?;

        match step {
            Step::Next => self.instruction_pointer = ip + 1,
            Step::SkipArgument => self.instruction_pointer = ip + 2,
            Step::Jump(target) => self.instruction_pointer = target,
            Step::Halt => self.done = true,
        }

        Ok(())
    }
}

/// `|bottom|...|top|<-top` with every value printed to three decimals
fn render_stack(stack: &[Value]) -> String {
    if stack.is_empty() {
        return "\nEMPTY\n".to_string();
    }
    let cells: String = stack.iter().map(|value| format!("{:.3}|", value)).collect();
    format!("\n|{}<-top\n", cells)
}
