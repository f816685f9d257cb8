use crate::lexer::Token;
use std::collections::HashMap;
use std::fmt::Display;

pub const COMMENT_OPEN: &str = "-->";
pub const COMMENT_CLOSE: &str = "<--";

/// Instruction families, the dispatcher hands each family to its own handler
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum OpGroup {
    Stack,
    Arithmetic,
    Bitwise,
    Logic,
    Flow,
    IO,
    Variable,
    Math,
    Misc,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Opcode {
    Push,
    Pop,
    Dup,
    Clear,
    Swap,
    Sum,
    Sub,
    Mult,
    Div,
    Rem,
    ToInt,
    Inc,
    Dec,
    And,
    Or,
    Not,
    Xor,
    LeftShift,
    RightShift,
    IfEq,
    IfDif,
    IfGr,
    IfLw,
    IfTrue,
    IfFalse,
    EndIf,
    Goto,
    Label,
    Print,
    PrintLine,
    In,
    InChar,
    Out,
    OutInt,
    OutChar,
    ScreenClear,
    Var,
    Del,
    Store,
    PopStore,
    Load,
    VarClear,
    Stack,
    Halt,
    RandInt,
    Abs,
    Pow,
    Ln,
    Log,
    LogTwo,
    Ceil,
    Sqrt,
    Sin,
    Cos,
    Tan,
    /// Token text that names no instruction. Harmless unless executed.
    Unknown,
}

const OPCODES: [(&str, Opcode); 55] = [
    ("push", Opcode::Push),
    ("pop", Opcode::Pop),
    ("dup", Opcode::Dup),
    ("clear", Opcode::Clear),
    ("swap", Opcode::Swap),
    ("sum", Opcode::Sum),
    ("sub", Opcode::Sub),
    ("mult", Opcode::Mult),
    ("div", Opcode::Div),
    ("rem", Opcode::Rem),
    ("toint", Opcode::ToInt),
    ("inc", Opcode::Inc),
    ("dec", Opcode::Dec),
    ("and", Opcode::And),
    ("or", Opcode::Or),
    ("not", Opcode::Not),
    ("xor", Opcode::Xor),
    ("lshift", Opcode::LeftShift),
    ("rshift", Opcode::RightShift),
    ("ifeq", Opcode::IfEq),
    ("ifdif", Opcode::IfDif),
    ("ifgr", Opcode::IfGr),
    ("iflw", Opcode::IfLw),
    ("iftrue", Opcode::IfTrue),
    ("iffalse", Opcode::IfFalse),
    ("endif", Opcode::EndIf),
    ("goto", Opcode::Goto),
    ("label", Opcode::Label),
    ("print", Opcode::Print),
    ("printnl", Opcode::PrintLine),
    ("in", Opcode::In),
    ("inchar", Opcode::InChar),
    ("out", Opcode::Out),
    ("outint", Opcode::OutInt),
    ("outchar", Opcode::OutChar),
    ("sclear", Opcode::ScreenClear),
    ("var", Opcode::Var),
    ("del", Opcode::Del),
    ("store", Opcode::Store),
    ("pstore", Opcode::PopStore),
    ("load", Opcode::Load),
    ("vclear", Opcode::VarClear),
    ("stack", Opcode::Stack),
    ("halt", Opcode::Halt),
    ("randint", Opcode::RandInt),
    ("abs", Opcode::Abs),
    ("pow", Opcode::Pow),
    ("ln", Opcode::Ln),
    ("log", Opcode::Log),
    ("logtwo", Opcode::LogTwo),
    ("ceil", Opcode::Ceil),
    ("sqrt", Opcode::Sqrt),
    ("sin", Opcode::Sin),
    ("cos", Opcode::Cos),
    ("tan", Opcode::Tan),
];

impl Opcode {
    pub fn decode(text: &str) -> Opcode {
        OPCODES
            .iter()
            .find(|(name, _)| *name == text)
            .map_or(Opcode::Unknown, |(_, op)| *op)
    }

    pub fn name(&self) -> &'static str {
        OPCODES
            .iter()
            .find(|(_, op)| op == self)
            .map_or("<unknown>", |(name, _)| *name)
    }

    pub fn group(&self) -> OpGroup {
        match self {
            Opcode::Push | Opcode::Pop | Opcode::Dup | Opcode::Clear | Opcode::Swap => {
                OpGroup::Stack
            }
            Opcode::Sum
            | Opcode::Sub
            | Opcode::Mult
            | Opcode::Div
            | Opcode::Rem
            | Opcode::ToInt
            | Opcode::Inc
            | Opcode::Dec => OpGroup::Arithmetic,
            Opcode::And
            | Opcode::Or
            | Opcode::Not
            | Opcode::Xor
            | Opcode::LeftShift
            | Opcode::RightShift => OpGroup::Bitwise,
            Opcode::IfEq
            | Opcode::IfDif
            | Opcode::IfGr
            | Opcode::IfLw
            | Opcode::IfTrue
            | Opcode::IfFalse
            | Opcode::EndIf => OpGroup::Logic,
            Opcode::Goto | Opcode::Label | Opcode::Halt => OpGroup::Flow,
            Opcode::Print
            | Opcode::PrintLine
            | Opcode::In
            | Opcode::InChar
            | Opcode::Out
            | Opcode::OutInt
            | Opcode::OutChar
            | Opcode::ScreenClear
            | Opcode::Stack => OpGroup::IO,
            Opcode::Var
            | Opcode::Del
            | Opcode::Store
            | Opcode::PopStore
            | Opcode::Load
            | Opcode::VarClear => OpGroup::Variable,
            Opcode::Abs
            | Opcode::Pow
            | Opcode::Ln
            | Opcode::Log
            | Opcode::LogTwo
            | Opcode::Ceil
            | Opcode::Sqrt
            | Opcode::Sin
            | Opcode::Cos
            | Opcode::Tan => OpGroup::Math,
            Opcode::RandInt | Opcode::Unknown => OpGroup::Misc,
        }
    }

    /// Whether the instruction consumes the token following it
    pub fn takes_argument(&self) -> bool {
        matches!(
            self,
            Opcode::Push
                | Opcode::Goto
                | Opcode::Label
                | Opcode::Print
                | Opcode::PrintLine
                | Opcode::Var
                | Opcode::Del
                | Opcode::Store
                | Opcode::PopStore
                | Opcode::Load
                | Opcode::RandInt
        )
    }

    pub fn opens_block(&self) -> bool {
        matches!(
            self,
            Opcode::IfEq
                | Opcode::IfDif
                | Opcode::IfGr
                | Opcode::IfLw
                | Opcode::IfTrue
                | Opcode::IfFalse
        )
    }

    pub fn closes_block(&self) -> bool {
        *self == Opcode::EndIf
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

/// The validated, immutable token sequence a `Vm` runs.
///
/// Every token is decoded to an `Opcode` once, argument tokens included, so control flow can
/// keep scanning the raw sequence the way the language defines it. A synthetic `halt` always
/// terminates the sequence.
#[derive(Debug, Clone)]
pub struct Program {
    tokens: Vec<Token>,
    ops: Vec<Opcode>,
    labels: HashMap<String, usize>,
    source_len: usize,
}

impl Program {
    /// Copies tokens into a program, dropping comment regions. An unterminated comment swallows
    /// everything after its opening marker. A stray close marker is dropped as well.
    pub fn new<I>(tokens: I) -> Program
    where
        I: IntoIterator<Item = Token>,
    {
        let mut kept: Vec<Token> = vec![];
        let mut comment = false;
        for token in tokens {
            if token.text == COMMENT_OPEN {
                comment = true;
            }
            if token.text == COMMENT_CLOSE {
                comment = false;
                continue;
            }
            if !comment {
                kept.push(token);
            }
        }

        let source_len = kept.len();
        let halt_line = kept.last().map_or(1, |token| token.line);
        kept.push(Token::new(Opcode::Halt.name(), halt_line));

        let ops: Vec<Opcode> = kept.iter().map(|token| Opcode::decode(&token.text)).collect();
        let labels = Program::collect_labels(&kept, &ops, source_len);

        Program {
            tokens: kept,
            ops,
            labels,
            source_len,
        }
    }

    /// First declaration wins, exactly as a scan in ascending order would resolve it
    fn collect_labels(tokens: &[Token], ops: &[Opcode], source_len: usize) -> HashMap<String, usize> {
        let mut labels = HashMap::new();
        for i in 0..source_len.saturating_sub(1) {
            if ops[i] == Opcode::Label {
                labels.entry(tokens[i + 1].text.clone()).or_insert(i + 1);
            }
        }
        labels
    }

    /// Number of tokens including the synthetic `halt`
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source_len == 0
    }

    /// Number of tokens that came from the source
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn op(&self, index: usize) -> Option<Opcode> {
        self.ops.get(index).copied()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn ops(&self) -> &[Opcode] {
        &self.ops
    }

    pub(crate) fn labels(&self) -> &HashMap<String, usize> {
        &self.labels
    }

    /// The argument token of the instruction at `index`. The synthetic `halt` never serves as one.
    pub fn argument(&self, index: usize) -> Option<&Token> {
        if index + 1 < self.source_len {
            return self.tokens.get(index + 1);
        }
        None
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (token, op)) in self.tokens.iter().zip(&self.ops).enumerate() {
            writeln!(f, "{:>6} {:>5}  {:<10} {}", i, token.line, op, token.text)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{OpGroup, Opcode, Program, OPCODES};
    use crate::lexer::Lexer;

    fn program(source: &str) -> Program {
        Program::new(Lexer::from_text(source).produce_tokens())
    }

    fn texts(program: &Program) -> Vec<&str> {
        program.tokens().iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn decode_every_name() {
        for (name, op) in OPCODES.iter() {
            assert_eq!(Opcode::decode(name), *op);
            assert_eq!(op.name(), *name);
        }
        assert_eq!(Opcode::decode("PUSH"), Opcode::Unknown);
        assert_eq!(Opcode::decode("\"push\""), Opcode::Unknown);
    }

    #[test]
    fn groups() {
        assert_eq!(Opcode::Swap.group(), OpGroup::Stack);
        assert_eq!(Opcode::ToInt.group(), OpGroup::Arithmetic);
        assert_eq!(Opcode::RightShift.group(), OpGroup::Bitwise);
        assert_eq!(Opcode::EndIf.group(), OpGroup::Logic);
        assert_eq!(Opcode::Stack.group(), OpGroup::IO);
        assert_eq!(Opcode::VarClear.group(), OpGroup::Variable);
        assert_eq!(Opcode::Pow.group(), OpGroup::Math);
        assert!(Opcode::IfTrue.opens_block());
        assert!(!Opcode::EndIf.opens_block());
        assert!(Opcode::EndIf.closes_block());
    }

    #[test]
    fn appends_halt() {
        let program = program("push 1");
        assert_eq!(texts(&program), vec!["push", "1", "halt"]);
        assert_eq!(program.source_len(), 2);
        assert_eq!(program.op(2), Some(Opcode::Halt));
        assert_eq!(program.token(2).map(|t| t.line), Some(1));
    }

    #[test]
    fn empty_program_is_only_halt() {
        let program = program("");
        assert!(program.is_empty());
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn strips_comments() {
        let program = program("push 1 --> push 2\n push 3 <-- push 4");
        assert_eq!(texts(&program), vec!["push", "1", "push", "4", "halt"]);
        assert_eq!(program.token(2).map(|t| t.line), Some(2));
    }

    #[test]
    fn unterminated_comment_swallows_rest() {
        let program = program("push 1 --> push 2 pop");
        assert_eq!(texts(&program), vec!["push", "1", "halt"]);
    }

    #[test]
    fn stray_comment_close_is_dropped() {
        let program = program("pop <-- dup");
        assert_eq!(texts(&program), vec!["pop", "dup", "halt"]);
    }

    #[test]
    fn argument_never_is_synthetic_halt() {
        let program = program("pop push");
        assert!(program.argument(1).is_none());
        assert_eq!(program.argument(0).map(|t| t.text.as_str()), Some("push"));
    }

    #[test]
    fn first_label_declaration_wins() {
        let program = program("label a pop label a dup label b");
        assert_eq!(program.labels().get("a"), Some(&1));
        assert_eq!(program.labels().get("b"), Some(&7));
    }

    #[test]
    fn label_without_name_is_ignored() {
        let program = program("pop label");
        assert!(program.labels().is_empty());
    }

    #[test]
    fn listing() {
        let listing = program("push 1").to_string();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("push"));
        assert!(lines[2].contains("halt"));
    }
}
