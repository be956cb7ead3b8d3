/// Builtin words of the language.
///
/// Programs execute right to left, so the glyphs that open a block or a list
/// in execution order are the *closing* glyphs in source text: `)` begins a
/// block capture and `(` ends it, `]` begins a list and `[` ends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    // control
    Exit,
    Quit,
    Separator,
    Identity,

    // literals
    True,
    False,

    // arithmetic ( a b -- a op b ), `a` being the top of the stack
    Add,
    Sub,
    Mul,
    Div,
    Inc,
    Dec,
    Mod,
    NoRem,

    // comparison and logic
    Eql,
    Or,

    // stack
    Dup,
    Pop,
    Swap,
    SumStack,
    Sum,

    // blocks and functions
    BeginBlock,
    EndBlock,
    Func,
    Call,
    CallSav,
    Lambda,
    LambdaSav,
    If,
    IfStk,
    Loop,
    CallStk,

    // lists
    Range,
    BeginList,
    EndList,

    // memory
    PtrInc,
    PtrDec,
    Ptr,
    PtrVal,
    PtrLoad,
    PtrSet,
    PtrSetStk,
    PtrPlus,
    PtrMinus,
    PtrPutc,
    PtrWhile,
    PtrDebug,

    // diagnostics
    VerboseDebug,
    DumpData,
    DumpCode,
}

impl Builtin {
    /// Resolve a word to a builtin.
    ///
    /// Most builtins are case-sensitive; the words listed in
    /// [`Builtin::ignores_case`] also match in any letter case.
    pub fn from_word(word: &str) -> Option<Builtin> {
        if let Some(builtin) = Self::exact(word) {
            return Some(builtin);
        }
        Self::exact(&word.to_ascii_lowercase()).filter(|b| b.ignores_case())
    }

    fn exact(word: &str) -> Option<Builtin> {
        use Builtin::*;
        let builtin = match word {
            "exit" => Exit,
            "quit" => Quit,
            "," => Separator,
            "id" => Identity,
            "true" => True,
            "false" => False,
            "+" => Add,
            "-" => Sub,
            "*" => Mul,
            "/" => Div,
            "inc" => Inc,
            "dec" => Dec,
            "mod" => Mod,
            "norem" => NoRem,
            "eql" => Eql,
            "or" => Or,
            "dup" => Dup,
            "pop" => Pop,
            "swap" => Swap,
            "sumstk" => SumStack,
            "sum" => Sum,
            ")" => BeginBlock,
            "(" => EndBlock,
            "func" => Func,
            "call" => Call,
            "callsav" => CallSav,
            "lambda" => Lambda,
            "lambdasav" => LambdaSav,
            "if" => If,
            "ifstk" => IfStk,
            "loop" => Loop,
            "callstk" => CallStk,
            "range" => Range,
            "]" => BeginList,
            "[" => EndList,
            "ptrinc" => PtrInc,
            "ptrdec" => PtrDec,
            "ptr" => Ptr,
            "ptrval" => PtrVal,
            "ptrload" => PtrLoad,
            "ptrset" => PtrSet,
            "ptrsetstk" => PtrSetStk,
            "ptrplus" => PtrPlus,
            "ptrminus" => PtrMinus,
            "ptrputc" => PtrPutc,
            "ptrwhile" => PtrWhile,
            "ptrdebug" => PtrDebug,
            "verbosedebug" => VerboseDebug,
            "data" => DumpData,
            "code" => DumpCode,
            _ => return None,
        };
        Some(builtin)
    }

    pub fn ignores_case(self) -> bool {
        use Builtin::*;
        matches!(
            self,
            Exit | Quit
                | True
                | False
                | Dup
                | Pop
                | Swap
                | SumStack
                | Sum
                | Loop
                | PtrInc
                | PtrDec
                | Ptr
                | PtrVal
                | PtrLoad
                | PtrSet
                | PtrSetStk
                | PtrPlus
                | PtrMinus
                | PtrPutc
                | DumpData
                | DumpCode
        )
    }

    /// Canonical spelling.
    pub fn name(self) -> &'static str {
        use Builtin::*;
        match self {
            Exit => "exit",
            Quit => "quit",
            Separator => ",",
            Identity => "id",
            True => "true",
            False => "false",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Inc => "inc",
            Dec => "dec",
            Mod => "mod",
            NoRem => "norem",
            Eql => "eql",
            Or => "or",
            Dup => "dup",
            Pop => "pop",
            Swap => "swap",
            SumStack => "sumstk",
            Sum => "sum",
            BeginBlock => ")",
            EndBlock => "(",
            Func => "func",
            Call => "call",
            CallSav => "callsav",
            Lambda => "lambda",
            LambdaSav => "lambdasav",
            If => "if",
            IfStk => "ifstk",
            Loop => "loop",
            CallStk => "callstk",
            Range => "range",
            BeginList => "]",
            EndList => "[",
            PtrInc => "ptrinc",
            PtrDec => "ptrdec",
            Ptr => "ptr",
            PtrVal => "ptrval",
            PtrLoad => "ptrload",
            PtrSet => "ptrset",
            PtrSetStk => "ptrsetstk",
            PtrPlus => "ptrplus",
            PtrMinus => "ptrminus",
            PtrPutc => "ptrputc",
            PtrWhile => "ptrwhile",
            PtrDebug => "ptrdebug",
            VerboseDebug => "verbosedebug",
            DumpData => "data",
            DumpCode => "code",
        }
    }
}

impl std::fmt::Display for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
