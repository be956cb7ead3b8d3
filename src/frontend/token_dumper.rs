use crate::builtin::Builtin;
use crate::lang::value::Value;
use crate::lexer::Spanned;
use std::io::{self, Write};

pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints the value the way the stacks render it
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, tokens: &[Spanned]) -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.dump_to(tokens, &mut out)
    }

    pub fn dump_to<W: Write>(&self, tokens: &[Spanned], out: &mut W) -> io::Result<()> {
        for s in tokens {
            self.write_one(s, out)?;
        }
        Ok(())
    }

    fn write_one<W: Write>(&self, s: &Spanned, out: &mut W) -> io::Result<()> {
        let line = s.span.line;
        let col = s.span.col;

        let kind = self.kind(&s.value);
        let colr = if self.color { self.color(&s.value) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        if self.show_debug_repr {
            writeln!(
                out,
                "[{:02}:{:02}] {}{:<8} {:?}{}",
                line, col, colr, kind, s.value, reset
            )
        } else {
            writeln!(
                out,
                "[{:02}:{:02}] {}{:<8} {}{}",
                line, col, colr, kind, s.value, reset
            )
        }
    }

    fn kind(&self, v: &Value) -> &'static str {
        match v {
            Value::Number(_) => "NUMBER",
            Value::Char(_) => "CHAR",
            Value::Text(_) => "TEXT",
            Value::Word(w) => match Builtin::from_word(w) {
                Some(Builtin::BeginBlock | Builtin::EndBlock) => "BLOCK",
                Some(Builtin::BeginList | Builtin::EndList) => "LIST",
                Some(Builtin::Separator) => "SEP",
                Some(_) => "BUILTIN",
                None => "WORD",
            },
            // not produced by the lexer
            _ => "VALUE",
        }
    }

    fn color(&self, v: &Value) -> &'static str {
        match v {
            Value::Char(_) | Value::Text(_) => Self::GRN,
            Value::Number(_) => Self::CYN,
            Value::Word(w) => match Builtin::from_word(w) {
                Some(Builtin::Separator) => Self::DIM,
                Some(Builtin::BeginBlock | Builtin::EndBlock)
                | Some(Builtin::BeginList | Builtin::EndList) => Self::MAG,
                Some(_) => Self::RESET,
                None => Self::YEL,
            },
            _ => Self::RESET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use pretty_assertions::assert_eq;

    fn dump(dumper: TokenDumper, source: &str) -> String {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let mut out = Vec::new();
        dumper.dump_to(&tokens, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_pretty_plain() {
        let text = dump(TokenDumper::new().no_color().pretty(), "myf call ,\n( + 1 'h' )");
        assert_eq!(
            text,
            "[01:01] WORD     myf\n\
             [01:05] BUILTIN  call\n\
             [01:10] SEP      ,\n\
             [02:01] BLOCK    (\n\
             [02:03] BUILTIN  +\n\
             [02:05] NUMBER   1.0\n\
             [02:07] CHAR     'h'\n\
             [02:11] BLOCK    )\n"
        );
    }

    #[test]
    fn test_debug_repr() {
        let text = dump(TokenDumper::new().no_color(), "[ \"hi\" ]");
        assert_eq!(
            text,
            "[01:01] LIST     Word(\"[\")\n\
             [01:03] TEXT     Text(\"hi\")\n\
             [01:08] LIST     Word(\"]\")\n"
        );
    }

    #[test]
    fn test_color_codes() {
        let text = dump(TokenDumper::new(), "x");
        assert_eq!(text, "[01:01] \x1b[33mWORD     Word(\"x\")\x1b[0m\n");
    }
}
