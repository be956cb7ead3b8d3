use crate::lang::value::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub value: Value,
    pub span: Span,
}

/// Lexing failure. `line` and `col` are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("{line}:{col}: invalid character: {{{ch}}} code:{code}")]
    InvalidCharacter {
        ch: char,
        code: u32,
        line: usize,
        col: usize,
    },

    #[error("{line}:{col}: unterminated {kind} literal")]
    Unterminated {
        kind: &'static str,
        line: usize,
        col: usize,
    },
}

/// Characters that lex as one-character words.
const SINGLE_CHAR_WORDS: &str = "()[],+-*/";

/// Turns source text into a lazy, finite sequence of tokens.
///
/// The sequence is not restartable; build a new lexer to scan again.
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Current character. A NUL byte ends the input.
    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied().filter(|&ch| ch != '\0')
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        ch
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if matches!(ch, ' ' | '\t' | '\n' | '\r') {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// `#` through end of line, leaving the line break in place.
    fn skip_comment(&mut self) {
        while let Some(ch) = self.current() {
            if ch == '\n' || ch == '\r' {
                break;
            }
            self.advance();
        }
    }

    /// Scan up to the closing `quote`. No escape processing.
    fn read_quoted(&mut self, quote: char, kind: &'static str) -> Result<String, LexError> {
        let start = self.span();
        self.advance();

        let mut text = String::new();
        loop {
            match self.advance() {
                Some(ch) if ch == quote => return Ok(text),
                Some(ch) => text.push(ch),
                None => {
                    return Err(LexError::Unterminated {
                        kind,
                        line: start.line,
                        col: start.col,
                    });
                }
            }
        }
    }

    /// A run of ASCII digits. A `.` is never consumed here.
    fn read_number(&mut self) -> Value {
        let mut digits = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        // A run of ASCII digits always parses as f64.
        Value::Number(digits.parse().unwrap_or(0.0))
    }

    fn read_word(&mut self) -> Value {
        let mut word = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_alphabetic() {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        Value::Word(word)
    }

    /// Scan the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Spanned>, LexError> {
        loop {
            self.skip_whitespace();
            let span = self.span();

            let value = match self.current() {
                None => return Ok(None),
                Some('#') => {
                    self.skip_comment();
                    continue;
                }
                Some(ch) if SINGLE_CHAR_WORDS.contains(ch) => {
                    self.advance();
                    Value::Word(ch.to_string())
                }
                Some('"') => Value::Text(self.read_quoted('"', "text")?),
                Some('\'') => Value::Char(self.read_quoted('\'', "char")?),
                Some(ch) if ch.is_ascii_digit() => self.read_number(),
                Some(ch) if ch.is_ascii_alphabetic() => self.read_word(),
                Some(ch) => {
                    return Err(LexError::InvalidCharacter {
                        ch,
                        code: ch as u32,
                        line: span.line,
                        col: span.col,
                    });
                }
            };

            return Ok(Some(Spanned { value, span }));
        }
    }

    /// Scan the whole input.
    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, LexError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

impl Iterator for Lexer {
    type Item = Result<Spanned, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(source: &str) -> Vec<Value> {
        let mut lexer = Lexer::new(source);
        lexer
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.value)
            .collect()
    }

    fn word(w: &str) -> Value {
        Value::word(w)
    }

    #[test]
    fn test_arithmetic() {
        let t = tokens(" + 100 101 ");
        assert_eq!(
            t,
            vec![word("+"), Value::Number(100.0), Value::Number(101.0)]
        );
    }

    #[test]
    fn test_single_char_words() {
        let t = tokens("()[],+-*/");
        let expected: Vec<Value> = "()[],+-*/".chars().map(|c| word(&c.to_string())).collect();
        assert_eq!(t, expected);
    }

    #[test]
    fn test_punctuation_splits_words() {
        let t = tokens("ptrinc, ptrminus )");
        assert_eq!(t, vec![word("ptrinc"), word(","), word("ptrminus"), word(")")]);

        let t = tokens("range 1000,");
        assert_eq!(t, vec![word("range"), Value::Number(1000.0), word(",")]);
    }

    #[test]
    fn test_block() {
        let t = tokens("lambda (+ 1 1)");
        assert_eq!(
            t,
            vec![
                word("lambda"),
                word("("),
                word("+"),
                Value::Number(1.0),
                Value::Number(1.0),
                word(")")
            ]
        );
    }

    #[test]
    fn test_char_and_text() {
        let t = tokens(r#"'h' "hello world" ptrset"#);
        assert_eq!(
            t,
            vec![
                Value::Char("h".to_string()),
                Value::Text("hello world".to_string()),
                word("ptrset")
            ]
        );
    }

    #[test]
    fn test_no_escape_processing() {
        let t = tokens(r#""a\nb""#);
        assert_eq!(t, vec![Value::Text("a\\nb".to_string())]);
    }

    #[test]
    fn test_comments() {
        let t = tokens("# adds two numbers\n+ 1 2 # trailing\n\r\ndup");
        assert_eq!(
            t,
            vec![
                word("+"),
                Value::Number(1.0),
                Value::Number(2.0),
                word("dup")
            ]
        );
    }

    #[test]
    fn test_comment_at_end_of_input() {
        assert_eq!(tokens("1 # no newline"), vec![Value::Number(1.0)]);
    }

    #[test]
    fn test_decimal_point_is_not_a_number() {
        let mut lexer = Lexer::new("3.5");
        assert_eq!(lexer.next().unwrap().unwrap().value, Value::Number(3.0));
        assert_eq!(
            lexer.next().unwrap(),
            Err(LexError::InvalidCharacter {
                ch: '.',
                code: 46,
                line: 1,
                col: 2
            })
        );
    }

    #[test]
    fn test_digits_then_letters() {
        let t = tokens("10x");
        assert_eq!(t, vec![Value::Number(10.0), word("x")]);
    }

    #[test]
    fn test_invalid_character() {
        let err = Lexer::new("+ 1\n  @").tokenize().unwrap_err();
        assert_eq!(
            err,
            LexError::InvalidCharacter {
                ch: '@',
                code: 64,
                line: 2,
                col: 3
            }
        );
        assert_eq!(err.to_string(), "2:3: invalid character: {@} code:64");
    }

    #[test]
    fn test_unterminated_text() {
        let err = Lexer::new(" \"abc").tokenize().unwrap_err();
        assert_eq!(
            err,
            LexError::Unterminated {
                kind: "text",
                line: 1,
                col: 2
            }
        );
    }

    #[test]
    fn test_nul_ends_input() {
        assert_eq!(tokens("1 2\0 @@@"), vec![Value::Number(1.0), Value::Number(2.0)]);
    }

    #[test]
    fn test_spans() {
        let spans: Vec<Span> = Lexer::new("dup\n  swap")
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.span)
            .collect();
        assert_eq!(
            spans,
            vec![Span { line: 1, col: 1 }, Span { line: 2, col: 3 }]
        );
    }

    #[test]
    fn test_lazy_iteration_stops() {
        let mut lexer = Lexer::new("a");
        assert!(lexer.next().is_some());
        assert!(lexer.next().is_none());
        assert!(lexer.next().is_none());
    }
}
