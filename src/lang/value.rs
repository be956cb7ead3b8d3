use serde::{Deserialize, Serialize};

/// Identifier of a captured block in the function registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u64);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Runtime value in the Octane language.
///
/// Values live on both stacks: the lexer produces `Number`, `Char`, `Text`
/// and `Word` tokens for the code stack, the interpreter produces the rest
/// on the data stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// The only numeric type. Literals are integer-looking but stored as f64.
    Number(f64),

    Bool(bool),

    /// Single-quoted literal: `'h'`.
    Char(String),

    /// Double-quoted literal: `"hello"`.
    Text(String),

    /// Finished list literal: `[ 1 2 3 ]`.
    List(Vec<Value>),

    /// Bare symbol. Builtins are words; so are function names.
    Word(String),

    /// Memory pointer index, as pushed by `ptr`.
    Address(i64),

    /// Reference to a closed block, as pushed when `( ... )` finishes capture.
    Block(BlockId),
}

impl Value {
    pub fn word(text: &str) -> Self {
        Value::Word(text.to_string())
    }

    pub fn as_word(&self) -> Option<&str> {
        match self {
            Value::Word(w) => Some(w),
            _ => None,
        }
    }

    /// Equality as `eql` sees it. Numbers compare by bit pattern, so every
    /// NaN equals every other NaN and `0.0` differs from `-0.0`.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => number_bits(*a) == number_bits(*b),
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_value(y))
            }
            _ => self == other,
        }
    }

    /// Variant name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::Bool(_) => "Bool",
            Value::Char(_) => "Char",
            Value::Text(_) => "Text",
            Value::List(_) => "List",
            Value::Word(_) => "Word",
            Value::Address(_) => "Address",
            Value::Block(_) => "Block",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Char(c) => write!(f, "'{}'", c),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::List(items) => {
                write!(f, "#<[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]>")
            }
            Value::Word(w) => write!(f, "{}", w),
            Value::Address(a) => write!(f, "{}", a),
            Value::Block(id) => write!(f, "#<block {}>", id),
        }
    }
}

fn number_bits(n: f64) -> u64 {
    if n.is_nan() { f64::NAN.to_bits() } else { n.to_bits() }
}

/// Render a number the way the language always has: `2.0`, `-5.0`, `1.0E7`.
///
/// Plain decimal notation for magnitudes in `[1e-3, 1e7)`, scientific
/// notation with an upper-case `E` otherwise. Integral values always keep a
/// trailing `.0`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let magnitude = n.abs();
    if (1e-3..1e7).contains(&magnitude) {
        let s = n.to_string();
        if s.contains('.') { s } else { format!("{}.0", s) }
    } else {
        let s = format!("{:e}", n);
        match s.split_once('e') {
            Some((mantissa, exponent)) if mantissa.contains('.') => {
                format!("{}E{}", mantissa, exponent)
            }
            Some((mantissa, exponent)) => format!("{}.0E{}", mantissa, exponent),
            None => s,
        }
    }
}
