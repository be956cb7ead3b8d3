use crate::builtin::Builtin;
use crate::lang::value::{BlockId, Value};
use crate::runtime_error::{ErrorKind, RuntimeError, StackKind};

type Result<T> = std::result::Result<T, RuntimeError>;

/// LIFO stack of values that knows which of the two stacks it is, so that
/// underflow and type errors name it.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    kind: StackKind,
    items: Vec<Value>,
}

pub(crate) fn mismatch(op: Builtin, expected: &'static str, found: &Value) -> RuntimeError {
    RuntimeError::new(ErrorKind::TypeMismatch {
        op: op.name().to_string(),
        expected,
        found: format!("{} {}", found.type_name(), found),
    })
}

impl Stack {
    /// A code stack. `tokens` are in source order; the last one pops first.
    pub fn code(tokens: Vec<Value>) -> Self {
        Stack {
            kind: StackKind::Code,
            items: tokens,
        }
    }

    pub fn data() -> Self {
        Self::data_with(Vec::new())
    }

    pub fn data_with(items: Vec<Value>) -> Self {
        Stack {
            kind: StackKind::Data,
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Bottom first.
    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }

    pub fn iter_top_first(&self) -> impl Iterator<Item = &Value> {
        self.items.iter().rev()
    }

    pub fn top(&self) -> Option<&Value> {
        self.items.last()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn push(&mut self, value: Value) {
        self.items.push(value);
    }

    /// Pop without an error; the interpreter loop uses this to detect the end.
    pub fn next(&mut self) -> Option<Value> {
        self.items.pop()
    }

    pub fn pop(&mut self, op: Builtin) -> Result<Value> {
        self.items.pop().ok_or_else(|| self.underflow(op))
    }

    pub fn peek(&self, op: Builtin) -> Result<&Value> {
        self.items.last().ok_or_else(|| self.underflow(op))
    }

    fn underflow(&self, op: Builtin) -> RuntimeError {
        RuntimeError::new(ErrorKind::EmptyStack {
            stack: self.kind,
            op: op.name().to_string(),
        })
    }

    pub fn pop_number(&mut self, op: Builtin) -> Result<f64> {
        match self.pop(op)? {
            Value::Number(n) => Ok(n),
            other => Err(mismatch(op, "Number", &other)),
        }
    }

    pub fn pop_bool(&mut self, op: Builtin) -> Result<bool> {
        match self.pop(op)? {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch(op, "Bool", &other)),
        }
    }

    pub fn pop_list(&mut self, op: Builtin) -> Result<Vec<Value>> {
        match self.pop(op)? {
            Value::List(items) => Ok(items),
            other => Err(mismatch(op, "List", &other)),
        }
    }

    pub fn pop_block(&mut self, op: Builtin) -> Result<BlockId> {
        match self.pop(op)? {
            Value::Block(id) => Ok(id),
            other => Err(mismatch(op, "Block", &other)),
        }
    }

    /// Pop a bare word, as used for function names on the code stack.
    pub fn pop_name(&mut self, op: Builtin) -> Result<String> {
        match self.pop(op)? {
            Value::Word(name) => Ok(name),
            other => Err(mismatch(op, "Word", &other)),
        }
    }

    /// Sum of every `Number`, other values skipped.
    pub fn sum_numbers(&self) -> f64 {
        sum_numbers(&self.items)
    }
}

pub(crate) fn sum_numbers(values: &[Value]) -> f64 {
    values
        .iter()
        .filter_map(|v| match v {
            Value::Number(n) => Some(*n),
            _ => None,
        })
        .sum()
}
