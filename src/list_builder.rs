use crate::lang::value::Value;

/// The list under construction while the interpreter is in list mode.
///
/// Elements arrive in execution order (right to left); [`ListBuilder::end`]
/// reverses them back into source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListBuilder {
    items: Vec<Value>,
}

impl ListBuilder {
    pub fn begin() -> Self {
        ListBuilder { items: Vec::new() }
    }

    pub fn append(&mut self, value: Value) {
        self.items.push(value);
    }

    pub fn end(self) -> Value {
        let mut items = self.items;
        items.reverse();
        Value::List(items)
    }
}
