//! # Octane value model
//!
//! Every token the lexer produces and every operand the interpreter handles
//! is a [`value::Value`].
//!
//! ## Documentation conventions
//!
//! - Programs run right to left: the rightmost token executes first.
//! - Stack effects are written as `( before -- after )` in execution order.
//! - `( ... )` denotes a block, `[ ... ]` a list literal.

pub mod value;
