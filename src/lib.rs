//! Octane: a right-to-left stack language with a code stack, a data stack,
//! named blocks and a small bank of integer memory cells.
//!
//! ```
//! use octane::{VM, VMConfig};
//!
//! let mut vm = VM::with_output(VMConfig::default(), Vec::new());
//! vm.eval("myf call , myf func ( - 5 10 )").unwrap();
//! assert_eq!(vm.stack_to_string(), "-5.0");
//! ```

pub mod builtin;
pub mod error;
pub mod frontend;
pub mod image;
pub mod lang;
pub mod lexer;
pub mod list_builder;
pub mod memory;
pub mod registry;
pub mod runtime_error;
pub mod stack;
pub mod vm;

pub use builtin::Builtin;
pub use error::{Error, Result};
pub use image::{Image, ImageError};
pub use lang::value::{BlockId, Value};
pub use lexer::{LexError, Lexer, Span, Spanned};
pub use runtime_error::{ErrorKind, RuntimeError};
pub use vm::{Outcome, VM, VMConfig};
