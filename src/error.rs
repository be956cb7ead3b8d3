use crate::image::ImageError;
use crate::lexer::LexError;
use crate::runtime_error::RuntimeError;
use thiserror::Error;

/// Anything that can stop a run or an image operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("lexer error: {0}")]
    Lex(#[from] LexError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("image error: {0}")]
    Image(#[from] postcard::Error),

    #[error("incompatible image: {0}")]
    IncompatibleImage(#[from] ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
