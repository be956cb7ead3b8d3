use crate::lang::value::{BlockId, Value};
use crate::memory::Memory;
use crate::registry::{FunctionRegistry, RegistryError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A decoded image that cannot be loaded into a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("image holds {found} memory cells, session has {expected}")]
    CapacityMismatch { expected: usize, found: usize },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Serializable snapshot of a session's registry and memory.
///
/// Only closed blocks are captured. Stacks are not part of an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub blocks: BTreeMap<BlockId, Vec<Value>>,
    pub names: BTreeMap<String, BlockId>,
    pub cells: Vec<i32>,
    pub pointer: i64,
}

impl Image {
    pub fn capture(registry: &FunctionRegistry, memory: &Memory) -> Self {
        Image {
            blocks: registry
                .blocks()
                .map(|(id, body)| (id, body.to_vec()))
                .collect(),
            names: registry
                .names()
                .map(|(name, id)| (name.to_string(), id))
                .collect(),
            cells: memory.cells().to_vec(),
            pointer: memory.pointer(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }

    /// Rebuild a registry and a memory bank of exactly `capacity` cells.
    pub fn into_parts(self, capacity: usize) -> Result<(FunctionRegistry, Memory), ImageError> {
        if self.cells.len() != capacity {
            return Err(ImageError::CapacityMismatch {
                expected: capacity,
                found: self.cells.len(),
            });
        }
        let registry = FunctionRegistry::from_parts(self.blocks, self.names)?;
        Ok((registry, Memory::from_parts(self.cells, self.pointer)))
    }
}
