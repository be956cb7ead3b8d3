use crate::lang::value::{BlockId, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::trace;

/// Source of block ids. Ids never repeat within a process.
static NEXT_BLOCK_ID: AtomicU64 = AtomicU64::new(1);

fn fresh_block_id() -> Result<BlockId, RegistryError> {
    NEXT_BLOCK_ID
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| next.checked_add(1))
        .map(BlockId)
        .map_err(|last| RegistryError::IdsExhausted(BlockId(last)))
}

/// Make sure ids handed out from now on are all greater than `id`.
/// Leaves the id source untouched on failure.
pub(crate) fn reserve_block_ids_through(id: BlockId) -> Result<(), RegistryError> {
    let next = id.0.checked_add(1).ok_or(RegistryError::IdsExhausted(id))?;
    NEXT_BLOCK_ID.fetch_max(next, Ordering::Relaxed);
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown block: {0}")]
    UnknownBlock(BlockId),

    #[error("block {0} is already closed")]
    Sealed(BlockId),

    #[error("no block ids left after {0}")]
    IdsExhausted(BlockId),
}

#[derive(Debug, Clone, Default)]
struct Body {
    tokens: Vec<Value>,
    sealed: bool,
}

/// Captured blocks by id, and the names bound to them.
///
/// A block is open while its tokens arrive, then closed once: closing
/// restores source order and freezes the body. Closed bodies are never
/// mutated or removed; only [`FunctionRegistry::clear`] drops them.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    bodies: BTreeMap<BlockId, Body>,
    names: BTreeMap<String, BlockId>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty body under a fresh id.
    pub fn open_block(&mut self) -> Result<BlockId, RegistryError> {
        let id = fresh_block_id()?;
        self.bodies.insert(id, Body::default());
        trace!(block = %id, "open block");
        Ok(id)
    }

    /// Tokens arrive in execution order, i.e. reversed source order.
    pub fn append_to_block(&mut self, id: BlockId, token: Value) -> Result<(), RegistryError> {
        let body = self
            .bodies
            .get_mut(&id)
            .ok_or(RegistryError::UnknownBlock(id))?;
        if body.sealed {
            return Err(RegistryError::Sealed(id));
        }
        body.tokens.push(token);
        Ok(())
    }

    pub fn close_block(&mut self, id: BlockId) -> Result<(), RegistryError> {
        let body = self
            .bodies
            .get_mut(&id)
            .ok_or(RegistryError::UnknownBlock(id))?;
        if body.sealed {
            return Err(RegistryError::Sealed(id));
        }
        body.tokens.reverse();
        body.sealed = true;
        trace!(block = %id, len = body.tokens.len(), "close block");
        Ok(())
    }

    /// Bind `name` to a block. Rebinding a name replaces the old binding.
    pub fn bind(&mut self, name: &str, id: BlockId) {
        self.names.insert(name.to_string(), id);
    }

    pub fn resolve(&self, name: &str) -> Option<BlockId> {
        self.names.get(name).copied()
    }

    /// Body of a block in source order.
    pub fn body(&self, id: BlockId) -> Option<&[Value]> {
        self.bodies.get(&id).map(|b| b.tokens.as_slice())
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Closed blocks in id order.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &[Value])> {
        self.bodies
            .iter()
            .filter(|(_, body)| body.sealed)
            .map(|(id, body)| (*id, body.tokens.as_slice()))
    }

    pub fn names(&self) -> impl Iterator<Item = (&str, BlockId)> {
        self.names.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Rebuild a registry from closed bodies and bindings.
    pub(crate) fn from_parts(
        blocks: BTreeMap<BlockId, Vec<Value>>,
        names: BTreeMap<String, BlockId>,
    ) -> Result<Self, RegistryError> {
        if let Some(max) = blocks.keys().next_back() {
            reserve_block_ids_through(*max)?;
        }
        let bodies = blocks
            .into_iter()
            .map(|(id, tokens)| {
                (
                    id,
                    Body {
                        tokens,
                        sealed: true,
                    },
                )
            })
            .collect();
        Ok(FunctionRegistry { bodies, names })
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.names.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_close_restores_source_order() {
        let mut registry = FunctionRegistry::new();
        let id = registry.open_block().unwrap();
        // `( - 5 10 )` arrives right to left
        for token in [Value::Number(10.0), Value::Number(5.0), Value::word("-")] {
            registry.append_to_block(id, token).unwrap();
        }
        registry.close_block(id).unwrap();

        assert_eq!(
            registry.body(id).unwrap(),
            &[Value::word("-"), Value::Number(5.0), Value::Number(10.0)]
        );
    }

    #[test]
    fn test_closed_body_is_frozen() {
        let mut registry = FunctionRegistry::new();
        let id = registry.open_block().unwrap();
        registry.close_block(id).unwrap();

        assert_eq!(
            registry.append_to_block(id, Value::Number(1.0)),
            Err(RegistryError::Sealed(id))
        );
        assert_eq!(registry.close_block(id), Err(RegistryError::Sealed(id)));
    }

    #[test]
    fn test_ids_are_unique() {
        let mut a = FunctionRegistry::new();
        let mut b = FunctionRegistry::new();
        let ids = [
            a.open_block().unwrap(),
            b.open_block().unwrap(),
            a.open_block().unwrap(),
        ];
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        assert_ne!(ids[0], ids[2]);
    }

    #[test]
    fn test_bind_and_resolve() {
        let mut registry = FunctionRegistry::new();
        let first = registry.open_block().unwrap();
        let second = registry.open_block().unwrap();

        assert_eq!(registry.resolve("f"), None);
        registry.bind("f", first);
        assert_eq!(registry.resolve("f"), Some(first));
        registry.bind("f", second);
        assert_eq!(registry.resolve("f"), Some(second));
    }

    #[test]
    fn test_unknown_block() {
        let mut registry = FunctionRegistry::new();
        let stray = BlockId(u64::MAX);
        assert_eq!(
            registry.append_to_block(stray, Value::Number(1.0)),
            Err(RegistryError::UnknownBlock(stray))
        );
        assert!(registry.body(stray).is_none());
    }

    #[test]
    fn test_from_parts_reserves_ids() {
        let mut blocks = BTreeMap::new();
        let restored = BlockId(NEXT_BLOCK_ID.load(Ordering::Relaxed) + 500);
        blocks.insert(restored, vec![Value::Number(1.0)]);

        let mut registry = FunctionRegistry::from_parts(blocks, BTreeMap::new()).unwrap();
        assert!(registry.open_block().unwrap() > restored);
        assert_eq!(registry.blocks().count(), 1);
    }

    #[test]
    fn test_from_parts_rejects_last_id() {
        let last = BlockId(u64::MAX);
        let mut blocks = BTreeMap::new();
        blocks.insert(last, vec![Value::Number(1.0)]);

        let err = FunctionRegistry::from_parts(blocks, BTreeMap::new()).unwrap_err();
        assert_eq!(err, RegistryError::IdsExhausted(last));
        assert_eq!(err.to_string(), format!("no block ids left after {}", u64::MAX));
        assert!(NEXT_BLOCK_ID.load(Ordering::Relaxed) < u64::MAX);
    }
}
