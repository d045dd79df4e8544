//! Logical resources of the render graph

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::backend::types::*;

const UNDEFINED_NAME: &str = "Undefined";

/// Name-based token identifying a logical image or buffer.
///
/// The token says nothing about the backing allocation; the
/// [`RenderGraphRegistry`](super::RenderGraphRegistry) maps it to a handle.
/// Two tokens with the same name are the same resource, and the stored hash
/// is always [`hash_name`] of that name. The hash is used for bucketing and
/// ordering; equality still compares names so a hash collision cannot alias
/// two resources.
#[derive(Clone)]
pub struct RenderGraphResource {
    name: Arc<str>,
    hash: u64,
}

impl RenderGraphResource {
    /// Token for `name`.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        let name = name.into();
        let hash = hash_name(&name);
        Self { name, hash }
    }

    /// Build a token whose hash was computed ahead of time.
    ///
    /// A hash that does not match [`hash_name`] is discarded and recomputed.
    pub fn with_hash(name: impl Into<Arc<str>>, hash: u64) -> Self {
        let name = name.into();
        let expected = hash_name(&name);
        if hash != expected {
            log::warn!(
                "Precomputed hash {:#x} does not match resource `{}`, recomputing",
                hash,
                name
            );
        }
        Self {
            name,
            hash: expected,
        }
    }

    /// The sentinel token that never names a real resource.
    pub fn undefined() -> Self {
        Self::new(UNDEFINED_NAME)
    }

    pub fn is_undefined(&self) -> bool {
        &*self.name == UNDEFINED_NAME
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_hash(&self) -> u64 {
        self.hash
    }
}

/// Hash used for resource names.
pub fn hash_name(name: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    hasher.finish()
}

impl PartialEq for RenderGraphResource {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.name == other.name
    }
}

impl Eq for RenderGraphResource {}

impl Hash for RenderGraphResource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for RenderGraphResource {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RenderGraphResource {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash
            .cmp(&other.hash)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl fmt::Debug for RenderGraphResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RenderGraphResource({:?})", &*self.name)
    }
}

impl fmt::Display for RenderGraphResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for RenderGraphResource {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for RenderGraphResource {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// A graph-owned image declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderGraphImage {
    pub handle: ImageHandle,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub is_depth: bool,
}

impl RenderGraphImage {
    /// Color image cleared on load and stored on exit
    pub fn color(handle: ImageHandle) -> Self {
        Self {
            handle,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            is_depth: false,
        }
    }

    pub fn depth(handle: ImageHandle) -> Self {
        Self {
            is_depth: true,
            ..Self::color(handle)
        }
    }

    pub fn with_load_op(mut self, load_op: LoadOp) -> Self {
        self.load_op = load_op;
        self
    }

    pub fn with_store_op(mut self, store_op: StoreOp) -> Self {
        self.store_op = store_op;
        self
    }

    pub fn attachment(&self) -> AttachmentInfo {
        AttachmentInfo {
            image: self.handle,
            load_op: self.load_op,
            store_op: self.store_op,
            is_depth: self.is_depth,
        }
    }
}

/// A graph-owned buffer declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderGraphBuffer {
    pub handle: BufferHandle,
}

impl RenderGraphBuffer {
    pub fn new(handle: BufferHandle) -> Self {
        Self { handle }
    }
}
