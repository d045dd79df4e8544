//! Mapping from logical resources to backend handles

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::types::*;
use crate::render_graph::resource::*;

/// Table of resources whose backing handles belong to someone else.
///
/// Cloning shares the table. The owner (an editor loading an HDR file, say)
/// writes handles into it, possibly starting from an invalid placeholder; the
/// graph only reads it to decide which passes can run. Both sides must be
/// driven from the same orchestration thread or otherwise kept from
/// interleaving.
#[derive(Debug, Clone, Default)]
pub struct ExternalResources {
    entries: Arc<RwLock<HashMap<RenderGraphResource, RenderResourceHandle>>>,
}

impl ExternalResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or overwrite an entry. Returns the previous handle, if any.
    pub fn import(
        &self,
        resource: RenderGraphResource,
        handle: impl Into<RenderResourceHandle>,
    ) -> Option<RenderResourceHandle> {
        self.entries.write().insert(resource, handle.into())
    }

    /// Swap the handle of an already imported resource.
    ///
    /// Returns `false` if the resource was never imported.
    pub fn replace(&self, resource: &RenderGraphResource, handle: impl Into<RenderResourceHandle>) -> bool {
        match self.entries.write().get_mut(resource) {
            Some(slot) => {
                *slot = handle.into();
                true
            }
            None => false,
        }
    }

    /// Put the invalid placeholder back, returning the handle it replaced.
    pub fn invalidate(&self, resource: &RenderGraphResource) -> Option<RenderResourceHandle> {
        let mut entries = self.entries.write();
        let slot = entries.get_mut(resource)?;
        let previous = *slot;
        *slot = previous.invalidated();
        Some(previous)
    }

    pub fn remove(&self, resource: &RenderGraphResource) -> Option<RenderResourceHandle> {
        self.entries.write().remove(resource)
    }

    pub fn get(&self, resource: &RenderGraphResource) -> Option<RenderResourceHandle> {
        self.entries.read().get(resource).copied()
    }

    pub fn contains(&self, resource: &RenderGraphResource) -> bool {
        self.entries.read().contains_key(resource)
    }

    /// `Some(valid)` for imported resources, `None` otherwise.
    pub fn is_valid(&self, resource: &RenderGraphResource) -> Option<bool> {
        self.get(resource).map(|handle| handle.is_valid())
    }

    /// Copy of the current entries.
    pub fn snapshot(&self) -> Vec<(RenderGraphResource, RenderResourceHandle)> {
        self.entries
            .read()
            .iter()
            .map(|(resource, handle)| (resource.clone(), *handle))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Resolves the logical resources a pass touches to concrete handles.
///
/// Graph-declared images and buffers are owned here. External and external
/// transient resources live in shared [`ExternalResources`] tables; the two
/// namespaces are expected to be disjoint.
#[derive(Debug)]
pub struct RenderGraphRegistry {
    images: HashMap<RenderGraphResource, RenderGraphImage>,
    buffers: HashMap<RenderGraphResource, RenderGraphBuffer>,
    external: ExternalResources,
    external_transient: ExternalResources,
}

impl RenderGraphRegistry {
    pub fn new(external: ExternalResources, external_transient: ExternalResources) -> Self {
        Self {
            images: HashMap::new(),
            buffers: HashMap::new(),
            external,
            external_transient,
        }
    }

    /// Register a graph-owned image.
    ///
    /// # Panics
    ///
    /// If `resource` is the undefined sentinel or the handle is invalid.
    pub fn declare_image(&mut self, resource: RenderGraphResource, image: RenderGraphImage) {
        assert!(!resource.is_undefined(), "cannot declare the undefined resource");
        assert!(
            image.handle.is_valid(),
            "image `{}` declared with an invalid handle",
            resource
        );
        if self.external_contains(&resource) {
            log::warn!("Image `{}` is declared and imported as external", resource);
        }
        log::trace!("Declared image `{}` -> {:?}", resource, image.handle);
        self.images.insert(resource, image);
    }

    /// Register a graph-owned buffer.
    ///
    /// # Panics
    ///
    /// If `resource` is the undefined sentinel or the handle is invalid.
    pub fn declare_buffer(&mut self, resource: RenderGraphResource, buffer: RenderGraphBuffer) {
        assert!(!resource.is_undefined(), "cannot declare the undefined resource");
        assert!(
            buffer.handle.is_valid(),
            "buffer `{}` declared with an invalid handle",
            resource
        );
        if self.external_contains(&resource) {
            log::warn!("Buffer `{}` is declared and imported as external", resource);
        }
        log::trace!("Declared buffer `{}` -> {:?}", resource, buffer.handle);
        self.buffers.insert(resource, buffer);
    }

    /// # Panics
    ///
    /// If the image was never declared.
    pub fn get_image(&self, resource: &RenderGraphResource) -> &RenderGraphImage {
        match self.images.get(resource) {
            Some(image) => image,
            None => panic!("image `{}` was never declared", resource),
        }
    }

    /// # Panics
    ///
    /// If the buffer was never declared.
    pub fn get_buffer(&self, resource: &RenderGraphResource) -> &RenderGraphBuffer {
        match self.buffers.get(resource) {
            Some(buffer) => buffer,
            None => panic!("buffer `{}` was never declared", resource),
        }
    }

    pub fn contains_image(&self, resource: &RenderGraphResource) -> bool {
        self.images.contains_key(resource)
    }

    pub fn contains_buffer(&self, resource: &RenderGraphResource) -> bool {
        self.buffers.contains_key(resource)
    }

    /// Current handle of an imported image; may be the invalid placeholder.
    ///
    /// # Panics
    ///
    /// If the resource was never imported, or was imported as a buffer.
    pub fn external_image(&self, resource: &RenderGraphResource) -> ImageHandle {
        match self.external_handle(resource).map(|handle| handle.as_image()) {
            Some(Some(image)) => image,
            Some(None) => panic!("external resource `{}` is not an image", resource),
            None => panic!("external image `{}` was never imported", resource),
        }
    }

    /// Current handle of an imported buffer; may be the invalid placeholder.
    ///
    /// # Panics
    ///
    /// If the resource was never imported, or was imported as an image.
    pub fn external_buffer(&self, resource: &RenderGraphResource) -> BufferHandle {
        match self.external_handle(resource).map(|handle| handle.as_buffer()) {
            Some(Some(buffer)) => buffer,
            Some(None) => panic!("external resource `{}` is not a buffer", resource),
            None => panic!("external buffer `{}` was never imported", resource),
        }
    }

    /// Handle of an image wherever it lives: declared first, then external.
    pub fn resolve_image(&self, resource: &RenderGraphResource) -> Option<ImageHandle> {
        self.images
            .get(resource)
            .map(|image| image.handle)
            .or_else(|| self.external_handle(resource).and_then(|handle| handle.as_image()))
    }

    pub fn is_external(&self, resource: &RenderGraphResource) -> bool {
        self.external.contains(resource)
    }

    pub fn is_external_transient(&self, resource: &RenderGraphResource) -> bool {
        self.external_transient.contains(resource)
    }

    /// Whether `resource` is imported and currently holds the invalid
    /// placeholder.
    pub fn is_unavailable_external(&self, resource: &RenderGraphResource) -> bool {
        self.external.is_valid(resource) == Some(false)
            || self.external_transient.is_valid(resource) == Some(false)
    }

    pub fn external_resources(&self) -> &ExternalResources {
        &self.external
    }

    pub fn external_transient_resources(&self) -> &ExternalResources {
        &self.external_transient
    }

    pub fn clear(&mut self) {
        self.images.clear();
        self.buffers.clear();
    }

    fn external_handle(&self, resource: &RenderGraphResource) -> Option<RenderResourceHandle> {
        self.external
            .get(resource)
            .or_else(|| self.external_transient.get(resource))
    }

    fn external_contains(&self, resource: &RenderGraphResource) -> bool {
        self.external.contains(resource) || self.external_transient.contains(resource)
    }
}
