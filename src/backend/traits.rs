//! Seams between the render graph and a GPU backend
//!
//! The render graph is backend-agnostic. These traits are the only contact
//! points with a GPU API: resource creation and destruction for the owner of
//! the graph, and command recording for pass execute closures.

use crate::backend::types::*;
use thiserror::Error;

/// Errors reported by a [`GraphicsBackend`]
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Failed to create image: {0}")]
    ImageCreationFailed(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Resource management side of a graphics backend
pub trait GraphicsBackend {
    /// Backend name for diagnostics
    fn name(&self) -> &str;

    /// Create an image
    fn create_image(&mut self, desc: &ImageDescriptor) -> BackendResult<ImageHandle>;

    /// Create a buffer
    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle>;

    /// Whether the handle still refers to a live resource
    fn is_valid_render_resource(&self, handle: RenderResourceHandle) -> bool;

    /// Queue the resource for destruction once the GPU no longer uses it
    fn enqueue_resource_destroy(&mut self, handle: RenderResourceHandle);
}

/// Command recording collaborator handed to pass execute closures
pub trait CommandList {
    /// Begin a render pass
    fn begin_render_pass(&mut self, info: &RenderPassInfo);

    /// End the current render pass
    fn end_render_pass(&mut self);

    /// Set viewport
    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32);

    /// Draw primitives
    fn draw(&mut self, vertices: std::ops::Range<u32>, instances: std::ops::Range<u32>);

    /// Dispatch compute work
    fn dispatch(&mut self, x: u32, y: u32, z: u32);

    /// Copy the full contents of one image into another
    fn copy_image(&mut self, src: ImageHandle, dst: ImageHandle);

    /// Insert a named marker for GPU debuggers
    fn insert_debug_marker(&mut self, label: &str);
}
