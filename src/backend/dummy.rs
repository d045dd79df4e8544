//! Dummy backend for testing and tooling.
//!
//! Nothing here touches a GPU. [`DummyBackend`] hands out sequential handles
//! and keeps a log of destroy requests; [`RecordingCommandList`] stores every
//! recorded command so callers can inspect what a frame would submit.

use std::collections::HashSet;

use crate::backend::traits::*;
use crate::backend::types::*;

/// In-memory resource backend.
#[derive(Debug, Default)]
pub struct DummyBackend {
    next_id: u64,
    live: HashSet<RenderResourceHandle>,
    destroy_queue: Vec<RenderResourceHandle>,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resources queued for destruction, in request order.
    pub fn destroy_queue(&self) -> &[RenderResourceHandle] {
        &self.destroy_queue
    }

    /// Number of resources that are still alive.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Drop the backing resource without going through the graph, the way an
    /// external owner would.
    pub fn destroy_now(&mut self, handle: RenderResourceHandle) {
        self.live.remove(&handle);
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl GraphicsBackend for DummyBackend {
    fn name(&self) -> &str {
        "Dummy"
    }

    fn create_image(&mut self, desc: &ImageDescriptor) -> BackendResult<ImageHandle> {
        if desc.width == 0 || desc.height == 0 {
            return Err(BackendError::ImageCreationFailed(format!(
                "{:?} has a zero extent",
                desc.label
            )));
        }
        let handle = ImageHandle(self.allocate());
        log::trace!(
            "DummyBackend: creating image {:?} ({}x{}) -> {:?}",
            desc.label,
            desc.width,
            desc.height,
            handle
        );
        self.live.insert(handle.into());
        Ok(handle)
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        if desc.size == 0 {
            return Err(BackendError::BufferCreationFailed(format!(
                "{:?} has zero size",
                desc.label
            )));
        }
        let handle = BufferHandle(self.allocate());
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {}) -> {:?}",
            desc.label,
            desc.size,
            handle
        );
        self.live.insert(handle.into());
        Ok(handle)
    }

    fn is_valid_render_resource(&self, handle: RenderResourceHandle) -> bool {
        handle.is_valid() && self.live.contains(&handle)
    }

    fn enqueue_resource_destroy(&mut self, handle: RenderResourceHandle) {
        log::trace!("DummyBackend: enqueue destroy {:?}", handle);
        self.live.remove(&handle);
        self.destroy_queue.push(handle);
    }
}

/// A command captured by [`RecordingCommandList`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    BeginRenderPass(RenderPassInfo),
    EndRenderPass,
    SetViewport { width: f32, height: f32 },
    Draw { vertices: std::ops::Range<u32>, instances: std::ops::Range<u32> },
    Dispatch([u32; 3]),
    CopyImage { src: ImageHandle, dst: ImageHandle },
    DebugMarker(String),
}

/// Command list that stores commands instead of encoding them.
#[derive(Debug, Default)]
pub struct RecordingCommandList {
    commands: Vec<RecordedCommand>,
}

impl RecordingCommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    /// Labels of every render pass begun, in recording order.
    pub fn render_pass_labels(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                RecordedCommand::BeginRenderPass(info) => Some(info.label.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Debug markers in recording order.
    pub fn markers(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                RecordedCommand::DebugMarker(label) => Some(label.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl CommandList for RecordingCommandList {
    fn begin_render_pass(&mut self, info: &RenderPassInfo) {
        self.commands
            .push(RecordedCommand::BeginRenderPass(info.clone()));
    }

    fn end_render_pass(&mut self) {
        self.commands.push(RecordedCommand::EndRenderPass);
    }

    fn set_viewport(&mut self, _x: f32, _y: f32, width: f32, height: f32) {
        self.commands
            .push(RecordedCommand::SetViewport { width, height });
    }

    fn draw(&mut self, vertices: std::ops::Range<u32>, instances: std::ops::Range<u32>) {
        self.commands
            .push(RecordedCommand::Draw { vertices, instances });
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.commands.push(RecordedCommand::Dispatch([x, y, z]));
    }

    fn copy_image(&mut self, src: ImageHandle, dst: ImageHandle) {
        self.commands.push(RecordedCommand::CopyImage { src, dst });
    }

    fn insert_debug_marker(&mut self, label: &str) {
        self.commands
            .push(RecordedCommand::DebugMarker(label.to_string()));
    }
}
