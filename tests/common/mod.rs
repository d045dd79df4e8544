//! Common utilities for render graph integration tests.

#![allow(dead_code)]

use lucy_render_graph::backend::{
    AttachmentInfo, DummyBackend, GraphicsBackend, ImageDescriptor, ImageHandle, LoadOp,
    RecordingCommandList, RenderPassInfo, StoreOp,
};
use lucy_render_graph::{PassExecuteContext, RenderGraph, RenderGraphResult};

/// Install the test logger once per test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A graph wired to the dummy backend and a recording command list.
pub struct TestContext {
    pub graph: RenderGraph,
    pub backend: DummyBackend,
    pub commands: RecordingCommandList,
}

impl TestContext {
    pub fn new() -> Self {
        init_logging();
        Self {
            graph: RenderGraph::new(),
            backend: DummyBackend::new(),
            commands: RecordingCommandList::new(),
        }
    }

    /// Allocate a 2D color image on the dummy backend.
    pub fn create_image(&mut self, width: u32, height: u32) -> ImageHandle {
        self.backend
            .create_image(&ImageDescriptor {
                width,
                height,
                ..Default::default()
            })
            .expect("dummy image allocation")
    }

    /// Execute and flush one frame. Returns the number of passes that ran.
    pub fn frame(&mut self) -> RenderGraphResult<usize> {
        self.commands.clear();
        let executed = self.graph.execute(&mut self.commands)?;
        self.graph.flush(&mut self.backend)?;
        Ok(executed)
    }

    pub fn markers(&self) -> Vec<&str> {
        self.commands.markers()
    }
}

/// Begin a render pass over the pass's bound render targets, draw a
/// fullscreen triangle and end it.
pub fn draw_fullscreen(ctx: &mut PassExecuteContext<'_>) {
    let attachments: Vec<AttachmentInfo> = ctx
        .render_targets()
        .iter()
        .filter_map(|target| {
            let registry = ctx.registry();
            if registry.contains_image(target) {
                Some(registry.get_image(target).attachment())
            } else {
                registry.resolve_image(target).map(|image| AttachmentInfo {
                    image,
                    load_op: LoadOp::Load,
                    store_op: StoreOp::Store,
                    is_depth: false,
                })
            }
        })
        .collect();

    let info = RenderPassInfo {
        label: ctx.pass_name().to_string(),
        attachments,
        clear_color: ctx.clear_color().to_array(),
        width: ctx.viewport().width,
        height: ctx.viewport().height,
    };
    let commands = ctx.commands();
    commands.begin_render_pass(&info);
    commands.draw(0..3, 0..1);
    commands.end_render_pass();
}
