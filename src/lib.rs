//! # Lucy Render Graph
//!
//! Frame graph scheduler for the Lucy engine.
//!
//! ## Overview
//!
//! Passes declare which logical resources they read and write. The graph
//! derives the dependencies between passes from those declarations, orders
//! them, culls every pass whose inputs are unavailable, and records the rest
//! into a [`CommandList`](backend::CommandList) in dependency order.
//!
//! This crate provides:
//! - [`RenderGraph`] - Pass registration, compilation, culling and execution
//! - [`DirectedAcyclicGraph`] - Generic resource-driven dependency graph
//! - [`RenderGraphRegistry`] - Logical resource to backend handle mapping
//! - [`backend`] - The backend seam, plus a dummy backend for testing
//!
//! ## Example
//!
//! ```ignore
//! use lucy_render_graph::*;
//!
//! let mut graph = RenderGraph::new();
//! graph.add_pass(QueueFamily::Graphics, "Geometry", |builder| {
//!     builder.read_image("ShadowMap");
//!     builder.bind_render_target("ColorOutput");
//!     execute_fn(|ctx| ctx.commands().draw(0..3, 0..1))
//! })?;
//! graph.compile()?;
//! graph.execute(&mut commands)?;
//! graph.flush(&mut backend)?;
//! ```

use glam::Vec4;

pub mod backend;
pub mod render_graph;

pub use render_graph::*;

/// Render graph library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version. Call once after the logger is installed.
pub fn init() {
    log::info!("Lucy Render Graph v{} initialized", VERSION);
}

/// Defaults applied to passes created through [`RenderGraph::add_pass`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderGraphConfig {
    /// Initial viewport width
    pub viewport_width: u32,
    /// Initial viewport height
    pub viewport_height: u32,
    /// Clear colour for render targets
    pub clear_color: Vec4,
    /// Whether passes re-run every frame; one-shot passes run once
    pub in_flight: bool,
}

impl RenderGraphConfig {
    /// Create info for a new pass with these defaults.
    pub fn pass_create_info(&self, name: impl Into<String>, queue_family: QueueFamily) -> RenderGraphPassCreateInfo {
        RenderGraphPassCreateInfo::new(name, queue_family)
            .with_viewport(self.viewport_width, self.viewport_height)
            .with_clear_color(self.clear_color)
            .with_in_flight(self.in_flight)
    }
}

impl Default for RenderGraphConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 720,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            in_flight: true,
        }
    }
}
