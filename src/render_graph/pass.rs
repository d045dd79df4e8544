//! Render pass definitions for the render graph

use glam::Vec4;

use crate::backend::traits::CommandList;
use crate::render_graph::builder::RenderGraphBuilder;
use crate::render_graph::graph::RenderGraphDag;
use crate::render_graph::registry::RenderGraphRegistry;
use crate::render_graph::resource::RenderGraphResource;

/// Runtime state of a pass.
///
/// `New` passes have never been classified. [`RenderGraph::update`](crate::RenderGraph::update) moves them to
/// `Waiting` (culled) or `Runnable`, and they may toggle between those two
/// from frame to frame. `Terminated` is only reached through removal and is
/// never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderGraphPassState {
    New,
    Waiting,
    Runnable,
    Terminated,
}

impl RenderGraphPassState {
    pub fn can_transition_to(self, next: RenderGraphPassState) -> bool {
        use RenderGraphPassState::*;
        match (self, next) {
            (Terminated, _) => false,
            (_, Terminated) => true,
            (_, New) => false,
            (New | Waiting | Runnable, Waiting | Runnable) => true,
        }
    }
}

/// Queue a pass is submitted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueueFamily {
    #[default]
    Graphics,
    Compute,
    Transfer,
}

/// Render area of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Everything needed to construct a [`RenderGraphPass`]
#[derive(Debug, Clone)]
pub struct RenderGraphPassCreateInfo {
    pub name: String,
    pub queue_family: QueueFamily,
    pub viewport: Viewport,
    pub clear_color: Vec4,
    /// Whether the pass runs every frame, or once until asked to rerun
    pub in_flight: bool,
}

impl RenderGraphPassCreateInfo {
    pub fn new(name: impl Into<String>, queue_family: QueueFamily) -> Self {
        Self {
            name: name.into(),
            queue_family,
            viewport: Viewport::new(1280, 720),
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            in_flight: true,
        }
    }

    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = Viewport::new(width, height);
        self
    }

    pub fn with_clear_color(mut self, clear_color: Vec4) -> Self {
        self.clear_color = clear_color;
        self
    }

    pub fn with_in_flight(mut self, in_flight: bool) -> Self {
        self.in_flight = in_flight;
        self
    }
}

/// Closure recorded by a pass's setup and run on every execution
pub type RenderGraphExecuteFn = Box<dyn FnMut(&mut PassExecuteContext<'_>)>;

/// Box an execute closure, pinning down its argument type.
pub fn execute_fn<F>(f: F) -> RenderGraphExecuteFn
where
    F: FnMut(&mut PassExecuteContext<'_>) + 'static,
{
    Box::new(f)
}

/// Context handed to an execute closure
pub struct PassExecuteContext<'a> {
    registry: &'a RenderGraphRegistry,
    commands: &'a mut dyn CommandList,
    name: &'a str,
    viewport: Viewport,
    clear_color: Vec4,
    render_targets: &'a [RenderGraphResource],
}

impl<'a> PassExecuteContext<'a> {
    /// Resolves logical resources to backend handles
    pub fn registry(&self) -> &RenderGraphRegistry {
        self.registry
    }

    pub fn commands(&mut self) -> &mut dyn CommandList {
        &mut *self.commands
    }

    pub fn pass_name(&self) -> &str {
        self.name
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn clear_color(&self) -> Vec4 {
        self.clear_color
    }

    pub fn render_targets(&self) -> &[RenderGraphResource] {
        self.render_targets
    }
}

/// A named unit of GPU work
pub struct RenderGraphPass {
    name: String,
    queue_family: QueueFamily,
    state: RenderGraphPassState,
    render_targets: Vec<RenderGraphResource>,
    viewport: Viewport,
    clear_color: Vec4,
    in_flight: bool,
    has_executed: bool,
    execute_fn: Option<RenderGraphExecuteFn>,
}

impl RenderGraphPass {
    pub fn new(info: RenderGraphPassCreateInfo) -> Self {
        Self {
            name: info.name,
            queue_family: info.queue_family,
            state: RenderGraphPassState::New,
            render_targets: Vec::new(),
            viewport: info.viewport,
            clear_color: info.clear_color,
            in_flight: info.in_flight,
            has_executed: false,
            execute_fn: None,
        }
    }

    /// Run the setup closure and keep the execute closure it returns.
    ///
    /// The graph calls this exactly once, when the pass is added.
    pub(crate) fn setup<F>(
        &mut self,
        dag: &mut RenderGraphDag,
        registry: &mut RenderGraphRegistry,
        setup_fn: F,
    ) where
        F: FnOnce(&mut RenderGraphBuilder<'_>) -> RenderGraphExecuteFn,
    {
        debug_assert!(self.execute_fn.is_none(), "pass `{}` set up twice", self.name);
        let execute_fn = {
            let mut builder = RenderGraphBuilder::new(dag, registry, self);
            setup_fn(&mut builder)
        };
        self.execute_fn = Some(execute_fn);
    }

    /// Invoke the stored execute closure.
    ///
    /// Passes that are not in flight run once and are then skipped until
    /// [`request_rerun`](Self::request_rerun) or a resize. Returns whether the
    /// closure ran.
    pub fn execute(&mut self, registry: &RenderGraphRegistry, commands: &mut dyn CommandList) -> bool {
        if !self.in_flight && self.has_executed {
            return false;
        }
        let Some(execute_fn) = self.execute_fn.as_mut() else {
            return false;
        };

        commands.insert_debug_marker(&self.name);
        let mut ctx = PassExecuteContext {
            registry,
            commands,
            name: &self.name,
            viewport: self.viewport,
            clear_color: self.clear_color,
            render_targets: &self.render_targets,
        };
        execute_fn(&mut ctx);
        self.has_executed = true;
        true
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn queue_family(&self) -> QueueFamily {
        self.queue_family
    }

    pub fn state(&self) -> RenderGraphPassState {
        self.state
    }

    /// Move to `next` if the state machine allows it; returns whether the
    /// state changed.
    pub(crate) fn set_state(&mut self, next: RenderGraphPassState) -> bool {
        if self.state == next {
            return false;
        }
        if !self.state.can_transition_to(next) {
            log::warn!(
                "Ignoring {:?} -> {:?} transition for pass `{}`",
                self.state,
                next,
                self.name
            );
            return false;
        }
        log::trace!("Pass `{}`: {:?} -> {:?}", self.name, self.state, next);
        self.state = next;
        true
    }

    pub fn add_render_target(&mut self, resource: RenderGraphResource) {
        self.render_targets.push(resource);
    }

    pub fn render_targets(&self) -> &[RenderGraphResource] {
        &self.render_targets
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Viewport-resize notification. A pass that only runs once is
    /// scheduled again so it can refill its targets at the new size.
    pub fn resize(&mut self, width: u32, height: u32) {
        let viewport = Viewport::new(width, height);
        if self.viewport != viewport {
            self.viewport = viewport;
            self.has_executed = false;
        }
    }

    pub fn clear_color(&self) -> Vec4 {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, clear_color: Vec4) {
        self.clear_color = clear_color;
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn set_in_flight(&mut self, in_flight: bool) {
        self.in_flight = in_flight;
    }

    pub fn has_executed(&self) -> bool {
        self.has_executed
    }

    pub fn request_rerun(&mut self) {
        self.has_executed = false;
    }
}

impl std::fmt::Debug for RenderGraphPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderGraphPass")
            .field("name", &self.name)
            .field("queue_family", &self.queue_family)
            .field("state", &self.state)
            .field("render_targets", &self.render_targets)
            .field("viewport", &self.viewport)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}
