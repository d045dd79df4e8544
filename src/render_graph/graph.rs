//! Render graph orchestration: pass registration, compilation, culling and
//! execution

use std::collections::HashMap;

use thiserror::Error;

use crate::backend::traits::{CommandList, GraphicsBackend};
use crate::backend::types::RenderResourceHandle;
use crate::render_graph::builder::RenderGraphBuilder;
use crate::render_graph::dag::{DirectedAcyclicGraph, GraphError};
use crate::render_graph::pass::*;
use crate::render_graph::registry::{ExternalResources, RenderGraphRegistry};
use crate::render_graph::resource::RenderGraphResource;
use crate::RenderGraphConfig;

/// The dependency graph specialised to named passes and logical resources
pub type RenderGraphDag = DirectedAcyclicGraph<String, RenderGraphResource>;

/// Errors reported by [`RenderGraph`].
///
/// Every variant points at a bug in the code that builds or drives the graph.
/// Passes that cannot run because an input is missing are not errors; they
/// are culled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderGraphError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("a pass named `{0}` already exists")]
    DuplicatePass(String),
    #[error("no pass named `{0}`")]
    PassNotFound(String),
    #[error("pass `{pass}` reached execution in state {state:?}")]
    InvalidPassState {
        pass: String,
        state: RenderGraphPassState,
    },
    #[error("render graph changed since the last compile")]
    NotCompiled,
}

pub type RenderGraphResult<T> = Result<T, RenderGraphError>;

/// The frame graph.
///
/// Owns the passes, the dependency graph and the registry. Not thread-safe:
/// drive it from one orchestration thread per frame.
///
/// ```ignore
/// let mut graph = RenderGraph::new();
/// graph.add_pass(QueueFamily::Graphics, "Shadow", |builder| {
///     builder.bind_render_target("ShadowMap");
///     execute_fn(|ctx| { /* record commands */ })
/// })?;
/// graph.compile()?;
/// graph.execute(&mut commands)?;
/// graph.flush(&mut backend)?;
/// ```
pub struct RenderGraph {
    config: RenderGraphConfig,
    passes: HashMap<String, RenderGraphPass>,
    dag: RenderGraphDag,
    registry: RenderGraphRegistry,
    external: ExternalResources,
    external_transient: ExternalResources,
}

impl RenderGraph {
    /// An empty graph with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RenderGraphConfig::default())
    }

    /// An empty graph using `config` for new passes.
    pub fn with_config(config: RenderGraphConfig) -> Self {
        let external = ExternalResources::new();
        let external_transient = ExternalResources::new();
        Self {
            config,
            passes: HashMap::new(),
            dag: RenderGraphDag::new(),
            registry: RenderGraphRegistry::new(external.clone(), external_transient.clone()),
            external,
            external_transient,
        }
    }

    /// Add a pass and run its setup closure right away.
    ///
    /// The closure declares the pass's reads and writes through the builder
    /// and returns the closure that records its commands.
    pub fn add_pass<F>(
        &mut self,
        queue_family: QueueFamily,
        name: impl Into<String>,
        setup: F,
    ) -> RenderGraphResult<()>
    where
        F: FnOnce(&mut RenderGraphBuilder<'_>) -> RenderGraphExecuteFn,
    {
        let info = self.config.pass_create_info(name, queue_family);
        self.add_pass_with(info, setup)
    }

    /// Like [`add_pass`](Self::add_pass) with full control over creation.
    pub fn add_pass_with<F>(&mut self, info: RenderGraphPassCreateInfo, setup: F) -> RenderGraphResult<()>
    where
        F: FnOnce(&mut RenderGraphBuilder<'_>) -> RenderGraphExecuteFn,
    {
        if self.passes.contains_key(&info.name) {
            return Err(RenderGraphError::DuplicatePass(info.name));
        }

        let name = info.name.clone();
        let mut pass = RenderGraphPass::new(info);
        pass.setup(&mut self.dag, &mut self.registry, setup);

        if !self.dag.contains_pass(&name) {
            log::warn!("Pass `{}` declared no resources and will never execute", name);
        }
        log::debug!("Added {:?} pass `{}`", pass.queue_family(), name);
        self.passes.insert(name, pass);
        Ok(())
    }

    /// Remove a pass. The graph has to be compiled again before executing.
    pub fn remove_pass(&mut self, name: &str) -> RenderGraphResult<()> {
        let Some(mut pass) = self.passes.remove(name) else {
            return Err(RenderGraphError::PassNotFound(name.to_string()));
        };
        pass.set_state(RenderGraphPassState::Terminated);
        self.dag.remove_pass(&pass.name().to_string());
        log::debug!("Removed pass `{}`", name);
        Ok(())
    }

    /// Rebuild the dependency graph and classify every pass.
    pub fn compile(&mut self) -> RenderGraphResult<()> {
        self.dag.build()?;
        self.update()
    }

    /// Re-evaluate which passes are culled.
    ///
    /// Walks passes in dependency order. A pass is culled when one of its
    /// producers is culled or when it touches an external resource whose
    /// handle is currently invalid. Culling and un-culling propagate to every
    /// transitive consumer.
    pub fn update(&mut self) -> RenderGraphResult<()> {
        if !self.dag.is_built() {
            return Err(RenderGraphError::NotCompiled);
        }

        let order: Vec<String> = self
            .dag
            .nodes()
            .iter()
            .map(|node| node.pass().clone())
            .collect();

        for name in &order {
            let culled = self.needs_culling(name);
            let target = if culled {
                RenderGraphPassState::Waiting
            } else {
                RenderGraphPassState::Runnable
            };

            let Some(pass) = self.passes.get_mut(name) else {
                log::warn!("Graph node `{}` has no pass", name);
                continue;
            };
            if pass.state() == target {
                continue;
            }
            pass.set_state(target);
            if culled {
                log::debug!("Culled pass `{}`", name);
            }

            for dependent in self.dag.depending_passes_on(name) {
                if let Some(pass) = self.passes.get_mut(&dependent) {
                    pass.set_state(target);
                }
            }
        }
        Ok(())
    }

    fn needs_culling(&self, name: &String) -> bool {
        let producer_waiting = self.dag.input_passes(name).into_iter().any(|producer| {
            self.passes
                .get(producer)
                .is_some_and(|pass| pass.state() == RenderGraphPassState::Waiting)
        });
        if producer_waiting {
            return true;
        }

        let Some(node) = self.dag.node(name) else {
            return false;
        };
        node.input_resources()
            .iter()
            .chain(node.output_resources())
            .any(|resource| self.registry.is_unavailable_external(resource))
    }

    /// Run every runnable pass in dependency order.
    ///
    /// Culled passes are skipped. Returns the number of passes whose execute
    /// closure ran.
    pub fn execute(&mut self, commands: &mut dyn CommandList) -> RenderGraphResult<usize> {
        if !self.dag.is_built() {
            return Err(RenderGraphError::NotCompiled);
        }

        let mut executed = 0;
        for node in self.dag.nodes() {
            let name = node.pass();
            let Some(pass) = self.passes.get_mut(name) else {
                return Err(RenderGraphError::PassNotFound(name.clone()));
            };
            match pass.state() {
                RenderGraphPassState::Runnable => {
                    if pass.execute(&self.registry, commands) {
                        executed += 1;
                    }
                }
                RenderGraphPassState::Waiting => {
                    log::trace!("Skipping culled pass `{}`", name);
                }
                state @ (RenderGraphPassState::New | RenderGraphPassState::Terminated) => {
                    return Err(RenderGraphError::InvalidPassState {
                        pass: name.clone(),
                        state,
                    });
                }
            }
        }
        Ok(executed)
    }

    /// End-of-frame bookkeeping.
    ///
    /// Re-classifies passes, then releases every external transient resource
    /// that still holds a live handle and resets its entry to the invalid
    /// placeholder. Consumers of reset entries are culled before the next
    /// frame. Returns the number of resources released.
    pub fn flush(&mut self, backend: &mut dyn GraphicsBackend) -> RenderGraphResult<usize> {
        self.update()?;

        let mut released = 0;
        let mut invalidated = 0;
        for (resource, handle) in self.external_transient.snapshot() {
            if !handle.is_valid() {
                continue;
            }
            if backend.is_valid_render_resource(handle) {
                backend.enqueue_resource_destroy(handle);
                released += 1;
                log::debug!("Released external transient `{}` ({:?})", resource, handle);
            } else {
                log::debug!("External transient `{}` was already destroyed", resource);
            }
            self.external_transient.invalidate(&resource);
            invalidated += 1;
        }

        if invalidated > 0 {
            self.update()?;
        }
        Ok(released)
    }

    /// Import a resource owned outside the graph. `handle` may be the
    /// invalid placeholder until the owner provides the real resource.
    pub fn import_external_resource(
        &mut self,
        resource: impl Into<RenderGraphResource>,
        handle: impl Into<RenderResourceHandle>,
    ) {
        let resource = resource.into();
        log::trace!("Importing external `{}`", resource);
        self.external.import(resource, handle);
    }

    /// Import a one-shot resource that the next [`flush`](Self::flush)
    /// releases.
    pub fn import_external_transient_resource(
        &mut self,
        resource: impl Into<RenderGraphResource>,
        handle: impl Into<RenderResourceHandle>,
    ) {
        let resource = resource.into();
        log::trace!("Importing external transient `{}`", resource);
        self.external_transient.import(resource, handle);
    }

    /// Shared handle to the external resource table, for its owner.
    pub fn external_resources(&self) -> ExternalResources {
        self.external.clone()
    }

    /// Shared handle to the external transient resource table, for its owner.
    pub fn external_transient_resources(&self) -> ExternalResources {
        self.external_transient.clone()
    }

    /// Forward a viewport resize to every pass.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.viewport_width = width;
        self.config.viewport_height = height;
        for pass in self.passes.values_mut() {
            pass.resize(width, height);
        }
    }

    /// Pass registered under `name`.
    pub fn pass(&self, name: &str) -> Option<&RenderGraphPass> {
        self.passes.get(name)
    }

    /// Mutable access to the pass registered under `name`.
    pub fn pass_mut(&mut self, name: &str) -> Option<&mut RenderGraphPass> {
        self.passes.get_mut(name)
    }

    /// Current state of the pass registered under `name`.
    pub fn pass_state(&self, name: &str) -> Option<RenderGraphPassState> {
        self.passes.get(name).map(RenderGraphPass::state)
    }

    /// Every registered pass, in no particular order.
    pub fn passes(&self) -> impl Iterator<Item = &RenderGraphPass> {
        self.passes.values()
    }

    /// Number of registered passes.
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Pass names in execution order; empty until compiled.
    pub fn execution_order(&self) -> Vec<&str> {
        if !self.dag.is_built() {
            return Vec::new();
        }
        self.dag
            .nodes()
            .into_iter()
            .map(|node| node.pass().as_str())
            .collect()
    }

    /// Whether the last compile succeeded and no pass changed since.
    pub fn is_compiled(&self) -> bool {
        self.dag.is_built()
    }

    /// Dependency graph derived from the pass declarations.
    pub fn dag(&self) -> &RenderGraphDag {
        &self.dag
    }

    /// Graph-owned resource declarations.
    pub fn registry(&self) -> &RenderGraphRegistry {
        &self.registry
    }

    /// Mutable access to the graph-owned resource declarations.
    pub fn registry_mut(&mut self) -> &mut RenderGraphRegistry {
        &mut self.registry
    }

    /// Configuration applied to newly added passes.
    pub fn config(&self) -> &RenderGraphConfig {
        &self.config
    }

    /// Drop all passes and graph-owned declarations. External tables are
    /// left alone since they belong to their owners.
    pub fn clear(&mut self) {
        for pass in self.passes.values_mut() {
            pass.set_state(RenderGraphPassState::Terminated);
        }
        self.passes.clear();
        self.dag.clear();
        self.registry.clear();
    }
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new()
    }
}
