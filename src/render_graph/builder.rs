//! Per-pass declaration façade

use glam::Vec4;

use crate::render_graph::graph::RenderGraphDag;
use crate::render_graph::pass::{RenderGraphPass, Viewport};
use crate::render_graph::registry::RenderGraphRegistry;
use crate::render_graph::resource::*;

/// Handed to a pass's setup closure.
///
/// Every call is recorded against the pass being set up, so a setup closure
/// cannot touch another pass's declarations. The graph keeps ownership of the
/// DAG and the registry.
pub struct RenderGraphBuilder<'a> {
    dag: &'a mut RenderGraphDag,
    registry: &'a mut RenderGraphRegistry,
    pass: &'a mut RenderGraphPass,
    key: String,
}

impl<'a> RenderGraphBuilder<'a> {
    pub(crate) fn new(
        dag: &'a mut RenderGraphDag,
        registry: &'a mut RenderGraphRegistry,
        pass: &'a mut RenderGraphPass,
    ) -> Self {
        let key = pass.name().to_string();
        Self {
            dag,
            registry,
            pass,
            key,
        }
    }

    /// Register a graph-owned image. See [`RenderGraphRegistry::declare_image`].
    pub fn declare_image(&mut self, resource: impl Into<RenderGraphResource>, image: RenderGraphImage) {
        self.registry.declare_image(resource.into(), image);
    }

    /// Register a graph-owned buffer. See [`RenderGraphRegistry::declare_buffer`].
    pub fn declare_buffer(&mut self, resource: impl Into<RenderGraphResource>, buffer: RenderGraphBuffer) {
        self.registry.declare_buffer(resource.into(), buffer);
    }

    pub fn read_image(&mut self, resource: impl Into<RenderGraphResource>) -> RenderGraphResource {
        self.read(resource.into())
    }

    pub fn write_image(&mut self, resource: impl Into<RenderGraphResource>) -> RenderGraphResource {
        self.write(resource.into())
    }

    /// Read and write the same image, e.g. for accumulation.
    pub fn read_write_image(&mut self, resource: impl Into<RenderGraphResource>) -> RenderGraphResource {
        let resource = self.read(resource.into());
        self.write(resource)
    }

    pub fn read_buffer(&mut self, resource: impl Into<RenderGraphResource>) -> RenderGraphResource {
        self.read(resource.into())
    }

    pub fn write_buffer(&mut self, resource: impl Into<RenderGraphResource>) -> RenderGraphResource {
        self.write(resource.into())
    }

    /// Write `resource` and use it as a color or depth attachment.
    pub fn bind_render_target(&mut self, resource: impl Into<RenderGraphResource>) -> RenderGraphResource {
        let resource = self.write(resource.into());
        self.pass.add_render_target(resource.clone());
        resource
    }

    pub fn set_clear_color(&mut self, clear_color: Vec4) {
        self.pass.set_clear_color(clear_color);
    }

    pub fn set_in_flight(&mut self, in_flight: bool) {
        self.pass.set_in_flight(in_flight);
    }

    pub fn viewport(&self) -> Viewport {
        self.pass.viewport()
    }

    pub fn pass_name(&self) -> &str {
        &self.key
    }

    /// Read access to already declared resources.
    pub fn registry(&self) -> &RenderGraphRegistry {
        &*self.registry
    }

    fn read(&mut self, resource: RenderGraphResource) -> RenderGraphResource {
        log::trace!("Pass `{}` reads `{}`", self.key, resource);
        self.dag.add_read_dependency(&self.key, resource.clone());
        resource
    }

    fn write(&mut self, resource: RenderGraphResource) -> RenderGraphResource {
        log::trace!("Pass `{}` writes `{}`", self.key, resource);
        self.dag.add_write_dependency(&self.key, resource.clone());
        resource
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::ImageHandle;
    use crate::render_graph::pass::{QueueFamily, RenderGraphPassCreateInfo};
    use crate::render_graph::registry::ExternalResources;

    fn fixtures() -> (RenderGraphDag, RenderGraphRegistry, RenderGraphPass) {
        (
            RenderGraphDag::new(),
            RenderGraphRegistry::new(ExternalResources::new(), ExternalResources::new()),
            RenderGraphPass::new(RenderGraphPassCreateInfo::new("Geometry", QueueFamily::Graphics)),
        )
    }

    #[test]
    fn test_bind_render_target_records_write_and_target() {
        let (mut dag, mut registry, mut pass) = fixtures();
        {
            let mut builder = RenderGraphBuilder::new(&mut dag, &mut registry, &mut pass);
            builder.bind_render_target("ColorOutput");
            builder.bind_render_target("ColorOutput");
            builder.read_image("ShadowMap");
        }

        let node = dag.node(&"Geometry".to_string()).unwrap();
        assert_eq!(node.output_resources().len(), 1);
        assert!(node.input_resources().contains(&RenderGraphResource::new("ShadowMap")));
        // One entry per call, even for the same resource.
        assert_eq!(pass.render_targets().len(), 2);
    }

    #[test]
    fn test_declarations_forward_to_registry() {
        let (mut dag, mut registry, mut pass) = fixtures();
        {
            let mut builder = RenderGraphBuilder::new(&mut dag, &mut registry, &mut pass);
            builder.declare_image("Depth", RenderGraphImage::depth(ImageHandle::from_raw(3)));
            builder.write_image("Depth");
            assert!(builder.registry().contains_image(&"Depth".into()));
            assert_eq!(builder.pass_name(), "Geometry");
            builder.set_clear_color(Vec4::ONE);
            builder.set_in_flight(false);
        }

        assert!(registry.get_image(&"Depth".into()).is_depth);
        assert_eq!(pass.clear_color(), Vec4::ONE);
        assert!(!pass.is_in_flight());
        assert!(pass.render_targets().is_empty());
    }

    #[test]
    fn test_read_write_image() {
        let (mut dag, mut registry, mut pass) = fixtures();
        {
            let mut builder = RenderGraphBuilder::new(&mut dag, &mut registry, &mut pass);
            builder.read_write_image("History");
        }
        let node = dag.node(&"Geometry".to_string()).unwrap();
        assert_eq!(node.input_resources(), node.output_resources());
    }
}
