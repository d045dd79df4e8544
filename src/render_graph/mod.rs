//! Render Graph System
//!
//! Passes declare resource reads and writes through a [`RenderGraphBuilder`].
//! The graph turns those declarations into a [`DirectedAcyclicGraph`], culls
//! passes whose inputs are unavailable and runs the rest in dependency order.

pub mod builder;
pub mod dag;
pub mod graph;
pub mod pass;
pub mod registry;
pub mod resource;

pub use builder::*;
pub use dag::*;
pub use graph::*;
pub use pass::*;
pub use registry::*;
pub use resource::*;
