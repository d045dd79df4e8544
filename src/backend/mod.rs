//! Backend abstraction layer
//!
//! Provides the traits and handle types the render graph needs from a GPU
//! backend, plus an in-memory backend for tests and tooling.

pub mod dummy;
pub mod traits;
pub mod types;

pub use dummy::*;
pub use traits::*;
pub use types::*;
