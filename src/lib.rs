//! # What is This?
//!
//! Radiant is the render-device core of a small, portable 3d engine. It hides
//! a stateful, handle-based native graphics API behind a backend-agnostic
//! device interface, and takes care of the GPU resource lifecycle: buffers,
//! textures, samplers, shader stages and their linked pipelines, vertex-array
//! objects and render targets.
//!
//! The device deduplicates the expensive native objects. Linked shader
//! pipelines are cached by the identities of their stages, and vertex-array
//! objects are cached by (vertex shader, bound buffer set); before every draw
//! the backend diffs the requested render state against the last applied one
//! and touches the native API only for the fields that actually changed.
//!
//! ### Minimum requirements
//!
//! The OpenGL backend requires GL 3.3 (or ES 3.0) with vertex-array, sampler
//! and uniform-buffer objects. A headless backend with byte-accurate buffer
//! storage is available for tests and CI machines without a GPU.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

#[macro_use]
pub mod utils;
pub mod gfx;

pub mod prelude {
    pub use crate::gfx::prelude::*;
    pub use crate::utils::prelude::*;
}
