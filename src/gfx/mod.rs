//! The backend-agnostic render device: GPU resource lifecycle, pipeline and
//! vertex-array caches, bound-state tracking and draw submission.

pub mod assets;
pub mod backends;
pub mod device;
pub mod errors;

/// Maximum number of shader stages a pipeline can link. Vertex, pixel,
/// geometry, hull and domain, in that order.
pub const MAX_SHADER_STAGES: usize = 5;
/// Maximum number of attributes in a vertex layout.
pub const MAX_VERTEX_ATTRIBUTES: usize = 8;
/// Maximum number of vertex buffer bind slots.
pub const MAX_VERTEX_BUFFER_SLOTS: usize = 4;
/// Maximum number of color attachments of a render target.
pub const MAX_COLOR_ATTACHMENTS: usize = 8;
/// Maximum number of texture/sampler bind slots.
pub const MAX_TEXTURE_SLOTS: usize = 8;
/// Maximum number of constant buffer bind slots.
pub const MAX_CONSTANT_BUFFER_SLOTS: usize = 8;

pub mod prelude {
    pub use super::assets::prelude::*;
    pub use super::backends::Viewport;
    pub use super::device::{ClearFlags, DeviceInfo, RenderDevice};
    pub use super::errors::{Error, Result};
}
