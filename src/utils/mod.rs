//! Commonly used utilities like handles, pools and hashers.

#[macro_use]
pub mod handle;
pub mod color;
pub mod handle_pool;
pub mod hash;
pub mod object_pool;

pub mod prelude {
    pub use super::color::Color;
    pub use super::handle::{Handle, HandleIndex, HandleLike};
    pub use super::handle_pool::HandlePool;
    pub use super::hash::{FastHashMap, FastHashSet};
    pub use super::object_pool::ObjectPool;
}
