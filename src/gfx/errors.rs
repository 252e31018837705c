#[derive(Debug, Fail)]
pub enum Error {
    /// The backend can not create a native resource. Fatal to that
    /// resource's initialization, never to the device.
    #[fail(display = "Failed to allocate {}: {}.", _0, _1)]
    Allocation(&'static str, String),
    /// A buffer operation addresses bytes outside the allocated extent. The
    /// operation is rejected before any byte is touched.
    #[fail(
        display = "Buffer range [{}, {}) is out of bounds (len {}).",
        offset, end, len
    )]
    OutOfRange {
        offset: usize,
        end: usize,
        len: usize,
    },
    /// A draw or bind call was issued without the required prior bindings,
    /// or against a resource whose creation flags forbid it.
    #[fail(display = "Invalid device state: {}.", _0)]
    InvalidState(String),
    /// Structural shader validation failed at construction time.
    #[fail(display = "Shader is invalid: {}.", _0)]
    ShaderInvalid(String),
    /// The attachment combination of a render target is rejected by the
    /// backend.
    #[fail(display = "Framebuffer is incomplete: {}.", _0)]
    FramebufferIncomplete(String),
    /// An enum value has no mapping on the active backend.
    #[fail(display = "{} is not supported by the {} backend.", _0, _1)]
    UnsupportedEnum(&'static str, &'static str),
    /// A stale or foreign handle was passed to the device.
    #[fail(display = "{} is invalid.", _0)]
    HandleInvalid(String),
    /// An error reported by the native driver after the fact. Only surfaced
    /// in debug builds; release builds rely on the device's own invariants.
    #[fail(display = "[GL] {}", _0)]
    Driver(String),
}

pub type Result<T> = ::std::result::Result<T, Error>;
