use gl;
use gl::types::*;
use std::cmp;
use std::ffi;

use crate::gfx::errors::{Error, Result};

/// Describes a version.
///
/// A version can only be compared to another version if they belong to the
/// same API. For example, both `Version::GL(3, 0) >= Version::ES(3, 0)` and
/// `Version::ES(3, 0) >= Version::GL(3, 0)` return `false`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Version {
    /// Regular OpenGL.
    GL(u8, u8),
    /// OpenGL embedded system.
    ES(u8, u8),
}

impl PartialOrd for Version {
    #[inline]
    fn partial_cmp(&self, other: &Version) -> Option<cmp::Ordering> {
        let (es1, major1, minor1) = match *self {
            Version::GL(major, minor) => (false, major, minor),
            Version::ES(major, minor) => (true, major, minor),
        };

        let (es2, major2, minor2) = match *other {
            Version::GL(major, minor) => (false, major, minor),
            Version::ES(major, minor) => (true, major, minor),
        };

        if es1 != es2 {
            None
        } else {
            match major1.cmp(&major2) {
                cmp::Ordering::Equal => Some(minor1.cmp(&minor2)),
                v => Some(v),
            }
        }
    }
}

impl Version {
    /// Obtains the OpenGL version of the current context using the loaded
    /// functions. The functions must belong to the current context.
    pub unsafe fn parse() -> Result<Version> {
        let desc = gl::GetString(gl::VERSION);
        let desc = String::from_utf8(ffi::CStr::from_ptr(desc as *const _).to_bytes().to_vec())
            .map_err(|_| Error::Driver("version string is malformed".into()))?;

        let (es, desc) = if desc.starts_with("OpenGL ES ") {
            (true, &desc[10..])
        } else if desc.starts_with("OpenGL ES-") {
            (true, &desc[13..])
        } else {
            (false, &desc[..])
        };

        let desc = desc
            .split(' ')
            .next()
            .ok_or_else(|| Error::Driver("version string is malformed".into()))?;

        let mut iter = desc.split(move |c: char| c == '.');
        let major = iter
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| Error::Driver("version string is malformed".into()))?;
        let minor = iter
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| Error::Driver("version string is malformed".into()))?;

        if es {
            Ok(Version::ES(major, minor))
        } else {
            Ok(Version::GL(major, minor))
        }
    }
}

macro_rules! extensions {
    ($($string:expr => $field:ident,)+) => {
        /// Contains data about the list of extensions.
        #[derive(Debug, Clone, Copy)]
        pub struct Extensions {
            $(
                pub $field: bool,
            )+
        }

        impl Extensions {
            /// Returns the list of extensions supported by the backend. The
            /// OpenGL context must be current in the calling thread.
            pub unsafe fn parse(version: Version) -> Result<Extensions> {
                let strings: Vec<String> = if version >= Version::GL(3, 0) || version >= Version::ES(3, 0) {
                    let mut num_extensions = 0;
                    gl::GetIntegerv(gl::NUM_EXTENSIONS, &mut num_extensions);
                    (0..num_extensions)
                        .filter_map(|i| {
                            let ext = gl::GetStringi(gl::EXTENSIONS, i as GLuint);
                            String::from_utf8(
                                ffi::CStr::from_ptr(ext as *const _).to_bytes().to_vec(),
                            )
                            .ok()
                        })
                        .collect()
                } else {
                    let list = gl::GetString(gl::EXTENSIONS);
                    if list.is_null() {
                        return Err(Error::Driver("extension string is null".into()));
                    }

                    let list = String::from_utf8(
                        ffi::CStr::from_ptr(list as *const _).to_bytes().to_vec(),
                    )
                    .map_err(|_| Error::Driver("extension string is malformed".into()))?;
                    list.split(' ').map(|e| e.to_owned()).collect()
                };

                let mut extensions = Extensions {
                    $(
                        $field: false,
                    )+
                };

                for extension in strings {
                    match &extension[..] {
                        $(
                            $string => extensions.$field = true,
                        )+
                        _ => ()
                    }
                }

                Ok(extensions)
            }
        }
    }
}

extensions! {
    "GL_ARB_map_buffer_range" => gl_arb_map_buffer_range,
    "GL_ARB_copy_buffer" => gl_arb_copy_buffer,
    "GL_ARB_uniform_buffer_object" => gl_arb_uniform_buffer_object,
    "GL_ARB_framebuffer_object" => gl_arb_framebuffer_object,
    "GL_ARB_vertex_array_object" => gl_arb_vertex_array_object,
    "GL_ARB_sampler_objects" => gl_arb_sampler_objects,
    "GL_ARB_draw_elements_base_vertex" => gl_arb_draw_elements_base_vertex,
    "GL_EXT_texture_sRGB" => gl_ext_texture_srgb,
}

/// Represents the capabilities of the context.
///
/// Contrary to the state, these values never change.
#[derive(Debug)]
pub struct Capabilities {
    /// Returns a version or release number. Vendor-specific information may
    /// follow the version number.
    pub version: Version,
    /// The company responsible for this GL implementation.
    pub vendor: String,
    /// The name of the renderer, typically specific to a particular
    /// configuration of a hardware platform.
    pub renderer: String,
    /// The list of OpenGL extensions supported by this implementation.
    pub extensions: Extensions,
    /// Maximum number of color attachment bind points.
    pub max_color_attachments: u32,
    /// Maximum number of textures that can be bound to a program.
    pub max_combined_texture_image_units: u32,
    /// Number of available buffer bind points for `GL_UNIFORM_BUFFER`.
    pub max_uniform_buffer_bindings: u32,
}

impl Capabilities {
    pub unsafe fn parse() -> Result<Capabilities> {
        let version = Version::parse()?;
        let extensions = Extensions::parse(version)?;

        Ok(Capabilities {
            version,
            extensions,
            vendor: Capabilities::parse_str(gl::VENDOR)?,
            renderer: Capabilities::parse_str(gl::RENDERER)?,
            max_color_attachments: Capabilities::parse_integer(gl::MAX_COLOR_ATTACHMENTS),
            max_combined_texture_image_units: Capabilities::parse_integer(
                gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS,
            ),
            max_uniform_buffer_bindings: Capabilities::parse_integer(
                gl::MAX_UNIFORM_BUFFER_BINDINGS,
            ),
        })
    }

    #[inline]
    unsafe fn parse_str(id: GLenum) -> Result<String> {
        let s = gl::GetString(id);
        if s.is_null() {
            return Err(Error::Driver(format!("string of {} is null", id)));
        }

        String::from_utf8(ffi::CStr::from_ptr(s as *const _).to_bytes().to_vec())
            .map_err(|_| Error::Driver(format!("string of {} is malformed", id)))
    }

    #[inline]
    unsafe fn parse_integer(id: GLenum) -> u32 {
        let mut val = 0;
        gl::GetIntegerv(id, &mut val);
        val as u32
    }
}
