//! GPU image resources: immutable or dynamic 2d textures, the sampler states
//! that control how they are fetched, and render targets assembled from
//! renderable textures.

use cgmath::Vector2;
use smallvec::SmallVec;

use crate::gfx::errors::{Error, Result};
use crate::gfx::MAX_COLOR_ATTACHMENTS;
use crate::utils::color::Color;

impl_handle!(TextureHandle);
impl_handle!(SamplerHandle);
impl_handle!(RenderTargetHandle);

/// The setup parameters of a texture object.
#[derive(Debug, Copy, Clone)]
pub struct TextureParams {
    /// Sets the format of the pixel data.
    pub format: TextureFormat,
    /// What the texture will be used for. Renderable usages restrict the
    /// accepted formats.
    pub usage: TextureUsage,
    /// Sets the dimensions of the texture.
    pub dimensions: Vector2<u32>,
    /// The number of mip levels, including the base level. A chain can also
    /// be derived later from level 0 with `generate_mips`.
    pub levels: u32,
    /// Store the pixel data gamma-corrected (sRGB). Only meaningful for
    /// 8-bits color formats.
    pub srgb: bool,
}

impl Default for TextureParams {
    fn default() -> Self {
        TextureParams {
            format: TextureFormat::Rgba8,
            usage: TextureUsage::Default,
            dimensions: Vector2::new(0, 0),
            levels: 1,
            srgb: false,
        }
    }
}

impl TextureParams {
    pub fn validate(&self, data: Option<&[u8]>) -> Result<()> {
        if self.dimensions.x == 0 || self.dimensions.y == 0 {
            return Err(Error::Allocation(
                "Texture",
                format!("zero dimensions {:?}", self.dimensions),
            ));
        }

        if self.levels == 0 {
            return Err(Error::Allocation("Texture", "zero mip levels".into()));
        }

        match self.usage {
            TextureUsage::Default => {}
            TextureUsage::Depth | TextureUsage::DepthStencil => {
                if self.format.is_color() {
                    return Err(Error::Allocation(
                        "Texture",
                        format!("{:?} is not a depth format", self.format),
                    ));
                }
            }
        }

        // The native upload reads the whole base level from the slice, so
        // the length has to match exactly.
        if let Some(buf) = data {
            let len = self.format.size() as usize
                * self.dimensions.x as usize
                * self.dimensions.y as usize;
            if buf.len() != len {
                return Err(Error::OutOfRange {
                    offset: 0,
                    end: buf.len(),
                    len,
                });
            }
        }

        Ok(())
    }
}

/// What a texture will be used for.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum TextureUsage {
    /// Sampled in shaders, or attached to a render target as color.
    Default,
    /// Attached to a render target as depth.
    Depth,
    /// Attached to a render target as combined depth-stencil.
    DepthStencil,
}

/// List of all the possible formats of pixel data when uploading to a
/// texture, plus the renderable depth formats.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum TextureFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
    Rgba4,
    R16f,
    Rgba16f,
    R32f,
    Rgba32f,
    Depth16,
    Depth24,
    Depth32,
    Depth24Stencil8,
}

impl TextureFormat {
    /// Returns true for color-renderable/sampleable formats.
    pub fn is_color(self) -> bool {
        match self {
            TextureFormat::Depth16
            | TextureFormat::Depth24
            | TextureFormat::Depth32
            | TextureFormat::Depth24Stencil8 => false,
            _ => true,
        }
    }

    /// Returns the size in bytes of a pixel of this format.
    pub fn size(self) -> u8 {
        match self {
            TextureFormat::R8 => 1,
            TextureFormat::Rg8 | TextureFormat::Rgba4 | TextureFormat::R16f => 2,
            TextureFormat::Rgb8 | TextureFormat::Depth24 => 3,
            TextureFormat::Rgba8
            | TextureFormat::R32f
            | TextureFormat::Depth32
            | TextureFormat::Depth24Stencil8 => 4,
            TextureFormat::Depth16 => 2,
            TextureFormat::Rgba16f => 8,
            TextureFormat::Rgba32f => 16,
        }
    }
}

/// A rectangular region of a texture level, used for partial uploads.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureRegion {
    pub position: Vector2<u32>,
    pub size: Vector2<u32>,
}

impl TextureRegion {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        TextureRegion {
            position: Vector2::new(x, y),
            size: Vector2::new(w, h),
        }
    }
}

/// Sets the wrap parameter for one texture coordinate axis.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum SamplerAddress {
    /// Samples at coord x + 1 map to coord x.
    Repeat,
    /// Samples at coord x + 1 map to coord 1 - x.
    Mirror,
    /// Samples at coord x + 1 map to coord 1.
    Clamp,
    /// Samples outside [0, 1] map to the border color.
    Border,
}

/// Specifies how the texture is sampled whenever a pixel is fetched.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum SamplerFilter {
    /// Returns the texture element nearest to the center of the pixel.
    Nearest,
    /// Returns the weighted average of the four closest texture elements.
    Linear,
    /// Nearest within a mip level, nearest mip level.
    NearestMipNearest,
    /// Nearest within a mip level, blended between mip levels.
    NearestMipLinear,
    /// Linear within a mip level, nearest mip level.
    LinearMipNearest,
    /// Linear within a mip level, blended between mip levels. Trilinear.
    LinearMipLinear,
}

impl SamplerFilter {
    /// Returns true if this filter reads from mip levels beyond the base.
    pub fn mipped(self) -> bool {
        match self {
            SamplerFilter::Nearest | SamplerFilter::Linear => false,
            _ => true,
        }
    }
}

/// The setup parameters of a sampler state. Once a sampler has been
/// initialized its parameters are immutable; re-applying a configuration to
/// an initialized sampler is a no-op, not an error.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SamplerParams {
    /// Wrap parameter per texture coordinate axis, in (u, v, w) order.
    pub address: (SamplerAddress, SamplerAddress, SamplerAddress),
    /// Filter applied when the texture is minified.
    pub min_filter: SamplerFilter,
    /// Filter applied when the texture is magnified. Magnification never
    /// reads mips, so mip variants are rejected at creation.
    pub mag_filter: SamplerFilter,
    /// The color sampled outside [0, 1] under `SamplerAddress::Border`.
    pub border: Color,
}

impl Default for SamplerParams {
    fn default() -> Self {
        SamplerParams {
            address: (
                SamplerAddress::Clamp,
                SamplerAddress::Clamp,
                SamplerAddress::Clamp,
            ),
            min_filter: SamplerFilter::Linear,
            mag_filter: SamplerFilter::Linear,
            border: Color::transparent(),
        }
    }
}

impl SamplerParams {
    pub fn validate(&self) -> Result<()> {
        if self.mag_filter.mipped() {
            return Err(Error::Allocation(
                "Sampler",
                format!(
                    "magnification filter {:?} reads mip levels",
                    self.mag_filter
                ),
            ));
        }

        Ok(())
    }
}

/// The setup parameters of a render target: an attachment set of up to
/// `MAX_COLOR_ATTACHMENTS` color textures plus one optional depth or
/// depth-stencil texture. A target with no color attachments configures the
/// backend for depth-only rendering.
#[derive(Debug, Clone, Default)]
pub struct RenderTargetParams {
    pub colors: SmallVec<[TextureHandle; MAX_COLOR_ATTACHMENTS]>,
    pub depth_stencil: Option<TextureHandle>,
}

impl RenderTargetParams {
    pub fn validate(&self) -> Result<()> {
        if self.colors.is_empty() && self.depth_stencil.is_none() {
            return Err(Error::FramebufferIncomplete(
                "no attachments of any kind".into(),
            ));
        }

        if self.colors.len() > MAX_COLOR_ATTACHMENTS {
            return Err(Error::FramebufferIncomplete(format!(
                "too many color attachments ({} > {})",
                self.colors.len(),
                MAX_COLOR_ATTACHMENTS
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn texture_validation() {
        let params = TextureParams {
            dimensions: Vector2::new(4, 4),
            ..Default::default()
        };
        assert!(params.validate(None).is_ok());
        assert!(params.validate(Some(&[0; 64])).is_ok());
        assert!(params.validate(Some(&[0; 65])).is_err());
        // A short slice is rejected too; the upload reads the whole level.
        assert!(params.validate(Some(&[0; 63])).is_err());

        let params = TextureParams::default();
        assert!(params.validate(None).is_err());
    }

    #[test]
    fn sampler_magnification_never_mips() {
        assert!(SamplerParams::default().validate().is_ok());

        let params = SamplerParams {
            min_filter: SamplerFilter::LinearMipLinear,
            ..Default::default()
        };
        assert!(params.validate().is_ok());

        let params = SamplerParams {
            mag_filter: SamplerFilter::LinearMipLinear,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn depth_usage_rejects_color_formats() {
        let params = TextureParams {
            format: TextureFormat::Rgba8,
            usage: TextureUsage::Depth,
            dimensions: Vector2::new(4, 4),
            ..Default::default()
        };
        assert!(params.validate(None).is_err());

        let params = TextureParams {
            format: TextureFormat::Depth24,
            usage: TextureUsage::Depth,
            dimensions: Vector2::new(4, 4),
            ..Default::default()
        };
        assert!(params.validate(None).is_ok());
    }

    #[test]
    fn render_target_needs_attachments() {
        let params = RenderTargetParams::default();
        assert!(params.validate().is_err());

        let mut params = RenderTargetParams::default();
        params.depth_stencil = Some(TextureHandle::default());
        assert!(params.validate().is_ok());
    }
}
