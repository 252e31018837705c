//! Vertex and index buffer views over raw GPU buffers, and the vertex layout
//! describing how a single vertex structure looks like.

use crate::gfx::errors::{Error, Result};
use crate::gfx::MAX_VERTEX_ATTRIBUTES;

impl_handle!(VertexBufferHandle);
impl_handle!(IndexBufferHandle);

/// The pre-defined and named attribute slots of a vertex component,
/// describing what the component is used for. Attribute locations in shader
/// sources follow this order.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum VertexSemantic {
    Position = 0,
    Normal = 1,
    Tangent = 2,
    Bitangent = 3,
    Texcoord0 = 4,
    Texcoord1 = 5,
    Color0 = 6,
    Color1 = 7,
}

impl VertexSemantic {
    /// The fixed attribute location this semantic is bound to at pipeline
    /// link time.
    #[inline]
    pub fn location(self) -> u32 {
        self as u32
    }

    /// The canonical attribute name in shader sources.
    pub fn name(self) -> &'static str {
        match self {
            VertexSemantic::Position => "Position",
            VertexSemantic::Normal => "Normal",
            VertexSemantic::Tangent => "Tangent",
            VertexSemantic::Bitangent => "Bitangent",
            VertexSemantic::Texcoord0 => "Texcoord0",
            VertexSemantic::Texcoord1 => "Texcoord1",
            VertexSemantic::Color0 => "Color0",
            VertexSemantic::Color1 => "Color1",
        }
    }
}

/// The data type of each component of a vertex element.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum VertexFormat {
    Byte,
    UByte,
    Short,
    UShort,
    Float,
}

impl VertexFormat {
    /// The size in bytes of a single component of this format.
    pub fn stride(self) -> u8 {
        match self {
            VertexFormat::Byte | VertexFormat::UByte => 1,
            VertexFormat::Short | VertexFormat::UShort => 2,
            VertexFormat::Float => 4,
        }
    }
}

/// The details of a single vertex attribute.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct VertexAttribute {
    /// What this attribute is used for.
    pub semantic: VertexSemantic,
    /// The data type of each component of this element.
    pub format: VertexFormat,
    /// The number of components per generic vertex element, in [1, 4].
    pub size: u8,
    /// Whether fixed-point data values should be normalized.
    pub normalized: bool,
}

impl Default for VertexAttribute {
    fn default() -> Self {
        VertexAttribute {
            semantic: VertexSemantic::Position,
            format: VertexFormat::Byte,
            size: 0,
            normalized: false,
        }
    }
}

/// `VertexLayout` defines how a single vertex structure looks like. A vertex
/// layout is an ordered collection of vertex attributes with interleaved
/// offsets derived from the attribute formats.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Hash)]
pub struct VertexLayout {
    stride: u8,
    len: u8,
    offset: [u8; MAX_VERTEX_ATTRIBUTES],
    elements: [VertexAttribute; MAX_VERTEX_ATTRIBUTES],
}

impl VertexLayout {
    /// Creates a new, empty `VertexLayoutBuilder`.
    #[inline]
    pub fn build() -> VertexLayoutBuilder {
        VertexLayoutBuilder::new()
    }

    /// Stride of a single vertex structure.
    #[inline]
    pub fn stride(&self) -> u8 {
        self.stride
    }

    /// Returns the number of attributes in the layout.
    #[inline]
    pub fn len(&self) -> u8 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Relative element offset of `semantic` from the start of a vertex.
    pub fn offset(&self, semantic: VertexSemantic) -> Option<u8> {
        for i in 0..self.len as usize {
            if self.elements[i].semantic == semantic {
                return Some(self.offset[i]);
            }
        }

        None
    }

    /// Returns the named attribute from the layout.
    pub fn element(&self, semantic: VertexSemantic) -> Option<VertexAttribute> {
        for i in 0..self.len as usize {
            if self.elements[i].semantic == semantic {
                return Some(self.elements[i]);
            }
        }

        None
    }

    /// Returns an iterator over the attributes with their interleaved
    /// offsets.
    pub fn iter(&self) -> impl Iterator<Item = (VertexAttribute, u8)> + '_ {
        (0..self.len as usize).map(move |i| (self.elements[i], self.offset[i]))
    }
}

/// Helper structure to build a vertex layout.
#[derive(Default)]
pub struct VertexLayoutBuilder(VertexLayout);

impl VertexLayoutBuilder {
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends an attribute, or overrides it if the semantic is already in
    /// the layout.
    pub fn with(
        &mut self,
        semantic: VertexSemantic,
        format: VertexFormat,
        size: u8,
        normalized: bool,
    ) -> &mut Self {
        assert!(size > 0 && size <= 4);

        let desc = VertexAttribute {
            semantic,
            format,
            size,
            normalized,
        };

        for i in 0..self.0.len as usize {
            if self.0.elements[i].semantic == semantic {
                self.0.elements[i] = desc;
                return self;
            }
        }

        assert!((self.0.len as usize) < MAX_VERTEX_ATTRIBUTES);
        self.0.elements[self.0.len as usize] = desc;
        self.0.len += 1;

        self
    }

    #[inline]
    pub fn finish(&mut self) -> VertexLayout {
        self.0.stride = 0;
        for i in 0..self.0.len as usize {
            let len = self.0.elements[i].size * self.0.elements[i].format.stride();
            self.0.offset[i] = self.0.stride;
            self.0.stride += len;
        }
        self.0
    }
}

/// Defines how the input vertex data is used to assemble primitives.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Primitive {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

impl Primitive {
    /// The number of primitives assembled from `vertices` vertices.
    pub fn assemble(self, vertices: u32) -> u32 {
        match self {
            Primitive::Points => vertices,
            Primitive::Lines => vertices / 2,
            Primitive::LineStrip => vertices.saturating_sub(1),
            Primitive::Triangles => vertices / 3,
            Primitive::TriangleStrip => vertices.saturating_sub(2),
        }
    }
}

/// Vertex indices can be either 16- or 32-bits. Always prefer 16-bits
/// indices: 32-bits indices take twice as much memory and have performance
/// penalties on some platforms.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    /// The size in bytes of one index.
    pub fn stride(self) -> usize {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// The setup parameters of a vertex buffer. A vertex buffer constrains a raw
/// GPU buffer to hold `count` vertices of `layout`; the byte length is
/// derived once at construction and immutable thereafter.
#[derive(Debug, Copy, Clone)]
pub struct VertexBufferParams {
    /// How a single vertex structure looks like.
    pub layout: VertexLayout,
    /// The number of vertices.
    pub count: usize,
    /// Hint about the intended update strategy of the data.
    pub usage: super::buffer::BufferUsage,
}

impl VertexBufferParams {
    /// The derived byte length of the underlying buffer storage.
    #[inline]
    pub fn len(&self) -> usize {
        self.count * self.layout.stride() as usize
    }

    pub fn validate(&self) -> Result<()> {
        if self.layout.is_empty() {
            return Err(Error::Allocation(
                "VertexBuffer",
                "vertex layout has no attributes".into(),
            ));
        }

        Ok(())
    }
}

/// The setup parameters of an index buffer. The byte length is always
/// `count * format.stride()`, derived once at construction.
#[derive(Debug, Copy, Clone)]
pub struct IndexBufferParams {
    /// The width of a single index.
    pub format: IndexFormat,
    /// The number of indices.
    pub count: usize,
    /// Hint about the intended update strategy of the data.
    pub usage: super::buffer::BufferUsage,
}

impl IndexBufferParams {
    /// The derived byte length of the underlying buffer storage.
    #[inline]
    pub fn len(&self) -> usize {
        self.count * self.format.stride()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn layout() {
        let layout = VertexLayout::build()
            .with(VertexSemantic::Position, VertexFormat::Float, 3, false)
            .with(VertexSemantic::Texcoord0, VertexFormat::Float, 2, false)
            .finish();

        assert_eq!(layout.stride(), 20);
        assert_eq!(layout.offset(VertexSemantic::Position), Some(0));
        assert_eq!(layout.offset(VertexSemantic::Texcoord0), Some(12));
        assert_eq!(layout.offset(VertexSemantic::Normal), None);

        let element = layout.element(VertexSemantic::Position).unwrap();
        assert_eq!(element.format, VertexFormat::Float);
        assert_eq!(element.size, 3);
    }

    #[test]
    fn layout_rewrite() {
        let layout = VertexLayout::build()
            .with(VertexSemantic::Position, VertexFormat::Byte, 1, false)
            .with(VertexSemantic::Texcoord0, VertexFormat::Float, 2, true)
            .with(VertexSemantic::Position, VertexFormat::Float, 3, false)
            .finish();

        assert_eq!(layout.stride(), 20);
        assert_eq!(layout.offset(VertexSemantic::Position), Some(0));
        assert_eq!(layout.offset(VertexSemantic::Texcoord0), Some(12));
    }

    #[test]
    fn index_len() {
        for count in &[0usize, 1, 3, 65536] {
            let params = IndexBufferParams {
                format: IndexFormat::U16,
                count: *count,
                usage: super::super::buffer::BufferUsage::Default,
            };
            assert_eq!(params.len(), count * 2);

            let params = IndexBufferParams {
                format: IndexFormat::U32,
                count: *count,
                usage: super::super::buffer::BufferUsage::Default,
            };
            assert_eq!(params.len(), count * 4);
        }
    }

    #[test]
    fn assemble() {
        assert_eq!(Primitive::Triangles.assemble(6), 2);
        assert_eq!(Primitive::TriangleStrip.assemble(6), 4);
        assert_eq!(Primitive::TriangleStrip.assemble(0), 0);
    }
}
