/// A RGBA `Color`. Each color component is a floating point value
/// with a range from 0 to 1.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color(pub f32, pub f32, pub f32, pub f32);

impl Color {
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color(r, g, b, a)
    }

    pub fn black() -> Self {
        Color(0.0, 0.0, 0.0, 1.0)
    }

    pub fn transparent() -> Self {
        Color(0.0, 0.0, 0.0, 0.0)
    }

    pub fn r(&self) -> f32 {
        self.0
    }

    pub fn g(&self) -> f32 {
        self.1
    }

    pub fn b(&self) -> f32 {
        self.2
    }

    pub fn a(&self) -> f32 {
        self.3
    }
}

impl From<u32> for Color {
    fn from(encoded: u32) -> Self {
        Color(
            ((encoded >> 24) & 0xFF) as f32 / 255.0,
            ((encoded >> 16) & 0xFF) as f32 / 255.0,
            ((encoded >> 8) & 0xFF) as f32 / 255.0,
            (encoded & 0xFF) as f32 / 255.0,
        )
    }
}

impl From<Color> for [f32; 4] {
    fn from(v: Color) -> Self {
        [v.0, v.1, v.2, v.3]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encoded() {
        assert_eq!(Color::from(0xFF00_00FF), Color(1.0, 0.0, 0.0, 1.0));
        assert_eq!(Color::from(0x0000_00FF), Color(0.0, 0.0, 0.0, 1.0));
    }
}
