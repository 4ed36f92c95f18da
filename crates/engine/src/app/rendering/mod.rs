mod transform;

pub use transform::{world_to_screen, QuadTransform, RenderContext, Viewport};

/// Flat RGBA color, 8 bits per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "opaque")]
    pub a: u8,
}

fn opaque() -> u8 {
    u8::MAX
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: u8::MAX }
    }
}

/// One solid quad handed to the render collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawQuad {
    pub transform: QuadTransform,
    pub color: Rgba,
}

/// Render collaborator. The core only describes what to draw.
pub trait RenderSink {
    fn draw_quad(&mut self, quad: &DrawQuad);
}

impl RenderSink for Vec<DrawQuad> {
    fn draw_quad(&mut self, quad: &DrawQuad) {
        self.push(*quad);
    }
}
