use crate::app::{Aabb, Vec2};

/// Screen size in pixels and the virtual world size mapped onto it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub virtual_width: f64,
    pub virtual_height: f64,
}

impl Viewport {
    /// Pixels per virtual unit along each axis.
    pub fn scale(&self) -> Vec2 {
        Vec2 {
            x: f64::from(self.width) / self.virtual_width.max(f64::EPSILON),
            y: f64::from(self.height) / self.virtual_height.max(f64::EPSILON),
        }
    }
}

/// Everything `show` needs besides the entity itself. `view_origin` is the
/// world point drawn at the center of the screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    pub viewport: Viewport,
    pub view_origin: Vec2,
}

impl RenderContext {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            view_origin: Vec2 {
                x: viewport.virtual_width * 0.5,
                y: viewport.virtual_height * 0.5,
            },
        }
    }

    pub fn with_view_origin(mut self, view_origin: Vec2) -> Self {
        self.view_origin = view_origin;
        self
    }
}

pub fn world_to_screen(world: Vec2, view_origin: Vec2, viewport: Viewport) -> (f64, f64) {
    let scale = viewport.scale();
    let x = (world.x - view_origin.x) * scale.x + f64::from(viewport.width) * 0.5;
    let y = f64::from(viewport.height) * 0.5 - (world.y - view_origin.y) * scale.y;
    (x, y)
}

/// Screen placement of a quad, plus the clip-space matrix for a unit quad
/// centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadTransform {
    pub center_px: (f32, f32),
    pub size_px: (f32, f32),
    pub clip_from_unit: [[f32; 4]; 4],
}

impl QuadTransform {
    pub fn from_world(area: Aabb, ctx: &RenderContext) -> Self {
        let viewport = ctx.viewport;
        let scale = viewport.scale();
        let (cx, cy) = world_to_screen(area.center(), ctx.view_origin, viewport);
        let width_px = area.size.x * scale.x;
        let height_px = area.size.y * scale.y;

        let screen_w = f64::from(viewport.width).max(1.0);
        let screen_h = f64::from(viewport.height).max(1.0);
        let ndc_x = cx / screen_w * 2.0 - 1.0;
        let ndc_y = 1.0 - cy / screen_h * 2.0;
        let sx = width_px / screen_w * 2.0;
        let sy = height_px / screen_h * 2.0;

        // Column-major: scale then translate.
        let clip_from_unit = [
            [sx as f32, 0.0, 0.0, 0.0],
            [0.0, sy as f32, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [ndc_x as f32, ndc_y as f32, 0.0, 1.0],
        ];

        Self {
            center_px: (cx as f32, cy as f32),
            size_px: (width_px as f32, height_px as f32),
            clip_from_unit,
        }
    }
}
