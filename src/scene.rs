//! Locally rendered layers: the painter they draw through, the capability
//! trait the compositor invokes, and the stock bouncing-ball layer.

use std::f64::consts::PI;

use kurbo::{Circle, Point, Shape as _};

use crate::foundation::core::{Extent, Rgba8};
use crate::foundation::error::{GlazeError, GlazeResult};

/// One frame of recorded local drawing, rasterized onto the presentation
/// surface's back buffer after every layer has contributed.
pub struct Painter {
    ctx: vello_cpu::RenderContext,
}

impl Painter {
    pub fn new(extent: Extent) -> GlazeResult<Self> {
        let width: u16 = extent
            .width
            .try_into()
            .map_err(|_| GlazeError::surface("painter width exceeds u16"))?;
        let height: u16 = extent
            .height
            .try_into()
            .map_err(|_| GlazeError::surface("painter height exceeds u16"))?;
        let mut ctx = vello_cpu::RenderContext::new(width, height);
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        Ok(Self { ctx })
    }

    /// Queue a filled circle at `center`.
    pub fn fill_circle(&mut self, center: Point, radius: f64, color: Rgba8) {
        self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            color.r, color.g, color.b, color.a,
        ));
        let path = Circle::new(center, radius).to_path(0.1);
        self.ctx.fill_path(&bezpath_to_cpu(&path));
    }

    pub(crate) fn render_onto(mut self, pixmap: &mut vello_cpu::Pixmap) {
        self.ctx.flush();
        self.ctx.render_to_pixmap(pixmap);
    }
}

fn point_to_cpu(p: kurbo::Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &kurbo::BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

/// A drawable layer invoked by the compositor on every redraw, in
/// registration order, below the browser buffer.
pub trait Renderable: Send {
    fn render(&mut self, painter: &mut Painter, width: u32, height: u32, elapsed_secs: f64);
}

/// Bouncing ball: advances along its heading and reflects off the surface
/// edges.
pub struct Ball {
    x: f64,
    y: f64,
    radius: f64,
    speed: f64,
    angle: f64,
    color: Rgba8,
}

impl Ball {
    pub fn new(x: f64, y: f64, radius: f64, speed: f64, angle: f64, color: Rgba8) -> Self {
        Self {
            x,
            y,
            radius,
            speed,
            angle,
            color,
        }
    }

    /// Spawn at `(x, y)` with radius, speed, heading, and color drawn
    /// deterministically from `seed`.
    pub fn seeded(x: f64, y: f64, seed: u64) -> Self {
        let mut state = seed;
        let mut draw = move || {
            state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
            mix64(state)
        };
        let radius = 10.0 + (draw() % 100) as f64;
        let speed = 200.0 + (draw() % 200) as f64;
        let angle = (20 + draw() % 20) as f64;
        let color = Rgba8::opaque(
            (draw() % 255) as u8,
            (draw() % 255) as u8,
            (draw() % 255) as u8,
        );
        Self::new(x, y, radius, speed, angle, color)
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn heading(&self) -> f64 {
        self.angle
    }

    fn advance(&mut self, width: f64, height: f64, dt: f64) {
        self.x += self.speed * dt * self.angle.cos();
        self.y += self.speed * dt * self.angle.sin();

        if self.x < 0.0 {
            self.x = 0.0;
            self.angle = PI - self.angle;
        } else if self.x > width {
            self.x = width;
            self.angle = PI - self.angle;
        }

        if self.y < 0.0 {
            self.y = 0.0;
            self.angle = -self.angle;
        } else if self.y > height {
            self.y = height;
            self.angle = -self.angle;
        }
    }
}

impl Renderable for Ball {
    fn render(&mut self, painter: &mut Painter, width: u32, height: u32, elapsed_secs: f64) {
        self.advance(f64::from(width), f64::from(height), elapsed_secs);
        painter.fill_circle(Point::new(self.x, self.y), self.radius, self.color);
    }
}

fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
