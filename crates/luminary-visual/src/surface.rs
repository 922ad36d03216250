use std::fmt::Write as _;

/// Logical size of the render surface.
pub const SURFACE_SIZE: f32 = 600.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 8-bit colour with a floating point alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn from_array(rgb: [u8; 3]) -> Self {
        Self::rgb(rgb[0], rgb[1], rgb[2])
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Parses `#rrggbb`.
    pub fn parse_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
        Some(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_css(&self) -> String {
        format!("rgba({},{},{},{})", self.r, self.g, self.b, self.a)
    }
}

/// How new drawing combines with what is already on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    SourceOver,
    /// Additive.
    Lighter,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub blur: f32,
    pub color: Rgba,
}

/// Outline or fill of a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Rgba,
    pub width: f32,
}

/// 2-D drawing target receiving one composited frame per callback.
pub trait Surface {
    fn size(&self) -> (f32, f32);

    /// Marks the start of a new frame.
    fn begin_frame(&mut self) {}

    /// Wipes everything drawn so far.
    fn clear(&mut self);

    fn set_blend(&mut self, mode: BlendMode);

    fn set_alpha(&mut self, alpha: f32);

    fn set_shadow(&mut self, shadow: Option<Shadow>);

    fn fill_rect(&mut self, origin: Point, width: f32, height: f32, color: Rgba);

    fn fill_circle(&mut self, center: Point, radius: f32, color: Rgba);

    fn stroke_circle(&mut self, center: Point, radius: f32, stroke: Stroke);

    /// Closed polygon through `points`.
    fn polygon(&mut self, points: &[Point], stroke: Option<Stroke>, fill: Option<Rgba>);

    /// Square dots of side `size` at each point.
    fn plot_points(&mut self, points: &mut dyn Iterator<Item = Point>, size: f32, color: Rgba);
}

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Blend(BlendMode),
    Alpha(f32),
    Shadow(Option<Shadow>),
    FillRect {
        origin: Point,
        width: f32,
        height: f32,
        color: Rgba,
    },
    FillCircle {
        center: Point,
        radius: f32,
        color: Rgba,
    },
    StrokeCircle {
        center: Point,
        radius: f32,
        stroke: Stroke,
    },
    Polygon {
        points: Vec<Point>,
        stroke: Option<Stroke>,
        fill: Option<Rgba>,
    },
    Points {
        points: Vec<Point>,
        size: f32,
        color: Rgba,
    },
}

/// Surface that records the calls of the current frame.
#[derive(Debug, Clone)]
pub struct DisplayList {
    width: f32,
    height: f32,
    ops: Vec<DrawOp>,
    frames: u64,
    clears: u64,
}

impl Default for DisplayList {
    fn default() -> Self {
        Self::new(SURFACE_SIZE, SURFACE_SIZE)
    }
}

impl DisplayList {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
            frames: 0,
            clears: 0,
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn is_blank(&self) -> bool {
        self.ops.is_empty()
    }

    /// Frames begun since creation.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn clears(&self) -> u64 {
        self.clears
    }

    pub fn count(&self, matches: impl Fn(&DrawOp) -> bool) -> usize {
        self.ops.iter().filter(|op| matches(op)).count()
    }

    /// Renders the recorded frame as a standalone SVG document.
    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );
        let _ = writeln!(
            svg,
            r#"<rect width="{}" height="{}" fill="rgb(10,10,35)"/>"#,
            self.width, self.height
        );
        let mut blend = BlendMode::SourceOver;
        let mut alpha = 1.0f32;
        for op in &self.ops {
            let style = match blend {
                BlendMode::SourceOver => String::new(),
                BlendMode::Lighter => r#" style="mix-blend-mode:plus-lighter""#.to_string(),
            };
            match op {
                DrawOp::Blend(mode) => blend = *mode,
                DrawOp::Alpha(value) => alpha = *value,
                DrawOp::Shadow(_) => {}
                DrawOp::FillRect {
                    origin,
                    width,
                    height,
                    color,
                } => {
                    let _ = writeln!(
                        svg,
                        r#"<rect x="{:.2}" y="{:.2}" width="{}" height="{}" fill="{}" opacity="{}"{style}/>"#,
                        origin.x,
                        origin.y,
                        width,
                        height,
                        color.to_css(),
                        alpha
                    );
                }
                DrawOp::FillCircle {
                    center,
                    radius,
                    color,
                } => {
                    let _ = writeln!(
                        svg,
                        r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}" opacity="{}"{style}/>"#,
                        center.x,
                        center.y,
                        radius,
                        color.to_css(),
                        alpha
                    );
                }
                DrawOp::StrokeCircle {
                    center,
                    radius,
                    stroke,
                } => {
                    let _ = writeln!(
                        svg,
                        r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="none" stroke="{}" stroke-width="{}" opacity="{}"{style}/>"#,
                        center.x,
                        center.y,
                        radius.max(0.0),
                        stroke.color.to_css(),
                        stroke.width,
                        alpha
                    );
                }
                DrawOp::Polygon {
                    points,
                    stroke,
                    fill,
                } => {
                    let path = points
                        .iter()
                        .map(|point| format!("{:.2},{:.2}", point.x, point.y))
                        .collect::<Vec<_>>()
                        .join(" ");
                    let fill = fill.map_or_else(|| "none".to_string(), |color| color.to_css());
                    let (stroke_color, stroke_width) = stroke.map_or_else(
                        || ("none".to_string(), 0.0),
                        |stroke| (stroke.color.to_css(), stroke.width),
                    );
                    let _ = writeln!(
                        svg,
                        r#"<polygon points="{path}" fill="{fill}" stroke="{stroke_color}" stroke-width="{stroke_width}" opacity="{alpha}"{style}/>"#
                    );
                }
                DrawOp::Points {
                    points,
                    size,
                    color,
                } => {
                    let _ = writeln!(svg, r#"<g fill="{}" opacity="{alpha}"{style}>"#, color.to_css());
                    for point in points {
                        let _ = writeln!(
                            svg,
                            r#"<rect x="{:.2}" y="{:.2}" width="{size}" height="{size}"/>"#,
                            point.x, point.y
                        );
                    }
                    svg.push_str("</g>\n");
                }
            }
        }
        svg.push_str("</svg>\n");
        svg
    }
}

impl Surface for DisplayList {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn begin_frame(&mut self) {
        self.ops.clear();
        self.frames += 1;
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.clears += 1;
    }

    fn set_blend(&mut self, mode: BlendMode) {
        self.ops.push(DrawOp::Blend(mode));
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.ops.push(DrawOp::Alpha(alpha));
    }

    fn set_shadow(&mut self, shadow: Option<Shadow>) {
        self.ops.push(DrawOp::Shadow(shadow));
    }

    fn fill_rect(&mut self, origin: Point, width: f32, height: f32, color: Rgba) {
        self.ops.push(DrawOp::FillRect {
            origin,
            width,
            height,
            color,
        });
    }

    fn fill_circle(&mut self, center: Point, radius: f32, color: Rgba) {
        self.ops.push(DrawOp::FillCircle {
            center,
            radius,
            color,
        });
    }

    fn stroke_circle(&mut self, center: Point, radius: f32, stroke: Stroke) {
        self.ops.push(DrawOp::StrokeCircle {
            center,
            radius,
            stroke,
        });
    }

    fn polygon(&mut self, points: &[Point], stroke: Option<Stroke>, fill: Option<Rgba>) {
        self.ops.push(DrawOp::Polygon {
            points: points.to_vec(),
            stroke,
            fill,
        });
    }

    fn plot_points(&mut self, points: &mut dyn Iterator<Item = Point>, size: f32, color: Rgba) {
        self.ops.push(DrawOp::Points {
            points: points.collect(),
            size,
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_profile_colours() {
        assert_eq!(Rgba::parse_hex("#ff4500"), Some(Rgba::rgb(255, 69, 0)));
        assert_eq!(Rgba::parse_hex("#1E90FF"), Some(Rgba::rgb(30, 144, 255)));
        assert_eq!(Rgba::parse_hex("ff4500"), None);
        assert_eq!(Rgba::parse_hex("#ff45"), None);
        assert_eq!(Rgba::parse_hex("#gg4500"), None);
    }

    #[test]
    fn begin_frame_keeps_only_current_frame() {
        let mut list = DisplayList::default();
        list.begin_frame();
        list.fill_circle(Point::new(1.0, 1.0), 2.0, Rgba::rgb(1, 2, 3));
        list.begin_frame();
        assert!(list.is_blank());
        assert_eq!(list.frames(), 2);
    }

    #[test]
    fn svg_contains_every_shape() {
        let mut list = DisplayList::new(10.0, 10.0);
        list.set_blend(BlendMode::Lighter);
        list.fill_circle(Point::new(5.0, 5.0), 1.0, Rgba::rgb(0, 255, 127).with_alpha(0.5));
        list.set_blend(BlendMode::SourceOver);
        list.polygon(
            &[Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(0.0, 1.0)],
            Some(Stroke {
                color: Rgba::rgb(255, 255, 255),
                width: 1.0,
            }),
            None,
        );
        list.plot_points(&mut [Point::new(2.0, 2.0)].into_iter(), 1.0, Rgba::rgb(9, 9, 9));

        let svg = list.to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("plus-lighter"));
        assert!(svg.contains("rgba(0,255,127,0.5)"));
        assert!(svg.contains("<polygon points=\"0.00,0.00 1.00,0.00 0.00,1.00\""));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
