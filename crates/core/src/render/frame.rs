use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: String,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Fill {
    /// Linear gradient running from the top of the surface to the bottom.
    VerticalGradient { top: String, bottom: String },
}

/// Vector primitive in surface coordinates (origin top-left, y down).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: String,
    },
    Line {
        from: Point,
        to: Point,
        stroke: Stroke,
    },
    Circle {
        center: Point,
        radius: f32,
        fill: String,
    },
    Path {
        points: Vec<Point>,
        stroke: Option<Stroke>,
        fill: Option<Fill>,
        closed: bool,
    },
}

/// Drawable output of one render tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub width: f32,
    pub height: f32,
    pub shapes: Vec<Shape>,
}

impl Frame {
    pub fn blank(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            shapes: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
    }

    pub fn is_blank(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn push(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    /// Serialises the frame as a standalone SVG document.
    pub fn to_svg(&self) -> String {
        let mut defs = String::new();
        let mut body = String::new();
        let mut gradients = 0usize;

        for shape in &self.shapes {
            // Writing into a String cannot fail.
            let _ = match shape {
                Shape::Rect {
                    x,
                    y,
                    width,
                    height,
                    fill,
                } => writeln!(
                    body,
                    r#"  <rect x="{x:.2}" y="{y:.2}" width="{width:.2}" height="{height:.2}" fill="{fill}"/>"#
                ),
                Shape::Line { from, to, stroke } => writeln!(
                    body,
                    r#"  <line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="{}"/>"#,
                    from.x, from.y, to.x, to.y, stroke.color, stroke.width
                ),
                Shape::Circle {
                    center,
                    radius,
                    fill,
                } => writeln!(
                    body,
                    r#"  <circle cx="{:.2}" cy="{:.2}" r="{radius:.2}" fill="{fill}"/>"#,
                    center.x, center.y
                ),
                Shape::Path {
                    points,
                    stroke,
                    fill,
                    closed,
                } => {
                    let mut d = String::new();
                    for (i, point) in points.iter().enumerate() {
                        let op = if i == 0 { 'M' } else { 'L' };
                        let _ = write!(d, "{op}{:.2},{:.2} ", point.x, point.y);
                    }
                    if *closed {
                        d.push('Z');
                    }

                    let fill_attr = match fill {
                        None => "none".to_string(),
                        Some(Fill::VerticalGradient { top, bottom }) => {
                            gradients += 1;
                            let _ = writeln!(
                                defs,
                                r#"    <linearGradient id="fill-{gradients}" x1="0" y1="0" x2="0" y2="1"><stop offset="0" stop-color="{top}"/><stop offset="1" stop-color="{bottom}"/></linearGradient>"#
                            );
                            format!("url(#fill-{gradients})")
                        }
                    };
                    let stroke_attr = match stroke {
                        Some(stroke) => format!(
                            r#" stroke="{}" stroke-width="{}""#,
                            stroke.color, stroke.width
                        ),
                        None => String::new(),
                    };
                    writeln!(
                        body,
                        r#"  <path d="{}" fill="{fill_attr}"{stroke_attr}/>"#,
                        d.trim_end()
                    )
                }
            };
        }

        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );
        svg.push('\n');
        if !defs.is_empty() {
            svg.push_str("  <defs>\n");
            svg.push_str(&defs);
            svg.push_str("  </defs>\n");
        }
        svg.push_str(&body);
        svg.push_str("</svg>\n");
        svg
    }
}
