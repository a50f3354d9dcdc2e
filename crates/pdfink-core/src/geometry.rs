//! Geometry primitives shared by the action model and the compositor
//!
//! Surface-space values (`Point`, `SurfaceRect`) come from the annotation
//! overlay: origin top-left, y grows downward. `PdfRect` is document space:
//! origin bottom-left, y grows upward, anchored at the lower-left corner.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in surface space, `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct SurfaceRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl SurfaceRect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Build a rectangle from two drag corners, whichever direction the drag went.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            w: (b.x - a.x).abs(),
            h: (b.y - a.y).abs(),
        }
    }

    /// True when both sides are strictly larger than the threshold.
    pub fn exceeds(&self, min_w: f64, min_h: f64) -> bool {
        self.w > min_w && self.h > min_h
    }
}

/// Rectangle in document space, `(x, y)` is the lower-left corner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// RGB color with components in the 0-1 range.
///
/// Serialized as a `#rrggbb` string. Parsing also accepts `#rgb`,
/// `rgb(r, g, b)` and `hsl(h, s%, l%)`, the forms a browser color picker
/// or a CSS theme variable hands over.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = s.to_ascii_lowercase();
        if let Some(args) = function_args(&lower, "rgb") {
            let [r, g, b] = parse_triplet(args)?;
            return Some(Self::rgb(
                (r / 255.0).clamp(0.0, 1.0) as f32,
                (g / 255.0).clamp(0.0, 1.0) as f32,
                (b / 255.0).clamp(0.0, 1.0) as f32,
            ));
        }
        if let Some(args) = function_args(&lower, "hsl") {
            let [h, s, l] = parse_triplet(args)?;
            return Some(hsl_to_rgb(h, s / 100.0, l / 100.0));
        }
        None
    }

    pub fn to_hex(&self) -> String {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            channel(self.r),
            channel(self.g),
            channel(self.b)
        )
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value).ok_or_else(|| format!("Invalid color: {}", value))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let channel = |i: usize| {
        u8::from_str_radix(expanded.get(i..i + 2)?, 16)
            .ok()
            .map(|v| v as f32 / 255.0)
    };
    Some(Color::rgb(channel(0)?, channel(2)?, channel(4)?))
}

/// Return the argument list of a CSS function like `hsl(...)` or `hsla(...)`.
fn function_args<'a>(s: &'a str, name: &str) -> Option<&'a str> {
    let rest = s.strip_prefix(name)?;
    let rest = rest.strip_prefix('a').unwrap_or(rest);
    rest.trim().strip_prefix('(')?.strip_suffix(')')
}

/// Parse the first three numeric components; a trailing alpha is ignored.
fn parse_triplet(args: &str) -> Option<[f64; 3]> {
    let mut values = args
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.trim_end_matches(['%', 'g', 'd', 'e']).parse::<f64>());
    let a = values.next()?.ok()?;
    let b = values.next()?.ok()?;
    let c = values.next()?.ok()?;
    Some([a, b, c])
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Color {
    let h = h.rem_euclid(360.0) / 360.0;
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);

    if s == 0.0 {
        return Color::rgb(l as f32, l as f32, l as f32);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let hue = |mut t: f64| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };

    Color::rgb(
        hue(h + 1.0 / 3.0) as f32,
        hue(h) as f32,
        hue(h - 1.0 / 3.0) as f32,
    )
}
