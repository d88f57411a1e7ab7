//! # Value Conversion
//!
//! Parsers turning committed [`PropertyValue`]s into Skia types.
//!
//! ## Responsibilities
//! - **Colors**: hex strings, a small set of names, `rgb()/rgba()`, arrays and packed ARGB numbers.
//! - **Geometry**: points, rects, rounded rects, matrices and transform lists.
//! - **Enum Literals**: camelCase names of Skia enums; unknown names fail with
//!   `DomError::UnknownEnumLiteral`.

use super::{DerivedProperty, NodeProperty};
use crate::errors::DomError;
use crate::value::PropertyValue;
use skia_safe::{
    paint, BlendMode, BlurStyle, Color4f, FilterMode, Matrix, MipmapMode, Path, PathFillType,
    Point, RRect, Rect, TileMode,
};
use std::fmt;

type Result<T> = std::result::Result<T, DomError>;

/// A leaf property converted with `parse`.
pub fn prop<T, F>(name: &str, parse: F) -> DerivedProperty<T>
where
    T: PartialEq + Send + fmt::Debug + 'static,
    F: FnMut(&PropertyValue) -> Result<T> + Send + 'static,
{
    DerivedProperty::over(NodeProperty::new(name), parse)
}

/// RGBA color with float components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    pub fn to_skia(&self) -> skia_safe::Color {
        self.to_color4f().to_color()
    }

    pub fn to_color4f(&self) -> Color4f {
        Color4f::new(self.r, self.g, self.b, self.a)
    }
}

/// Parses `#RGB`, `#RRGGBB` and `#RRGGBBAA`.
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    match hex.len() {
        3 => Some(Color::from_rgba8(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
            255,
        )),
        6 => Some(Color::from_rgba8(
            channel(0..2)?,
            channel(2..4)?,
            channel(4..6)?,
            255,
        )),
        8 => Some(Color::from_rgba8(
            channel(0..2)?,
            channel(2..4)?,
            channel(4..6)?,
            channel(6..8)?,
        )),
        _ => None,
    }
}

fn parse_named_color(name: &str) -> Option<Color> {
    let rgb = |r, g, b| Some(Color::from_rgba8(r, g, b, 255));
    match name.to_ascii_lowercase().as_str() {
        "black" => rgb(0, 0, 0),
        "white" => rgb(255, 255, 255),
        "red" => rgb(255, 0, 0),
        "green" => rgb(0, 128, 0),
        "lime" => rgb(0, 255, 0),
        "blue" => rgb(0, 0, 255),
        "yellow" => rgb(255, 255, 0),
        "cyan" | "aqua" => rgb(0, 255, 255),
        "magenta" | "fuchsia" => rgb(255, 0, 255),
        "gray" | "grey" => rgb(128, 128, 128),
        "orange" => rgb(255, 165, 0),
        "purple" => rgb(128, 0, 128),
        "transparent" => Some(Color::TRANSPARENT),
        _ => None,
    }
}

fn parse_functional_color(s: &str) -> Option<Color> {
    let (args, has_alpha) = if let Some(rest) = s.strip_prefix("rgba(") {
        (rest.strip_suffix(')')?, true)
    } else {
        (s.strip_prefix("rgb(")?.strip_suffix(')')?, false)
    };
    let parts: Vec<f32> = args
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    match (parts.as_slice(), has_alpha) {
        ([r, g, b], false) => Some(Color::new(r / 255.0, g / 255.0, b / 255.0, 1.0)),
        ([r, g, b, a], true) => Some(Color::new(r / 255.0, g / 255.0, b / 255.0, *a)),
        _ => None,
    }
}

pub fn parse_color(value: &PropertyValue) -> Result<Color> {
    match value {
        PropertyValue::String(s) => {
            let s = s.trim();
            parse_hex_color(s)
                .or_else(|| parse_named_color(s))
                .or_else(|| parse_functional_color(s))
                .ok_or_else(|| DomError::invalid("color", format!("cannot parse \"{}\"", s)))
        }
        PropertyValue::Number(n) => {
            if n.fract() != 0.0 || *n < 0.0 || *n > f64::from(u32::MAX) {
                return Err(DomError::invalid(
                    "color",
                    format!("{} is not a 32-bit ARGB value", n),
                ));
            }
            let argb = *n as u32;
            Ok(Color::from_rgba8(
                (argb >> 16) as u8,
                (argb >> 8) as u8,
                argb as u8,
                (argb >> 24) as u8,
            ))
        }
        PropertyValue::Array(items) => {
            let c = numbers(items)?;
            match c.as_slice() {
                [r, g, b] => Ok(Color::new(*r, *g, *b, 1.0)),
                [r, g, b, a] => Ok(Color::new(*r, *g, *b, *a)),
                _ => Err(DomError::invalid(
                    "color",
                    format!("expected 3 or 4 components, found {}", c.len()),
                )),
            }
        }
        other => Err(DomError::TypeMismatch {
            expected: "color",
            found: other.value_type().as_str(),
        }),
    }
}

pub fn parse_colors(value: &PropertyValue) -> Result<Vec<Color>> {
    value.as_array()?.iter().map(parse_color).collect()
}

pub fn parse_number(value: &PropertyValue) -> Result<f32> {
    Ok(value.as_number()? as f32)
}

pub fn parse_bool(value: &PropertyValue) -> Result<bool> {
    value.as_bool()
}

pub fn parse_string(value: &PropertyValue) -> Result<String> {
    Ok(value.as_string()?.to_string())
}

fn numbers(items: &[PropertyValue]) -> Result<Vec<f32>> {
    items.iter().map(parse_number).collect()
}

pub fn parse_numbers(value: &PropertyValue) -> Result<Vec<f32>> {
    numbers(value.as_array()?)
}

fn member(value: &PropertyValue, name: &str) -> Result<f32> {
    parse_number(value.as_object(name)?)
}

fn member_or(value: &PropertyValue, name: &str, default: f32) -> Result<f32> {
    match value.as_object(name)? {
        v if v.is_nullish() => Ok(default),
        v => parse_number(v),
    }
}

/// `{x, y}` or `[x, y]`.
pub fn parse_point(value: &PropertyValue) -> Result<Point> {
    match value {
        PropertyValue::Array(items) => match numbers(items)?.as_slice() {
            [x, y] => Ok(Point::new(*x, *y)),
            _ => Err(DomError::invalid("point", "expected two components")),
        },
        _ => Ok(Point::new(member(value, "x")?, member(value, "y")?)),
    }
}

/// `{x, y, width, height}`.
pub fn parse_rect(value: &PropertyValue) -> Result<Rect> {
    Ok(Rect::from_xywh(
        member_or(value, "x", 0.0)?,
        member_or(value, "y", 0.0)?,
        member(value, "width")?,
        member(value, "height")?,
    ))
}

/// `{rect, rx, ry}` or a flat `{x, y, width, height, rx, ry}`.
pub fn parse_rrect(value: &PropertyValue) -> Result<RRect> {
    let rect = if value.has_key("rect") {
        parse_rect(value.as_object("rect")?)?
    } else {
        parse_rect(value)?
    };
    let rx = member_or(value, "rx", 0.0)?;
    let ry = member_or(value, "ry", rx)?;
    Ok(RRect::new_rect_xy(rect, rx, ry))
}

/// Nine numbers in row-major order.
pub fn parse_matrix(value: &PropertyValue) -> Result<Matrix> {
    match numbers(value.as_array()?)?.as_slice() {
        [a, b, c, d, e, f, g, h, i] => Ok(Matrix::new_all(*a, *b, *c, *d, *e, *f, *g, *h, *i)),
        other => Err(DomError::invalid(
            "matrix",
            format!("expected 9 numbers, found {}", other.len()),
        )),
    }
}

/// Folds a transform list such as `[{translateX: 10}, {rotate: 0.5}]` into a matrix.
///
/// Operations apply in list order; angles are in radians.
pub fn parse_transform(value: &PropertyValue) -> Result<Matrix> {
    let mut matrix = Matrix::new_identity();
    for op in value.as_array()? {
        let map = op.as_map()?;
        let (name, amount) = match (map.len(), map.iter().next()) {
            (1, Some((name, amount))) => (name.as_str(), parse_number(amount)?),
            _ => {
                return Err(DomError::invalid(
                    "transform",
                    "each operation must have exactly one key",
                ))
            }
        };
        match name {
            "translateX" => matrix.pre_translate((amount, 0.0)),
            "translateY" => matrix.pre_translate((0.0, amount)),
            "scale" => matrix.pre_scale((amount, amount), None),
            "scaleX" => matrix.pre_scale((amount, 1.0), None),
            "scaleY" => matrix.pre_scale((1.0, amount), None),
            "rotate" | "rotateZ" => matrix.pre_rotate(amount.to_degrees(), None),
            "skewX" => matrix.pre_skew((amount, 0.0), None),
            "skewY" => matrix.pre_skew((0.0, amount), None),
            other => {
                return Err(DomError::UnknownEnumLiteral {
                    kind: "transform",
                    value: other.to_string(),
                })
            }
        };
    }
    Ok(matrix)
}

/// An SVG path string or an opaque [`Path`].
pub fn parse_path(value: &PropertyValue) -> Result<Path> {
    match value {
        PropertyValue::String(svg) => Path::from_svg(svg)
            .ok_or_else(|| DomError::invalid("path", format!("invalid SVG path \"{}\"", svg))),
        other => other.as_opaque::<Path>().cloned(),
    }
}

fn unknown(kind: &'static str, value: &str) -> DomError {
    DomError::UnknownEnumLiteral {
        kind,
        value: value.to_string(),
    }
}

pub fn parse_paint_style(value: &PropertyValue) -> Result<paint::Style> {
    match value.as_string()? {
        "fill" => Ok(paint::Style::Fill),
        "stroke" => Ok(paint::Style::Stroke),
        other => Err(unknown("paint style", other)),
    }
}

pub fn parse_stroke_cap(value: &PropertyValue) -> Result<paint::Cap> {
    match value.as_string()? {
        "butt" => Ok(paint::Cap::Butt),
        "round" => Ok(paint::Cap::Round),
        "square" => Ok(paint::Cap::Square),
        other => Err(unknown("stroke cap", other)),
    }
}

pub fn parse_stroke_join(value: &PropertyValue) -> Result<paint::Join> {
    match value.as_string()? {
        "miter" => Ok(paint::Join::Miter),
        "round" => Ok(paint::Join::Round),
        "bevel" => Ok(paint::Join::Bevel),
        other => Err(unknown("stroke join", other)),
    }
}

pub fn parse_blend_mode(value: &PropertyValue) -> Result<BlendMode> {
    let mode = match value.as_string()? {
        "clear" => BlendMode::Clear,
        "src" => BlendMode::Src,
        "dst" => BlendMode::Dst,
        "srcOver" => BlendMode::SrcOver,
        "dstOver" => BlendMode::DstOver,
        "srcIn" => BlendMode::SrcIn,
        "dstIn" => BlendMode::DstIn,
        "srcOut" => BlendMode::SrcOut,
        "dstOut" => BlendMode::DstOut,
        "srcATop" => BlendMode::SrcATop,
        "dstATop" => BlendMode::DstATop,
        "xor" => BlendMode::Xor,
        "plus" => BlendMode::Plus,
        "modulate" => BlendMode::Modulate,
        "screen" => BlendMode::Screen,
        "overlay" => BlendMode::Overlay,
        "darken" => BlendMode::Darken,
        "lighten" => BlendMode::Lighten,
        "colorDodge" => BlendMode::ColorDodge,
        "colorBurn" => BlendMode::ColorBurn,
        "hardLight" => BlendMode::HardLight,
        "softLight" => BlendMode::SoftLight,
        "difference" => BlendMode::Difference,
        "exclusion" => BlendMode::Exclusion,
        "multiply" => BlendMode::Multiply,
        "hue" => BlendMode::Hue,
        "saturation" => BlendMode::Saturation,
        "color" => BlendMode::Color,
        "luminosity" => BlendMode::Luminosity,
        other => return Err(unknown("blend mode", other)),
    };
    Ok(mode)
}

pub fn parse_tile_mode(value: &PropertyValue) -> Result<TileMode> {
    match value.as_string()? {
        "clamp" => Ok(TileMode::Clamp),
        "repeat" => Ok(TileMode::Repeat),
        "mirror" => Ok(TileMode::Mirror),
        "decal" => Ok(TileMode::Decal),
        other => Err(unknown("tile mode", other)),
    }
}

pub fn parse_blur_style(value: &PropertyValue) -> Result<BlurStyle> {
    match value.as_string()? {
        "normal" => Ok(BlurStyle::Normal),
        "solid" => Ok(BlurStyle::Solid),
        "outer" => Ok(BlurStyle::Outer),
        "inner" => Ok(BlurStyle::Inner),
        other => Err(unknown("blur style", other)),
    }
}

pub fn parse_filter_mode(value: &PropertyValue) -> Result<FilterMode> {
    match value.as_string()? {
        "nearest" => Ok(FilterMode::Nearest),
        "linear" => Ok(FilterMode::Linear),
        other => Err(unknown("filter mode", other)),
    }
}

pub fn parse_mipmap_mode(value: &PropertyValue) -> Result<MipmapMode> {
    match value.as_string()? {
        "none" => Ok(MipmapMode::None),
        "nearest" => Ok(MipmapMode::Nearest),
        "linear" => Ok(MipmapMode::Linear),
        other => Err(unknown("mipmap mode", other)),
    }
}

pub fn parse_fill_type(value: &PropertyValue) -> Result<PathFillType> {
    match value.as_string()? {
        "winding" => Ok(PathFillType::Winding),
        "evenOdd" => Ok(PathFillType::EvenOdd),
        "inverseWinding" => Ok(PathFillType::InverseWinding),
        "inverseEvenOdd" => Ok(PathFillType::InverseEvenOdd),
        other => Err(unknown("fill type", other)),
    }
}
