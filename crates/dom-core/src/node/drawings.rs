use super::Drawing;
use crate::errors::DomError;
use crate::props::convert::{
    parse_fill_type, parse_number, parse_path, parse_point, parse_rect, parse_rrect, prop,
};
use crate::props::{DerivedProperty, NodeProperty, PropKey, PropertyContainer, PropertyInputs};
use skia_safe::{Canvas, Paint, Path, Point, RRect, Rect};

/// A rect given either as `rect` or as flat `x, y, width, height`.
fn rect_property(name: &str) -> DerivedProperty<Rect> {
    let key = name.to_string();
    DerivedProperty::new(
        name,
        vec![
            Box::new(NodeProperty::new(name)),
            Box::new(NodeProperty::new("x")),
            Box::new(NodeProperty::new("y")),
            Box::new(NodeProperty::new("width")),
            Box::new(NodeProperty::new("height")),
        ],
        move |inputs| match inputs.value(&key) {
            Some(rect) => parse_rect(rect).map(Some),
            None => flat_rect(inputs),
        },
    )
}

fn flat_rect(inputs: &PropertyInputs<'_>) -> Result<Option<Rect>, DomError> {
    match (inputs.number("width")?, inputs.number("height")?) {
        (Some(width), Some(height)) => Ok(Some(Rect::from_xywh(
            inputs.number("x")?.unwrap_or(0.0),
            inputs.number("y")?.unwrap_or(0.0),
            width,
            height,
        ))),
        _ => Ok(None),
    }
}

#[derive(Debug)]
pub struct GroupDrawing;

impl Drawing for GroupDrawing {
    fn draw(&self, _: &PropertyContainer, _: &Canvas, _: &Paint) -> Result<(), DomError> {
        Ok(())
    }
}

/// Fills the whole clip with the current paint.
#[derive(Debug)]
pub struct FillDrawing;

impl Drawing for FillDrawing {
    fn draw(&self, _: &PropertyContainer, canvas: &Canvas, paint: &Paint) -> Result<(), DomError> {
        canvas.draw_paint(paint);
        Ok(())
    }
}

#[derive(Debug)]
pub struct RectDrawing {
    rect: PropKey<DerivedProperty<Rect>>,
}

impl RectDrawing {
    pub fn define(container: &mut PropertyContainer) -> Self {
        Self {
            rect: container.define(rect_property("rect").required()),
        }
    }
}

impl Drawing for RectDrawing {
    fn draw(
        &self,
        props: &PropertyContainer,
        canvas: &Canvas,
        paint: &Paint,
    ) -> Result<(), DomError> {
        canvas.draw_rect(props.require(self.rect)?, paint);
        Ok(())
    }
}

#[derive(Debug)]
pub struct RRectDrawing {
    rrect: PropKey<DerivedProperty<RRect>>,
}

impl RRectDrawing {
    pub fn define(container: &mut PropertyContainer) -> Self {
        // `rect` may itself carry rx/ry; otherwise `r` rounds every corner.
        let rrect = DerivedProperty::new(
            "rrect",
            vec![
                Box::new(NodeProperty::new("rect")),
                Box::new(NodeProperty::new("r")),
                Box::new(NodeProperty::new("x")),
                Box::new(NodeProperty::new("y")),
                Box::new(NodeProperty::new("width")),
                Box::new(NodeProperty::new("height")),
            ],
            |inputs| {
                let r = inputs.number("r")?.unwrap_or(0.0);
                match inputs.value("rect") {
                    Some(v) if v.has_key("rx") || v.has_key("rect") => parse_rrect(v).map(Some),
                    Some(v) => Ok(Some(RRect::new_rect_xy(parse_rect(v)?, r, r))),
                    None => Ok(flat_rect(inputs)?.map(|rect| RRect::new_rect_xy(rect, r, r))),
                }
            },
        );
        Self {
            rrect: container.define(rrect.required()),
        }
    }
}

impl Drawing for RRectDrawing {
    fn draw(
        &self,
        props: &PropertyContainer,
        canvas: &Canvas,
        paint: &Paint,
    ) -> Result<(), DomError> {
        canvas.draw_rrect(props.require(self.rrect)?, paint);
        Ok(())
    }
}

#[derive(Debug)]
pub struct CircleDrawing {
    center: PropKey<DerivedProperty<Point>>,
    radius: PropKey<DerivedProperty<f32>>,
}

impl CircleDrawing {
    pub fn define(container: &mut PropertyContainer) -> Self {
        let center = DerivedProperty::new(
            "c",
            vec![
                Box::new(NodeProperty::new("c")),
                Box::new(NodeProperty::new("cx")),
                Box::new(NodeProperty::new("cy")),
            ],
            |inputs| match inputs.value("c") {
                Some(c) => parse_point(c).map(Some),
                None => Ok(Some(Point::new(
                    inputs.number("cx")?.unwrap_or(0.0),
                    inputs.number("cy")?.unwrap_or(0.0),
                ))),
            },
        );
        Self {
            center: container.define(center),
            radius: container.define(prop("r", parse_number).required()),
        }
    }
}

impl Drawing for CircleDrawing {
    fn draw(
        &self,
        props: &PropertyContainer,
        canvas: &Canvas,
        paint: &Paint,
    ) -> Result<(), DomError> {
        let center = props.value(self.center).copied().unwrap_or_default();
        canvas.draw_circle(center, *props.require(self.radius)?, paint);
        Ok(())
    }
}

#[derive(Debug)]
pub struct OvalDrawing {
    rect: PropKey<DerivedProperty<Rect>>,
}

impl OvalDrawing {
    pub fn define(container: &mut PropertyContainer) -> Self {
        Self {
            rect: container.define(rect_property("rect").required()),
        }
    }
}

impl Drawing for OvalDrawing {
    fn draw(
        &self,
        props: &PropertyContainer,
        canvas: &Canvas,
        paint: &Paint,
    ) -> Result<(), DomError> {
        canvas.draw_oval(props.require(self.rect)?, paint);
        Ok(())
    }
}

#[derive(Debug)]
pub struct LineDrawing {
    p1: PropKey<DerivedProperty<Point>>,
    p2: PropKey<DerivedProperty<Point>>,
}

impl LineDrawing {
    pub fn define(container: &mut PropertyContainer) -> Self {
        Self {
            p1: container.define(prop("p1", parse_point).required()),
            p2: container.define(prop("p2", parse_point).required()),
        }
    }
}

impl Drawing for LineDrawing {
    fn draw(
        &self,
        props: &PropertyContainer,
        canvas: &Canvas,
        paint: &Paint,
    ) -> Result<(), DomError> {
        canvas.draw_line(*props.require(self.p1)?, *props.require(self.p2)?, paint);
        Ok(())
    }
}

#[derive(Debug)]
pub struct PathDrawing {
    path: PropKey<DerivedProperty<Path>>,
}

impl PathDrawing {
    pub fn define(container: &mut PropertyContainer) -> Self {
        let path = DerivedProperty::new(
            "path",
            vec![
                Box::new(NodeProperty::new("path").required()),
                Box::new(NodeProperty::new("fillType")),
            ],
            |inputs| {
                let Some(value) = inputs.value("path") else {
                    return Ok(None);
                };
                let mut path = parse_path(value)?;
                if let Some(fill_type) = inputs.value("fillType") {
                    path.set_fill_type(parse_fill_type(fill_type)?);
                }
                Ok(Some(path))
            },
        );
        Self {
            path: container.define(path),
        }
    }
}

impl Drawing for PathDrawing {
    fn draw(
        &self,
        props: &PropertyContainer,
        canvas: &Canvas,
        paint: &Paint,
    ) -> Result<(), DomError> {
        canvas.draw_path(props.require(self.path)?, paint);
        Ok(())
    }
}
