//! # Render Properties
//!
//! Properties shared by every drawing node: canvas state (matrix, transform,
//! origin, clip, layer) and paint state (opacity, color, stroke settings...).

use crate::errors::DomError;
use crate::props::convert::{
    self, parse_blend_mode, parse_bool, parse_color, parse_number, parse_paint_style,
    parse_point, parse_stroke_cap, parse_stroke_join, prop, Color,
};
use crate::props::{BaseProperty, DerivedProperty, NodeProperty, PropKey, PropertyContainer};
use crate::value::PropertyValue;
use skia_safe::{
    canvas::SaveLayerRec, paint, BlendMode, Canvas, ClipOp, Matrix, Paint, Path, Point, RRect,
    Rect, Shader,
};

/// Clip geometry of a render node.
#[derive(Debug, Clone, PartialEq)]
pub enum Clip {
    Rect(Rect),
    RRect(RRect),
    Path(Path),
}

impl Clip {
    /// An SVG string or opaque path, an `{rect, rx, ry}` rounded rect, or an `{x, y, width, height}` rect.
    pub fn parse(value: &PropertyValue) -> Result<Self, DomError> {
        match value {
            PropertyValue::String(_) | PropertyValue::Opaque(_) => {
                Ok(Clip::Path(convert::parse_path(value)?))
            }
            v if v.has_key("rect") || v.has_key("rx") => Ok(Clip::RRect(convert::parse_rrect(v)?)),
            v => Ok(Clip::Rect(convert::parse_rect(v)?)),
        }
    }

    fn apply(&self, canvas: &Canvas, op: ClipOp) {
        match self {
            Clip::Rect(rect) => {
                canvas.clip_rect(rect, op, true);
            }
            Clip::RRect(rrect) => {
                canvas.clip_rrect(rrect, op, true);
            }
            Clip::Path(path) => {
                canvas.clip_path(path, op, true);
            }
        }
    }
}

/// Paint used when compositing an offscreen layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerPaint {
    pub opacity: Option<f32>,
    pub blend_mode: Option<BlendMode>,
}

impl LayerPaint {
    /// `true` for a plain layer, `false` for none, or `{opacity, blendMode}`.
    pub fn parse(value: &PropertyValue) -> Result<Option<Self>, DomError> {
        match value {
            PropertyValue::Bool(true) => Ok(Some(LayerPaint::default())),
            PropertyValue::Bool(false) => Ok(None),
            v => {
                let opacity = v.as_object("opacity")?;
                let blend_mode = v.as_object("blendMode")?;
                Ok(Some(LayerPaint {
                    opacity: (!opacity.is_nullish())
                        .then(|| parse_number(opacity))
                        .transpose()?,
                    blend_mode: (!blend_mode.is_nullish())
                        .then(|| parse_blend_mode(blend_mode))
                        .transpose()?,
                }))
            }
        }
    }

    pub fn to_paint(&self) -> Option<Paint> {
        if self.opacity.is_none() && self.blend_mode.is_none() {
            return None;
        }
        let mut paint = Paint::default();
        if let Some(opacity) = self.opacity {
            paint.set_alpha_f(opacity);
        }
        if let Some(mode) = self.blend_mode {
            paint.set_blend_mode(mode);
        }
        Some(paint)
    }
}

struct PaintProps {
    opacity: PropKey<DerivedProperty<f32>>,
    color: PropKey<DerivedProperty<Color>>,
    stroke_width: PropKey<DerivedProperty<f32>>,
    blend_mode: PropKey<DerivedProperty<BlendMode>>,
    style: PropKey<DerivedProperty<paint::Style>>,
    stroke_join: PropKey<DerivedProperty<paint::Join>>,
    stroke_cap: PropKey<DerivedProperty<paint::Cap>>,
    stroke_miter: PropKey<DerivedProperty<f32>>,
    anti_alias: PropKey<DerivedProperty<bool>>,
    dither: PropKey<DerivedProperty<bool>>,
}

/// Keys of the properties every render node defines.
pub struct RenderProps {
    matrix: PropKey<DerivedProperty<Matrix>>,
    origin: PropKey<DerivedProperty<Point>>,
    clip: PropKey<DerivedProperty<Clip>>,
    invert_clip: PropKey<DerivedProperty<bool>>,
    layer: PropKey<DerivedProperty<LayerPaint>>,
    paint: PaintProps,
}

impl RenderProps {
    pub fn define(container: &mut PropertyContainer) -> Self {
        // An explicit matrix wins over a transform list.
        let matrix = container.define(DerivedProperty::new(
            "matrix",
            vec![
                Box::new(NodeProperty::new("matrix")),
                Box::new(NodeProperty::new("transform")),
            ],
            |inputs| match (inputs.value("matrix"), inputs.value("transform")) {
                (Some(m), _) => convert::parse_matrix(m).map(Some),
                (None, Some(t)) => convert::parse_transform(t).map(Some),
                (None, None) => Ok(None),
            },
        ));
        let layer = container.define(DerivedProperty::new(
            "layer",
            vec![Box::new(NodeProperty::new("layer"))],
            |inputs| match inputs.value("layer") {
                Some(v) => LayerPaint::parse(v),
                None => Ok(None),
            },
        ));
        Self {
            matrix,
            origin: container.define(prop("origin", parse_point)),
            clip: container.define(prop("clip", Clip::parse)),
            invert_clip: container.define(prop("invertClip", parse_bool)),
            layer,
            paint: PaintProps {
                opacity: container.define(prop("opacity", parse_number)),
                color: container.define(prop("color", parse_color)),
                stroke_width: container.define(prop("strokeWidth", parse_number)),
                blend_mode: container.define(prop("blendMode", parse_blend_mode)),
                style: container.define(prop("style", parse_paint_style)),
                stroke_join: container.define(prop("strokeJoin", parse_stroke_join)),
                stroke_cap: container.define(prop("strokeCap", parse_stroke_cap)),
                stroke_miter: container.define(prop("strokeMiter", parse_number)),
                anti_alias: container.define(prop("antiAlias", parse_bool)),
                dither: container.define(prop("dither", parse_bool)),
            },
        }
    }

    fn paint_flags(&self, props: &PropertyContainer) -> [(bool, bool); 10] {
        let p = &self.paint;
        let state = |b: &dyn BaseProperty| (b.is_set(), b.is_changed());
        [
            state(props.get(p.opacity)),
            state(props.get(p.color)),
            state(props.get(p.stroke_width)),
            state(props.get(p.blend_mode)),
            state(props.get(p.style)),
            state(props.get(p.stroke_join)),
            state(props.get(p.stroke_cap)),
            state(props.get(p.stroke_miter)),
            state(props.get(p.anti_alias)),
            state(props.get(p.dither)),
        ]
    }

    /// Whether any paint property changed during the last commit.
    pub fn paint_changed(&self, props: &PropertyContainer) -> bool {
        self.paint_flags(props).iter().any(|(_, changed)| *changed)
    }

    /// Whether any paint property is set.
    pub fn has_paint(&self, props: &PropertyContainer) -> bool {
        self.paint_flags(props).iter().any(|(set, _)| *set)
    }

    /// Applies the set paint properties on top of `paint`, which starts out as
    /// a copy of the inherited paint.
    pub fn apply_paint(&self, props: &PropertyContainer, paint: &mut Paint) {
        let p = &self.paint;
        if let Some(opacity) = props.value(p.opacity) {
            let inherited = paint.alpha_f();
            paint.set_alpha_f(opacity * inherited);
        }
        if let Some(color) = props.value(p.color) {
            let prior = paint.alpha_f();
            paint.set_shader(None::<Shader>);
            paint.set_color4f(color.to_color4f(), None);
            paint.set_alpha_f(prior * color.a);
        }
        if let Some(width) = props.value(p.stroke_width) {
            paint.set_stroke_width(*width);
        }
        if let Some(mode) = props.value(p.blend_mode) {
            paint.set_blend_mode(*mode);
        }
        if let Some(style) = props.value(p.style) {
            paint.set_style(*style);
        }
        if let Some(join) = props.value(p.stroke_join) {
            paint.set_stroke_join(*join);
        }
        if let Some(cap) = props.value(p.stroke_cap) {
            paint.set_stroke_cap(*cap);
        }
        if let Some(miter) = props.value(p.stroke_miter) {
            paint.set_stroke_miter(*miter);
        }
        if let Some(aa) = props.value(p.anti_alias) {
            paint.set_anti_alias(*aa);
        }
        if let Some(dither) = props.value(p.dither) {
            paint.set_dither(*dither);
        }
    }

    /// Pushes canvas state for the node's matrix, clip and layer.
    ///
    /// Returns whether state was pushed and must be restored after drawing.
    pub fn save_canvas(&self, props: &PropertyContainer, canvas: &Canvas) -> bool {
        let matrix = props.value(self.matrix);
        let clip = props.value(self.clip);
        let layer = props.value(self.layer);
        if matrix.is_none() && clip.is_none() && layer.is_none() {
            return false;
        }

        match layer {
            Some(layer) => match layer.to_paint() {
                Some(paint) => canvas.save_layer(&SaveLayerRec::default().paint(&paint)),
                None => canvas.save_layer(&SaveLayerRec::default()),
            },
            None => canvas.save(),
        };

        let origin = props.value(self.origin).copied();
        if let Some(origin) = origin {
            canvas.translate((origin.x, origin.y));
        }
        if let Some(matrix) = matrix {
            canvas.concat(matrix);
        }
        if let Some(clip) = clip {
            let op = if props.value(self.invert_clip).copied().unwrap_or(false) {
                ClipOp::Difference
            } else {
                ClipOp::Intersect
            };
            clip.apply(canvas, op);
        }
        if let Some(origin) = origin {
            canvas.translate((-origin.x, -origin.y));
        }
        true
    }
}
