use super::{compose_with_children, Declaration};
use crate::declarations::{DeclarationContext, Effect};
use crate::errors::DomError;
use crate::props::convert::{parse_bool, parse_color, parse_number, parse_tile_mode, prop, Color};
use crate::props::{DerivedProperty, PropKey, PropertyContainer};
use crate::value::PropertyValue;
use skia_safe::{image_filters, ImageFilter, TileMode};

fn finish(own: Option<ImageFilter>, children: &mut DeclarationContext) -> Option<Effect> {
    compose_with_children(own, &mut children.image_filters).map(Effect::ImageFilter)
}

/// Gaussian blur; `blur` is the sigma on both axes.
#[derive(Debug)]
pub struct BlurImageFilter {
    blur: PropKey<DerivedProperty<f32>>,
    mode: PropKey<DerivedProperty<TileMode>>,
}

impl BlurImageFilter {
    pub fn define(container: &mut PropertyContainer) -> Self {
        Self {
            blur: container.define(prop("blur", parse_number).required()),
            mode: container.define(prop("mode", parse_tile_mode)),
        }
    }
}

impl Declaration for BlurImageFilter {
    fn declare(
        &self,
        props: &PropertyContainer,
        children: &mut DeclarationContext,
    ) -> Result<Option<Effect>, DomError> {
        let sigma = *props.require(self.blur)?;
        let mode = props.value(self.mode).copied().unwrap_or(TileMode::Decal);
        let own = image_filters::blur((sigma, sigma), mode, None, None);
        Ok(finish(own, children))
    }
}

#[derive(Debug)]
pub struct OffsetImageFilter {
    x: PropKey<DerivedProperty<f32>>,
    y: PropKey<DerivedProperty<f32>>,
}

impl OffsetImageFilter {
    pub fn define(container: &mut PropertyContainer) -> Self {
        Self {
            x: container.define(prop("x", parse_number)),
            y: container.define(prop("y", parse_number)),
        }
    }
}

impl Declaration for OffsetImageFilter {
    fn declare(
        &self,
        props: &PropertyContainer,
        children: &mut DeclarationContext,
    ) -> Result<Option<Effect>, DomError> {
        let dx = props.value(self.x).copied().unwrap_or(0.0);
        let dy = props.value(self.y).copied().unwrap_or(0.0);
        Ok(finish(image_filters::offset((dx, dy), None, None), children))
    }
}

#[derive(Debug)]
pub struct DropShadowImageFilter {
    dx: PropKey<DerivedProperty<f32>>,
    dy: PropKey<DerivedProperty<f32>>,
    blur: PropKey<DerivedProperty<f32>>,
    color: PropKey<DerivedProperty<Color>>,
    shadow_only: PropKey<DerivedProperty<bool>>,
}

impl DropShadowImageFilter {
    pub fn define(container: &mut PropertyContainer) -> Self {
        Self {
            dx: container.define(prop("dx", parse_number).required()),
            dy: container.define(prop("dy", parse_number).required()),
            blur: container.define(prop("blur", parse_number).required()),
            color: container.define(prop("color", parse_color).required()),
            shadow_only: container.define(prop("shadowOnly", parse_bool)),
        }
    }
}

impl Declaration for DropShadowImageFilter {
    fn declare(
        &self,
        props: &PropertyContainer,
        children: &mut DeclarationContext,
    ) -> Result<Option<Effect>, DomError> {
        let offset = (*props.require(self.dx)?, *props.require(self.dy)?);
        let sigma = *props.require(self.blur)?;
        let color = props.require(self.color)?.to_color4f();
        let own = if props.value(self.shadow_only).copied().unwrap_or(false) {
            image_filters::drop_shadow_only(offset, (sigma, sigma), color, None, None, None)
        } else {
            image_filters::drop_shadow(offset, (sigma, sigma), color, None, None, None)
        };
        Ok(finish(own, children))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MorphologyOperator {
    Dilate,
    Erode,
}

fn parse_operator(value: &PropertyValue) -> Result<MorphologyOperator, DomError> {
    match value.as_string()? {
        "dilate" => Ok(MorphologyOperator::Dilate),
        "erode" => Ok(MorphologyOperator::Erode),
        other => Err(DomError::UnknownEnumLiteral {
            kind: "morphology operator",
            value: other.to_string(),
        }),
    }
}

#[derive(Debug)]
pub struct MorphologyImageFilter {
    operator: PropKey<DerivedProperty<MorphologyOperator>>,
    radius: PropKey<DerivedProperty<f32>>,
}

impl MorphologyImageFilter {
    pub fn define(container: &mut PropertyContainer) -> Self {
        Self {
            operator: container.define(prop("operator", parse_operator)),
            radius: container.define(prop("radius", parse_number).required()),
        }
    }
}

impl Declaration for MorphologyImageFilter {
    fn declare(
        &self,
        props: &PropertyContainer,
        children: &mut DeclarationContext,
    ) -> Result<Option<Effect>, DomError> {
        let r = *props.require(self.radius)?;
        let own = match props
            .value(self.operator)
            .copied()
            .unwrap_or(MorphologyOperator::Dilate)
        {
            MorphologyOperator::Dilate => image_filters::dilate((r, r), None, None),
            MorphologyOperator::Erode => image_filters::erode((r, r), None, None),
        };
        Ok(finish(own, children))
    }
}
