use super::{compose_with_children, Declaration};
use crate::declarations::{DeclarationContext, Effect};
use crate::errors::DomError;
use crate::props::convert::{
    parse_blend_mode, parse_color, parse_number, parse_numbers, prop, Color,
};
use crate::props::{DerivedProperty, PropKey, PropertyContainer};
use crate::value::PropertyValue;
use skia_safe::color_filters::{self, Clamp};
use skia_safe::{luma_color_filter, BlendMode, ColorFilter};

fn finish(own: Option<ColorFilter>, children: &mut DeclarationContext) -> Option<Effect> {
    compose_with_children(own, &mut children.color_filters).map(Effect::ColorFilter)
}

/// A 4x5 color matrix in row-major order.
#[derive(Debug)]
pub struct MatrixColorFilter {
    matrix: PropKey<DerivedProperty<[f32; 20]>>,
}

impl MatrixColorFilter {
    pub fn define(container: &mut PropertyContainer) -> Self {
        let matrix = prop("matrix", |v: &PropertyValue| {
            let values = parse_numbers(v)?;
            let len = values.len();
            <[f32; 20]>::try_from(values).map_err(|_| {
                DomError::invalid("matrix", format!("expected 20 numbers, found {}", len))
            })
        });
        Self {
            matrix: container.define(matrix.required()),
        }
    }
}

impl Declaration for MatrixColorFilter {
    fn declare(
        &self,
        props: &PropertyContainer,
        children: &mut DeclarationContext,
    ) -> Result<Option<Effect>, DomError> {
        let matrix = props.require(self.matrix)?;
        let own = color_filters::matrix_row_major(matrix, Clamp::Yes);
        Ok(finish(Some(own), children))
    }
}

#[derive(Debug)]
pub struct BlendColorFilter {
    color: PropKey<DerivedProperty<Color>>,
    mode: PropKey<DerivedProperty<BlendMode>>,
}

impl BlendColorFilter {
    pub fn define(container: &mut PropertyContainer) -> Self {
        Self {
            color: container.define(prop("color", parse_color).required()),
            mode: container.define(prop("mode", parse_blend_mode).required()),
        }
    }
}

impl Declaration for BlendColorFilter {
    fn declare(
        &self,
        props: &PropertyContainer,
        children: &mut DeclarationContext,
    ) -> Result<Option<Effect>, DomError> {
        let color = props.require(self.color)?;
        let own = color_filters::blend(color.to_skia(), *props.require(self.mode)?);
        Ok(finish(own, children))
    }
}

/// Interpolates between exactly two color filter children.
#[derive(Debug)]
pub struct LerpColorFilter {
    t: PropKey<DerivedProperty<f32>>,
}

impl LerpColorFilter {
    pub fn define(container: &mut PropertyContainer) -> Self {
        Self {
            t: container.define(prop("t", parse_number).required()),
        }
    }
}

impl Declaration for LerpColorFilter {
    fn declare(
        &self,
        props: &PropertyContainer,
        children: &mut DeclarationContext,
    ) -> Result<Option<Effect>, DomError> {
        let t = *props.require(self.t)?;
        let mut filters = children.color_filters.pop_all();
        if filters.len() != 2 {
            return Err(DomError::invalid(
                "lerpColorFilter",
                format!("expects 2 color filter children, found {}", filters.len()),
            ));
        }
        let src = filters.pop();
        let dst = filters.pop();
        Ok(match (dst, src) {
            (Some(dst), Some(src)) => color_filters::lerp(t, &dst, &src).map(Effect::ColorFilter),
            _ => None,
        })
    }
}

#[derive(Debug)]
pub struct LumaColorFilter;

impl Declaration for LumaColorFilter {
    fn declare(
        &self,
        _: &PropertyContainer,
        children: &mut DeclarationContext,
    ) -> Result<Option<Effect>, DomError> {
        Ok(finish(Some(luma_color_filter::new()), children))
    }
}

#[derive(Debug)]
pub struct LinearToSrgbGamma;

impl Declaration for LinearToSrgbGamma {
    fn declare(
        &self,
        _: &PropertyContainer,
        children: &mut DeclarationContext,
    ) -> Result<Option<Effect>, DomError> {
        Ok(finish(Some(color_filters::linear_to_srgb_gamma()), children))
    }
}

#[derive(Debug)]
pub struct SrgbToLinearGamma;

impl Declaration for SrgbToLinearGamma {
    fn declare(
        &self,
        _: &PropertyContainer,
        children: &mut DeclarationContext,
    ) -> Result<Option<Effect>, DomError> {
        Ok(finish(Some(color_filters::srgb_to_linear_gamma()), children))
    }
}
