use super::Declaration;
use crate::declarations::{DeclarationContext, Effect};
use crate::errors::DomError;
use crate::props::convert::{
    parse_blend_mode, parse_color, parse_colors, parse_filter_mode, parse_mipmap_mode,
    parse_number, parse_numbers, parse_point, parse_tile_mode, prop, Color,
};
use crate::props::{DerivedProperty, PropKey, PropertyContainer};
use crate::value::PropertyValue;
use skia_safe::{
    gradient_shader, shaders, BlendMode, FilterMode, Image, MipmapMode, Point, SamplingOptions,
    TileMode,
};
use tracing::debug;

/// Gradient stops shared by the gradient shaders.
#[derive(Debug)]
struct Stops {
    colors: PropKey<DerivedProperty<Vec<Color>>>,
    positions: PropKey<DerivedProperty<Vec<f32>>>,
    mode: PropKey<DerivedProperty<TileMode>>,
}

impl Stops {
    fn define(container: &mut PropertyContainer) -> Self {
        Self {
            colors: container.define(prop("colors", parse_colors).required()),
            positions: container.define(prop("positions", parse_numbers)),
            mode: container.define(prop("mode", parse_tile_mode)),
        }
    }

    fn resolve<'a>(
        &self,
        props: &'a PropertyContainer,
    ) -> Result<(Vec<skia_safe::Color>, Option<&'a [f32]>, TileMode), DomError> {
        let colors: Vec<skia_safe::Color> =
            props.require(self.colors)?.iter().map(Color::to_skia).collect();
        let positions = props.value(self.positions).map(Vec::as_slice);
        if let Some(positions) = positions {
            if positions.len() != colors.len() {
                return Err(DomError::invalid(
                    "positions",
                    format!("{} positions for {} colors", positions.len(), colors.len()),
                ));
            }
        }
        let mode = props.value(self.mode).copied().unwrap_or(TileMode::Clamp);
        Ok((colors, positions, mode))
    }
}

#[derive(Debug)]
pub struct ColorShader {
    color: PropKey<DerivedProperty<Color>>,
}

impl ColorShader {
    pub fn define(container: &mut PropertyContainer) -> Self {
        Self {
            color: container.define(prop("color", parse_color).required()),
        }
    }
}

impl Declaration for ColorShader {
    fn declare(
        &self,
        props: &PropertyContainer,
        _: &mut DeclarationContext,
    ) -> Result<Option<Effect>, DomError> {
        let color = props.require(self.color)?;
        Ok(Some(Effect::Shader(shaders::color(color.to_skia()))))
    }
}

#[derive(Debug)]
pub struct LinearGradient {
    start: PropKey<DerivedProperty<Point>>,
    end: PropKey<DerivedProperty<Point>>,
    stops: Stops,
}

impl LinearGradient {
    pub fn define(container: &mut PropertyContainer) -> Self {
        Self {
            start: container.define(prop("start", parse_point).required()),
            end: container.define(prop("end", parse_point).required()),
            stops: Stops::define(container),
        }
    }
}

impl Declaration for LinearGradient {
    fn declare(
        &self,
        props: &PropertyContainer,
        _: &mut DeclarationContext,
    ) -> Result<Option<Effect>, DomError> {
        let (colors, positions, mode) = self.stops.resolve(props)?;
        let shader = gradient_shader::linear(
            (*props.require(self.start)?, *props.require(self.end)?),
            colors.as_slice(),
            positions,
            mode,
            None,
            None,
        );
        Ok(shader.map(Effect::Shader))
    }
}

#[derive(Debug)]
pub struct RadialGradient {
    center: PropKey<DerivedProperty<Point>>,
    radius: PropKey<DerivedProperty<f32>>,
    stops: Stops,
}

impl RadialGradient {
    pub fn define(container: &mut PropertyContainer) -> Self {
        Self {
            center: container.define(prop("c", parse_point).required()),
            radius: container.define(prop("r", parse_number).required()),
            stops: Stops::define(container),
        }
    }
}

impl Declaration for RadialGradient {
    fn declare(
        &self,
        props: &PropertyContainer,
        _: &mut DeclarationContext,
    ) -> Result<Option<Effect>, DomError> {
        let (colors, positions, mode) = self.stops.resolve(props)?;
        let shader = gradient_shader::radial(
            *props.require(self.center)?,
            *props.require(self.radius)?,
            colors.as_slice(),
            positions,
            mode,
            None,
            None,
        );
        Ok(shader.map(Effect::Shader))
    }
}

#[derive(Debug)]
pub struct ImageShader {
    image: PropKey<DerivedProperty<PropertyValue>>,
    tx: PropKey<DerivedProperty<TileMode>>,
    ty: PropKey<DerivedProperty<TileMode>>,
    fm: PropKey<DerivedProperty<FilterMode>>,
    mm: PropKey<DerivedProperty<MipmapMode>>,
}

impl ImageShader {
    pub fn define(container: &mut PropertyContainer) -> Self {
        let image = prop("image", |v: &PropertyValue| {
            v.as_opaque::<Image>()?;
            Ok(v.clone())
        });
        Self {
            image: container.define(image.required()),
            tx: container.define(prop("tx", parse_tile_mode)),
            ty: container.define(prop("ty", parse_tile_mode)),
            fm: container.define(prop("fm", parse_filter_mode)),
            mm: container.define(prop("mm", parse_mipmap_mode)),
        }
    }
}

impl Declaration for ImageShader {
    fn declare(
        &self,
        props: &PropertyContainer,
        _: &mut DeclarationContext,
    ) -> Result<Option<Effect>, DomError> {
        let image = props.require(self.image)?.as_opaque::<Image>()?;
        let tile = |key: PropKey<DerivedProperty<TileMode>>| {
            props.value(key).copied().unwrap_or(TileMode::Clamp)
        };
        let sampling = SamplingOptions::new(
            props.value(self.fm).copied().unwrap_or(FilterMode::Linear),
            props.value(self.mm).copied().unwrap_or(MipmapMode::None),
        );
        let shader = image.to_shader((tile(self.tx), tile(self.ty)), sampling, None);
        Ok(shader.map(Effect::Shader))
    }
}

/// Blends its shader children in order: `blend(mode, blend(mode, s0, s1), s2)`.
#[derive(Debug)]
pub struct BlendShader {
    mode: PropKey<DerivedProperty<BlendMode>>,
}

impl BlendShader {
    pub fn define(container: &mut PropertyContainer) -> Self {
        Self {
            mode: container.define(prop("mode", parse_blend_mode).required()),
        }
    }
}

impl Declaration for BlendShader {
    fn declare(
        &self,
        props: &PropertyContainer,
        children: &mut DeclarationContext,
    ) -> Result<Option<Effect>, DomError> {
        let mode = *props.require(self.mode)?;
        let blended = children
            .shaders
            .pop_all()
            .into_iter()
            .reduce(|dst, src| shaders::blend(mode, dst, src));
        if blended.is_none() {
            debug!("blendShader has no shader children");
        }
        Ok(blended.map(Effect::Shader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::tests::committed;

    #[test]
    fn linear_gradient_builds_a_shader() {
        let (props, node) = committed(
            "linearGradient",
            LinearGradient::define,
            &[
                ("start", PropertyValue::from(vec![0.0, 0.0])),
                ("end", PropertyValue::from(vec![10.0, 0.0])),
                ("colors", PropertyValue::from(vec!["red", "blue"])),
            ],
        );
        let effect = node.declare(&props, &mut DeclarationContext::new()).unwrap();
        assert!(matches!(effect, Some(Effect::Shader(_))));
    }

    #[test]
    fn gradient_positions_must_match_colors() {
        let (props, node) = committed(
            "radialGradient",
            RadialGradient::define,
            &[
                ("c", PropertyValue::from(vec![5.0, 5.0])),
                ("r", 5.0.into()),
                ("colors", PropertyValue::from(vec!["red", "blue"])),
                ("positions", PropertyValue::from(vec![0.0])),
            ],
        );
        assert!(matches!(
            node.declare(&props, &mut DeclarationContext::new()),
            Err(DomError::InvalidValue { .. })
        ));
    }

    #[test]
    fn blend_shader_consumes_its_children() {
        let (props, node) =
            committed("blendShader", BlendShader::define, &[("mode", "multiply".into())]);
        let mut context = DeclarationContext::new();
        context.save();
        context.push(Effect::Shader(shaders::color(skia_safe::Color::RED)));
        context.push(Effect::Shader(shaders::color(skia_safe::Color::BLUE)));
        let effect = node.declare(&props, &mut context).unwrap();
        assert!(matches!(effect, Some(Effect::Shader(_))));
        assert!(context.shaders.is_empty());
        context.restore();
    }

    #[test]
    fn image_shader_rejects_non_images() {
        let mut container = PropertyContainer::new("imageShader");
        ImageShader::define(&mut container);
        container.route_write("image", PropertyValue::opaque(3_u8));
        assert!(matches!(
            container.update_pending_values(),
            Err(DomError::TypeMismatch { .. })
        ));
    }
}
