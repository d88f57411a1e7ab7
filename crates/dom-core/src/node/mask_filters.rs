use super::{compose_with_children, Declaration};
use crate::declarations::{DeclarationContext, Effect};
use crate::errors::DomError;
use crate::props::convert::{parse_blur_style, parse_bool, parse_number, prop};
use crate::props::{DerivedProperty, PropKey, PropertyContainer};
use skia_safe::{BlurStyle, MaskFilter};

#[derive(Debug)]
pub struct BlurMaskFilter {
    blur: PropKey<DerivedProperty<f32>>,
    style: PropKey<DerivedProperty<BlurStyle>>,
    respect_ctm: PropKey<DerivedProperty<bool>>,
}

impl BlurMaskFilter {
    pub fn define(container: &mut PropertyContainer) -> Self {
        Self {
            blur: container.define(prop("blur", parse_number).required()),
            style: container.define(prop("style", parse_blur_style)),
            respect_ctm: container.define(prop("respectCTM", parse_bool)),
        }
    }
}

impl Declaration for BlurMaskFilter {
    fn declare(
        &self,
        props: &PropertyContainer,
        children: &mut DeclarationContext,
    ) -> Result<Option<Effect>, DomError> {
        let own = MaskFilter::blur(
            props.value(self.style).copied().unwrap_or(BlurStyle::Normal),
            *props.require(self.blur)?,
            props.value(self.respect_ctm).copied().unwrap_or(true),
        );
        Ok(compose_with_children(own, &mut children.mask_filters).map(Effect::MaskFilter))
    }
}
