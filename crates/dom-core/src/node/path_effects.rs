use super::{compose_with_children, Declaration};
use crate::declarations::{DeclarationContext, Effect};
use crate::errors::DomError;
use crate::props::convert::{parse_number, parse_numbers, prop};
use crate::props::{DerivedProperty, PropKey, PropertyContainer};
use crate::value::PropertyValue;
use skia_safe::PathEffect;

fn finish(own: Option<PathEffect>, children: &mut DeclarationContext) -> Option<Effect> {
    compose_with_children(own, &mut children.path_effects).map(Effect::PathEffect)
}

#[derive(Debug)]
pub struct DashPathEffect {
    intervals: PropKey<DerivedProperty<Vec<f32>>>,
    phase: PropKey<DerivedProperty<f32>>,
}

impl DashPathEffect {
    pub fn define(container: &mut PropertyContainer) -> Self {
        let intervals = prop("intervals", |v: &PropertyValue| {
            let intervals = parse_numbers(v)?;
            if intervals.is_empty() || intervals.len() % 2 != 0 {
                return Err(DomError::invalid(
                    "intervals",
                    "expected a non-empty, even number of intervals",
                ));
            }
            Ok(intervals)
        });
        Self {
            intervals: container.define(intervals.required()),
            phase: container.define(prop("phase", parse_number)),
        }
    }
}

impl Declaration for DashPathEffect {
    fn declare(
        &self,
        props: &PropertyContainer,
        children: &mut DeclarationContext,
    ) -> Result<Option<Effect>, DomError> {
        let intervals = props.require(self.intervals)?;
        let phase = props.value(self.phase).copied().unwrap_or(0.0);
        Ok(finish(PathEffect::dash(intervals, phase), children))
    }
}

#[derive(Debug)]
pub struct CornerPathEffect {
    r: PropKey<DerivedProperty<f32>>,
}

impl CornerPathEffect {
    pub fn define(container: &mut PropertyContainer) -> Self {
        Self {
            r: container.define(prop("r", parse_number).required()),
        }
    }
}

impl Declaration for CornerPathEffect {
    fn declare(
        &self,
        props: &PropertyContainer,
        children: &mut DeclarationContext,
    ) -> Result<Option<Effect>, DomError> {
        let own = PathEffect::corner_path(*props.require(self.r)?);
        Ok(finish(own, children))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::tests::committed;

    #[test]
    fn odd_intervals_are_rejected() {
        let mut container = PropertyContainer::new("dashPathEffect");
        DashPathEffect::define(&mut container);
        container.route_write("intervals", PropertyValue::from(vec![4.0, 2.0, 1.0]));
        assert!(matches!(
            container.update_pending_values(),
            Err(DomError::InvalidValue { .. })
        ));
    }

    #[test]
    fn dash_wraps_corner_child() {
        let (props, node) = committed(
            "dashPathEffect",
            DashPathEffect::define,
            &[("intervals", PropertyValue::from(vec![4.0, 2.0]))],
        );
        let mut context = DeclarationContext::new();
        context.save();
        let corner = PathEffect::corner_path(3.0).unwrap();
        context.push(Effect::PathEffect(corner));
        let effect = node.declare(&props, &mut context).unwrap();
        assert!(matches!(effect, Some(Effect::PathEffect(_))));
        assert!(context.path_effects.is_empty());
    }
}
