use super::{BaseProperty, NodeProperty};
use crate::errors::DomError;
use crate::value::PropertyValue;
use std::any::Any;
use std::fmt;
use tracing::trace;

type Producer<T> = Box<dyn FnMut(&PropertyInputs<'_>) -> Result<Option<T>, DomError> + Send>;

/// Read access to the inputs of a [`DerivedProperty`] while it recomputes.
pub struct PropertyInputs<'a> {
    children: &'a [Box<dyn BaseProperty>],
}

impl<'a> PropertyInputs<'a> {
    fn node(&self, name: &str) -> Option<&'a NodeProperty> {
        self.children
            .iter()
            .filter(|c| c.name() == name)
            .find_map(|c| c.as_any().downcast_ref::<NodeProperty>())
    }

    /// Committed value of the leaf input `name`, if set.
    pub fn value(&self, name: &str) -> Option<&'a PropertyValue> {
        self.node(name).and_then(NodeProperty::get)
    }

    /// Current value of the derived input `name`, if set.
    pub fn derived<T: PartialEq + Send + fmt::Debug + 'static>(&self, name: &str) -> Option<&'a T> {
        self.children
            .iter()
            .filter(|c| c.name() == name)
            .find_map(|c| c.as_any().downcast_ref::<DerivedProperty<T>>())
            .and_then(DerivedProperty::value)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.children
            .iter()
            .any(|c| c.name() == name && c.is_set())
    }

    pub fn number(&self, name: &str) -> Result<Option<f32>, DomError> {
        self.value(name)
            .map(|v| v.as_number().map(|n| n as f32))
            .transpose()
    }
}

/// A memoized value computed from other properties.
///
/// The producer runs during `commit` only if at least one input changed in the
/// same pass. Returning `Ok(None)` leaves the property unset without raising;
/// `changed` is only raised when the produced value differs from the cached one.
pub struct DerivedProperty<T> {
    name: String,
    children: Vec<Box<dyn BaseProperty>>,
    producer: Producer<T>,
    value: Option<T>,
    changed: bool,
    required: bool,
    recomputations: usize,
}

impl<T: PartialEq + Send + fmt::Debug + 'static> DerivedProperty<T> {
    pub fn new<F>(name: impl Into<String>, children: Vec<Box<dyn BaseProperty>>, producer: F) -> Self
    where
        F: FnMut(&PropertyInputs<'_>) -> Result<Option<T>, DomError> + Send + 'static,
    {
        Self {
            name: name.into(),
            children,
            producer: Box::new(producer),
            value: None,
            changed: false,
            required: false,
            recomputations: 0,
        }
    }

    /// A derived property over a single leaf, converting its value with `parse`.
    pub fn over<F>(node: NodeProperty, mut parse: F) -> Self
    where
        F: FnMut(&PropertyValue) -> Result<T, DomError> + Send + 'static,
    {
        let name = node.name().to_string();
        let key = name.clone();
        Self::new(name, vec![Box::new(node)], move |inputs| {
            inputs.value(&key).map(&mut parse).transpose()
        })
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Number of times the producer has run.
    pub fn recompute_count(&self) -> usize {
        self.recomputations
    }

    fn recompute(&mut self) -> Result<(), DomError> {
        self.recomputations += 1;
        let next = (self.producer)(&PropertyInputs {
            children: &self.children,
        })?;
        trace!(property = %self.name, set = next.is_some(), "recomputed derived property");
        if next != self.value {
            self.value = next;
            self.changed = true;
        }
        Ok(())
    }
}

impl<T: PartialEq + Send + fmt::Debug + 'static> BaseProperty for DerivedProperty<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn commit(&mut self) -> Result<(), DomError> {
        let mut inputs_changed = false;
        for child in &mut self.children {
            child.commit()?;
            inputs_changed |= child.is_changed();
        }
        if inputs_changed {
            self.recompute()?;
        }
        Ok(())
    }

    fn resolve(&mut self) {
        self.changed = false;
        for child in &mut self.children {
            child.resolve();
        }
    }

    fn is_set(&self) -> bool {
        self.value.is_some()
    }

    fn is_changed(&self) -> bool {
        self.changed
    }

    fn is_required(&self) -> bool {
        self.required
    }

    fn children(&self) -> &[Box<dyn BaseProperty>] {
        &self.children
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: fmt::Debug> fmt::Debug for DerivedProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedProperty")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("changed", &self.changed)
            .field("children", &self.children)
            .finish()
    }
}
