//! # Property System
//!
//! Double-buffered node properties, memoized derived properties and the
//! per-node container that routes update-role writes.
//!
//! ## Key Types
//! - `NodeProperty`: leaf holding a committed value and a pending mailbox.
//! - `DerivedProperty<T>`: value computed from other properties, recomputed only
//!   when an input changed during the commit pass.
//! - `PropertyContainer`: registry, router and validator for one node.
//! - `PropKey<P>`: typed index of a property inside its container.

use crate::errors::DomError;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

pub mod container;
pub mod convert;
pub mod derived;
pub mod node_property;

pub use container::{PropertyContainer, PropertyRouter};
pub use derived::{DerivedProperty, PropertyInputs};
pub use node_property::{NodeProperty, PropertyWriter};

/// Behaviour shared by leaf and derived properties.
pub trait BaseProperty: Any + Send + fmt::Debug {
    fn name(&self) -> &str;

    /// Moves pending input into the committed state. Render role only.
    fn commit(&mut self) -> Result<(), DomError>;

    /// Clears the change flag at the end of a frame.
    fn resolve(&mut self);

    fn is_set(&self) -> bool;

    fn is_changed(&self) -> bool;

    fn is_required(&self) -> bool;

    /// Input properties this property is computed from.
    fn children(&self) -> &[Box<dyn BaseProperty>] {
        &[]
    }

    /// Collects the update-role writers reachable from this property, one entry
    /// per leaf with its name first and its aliases after.
    fn collect_writers(&self, out: &mut Vec<(Vec<String>, PropertyWriter)>) {
        for child in self.children() {
            child.collect_writers(out);
        }
    }

    fn as_any(&self) -> &dyn Any;
}

/// Returns the name of the first required property in the tree rooted at
/// `property` that has no value.
pub(crate) fn first_missing_required(property: &dyn BaseProperty) -> Option<String> {
    if property.is_required() && !property.is_set() {
        return Some(property.name().to_string());
    }
    property
        .children()
        .iter()
        .find_map(|child| first_missing_required(child.as_ref()))
}

/// Typed handle to a property registered in a [`PropertyContainer`].
pub struct PropKey<P> {
    index: usize,
    _marker: PhantomData<fn() -> P>,
}

impl<P> PropKey<P> {
    fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }
}

impl<P> Clone for PropKey<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for PropKey<P> {}

impl<P> fmt::Debug for PropKey<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropKey({})", self.index)
    }
}
