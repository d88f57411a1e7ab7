use super::{first_missing_required, BaseProperty, DerivedProperty, PropKey, PropertyWriter};
use crate::errors::DomError;
use crate::value::PropertyValue;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, error};

/// Maps external property names to the mailboxes they feed.
///
/// One name may fan out to several properties of the same node. The router is
/// fixed once the node's properties are defined and is shared with the update role.
#[derive(Debug, Clone, Default)]
pub struct PropertyRouter {
    routes: HashMap<String, Vec<PropertyWriter>>,
    leaves: Vec<(Vec<String>, PropertyWriter)>,
}

impl PropertyRouter {
    /// Writes `value` to every property mapped to `name`.
    ///
    /// Returns `false` when no property answers to `name`.
    pub fn route_write(&self, name: &str, value: PropertyValue) -> bool {
        match self.routes.get(name) {
            Some(writers) => {
                for writer in writers {
                    writer.write(value.clone());
                }
                true
            }
            None => {
                debug!("Ignoring write to unknown property \"{}\"", name);
                false
            }
        }
    }

    /// Replaces the whole property set from an object value.
    ///
    /// Each leaf takes the value of the first of its names present in `props`.
    /// Leaves with none of their names present are written as `Undefined`.
    pub fn set_props(&self, props: &PropertyValue) -> Result<(), DomError> {
        let map = props.as_map()?;
        for (names, writer) in &self.leaves {
            let value = names
                .iter()
                .find_map(|name| map.get(name))
                .cloned()
                .unwrap_or_default();
            writer.write(value);
        }
        for name in map.keys().filter(|k| !self.routes.contains_key(k.as_str())) {
            debug!("Ignoring unknown property \"{}\"", name);
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }
}

/// Owns the property set of one node.
pub struct PropertyContainer {
    node_type: String,
    properties: Vec<Box<dyn BaseProperty>>,
    router: PropertyRouter,
}

impl PropertyContainer {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            properties: Vec::new(),
            router: PropertyRouter::default(),
        }
    }

    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    /// Registers a top-level property and the names of all leaves beneath it.
    pub fn define<P: BaseProperty>(&mut self, property: P) -> PropKey<P> {
        let mut writers = Vec::new();
        property.collect_writers(&mut writers);
        for (names, writer) in writers {
            for name in &names {
                self.router
                    .routes
                    .entry(name.clone())
                    .or_default()
                    .push(writer.clone());
            }
            self.router.leaves.push((names, writer));
        }
        self.properties.push(Box::new(property));
        PropKey::new(self.properties.len() - 1)
    }

    pub fn get<P: BaseProperty>(&self, key: PropKey<P>) -> &P {
        self.properties
            .get(key.index)
            .and_then(|p| p.as_any().downcast_ref::<P>())
            .expect("property key does not belong to this container")
    }

    /// Value of a derived property, `None` while unset.
    pub fn value<T>(&self, key: PropKey<DerivedProperty<T>>) -> Option<&T>
    where
        T: PartialEq + Send + fmt::Debug + 'static,
    {
        self.get(key).value()
    }

    /// Value of a derived property that validation guarantees to be set.
    pub fn require<T>(&self, key: PropKey<DerivedProperty<T>>) -> Result<&T, DomError>
    where
        T: PartialEq + Send + fmt::Debug + 'static,
    {
        let property = self.get(key);
        property.value().ok_or_else(|| {
            DomError::PreconditionViolation(format!(
                "property \"{}\" of {} read before it was set",
                property.name(),
                self.node_type
            ))
        })
    }

    pub fn router(&self) -> &PropertyRouter {
        &self.router
    }

    pub fn route_write(&self, name: &str, value: PropertyValue) -> bool {
        self.router.route_write(name, value)
    }

    /// Commits every property, then checks required properties.
    ///
    /// Returns whether any top-level property changed.
    pub fn update_pending_values(&mut self) -> Result<bool, DomError> {
        let mut changed = false;
        for property in &mut self.properties {
            property.commit()?;
            changed |= property.is_changed();
        }
        if let Some(property) = self
            .properties
            .iter()
            .find_map(|p| first_missing_required(p.as_ref()))
        {
            error!(
                "Missing required property \"{}\" on {}",
                property, self.node_type
            );
            return Err(DomError::MissingRequiredProperty {
                property,
                node_type: self.node_type.clone(),
            });
        }
        Ok(changed)
    }

    pub fn mark_as_resolved(&mut self) {
        for property in &mut self.properties {
            property.resolve();
        }
    }

    /// Drops every property. Keys handed out earlier become invalid.
    pub fn clear(&mut self) {
        self.properties.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl fmt::Debug for PropertyContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyContainer")
            .field("node_type", &self.node_type)
            .field("properties", &self.properties)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::NodeProperty;

    fn blur_container() -> (PropertyContainer, PropKey<DerivedProperty<f32>>) {
        let mut container = PropertyContainer::new("blurImageFilter");
        let blur = container.define(
            DerivedProperty::over(NodeProperty::new("blur"), |v| {
                v.as_number().map(|n| n as f32)
            })
            .required(),
        );
        (container, blur)
    }

    #[test]
    fn required_property_must_be_set() {
        let (mut container, blur) = blur_container();
        match container.update_pending_values() {
            Err(DomError::MissingRequiredProperty {
                property,
                node_type,
            }) => {
                assert_eq!(property, "blur");
                assert_eq!(node_type, "blurImageFilter");
            }
            other => panic!("expected MissingRequiredProperty, got {:?}", other),
        }

        assert!(container.route_write("blur", 4.0.into()));
        assert!(container.update_pending_values().unwrap());
        assert_eq!(container.value(blur), Some(&4.0));
    }

    #[test]
    fn required_child_of_derived_is_checked() {
        let mut container = PropertyContainer::new("circle");
        container.define(DerivedProperty::<f32>::new(
            "radius",
            vec![Box::new(NodeProperty::new("r").required())],
            |inputs| inputs.number("r"),
        ));
        assert!(matches!(
            container.update_pending_values(),
            Err(DomError::MissingRequiredProperty { ref property, .. }) if property == "r"
        ));
    }

    #[test]
    fn one_name_fans_out_to_several_properties() {
        let mut container = PropertyContainer::new("test");
        let first = container.define(DerivedProperty::over(NodeProperty::new("color"), |v| {
            v.as_string().map(str::to_string)
        }));
        let second = container.define(DerivedProperty::over(
            NodeProperty::new("tint").alias("color"),
            |v| v.as_string().map(str::to_string),
        ));
        assert!(container.route_write("color", "red".into()));
        container.update_pending_values().unwrap();
        assert_eq!(container.value(first).map(String::as_str), Some("red"));
        assert_eq!(container.value(second).map(String::as_str), Some("red"));
    }

    #[test]
    fn set_props_replaces_the_whole_set() {
        let mut container = PropertyContainer::new("test");
        let x = container.define(DerivedProperty::over(NodeProperty::new("x"), |v| {
            v.as_number()
        }));
        let y = container.define(DerivedProperty::over(NodeProperty::new("y"), |v| {
            v.as_number()
        }));
        let router = container.router().clone();

        router
            .set_props(&PropertyValue::object([("x", 1.0), ("y", 2.0)]))
            .unwrap();
        container.update_pending_values().unwrap();
        container.mark_as_resolved();
        assert_eq!(container.value(y), Some(&2.0));

        router
            .set_props(&PropertyValue::object([("x", 3.0)]))
            .unwrap();
        container.update_pending_values().unwrap();
        assert_eq!(container.value(x), Some(&3.0));
        assert_eq!(container.value(y), None);
        assert!(router.set_props(&PropertyValue::from(1.0)).is_err());
    }

    #[test]
    fn set_props_through_an_alias_is_stable() {
        for _ in 0..64 {
            let mut container = PropertyContainer::new("test");
            let tint = container.define(DerivedProperty::over(
                NodeProperty::new("tint").alias("color"),
                |v| v.as_string().map(str::to_string),
            ));
            container
                .router()
                .clone()
                .set_props(&PropertyValue::object([("color", "red")]))
                .unwrap();
            container.update_pending_values().unwrap();
            assert_eq!(container.value(tint).map(String::as_str), Some("red"));
        }
    }

    #[test]
    fn unknown_names_are_ignored() {
        let (container, _) = blur_container();
        assert!(!container.route_write("radius", 1.0.into()));
    }
}
