use super::BaseProperty;
use crate::errors::DomError;
use crate::value::PropertyValue;
use std::any::Any;
use std::sync::{Arc, Mutex};

type Mailbox = Arc<Mutex<Option<PropertyValue>>>;

/// Update-role half of a [`NodeProperty`].
///
/// Holds at most one pending value; a new write replaces whatever has not been
/// committed yet.
#[derive(Debug, Clone)]
pub struct PropertyWriter {
    mailbox: Mailbox,
}

impl PropertyWriter {
    pub fn write(&self, value: PropertyValue) {
        *self.mailbox.lock().unwrap() = Some(value);
    }

    pub fn has_pending(&self) -> bool {
        self.mailbox.lock().unwrap().is_some()
    }
}

/// A named, double-buffered leaf property.
///
/// The render role reads `committed`; the update role only ever touches the
/// mailbox through a [`PropertyWriter`].
#[derive(Debug)]
pub struct NodeProperty {
    name: String,
    aliases: Vec<String>,
    committed: Option<PropertyValue>,
    mailbox: Mailbox,
    changed: bool,
    required: bool,
}

impl NodeProperty {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            committed: None,
            mailbox: Arc::new(Mutex::new(None)),
            changed: false,
            required: false,
        }
    }

    /// Makes the property addressable under an additional external name.
    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.aliases.push(name.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn writer(&self) -> PropertyWriter {
        PropertyWriter {
            mailbox: self.mailbox.clone(),
        }
    }

    /// Shorthand for writing through this property's own mailbox.
    pub fn write(&self, value: PropertyValue) {
        self.writer().write(value);
    }

    /// The committed value.
    ///
    /// Fails with `PreconditionViolation` when the property is not set; callers
    /// are expected to check [`BaseProperty::is_set`] first.
    pub fn value(&self) -> Result<&PropertyValue, DomError> {
        match &self.committed {
            Some(v) if !v.is_nullish() => Ok(v),
            _ => Err(DomError::PreconditionViolation(format!(
                "property \"{}\" read before it was set",
                self.name
            ))),
        }
    }

    /// The committed value if set.
    pub fn get(&self) -> Option<&PropertyValue> {
        self.committed.as_ref().filter(|v| !v.is_nullish())
    }
}

impl BaseProperty for NodeProperty {
    fn name(&self) -> &str {
        &self.name
    }

    fn commit(&mut self) -> Result<(), DomError> {
        let pending = self.mailbox.lock().unwrap().take();
        if let Some(value) = pending {
            self.committed = Some(value);
            self.changed = true;
        }
        Ok(())
    }

    fn resolve(&mut self) {
        self.changed = false;
    }

    fn is_set(&self) -> bool {
        self.get().is_some()
    }

    fn is_changed(&self) -> bool {
        self.changed
    }

    fn is_required(&self) -> bool {
        self.required
    }

    fn collect_writers(&self, out: &mut Vec<(Vec<String>, PropertyWriter)>) {
        let mut names = vec![self.name.clone()];
        names.extend(self.aliases.iter().cloned());
        out.push((names, self.writer()));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_lands_in_pending_buffer_only() {
        let mut prop = NodeProperty::new("opacity");
        prop.write(0.5.into());
        assert!(!prop.is_set());
        assert!(prop.writer().has_pending());

        prop.commit().unwrap();
        assert!(prop.is_set());
        assert!(prop.is_changed());
        assert!(!prop.writer().has_pending());
        assert_eq!(prop.value().unwrap(), &PropertyValue::Number(0.5));
    }

    #[test]
    fn last_write_wins() {
        let mut prop = NodeProperty::new("color");
        let writer = prop.writer();
        writer.write("red".into());
        writer.write("blue".into());
        prop.commit().unwrap();
        assert_eq!(prop.value().unwrap().as_string().unwrap(), "blue");
    }

    #[test]
    fn changed_window_closes_on_resolve() {
        let mut prop = NodeProperty::new("x");
        prop.write(1.0.into());
        prop.commit().unwrap();
        prop.resolve();
        assert!(!prop.is_changed());

        // Nothing pending: commit is a no-op.
        prop.commit().unwrap();
        assert!(!prop.is_changed());
        assert_eq!(prop.value().unwrap(), &PropertyValue::Number(1.0));
    }

    #[test]
    fn reading_unset_value_is_a_precondition_violation() {
        let mut prop = NodeProperty::new("r");
        assert!(matches!(
            prop.value(),
            Err(DomError::PreconditionViolation(_))
        ));

        prop.write(PropertyValue::Null);
        prop.commit().unwrap();
        assert!(prop.is_changed());
        assert!(!prop.is_set());
        assert!(prop.value().is_err());
    }

    #[test]
    fn round_trip_preserves_nested_values() {
        let values = vec![
            PropertyValue::Bool(true),
            PropertyValue::Number(-3.25),
            PropertyValue::from("text"),
            PropertyValue::Array(vec![1.0.into(), PropertyValue::Array(vec!["a".into()])]),
            PropertyValue::object([(
                "outer",
                PropertyValue::object([("inner", PropertyValue::from(vec![1.0, 2.0]))]),
            )]),
            PropertyValue::opaque(7_u8),
            PropertyValue::Callable("onFrame".into()),
        ];
        let mut prop = NodeProperty::new("v");
        for v in values {
            prop.write(v.clone());
            prop.commit().unwrap();
            assert_eq!(prop.value().unwrap(), &v);
            prop.resolve();
        }
    }
}
