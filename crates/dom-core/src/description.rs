//! # Scene Descriptions
//!
//! Declarative `{ type, props, children }` trees, loaded from JSON or from a
//! Rhai script whose result is such a map, and mounted through a [`Dom`].

use crate::dom::{Dom, NodeHandle};
use crate::errors::DomError;
use crate::node::NodeType;
use crate::value::PropertyValue;
use rhai::{Dynamic, Engine};
use std::path::Path;
use tracing::{debug, instrument};

/// One node of a scene description.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDescription {
    pub node_type: NodeType,
    /// Object of property values, or `Undefined` when the node sets none.
    pub props: PropertyValue,
    pub children: Vec<NodeDescription>,
}

impl NodeDescription {
    pub fn from_value(value: &PropertyValue) -> Result<Self, DomError> {
        let node_type = value.as_object("type")?.as_string()?.parse()?;
        let props = value.as_object("props")?.clone();
        if !props.is_nullish() {
            props.as_map()?;
        }
        let children = match value.as_object("children")? {
            c if c.is_nullish() => Vec::new(),
            c => c
                .as_array()?
                .iter()
                .map(Self::from_value)
                .collect::<Result<_, _>>()?,
        };
        Ok(Self {
            node_type,
            props,
            children,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, DomError> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Self::from_value(&PropertyValue::from(&json))
    }

    /// Evaluates `script` and reads the description from the map it returns.
    pub fn from_rhai(script: &str) -> Result<Self, DomError> {
        let engine = Engine::new();
        let result: Dynamic = engine
            .eval(script)
            .map_err(|e| DomError::Script(e.to_string()))?;
        Self::from_value(&PropertyValue::from_dynamic(&result))
    }

    /// Loads a `.rhai` script or, for any other extension, a JSON document.
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> Result<Self, DomError> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("rhai") => Self::from_rhai(&text),
            _ => Self::from_json(&text),
        }
    }

    /// Creates the described subtree. The caller attaches the returned root.
    pub fn build(&self, dom: &Dom) -> Result<NodeHandle, DomError> {
        let handle = dom.create(self.node_type);
        if !self.props.is_nullish() {
            handle.set_props(&self.props)?;
        }
        for child in &self.children {
            handle.add_child(&child.build(dom)?)?;
        }
        Ok(handle)
    }

    /// Builds the subtree and appends it to the scene root.
    pub fn mount(&self, dom: &Dom) -> Result<NodeHandle, DomError> {
        let handle = self.build(dom)?;
        dom.root().add_child(&handle)?;
        debug!("Mounted {} node {}", self.node_type, handle.id());
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_tree() {
        let description = NodeDescription::from_json(
            r##"{
                "type": "group",
                "children": [
                    { "type": "rect", "props": { "width": 10, "height": 5, "color": "#f00" } },
                    { "type": "circle", "props": { "r": 3 }, "children": [
                        { "type": "blurMaskFilter", "props": { "blur": 2 } }
                    ] }
                ]
            }"##,
        )
        .unwrap();
        assert_eq!(description.node_type, NodeType::Group);
        assert_eq!(description.props, PropertyValue::Undefined);
        assert_eq!(description.children.len(), 2);
        assert_eq!(description.children[1].children[0].node_type, NodeType::BlurMaskFilter);
        assert_eq!(
            description.children[0].props.as_object("width").unwrap(),
            &PropertyValue::Number(10.0)
        );
    }

    #[test]
    fn rhai_tree() {
        let description = NodeDescription::from_rhai(
            r#"
                let size = 4 * 8;
                #{ "type": "rect", "props": #{ "width": size, "height": size } }
            "#,
        )
        .unwrap();
        assert_eq!(description.node_type, NodeType::Rect);
        assert_eq!(
            description.props.as_object("width").unwrap(),
            &PropertyValue::Number(32.0)
        );
    }

    #[test]
    fn malformed_descriptions() {
        assert!(matches!(
            NodeDescription::from_json(r#"{ "type": "blob" }"#),
            Err(DomError::UnknownNodeType(_))
        ));
        assert!(matches!(
            NodeDescription::from_json(r#"{ "type": "rect", "props": 3 }"#),
            Err(DomError::TypeMismatch { .. })
        ));
        assert!(matches!(
            NodeDescription::from_rhai("let x = ;"),
            Err(DomError::Script(_))
        ));
        assert!(matches!(
            NodeDescription::from_json("{"),
            Err(DomError::Json(_))
        ));
    }

    #[test]
    fn declaration_with_render_child_fails_to_build() {
        let (dom, _graph) = Dom::new();
        let description = NodeDescription::from_json(
            r#"{ "type": "colorShader", "props": { "color": "red" },
                 "children": [ { "type": "rect" } ] }"#,
        )
        .unwrap();
        assert!(matches!(
            description.build(&dom),
            Err(DomError::StructuralConstraintViolation { .. })
        ));
    }
}
