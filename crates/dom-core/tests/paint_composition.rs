//! Paint Composition Tests
//!
//! Tests for inherited paint state, declaration ordering, canvas transforms
//! and clips, and required-property enforcement during a frame.

mod common;

use common::{Raster, BLUE, CLEAR, GREEN, RED};
use dom_core::{Dom, DomError, NodeHandle, NodeType, PropertyValue};

fn rect(dom: &Dom, x: f64, y: f64, size: f64) -> NodeHandle {
    let rect = dom.create(NodeType::Rect);
    rect.set_prop("x", x);
    rect.set_prop("y", y);
    rect.set_prop("width", size);
    rect.set_prop("height", size);
    rect
}

fn declaration(dom: &Dom, node_type: NodeType, props: &[(&str, PropertyValue)]) -> NodeHandle {
    let node = dom.create(node_type);
    for (name, value) in props {
        assert!(node.set_prop(name, value.clone()), "unknown property {}", name);
    }
    node
}

/// Opacity multiplies down the tree.
///
/// Validates:
/// - opacity inheritance (0.5 * 0.5)
/// - paint_for()
#[test]
fn nested_opacity_multiplies() {
    let (dom, mut graph) = Dom::new();
    let group = dom.create(NodeType::Group);
    group.set_prop("opacity", 0.5);
    let square = rect(&dom, 0.0, 0.0, 4.0);
    square.set_prop("opacity", 0.5);
    group.add_child(&square).unwrap();
    dom.root().add_child(&group).unwrap();

    let mut raster = Raster::new(8, 8);
    graph.render_frame(raster.canvas()).unwrap();
    let group_alpha = graph.paint_for(group.id()).unwrap().alpha_f();
    let square_alpha = graph.paint_for(square.id()).unwrap().alpha_f();
    assert!((group_alpha - 0.5).abs() < 0.01, "group alpha {}", group_alpha);
    assert!((square_alpha - 0.25).abs() < 0.01, "square alpha {}", square_alpha);
}

/// A child without its own opacity inherits the parent's.
#[test]
fn opacity_is_inherited() {
    let (dom, mut graph) = Dom::new();
    let group = dom.create(NodeType::Group);
    group.set_prop("opacity", 0.5);
    let square = rect(&dom, 0.0, 0.0, 4.0);
    group.add_child(&square).unwrap();
    dom.root().add_child(&group).unwrap();

    let mut raster = Raster::new(8, 8);
    graph.render_frame(raster.canvas()).unwrap();
    let square_alpha = graph.paint_for(square.id()).unwrap().alpha_f();
    assert!((square_alpha - 0.5).abs() < 0.01, "square alpha {}", square_alpha);
}

/// A parent paint change reaches children that only inherit.
#[test]
fn parent_color_change_invalidates_children() {
    let (dom, mut graph) = Dom::new();
    let group = dom.create(NodeType::Group);
    group.set_prop("color", "red");
    let square = rect(&dom, 0.0, 0.0, 4.0);
    square.set_prop("strokeWidth", 2.0);
    group.add_child(&square).unwrap();
    dom.root().add_child(&group).unwrap();

    let mut raster = Raster::new(8, 8);
    graph.render_frame(raster.canvas()).unwrap();
    assert_eq!(raster.pixel(1, 1), RED);

    group.set_prop("color", "blue");
    graph.render_frame(raster.canvas()).unwrap();
    assert_eq!(raster.pixel(1, 1), BLUE);
    let paint = graph.paint_for(square.id()).unwrap();
    assert_eq!(paint.stroke_width(), 2.0);
}

/// With `[c1, c2]` declared, `c1` is applied last.
#[test]
fn first_declared_color_filter_is_outermost() {
    let (dom, mut graph) = Dom::new();
    let square = rect(&dom, 0.0, 0.0, 8.0);
    square.set_prop("color", "red");
    for color in ["lime", "blue"] {
        let filter = declaration(
            &dom,
            NodeType::BlendColorFilter,
            &[("color", color.into()), ("mode", "src".into())],
        );
        square.add_child(&filter).unwrap();
    }
    dom.root().add_child(&square).unwrap();

    let mut raster = Raster::new(8, 8);
    graph.render_frame(raster.canvas()).unwrap();
    assert_eq!(raster.pixel(4, 4), GREEN);
}

/// Sibling shaders blend source-over, later over earlier.
#[test]
fn later_shader_draws_over_earlier() {
    let (dom, mut graph) = Dom::new();
    let square = rect(&dom, 0.0, 0.0, 8.0);
    for color in ["red", "blue"] {
        let shader = declaration(&dom, NodeType::ColorShader, &[("color", color.into())]);
        square.add_child(&shader).unwrap();
    }
    dom.root().add_child(&square).unwrap();

    let mut raster = Raster::new(8, 8);
    graph.render_frame(raster.canvas()).unwrap();
    assert_eq!(raster.pixel(4, 4), BLUE);
}

/// A declaration's children are consumed by it and do not leak to the node.
#[test]
fn nested_declarations_stay_scoped() {
    let (dom, mut graph) = Dom::new();
    let square = rect(&dom, 0.0, 0.0, 8.0);
    let blend = declaration(&dom, NodeType::BlendShader, &[("mode", "srcOver".into())]);
    for color in ["red", "lime"] {
        let shader = declaration(&dom, NodeType::ColorShader, &[("color", color.into())]);
        blend.add_child(&shader).unwrap();
    }
    square.add_child(&blend).unwrap();
    dom.root().add_child(&square).unwrap();

    let mut raster = Raster::new(8, 8);
    graph.render_frame(raster.canvas()).unwrap();
    assert_eq!(raster.pixel(4, 4), GREEN);
}

/// Validates:
/// - transform list (translateX)
/// - clip rect, invertClip
#[test]
fn transform_and_clip() {
    let (dom, mut graph) = Dom::new();
    let moved = dom.create(NodeType::Group);
    moved.set_prop(
        "transform",
        PropertyValue::Array(vec![PropertyValue::object([("translateX", 8.0)])]),
    );
    let square = rect(&dom, 0.0, 0.0, 4.0);
    square.set_prop("color", "red");
    moved.add_child(&square).unwrap();

    let clipped = dom.create(NodeType::Group);
    clipped.set_prop(
        "clip",
        PropertyValue::object([("x", 0.0), ("y", 8.0), ("width", 4.0), ("height", 4.0)]),
    );
    let fill = dom.create(NodeType::Fill);
    fill.set_prop("color", "blue");
    clipped.add_child(&fill).unwrap();

    dom.root().add_child(&moved).unwrap();
    dom.root().add_child(&clipped).unwrap();

    let mut raster = Raster::new(16, 16);
    graph.render_frame(raster.canvas()).unwrap();
    assert_eq!(raster.pixel(1, 1), CLEAR);
    assert_eq!(raster.pixel(9, 1), RED);
    assert_eq!(raster.pixel(1, 9), BLUE);
    assert_eq!(raster.pixel(9, 9), CLEAR);

    let mut raster = Raster::new(16, 16);
    clipped.set_prop("invertClip", true);
    graph.render_frame(raster.canvas()).unwrap();
    assert_eq!(raster.pixel(1, 9), CLEAR);
    assert_eq!(raster.pixel(12, 12), BLUE);
}

/// A required declaration property stops the frame until it is provided.
///
/// Validates:
/// - MissingRequiredProperty names the property and node type
/// - the frame succeeds once the property is set
#[test]
fn missing_blur_fails_the_frame() {
    let (dom, mut graph) = Dom::new();
    let square = rect(&dom, 0.0, 0.0, 4.0);
    let blur = dom.create(NodeType::BlurImageFilter);
    square.add_child(&blur).unwrap();
    dom.root().add_child(&square).unwrap();

    let mut raster = Raster::new(8, 8);
    match graph.render_frame(raster.canvas()) {
        Err(DomError::MissingRequiredProperty {
            property,
            node_type,
        }) => {
            assert_eq!(property, "blur");
            assert_eq!(node_type, "blurImageFilter");
        }
        other => panic!("expected MissingRequiredProperty, got {:?}", other),
    }

    blur.set_prop("blur", 1.0);
    graph.render_frame(raster.canvas()).unwrap();
    assert!(graph.paint_for(square.id()).unwrap().image_filter().is_some());
}

#[test]
fn unknown_style_literal_is_fatal() {
    let (dom, mut graph) = Dom::new();
    let square = rect(&dom, 0.0, 0.0, 4.0);
    square.set_prop("style", "dotted");
    dom.root().add_child(&square).unwrap();

    let mut raster = Raster::new(8, 8);
    assert!(matches!(
        graph.render_frame(raster.canvas()),
        Err(DomError::UnknownEnumLiteral { .. })
    ));
}
