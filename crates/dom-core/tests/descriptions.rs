//! Scene Description Tests
//!
//! Tests for building scenes from JSON and Rhai descriptions and exporting them.

mod common;

use common::{Raster, BLUE, CLEAR, RED};
use dom_core::{render_to_image, render_to_png, Dom, NodeDescription, RenderConfig};

const SCENE: &str = r##"{
    "type": "group",
    "children": [
        { "type": "rect", "props": { "width": 4, "height": 4, "color": "#ff0000" } },
        { "type": "circle", "props": { "cx": 12, "cy": 12, "r": 3, "color": "blue" } }
    ]
}"##;

/// Validates:
/// - NodeDescription::from_json()
/// - mount()
/// - nested children reach the render role
#[test]
fn json_scene_renders() {
    let (dom, mut graph) = Dom::new();
    NodeDescription::from_json(SCENE)
        .unwrap()
        .mount(&dom)
        .unwrap();

    let mut raster = Raster::new(16, 16);
    graph.render_frame(raster.canvas()).unwrap();
    assert_eq!(raster.pixel(1, 1), RED);
    assert_eq!(raster.pixel(12, 12), BLUE);
    assert_eq!(raster.pixel(7, 7), CLEAR);
}

/// Validates:
/// - NodeDescription::from_rhai()
/// - script expressions feeding property values
#[test]
fn rhai_scene_renders() {
    let script = r##"
        let children = [];
        for i in 0..3 {
            children.push(#{
                "type": "rect",
                "props": #{ "x": i * 4, "y": 0, "width": 2, "height": 2, "color": "red" }
            });
        }
        #{ "type": "group", "children": children }
    "##;
    let (dom, mut graph) = Dom::new();
    let group = NodeDescription::from_rhai(script)
        .unwrap()
        .mount(&dom)
        .unwrap();
    assert_eq!(group.children().len(), 3);

    let mut raster = Raster::new(12, 4);
    graph.render_frame(raster.canvas()).unwrap();
    assert_eq!(raster.pixel(8, 1), RED);
    assert_eq!(raster.pixel(10, 1), CLEAR);
}

/// Validates:
/// - render_to_png() produces a PNG stream
/// - render_to_image() honours size and background
#[test]
fn export_png() {
    let (dom, mut graph) = Dom::new();
    NodeDescription::from_json(SCENE)
        .unwrap()
        .mount(&dom)
        .unwrap();
    let config = RenderConfig {
        width: 16,
        height: 16,
        background: "white".to_string(),
    };

    let png = render_to_png(&mut graph, &config).unwrap();
    assert_eq!(&png[..4], b"\x89PNG");

    let image = render_to_image(&mut graph, &config).unwrap();
    assert_eq!((image.width(), image.height()), (16, 16));
}
