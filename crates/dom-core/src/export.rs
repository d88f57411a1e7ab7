//! # Export
//!
//! Renders a single frame of a scene into a raster surface and encodes it as PNG.

use crate::errors::DomError;
use crate::props::convert::{parse_color, Color};
use crate::scene::SceneGraph;
use serde::{Deserialize, Serialize};
use skia_safe::{surfaces, EncodedImageFormat, Image};
use tracing::{info, instrument};

/// Output settings for a rendered frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: i32,
    pub height: i32,
    /// Any color string the scene accepts, e.g. `"#202020"` or `"transparent"`.
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            background: "white".to_string(),
        }
    }
}

impl RenderConfig {
    pub fn background_color(&self) -> Result<Color, DomError> {
        parse_color(&self.background.as_str().into())
    }
}

/// Runs one full frame into a new raster image.
#[instrument(level = "debug", skip(graph), fields(width = config.width, height = config.height))]
pub fn render_to_image(graph: &mut SceneGraph, config: &RenderConfig) -> Result<Image, DomError> {
    if config.width <= 0 || config.height <= 0 {
        return Err(DomError::invalid(
            "size",
            format!("{}x{} is not a drawable size", config.width, config.height),
        ));
    }
    let background = config.background_color()?;
    let mut surface = surfaces::raster_n32_premul((config.width, config.height))
        .ok_or(DomError::SurfaceFailure)?;
    let canvas = surface.canvas();
    canvas.clear(background.to_color4f());
    graph.render_frame(canvas)?;
    Ok(surface.image_snapshot())
}

/// Renders one frame and returns it PNG-encoded.
pub fn render_to_png(graph: &mut SceneGraph, config: &RenderConfig) -> Result<Vec<u8>, DomError> {
    let image = render_to_image(graph, config)?;
    let data = image
        .encode(None, EncodedImageFormat::PNG, 100)
        .ok_or(DomError::EncodeFailure)?;
    info!("Encoded {} byte PNG", data.len());
    Ok(data.as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: RenderConfig = serde_json::from_str(r#"{ "width": 64 }"#).unwrap();
        assert_eq!(config.width, 64);
        assert_eq!(config.height, 512);
        assert_eq!(config.background_color().unwrap(), Color::WHITE);
    }

    #[test]
    fn empty_size_is_rejected() {
        let (_dom, mut graph) = crate::dom::Dom::new();
        let config = RenderConfig {
            width: 0,
            ..RenderConfig::default()
        };
        assert!(matches!(
            render_to_png(&mut graph, &config),
            Err(DomError::InvalidValue { .. })
        ));
    }
}
