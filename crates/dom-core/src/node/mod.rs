//! # Node Catalog
//!
//! Every node type the scene graph can hold.
//!
//! ## Key Types
//! - `NodeType`: closed set of node types, named as in scene descriptions.
//! - `NodeKind`: a node either draws (`Render`) or produces an effect (`Declaration`).
//! - `Drawing` / `Declaration`: node-specific behaviour behind those two kinds.

use crate::declarations::{Composable, DeclarationContext, DeclarationStack, Effect};
use crate::errors::DomError;
use crate::props::PropertyContainer;
use skia_safe::{Canvas, Paint};
use std::fmt;
use std::str::FromStr;

pub mod color_filters;
pub mod drawings;
pub mod image_filters;
pub mod mask_filters;
pub mod path_effects;
pub mod render;
pub mod shaders;

pub use render::{Clip, LayerPaint, RenderProps};

/// Index of a node in the scene arena.
pub type NodeId = usize;

/// Draws a render node once its paint is resolved.
pub trait Drawing: Send + fmt::Debug {
    fn draw(&self, props: &PropertyContainer, canvas: &Canvas, paint: &Paint)
        -> Result<(), DomError>;
}

/// Produces the effect of a declaration node.
pub trait Declaration: Send + fmt::Debug {
    /// `children` is the scope the node's own declaration children decorated
    /// into. Whatever is left in it afterwards is discarded.
    fn declare(
        &self,
        props: &PropertyContainer,
        children: &mut DeclarationContext,
    ) -> Result<Option<Effect>, DomError>;
}

pub enum NodeKind {
    Render {
        drawing: Box<dyn Drawing>,
        common: RenderProps,
    },
    Declaration(Box<dyn Declaration>),
}

impl NodeKind {
    pub fn is_declaration(&self) -> bool {
        matches!(self, NodeKind::Declaration(_))
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Render { drawing, .. } => f.debug_tuple("Render").field(drawing).finish(),
            NodeKind::Declaration(d) => f.debug_tuple("Declaration").field(d).finish(),
        }
    }
}

/// `compose(own, children)` where `children` is the merged scope; either side may be absent.
pub(crate) fn compose_with_children<T: Composable>(
    own: Option<T>,
    children: &mut DeclarationStack<T>,
) -> Option<T> {
    match (own, children.pop_as_one()) {
        (Some(own), Some(inner)) => Some(T::compose(own, inner)),
        (own, inner) => own.or(inner),
    }
}

macro_rules! node_types {
    ($($variant:ident => $name:literal, $decl:literal;)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum NodeType {
            $($variant,)*
        }

        impl NodeType {
            pub const ALL: &'static [NodeType] = &[$(NodeType::$variant,)*];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(NodeType::$variant => $name,)*
                }
            }

            /// `true` for nodes that produce effects instead of drawing.
            pub fn is_declaration(&self) -> bool {
                match self {
                    $(NodeType::$variant => $decl,)*
                }
            }
        }

        impl FromStr for NodeType {
            type Err = DomError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(NodeType::$variant),)*
                    other => Err(DomError::UnknownNodeType(other.to_string())),
                }
            }
        }
    };
}

node_types! {
    Group => "group", false;
    Fill => "fill", false;
    Rect => "rect", false;
    RRect => "rrect", false;
    Circle => "circle", false;
    Oval => "oval", false;
    Line => "line", false;
    Path => "path", false;
    ColorShader => "colorShader", true;
    LinearGradient => "linearGradient", true;
    RadialGradient => "radialGradient", true;
    ImageShader => "imageShader", true;
    BlendShader => "blendShader", true;
    MatrixColorFilter => "matrixColorFilter", true;
    BlendColorFilter => "blendColorFilter", true;
    LerpColorFilter => "lerpColorFilter", true;
    LumaColorFilter => "lumaColorFilter", true;
    LinearToSRGBGamma => "linearToSRGBGamma", true;
    SRGBToLinearGamma => "srgbToLinearGamma", true;
    BlurImageFilter => "blurImageFilter", true;
    OffsetImageFilter => "offsetImageFilter", true;
    DropShadowImageFilter => "dropShadowImageFilter", true;
    MorphologyImageFilter => "morphologyImageFilter", true;
    BlurMaskFilter => "blurMaskFilter", true;
    DashPathEffect => "dashPathEffect", true;
    CornerPathEffect => "cornerPathEffect", true;
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Defines the properties of a `node_type` node in `container` and returns its behaviour.
pub fn build(node_type: NodeType, container: &mut PropertyContainer) -> NodeKind {
    fn render(drawing: impl Drawing + 'static, container: &mut PropertyContainer) -> NodeKind {
        NodeKind::Render {
            drawing: Box::new(drawing),
            common: RenderProps::define(container),
        }
    }
    fn declaration(declaration: impl Declaration + 'static) -> NodeKind {
        NodeKind::Declaration(Box::new(declaration))
    }

    use NodeType::*;
    match node_type {
        Group => render(drawings::GroupDrawing, container),
        Fill => render(drawings::FillDrawing, container),
        Rect => render(drawings::RectDrawing::define(container), container),
        RRect => render(drawings::RRectDrawing::define(container), container),
        Circle => render(drawings::CircleDrawing::define(container), container),
        Oval => render(drawings::OvalDrawing::define(container), container),
        Line => render(drawings::LineDrawing::define(container), container),
        Path => render(drawings::PathDrawing::define(container), container),
        ColorShader => declaration(shaders::ColorShader::define(container)),
        LinearGradient => declaration(shaders::LinearGradient::define(container)),
        RadialGradient => declaration(shaders::RadialGradient::define(container)),
        ImageShader => declaration(shaders::ImageShader::define(container)),
        BlendShader => declaration(shaders::BlendShader::define(container)),
        MatrixColorFilter => declaration(color_filters::MatrixColorFilter::define(container)),
        BlendColorFilter => declaration(color_filters::BlendColorFilter::define(container)),
        LerpColorFilter => declaration(color_filters::LerpColorFilter::define(container)),
        LumaColorFilter => declaration(color_filters::LumaColorFilter),
        LinearToSRGBGamma => declaration(color_filters::LinearToSrgbGamma),
        SRGBToLinearGamma => declaration(color_filters::SrgbToLinearGamma),
        BlurImageFilter => declaration(image_filters::BlurImageFilter::define(container)),
        OffsetImageFilter => declaration(image_filters::OffsetImageFilter::define(container)),
        DropShadowImageFilter => {
            declaration(image_filters::DropShadowImageFilter::define(container))
        }
        MorphologyImageFilter => {
            declaration(image_filters::MorphologyImageFilter::define(container))
        }
        BlurMaskFilter => declaration(mask_filters::BlurMaskFilter::define(container)),
        DashPathEffect => declaration(path_effects::DashPathEffect::define(container)),
        CornerPathEffect => declaration(path_effects::CornerPathEffect::define(container)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::value::PropertyValue;

    /// Defines a node's properties, writes `values` and commits them.
    pub(crate) fn committed<D>(
        node_type: &str,
        define: impl FnOnce(&mut PropertyContainer) -> D,
        values: &[(&str, PropertyValue)],
    ) -> (PropertyContainer, D) {
        let mut container = PropertyContainer::new(node_type);
        let node = define(&mut container);
        for (name, value) in values {
            container.route_write(name, value.clone());
        }
        container
            .update_pending_values()
            .expect("commit should succeed");
        (container, node)
    }

    #[test]
    fn names_round_trip() {
        for node_type in NodeType::ALL {
            assert_eq!(node_type.as_str().parse::<NodeType>().unwrap(), *node_type);
        }
        assert!(matches!(
            "hexagon".parse::<NodeType>(),
            Err(DomError::UnknownNodeType(_))
        ));
    }

    #[test]
    fn kind_matches_declaration_flag() {
        for node_type in NodeType::ALL {
            let mut container = PropertyContainer::new(node_type.as_str());
            let kind = build(*node_type, &mut container);
            assert_eq!(kind.is_declaration(), node_type.is_declaration());
        }
    }
}
