//! # DOM Core
//!
//! `dom-core` is a retained-mode 2D scene graph rendered through [Skia](https://skia.org/).
//!
//! Nodes are mutated from an *update role* (any thread, through [`Dom`] and
//! [`NodeHandle`]) and drawn by a *render role* that owns the [`SceneGraph`].
//! Property writes land in per-property mailboxes and child edits are queued,
//! so the render role sees a consistent tree from one commit to the next.
//!
//! ## Core Features
//!
//! *   **Double-buffered properties**: last write wins, applied at commit.
//! *   **Derived properties**: memoized values recomputed only when an input changed.
//! *   **Inheriting paints**: copy-on-write drawing contexts that mirror the render tree.
//! *   **Declarations**: shaders, filters and path effects composed per subtree.
//! *   **Descriptions**: build scenes from JSON or [Rhai](https://rhai.rs/) scripts.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dom_core::{Dom, NodeType};
//! use skia_safe::surfaces;
//!
//! let (dom, mut graph) = Dom::new();
//! let rect = dom.create(NodeType::Rect);
//! rect.set_prop("width", 100.0);
//! rect.set_prop("height", 50.0);
//! rect.set_prop("color", "#3366ff");
//! dom.root().add_child(&rect).unwrap();
//!
//! let mut surface = surfaces::raster_n32_premul((200, 100)).unwrap();
//! graph.render_frame(surface.canvas()).unwrap();
//! ```

/// Inheriting paint records.
pub mod context;
/// Scoped effect stacks.
pub mod declarations;
/// Scene descriptions (JSON / Rhai).
pub mod description;
/// Update-role handles.
pub mod dom;
pub mod errors;
/// PNG export.
pub mod export;
/// Node catalog.
pub mod node;
/// Property primitives.
pub mod props;
/// Render-role scene graph.
pub mod scene;
pub mod value;

pub use description::NodeDescription;
pub use dom::{Dom, Lifecycle, NodeHandle};
pub use errors::DomError;
pub use export::{render_to_image, render_to_png, RenderConfig};
pub use node::{NodeId, NodeType};
pub use scene::{SceneGraph, SceneNode};
pub use value::PropertyValue;
