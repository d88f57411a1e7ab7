//! # Scene Graph
//!
//! Render-role arena of nodes driven through a three phase frame.
//!
//! ## Frame Protocol
//! 1. `commit_pending_changes`: swaps property mailboxes top-down, applies
//!    queued child edits and recomputes derived values.
//! 2. `render`: walks render nodes, resolving paints through the drawing
//!    contexts and letting declaration children decorate them.
//! 3. `reset_pending_changes`: clears change flags and tears down disposed nodes.
//!
//! `render` is only valid between a commit and the matching reset.

use crate::context::{ContextId, DrawingContexts};
use crate::declarations::DeclarationContext;
use crate::dom::{Lifecycle, NodeHandle, NodeShared, StructuralOp};
use crate::errors::DomError;
use crate::node::{self, NodeId, NodeKind, NodeType};
use crate::props::PropertyContainer;
use crossbeam_channel::Receiver;
use skia_safe::{Canvas, Paint};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn};

/// Render-role nodes keyed by id. Torn-down nodes leave no slot behind.
type NodeArena = HashMap<NodeId, SceneNode>;

/// Deepest tree the render and declaration walks will follow.
pub const MAX_DEPTH: usize = 100;

/// A node as owned by the render role.
#[derive(Debug)]
pub struct SceneNode {
    pub id: NodeId,
    pub node_type: NodeType,
    pub kind: NodeKind,
    pub container: PropertyContainer,
    /// Indices of child nodes, in paint order.
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub(crate) shared: Arc<NodeShared>,
    /// Set by commit when this node or anything below it changed.
    pub subtree_changed: bool,
    /// Set by commit when child edits were applied to this node.
    pub structure_changed: bool,
}

impl SceneNode {
    /// Builds the render-side node and its update-role handle.
    pub(crate) fn spawn(id: NodeId, node_type: NodeType) -> (Self, NodeHandle) {
        let mut container = PropertyContainer::new(node_type.as_str());
        let kind = node::build(node_type, &mut container);
        let shared = Arc::new(NodeShared::new(id, container.router().clone()));
        let handle = NodeHandle::new(id, node_type, shared.clone());
        let node = Self {
            id,
            node_type,
            kind,
            container,
            children: Vec::new(),
            parent: None,
            shared,
            subtree_changed: false,
            structure_changed: false,
        };
        (node, handle)
    }

    pub fn is_declaration(&self) -> bool {
        self.kind.is_declaration()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.lifecycle()
    }
}

/// Render-walk state that outlives a single frame.
#[derive(Debug, Default)]
struct RenderState {
    contexts: DrawingContexts,
    node_contexts: HashMap<NodeId, ContextId>,
    declarations: DeclarationContext,
}

impl RenderState {
    /// The node's drawing context, recreated when it no longer hangs off `parent`.
    fn context_for(&mut self, id: NodeId, parent: ContextId) -> ContextId {
        if let Some(&ctx) = self.node_contexts.get(&id) {
            if self.contexts.contains(ctx) {
                if self.contexts.parent(ctx) == Some(parent) {
                    return ctx;
                }
                self.release_subtree(ctx);
            }
        }
        let ctx = self.contexts.inherit(parent, format!("node {}", id));
        self.node_contexts.insert(id, ctx);
        ctx
    }

    fn release_context(&mut self, id: NodeId) {
        if let Some(ctx) = self.node_contexts.remove(&id) {
            self.release_subtree(ctx);
        }
    }

    /// Releases `ctx` and drops node entries pointing at any context freed with it.
    fn release_subtree(&mut self, ctx: ContextId) {
        self.contexts.release(ctx);
        let contexts = &self.contexts;
        self.node_contexts.retain(|_, c| contexts.contains(*c));
    }

    fn render_node(
        &mut self,
        nodes: &NodeArena,
        id: NodeId,
        parent_ctx: ContextId,
        canvas: &Canvas,
        depth: usize,
    ) -> Result<(), DomError> {
        if depth > MAX_DEPTH {
            return Err(DomError::RecursionLimit);
        }
        let Some(node) = slot(nodes, id) else {
            return Ok(());
        };
        let NodeKind::Render { drawing, common } = &node.kind else {
            return Ok(());
        };
        let props = &node.container;
        let ctx = self.context_for(id, parent_ctx);
        let saved = common.save_canvas(props, canvas);

        let declarations: Vec<&SceneNode> = node
            .children
            .iter()
            .filter_map(|&child| slot(nodes, child))
            .filter(|child| child.is_declaration())
            .collect();
        let dirty = self.contexts.is_changed(ctx)
            || common.paint_changed(props)
            || node.structure_changed
            || declarations.iter().any(|d| d.subtree_changed);

        let mut result = Ok(());
        if dirty {
            self.contexts.reset_paint(ctx);
            if common.has_paint(props) || !declarations.is_empty() {
                self.declarations.save();
                result = declarations
                    .iter()
                    .try_for_each(|d| decorate(nodes, d, &mut self.declarations, depth + 1));
                if result.is_ok() {
                    let paint = self.contexts.mutable_paint(ctx);
                    common.apply_paint(props, paint);
                    self.declarations.apply_to(paint);
                }
                self.declarations.restore();
            }
        }

        if result.is_ok() {
            result = drawing.draw(props, canvas, self.contexts.paint(ctx));
            for &child in &node.children {
                if let Err(e) = self.render_node(nodes, child, ctx, canvas, depth + 1) {
                    result = Err(e);
                }
            }
        }

        if saved {
            canvas.restore();
        }
        result
    }
}

fn slot(nodes: &NodeArena, id: NodeId) -> Option<&SceneNode> {
    nodes.get(&id)
}

/// Runs a declaration node and its declaration children, pushing the result
/// onto the enclosing scope of `decls`.
fn decorate(
    nodes: &NodeArena,
    node: &SceneNode,
    decls: &mut DeclarationContext,
    depth: usize,
) -> Result<(), DomError> {
    if depth > MAX_DEPTH {
        return Err(DomError::RecursionLimit);
    }
    let NodeKind::Declaration(declaration) = &node.kind else {
        return Ok(());
    };
    decls.save();
    let effect = node
        .children
        .iter()
        .filter_map(|&child| slot(nodes, child))
        .try_for_each(|child| decorate(nodes, child, decls, depth + 1))
        .and_then(|_| declaration.declare(&node.container, decls));
    decls.restore();
    if let Some(effect) = effect? {
        trace!(node = node.id, kind = effect.kind(), "declared effect");
        decls.push(effect);
    }
    Ok(())
}

/// The render-role side of the scene.
pub struct SceneGraph {
    nodes: NodeArena,
    spawned: Receiver<SceneNode>,
    root: NodeId,
    in_frame: bool,
    state: RenderState,
}

impl SceneGraph {
    pub(crate) fn new(root: SceneNode, spawned: Receiver<SceneNode>) -> Self {
        let mut graph = Self {
            nodes: NodeArena::new(),
            spawned,
            root: root.id,
            in_frame: false,
            state: RenderState::default(),
        };
        graph.insert(root);
        graph
    }

    fn insert(&mut self, node: SceneNode) {
        self.nodes.insert(node.id, node);
    }

    /// Moves nodes created by the update role into the arena.
    fn drain_spawned(&mut self) {
        while let Ok(node) = self.spawned.try_recv() {
            trace!(node = node.id, node_type = %node.node_type, "received node");
            self.insert(node);
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        slot(&self.nodes, id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(&id)
    }

    fn live_node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode, DomError> {
        self.node_mut(id).ok_or_else(|| {
            DomError::PreconditionViolation(format!("node {} is not in the scene", id))
        })
    }

    /// Number of nodes currently owned by the render role.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The paint last resolved for a render node.
    pub fn paint_for(&self, id: NodeId) -> Option<&Paint> {
        let ctx = *self.state.node_contexts.get(&id)?;
        self.state
            .contexts
            .contains(ctx)
            .then(|| self.state.contexts.paint(ctx))
    }

    /// Commits pending property writes and child edits across the tree.
    #[instrument(level = "trace", skip(self))]
    pub fn commit_pending_changes(&mut self) -> Result<(), DomError> {
        self.drain_spawned();
        let root = self.root;
        self.commit_node(root, 0)?;
        self.in_frame = true;
        Ok(())
    }

    fn commit_node(&mut self, id: NodeId, depth: usize) -> Result<bool, DomError> {
        if depth > MAX_DEPTH {
            return Err(DomError::RecursionLimit);
        }
        let node = self.live_node_mut(id)?;
        let props_changed = node.container.update_pending_values()?;
        let shared = node.shared.clone();
        let ops = shared.take_ops();
        let structure_changed = !ops.is_empty();
        let mut pending = ops.into_iter();
        while let Some(op) = pending.next() {
            if let Err(e) = self.apply_op(id, op) {
                shared.requeue(pending.collect());
                return Err(e);
            }
        }

        let mut subtree_changed = props_changed || structure_changed;
        let children = self.live_node_mut(id)?.children.clone();
        for child in children {
            subtree_changed |= self.commit_node(child, depth + 1)?;
        }

        let node = self.live_node_mut(id)?;
        node.structure_changed = structure_changed;
        node.subtree_changed = subtree_changed;
        Ok(subtree_changed)
    }

    fn apply_op(&mut self, parent: NodeId, op: StructuralOp) -> Result<(), DomError> {
        trace!(parent_id = parent, ?op, "applying structural op");
        match op {
            StructuralOp::AddChild(child) => self.attach(parent, child, None),
            StructuralOp::InsertBefore { child, before } => {
                self.attach(parent, child, Some(before))
            }
            StructuralOp::RemoveChild(child) => {
                if self.detach(parent, child) {
                    if let Some(node) = self.node_mut(child) {
                        node.shared.request_dispose();
                    }
                }
                Ok(())
            }
        }
    }

    fn attach(
        &mut self,
        parent: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    ) -> Result<(), DomError> {
        if self.node(child).is_none() {
            self.drain_spawned();
        }
        let Some(old_parent) = self.node(child).map(|n| n.parent) else {
            warn!("Ignoring edit on node {}: node {} is gone", parent, child);
            return Ok(());
        };
        if self.is_ancestor(child, parent) {
            return Err(DomError::PreconditionViolation(format!(
                "adding node {} under node {} would create a cycle",
                child, parent
            )));
        }
        if let Some(old) = old_parent {
            self.detach(old, child);
        }
        let node = self.live_node_mut(parent)?;
        let index = before
            .and_then(|b| node.children.iter().position(|&c| c == b))
            .unwrap_or(node.children.len());
        node.children.insert(index, child);
        self.live_node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Removes `child` from `parent`'s children. Returns whether it was there.
    fn detach(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Some(node) = self.node_mut(parent) else {
            return false;
        };
        let before = node.children.len();
        node.children.retain(|&c| c != child);
        let found = node.children.len() != before;
        if let Some(node) = self.node_mut(child) {
            if node.parent == Some(parent) {
                node.parent = None;
            }
        }
        found
    }

    fn is_ancestor(&self, candidate: NodeId, mut id: NodeId) -> bool {
        loop {
            if id == candidate {
                return true;
            }
            match self.node(id).and_then(|n| n.parent) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    /// Draws the committed tree into `canvas`.
    pub fn render(&mut self, canvas: &Canvas) -> Result<(), DomError> {
        if !self.in_frame {
            return Err(DomError::PreconditionViolation(
                "render called outside a commit/reset cycle".to_string(),
            ));
        }
        let result =
            self.state
                .render_node(&self.nodes, self.root, DrawingContexts::ROOT, canvas, 0);
        self.state.contexts.reset_changed_flags();
        result
    }

    /// Clears change flags and tears down every node whose disposal was requested.
    #[instrument(level = "trace", skip(self))]
    pub fn reset_pending_changes(&mut self) {
        let root = self.root;
        self.reset_node(root);
        let mut leftovers: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.lifecycle() == Lifecycle::Disposing)
            .map(|n| n.id)
            .collect();
        leftovers.sort_unstable();
        for id in leftovers {
            self.teardown(id);
        }
        self.in_frame = false;
    }

    fn reset_node(&mut self, id: NodeId) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        node.container.mark_as_resolved();
        node.subtree_changed = false;
        node.structure_changed = false;
        if node.lifecycle() == Lifecycle::Disposing {
            self.teardown(id);
            return;
        }
        let children = node.children.clone();
        for child in children {
            self.reset_node(child);
        }
    }

    fn teardown(&mut self, id: NodeId) {
        let Some(mut node) = self.nodes.remove(&id) else {
            return;
        };
        if let Some(parent) = node.parent.take() {
            if let Some(p) = self.node_mut(parent) {
                p.children.retain(|&c| c != id);
            }
        }
        node.shared.detach_from_parent();
        node.shared.finish_dispose();
        node.container.clear();
        self.state.release_context(id);
        for child in std::mem::take(&mut node.children) {
            if let Some(c) = self.node_mut(child) {
                c.parent = None;
                c.shared.request_dispose();
            }
            self.teardown(child);
        }
        debug!("Disposed {} node {}", node.node_type, id);
    }

    /// Commit, render and reset in one call.
    ///
    /// A failed commit skips the reset so pending changes survive to the next frame.
    pub fn render_frame(&mut self, canvas: &Canvas) -> Result<(), DomError> {
        self.commit_pending_changes()?;
        let result = self.render(canvas);
        self.reset_pending_changes();
        result
    }
}

impl std::fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneGraph")
            .field("root", &self.root)
            .field("nodes", &self.len())
            .field("in_frame", &self.in_frame)
            .finish()
    }
}
