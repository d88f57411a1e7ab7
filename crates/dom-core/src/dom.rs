//! # Update Role
//!
//! Thread-safe handles used to build and mutate the scene from outside the render loop.
//!
//! ## Responsibilities
//! - **Creation**: `Dom` allocates node ids and ships new nodes to the render role.
//! - **Properties**: `NodeHandle::set_prop` writes straight into property mailboxes.
//! - **Structure**: child edits are queued and only applied by the next commit,
//!   while `children()` reflects them immediately.
//! - **Lifecycle**: `dispose()` requests teardown, which the render role performs at reset.

use crate::errors::DomError;
use crate::node::{NodeId, NodeType};
use crate::props::PropertyRouter;
use crate::scene::{SceneGraph, SceneNode};
use crate::value::PropertyValue;
use crossbeam_channel::{unbounded, Sender};
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, error, warn};

/// Disposal state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Alive,
    /// Teardown requested; happens at the next reset.
    Disposing,
    Disposed,
}

impl Lifecycle {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Lifecycle::Alive,
            1 => Lifecycle::Disposing,
            _ => Lifecycle::Disposed,
        }
    }
}

/// Child edit queued by the update role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StructuralOp {
    AddChild(NodeId),
    RemoveChild(NodeId),
    InsertBefore { child: NodeId, before: NodeId },
}

type DisposeCallback = Box<dyn FnOnce() + Send>;

/// State of one node shared between its handle and its scene node.
pub(crate) struct NodeShared {
    id: NodeId,
    router: PropertyRouter,
    ops: Mutex<Vec<StructuralOp>>,
    children: Mutex<Vec<NodeHandle>>,
    parent: Mutex<Weak<NodeShared>>,
    lifecycle: AtomicU8,
    dispose_callbacks: Mutex<Vec<DisposeCallback>>,
}

impl NodeShared {
    pub(crate) fn new(id: NodeId, router: PropertyRouter) -> Self {
        Self {
            id,
            router,
            ops: Mutex::new(Vec::new()),
            children: Mutex::new(Vec::new()),
            parent: Mutex::new(Weak::new()),
            lifecycle: AtomicU8::new(Lifecycle::Alive as u8),
            dispose_callbacks: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.lifecycle.load(Ordering::Acquire))
    }

    pub(crate) fn take_ops(&self) -> Vec<StructuralOp> {
        std::mem::take(&mut *self.ops.lock().unwrap())
    }

    /// Puts ops that were taken but not applied back ahead of newer ones.
    pub(crate) fn requeue(&self, ops: Vec<StructuralOp>) {
        if ops.is_empty() {
            return;
        }
        let mut queue = self.ops.lock().unwrap();
        let newer = std::mem::replace(&mut *queue, ops);
        queue.extend(newer);
    }

    fn enqueue(&self, op: StructuralOp) {
        self.ops.lock().unwrap().push(op);
    }

    /// `Alive -> Disposing`. Returns `false` if disposal was already requested.
    pub(crate) fn request_dispose(&self) -> bool {
        self.lifecycle
            .compare_exchange(
                Lifecycle::Alive as u8,
                Lifecycle::Disposing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Marks the node disposed and runs its callbacks. Later calls do nothing.
    pub(crate) fn finish_dispose(&self) {
        if self.lifecycle.swap(Lifecycle::Disposed as u8, Ordering::AcqRel)
            == Lifecycle::Disposed as u8
        {
            return;
        }
        let callbacks = std::mem::take(&mut *self.dispose_callbacks.lock().unwrap());
        for callback in callbacks {
            callback();
        }
    }

    /// Removes this node from its parent's children snapshot.
    pub(crate) fn detach_from_parent(&self) {
        let parent = std::mem::take(&mut *self.parent.lock().unwrap());
        if let Some(parent) = parent.upgrade() {
            parent.children.lock().unwrap().retain(|c| c.id != self.id);
        }
    }

    fn set_parent(&self, parent: Weak<NodeShared>) {
        *self.parent.lock().unwrap() = parent;
    }

    fn parent(&self) -> Option<Arc<NodeShared>> {
        self.parent.lock().unwrap().upgrade()
    }

    /// Whether `candidate` is this node or one of its update-side ancestors.
    fn is_or_descends_from(&self, candidate: &NodeShared) -> bool {
        if std::ptr::eq(self, candidate) {
            return true;
        }
        let mut next = self.parent();
        while let Some(node) = next {
            if std::ptr::eq(Arc::as_ptr(&node), candidate) {
                return true;
            }
            next = node.parent();
        }
        false
    }

    fn has_parent(&self, parent: &Arc<NodeShared>) -> bool {
        self.parent
            .lock()
            .unwrap()
            .upgrade()
            .is_some_and(|p| Arc::ptr_eq(&p, parent))
    }
}

impl fmt::Debug for NodeShared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeShared")
            .field("id", &self.id)
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

/// Update-role reference to a scene node. Cheap to clone and `Send + Sync`.
#[derive(Clone)]
pub struct NodeHandle {
    id: NodeId,
    node_type: NodeType,
    shared: Arc<NodeShared>,
}

impl NodeHandle {
    pub(crate) fn new(id: NodeId, node_type: NodeType, shared: Arc<NodeShared>) -> Self {
        Self {
            id,
            node_type,
            shared,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Writes a single property. Returns `false` if the node has no such property.
    pub fn set_prop(&self, name: &str, value: impl Into<PropertyValue>) -> bool {
        self.shared.router.route_write(name, value.into())
    }

    /// Replaces every property from an object; names it omits are unset.
    pub fn set_props(&self, props: &PropertyValue) -> Result<(), DomError> {
        self.shared.router.set_props(props)
    }

    fn check_child(&self, child: &NodeHandle) -> Result<(), DomError> {
        if self.node_type.is_declaration() && !child.node_type.is_declaration() {
            error!(
                "Cannot add {} node {} to {} node {}",
                child.node_type, child.id, self.node_type, self.id
            );
            return Err(DomError::StructuralConstraintViolation {
                parent: self.node_type.to_string(),
                child: child.node_type.to_string(),
            });
        }
        if self.shared.is_or_descends_from(&child.shared) {
            return Err(DomError::PreconditionViolation(format!(
                "adding node {} under node {} would create a cycle",
                child.id, self.id
            )));
        }
        Ok(())
    }

    /// Takes `child` out of its current parent's snapshot and records `self` as its parent.
    fn adopt(&self, child: &NodeHandle) {
        if !child.shared.has_parent(&self.shared) {
            child.shared.detach_from_parent();
        }
        child.shared.set_parent(Arc::downgrade(&self.shared));
    }

    /// Appends `child`, moving it if it already has a parent.
    pub fn add_child(&self, child: &NodeHandle) -> Result<(), DomError> {
        self.check_child(child)?;
        self.adopt(child);
        {
            let mut children = self.shared.children.lock().unwrap();
            children.retain(|c| c.id != child.id);
            children.push(child.clone());
        }
        self.shared.enqueue(StructuralOp::AddChild(child.id));
        Ok(())
    }

    /// Inserts `child` ahead of `before`, or appends it when `before` is not a child.
    pub fn insert_child_before(
        &self,
        child: &NodeHandle,
        before: &NodeHandle,
    ) -> Result<(), DomError> {
        self.check_child(child)?;
        self.adopt(child);
        {
            let mut children = self.shared.children.lock().unwrap();
            children.retain(|c| c.id != child.id);
            let index = children
                .iter()
                .position(|c| c.id == before.id)
                .unwrap_or(children.len());
            children.insert(index, child.clone());
        }
        self.shared.enqueue(StructuralOp::InsertBefore {
            child: child.id,
            before: before.id,
        });
        Ok(())
    }

    /// Detaches `child` and requests its disposal.
    pub fn remove_child(&self, child: &NodeHandle) {
        let removed = {
            let mut children = self.shared.children.lock().unwrap();
            let before = children.len();
            children.retain(|c| c.id != child.id);
            before != children.len()
        };
        if !removed {
            debug!("Node {} is not a child of node {}", child.id, self.id);
            return;
        }
        child.shared.set_parent(Weak::new());
        if self.shared.lifecycle() != Lifecycle::Alive {
            child.shared.request_dispose();
            return;
        }
        self.shared.enqueue(StructuralOp::RemoveChild(child.id));
    }

    /// Current children as seen by the update role, pending edits included.
    pub fn children(&self) -> Vec<NodeHandle> {
        self.shared.children.lock().unwrap().clone()
    }

    /// Requests teardown at the next reset. Calling it again has no effect.
    pub fn dispose(&self) {
        if self.shared.request_dispose() {
            debug!("Disposal requested for {} node {}", self.node_type, self.id);
        }
    }

    /// Registers `callback` to run once when the node is torn down.
    ///
    /// Runs immediately if the node is already disposed.
    pub fn on_dispose(&self, callback: impl FnOnce() + Send + 'static) {
        if self.lifecycle() == Lifecycle::Disposed {
            callback();
            return;
        }
        self.shared
            .dispose_callbacks
            .lock()
            .unwrap()
            .push(Box::new(callback));
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.lifecycle()
    }

    pub fn is_disposed(&self) -> bool {
        self.lifecycle() == Lifecycle::Disposed
    }
}

impl PartialEq for NodeHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle")
            .field("id", &self.id)
            .field("node_type", &self.node_type)
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

struct DomInner {
    next_id: AtomicUsize,
    spawn: Sender<SceneNode>,
    root: NodeHandle,
}

/// Update-role entry point. Clone it freely across threads.
#[derive(Clone)]
pub struct Dom {
    inner: Arc<DomInner>,
}

impl Dom {
    /// Creates a scene with a `group` root, returning the update-role facade
    /// and the render-role graph.
    pub fn new() -> (Dom, SceneGraph) {
        let (spawn, spawned) = unbounded();
        let (root_node, root) = SceneNode::spawn(0, NodeType::Group);
        let graph = SceneGraph::new(root_node, spawned);
        let dom = Dom {
            inner: Arc::new(DomInner {
                next_id: AtomicUsize::new(1),
                spawn,
                root,
            }),
        };
        (dom, graph)
    }

    pub fn root(&self) -> NodeHandle {
        self.inner.root.clone()
    }

    pub fn create(&self, node_type: NodeType) -> NodeHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (node, handle) = SceneNode::spawn(id, node_type);
        if self.inner.spawn.send(node).is_err() {
            warn!("Scene graph dropped; {} node {} will never render", node_type, id);
        }
        handle
    }

    /// Creates a node from its description name, e.g. `"blurImageFilter"`.
    pub fn create_node(&self, node_type: &str) -> Result<NodeHandle, DomError> {
        Ok(self.create(node_type.parse()?))
    }

    pub fn create_with_props(
        &self,
        node_type: NodeType,
        props: &PropertyValue,
    ) -> Result<NodeHandle, DomError> {
        let handle = self.create(node_type);
        handle.set_props(props)?;
        Ok(handle)
    }
}

impl fmt::Debug for Dom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dom")
            .field("next_id", &self.inner.next_id.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_parent_rejects_render_child() {
        let (dom, _graph) = Dom::new();
        let shader = dom.create(NodeType::ColorShader);
        let rect = dom.create(NodeType::Rect);
        assert!(matches!(
            shader.add_child(&rect),
            Err(DomError::StructuralConstraintViolation { .. })
        ));
        let blur = dom.create(NodeType::BlurImageFilter);
        let offset = dom.create(NodeType::OffsetImageFilter);
        assert!(blur.add_child(&offset).is_ok());
        assert!(rect.add_child(&blur).is_ok());
    }

    #[test]
    fn snapshot_tracks_edits_eagerly() {
        let (dom, _graph) = Dom::new();
        let root = dom.root();
        let a = dom.create(NodeType::Rect);
        let b = dom.create(NodeType::Circle);
        root.add_child(&a).unwrap();
        root.insert_child_before(&b, &a).unwrap();
        assert_eq!(root.children(), vec![b.clone(), a.clone()]);

        let group = dom.create(NodeType::Group);
        group.add_child(&a).unwrap();
        assert_eq!(root.children(), vec![b.clone()]);
        assert_eq!(group.children(), vec![a]);
        assert_eq!(root.shared.take_ops().len(), 2);
    }

    #[test]
    fn dispose_is_idempotent() {
        let (dom, _graph) = Dom::new();
        let node = dom.create(NodeType::Rect);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        node.on_dispose(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        node.dispose();
        node.dispose();
        assert_eq!(node.lifecycle(), Lifecycle::Disposing);
        node.shared.finish_dispose();
        node.shared.finish_dispose();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(node.is_disposed());
    }

    #[test]
    fn removing_from_disposing_parent_skips_the_queue() {
        let (dom, _graph) = Dom::new();
        let parent = dom.create(NodeType::Group);
        let child = dom.create(NodeType::Rect);
        parent.add_child(&child).unwrap();
        parent.shared.take_ops();
        parent.dispose();
        parent.remove_child(&child);
        assert_eq!(child.lifecycle(), Lifecycle::Disposing);
        assert!(parent.shared.take_ops().is_empty());
    }

    #[test]
    fn cycle_is_rejected_before_queueing() {
        let (dom, _graph) = Dom::new();
        let outer = dom.create(NodeType::Group);
        let inner = dom.create(NodeType::Group);
        outer.add_child(&inner).unwrap();
        outer.shared.take_ops();

        assert!(matches!(
            inner.add_child(&outer),
            Err(DomError::PreconditionViolation(_))
        ));
        assert!(matches!(
            outer.add_child(&outer),
            Err(DomError::PreconditionViolation(_))
        ));
        assert!(inner.children().is_empty());
        assert_eq!(outer.children(), vec![inner.clone()]);
        assert!(inner.shared.take_ops().is_empty());
    }

    #[test]
    fn requeued_ops_stay_ahead_of_newer_ones() {
        let (dom, _graph) = Dom::new();
        let group = dom.create(NodeType::Group);
        let a = dom.create(NodeType::Rect);
        let b = dom.create(NodeType::Rect);
        group.add_child(&b).unwrap();
        group
            .shared
            .requeue(vec![StructuralOp::AddChild(a.id()), StructuralOp::RemoveChild(a.id())]);
        assert_eq!(
            group.shared.take_ops(),
            vec![
                StructuralOp::AddChild(a.id()),
                StructuralOp::RemoveChild(a.id()),
                StructuralOp::AddChild(b.id()),
            ]
        );
    }

    #[test]
    fn unknown_type_name() {
        let (dom, _graph) = Dom::new();
        assert!(matches!(
            dom.create_node("spiral"),
            Err(DomError::UnknownNodeType(_))
        ));
        assert_eq!(
            dom.create_node("rrect").unwrap().node_type(),
            NodeType::RRect
        );
    }
}
