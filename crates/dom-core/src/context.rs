//! # Drawing Contexts
//!
//! Arena of inheriting, copy-on-write paint records mirroring the render tree.
//!
//! ## Responsibilities
//! - **Inheritance**: a record without its own paint reads through its parent chain.
//! - **Copy-on-write**: the first mutable access copies the inherited paint.
//! - **Invalidation**: mutating a record's paint marks every descendant changed
//!   and drops their cached paints so they re-derive on the next render.

use skia_safe::Paint;
use tracing::trace;

/// Index of a record inside [`DrawingContexts`].
pub type ContextId = usize;

#[derive(Debug)]
struct ContextRecord {
    parent: Option<ContextId>,
    children: Vec<ContextId>,
    paint: Option<Paint>,
    changed: bool,
    tag: String,
}

#[derive(Debug)]
pub struct DrawingContexts {
    records: Vec<Option<ContextRecord>>,
    /// Released slots, reused by `inherit`.
    free_indices: Vec<ContextId>,
}

impl Default for DrawingContexts {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingContexts {
    pub const ROOT: ContextId = 0;

    /// Creates the arena with a root record owning an anti-aliased black paint.
    pub fn new() -> Self {
        let mut paint = Paint::default();
        paint.set_anti_alias(true);
        Self {
            records: vec![Some(ContextRecord {
                parent: None,
                children: Vec::new(),
                paint: Some(paint),
                changed: true,
                tag: "root".to_string(),
            })],
            free_indices: Vec::new(),
        }
    }

    fn record(&self, id: ContextId) -> &ContextRecord {
        self.records
            .get(id)
            .and_then(Option::as_ref)
            .expect("drawing context used after release")
    }

    fn record_mut(&mut self, id: ContextId) -> &mut ContextRecord {
        self.records
            .get_mut(id)
            .and_then(Option::as_mut)
            .expect("drawing context used after release")
    }

    /// Creates a child record of `parent`. New records start out changed.
    pub fn inherit(&mut self, parent: ContextId, tag: impl Into<String>) -> ContextId {
        let record = ContextRecord {
            parent: Some(parent),
            children: Vec::new(),
            paint: None,
            changed: true,
            tag: tag.into(),
        };
        let id = match self.free_indices.pop() {
            Some(id) => {
                self.records[id] = Some(record);
                id
            }
            None => {
                self.records.push(Some(record));
                self.records.len() - 1
            }
        };
        self.record_mut(parent).children.push(id);
        id
    }

    /// The paint of the nearest record, starting at `id`, that owns one.
    pub fn paint(&self, id: ContextId) -> &Paint {
        let mut current = id;
        loop {
            let record = self.record(current);
            match (&record.paint, record.parent) {
                (Some(paint), _) => return paint,
                (None, Some(parent)) => current = parent,
                (None, None) => unreachable!("root drawing context always owns a paint"),
            }
        }
    }

    /// A private paint for `id`, copied from the inherited one on first use.
    ///
    /// Copying invalidates the descendants of `id`, not `id` itself.
    pub fn mutable_paint(&mut self, id: ContextId) -> &mut Paint {
        if self.record(id).paint.is_none() {
            let copy = self.paint(id).clone();
            self.record_mut(id).paint = Some(copy);
            self.mark_as_changed(id);
        }
        self.record_mut(id)
            .paint
            .get_or_insert_with(Paint::default)
    }

    /// Drops the private paint of `id` so it inherits again.
    pub fn reset_paint(&mut self, id: ContextId) {
        if id != Self::ROOT && self.record_mut(id).paint.take().is_some() {
            self.mark_as_changed(id);
        }
    }

    /// Marks every descendant of `id` changed and clears their cached paint.
    pub fn mark_as_changed(&mut self, id: ContextId) {
        let mut pending = self.record(id).children.clone();
        while let Some(child) = pending.pop() {
            let record = self.record_mut(child);
            record.changed = true;
            record.paint = None;
            pending.extend(record.children.iter().copied());
        }
    }

    pub fn is_changed(&self, id: ContextId) -> bool {
        self.record(id).changed
    }

    pub fn has_own_paint(&self, id: ContextId) -> bool {
        self.record(id).paint.is_some()
    }

    pub fn parent(&self, id: ContextId) -> Option<ContextId> {
        self.record(id).parent
    }

    pub fn tag(&self, id: ContextId) -> &str {
        &self.record(id).tag
    }

    /// Clears every changed flag. Cached paints stay valid.
    pub fn reset_changed_flags(&mut self) {
        for record in self.records.iter_mut().flatten() {
            record.changed = false;
        }
    }

    /// Frees `id` and its whole subtree.
    pub fn release(&mut self, id: ContextId) {
        if id == Self::ROOT || self.records.get(id).map_or(true, Option::is_none) {
            return;
        }
        if let Some(parent) = self.record(id).parent {
            if let Some(Some(record)) = self.records.get_mut(parent) {
                record.children.retain(|&c| c != id);
            }
        }
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(record) = self.records.get_mut(current).and_then(Option::take) {
                trace!(context = current, tag = %record.tag, "released drawing context");
                pending.extend(record.children);
                self.free_indices.push(current);
            }
        }
    }

    pub fn contains(&self, id: ContextId) -> bool {
        matches!(self.records.get(id), Some(Some(_)))
    }

    /// Number of live records, root included.
    pub fn len(&self) -> usize {
        self.records.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skia_safe::Color;

    #[test]
    fn lookup_walks_to_nearest_owner() {
        let mut contexts = DrawingContexts::new();
        let a = contexts.inherit(DrawingContexts::ROOT, "a");
        let b = contexts.inherit(a, "b");
        assert_eq!(contexts.paint(b).color(), Color::BLACK);

        contexts.mutable_paint(a).set_color(Color::RED);
        assert_eq!(contexts.paint(b).color(), Color::RED);
        assert!(!contexts.has_own_paint(b));
        assert_eq!(contexts.paint(DrawingContexts::ROOT).color(), Color::BLACK);
    }

    #[test]
    fn invalidation_cascades_to_descendants_only() {
        let mut contexts = DrawingContexts::new();
        let a = contexts.inherit(DrawingContexts::ROOT, "a");
        let b = contexts.inherit(a, "b");
        let c = contexts.inherit(b, "c");
        contexts.mutable_paint(b).set_alpha_f(0.5);
        contexts.reset_changed_flags();
        assert!(contexts.has_own_paint(b));

        contexts.mutable_paint(a).set_color(Color::BLUE);
        assert!(!contexts.is_changed(a));
        assert!(contexts.is_changed(b));
        assert!(contexts.is_changed(c));
        assert!(!contexts.has_own_paint(b), "cached paint must be dropped");
        assert_eq!(contexts.paint(c).color(), Color::BLUE);

        // Further mutation of an already private paint does not cascade again.
        contexts.reset_changed_flags();
        contexts.mutable_paint(a).set_alpha_f(0.3);
        assert!(!contexts.is_changed(b));
    }

    #[test]
    fn release_frees_the_subtree() {
        let mut contexts = DrawingContexts::new();
        let a = contexts.inherit(DrawingContexts::ROOT, "a");
        let b = contexts.inherit(a, "b");
        let other = contexts.inherit(DrawingContexts::ROOT, "other");
        assert_eq!(contexts.len(), 4);

        contexts.release(a);
        assert!(!contexts.contains(a));
        assert!(!contexts.contains(b));
        assert!(contexts.contains(other));
        assert_eq!(contexts.len(), 2);

        contexts.reset_changed_flags();
        contexts.mark_as_changed(DrawingContexts::ROOT);
        assert!(contexts.is_changed(other));
        assert!(!contexts.is_changed(DrawingContexts::ROOT));
    }

    #[test]
    fn released_slots_are_reused() {
        let mut contexts = DrawingContexts::new();
        for _ in 0..50 {
            let a = contexts.inherit(DrawingContexts::ROOT, "a");
            contexts.inherit(a, "b");
            contexts.release(a);
        }
        assert_eq!(contexts.records.len(), 3);

        let a = contexts.inherit(DrawingContexts::ROOT, "a");
        contexts.mutable_paint(a).set_color(Color::RED);
        let b = contexts.inherit(a, "b");
        assert_eq!(contexts.paint(b).color(), Color::RED);
        assert_eq!(contexts.parent(b), Some(a));
    }
}
