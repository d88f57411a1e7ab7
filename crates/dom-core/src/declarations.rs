//! # Declaration Context
//!
//! Scoped stacks collecting the effects produced by declaration nodes during a
//! render pass.
//!
//! A node brackets its subtree with `save()`/`restore()`, so siblings never see
//! each other's effects. `pop_as_one()` merges whatever the current scope holds
//! into a single effect using the kind-specific [`Composable`] rule.

use skia_safe::{
    color_filters, image_filters, shaders, BlendMode, ColorFilter, ImageFilter, MaskFilter, Paint,
    PathEffect, Shader,
};

/// Merging rule for an effect kind.
pub trait Composable: Clone {
    /// Combines two effects; `outer` wraps `inner`.
    fn compose(outer: Self, inner: Self) -> Self;
}

impl Composable for Shader {
    /// Later shaders draw over earlier ones.
    fn compose(outer: Self, inner: Self) -> Self {
        shaders::blend(BlendMode::SrcOver, outer, inner)
    }
}

impl Composable for ColorFilter {
    fn compose(outer: Self, inner: Self) -> Self {
        color_filters::compose(outer.clone(), inner).unwrap_or(outer)
    }
}

impl Composable for ImageFilter {
    fn compose(outer: Self, inner: Self) -> Self {
        image_filters::compose(outer.clone(), inner).unwrap_or(outer)
    }
}

impl Composable for MaskFilter {
    /// Mask filters do not compose; the last declared wins.
    fn compose(_outer: Self, inner: Self) -> Self {
        inner
    }
}

impl Composable for PathEffect {
    fn compose(outer: Self, inner: Self) -> Self {
        PathEffect::compose(outer, inner)
    }
}

/// A LIFO stack with scope marks.
#[derive(Debug, Clone)]
pub struct DeclarationStack<T> {
    items: Vec<T>,
    scopes: Vec<usize>,
}

impl<T> Default for DeclarationStack<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            scopes: Vec::new(),
        }
    }
}

impl<T: Composable> DeclarationStack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn floor(&self) -> usize {
        self.scopes.last().copied().unwrap_or(0)
    }

    /// Opens a fresh, empty view of the stack.
    pub fn save(&mut self) {
        self.scopes.push(self.items.len());
    }

    /// Closes the current scope, discarding anything left in it.
    pub fn restore(&mut self) {
        if let Some(mark) = self.scopes.pop() {
            self.items.truncate(mark);
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.items.len() > self.floor() {
            self.items.pop()
        } else {
            None
        }
    }

    /// Takes every item of the current scope in push order.
    pub fn pop_all(&mut self) -> Vec<T> {
        let floor = self.floor();
        self.items.split_off(floor)
    }

    /// Takes the current scope merged into one item: `[a, b, c]` becomes
    /// `compose(a, compose(b, c))`.
    pub fn pop_as_one(&mut self) -> Option<T> {
        self.pop_all()
            .into_iter()
            .rev()
            .reduce(|inner, outer| T::compose(outer, inner))
    }

    /// Number of items visible in the current scope.
    pub fn len(&self) -> usize {
        self.items.len() - self.floor()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

/// An effect produced by a declaration node.
#[derive(Debug, Clone)]
pub enum Effect {
    Shader(Shader),
    ColorFilter(ColorFilter),
    ImageFilter(ImageFilter),
    MaskFilter(MaskFilter),
    PathEffect(PathEffect),
}

impl Effect {
    pub fn kind(&self) -> &'static str {
        match self {
            Effect::Shader(_) => "shader",
            Effect::ColorFilter(_) => "color filter",
            Effect::ImageFilter(_) => "image filter",
            Effect::MaskFilter(_) => "mask filter",
            Effect::PathEffect(_) => "path effect",
        }
    }
}

/// One [`DeclarationStack`] per effect kind, saved and restored together.
#[derive(Debug, Clone, Default)]
pub struct DeclarationContext {
    pub shaders: DeclarationStack<Shader>,
    pub color_filters: DeclarationStack<ColorFilter>,
    pub image_filters: DeclarationStack<ImageFilter>,
    pub mask_filters: DeclarationStack<MaskFilter>,
    pub path_effects: DeclarationStack<PathEffect>,
}

impl DeclarationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&mut self) {
        self.shaders.save();
        self.color_filters.save();
        self.image_filters.save();
        self.mask_filters.save();
        self.path_effects.save();
    }

    pub fn restore(&mut self) {
        self.shaders.restore();
        self.color_filters.restore();
        self.image_filters.restore();
        self.mask_filters.restore();
        self.path_effects.restore();
    }

    pub fn push(&mut self, effect: Effect) {
        match effect {
            Effect::Shader(s) => self.shaders.push(s),
            Effect::ColorFilter(f) => self.color_filters.push(f),
            Effect::ImageFilter(f) => self.image_filters.push(f),
            Effect::MaskFilter(f) => self.mask_filters.push(f),
            Effect::PathEffect(e) => self.path_effects.push(e),
        }
    }

    /// Pops every stack of the current scope onto `paint`. Empty stacks leave
    /// the corresponding paint slot untouched.
    pub fn apply_to(&mut self, paint: &mut Paint) {
        if let Some(shader) = self.shaders.pop_as_one() {
            paint.set_shader(shader);
        }
        if let Some(filter) = self.color_filters.pop_as_one() {
            paint.set_color_filter(filter);
        }
        if let Some(filter) = self.image_filters.pop_as_one() {
            paint.set_image_filter(filter);
        }
        if let Some(filter) = self.mask_filters.pop_as_one() {
            paint.set_mask_filter(filter);
        }
        if let Some(effect) = self.path_effects.pop_as_one() {
            paint.set_path_effect(effect);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
            && self.color_filters.is_empty()
            && self.image_filters.is_empty()
            && self.mask_filters.is_empty()
            && self.path_effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Trace(String);

    impl Composable for Trace {
        fn compose(outer: Self, inner: Self) -> Self {
            Trace(format!("compose({}, {})", outer.0, inner.0))
        }
    }

    fn t(s: &str) -> Trace {
        Trace(s.to_string())
    }

    #[test]
    fn children_compose_left_to_right_inside_the_parent() {
        let mut stack = DeclarationStack::new();
        // F decorates: save, children push, pop_as_one, restore, push own.
        stack.save();
        stack.push(t("C1"));
        stack.push(t("C2"));
        let children = stack.pop_as_one();
        stack.restore();
        let own = t("F");
        stack.push(match children {
            Some(c) => Trace::compose(own, c),
            None => own,
        });

        assert_eq!(
            stack.pop_as_one(),
            Some(t("compose(F, compose(C1, C2))"))
        );
    }

    #[test]
    fn scopes_hide_outer_items() {
        let mut stack = DeclarationStack::new();
        stack.push(t("sibling"));
        stack.save();
        assert!(stack.is_empty());
        assert_eq!(stack.pop(), None);
        stack.push(t("inner"));
        assert_eq!(stack.len(), 1);
        stack.restore();
        assert_eq!(stack.pop_all(), vec![t("sibling")]);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn restore_discards_leftovers() {
        let mut stack = DeclarationStack::new();
        stack.save();
        stack.push(t("leaked"));
        stack.restore();
        assert!(stack.is_empty());
        assert_eq!(stack.pop_as_one(), None);
    }

    #[test]
    fn mask_filters_keep_the_last_declared() {
        let first = MaskFilter::blur(skia_safe::BlurStyle::Normal, 1.0, false).unwrap();
        let last = MaskFilter::blur(skia_safe::BlurStyle::Solid, 2.0, false).unwrap();
        let mut context = DeclarationContext::new();
        context.push(Effect::MaskFilter(first));
        context.push(Effect::MaskFilter(last.clone()));
        let mut paint = Paint::default();
        context.apply_to(&mut paint);
        assert!(paint.mask_filter().is_some());
        assert!(context.is_empty());
    }
}
