//! Plugin module - Extension points for custom value and reference types.
//!
//! A value-like plugin makes instances behave as immutable values: they are
//! compared with the plugin's `equals`, cloned with its `clone_value`, and
//! never tokened or entered. A reference-like plugin keeps identity
//! semantics but takes over cloning.

#[cfg(test)]
pub(crate) mod testing;

use crate::error::{Error, Result};
use crate::snapshot::CloneContext;
use crate::value::{Composite, Value};
use std::fmt;
use std::rc::Rc;

/// ValueLike handles types that are compared by value.
pub trait ValueLike {
    /// Unique registration name.
    fn name(&self) -> &str;

    fn is_match(&self, value: &Value) -> bool;

    /// Returns an independent copy of `value`.
    fn clone_value(&self, ctx: &mut CloneContext<'_>, value: &Value) -> Value;

    fn equals(&self, a: &Value, b: &Value) -> bool;
}

/// ReferenceLike handles composites that keep their identity but need
/// custom cloning, typically because they hold opaque internal state.
pub trait ReferenceLike {
    /// Unique registration name.
    fn name(&self) -> &str;

    fn is_match(&self, node: &Composite) -> bool;

    /// Allocates the clone of `original` before its children are copied.
    ///
    /// Returning `None` means generic cloning applies.
    fn allocate(&self, _original: &Composite) -> Option<Composite> {
        None
    }

    /// Fills a clone returned by [`ReferenceLike::allocate`]. The clone is
    /// already registered, so back-references resolve to it.
    fn populate(&self, ctx: &mut CloneContext<'_>, original: &Composite, clone: &Composite) {
        ctx.copy_children(original, clone);
    }
}

/// Plugin is one registrable extension.
#[derive(Clone)]
pub enum Plugin {
    ValueLike(Rc<dyn ValueLike>),
    ReferenceLike(Rc<dyn ReferenceLike>),
}

impl Plugin {
    pub fn value_like(plugin: impl ValueLike + 'static) -> Self {
        Plugin::ValueLike(Rc::new(plugin))
    }

    pub fn reference_like(plugin: impl ReferenceLike + 'static) -> Self {
        Plugin::ReferenceLike(Rc::new(plugin))
    }

    pub fn name(&self) -> &str {
        match self {
            Plugin::ValueLike(p) => p.name(),
            Plugin::ReferenceLike(p) => p.name(),
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plugin::ValueLike(p) => write!(f, "ValueLike({:?})", p.name()),
            Plugin::ReferenceLike(p) => write!(f, "ReferenceLike({:?})", p.name()),
        }
    }
}

/// Registry holds the registered plugins in registration order.
///
/// Names are unique across both lists. Lookups try plugins in order and the
/// first match wins.
#[derive(Clone, Default)]
pub struct Registry {
    value_likes: Vec<Rc<dyn ValueLike>>,
    reference_likes: Vec<Rc<dyn ReferenceLike>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Registers a plugin. Fails if the name is already taken.
    pub fn add(&mut self, plugin: Plugin) -> Result<()> {
        if self.contains(plugin.name()) {
            return Err(Error::DuplicatePlugin(plugin.name().to_string()));
        }
        match plugin {
            Plugin::ValueLike(p) => self.value_likes.push(p),
            Plugin::ReferenceLike(p) => self.reference_likes.push(p),
        }
        Ok(())
    }

    /// Unregisters a plugin by name. Fails if no plugin has that name.
    pub fn remove(&mut self, name: &str) -> Result<Plugin> {
        if let Some(pos) = self.value_likes.iter().position(|p| p.name() == name) {
            return Ok(Plugin::ValueLike(self.value_likes.remove(pos)));
        }
        if let Some(pos) = self.reference_likes.iter().position(|p| p.name() == name) {
            return Ok(Plugin::ReferenceLike(self.reference_likes.remove(pos)));
        }
        Err(Error::UnknownPlugin(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.value_likes.iter().any(|p| p.name() == name)
            || self.reference_likes.iter().any(|p| p.name() == name)
    }

    /// Registered names, value-like plugins first.
    pub fn names(&self) -> Vec<&str> {
        self.value_likes
            .iter()
            .map(|p| p.name())
            .chain(self.reference_likes.iter().map(|p| p.name()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.value_likes.len() + self.reference_likes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find_value_like(&self, value: &Value) -> Option<&Rc<dyn ValueLike>> {
        self.value_likes.iter().find(|p| p.is_match(value))
    }

    pub fn find_reference_like(&self, node: &Composite) -> Option<&Rc<dyn ReferenceLike>> {
        self.reference_likes.iter().find(|p| p.is_match(node))
    }

    pub fn is_value_like(&self, value: &Value) -> bool {
        self.find_value_like(value).is_some()
    }

    /// Compares two values with the first value-like plugin matching both.
    pub(crate) fn value_like_equals(&self, a: &Value, b: &Value) -> bool {
        match self.find_value_like(a) {
            Some(p) => p.is_match(b) && p.equals(a, b),
            None => false,
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("plugins", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{point, timestamp, BagPlugin, PointPlugin, TimestampPlugin};
    use super::*;

    #[test]
    fn test_add_rejects_duplicate_names() {
        let mut registry = Registry::new();
        registry.add(Plugin::value_like(TimestampPlugin)).unwrap();

        let err = registry.add(Plugin::value_like(TimestampPlugin)).unwrap_err();
        assert!(matches!(err, Error::DuplicatePlugin(ref name) if name == "timestamp"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_names_are_unique_across_kinds() {
        struct Impostor;
        impl ReferenceLike for Impostor {
            fn name(&self) -> &str {
                "timestamp"
            }
            fn is_match(&self, _node: &Composite) -> bool {
                false
            }
        }

        let mut registry = Registry::new();
        registry.add(Plugin::value_like(TimestampPlugin)).unwrap();
        assert!(registry.add(Plugin::reference_like(Impostor)).is_err());
    }

    #[test]
    fn test_remove() {
        let mut registry = Registry::new();
        registry.add(Plugin::value_like(TimestampPlugin)).unwrap();
        registry.add(Plugin::reference_like(BagPlugin)).unwrap();
        assert_eq!(registry.names(), vec!["timestamp", "bag"]);

        let removed = registry.remove("bag").unwrap();
        assert_eq!(removed.name(), "bag");
        assert!(!registry.contains("bag"));

        let err = registry.remove("bag").unwrap_err();
        assert!(matches!(err, Error::UnknownPlugin(ref name) if name == "bag"));
        assert_eq!(registry.names(), vec!["timestamp"]);
    }

    #[test]
    fn test_first_match_wins() {
        struct AnyNative;
        impl ValueLike for AnyNative {
            fn name(&self) -> &str {
                "any-native"
            }
            fn is_match(&self, value: &Value) -> bool {
                value.is_native()
            }
            fn clone_value(&self, _ctx: &mut CloneContext<'_>, value: &Value) -> Value {
                value.clone()
            }
            fn equals(&self, _a: &Value, _b: &Value) -> bool {
                true
            }
        }

        let mut registry = Registry::new();
        registry.add(Plugin::value_like(TimestampPlugin)).unwrap();
        registry.add(Plugin::value_like(AnyNative)).unwrap();
        let found = registry.find_value_like(&timestamp(1)).unwrap();
        assert_eq!(found.name(), "timestamp");
    }

    #[test]
    fn test_value_like_equals() {
        let mut registry = Registry::new();
        registry.add(Plugin::value_like(TimestampPlugin)).unwrap();
        registry.add(Plugin::value_like(PointPlugin)).unwrap();

        assert!(registry.value_like_equals(&timestamp(3), &timestamp(3)));
        assert!(!registry.value_like_equals(&timestamp(3), &timestamp(4)));
        assert!(!registry.value_like_equals(&timestamp(3), &point(3, 3)));
        assert!(registry.value_like_equals(&point(1, 2), &point(1, 2)));
        assert!(!registry.value_like_equals(&Value::Int(1), &Value::Int(1)));
    }
}
