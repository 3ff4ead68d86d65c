//! Graph cloner.

use crate::plugin::Registry;
use crate::value::{Array, Composite, Object, Value};
use std::collections::HashMap;

/// CloneContext is one in-flight clone traversal.
///
/// Plugins receive it so that nested values they own are cloned through
/// the same traversal and keep their aliasing.
pub struct CloneContext<'a> {
    registry: &'a Registry,
    /// original address -> (original, clone); the original is held so its
    /// address stays unique for the whole traversal.
    seen: HashMap<usize, (Composite, Composite)>,
}

impl<'a> CloneContext<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        CloneContext {
            registry,
            seen: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Clones one value. Returns `None` for functions, which have no clone.
    pub fn clone_value(&mut self, value: &Value) -> Option<Value> {
        if value.is_function() {
            return None;
        }
        if let Some(plugin) = self.registry.find_value_like(value).cloned() {
            return Some(plugin.clone_value(self, value));
        }
        match value.as_composite() {
            Some(node) => Some(self.clone_node(&node).to_value()),
            None => Some(value.clone()),
        }
    }

    fn clone_node(&mut self, original: &Composite) -> Composite {
        if let Some((_, clone)) = self.seen.get(&original.addr()) {
            return clone.clone();
        }

        if let Some(plugin) = self.registry.find_reference_like(original).cloned() {
            if let Some(clone) = plugin.allocate(original) {
                self.register(original, &clone);
                plugin.populate(self, original, &clone);
                return clone;
            }
        }

        let clone = match original {
            Composite::Array(_) => Composite::Array(Array::new()),
            Composite::Object(_) => Composite::Object(Object::new()),
        };
        self.register(original, &clone);
        self.copy_children(original, &clone);
        clone
    }

    fn register(&mut self, original: &Composite, clone: &Composite) {
        if let Some(identity) = original.identity() {
            clone.stamp(identity);
        }
        self.seen
            .insert(original.addr(), (original.clone(), clone.clone()));
    }

    /// Copies every visible child of `original` into `clone`, cloning each
    /// one. Function-valued slots are left out.
    pub fn copy_children(&mut self, original: &Composite, clone: &Composite) {
        match (original, clone) {
            (Composite::Array(src), Composite::Array(dst)) => {
                for item in src.items() {
                    if let Some(v) = self.clone_value(&item) {
                        dst.push(v);
                    }
                }
            }
            (Composite::Object(src), Composite::Object(dst)) => {
                for (key, value) in src.entries() {
                    if let Some(v) = self.clone_value(&value) {
                        dst.set(key, v);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Clones a whole graph in a fresh traversal.
pub fn clone_graph(value: &Value, registry: &Registry) -> Option<Value> {
    CloneContext::new(registry).clone_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{assign_identities, Counter};
    use crate::plugin::testing::{bag, bag_items, millis, timestamp, BagPlugin, TimestampPlugin};
    use crate::plugin::Plugin;
    use crate::value::{Class, Function};
    use std::rc::Rc;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.add(Plugin::value_like(TimestampPlugin)).unwrap();
        registry.add(Plugin::reference_like(BagPlugin)).unwrap();
        registry
    }

    #[test]
    fn test_primitives_are_returned_as_is() {
        let registry = Registry::new();
        assert_eq!(clone_graph(&Value::Null, &registry), Some(Value::Null));
        assert_eq!(clone_graph(&Value::Undefined, &registry), Some(Value::Undefined));
        assert_eq!(clone_graph(&Value::from("s"), &registry), Some(Value::from("s")));
        assert_eq!(
            clone_graph(&Function::new(|_| Value::Null).into(), &registry),
            None
        );
    }

    #[test]
    fn test_clone_is_deep_and_detached() {
        let child = Object::from_pairs([("v", 1)]);
        let root = Object::from_pairs([("child", child.clone())]);

        let cloned = clone_graph(&root.clone().into(), &Registry::new()).unwrap();
        let cloned = cloned.as_object().unwrap();
        assert!(!cloned.ptr_eq(&root));

        child.set("v", 2);
        let cloned_child = cloned.get("child");
        assert_eq!(cloned_child.as_object().unwrap().get("v"), Value::Int(1));
        assert!(!cloned_child.as_object().unwrap().ptr_eq(&child));
    }

    #[test]
    fn test_clone_carries_identities() {
        let root = Object::from_pairs([("list", Array::from_values([Object::new()]))]);
        let node: Composite = root.clone().into();
        assign_identities(&node, &Counter::new(), &Registry::new());

        let cloned = clone_graph(&root.clone().into(), &Registry::new()).unwrap();
        let cloned = cloned.as_object().unwrap();
        assert_eq!(cloned.identity(), root.identity());

        let list = root.get("list");
        let cloned_list = cloned.get("list");
        assert_eq!(
            cloned_list.as_array().unwrap().identity(),
            list.as_array().unwrap().identity()
        );
        assert_eq!(
            cloned_list.as_array().unwrap().get(0).as_object().unwrap().identity(),
            list.as_array().unwrap().get(0).as_object().unwrap().identity()
        );
    }

    #[test]
    fn test_clone_preserves_aliasing_and_cycles() {
        let shared = Object::new();
        let root = Object::from_pairs([("a", shared.clone()), ("b", shared)]);
        root.set("me", root.clone());

        let cloned = clone_graph(&root.into(), &Registry::new()).unwrap();
        let cloned = cloned.as_object().unwrap();
        assert_eq!(cloned.get("a"), cloned.get("b"));
        assert!(cloned.get("me").as_object().unwrap().ptr_eq(cloned));
    }

    #[test]
    fn test_functions_are_dropped() {
        let root = Object::new();
        root.set("f", Function::new(|_| Value::Null));
        root.set("x", 1);
        root.set(
            "list",
            Array::from_values([Value::from(1), Function::new(|_| Value::Null).into(), Value::from(2)]),
        );

        let cloned = clone_graph(&root.into(), &Registry::new()).unwrap();
        let cloned = cloned.as_object().unwrap();
        assert_eq!(cloned.keys(), vec!["x", "list"]);
        assert_eq!(cloned.get("list").as_array().unwrap().items(), vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_computed_properties_become_data() {
        let class = Rc::new(Class::new("Person").computed("greeting", |o| match o.get("name") {
            Value::String(s) => Value::String(format!("hi {}", s)),
            _ => Value::Undefined,
        }));
        let person = Object::with_class(class);
        person.set("name", "ana");

        let cloned = clone_graph(&person.into(), &Registry::new()).unwrap();
        let cloned = cloned.as_object().unwrap();
        assert!(cloned.class().is_none());
        assert_eq!(cloned.own_keys(), vec!["name", "greeting"]);

        cloned.set("name", "bo");
        assert_eq!(cloned.get("greeting"), Value::from("hi ana"));
    }

    #[test]
    fn test_null_and_undefined_survive() {
        let root = Object::from_pairs([("n", Value::Null), ("u", Value::Undefined)]);
        let cloned = clone_graph(&root.into(), &Registry::new()).unwrap();
        let cloned = cloned.as_object().unwrap();
        assert_eq!(cloned.get("n"), Value::Null);
        assert!(cloned.own_keys().contains(&"u".to_string()));
    }

    #[test]
    fn test_value_like_clone_is_independent() {
        let registry = registry();
        let when = timestamp(100);
        let root = Object::from_pairs([("when", when.clone())]);

        let cloned = clone_graph(&root.into(), &registry).unwrap();
        let cloned_when = cloned.as_object().unwrap().get("when");
        assert_ne!(cloned_when, when);
        assert_eq!(millis(&cloned_when), Some(100));
    }

    #[test]
    fn test_reference_like_uses_plugin_clone() {
        let registry = registry();
        let b = bag(&[1, 2]);
        b.set("label", "numbers");
        b.set("me", b.clone());
        let node: Composite = b.clone().into();
        assign_identities(&node, &Counter::new(), &registry);

        let cloned = clone_graph(&b.clone().into(), &registry).unwrap();
        let cloned = cloned.as_object().unwrap();
        assert!(!cloned.ptr_eq(&b));
        assert_eq!(cloned.identity(), b.identity());
        assert_eq!(bag_items(cloned), Some(vec![1, 2]));
        assert_eq!(cloned.get("label"), Value::from("numbers"));
        assert!(cloned.get("me").as_object().unwrap().ptr_eq(cloned));

        // Generic cloning does not copy internal state.
        let plain = clone_graph(&b.into(), &Registry::new()).unwrap();
        assert_eq!(bag_items(plain.as_object().unwrap()), None);
    }
}
