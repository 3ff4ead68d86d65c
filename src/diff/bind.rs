//! Diff binding: turns lookup records into diff nodes.

use super::lookup::{LookupTree, Record};
use super::node::{ArrayNode, DiffValue, Era, Flags, Node, NodeId, ObjectNode, PropertyDiff};
use crate::plugin::Registry;
use crate::snapshot::CloneContext;
use crate::value::Value;
use std::collections::HashMap;

/// Binds every record of `tree`. The returned nodes are indexed like the
/// records.
pub(crate) fn bind(tree: &LookupTree, plugins: &Registry) -> Vec<Node> {
    let binder = Binder { tree, plugins };
    tree.records()
        .iter()
        .map(|record| {
            if record.is_array() {
                Node::Array(binder.bind_array(record))
            } else {
                Node::Object(binder.bind_object(record))
            }
        })
        .collect()
}

struct Binder<'a> {
    tree: &'a LookupTree,
    plugins: &'a Registry,
}

/// Occurrences of one distinct entry, as indices into each side.
#[derive(Debug, Default)]
struct Group {
    former: Vec<usize>,
    present: Vec<usize>,
}

impl Group {
    fn push(&mut self, era: Era, index: usize) {
        match era {
            Era::Former => self.former.push(index),
            Era::Present => self.present.push(index),
        }
    }

    fn absorb(&mut self, other: Group) {
        self.former.extend(other.former);
        self.present.extend(other.present);
        self.former.sort_unstable();
        self.present.sort_unstable();
    }
}

/// Grouping key for everything that is not value-like.
#[derive(Debug, PartialEq, Eq, Hash)]
enum EntryKey {
    Node(NodeId),
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    String(String),
    Native(usize),
    Function(usize),
}

fn entry_key(value: &DiffValue) -> EntryKey {
    match value {
        DiffValue::Object(id) | DiffValue::Array(id) => EntryKey::Node(*id),
        DiffValue::Value(v) => match v {
            Value::Undefined => EntryKey::Undefined,
            Value::Null => EntryKey::Null,
            Value::Bool(b) => EntryKey::Bool(*b),
            Value::Int(i) => EntryKey::Int(*i),
            Value::Float(f) => EntryKey::Float(float_bits(*f)),
            Value::String(s) => EntryKey::String(s.clone()),
            Value::Native(n) => EntryKey::Native(n.addr()),
            Value::Function(f) => EntryKey::Function(f.addr()),
            Value::Array(a) => EntryKey::Native(a.addr()),
            Value::Object(o) => EntryKey::Native(o.addr()),
        },
    }
}

/// Bits of a float with all zeros and all NaNs folded together.
fn float_bits(f: f64) -> u64 {
    if f == 0.0 {
        0.0f64.to_bits()
    } else if f.is_nan() {
        f64::NAN.to_bits()
    } else {
        f.to_bits()
    }
}

impl Binder<'_> {
    /// Resolves a raw value to the diff node of its record, a defensive copy
    /// for value-likes, or the value itself.
    fn resolve(&self, value: &Value) -> DiffValue {
        if let Some(node) = value.as_composite() {
            if let Some(id) = self.tree.lookup(&node) {
                return self.node_value(id);
            }
        }
        if let Some(plugin) = self.plugins.find_value_like(value) {
            let mut ctx = CloneContext::new(self.plugins);
            return DiffValue::Value(plugin.clone_value(&mut ctx, value));
        }
        DiffValue::Value(value.clone())
    }

    fn node_value(&self, id: NodeId) -> DiffValue {
        match self.tree.records().get(id.0) {
            Some(record) if record.is_array() => DiffValue::Array(id),
            _ => DiffValue::Object(id),
        }
    }

    fn same(&self, a: &DiffValue, b: &DiffValue) -> bool {
        match (a, b) {
            (DiffValue::Object(x), DiffValue::Object(y)) => x == y,
            (DiffValue::Array(x), DiffValue::Array(y)) => x == y,
            (DiffValue::Value(x), DiffValue::Value(y)) => {
                same_value(x, y) || self.plugins.value_like_equals(x, y)
            }
            _ => false,
        }
    }

    fn bind_object(&self, record: &Record) -> ObjectNode {
        let mut flags = Flags {
            is_created: record.object(Era::Former).is_none(),
            is_deleted: record.object(Era::Present).is_none(),
            is_changed: false,
        };

        let mut properties = Vec::with_capacity(record.keys.len());
        for key in &record.keys {
            let former_value = record.property(Era::Former, key);
            let present_value = record.property(Era::Present, key);
            if former_value.as_ref().is_some_and(Value::is_function)
                || present_value.as_ref().is_some_and(Value::is_function)
            {
                continue;
            }

            let diff = match (former_value, present_value) {
                (None, Some(p)) => PropertyDiff::Unchanged {
                    value: self.resolve(&p),
                },
                (Some(f), None) => PropertyDiff::Unchanged {
                    value: self.resolve(&f),
                },
                (Some(f), Some(p)) => {
                    let former_value = self.resolve(&f);
                    let value = self.resolve(&p);
                    if self.same(&former_value, &value) {
                        PropertyDiff::Unchanged { value }
                    } else {
                        flags.is_changed = true;
                        PropertyDiff::Changed {
                            value,
                            former_value,
                        }
                    }
                }
                (None, None) => continue,
            };
            properties.push((key.clone(), diff));
        }

        ObjectNode {
            identity: record.identity(),
            flags,
            properties,
        }
    }

    fn bind_array(&self, record: &Record) -> ArrayNode {
        let former = record.items(Era::Former);
        let present = record.items(Era::Present);
        let mut node = ArrayNode {
            identity: record.identity(),
            flags: Flags {
                is_created: former.is_none(),
                is_deleted: present.is_none(),
                is_changed: false,
            },
            inserted: Vec::new(),
            deleted: Vec::new(),
            other: Vec::new(),
        };

        let (former, present) = match (former, present) {
            (Some(f), Some(p)) => (f, p),
            // An array that exists in one revision only has no insert/delete
            // split: everything is reported in `other`.
            (f, p) => {
                if let Some(items) = p.or(f) {
                    node.other = self.resolve_items(&items);
                }
                return node;
            }
        };

        let present_items = self.resolve_items(&present);
        let former_items = self.resolve_items(&former);

        let mut groups: Vec<Group> = Vec::new();
        let mut index: HashMap<EntryKey, usize> = HashMap::new();
        let mut value_likes: Vec<(DiffValue, Group)> = Vec::new();

        for (era, items) in [(Era::Present, &present_items), (Era::Former, &former_items)] {
            for (i, item) in items.iter().enumerate() {
                let is_value_like = item
                    .as_value()
                    .is_some_and(|v| self.plugins.is_value_like(v));
                if is_value_like {
                    let mut group = Group::default();
                    group.push(era, i);
                    value_likes.push((item.clone(), group));
                    continue;
                }
                let pos = *index.entry(entry_key(item)).or_insert_with(|| {
                    groups.push(Group::default());
                    groups.len() - 1
                });
                groups[pos].push(era, i);
            }
        }

        // Distinct value-like instances can be equal, so they are merged
        // pairwise with their plugin's equality.
        let mut i = 0;
        while i < value_likes.len() {
            let mut j = i + 1;
            while j < value_likes.len() {
                if self.same(&value_likes[i].0, &value_likes[j].0) {
                    let (_, group) = value_likes.remove(j);
                    value_likes[i].1.absorb(group);
                } else {
                    j += 1;
                }
            }
            i += 1;
        }

        let mut kept = Vec::new();
        let mut inserted = Vec::new();
        let mut deleted = Vec::new();
        for group in groups.iter().chain(value_likes.iter().map(|(_, g)| g)) {
            let f = group.former.len();
            let p = group.present.len();
            let matched = f.min(p);
            kept.extend_from_slice(&group.present[..matched]);
            inserted.extend_from_slice(&group.present[matched..]);
            if f > p {
                deleted.extend_from_slice(&group.former[..f - p]);
            }
        }
        kept.sort_unstable();
        inserted.sort_unstable();
        deleted.sort_unstable();

        node.other = kept.into_iter().map(|i| present_items[i].clone()).collect();
        node.inserted = inserted.into_iter().map(|i| present_items[i].clone()).collect();
        node.deleted = deleted.into_iter().map(|i| former_items[i].clone()).collect();
        node.flags.is_changed = !node.inserted.is_empty() || !node.deleted.is_empty();
        node
    }

    fn resolve_items(&self, items: &[Value]) -> Vec<DiffValue> {
        items
            .iter()
            .filter(|v| !v.is_function())
            .map(|v| self.resolve(v))
            .collect()
    }
}

/// Strict equality, except that NaN matches NaN.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float(x), Value::Float(y)) => x == y || (x.is_nan() && y.is_nan()),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_bits_fold_zero_and_nan() {
        assert_eq!(float_bits(0.0), float_bits(-0.0));
        assert_eq!(float_bits(f64::NAN), float_bits(-f64::NAN));
        assert_ne!(float_bits(1.0), float_bits(2.0));
    }

    #[test]
    fn test_same_value() {
        assert!(same_value(&Value::Float(f64::NAN), &Value::Float(f64::NAN)));
        assert!(same_value(&Value::from("a"), &Value::from("a")));
        assert!(!same_value(&Value::Int(1), &Value::Float(1.0)));
    }

    #[test]
    fn test_group_absorb_keeps_scan_order() {
        let mut a = Group { former: vec![4], present: vec![2] };
        a.absorb(Group { former: vec![1], present: vec![0, 3] });
        assert_eq!(a.former, vec![1, 4]);
        assert_eq!(a.present, vec![0, 2, 3]);
    }

    #[test]
    fn test_entry_key_groups_primitives_by_value() {
        let a = DiffValue::Value(Value::from("x"));
        let b = DiffValue::Value(Value::from("x"));
        assert_eq!(entry_key(&a), entry_key(&b));
        assert_ne!(
            entry_key(&DiffValue::Object(NodeId(1))),
            entry_key(&DiffValue::Object(NodeId(2)))
        );
    }
}
