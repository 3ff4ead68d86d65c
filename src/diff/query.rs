//! Dirty check, reconstruction and summary of a bound diff.

use super::node::{Diff, DiffValue, Era, Node, NodeId, PropertyDiff};
use crate::fieldpath::{Path, PathElement};
use crate::snapshot::CloneContext;
use crate::value::{Array, Composite, Object, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

impl Diff {
    pub(crate) fn is_node_dirty(&self, id: NodeId) -> bool {
        self.node_dirty(id, &mut HashSet::new())
    }

    /// True if the property changed or the node behind it is dirty.
    /// Primitives and value-likes are never dirty on their own.
    pub fn is_property_dirty(&self, property: &PropertyDiff) -> bool {
        self.property_dirty(property, &mut HashSet::new())
    }

    pub fn is_value_dirty(&self, value: &DiffValue) -> bool {
        self.value_dirty(value, &mut HashSet::new())
    }

    // A node already on the seen list is either being evaluated further up
    // or already known to be clean.
    fn node_dirty(&self, id: NodeId, seen: &mut HashSet<NodeId>) -> bool {
        if !seen.insert(id) {
            return false;
        }
        match self.nodes.get(id.0) {
            Some(Node::Object(node)) => {
                node.flags.any()
                    || node
                        .properties
                        .iter()
                        .any(|(_, p)| self.property_dirty(p, seen))
            }
            // Inserted and deleted entries already make the array changed.
            Some(Node::Array(node)) => {
                node.flags.any() || node.other.iter().any(|v| self.value_dirty(v, seen))
            }
            None => false,
        }
    }

    fn property_dirty(&self, property: &PropertyDiff, seen: &mut HashSet<NodeId>) -> bool {
        property.is_changed() || self.value_dirty(property.value(), seen)
    }

    fn value_dirty(&self, value: &DiffValue, seen: &mut HashSet<NodeId>) -> bool {
        value.node_id().is_some_and(|id| self.node_dirty(id, seen))
    }

    pub(crate) fn unwrap_node(&self, era: Era, id: NodeId) -> Value {
        self.rebuild(era, id, &mut HashMap::new())
    }

    /// Rebuilds the value a property held in `era`.
    pub fn unwrap_property(&self, era: Era, property: &PropertyDiff) -> Value {
        self.unwrap_value(era, property.get(era))
    }

    pub fn unwrap_value(&self, era: Era, value: &DiffValue) -> Value {
        self.rebuild_value(era, value, &mut HashMap::new())
    }

    /// Builds a detached plain node for `id`. Nodes are registered in
    /// `built` before their children, so cycles and aliases come out as
    /// shared references.
    fn rebuild(&self, era: Era, id: NodeId, built: &mut HashMap<NodeId, Composite>) -> Value {
        if let Some(done) = built.get(&id) {
            return done.to_value();
        }
        match self.nodes.get(id.0) {
            Some(Node::Object(node)) => {
                let obj = Object::new();
                if let Some(identity) = node.identity {
                    obj.stamp(identity);
                }
                built.insert(id, obj.clone().into());
                for (key, property) in &node.properties {
                    let value = self.rebuild_value(era, property.get(era), built);
                    if !value.is_undefined() {
                        obj.set(key.clone(), value);
                    }
                }
                obj.into()
            }
            Some(Node::Array(node)) => {
                let arr = Array::new();
                if let Some(identity) = node.identity {
                    arr.stamp(identity);
                }
                built.insert(id, arr.clone().into());
                let extra = match era {
                    Era::Former => &node.deleted,
                    Era::Present => &node.inserted,
                };
                for item in node.other.iter().chain(extra.iter()) {
                    arr.push(self.rebuild_value(era, item, built));
                }
                arr.into()
            }
            None => Value::Undefined,
        }
    }

    fn rebuild_value(
        &self,
        era: Era,
        value: &DiffValue,
        built: &mut HashMap<NodeId, Composite>,
    ) -> Value {
        match value {
            DiffValue::Object(id) | DiffValue::Array(id) => self.rebuild(era, *id, built),
            DiffValue::Value(v) => match self.plugins.find_value_like(v) {
                Some(plugin) => {
                    let mut ctx = CloneContext::new(&self.plugins);
                    plugin.clone_value(&mut ctx, v)
                }
                None => v.clone(),
            },
        }
    }

    /// Lists created, deleted and changed locations, each under the first
    /// path it is reached by from the root.
    fn changes(&self) -> Changes {
        let mut changes = Changes::default();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        seen.insert(self.root);
        queue.push_back((self.root, Path::new()));

        while let Some((id, path)) = queue.pop_front() {
            let flags = self.flags(id);
            let mut next: Vec<(PathElement, &DiffValue)> = Vec::new();

            match self.nodes.get(id.0) {
                Some(Node::Object(node)) => {
                    for (key, property) in &node.properties {
                        let step = PathElement::from(key.as_str());
                        if property.is_changed() && !flags.is_created && !flags.is_deleted {
                            changes.changed.push(path.with(step.clone()).to_string());
                            next.push((step.clone(), property.former_value()));
                        }
                        next.push((step, property.value()));
                    }
                }
                Some(Node::Array(node)) => {
                    if flags.is_changed && !flags.is_created && !flags.is_deleted {
                        changes.changed.push(format!(
                            "{} (+{} -{})",
                            path,
                            node.inserted.len(),
                            node.deleted.len()
                        ));
                    }
                    let base = node.other.len();
                    for (i, v) in node.other.iter().enumerate() {
                        next.push((PathElement::Index(i), v));
                    }
                    for bucket in [&node.inserted, &node.deleted] {
                        for (i, v) in bucket.iter().enumerate() {
                            next.push((PathElement::Index(base + i), v));
                        }
                    }
                }
                None => {}
            }

            if flags.is_created {
                changes.created.push(path.to_string());
            } else if flags.is_deleted {
                changes.deleted.push(path.to_string());
            }

            for (step, value) in next {
                if let Some(child) = value.node_id() {
                    if seen.insert(child) {
                        queue.push_back((child, path.with(step)));
                    }
                }
            }
        }
        changes
    }
}

#[derive(Debug, Default)]
struct Changes {
    changed: Vec<String>,
    created: Vec<String>,
    deleted: Vec<String>,
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let changes = self.changes();
        let mut first = true;

        for (title, paths) in [
            ("Changed", &changes.changed),
            ("Created", &changes.created),
            ("Deleted", &changes.deleted),
        ] {
            if paths.is_empty() {
                continue;
            }
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "- {}:", title)?;
            for path in paths {
                write!(f, "\n  {}", path)?;
            }
        }

        Ok(())
    }
}
