//! Lookup tree: correlates former and present nodes by identity.

use super::node::{Era, NodeId};
use crate::error::{Error, IdentityConflict, Result};
use crate::fieldpath::{find_path, PathElement};
use crate::identity::Identity;
use crate::plugin::Registry;
use crate::value::{Array, Composite, Object, Value, Visited};
use std::collections::{HashMap, HashSet};

/// LookupKey is how a node is found in the tree. Tokened nodes are found by
/// identity. An untokened node is found by the record of the parent it was
/// reached from and the step it was reached by, so a getter that builds a
/// fresh object on every call still correlates across revisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum LookupKey {
    Identity(Identity),
    Slot(usize, PathElement),
    Instance(usize),
}

impl LookupKey {
    pub(crate) fn of(node: &Composite) -> Self {
        match node.identity() {
            Some(identity) => LookupKey::Identity(identity),
            None => LookupKey::Instance(node.addr()),
        }
    }

    fn child(node: &Composite, parent: usize, step: &PathElement) -> Self {
        match node.identity() {
            Some(identity) => LookupKey::Identity(identity),
            None => LookupKey::Slot(parent, step.clone()),
        }
    }
}

/// Record joins the former and present instance of one logical node.
#[derive(Debug, Default)]
pub(crate) struct Record {
    pub(crate) former: Option<Composite>,
    pub(crate) present: Option<Composite>,
    /// Union of property names seen on either side, in discovery order.
    pub(crate) keys: Vec<String>,
    key_set: HashSet<String>,
    // Children as resolved once during traversal. Getters are not called
    // again while binding.
    former_entries: Vec<(PathElement, Value)>,
    present_entries: Vec<(PathElement, Value)>,
}

impl Record {
    fn set_entries(&mut self, era: Era, entries: Vec<(PathElement, Value)>) {
        for (step, _) in &entries {
            if let PathElement::FieldName(key) = step {
                if self.key_set.insert(key.clone()) {
                    self.keys.push(key.clone());
                }
            }
        }
        match era {
            Era::Former => self.former_entries = entries,
            Era::Present => self.present_entries = entries,
        }
    }

    fn entries(&self, era: Era) -> &[(PathElement, Value)] {
        match era {
            Era::Former => &self.former_entries,
            Era::Present => &self.present_entries,
        }
    }

    /// The present kind wins when the two sides disagree.
    pub(crate) fn is_array(&self) -> bool {
        self.present
            .as_ref()
            .or(self.former.as_ref())
            .map(Composite::is_array)
            .unwrap_or(false)
    }

    pub(crate) fn identity(&self) -> Option<Identity> {
        self.present
            .as_ref()
            .or(self.former.as_ref())
            .and_then(Composite::identity)
    }

    fn slot(&mut self, era: Era) -> &mut Option<Composite> {
        match era {
            Era::Former => &mut self.former,
            Era::Present => &mut self.present,
        }
    }

    fn side(&self, era: Era) -> Option<&Composite> {
        let side = match era {
            Era::Former => self.former.as_ref(),
            Era::Present => self.present.as_ref(),
        };
        // A side of the other kind does not take part in this record's diff.
        side.filter(|c| c.is_array() == self.is_array())
    }

    pub(crate) fn object(&self, era: Era) -> Option<&Object> {
        self.side(era).and_then(Composite::as_object)
    }

    pub(crate) fn array(&self, era: Era) -> Option<&Array> {
        self.side(era).and_then(Composite::as_array)
    }

    /// The value `key` held in `era`, as seen during traversal. `None` if
    /// the object has no side in `era`.
    pub(crate) fn property(&self, era: Era, key: &str) -> Option<Value> {
        self.object(era)?;
        let value = self
            .entries(era)
            .iter()
            .find(|(step, _)| step.as_field_name() == Some(key))
            .map(|(_, v)| v.clone());
        Some(value.unwrap_or(Value::Undefined))
    }

    /// The items of the array in `era`, as seen during traversal.
    pub(crate) fn items(&self, era: Era) -> Option<Vec<Value>> {
        self.array(era)?;
        Some(self.entries(era).iter().map(|(_, v)| v.clone()).collect())
    }
}

/// LookupTree maps every node of both revisions to its record.
///
/// It lives for one diff call. Record positions double as diff node ids.
#[derive(Debug, Default)]
pub(crate) struct LookupTree {
    records: Vec<Record>,
    index: HashMap<LookupKey, usize>,
    /// Record positions of untokened instances, by address.
    instances: HashMap<usize, usize>,
}

impl LookupTree {
    /// Traverses `former` completely, then `present`.
    pub(crate) fn build(former: &Composite, present: &Composite, plugins: &Registry) -> Result<Self> {
        let mut tree = LookupTree::default();
        tree.traverse(Era::Former, former, plugins)?;
        tree.traverse(Era::Present, present, plugins)?;
        Ok(tree)
    }

    fn traverse(&mut self, era: Era, root: &Composite, plugins: &Registry) -> Result<()> {
        let mut visited = Visited::new();
        let mut stack = vec![(root.clone(), LookupKey::of(root))];

        while let Some((node, key)) = stack.pop() {
            if !visited.insert(&node) {
                continue;
            }

            let pos = match self.index.get(&key) {
                Some(&pos) => pos,
                None => {
                    self.records.push(Record::default());
                    self.index.insert(key, self.records.len() - 1);
                    self.records.len() - 1
                }
            };
            if node.identity().is_none() {
                self.instances.insert(node.addr(), pos);
            }

            let record = &mut self.records[pos];
            match record.slot(era).clone() {
                Some(existing) if !existing.ptr_eq(&node) => {
                    return Err(conflict(era, root, existing, node));
                }
                Some(_) => {}
                None => *record.slot(era) = Some(node.clone()),
            }

            let children = node.children();
            for (step, child) in children.iter().rev() {
                if child.is_function() || plugins.is_value_like(child) {
                    continue;
                }
                if let Some(c) = child.as_composite() {
                    if !visited.contains(&c) {
                        let key = LookupKey::child(&c, pos, step);
                        stack.push((c, key));
                    }
                }
            }
            record.set_entries(era, children);
        }
        Ok(())
    }

    /// The record position of a node, if it was traversed.
    pub(crate) fn lookup(&self, node: &Composite) -> Option<NodeId> {
        let pos = match node.identity() {
            Some(identity) => self.index.get(&LookupKey::Identity(identity)),
            None => self.instances.get(&node.addr()),
        };
        pos.map(|&pos| NodeId(pos))
    }

    pub(crate) fn records(&self) -> &[Record] {
        &self.records
    }

    #[cfg(test)]
    pub(crate) fn record(&self, id: NodeId) -> Option<&Record> {
        self.records.get(id.0)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }
}

/// Builds the conflict report. Paths are only searched for here, once a
/// conflict is certain.
fn conflict(era: Era, root: &Composite, first: Composite, second: Composite) -> Error {
    let identity = second
        .identity()
        .or_else(|| first.identity())
        .unwrap_or(Identity::from_raw(0));
    let first_path = find_path(root, &first).unwrap_or_default();
    let second_path = find_path(root, &second).unwrap_or_default();
    tracing::debug!(%era, %identity, %first_path, %second_path, "identity conflict");
    Error::from(IdentityConflict {
        era,
        identity,
        first_path,
        second_path,
        first,
        second,
    })
}
