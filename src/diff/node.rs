//! Diff node types and per-node views.

use crate::identity::Identity;
use crate::plugin::Registry;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Era selects one of the two revisions being compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Era {
    Former,
    Present,
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Era::Former => f.write_str("former"),
            Era::Present => f.write_str("present"),
        }
    }
}

/// DiffState is the reported state of an object or array diff.
///
/// Created and Deleted take precedence over Changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffState {
    Unchanged,
    Created,
    Changed,
    Deleted,
}

/// NodeId addresses a node inside one [`Diff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// DiffValue is what a property or array entry resolves to: a raw value
/// for primitives and value-likes, or a diff node for composites.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffValue {
    Value(Value),
    Object(NodeId),
    Array(NodeId),
}

impl DiffValue {
    /// The diff node behind this value, if it is a composite.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            DiffValue::Object(id) | DiffValue::Array(id) => Some(*id),
            DiffValue::Value(_) => None,
        }
    }

    /// The raw value, if this is not a composite.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            DiffValue::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// PropertyDiff is the diff of one object property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyDiff {
    Unchanged { value: DiffValue },
    Changed { value: DiffValue, former_value: DiffValue },
}

impl PropertyDiff {
    /// The present-side value.
    pub fn value(&self) -> &DiffValue {
        match self {
            PropertyDiff::Unchanged { value } | PropertyDiff::Changed { value, .. } => value,
        }
    }

    /// The former-side value. Same as [`PropertyDiff::value`] when unchanged.
    pub fn former_value(&self) -> &DiffValue {
        match self {
            PropertyDiff::Unchanged { value } => value,
            PropertyDiff::Changed { former_value, .. } => former_value,
        }
    }

    pub fn get(&self, era: Era) -> &DiffValue {
        match era {
            Era::Former => self.former_value(),
            Era::Present => self.value(),
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, PropertyDiff::Changed { .. })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Flags {
    pub(crate) is_created: bool,
    pub(crate) is_deleted: bool,
    pub(crate) is_changed: bool,
}

impl Flags {
    fn state(&self) -> DiffState {
        if self.is_created {
            DiffState::Created
        } else if self.is_deleted {
            DiffState::Deleted
        } else if self.is_changed {
            DiffState::Changed
        } else {
            DiffState::Unchanged
        }
    }

    pub(crate) fn any(&self) -> bool {
        self.is_created || self.is_deleted || self.is_changed
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ObjectNode {
    pub(crate) identity: Option<Identity>,
    pub(crate) flags: Flags,
    pub(crate) properties: Vec<(String, PropertyDiff)>,
}

#[derive(Debug, Clone)]
pub(crate) struct ArrayNode {
    pub(crate) identity: Option<Identity>,
    pub(crate) flags: Flags,
    pub(crate) inserted: Vec<DiffValue>,
    pub(crate) deleted: Vec<DiffValue>,
    pub(crate) other: Vec<DiffValue>,
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Object(ObjectNode),
    Array(ArrayNode),
}

/// Diff owns every node produced by one diff call.
///
/// Nodes reference each other by [`NodeId`], so a cyclic model produces a
/// cyclic diff without shared ownership.
#[derive(Debug, Clone)]
pub struct Diff {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    pub(crate) plugins: Registry,
}

impl Diff {
    pub(crate) fn new(nodes: Vec<Node>, root: NodeId, plugins: Registry) -> Self {
        Diff {
            nodes,
            root,
            plugins,
        }
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// The node correlating the two roots.
    pub fn root(&self) -> DiffRef<'_> {
        // The root id is produced together with the node list.
        self.node(self.root).unwrap_or_else(|| unreachable!("diff root out of range"))
    }

    pub fn node(&self, id: NodeId) -> Option<DiffRef<'_>> {
        match self.nodes.get(id.0)? {
            Node::Object(node) => Some(DiffRef::Object(ObjectDiff { diff: self, id, node })),
            Node::Array(node) => Some(DiffRef::Array(ArrayDiff { diff: self, id, node })),
        }
    }

    pub fn object(&self, id: NodeId) -> Option<ObjectDiff<'_>> {
        self.node(id).and_then(DiffRef::into_object)
    }

    pub fn array(&self, id: NodeId) -> Option<ArrayDiff<'_>> {
        self.node(id).and_then(DiffRef::into_array)
    }

    /// The node behind a resolved value, if it is a composite.
    pub fn resolve(&self, value: &DiffValue) -> Option<DiffRef<'_>> {
        value.node_id().and_then(|id| self.node(id))
    }

    /// Number of correlated nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn state(&self) -> DiffState {
        self.root().state()
    }

    pub fn is_dirty(&self) -> bool {
        self.is_node_dirty(self.root)
    }

    pub fn unwrap(&self, era: Era) -> Value {
        self.unwrap_node(era, self.root)
    }

    pub(crate) fn flags(&self, id: NodeId) -> Flags {
        match self.nodes.get(id.0) {
            Some(Node::Object(n)) => n.flags,
            Some(Node::Array(n)) => n.flags,
            None => Flags::default(),
        }
    }
}

/// DiffRef is a view of either kind of node.
#[derive(Clone, Copy)]
pub enum DiffRef<'a> {
    Object(ObjectDiff<'a>),
    Array(ArrayDiff<'a>),
}

impl<'a> DiffRef<'a> {
    pub fn id(&self) -> NodeId {
        match self {
            DiffRef::Object(o) => o.id(),
            DiffRef::Array(a) => a.id(),
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        match self {
            DiffRef::Object(o) => o.identity(),
            DiffRef::Array(a) => a.identity(),
        }
    }

    pub fn state(&self) -> DiffState {
        match self {
            DiffRef::Object(o) => o.state(),
            DiffRef::Array(a) => a.state(),
        }
    }

    pub fn is_created(&self) -> bool {
        self.flags().is_created
    }

    pub fn is_deleted(&self) -> bool {
        self.flags().is_deleted
    }

    pub fn is_changed(&self) -> bool {
        self.flags().is_changed
    }

    pub fn is_dirty(&self) -> bool {
        self.diff().is_node_dirty(self.id())
    }

    pub fn unwrap(&self, era: Era) -> Value {
        self.diff().unwrap_node(era, self.id())
    }

    pub fn as_object(&self) -> Option<&ObjectDiff<'a>> {
        match self {
            DiffRef::Object(o) => Some(o),
            DiffRef::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayDiff<'a>> {
        match self {
            DiffRef::Array(a) => Some(a),
            DiffRef::Object(_) => None,
        }
    }

    pub fn into_object(self) -> Option<ObjectDiff<'a>> {
        match self {
            DiffRef::Object(o) => Some(o),
            DiffRef::Array(_) => None,
        }
    }

    pub fn into_array(self) -> Option<ArrayDiff<'a>> {
        match self {
            DiffRef::Array(a) => Some(a),
            DiffRef::Object(_) => None,
        }
    }

    fn flags(&self) -> Flags {
        match self {
            DiffRef::Object(o) => o.node.flags,
            DiffRef::Array(a) => a.node.flags,
        }
    }

    fn diff(&self) -> &'a Diff {
        match self {
            DiffRef::Object(o) => o.diff,
            DiffRef::Array(a) => a.diff,
        }
    }
}

impl fmt::Debug for DiffRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffRef::Object(o) => o.fmt(f),
            DiffRef::Array(a) => a.fmt(f),
        }
    }
}

/// ObjectDiff is a view of one correlated object.
#[derive(Clone, Copy)]
pub struct ObjectDiff<'a> {
    diff: &'a Diff,
    id: NodeId,
    node: &'a ObjectNode,
}

impl<'a> ObjectDiff<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn identity(&self) -> Option<Identity> {
        self.node.identity
    }

    pub fn state(&self) -> DiffState {
        self.node.flags.state()
    }

    pub fn is_created(&self) -> bool {
        self.node.flags.is_created
    }

    pub fn is_deleted(&self) -> bool {
        self.node.flags.is_deleted
    }

    /// True if any own property changed. Never set on created or deleted
    /// objects.
    pub fn is_changed(&self) -> bool {
        self.node.flags.is_changed
    }

    /// True if this object or anything reachable from it changed.
    pub fn is_dirty(&self) -> bool {
        self.diff.is_node_dirty(self.id)
    }

    /// Rebuilds the object as it was in `era`.
    pub fn unwrap(&self, era: Era) -> Value {
        self.diff.unwrap_node(era, self.id)
    }

    pub fn get(&self, name: &str) -> Option<&'a PropertyDiff> {
        let node: &'a ObjectNode = self.node;
        node.properties
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, p)| p)
    }

    /// Property diffs in discovery order. Each call starts a fresh iterator.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a PropertyDiff)> + 'a {
        let node: &'a ObjectNode = self.node;
        node.properties.iter().map(|(k, p)| (k.as_str(), p))
    }

    pub fn property_names(&self) -> Vec<&'a str> {
        self.iter().map(|(k, _)| k).collect()
    }

    pub fn len(&self) -> usize {
        self.node.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node.properties.is_empty()
    }

    /// The nested node behind a property, if it holds a composite.
    pub fn child(&self, name: &str, era: Era) -> Option<DiffRef<'a>> {
        let value = self.get(name)?.get(era);
        self.diff.resolve(value)
    }
}

impl fmt::Debug for ObjectDiff<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectDiff")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("properties", &self.property_names())
            .finish()
    }
}

/// ArrayDiff is a view of one correlated array.
#[derive(Clone, Copy)]
pub struct ArrayDiff<'a> {
    diff: &'a Diff,
    id: NodeId,
    node: &'a ArrayNode,
}

impl<'a> ArrayDiff<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn identity(&self) -> Option<Identity> {
        self.node.identity
    }

    pub fn state(&self) -> DiffState {
        self.node.flags.state()
    }

    pub fn is_created(&self) -> bool {
        self.node.flags.is_created
    }

    pub fn is_deleted(&self) -> bool {
        self.node.flags.is_deleted
    }

    /// True if any occurrence was inserted or deleted. Reordering and
    /// changes inside matched elements do not count.
    pub fn is_changed(&self) -> bool {
        self.node.flags.is_changed
    }

    pub fn is_dirty(&self) -> bool {
        self.diff.is_node_dirty(self.id)
    }

    pub fn unwrap(&self, era: Era) -> Value {
        self.diff.unwrap_node(era, self.id)
    }

    /// Occurrences only found in the present array.
    pub fn inserted(&self) -> &'a [DiffValue] {
        let node: &'a ArrayNode = self.node;
        &node.inserted
    }

    /// Occurrences only found in the former array.
    pub fn deleted(&self) -> &'a [DiffValue] {
        let node: &'a ArrayNode = self.node;
        &node.deleted
    }

    /// Occurrences matched in both arrays.
    pub fn other(&self) -> &'a [DiffValue] {
        let node: &'a ArrayNode = self.node;
        &node.other
    }

    /// Inserted, deleted and matched occurrences, in that order.
    pub fn all(&self) -> impl Iterator<Item = &'a DiffValue> + 'a {
        let node: &'a ArrayNode = self.node;
        node.inserted
            .iter()
            .chain(node.deleted.iter())
            .chain(node.other.iter())
    }
}

impl fmt::Debug for ArrayDiff<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayDiff")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("inserted", &self.node.inserted.len())
            .field("deleted", &self.node.deleted.len())
            .field("other", &self.node.other.len())
            .finish()
    }
}
