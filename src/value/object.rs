//! Composite graph nodes: objects, arrays and record classes.

use super::value::{Native, Value};
use crate::fieldpath::PathElement;
use crate::identity::Identity;
use once_cell::unsync::OnceCell;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Getter computes the value of a read-only property from its owner.
pub type Getter = Rc<dyn Fn(&Object) -> Value>;

/// Class is the reflection contract of a record type.
///
/// A class declares computed (getter-only) properties. Lookups walk the
/// parent chain, so a subclass sees every computed property of its
/// ancestors unless it declares one with the same name.
pub struct Class {
    name: String,
    parent: Option<Rc<Class>>,
    computed: Vec<(String, Getter)>,
}

impl Class {
    pub fn new(name: impl Into<String>) -> Self {
        Class {
            name: name.into(),
            parent: None,
            computed: Vec::new(),
        }
    }

    /// Sets the parent class.
    pub fn extends(mut self, parent: Rc<Class>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Declares a computed property.
    pub fn computed(
        mut self,
        name: impl Into<String>,
        getter: impl Fn(&Object) -> Value + 'static,
    ) -> Self {
        self.computed.push((name.into(), Rc::new(getter)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Rc<Class>> {
        self.parent.as_ref()
    }

    fn getter(&self, key: &str) -> Option<Getter> {
        let mut class = Some(self);
        while let Some(c) = class {
            if let Some((_, g)) = c.computed.iter().find(|(name, _)| name == key) {
                return Some(g.clone());
            }
            class = c.parent.as_deref();
        }
        None
    }

    /// Computed property names, nearest class first, without duplicates.
    fn computed_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        let mut class = Some(self);
        while let Some(c) = class {
            for (name, _) in &c.computed {
                if !keys.contains(name) {
                    keys.push(name.clone());
                }
            }
            class = c.parent.as_deref();
        }
        keys
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("computed", &self.computed_keys())
            .finish()
    }
}

struct ObjectNode {
    identity: OnceCell<Identity>,
    class: Option<Rc<Class>>,
    properties: RefCell<Vec<(String, Value)>>,
    internal: RefCell<Option<Native>>,
}

/// Object is a shared handle to a keyed record.
///
/// Cloning the handle aliases the same instance. Properties keep insertion
/// order. The identity slot is not a property: it never shows up in
/// [`Object::keys`] or in serialized output.
#[derive(Clone)]
pub struct Object(Rc<ObjectNode>);

impl Object {
    pub fn new() -> Self {
        Object::build(None)
    }

    /// Creates an instance of a record class.
    pub fn with_class(class: Rc<Class>) -> Self {
        Object::build(Some(class))
    }

    fn build(class: Option<Rc<Class>>) -> Self {
        Object(Rc::new(ObjectNode {
            identity: OnceCell::new(),
            class,
            properties: RefCell::new(Vec::new()),
            internal: RefCell::new(None),
        }))
    }

    /// Creates an object from key/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let obj = Object::new();
        for (k, v) in pairs {
            obj.set(k, v);
        }
        obj
    }

    pub fn identity(&self) -> Option<Identity> {
        self.0.identity.get().copied()
    }

    /// Stamps the identity slot. Returns false if it was already set.
    pub(crate) fn stamp(&self, identity: Identity) -> bool {
        self.0.identity.set(identity).is_ok()
    }

    pub fn class(&self) -> Option<&Rc<Class>> {
        self.0.class.as_ref()
    }

    /// Reads a property, resolving computed properties through the class
    /// chain. Missing keys read as `Undefined`.
    pub fn get(&self, key: &str) -> Value {
        let own = self
            .0
            .properties
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone());
        if let Some(v) = own {
            return v;
        }
        match self.0.class.as_ref().and_then(|c| c.getter(key)) {
            Some(getter) => getter(self),
            None => Value::Undefined,
        }
    }

    /// Sets an own property. An own property shadows a computed one.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let mut props = self.0.properties.borrow_mut();
        match props.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => props.push((key, value)),
        }
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut props = self.0.properties.borrow_mut();
        let pos = props.iter().position(|(k, _)| k == key)?;
        Some(props.remove(pos).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys().iter().any(|k| k == key)
    }

    /// Own property names in insertion order.
    pub fn own_keys(&self) -> Vec<String> {
        self.0
            .properties
            .borrow()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Every visible property name: own keys, then computed keys that are
    /// not shadowed.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = self.own_keys();
        if let Some(class) = &self.0.class {
            for k in class.computed_keys() {
                if !keys.contains(&k) {
                    keys.push(k);
                }
            }
        }
        keys
    }

    /// Own properties only, without resolving computed ones.
    pub fn own_entries(&self) -> Vec<(String, Value)> {
        self.0.properties.borrow().clone()
    }

    /// Every visible property with computed properties resolved.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.keys()
            .into_iter()
            .map(|k| {
                let v = self.get(&k);
                (k, v)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Opaque state that generic cloning does not copy.
    pub fn internal(&self) -> Option<Native> {
        self.0.internal.borrow().clone()
    }

    pub fn set_internal(&self, internal: Option<Native>) {
        *self.0.internal.borrow_mut() = internal;
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl Default for Object {
    fn default() -> Self {
        Object::new()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("identity", &self.identity())
            .field("class", &self.class().map(|c| c.name().to_string()))
            .field("keys", &self.own_keys())
            .finish()
    }
}

struct ArrayNode {
    identity: OnceCell<Identity>,
    items: RefCell<Vec<Value>>,
}

/// Array is a shared handle to an ordered list of values.
#[derive(Clone)]
pub struct Array(Rc<ArrayNode>);

impl Array {
    pub fn new() -> Self {
        Array(Rc::new(ArrayNode {
            identity: OnceCell::new(),
            items: RefCell::new(Vec::new()),
        }))
    }

    pub fn from_values<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        let arr = Array::new();
        arr.0
            .items
            .borrow_mut()
            .extend(values.into_iter().map(Into::into));
        arr
    }

    pub fn identity(&self) -> Option<Identity> {
        self.0.identity.get().copied()
    }

    pub(crate) fn stamp(&self, identity: Identity) -> bool {
        self.0.identity.set(identity).is_ok()
    }

    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads an element. Out of range reads as `Undefined`.
    pub fn get(&self, index: usize) -> Value {
        self.0
            .items
            .borrow()
            .get(index)
            .cloned()
            .unwrap_or(Value::Undefined)
    }

    /// Writes an element, padding with `Undefined` when writing past the end.
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        let mut items = self.0.items.borrow_mut();
        if index >= items.len() {
            items.resize(index + 1, Value::Undefined);
        }
        items[index] = value.into();
    }

    pub fn push(&self, value: impl Into<Value>) {
        self.0.items.borrow_mut().push(value.into());
    }

    pub fn remove(&self, index: usize) -> Option<Value> {
        let mut items = self.0.items.borrow_mut();
        if index < items.len() {
            Some(items.remove(index))
        } else {
            None
        }
    }

    /// Copies out the element handles.
    pub fn items(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl Default for Array {
    fn default() -> Self {
        Array::new()
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("identity", &self.identity())
            .field("len", &self.len())
            .finish()
    }
}

/// Composite is either kind of node that can carry an identity.
#[derive(Clone, Debug)]
pub enum Composite {
    Array(Array),
    Object(Object),
}

impl Composite {
    pub fn identity(&self) -> Option<Identity> {
        match self {
            Composite::Array(a) => a.identity(),
            Composite::Object(o) => o.identity(),
        }
    }

    pub(crate) fn stamp(&self, identity: Identity) -> bool {
        match self {
            Composite::Array(a) => a.stamp(identity),
            Composite::Object(o) => o.stamp(identity),
        }
    }

    pub fn ptr_eq(&self, other: &Composite) -> bool {
        match (self, other) {
            (Composite::Array(a), Composite::Array(b)) => a.ptr_eq(b),
            (Composite::Object(a), Composite::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub(crate) fn addr(&self) -> usize {
        match self {
            Composite::Array(a) => a.addr(),
            Composite::Object(o) => o.addr(),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Composite::Array(_))
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Composite::Object(o) => Some(o),
            Composite::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Composite::Array(a) => Some(a),
            Composite::Object(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Composite::Array(a) => Value::Array(a.clone()),
            Composite::Object(o) => Value::Object(o.clone()),
        }
    }

    /// Visible children with their path step. Computed properties are
    /// resolved.
    pub fn children(&self) -> Vec<(PathElement, Value)> {
        match self {
            Composite::Array(a) => a
                .items()
                .into_iter()
                .enumerate()
                .map(|(i, v)| (PathElement::Index(i), v))
                .collect(),
            Composite::Object(o) => o
                .entries()
                .into_iter()
                .map(|(k, v)| (PathElement::FieldName(k), v))
                .collect(),
        }
    }

    /// Stored children only. Computed properties are skipped.
    pub(crate) fn own_children(&self) -> Vec<(PathElement, Value)> {
        match self {
            Composite::Array(_) => self.children(),
            Composite::Object(o) => o
                .own_entries()
                .into_iter()
                .map(|(k, v)| (PathElement::FieldName(k), v))
                .collect(),
        }
    }

    /// Writes one child slot. Returns false if the step does not fit the
    /// node kind.
    pub(crate) fn write(&self, step: &PathElement, value: Value) -> bool {
        match (self, step) {
            (Composite::Object(o), PathElement::FieldName(k)) => {
                o.set(k.clone(), value);
                true
            }
            (Composite::Array(a), PathElement::Index(i)) => {
                a.set(*i, value);
                true
            }
            _ => false,
        }
    }

    /// Reads one child slot.
    pub(crate) fn read(&self, step: &PathElement) -> Option<Value> {
        match (self, step) {
            (Composite::Object(o), PathElement::FieldName(k)) => Some(o.get(k)),
            (Composite::Array(a), PathElement::Index(i)) => Some(a.get(*i)),
            _ => None,
        }
    }
}

impl From<Object> for Composite {
    fn from(o: Object) -> Self {
        Composite::Object(o)
    }
}

impl From<Array> for Composite {
    fn from(a: Array) -> Self {
        Composite::Array(a)
    }
}

/// Visited is a per-traversal set of composites keyed by reference.
///
/// It holds a handle to every node it has seen so an address cannot be
/// reused by a fresh allocation while the traversal runs.
#[derive(Default)]
pub(crate) struct Visited {
    seen: HashMap<usize, Composite>,
}

impl Visited {
    pub(crate) fn new() -> Self {
        Visited::default()
    }

    /// Marks the node as visited. Returns false if it already was.
    pub(crate) fn insert(&mut self, node: &Composite) -> bool {
        if self.seen.contains_key(&node.addr()) {
            return false;
        }
        self.seen.insert(node.addr(), node.clone());
        true
    }

    pub(crate) fn contains(&self, node: &Composite) -> bool {
        self.seen.contains_key(&node.addr())
    }
}
