//! Plugins shared by the test suites.

use super::{ReferenceLike, ValueLike};
use crate::snapshot::CloneContext;
use crate::value::{Class, Composite, Native, Object, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A mutable millisecond timestamp, like a host date type.
pub(crate) struct Timestamp(pub(crate) Cell<i64>);

pub(crate) fn timestamp(millis: i64) -> Value {
    Value::Native(Native::new(Timestamp(Cell::new(millis))))
}

pub(crate) fn millis(value: &Value) -> Option<i64> {
    value
        .as_native()
        .and_then(|n| n.downcast_ref::<Timestamp>())
        .map(|t| t.0.get())
}

pub(crate) struct TimestampPlugin;

impl ValueLike for TimestampPlugin {
    fn name(&self) -> &str {
        "timestamp"
    }

    fn is_match(&self, value: &Value) -> bool {
        millis(value).is_some()
    }

    fn clone_value(&self, _ctx: &mut CloneContext<'_>, value: &Value) -> Value {
        timestamp(millis(value).unwrap_or_default())
    }

    fn equals(&self, a: &Value, b: &Value) -> bool {
        millis(a) == millis(b)
    }
}

thread_local! {
    static POINT: Rc<Class> = Rc::new(Class::new("Point"));
    static BAG: Rc<Class> = Rc::new(Class::new("Bag"));
}

/// An object compared by its coordinates.
pub(crate) fn point(x: i64, y: i64) -> Value {
    let obj = Object::with_class(POINT.with(Rc::clone));
    obj.set("x", x);
    obj.set("y", y);
    obj.into()
}

fn is_class(value: &Value, name: &str) -> bool {
    value
        .as_object()
        .and_then(|o| o.class().map(|c| c.name() == name))
        .unwrap_or(false)
}

pub(crate) struct PointPlugin;

impl ValueLike for PointPlugin {
    fn name(&self) -> &str {
        "point"
    }

    fn is_match(&self, value: &Value) -> bool {
        is_class(value, "Point")
    }

    fn clone_value(&self, _ctx: &mut CloneContext<'_>, value: &Value) -> Value {
        match value.as_object() {
            Some(o) => point(o.get("x").as_int().unwrap_or(0), o.get("y").as_int().unwrap_or(0)),
            None => value.clone(),
        }
    }

    fn equals(&self, a: &Value, b: &Value) -> bool {
        match (a.as_object(), b.as_object()) {
            (Some(a), Some(b)) => a.get("x") == b.get("x") && a.get("y") == b.get("y"),
            _ => false,
        }
    }
}

/// A record whose contents live in opaque internal state.
pub(crate) fn bag(items: &[i64]) -> Object {
    let obj = Object::with_class(BAG.with(Rc::clone));
    obj.set_internal(Some(Native::new(RefCell::new(items.to_vec()))));
    obj
}

pub(crate) fn bag_items(obj: &Object) -> Option<Vec<i64>> {
    obj.internal()
        .and_then(|n| n.downcast_ref::<RefCell<Vec<i64>>>().map(|c| c.borrow().clone()))
}

pub(crate) struct BagPlugin;

impl ReferenceLike for BagPlugin {
    fn name(&self) -> &str {
        "bag"
    }

    fn is_match(&self, node: &Composite) -> bool {
        is_class(&node.to_value(), "Bag")
    }

    fn allocate(&self, original: &Composite) -> Option<Composite> {
        let items = original.as_object().and_then(bag_items)?;
        Some(bag(&items).into())
    }
}
