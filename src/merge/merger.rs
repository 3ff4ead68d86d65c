//! Merger writes values into a live model and retargets aliases.

use crate::error::{Error, Result};
use crate::fieldpath::{Path, PathElement};
use crate::identity::Identity;
use crate::plugin::Registry;
use crate::value::{Composite, Value, Visited};
use std::collections::HashMap;

/// Merger is handed to a merge callback to apply writes under its target.
///
/// Every write that assigns a tokened object or array also replaces every
/// other reference in the host model whose identity matches a node of the
/// assigned subgraph, so all aliases of one logical node end up pointing at
/// the assigned instance.
pub struct Merger<'a> {
    host: Composite,
    target: Composite,
    plugins: &'a Registry,
    retargeted: usize,
}

impl<'a> Merger<'a> {
    pub(crate) fn new(host: Composite, target: Composite, plugins: &'a Registry) -> Self {
        Merger {
            host,
            target,
            plugins,
            retargeted: 0,
        }
    }

    /// The node that paths are resolved against.
    pub fn target(&self) -> &Composite {
        &self.target
    }

    /// Reads the value at `path` below the target. Missing slots and
    /// steps through primitives read as `Undefined`.
    pub fn get(&self, path: &Path) -> Value {
        let mut current = self.target.to_value();
        for step in path.iter() {
            current = match current.as_composite().and_then(|c| c.read(step)) {
                Some(v) => v,
                None => return Value::Undefined,
            };
        }
        current
    }

    /// Assigns `value` at `path` below the target, then retargets every
    /// alias in the host model.
    pub fn set(&mut self, path: &Path, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let (last, parents) = path
            .split_last()
            .ok_or_else(|| Error::invalid_path(Path::new(), "cannot replace the merge target"))?;

        let mut parent = self.target.clone();
        for (i, step) in parents.iter().enumerate() {
            let next = parent.read(step).unwrap_or_default();
            parent = next.as_composite().ok_or_else(|| {
                Error::invalid_path(
                    Path::from_elements(parents[..=i].to_vec()),
                    format!("expected an object or array, found {}", next.kind()),
                )
            })?;
        }
        // Writes may append but never leave holes.
        if let (Composite::Array(items), PathElement::Index(i)) = (&parent, last) {
            if *i > items.len() {
                return Err(Error::invalid_path(
                    path.clone(),
                    format!("index {} is past the end of an array of length {}", i, items.len()),
                ));
            }
        }
        if !parent.write(last, value.clone()) {
            return Err(Error::invalid_path(path.clone(), mismatch(last)));
        }

        if self.plugins.is_value_like(&value) {
            return Ok(());
        }
        if let Some(assigned) = value.as_composite() {
            let replaced = self.retarget(&assigned);
            tracing::debug!(path = %path, replaced, "merged value");
            self.retargeted += replaced;
        }
        Ok(())
    }

    /// Number of references replaced so far.
    pub fn retargeted(&self) -> usize {
        self.retargeted
    }

    fn retarget(&self, assigned: &Composite) -> usize {
        let replacements = self.tokened_nodes(assigned);
        if replacements.is_empty() {
            return 0;
        }

        let mut replaced = 0;
        let mut visited = Visited::new();
        let mut stack = vec![self.host.clone()];
        while let Some(node) = stack.pop() {
            if !visited.insert(&node) {
                continue;
            }
            for (step, child) in node.own_children() {
                if child.is_function() || self.plugins.is_value_like(&child) {
                    continue;
                }
                let Some(mut c) = child.as_composite() else {
                    continue;
                };
                if let Some(replacement) = c.identity().and_then(|id| replacements.get(&id)) {
                    if !replacement.ptr_eq(&c) && node.write(&step, replacement.to_value()) {
                        replaced += 1;
                        c = replacement.clone();
                    }
                }
                if !visited.contains(&c) {
                    stack.push(c);
                }
            }
        }
        replaced
    }

    /// Tokened nodes of a subgraph by identity. The first instance found
    /// for an identity wins.
    fn tokened_nodes(&self, root: &Composite) -> HashMap<Identity, Composite> {
        let mut nodes = HashMap::new();
        let mut visited = Visited::new();
        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            if !visited.insert(&node) {
                continue;
            }
            if let Some(identity) = node.identity() {
                nodes.entry(identity).or_insert_with(|| node.clone());
            }
            for (_, child) in node.children().into_iter().rev() {
                if child.is_function() || self.plugins.is_value_like(&child) {
                    continue;
                }
                if let Some(c) = child.as_composite() {
                    stack.push(c);
                }
            }
        }
        nodes
    }
}

fn mismatch(step: &PathElement) -> &'static str {
    match step {
        PathElement::FieldName(_) => "field names can only be written into objects",
        PathElement::Index(_) => "indices can only be written into arrays",
    }
}
