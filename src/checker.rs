//! Checker is the entry point: snapshots, diffs and merges.

use crate::diff::{self, Diff};
use crate::error::{Error, Result};
use crate::identity::{assign_identities, GlobalCounter, IdentitySource};
use crate::merge::Merger;
use crate::plugin::{Plugin, Registry};
use crate::snapshot::clone_graph;
use crate::value::{Composite, Value};
use std::fmt;
use std::rc::Rc;

/// CheckerBuilder is a builder for creating a Checker.
#[derive(Default)]
pub struct CheckerBuilder {
    identities: Option<Rc<dyn IdentitySource>>,
    plugins: Vec<Plugin>,
}

impl CheckerBuilder {
    /// Creates a new CheckerBuilder.
    pub fn new() -> Self {
        CheckerBuilder::default()
    }

    /// Sets the identity source. Defaults to the process-wide counter.
    pub fn identity_source(mut self, source: Rc<dyn IdentitySource>) -> Self {
        self.identities = Some(source);
        self
    }

    /// Registers a plugin when the checker is built.
    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Builds the Checker. Fails if two plugins share a name.
    pub fn build(self) -> Result<Checker> {
        let mut plugins = Registry::new();
        for plugin in self.plugins {
            plugins.add(plugin)?;
        }
        Ok(Checker {
            identities: self.identities.unwrap_or_else(|| Rc::new(GlobalCounter)),
            plugins,
        })
    }
}

/// Checker takes snapshots of models, diffs them against the live model and
/// merges values back.
///
/// A checker is not meant to be shared across threads.
pub struct Checker {
    identities: Rc<dyn IdentitySource>,
    plugins: Registry,
}

impl Default for Checker {
    fn default() -> Self {
        Checker::new()
    }
}

impl fmt::Debug for Checker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checker")
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}

impl Checker {
    /// Creates a checker using the process-wide counter and no plugins.
    pub fn new() -> Self {
        Checker {
            identities: Rc::new(GlobalCounter),
            plugins: Registry::new(),
        }
    }

    /// Creates a new CheckerBuilder.
    pub fn builder() -> CheckerBuilder {
        CheckerBuilder::new()
    }

    pub fn add_plugin(&mut self, plugin: Plugin) -> Result<()> {
        let name = plugin.name().to_string();
        self.plugins.add(plugin)?;
        tracing::debug!(plugin = %name, "plugin registered");
        Ok(())
    }

    pub fn remove_plugin(&mut self, name: &str) -> Result<Plugin> {
        let plugin = self.plugins.remove(name)?;
        tracing::debug!(plugin = %name, "plugin removed");
        Ok(plugin)
    }

    pub fn plugins(&self) -> &Registry {
        &self.plugins
    }

    /// Stamps `model` with identities in place and returns a detached,
    /// identity-preserving copy of it.
    pub fn take_snapshot(&self, model: &Value) -> Result<Value> {
        let root = composite(model)?;
        let stamped = assign_identities(&root, &*self.identities, &self.plugins);
        let snapshot = clone_graph(&root.to_value(), &self.plugins).ok_or(Error::NotComposite {
            kind: model.kind(),
        })?;
        tracing::debug!(stamped, identity = ?root.identity(), "snapshot taken");
        Ok(snapshot)
    }

    /// Diffs a snapshot against the model it was taken from.
    pub fn create_diff(&self, former: &Value, present: &Value) -> Result<Diff> {
        diff::create_diff(former, present, &self.plugins)
    }

    /// Runs `apply` with a merger targeting the root of `model`.
    pub fn merge_snapshot_into<F>(&self, model: &Value, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Merger<'_>) -> Result<()>,
    {
        self.merge_snapshot_into_part(model, model, apply)
    }

    /// Runs `apply` with a merger targeting `part`, a node inside `model`.
    /// Aliases are retargeted across all of `model`.
    pub fn merge_snapshot_into_part<F>(&self, model: &Value, part: &Value, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Merger<'_>) -> Result<()>,
    {
        let host = composite(model)?;
        let target = composite(part)?;
        let mut merger = Merger::new(host, target, &self.plugins);
        apply(&mut merger)?;
        tracing::debug!(retargeted = merger.retargeted(), "merge applied");
        Ok(())
    }
}

fn composite(value: &Value) -> Result<Composite> {
    value.as_composite().ok_or(Error::NotComposite { kind: value.kind() })
}
