//! Identity-correlated diffs between a snapshot and a live model.
//!
//! A diff is built in two passes. The lookup pass walks both graphs and joins
//! nodes carrying the same identity into one record. The bind pass turns
//! each record into an object or array diff node. Everything else (dirty
//! checks, reconstruction, summaries) is computed lazily from the bound
//! nodes.

mod bind;
mod lookup;
mod node;
mod query;


pub use node::*;

use crate::error::{Error, Result};
use crate::plugin::Registry;
use crate::value::Value;
use lookup::LookupTree;

/// Correlates `former` with `present` and binds the result.
///
/// Both roots must carry the same identity, which holds whenever `former`
/// is a snapshot of `present`.
pub(crate) fn create_diff(former: &Value, present: &Value, plugins: &Registry) -> Result<Diff> {
    let former_root = former.as_composite().ok_or(Error::NotComposite {
        kind: former.kind(),
    })?;
    let present_root = present.as_composite().ok_or(Error::NotComposite {
        kind: present.kind(),
    })?;

    let former_identity = former_root
        .identity()
        .ok_or(Error::MissingIdentity { era: Era::Former })?;
    let present_identity = present_root
        .identity()
        .ok_or(Error::MissingIdentity { era: Era::Present })?;
    if former_identity != present_identity {
        return Err(Error::RootMismatch {
            former: former_identity,
            present: present_identity,
        });
    }

    let tree = LookupTree::build(&former_root, &present_root, plugins)?;
    let root = tree
        .lookup(&present_root)
        .ok_or(Error::MissingIdentity { era: Era::Present })?;
    let nodes = bind::bind(&tree, plugins);
    tracing::debug!(nodes = nodes.len(), root = %present_identity, "diff created");

    Ok(Diff::new(nodes, root, plugins.clone()))
}
