//! Locating a node inside a graph.

use super::path::Path;
use crate::value::{Composite, Visited};
use std::collections::VecDeque;

/// Finds the shortest path from `root` to the exact instance `target`.
///
/// Breadth-first, visiting children in property order, so the result is
/// deterministic. Returns `None` if `target` is not reachable.
pub fn find_path(root: &Composite, target: &Composite) -> Option<Path> {
    let mut visited = Visited::new();
    let mut queue = VecDeque::new();
    visited.insert(root);
    queue.push_back((root.clone(), Path::new()));

    while let Some((node, path)) = queue.pop_front() {
        if node.ptr_eq(target) {
            return Some(path);
        }
        for (step, child) in node.children() {
            if let Some(c) = child.as_composite() {
                if visited.insert(&c) {
                    queue.push_back((c, path.with(step)));
                }
            }
        }
    }
    None
}
