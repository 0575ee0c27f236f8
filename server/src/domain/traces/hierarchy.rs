//! Parent/child nesting within a trace

use std::collections::{HashMap, HashSet};

use super::types::{Span, TraceGroup};

/// A span placed in the depth-first order of its trace
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HierarchyNode<'a> {
    pub span: &'a Span,
    /// 0 for the root
    pub level: usize,
    /// The span could not be reached from the root (missing parent or cycle)
    pub detached: bool,
}

/// Flatten a trace into depth-first order starting at its root.
///
/// Children are visited chronologically. Spans unreachable from the root are
/// appended afterwards as depth-1 subtrees, so every span appears exactly once.
pub fn build_hierarchy(group: &TraceGroup) -> Vec<HierarchyNode<'_>> {
    let spans = &group.spans;
    if spans.is_empty() {
        return Vec::new();
    }

    let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, span) in spans.iter().enumerate() {
        if let Some(parent) = span.parent_span_id.as_deref() {
            children.entry(parent).or_default().push(idx);
        }
    }

    let mut visited = vec![false; spans.len()];
    let mut nodes = Vec::with_capacity(spans.len());

    let root = group.root_index.min(spans.len() - 1);
    walk(spans, &children, root, 0, false, &mut visited, &mut nodes);

    let known_ids: HashSet<&str> = spans.iter().map(|s| s.span_id.as_str()).collect();

    // Dangling parents first so their own subtrees nest correctly
    for (idx, span) in spans.iter().enumerate() {
        let parent_missing = span
            .parent_span_id
            .as_deref()
            .is_none_or(|p| !known_ids.contains(p));
        if !visited[idx] && parent_missing {
            walk(spans, &children, idx, 1, true, &mut visited, &mut nodes);
        }
    }

    // Whatever remains sits in a parent cycle
    for idx in 0..spans.len() {
        if !visited[idx] {
            walk(spans, &children, idx, 1, true, &mut visited, &mut nodes);
        }
    }

    nodes
}

fn walk<'a>(
    spans: &'a [Span],
    children: &HashMap<&str, Vec<usize>>,
    start: usize,
    level: usize,
    detached: bool,
    visited: &mut [bool],
    nodes: &mut Vec<HierarchyNode<'a>>,
) {
    let mut stack = vec![(start, level)];
    while let Some((idx, level)) = stack.pop() {
        if visited[idx] {
            continue;
        }
        visited[idx] = true;
        let span = &spans[idx];
        nodes.push(HierarchyNode {
            span,
            level,
            detached,
        });
        if let Some(kids) = children.get(span.span_id.as_str()) {
            for &kid in kids.iter().rev() {
                if !visited[kid] {
                    stack.push((kid, level + 1));
                }
            }
        }
    }
}
