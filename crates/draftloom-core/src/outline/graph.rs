//! Dependency graph over the fields of an outline.
//!
//! Edges point from a field to the fields it `depends_on`. Traversals that
//! answer "who is affected when X changes" walk the reverse edges.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::models::FieldId;

/// Snapshot of the dependency edges of an outline, in document order.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    order: Vec<FieldId>,
    position: HashMap<FieldId, usize>,
    depends_on: HashMap<FieldId, Vec<FieldId>>,
    dependents: HashMap<FieldId, Vec<FieldId>>,
}

impl DependencyGraph {
    /// Builds a graph from `(field, depends_on)` pairs given in document order.
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (FieldId, Vec<FieldId>)>,
    {
        let mut graph = DependencyGraph::default();
        for (field, deps) in edges {
            graph.position.insert(field.clone(), graph.order.len());
            graph.order.push(field.clone());
            graph.depends_on.insert(field, deps);
        }
        graph.rebuild_dependents();
        graph
    }

    fn rebuild_dependents(&mut self) {
        self.dependents.clear();
        for field in &self.order {
            for dep in &self.depends_on[field] {
                self.dependents
                    .entry(dep.clone())
                    .or_default()
                    .push(field.clone());
            }
        }
    }

    /// Whether the graph knows the field.
    pub fn contains(&self, id: &FieldId) -> bool {
        self.position.contains_key(id)
    }

    /// Document position of a field.
    pub fn position(&self, id: &FieldId) -> Option<usize> {
        self.position.get(id).copied()
    }

    /// Replaces the dependency list of one field.
    pub fn set_dependencies(&mut self, field: &FieldId, deps: Vec<FieldId>) {
        if let Some(entry) = self.depends_on.get_mut(field) {
            *entry = deps;
            self.rebuild_dependents();
        }
    }

    /// Direct dependencies of a field.
    pub fn dependencies(&self, id: &FieldId) -> &[FieldId] {
        self.depends_on.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Fields that list `id` directly in their `depends_on`.
    pub fn direct_dependents(&self, id: &FieldId) -> &[FieldId] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every field reachable from `start` over reverse edges, excluding
    /// `start` itself, sorted by document position.
    pub fn transitive_dependents(&self, start: &FieldId) -> Vec<FieldId> {
        let mut visited: HashSet<&FieldId> = HashSet::new();
        let mut queue: VecDeque<&FieldId> = VecDeque::from([start]);
        visited.insert(start);

        while let Some(current) = queue.pop_front() {
            for dependent in self.direct_dependents(current) {
                if visited.insert(dependent) {
                    queue.push_back(dependent);
                }
            }
        }

        let mut result: Vec<FieldId> = visited
            .into_iter()
            .filter(|id| *id != start)
            .cloned()
            .collect();
        result.sort_by_key(|id| self.position(id).unwrap_or(usize::MAX));
        result
    }

    /// Returns the direct dependency of `field` through which a path leads
    /// back to `field`, if any.
    pub fn cycle_through(&self, field: &FieldId) -> Option<FieldId> {
        for dep in self.dependencies(field) {
            if dep == field {
                return Some(dep.clone());
            }
            let mut seen: HashSet<&FieldId> = HashSet::new();
            let mut stack: Vec<&FieldId> = vec![dep];
            while let Some(current) = stack.pop() {
                if current == field {
                    return Some(dep.clone());
                }
                if seen.insert(current) {
                    stack.extend(self.dependencies(current));
                }
            }
        }
        None
    }

    /// Finds any edge `(from, to)` that closes a cycle.
    pub fn find_cycle(&self) -> Option<(FieldId, FieldId)> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let mut marks: HashMap<&FieldId, Mark> =
            self.order.iter().map(|id| (id, Mark::Unvisited)).collect();

        for root in &self.order {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            let mut stack: Vec<(&FieldId, usize)> = vec![(root, 0)];
            marks.insert(root, Mark::InProgress);

            while let Some((node, next)) = stack.pop() {
                let deps = self.dependencies(node);
                if next < deps.len() {
                    stack.push((node, next + 1));
                    let dep = &deps[next];
                    match marks.get(dep).copied() {
                        Some(Mark::InProgress) => return Some((node.clone(), dep.clone())),
                        Some(Mark::Unvisited) => {
                            marks.insert(dep, Mark::InProgress);
                            stack.push((dep, 0));
                        }
                        // Done, or an edge to an unknown id: nothing to walk
                        _ => {}
                    }
                } else {
                    marks.insert(node, Mark::Done);
                }
            }
        }
        None
    }
}
