// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::types::{Task, TaskId};

/// Dependency graph over the tasks of one workflow.
///
/// Edge direction: dependency -> dependent. For a task `B` with
/// `depends_on = ["A"]` we add edge `A -> B`.
///
/// Node indices are assigned in insertion order, so sorting neighbours by
/// index gives the workflow's own ordering for tie-breaking. References to
/// unknown ids do not become edges; they are kept in `missing` so the
/// resolver can report them.
#[derive(Debug, Clone)]
pub struct DagGraph {
    graph: DiGraph<TaskId, ()>,
    index: HashMap<TaskId, NodeIndex>,
    missing: Vec<(TaskId, TaskId)>,
}

impl DagGraph {
    /// Build the graph from an ordered task list.
    ///
    /// If the same id appears twice the first occurrence wins; `Workflow::new`
    /// rejects that case before a graph is ever built from a workflow.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut graph = DiGraph::with_capacity(tasks.len(), tasks.len());
        let mut index = HashMap::with_capacity(tasks.len());

        // First pass: one node per task.
        for task in tasks {
            if !index.contains_key(task.id()) {
                let node = graph.add_node(task.id().to_string());
                index.insert(task.id().to_string(), node);
            }
        }

        // Second pass: dependency edges, remembering dangling references.
        let mut missing = Vec::new();
        for task in tasks {
            let node = index[task.id()];
            for dep in task.depends_on() {
                match index.get(dep.as_str()) {
                    Some(&dep_node) => {
                        graph.update_edge(dep_node, node, ());
                    }
                    None => missing.push((task.id().to_string(), dep.clone())),
                }
            }
        }

        Self {
            graph,
            index,
            missing,
        }
    }

    /// `(task_id, missing_id)` pairs for every dangling `depends_on` entry.
    pub fn missing_dependencies(&self) -> &[(TaskId, TaskId)] {
        &self.missing
    }

    /// Immediate (known) dependencies of a task, in insertion order.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.neighbours(id, Direction::Incoming)
    }

    /// Immediate dependents of a task, in insertion order.
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        self.neighbours(id, Direction::Outgoing)
    }

    /// Every task that (transitively) depends on `id`, in insertion order.
    pub fn descendants_of(&self, id: &str) -> Vec<&str> {
        let Some(&start) = self.index.get(id) else {
            return Vec::new();
        };

        let mut seen: HashSet<NodeIndex> = HashSet::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                if seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        seen.remove(&start);

        let mut out: Vec<NodeIndex> = seen.into_iter().collect();
        out.sort();
        out.into_iter().map(|n| self.graph[n].as_str()).collect()
    }

    /// Find one dependency cycle, if any, as a closed path `[a, b, .., a]`
    /// where each element depends on the next.
    ///
    /// Depth-first over the dependency edges, starting from tasks in insertion
    /// order. A node is "visiting" while it is on the current path; reaching a
    /// visiting node again closes a cycle.
    pub fn find_cycle(&self) -> Option<Vec<TaskId>> {
        let mut done: HashSet<NodeIndex> = HashSet::new();
        let mut visiting: HashSet<NodeIndex> = HashSet::new();
        let mut path: Vec<NodeIndex> = Vec::new();

        for node in self.graph.node_indices() {
            if done.contains(&node) {
                continue;
            }
            if let Some(cycle) = self.visit(node, &mut visiting, &mut path, &mut done) {
                return Some(cycle);
            }
        }

        None
    }

    fn visit(
        &self,
        node: NodeIndex,
        visiting: &mut HashSet<NodeIndex>,
        path: &mut Vec<NodeIndex>,
        done: &mut HashSet<NodeIndex>,
    ) -> Option<Vec<TaskId>> {
        visiting.insert(node);
        path.push(node);

        for dep in self.sorted_neighbours(node, Direction::Incoming) {
            if visiting.contains(&dep) {
                let start = path.iter().position(|n| *n == dep).unwrap_or(0);
                let mut cycle: Vec<TaskId> =
                    path[start..].iter().map(|n| self.graph[*n].clone()).collect();
                cycle.push(self.graph[dep].clone());
                return Some(cycle);
            }
            if !done.contains(&dep) {
                if let Some(cycle) = self.visit(dep, visiting, path, done) {
                    return Some(cycle);
                }
            }
        }

        path.pop();
        visiting.remove(&node);
        done.insert(node);
        None
    }

    fn neighbours(&self, id: &str, dir: Direction) -> Vec<&str> {
        match self.index.get(id) {
            Some(&node) => self
                .sorted_neighbours(node, dir)
                .into_iter()
                .map(|n| self.graph[n].as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    fn sorted_neighbours(&self, node: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self.graph.neighbors_directed(node, dir).collect();
        out.sort();
        out
    }
}
