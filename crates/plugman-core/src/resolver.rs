//! # Plugman Dependency Resolution
//!
//! Orders plugins so that every plugin loads after the plugins it depends
//! on. [`DependencyResolver`] owns the declared graph and produces load
//! orders, unload orders and dependent lookups; [`DependencyTree`] is a
//! renderable snapshot of the same graph for the CLI.
//!
//! An edge `A -> B` always reads "A depends on B", so B precedes A in any
//! load order. Ties between plugins whose dependencies are all satisfied
//! go to the plugin registered first.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt;

use thiserror::Error;

use crate::manifest::PluginManifest;

/// Errors produced while resolving the dependency graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DependencyError {
    #[error("Required plugin not found: {name} (required by {dependent})")]
    MissingDependency { name: String, dependent: String },

    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),

    #[error("Plugin not registered: {0}")]
    UnknownPlugin(String),
}

/// The declared dependency graph, in registration order.
#[derive(Debug, Clone, Default)]
pub struct DependencyResolver {
    order: Vec<String>,
    dependencies: HashMap<String, Vec<String>>,
}

impl DependencyResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        DependencyResolver::default()
    }

    /// Registers a plugin and the names it depends on. Re-registering a
    /// plugin replaces its dependency list.
    pub fn add_plugin(&mut self, name: impl Into<String>, dependencies: &[&str]) {
        let name = name.into();
        let deps: Vec<String> = dependencies.iter().map(|d| d.to_string()).collect();
        if !self.dependencies.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.dependencies.insert(name, deps);
    }

    /// Registers a plugin from its manifest.
    pub fn add_manifest(&mut self, manifest: &PluginManifest) {
        let deps: Vec<&str> = manifest.dependency_names().collect();
        self.add_plugin(manifest.name.clone(), &deps);
    }

    /// Whether `name` has been registered.
    pub fn contains(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no plugins have been registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Registered plugin names, in registration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Computes a load order in which every plugin follows its
    /// dependencies. Fails on references to unregistered plugins and on
    /// cycles; the cycle error names exactly the plugins on the cycle.
    pub fn resolve(&self) -> Result<Vec<String>, DependencyError> {
        for name in &self.order {
            for dep in self.dependencies.get(name).into_iter().flatten() {
                if !self.dependencies.contains_key(dep) {
                    return Err(DependencyError::MissingDependency {
                        name: dep.clone(),
                        dependent: name.clone(),
                    });
                }
            }
        }

        if let Some(cycle) = self.find_cycle() {
            return Err(DependencyError::CircularDependency(cycle));
        }

        let index: HashMap<&str, usize> = self
            .order
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        for name in &self.order {
            in_degree.entry(name.as_str()).or_insert(0);
            for dep in self.dependencies.get(name.as_str()).into_iter().flatten() {
                dependents.entry(dep.as_str()).or_default().push(name.as_str());
                *in_degree.entry(name.as_str()).or_insert(0) += 1;
            }
        }

        // Min-heap on registration index keeps ties first-registered-first.
        let mut ready: BinaryHeap<Reverse<usize>> = BinaryHeap::new();
        for name in &self.order {
            if in_degree.get(name.as_str()) == Some(&0) {
                if let Some(&idx) = index.get(name.as_str()) {
                    ready.push(Reverse(idx));
                }
            }
        }

        let mut sorted = Vec::with_capacity(self.order.len());
        while let Some(Reverse(idx)) = ready.pop() {
            let name = self.order[idx].as_str();
            sorted.push(name.to_string());
            for dependent in dependents.get(name).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        if let Some(&dep_idx) = index.get(dependent) {
                            ready.push(Reverse(dep_idx));
                        }
                    }
                }
            }
        }

        Ok(sorted)
    }

    /// Plugins that directly depend on `name`, in registration order.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.order
            .iter()
            .filter(|candidate| {
                self.dependencies
                    .get(candidate.as_str())
                    .into_iter()
                    .flatten()
                    .any(|dep| dep == name)
            })
            .cloned()
            .collect()
    }

    /// Whether `name` can be unloaded without breaking another plugin.
    pub fn can_unload(&self, name: &str) -> bool {
        self.dependents_of(name).is_empty()
    }

    /// The order in which `name` and everything depending on it must be
    /// unloaded: transitive dependents first, `name` last.
    pub fn unload_order(&self, name: &str) -> Result<Vec<String>, DependencyError> {
        if !self.dependencies.contains_key(name) {
            return Err(DependencyError::UnknownPlugin(name.to_string()));
        }

        let mut members: HashSet<String> = HashSet::new();
        members.insert(name.to_string());
        let mut stack = vec![name.to_string()];
        while let Some(current) = stack.pop() {
            for dependent in self.dependents_of(&current) {
                if members.insert(dependent.clone()) {
                    stack.push(dependent);
                }
            }
        }

        let mut order: Vec<String> = self
            .resolve()?
            .into_iter()
            .filter(|candidate| members.contains(candidate))
            .collect();
        order.reverse();
        Ok(order)
    }

    /// Snapshots the graph for rendering.
    pub fn tree(&self) -> DependencyTree {
        DependencyTree {
            order: self.order.clone(),
            dependencies: self.dependencies.clone(),
        }
    }

    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut visited: HashSet<&str> = HashSet::new();
        for start in &self.order {
            if visited.contains(start.as_str()) {
                continue;
            }
            let mut path: Vec<&str> = Vec::new();
            let mut on_path: HashSet<&str> = HashSet::new();
            if let Some(cycle) = self.walk(start, &mut path, &mut on_path, &mut visited) {
                return Some(cycle);
            }
        }
        None
    }

    fn walk<'a>(
        &'a self,
        node: &'a str,
        path: &mut Vec<&'a str>,
        on_path: &mut HashSet<&'a str>,
        visited: &mut HashSet<&'a str>,
    ) -> Option<Vec<String>> {
        if on_path.contains(node) {
            // The cycle is the path suffix starting at this node.
            let pos = path.iter().position(|n| *n == node).unwrap_or(0);
            return Some(path[pos..].iter().map(|n| n.to_string()).collect());
        }
        if visited.contains(node) {
            return None;
        }
        visited.insert(node);
        on_path.insert(node);
        path.push(node);
        for dep in self.dependencies.get(node).into_iter().flatten() {
            if let Some(cycle) = self.walk(dep.as_str(), path, on_path, visited) {
                return Some(cycle);
            }
        }
        path.pop();
        on_path.remove(node);
        None
    }
}

/// A renderable snapshot of the dependency graph.
///
/// Rendering tolerates graphs that would not resolve: unregistered
/// dependencies appear as `name (missing)` leaves and a plugin already on
/// the current branch is cut off with a `(cycle)` marker.
#[derive(Debug, Clone)]
pub struct DependencyTree {
    order: Vec<String>,
    dependencies: HashMap<String, Vec<String>>,
}

impl DependencyTree {
    /// Renders the subtree rooted at `name`.
    pub fn render_plugin(&self, name: &str) -> String {
        let mut lines = Vec::new();
        let mut path = Vec::new();
        self.render_node(name, "", true, &mut path, &mut lines);
        lines.join("\n")
    }

    /// Renders every root's subtree, blank-line separated. Roots are the
    /// plugins nothing depends on; if every plugin is depended on, each
    /// plugin is rendered as its own root.
    pub fn render(&self) -> String {
        let mut depended_on: HashSet<&str> = HashSet::new();
        for deps in self.dependencies.values() {
            for dep in deps {
                depended_on.insert(dep.as_str());
            }
        }

        let mut roots: Vec<&str> = self
            .order
            .iter()
            .map(String::as_str)
            .filter(|name| !depended_on.contains(name))
            .collect();
        if roots.is_empty() {
            roots = self.order.iter().map(String::as_str).collect();
        }

        let trees: Vec<String> = roots.iter().map(|root| self.render_plugin(root)).collect();
        trees.join("\n\n")
    }

    fn render_node(
        &self,
        name: &str,
        prefix: &str,
        is_last: bool,
        path: &mut Vec<String>,
        lines: &mut Vec<String>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        if !self.dependencies.contains_key(name) {
            lines.push(format!("{prefix}{connector}{name} (missing)"));
            return;
        }
        if path.iter().any(|seen| seen == name) {
            lines.push(format!("{prefix}{connector}{name} (cycle)"));
            return;
        }
        lines.push(format!("{prefix}{connector}{name}"));

        let extension = if is_last { "    " } else { "│   " };
        let children = self.dependencies.get(name).map(Vec::as_slice).unwrap_or(&[]);
        path.push(name.to_string());
        for (i, child) in children.iter().enumerate() {
            let child_prefix = format!("{prefix}{extension}");
            self.render_node(child, &child_prefix, i == children.len() - 1, path, lines);
        }
        path.pop();
    }
}

impl fmt::Display for DependencyTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}
