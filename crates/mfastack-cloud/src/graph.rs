//! Resource dependency graph
//!
//! Edges come from `Ref` / `Fn::GetAtt` inside properties and from
//! `DependsOn`. An edge `a -> b` means `a` needs `b` to exist first.

use crate::error::{CloudError, Result};
use crate::template::Template;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Dependency graph of a rendered template
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    dependencies: BTreeMap<String, BTreeSet<String>>,
}

impl ResourceGraph {
    /// Build the graph, failing on references to unknown resources
    pub fn from_template(template: &Template) -> Result<Self> {
        let mut dependencies = BTreeMap::new();

        for (id, resource) in &template.resources {
            let mut deps = BTreeSet::new();
            for value in resource.properties.values() {
                collect_references(value, &mut deps);
            }
            deps.extend(resource.depends_on.iter().cloned());

            for dep in &deps {
                if !template.resources.contains_key(dep) {
                    return Err(CloudError::DanglingReference {
                        from: id.clone(),
                        to: dep.clone(),
                    });
                }
            }
            dependencies.insert(id.clone(), deps);
        }

        for (name, output) in &template.outputs {
            let mut deps = BTreeSet::new();
            collect_references(&output.value, &mut deps);
            if let Some(dep) = deps.iter().find(|d| !template.resources.contains_key(*d)) {
                return Err(CloudError::DanglingReference {
                    from: format!("Outputs.{}", name),
                    to: dep.clone(),
                });
            }
        }

        Ok(Self { dependencies })
    }

    /// Direct dependencies of a resource
    pub fn dependencies(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.dependencies.get(id)
    }

    /// Resources that directly depend on `id`
    pub fn dependents(&self, id: &str) -> Vec<&str> {
        self.dependencies
            .iter()
            .filter(|(_, deps)| deps.contains(id))
            .map(|(dependent, _)| dependent.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Topological order; ties are broken by logical id
    pub fn creation_order(&self) -> Result<Vec<String>> {
        let mut remaining: BTreeMap<&str, usize> = self
            .dependencies
            .iter()
            .map(|(id, deps)| (id.as_str(), deps.len()))
            .collect();
        let mut ready: BTreeSet<&str> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(self.dependencies.len());

        while let Some(id) = ready.pop_first() {
            remaining.remove(id);
            order.push(id.to_string());
            for dependent in self.dependents(id) {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if !remaining.is_empty() {
            let cycle: Vec<String> = remaining.keys().map(|id| id.to_string()).collect();
            debug!(resources = ?cycle, "Dependency cycle detected");
            return Err(CloudError::CircularDependency(cycle));
        }

        Ok(order)
    }

    /// Reverse of the creation order
    pub fn deletion_order(&self) -> Result<Vec<String>> {
        let mut order = self.creation_order()?;
        order.reverse();
        Ok(order)
    }
}

/// Collect logical ids referenced by `Ref` and `Fn::GetAtt`
///
/// Pseudo parameters (`AWS::Region` etc.) are not resources and are skipped.
pub fn collect_references(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(id)) = map.get("Ref") {
                    if !id.starts_with("AWS::") {
                        out.insert(id.clone());
                    }
                    return;
                }
                if let Some(att) = map.get("Fn::GetAtt") {
                    match att {
                        Value::Array(items) => {
                            if let Some(Value::String(id)) = items.first() {
                                out.insert(id.clone());
                            }
                        }
                        Value::String(dotted) => {
                            if let Some((id, _)) = dotted.split_once('.') {
                                out.insert(id.to_string());
                            }
                        }
                        _ => {}
                    }
                    return;
                }
            }
            for nested in map.values() {
                collect_references(nested, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        _ => {}
    }
}
