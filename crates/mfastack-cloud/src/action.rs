//! Change plans between two rendered templates

use crate::template::{Resource, Template};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet};

/// Represents a planned action for a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action
    pub id: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Resource type (e.g., "AWS::Cognito::UserPool")
    pub resource_type: String,

    /// Logical id of the resource
    pub resource_id: String,

    /// Description of the action
    pub description: String,

    /// Changed paths (`Properties.Policies.PasswordPolicy.MinimumLength`), updates only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<String>,

    /// Before/after values keyed by changed path
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, Value>,
}

impl Action {
    fn new(action_type: ActionType, resource_id: &str, resource: &Resource) -> Self {
        Self {
            id: format!("{}-{}", action_type, resource_id),
            action_type,
            resource_type: resource.resource_type.clone(),
            resource_id: resource_id.to_string(),
            description: format!("{} {} ({})", action_type, resource_id, resource.resource_type),
            changes: Vec::new(),
            details: BTreeMap::new(),
        }
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Update an existing resource
    Update,
    /// Delete a resource
    Delete,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Plan containing all actions to be applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// List of actions to perform
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    /// Compare two templates resource by resource
    ///
    /// Actions are ordered by logical id.
    pub fn between(old: &Template, new: &Template) -> Self {
        let ids: BTreeSet<&String> = old.resources.keys().chain(new.resources.keys()).collect();

        let actions = ids
            .into_iter()
            .filter_map(|id| match (old.resources.get(id), new.resources.get(id)) {
                (None, Some(resource)) => Some(Action::new(ActionType::Create, id, resource)),
                (Some(resource), None) => Some(Action::new(ActionType::Delete, id, resource)),
                (Some(before), Some(after)) => {
                    let mut details = BTreeMap::new();
                    diff_resource(before, after, &mut details);
                    if details.is_empty() {
                        return Some(Action::new(ActionType::NoOp, id, after));
                    }
                    let mut action = Action::new(ActionType::Update, id, after);
                    action.changes = details.keys().cloned().collect();
                    action.details = details;
                    Some(action)
                }
                (None, None) => None,
            })
            .collect();

        Self::new(actions)
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// All changed paths as `<logical id>.<path>`
    pub fn changed_paths(&self) -> Vec<String> {
        self.actions
            .iter()
            .flat_map(|action| {
                action
                    .changes
                    .iter()
                    .map(move |path| format!("{}.{}", action.resource_id, path))
            })
            .collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}

fn diff_resource(before: &Resource, after: &Resource, out: &mut BTreeMap<String, Value>) {
    if before.resource_type != after.resource_type {
        record(
            out,
            "Type".into(),
            Some(&json!(before.resource_type)),
            Some(&json!(after.resource_type)),
        );
    }
    if before.depends_on != after.depends_on {
        record(
            out,
            "DependsOn".into(),
            Some(&json!(before.depends_on)),
            Some(&json!(after.depends_on)),
        );
    }
    if before.deletion_policy != after.deletion_policy {
        record(
            out,
            "DeletionPolicy".into(),
            Some(&json!(before.deletion_policy)),
            Some(&json!(after.deletion_policy)),
        );
    }
    if before.update_replace_policy != after.update_replace_policy {
        record(
            out,
            "UpdateReplacePolicy".into(),
            Some(&json!(before.update_replace_policy)),
            Some(&json!(after.update_replace_policy)),
        );
    }

    let keys: BTreeSet<&String> = before
        .properties
        .keys()
        .chain(after.properties.keys())
        .collect();
    for key in keys {
        diff_value(
            format!("Properties.{}", key),
            before.properties.get(key),
            after.properties.get(key),
            out,
        );
    }
}

/// Walk objects key by key and same-length arrays index by index
fn diff_value(
    path: String,
    before: Option<&Value>,
    after: Option<&Value>,
    out: &mut BTreeMap<String, Value>,
) {
    match (before, after) {
        (Some(Value::Object(a)), Some(Value::Object(b))) => {
            let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
            for key in keys {
                diff_value(format!("{}.{}", path, key), a.get(key), b.get(key), out);
            }
        }
        (Some(Value::Array(a)), Some(Value::Array(b))) if a.len() == b.len() => {
            for (i, (x, y)) in a.iter().zip(b).enumerate() {
                diff_value(format!("{}.{}", path, i), Some(x), Some(y), out);
            }
        }
        (a, b) if a != b => record(out, path, a, b),
        _ => {}
    }
}

fn record(
    out: &mut BTreeMap<String, Value>,
    path: String,
    before: Option<&Value>,
    after: Option<&Value>,
) {
    out.insert(path, json!({ "before": before, "after": after }));
}
