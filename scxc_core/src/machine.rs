//! The nested machine configuration handed to an execution runtime.
//!
//! Field names follow the configuration format of common hierarchical state machine runtimes
//! (`type`, `states`, `initial`, `on`, `always`, `entry`, `exit`, `target`, `guard`, `actions`),
//! so that the serialized JSON can be fed to them as is.

use crate::model::{Action, HistoryKind};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Either a single value or a list of values,
/// serialized as the bare value in the first case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Wraps a list, unwrapping it if it has exactly one element.
    ///
    /// Returns `None` on an empty list.
    pub fn from_vec(mut values: Vec<T>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => values.pop().map(OneOrMany::One),
            _ => Some(OneOrMany::Many(values)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value).iter(),
            OneOrMany::Many(values) => values.iter(),
        }
    }
}

/// Node type in the runtime's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Atomic,
    Compound,
    Parallel,
    Final,
    History,
}

/// An executable action, as a typed object with its attributes inlined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub params: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "actions", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ActionConfig>,
}

impl From<&Action> for ActionConfig {
    fn from(action: &Action) -> Self {
        ActionConfig {
            kind: action.kind.clone(),
            params: action.attributes.clone(),
            text: action.text.clone(),
            children: action.children.iter().map(ActionConfig::from).collect(),
        }
    }
}

/// A lowered transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionConfig {
    /// Lowered targets: plain ids for siblings, `#id` otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<OneOrMany<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionConfig>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub internal: bool,
}

/// A lowered state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateConfig {
    /// Explicit id, set on nodes targeted as `#id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NodeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub states: IndexMap<String, StateConfig>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub on: IndexMap<String, OneOrMany<TransitionConfig>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub always: Vec<TransitionConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<ActionConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exit: Vec<ActionConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryKind>,
    /// Default target of a history node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<OneOrMany<String>>,
}

impl StateConfig {
    /// A node of the given type without content.
    pub fn new(kind: NodeType) -> Self {
        StateConfig {
            id: None,
            kind,
            initial: None,
            states: IndexMap::new(),
            on: IndexMap::new(),
            always: Vec::new(),
            entry: Vec::new(),
            exit: Vec::new(),
            history: None,
            target: None,
        }
    }
}

/// The synthesized machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineConfig {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,
    pub states: IndexMap<String, StateConfig>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub context: IndexMap<String, Value>,
}

impl MachineConfig {
    /// Looks up a node by its path of ids from the top level.
    pub fn state<'a, I>(&self, path: I) -> Option<&StateConfig>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut path = path.into_iter();
        let mut node = self.states.get(path.next()?)?;
        for id in path {
            node = node.states.get(id)?;
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn one_or_many() {
        assert_eq!(OneOrMany::<u8>::from_vec(vec![]), None);
        assert_eq!(OneOrMany::from_vec(vec![1]), Some(OneOrMany::One(1)));
        assert_eq!(
            OneOrMany::from_vec(vec![1, 2]).map(|m| m.iter().copied().collect::<Vec<_>>()),
            Some(vec![1, 2])
        );
    }

    #[test]
    fn serialize_machine() {
        let mut idle = StateConfig::new(NodeType::Atomic);
        idle.on.insert(
            "start".to_string(),
            OneOrMany::One(TransitionConfig {
                target: Some(OneOrMany::One("active".to_string())),
                guard: None,
                actions: Vec::new(),
                internal: false,
            }),
        );
        let mut active = StateConfig::new(NodeType::Atomic);
        active.entry.push(ActionConfig {
            kind: "log".to_string(),
            params: IndexMap::from([("expr".to_string(), "'on'".to_string())]),
            text: None,
            children: Vec::new(),
        });
        let machine = MachineConfig {
            id: "machine".to_string(),
            initial: Some("idle".to_string()),
            states: IndexMap::from([("idle".to_string(), idle), ("active".to_string(), active)]),
            context: IndexMap::from([("count".to_string(), json!(0))]),
        };
        let value = serde_json::to_value(&machine).expect("serializable");
        assert_eq!(
            value,
            json!({
                "id": "machine",
                "initial": "idle",
                "states": {
                    "idle": { "type": "atomic", "on": { "start": { "target": "active" } } },
                    "active": { "type": "atomic", "entry": [{ "type": "log", "expr": "'on'" }] }
                },
                "context": { "count": 0 }
            })
        );
        assert!(machine.state(["active"]).is_some());
        assert!(machine.state(["active", "nested"]).is_none());
    }

    #[test]
    fn serialize_history() {
        let mut history = StateConfig::new(NodeType::History);
        history.history = Some(HistoryKind::Deep);
        history.target = Some(OneOrMany::One("a".to_string()));
        let value = serde_json::to_value(&history).expect("serializable");
        assert_eq!(
            value,
            json!({ "type": "history", "history": "deep", "target": "a" })
        );
    }
}
