//! Node Registry Types
//!
//! Core types shared by the reconciler:
//! - Node records and their capacity
//! - Health conditions and their status
//! - Name canonicalization

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use uuid::Uuid;

/// Resource name to quantity, e.g. `cpu: "4"`, `memory: "16Gi"`.
pub type ResourceList = BTreeMap<String, String>;

/// Condition categories tracked per node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionKind {
    /// Node agent answers its liveness endpoint
    Ready,
}

/// Tri-state outcome of a condition evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    /// Condition fully holds
    True,
    /// Condition does not hold
    False,
    /// Condition could not be evaluated
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionStatus::True => write!(f, "True"),
            ConditionStatus::False => write!(f, "False"),
            ConditionStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Most recent evaluation of one condition kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeCondition {
    pub kind: ConditionKind,
    pub status: ConditionStatus,
    pub reason: String,
    /// Refreshed on every evaluation
    pub last_probe_time: DateTime<Utc>,
    /// Only advanced when `status` changes
    pub last_transition_time: DateTime<Utc>,
}

impl NodeCondition {
    pub fn is_healthy(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// A registered cluster machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub name: String,
    /// Assigned by the store on creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uuid>,
    #[serde(default)]
    pub capacity: ResourceList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub conditions: Vec<NodeCondition>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uid: None,
            capacity: ResourceList::new(),
            host_ip: None,
            instance_id: None,
            conditions: Vec::new(),
        }
    }

    pub fn with_capacity(mut self, capacity: ResourceList) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn condition(&self, kind: ConditionKind) -> Option<&NodeCondition> {
        self.conditions.iter().find(|c| c.kind == kind)
    }

    /// Stores `condition`, replacing any previous entry of the same kind.
    pub fn set_condition(&mut self, condition: NodeCondition) {
        match self.conditions.iter_mut().find(|c| c.kind == condition.kind) {
            Some(existing) => *existing = condition,
            None => self.conditions.push(condition),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.condition(ConditionKind::Ready)
            .map(NodeCondition::is_healthy)
            .unwrap_or(false)
    }
}

/// Lowercases every node name and drops entries whose canonical name was
/// already seen. The first occurrence wins.
pub fn canonicalize_names(nodes: Vec<Node>) -> Vec<Node> {
    let mut seen = HashSet::with_capacity(nodes.len());
    nodes
        .into_iter()
        .filter_map(|mut node| {
            node.name = node.name.to_lowercase();
            seen.insert(node.name.clone()).then_some(node)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(status: ConditionStatus) -> NodeCondition {
        let now = Utc::now();
        NodeCondition {
            kind: ConditionKind::Ready,
            status,
            reason: String::new(),
            last_probe_time: now,
            last_transition_time: now,
        }
    }

    #[test]
    fn test_set_condition_keeps_one_entry_per_kind() {
        let mut node = Node::new("worker-1");
        node.set_condition(condition(ConditionStatus::Unknown));
        node.set_condition(condition(ConditionStatus::True));

        assert_eq!(node.conditions.len(), 1);
        assert!(node.is_ready());
    }

    #[test]
    fn test_node_without_condition_is_not_ready() {
        assert!(!Node::new("worker-1").is_ready());
    }

    #[test]
    fn test_canonicalize_names_dedups() {
        let nodes = vec![Node::new("Node-A"), Node::new("node-a"), Node::new("NODE-B")];
        let names: Vec<_> = canonicalize_names(nodes).into_iter().map(|n| n.name).collect();
        assert_eq!(names, vec!["node-a", "node-b"]);
    }

    #[test]
    fn test_node_serializes_camel_case() {
        let mut node = Node::new("worker-1");
        node.host_ip = Some("10.0.0.1".to_string());
        node.set_condition(condition(ConditionStatus::False));

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["hostIp"], "10.0.0.1");
        assert_eq!(json["conditions"][0]["status"], "False");
        assert!(json["conditions"][0]["lastTransitionTime"].is_string());
        assert!(json.get("instanceId").is_none());
    }
}
