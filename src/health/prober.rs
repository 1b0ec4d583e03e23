use super::{HealthChecker, ProbeResult};
use crate::error::ProbeError;
use crate::types::{ConditionKind, ConditionStatus, Node, NodeCondition};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing::debug;

/// Fans one probe out per node and folds the outcomes into readiness
/// conditions.
#[derive(Clone)]
pub struct HealthProber {
    checker: Arc<dyn HealthChecker>,
}

impl HealthProber {
    pub fn new(checker: Arc<dyn HealthChecker>) -> Self {
        Self { checker }
    }

    /// Probes every node concurrently and returns them, in the same order,
    /// with a fresh `Ready` condition. Returns only after every probe has
    /// finished.
    pub async fn evaluate(&self, nodes: Vec<Node>) -> Vec<Node> {
        join_all(nodes.into_iter().map(|node| self.check_node(node))).await
    }

    async fn check_node(&self, mut node: Node) -> Node {
        let outcome = self.checker.health_check(&node.name).await;
        if let Err(e) = &outcome {
            debug!("node {} health check error: {}", node.name, e);
        }
        let condition = ready_condition(node.condition(ConditionKind::Ready), outcome, Utc::now());
        node.set_condition(condition);
        node
    }
}

/// Reduces one probe outcome to a `Ready` condition observed at `now`.
///
/// The transition time is carried over from `previous` when the status did
/// not change, and set to `now` otherwise (including when there is no
/// previous condition).
pub fn ready_condition(
    previous: Option<&NodeCondition>,
    outcome: Result<ProbeResult, ProbeError>,
    now: DateTime<Utc>,
) -> NodeCondition {
    let (status, reason) = match outcome {
        Err(e) => (
            ConditionStatus::Unknown,
            format!("Node health check error: {}", e),
        ),
        Ok(ProbeResult::Failure) => (
            ConditionStatus::False,
            "Node health check failed: node agent /healthz endpoint returns not ok".to_string(),
        ),
        Ok(ProbeResult::Success) => (
            ConditionStatus::True,
            "Node health check succeeded: node agent /healthz endpoint returns ok".to_string(),
        ),
    };

    let last_transition_time = match previous {
        Some(prev) if prev.status == status => prev.last_transition_time.min(now),
        _ => now,
    };

    NodeCondition {
        kind: ConditionKind::Ready,
        status,
        reason,
        last_probe_time: now,
        last_transition_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::time::Duration;

    struct ScriptedChecker {
        outcomes: HashMap<String, Result<ProbeResult, ProbeError>>,
        delay: Duration,
    }

    #[async_trait]
    impl HealthChecker for ScriptedChecker {
        async fn health_check(&self, node_name: &str) -> Result<ProbeResult, ProbeError> {
            tokio::time::sleep(self.delay).await;
            self.outcomes
                .get(node_name)
                .cloned()
                .unwrap_or_else(|| Err(ProbeError("no route to host".to_string())))
        }
    }

    fn prober(outcomes: Vec<(&str, Result<ProbeResult, ProbeError>)>, delay: Duration) -> HealthProber {
        let outcomes = outcomes
            .into_iter()
            .map(|(name, outcome)| (name.to_string(), outcome))
            .collect();
        HealthProber::new(Arc::new(ScriptedChecker { outcomes, delay }))
    }

    #[tokio::test]
    async fn test_outcomes_map_to_statuses() {
        let prober = prober(
            vec![
                ("up", Ok(ProbeResult::Success)),
                ("down", Ok(ProbeResult::Failure)),
            ],
            Duration::ZERO,
        );
        let nodes = vec![Node::new("up"), Node::new("down"), Node::new("gone")];

        let checked = prober.evaluate(nodes).await;
        let status: Vec<_> = checked
            .iter()
            .map(|n| n.condition(ConditionKind::Ready).unwrap().status)
            .collect();
        assert_eq!(
            status,
            vec![ConditionStatus::True, ConditionStatus::False, ConditionStatus::Unknown]
        );

        let unknown = checked[2].condition(ConditionKind::Ready).unwrap();
        assert!(unknown.reason.contains("no route to host"));
        assert_ne!(checked[1].condition(ConditionKind::Ready).unwrap().reason, unknown.reason);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probes_run_concurrently() {
        let names: Vec<String> = (0..50).map(|i| format!("node-{}", i)).collect();
        let prober = prober(
            names.iter().map(|n| (n.as_str(), Ok(ProbeResult::Success))).collect(),
            Duration::from_secs(1),
        );

        let start = tokio::time::Instant::now();
        let checked = prober.evaluate(names.iter().map(Node::new).collect()).await;

        assert_eq!(checked.len(), 50);
        assert!(checked.iter().all(Node::is_ready));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_first_evaluation_is_a_transition() {
        let prober = prober(vec![("n", Ok(ProbeResult::Failure))], Duration::ZERO);
        let checked = prober.evaluate(vec![Node::new("n")]).await;
        let cond = checked[0].condition(ConditionKind::Ready).unwrap();
        assert_eq!(cond.last_transition_time, cond.last_probe_time);
    }

    #[test]
    fn test_unchanged_status_carries_transition_time() {
        let t0 = Utc::now();
        let first = ready_condition(None, Ok(ProbeResult::Failure), t0);
        let t1 = t0 + ChronoDuration::seconds(10);
        let second = ready_condition(Some(&first), Ok(ProbeResult::Failure), t1);

        assert_eq!(second.last_transition_time, t0);
        assert_eq!(second.last_probe_time, t1);

        let t2 = t1 + ChronoDuration::seconds(10);
        let third = ready_condition(Some(&second), Err(ProbeError("timeout".into())), t2);
        assert_eq!(third.status, ConditionStatus::Unknown);
        assert_eq!(third.last_transition_time, t2);
    }

    fn outcome_strategy() -> impl Strategy<Value = Result<ProbeResult, ProbeError>> {
        prop_oneof![
            Just(Ok(ProbeResult::Success)),
            Just(Ok(ProbeResult::Failure)),
            Just(Err(ProbeError("refused".to_string()))),
        ]
    }

    proptest! {
        #[test]
        fn prop_transition_time_follows_status_changes(
            outcomes in proptest::collection::vec(outcome_strategy(), 1..40)
        ) {
            let start = Utc::now();
            let mut previous: Option<NodeCondition> = None;
            for (i, outcome) in outcomes.into_iter().enumerate() {
                let now = start + ChronoDuration::seconds(i as i64 * 5);
                let next = ready_condition(previous.as_ref(), outcome, now);

                prop_assert!(next.last_transition_time <= next.last_probe_time);
                prop_assert_eq!(next.last_probe_time, now);
                match &previous {
                    Some(prev) if prev.status == next.status => {
                        prop_assert_eq!(next.last_transition_time, prev.last_transition_time);
                    }
                    _ => prop_assert_eq!(next.last_transition_time, now),
                }
                previous = Some(next);
            }
        }
    }
}
