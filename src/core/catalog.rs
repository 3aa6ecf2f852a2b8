//! Built-in scenario and chain catalogues. Process-lifetime constants; the
//! engines resolve operator-supplied names against these.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::json;

use super::models::{ChainBlueprint, ScenarioConfig};

pub const LOAD_TEST: &str = "load_test";
pub const ERROR_SPIKE: &str = "error_spike";
pub const SLOW_RESPONSES: &str = "slow_responses";
pub const NORMAL_OPERATION: &str = "normal_operation";
pub const CONTINUOUS_LOAD: &str = "continuous_load";

static SCENARIOS: OnceLock<HashMap<&'static str, ScenarioConfig>> = OnceLock::new();

pub fn predefined_scenarios() -> &'static HashMap<&'static str, ScenarioConfig> {
    SCENARIOS.get_or_init(|| {
        let mut m = HashMap::new();
        m.insert(
            LOAD_TEST,
            ScenarioConfig {
                name: "Load Test".to_string(),
                description: "Sustained high request volume".to_string(),
                log_count: 1000,
                labels: labels(&[("test_type", "load"), ("environment", "testing")]),
                parameters: HashMap::from([("interval_ms".to_string(), json!(10))]),
            },
        );
        m.insert(
            ERROR_SPIKE,
            ScenarioConfig {
                name: "Error Spike".to_string(),
                description: "Sudden burst of failing requests".to_string(),
                log_count: 200,
                labels: labels(&[("test_type", "errors"), ("environment", "testing")]),
                parameters: HashMap::from([("error_rate".to_string(), json!(0.5))]),
            },
        );
        m.insert(
            SLOW_RESPONSES,
            ScenarioConfig {
                name: "Slow Responses".to_string(),
                description: "Degraded latency across services".to_string(),
                log_count: 500,
                labels: labels(&[("test_type", "performance"), ("environment", "testing")]),
                parameters: HashMap::from([("response_delay".to_string(), json!(2000))]),
            },
        );
        m.insert(
            NORMAL_OPERATION,
            ScenarioConfig {
                name: "Normal Operation".to_string(),
                description: "Baseline traffic mix".to_string(),
                log_count: 300,
                labels: labels(&[("environment", "production")]),
                parameters: HashMap::from([("error_rate".to_string(), json!(0.05))]),
            },
        );
        m.insert(
            CONTINUOUS_LOAD,
            ScenarioConfig {
                name: "Continuous Load".to_string(),
                description: "Steady background traffic".to_string(),
                log_count: 100,
                labels: labels(&[("test_type", "continuous"), ("environment", "testing")]),
                parameters: HashMap::from([("interval_seconds".to_string(), json!(5))]),
            },
        );
        m
    })
}

pub const PREDEFINED_CHAINS: &[ChainBlueprint] = &[
    ChainBlueprint {
        name: "black_friday_rush",
        description: "High load combined with an error burst",
        steps: &[LOAD_TEST, ERROR_SPIKE],
    },
    ChainBlueprint {
        name: "slow_and_steady",
        description: "Slow responses under normal traffic",
        steps: &[NORMAL_OPERATION, SLOW_RESPONSES],
    },
];

pub fn find_chain(name: &str) -> Option<&'static ChainBlueprint> {
    PREDEFINED_CHAINS.iter().find(|c| c.name == name)
}

fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_predefined_scenario_has_logs_to_emit() {
        for (kind, config) in predefined_scenarios() {
            assert!(config.log_count > 0, "scenario {kind} has zero log count");
            assert!(!config.name.is_empty());
        }
    }

    #[test]
    fn chain_steps_reference_known_scenarios() {
        for chain in PREDEFINED_CHAINS {
            assert!(!chain.steps.is_empty());
            for step in chain.steps {
                assert!(
                    predefined_scenarios().contains_key(step),
                    "chain {} references unknown scenario {step}",
                    chain.name
                );
            }
        }
    }

    #[test]
    fn find_chain_resolves_by_name() {
        assert!(find_chain("black_friday_rush").is_some());
        assert!(find_chain("slow_and_steady").is_some());
        assert!(find_chain("no_such_chain").is_none());
    }
}
