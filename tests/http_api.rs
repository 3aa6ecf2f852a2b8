//! End-to-end tests against a spawned simulator process.

use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

fn parse_ts(value: &Value) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value.as_str().expect("timestamp should be a string"))
        .expect("timestamp should be RFC 3339")
        .with_timezone(&Utc)
}

type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

struct SimulatorHarness {
    child: Child,
    base: String,
    client: reqwest::Client,
}

impl SimulatorHarness {
    async fn spawn() -> TestResult<Self> {
        let port = find_free_port()?;
        let child = Command::new(env!("CARGO_BIN_EXE_loadsim"))
            .env("PORT", port.to_string())
            .env("LOG_LEVEL", "warn")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let harness = Self {
            child,
            base: format!("http://127.0.0.1:{port}"),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?,
        };
        harness.wait_until_ready().await?;
        Ok(harness)
    }

    async fn wait_until_ready(&self) -> TestResult<()> {
        for _ in 0..100 {
            if let Ok(response) = self.client.get(self.url("/health")).send().await {
                if response.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        Err("simulator did not become healthy".into())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn get_json(&self, path: &str) -> TestResult<(u16, Value)> {
        let response = self.client.get(self.url(path)).send().await?;
        let status = response.status().as_u16();
        let body = response.json().await?;
        Ok((status, body))
    }

    async fn post_json(&self, path: &str, body: &Value) -> TestResult<(u16, Value)> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        let status = response.status().as_u16();
        let body = response.json().await?;
        Ok((status, body))
    }
}

impl Drop for SimulatorHarness {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn find_free_port() -> TestResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = std::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if std::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

#[tokio::test]
async fn health_generate_and_observe_logs() -> TestResult<()> {
    let sim = SimulatorHarness::spawn().await?;

    let (status, health) = sim.get_json("/health").await?;
    assert_eq!(status, 200);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["services"]["generator"], true);
    assert_eq!(health["services"]["scenario_manager"], true);

    let (status, body) = sim
        .post_json(
            "/api/v1/generate",
            &json!({"log_count": 5, "scenario": "normal_load"}),
        )
        .await?;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");
    assert_eq!(body["generated"], 5);
    assert!(body["sample_log"].is_object());
    assert!(body["metrics_count"].as_u64().unwrap() > 0);

    let (status, logs) = sim.get_json("/api/v1/logs?limit=3").await?;
    assert_eq!(status, 200);
    assert_eq!(logs["count"], 3);
    let entries = logs["logs"].as_array().unwrap();
    let timestamps: Vec<DateTime<Utc>> =
        entries.iter().map(|e| parse_ts(&e["timestamp"])).collect();
    for pair in timestamps.windows(2) {
        assert!(pair[0] <= pair[1], "log timestamps should be non-decreasing");
    }
    let hour_ago = Utc::now() - chrono::Duration::hours(1) - chrono::Duration::minutes(1);
    assert!(timestamps.iter().all(|ts| *ts >= hour_ago && *ts <= Utc::now()));

    let (status, stats) = sim.get_json("/api/v1/logs/stats").await?;
    assert_eq!(status, 200);
    assert_eq!(stats["stats"]["total_logs"], 5);

    let metrics_text = sim
        .client
        .get(sim.url("/metrics"))
        .send()
        .await?
        .text()
        .await?;
    assert!(metrics_text.contains("# HELP ecommerce_http_requests_total"));
    assert!(metrics_text.contains("# TYPE ecommerce_http_requests_total counter"));
    assert!(metrics_text.contains("app_generated_logs_total"));

    let (status, metrics_json) = sim.get_json("/api/v1/metrics?format=json").await?;
    assert_eq!(status, 200);
    assert!(metrics_json["count"].as_u64().unwrap() > 0);

    Ok(())
}

#[tokio::test]
async fn generate_rejects_out_of_range_counts() -> TestResult<()> {
    let sim = SimulatorHarness::spawn().await?;

    for body in [json!({"log_count": 0}), json!({"log_count": 20000}), json!({})] {
        let (status, response) = sim.post_json("/api/v1/generate", &body).await?;
        assert_eq!(status, 400, "body {body} should be rejected");
        assert!(response["error"].is_string());
    }

    Ok(())
}

#[tokio::test]
async fn scenario_start_stop_cycle() -> TestResult<()> {
    let sim = SimulatorHarness::spawn().await?;

    let (status, body) = sim
        .post_json(
            "/api/v1/scenarios/start",
            &json!({
                "type": "continuous_load",
                "config": {"interval_seconds": 1, "log_count": 1},
            }),
        )
        .await?;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");

    let (status, listing) = sim.get_json("/api/v1/scenarios/list").await?;
    assert_eq!(status, 200);
    assert!(listing["available"]["continuous_load"].is_object());
    let active = listing["active"].as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["type"], "continuous_load");

    let (status, _) = sim
        .post_json("/api/v1/scenarios/stop", &json!({"type": "continuous_load"}))
        .await?;
    assert_eq!(status, 200);

    let (status, body) = sim
        .post_json("/api/v1/scenarios/stop", &json!({"type": "continuous_load"}))
        .await?;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("not active"));

    let drained = eventually(Duration::from_secs(5), || async {
        let (_, listing) = sim.get_json("/api/v1/scenarios/list").await.unwrap();
        listing["active"].as_array().unwrap().is_empty()
    })
    .await;
    assert!(drained, "active list should drain after stop");

    let (status, body) = sim
        .post_json("/api/v1/scenarios/start", &json!({"type": "nope"}))
        .await?;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("unknown scenario"));

    Ok(())
}

#[tokio::test]
async fn schedule_crud_and_toggle() -> TestResult<()> {
    let sim = SimulatorHarness::spawn().await?;

    let (status, body) = sim
        .post_json(
            "/api/v1/schedules",
            &json!({
                "name": "bad",
                "scenario_type": "load_test",
                "cron_expr": "not a cron",
            }),
        )
        .await?;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("invalid cron"));

    let (status, body) = sim
        .post_json(
            "/api/v1/schedules",
            &json!({
                "name": "nightly",
                "scenario_type": "load_test",
                "cron_expr": "0 0 2 * * *",
                "enabled": false,
            }),
        )
        .await?;
    assert_eq!(status, 200);
    let id = body["schedule"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["schedule"]["next_run"], Value::Null);

    let (status, listing) = sim.get_json("/api/v1/schedules").await?;
    assert_eq!(status, 200);
    assert_eq!(listing["schedules"].as_array().unwrap().len(), 1);

    let (status, body) = sim
        .post_json(&format!("/api/v1/schedules/{id}/enable"), &json!({}))
        .await?;
    assert_eq!(status, 200);
    assert!(body["schedule"]["next_run"].is_string());

    let (status, body) = sim
        .post_json(&format!("/api/v1/schedules/{id}/enable"), &json!({}))
        .await?;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("already enabled"));

    let (status, _) = sim
        .post_json(&format!("/api/v1/schedules/{id}/disable"), &json!({}))
        .await?;
    assert_eq!(status, 200);

    let response = sim
        .client
        .put(sim.url(&format!("/api/v1/schedules/{id}")))
        .json(&json!({"name": "renamed"}))
        .send()
        .await?;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["schedule"]["name"], "renamed");

    let response = sim
        .client
        .delete(sim.url(&format!("/api/v1/schedules/{id}")))
        .send()
        .await?;
    assert_eq!(response.status().as_u16(), 200);

    let (status, _) = sim.get_json(&format!("/api/v1/schedules/{id}")).await?;
    assert_eq!(status, 404);

    let (status, examples) = sim.get_json("/api/v1/schedules/cron/examples").await?;
    assert_eq!(status, 200);
    assert_eq!(examples["examples"].as_array().unwrap().len(), 8);

    Ok(())
}

#[tokio::test]
async fn chain_runs_steps_in_order_over_http() -> TestResult<()> {
    let sim = SimulatorHarness::spawn().await?;

    let (status, body) = sim
        .post_json(
            "/api/v1/chains",
            &json!({
                "name": "two-step",
                "steps": [
                    {"scenario_type": "load_test", "config": {"log_count": 1}},
                    {"scenario_type": "error_spike", "config": {"log_count": 1}, "delay_before": 1},
                ],
            }),
        )
        .await?;
    assert_eq!(status, 200);
    let chain_id = body["chain_id"].as_str().unwrap().to_string();

    let (status, body) = sim
        .post_json(&format!("/api/v1/chains/{chain_id}/start"), &json!({}))
        .await?;
    assert_eq!(status, 200);
    let execution_id = body["execution_id"].as_str().unwrap().to_string();

    let completed = eventually(Duration::from_secs(15), || async {
        let (_, body) = sim
            .get_json(&format!("/api/v1/chains/{chain_id}/executions"))
            .await
            .unwrap();
        body["executions"]
            .as_array()
            .unwrap()
            .iter()
            .any(|e| e["id"] == execution_id.as_str() && e["status"] == "completed")
    })
    .await;
    assert!(completed, "chain execution should complete");

    let (_, body) = sim
        .get_json(&format!("/api/v1/chains/{chain_id}/executions"))
        .await?;
    let execution = body["executions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["id"] == execution_id.as_str())
        .unwrap()
        .clone();
    let steps = execution["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 2);
    assert!(steps.iter().all(|s| s["status"] == "completed"));
    assert!(parse_ts(&steps[0]["completed_at"]) <= parse_ts(&steps[1]["started_at"]));

    let (status, active) = sim.get_json("/api/v1/chains/executions/active").await?;
    assert_eq!(status, 200);
    assert_eq!(active["count"], 0);

    let response = sim
        .client
        .delete(sim.url(&format!("/api/v1/chains/{chain_id}")))
        .send()
        .await?;
    assert_eq!(response.status().as_u16(), 200);

    Ok(())
}

#[tokio::test]
async fn chain_schedule_crud() -> TestResult<()> {
    let sim = SimulatorHarness::spawn().await?;

    let (status, body) = sim
        .post_json(
            "/api/v1/chains/schedules",
            &json!({
                "name": "mystery",
                "chain_name": "not_a_chain",
                "cron_expr": "* * * * *",
            }),
        )
        .await?;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("unknown chain"));

    let (status, body) = sim
        .post_json(
            "/api/v1/chains/schedules",
            &json!({
                "name": "friday",
                "chain_name": "black_friday_rush",
                "cron_expr": "0 0 3 * * *",
                "enabled": false,
            }),
        )
        .await?;
    assert_eq!(status, 200);
    let id = body["schedule"]["id"].as_str().unwrap().to_string();

    let (status, listing) = sim.get_json("/api/v1/chains/schedules").await?;
    assert_eq!(status, 200);
    assert_eq!(listing["schedules"].as_array().unwrap().len(), 1);

    let (status, _) = sim
        .post_json(&format!("/api/v1/chains/schedules/{id}/enable"), &json!({}))
        .await?;
    assert_eq!(status, 200);

    let (status, body) = sim
        .get_json(&format!("/api/v1/chains/schedules/{id}"))
        .await?;
    assert_eq!(status, 200);
    assert_eq!(body["schedule"]["enabled"], true);
    assert!(body["schedule"]["next_run"].is_string());

    let (status, _) = sim
        .post_json(&format!("/api/v1/chains/schedules/{id}/disable"), &json!({}))
        .await?;
    assert_eq!(status, 200);

    let response = sim
        .client
        .delete(sim.url(&format!("/api/v1/chains/schedules/{id}")))
        .send()
        .await?;
    assert_eq!(response.status().as_u16(), 200);

    let (status, _) = sim
        .get_json(&format!("/api/v1/chains/schedules/{id}"))
        .await?;
    assert_eq!(status, 404);

    Ok(())
}
