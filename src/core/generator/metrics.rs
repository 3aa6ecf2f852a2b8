//! Derived metric snapshot: recomputed from the most recent batch, plus the
//! process-wide cumulative counters.

use std::collections::HashMap;

use chrono::Utc;
use rand::Rng;

use crate::core::models::{LogEntry, Metric, MetricKind};

fn app_labels() -> HashMap<String, String> {
    HashMap::from([("app".to_string(), "ecommerce".to_string())])
}

fn counter(name: &str, value: f64, labels: HashMap<String, String>) -> Metric {
    Metric {
        name: name.to_string(),
        value,
        kind: MetricKind::Counter,
        labels,
        timestamp: Utc::now(),
    }
}

fn gauge(name: &str, value: f64, labels: HashMap<String, String>) -> Metric {
    Metric {
        name: name.to_string(),
        value,
        kind: MetricKind::Gauge,
        labels,
        timestamp: Utc::now(),
    }
}

/// Rebuilds the snapshot from one generated batch. `logs_total` and
/// `metrics_total` are the cumulative process counters.
pub(super) fn snapshot_from_batch(
    batch: &[LogEntry],
    logs_total: u64,
    metrics_total: u64,
) -> Vec<Metric> {
    let mut rng = rand::thread_rng();
    let mut out = Vec::new();

    let total_requests = batch.len();
    let mut status_count: HashMap<u16, usize> = HashMap::new();
    let mut service_count: HashMap<String, usize> = HashMap::new();
    let mut total_duration: i64 = 0;
    let mut error_count = 0usize;

    let mut order_count = 0usize;
    let mut payment_count = 0usize;
    let mut search_count = 0usize;
    let mut cart_actions = 0usize;
    let mut auth_actions = 0usize;
    let mut total_revenue = 0.0f64;

    for entry in batch {
        *status_count.entry(entry.status).or_default() += 1;
        *service_count.entry(entry.service.clone()).or_default() += 1;
        total_duration += entry.duration_ms;
        if entry.level == "ERROR" {
            error_count += 1;
        }

        match entry.service.as_str() {
            "order-service" => {
                order_count += 1;
                if entry.status == 200 && entry.message.contains("create") {
                    total_revenue += rng.gen_range(100..5100) as f64;
                }
            }
            "payment-service" => payment_count += 1,
            "search-service" => search_count += 1,
            "cart-service" => cart_actions += 1,
            "auth-service" => auth_actions += 1,
            _ => {}
        }
    }

    out.push(counter(
        "ecommerce_http_requests_total",
        total_requests as f64,
        app_labels(),
    ));

    for (status, count) in &status_count {
        let mut labels = app_labels();
        labels.insert("status".to_string(), status.to_string());
        out.push(counter(
            "ecommerce_http_responses_total",
            *count as f64,
            labels,
        ));
    }

    for (service, count) in &service_count {
        let mut labels = app_labels();
        labels.insert("service".to_string(), service.clone());
        out.push(counter(
            "ecommerce_service_requests_total",
            *count as f64,
            labels,
        ));
    }

    if total_requests > 0 {
        out.push(gauge(
            "ecommerce_http_request_duration_ms",
            total_duration as f64 / total_requests as f64,
            app_labels(),
        ));
        out.push(gauge(
            "ecommerce_error_rate",
            error_count as f64 / total_requests as f64,
            app_labels(),
        ));
    }

    out.push(counter("ecommerce_orders_total", order_count as f64, app_labels()));
    let mut revenue_labels = app_labels();
    revenue_labels.insert("currency".to_string(), "USD".to_string());
    out.push(counter("ecommerce_revenue_total", total_revenue, revenue_labels));
    out.push(counter(
        "ecommerce_payments_processed",
        payment_count as f64,
        app_labels(),
    ));
    out.push(counter(
        "ecommerce_search_queries",
        search_count as f64,
        app_labels(),
    ));
    out.push(counter("ecommerce_cart_actions", cart_actions as f64, app_labels()));
    out.push(counter("ecommerce_auth_actions", auth_actions as f64, app_labels()));
    out.push(gauge(
        "ecommerce_active_users",
        rng.gen_range(100..1100) as f64,
        app_labels(),
    ));
    out.push(gauge(
        "ecommerce_inventory_items_low_stock",
        rng.gen_range(5..55) as f64,
        app_labels(),
    ));

    let simulator_labels = HashMap::from([("app".to_string(), "simulator".to_string())]);
    out.push(counter(
        "app_generated_logs_total",
        logs_total as f64,
        simulator_labels.clone(),
    ));
    out.push(counter(
        "app_generated_metrics_total",
        metrics_total as f64,
        simulator_labels,
    ));

    out
}

fn help_text(name: &str) -> &'static str {
    match name {
        "ecommerce_http_requests_total" => "Total number of HTTP requests",
        "ecommerce_http_responses_total" => "Total number of HTTP responses by status code",
        "ecommerce_service_requests_total" => "Total number of requests by service",
        "ecommerce_http_request_duration_ms" => "Average HTTP request duration in milliseconds",
        "ecommerce_orders_total" => "Total number of orders processed",
        "ecommerce_revenue_total" => "Total revenue generated",
        "ecommerce_payments_processed" => "Total number of payments processed",
        "ecommerce_search_queries" => "Total number of search queries",
        "ecommerce_cart_actions" => "Total number of cart actions",
        "ecommerce_auth_actions" => "Total number of authentication actions",
        "ecommerce_error_rate" => "Error rate as a percentage",
        "ecommerce_active_users" => "Current number of active users",
        "ecommerce_inventory_items_low_stock" => "Number of items with low stock",
        "app_generated_logs_total" => "Cumulative logs generated by the simulator",
        "app_generated_metrics_total" => "Cumulative metrics generated by the simulator",
        _ => "Application metric",
    }
}

/// Encodes the snapshot as Prometheus text exposition format 0.0.4: one
/// `# HELP` / `# TYPE` pair per family followed by its samples.
pub(super) fn encode_prometheus(metrics: &[Metric]) -> String {
    let mut families: Vec<&str> = Vec::new();
    for metric in metrics {
        if !families.contains(&metric.name.as_str()) {
            families.push(&metric.name);
        }
    }

    let mut out = String::new();
    for family in families {
        let kind = metrics
            .iter()
            .find(|m| m.name == family)
            .map(|m| m.kind.as_str())
            .unwrap_or("untyped");
        out.push_str(&format!("# HELP {family} {}\n", help_text(family)));
        out.push_str(&format!("# TYPE {family} {kind}\n"));

        for metric in metrics.iter().filter(|m| m.name == family) {
            if metric.labels.is_empty() {
                out.push_str(&format!("{family} {:.2}\n", metric.value));
            } else {
                let labels = metric
                    .labels
                    .iter()
                    .map(|(k, v)| format!("{k}=\"{v}\""))
                    .collect::<Vec<_>>()
                    .join(",");
                out.push_str(&format!("{family}{{{labels}}} {:.2}\n", metric.value));
            }
        }
        out.push('\n');
    }

    out
}
