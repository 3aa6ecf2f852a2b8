//! Per-service log fabrication for the fictional e-commerce backend.

use chrono::{Duration, Utc};
use rand::Rng;

use crate::core::models::LogEntry;

pub(super) const SERVICES: &[&str] = &[
    "api-gateway",
    "auth-service",
    "user-service",
    "product-service",
    "cart-service",
    "order-service",
    "payment-service",
    "inventory-service",
    "notification-service",
    "search-service",
    "recommendation-service",
    "analytics-service",
    "shipping-service",
    "review-service",
];

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 13; SM-G991B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Mobile Safari/537.36",
];

const IP_ADDRESSES: &[&str] = &[
    "89.108.65.23",
    "95.165.133.45",
    "178.176.74.89",
    "46.138.234.56",
    "91.200.12.34",
    "188.162.45.78",
    "37.139.56.89",
    "85.26.234.12",
];

fn pick<'a>(rng: &mut impl Rng, items: &'a [&'a str]) -> &'a str {
    items[rng.gen_range(0..items.len())]
}

/// Weighted level mix: mostly INFO, a sprinkling of WARN/ERROR/DEBUG.
fn roll_level(rng: &mut impl Rng) -> &'static str {
    let r: f64 = rng.gen();
    match r {
        r if r < 0.65 => "INFO",
        r if r < 0.85 => "WARN",
        r if r < 0.95 => "ERROR",
        _ => "DEBUG",
    }
}

/// Fabricates one realistic log entry, shaped by the scenario tag.
pub(super) fn fabricate_log(scenario: &str) -> LogEntry {
    let mut rng = rand::thread_rng();

    let service = pick(&mut rng, SERVICES).to_string();
    let level = roll_level(&mut rng).to_string();

    let mut entry = LogEntry {
        // Spread timestamps across the last hour.
        timestamp: Utc::now() - Duration::seconds(rng.gen_range(0..3600)),
        level,
        service,
        message: String::new(),
        trace_id: format!("{:x}", rng.gen::<u64>()),
        span_id: format!("{:x}", rng.gen::<u32>()),
        user_id: format!("user-{}", rng.gen_range(1..=50000)),
        session_id: format!("session-{:x}", rng.gen::<u64>()),
        ip: pick(&mut rng, IP_ADDRESSES).to_string(),
        user_agent: pick(&mut rng, USER_AGENTS).to_string(),
        method: String::new(),
        path: String::new(),
        status: 0,
        duration_ms: 0,
        error: String::new(),
        stack: String::new(),
    };

    apply_scenario(&mut entry, scenario, &mut rng);

    match entry.service.as_str() {
        "api-gateway" => gateway_log(&mut entry, &mut rng),
        "auth-service" => auth_log(&mut entry, &mut rng),
        "user-service" => user_log(&mut entry, &mut rng),
        "product-service" => product_log(&mut entry, &mut rng),
        "cart-service" => cart_log(&mut entry, &mut rng),
        "order-service" => order_log(&mut entry, &mut rng),
        "payment-service" => payment_log(&mut entry, &mut rng),
        "inventory-service" => inventory_log(&mut entry, &mut rng),
        "search-service" => search_log(&mut entry, &mut rng),
        "recommendation-service" => recommendation_log(&mut entry, &mut rng),
        _ => generic_log(&mut entry, &mut rng),
    }

    entry
}

fn apply_scenario(entry: &mut LogEntry, scenario: &str, rng: &mut impl Rng) {
    match scenario {
        "black_friday" => {
            if rng.gen::<f64>() < 0.3 {
                entry.level = "ERROR".to_string();
                entry.duration_ms = rng.gen_range(1000..6000);
            }
        }
        "high_load" => {
            entry.duration_ms = (entry.duration_ms as f64 * 1.5) as i64;
        }
        "payment_issues" => {
            if entry.service == "payment-service" && rng.gen::<f64>() < 0.4 {
                entry.level = "ERROR".to_string();
                entry.error = "Payment gateway unavailable".to_string();
            }
        }
        // "normal_load" and everything else: leave the baseline mix alone.
        _ => {}
    }
}

fn gateway_log(entry: &mut LogEntry, rng: &mut impl Rng) {
    let paths = [
        "/api/v1/auth/login",
        "/api/v1/products",
        "/api/v1/cart",
        "/api/v1/orders",
        "/api/v1/search",
        "/api/v1/users/profile",
    ];
    entry.method = pick(rng, &["GET", "POST", "PUT", "DELETE"]).to_string();
    entry.path = pick(rng, &paths).to_string();
    entry.duration_ms = rng.gen_range(10..60);

    match entry.level.as_str() {
        "WARN" => {
            entry.message = "Rate limit approaching for user".to_string();
            entry.status = 429;
        }
        "ERROR" => {
            entry.message = "Service unavailable".to_string();
            entry.status = 503;
            entry.error = "Downstream service timeout".to_string();
        }
        _ => {
            entry.message = "Request routed to upstream".to_string();
            entry.status = 200;
        }
    }
}

fn auth_log(entry: &mut LogEntry, rng: &mut impl Rng) {
    let action = pick(
        rng,
        &["login", "register", "logout", "token_refresh", "password_reset"],
    );
    entry.method = "POST".to_string();
    entry.path = format!("/api/v1/auth/{action}");
    entry.duration_ms = rng.gen_range(50..250);

    match entry.level.as_str() {
        "WARN" => {
            entry.message = format!("User {action} attempt with suspicious activity");
            entry.status = 400;
        }
        "ERROR" => {
            entry.message = format!("User {action} failed");
            entry.status = 401;
            entry.error = "Invalid credentials".to_string();
        }
        _ => {
            entry.message = format!("User {action} completed successfully");
            entry.status = 200;
        }
    }
}

fn user_log(entry: &mut LogEntry, rng: &mut impl Rng) {
    let action = pick(
        rng,
        &["get_profile", "update_profile", "get_preferences", "update_preferences"],
    );
    entry.method = if action.starts_with("update") { "PUT" } else { "GET" }.to_string();
    entry.path = format!("/api/v1/users/{action}");
    entry.duration_ms = rng.gen_range(30..180);

    if entry.level == "ERROR" {
        entry.message = format!("User profile operation {action} failed");
        entry.status = 404;
        entry.error = "User not found".to_string();
    } else {
        entry.message = format!("User profile operation {action} completed");
        entry.status = 200;
    }
}

fn product_log(entry: &mut LogEntry, rng: &mut impl Rng) {
    let action = pick(rng, &["list", "get", "search", "create", "update"]);
    entry.method = match action {
        "create" => "POST",
        "update" => "PUT",
        _ => "GET",
    }
    .to_string();
    entry.path = if action == "list" || action == "search" {
        "/api/v1/products".to_string()
    } else {
        format!("/api/v1/products/prod-{}", rng.gen_range(1..=1000))
    };
    entry.duration_ms = rng.gen_range(100..400);

    if entry.level == "ERROR" {
        entry.message = format!("Product {action} operation failed");
        entry.status = 500;
        entry.error = "Database connection failed".to_string();
    } else {
        entry.message = format!("Product {action} operation completed");
        entry.status = 200;
    }
}

fn cart_log(entry: &mut LogEntry, rng: &mut impl Rng) {
    let action = pick(
        rng,
        &["get", "add_item", "remove_item", "update_quantity", "clear"],
    );
    entry.method = if action == "get" { "GET" } else { "POST" }.to_string();
    entry.path = "/api/v1/cart/items".to_string();
    entry.duration_ms = rng.gen_range(50..250);

    if entry.level == "ERROR" {
        entry.message = format!("Cart {action} operation failed");
        entry.status = 400;
        entry.error = "Invalid product ID".to_string();
    } else {
        entry.message = format!("Cart {action} operation completed");
        entry.status = 200;
    }
}

fn order_log(entry: &mut LogEntry, rng: &mut impl Rng) {
    let action = pick(rng, &["create", "get", "list", "cancel", "update_status"]);
    entry.method = if action == "get" || action == "list" { "GET" } else { "POST" }.to_string();
    entry.path = "/api/v1/orders".to_string();
    entry.duration_ms = rng.gen_range(200..700);

    if entry.level == "ERROR" {
        entry.message = format!("Order {action} operation failed");
        entry.status = 500;
        entry.error = "Payment gateway timeout".to_string();
    } else {
        entry.message = format!("Order {action} operation completed");
        entry.status = 200;
    }
}

fn payment_log(entry: &mut LogEntry, rng: &mut impl Rng) {
    let action = pick(rng, &["process", "refund", "get_status", "create_intent"]);
    entry.method = if action == "get_status" { "GET" } else { "POST" }.to_string();
    entry.path = "/api/v1/payments".to_string();
    entry.duration_ms = rng.gen_range(500..1500);

    if entry.level == "ERROR" {
        entry.message = format!("Payment {action} failed");
        entry.status = 402;
        if entry.error.is_empty() {
            entry.error = "Insufficient funds".to_string();
        }
        entry.stack =
            "payment_gateway::process_payment: line 145\npayment_handler::handle: line 89"
                .to_string();
    } else {
        entry.message = format!("Payment {action} completed successfully");
        entry.status = 200;
    }
}

fn inventory_log(entry: &mut LogEntry, rng: &mut impl Rng) {
    let action = pick(
        rng,
        &["check_stock", "reserve_item", "release_reservation", "update_stock"],
    );
    let product_id = format!("prod-{}", rng.gen_range(1..=10000));
    let quantity = rng.gen_range(1..=100);
    entry.method = if action == "check_stock" { "GET" } else { "POST" }.to_string();
    entry.path = format!("/api/v1/inventory/{action}");
    entry.duration_ms = rng.gen_range(50..250);

    match entry.level.as_str() {
        "WARN" => {
            entry.message =
                format!("Low stock warning for product {product_id}, remaining: {quantity}");
            entry.status = 200;
        }
        "ERROR" => {
            entry.message = format!("Inventory operation failed for product {product_id}");
            entry.status = 409;
            entry.error = "Insufficient stock".to_string();
        }
        _ => {
            entry.message =
                format!("Inventory {action} for product {product_id}, quantity: {quantity}");
            entry.status = 200;
        }
    }
}

fn search_log(entry: &mut LogEntry, rng: &mut impl Rng) {
    let queries = [
        "iphone 15",
        "samsung galaxy",
        "nike shoes",
        "winter jacket",
        "laptop gaming",
        "wireless headphones",
        "kitchen appliances",
    ];
    let query = pick(rng, &queries);
    let results = rng.gen_range(1..=1000);
    entry.method = "GET".to_string();
    entry.path = format!("/api/v1/search?q={}", query.replace(' ', "%20"));
    entry.duration_ms = rng.gen_range(100..400);

    match entry.level.as_str() {
        "WARN" => {
            entry.message = format!("Search query '{query}' took longer than expected");
            entry.status = 200;
        }
        "ERROR" => {
            entry.message = format!("Search index unavailable for query '{query}'");
            entry.status = 500;
            entry.error = "Elasticsearch cluster unreachable".to_string();
        }
        _ => {
            entry.message = format!("Search query '{query}' returned {results} results");
            entry.status = 200;
        }
    }
}

fn recommendation_log(entry: &mut LogEntry, rng: &mut impl Rng) {
    let algorithm = pick(
        rng,
        &["collaborative_filtering", "content_based", "hybrid", "trending"],
    );
    let count = rng.gen_range(5..=24);
    entry.method = "GET".to_string();
    entry.path = format!(
        "/api/v1/recommendations?user_id={}&type={algorithm}",
        entry.user_id
    );
    entry.duration_ms = rng.gen_range(200..700);

    match entry.level.as_str() {
        "WARN" => {
            entry.message =
                format!("Recommendation model performance degraded for algorithm {algorithm}");
            entry.status = 200;
        }
        "ERROR" => {
            entry.message = format!("Recommendation service failed for algorithm {algorithm}");
            entry.status = 500;
            entry.error = "ML model unavailable".to_string();
        }
        _ => {
            entry.message =
                format!("Generated {count} recommendations using {algorithm} algorithm");
            entry.status = 200;
        }
    }
}

fn generic_log(entry: &mut LogEntry, rng: &mut impl Rng) {
    let op = pick(rng, &["health_check", "metrics", "config_reload", "cache_clear"]);
    entry.method = "GET".to_string();
    entry.path = format!("/internal/{op}");
    entry.duration_ms = rng.gen_range(10..110);

    if entry.level == "ERROR" {
        entry.message = format!("Internal operation {op} failed");
        entry.status = 500;
        entry.error = "Internal server error".to_string();
    } else {
        entry.message = format!("Internal operation {op} completed");
        entry.status = 200;
    }
}
