//! Process configuration from the environment: `PORT`, `ENVIRONMENT`,
//! `LOG_LEVEL`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub environment: Environment,
    pub log_level: String,
}

impl Settings {
    pub fn from_env() -> Self {
        let port = env_or("PORT", "8080").parse().unwrap_or(8080);
        let environment = match env_or("ENVIRONMENT", "development").as_str() {
            "production" => Environment::Production,
            _ => Environment::Development,
        };
        let log_level = env_or("LOG_LEVEL", "info");

        Self {
            port,
            environment,
            log_level,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}
