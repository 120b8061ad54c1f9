use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub coordination: CoordinationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_nats_url")]
    pub nats_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            nats_url: default_nats_url(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CoordinationConfig {
    /// Allowed duration between acceptance and required completion.
    #[serde(default = "default_sla_window_minutes")]
    pub sla_window_minutes: i64,
    #[serde(default = "default_estimated_prep_minutes")]
    pub estimated_prep_minutes: i64,
    /// Breach-detection sweep period, independent of request traffic.
    #[serde(default = "default_sweep_period_ms")]
    pub sweep_period_ms: u64,
    #[serde(default = "default_risk_window_minutes")]
    pub risk_window_minutes: i64,
    /// Rolling window and count for escalating breaches into throttling.
    #[serde(default = "default_breach_window_ms")]
    pub breach_window_ms: i64,
    #[serde(default = "default_breach_threshold")]
    pub breach_threshold: usize,
    #[serde(default = "default_audit_max_entries")]
    pub audit_max_entries_per_entity: usize,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            sla_window_minutes: default_sla_window_minutes(),
            estimated_prep_minutes: default_estimated_prep_minutes(),
            sweep_period_ms: default_sweep_period_ms(),
            risk_window_minutes: default_risk_window_minutes(),
            breach_window_ms: default_breach_window_ms(),
            breach_threshold: default_breach_threshold(),
            audit_max_entries_per_entity: default_audit_max_entries(),
        }
    }
}

fn default_port() -> u16 {
    3005
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_sla_window_minutes() -> i64 {
    25
}

fn default_estimated_prep_minutes() -> i64 {
    25
}

fn default_sweep_period_ms() -> u64 {
    5000
}

fn default_risk_window_minutes() -> i64 {
    5
}

fn default_breach_window_ms() -> i64 {
    60_000
}

fn default_breach_threshold() -> usize {
    3
}

fn default_audit_max_entries() -> usize {
    1024
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let home = env::var("HOME").unwrap_or_else(|_| ".".into());

        let s = Config::builder()
            // 1. Global config from ~/.prepline/config.json
            .add_source(File::with_name(&format!("{}/.prepline/config", home)).required(false))
            // 2. Project config from config/config.json
            .add_source(File::with_name("config/config").required(false))
            // 3. Local overrides from config/local.json (not checked in)
            .add_source(File::with_name("config/local").required(false))
            // 4. Environment overrides, e.g. PREPLINE_SERVER__PORT
            .add_source(Environment::with_prefix("PREPLINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
