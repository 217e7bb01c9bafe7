use crate::domain::services::business_hours::{parse_days, BusinessHours};
use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Longest TTL any cache class may use.
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// TTL per cache class, in seconds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheTtlConfig {
    pub live_data_secs: u64,
    pub knowledge_base_secs: u64,
    pub user_context_secs: u64,
    pub routing_decision_secs: u64,
}

impl CacheTtlConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let classes = [
            ("CACHE_TTL_LIVE_DATA_SECS", self.live_data_secs),
            ("CACHE_TTL_KNOWLEDGE_BASE_SECS", self.knowledge_base_secs),
            ("CACHE_TTL_USER_CONTEXT_SECS", self.user_context_secs),
            ("CACHE_TTL_ROUTING_DECISION_SECS", self.routing_decision_secs),
        ];
        for (name, secs) in classes {
            if secs > MAX_CACHE_TTL_SECS {
                return Err(ConfigError::InvalidValue(name.to_string()));
            }
        }
        Ok(())
    }
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            live_data_secs: 300,
            knowledge_base_secs: 3600,
            user_context_secs: 1800,
            routing_decision_secs: 600,
        }
    }
}

/// Routing engine tuning.
#[derive(Clone, Debug)]
pub struct RoutingConfig {
    pub ai_timeout: Duration,
    pub data_source_timeout: Duration,
    pub auth_timeout: Duration,
    /// Deadline of the single retry after a timeout, as a fraction of the first.
    pub retry_deadline_factor: f64,
    /// Consecutive fallback intents in one conversation before escalating.
    pub fallback_escalation_threshold: usize,
    pub slow_response_alert_ms: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            ai_timeout: Duration::from_millis(8000),
            data_source_timeout: Duration::from_millis(3000),
            auth_timeout: Duration::from_millis(3000),
            retry_deadline_factor: 0.5,
            fallback_escalation_threshold: 3,
            slow_response_alert_ms: 2000,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub otel_exporter_endpoint: Option<String>,
    pub service_name: String,
    pub metrics_port: u16,
    pub cache_ttl: CacheTtlConfig,
    pub routing: RoutingConfig,
    pub business_hours: BusinessHours,
    pub inactivity_escalation_hours: i64,
    pub inactivity_sweep_interval_secs: u64,
    pub ai_responder_url: Option<String>,
    pub data_source_url: Option<String>,
    pub escalation_webhook_url: Option<String>,
    /// department -> agent ids
    pub agent_roster: BTreeMap<String, Vec<String>>,
    /// customer identifier -> verified subject, for the local identity verifier
    pub identity_directory: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://support_router.db?mode=rwc".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            otel_exporter_endpoint: None,
            service_name: "support-router".to_string(),
            metrics_port: 9000,
            cache_ttl: CacheTtlConfig::default(),
            routing: RoutingConfig::default(),
            business_hours: BusinessHours::default(),
            inactivity_escalation_hours: 24,
            inactivity_sweep_interval_secs: 300,
            ai_responder_url: None,
            data_source_url: None,
            escalation_webhook_url: None,
            agent_roster: BTreeMap::new(),
            identity_directory: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://support_router.db?mode=rwc".to_string());

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let otel_exporter_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();

        let service_name =
            env::var("SERVICE_NAME").unwrap_or_else(|_| "support-router".to_string());

        let metrics_port = env::var("METRICS_PORT")
            .unwrap_or_else(|_| "9000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let ttl_defaults = CacheTtlConfig::default();
        let cache_ttl = CacheTtlConfig {
            live_data_secs: parse_var("CACHE_TTL_LIVE_DATA_SECS", ttl_defaults.live_data_secs)?,
            knowledge_base_secs: parse_var(
                "CACHE_TTL_KNOWLEDGE_BASE_SECS",
                ttl_defaults.knowledge_base_secs,
            )?,
            user_context_secs: parse_var(
                "CACHE_TTL_USER_CONTEXT_SECS",
                ttl_defaults.user_context_secs,
            )?,
            routing_decision_secs: parse_var(
                "CACHE_TTL_ROUTING_DECISION_SECS",
                ttl_defaults.routing_decision_secs,
            )?,
        };
        cache_ttl.validate()?;

        let routing_defaults = RoutingConfig::default();
        let routing = RoutingConfig {
            ai_timeout: Duration::from_millis(parse_var(
                "AI_TIMEOUT_MS",
                routing_defaults.ai_timeout.as_millis() as u64,
            )?),
            data_source_timeout: Duration::from_millis(parse_var(
                "DATA_SOURCE_TIMEOUT_MS",
                routing_defaults.data_source_timeout.as_millis() as u64,
            )?),
            auth_timeout: Duration::from_millis(parse_var(
                "AUTH_TIMEOUT_MS",
                routing_defaults.auth_timeout.as_millis() as u64,
            )?),
            retry_deadline_factor: parse_var(
                "RETRY_DEADLINE_FACTOR",
                routing_defaults.retry_deadline_factor,
            )?,
            fallback_escalation_threshold: parse_var(
                "FALLBACK_ESCALATION_THRESHOLD",
                routing_defaults.fallback_escalation_threshold,
            )?,
            slow_response_alert_ms: parse_var(
                "SLOW_RESPONSE_ALERT_MS",
                routing_defaults.slow_response_alert_ms,
            )?,
        };
        if !(0.0..=1.0).contains(&routing.retry_deadline_factor) {
            return Err(ConfigError::InvalidValue("RETRY_DEADLINE_FACTOR".to_string()));
        }

        let hours_defaults = BusinessHours::default();
        let timezone = match env::var("BUSINESS_TIMEZONE") {
            Ok(tz) => chrono_tz::Tz::from_str(&tz)
                .map_err(|_| ConfigError::InvalidValue("BUSINESS_TIMEZONE".to_string()))?,
            Err(_) => hours_defaults.timezone,
        };
        let days = match env::var("BUSINESS_DAYS") {
            Ok(days) => parse_days(&days)
                .map_err(|_| ConfigError::InvalidValue("BUSINESS_DAYS".to_string()))?,
            Err(_) => hours_defaults.days,
        };
        let business_hours = BusinessHours {
            timezone,
            start_hour: parse_var("BUSINESS_HOURS_START", hours_defaults.start_hour)?,
            end_hour: parse_var("BUSINESS_HOURS_END", hours_defaults.end_hour)?,
            days,
        };
        if business_hours.start_hour >= business_hours.end_hour || business_hours.end_hour > 24 {
            return Err(ConfigError::InvalidValue("BUSINESS_HOURS_END".to_string()));
        }

        let agent_roster = match env::var("AGENT_ROSTER") {
            Ok(roster) => parse_roster(&roster)?,
            Err(_) => BTreeMap::new(),
        };

        let identity_directory = match env::var("IDENTITY_DIRECTORY") {
            Ok(directory) => parse_directory(&directory)?,
            Err(_) => BTreeMap::new(),
        };

        Ok(Config {
            database_url,
            server_host,
            server_port,
            otel_exporter_endpoint,
            service_name,
            metrics_port,
            cache_ttl,
            routing,
            business_hours,
            inactivity_escalation_hours: parse_var("INACTIVITY_ESCALATION_HOURS", 24)?,
            inactivity_sweep_interval_secs: parse_var("INACTIVITY_SWEEP_INTERVAL_SECS", 300)?,
            ai_responder_url: env::var("AI_RESPONDER_URL").ok(),
            data_source_url: env::var("DATA_SOURCE_URL").ok(),
            escalation_webhook_url: env::var("ESCALATION_WEBHOOK_URL").ok(),
            agent_roster,
            identity_directory,
        })
    }

    pub fn inactivity_threshold(&self) -> chrono::Duration {
        chrono::Duration::hours(self.inactivity_escalation_hours)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

/// Parse `billing:alice,bob;claims:carol` into department -> agents.
pub fn parse_roster(raw: &str) -> Result<BTreeMap<String, Vec<String>>, ConfigError> {
    let mut roster = BTreeMap::new();
    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let (department, agents) = entry
            .split_once(':')
            .ok_or_else(|| ConfigError::InvalidValue("AGENT_ROSTER".to_string()))?;
        let agents: Vec<String> = agents
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect();
        roster.insert(department.trim().to_string(), agents);
    }
    Ok(roster)
}

/// Parse `AB123456:cust-1;jane@example.com:cust-2` into identifier -> subject.
pub fn parse_directory(raw: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    raw.split(';')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(|entry| {
            entry
                .rsplit_once(':')
                .map(|(identifier, subject)| (identifier.trim().to_string(), subject.trim().to_string()))
                .filter(|(identifier, subject)| !identifier.is_empty() && !subject.is_empty())
                .ok_or_else(|| ConfigError::InvalidValue("IDENTITY_DIRECTORY".to_string()))
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
