use std::time::Duration;

/// Timing and policy knobs for the pipeline coordinator. Defaults match the
/// production worker; `from_env` lets operators override individual values.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Delay before polling the remote export again when it is not ready yet.
    pub re_enqueue_delay: Duration,
    /// Delay applied when the destination schema/table is under load.
    pub defer_on_health_delay: Duration,
    /// How long a tracker may wait on an empty export before it expires.
    pub empty_export_timeout: Duration,
    /// Lifetime of the per-tracker exclusive lease.
    pub lease_timeout: Duration,
    /// Prefix of the lease key; the tracker id is appended.
    pub lease_key_prefix: String,
    /// Runtime retries for unexpected errors before the failure path runs.
    pub max_runtime_retries: u32,
    /// Whether the health deferral gate is consulted at all.
    pub defer_on_health_enabled: bool,
    /// Schema checked when a pipeline's destination cannot be resolved.
    pub default_health_schema: String,
    /// Tables checked when a pipeline's destination cannot be resolved.
    pub default_health_tables: Vec<String>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            re_enqueue_delay: Duration::from_secs(10),
            defer_on_health_delay: Duration::from_secs(5 * 60),
            empty_export_timeout: Duration::from_secs(5 * 60),
            lease_timeout: Duration::from_secs(30),
            lease_key_prefix: "bulk_imports:pipeline_worker".to_string(),
            max_runtime_retries: 3,
            defer_on_health_enabled: true,
            default_health_schema: "main".to_string(),
            default_health_tables: Vec::new(),
        }
    }
}

impl CoordinatorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            re_enqueue_delay: env_secs("BULK_IMPORT_RE_ENQUEUE_DELAY_SECS")
                .unwrap_or(defaults.re_enqueue_delay),
            defer_on_health_delay: env_secs("BULK_IMPORT_DEFER_ON_HEALTH_DELAY_SECS")
                .unwrap_or(defaults.defer_on_health_delay),
            empty_export_timeout: env_secs("BULK_IMPORT_EMPTY_EXPORT_TIMEOUT_SECS")
                .unwrap_or(defaults.empty_export_timeout),
            lease_timeout: env_secs("BULK_IMPORT_LEASE_TIMEOUT_SECS")
                .unwrap_or(defaults.lease_timeout),
            lease_key_prefix: std::env::var("BULK_IMPORT_LEASE_KEY_PREFIX")
                .unwrap_or(defaults.lease_key_prefix),
            max_runtime_retries: std::env::var("BULK_IMPORT_MAX_RUNTIME_RETRIES")
                .ok()
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(defaults.max_runtime_retries),
            defer_on_health_enabled: std::env::var("BULK_IMPORT_DEFER_ON_HEALTH")
                .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
                .unwrap_or(defaults.defer_on_health_enabled),
            default_health_schema: std::env::var("BULK_IMPORT_HEALTH_SCHEMA")
                .unwrap_or(defaults.default_health_schema),
            default_health_tables: std::env::var("BULK_IMPORT_HEALTH_TABLES")
                .map(|value| parse_list(&value))
                .unwrap_or(defaults.default_health_tables),
        }
    }

    pub fn lease_key(&self, tracker_id: i32) -> String {
        format!("{}:{}", self.lease_key_prefix, tracker_id)
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.re_enqueue_delay, Duration::from_secs(10));
        assert_eq!(config.defer_on_health_delay, Duration::from_secs(300));
        assert!(config.lease_timeout > Duration::from_secs(10));
        assert_eq!(config.max_runtime_retries, 3);
    }

    #[test]
    fn test_lease_key_includes_tracker() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.lease_key(17), "bulk_imports:pipeline_worker:17");
    }

    #[test]
    fn test_parse_list_skips_blanks() {
        assert_eq!(
            parse_list("issues, ,merge_requests,"),
            vec!["issues".to_string(), "merge_requests".to_string()]
        );
    }
}
