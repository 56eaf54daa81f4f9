// Client-side defaults and configuration helpers.
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

pub(crate) const DEFAULT_CACHE_TTL_MS: u64 = 30_000;
pub(crate) const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 3_000;
pub(crate) const DEFAULT_SWEEP_INTERVAL_MS: u64 = 60_000;

/// Configuration for a snapshot client embedded in a data-plane service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the control plane, e.g. `https://warden.internal:7443`.
    pub control_plane_url: String,
    /// How long a fetched snapshot is trusted without refetching.
    pub cache_ttl: Duration,
    /// Wall-clock bound on a single snapshot fetch.
    pub request_timeout: Duration,
    /// Interval of the background sweep of expired cache entries.
    pub sweep_interval: Duration,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
struct ClientConfigOverride {
    control_plane_url: Option<String>,
    cache_ttl_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    sweep_interval_ms: Option<u64>,
}

impl ClientConfig {
    pub fn new(control_plane_url: impl Into<String>) -> Self {
        Self {
            control_plane_url: control_plane_url.into(),
            cache_ttl: Duration::from_millis(DEFAULT_CACHE_TTL_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            sweep_interval: Duration::from_millis(DEFAULT_SWEEP_INTERVAL_MS),
        }
    }

    pub fn from_env() -> Result<Self> {
        let config = Self::env_overlay();
        config.validate()?;
        Ok(config)
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::env_overlay();
        if let Ok(path) = std::env::var("WARDEN_CLIENT_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read WARDEN_CLIENT_CONFIG: {path}"))?;
            let override_cfg: ClientConfigOverride =
                serde_yaml::from_str(&contents).context("parse client config yaml")?;
            override_cfg.apply(&mut config);
        }
        config.validate()?;
        Ok(config)
    }

    fn env_overlay() -> Self {
        let mut config = Self::new(std::env::var("WARDEN_CONTROL_PLANE_URL").unwrap_or_default());
        if let Some(value) = read_u64_env("WARDEN_CACHE_TTL_MS") {
            config.cache_ttl = Duration::from_millis(value);
        }
        if let Some(value) = read_u64_env("WARDEN_REQUEST_TIMEOUT_MS") {
            config.request_timeout = Duration::from_millis(value);
        }
        if let Some(value) = read_u64_env("WARDEN_SWEEP_INTERVAL_MS") {
            config.sweep_interval = Duration::from_millis(value);
        }
        config
    }

    // Misconfiguration is the only error a client constructor may surface.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.control_plane_url.trim().is_empty() {
            anyhow::bail!("control plane url must be set (WARDEN_CONTROL_PLANE_URL)");
        }
        Ok(())
    }
}

impl ClientConfigOverride {
    fn apply(&self, config: &mut ClientConfig) {
        if let Some(value) = &self.control_plane_url
            && !value.trim().is_empty()
        {
            config.control_plane_url = value.clone();
        }
        if let Some(value) = self.cache_ttl_ms
            && value > 0
        {
            config.cache_ttl = Duration::from_millis(value);
        }
        if let Some(value) = self.request_timeout_ms
            && value > 0
        {
            config.request_timeout = Duration::from_millis(value);
        }
        if let Some(value) = self.sweep_interval_ms
            && value > 0
        {
            config.sweep_interval = Duration::from_millis(value);
        }
    }
}

fn read_u64_env(key: &str) -> Option<u64> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnvGuard(&'static [&'static str]);

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for key in self.0 {
                unsafe {
                    std::env::remove_var(key);
                }
            }
        }
    }

    #[test]
    fn defaults_fill_unset_fields() {
        let config = ClientConfig::new("http://127.0.0.1:7443");
        assert_eq!(config.cache_ttl, Duration::from_millis(DEFAULT_CACHE_TTL_MS));
        assert_eq!(
            config.request_timeout,
            Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS)
        );
        assert_eq!(
            config.sweep_interval,
            Duration::from_millis(DEFAULT_SWEEP_INTERVAL_MS)
        );
    }

    #[test]
    #[serial_test::serial]
    fn env_overrides_apply() {
        let _guard = EnvGuard(&[
            "WARDEN_CONTROL_PLANE_URL",
            "WARDEN_CACHE_TTL_MS",
            "WARDEN_REQUEST_TIMEOUT_MS",
        ]);
        unsafe {
            std::env::set_var("WARDEN_CONTROL_PLANE_URL", "http://cp.internal:7443");
            std::env::set_var("WARDEN_CACHE_TTL_MS", "5000");
            std::env::set_var("WARDEN_REQUEST_TIMEOUT_MS", "750");
        }
        let config = ClientConfig::from_env().expect("config");
        assert_eq!(config.control_plane_url, "http://cp.internal:7443");
        assert_eq!(config.cache_ttl, Duration::from_millis(5000));
        assert_eq!(config.request_timeout, Duration::from_millis(750));
        assert_eq!(
            config.sweep_interval,
            Duration::from_millis(DEFAULT_SWEEP_INTERVAL_MS)
        );
    }

    #[test]
    #[serial_test::serial]
    fn missing_control_plane_url_is_rejected() {
        let _guard = EnvGuard(&["WARDEN_CONTROL_PLANE_URL"]);
        unsafe {
            std::env::remove_var("WARDEN_CONTROL_PLANE_URL");
        }
        let err = match ClientConfig::from_env() {
            Ok(_) => panic!("expected error"),
            Err(err) => err,
        };
        assert!(err.to_string().contains("WARDEN_CONTROL_PLANE_URL"));
    }

    #[test]
    #[serial_test::serial]
    fn yaml_override_wins_over_env() {
        let _guard = EnvGuard(&[
            "WARDEN_CONTROL_PLANE_URL",
            "WARDEN_CACHE_TTL_MS",
            "WARDEN_CLIENT_CONFIG",
        ]);
        let path = std::env::temp_dir().join("warden-client-config-test.yaml");
        fs::write(
            &path,
            "control_plane_url: http://override.internal:7443\ncache_ttl_ms: 1234\n",
        )
        .expect("write yaml");
        unsafe {
            std::env::set_var("WARDEN_CONTROL_PLANE_URL", "http://env.internal:7443");
            std::env::set_var("WARDEN_CACHE_TTL_MS", "5000");
            std::env::set_var("WARDEN_CLIENT_CONFIG", &path);
        }
        let config = ClientConfig::from_env_or_yaml().expect("config");
        assert_eq!(config.control_plane_url, "http://override.internal:7443");
        assert_eq!(config.cache_ttl, Duration::from_millis(1234));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn zero_valued_override_is_ignored() {
        let mut config = ClientConfig::new("http://127.0.0.1:7443");
        let override_cfg = ClientConfigOverride {
            control_plane_url: Some("   ".to_string()),
            cache_ttl_ms: Some(0),
            request_timeout_ms: None,
            sweep_interval_ms: None,
        };
        override_cfg.apply(&mut config);
        assert_eq!(config.control_plane_url, "http://127.0.0.1:7443");
        assert_eq!(config.cache_ttl, Duration::from_millis(DEFAULT_CACHE_TTL_MS));
    }
}
