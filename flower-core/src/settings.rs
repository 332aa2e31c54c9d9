use std::time::Duration;

use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::error::{Error, Result};

/// Process-wide settings projected from a [`ResolvedConfig`].
///
/// Nothing here is configured independently; every field is a pure
/// derivation of one or more resolved options.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppSettings {
    pub debug: bool,
    pub cookie_secret: Option<String>,
    pub url_prefix: Option<String>,
    pub static_url_prefix: String,
    pub login_url: String,
    pub inspect_timeout: Duration,
    pub auto_refresh: bool,
}

impl AppSettings {
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        let url_prefix = config
            .url_prefix
            .as_deref()
            .map(normalize_prefix)
            .filter(|prefix| !prefix.is_empty());

        let (static_url_prefix, login_url) = match &url_prefix {
            Some(prefix) => (static_url_prefix(prefix), login_url(prefix)),
            None => ("/static/".to_string(), "/login".to_string()),
        };

        let inspect_timeout = Duration::try_from_secs_f64(config.inspect_timeout / 1000.0)
            .map_err(|e| Error::invalid_option("inspect_timeout", e.to_string()))?;

        Ok(Self {
            debug: config.debug,
            cookie_secret: config
                .cookie_secret
                .clone()
                .filter(|secret| !secret.is_empty()),
            url_prefix,
            static_url_prefix,
            login_url,
            inspect_timeout,
            auto_refresh: config.auto_refresh,
        })
    }

    /// Mount point for routes, e.g. `/flower`, or empty without a prefix.
    pub fn mount_path(&self) -> String {
        self.url_prefix
            .as_deref()
            .map(|prefix| format!("/{}", prefix))
            .unwrap_or_default()
    }
}

pub fn normalize_prefix(prefix: &str) -> String {
    prefix.trim_matches('/').to_string()
}

pub fn static_url_prefix(prefix: &str) -> String {
    format!("/{}/static/", normalize_prefix(prefix))
}

pub fn login_url(prefix: &str) -> String {
    format!("/{}/login", normalize_prefix(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PartialConfig, merge, parse_args};
    use crate::registry::OptionRegistry;

    fn resolved(args: &[&str]) -> ResolvedConfig {
        let registry = OptionRegistry::flower().unwrap();
        let args = parse_args(&registry, args).unwrap();
        merge(&registry, PartialConfig::default(), args).unwrap()
    }

    #[test]
    fn url_prefix_derives_paths() {
        let settings = AppSettings::from_config(&resolved(&["--url_prefix=flower/"])).unwrap();
        assert_eq!(settings.url_prefix.as_deref(), Some("flower"));
        assert_eq!(settings.static_url_prefix, "/flower/static/");
        assert_eq!(settings.login_url, "/flower/login");
        assert_eq!(settings.mount_path(), "/flower");
    }

    #[test]
    fn prefix_derivation_is_idempotent() {
        for prefix in ["flower", "/flower", "flower/", "//flower//", "a/b/"] {
            let once = normalize_prefix(prefix);
            assert_eq!(normalize_prefix(&once), once);
            assert_eq!(static_url_prefix(prefix), static_url_prefix(&once));
            assert_eq!(login_url(prefix), login_url(&once));
        }
        assert_eq!(static_url_prefix("/a/b/"), "/a/b/static/");
    }

    #[test]
    fn no_prefix_keeps_root_paths() {
        let settings = AppSettings::from_config(&resolved(&[])).unwrap();
        assert_eq!(settings.url_prefix, None);
        assert_eq!(settings.static_url_prefix, "/static/");
        assert_eq!(settings.login_url, "/login");
        assert_eq!(settings.mount_path(), "");

        let settings = AppSettings::from_config(&resolved(&["--url_prefix=/"])).unwrap();
        assert_eq!(settings.url_prefix, None);
    }

    #[test]
    fn projects_flags_and_timeout() {
        let settings = AppSettings::from_config(&resolved(&[
            "--debug",
            "--auto_refresh=false",
            "--inspect_timeout=2500",
            "--cookie_secret=s3cret",
        ]))
        .unwrap();
        assert!(settings.debug);
        assert!(!settings.auto_refresh);
        assert_eq!(settings.inspect_timeout, Duration::from_millis(2500));
        assert_eq!(settings.cookie_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn empty_cookie_secret_is_not_projected() {
        let settings = AppSettings::from_config(&resolved(&["--cookie_secret="])).unwrap();
        assert_eq!(settings.cookie_secret, None);
    }

    #[test]
    fn negative_timeout_is_rejected() {
        let err = AppSettings::from_config(&resolved(&["--inspect_timeout=-5"])).unwrap_err();
        assert!(matches!(err, Error::InvalidOption { .. }));
    }
}
