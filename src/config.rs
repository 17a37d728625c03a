//! Dashboard server configuration read from `SPREAD_*` environment variables.

use std::env;
use std::net::SocketAddr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::locale::parse_locale_decimal;
use crate::session::{Theme, DEFAULT_NOTICE_CAPACITY, SPREAD_OPTIONS};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub bind_addr: SocketAddr,
    pub base_spread: Decimal,
    pub theme: Theme,
    pub notice_capacity: usize,
    pub start_in_contingency: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            base_spread: SPREAD_OPTIONS[6],
            theme: Theme::Light,
            notice_capacity: DEFAULT_NOTICE_CAPACITY,
            start_in_contingency: false,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid SPREAD_DASHBOARD_ADDR: {0}")]
    InvalidBindAddr(String),
    #[error("SPREAD_BASE_PCT {0} is not one of the selectable spreads")]
    UnsupportedBaseSpread(Decimal),
}

pub fn dashboard_config_from_env() -> Result<DashboardConfig, ConfigError> {
    let mut config = DashboardConfig::default();

    if let Ok(addr) = env::var("SPREAD_DASHBOARD_ADDR") {
        let trimmed = addr.trim();
        if !trimmed.is_empty() {
            config.bind_addr = trimmed
                .parse()
                .map_err(|_| ConfigError::InvalidBindAddr(trimmed.to_string()))?;
        }
    }

    if let Ok(raw) = env::var("SPREAD_BASE_PCT") {
        if !raw.trim().is_empty() {
            let spread = parse_locale_decimal(&raw);
            if !SPREAD_OPTIONS.contains(&spread) {
                return Err(ConfigError::UnsupportedBaseSpread(spread));
            }
            config.base_spread = spread;
        }
    }

    if let Ok(theme) = env::var("SPREAD_THEME") {
        if let Some(parsed) = parse_theme(&theme) {
            config.theme = parsed;
        }
    }

    if let Ok(capacity) = env::var("SPREAD_NOTICE_CAPACITY") {
        if let Ok(parsed) = capacity.trim().parse::<usize>() {
            if parsed > 0 {
                config.notice_capacity = parsed;
            }
        }
    }

    if let Ok(contingency) = env::var("SPREAD_START_CONTINGENCY") {
        if let Some(parsed) = parse_bool(&contingency) {
            config.start_in_contingency = parsed;
        }
    }

    Ok(config)
}

fn parse_theme(raw: &str) -> Option<Theme> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "light" => Some(Theme::Light),
        "dark" => Some(Theme::Dark),
        _ => None,
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::with_env_vars;
    use rust_decimal_macros::dec;

    const ALL_VARS: [&str; 5] = [
        "SPREAD_DASHBOARD_ADDR",
        "SPREAD_BASE_PCT",
        "SPREAD_THEME",
        "SPREAD_NOTICE_CAPACITY",
        "SPREAD_START_CONTINGENCY",
    ];

    fn cleared() -> Vec<(&'static str, Option<&'static str>)> {
        ALL_VARS.iter().map(|key| (*key, None)).collect()
    }

    #[test]
    fn defaults_when_env_missing() {
        let cfg = with_env_vars(&cleared(), dashboard_config_from_env).unwrap();
        assert_eq!(cfg, DashboardConfig::default());
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
    }

    #[test]
    fn reads_every_setting() {
        let cfg = with_env_vars(
            &[
                ("SPREAD_DASHBOARD_ADDR", Some("0.0.0.0:9090")),
                ("SPREAD_BASE_PCT", Some("1,2")),
                ("SPREAD_THEME", Some("DARK")),
                ("SPREAD_NOTICE_CAPACITY", Some("5")),
                ("SPREAD_START_CONTINGENCY", Some("yes")),
            ],
            dashboard_config_from_env,
        )
        .unwrap();

        assert_eq!(cfg.bind_addr.port(), 9090);
        assert_eq!(cfg.base_spread, dec!(1.2));
        assert_eq!(cfg.theme, Theme::Dark);
        assert_eq!(cfg.notice_capacity, 5);
        assert!(cfg.start_in_contingency);
    }

    #[test]
    fn soft_settings_fall_back_to_defaults() {
        let cfg = with_env_vars(
            &[
                ("SPREAD_DASHBOARD_ADDR", None),
                ("SPREAD_BASE_PCT", None),
                ("SPREAD_THEME", Some("sepia")),
                ("SPREAD_NOTICE_CAPACITY", Some("0")),
                ("SPREAD_START_CONTINGENCY", Some("maybe")),
            ],
            dashboard_config_from_env,
        )
        .unwrap();

        assert_eq!(cfg, DashboardConfig::default());
    }

    #[test]
    fn invalid_addr_and_spread_are_errors() {
        let mut vars = cleared();
        vars[0] = ("SPREAD_DASHBOARD_ADDR", Some("not-an-addr"));
        assert_eq!(
            with_env_vars(&vars, dashboard_config_from_env),
            Err(ConfigError::InvalidBindAddr("not-an-addr".to_string()))
        );

        let mut vars = cleared();
        vars[1] = ("SPREAD_BASE_PCT", Some("0,75"));
        assert_eq!(
            with_env_vars(&vars, dashboard_config_from_env),
            Err(ConfigError::UnsupportedBaseSpread(dec!(0.75)))
        );
    }
}
