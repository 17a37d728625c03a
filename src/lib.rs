//! Spread control core crate.
//!
//! Current implemented scope:
//! - exposure-tier registry with save-time range and overlap validation
//! - locale decimal parsing/formatting (`.` thousands, `,` decimals)
//! - dashboard session view model (contingency mode, theme, base spread, notices)
//! - HTTP dashboard page, JSON view and mutation routes

mod config;
mod dashboard;
mod locale;
mod observability;
mod registry;
mod session;
#[cfg(test)]
mod test_support;

pub use config::{dashboard_config_from_env, ConfigError, DashboardConfig, DEFAULT_BIND_ADDR};
pub use dashboard::{
    dashboard_router, render_dashboard_html, ApiError, ErrorBody, FieldUpdate, ResolveQuery,
    ResolveResponse, SharedSession, SpreadSelection, DASHBOARD_ROUTES, TABLE_HEADERS,
};
pub use locale::{
    format_currency, format_exposure, format_locale_decimal, format_percent, parse_locale_decimal,
};
pub use observability::{
    init_logging, log_app_bind, log_app_start, log_session_seeded, logging_config_from_env,
    LogFormat, LoggingConfig, LoggingInitError,
};
pub use registry::{EditTransition, ExposureTier, TierError, TierField, TierId, TierRegistry};
pub use session::{
    demo_session, DashboardSession, DashboardView, MarketStats, Mode, Notice, NoticeLevel,
    SessionError, Theme, TierChangeSink, TierRowView, DEFAULT_NOTICE_CAPACITY, NO_MATCH_LABEL,
    SPREAD_OPTIONS,
};
