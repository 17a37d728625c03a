use spread_control::{
    dashboard_config_from_env, dashboard_router, demo_session, init_logging, log_app_bind,
    log_app_start, log_session_seeded, logging_config_from_env, Mode, SharedSession,
    DASHBOARD_ROUTES,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = logging_config_from_env();
    init_logging(&logging_cfg)?;
    log_app_start(&logging_cfg);

    let cfg = dashboard_config_from_env()?;

    let mut session = demo_session().with_notice_capacity(cfg.notice_capacity);
    session.select_base_spread(cfg.base_spread)?;
    session.set_theme(cfg.theme);
    session.set_contingency(cfg.start_in_contingency);
    log_session_seeded(
        &cfg,
        session.registry(Mode::Standard).len(),
        session.registry(Mode::Contingency).len(),
    );

    let app = dashboard_router(SharedSession::new(session));
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    let bound_addr = listener.local_addr()?;

    log_app_bind(bound_addr, &DASHBOARD_ROUTES);
    axum::serve(listener, app).await?;

    Ok(())
}
