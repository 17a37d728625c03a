//! Spread dashboard HTML page, JSON view and mutation routes.

use std::sync::{Arc, RwLock};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::locale::{format_currency, format_percent, parse_locale_decimal};
use crate::registry::{EditTransition, TierError, TierField, TierId};
use crate::session::{
    DashboardSession, DashboardView, Mode, NoticeLevel, SessionError, Theme, TierRowView,
    NO_MATCH_LABEL,
};

pub const TABLE_HEADERS: [&str; 5] = [
    "Exposição Mínima",
    "Exposição Máxima",
    "Spread Increase",
    "Total Spread",
    "Ações",
];

/// Every path served by [`dashboard_router`], in registration order.
pub const DASHBOARD_ROUTES: [&str; 9] = [
    "/dashboard",
    "/dashboard/snapshot",
    "/dashboard/resolve",
    "/dashboard/tiers",
    "/dashboard/tiers/{id}/field",
    "/dashboard/tiers/{id}/toggle",
    "/dashboard/contingency",
    "/dashboard/theme",
    "/dashboard/spread",
];

/// Session shared between request handlers; every operation runs under one lock.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<RwLock<DashboardSession>>,
}

impl SharedSession {
    pub fn new(session: DashboardSession) -> Self {
        Self {
            inner: Arc::new(RwLock::new(session)),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&DashboardSession) -> R) -> R {
        let guard = self
            .inner
            .read()
            .expect("dashboard session lock should not be poisoned");
        f(&guard)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut DashboardSession) -> R) -> R {
        let mut guard = self
            .inner
            .write()
            .expect("dashboard session lock should not be poisoned");
        f(&mut guard)
    }

    pub fn view(&self) -> DashboardView {
        self.read(DashboardSession::view)
    }
}

pub fn dashboard_router(session: SharedSession) -> Router {
    let [page, snapshot, resolve, tiers, field, toggle, contingency, theme, spread] =
        DASHBOARD_ROUTES;
    Router::new()
        .route(page, get(get_dashboard_html))
        .route(snapshot, get(get_dashboard_snapshot))
        .route(resolve, get(get_resolve_volume))
        .route(tiers, post(post_add_tier))
        .route(field, post(post_update_field))
        .route(toggle, post(post_toggle_edit))
        .route(contingency, post(post_toggle_contingency))
        .route(theme, post(post_toggle_theme))
        .route(spread, post(post_select_spread))
        .with_state(DashboardAppState { session })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub field: TierField,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadSelection {
    pub spread: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveQuery {
    pub volume: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub volume: String,
    pub tier_id: Option<TierId>,
    pub spread: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
}

#[derive(Debug)]
pub enum ApiError {
    Session(SessionError),
    TierNotFound(TierId),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        ApiError::Session(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, kind) = match &self {
            ApiError::TierNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("unknown tier: {id}"),
                "unknown_tier",
            ),
            ApiError::Session(SessionError::ContingencyLocked) => (
                StatusCode::LOCKED,
                SessionError::ContingencyLocked.to_string(),
                "contingency_locked",
            ),
            ApiError::Session(err @ SessionError::UnsupportedSpread(_)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                err.to_string(),
                "unsupported_spread",
            ),
            ApiError::Session(SessionError::Tier(err @ TierError::UnknownTier(_))) => {
                (StatusCode::NOT_FOUND, err.to_string(), err.kind())
            }
            ApiError::Session(SessionError::Tier(err)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string(), err.kind())
            }
        };

        let body = ErrorBody {
            error,
            kind: kind.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn render_dashboard_html(view: &DashboardView) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html><html lang=\"pt-BR\"><head><meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    out.push_str("<title>Controle de Spreads</title>\n");
    out.push_str("<style>.theme-light{--bg:#f4f6f8;--card:#ffffff;--ink:#182026;--muted:#5f6a73;--line:#d7dce1;--head:#14343f;--active:#dff3e4}.theme-dark{--bg:#0f171c;--card:#18242b;--ink:#e8eef1;--muted:#93a1ab;--line:#2c3a42;--head:#0b2a35;--active:#1f4630}*{box-sizing:border-box}body{margin:0;background:var(--bg);color:var(--ink);font-family:\"Inter\",\"Segoe UI\",sans-serif}.shell{max-width:1100px;margin:0 auto;padding:24px 18px}header h1{margin:0 0 4px;font-size:1.7rem}header p{margin:0;color:var(--muted)}.grid{display:grid;grid-template-columns:repeat(auto-fit,minmax(220px,1fr));gap:14px;margin-top:18px}.card{background:var(--card);border:1px solid var(--line);border-radius:14px;padding:14px 16px}.card h3{margin:0;font-size:.82rem;color:var(--muted);font-weight:500}.card p{margin:8px 0 0;font-size:1.3rem;font-weight:700}.banner{margin-top:16px;padding:10px 14px;border-radius:10px;background:#ffe2b8;color:#5a3a00;font-weight:600}table{width:100%;border-collapse:collapse;margin-top:12px;background:var(--card);border-radius:14px;overflow:hidden}thead th{background:var(--head);color:#f2f7f9;font-size:.8rem;text-align:left;padding:10px}tbody td{padding:9px 10px;border-bottom:1px solid var(--line);font-size:.88rem}tr.row-active{background:var(--active);font-weight:600}input{width:140px;padding:4px 6px;border:1px solid var(--line);border-radius:6px;background:var(--bg);color:var(--ink)}button{padding:6px 10px;border-radius:8px;border:1px solid var(--line);background:var(--head);color:#fff;cursor:pointer}button:disabled{opacity:.45;cursor:not-allowed}.notice-error{color:#b3261e}.notice-success{color:#1e7a3a}</style>\n");
    out.push_str("</head>");
    out.push_str(&format!(
        "<body class=\"theme-{}\" data-mode=\"{}\"><main class=\"shell\">\n",
        view.theme.as_str(),
        view.mode.as_str()
    ));

    out.push_str("<header><h1>Controle de Spreads</h1>");
    out.push_str("<p>Monitore e ajuste os spreads de contingência</p></header>\n");
    out.push_str("<div class=\"toolbar\">");
    out.push_str(&format!(
        "<button id=\"btn-contingency\" data-action=\"contingency\">Modo contingência: {}</button> ",
        if view.mode == Mode::Contingency {
            "ativo"
        } else {
            "inativo"
        }
    ));
    out.push_str(&format!(
        "<button id=\"btn-theme\" data-action=\"theme\">Tema: {}</button>",
        match view.theme {
            Theme::Light => "claro",
            Theme::Dark => "escuro",
        }
    ));
    out.push_str("</div>\n");

    if view.mode == Mode::Contingency {
        out.push_str("<div class=\"banner\">Modo contingência ativo: tabela de contingência em uso, edição bloqueada.</div>\n");
    }

    out.push_str("<section class=\"grid\">");
    push_card(&mut out, "Número de Trades", &view.trade_count);
    push_card(&mut out, "Volume USD", &view.volume);
    push_card(&mut out, "Spread Atual", &view.current_spread);
    out.push_str("</section>\n<section class=\"grid\">");
    push_card(&mut out, "Exposição LONG", &view.long_exposure);
    push_card(&mut out, "Exposição SHORT", &view.short_exposure);
    push_card(&mut out, "Exposição Líquida", &view.net_exposure);
    out.push_str("</section>\n");

    out.push_str("<section><h2>Tabela de Spreads</h2>");
    out.push_str("<label>Spread base: <select id=\"spread-select\"");
    if !view.editable {
        out.push_str(" disabled");
    }
    out.push('>');
    for option in &view.spread_options {
        let selected = if *option == view.base_spread {
            " selected"
        } else {
            ""
        };
        out.push_str(&format!(
            "<option value=\"{0}\"{1}>{0}</option>",
            escape_html(option),
            selected
        ));
    }
    out.push_str("</select></label>\n");

    out.push_str("<table id=\"spread-table\"><thead><tr>");
    for header in TABLE_HEADERS {
        out.push_str("<th>");
        out.push_str(&escape_html(header));
        out.push_str("</th>");
    }
    out.push_str("</tr></thead><tbody>\n");
    for row in &view.rows {
        push_tier_row(&mut out, row, view.editable);
    }
    out.push_str("</tbody></table>\n");

    out.push_str("<button id=\"btn-add\" data-action=\"add\"");
    if !view.editable {
        out.push_str(" disabled");
    }
    out.push_str(">Adicionar faixa</button></section>\n");

    if !view.notices.is_empty() {
        out.push_str("<section id=\"notices\"><ul>");
        for notice in &view.notices {
            let class = match notice.level {
                NoticeLevel::Success => "notice-success",
                NoticeLevel::Error => "notice-error",
            };
            out.push_str(&format!(
                "<li class=\"{}\"><b>{}</b> {}</li>",
                class,
                escape_html(&notice.title),
                escape_html(&notice.message)
            ));
        }
        out.push_str("</ul></section>\n");
    }

    out.push_str(DASHBOARD_SCRIPT);
    out.push_str("</main></body></html>\n");
    out
}

const DASHBOARD_SCRIPT: &str = "<script>
async function call(path, body) {
  const res = await fetch(path, {method: 'POST', headers: {'content-type': 'application/json'}, body: body ? JSON.stringify(body) : null});
  if (!res.ok) { const err = await res.json(); alert(err.error); }
  location.reload();
}
document.querySelectorAll('[data-action]').forEach((btn) => btn.addEventListener('click', async () => {
  const id = btn.dataset.tier;
  switch (btn.dataset.action) {
    case 'contingency': return call('/dashboard/contingency');
    case 'theme': return call('/dashboard/theme');
    case 'add': return call('/dashboard/tiers');
    case 'toggle': {
      for (const input of document.querySelectorAll(`input[data-tier=\"${id}\"]`)) {
        await fetch(`/dashboard/tiers/${id}/field`, {method: 'POST', headers: {'content-type': 'application/json'}, body: JSON.stringify({field: input.name, value: input.value})});
      }
      return call(`/dashboard/tiers/${id}/toggle`);
    }
  }
}));
document.getElementById('spread-select').addEventListener('change', (e) => call('/dashboard/spread', {spread: e.target.value}));
</script>\n";

fn push_card(out: &mut String, title: &str, value: &str) {
    out.push_str(&format!(
        "<div class=\"card\"><h3>{}</h3><p>{}</p></div>",
        escape_html(title),
        escape_html(value)
    ));
}

fn push_tier_row(out: &mut String, row: &TierRowView, editable: bool) {
    let class = if row.active { "row-active" } else { "" };
    out.push_str(&format!(
        "<tr class=\"{}\" data-tier=\"{}\">",
        class, row.id
    ));

    if row.editing && editable {
        for (field, value) in [
            (TierField::MinExposure, &row.min_exposure),
            (TierField::MaxExposure, &row.max_exposure),
            (TierField::SpreadIncrease, &row.spread_increase),
        ] {
            out.push_str(&format!(
                "<td><input name=\"{}\" data-tier=\"{}\" value=\"{}\"></td>",
                field.as_str(),
                row.id,
                escape_html(value.trim_end_matches(" %"))
            ));
        }
    } else {
        for value in [&row.min_exposure, &row.max_exposure, &row.spread_increase] {
            out.push_str("<td>");
            out.push_str(&escape_html(value));
            out.push_str("</td>");
        }
    }

    out.push_str("<td>");
    out.push_str(&escape_html(&row.total_spread));
    out.push_str("</td><td>");
    out.push_str(&format!(
        "<button data-action=\"toggle\" data-tier=\"{}\"{}>{}</button>",
        row.id,
        if editable { "" } else { " disabled" },
        if row.editing { "Salvar" } else { "Editar" }
    ));
    out.push_str("</td></tr>\n");
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[derive(Clone)]
struct DashboardAppState {
    session: SharedSession,
}

fn log_mutation(action: &'static str, outcome: &'static str) {
    info!(
        component = "dashboard_http",
        event = "http.mutation",
        action,
        outcome
    );
}

fn outcome<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() {
        "ok"
    } else {
        "rejected"
    }
}

async fn get_dashboard_html(State(state): State<DashboardAppState>) -> impl IntoResponse {
    let view = state.session.view();
    info!(
        component = "dashboard_http",
        event = "http.page.request",
        rows = view.rows.len(),
        mode = view.mode.as_str()
    );
    Html(render_dashboard_html(&view))
}

async fn get_dashboard_snapshot(State(state): State<DashboardAppState>) -> impl IntoResponse {
    let view = state.session.view();
    info!(
        component = "dashboard_http",
        event = "http.snapshot.request",
        rows = view.rows.len()
    );
    Json(view)
}

async fn get_resolve_volume(
    State(state): State<DashboardAppState>,
    Query(query): Query<ResolveQuery>,
) -> Json<ResolveResponse> {
    let volume = parse_locale_decimal(&query.volume);
    let response = state.session.read(|session| {
        let resolved = session.active_registry().resolve_volume(volume);
        ResolveResponse {
            volume: format_currency(volume),
            tier_id: resolved.map(|tier| tier.id),
            spread: resolved
                .and_then(|tier| tier.total_spread(session.base_spread()))
                .map(format_percent)
                .unwrap_or_else(|| NO_MATCH_LABEL.to_string()),
        }
    });

    info!(
        component = "dashboard_http",
        event = "http.resolve.request",
        volume = %volume,
        matched = response.tier_id.is_some()
    );
    Json(response)
}

async fn post_add_tier(
    State(state): State<DashboardAppState>,
) -> Result<(StatusCode, Json<DashboardView>), ApiError> {
    let result = state.session.write(|session| session.add_tier());
    log_mutation("add_tier", outcome(&result));
    result?;
    Ok((StatusCode::CREATED, Json(state.session.view())))
}

async fn post_update_field(
    State(state): State<DashboardAppState>,
    Path(id): Path<u64>,
    Json(update): Json<FieldUpdate>,
) -> Result<Json<DashboardView>, ApiError> {
    let id = TierId(id);
    let result = state
        .session
        .write(|session| session.update_tier_field(id, update.field, &update.value));
    log_mutation("update_field", outcome(&result));
    if !result? {
        return Err(ApiError::TierNotFound(id));
    }
    Ok(Json(state.session.view()))
}

async fn post_toggle_edit(
    State(state): State<DashboardAppState>,
    Path(id): Path<u64>,
) -> Result<Json<DashboardView>, ApiError> {
    let result = state
        .session
        .write(|session| session.toggle_tier_edit(TierId(id)));
    let action = match result {
        Ok(EditTransition::Opened) => "open_edit",
        _ => "save_tier",
    };
    log_mutation(action, outcome(&result));
    result?;
    Ok(Json(state.session.view()))
}

async fn post_toggle_contingency(State(state): State<DashboardAppState>) -> Json<DashboardView> {
    state.session.write(|session| session.toggle_contingency());
    log_mutation("toggle_contingency", "ok");
    Json(state.session.view())
}

async fn post_toggle_theme(State(state): State<DashboardAppState>) -> Json<DashboardView> {
    state.session.write(|session| session.toggle_theme());
    log_mutation("toggle_theme", "ok");
    Json(state.session.view())
}

async fn post_select_spread(
    State(state): State<DashboardAppState>,
    Json(selection): Json<SpreadSelection>,
) -> Result<Json<DashboardView>, ApiError> {
    let spread = parse_locale_decimal(&selection.spread);
    let result = state
        .session
        .write(|session| session.select_base_spread(spread));
    log_mutation("select_spread", outcome(&result));
    result?;
    Ok(Json(state.session.view()))
}
