//! Dashboard session view model.
//!
//! Owns the standard and contingency spread tables plus every page-level toggle
//! (theme, contingency mode, base spread), the market stats cards and the
//! notification queue. Contingency mode swaps the active table and locks editing.

use std::collections::VecDeque;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::locale::{format_currency, format_exposure, format_percent};
use crate::registry::{
    EditTransition, ExposureTier, TierError, TierField, TierId, TierRegistry,
};

pub const DEFAULT_NOTICE_CAPACITY: usize = 20;

/// Base spreads offered by the spread selector, in percent.
pub const SPREAD_OPTIONS: [Decimal; 13] = [
    Decimal::from_parts(1, 0, 0, false, 1),
    Decimal::from_parts(2, 0, 0, false, 1),
    Decimal::from_parts(3, 0, 0, false, 1),
    Decimal::from_parts(4, 0, 0, false, 1),
    Decimal::from_parts(5, 0, 0, false, 1),
    Decimal::from_parts(6, 0, 0, false, 1),
    Decimal::from_parts(7, 0, 0, false, 1),
    Decimal::from_parts(8, 0, 0, false, 1),
    Decimal::from_parts(9, 0, 0, false, 1),
    Decimal::from_parts(10, 0, 0, false, 1),
    Decimal::from_parts(12, 0, 0, false, 1),
    Decimal::from_parts(15, 0, 0, false, 1),
    Decimal::from_parts(20, 0, 0, false, 1),
];

pub const NO_MATCH_LABEL: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Standard,
    Contingency,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Standard => "standard",
            Mode::Contingency => "contingency",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketStats {
    pub trade_count: u64,
    pub volume: Decimal,
    pub long_exposure: Decimal,
    pub short_exposure: Decimal,
}

impl MarketStats {
    pub fn net_exposure(&self) -> Decimal {
        self.long_exposure - self.short_exposure
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("contingency mode is active; spread table is read-only")]
    ContingencyLocked,
    #[error("unsupported base spread: {0}")]
    UnsupportedSpread(Decimal),
    #[error(transparent)]
    Tier(#[from] TierError),
}

/// Receives the full tier list after every successful mutation.
pub trait TierChangeSink: Send + Sync + 'static {
    fn tiers_changed(&self, mode: Mode, tiers: &[ExposureTier]);
}

pub struct DashboardSession {
    theme: Theme,
    mode: Mode,
    base_spread: Decimal,
    stats: MarketStats,
    standard: TierRegistry,
    contingency: TierRegistry,
    notices: VecDeque<Notice>,
    notice_capacity: usize,
    sinks: Vec<Arc<dyn TierChangeSink>>,
}

impl DashboardSession {
    pub fn new(
        stats: MarketStats,
        standard: TierRegistry,
        contingency: TierRegistry,
        base_spread: Decimal,
    ) -> Result<Self, SessionError> {
        ensure_spread_option(base_spread)?;
        Ok(Self {
            theme: Theme::default(),
            mode: Mode::default(),
            base_spread,
            stats,
            standard,
            contingency,
            notices: VecDeque::new(),
            notice_capacity: DEFAULT_NOTICE_CAPACITY,
            sinks: Vec::new(),
        })
    }

    pub fn with_notice_capacity(mut self, capacity: usize) -> Self {
        self.notice_capacity = capacity.max(1);
        self
    }

    pub fn subscribe(&mut self, sink: Arc<dyn TierChangeSink>) {
        self.sinks.push(sink);
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_contingency_active(&self) -> bool {
        self.mode == Mode::Contingency
    }

    pub fn base_spread(&self) -> Decimal {
        self.base_spread
    }

    pub fn stats(&self) -> &MarketStats {
        &self.stats
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub fn registry(&self, mode: Mode) -> &TierRegistry {
        match mode {
            Mode::Standard => &self.standard,
            Mode::Contingency => &self.contingency,
        }
    }

    pub fn active_registry(&self) -> &TierRegistry {
        self.registry(self.mode)
    }

    pub fn current_tier(&self) -> Option<&ExposureTier> {
        self.active_registry().resolve_volume(self.stats.volume)
    }

    pub fn current_spread(&self) -> Option<Decimal> {
        self.current_tier()
            .and_then(|tier| tier.total_spread(self.base_spread))
    }

    pub fn current_spread_label(&self) -> String {
        self.current_spread()
            .map(format_percent)
            .unwrap_or_else(|| NO_MATCH_LABEL.to_string())
    }

    pub fn set_volume(&mut self, volume: Decimal) {
        self.stats.volume = volume;
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        info!(
            component = "dashboard_session",
            event = "session.theme",
            theme = theme.as_str()
        );
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.set_theme(self.theme.toggled());
        self.theme
    }

    pub fn set_contingency(&mut self, active: bool) {
        self.mode = if active {
            Mode::Contingency
        } else {
            Mode::Standard
        };
        info!(
            component = "dashboard_session",
            event = "session.mode",
            mode = self.mode.as_str()
        );
    }

    pub fn toggle_contingency(&mut self) -> Mode {
        self.set_contingency(!self.is_contingency_active());
        self.mode
    }

    pub fn select_base_spread(&mut self, spread: Decimal) -> Result<(), SessionError> {
        ensure_spread_option(spread)?;
        self.base_spread = spread;
        info!(
            component = "dashboard_session",
            event = "session.spread",
            base_spread = %spread
        );
        Ok(())
    }

    pub fn add_tier(&mut self) -> Result<TierId, SessionError> {
        self.ensure_unlocked("add_tier")?;
        let id = self.standard.add_tier();
        self.emit_change();
        Ok(id)
    }

    /// Returns `Ok(false)` when `id` is not in the table; nothing is emitted then.
    pub fn update_tier_field(
        &mut self,
        id: TierId,
        field: TierField,
        raw: &str,
    ) -> Result<bool, SessionError> {
        self.ensure_unlocked("update_tier_field")?;
        let updated = self.standard.update_field(id, field, raw);
        if updated {
            self.emit_change();
        }
        Ok(updated)
    }

    pub fn toggle_tier_edit(&mut self, id: TierId) -> Result<EditTransition, SessionError> {
        self.ensure_unlocked("toggle_tier_edit")?;
        match self.standard.toggle_edit(id) {
            Ok(EditTransition::Opened) => Ok(EditTransition::Opened),
            Ok(EditTransition::Committed) => {
                self.push_notice(
                    NoticeLevel::Success,
                    "Faixa salva",
                    "As alterações da faixa foram salvas",
                );
                self.emit_change();
                Ok(EditTransition::Committed)
            }
            Err(err) => {
                if let Some(message) = validation_message(&err) {
                    self.push_notice(NoticeLevel::Error, "Erro de validação", message);
                }
                Err(err.into())
            }
        }
    }

    pub fn view(&self) -> DashboardView {
        let registry = self.active_registry();
        let volume = self.stats.volume;
        let rows = registry
            .tiers()
            .iter()
            .map(|tier| TierRowView {
                id: tier.id,
                min_exposure: format_exposure(tier.min_exposure),
                max_exposure: format_exposure(tier.max_exposure),
                spread_increase: format_percent(tier.spread_increase),
                total_spread: tier
                    .total_spread(self.base_spread)
                    .map(format_percent)
                    .unwrap_or_else(|| NO_MATCH_LABEL.to_string()),
                active: registry.is_active(tier.id, volume),
                editing: registry.is_editing(tier.id),
            })
            .collect();

        DashboardView {
            theme: self.theme,
            mode: self.mode,
            editable: !self.is_contingency_active(),
            trade_count: self.stats.trade_count.to_string(),
            volume: format_currency(volume),
            long_exposure: format_currency(self.stats.long_exposure),
            short_exposure: format_currency(self.stats.short_exposure),
            net_exposure: format_currency(self.stats.net_exposure()),
            base_spread: format_percent(self.base_spread),
            current_spread: self.current_spread_label(),
            spread_options: SPREAD_OPTIONS.iter().map(|s| format_percent(*s)).collect(),
            rows,
            notices: self.notices.iter().cloned().collect(),
        }
    }

    fn ensure_unlocked(&self, operation: &'static str) -> Result<(), SessionError> {
        if self.is_contingency_active() {
            warn!(
                component = "dashboard_session",
                event = "session.locked",
                operation
            );
            return Err(SessionError::ContingencyLocked);
        }
        Ok(())
    }

    fn push_notice(&mut self, level: NoticeLevel, title: &str, message: &str) {
        while self.notices.len() >= self.notice_capacity {
            self.notices.pop_front();
        }
        self.notices.push_back(Notice {
            level,
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    fn emit_change(&self) {
        for sink in &self.sinks {
            sink.tiers_changed(Mode::Standard, self.standard.tiers());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardView {
    pub theme: Theme,
    pub mode: Mode,
    pub editable: bool,
    pub trade_count: String,
    pub volume: String,
    pub long_exposure: String,
    pub short_exposure: String,
    pub net_exposure: String,
    pub base_spread: String,
    pub current_spread: String,
    pub spread_options: Vec<String>,
    pub rows: Vec<TierRowView>,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRowView {
    pub id: TierId,
    pub min_exposure: String,
    pub max_exposure: String,
    pub spread_increase: String,
    pub total_spread: String,
    pub active: bool,
    pub editing: bool,
}

pub fn demo_session() -> DashboardSession {
    let stats = MarketStats {
        trade_count: 202,
        volume: Decimal::new(494_223_00, 2),
        long_exposure: Decimal::new(293_450_00, 2),
        short_exposure: Decimal::new(200_773_00, 2),
    };

    let standard = TierRegistry::new(demo_tiers([
        Decimal::new(2, 1),
        Decimal::new(3, 1),
        Decimal::new(4, 1),
    ]));
    let contingency = TierRegistry::new(demo_tiers([
        Decimal::new(5, 1),
        Decimal::new(8, 1),
        Decimal::new(11, 1),
    ]));

    DashboardSession {
        theme: Theme::default(),
        mode: Mode::default(),
        base_spread: SPREAD_OPTIONS[6],
        stats,
        standard,
        contingency,
        notices: VecDeque::new(),
        notice_capacity: DEFAULT_NOTICE_CAPACITY,
        sinks: Vec::new(),
    }
}

fn demo_tiers(increases: [Decimal; 3]) -> Vec<ExposureTier> {
    let bounds = [
        (Decimal::ZERO, Decimal::new(1_000_000, 0)),
        (Decimal::new(1_000_000_01, 2), Decimal::new(2_000_000, 0)),
        (Decimal::new(2_000_000_01, 2), Decimal::new(4_000_000, 0)),
    ];

    bounds
        .into_iter()
        .zip(increases)
        .enumerate()
        .map(|(idx, ((min, max), increase))| {
            ExposureTier::new(TierId(idx as u64 + 1), min, max, increase)
        })
        .collect()
}

fn ensure_spread_option(spread: Decimal) -> Result<(), SessionError> {
    if SPREAD_OPTIONS.contains(&spread) {
        Ok(())
    } else {
        Err(SessionError::UnsupportedSpread(spread))
    }
}

fn validation_message(err: &TierError) -> Option<&'static str> {
    match err {
        TierError::InvalidRange { .. } => Some("O valor mínimo deve ser menor que o valor máximo"),
        TierError::OverlappingRange { .. } => Some("A faixa se sobrepõe a uma faixa existente"),
        TierError::UnknownTier(_) => None,
    }
}
