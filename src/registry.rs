//! Exposure-tier registry: ordered volume ranges with spread increases.
//!
//! Rules implemented:
//! - new tiers start as zero-valued drafts in editing state
//! - field writes are unvalidated buffer writes
//! - leaving edit mode ("save") requires `min < max` and no closed-interval overlap
//!   with any other tier; a rejected save keeps the tier editing
//! - volume resolution is first-match in iteration order, inclusive on both ends

use std::collections::HashMap;
use std::fmt;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::locale::parse_locale_decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierId(pub u64);

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureTier {
    pub id: TierId,
    pub min_exposure: Decimal,
    pub max_exposure: Decimal,
    pub spread_increase: Decimal,
}

impl ExposureTier {
    pub fn new(
        id: TierId,
        min_exposure: Decimal,
        max_exposure: Decimal,
        spread_increase: Decimal,
    ) -> Self {
        Self {
            id,
            min_exposure,
            max_exposure,
            spread_increase,
        }
    }

    pub fn draft(id: TierId) -> Self {
        Self::new(id, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
    }

    pub fn contains(&self, volume: Decimal) -> bool {
        volume >= self.min_exposure && volume <= self.max_exposure
    }

    /// Closed-interval intersection, partial or total.
    pub fn overlaps(&self, other: &ExposureTier) -> bool {
        self.contains(other.min_exposure)
            || self.contains(other.max_exposure)
            || other.contains(self.min_exposure)
            || other.contains(self.max_exposure)
    }

    /// Effective spread for this tier on top of `base_spread`; `None` past `Decimal::MAX`.
    pub fn total_spread(&self, base_spread: Decimal) -> Option<Decimal> {
        base_spread.checked_add(self.spread_increase)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierField {
    MinExposure,
    MaxExposure,
    SpreadIncrease,
}

impl TierField {
    pub fn as_str(self) -> &'static str {
        match self {
            TierField::MinExposure => "min_exposure",
            TierField::MaxExposure => "max_exposure",
            TierField::SpreadIncrease => "spread_increase",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTransition {
    Opened,
    Committed,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TierError {
    #[error("minimum must be less than maximum (min={min}, max={max})")]
    InvalidRange { min: Decimal, max: Decimal },
    #[error("range of tier {id} overlaps an existing range (tier {conflicting})")]
    OverlappingRange { id: TierId, conflicting: TierId },
    #[error("unknown tier: {0}")]
    UnknownTier(TierId),
}

impl TierError {
    pub fn kind(&self) -> &'static str {
        match self {
            TierError::InvalidRange { .. } => "invalid_range",
            TierError::OverlappingRange { .. } => "overlapping_range",
            TierError::UnknownTier(_) => "unknown_tier",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TierRegistry {
    tiers: Vec<ExposureTier>,
    editing: HashMap<TierId, bool>,
    last_issued_id: u64,
}

impl TierRegistry {
    /// Seeds the registry as-is. Seeded tiers are not validated and start committed.
    pub fn new(tiers: Vec<ExposureTier>) -> Self {
        let last_issued_id = tiers.iter().map(|tier| tier.id.0).max().unwrap_or(0);
        let editing = tiers.iter().map(|tier| (tier.id, false)).collect();
        Self {
            tiers,
            editing,
            last_issued_id,
        }
    }

    pub fn tiers(&self) -> &[ExposureTier] {
        &self.tiers
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn get(&self, id: TierId) -> Option<&ExposureTier> {
        self.tiers.iter().find(|tier| tier.id == id)
    }

    pub fn is_editing(&self, id: TierId) -> bool {
        self.editing.get(&id).copied().unwrap_or(false)
    }

    pub fn editing_ids(&self) -> Vec<TierId> {
        self.tiers
            .iter()
            .map(|tier| tier.id)
            .filter(|id| self.is_editing(*id))
            .collect()
    }

    pub fn add_tier(&mut self) -> TierId {
        let id = self.next_tier_id();
        self.tiers.push(ExposureTier::draft(id));
        self.editing.insert(id, true);

        debug!(
            component = "tier_registry",
            event = "tier.add",
            tier_id = id.0,
            tier_count = self.tiers.len()
        );
        id
    }

    /// Writes `raw` into `field` after locale parsing. Returns `false` if `id` is unknown.
    pub fn update_field(&mut self, id: TierId, field: TierField, raw: &str) -> bool {
        let Some(tier) = self.tiers.iter_mut().find(|tier| tier.id == id) else {
            debug!(
                component = "tier_registry",
                event = "tier.update.miss",
                tier_id = id.0,
                field = field.as_str()
            );
            return false;
        };

        let value = parse_locale_decimal(raw);
        match field {
            TierField::MinExposure => tier.min_exposure = value,
            TierField::MaxExposure => tier.max_exposure = value,
            TierField::SpreadIncrease => tier.spread_increase = value,
        }

        debug!(
            component = "tier_registry",
            event = "tier.update",
            tier_id = id.0,
            field = field.as_str(),
            value = %value
        );
        true
    }

    pub fn toggle_edit(&mut self, id: TierId) -> Result<EditTransition, TierError> {
        let tier = self.get(id).ok_or(TierError::UnknownTier(id))?;

        if !self.is_editing(id) {
            self.editing.insert(id, true);
            debug!(
                component = "tier_registry",
                event = "tier.edit.open",
                tier_id = id.0
            );
            return Ok(EditTransition::Opened);
        }

        if let Err(err) = self.validate(tier) {
            warn!(
                component = "tier_registry",
                event = "tier.save.rejected",
                tier_id = id.0,
                reason = err.kind(),
                error = %err
            );
            return Err(err);
        }

        self.editing.insert(id, false);
        info!(
            component = "tier_registry",
            event = "tier.save.committed",
            tier_id = id.0
        );
        Ok(EditTransition::Committed)
    }

    pub fn resolve_volume(&self, volume: Decimal) -> Option<&ExposureTier> {
        self.tiers.iter().find(|tier| tier.contains(volume))
    }

    pub fn is_active(&self, id: TierId, volume: Decimal) -> bool {
        self.resolve_volume(volume).map(|tier| tier.id) == Some(id)
    }

    fn validate(&self, candidate: &ExposureTier) -> Result<(), TierError> {
        if candidate.min_exposure >= candidate.max_exposure {
            return Err(TierError::InvalidRange {
                min: candidate.min_exposure,
                max: candidate.max_exposure,
            });
        }

        match self
            .tiers
            .iter()
            .filter(|other| other.id != candidate.id)
            .find(|other| candidate.overlaps(other))
        {
            Some(conflict) => Err(TierError::OverlappingRange {
                id: candidate.id,
                conflicting: conflict.id,
            }),
            None => Ok(()),
        }
    }

    fn next_tier_id(&mut self) -> TierId {
        let now_ms = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let next = now_ms.max(self.last_issued_id.saturating_add(1));
        self.last_issued_id = next;
        TierId(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tier(id: u64, min: Decimal, max: Decimal, increase: Decimal) -> ExposureTier {
        ExposureTier::new(TierId(id), min, max, increase)
    }

    fn seeded() -> TierRegistry {
        TierRegistry::new(vec![
            tier(1, dec!(0), dec!(1000000), dec!(0.2)),
            tier(2, dec!(1000000.01), dec!(2000000), dec!(0.3)),
        ])
    }

    #[test]
    fn overlap_covers_partial_and_total_containment() {
        let base = tier(1, dec!(100), dec!(200), dec!(0));
        assert!(base.overlaps(&tier(2, dec!(150), dec!(250), dec!(0))));
        assert!(base.overlaps(&tier(2, dec!(50), dec!(150), dec!(0))));
        assert!(base.overlaps(&tier(2, dec!(120), dec!(180), dec!(0))));
        assert!(base.overlaps(&tier(2, dec!(0), dec!(500), dec!(0))));
        assert!(base.overlaps(&tier(2, dec!(200), dec!(300), dec!(0))));
        assert!(!base.overlaps(&tier(2, dec!(200.01), dec!(300), dec!(0))));
        assert!(!base.overlaps(&tier(2, dec!(0), dec!(99.99), dec!(0))));
    }

    #[test]
    fn add_tier_appends_editing_draft_with_fresh_id() {
        let mut registry = seeded();
        let first = registry.add_tier();
        let second = registry.add_tier();

        assert_eq!(registry.len(), 4);
        assert!(first > TierId(2));
        assert!(second > first);
        assert!(registry.is_editing(first));
        assert_eq!(registry.get(first), Some(&ExposureTier::draft(first)));
        assert_eq!(registry.editing_ids(), vec![first, second]);
    }

    #[test]
    fn update_field_parses_locale_text_and_ignores_unknown_ids() {
        let mut registry = seeded();
        assert!(registry.update_field(TierId(2), TierField::MaxExposure, "$ 2.500.000,00"));
        assert!(registry.update_field(TierId(2), TierField::SpreadIncrease, "0,35"));
        assert_eq!(registry.get(TierId(2)).unwrap().max_exposure, dec!(2500000));
        assert_eq!(registry.get(TierId(2)).unwrap().spread_increase, dec!(0.35));

        let before = registry.tiers().to_vec();
        assert!(!registry.update_field(TierId(99), TierField::MinExposure, "5"));
        assert_eq!(registry.tiers(), before.as_slice());
    }

    #[test]
    fn garbage_input_writes_zero() {
        let mut registry = seeded();
        assert!(registry.update_field(TierId(1), TierField::SpreadIncrease, "n/a"));
        assert_eq!(registry.get(TierId(1)).unwrap().spread_increase, Decimal::ZERO);
    }

    #[test]
    fn save_rejects_equal_bounds_and_stays_editing() {
        let mut registry = seeded();
        assert_eq!(registry.toggle_edit(TierId(1)), Ok(EditTransition::Opened));
        registry.update_field(TierId(1), TierField::MaxExposure, "0");

        let err = registry.toggle_edit(TierId(1)).unwrap_err();
        assert_eq!(
            err,
            TierError::InvalidRange {
                min: dec!(0),
                max: dec!(0)
            }
        );
        assert!(registry.is_editing(TierId(1)));
        assert_eq!(registry.get(TierId(1)).unwrap().max_exposure, dec!(0));
    }

    #[test]
    fn save_rejects_overlap_against_other_tiers_only() {
        let mut registry = seeded();
        registry.toggle_edit(TierId(2)).unwrap();
        registry.update_field(TierId(2), TierField::MinExposure, "999.999,00");

        let err = registry.toggle_edit(TierId(2)).unwrap_err();
        assert_eq!(
            err,
            TierError::OverlappingRange {
                id: TierId(2),
                conflicting: TierId(1)
            }
        );
        assert_eq!(err.kind(), "overlapping_range");
        assert!(registry.is_editing(TierId(2)));

        registry.update_field(TierId(2), TierField::MinExposure, "1.000.000,01");
        assert_eq!(registry.toggle_edit(TierId(2)), Ok(EditTransition::Committed));
        assert!(!registry.is_editing(TierId(2)));
    }

    #[test]
    fn drafts_still_in_editing_count_as_other_tiers() {
        let mut registry = TierRegistry::default();
        let draft = registry.add_tier();
        let second = registry.add_tier();
        registry.update_field(second, TierField::MaxExposure, "100");

        // The untouched draft sits at [0, 0], which is inside [0, 100].
        let err = registry.toggle_edit(second).unwrap_err();
        assert_eq!(
            err,
            TierError::OverlappingRange {
                id: second,
                conflicting: draft
            }
        );
    }

    #[test]
    fn toggle_unknown_tier_is_an_error() {
        let mut registry = seeded();
        assert_eq!(
            registry.toggle_edit(TierId(42)),
            Err(TierError::UnknownTier(TierId(42)))
        );
    }

    #[test]
    fn resolution_is_inclusive_and_first_match() {
        let registry = TierRegistry::new(vec![
            tier(1, dec!(0), dec!(100), dec!(0.1)),
            tier(2, dec!(50), dec!(150), dec!(0.2)),
        ]);

        assert_eq!(registry.resolve_volume(dec!(0)).unwrap().id, TierId(1));
        assert_eq!(registry.resolve_volume(dec!(100)).unwrap().id, TierId(1));
        assert_eq!(registry.resolve_volume(dec!(75)).unwrap().id, TierId(1));
        assert_eq!(registry.resolve_volume(dec!(150)).unwrap().id, TierId(2));
        assert!(registry.resolve_volume(dec!(150.01)).is_none());

        assert!(registry.is_active(TierId(1), dec!(75)));
        assert!(!registry.is_active(TierId(2), dec!(75)));
        assert!(!registry.is_active(TierId(1), dec!(500)));
    }

    #[test]
    fn total_spread_is_base_plus_increase() {
        let t = tier(1, dec!(0), dec!(1), dec!(0.2));
        assert_eq!(t.total_spread(dec!(0.7)), Some(dec!(0.9)));
    }

    #[test]
    fn total_spread_past_decimal_max_is_none() {
        let mut registry = seeded();
        assert!(registry.update_field(
            TierId(1),
            TierField::SpreadIncrease,
            "79.228.162.514.264.337.593.543.950.335"
        ));

        let t = registry.get(TierId(1)).unwrap();
        assert_eq!(t.spread_increase, Decimal::MAX);
        assert_eq!(t.total_spread(dec!(0.7)), None);
        assert_eq!(t.total_spread(Decimal::ZERO), Some(Decimal::MAX));
    }
}
