//! Configuration management for the seating engine.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::allocation::ShortfallPolicy;
use crate::error::SeatingError;
use crate::ledger::TableLedger;
use crate::plan::SeatingPlan;
use crate::types::{AisleNeighbor, Position, Table, TableNumber};
use serde::{Deserialize, Serialize};
use std::env;

/// Capacity of the update channel when none is configured
pub const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Table layout a new plan starts with
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutPreset {
    /// Standing area plus tables 1 to 17
    #[default]
    Default,
    /// No tables at all
    Empty,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// What to do with cards that do not fit (`TISCHPLAN_SHORTFALL_POLICY`: reject | drop)
    pub shortfall_policy: ShortfallPolicy,
    /// Starting layout (`TISCHPLAN_LAYOUT`: default | empty)
    pub layout: LayoutPreset,
    /// Buffered plan updates per subscriber (`TISCHPLAN_BROADCAST_CAPACITY`)
    pub broadcast_capacity: usize,
    /// Tracing filter used when `RUST_LOG` is unset (`TISCHPLAN_LOG_LEVEL`)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shortfall_policy: ShortfallPolicy::Reject,
            layout: LayoutPreset::Default,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    /// Unset or unparsable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            shortfall_policy: lookup("TISCHPLAN_SHORTFALL_POLICY")
                .and_then(|s| parse_policy(&s))
                .unwrap_or(defaults.shortfall_policy),
            layout: lookup("TISCHPLAN_LAYOUT")
                .and_then(|s| parse_layout(&s))
                .unwrap_or(defaults.layout),
            broadcast_capacity: lookup("TISCHPLAN_BROADCAST_CAPACITY")
                .and_then(|s| s.trim().parse().ok())
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.broadcast_capacity),
            log_level: lookup("TISCHPLAN_LOG_LEVEL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.log_level),
        }
    }

    /// Build an empty plan with the configured layout and policy
    ///
    /// # Errors
    ///
    /// Returns a ledger error if the layout is inconsistent.
    pub fn build_plan(&self) -> Result<SeatingPlan, SeatingError> {
        let tables = match self.layout {
            LayoutPreset::Default => default_layout(),
            LayoutPreset::Empty => Vec::new(),
        };
        Ok(SeatingPlan::new(
            TableLedger::from_tables(tables)?,
            self.shortfall_policy,
        ))
    }
}

fn parse_policy(value: &str) -> Option<ShortfallPolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "reject" => Some(ShortfallPolicy::Reject),
        "drop" | "drop_remainder" => Some(ShortfallPolicy::DropRemainder),
        _ => None,
    }
}

fn parse_layout(value: &str) -> Option<LayoutPreset> {
    match value.trim().to_ascii_lowercase().as_str() {
        "default" => Some(LayoutPreset::Default),
        "empty" => Some(LayoutPreset::Empty),
        _ => None,
    }
}

/// Hall layout: 76 standing places and seventeen tables in three rows
#[must_use]
pub fn default_layout() -> Vec<Table> {
    let mut tables = vec![Table::new(TableNumber::STANDING, 76, Position::Standing)];
    for number in 1..=17 {
        let (capacity, position) = match number {
            1..=5 => (18, Position::Left),
            8..=11 => (24, Position::Middle),
            6 | 7 | 12 | 13 => (18, Position::Middle),
            14 => (12, Position::Right),
            _ => (18, Position::Right),
        };
        let table = Table::new(TableNumber::new(number), capacity, position);
        tables.push(if number == 16 {
            table.with_aisle(AisleNeighbor::Oben)
        } else {
            table
        });
    }
    tables
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(Config::from_lookup(|_| None), Config::default());
    }

    #[test]
    fn test_values_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("TISCHPLAN_SHORTFALL_POLICY", "DROP"),
            ("TISCHPLAN_LAYOUT", "empty"),
            ("TISCHPLAN_BROADCAST_CAPACITY", "8"),
            ("TISCHPLAN_LOG_LEVEL", "debug,tischplan=trace"),
        ]));
        assert_eq!(config.shortfall_policy, ShortfallPolicy::DropRemainder);
        assert_eq!(config.layout, LayoutPreset::Empty);
        assert_eq!(config.broadcast_capacity, 8);
        assert_eq!(config.log_level, "debug,tischplan=trace");
        assert!(config.build_plan().unwrap().ledger().is_empty());
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("TISCHPLAN_SHORTFALL_POLICY", "waitlist"),
            ("TISCHPLAN_BROADCAST_CAPACITY", "0"),
        ]));
        assert_eq!(config.shortfall_policy, ShortfallPolicy::Reject);
        assert_eq!(config.broadcast_capacity, DEFAULT_BROADCAST_CAPACITY);
    }

    #[test]
    fn test_default_layout() {
        let plan = Config::default().build_plan().unwrap();
        let ledger = plan.ledger();
        assert_eq!(ledger.len(), 18);
        assert_eq!(ledger.get_free(TableNumber::STANDING), Some(76));
        assert_eq!(ledger.get(TableNumber::new(9)).map(|t| t.capacity), Some(24));
        assert_eq!(ledger.get(TableNumber::new(14)).map(|t| t.capacity), Some(12));
        assert_eq!(
            ledger.get(TableNumber::new(16)).and_then(|t| t.aisle_neighbor),
            Some(AisleNeighbor::Oben)
        );
        assert_eq!(ledger.total_capacity(), 76 + 12 * 18 + 4 * 24 + 12);
        assert_eq!(ledger.most_common_capacity(), 18);
    }
}
