//! Input record for a Zinsplan run: global defaults and one-time fees,
//! plus the ordered list of tranches that may override the defaults.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ZinsplanError;
use crate::types::{Money, Months, Percent};
use crate::ZinsplanResult;

/// Upper bound on tranches when editing an input interactively. The engine
/// itself accepts any number of tranches.
pub const MAX_TRANCHES: usize = 3;

/// Term given to a newly added tranche
pub const DEFAULT_TERM_MONTHS: Months = 24;

// ---------------------------------------------------------------------------
// Global configuration
// ---------------------------------------------------------------------------

/// Settings shared by every tranche.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Principal used by tranches that do not set their own
    pub default_principal: Money,
    /// All-in rate in percent used by tranches that do not set their own
    pub default_all_in_rate: Percent,
    /// Crowd rate in percent used by tranches that do not set their own
    pub default_crowd_rate: Percent,
    /// One-time brokerage (placement) fee in percent of principal
    pub brokerage_fee_rate: Percent,
    /// One-time flat structuring fee
    pub structuring_fee: Money,
    /// Charge the brokerage fee at maturity instead of at disbursement
    pub brokerage_due_at_maturity: bool,
    /// Charge the structuring fee at maturity instead of at disbursement
    pub structuring_due_at_maturity: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            default_principal: dec!(1_000_000),
            default_all_in_rate: dec!(5.0),
            default_crowd_rate: dec!(7.0),
            brokerage_fee_rate: dec!(3.0),
            structuring_fee: dec!(10_000),
            brokerage_due_at_maturity: false,
            structuring_due_at_maturity: false,
        }
    }
}

impl GlobalConfig {
    pub fn validate(&self) -> ZinsplanResult<()> {
        if self.default_principal < Decimal::ZERO {
            return Err(ZinsplanError::invalid(
                "global.default_principal",
                "Default principal cannot be negative",
            ));
        }
        if self.brokerage_fee_rate < Decimal::ZERO {
            return Err(ZinsplanError::invalid(
                "global.brokerage_fee_rate",
                "Brokerage fee rate cannot be negative",
            ));
        }
        if self.structuring_fee < Decimal::ZERO {
            return Err(ZinsplanError::invalid(
                "global.structuring_fee",
                "Structuring fee cannot be negative",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tranche input
// ---------------------------------------------------------------------------

/// One financing tranche. Absent overrides fall back to the global
/// defaults; an explicit zero is kept as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrancheInput {
    /// Contractual duration in months
    pub term_months: Months,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Money>,
    /// Annual all-in rate in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_in_rate: Option<Percent>,
    /// Annual crowd rate in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crowd_rate: Option<Percent>,
}

/// A tranche with every override resolved against the global defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTranche {
    pub term_months: Months,
    pub principal: Money,
    pub all_in_rate: Percent,
    pub crowd_rate: Percent,
}

impl TrancheInput {
    /// Tranche that inherits principal and rates from the global config.
    pub fn new(term_months: Months) -> Self {
        Self {
            term_months,
            principal: None,
            all_in_rate: None,
            crowd_rate: None,
        }
    }

    pub fn with_principal(mut self, principal: Money) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_all_in_rate(mut self, rate: Percent) -> Self {
        self.all_in_rate = Some(rate);
        self
    }

    pub fn with_crowd_rate(mut self, rate: Percent) -> Self {
        self.crowd_rate = Some(rate);
        self
    }

    pub fn resolve(&self, global: &GlobalConfig) -> ResolvedTranche {
        ResolvedTranche {
            term_months: self.term_months,
            principal: self.principal.unwrap_or(global.default_principal),
            all_in_rate: self.all_in_rate.unwrap_or(global.default_all_in_rate),
            crowd_rate: self.crowd_rate.unwrap_or(global.default_crowd_rate),
        }
    }

    /// Validate the tranche at position `index` (0-based) against `global`.
    pub fn validate(&self, index: usize, global: &GlobalConfig) -> ZinsplanResult<()> {
        if self.term_months == 0 {
            return Err(ZinsplanError::invalid(
                format!("tranches[{index}].term_months"),
                "Term must be at least one month",
            ));
        }
        if self.resolve(global).principal < Decimal::ZERO {
            return Err(ZinsplanError::invalid(
                format!("tranches[{index}].principal"),
                "Principal cannot be negative",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Full input record
// ---------------------------------------------------------------------------

/// Everything the presentation layer hands to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZinsplanInput {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub tranches: Vec<TrancheInput>,
}

impl Default for ZinsplanInput {
    /// A single 24-month tranche on the default terms.
    fn default() -> Self {
        let global = GlobalConfig::default();
        let tranches = vec![snapshot_tranche(&global)];
        Self { global, tranches }
    }
}

impl ZinsplanInput {
    pub fn new(global: GlobalConfig, tranches: Vec<TrancheInput>) -> Self {
        Self { global, tranches }
    }

    /// Append a tranche carrying a copy of the current global defaults.
    pub fn add_tranche(&mut self) -> ZinsplanResult<&TrancheInput> {
        if self.tranches.len() >= MAX_TRANCHES {
            return Err(ZinsplanError::invalid(
                "tranches",
                format!("At most {MAX_TRANCHES} tranches can be configured"),
            ));
        }
        self.tranches.push(snapshot_tranche(&self.global));
        Ok(&self.tranches[self.tranches.len() - 1])
    }

    /// Remove the tranche at `index`. The last remaining tranche stays.
    pub fn remove_tranche(&mut self, index: usize) -> ZinsplanResult<TrancheInput> {
        if index >= self.tranches.len() {
            return Err(ZinsplanError::invalid(
                "tranches",
                format!(
                    "No tranche at position {index} ({} configured)",
                    self.tranches.len()
                ),
            ));
        }
        if self.tranches.len() == 1 {
            return Err(ZinsplanError::invalid(
                "tranches",
                "The last remaining tranche cannot be removed",
            ));
        }
        Ok(self.tranches.remove(index))
    }

    pub fn validate(&self) -> ZinsplanResult<()> {
        self.global.validate()?;
        for (index, tranche) in self.tranches.iter().enumerate() {
            tranche.validate(index, &self.global)?;
        }
        Ok(())
    }
}

fn snapshot_tranche(global: &GlobalConfig) -> TrancheInput {
    TrancheInput::new(DEFAULT_TERM_MONTHS)
        .with_principal(global.default_principal)
        .with_all_in_rate(global.default_all_in_rate)
        .with_crowd_rate(global.default_crowd_rate)
}
