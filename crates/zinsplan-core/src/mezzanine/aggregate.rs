//! Runs the tranche calculator over every tranche and combines the results.
//!
//! Tranches are independent: each is computed on its own, in input order.
//! The combined schedule keeps every entry attributable to its tranche;
//! per-timepoint sums across tranches are reported separately.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Money, Months};
use crate::ZinsplanResult;

use super::input::{GlobalConfig, TrancheInput};
use super::schedule::PaymentScheduleEntry;
use super::tranche::{compute_validated, TrancheResult};
use super::{checked_add, checked_sum};

/// Schedule entry tagged with the tranche it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedScheduleEntry {
    /// Tranche position (0-based)
    pub tranche: usize,
    #[serde(flatten)]
    pub entry: PaymentScheduleEntry,
}

/// Net, VAT and gross due at one timepoint across all tranches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimepointTotal {
    pub timepoint: Months,
    pub net: Money,
    pub vat: Money,
    pub gross: Money,
}

/// Result of a full run over all tranches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub tranches: Vec<TrancheResult>,
    pub total_principal: Money,
    pub total_net: Money,
    pub total_gross: Money,
    pub combined_schedule: Vec<CombinedScheduleEntry>,
    pub timepoint_totals: Vec<TimepointTotal>,
    /// All tranche warnings, in tranche order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Set only when the run failed; everything else is then empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for AggregateResult {
    fn default() -> Self {
        Self {
            tranches: Vec::new(),
            total_principal: Decimal::ZERO,
            total_net: Decimal::ZERO,
            total_gross: Decimal::ZERO,
            combined_schedule: Vec::new(),
            timepoint_totals: Vec::new(),
            warning: None,
            error: None,
        }
    }
}

impl AggregateResult {
    /// All-zero result carrying a calculation error.
    pub fn failed(message: impl std::fmt::Display) -> Self {
        Self {
            error: Some(format!("Calculation error: {message}")),
            ..Self::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Compute every tranche and aggregate totals, schedule and warnings.
///
/// Zero tranches yield an all-zero result. Invalid global terms or the first
/// invalid tranche abort the run, as does any amount outside the decimal
/// range.
pub fn aggregate(global: &GlobalConfig, tranches: &[TrancheInput]) -> ZinsplanResult<AggregateResult> {
    global.validate()?;

    let results = tranches
        .iter()
        .enumerate()
        .map(|(index, tranche)| compute_validated(index, tranche, global))
        .collect::<ZinsplanResult<Vec<_>>>()?;

    let total_principal = checked_sum(results.iter().map(|t| t.principal), "total principal")?;
    let total_net = checked_sum(results.iter().map(|t| t.net_total), "total net")?;
    let total_gross = checked_sum(results.iter().map(|t| t.gross_total), "total gross")?;

    let combined_schedule = combine_schedules(&results);
    let timepoint_totals = timepoint_totals(&combined_schedule)?;

    let warnings: Vec<&str> = results.iter().filter_map(|t| t.warning.as_deref()).collect();
    let warning = (!warnings.is_empty()).then(|| warnings.join(" "));

    debug!(
        tranches = results.len(),
        %total_principal,
        %total_net,
        %total_gross,
        "zinsplan aggregated"
    );

    Ok(AggregateResult {
        tranches: results,
        total_principal,
        total_net,
        total_gross,
        combined_schedule,
        timepoint_totals,
        warning,
        error: None,
    })
}

/// Every tranche's entries, ordered by timepoint and then tranche position.
pub fn combine_schedules(tranches: &[TrancheResult]) -> Vec<CombinedScheduleEntry> {
    let mut combined: Vec<CombinedScheduleEntry> = tranches
        .iter()
        .flat_map(|t| {
            t.schedule.iter().map(move |entry| CombinedScheduleEntry {
                tranche: t.index,
                entry: entry.clone(),
            })
        })
        .collect();
    combined.sort_by_key(|c| (c.entry.timepoint, c.tranche));
    combined
}

/// Sum the combined schedule per distinct timepoint.
pub fn timepoint_totals(
    combined: &[CombinedScheduleEntry],
) -> ZinsplanResult<Vec<TimepointTotal>> {
    let mut by_timepoint: BTreeMap<Months, (Money, Money)> = BTreeMap::new();
    for c in combined {
        let (net, vat) = by_timepoint
            .entry(c.entry.timepoint)
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        *net = checked_add(*net, c.entry.net()?, "timepoint net")?;
        *vat = checked_add(*vat, c.entry.vat()?, "timepoint VAT")?;
    }

    by_timepoint
        .into_iter()
        .map(|(timepoint, (net, vat))| -> ZinsplanResult<TimepointTotal> {
            Ok(TimepointTotal {
                timepoint,
                net,
                vat,
                gross: checked_add(net, vat, "timepoint gross")?,
            })
        })
        .collect()
}
