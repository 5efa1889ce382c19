//! Tranche calculator: derives fees, the implied annual service fee and the
//! dated payment schedule for one tranche.
//!
//! The service fee is whatever is left of the all-in interest after paying
//! the crowd and amortising the one-time fees straight-line over the term:
//!
//! ```text
//! service_fee_per_year = all_in_interest - crowd_interest
//!                        - (brokerage_fee + structuring_fee) / term_years
//! ```
//!
//! A negative service fee is reported as a warning, never clamped.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{Money, Months, Percent, Years};
use crate::ZinsplanResult;

use super::input::{GlobalConfig, TrancheInput};
use super::schedule::{
    build_schedule, PaymentScheduleEntry, ScheduleParams, ScheduleTotals, MONTHS_PER_QUARTER,
    VAT_RATE,
};
use super::{checked_add, checked_div, checked_mul, checked_sub, percent_of, MONTHS_PER_YEAR};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Cost component of a tranche, as shown in its summary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    AllInInterest,
    CrowdInterest,
    BrokerageFee,
    StructuringFee,
    ServiceFee,
}

/// One row of the per-tranche summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSummary {
    pub component: Component,
    pub per_annum: Money,
    pub total_net: Money,
    /// Absent for the all-in interest, which is the envelope of the other
    /// components rather than a cash flow of its own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_gross: Option<Money>,
}

/// Everything derived for a single tranche.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrancheResult {
    /// Position in the input list (0-based)
    pub index: usize,
    pub term_months: Months,
    pub term_years: Years,
    pub principal: Money,
    pub all_in_rate: Percent,
    pub crowd_rate: Percent,
    pub brokerage_fee_amount: Money,
    pub structuring_fee_amount: Money,
    pub all_in_interest_per_year: Money,
    pub crowd_interest_per_year: Money,
    /// One-time fees amortised straight-line over the term
    pub one_time_fees_per_year: Money,
    pub service_fee_per_year: Money,
    pub schedule: Vec<PaymentScheduleEntry>,
    pub components: Vec<ComponentSummary>,
    pub net_total: Money,
    pub vat_total: Money,
    pub gross_total: Money,
    pub per_annum_net: Money,
    pub per_annum_gross: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute the tranche at position `index` under `global`.
///
/// Invalid input (zero term, negative principal or fees) is an error;
/// economically odd but valid input only produces a warning.
pub fn compute_tranche(
    index: usize,
    tranche: &TrancheInput,
    global: &GlobalConfig,
) -> ZinsplanResult<TrancheResult> {
    global.validate()?;
    compute_validated(index, tranche, global)
}

/// [`compute_tranche`] for callers that already validated `global`.
pub(super) fn compute_validated(
    index: usize,
    tranche: &TrancheInput,
    global: &GlobalConfig,
) -> ZinsplanResult<TrancheResult> {
    tranche.validate(index, global)?;

    let resolved = tranche.resolve(global);
    let number = index + 1;
    let mut warnings: Vec<String> = Vec::new();

    let term_years = Decimal::from(resolved.term_months) / MONTHS_PER_YEAR;

    // --- Fees ---
    let brokerage_fee_amount =
        percent_of(global.brokerage_fee_rate, resolved.principal, "brokerage fee")?;
    let structuring_fee_amount = global.structuring_fee;

    // --- Interest ---
    let crowd_interest_per_year =
        percent_of(resolved.crowd_rate, resolved.principal, "crowd interest")?;
    let all_in_interest_per_year =
        percent_of(resolved.all_in_rate, resolved.principal, "all-in interest")?;

    // --- Service fee (residual spread) ---
    let one_time_fees = checked_add(
        brokerage_fee_amount,
        structuring_fee_amount,
        "one-time fees",
    )?;
    let one_time_fees_per_year = checked_div(one_time_fees, term_years, "annualising one-time fees")?;
    let service_fee_per_year = checked_sub(
        checked_sub(all_in_interest_per_year, crowd_interest_per_year, "service fee")?,
        one_time_fees_per_year,
        "service fee",
    )?;

    if service_fee_per_year < Decimal::ZERO {
        warnings.push(format!(
            "Service fee for tranche {number} is negative. Adjust the fees or the all-in rate."
        ));
    }

    let leftover_months = resolved.term_months % MONTHS_PER_QUARTER;
    if leftover_months != 0 {
        warnings.push(format!(
            "Term of tranche {number} ({} months) is not a multiple of 3; the final {leftover_months} month(s) carry no interest or service fee.",
            resolved.term_months
        ));
    }

    // --- Schedule and totals ---
    let schedule = build_schedule(&ScheduleParams {
        term_months: resolved.term_months,
        brokerage_fee: brokerage_fee_amount,
        structuring_fee: structuring_fee_amount,
        crowd_interest_per_year,
        service_fee_per_year,
        brokerage_due_at_maturity: global.brokerage_due_at_maturity,
        structuring_due_at_maturity: global.structuring_due_at_maturity,
    })?;

    let totals = ScheduleTotals::from_entries(&schedule)?;
    let net_total = totals.net()?;
    let vat_total = totals.vat()?;
    let gross_total = totals.gross()?;
    let per_annum_net = checked_div(net_total, term_years, "per annum net")?;
    let per_annum_gross = checked_div(gross_total, term_years, "per annum gross")?;

    let components = summarize_components(
        term_years,
        all_in_interest_per_year,
        crowd_interest_per_year,
        brokerage_fee_amount,
        structuring_fee_amount,
        service_fee_per_year,
    )?;

    for message in &warnings {
        warn!(tranche = number, "{message}");
    }
    debug!(
        tranche = number,
        term_months = resolved.term_months,
        entries = schedule.len(),
        %net_total,
        %gross_total,
        "tranche computed"
    );

    Ok(TrancheResult {
        index,
        term_months: resolved.term_months,
        term_years,
        principal: resolved.principal,
        all_in_rate: resolved.all_in_rate,
        crowd_rate: resolved.crowd_rate,
        brokerage_fee_amount,
        structuring_fee_amount,
        all_in_interest_per_year,
        crowd_interest_per_year,
        one_time_fees_per_year,
        service_fee_per_year,
        schedule,
        components,
        net_total,
        vat_total,
        gross_total,
        per_annum_net,
        per_annum_gross,
        warning: (!warnings.is_empty()).then(|| warnings.join(" ")),
    })
}

// ---------------------------------------------------------------------------
// Component summary
// ---------------------------------------------------------------------------

fn summarize_components(
    term_years: Years,
    all_in_interest_per_year: Money,
    crowd_interest_per_year: Money,
    brokerage_fee: Money,
    structuring_fee: Money,
    service_fee_per_year: Money,
) -> ZinsplanResult<Vec<ComponentSummary>> {
    let gross_factor = Decimal::ONE + VAT_RATE;
    let crowd_total = checked_mul(crowd_interest_per_year, term_years, "crowd interest total")?;
    let service_total = checked_mul(service_fee_per_year, term_years, "service fee total")?;

    Ok(vec![
        ComponentSummary {
            component: Component::AllInInterest,
            per_annum: all_in_interest_per_year,
            total_net: checked_mul(all_in_interest_per_year, term_years, "all-in interest total")?,
            total_gross: None,
        },
        ComponentSummary {
            component: Component::CrowdInterest,
            per_annum: crowd_interest_per_year,
            total_net: crowd_total,
            total_gross: Some(crowd_total),
        },
        ComponentSummary {
            component: Component::BrokerageFee,
            per_annum: checked_div(brokerage_fee, term_years, "brokerage fee per annum")?,
            total_net: brokerage_fee,
            total_gross: Some(checked_mul(brokerage_fee, gross_factor, "brokerage fee gross")?),
        },
        ComponentSummary {
            component: Component::StructuringFee,
            per_annum: checked_div(structuring_fee, term_years, "structuring fee per annum")?,
            total_net: structuring_fee,
            total_gross: Some(checked_mul(structuring_fee, gross_factor, "structuring fee gross")?),
        },
        ComponentSummary {
            component: Component::ServiceFee,
            per_annum: service_fee_per_year,
            total_net: service_total,
            total_gross: Some(checked_mul(service_total, gross_factor, "service fee gross")?),
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ZinsplanError;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    const TOLERANCE: Decimal = dec!(0.000001);

    fn assert_close(actual: Decimal, expected: Decimal, what: &str) {
        assert!(
            (actual - expected).abs() < TOLERANCE,
            "{what}: expected {expected}, got {actual}"
        );
    }

    /// Default global terms: 1M principal, 5% all-in, 7% crowd, 3% brokerage,
    /// 10k structuring, fees upfront.
    fn standard_global() -> GlobalConfig {
        GlobalConfig::default()
    }

    // -----------------------------------------------------------------------
    // 1. Default terms: crowd rate above all-in gives a negative service fee
    // -----------------------------------------------------------------------
    #[test]
    fn test_negative_service_fee_warns_but_still_schedules() {
        let result = compute_tranche(0, &TrancheInput::new(24), &standard_global()).unwrap();

        assert_eq!(result.brokerage_fee_amount, dec!(30_000));
        assert_eq!(result.structuring_fee_amount, dec!(10_000));
        assert_eq!(result.crowd_interest_per_year, dec!(70_000));
        assert_eq!(result.all_in_interest_per_year, dec!(50_000));
        assert_eq!(result.one_time_fees_per_year, dec!(20_000));
        // 50k - 70k - 40k / 2
        assert_eq!(result.service_fee_per_year, dec!(-40_000));

        let warning = result.warning.expect("negative service fee must warn");
        assert!(warning.contains("tranche 1"), "{warning}");
        assert!(warning.contains("negative"), "{warning}");

        assert_eq!(result.schedule.len(), 9);
        assert_eq!(result.schedule[1].service_fee, dec!(-10_000));
    }

    // -----------------------------------------------------------------------
    // 2. Crowd rate 2%: positive service fee, no warning
    // -----------------------------------------------------------------------
    #[test]
    fn test_positive_service_fee_quarterly_entries() {
        let tranche = TrancheInput::new(24).with_crowd_rate(dec!(2.0));
        let result = compute_tranche(0, &tranche, &standard_global()).unwrap();

        assert_eq!(result.crowd_interest_per_year, dec!(20_000));
        // 50k - 20k - 20k
        assert_eq!(result.service_fee_per_year, dec!(10_000));
        assert_eq!(result.warning, None);

        let quarterly: Vec<_> = result.schedule.iter().filter(|e| e.timepoint > 0).collect();
        assert_eq!(quarterly.len(), 8);
        for entry in quarterly {
            assert_eq!(entry.crowd_interest, dec!(5_000));
            assert_eq!(entry.service_fee, dec!(2_500));
            assert_eq!(entry.service_fee_vat, dec!(475));
        }
    }

    // -----------------------------------------------------------------------
    // 3. Lower brokerage fee: 20k service fee, 5k per quarter
    // -----------------------------------------------------------------------
    #[test]
    fn test_service_fee_with_one_percent_brokerage() {
        let global = GlobalConfig {
            brokerage_fee_rate: dec!(1.0),
            ..standard_global()
        };
        let tranche = TrancheInput::new(24).with_crowd_rate(dec!(2.0));
        let result = compute_tranche(0, &tranche, &global).unwrap();

        // 50k - 20k - (10k + 10k) / 2
        assert_eq!(result.service_fee_per_year, dec!(20_000));
        for entry in result.schedule.iter().filter(|e| e.timepoint > 0) {
            assert_eq!(entry.crowd_interest, dec!(5_000));
            assert_eq!(entry.service_fee, dec!(5_000));
            assert_eq!(entry.service_fee_vat, dec!(950));
        }
    }

    // -----------------------------------------------------------------------
    // 4. Totals tie back to the schedule
    // -----------------------------------------------------------------------
    #[test]
    fn test_net_total_equals_schedule_sum() {
        let tranche = TrancheInput::new(36).with_crowd_rate(dec!(2.5));
        let result = compute_tranche(0, &tranche, &standard_global()).unwrap();

        let net: Money = result.schedule.iter().map(|e| e.net().unwrap()).sum();
        let gross: Money = result.schedule.iter().map(|e| e.gross().unwrap()).sum();
        assert_eq!(result.net_total, net);
        assert_eq!(result.gross_total, gross);
        assert_eq!(result.gross_total, result.net_total + result.vat_total);
    }

    #[test]
    fn test_per_annum_times_years_equals_total() {
        for term in [3, 10, 24, 27, 61] {
            let tranche = TrancheInput::new(term).with_crowd_rate(dec!(2.0));
            let result = compute_tranche(0, &tranche, &standard_global()).unwrap();

            assert_close(
                result.per_annum_net * result.term_years,
                result.net_total,
                "per annum net",
            );
            assert_close(
                result.per_annum_gross * result.term_years,
                result.gross_total,
                "per annum gross",
            );
        }
    }

    #[test]
    fn test_all_in_interest_reconciles_for_whole_quarters() {
        // crowd + service + amortised fees == all-in over the full term
        let tranche = TrancheInput::new(24).with_crowd_rate(dec!(2.0));
        let result = compute_tranche(0, &tranche, &standard_global()).unwrap();

        assert_close(result.net_total, dec!(50_000) * dec!(2), "net total");
    }

    // -----------------------------------------------------------------------
    // 5. Fee timing
    // -----------------------------------------------------------------------
    #[test]
    fn test_upfront_fees_in_initial_entry() {
        let result = compute_tranche(0, &TrancheInput::new(24), &standard_global()).unwrap();
        let initial = &result.schedule[0];

        assert_eq!(initial.timepoint, 0);
        assert_eq!(
            initial.net().unwrap(),
            result.brokerage_fee_amount + result.structuring_fee_amount
        );
    }

    #[test]
    fn test_fees_at_maturity_only_at_term() {
        let global = GlobalConfig {
            brokerage_due_at_maturity: true,
            structuring_due_at_maturity: true,
            ..standard_global()
        };
        let result = compute_tranche(0, &TrancheInput::new(24), &global).unwrap();

        for entry in result.schedule.iter().filter(|e| e.timepoint < 24) {
            assert!(!entry.has_fees(), "fee before maturity at {}", entry.timepoint);
        }
        let last = result.schedule.last().unwrap();
        assert_eq!(last.timepoint, 24);
        assert_eq!(last.brokerage_fee, dec!(30_000));
        assert_eq!(last.structuring_fee, dec!(10_000));
    }

    // -----------------------------------------------------------------------
    // 6. Overrides and degenerate terms
    // -----------------------------------------------------------------------
    #[test]
    fn test_explicit_zero_crowd_rate_is_not_replaced() {
        let tranche = TrancheInput::new(12).with_crowd_rate(Decimal::ZERO);
        let result = compute_tranche(0, &tranche, &standard_global()).unwrap();

        assert_eq!(result.crowd_rate, Decimal::ZERO);
        assert_eq!(result.crowd_interest_per_year, Decimal::ZERO);
    }

    #[test]
    fn test_zero_term_is_rejected() {
        let err = compute_tranche(1, &TrancheInput::new(0), &standard_global()).unwrap_err();
        assert!(matches!(err, ZinsplanError::InvalidInput { .. }));
        assert!(err.to_string().contains("tranches[1].term_months"));
    }

    #[test]
    fn test_partial_quarter_warns() {
        let tranche = TrancheInput::new(14).with_crowd_rate(dec!(2.0));
        let result = compute_tranche(2, &tranche, &standard_global()).unwrap();

        let warning = result.warning.unwrap();
        assert!(warning.contains("tranche 3"), "{warning}");
        assert!(warning.contains("final 2 month(s)"), "{warning}");
        assert_eq!(result.schedule.last().unwrap().timepoint, 12);
    }

    #[test]
    fn test_zero_principal_gives_zero_interest() {
        let tranche = TrancheInput::new(12).with_principal(Decimal::ZERO);
        let global = GlobalConfig {
            structuring_fee: Decimal::ZERO,
            ..standard_global()
        };
        let result = compute_tranche(0, &tranche, &global).unwrap();

        assert_eq!(result.net_total, Decimal::ZERO);
        assert_eq!(result.warning, None);
    }

    // -----------------------------------------------------------------------
    // 7. Component summary
    // -----------------------------------------------------------------------
    #[test]
    fn test_component_summary() {
        let tranche = TrancheInput::new(24).with_crowd_rate(dec!(2.0));
        let result = compute_tranche(0, &tranche, &standard_global()).unwrap();
        let row = |c: Component| {
            result
                .components
                .iter()
                .find(|s| s.component == c)
                .cloned()
                .unwrap()
        };

        let all_in = row(Component::AllInInterest);
        assert_eq!(all_in.per_annum, dec!(50_000));
        assert_eq!(all_in.total_net, dec!(100_000));
        assert_eq!(all_in.total_gross, None);

        let crowd = row(Component::CrowdInterest);
        assert_eq!(crowd.total_net, dec!(40_000));
        assert_eq!(crowd.total_gross, Some(dec!(40_000)));

        let brokerage = row(Component::BrokerageFee);
        assert_eq!(brokerage.per_annum, dec!(15_000));
        assert_eq!(brokerage.total_gross, Some(dec!(35_700)));

        let service = row(Component::ServiceFee);
        assert_eq!(service.total_net, dec!(20_000));
        assert_eq!(service.total_gross, Some(dec!(23_800)));
    }

    // -----------------------------------------------------------------------
    // 8. Overflow and validation
    // -----------------------------------------------------------------------
    #[test]
    fn test_schedule_total_overflow_is_an_error() {
        // valid input whose term total exceeds the decimal range
        let tranche = TrancheInput::new(120)
            .with_principal(Decimal::MAX / dec!(4))
            .with_crowd_rate(dec!(100));
        let err = compute_tranche(0, &tranche, &standard_global()).unwrap_err();
        assert!(matches!(err, ZinsplanError::Overflow { .. }), "{err:?}");
    }

    #[test]
    fn test_invalid_global_rejected_on_direct_call() {
        let global = GlobalConfig {
            structuring_fee: dec!(-1),
            ..standard_global()
        };
        let err = compute_tranche(0, &TrancheInput::new(12), &global).unwrap_err();
        assert!(matches!(err, ZinsplanError::InvalidInput { .. }));
    }
}
