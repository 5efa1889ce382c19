//! Quarterly payment schedule for a single tranche.
//!
//! Timepoint 0 carries the one-time fees that are due at disbursement.
//! Every full quarter (months 3, 6, 9, ... up to the term) carries a quarter
//! of the annual crowd interest and service fee. Fees due at maturity land
//! on the entry dated at the term: merged into the last quarterly entry when
//! the term is a whole number of quarters, appended as a separate entry
//! otherwise.
//!
//! All arithmetic is checked; an overflowing amount is an
//! [`Overflow`](crate::error::ZinsplanError::Overflow) error.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Months};
use crate::ZinsplanResult;

use super::{checked_add, checked_div, checked_mul, checked_sum};

/// VAT charged on brokerage, structuring and service fees
pub const VAT_RATE: Decimal = dec!(0.19);

pub const MONTHS_PER_QUARTER: Months = 3;

const QUARTERS_PER_YEAR: Decimal = dec!(4);

/// One dated line of the schedule. Amounts are net unless the field name
/// ends in `_vat`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentScheduleEntry {
    /// Month offset from the start of the tranche
    pub timepoint: Months,
    pub brokerage_fee: Money,
    pub brokerage_fee_vat: Money,
    pub structuring_fee: Money,
    pub structuring_fee_vat: Money,
    pub crowd_interest: Money,
    pub service_fee: Money,
    pub service_fee_vat: Money,
}

impl PaymentScheduleEntry {
    pub fn at(timepoint: Months) -> Self {
        Self {
            timepoint,
            ..Self::default()
        }
    }

    pub fn net(&self) -> ZinsplanResult<Money> {
        checked_sum(
            [
                self.brokerage_fee,
                self.structuring_fee,
                self.crowd_interest,
                self.service_fee,
            ],
            "schedule entry net",
        )
    }

    /// Crowd interest carries no VAT.
    pub fn vat(&self) -> ZinsplanResult<Money> {
        checked_sum(
            [
                self.brokerage_fee_vat,
                self.structuring_fee_vat,
                self.service_fee_vat,
            ],
            "schedule entry VAT",
        )
    }

    pub fn gross(&self) -> ZinsplanResult<Money> {
        checked_add(self.net()?, self.vat()?, "schedule entry gross")
    }

    pub fn has_fees(&self) -> bool {
        !self.brokerage_fee.is_zero() || !self.structuring_fee.is_zero()
    }

    fn add_brokerage_fee(&mut self, amount: Money) -> ZinsplanResult<()> {
        self.brokerage_fee = checked_add(self.brokerage_fee, amount, "brokerage fee")?;
        self.brokerage_fee_vat =
            checked_add(self.brokerage_fee_vat, vat_on(amount)?, "brokerage fee VAT")?;
        Ok(())
    }

    fn add_structuring_fee(&mut self, amount: Money) -> ZinsplanResult<()> {
        self.structuring_fee = checked_add(self.structuring_fee, amount, "structuring fee")?;
        self.structuring_fee_vat =
            checked_add(self.structuring_fee_vat, vat_on(amount)?, "structuring fee VAT")?;
        Ok(())
    }
}

/// Amounts needed to lay out one tranche's schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleParams {
    pub term_months: Months,
    pub brokerage_fee: Money,
    pub structuring_fee: Money,
    pub crowd_interest_per_year: Money,
    pub service_fee_per_year: Money,
    pub brokerage_due_at_maturity: bool,
    pub structuring_due_at_maturity: bool,
}

/// Build the schedule, ordered by strictly ascending timepoint.
pub fn build_schedule(params: &ScheduleParams) -> ZinsplanResult<Vec<PaymentScheduleEntry>> {
    let quarters = params.term_months / MONTHS_PER_QUARTER;
    let mut schedule = Vec::with_capacity(quarters as usize + 2);

    let brokerage_upfront = !params.brokerage_due_at_maturity;
    let structuring_upfront = !params.structuring_due_at_maturity;

    if brokerage_upfront || structuring_upfront {
        let mut initial = PaymentScheduleEntry::at(0);
        if brokerage_upfront {
            initial.add_brokerage_fee(params.brokerage_fee)?;
        }
        if structuring_upfront {
            initial.add_structuring_fee(params.structuring_fee)?;
        }
        schedule.push(initial);
    }

    let crowd_interest = checked_div(
        params.crowd_interest_per_year,
        QUARTERS_PER_YEAR,
        "quarterly crowd interest",
    )?;
    let service_fee = checked_div(
        params.service_fee_per_year,
        QUARTERS_PER_YEAR,
        "quarterly service fee",
    )?;
    let service_fee_vat = vat_on(service_fee)?;
    for timepoint in quarterly_timepoints(params.term_months) {
        schedule.push(PaymentScheduleEntry {
            timepoint,
            crowd_interest,
            service_fee,
            service_fee_vat,
            ..PaymentScheduleEntry::default()
        });
    }

    if params.brokerage_due_at_maturity || params.structuring_due_at_maturity {
        let lands_on_last = schedule
            .last()
            .is_some_and(|last| last.timepoint == params.term_months);
        if !lands_on_last {
            schedule.push(PaymentScheduleEntry::at(params.term_months));
        }
        if let Some(maturity) = schedule.last_mut() {
            if params.brokerage_due_at_maturity {
                maturity.add_brokerage_fee(params.brokerage_fee)?;
            }
            if params.structuring_due_at_maturity {
                maturity.add_structuring_fee(params.structuring_fee)?;
            }
        }
    }

    Ok(schedule)
}

/// Month offsets of every full quarter within the term.
pub fn quarterly_timepoints(term_months: Months) -> impl Iterator<Item = Months> {
    (1..=term_months / MONTHS_PER_QUARTER).map(|quarter| quarter * MONTHS_PER_QUARTER)
}

pub fn vat_on(amount: Money) -> ZinsplanResult<Money> {
    checked_mul(amount, VAT_RATE, "VAT")
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

/// Column sums over a schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleTotals {
    pub brokerage_fee: Money,
    pub brokerage_fee_vat: Money,
    pub structuring_fee: Money,
    pub structuring_fee_vat: Money,
    pub crowd_interest: Money,
    pub service_fee: Money,
    pub service_fee_vat: Money,
}

impl ScheduleTotals {
    pub fn from_entries(entries: &[PaymentScheduleEntry]) -> ZinsplanResult<Self> {
        let column = |field: fn(&PaymentScheduleEntry) -> Money, context: &str| {
            checked_sum(entries.iter().map(field), context)
        };

        Ok(Self {
            brokerage_fee: column(|e| e.brokerage_fee, "total brokerage fee")?,
            brokerage_fee_vat: column(|e| e.brokerage_fee_vat, "total brokerage fee VAT")?,
            structuring_fee: column(|e| e.structuring_fee, "total structuring fee")?,
            structuring_fee_vat: column(|e| e.structuring_fee_vat, "total structuring fee VAT")?,
            crowd_interest: column(|e| e.crowd_interest, "total crowd interest")?,
            service_fee: column(|e| e.service_fee, "total service fee")?,
            service_fee_vat: column(|e| e.service_fee_vat, "total service fee VAT")?,
        })
    }

    pub fn net(&self) -> ZinsplanResult<Money> {
        checked_sum(
            [
                self.brokerage_fee,
                self.structuring_fee,
                self.crowd_interest,
                self.service_fee,
            ],
            "net total",
        )
    }

    pub fn vat(&self) -> ZinsplanResult<Money> {
        checked_sum(
            [
                self.brokerage_fee_vat,
                self.structuring_fee_vat,
                self.service_fee_vat,
            ],
            "VAT total",
        )
    }

    pub fn gross(&self) -> ZinsplanResult<Money> {
        checked_add(self.net()?, self.vat()?, "gross total")
    }
}
