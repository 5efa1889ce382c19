//! Zinsplan engine for mezzanine financings.
//!
//! A financing is split into one or more tranches. Each tranche pays a
//! contractual all-in rate, of which the crowd investors receive the crowd
//! rate and the arranger keeps the residual as a service fee once the
//! one-time brokerage and structuring fees are amortised over the term.
//! Interest and service fee are paid quarterly; fees either upfront or at
//! maturity. All fee components carry 19% VAT.
//!
//! The engine is a set of pure functions: the presentation layer hands over
//! a [`ZinsplanInput`] and renders whatever comes back. Nothing is cached
//! between runs.

pub mod aggregate;
pub mod engine;
pub mod input;
pub mod schedule;
pub mod tranche;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::ZinsplanError;
use crate::types::{Money, Percent};
use crate::ZinsplanResult;

pub use aggregate::{aggregate, AggregateResult, CombinedScheduleEntry, TimepointTotal};
pub use engine::{calculate_zinsplan, recalculate};
pub use input::{GlobalConfig, ResolvedTranche, TrancheInput, ZinsplanInput};
pub use schedule::{build_schedule, PaymentScheduleEntry, ScheduleParams, ScheduleTotals, VAT_RATE};
pub use tranche::{compute_tranche, Component, ComponentSummary, TrancheResult};

/// Months per year, used to turn a term into a year fraction
pub const MONTHS_PER_YEAR: Decimal = dec!(12);

const PERCENT: Decimal = dec!(100);

/// `rate`% of `base`, failing instead of panicking on overflow.
pub(crate) fn percent_of(rate: Percent, base: Money, context: &str) -> ZinsplanResult<Money> {
    (rate / PERCENT)
        .checked_mul(base)
        .ok_or_else(|| ZinsplanError::Overflow {
            context: context.to_string(),
        })
}

pub(crate) fn checked_div(
    numerator: Decimal,
    denominator: Decimal,
    context: &str,
) -> ZinsplanResult<Decimal> {
    if denominator.is_zero() {
        return Err(ZinsplanError::DivisionByZero {
            context: context.to_string(),
        });
    }
    numerator
        .checked_div(denominator)
        .ok_or_else(|| ZinsplanError::Overflow {
            context: context.to_string(),
        })
}

pub(crate) fn checked_sub(a: Decimal, b: Decimal, context: &str) -> ZinsplanResult<Decimal> {
    a.checked_sub(b).ok_or_else(|| ZinsplanError::Overflow {
        context: context.to_string(),
    })
}

pub(crate) fn checked_add(a: Decimal, b: Decimal, context: &str) -> ZinsplanResult<Decimal> {
    a.checked_add(b).ok_or_else(|| ZinsplanError::Overflow {
        context: context.to_string(),
    })
}

pub(crate) fn checked_mul(a: Decimal, b: Decimal, context: &str) -> ZinsplanResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| ZinsplanError::Overflow {
        context: context.to_string(),
    })
}

/// Sum of `values`, failing on the first overflowing addition.
pub(crate) fn checked_sum(
    values: impl IntoIterator<Item = Decimal>,
    context: &str,
) -> ZinsplanResult<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| checked_add(acc, v, context))
}
