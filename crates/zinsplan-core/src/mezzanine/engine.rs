//! Engine entry points.
//!
//! [`calculate_zinsplan`] returns errors to the caller and wraps the result
//! in the standard computation envelope. [`recalculate`] is for reactive
//! callers that rerun on every input change: it never fails and reports a
//! failed run through [`AggregateResult::error`].

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tracing::{debug, error};

use crate::types::{with_metadata, ComputationOutput};
use crate::ZinsplanResult;

use super::aggregate::{aggregate, AggregateResult};
use super::input::ZinsplanInput;
use super::schedule::VAT_RATE;

/// Compute the full Zinsplan for `input`.
pub fn calculate_zinsplan(
    input: &ZinsplanInput,
) -> ZinsplanResult<ComputationOutput<AggregateResult>> {
    let start = Instant::now();

    let result = aggregate(&input.global, &input.tranches)?;
    let warnings: Vec<String> = result
        .tranches
        .iter()
        .filter_map(|t| t.warning.clone())
        .collect();

    let elapsed = start.elapsed().as_micros() as u64;
    debug!(elapsed_us = elapsed, "zinsplan calculated");

    Ok(with_metadata(
        "Mezzanine Zinsplan — quarterly crowd interest and residual service fee with one-time fees amortised straight-line",
        &serde_json::json!({
            "tranches": input.tranches.len(),
            "payment_frequency": "quarterly (every 3 months from disbursement)",
            "vat_rate": VAT_RATE,
            "vat_applies_to": ["brokerage_fee", "structuring_fee", "service_fee"],
            "fee_amortisation": "straight-line over term",
            "brokerage_due_at_maturity": input.global.brokerage_due_at_maturity,
            "structuring_due_at_maturity": input.global.structuring_due_at_maturity,
        }),
        warnings,
        elapsed,
        result,
    ))
}

/// Compute the Zinsplan, turning any failure into an all-zero result with
/// `error` set. Never returns an error and never panics.
pub fn recalculate(input: &ZinsplanInput) -> AggregateResult {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        aggregate(&input.global, &input.tranches)
    }));

    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            error!(error = %e, "zinsplan calculation failed");
            AggregateResult::failed(e)
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unexpected failure".to_string());
            error!(error = %message, "zinsplan calculation panicked");
            AggregateResult::failed(message)
        }
    }
}
