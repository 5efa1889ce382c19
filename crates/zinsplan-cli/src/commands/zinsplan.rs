use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use zinsplan_core::mezzanine::input::DEFAULT_TERM_MONTHS;
use zinsplan_core::mezzanine::{self, GlobalConfig, TrancheInput, ZinsplanInput};
use zinsplan_core::{Months, ZinsplanResult};

use crate::input;

/// Where the input document comes from, plus flag overrides on top of it.
#[derive(Args, Debug, Default)]
pub struct InputArgs {
    /// Path to JSON or YAML input file (stdin is read when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Default principal for tranches without their own
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Default annual all-in rate in percent
    #[arg(long)]
    pub all_in_rate: Option<Decimal>,

    /// Default annual crowd rate in percent
    #[arg(long)]
    pub crowd_rate: Option<Decimal>,

    /// Brokerage fee in percent of principal
    #[arg(long)]
    pub brokerage_fee_rate: Option<Decimal>,

    /// Flat structuring fee
    #[arg(long)]
    pub structuring_fee: Option<Decimal>,

    /// Charge the brokerage fee at maturity
    #[arg(long)]
    pub brokerage_at_maturity: bool,

    /// Charge the structuring fee at maturity
    #[arg(long)]
    pub structuring_at_maturity: bool,

    /// Tranche term in months; repeat for several tranches. Replaces the
    /// tranches of the input document.
    #[arg(long = "term")]
    pub terms: Vec<Months>,
}

/// Arguments for the full calculation
#[derive(Args)]
pub struct CalculateArgs {
    #[command(flatten)]
    pub source: InputArgs,
}

/// Arguments for the combined schedule
#[derive(Args)]
pub struct ScheduleArgs {
    #[command(flatten)]
    pub source: InputArgs,
}

pub fn run_calculate(args: CalculateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let zinsplan_input = resolve_input(&args.source)?;
    let result = mezzanine::calculate_zinsplan(&zinsplan_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let zinsplan_input = resolve_input(&args.source)?;
    let result = mezzanine::aggregate(&zinsplan_input.global, &zinsplan_input.tranches)?;
    let rows = result
        .combined_schedule
        .iter()
        .map(|c| -> ZinsplanResult<Value> {
            let e = &c.entry;
            Ok(json!({
                "period": period_label(e.timepoint),
                "tranche": c.tranche + 1,
                "month": e.timepoint,
                "brokerage_fee": e.brokerage_fee.round_dp(2),
                "structuring_fee": e.structuring_fee.round_dp(2),
                "crowd_interest": e.crowd_interest.round_dp(2),
                "service_fee": e.service_fee.round_dp(2),
                "net": e.net()?.round_dp(2),
                "vat": e.vat()?.round_dp(2),
                "gross": e.gross()?.round_dp(2),
            }))
        })
        .collect::<ZinsplanResult<Vec<_>>>()?;
    Ok(Value::Array(rows))
}

pub fn run_template() -> Result<Value, Box<dyn std::error::Error>> {
    Ok(serde_json::to_value(ZinsplanInput::default())?)
}

/// Load the input document (file, stdin, or built-in defaults) and apply
/// the command-line overrides.
pub fn resolve_input(args: &InputArgs) -> Result<ZinsplanInput, Box<dyn std::error::Error>> {
    let mut zinsplan_input: ZinsplanInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(document) = input::stdin::read_stdin()? {
        document
    } else {
        ZinsplanInput::new(
            GlobalConfig::default(),
            vec![TrancheInput::new(DEFAULT_TERM_MONTHS)],
        )
    };
    apply_overrides(&mut zinsplan_input, args);
    Ok(zinsplan_input)
}

fn apply_overrides(zinsplan_input: &mut ZinsplanInput, args: &InputArgs) {
    let global = &mut zinsplan_input.global;
    if let Some(principal) = args.principal {
        global.default_principal = principal;
    }
    if let Some(rate) = args.all_in_rate {
        global.default_all_in_rate = rate;
    }
    if let Some(rate) = args.crowd_rate {
        global.default_crowd_rate = rate;
    }
    if let Some(rate) = args.brokerage_fee_rate {
        global.brokerage_fee_rate = rate;
    }
    if let Some(fee) = args.structuring_fee {
        global.structuring_fee = fee;
    }
    global.brokerage_due_at_maturity |= args.brokerage_at_maturity;
    global.structuring_due_at_maturity |= args.structuring_at_maturity;

    if !args.terms.is_empty() {
        zinsplan_input.tranches = args.terms.iter().copied().map(TrancheInput::new).collect();
    }
}

/// "Initial" for the disbursement date, otherwise the contract year and
/// quarter the month offset falls into.
pub fn period_label(timepoint: Months) -> String {
    if timepoint == 0 {
        return "Initial".to_string();
    }
    let year = (timepoint - 1) / 12 + 1;
    let quarter = (timepoint - 1) % 12 / 3 + 1;
    format!("Year {year}, Q{quarter}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_period_labels() {
        assert_eq!(period_label(0), "Initial");
        assert_eq!(period_label(3), "Year 1, Q1");
        assert_eq!(period_label(12), "Year 1, Q4");
        assert_eq!(period_label(15), "Year 2, Q1");
        assert_eq!(period_label(24), "Year 2, Q4");
        assert_eq!(period_label(14), "Year 2, Q1");
    }

    #[test]
    fn test_flag_overrides_apply_to_globals() {
        let mut zinsplan_input = ZinsplanInput::default();
        let args = InputArgs {
            crowd_rate: Some(dec!(2.0)),
            structuring_fee: Some(dec!(0)),
            brokerage_at_maturity: true,
            ..InputArgs::default()
        };
        apply_overrides(&mut zinsplan_input, &args);

        assert_eq!(zinsplan_input.global.default_crowd_rate, dec!(2.0));
        assert_eq!(zinsplan_input.global.structuring_fee, dec!(0));
        assert!(zinsplan_input.global.brokerage_due_at_maturity);
        assert!(!zinsplan_input.global.structuring_due_at_maturity);
        assert_eq!(zinsplan_input.tranches.len(), 1, "tranches untouched without --term");
    }

    #[test]
    fn test_terms_replace_tranches_with_inheriting_ones() {
        let mut zinsplan_input = ZinsplanInput::default();
        let args = InputArgs {
            terms: vec![12, 36],
            principal: Some(dec!(400_000)),
            ..InputArgs::default()
        };
        apply_overrides(&mut zinsplan_input, &args);

        assert_eq!(zinsplan_input.tranches.len(), 2);
        let resolved = zinsplan_input.tranches[1].resolve(&zinsplan_input.global);
        assert_eq!(resolved.term_months, 36);
        assert_eq!(resolved.principal, dec!(400_000));
    }
}
