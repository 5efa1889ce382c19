use colored::Colorize;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use crate::commands::zinsplan::period_label;

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) if result.contains_key("tranches") => {
                print_zinsplan(result, map);
            }
            Some(result) => {
                print_flat_object(result);
                print_envelope_notes(map);
            }
            None => print_flat_object(value),
        },
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_zinsplan(result: &Map<String, Value>, envelope: &Map<String, Value>) {
    if let Some(Value::String(error)) = result.get("error") {
        println!("{}", error.red().bold());
        return;
    }

    let mut totals = Builder::default();
    totals.push_record(["Total", "Amount"]);
    for key in ["total_principal", "total_net", "total_gross"] {
        totals.push_record([key, &money(result.get(key))]);
    }
    println!("{}", Table::from(totals));

    if let Some(Value::Array(tranches)) = result.get("tranches") {
        for tranche in tranches.iter().filter_map(Value::as_object) {
            print_tranche(tranche);
        }
    }

    print_envelope_notes(envelope);
}

fn print_tranche(tranche: &Map<String, Value>) {
    let number = tranche.get("index").and_then(Value::as_u64).unwrap_or(0) + 1;
    let months = tranche.get("term_months").and_then(Value::as_u64).unwrap_or(0);
    println!(
        "\n{}",
        format!(
            "Tranche {number} — term {months} months ({} years)",
            decimal_text(tranche.get("term_years"), 1)
        )
        .bold()
    );

    let mut components = Builder::default();
    components.push_record(["Component", "Per annum", "Total net", "Total gross"]);
    components.push_record([
        "principal".to_string(),
        "-".to_string(),
        money(tranche.get("principal")),
        "-".to_string(),
    ]);
    if let Some(Value::Array(rows)) = tranche.get("components") {
        for row in rows {
            components.push_record([
                text(row.get("component")),
                money(row.get("per_annum")),
                money(row.get("total_net")),
                money(row.get("total_gross")),
            ]);
        }
    }
    components.push_record([
        "total".to_string(),
        money(tranche.get("per_annum_net")),
        money(tranche.get("net_total")),
        money(tranche.get("gross_total")),
    ]);
    println!("{}", Table::from(components));

    if let Some(Value::Array(entries)) = tranche.get("schedule") {
        let mut schedule = Builder::default();
        schedule.push_record([
            "Period",
            "Brokerage",
            "Structuring",
            "Crowd interest",
            "Service fee",
            "Net",
            "VAT",
            "Gross",
        ]);
        for entry in entries {
            schedule.push_record(schedule_row(entry));
        }
        println!("{}", Table::from(schedule));
    }

    if let Some(Value::String(warning)) = tranche.get("warning") {
        println!("{}", warning.yellow());
    }
}

fn print_envelope_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

/// One schedule line with its net, VAT and gross sums.
fn schedule_row(entry: &Value) -> Vec<String> {
    let period = entry
        .get("timepoint")
        .and_then(Value::as_u64)
        .and_then(|t| u32::try_from(t).ok())
        .map(period_label)
        .unwrap_or_else(|| "-".to_string());
    let net = sum_fields(
        entry,
        &["brokerage_fee", "structuring_fee", "crowd_interest", "service_fee"],
    );
    let vat = sum_fields(
        entry,
        &["brokerage_fee_vat", "structuring_fee_vat", "service_fee_vat"],
    );
    let gross = net.zip(vat).and_then(|(n, v)| n.checked_add(v));

    vec![
        period,
        money(entry.get("brokerage_fee")),
        money(entry.get("structuring_fee")),
        money(entry.get("crowd_interest")),
        money(entry.get("service_fee")),
        money_of(net),
        money_of(vat),
        money_of(gross),
    ]
}

/// Sum of the named decimal fields; `None` if one is missing or the sum
/// overflows.
fn sum_fields(entry: &Value, keys: &[&str]) -> Option<Decimal> {
    keys.iter().try_fold(Decimal::ZERO, |acc, key| {
        acc.checked_add(parse_decimal(entry.get(*key)?)?)
    })
}

/// Decimals arrive as strings; accept plain numbers too.
fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

fn decimal_text(value: Option<&Value>, places: u32) -> String {
    format_decimal(value.and_then(parse_decimal), places)
}

fn format_decimal(value: Option<Decimal>, places: u32) -> String {
    match value {
        Some(d) => format!("{:.*}", places as usize, d.round_dp(places)),
        None => "-".to_string(),
    }
}

fn money(value: Option<&Value>) -> String {
    decimal_text(value, 2)
}

fn money_of(value: Option<Decimal>) -> String {
    format_decimal(value, 2)
}

fn text(value: Option<&Value>) -> String {
    value.map(format_value).unwrap_or_default()
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(Some(&json!("1234.5"))), "1234.50");
        assert_eq!(money(Some(&json!(-40000))), "-40000.00");
        assert_eq!(money(None), "-");
        assert_eq!(decimal_text(Some(&json!("1.1666666667")), 1), "1.2");
    }

    #[test]
    fn test_schedule_row_shows_net_vat_and_gross() {
        let entry = json!({
            "timepoint": 24,
            "brokerage_fee": "30000",
            "brokerage_fee_vat": "5700.00",
            "structuring_fee": "0",
            "structuring_fee_vat": "0",
            "crowd_interest": "5000",
            "service_fee": "2500",
            "service_fee_vat": "475.00",
        });
        let row = schedule_row(&entry);

        assert_eq!(row[0], "Year 2, Q4");
        assert_eq!(row[5], "37500.00");
        assert_eq!(row[6], "6175.00");
        assert_eq!(row[7], "43675.00");
    }

    #[test]
    fn test_schedule_row_out_of_range_timepoint() {
        let entry = json!({ "timepoint": u64::from(u32::MAX) + 3 });
        let row = schedule_row(&entry);

        assert_eq!(row[0], "-");
        assert_eq!(row[5], "-", "missing amounts give no net");
        assert_eq!(row[7], "-");
    }
}
