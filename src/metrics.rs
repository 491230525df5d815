use serde::Serialize;
use serde_json::Value;

use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Integer total, default 0.
    Count,
    /// Decimal total rounded to 6 places, default 0.0.
    Amount,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricSpec {
    pub column: &'static str,
    pub label: &'static str,
    pub kind: MetricKind,
}

pub const METRIC_SPECS: [MetricSpec; 3] = [
    MetricSpec {
        column: "Blocks Won",
        label: "Total Blocks Won",
        kind: MetricKind::Count,
    },
    MetricSpec {
        column: "WESO Earned",
        label: "Total WESO Earned",
        kind: MetricKind::Amount,
    },
    MetricSpec {
        column: "Hashes Submitted",
        label: "Total Hashes Submitted",
        kind: MetricKind::Count,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(i64),
    Amount(f64),
}

impl MetricValue {
    fn default_for(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Count => MetricValue::Count(0),
            MetricKind::Amount => MetricValue::Amount(0.0),
        }
    }

    /// Value with thousands separators, for display only.
    pub fn grouped(&self) -> String {
        match *self {
            MetricValue::Count(n) => group_thousands(&n.to_string()),
            MetricValue::Amount(v) => {
                let fixed = format!("{:.6}", v);
                let trimmed = fixed.trim_end_matches('0');
                let trimmed = if trimmed.ends_with('.') {
                    format!("{}0", trimmed)
                } else {
                    trimmed.to_string()
                };
                match trimmed.split_once('.') {
                    Some((int, frac)) => format!("{}.{}", group_thousands(int), frac),
                    None => group_thousands(&trimmed),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: MetricValue,
    pub available: bool,
    pub display: String,
}

/// One total per `MetricSpec`, in input order. A missing column yields the default
/// value and a "(N/A)" label instead of an error.
pub fn aggregate(table: &Table, specs: &[MetricSpec]) -> Vec<Metric> {
    specs
        .iter()
        .map(|spec| {
            let (label, value, available) = match table.column(spec.column) {
                Some(cells) => (spec.label.to_string(), sum_cells(cells, spec.kind), true),
                None => (
                    format!("{} (N/A)", spec.label),
                    MetricValue::default_for(spec.kind),
                    false,
                ),
            };
            Metric {
                display: value.grouped(),
                label,
                value,
                available,
            }
        })
        .collect()
}

/// Gaps and non-numeric cells are skipped. A fractional cell in a count
/// column turns the total into an unrounded amount.
fn sum_cells<'a>(cells: impl Iterator<Item = &'a Value>, kind: MetricKind) -> MetricValue {
    let mut int_total: i64 = 0;
    let mut float_total = 0.0_f64;
    let mut fractional = false;

    for cell in cells {
        if let Some(n) = cell.as_i64() {
            int_total = int_total.saturating_add(n);
            float_total += n as f64;
        } else if let Some(n) = cell.as_f64() {
            fractional = true;
            float_total += n;
        }
    }

    match kind {
        MetricKind::Count if !fractional => MetricValue::Count(int_total),
        MetricKind::Count => MetricValue::Amount(float_total),
        MetricKind::Amount => MetricValue::Amount(round6(float_total)),
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Inserts a comma every three digits of an integer string.
pub fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("{}{}", sign, out)
}
