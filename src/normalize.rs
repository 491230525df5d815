use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::models::Notice;
use crate::table::Table;

#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizeError {
    #[error("malformed payload: {cause}")]
    MalformedShape { cause: String, raw_data: Value },
}

/// A column computed as the per-row sum of two source columns.
#[derive(Debug)]
pub struct DerivedSum {
    pub name: &'static str,
    pub left: &'static str,
    pub right: &'static str,
}

/// How one dataset is turned into a display table.
#[derive(Debug)]
pub struct TableSchema {
    pub drop: &'static [&'static str],
    pub derived: Option<DerivedSum>,
    /// Raw column names, in display order.
    pub column_order: &'static [&'static str],
    pub renames: &'static [(&'static str, &'static str)],
}

pub const LEADERBOARD: TableSchema = TableSchema {
    drop: &["nft_multiplier", "msgs_received"],
    derived: Some(DerivedSum {
        name: "crypto_earned",
        left: "crypto_paid",
        right: "crypto_pending",
    }),
    column_order: &[
        "wallet_addr",
        "blocks_won",
        "crypto_earned",
        "crypto_paid",
        "crypto_pending",
        "hashes_submitted",
    ],
    renames: &[
        ("wallet_addr", "Miner Wallet"),
        ("blocks_won", "Blocks Won"),
        ("crypto_earned", "WESO Earned"),
        ("crypto_paid", "WESO Paid"),
        ("crypto_pending", "WESO Pending"),
        ("hashes_submitted", "Hashes Submitted"),
    ],
};

pub const BLOCKS: TableSchema = TableSchema {
    drop: &["hashes_submitted", "exact"],
    derived: None,
    column_order: &[
        "block_number",
        "winner_wallet_addr",
        "block_hash",
        "active_miners",
    ],
    renames: &[
        ("block_number", "Block Number"),
        ("winner_wallet_addr", "Winner"),
        ("block_hash", "Block Hash"),
        ("active_miners", "Active Miners"),
    ],
};

#[derive(Debug)]
pub struct Normalized {
    pub table: Table,
    pub notices: Vec<Notice>,
}

/// Turns a raw payload into a display table. Fails as a whole if the payload
/// is not an array of objects; a missing column only produces a notice.
pub fn normalize(raw: Value, schema: &TableSchema) -> Result<Normalized, NormalizeError> {
    let records = match as_records(&raw) {
        Ok(records) => records,
        Err(cause) => {
            return Err(NormalizeError::MalformedShape {
                cause,
                raw_data: raw,
            })
        }
    };

    let mut table = Table::from_records(&records);
    let mut notices = Vec::new();

    for column in schema.drop {
        table.drop_column(column);
    }

    if let Some(derived) = &schema.derived {
        if let Some(notice) = derive_sum(&mut table, derived) {
            notices.push(notice);
        }
    }

    table.reorder(schema.column_order);
    table.rename(schema.renames);

    Ok(Normalized { table, notices })
}

fn as_records(raw: &Value) -> Result<Vec<Map<String, Value>>, String> {
    let items = match raw {
        Value::Array(items) => items,
        other => return Err(format!("expected an array of records, got {}", kind_of(other))),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map.clone()),
            other => Err(format!("record {} is {}, not an object", i, kind_of(other))),
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn derive_sum(table: &mut Table, derived: &DerivedSum) -> Option<Notice> {
    let (left, right) = match (table.column_index(derived.left), table.column_index(derived.right)) {
        (Some(left), Some(right)) => (left, right),
        _ => {
            let zeros = vec![Value::from(0.0); table.rows.len()];
            table.set_column(derived.name, zeros);
            return Some(Notice::warning(format!(
                "Could not calculate '{}': '{}' or '{}' column missing.",
                derived.name, derived.left, derived.right
            )));
        }
    };

    let sums = table
        .rows
        .iter()
        .map(|row| add_cells(&row[left], &row[right]))
        .collect();
    table.set_column(derived.name, sums);
    None
}

/// Integer + integer stays an integer; anything non-numeric leaves a gap.
fn add_cells(left: &Value, right: &Value) -> Value {
    if let (Some(l), Some(r)) = (left.as_i64(), right.as_i64()) {
        if let Some(sum) = l.checked_add(r) {
            return Value::from(sum);
        }
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => Number::from_f64(l + r).map_or(Value::Null, Value::Number),
        _ => Value::Null,
    }
}
