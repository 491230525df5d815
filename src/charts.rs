use serde::Serialize;
use serde_json::Value;

use crate::models::Notice;
use crate::table::Table;

const WALLET_COLUMN: &str = "Miner Wallet";
const CHART_COLUMNS: [&str; 3] = ["Blocks Won", "WESO Earned", "Hashes Submitted"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub wallet: String,
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub title: String,
    pub axis: String,
    pub bars: Vec<Bar>,
}

/// First 7 + "..." + last 5 characters for addresses longer than 12.
pub fn shorten_wallet(wallet: &str) -> String {
    let chars: Vec<char> = wallet.chars().collect();
    if chars.len() <= 12 {
        return wallet.to_string();
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 5..].iter().collect();
    format!("{}...{}", head, tail)
}

/// One horizontal bar chart per metric column present, keyed by wallet.
pub fn bar_charts(table: &Table) -> (Vec<BarChart>, Vec<Notice>) {
    let wallets: Vec<String> = match table.column(WALLET_COLUMN) {
        Some(cells) => cells.map(cell_text).collect(),
        None => {
            let notice = Notice::warning(format!(
                "Cannot create charts by wallet: '{}' column is missing.",
                WALLET_COLUMN
            ));
            return (Vec::new(), vec![notice]);
        }
    };

    let mut charts = Vec::new();
    let mut notices = Vec::new();

    for column in CHART_COLUMNS {
        let cells = match table.column(column) {
            Some(cells) => cells,
            None => {
                notices.push(Notice::info(format!(
                    "Info: '{}' data not available for charting.",
                    column
                )));
                continue;
            }
        };

        let mut bars: Vec<Bar> = wallets
            .iter()
            .zip(cells)
            .filter_map(|(wallet, cell)| {
                cell.as_f64().map(|value| Bar {
                    wallet: wallet.clone(),
                    label: shorten_wallet(wallet),
                    value,
                })
            })
            .collect();
        bars.sort_by(|a, b| b.value.total_cmp(&a.value));

        charts.push(BarChart {
            title: format!("{} per Wallet Address", column),
            axis: column.to_string(),
            bars,
        });
    }

    (charts, notices)
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
