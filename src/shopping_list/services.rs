use std::collections::HashMap;
use std::fmt::Write;

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::AppResult;
use crate::membership::repo_types::CartLine;
use crate::store::Store;

/// One row of the shopping list: every cart line with this name and unit,
/// summed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub name: String,
    pub total: i64,
    pub unit: String,
}

/// Groups by `(name, unit)` in first-encounter order. Different units of the
/// same ingredient are kept apart.
pub fn summarize(lines: impl IntoIterator<Item = CartLine>) -> Vec<ShoppingItem> {
    let mut items: Vec<ShoppingItem> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for line in lines {
        let key = (line.name, line.measurement_unit);
        match index.get(&key) {
            Some(&i) => items[i].total += i64::from(line.amount),
            None => {
                index.insert(key.clone(), items.len());
                items.push(ShoppingItem {
                    name: key.0,
                    total: i64::from(line.amount),
                    unit: key.1,
                });
            }
        }
    }
    items
}

#[instrument(skip(store))]
pub async fn aggregate(store: &dyn Store, user_id: Uuid) -> AppResult<Vec<ShoppingItem>> {
    let mut tx = store.begin().await?;
    let lines = tx.cart_lines(user_id).await?;
    let line_count = lines.len();
    let items = summarize(lines);
    debug!(%user_id, line_count, groups = items.len(), "shopping list aggregated");
    Ok(items)
}

pub fn render(items: &[ShoppingItem]) -> String {
    let mut out = String::new();
    for item in items {
        // writing into a String cannot fail
        let _ = writeln!(out, "{} - {} {}", item.name, item.total, item.unit);
    }
    out
}
