//! Column reconciliation against the canonical (reference) order.

use std::collections::HashSet;

use crate::config::MissingColumns;
use crate::model::Table;

/// Strip a trailing run of ASCII digits: `Earnings3` -> `Earnings`.
fn strip_trailing_digits(name: &str) -> &str {
    name.trim_end_matches(|c: char| c.is_ascii_digit())
}

/// Final column order for a table with `columns`, following `canonical`.
///
/// Canonical names keep their order. Each extra column is placed right after
/// the last name that contains its digit-stripped base, else appended. The
/// result holds every entry of `columns` exactly once and nothing else.
pub fn reconcile_columns(columns: &[String], canonical: &[String]) -> Vec<String> {
    let present: HashSet<&str> = columns.iter().map(String::as_str).collect();
    let known: HashSet<&str> = canonical.iter().map(String::as_str).collect();

    let mut order: Vec<String> = canonical.to_vec();
    for extra in columns.iter().filter(|c| !known.contains(c.as_str())) {
        let base = strip_trailing_digits(extra);
        let anchor = if base.is_empty() {
            None
        } else {
            order.iter().rposition(|c| c.contains(base))
        };
        match anchor {
            Some(pos) => order.insert(pos + 1, extra.clone()),
            None => order.push(extra.clone()),
        }
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<String> = Vec::with_capacity(columns.len());
    for name in order {
        if present.contains(name.as_str()) && seen.insert(name.clone()) {
            out.push(name);
        }
    }

    for name in columns {
        if seen.insert(name.clone()) {
            out.push(name.clone());
        }
    }

    out
}

/// Reorder `table` like the reference. With [`MissingColumns::Fill`], canonical
/// columns the table lacks are added as empty columns at their canonical slot.
pub fn reorder_like_reference(table: Table, canonical: &[String], missing: MissingColumns) -> Table {
    let mut order = reconcile_columns(table.columns(), canonical);

    if missing == MissingColumns::Fill {
        let absent: Vec<&String> = canonical.iter().filter(|c| !table.has_column(c)).collect();
        if !absent.is_empty() {
            log::debug!("filling {} canonical column(s) absent from every payroll file", absent.len());
        }
        for name in absent {
            let slot = canonical
                .iter()
                .take_while(|c| *c != name)
                .filter_map(|c| order.iter().position(|o| o == c))
                .max()
                .map(|p| p + 1)
                .unwrap_or(0);
            order.insert(slot, name.clone());
        }
    }

    table.select(&order)
}
