//! Aggregations behind the dashboard's map, charts and headline numbers.
//!
//! Every builder is a pure function of the base set and/or a filtered view
//! and returns a serializable description that the renderer draws.

pub mod bar;
pub mod choropleth;
pub mod stacked;
pub mod summary;

use crate::filter::FilteredView;
use crate::models::{Dataset, InstitutionRecord};
use serde::Serialize;
use std::collections::HashMap;

pub use bar::BarChart;
pub use choropleth::ChoroplethMap;
pub use stacked::StackedBarChart;
pub use summary::Summary;

/// Row count per province, in first-appearance order.
pub fn count_by_province<'a>(
    rows: impl IntoIterator<Item = &'a InstitutionRecord>,
) -> Vec<(&'a str, usize)> {
    let mut order: Vec<(&'a str, usize)> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for record in rows {
        let province = record.province.as_str();
        match index.get(province) {
            Some(position) => order[*position].1 += 1,
            None => {
                index.insert(province, order.len());
                order.push((province, 1));
            }
        }
    }

    order
}

/// Each province's share of the total, in percent. Empty input gives an
/// empty map.
pub fn percentage_shares<'a>(counts: &[(&'a str, usize)]) -> HashMap<&'a str, f64> {
    let total: usize = counts.iter().map(|(_, count)| count).sum();
    if total == 0 {
        return HashMap::new();
    }
    counts
        .iter()
        .map(|(province, count)| (*province, *count as f64 / total as f64 * 100.0))
        .collect()
}

/// Everything derived for one interaction.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView<'a> {
    pub summary: Summary<'a>,
    pub choropleth: ChoroplethMap<'a>,
    pub bar_chart: BarChart<'a>,
    pub stacked_bar: StackedBarChart<'a>,
    /// Rows left in the table after the name search.
    pub table_rows: usize,
}

impl<'a> DashboardView<'a> {
    /// Charts and summary use `filtered`; the name search only narrows the
    /// table, so its row count is passed separately.
    pub fn build(base: &'a Dataset, filtered: &FilteredView<'a>, table: &FilteredView<'a>) -> Self {
        Self {
            summary: summary::build(filtered),
            choropleth: choropleth::build(base, filtered),
            bar_chart: bar::build(filtered),
            stacked_bar: stacked::build(filtered),
            table_rows: table.len(),
        }
    }
}
