use super::count_by_province;
use crate::filter::FilteredView;
use serde::Serialize;

pub const TITLE: &str = "Jumlah Perguruan Tinggi per Provinsi";
pub const X_TITLE: &str = "Provinsi";
pub const Y_TITLE: &str = "Jumlah Perguruan Tinggi";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bar<'a> {
    pub province: &'a str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BarChart<'a> {
    pub title: &'static str,
    pub x_title: &'static str,
    pub y_title: &'static str,
    pub bars: Vec<Bar<'a>>,
}

impl BarChart<'_> {
    pub fn max_count(&self) -> usize {
        self.bars.iter().map(|bar| bar.count).max().unwrap_or(0)
    }
}

/// One bar per province present in the view, largest first.
pub fn build<'a>(filtered: &FilteredView<'a>) -> BarChart<'a> {
    let mut bars: Vec<Bar<'a>> = count_by_province(filtered.rows().iter().copied())
        .into_iter()
        .map(|(province, count)| Bar { province, count })
        .collect();
    bars.sort_by(|a, b| b.count.cmp(&a.count));

    BarChart {
        title: TITLE,
        x_title: X_TITLE,
        y_title: Y_TITLE,
        bars,
    }
}
