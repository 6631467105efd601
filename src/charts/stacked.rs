use crate::filter::FilteredView;
use crate::models::{Field, Metrics};
use serde::Serialize;
use std::collections::BTreeMap;

pub const TITLE: &str = "📚 Perbandingan Jumlah Dosen dan Mahasiswa per Provinsi (2017 & 2018)";
pub const NO_DATA_TITLE: &str = "Tidak ada data untuk ditampilkan";
pub const X_TITLE: &str = "Provinsi";
pub const Y_TITLE: &str = "Jumlah";
pub const LEGEND_TITLE: &str = "Kategori";
pub const HEIGHT: u32 = 600;

/// Stack order, bottom to top, with the series color.
pub const SERIES: [(Field, &str); 4] = [
    (Field::Lecturers2017, "#1f77b4"),
    (Field::Students2017, "#aec7e8"),
    (Field::Lecturers2018, "#ff7f0e"),
    (Field::Students2018, "#ffbb78"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackSeries {
    pub name: &'static str,
    pub color: &'static str,
    /// One value per category.
    pub values: Vec<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StackedBarChart<'a> {
    pub title: &'static str,
    pub x_title: &'static str,
    pub y_title: &'static str,
    pub legend_title: &'static str,
    pub barmode: &'static str,
    pub height: u32,
    pub no_data: bool,
    pub categories: Vec<&'a str>,
    pub totals: Vec<u64>,
    pub series: Vec<StackSeries>,
}

impl StackedBarChart<'_> {
    fn empty() -> Self {
        Self {
            title: NO_DATA_TITLE,
            x_title: X_TITLE,
            y_title: Y_TITLE,
            legend_title: LEGEND_TITLE,
            barmode: "stack",
            height: HEIGHT,
            no_data: true,
            categories: Vec::new(),
            totals: Vec::new(),
            series: Vec::new(),
        }
    }

    pub fn max_total(&self) -> u64 {
        self.totals.iter().copied().max().unwrap_or(0)
    }
}

/// Lecturer and student sums per province, provinces ordered by the
/// combined total, largest first.
pub fn build<'a>(filtered: &FilteredView<'a>) -> StackedBarChart<'a> {
    if filtered.is_empty() {
        return StackedBarChart::empty();
    }

    let mut sums: BTreeMap<&'a str, Metrics> = BTreeMap::new();
    for record in filtered.rows() {
        sums.entry(record.province.as_str())
            .or_default()
            .add(&record.metrics);
    }

    // BTreeMap order breaks ties by province name.
    let mut grouped: Vec<(&'a str, Metrics)> = sums.into_iter().collect();
    grouped.sort_by(|a, b| b.1.total().cmp(&a.1.total()));

    let series = SERIES
        .iter()
        .map(|(field, color)| StackSeries {
            name: field.column_name(),
            color: *color,
            values: grouped
                .iter()
                .map(|(_, metrics)| metrics.get(*field).unwrap_or(0))
                .collect(),
        })
        .collect();

    StackedBarChart {
        title: TITLE,
        x_title: X_TITLE,
        y_title: Y_TITLE,
        legend_title: LEGEND_TITLE,
        barmode: "stack",
        height: HEIGHT,
        no_data: false,
        categories: grouped.iter().map(|(province, _)| *province).collect(),
        totals: grouped.iter().map(|(_, metrics)| metrics.total()).collect(),
        series,
    }
}
