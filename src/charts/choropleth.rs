use super::{count_by_province, percentage_shares};
use crate::filter::FilteredView;
use crate::models::Dataset;
use geo::{Centroid, Geometry};
use serde::Serialize;

pub const TITLE: &str = "Sebaran Persentase Perguruan Tinggi per Provinsi";
pub const LEGEND_LABEL: &str = "Persentase Jumlah Perguruan Tinggi (%)";
pub const COLORMAP: &str = "Greens";

/// Color extremes, fixed by the unfiltered base set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorScale {
    pub colormap: &'static str,
    pub min: f64,
    pub max: f64,
}

impl ColorScale {
    /// Position of `value` on the scale, clamped to `0.0..=1.0`.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= f64::EPSILON {
            return if value > self.min { 1.0 } else { 0.0 };
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoroplethRegion<'a> {
    pub province: &'a str,
    pub count: usize,
    pub percentage: f64,
    /// Label anchor; absent for empty shapes.
    pub centroid: Option<[f64; 2]>,
    #[serde(skip)]
    pub geometry: &'a Geometry<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoroplethMap<'a> {
    pub title: &'static str,
    pub legend_label: &'static str,
    pub filtered_total: usize,
    pub scale: ColorScale,
    pub regions: Vec<ChoroplethRegion<'a>>,
}

/// Every province boundary of the base set, shaded by its share of the
/// filtered rows.
pub fn build<'a>(base: &'a Dataset, filtered: &FilteredView<'_>) -> ChoroplethMap<'a> {
    let filtered_counts = count_by_province(filtered.rows().iter().copied());
    let filtered_shares = percentage_shares(&filtered_counts);

    let regions = base
        .boundaries()
        .iter()
        .map(|boundary| {
            let province = boundary.province.as_str();
            let count = filtered_counts
                .iter()
                .find(|(name, _)| *name == province)
                .map(|(_, count)| *count)
                .unwrap_or(0);
            ChoroplethRegion {
                province,
                count,
                percentage: filtered_shares.get(province).copied().unwrap_or(0.0),
                centroid: boundary.geometry.centroid().map(|point| [point.x(), point.y()]),
                geometry: &boundary.geometry,
            }
        })
        .collect();

    ChoroplethMap {
        title: TITLE,
        legend_label: LEGEND_LABEL,
        filtered_total: filtered.len(),
        scale: base_scale(base),
        regions,
    }
}

/// Min/max of the per-province percentages over the whole base set.
pub fn base_scale(base: &Dataset) -> ColorScale {
    let shares = percentage_shares(&count_by_province(base.records()));
    let (min, max) = shares
        .values()
        .fold(None, |extremes: Option<(f64, f64)>, share| match extremes {
            None => Some((*share, *share)),
            Some((min, max)) => Some((min.min(*share), max.max(*share))),
        })
        .unwrap_or((0.0, 0.0));

    ColorScale {
        colormap: COLORMAP,
        min,
        max,
    }
}
