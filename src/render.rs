use crate::charts::choropleth::ChoroplethMap;
use crate::charts::{BarChart, DashboardView, StackedBarChart};
use crate::error::{DashboardError, Result};
use crate::models::RenderConfig;
use geo::{BoundingRect, Geometry};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::info;

pub const MAP_FILE_NAME: &str = "choropleth.svg";
pub const BAR_FILE_NAME: &str = "bar_chart.svg";
pub const STACKED_FILE_NAME: &str = "stacked_bar.svg";

const LEGEND_WIDTH: u32 = 160;
const EDGE_COLOR: RGBColor = RGBColor(204, 204, 204);
// Used when no province has a boundary.
const FALLBACK_EXTENT: ([f64; 2], [f64; 2]) = ([94.0, 142.0], [-12.0, 7.0]);

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for DashboardError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        DashboardError::Render(err.to_string())
    }
}

/// Linear two-stop color ramp.
#[derive(Debug, Clone, Copy)]
pub struct ColorRamp {
    low: RGBColor,
    high: RGBColor,
}

pub const GREENS: ColorRamp = ColorRamp {
    low: RGBColor(247, 252, 245),
    high: RGBColor(0, 68, 27),
};

pub const BLUES: ColorRamp = ColorRamp {
    low: RGBColor(198, 219, 239),
    high: RGBColor(8, 48, 107),
};

impl ColorRamp {
    pub fn at(&self, position: f64) -> RGBColor {
        let t = if position.is_finite() { position.clamp(0.0, 1.0) } else { 0.0 };
        let mix = |low: u8, high: u8| (low as f64 + (high as f64 - low as f64) * t).round() as u8;
        RGBColor(
            mix(self.low.0, self.high.0),
            mix(self.low.1, self.high.1),
            mix(self.low.2, self.high.2),
        )
    }
}

/// `#rrggbb` to a color; anything else renders black.
pub fn parse_hex_color(hex: &str) -> RGBColor {
    let channel = |range: Range<usize>| {
        hex.strip_prefix('#')
            .filter(|digits| digits.len() == 6)
            .and_then(|digits| digits.get(range))
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
    };
    match (channel(0..2), channel(2..4), channel(4..6)) {
        (Some(r), Some(g), Some(b)) => RGBColor(r, g, b),
        _ => BLACK,
    }
}

/// Render the map and both charts into `output_dir`.
pub fn render_dashboard(
    view: &DashboardView<'_>,
    output_dir: &Path,
    config: &RenderConfig,
) -> Result<Vec<PathBuf>> {
    let map_path = output_dir.join(MAP_FILE_NAME);
    render_choropleth(&view.choropleth, &map_path, (config.map_width, config.map_height))?;

    let bar_path = output_dir.join(BAR_FILE_NAME);
    render_bar_chart(&view.bar_chart, &bar_path, (config.chart_width, config.chart_height))?;

    let stacked_path = output_dir.join(STACKED_FILE_NAME);
    render_stacked_bar(
        &view.stacked_bar,
        &stacked_path,
        (config.chart_width, view.stacked_bar.height),
    )?;

    let paths = vec![map_path, bar_path, stacked_path];
    for path in &paths {
        info!(path = %path.display(), "rendered chart");
    }
    Ok(paths)
}

pub fn render_choropleth(map: &ChoroplethMap<'_>, path: &Path, size: (u32, u32)) -> Result<()> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let (map_area, legend_area) = root.split_horizontally(size.0.saturating_sub(LEGEND_WIDTH));

    let (x_range, y_range) = map_extent(map);
    let mut chart = ChartBuilder::on(&map_area)
        .caption(map.title, ("sans-serif", 40))
        .margin(20)
        .build_cartesian_2d(x_range, y_range)?;

    for region in &map.regions {
        let fill = GREENS.at(map.scale.normalize(region.percentage));
        for ring in exterior_rings(region.geometry) {
            chart.draw_series(std::iter::once(Polygon::new(ring.clone(), fill.filled())))?;
            chart.draw_series(std::iter::once(PathElement::new(ring, EDGE_COLOR.stroke_width(1))))?;
        }
    }

    let label_style = ("sans-serif", 12)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    chart.draw_series(map.regions.iter().filter_map(|region| {
        region
            .centroid
            .map(|[x, y]| Text::new(region.province.to_string(), (x, y), label_style.clone()))
    }))?;

    draw_legend(&legend_area, map)?;
    root.present()?;
    Ok(())
}

fn draw_legend(area: &DrawingArea<SVGBackend<'_>, Shift>, map: &ChoroplethMap<'_>) -> Result<()> {
    let min = map.scale.min;
    let max = if map.scale.max > min { map.scale.max } else { min + 1.0 };

    let mut legend = ChartBuilder::on(area)
        .margin_top(120)
        .margin_bottom(120)
        .margin_right(70)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..1f64, min..max)?;

    legend
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_desc(map.legend_label)
        .y_label_formatter(&|value| format!("{:.1}", value))
        .draw()?;

    const STEPS: usize = 100;
    let step = (max - min) / STEPS as f64;
    legend.draw_series((0..STEPS).map(|i| {
        let low = min + step * i as f64;
        Rectangle::new(
            [(0.0, low), (1.0, low + step)],
            GREENS.at(i as f64 / (STEPS - 1) as f64).filled(),
        )
    }))?;
    Ok(())
}

fn map_extent(map: &ChoroplethMap<'_>) -> (Range<f64>, Range<f64>) {
    let bounds = map
        .regions
        .iter()
        .filter_map(|region| region.geometry.bounding_rect())
        .fold(None, |acc: Option<([f64; 2], [f64; 2])>, rect| {
            let (min, max) = (rect.min(), rect.max());
            Some(match acc {
                None => ([min.x, max.x], [min.y, max.y]),
                Some((x, y)) => (
                    [x[0].min(min.x), x[1].max(max.x)],
                    [y[0].min(min.y), y[1].max(max.y)],
                ),
            })
        })
        .unwrap_or(FALLBACK_EXTENT);

    let pad = |[low, high]: [f64; 2]| {
        let margin = ((high - low) * 0.02).max(0.5);
        (low - margin)..(high + margin)
    };
    (pad(bounds.0), pad(bounds.1))
}

fn ring_points(polygon: &geo::Polygon<f64>) -> Vec<(f64, f64)> {
    polygon.exterior().coords().map(|coord| (coord.x, coord.y)).collect()
}

// Holes are not cut out; they are drawn filled like the surrounding area.
fn exterior_rings(geometry: &Geometry<f64>) -> Vec<Vec<(f64, f64)>> {
    match geometry {
        Geometry::Polygon(polygon) => vec![ring_points(polygon)],
        Geometry::MultiPolygon(polygons) => polygons.0.iter().map(ring_points).collect(),
        _ => Vec::new(),
    }
}

fn category_label(labels: &[&str], value: &SegmentValue<i32>) -> String {
    match value {
        SegmentValue::CenterOf(index) => usize::try_from(*index)
            .ok()
            .and_then(|index| labels.get(index))
            .map(|label| label.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

pub fn render_bar_chart(chart: &BarChart<'_>, path: &Path, size: (u32, u32)) -> Result<()> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let categories = chart.bars.len().max(1);
    let labels: Vec<&str> = chart.bars.iter().map(|bar| bar.province).collect();
    let y_max = chart.max_count().max(1) as f64 * 1.05;
    let count_max = chart.max_count().max(1) as f64;

    let mut ctx = ChartBuilder::on(&root)
        .caption(chart.title, ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(80)
        .y_label_area_size(60)
        .build_cartesian_2d((0..categories as i32).into_segmented(), 0f64..y_max)?;

    ctx.configure_mesh()
        .disable_x_mesh()
        .x_desc(chart.x_title)
        .y_desc(chart.y_title)
        .x_labels(categories)
        .x_label_style(("sans-serif", 11))
        .x_label_formatter(&|value| category_label(&labels, value))
        .draw()?;

    ctx.draw_series(chart.bars.iter().enumerate().map(|(index, bar)| {
        let index = index as i32;
        let color = BLUES.at(bar.count as f64 / count_max);
        let mut rect = Rectangle::new(
            [
                (SegmentValue::Exact(index), 0.0),
                (SegmentValue::Exact(index + 1), bar.count as f64),
            ],
            color.filled(),
        );
        rect.set_margin(0, 0, 4, 4);
        rect
    }))?;

    root.present()?;
    Ok(())
}

pub fn render_stacked_bar(chart: &StackedBarChart<'_>, path: &Path, size: (u32, u32)) -> Result<()> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    if chart.no_data {
        root.titled(chart.title, ("sans-serif", 28))?;
        root.present()?;
        return Ok(());
    }

    let categories = chart.categories.len();
    let y_max = chart.max_total().max(1) as f64 * 1.05;

    let mut ctx = ChartBuilder::on(&root)
        .caption(chart.title, ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(80)
        .y_label_area_size(80)
        .build_cartesian_2d((0..categories as i32).into_segmented(), 0f64..y_max)?;

    ctx.configure_mesh()
        .disable_x_mesh()
        .x_desc(chart.x_title)
        .y_desc(chart.y_title)
        .x_labels(categories)
        .x_label_style(("sans-serif", 11))
        .x_label_formatter(&|value| category_label(&chart.categories, value))
        .draw()?;

    let mut base = vec![0u64; categories];
    for series in &chart.series {
        let color = parse_hex_color(series.color);
        let bars: Vec<Rectangle<(SegmentValue<i32>, f64)>> = series
            .values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let bottom = base[index];
                base[index] += value;
                let mut rect = Rectangle::new(
                    [
                        (SegmentValue::Exact(index as i32), bottom as f64),
                        (SegmentValue::Exact(index as i32 + 1), (bottom + value) as f64),
                    ],
                    color.filled(),
                );
                rect.set_margin(0, 0, 4, 4);
                rect
            })
            .collect();

        ctx.draw_series(bars)?
            .label(series.name)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    ctx.configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{bar, choropleth, stacked};
    use crate::filter::tests::sample;
    use crate::filter::{FilterSelection, FilteredView};
    use std::fs;

    #[test]
    fn ramp_endpoints() {
        assert_eq!(GREENS.at(0.0), GREENS.low);
        assert_eq!(GREENS.at(1.0), GREENS.high);
        assert_eq!(GREENS.at(7.0), GREENS.high);
        assert_eq!(GREENS.at(f64::NAN), GREENS.low);
    }

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#1f77b4"), RGBColor(0x1f, 0x77, 0xb4));
        assert_eq!(parse_hex_color("1f77b4"), BLACK);
        assert_eq!(parse_hex_color("#zz77b4"), BLACK);
    }

    #[test]
    fn renders_svg_files() {
        let data = sample();
        let view = FilteredView::all(&data);
        let dir = tempfile::tempdir().unwrap();

        let map_path = dir.path().join(MAP_FILE_NAME);
        render_choropleth(&choropleth::build(&data, &view), &map_path, (800, 600)).unwrap();
        let svg = fs::read_to_string(&map_path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Aceh"));

        let bar_path = dir.path().join(BAR_FILE_NAME);
        render_bar_chart(&bar::build(&view), &bar_path, (800, 400)).unwrap();
        assert!(fs::read_to_string(&bar_path)
            .unwrap()
            .contains(bar::TITLE));

        let stacked_path = dir.path().join(STACKED_FILE_NAME);
        render_stacked_bar(&stacked::build(&view), &stacked_path, (800, 600)).unwrap();
        assert!(fs::read_to_string(&stacked_path).unwrap().contains("Mahasiswa 2018"));
    }

    #[test]
    fn renders_empty_charts() {
        let data = sample();
        let selection = FilterSelection {
            provinces: vec!["Maluku".into()],
            ..FilterSelection::default()
        };
        let view = selection.apply(&data);
        let dir = tempfile::tempdir().unwrap();

        let stacked_path = dir.path().join(STACKED_FILE_NAME);
        render_stacked_bar(&stacked::build(&view), &stacked_path, (800, 600)).unwrap();
        assert!(fs::read_to_string(&stacked_path)
            .unwrap()
            .contains(stacked::NO_DATA_TITLE));

        render_bar_chart(&bar::build(&view), &dir.path().join(BAR_FILE_NAME), (800, 400)).unwrap();
        render_choropleth(
            &choropleth::build(&data, &view),
            &dir.path().join(MAP_FILE_NAME),
            (800, 600),
        )
        .unwrap();
    }
}
