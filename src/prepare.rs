use crate::error::{DashboardError, MalformedGeometryError, Result};
use crate::loader::RawTable;
use crate::models::{
    Column, ColumnLayout, Dataset, Field, GeometryPolicy, InstitutionRecord, Metrics,
    ProvinceBoundary,
};
use csv::StringRecord;
use geo::Geometry;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};
use wkt::TryFromWkt;

/// Legacy column name -> canonical column name.
pub const RENAMES: [(&str, &str); 11] = [
    ("Rasio", "Rasio 2017"),
    ("Rasio.1", "Rasio 2018"),
    ("Dosen", "Dosen 2017"),
    ("Dosen.1", "Dosen 2018"),
    ("Mhs", "Mahasiswa 2017"),
    ("Mhs.1", "Mahasiswa 2018"),
    ("Nama Prodi", "Nama Perguruan Tinggi"),
    ("ID_x", "Id Perguruan Tinggi"),
    ("ID_y", "Id Geometry"),
    ("kode", "Kode"),
    ("SUMBER", "Sumber"),
];

pub fn canonical_name(header: &str) -> &str {
    RENAMES
        .iter()
        .find(|(legacy, _)| *legacy == header)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(header)
}

/// Turn a raw table into the immutable base set.
pub fn prepare(raw: RawTable, policy: GeometryPolicy) -> Result<Dataset> {
    let (layout, positions) = resolve_layout(&raw.headers)?;
    let passthrough: Vec<usize> = raw
        .headers
        .iter()
        .enumerate()
        .filter(|(index, _)| !positions.values().any(|position| position == index))
        .map(|(index, _)| index)
        .collect();

    let mut records = Vec::with_capacity(raw.rows.len());
    let mut boundaries: Vec<ProvinceBoundary> = Vec::new();
    let mut bounded: HashSet<String> = HashSet::new();
    let mut malformed = 0usize;

    for (index, row) in raw.rows.iter().enumerate() {
        let row_number = index + 1;
        let cell = |field: Field| {
            positions
                .get(&field)
                .and_then(|position| row.get(*position))
                .unwrap_or("")
        };

        let geometry = match parse_geometry(cell(Field::Geometry), row_number) {
            Ok(geometry) => Some(geometry),
            Err(err) => match policy {
                GeometryPolicy::Reject => return Err(err.into()),
                GeometryPolicy::SkipRow => {
                    warn!(row = row_number, reason = %err.reason, "skipping row with malformed geometry");
                    malformed += 1;
                    continue;
                }
                GeometryPolicy::KeepEmpty => {
                    warn!(row = row_number, reason = %err.reason, "keeping row without geometry");
                    malformed += 1;
                    None
                }
            },
        };

        let metric = |field: Field| parse_metric(cell(field), row_number, field);
        let record = InstitutionRecord {
            institution_id: cell(Field::InstitutionId).to_string(),
            geometry_id: cell(Field::GeometryId).to_string(),
            code: cell(Field::Code).to_string(),
            source: cell(Field::Source).to_string(),
            province: cell(Field::Province).to_string(),
            organizer: cell(Field::Organizer).to_string(),
            status: cell(Field::Status).to_string(),
            name: cell(Field::Name).to_string(),
            metrics: Metrics {
                lecturers_2017: metric(Field::Lecturers2017)?,
                students_2017: metric(Field::Students2017)?,
                lecturers_2018: metric(Field::Lecturers2018)?,
                students_2018: metric(Field::Students2018)?,
            },
            has_geometry: geometry.is_some(),
            extra: passthrough_cells(row, &passthrough),
        };

        // First parseable geometry of a province becomes its boundary.
        if let Some(geometry) = geometry {
            if bounded.insert(record.province.clone()) {
                boundaries.push(ProvinceBoundary {
                    province: record.province.clone(),
                    geometry,
                });
            }
        }

        records.push(record);
    }

    debug!(
        records = records.len(),
        boundaries = boundaries.len(),
        malformed,
        "dataset prepared"
    );
    Ok(Dataset::new(layout, records, boundaries))
}

fn resolve_layout(headers: &[String]) -> Result<(ColumnLayout, HashMap<Field, usize>)> {
    let mut positions = HashMap::new();
    let mut columns = Vec::with_capacity(headers.len());
    let mut slot = 0;

    for (index, header) in headers.iter().enumerate() {
        let name = canonical_name(header);
        match Field::from_column_name(name) {
            Some(field) if !positions.contains_key(&field) => {
                positions.insert(field, index);
                columns.push(Column::Field(field));
            }
            _ => {
                columns.push(Column::Passthrough {
                    name: name.to_string(),
                    slot,
                });
                slot += 1;
            }
        }
    }

    if let Some(missing) = Field::ALL
        .into_iter()
        .find(|field| field.is_required() && !positions.contains_key(field))
    {
        return Err(DashboardError::MissingColumn(missing.column_name().to_string()));
    }

    Ok((ColumnLayout { columns }, positions))
}

fn passthrough_cells(row: &StringRecord, passthrough: &[usize]) -> Vec<String> {
    passthrough
        .iter()
        .map(|index| row.get(*index).unwrap_or("").to_string())
        .collect()
}

/// Parse a WKT polygon or multipolygon.
pub fn parse_geometry(
    text: &str,
    row: usize,
) -> std::result::Result<Geometry<f64>, MalformedGeometryError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(MalformedGeometryError {
            row,
            reason: "empty geometry".to_string(),
        });
    }

    let geometry = Geometry::<f64>::try_from_wkt_str(text).map_err(|err| MalformedGeometryError {
        row,
        reason: err.to_string(),
    })?;

    match geometry {
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => Ok(geometry),
        other => Err(MalformedGeometryError {
            row,
            reason: format!("expected POLYGON or MULTIPOLYGON, found {}", geometry_kind(&other)),
        }),
    }
}

fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "POINT",
        Geometry::Line(_) => "LINE",
        Geometry::LineString(_) => "LINESTRING",
        Geometry::Polygon(_) => "POLYGON",
        Geometry::MultiPoint(_) => "MULTIPOINT",
        Geometry::MultiLineString(_) => "MULTILINESTRING",
        Geometry::MultiPolygon(_) => "MULTIPOLYGON",
        Geometry::GeometryCollection(_) => "GEOMETRYCOLLECTION",
        Geometry::Rect(_) => "RECT",
        Geometry::Triangle(_) => "TRIANGLE",
    }
}

/// Blank cells count as zero; integral floats such as `12.0` are accepted.
fn parse_metric(text: &str, row: usize, field: Field) -> Result<u64> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(0);
    }
    if let Ok(value) = text.parse::<u64>() {
        return Ok(value);
    }
    match text.parse::<f64>() {
        // u64::MAX as f64 rounds up to 2^64, which is already out of range.
        Ok(value)
            if value.is_finite()
                && value >= 0.0
                && value < u64::MAX as f64
                && value.fract() == 0.0 =>
        {
            Ok(value as u64)
        }
        _ => Err(DashboardError::InvalidMetric {
            row,
            column: field.column_name().to_string(),
            value: text.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::DatasetLoader;
    use pretty_assertions::assert_eq;

    const SQUARE_A: &str = "POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))";

    fn legacy_csv(rows: &[(&str, &str)]) -> String {
        let mut csv = String::from(
            ",ID_x,Provinsi,Penyelenggara,Status,Nama Prodi,Rasio,Dosen,Mhs,Rasio,Dosen,Mhs,ID_y,kode,SUMBER,geometry\n",
        );
        for (index, (province, geometry)) in rows.iter().enumerate() {
            csv.push_str(&format!(
                "{i},{i},{p},Kemendikbud,Aktif,Univ {i},1.5,2,30,1.25,3,40,9,K{i},PDDikti,\"{g}\"\n",
                i = index,
                p = province,
                g = geometry
            ));
        }
        csv
    }

    fn load(csv: &str, policy: GeometryPolicy) -> Result<Dataset> {
        let raw = DatasetLoader::new().load_reader(csv.as_bytes())?;
        prepare(raw, policy)
    }

    #[test]
    fn renames_legacy_columns() {
        let dataset = load(&legacy_csv(&[("Aceh", SQUARE_A)]), GeometryPolicy::KeepEmpty).unwrap();
        assert_eq!(
            dataset.layout().tabular_headers(),
            vec![
                "Id Perguruan Tinggi",
                "Provinsi",
                "Penyelenggara",
                "Status",
                "Nama Perguruan Tinggi",
                "Rasio 2017",
                "Dosen 2017",
                "Mahasiswa 2017",
                "Rasio 2018",
                "Dosen 2018",
                "Mahasiswa 2018",
                "Id Geometry",
                "Kode",
                "Sumber",
            ]
        );
        let record = &dataset.records()[0];
        assert_eq!(record.name, "Univ 0");
        assert_eq!(record.code, "K0");
        assert_eq!(record.extra, vec!["1.5", "1.25"]);
        assert_eq!(
            record.metrics,
            Metrics {
                lecturers_2017: 2,
                students_2017: 30,
                lecturers_2018: 3,
                students_2018: 40,
            }
        );
    }

    #[test]
    fn unknown_names_pass_through() {
        assert_eq!(canonical_name("Provinsi"), "Provinsi");
        assert_eq!(canonical_name("Mhs.1"), "Mahasiswa 2018");
    }

    #[test]
    fn boundaries_are_deduplicated_per_province() {
        let dataset = load(
            &legacy_csv(&[("Aceh", SQUARE_A), ("Aceh", SQUARE_A), ("Bali", SQUARE_A)]),
            GeometryPolicy::KeepEmpty,
        )
        .unwrap();
        let provinces: Vec<&str> = dataset
            .boundaries()
            .iter()
            .map(|boundary| boundary.province.as_str())
            .collect();
        assert_eq!(provinces, vec!["Aceh", "Bali"]);
    }

    #[test]
    fn keep_empty_retains_row_without_boundary() {
        let dataset = load(
            &legacy_csv(&[("Aceh", "POLYGON ((0 0, 1"), ("Aceh", SQUARE_A)]),
            GeometryPolicy::KeepEmpty,
        )
        .unwrap();
        assert_eq!(dataset.len(), 2);
        assert!(!dataset.records()[0].has_geometry);
        // the later, parseable row supplies the boundary
        assert_eq!(dataset.boundaries().len(), 1);
    }

    #[test]
    fn skip_row_drops_malformed_rows() {
        let dataset = load(
            &legacy_csv(&[("Aceh", "not wkt"), ("Bali", SQUARE_A)]),
            GeometryPolicy::SkipRow,
        )
        .unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.records()[0].province, "Bali");
    }

    #[test]
    fn reject_fails_the_load() {
        let err = load(
            &legacy_csv(&[("Bali", SQUARE_A), ("Aceh", "not wkt")]),
            GeometryPolicy::Reject,
        )
        .unwrap_err();
        match err {
            DashboardError::MalformedGeometry(err) => assert_eq!(err.row, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn points_are_not_boundaries() {
        let err = parse_geometry("POINT (1 2)", 7).unwrap_err();
        assert_eq!(err.row, 7);
        assert!(err.reason.contains("POINT"));
        assert!(parse_geometry("", 1).is_err());
        assert!(parse_geometry(
            "MULTIPOLYGON (((0 0, 1 0, 1 1, 0 0)), ((2 2, 3 2, 3 3, 2 2)))",
            1
        )
        .is_ok());
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let csv = "Provinsi,Status\nAceh,Aktif\n";
        match load(csv, GeometryPolicy::KeepEmpty).unwrap_err() {
            DashboardError::MissingColumn(column) => assert_eq!(column, "Penyelenggara"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn metrics_accept_blank_and_integral_floats() {
        assert_eq!(parse_metric("", 1, Field::Lecturers2017).unwrap(), 0);
        assert_eq!(parse_metric("12.0", 1, Field::Lecturers2017).unwrap(), 12);
        assert!(matches!(
            parse_metric("-3", 4, Field::Students2018),
            Err(DashboardError::InvalidMetric { row: 4, .. })
        ));
        assert!(parse_metric("1.5", 1, Field::Students2017).is_err());
    }

    #[test]
    fn out_of_range_metrics_are_rejected() {
        assert!(matches!(
            parse_metric("1e20", 3, Field::Lecturers2017),
            Err(DashboardError::InvalidMetric { row: 3, .. })
        ));
        assert!(parse_metric("18446744073709551616", 1, Field::Students2017).is_err());
        assert_eq!(
            parse_metric("18446744073709551615", 1, Field::Students2017).unwrap(),
            u64::MAX
        );
    }

    #[test]
    fn huge_metric_cell_fails_the_load() {
        let csv = "Provinsi,Penyelenggara,Status,Nama Perguruan Tinggi,Dosen 2017,Mahasiswa 2017,Dosen 2018,Mahasiswa 2018,geometry\n\
                   Aceh,Swasta,Aktif,Univ,1e20,1,1,1,\"POLYGON ((0 0, 1 0, 1 1, 0 0))\"\n";
        match load(csv, GeometryPolicy::KeepEmpty).unwrap_err() {
            DashboardError::InvalidMetric { row, column, value } => {
                assert_eq!(row, 1);
                assert_eq!(column, "Dosen 2017");
                assert_eq!(value, "1e20");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
