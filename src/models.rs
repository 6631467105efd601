use geo::Geometry;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data_file: String,
    pub output_directory: Option<String>,
    #[serde(default)]
    pub geometry_policy: GeometryPolicy,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

/// What to do with a row whose geometry text cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryPolicy {
    /// Keep the row for tables and statistics; it contributes no boundary.
    #[default]
    #[serde(rename = "keep_empty")]
    KeepEmpty,
    #[serde(rename = "skip_row")]
    SkipRow,
    /// Fail the whole load.
    #[serde(rename = "reject")]
    Reject,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub provinces: Vec<String>,
    pub organizers: Vec<String>,
    pub statuses: Vec<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub map_width: u32,
    pub map_height: u32,
    pub chart_width: u32,
    pub chart_height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            map_width: 2000,
            map_height: 1200,
            chart_width: 1400,
            chart_height: 600,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: "perguruanTinggiIndonesia.csv".to_string(),
            output_directory: Some("output".to_string()),
            geometry_policy: GeometryPolicy::KeepEmpty,
            filters: FilterConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }
}

/// Columns the dashboard understands, by canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    InstitutionId,
    GeometryId,
    Code,
    Source,
    Province,
    Organizer,
    Status,
    Name,
    Lecturers2017,
    Students2017,
    Lecturers2018,
    Students2018,
    Geometry,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::InstitutionId,
        Field::GeometryId,
        Field::Code,
        Field::Source,
        Field::Province,
        Field::Organizer,
        Field::Status,
        Field::Name,
        Field::Lecturers2017,
        Field::Students2017,
        Field::Lecturers2018,
        Field::Students2018,
        Field::Geometry,
    ];

    /// The four metric columns, in chart order.
    pub const METRICS: [Field; 4] = [
        Field::Lecturers2017,
        Field::Students2017,
        Field::Lecturers2018,
        Field::Students2018,
    ];

    pub fn column_name(self) -> &'static str {
        match self {
            Field::InstitutionId => "Id Perguruan Tinggi",
            Field::GeometryId => "Id Geometry",
            Field::Code => "Kode",
            Field::Source => "Sumber",
            Field::Province => "Provinsi",
            Field::Organizer => "Penyelenggara",
            Field::Status => "Status",
            Field::Name => "Nama Perguruan Tinggi",
            Field::Lecturers2017 => "Dosen 2017",
            Field::Students2017 => "Mahasiswa 2017",
            Field::Lecturers2018 => "Dosen 2018",
            Field::Students2018 => "Mahasiswa 2018",
            Field::Geometry => "geometry",
        }
    }

    pub fn from_column_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|field| field.column_name() == name)
    }

    /// Identifier columns may be absent; everything else must be present.
    pub fn is_required(self) -> bool {
        !matches!(
            self,
            Field::InstitutionId | Field::GeometryId | Field::Code | Field::Source
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Field(Field),
    /// A column outside the typed schema, kept verbatim. `slot` indexes
    /// `InstitutionRecord::extra`.
    Passthrough { name: String, slot: usize },
}

impl Column {
    pub fn name(&self) -> &str {
        match self {
            Column::Field(field) => field.column_name(),
            Column::Passthrough { name, .. } => name,
        }
    }
}

/// Canonical column order of the loaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    pub columns: Vec<Column>,
}

impl ColumnLayout {
    /// Columns offered in the table and export: everything but geometry.
    pub fn tabular_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|column| **column != Column::Field(Field::Geometry))
    }

    pub fn tabular_headers(&self) -> Vec<&str> {
        self.tabular_columns().map(Column::name).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub lecturers_2017: u64,
    pub students_2017: u64,
    pub lecturers_2018: u64,
    pub students_2018: u64,
}

impl Metrics {
    pub fn get(&self, field: Field) -> Option<u64> {
        match field {
            Field::Lecturers2017 => Some(self.lecturers_2017),
            Field::Students2017 => Some(self.students_2017),
            Field::Lecturers2018 => Some(self.lecturers_2018),
            Field::Students2018 => Some(self.students_2018),
            _ => None,
        }
    }

    /// Sum of all four metrics, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.lecturers_2017
            .saturating_add(self.students_2017)
            .saturating_add(self.lecturers_2018)
            .saturating_add(self.students_2018)
    }

    /// Accumulate `other`, saturating at `u64::MAX`.
    pub fn add(&mut self, other: &Metrics) {
        self.lecturers_2017 = self.lecturers_2017.saturating_add(other.lecturers_2017);
        self.students_2017 = self.students_2017.saturating_add(other.students_2017);
        self.lecturers_2018 = self.lecturers_2018.saturating_add(other.lecturers_2018);
        self.students_2018 = self.students_2018.saturating_add(other.students_2018);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstitutionRecord {
    pub institution_id: String,
    pub geometry_id: String,
    pub code: String,
    pub source: String,
    pub province: String,
    pub organizer: String,
    pub status: String,
    pub name: String,
    pub metrics: Metrics,
    pub has_geometry: bool,
    pub extra: Vec<String>,
}

impl InstitutionRecord {
    /// Cell text for a tabular column. Geometry is never rendered as text.
    pub fn cell(&self, column: &Column) -> Cow<'_, str> {
        match column {
            Column::Field(field) => match field {
                Field::InstitutionId => Cow::Borrowed(&self.institution_id),
                Field::GeometryId => Cow::Borrowed(&self.geometry_id),
                Field::Code => Cow::Borrowed(&self.code),
                Field::Source => Cow::Borrowed(&self.source),
                Field::Province => Cow::Borrowed(&self.province),
                Field::Organizer => Cow::Borrowed(&self.organizer),
                Field::Status => Cow::Borrowed(&self.status),
                Field::Name => Cow::Borrowed(&self.name),
                Field::Geometry => Cow::Borrowed(""),
                metric => Cow::Owned(self.metrics.get(*metric).unwrap_or(0).to_string()),
            },
            Column::Passthrough { slot, .. } => {
                Cow::Borrowed(self.extra.get(*slot).map(String::as_str).unwrap_or(""))
            }
        }
    }

    /// Value of a categorical filter field.
    pub fn category(&self, field: Field) -> Option<&str> {
        match field {
            Field::Province => Some(&self.province),
            Field::Organizer => Some(&self.organizer),
            Field::Status => Some(&self.status),
            Field::Name => Some(&self.name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProvinceBoundary {
    pub province: String,
    pub geometry: Geometry<f64>,
}

/// The prepared base set. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct Dataset {
    layout: ColumnLayout,
    records: Vec<InstitutionRecord>,
    boundaries: Vec<ProvinceBoundary>,
}

impl Dataset {
    pub(crate) fn new(
        layout: ColumnLayout,
        records: Vec<InstitutionRecord>,
        boundaries: Vec<ProvinceBoundary>,
    ) -> Self {
        Self {
            layout,
            records,
            boundaries,
        }
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn records(&self) -> &[InstitutionRecord] {
        &self.records
    }

    /// One boundary per province, in first-appearance order.
    pub fn boundaries(&self) -> &[ProvinceBoundary] {
        &self.boundaries
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct values of a categorical field in first-appearance order.
    pub fn options(&self, field: Field) -> Vec<&str> {
        distinct(self.records.iter().filter_map(|record| record.category(field)))
    }
}

pub(crate) fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    values.filter(|value| seen.insert(*value)).collect()
}
