use crate::error::Result;
use crate::filter::FilteredView;
use crate::models::ColumnLayout;
use csv::Writer;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

pub const EXPORT_FILE_NAME: &str = "filtered_data.csv";
pub const EXPORT_MIME_TYPE: &str = "text/csv";

/// Write the view as CSV without the geometry column. An empty view still
/// gets its header line.
pub fn write_csv<W: Write>(layout: &ColumnLayout, view: &FilteredView<'_>, writer: W) -> Result<()> {
    let mut writer = Writer::from_writer(writer);
    writer.write_record(layout.tabular_headers())?;

    for record in view.rows() {
        writer.write_record(layout.tabular_columns().map(|column| record.cell(column).into_owned()))?;
    }

    writer.flush()?;
    Ok(())
}

pub fn export_to_dir(layout: &ColumnLayout, view: &FilteredView<'_>, output_dir: &Path) -> Result<()> {
    let path = output_dir.join(EXPORT_FILE_NAME);
    write_csv(layout, view, File::create(&path)?)?;
    info!(path = %path.display(), rows = view.len(), mime = EXPORT_MIME_TYPE, "exported filtered data");
    Ok(())
}
