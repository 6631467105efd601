use crate::filter::FilteredView;
use crate::models::distinct;
use serde::Serialize;
use std::collections::HashSet;

/// Headline numbers shown above the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary<'a> {
    pub institutions: usize,
    pub provinces_covered: usize,
    pub organizers: Vec<&'a str>,
}

pub fn build<'a>(filtered: &FilteredView<'a>) -> Summary<'a> {
    let rows = filtered.rows();
    Summary {
        institutions: rows.len(),
        provinces_covered: rows
            .iter()
            .map(|record| record.province.as_str())
            .collect::<HashSet<_>>()
            .len(),
        organizers: distinct(rows.iter().map(|record| record.organizer.as_str())),
    }
}
