use crate::models::{Dataset, Field, FilterConfig, InstitutionRecord};

/// A borrowed projection of the base set.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    rows: Vec<&'a InstitutionRecord>,
}

impl<'a> FilteredView<'a> {
    /// The whole base set, unfiltered.
    pub fn all(dataset: &'a Dataset) -> Self {
        Self {
            rows: dataset.records().iter().collect(),
        }
    }

    pub fn rows(&self) -> &[&'a InstitutionRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Selected values per categorical field. An empty list means no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub provinces: Vec<String>,
    pub organizers: Vec<String>,
    pub statuses: Vec<String>,
}

impl FilterSelection {
    pub fn from_config(filters: &FilterConfig) -> Self {
        Self {
            provinces: filters.provinces.clone(),
            organizers: filters.organizers.clone(),
            statuses: filters.statuses.clone(),
        }
    }

    pub fn matches(&self, record: &InstitutionRecord) -> bool {
        selected(&self.provinces, &record.province)
            && selected(&self.organizers, &record.organizer)
            && selected(&self.statuses, &record.status)
    }

    pub fn apply<'a>(&self, dataset: &'a Dataset) -> FilteredView<'a> {
        FilteredView {
            rows: dataset
                .records()
                .iter()
                .filter(|record| self.matches(record))
                .collect(),
        }
    }

    /// Selections naming values that never occur in the dataset.
    pub fn unknown_values<'s>(&'s self, dataset: &Dataset) -> Vec<(Field, &'s str)> {
        let checks = [
            (Field::Province, &self.provinces),
            (Field::Organizer, &self.organizers),
            (Field::Status, &self.statuses),
        ];
        let mut unknown = Vec::new();
        for (field, values) in checks {
            let options = dataset.options(field);
            for value in values {
                if !options.contains(&value.as_str()) {
                    unknown.push((field, value.as_str()));
                }
            }
        }
        unknown
    }
}

fn selected(values: &[String], value: &str) -> bool {
    values.is_empty() || values.iter().any(|candidate| candidate == value)
}

/// Case-insensitive substring search on institution names. The term is
/// matched exactly as given; surrounding whitespace is significant.
#[derive(Debug, Clone)]
pub struct NameSearch {
    needle: Option<String>,
}

impl NameSearch {
    /// A missing or all-whitespace term disables the search.
    pub fn new(term: Option<&str>) -> Self {
        let needle = term
            .filter(|term| !term.trim().is_empty())
            .map(str::to_lowercase);
        Self { needle }
    }

    pub fn is_active(&self) -> bool {
        self.needle.is_some()
    }

    pub fn matches(&self, record: &InstitutionRecord) -> bool {
        match &self.needle {
            Some(needle) => record.name.to_lowercase().contains(needle.as_str()),
            None => true,
        }
    }

    pub fn apply<'a>(&self, view: &FilteredView<'a>) -> FilteredView<'a> {
        FilteredView {
            rows: view
                .rows
                .iter()
                .copied()
                .filter(|record| self.matches(record))
                .collect(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::loader::DatasetLoader;
    use crate::models::GeometryPolicy;
    use crate::prepare::prepare;
    use pretty_assertions::assert_eq;

    pub(crate) const SQUARE: &str = "POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))";

    /// (province, organizer, status, name, dosen 2017, mhs 2017, dosen 2018, mhs 2018)
    pub(crate) type Row<'a> = (&'a str, &'a str, &'a str, &'a str, u64, u64, u64, u64);

    pub(crate) fn dataset(rows: &[Row]) -> Dataset {
        let mut csv = String::from(
            "Provinsi,Penyelenggara,Status,Nama Perguruan Tinggi,Dosen 2017,Mahasiswa 2017,Dosen 2018,Mahasiswa 2018,geometry\n",
        );
        for (province, organizer, status, name, d17, m17, d18, m18) in rows {
            csv.push_str(&format!(
                "{province},{organizer},{status},{name},{d17},{m17},{d18},{m18},\"{SQUARE}\"\n"
            ));
        }
        let raw = DatasetLoader::new().load_reader(csv.as_bytes()).unwrap();
        prepare(raw, GeometryPolicy::KeepEmpty).unwrap()
    }

    pub(crate) fn sample() -> Dataset {
        dataset(&[
            ("Aceh", "Kemendikbud", "Aktif", "Universitas Syiah Kuala", 10, 100, 12, 110),
            ("Aceh", "Kemenag", "Aktif", "UIN Ar-Raniry", 5, 50, 6, 60),
            ("Bali", "Kemendikbud", "Aktif", "Universitas Udayana", 8, 90, 9, 95),
            ("Bali", "Swasta", "Alih Bentuk", "Institut Bisnis Bali", 2, 20, 2, 25),
            ("Papua", "Swasta", "Aktif", "Universitas Ottow Geissler", 1, 10, 1, 12),
        ])
    }

    fn names<'a>(view: &FilteredView<'a>) -> Vec<&'a str> {
        view.rows().iter().map(|record| record.name.as_str()).collect()
    }

    #[test]
    fn empty_selection_keeps_everything() {
        let data = sample();
        let view = FilterSelection::default().apply(&data);
        assert_eq!(view.len(), data.len());
    }

    #[test]
    fn values_within_a_field_are_or_ed() {
        let data = sample();
        let selection = FilterSelection {
            provinces: vec!["Aceh".into(), "Papua".into()],
            ..FilterSelection::default()
        };
        assert_eq!(selection.apply(&data).len(), 3);
    }

    #[test]
    fn fields_are_and_ed() {
        let data = sample();
        let selection = FilterSelection {
            provinces: vec!["Bali".into()],
            organizers: vec!["Swasta".into()],
            statuses: vec![],
        };
        assert_eq!(names(&selection.apply(&data)), vec!["Institut Bisnis Bali"]);
    }

    #[test]
    fn filtered_set_is_a_subset() {
        let data = sample();
        let selections = [
            FilterSelection::default(),
            FilterSelection {
                statuses: vec!["Aktif".into()],
                ..FilterSelection::default()
            },
            FilterSelection {
                provinces: vec!["Jawa Barat".into()],
                ..FilterSelection::default()
            },
        ];
        for selection in selections {
            let view = selection.apply(&data);
            assert!(view.len() <= data.len());
            for row in view.rows() {
                assert!(data.records().iter().any(|record| std::ptr::eq(record, *row)));
            }
        }
    }

    #[test]
    fn no_match_is_an_empty_view() {
        let data = sample();
        let selection = FilterSelection {
            provinces: vec!["Jawa Barat".into()],
            ..FilterSelection::default()
        };
        assert!(selection.apply(&data).is_empty());
        assert_eq!(selection.unknown_values(&data), vec![(Field::Province, "Jawa Barat")]);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let data = sample();
        let all = FilteredView::all(&data);
        let search = NameSearch::new(Some("UNIVERSITAS u"));
        assert_eq!(names(&search.apply(&all)), vec!["Universitas Udayana"]);
    }

    #[test]
    fn search_treats_term_literally() {
        let data = sample();
        let all = FilteredView::all(&data);
        assert!(NameSearch::new(Some("Ar-Raniry")).apply(&all).len() == 1);
        assert!(NameSearch::new(Some(".*")).apply(&all).is_empty());
    }

    #[test]
    fn blank_search_is_inactive() {
        let data = sample();
        let all = FilteredView::all(&data);
        let search = NameSearch::new(Some("   "));
        assert!(!search.is_active());
        assert_eq!(search.apply(&all).len(), data.len());
        assert_eq!(NameSearch::new(None).apply(&all).len(), data.len());
    }

    #[test]
    fn very_long_search_term_matches_nothing() {
        let data = sample();
        let all = FilteredView::all(&data);
        let search = NameSearch::new(Some(&"ä".repeat(400_000)));
        assert!(search.is_active());
        assert!(search.apply(&all).is_empty());
    }

    #[test]
    fn search_keeps_surrounding_whitespace() {
        let data = sample();
        let all = FilteredView::all(&data);
        assert_eq!(
            names(&NameSearch::new(Some(" udayana")).apply(&all)),
            vec!["Universitas Udayana"]
        );
        // Every "Universitas ..." name starts the string, so no space precedes it.
        assert!(NameSearch::new(Some(" Universitas")).apply(&all).is_empty());
        assert!(NameSearch::new(Some("Bali ")).apply(&all).is_empty());
    }

    #[test]
    fn options_follow_first_appearance() {
        let data = sample();
        assert_eq!(data.options(Field::Province), vec!["Aceh", "Bali", "Papua"]);
        assert_eq!(
            data.options(Field::Organizer),
            vec!["Kemendikbud", "Kemenag", "Swasta"]
        );
    }
}
