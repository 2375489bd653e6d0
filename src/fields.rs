use std::collections::BTreeMap;
use std::collections::HashMap;

/// Store column name ↔ external (form/API) field name, in sheet column order.
/// The left side doubles as the required-column set for the primary table.
/// The two directions must be true inverses; `FieldMap::new` checks this once
/// at construction.
pub const STORE_TO_EXTERNAL: &[(&str, &str)] = &[
    ("Roll No", "roll"),
    ("Term", "Term"),
    ("Name", "Name"),
    ("Class", "Class"),
    ("Father Name", "FatherName"),
    ("Admission Date", "AdmissionDate"),
    ("Session", "Session"),
    ("Semester", "Semester"),
    ("Tajveed", "Tajveed"),
    ("Remarks", "Remarks"),
    ("Total", "Total"),
    ("Percentage", "Percentage"),
    ("Grade", "Grade"),
    ("Geography", "Geography"),
    ("English", "English"),
    ("Math", "Math"),
    ("Urdu", "Urdu"),
    ("General Knowledge", "GeneralKnowledge"),
    ("Science", "Science"),
    ("Islamiat", "Islamiat"),
    ("Computer/Biology", "Computer"),
    ("S.st", "Sst"),
    ("Quraan Pak", "Nazra"),
    ("Summer Task", "SummerTask"),
    ("Chemistry", "Chemistry"),
    ("Physics", "Physics"),
    ("Islamiat Elective", "IslamiatElective"),
    ("Biology", "Biology"),
    ("Genral Math", "GenralMath"),
    ("Genral Science", "GenralScience"),
    ("Homeconomics", "Homecnomics"),
    ("Statistics", "Statistics"),
    ("Pakistan Studies", "PakistanStudies"),
    ("Tarjama-tul-Quran", "Tarjama"),
    ("English (Oral)", "EnglishOral"),
    ("English (Written)", "EnglishWritten"),
    ("Math (Oral)", "MathOral"),
    ("Math (Written)", "MathWritten"),
    ("Urdu (Oral)", "UrduOral"),
    ("Urdu (Written)", "UrduWritten"),
    ("Drawing", "Drawing"),
];

/// Bidirectional renamer between store column names and external field names.
/// Names absent from the table pass through unchanged in both directions, so
/// open-ended records (unknown fields included) survive a translation.
#[derive(Debug, Clone)]
pub struct FieldMap {
    to_external: HashMap<&'static str, &'static str>,
    to_store: HashMap<&'static str, &'static str>,
}

impl FieldMap {
    pub fn new() -> Self {
        let mut to_external = HashMap::new();
        let mut to_store = HashMap::new();
        for (store, external) in STORE_TO_EXTERNAL {
            let prev = to_external.insert(*store, *external);
            debug_assert!(prev.is_none(), "duplicate store column {store}");
            let prev = to_store.insert(*external, *store);
            debug_assert!(prev.is_none(), "duplicate external field {external}");
        }
        Self {
            to_external,
            to_store,
        }
    }

    /// Store columns in mapping order; the primary sheet's required set.
    pub fn store_columns(&self) -> Vec<&'static str> {
        STORE_TO_EXTERNAL.iter().map(|(s, _)| *s).collect()
    }

    /// External field names in mapping order.
    pub fn external_names(&self) -> Vec<&'static str> {
        STORE_TO_EXTERNAL.iter().map(|(_, e)| *e).collect()
    }

    pub fn external_name<'a>(&'a self, store: &'a str) -> &'a str {
        self.to_external.get(store).copied().unwrap_or(store)
    }

    pub fn store_name<'a>(&'a self, external: &'a str) -> &'a str {
        self.to_store.get(external).copied().unwrap_or(external)
    }

    pub fn record_to_external(
        &self,
        record: &BTreeMap<String, String>,
    ) -> BTreeMap<String, String> {
        record
            .iter()
            .map(|(k, v)| (self.external_name(k).to_string(), v.clone()))
            .collect()
    }

    pub fn record_to_store(&self, record: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        record
            .iter()
            .map(|(k, v)| (self.store_name(k).to_string(), v.clone()))
            .collect()
    }
}

impl Default for FieldMap {
    fn default() -> Self {
        Self::new()
    }
}
