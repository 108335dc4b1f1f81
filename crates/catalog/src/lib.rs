//! Model catalog: librarian records keyed by model name and grouped by WordNet id.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use shared::error::SceneError;
use thiserror::Error;
use tracing::debug;

pub const TABLE_WNID: &str = "n04379243";
pub const CHAIR_WNID: &str = "n03001627";
pub const FLOOR_LAMP_WNID: &str = "n03367059";

pub const TABLE_NAMES: &[&str] = &["sm_table_white"];

pub const CHAIR_NAMES: &[&str] = &[
    "emeco_navy_chair",
    "green_side_chair",
    "lapalma_stil_chair",
    "chair_thonet_marshall",
    "wood_chair",
    "chair_billiani_doll",
    "chair_willisau_riale",
    "vitra_meda_chair",
];

pub const LAMP_NAMES: &[&str] = &[
    "alma_floor_lamp",
    "arturoalvarez_v_floor_lamp",
    "b04_kevin_reilly_pattern_floor_lamp",
    "bakerparisfloorlamp03",
    "bastone_floor_lamp",
    "duncan_floor_lamp_crate_and_barrel",
];

pub const DRINK_NAMES: &[&str] = &["102_pepsi_can_12_fl_oz_vray"];

const MODEL_BUCKET: &str = "https://tdw-public.s3.amazonaws.com/models";
const MODEL_LIBRARY_VERSION: &str = "2018-2019.1";

/// (name, wnid, wcategory) for every model the bundled scenes reference.
const BUILTIN_MODELS: &[(&str, &str, &str)] = &[
    ("sm_table_white", TABLE_WNID, "table"),
    ("emeco_navy_chair", CHAIR_WNID, "chair"),
    ("green_side_chair", CHAIR_WNID, "chair"),
    ("lapalma_stil_chair", CHAIR_WNID, "chair"),
    ("chair_thonet_marshall", CHAIR_WNID, "chair"),
    ("wood_chair", CHAIR_WNID, "chair"),
    ("chair_billiani_doll", CHAIR_WNID, "chair"),
    ("chair_willisau_riale", CHAIR_WNID, "chair"),
    ("vitra_meda_chair", CHAIR_WNID, "chair"),
    ("alma_floor_lamp", FLOOR_LAMP_WNID, "floor lamp"),
    ("arturoalvarez_v_floor_lamp", FLOOR_LAMP_WNID, "floor lamp"),
    ("b04_kevin_reilly_pattern_floor_lamp", FLOOR_LAMP_WNID, "floor lamp"),
    ("bakerparisfloorlamp03", FLOOR_LAMP_WNID, "floor lamp"),
    ("bastone_floor_lamp", FLOOR_LAMP_WNID, "floor lamp"),
    ("duncan_floor_lamp_crate_and_barrel", FLOOR_LAMP_WNID, "floor lamp"),
    ("macbook_air", "n03642806", "laptop"),
    ("mouse_02_vray", "n03793489", "computer mouse"),
    ("cup", "n03147509", "cup"),
    ("102_pepsi_can_12_fl_oz_vray", "n02946921", "soda can"),
];

/// Librarian url keys, as reported by the host OS family.
const PLATFORM_KEYS: [&str; 3] = ["Windows", "Darwin", "Linux"];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read librarian file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed librarian records: {0}")]
    Json(#[from] serde_json::Error),
}

/// Librarian url key for the host platform.
pub fn platform_key() -> &'static str {
    match std::env::consts::OS {
        "windows" => "Windows",
        "macos" => "Darwin",
        _ => "Linux",
    }
}

/// Path segment used by the asset bucket for the host platform.
pub fn platform_infix() -> &'static str {
    infix_for_key(platform_key())
}

fn infix_for_key(key: &str) -> &'static str {
    match key {
        "Windows" => "windows",
        "Darwin" => "osx",
        _ => "linux",
    }
}

fn default_scale_factor() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub name: String,
    pub wnid: String,
    pub wcategory: String,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    #[serde(default)]
    pub urls: HashMap<String, String>,
}

impl ModelRecord {
    /// Record for a model hosted in the public asset bucket, with a url for
    /// every platform.
    pub fn hosted(name: &str, wnid: &str, wcategory: &str) -> Self {
        let urls = PLATFORM_KEYS
            .iter()
            .map(|key| {
                (
                    (*key).to_string(),
                    format!(
                        "{MODEL_BUCKET}/{}/{MODEL_LIBRARY_VERSION}/{name}",
                        infix_for_key(key)
                    ),
                )
            })
            .collect();
        Self {
            name: name.to_string(),
            wnid: wnid.to_string(),
            wcategory: wcategory.to_string(),
            scale_factor: 1.0,
            urls,
        }
    }

    /// Asset url for the host platform.
    pub fn url(&self) -> Result<&str, SceneError> {
        self.urls
            .get(platform_key())
            .map(String::as_str)
            .ok_or_else(|| {
                SceneError::AssetNotFound(format!(
                    "{} has no url for platform {}",
                    self.name,
                    platform_key()
                ))
            })
    }
}

#[derive(Debug, Deserialize)]
struct LibrarianFile {
    records: BTreeMap<String, ModelRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelLibrarian {
    records: Vec<ModelRecord>,
}

impl ModelLibrarian {
    pub fn builtin() -> Self {
        Self {
            records: BUILTIN_MODELS
                .iter()
                .map(|(name, wnid, wcategory)| ModelRecord::hosted(name, wnid, wcategory))
                .collect(),
        }
    }

    /// Parses a librarian records document: `{"records": {"<name>": {...}}}`.
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let file: LibrarianFile = serde_json::from_str(raw)?;
        Ok(Self {
            records: file.records.into_values().collect(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let librarian = Self::from_json_str(&raw)?;
        debug!(path = %path.display(), records = librarian.records.len(), "loaded librarian");
        Ok(librarian)
    }

    /// Adds `record`, replacing any record with the same name.
    pub fn insert(&mut self, record: ModelRecord) {
        self.records.retain(|existing| existing.name != record.name);
        self.records.push(record);
    }

    /// Layers `other` over these records; its records win on a name clash.
    pub fn merge(&mut self, other: ModelLibrarian) {
        for record in other.records {
            self.insert(record);
        }
    }

    pub fn records(&self) -> &[ModelRecord] {
        &self.records
    }

    pub fn get_record(&self, name: &str) -> Result<&ModelRecord, SceneError> {
        self.records
            .iter()
            .find(|record| record.name == name)
            .ok_or_else(|| SceneError::AssetNotFound(name.to_string()))
    }

    pub fn get_all_models_in_wnid(&self, wnid: &str) -> Vec<&ModelRecord> {
        self.records
            .iter()
            .filter(|record| record.wnid == wnid)
            .collect()
    }

    fn named_in_wnid(&self, wnid: &str, names: &[&str]) -> Vec<ModelRecord> {
        self.get_all_models_in_wnid(wnid)
            .into_iter()
            .filter(|record| names.contains(&record.name.as_str()))
            .cloned()
            .collect()
    }
}

/// Furniture pools the office scene draws from.
#[derive(Debug, Clone)]
pub struct OfficeCatalog {
    pub tables: Vec<ModelRecord>,
    pub chairs: Vec<ModelRecord>,
    pub lamps: Vec<ModelRecord>,
}

impl OfficeCatalog {
    pub fn from_librarian(librarian: &ModelLibrarian) -> Self {
        Self {
            tables: librarian.named_in_wnid(TABLE_WNID, TABLE_NAMES),
            chairs: librarian.named_in_wnid(CHAIR_WNID, CHAIR_NAMES),
            lamps: librarian.named_in_wnid(FLOOR_LAMP_WNID, LAMP_NAMES),
        }
    }

    pub fn choose_table<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&ModelRecord, SceneError> {
        choose(&self.tables, "table", rng)
    }

    pub fn choose_chair<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&ModelRecord, SceneError> {
        choose(&self.chairs, "chair", rng)
    }

    pub fn choose_lamp<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&ModelRecord, SceneError> {
        choose(&self.lamps, "floor lamp", rng)
    }
}

fn choose<'a, R: Rng + ?Sized>(
    pool: &'a [ModelRecord],
    category: &str,
    rng: &mut R,
) -> Result<&'a ModelRecord, SceneError> {
    pool.choose(rng)
        .ok_or_else(|| SceneError::AssetNotFound(format!("no {category} models in catalog")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::io::Write;

    const RECORDS: &str = r#"{
        "records": {
            "wood_chair": {
                "name": "wood_chair",
                "wnid": "n03001627",
                "wcategory": "chair",
                "scale_factor": 1.0,
                "urls": {
                    "Windows": "https://example.invalid/windows/wood_chair",
                    "Darwin": "https://example.invalid/osx/wood_chair",
                    "Linux": "https://example.invalid/linux/wood_chair"
                }
            },
            "bar_stool": {
                "name": "bar_stool",
                "wnid": "n03001627",
                "wcategory": "chair",
                "urls": {}
            },
            "sm_table_white": {
                "name": "sm_table_white",
                "wnid": "n04379243",
                "wcategory": "table"
            }
        }
    }"#;

    #[test]
    fn builtin_office_catalog_matches_name_lists() {
        let catalog = OfficeCatalog::from_librarian(&ModelLibrarian::builtin());
        assert_eq!(catalog.tables.len(), TABLE_NAMES.len());
        assert_eq!(catalog.chairs.len(), CHAIR_NAMES.len());
        assert_eq!(catalog.lamps.len(), LAMP_NAMES.len());
    }

    #[test]
    fn builtin_urls_use_platform_infix() {
        let librarian = ModelLibrarian::builtin();
        let record = librarian.get_record("macbook_air").expect("laptop");
        let url = record.url().expect("url");
        assert!(url.contains(&format!("/{}/", platform_infix())));
        assert!(url.ends_with("/macbook_air"));
    }

    #[test]
    fn parses_librarian_records_and_filters_by_wnid() {
        let librarian = ModelLibrarian::from_json_str(RECORDS).expect("records");
        let chairs = librarian.get_all_models_in_wnid(CHAIR_WNID);
        assert_eq!(chairs.len(), 2);

        let catalog = OfficeCatalog::from_librarian(&librarian);
        assert_eq!(catalog.chairs.len(), 1);
        assert_eq!(catalog.chairs[0].name, "wood_chair");
        assert_eq!(catalog.tables[0].scale_factor, 1.0);
        assert!(catalog.lamps.is_empty());
    }

    #[test]
    fn missing_record_is_asset_not_found() {
        let librarian = ModelLibrarian::builtin();
        let err = librarian.get_record("banana_split").expect_err("missing");
        assert_eq!(err, SceneError::AssetNotFound("banana_split".into()));
    }

    #[test]
    fn record_without_platform_url_is_asset_not_found() {
        let librarian = ModelLibrarian::from_json_str(RECORDS).expect("records");
        let stool = librarian.get_record("bar_stool").expect("stool");
        assert!(matches!(stool.url(), Err(SceneError::AssetNotFound(_))));
    }

    #[test]
    fn empty_pool_cannot_be_chosen_from() {
        let librarian = ModelLibrarian::from_json_str(RECORDS).expect("records");
        let catalog = OfficeCatalog::from_librarian(&librarian);
        let mut rng = StdRng::seed_from_u64(3);
        assert!(catalog.choose_table(&mut rng).is_ok());
        assert!(matches!(
            catalog.choose_lamp(&mut rng),
            Err(SceneError::AssetNotFound(_))
        ));
    }

    #[test]
    fn insert_replaces_records_by_name() {
        let mut librarian = ModelLibrarian::builtin();
        let before = librarian.records().len();
        librarian.insert(ModelRecord::hosted("apple", "n07739125", "apple"));
        librarian.insert(ModelRecord::hosted("apple", "n07739125", "fruit"));
        assert_eq!(librarian.records().len(), before + 1);
        assert_eq!(librarian.get_record("apple").expect("apple").wcategory, "fruit");
    }

    #[test]
    fn merged_file_keeps_bundled_records() {
        let mut librarian = ModelLibrarian::builtin();
        let before = librarian.records().len();
        librarian.merge(ModelLibrarian::from_json_str(RECORDS).expect("records"));

        assert_eq!(librarian.records().len(), before + 1);
        assert!(librarian.get_record("macbook_air").is_ok());
        assert!(librarian.get_record("bar_stool").is_ok());
        let table = librarian.get_record("sm_table_white").expect("table");
        assert!(table.urls.is_empty());
    }

    #[test]
    fn loads_records_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(RECORDS.as_bytes()).expect("write");
        let librarian = ModelLibrarian::load(file.path()).expect("load");
        assert_eq!(librarian.records().len(), 3);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ModelLibrarian::load(Path::new("/nonexistent/models.json")).expect_err("missing");
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
