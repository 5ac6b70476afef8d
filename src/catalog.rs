//! Thread catalog: the read-only table of manufacturer thread colours.
//!
//! A [`ThreadCatalog`] is built once (from JSON or the embedded built-in data)
//! and then shared by reference. LAB values are always recomputed from RGB at
//! load time so they cannot drift from the conversion used for image pixels.

use crate::color_space::{rgb_to_hex, rgb_to_lab, LabColor, RgbColor};
use crate::error::CatalogLoadError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

const BUILTIN_CATALOG: &str = include_str!("../data/threads.json");

/// Supported thread manufacturers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Brand {
    #[serde(rename = "DMC")]
    Dmc,
    Anchor,
    Ariadna,
    Madeira,
}

impl Brand {
    pub const ALL: [Brand; 4] = [Brand::Dmc, Brand::Anchor, Brand::Ariadna, Brand::Madeira];

    pub fn as_str(&self) -> &'static str {
        match self {
            Brand::Dmc => "DMC",
            Brand::Anchor => "Anchor",
            Brand::Ariadna => "Ariadna",
            Brand::Madeira => "Madeira",
        }
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBrand(pub String);

impl fmt::Display for UnknownBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown thread brand '{}'", self.0)
    }
}

impl std::error::Error for UnknownBrand {}

impl FromStr for Brand {
    type Err = UnknownBrand;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Brand::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownBrand(s.to_string()))
    }
}

/// One manufactured thread colour. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadEntry {
    pub thread_id: String,
    pub brand: Brand,
    pub color_code: String,
    pub color_name: Option<String>,
    pub rgb: RgbColor,
    pub lab: LabColor,
}

impl ThreadEntry {
    pub fn hex(&self) -> String {
        rgb_to_hex(self.rgb)
    }

    /// Name for display; falls back to the colour code.
    pub fn display_name(&self) -> &str {
        self.color_name.as_deref().unwrap_or(&self.color_code)
    }
}

/// A catalog source record as it appears in JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadRecord {
    pub thread_id: String,
    pub brand: String,
    pub color_code: String,
    #[serde(default)]
    pub color_name: Option<String>,
    pub rgb: [i64; 3],
}

impl ThreadRecord {
    pub fn new(
        thread_id: &str,
        brand: &str,
        color_code: &str,
        color_name: Option<&str>,
        rgb: [i64; 3],
    ) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            brand: brand.to_string(),
            color_code: color_code.to_string(),
            color_name: color_name.map(str::to_string),
            rgb,
        }
    }

    fn into_entry(self) -> Result<ThreadEntry, CatalogLoadError> {
        if self.thread_id.trim().is_empty() {
            return Err(CatalogLoadError::MissingField {
                thread_id: self.thread_id,
                field: "thread_id",
            });
        }
        if self.color_code.trim().is_empty() {
            return Err(CatalogLoadError::MissingField {
                thread_id: self.thread_id,
                field: "color_code",
            });
        }
        let brand = self
            .brand
            .parse::<Brand>()
            .map_err(|e| CatalogLoadError::UnknownBrand {
                thread_id: self.thread_id.clone(),
                brand: e.0,
            })?;

        let mut channels = [0u8; 3];
        for (slot, &value) in channels.iter_mut().zip(self.rgb.iter()) {
            *slot = u8::try_from(value).map_err(|_| CatalogLoadError::RgbOutOfRange {
                thread_id: self.thread_id.clone(),
                value,
            })?;
        }
        let rgb = RgbColor::new(channels[0], channels[1], channels[2]);

        Ok(ThreadEntry {
            thread_id: self.thread_id,
            brand,
            color_code: self.color_code,
            color_name: self.color_name.filter(|n| !n.trim().is_empty()),
            rgb,
            lab: rgb_to_lab(rgb),
        })
    }
}

/// Ordered, read-only collection of threads keyed by `thread_id`, with a
/// secondary index by brand.
#[derive(Debug, Clone)]
pub struct ThreadCatalog {
    entries: Vec<ThreadEntry>,
    by_id: HashMap<String, usize>,
    by_brand: HashMap<Brand, Vec<usize>>,
}

impl ThreadCatalog {
    /// Build a catalog from source records, validating every invariant.
    pub fn from_records<I>(records: I) -> Result<Self, CatalogLoadError>
    where
        I: IntoIterator<Item = ThreadRecord>,
    {
        let mut entries = Vec::new();
        let mut by_id = HashMap::new();
        let mut by_brand: HashMap<Brand, Vec<usize>> = HashMap::new();
        let mut codes: HashSet<(Brand, String)> = HashSet::new();

        for record in records {
            let entry = record.into_entry()?;
            if by_id.contains_key(&entry.thread_id) {
                return Err(CatalogLoadError::DuplicateId(entry.thread_id));
            }
            // Codes are looked up case-insensitively, so they must be unique that way too
            if !codes.insert((entry.brand, entry.color_code.to_ascii_uppercase())) {
                return Err(CatalogLoadError::DuplicateCode {
                    brand: entry.brand.to_string(),
                    code: entry.color_code,
                });
            }
            let idx = entries.len();
            by_id.insert(entry.thread_id.clone(), idx);
            by_brand.entry(entry.brand).or_default().push(idx);
            entries.push(entry);
        }

        log::debug!(
            "Loaded thread catalog: {} threads across {} brands",
            entries.len(),
            by_brand.len()
        );

        Ok(Self {
            entries,
            by_id,
            by_brand,
        })
    }

    /// Parse a JSON array of thread records.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogLoadError> {
        let records: Vec<ThreadRecord> = serde_json::from_str(json)?;
        Self::from_records(records)
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, CatalogLoadError> {
        let records: Vec<ThreadRecord> = serde_json::from_reader(reader)?;
        Self::from_records(records)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogLoadError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// The catalog embedded in the binary (DMC, Anchor, Ariadna, Madeira).
    pub fn builtin() -> Result<Self, CatalogLoadError> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    pub fn all(&self) -> &[ThreadEntry] {
        &self.entries
    }

    /// Threads of one brand, in catalog order.
    pub fn by_brand(&self, brand: Brand) -> Vec<&ThreadEntry> {
        self.by_brand
            .get(&brand)
            .map(|idxs| idxs.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    /// Inventory filter: threads whose id is in `ids`, in catalog order.
    /// Unknown ids are ignored.
    pub fn by_ids(&self, ids: &HashSet<String>) -> Vec<&ThreadEntry> {
        let mut idxs: Vec<usize> = ids.iter().filter_map(|id| self.by_id.get(id).copied()).collect();
        idxs.sort_unstable();
        idxs.into_iter().map(|i| &self.entries[i]).collect()
    }

    pub fn get(&self, thread_id: &str) -> Option<&ThreadEntry> {
        self.by_id.get(thread_id).map(|&i| &self.entries[i])
    }

    /// Case-insensitive lookup by manufacturer code.
    pub fn find_code(&self, brand: Brand, code: &str) -> Option<&ThreadEntry> {
        self.by_brand
            .get(&brand)?
            .iter()
            .map(|&i| &self.entries[i])
            .find(|t| t.color_code.eq_ignore_ascii_case(code))
    }

    /// Brands with at least one thread, in declaration order.
    pub fn brands(&self) -> Vec<Brand> {
        let mut brands: Vec<Brand> = self.by_brand.keys().copied().collect();
        brands.sort();
        brands
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
