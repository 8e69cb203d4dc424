//! Level catalog: read-only level data keyed by `(level_number, variant)`
//!
//! The built-in catalog is bundled as JSON; a deployment can point at its own
//! file instead. Either way the data is validated once at load time so the
//! verifier never has to second-guess it.

use crate::error::{Error, Result};
use crate::types::{FragmentId, Level};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use tracing::info;

const BUILTIN_LEVELS: &str = include_str!("../data/levels.json");

#[derive(Clone, Debug, Default)]
pub struct LevelCatalog {
    levels: BTreeMap<(u32, u32), Level>,
}

impl LevelCatalog {
    /// Build and validate a catalog from level definitions.
    pub fn new(levels: Vec<Level>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for level in levels {
            validate_level(&level)?;
            let key = (level.level_number, level.variant);
            if map.insert(key, level).is_some() {
                return Err(Error::invalid_catalog(format!(
                    "level {} variant {} defined twice",
                    key.0, key.1
                )));
            }
        }
        Ok(Self { levels: map })
    }

    /// The levels shipped with the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_LEVELS)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let levels: Vec<Level> = serde_json::from_str(json)?;
        Self::new(levels)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&content)?;
        info!("Loaded {} levels from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// `path` when given, the built-in levels otherwise.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    pub fn lookup(&self, level_number: u32, variant: u32) -> Option<&Level> {
        self.levels.get(&(level_number, variant))
    }

    /// Like [`lookup`](Self::lookup) but as an error, for callers that must abort.
    pub fn require(&self, level_number: u32, variant: u32) -> Result<&Level> {
        self.lookup(level_number, variant)
            .ok_or(Error::LevelNotFound {
                level: level_number,
                variant,
            })
    }

    /// All levels ordered by level number, then variant.
    pub fn levels(&self) -> impl Iterator<Item = &Level> {
        self.levels.values()
    }

    pub fn variants(&self) -> BTreeSet<u32> {
        self.levels.keys().map(|(_, variant)| *variant).collect()
    }

    pub fn max_level(&self, variant: u32) -> Option<u32> {
        self.levels
            .keys()
            .filter(|(_, v)| *v == variant)
            .map(|(level, _)| *level)
            .max()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

fn validate_level(level: &Level) -> Result<()> {
    let tag = format!("level {} variant {}", level.level_number, level.variant);
    let fail = |msg: String| Err(Error::invalid_catalog(format!("{tag}: {msg}")));

    let mut fragment_ids = HashSet::new();
    for fragment in &level.fragments {
        if !fragment_ids.insert(&fragment.id) {
            return fail(format!("duplicate fragment id {}", fragment.id));
        }
    }

    if level.canonical_sequence.is_empty() {
        return fail("empty canonical sequence".into());
    }
    let mut canonical: HashSet<&FragmentId> = HashSet::new();
    for id in &level.canonical_sequence {
        if !fragment_ids.contains(id) {
            return fail(format!("canonical id {id} has no fragment"));
        }
        if !canonical.insert(id) {
            return fail(format!("canonical id {id} repeated"));
        }
    }

    let mut grouped: HashSet<&FragmentId> = HashSet::new();
    for group in &level.interchangeable_groups {
        if group.len() < 2 {
            return fail("interchangeable group with fewer than 2 members".into());
        }
        for id in group {
            if !canonical.contains(id) {
                return fail(format!("group member {id} not in canonical sequence"));
            }
            if !grouped.insert(id) {
                return fail(format!("{id} belongs to more than one group"));
            }
        }
    }
    Ok(())
}
