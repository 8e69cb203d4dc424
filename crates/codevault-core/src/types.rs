//! Core types for Code Vault

use serde::{Deserialize, Serialize};

/// Identifier of a code fragment, unique within a level.
///
/// Ordering is plain lexicographic over the raw identifier; the normalizer
/// relies on it to pick one arrangement for an interchangeable group.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(String);

impl FragmentId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FragmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for FragmentId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for FragmentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Team identifier as stored: lowercase, whitespace runs collapsed to `-`.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(String);

impl TeamId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Normalise user input the way login does: `" Mona  Lisa "` -> `"mona-lisa"`.
    pub fn sanitize(raw: &str) -> Self {
        let joined = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
            .to_lowercase();
        Self(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TeamId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for TeamId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One labeled, reorderable line of code.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fragment {
    pub id: FragmentId,
    pub text: String,
}

impl Fragment {
    pub fn new(id: impl Into<FragmentId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Static data for one level of one variant.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub level_number: u32,
    #[serde(default)]
    pub variant: u32,
    #[serde(default)]
    pub description: String,
    /// Every fragment shown to the team, bluffs included.
    pub fragments: Vec<Fragment>,
    pub canonical_sequence: Vec<FragmentId>,
    #[serde(default)]
    pub interchangeable_groups: Vec<Vec<FragmentId>>,
    pub expected_terminal_output: String,
}

impl Level {
    pub fn fragment(&self, id: &FragmentId) -> Option<&Fragment> {
        self.fragments.iter().find(|f| &f.id == id)
    }

    /// Fragments that are not part of the canonical sequence.
    pub fn bluffs(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments
            .iter()
            .filter(|f| !self.canonical_sequence.contains(&f.id))
    }
}

/// A team's arrangement: rows of the workspace, each holding zero or more fragments.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Submission {
    pub rows: Vec<Vec<FragmentId>>,
}

impl Submission {
    pub fn new(rows: Vec<Vec<FragmentId>>) -> Self {
        Self { rows }
    }

    /// A single-row submission.
    pub fn from_ids<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<FragmentId>,
    {
        Self {
            rows: vec![ids.into_iter().map(Into::into).collect()],
        }
    }

    /// Row order first, then order within the row.
    pub fn flatten(&self) -> Vec<FragmentId> {
        self.rows.iter().flatten().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }
}
