//! Static category taxonomy and search filters
//!
//! Category paths are `group` or `group.sub`, encoded for the query string
//! as `<group index>_<sub index>` with 1-based indices. `0_0` means every
//! category.

use crate::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Groups in index order, each with its sub-categories in index order
pub const TAXONOMY: &[(&str, &[&str])] = &[
    (
        "anime",
        &[
            "anime_music_video",
            "english_translated",
            "non_english_translated",
            "raw",
        ],
    ),
    ("audio", &["lossless", "lossy"]),
    (
        "literature",
        &["english_translated", "non_english_translated", "raw"],
    ),
    (
        "live_action",
        &[
            "english_translated",
            "idol_promotional_video",
            "non_english_translated",
            "raw",
        ],
    ),
    ("pictures", &["graphics", "photos"]),
    ("software", &["applications", "games"]),
];

/// Code for "all categories"
pub const ALL_CATEGORIES: &str = "0_0";

/// Encodes an optional category path
///
/// # Returns
///
/// * `Ok(String)` - `0_0`, `<g>_0` for a bare group, or `<g>_<s>`
/// * `Err(ConfigError::InvalidCategory)` - Unknown group or sub-category
pub fn encode_category(path: Option<&str>) -> Result<String, ConfigError> {
    let path = match path.map(str::trim) {
        None | Some("") => return Ok(ALL_CATEGORIES.to_string()),
        Some(path) => path,
    };

    let (group, sub) = match path.split_once('.') {
        Some((group, sub)) => (group, Some(sub)),
        None => (path, None),
    };

    let (group_index, subs) = TAXONOMY
        .iter()
        .enumerate()
        .find(|(_, (name, _))| *name == group)
        .map(|(index, (_, subs))| (index + 1, *subs))
        .ok_or_else(|| ConfigError::InvalidCategory(path.to_string()))?;

    let sub_index = match sub {
        None => 0,
        Some(sub) => subs
            .iter()
            .position(|name| *name == sub)
            .map(|index| index + 1)
            .ok_or_else(|| ConfigError::InvalidCategory(path.to_string()))?,
    };

    Ok(format!("{}_{}", group_index, sub_index))
}

/// Every valid category path, groups first
pub fn category_paths() -> Vec<String> {
    TAXONOMY
        .iter()
        .flat_map(|(group, subs)| {
            std::iter::once(group.to_string())
                .chain(subs.iter().map(move |sub| format!("{}.{}", group, sub)))
        })
        .collect()
}

/// Uploader trust filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    /// All torrents
    #[default]
    NoFilter,
    /// Exclude re-encodes, remuxes and re-uploads
    NoRemakes,
    /// Only torrents from trusted uploaders
    TrustedOnly,
}

impl Filter {
    /// Numeric code used in the query string
    pub fn code(&self) -> u8 {
        match self {
            Self::NoFilter => 0,
            Self::NoRemakes => 1,
            Self::TrustedOnly => 2,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoFilter => "none",
            Self::NoRemakes => "no-remakes",
            Self::TrustedOnly => "trusted",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Filter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "none" | "no-filter" => Ok(Self::NoFilter),
            "1" | "no-remakes" => Ok(Self::NoRemakes),
            "2" | "trusted" | "trusted-only" => Ok(Self::TrustedOnly),
            other => Err(ConfigError::Validation(format!(
                "unknown filter '{}' (expected none, no-remakes or trusted)",
                other
            ))),
        }
    }
}
