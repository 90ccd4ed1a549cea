use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use serde::Deserialize;

use crate::plugin::descriptor::PackageDescriptor;

const EXAMPLE_INFO: &str = "Custom information specific to Example Plugin 1.";

/// A package as the catalog presents it.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub descriptor: PackageDescriptor,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub custom_info: Option<String>,
}

impl CatalogEntry {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn matches_query(&self, query: &str, matcher: &SkimMatcherV2) -> bool {
        if query.is_empty() {
            return true;
        }
        matcher.fuzzy_match(self.name(), query).is_some()
            || self.description.to_lowercase().contains(query)
            || self.tags.iter().any(|tag| tag.to_lowercase().contains(query))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStatus {
    #[default]
    All,
    Installed,
    NotInstalled,
    New,
}

impl SearchStatus {
    pub fn next(self) -> Self {
        match self {
            SearchStatus::All => SearchStatus::Installed,
            SearchStatus::Installed => SearchStatus::NotInstalled,
            SearchStatus::NotInstalled => SearchStatus::New,
            SearchStatus::New => SearchStatus::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SearchStatus::All => "all",
            SearchStatus::Installed => "installed",
            SearchStatus::NotInstalled => "not installed",
            SearchStatus::New => "new",
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    plugin: Vec<CatalogEntry>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    window_days: i64,
}

impl Catalog {
    /// Built-in presets followed by the `[[plugin]]` tables of `extra`.
    pub fn load(extra: Option<&Path>, window_days: i64) -> Result<Self> {
        let mut catalog = Self::presets(window_days);
        if let Some(path) = extra {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read catalog {}", path.display()))?;
            let file: CatalogFile = toml::from_str(&raw)
                .with_context(|| format!("invalid catalog {}", path.display()))?;
            tracing::info!("loaded {} extra catalog entries from {}", file.plugin.len(), path.display());
            catalog.entries.extend(file.plugin);
        }
        Ok(catalog)
    }

    pub fn presets(window_days: i64) -> Self {
        let entries = vec![
            preset(
                PackageDescriptor::new(
                    "Theme Library",
                    "ThemeLibrary",
                    "ThemeLibrary",
                    "https://github.com/Faf4a/plugins/archive/refs/heads/main.zip",
                )
                .with_patterns([
                    "ThemeLibrary/components",
                    "ThemeLibrary/index.ts",
                    "ThemeLibrary/types.ts",
                ])
                .with_added_at("1715326"),
                "A library of themes for Vencord.",
            ),
            preset(
                PackageDescriptor::new(
                    "Cute nekos",
                    "neko.ts",
                    "neko.ts",
                    "https://github.com/exhq/vencord-plugins/archive/refs/heads/main.zip",
                )
                .with_patterns(["neko.ts"])
                .with_added_at("1715326747"),
                "what the fuck am i doing with my life",
            ),
            preset(
                PackageDescriptor::new(
                    "Sekai Stickers",
                    "sekaistickers-vencord",
                    "sekaistickers-vencord",
                    "https://github.com/MaiKokain/sekaistickers-vencord/archive/refs/heads/main.zip",
                )
                .with_patterns([
                    "Components",
                    "utils",
                    "characters.json.ts",
                    "index.tsx",
                    "kanade.svg.tsx",
                ])
                .with_added_at("1715326747"),
                "Sekai Stickers built in discord originally from github.com/TheOriginalAyaka",
            ),
            preset(
                PackageDescriptor::new(
                    "Husk",
                    "husk.tsx",
                    "husk.tsx",
                    "https://github.com/nin0-dev/vc-userplugins/archive/refs/heads/master.zip",
                )
                .with_patterns(["husk.tsx"])
                .with_added_at("1715326747"),
                "Adds husk (emoji) button (works only on the Vencord Server if no nitro)",
            ),
        ];
        Self {
            entries,
            window_days,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn find(&self, name: &str) -> Option<&CatalogEntry> {
        let wanted = name.trim().to_lowercase();
        self.entries.iter().find(|entry| {
            entry.name().to_lowercase() == wanted || entry.descriptor.lookup_key.as_str() == name.trim()
        })
    }

    pub fn is_new(&self, entry: &CatalogEntry, now: DateTime<Utc>) -> bool {
        is_newly_added(&entry.descriptor.added_at, now, self.window_days)
    }

    /// Entries passing `status` and `query`, sorted by name.
    pub fn filtered(
        &self,
        status: SearchStatus,
        query: &str,
        installed: &[String],
        now: DateTime<Utc>,
    ) -> Vec<&CatalogEntry> {
        let query = query.trim().to_lowercase();
        let matcher = SkimMatcherV2::default();

        let mut entries: Vec<&CatalogEntry> = self
            .entries
            .iter()
            .filter(|entry| {
                let is_installed = installed
                    .iter()
                    .any(|name| name == entry.descriptor.lookup_key.as_str());
                match status {
                    SearchStatus::All => true,
                    SearchStatus::Installed => is_installed,
                    SearchStatus::NotInstalled => !is_installed,
                    SearchStatus::New => self.is_new(entry, now),
                }
            })
            .filter(|entry| entry.matches_query(&query, &matcher))
            .collect();

        entries.sort_by_key(|entry| entry.name().to_lowercase());
        entries
    }
}

fn preset(descriptor: PackageDescriptor, description: &str) -> CatalogEntry {
    CatalogEntry {
        descriptor,
        description: description.to_string(),
        tags: vec!["example".to_string(), "plugin".to_string()],
        authors: Vec::new(),
        custom_info: Some(EXAMPLE_INFO.to_string()),
    }
}

/// `added_at` is unix seconds or RFC 3339. Anything unparseable is not new.
pub fn is_newly_added(added_at: &str, now: DateTime<Utc>, window_days: i64) -> bool {
    let added_at = added_at.trim();
    let added = match added_at.parse::<i64>() {
        Ok(secs) => DateTime::from_timestamp(secs, 0),
        Err(_) => DateTime::parse_from_rfc3339(added_at)
            .ok()
            .map(|date| date.with_timezone(&Utc)),
    };

    let (Some(added), Some(window)) = (added, TimeDelta::try_days(window_days.max(0))) else {
        return false;
    };
    added >= now - window
}
