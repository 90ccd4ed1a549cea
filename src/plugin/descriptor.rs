use serde::Deserialize;

/// Name used to test whether a package is installed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct LookupKey(pub String);

impl LookupKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LookupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One installable unit: where its archive lives and which parts of it
/// belong to the package.
///
/// `destination_name` and `lookup_key` must not change once a package is
/// installed; the previous copy would be orphaned.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageDescriptor {
    pub name: String,
    /// Empty installs straight into the root. A name with a dot is a
    /// single-file target.
    #[serde(default)]
    pub destination_name: String,
    pub lookup_key: LookupKey,
    pub archive_url: String,
    #[serde(default)]
    pub selection_patterns: Option<Vec<String>>,
    #[serde(default)]
    pub added_at: String,
}

impl PackageDescriptor {
    pub fn new(
        name: impl Into<String>,
        destination_name: impl Into<String>,
        lookup_key: impl Into<String>,
        archive_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            destination_name: destination_name.into(),
            lookup_key: LookupKey::new(lookup_key),
            archive_url: archive_url.into(),
            selection_patterns: None,
            added_at: String::new(),
        }
    }

    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection_patterns = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_added_at(mut self, added_at: impl Into<String>) -> Self {
        self.added_at = added_at.into();
        self
    }

    pub fn is_single_file_target(&self) -> bool {
        self.destination_name.contains('.')
    }

    /// Whether planned paths get wrapped in a `destination_name/` directory.
    pub fn wraps_in_directory(&self) -> bool {
        !self.destination_name.is_empty() && !self.is_single_file_target()
    }

    /// Patterns, with `None` for "extract everything".
    pub fn patterns(&self) -> Option<&[String]> {
        self.selection_patterns.as_deref()
    }

    /// Name of the transient archive written next to the installed packages.
    pub fn transient_archive_prefix(&self) -> String {
        let stem = if self.destination_name.is_empty() {
            self.lookup_key.as_str()
        } else {
            self.destination_name.as_str()
        };
        let stem = if stem.is_empty() { "default" } else { stem };
        format!(".{stem}.")
    }
}
