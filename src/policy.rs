//! Exclusion policy: which styleable attrs lose their `format`, and which archives are eligible.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid policy TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid exclusion '{0}', expected STYLEABLE=ATTR")]
    InvalidExclusion(String),

    #[error("owner path filter entries must not be empty")]
    EmptyOwner,
}

/// Policy file layout. Key names follow the host build DSL.
///
/// ```toml
/// excludeDeclareStyleAttrsFormatPath = ["com.example:libfoo"]
///
/// [excludeDeclareStyleAttrsFormat]
/// Theme_Attrs = "android:textColor"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PolicyConfig {
    #[serde(default)]
    exclude_declare_style_attrs_format: BTreeMap<String, String>,
    #[serde(default)]
    exclude_declare_style_attrs_format_path: Vec<String>,
}

/// Immutable description of which `format` attributes to drop.
///
/// Built once by the caller and handed to the resolver by reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionPolicy {
    /// styleable name -> attr name whose `format` is removed
    exclusions: BTreeMap<String, String>,
    /// `group:artifact` fragments, in insertion order, without duplicates
    owner_filters: Vec<String>,
}

impl ExclusionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the `format` of `attr` inside the styleable `styleable`.
    /// A later entry for the same styleable replaces the earlier one.
    pub fn with_exclusion(mut self, styleable: impl Into<String>, attr: impl Into<String>) -> Self {
        self.exclusions.insert(styleable.into(), attr.into());
        self
    }

    /// Restrict processing to archives whose path contains `fragment`
    pub fn with_owner(mut self, fragment: impl Into<String>) -> Self {
        let fragment = fragment.into();
        if !self.owner_filters.contains(&fragment) {
            self.owner_filters.push(fragment);
        }
        self
    }

    /// Parse a policy from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, PolicyError> {
        let config: PolicyConfig = toml::from_str(content)?;

        let mut policy = Self::new();
        for (styleable, attr) in config.exclude_declare_style_attrs_format {
            if styleable.trim().is_empty() || attr.trim().is_empty() {
                return Err(PolicyError::InvalidExclusion(format!("{}={}", styleable, attr)));
            }
            policy = policy.with_exclusion(styleable, attr);
        }
        for fragment in config.exclude_declare_style_attrs_format_path {
            if fragment.trim().is_empty() {
                return Err(PolicyError::EmptyOwner);
            }
            policy = policy.with_owner(fragment);
        }

        Ok(policy)
    }

    /// Load a policy file from disk
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let content = fs::read_to_string(path).map_err(|source| PolicyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Attr whose `format` is dropped for the given styleable, if any
    pub fn excluded_attr(&self, styleable: &str) -> Option<&str> {
        self.exclusions.get(styleable).map(String::as_str)
    }

    pub fn owner_filters(&self) -> &[String] {
        &self.owner_filters
    }

    /// True when no styleable is listed, so processing can change nothing
    pub fn is_empty(&self) -> bool {
        self.exclusions.is_empty()
    }

    /// Whether a candidate root may be processed.
    ///
    /// With no owner filters every root is eligible. Otherwise the root's path must contain
    /// at least one filter, with `group:artifact` written as `group/artifact`.
    pub fn is_eligible(&self, root: &Path) -> bool {
        if self.owner_filters.is_empty() {
            return true;
        }

        let root = root.to_string_lossy();
        self.owner_filters
            .iter()
            .any(|fragment| root.contains(normalize_owner(fragment).as_str()))
    }
}

/// Turn a `group:artifact` coordinate into the matching path fragment
pub fn normalize_owner(fragment: &str) -> String {
    fragment.replace(':', MAIN_SEPARATOR_STR)
}

/// Parse a `STYLEABLE=ATTR` pair as given on the command line
pub fn parse_exclusion(entry: &str) -> Result<(String, String), PolicyError> {
    let (styleable, attr) = entry
        .split_once('=')
        .ok_or_else(|| PolicyError::InvalidExclusion(entry.to_string()))?;
    let (styleable, attr) = (styleable.trim(), attr.trim());
    if styleable.is_empty() || attr.is_empty() {
        return Err(PolicyError::InvalidExclusion(entry.to_string()));
    }
    Ok((styleable.to_string(), attr.to_string()))
}
