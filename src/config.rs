//! Serialization policy for emitted worlds.
//!
//! All types implement [`serde::Deserialize`] and are usually loaded from a
//! TOML document:
//!
//! ```toml
//! [emit]
//! indent = 2
//! kind_tags = "named"
//! layer_display_name = "mirror_name"
//! ```
//!
//! Every field is optional and falls back to its default.

use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::source::TextSource;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    emit: EmitConfig,
}

impl Config {
    pub fn new(emit: EmitConfig) -> Self {
        Self { emit }
    }

    /// Returns the emission settings.
    pub fn emit(&self) -> &EmitConfig {
        &self.emit
    }

    /// Parses a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML document from a text source.
    pub async fn from_source(source: &impl TextSource, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = path.display().to_string(); "Loading configuration");
        let text = source.read_text(path).await.map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

/// How entities are written back out.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmitConfig {
    /// Spaces per nesting level in emitted text.
    indent: usize,

    /// Whether geometry kinds are written as numbers or names.
    kind_tags: KindTags,

    /// What a layer's `display_name` is written as.
    layer_display_name: DisplayNamePolicy,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            indent: 4,
            kind_tags: KindTags::default(),
            layer_display_name: DisplayNamePolicy::default(),
        }
    }
}

impl EmitConfig {
    pub fn indent(&self) -> usize {
        self.indent
    }

    pub fn kind_tags(&self) -> KindTags {
        self.kind_tags
    }

    pub fn layer_display_name(&self) -> DisplayNamePolicy {
        self.layer_display_name
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_kind_tags(mut self, kind_tags: KindTags) -> Self {
        self.kind_tags = kind_tags;
        self
    }

    pub fn with_layer_display_name(mut self, policy: DisplayNamePolicy) -> Self {
        self.layer_display_name = policy;
        self
    }
}

/// Wire form of a geometry kind. Decoding accepts both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindTags {
    /// `0` through `5`, in declaration order of [`Kind`](crate::world::Kind).
    #[default]
    Numeric,
    /// Lowercase names such as `"rectangle"`.
    Named,
}

/// What a layer's `display_name` is emitted as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayNamePolicy {
    /// The stored value; omitted when the layer has none.
    #[default]
    Preserve,
    /// Always the layer's `name`, whatever was stored. Output written this way
    /// does not round-trip a differing `display_name`.
    MirrorName,
}
