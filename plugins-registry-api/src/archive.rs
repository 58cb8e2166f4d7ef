//! NPM tarball extraction
//!
//! An uploaded plugin is a gzip-compressed tar archive whose entries live
//! under a `package/` directory. Only three entries matter: `package.json`,
//! the README and the icon file the manifest points at.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tar::{Archive, EntryType};

use crate::error::{RegistryError, RegistryResult};
use crate::models::PluginTier;

const PACKAGE_PREFIX: &str = "package/";
const MANIFEST_FILE: &str = "package.json";
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "svg", "gif", "webp", "ico"];

/// Upper bound on any single entry the extractor reads (manifest, README, icon)
pub const MAX_ENTRY_BYTES: u64 = 8 * 1024 * 1024;

/// `author` may be a plain string or an npm person object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PackageAuthor {
    Name(String),
    Person {
        name: String,
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        url: Option<String>,
    },
}

impl PackageAuthor {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Person { name, .. } => name,
        }
    }
}

/// The subset of `package.json` the marketplace reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: Option<PackageAuthor>,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Path of the icon inside the package
    #[serde(default)]
    pub icon: Option<String>,
    /// Configuration schema rendered as a form by the console
    #[serde(default)]
    pub next_market_config: Option<Value>,
    #[serde(default)]
    pub backend_install_doc: Option<String>,
    #[serde(default, rename = "type")]
    pub declared_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageIcon {
    pub data: Vec<u8>,
    /// Extension including the leading dot, e.g. `.png`
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPackage {
    pub manifest: PackageManifest,
    pub readme: Option<String>,
    pub icon: Option<PackageIcon>,
}

impl ParsedPackage {
    /// The configuration schema as a JSON document, `{}` when the manifest has none
    ///
    /// # Errors
    ///
    /// [`RegistryError::Schema`] when `nextMarketConfig` is present but not an object.
    pub fn config_schema(&self) -> RegistryResult<Value> {
        match &self.manifest.next_market_config {
            None | Some(Value::Null) => Ok(Value::Object(serde_json::Map::new())),
            Some(schema @ Value::Object(_)) => Ok(schema.clone()),
            Some(other) => Err(RegistryError::Schema(format!(
                "nextMarketConfig must be an object, found {}",
                json_kind(other)
            ))),
        }
    }

    /// Compact JSON rendering of [`Self::config_schema`]
    ///
    /// # Errors
    ///
    /// [`RegistryError::Schema`] when the schema is not an object or cannot be serialized.
    pub fn config_schema_json(&self) -> RegistryResult<String> {
        let schema = self.config_schema()?;
        serde_json::to_string(&schema).map_err(|e| RegistryError::Schema(e.to_string()))
    }

    pub fn keywords_joined(&self) -> String {
        self.manifest.keywords.join(",")
    }

    /// `enterprise` only when declared so explicitly
    pub fn tier(&self) -> PluginTier {
        match self.manifest.declared_type.as_deref() {
            Some("enterprise") => PluginTier::Enterprise,
            _ => PluginTier::Free,
        }
    }
}

/// Extract manifest, README and icon from a `.tgz` stream
///
/// # Errors
///
/// [`RegistryError::Parse`] when the stream is not gzip, the tar structure is
/// corrupt, `package.json` is missing or does not match the manifest shape,
/// or an entry that is read exceeds [`MAX_ENTRY_BYTES`].
pub fn extract_package<R: Read>(reader: R) -> RegistryResult<ParsedPackage> {
    extract_package_limited(reader, MAX_ENTRY_BYTES)
}

/// [`extract_package`] with an explicit per-entry limit
///
/// Images seen before `package.json` share one budget of `max_entry_bytes`;
/// images that do not fit are skipped unread.
///
/// # Errors
///
/// As [`extract_package`].
pub fn extract_package_limited<R: Read>(
    reader: R,
    max_entry_bytes: u64,
) -> RegistryResult<ParsedPackage> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    let entries = archive
        .entries()
        .map_err(|e| RegistryError::Parse(format!("failed to read archive: {e}")))?;

    let mut manifest: Option<PackageManifest> = None;
    let mut readme: Option<String> = None;
    let mut icon: Option<PackageIcon> = None;
    // Image entries seen before package.json, keyed by in-package path
    let mut held_images: HashMap<String, Vec<u8>> = HashMap::new();
    let mut held_budget = max_entry_bytes;

    for entry in entries {
        let mut entry =
            entry.map_err(|e| RegistryError::Parse(format!("failed to read tar: {e}")))?;
        if entry.header().entry_type() != EntryType::Regular {
            continue;
        }

        let raw_path = entry
            .path()
            .map_err(|e| RegistryError::Parse(format!("invalid entry path: {e}")))?
            .to_string_lossy()
            .into_owned();
        let filename = raw_path
            .strip_prefix(PACKAGE_PREFIX)
            .unwrap_or(&raw_path)
            .to_string();

        if filename == MANIFEST_FILE {
            let data = read_entry(&mut entry, MANIFEST_FILE, max_entry_bytes)?;
            let parsed: PackageManifest = serde_json::from_slice(&data)
                .map_err(|e| RegistryError::Parse(format!("failed to parse package.json: {e}")))?;
            manifest = Some(parsed);
        } else if filename.eq_ignore_ascii_case("readme.md") {
            let data = read_entry(&mut entry, "README", max_entry_bytes)?;
            readme = Some(String::from_utf8_lossy(&data).into_owned());
        } else if let Some(declared) = manifest.as_ref().and_then(declared_icon) {
            if filename == declared {
                icon = Some(PackageIcon {
                    data: read_entry(&mut entry, "icon", max_entry_bytes)?,
                    extension: extension_of(&filename),
                });
            }
        } else if manifest.is_none() && is_image(&filename) && entry.size() <= held_budget {
            let data = read_entry(&mut entry, "icon", held_budget)?;
            held_budget = held_budget.saturating_sub(data.len() as u64);
            held_images.insert(filename, data);
        }
    }

    let manifest = manifest
        .ok_or_else(|| RegistryError::Parse("package.json not found in archive".to_string()))?;
    if manifest.name.trim().is_empty() {
        return Err(RegistryError::Parse(
            "package.json does not declare a package name".to_string(),
        ));
    }

    if icon.is_none() {
        if let Some(declared) = declared_icon(&manifest) {
            icon = held_images.remove(&declared).map(|data| PackageIcon {
                data,
                extension: extension_of(&declared),
            });
        }
    }

    Ok(ParsedPackage {
        manifest,
        readme,
        icon,
    })
}

fn read_entry<R: Read>(entry: &mut R, what: &str, limit: u64) -> RegistryResult<Vec<u8>> {
    let mut data = Vec::new();
    entry
        .by_ref()
        .take(limit.saturating_add(1))
        .read_to_end(&mut data)
        .map_err(|e| RegistryError::Parse(format!("failed to read {what}: {e}")))?;
    if data.len() as u64 > limit {
        return Err(RegistryError::Parse(format!(
            "{what} exceeds the {limit} byte entry limit"
        )));
    }
    Ok(data)
}

fn declared_icon(manifest: &PackageManifest) -> Option<String> {
    manifest
        .icon
        .as_deref()
        .map(|icon| icon.trim_start_matches("./").to_string())
        .filter(|icon| !icon.is_empty())
}

fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

fn is_image(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
