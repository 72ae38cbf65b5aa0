//! Loading framework definitions from JSON or YAML

use crate::error::FrameworkError;
use crate::tree::Framework;
use std::path::Path;

/// Serialized framework format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameworkFormat {
    /// `.json`
    Json,
    /// `.yaml` / `.yml`
    Yaml,
}

impl FrameworkFormat {
    /// Detect format from a file extension
    ///
    /// # Errors
    /// `UnsupportedFormat` for anything other than json/yaml/yml
    pub fn from_path(path: &Path) -> Result<Self, FrameworkError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(FrameworkError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Parse a framework definition from text
///
/// # Errors
/// Parse errors for malformed input
pub fn parse_framework(source: &str, format: FrameworkFormat) -> Result<Framework, FrameworkError> {
    let framework = match format {
        FrameworkFormat::Json => serde_json::from_str(source)?,
        FrameworkFormat::Yaml => serde_yaml::from_str(source)?,
    };
    Ok(framework)
}

/// Read and parse a framework definition file
///
/// The result is not yet validated; call [`Framework::validate`].
///
/// # Errors
/// I/O, format detection and parse errors
pub fn load_framework(path: impl AsRef<Path>) -> Result<Framework, FrameworkError> {
    let path = path.as_ref();
    let format = FrameworkFormat::from_path(path)?;
    let source = std::fs::read_to_string(path)?;
    let framework = parse_framework(&source, format)?;
    tracing::info!(path = %path.display(), framework = %framework.id, "loaded framework");
    Ok(framework)
}
