//! Quota declaration files
//!
//! Declarations are read from YAML (`.yaml`/`.yml`) or JSON (`.json`):
//!
//! ```yaml
//! quotas:
//!   - resource_name: compute_cores
//!     resource_quotas:
//!       - region: ru-1
//!         zone: ru-1b
//!         value: 4
//! ```

use super::quota::QuotaDeclaration;
use anyhow::{Context, Result};
use std::path::Path;

/// Supported declaration formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Json,
}

impl ManifestFormat {
    /// Pick the format from the file extension, YAML by default
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Parse a declaration from text
pub fn parse_declaration(content: &str, format: ManifestFormat) -> Result<QuotaDeclaration> {
    let declaration = match format {
        ManifestFormat::Json => {
            serde_json::from_str(content).context("Failed to parse JSON quota declaration")?
        }
        ManifestFormat::Yaml => {
            serde_yaml::from_str(content).context("Failed to parse YAML quota declaration")?
        }
    };
    Ok(declaration)
}

/// Load a declaration from disk
pub fn load_declaration(path: &Path) -> Result<QuotaDeclaration> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read quota declaration {}", path.display()))?;
    let declaration = parse_declaration(&content, ManifestFormat::from_path(path))?;

    tracing::debug!(
        "Loaded {} quota entries from {}",
        declaration.quotas.len(),
        path.display()
    );
    Ok(declaration)
}

/// Render a declaration in the given format
pub fn render_declaration(
    declaration: &QuotaDeclaration,
    format: ManifestFormat,
) -> Result<String> {
    let rendered = match format {
        ManifestFormat::Json => serde_json::to_string_pretty(declaration)?,
        ManifestFormat::Yaml => serde_yaml::to_string(declaration)?,
    };
    Ok(rendered)
}
