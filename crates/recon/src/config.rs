use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::calendar::MonthLocale;
use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    /// Folder holding every chain's export, relative to the config file.
    pub sales_folder: PathBuf,
    /// Folder for the target-allocation inputs. Carried, not read.
    #[serde(default)]
    pub target_folder: Option<PathBuf>,
    #[serde(default = "default_record_type")]
    pub record_type: String,
    #[serde(default)]
    pub locale: MonthLocale,
    pub database: DatabaseConfig,
    pub master: MasterConfig,
    #[serde(default)]
    pub distribution: DistributionConfig,
    pub chains: Vec<ChainConfig>,
}

fn default_record_type() -> String {
    "SO".into()
}

// ---------------------------------------------------------------------------
// Database + master data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file receiving the sales table.
    pub path: PathBuf,
    #[serde(default = "default_sales_table")]
    pub sales_table: String,
}

fn default_sales_table() -> String {
    "Ventas".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MasterConfig {
    /// SQLite file holding the inventory/master table.
    pub file: PathBuf,
    #[serde(default = "default_master_table")]
    pub table: String,
}

fn default_master_table() -> String {
    "INVENTARIO_2".into()
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DistributionConfig {
    #[serde(default)]
    pub zero_volume: ZeroVolumePolicy,
}

/// What to do with a (chain, line) group whose units sum to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroVolumePolicy {
    /// Leave the group out of the result.
    #[default]
    Skip,
    /// Abort with `ZeroVolumeGroup`.
    Fail,
}

// ---------------------------------------------------------------------------
// Chains
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub layout: SourceLayout,
    /// File or folder, relative to `sales_folder`.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLayout {
    /// One sheet, already one row per transaction.
    Passthrough,
    /// Amount sheet + units sheet, one column per store.
    Melt,
    /// Folder of per-period workbooks in the canonical shape.
    Directory,
    /// One workbook, one canonical sheet per period.
    MultiSheet,
}

impl std::fmt::Display for SourceLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passthrough => write!(f, "passthrough"),
            Self::Melt => write!(f, "melt"),
            Self::Directory => write!(f, "directory"),
            Self::MultiSheet => write!(f, "multi_sheet"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: PipelineConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.chains.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one chain is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for chain in &self.chains {
            if chain.name.trim().is_empty() {
                return Err(ReconError::ConfigValidation("chain name cannot be empty".into()));
            }
            if !seen.insert(chain.name.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate chain '{}'",
                    chain.name
                )));
            }
            if chain.path.as_os_str().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "chain '{}': path cannot be empty",
                    chain.name
                )));
            }
        }

        check_table_name("database.sales_table", &self.database.sales_table)?;
        check_table_name("master.table", &self.master.table)?;

        if self.record_type.is_empty() {
            return Err(ReconError::ConfigValidation("record_type cannot be empty".into()));
        }

        Ok(())
    }

    /// Resolve every relative path against `base_dir` (the config file's folder).
    pub fn resolve(mut self, base_dir: &Path) -> Self {
        self.sales_folder = base_dir.join(&self.sales_folder);
        self.target_folder = self.target_folder.map(|p| base_dir.join(p));
        self.database.path = base_dir.join(&self.database.path);
        self.master.file = base_dir.join(&self.master.file);
        self
    }

    pub fn chain_path(&self, chain: &ChainConfig) -> PathBuf {
        self.sales_folder.join(&chain.path)
    }
}

fn check_table_name(field: &str, name: &str) -> Result<(), ReconError> {
    if name.trim().is_empty() {
        return Err(ReconError::ConfigValidation(format!("{field} cannot be empty")));
    }
    if name.contains('\0') {
        return Err(ReconError::ConfigValidation(format!(
            "{field} contains a NUL character"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
