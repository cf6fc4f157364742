//! Reports which build of the catalog produced a batch.

use polars::prelude::*;
use serde::Deserialize;

use iotfn_model::{ConfigError, FunctionCategory, FunctionError, FunctionMetadata};

use crate::frame::{check_distinct_outputs, require_name, with_columns};
use crate::function::{EntityFunction, ExecutionContext};

pub const PACKAGE_URL: &str = env!("CARGO_PKG_REPOSITORY");
pub const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

fn default_package_url() -> String {
    "package_url".to_string()
}

fn default_module() -> String {
    "module".to_string()
}

fn default_version() -> String {
    "version".to_string()
}

/// Configuration for [`PackageInfo`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PackageInfoConfig {
    pub dummy_item: String,
    #[serde(default = "default_package_url")]
    pub package_url: String,
    #[serde(default = "default_module")]
    pub module: String,
    #[serde(default = "default_version")]
    pub version: String,
}

impl PackageInfoConfig {
    pub fn new(dummy_item: impl Into<String>) -> Self {
        Self {
            dummy_item: dummy_item.into(),
            package_url: default_package_url(),
            module: default_module(),
            version: default_version(),
        }
    }
}

/// Adds constant columns with the package URL, module path and version.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageInfo {
    dummy_item: String,
    package_url: String,
    module: String,
    version: String,
}

impl PackageInfo {
    pub const NAME: &'static str = "PackageInfo";

    pub fn describe() -> FunctionMetadata {
        FunctionMetadata::new(Self::NAME, FunctionCategory::Transformer, "Show the version number.")
            .with_inputs(&["dummy_item"])
            .with_outputs(&["package_url", "module", "version"])
    }

    pub fn new(config: PackageInfoConfig) -> Result<Self, ConfigError> {
        Self::try_from(config)
    }
}

impl TryFrom<PackageInfoConfig> for PackageInfo {
    type Error = ConfigError;

    fn try_from(config: PackageInfoConfig) -> Result<Self, Self::Error> {
        let package_url = require_name("package_url", config.package_url)?;
        let module = require_name("module", config.module)?;
        let version = require_name("version", config.version)?;
        check_distinct_outputs(&[&package_url, &module, &version])?;
        Ok(Self {
            dummy_item: require_name("dummy_item", config.dummy_item)?,
            package_url,
            module,
            version,
        })
    }
}

impl EntityFunction for PackageInfo {
    fn metadata(&self) -> FunctionMetadata {
        Self::describe()
    }

    fn execute(
        &self,
        df: &DataFrame,
        _ctx: &mut ExecutionContext,
    ) -> Result<DataFrame, FunctionError> {
        Ok(with_columns(
            df,
            vec![
                lit(PACKAGE_URL).alias(self.package_url.as_str()),
                lit(module_path!()).alias(self.module.as_str()),
                lit(PACKAGE_VERSION).alias(self.version.as_str()),
            ],
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adds_constant_columns() {
        let info = PackageInfo::new(PackageInfoConfig::new("deviceid")).unwrap();
        let df = DataFrame::new(vec![Column::new("deviceid".into(), vec!["a", "b"])]).unwrap();
        let out = info.execute(&df, &mut ExecutionContext::default()).unwrap();
        assert_eq!(out.width(), 4);
        let version = out.column("version").unwrap().str().unwrap();
        assert_eq!(version.get(1), Some(env!("CARGO_PKG_VERSION")));
        let module = out.column("module").unwrap().str().unwrap();
        assert_eq!(module.get(0), Some("iotfn_transform::package_info"));
    }

    #[test]
    fn test_output_names_must_differ() {
        let mut config = PackageInfoConfig::new("deviceid");
        config.module = "version".to_string();
        assert!(matches!(
            PackageInfo::new(config),
            Err(ConfigError::DuplicateOutput(_))
        ));
    }
}
