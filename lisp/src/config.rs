use serde_derive::Deserialize;
use thiserror::Error;

/// How a `lambda` or `defun` holds on to the scope it is created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosureCapture {
    /// keep a link to the defining scope; later changes to it are visible
    #[default]
    Linked,
    /// copy the local bindings at creation time; only globals stay live
    Snapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub closure_capture: ClosureCapture,
}

#[derive(Error, Debug)]
#[error("invalid interpreter config: {0}")]
pub struct ConfigError(#[from] toml::de::Error);

impl Config {
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }
}
