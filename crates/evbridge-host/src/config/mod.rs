//! Bridge config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use evbridge_core::error::{BridgeError, Result};

pub use schema::{BridgeConfig, BridgeSection};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<BridgeConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)
        .map_err(|e| BridgeError::Config(format!("read {} failed: {e}", path.display())))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<BridgeConfig> {
    let cfg: BridgeConfig =
        serde_yaml::from_str(s).map_err(|e| BridgeError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
