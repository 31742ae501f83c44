use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

use ledgerlens_core::PipelineConfig;

pub fn ledgerlens_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".ledgerlens"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ledgerlens_home()?.join("config.toml"))
}

/// Load `explicit` if given (it must exist), else the default file if present,
/// else built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<PipelineConfig> {
    let cfg = match explicit {
        Some(p) => load_from(p)?,
        None => {
            let p = config_path()?;
            if p.exists() { load_from(&p)? } else { PipelineConfig::default() }
        }
    };
    Ok(cfg)
}

pub fn load_from(path: &Path) -> Result<PipelineConfig> {
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PipelineConfig = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate().with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

pub fn save_to(path: &Path, cfg: &PipelineConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Write the defaults; an existing file is kept unless `force`.
pub fn init_config(path: Option<&Path>, force: bool) -> Result<PathBuf> {
    let p = match path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };
    if p.exists() && !force {
        bail!("config already exists: {} (pass --force to overwrite)", p.display());
    }
    save_to(&p, &PipelineConfig::default())?;
    Ok(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_load_round_trips_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("nested").join("config.toml");
        init_config(Some(&p), false).unwrap();
        assert_eq!(load_from(&p).unwrap(), PipelineConfig::default());
        assert!(init_config(Some(&p), false).is_err());
        assert!(init_config(Some(&p), true).is_ok());
    }

    #[test]
    fn test_partial_file_and_validation() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.toml");
        fs::write(&p, "[extraction]\ndpi = 200\n").unwrap();
        let cfg = load_config(Some(&p)).unwrap();
        assert_eq!(cfg.extraction.dpi, 200);
        assert_eq!(cfg.parsing, PipelineConfig::default().parsing);

        fs::write(&p, "[parsing]\nmin_reconciliation_rate = 1.5\n").unwrap();
        let err = load_from(&p).unwrap_err();
        assert!(format!("{err:#}").contains("min_reconciliation_rate"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
