use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$FYNMATE_HOME`, else `~/.fynmate`.
pub fn fynmate_home() -> Result<PathBuf> {
    resolve_home(
        std::env::var("FYNMATE_HOME").ok(),
        std::env::var("HOME").ok(),
    )
}

fn resolve_home(override_dir: Option<String>, home: Option<String>) -> Result<PathBuf> {
    if let Some(dir) = override_dir.filter(|d| !d.trim().is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = home.context("HOME is not set (or set FYNMATE_HOME)")?;
    Ok(PathBuf::from(home).join(".fynmate"))
}

pub fn ensure_fynmate_home() -> Result<PathBuf> {
    let dir = fynmate_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn default_db_path() -> Result<PathBuf> {
    Ok(ensure_fynmate_home()?.join("finance.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        let p = resolve_home(Some("/tmp/fm".to_string()), Some("/home/u".to_string())).unwrap();
        assert_eq!(p, PathBuf::from("/tmp/fm"));
    }

    #[test]
    fn test_home_fallback() {
        let p = resolve_home(Some("  ".to_string()), Some("/home/u".to_string())).unwrap();
        assert_eq!(p, PathBuf::from("/home/u/.fynmate"));
        assert!(resolve_home(None, None).is_err());
    }
}
