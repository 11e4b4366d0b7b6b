use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default jobtree data directory: ~/.jobtree
pub fn get_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".jobtree"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.jobtree/config.toml (highest)
    let user_config = get_data_dir()?.join("config.toml");

    // Priority 2: ./jobtree.toml (current directory)
    let local_config = Path::new("jobtree.toml");

    let mut cfg = if user_config.exists() {
        load_from(&user_config)?
    } else if local_config.exists() {
        load_from(local_config)?
    } else {
        AppConfig::default()
    };

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

pub fn load_from(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)?;
    let cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
    Ok(cfg)
}

/// Environment variable overrides (Priority 0: highest)
pub fn apply_env_overrides(cfg: &mut AppConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("JOBTREE_WALK_TIMEOUT_SECS") {
        match v.trim().parse::<u64>() {
            Ok(secs) => cfg.walk.timeout_secs = Some(secs),
            Err(_) => tracing::warn!(value = %v, "ignoring invalid JOBTREE_WALK_TIMEOUT_SECS"),
        }
    }

    if let Some(v) = var("JOBTREE_FAIL_FAST") {
        cfg.walk.fail_fast = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
    }

    if let Some(v) = var("JOBTREE_STREAM_FORMAT") {
        if !v.trim().is_empty() {
            cfg.walk.stream_format = v.trim().to_string();
        }
    }

    if let Some(v) = var("JOBTREE_LOG_LEVEL") {
        if !v.trim().is_empty() {
            cfg.logging.level = v.trim().to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn load_from_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[walk]\nfail_fast = true\ntimeout_secs = 30").unwrap();

        let cfg = load_from(file.path()).unwrap();
        assert!(cfg.walk.fail_fast);
        assert_eq!(cfg.walk.timeout_secs, Some(30));
        assert_eq!(cfg.walk.stream_format, "text");
        assert_eq!(cfg.walk.command_timeout_secs, 600);
        assert!(cfg.logging.console);
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("JOBTREE_WALK_TIMEOUT_SECS", "12"),
            ("JOBTREE_FAIL_FAST", "yes"),
            ("JOBTREE_STREAM_FORMAT", "jsonl"),
        ]
        .into_iter()
        .collect();

        let mut cfg = AppConfig::default();
        apply_env_overrides(&mut cfg, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.walk.timeout_secs, Some(12));
        assert!(cfg.walk.fail_fast);
        assert_eq!(cfg.walk.stream_format, "jsonl");
    }

    #[test]
    fn invalid_timeout_is_ignored() {
        let mut cfg = AppConfig::default();
        apply_env_overrides(&mut cfg, |k| {
            (k == "JOBTREE_WALK_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert_eq!(cfg.walk.timeout_secs, None);
    }
}
