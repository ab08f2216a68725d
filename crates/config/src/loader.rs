use std::path::{Path, PathBuf};

use {secrecy::Secret, tracing::debug};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::ChorusConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["chorus.toml", "chorus.yaml", "chorus.yml", "chorus.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<ChorusConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&substitute_env(&raw), path)
}

/// Load the explicit path when given, otherwise the first config found in
/// standard locations, otherwise defaults.
///
/// Search order:
/// 1. `./chorus.{toml,yaml,yml,json}`
/// 2. `~/.config/chorus/chorus.{toml,yaml,yml,json}`
///
/// Returns the path that was loaded, if any.
pub fn discover_and_load(explicit: Option<&Path>) -> Result<(ChorusConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            Ok((load_config(&path)?, Some(path)))
        },
        None => {
            debug!("no config file found, using defaults");
            Ok((ChorusConfig::default(), None))
        },
    }
}

fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = directories::ProjectDirs::from("", "", "chorus")
        .map(|dirs| {
            CONFIG_FILENAMES
                .iter()
                .map(|name| dirs.config_dir().join(name))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    local.chain(global).find(|p| p.exists())
}

fn parse_config(raw: &str, path: &Path) -> Result<ChorusConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        other => Err(Error::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}

/// Apply environment variable overrides from the process environment.
pub fn apply_env_overrides(config: &mut ChorusConfig) -> Result<()> {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

/// Apply overrides read through `lookup`:
///
/// - `OPENROUTER_API_KEY` → `generation.api_key`
/// - `MESSAGE_COLLECTION_SECONDS` → `session.message_collection_secs`
/// - `LIVE_CHECK_INTERVAL_SECONDS` → `supervisor.live_check_interval_secs`
/// - `CHORUS_BIND` / `CHORUS_PORT` → `server.bind` / `server.port`
pub fn apply_env_overrides_with(
    config: &mut ChorusConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(key) = lookup("OPENROUTER_API_KEY").filter(|k| !k.trim().is_empty()) {
        config.generation.api_key = Secret::new(key);
    }
    if let Some(secs) = lookup("MESSAGE_COLLECTION_SECONDS") {
        config.session.message_collection_secs = parse_number("MESSAGE_COLLECTION_SECONDS", &secs)?;
    }
    if let Some(secs) = lookup("LIVE_CHECK_INTERVAL_SECONDS") {
        config.supervisor.live_check_interval_secs =
            parse_number("LIVE_CHECK_INTERVAL_SECONDS", &secs)?;
    }
    if let Some(bind) = lookup("CHORUS_BIND") {
        config.server.bind = bind;
    }
    if let Some(port) = lookup("CHORUS_PORT") {
        config.server.port = parse_number("CHORUS_PORT", &port)?;
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Invalid(format!("{name}={value:?}: {e}")))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret, std::collections::HashMap};

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "chorus.toml",
            "[server]\nport = 9100\n[supervisor]\nlive_check_interval_secs = 5\n",
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.supervisor.live_check_interval_secs, 5);
    }

    #[test]
    fn loads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = write(&dir, "chorus.yaml", "session:\n  default_sender_count: 3\n");
        assert_eq!(load_config(&yaml).unwrap().session.default_sender_count, 3);

        let json = write(&dir, "chorus.json", r#"{"kick": {"api_base": "http://localhost"}}"#);
        assert_eq!(load_config(&json).unwrap().kick.api_base, "http://localhost");
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "chorus.ini", "port=1");
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat { extension }) if extension == "ini"
        ));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "chorus.toml", "[server\nport = ");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("chorus.toml"));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            discover_and_load(Some(&missing)),
            Err(Error::Read { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENROUTER_API_KEY", "sk-env"),
            ("MESSAGE_COLLECTION_SECONDS", "12"),
            ("LIVE_CHECK_INTERVAL_SECONDS", " 7 "),
            ("CHORUS_PORT", "8123"),
        ]);
        let mut cfg = ChorusConfig::default();
        apply_env_overrides_with(&mut cfg, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.generation.api_key.expose_secret(), "sk-env");
        assert_eq!(cfg.session.message_collection_secs, 12);
        assert_eq!(cfg.supervisor.live_check_interval_secs, 7);
        assert_eq!(cfg.server.port, 8123);
        assert_eq!(cfg.server.bind, "127.0.0.1");
    }

    #[test]
    fn malformed_env_number_is_invalid() {
        let mut cfg = ChorusConfig::default();
        let err = apply_env_overrides_with(&mut cfg, |k| {
            (k == "MESSAGE_COLLECTION_SECONDS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("MESSAGE_COLLECTION_SECONDS"));
    }
}
