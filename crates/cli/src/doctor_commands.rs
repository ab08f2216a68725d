//! `chorus doctor`: config validation and credential audit.
//!
//! Prints a report with `[ok]`, `[warn]`, `[fail]`, or `[info]` per item and
//! exits non-zero when anything failed.

use std::path::Path;

use {
    anyhow::Result,
    chorus_config::{ChorusConfig, Credentials, Severity},
};

// ── ANSI helpers ────────────────────────────────────────────────────────────

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Warn,
    Fail,
    Info,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Fail => "fail",
            Self::Info => "info",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Ok => GREEN,
            Self::Warn => YELLOW,
            Self::Fail => RED,
            Self::Info => CYAN,
        }
    }
}

struct CheckItem {
    status: Status,
    message: String,
}

struct Section {
    title: String,
    items: Vec<CheckItem>,
}

impl Section {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, status: Status, message: impl Into<String>) {
        self.items.push(CheckItem {
            status,
            message: message.into(),
        });
    }

    fn count(&self, status: Status) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }
}

// ── Printing ────────────────────────────────────────────────────────────────

fn print_report(sections: &[Section]) -> (usize, usize) {
    let mut errors = 0usize;
    let mut warnings = 0usize;

    for section in sections {
        eprintln!("{BOLD}{}{RESET}", section.title);
        for item in &section.items {
            let color = item.status.color();
            let label = item.status.label();
            eprintln!("  [{color}{label}{RESET}]  {}", item.message);
        }
        errors += section.count(Status::Fail);
        warnings += section.count(Status::Warn);
        eprintln!();
    }

    (errors, warnings)
}

// ── Entry point ─────────────────────────────────────────────────────────────

pub fn handle_doctor(explicit: Option<&Path>) -> Result<()> {
    eprintln!("{BOLD}chorus doctor{RESET}");
    eprintln!("{BOLD}============={RESET}\n");

    let mut sections = Vec::new();
    let config = load(explicit, &mut sections);
    if let Some(config) = &config {
        sections.push(check_config(config));
        sections.push(check_credentials(config));
        sections.push(describe_endpoints(config));
    }

    let (errors, warnings) = print_report(&sections);
    eprintln!("{BOLD}Summary:{RESET} {errors} error(s), {warnings} warning(s)");

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

// ── Checks ──────────────────────────────────────────────────────────────────

fn load(explicit: Option<&Path>, sections: &mut Vec<Section>) -> Option<ChorusConfig> {
    let mut section = Section::new("Config file");
    let loaded = chorus_config::discover_and_load(explicit).and_then(|(mut config, path)| {
        chorus_config::apply_env_overrides(&mut config)?;
        Ok((config, path))
    });
    let config = match loaded {
        Ok((config, Some(path))) => {
            section.push(Status::Ok, format!("loaded {}", path.display()));
            Some(config)
        },
        Ok((config, None)) => {
            section.push(Status::Info, "no config file found, using defaults");
            Some(config)
        },
        Err(e) => {
            section.push(Status::Fail, e.to_string());
            None
        },
    };
    sections.push(section);
    config
}

fn check_config(config: &ChorusConfig) -> Section {
    let mut section = Section::new("Settings");
    let result = chorus_config::validate(config);
    if result.diagnostics.is_empty() {
        section.push(Status::Ok, "no issues found");
    }
    for d in &result.diagnostics {
        let status = match d.severity {
            Severity::Error => Status::Fail,
            Severity::Warning => Status::Warn,
        };
        section.push(status, format!("{}: {}", d.path, d.message));
    }
    section
}

fn check_credentials(config: &ChorusConfig) -> Section {
    let mut section = Section::new("Credentials");
    let paths = &config.credentials;
    match Credentials::load(paths) {
        Ok(credentials) => {
            if credentials.has_accounts() {
                section.push(
                    Status::Ok,
                    format!(
                        "{} account(s) from {}",
                        credentials.accounts.len(),
                        paths.accounts_file
                    ),
                );
            } else {
                section.push(
                    Status::Warn,
                    format!("no accounts in {}, nothing will be sent", paths.accounts_file),
                );
            }
            if credentials.proxies.is_empty() {
                section.push(
                    Status::Info,
                    format!("no proxies in {}, sending directly", paths.proxies_file),
                );
            } else {
                section.push(
                    Status::Ok,
                    format!(
                        "{} prox{} from {}",
                        credentials.proxies.len(),
                        if credentials.proxies.len() == 1 { "y" } else { "ies" },
                        paths.proxies_file
                    ),
                );
            }
        },
        Err(e) => section.push(Status::Fail, e.to_string()),
    }
    section
}

fn describe_endpoints(config: &ChorusConfig) -> Section {
    let mut section = Section::new("Endpoints");
    section.push(Status::Info, format!("kick api: {}", config.kick.api_base));
    section.push(Status::Info, format!("chat socket: {}", config.kick.websocket_url));
    section.push(
        Status::Info,
        format!(
            "generation: {} via {}",
            config.generation.model, config.generation.endpoint
        ),
    );
    section.push(
        Status::Info,
        format!(
            "control surface: http://{}:{}",
            config.server.bind, config.server.port
        ),
    );
    section
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret};

    fn config_in(dir: &Path) -> ChorusConfig {
        let mut config = ChorusConfig::default();
        config.generation.api_key = Secret::new("sk-test".into());
        config.credentials.accounts_file = dir.join("accs.txt").display().to_string();
        config.credentials.proxies_file = dir.join("proxies.txt").display().to_string();
        config
    }

    #[test]
    fn missing_api_key_fails() {
        let section = check_config(&ChorusConfig::default());
        assert!(section.count(Status::Fail) >= 1);
        assert!(
            section
                .items
                .iter()
                .any(|i| i.message.starts_with("generation.api_key"))
        );
    }

    #[test]
    fn valid_config_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let section = check_config(&config_in(dir.path()));
        assert_eq!(section.count(Status::Fail), 0);
    }

    #[test]
    fn empty_credentials_warn() {
        let dir = tempfile::tempdir().unwrap();
        let section = check_credentials(&config_in(dir.path()));
        assert_eq!(section.count(Status::Warn), 1);
        assert_eq!(section.count(Status::Info), 1);
    }

    #[test]
    fn counts_accounts_and_proxies() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("accs.txt"), "1|a|one:pw\n2|b|two:pw\n").unwrap();
        std::fs::write(dir.path().join("proxies.txt"), "10.0.0.1:8080\n").unwrap();

        let section = check_credentials(&config_in(dir.path()));
        assert_eq!(section.count(Status::Ok), 2);
        assert!(section.items[0].message.starts_with("2 account(s)"));
        assert!(section.items[1].message.starts_with("1 proxy"));
    }

    #[test]
    fn unreadable_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chorus.toml");
        std::fs::write(&path, "[server\nport = 1").unwrap();

        let mut sections = Vec::new();
        assert!(load(Some(&path), &mut sections).is_none());
        assert_eq!(sections[0].count(Status::Fail), 1);
    }
}
