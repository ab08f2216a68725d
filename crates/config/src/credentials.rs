//! Sender accounts and outbound proxies, loaded once at startup.

use std::{collections::HashSet, io::ErrorKind, path::Path};

use {
    rand::{Rng, seq::IndexedRandom},
    secrecy::Secret,
    tracing::{info, warn},
};

use crate::{
    error::{Error, Result},
    schema::CredentialsConfig,
};

/// A chat account messages are sent from.
#[derive(Debug, Clone)]
pub struct Account {
    pub auth_token: Secret<String>,
    pub username: Option<String>,
}

impl Account {
    /// Name used in the recent-message log.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("Unknown")
    }
}

/// Read-only set of accounts and proxies shared by every sender.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub accounts: Vec<Account>,
    pub proxies: Vec<String>,
}

impl Credentials {
    #[must_use]
    pub fn new(accounts: Vec<Account>, proxies: Vec<String>) -> Self {
        Self { accounts, proxies }
    }

    /// Load both files. A missing file yields an empty list.
    pub fn load(config: &CredentialsConfig) -> Result<Self> {
        let accounts = read_optional(Path::new(&config.accounts_file))?
            .map(|raw| parse_accounts(&raw))
            .unwrap_or_default();
        let proxies = read_optional(Path::new(&config.proxies_file))?
            .map(|raw| parse_proxies(&raw))
            .unwrap_or_default();

        if accounts.is_empty() {
            warn!(
                path = %config.accounts_file,
                "no accounts loaded, senders will not run"
            );
        }
        if proxies.is_empty() {
            info!(path = %config.proxies_file, "no proxies loaded, sending directly");
        }
        Ok(Self { accounts, proxies })
    }

    #[must_use]
    pub fn has_accounts(&self) -> bool {
        !self.accounts.is_empty()
    }

    /// Usernames of our own accounts. Chat from these is never fed back into
    /// generation.
    #[must_use]
    pub fn bot_usernames(&self) -> HashSet<String> {
        self.accounts
            .iter()
            .filter_map(|a| a.username.clone())
            .collect()
    }

    /// Pick one account and, when any are configured, one proxy uniformly at
    /// random.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(&Account, Option<&str>)> {
        let account = self.accounts.choose(rng)?;
        let proxy = self.proxies.choose(rng).map(String::as_str);
        Some((account, proxy))
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "credentials file not found");
            Ok(None)
        },
        Err(source) => Err(Error::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Parse `token_a|token_b|username:password` lines.
///
/// The auth token is the first two `|` segments; the username is whatever
/// precedes `:` in the third segment.
#[must_use]
pub fn parse_accounts(raw: &str) -> Vec<Account> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let mut parts = line.split('|');
            let first = parts.next()?;
            let second = parts.next()?;
            let username = parts
                .next()
                .and_then(|rest| rest.split_once(':'))
                .map(|(name, _)| name.trim().to_string())
                .filter(|name| !name.is_empty());
            Some(Account {
                auth_token: Secret::new(format!("{first}|{second}")),
                username,
            })
        })
        .collect()
}

/// Parse one proxy per line into `http://` URLs.
#[must_use]
pub fn parse_proxies(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("http://{line}"))
        .collect()
}
