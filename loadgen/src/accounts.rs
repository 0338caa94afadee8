//! Account supply
//!
//! Identities are read once from a CSV file and handed out to virtual users
//! by deterministic rotation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("cannot read account file {path:?}: {source}")]
    DataLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A test identity and the password it logs in with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub identity: String,
    pub password: String,
}

/// Ordered, immutable pool of accounts
#[derive(Debug, Clone)]
pub struct AccountPool {
    accounts: Arc<[Account]>,
}

impl AccountPool {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self {
            accounts: accounts.into(),
        }
    }

    /// Build a pool from bare identities sharing one password
    pub fn from_identities<I, S>(identities: I, password: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            identities
                .into_iter()
                .map(|identity| Account {
                    identity: identity.into(),
                    password: password.to_string(),
                })
                .collect(),
        )
    }

    /// Read the account file at `path`
    pub fn load(path: &Path, password: &str) -> Result<Self, AccountError> {
        let text = std::fs::read_to_string(path).map_err(|source| AccountError::DataLoad {
            path: path.to_path_buf(),
            source,
        })?;
        let pool = Self::from_identities(parse_identities(&text), password);
        info!("Loaded {} accounts from {:?}", pool.len(), path);
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Index of the account owned by `vu_id`, `None` for an empty pool
    pub fn index_for(&self, vu_id: usize) -> Option<usize> {
        if self.accounts.is_empty() {
            None
        } else {
            Some(vu_id % self.accounts.len())
        }
    }

    /// Account owned by `vu_id`
    pub fn account_for(&self, vu_id: usize) -> Option<&Account> {
        self.index_for(vu_id).map(|idx| &self.accounts[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }
}

/// Extract identities from CSV text.
///
/// The first line is a header. Each remaining row contributes its first
/// column, trimmed; blank rows are dropped.
pub fn parse_identities(text: &str) -> Vec<String> {
    text.lines()
        .skip(1)
        .filter_map(|line| {
            let identity = line.split(',').next().unwrap_or_default().trim();
            (!identity.is_empty()).then(|| identity.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_header_blank_and_trims() {
        let identities = parse_identities("header\na@x.com\n\n b@x.com \n");
        assert_eq!(identities, vec!["a@x.com", "b@x.com"]);
    }

    #[test]
    fn test_parse_header_only_is_empty() {
        assert!(parse_identities("email\n").is_empty());
        assert!(parse_identities("").is_empty());
    }

    #[test]
    fn test_parse_takes_first_column_and_handles_crlf() {
        let identities = parse_identities("email,name\r\nc@x.com,Carol\r\n  ,nobody\r\n");
        assert_eq!(identities, vec!["c@x.com"]);
    }

    #[test]
    fn test_rotation_is_modulo() {
        let pool = AccountPool::from_identities(["a", "b", "c"], "pw");
        for vu in 0..50 {
            assert_eq!(pool.index_for(vu), Some(vu % 3));
            // Stable across repeated lookups
            assert_eq!(pool.account_for(vu), pool.account_for(vu));
        }
        assert_eq!(pool.account_for(4).map(|a| a.identity.as_str()), Some("b"));
        assert_eq!(pool.account_for(4).map(|a| a.password.as_str()), Some("pw"));
    }

    #[test]
    fn test_empty_pool_has_no_assignment() {
        let pool = AccountPool::new(Vec::new());
        assert!(pool.is_empty());
        assert_eq!(pool.index_for(7), None);
    }

    #[test]
    fn test_load_missing_file_is_data_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AccountPool::load(&dir.path().join("missing.csv"), "pw").unwrap_err();
        assert!(matches!(err, AccountError::DataLoad { .. }));
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.csv");
        std::fs::write(&path, "email\nuser1@x.com\nuser2@x.com\n").unwrap();

        let pool = AccountPool::load(&path, "someTest").unwrap();

        assert_eq!(pool.len(), 2);
        let ids: Vec<_> = pool.iter().map(|a| a.identity.clone()).collect();
        assert_eq!(ids, vec!["user1@x.com", "user2@x.com"]);
    }
}
