//! Known-malicious address set
//!
//! Loaded once at startup and shared read-only (behind an `Arc`) by every
//! concurrent request. There is no in-place mutation; a new list means a new
//! snapshot.

use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::models::{AppError, AppResult, ErrorCode, EvmAddress};

/// List compiled into the binary
const BUILTIN_LIST: &str = include_str!("../../data/known_malicious.txt");

/// Immutable set of normalized addresses
#[derive(Debug, Clone, Default)]
pub struct KnownMaliciousSet {
    addresses: HashSet<EvmAddress>,
}

impl KnownMaliciousSet {
    pub fn from_addresses(addresses: impl IntoIterator<Item = EvmAddress>) -> Self {
        Self {
            addresses: addresses.into_iter().collect(),
        }
    }

    /// Parse a newline-separated list. Invalid lines are logged and skipped.
    pub fn parse_list(contents: &str) -> Self {
        let mut addresses = HashSet::new();
        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match EvmAddress::parse(line) {
                Ok(addr) => {
                    addresses.insert(addr);
                }
                Err(e) => warn!("⚠️ Skipping malicious list line {}: {}", idx + 1, e),
            }
        }
        Self { addresses }
    }

    /// The list shipped with the binary
    pub fn builtin() -> Self {
        Self::parse_list(BUILTIN_LIST)
    }

    /// Load from a file on disk
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::with_source(
                ErrorCode::ConfigMaliciousList,
                format!("Cannot read malicious list {}", path.display()),
                e,
            )
        })?;
        let set = Self::parse_list(&contents);
        info!(
            "🚫 Loaded {} known-malicious addresses from {}",
            set.len(),
            path.display()
        );
        Ok(set)
    }

    /// File if configured, built-in list otherwise
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let set = Self::builtin();
                info!("🚫 Loaded {} built-in known-malicious addresses", set.len());
                Ok(set)
            }
        }
    }

    #[inline]
    pub fn contains(&self, address: &EvmAddress) -> bool {
        self.addresses.contains(address)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_normalizes_and_skips_noise() {
        let set = KnownMaliciousSet::parse_list(
            "# comment\n\n0xD90E2F925DA726B50C4ED8D0FB90AD053324F31B\nnot-an-address\n  0x722122df12d4e14e13ac3b6895a86e84145b6967  \n",
        );
        assert_eq!(set.len(), 2);
        let addr = EvmAddress::parse("0xd90e2f925da726b50c4ed8d0fb90ad053324f31b").unwrap();
        assert!(set.contains(&addr));
    }

    #[test]
    fn test_builtin_list_loads() {
        let set = KnownMaliciousSet::builtin();
        assert!(!set.is_empty());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = KnownMaliciousSet::from_file(Path::new("/nonexistent/walletwork/list.txt"))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigMaliciousList);
    }
}
