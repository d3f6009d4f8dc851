//! Account records and account-reference validation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    Active,
    Blocked,
    Closed,
    Expired,
}

impl AccountStatus {
    #[must_use]
    pub fn is_usable(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Directory entry for one account reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub status: AccountStatus,
    /// Per-transaction ceiling in minor units. `None` means unlimited.
    pub limit: Option<u64>,
    /// ISO currency codes the account may transact in. Empty means any.
    #[serde(default)]
    pub currencies: Vec<u16>,
}

impl AccountRecord {
    #[must_use]
    pub fn active() -> Self {
        Self {
            status: AccountStatus::Active,
            limit: None,
            currencies: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_status(status: AccountStatus) -> Self {
        Self {
            status,
            ..Self::active()
        }
    }

    #[must_use]
    pub fn with_limit(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            ..Self::active()
        }
    }
}

/// Luhn checksum over an all-digit account reference.
///
/// References shorter than 12 digits or containing non-digits fail without
/// computing the checksum.
#[must_use]
pub fn luhn_valid(account_ref: &str) -> bool {
    if account_ref.len() < 12 || account_ref.len() > 19 {
        return false;
    }
    if !account_ref.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let sum: u32 = account_ref
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let digit = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = digit * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                digit
            }
        })
        .sum();
    sum % 10 == 0
}
