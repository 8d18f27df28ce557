//! Account Registry
//!
//! Read-only store of provisioned accounts. Accounts are created at
//! startup from the provisioning file and never change for the process
//! lifetime; an absent identifier is a normal lookup outcome, not an
//! error.

use std::collections::HashMap;

use crate::config::AccountConfig;

/// A provisioned account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Unique, stable identifier
    pub identifier: String,

    /// Opaque credential compared verbatim at login
    pub credential: String,

    /// Successful generations allowed per UTC day
    pub daily_limit: u32,
}

/// Read-only account registry
#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: HashMap<String, Account>,
}

impl AccountStore {
    /// Build the registry from provisioning entries, applying the policy
    /// default to accounts that do not set their own limit
    pub fn from_configs(configs: Vec<AccountConfig>, default_daily_limit: u32) -> Self {
        let accounts = configs
            .into_iter()
            .map(|c| {
                let account = Account {
                    identifier: c.identifier.clone(),
                    credential: c.credential,
                    daily_limit: c.daily_limit.unwrap_or(default_daily_limit),
                };
                (c.identifier, account)
            })
            .collect();
        Self { accounts }
    }

    /// Look up an account by identifier
    pub fn lookup(&self, identifier: &str) -> Option<&Account> {
        self.accounts.get(identifier)
    }

    /// Check whether an identifier names a provisioned account
    pub fn is_known(&self, identifier: &str) -> bool {
        self.accounts.contains_key(identifier)
    }

    /// Number of provisioned accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether any accounts are provisioned
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
