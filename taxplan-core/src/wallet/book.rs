use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use super::deduction_wallet::{DeductionWallet, LimitPolicy};
use crate::models::{DeductionSection, ValidationError, WalletSummary, require_text};

/// Identifies one wallet: a user's deductions for one financial year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletKey {
    user_id: String,
    financial_year: String,
}

impl WalletKey {
    pub fn new(
        user_id: &str,
        financial_year: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            user_id: require_text(user_id, ValidationError::EmptyUserId)?.to_string(),
            financial_year: require_text(financial_year, ValidationError::EmptyFinancialYear)?
                .to_string(),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn financial_year(&self) -> &str {
        &self.financial_year
    }
}

impl fmt::Display for WalletKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.financial_year)
    }
}

type SharedWallet = Arc<Mutex<DeductionWallet>>;

/// Wallets keyed by (user, financial year).
///
/// Each wallet sits behind its own mutex, so operations on one key run one at
/// a time and a reader never sees a half-applied mutation. Different keys do
/// not block each other.
#[derive(Debug, Default)]
pub struct WalletBook {
    wallets: RwLock<HashMap<WalletKey, SharedWallet>>,
    policy: LimitPolicy,
}

impl WalletBook {
    /// New wallets created by the book use `policy`.
    pub fn new(policy: LimitPolicy) -> Self {
        Self {
            wallets: RwLock::new(HashMap::new()),
            policy,
        }
    }

    /// Stores `wallet` under `key`, replacing whatever was there.
    pub fn insert(
        &self,
        key: WalletKey,
        wallet: DeductionWallet,
    ) {
        let shared = self.entry(key);
        *shared.lock().unwrap_or_else(PoisonError::into_inner) = wallet;
    }

    /// Runs `f` with exclusive access to the wallet for `key`, creating an
    /// empty one first if needed.
    pub fn with_wallet<R>(
        &self,
        key: &WalletKey,
        f: impl FnOnce(&mut DeductionWallet) -> R,
    ) -> R {
        let shared = self.entry(key.clone());
        let mut wallet = shared.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut wallet)
    }

    /// Runs `f` against the wallet for `key`. An unknown key reads as an
    /// empty wallet and is not added to the book.
    pub fn read<R>(
        &self,
        key: &WalletKey,
        f: impl FnOnce(&DeductionWallet) -> R,
    ) -> R {
        match self.existing(key) {
            Some(shared) => {
                let wallet = shared.lock().unwrap_or_else(PoisonError::into_inner);
                f(&wallet)
            }
            None => f(&DeductionWallet::with_policy(self.policy)),
        }
    }

    pub fn summary(
        &self,
        key: &WalletKey,
    ) -> WalletSummary {
        self.read(key, DeductionWallet::summary)
    }

    /// Copy of the stored sections, for handing to persistence.
    pub fn snapshot(
        &self,
        key: &WalletKey,
    ) -> Vec<DeductionSection> {
        self.read(key, |wallet| wallet.stored_sections().cloned().collect())
    }

    pub fn keys(&self) -> Vec<WalletKey> {
        let wallets = self.wallets.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<_> = wallets.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn existing(
        &self,
        key: &WalletKey,
    ) -> Option<SharedWallet> {
        self.wallets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn entry(
        &self,
        key: WalletKey,
    ) -> SharedWallet {
        if let Some(shared) = self.existing(&key) {
            return shared;
        }
        let policy = self.policy;
        self.wallets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(DeductionWallet::with_policy(policy))))
            .clone()
    }
}
