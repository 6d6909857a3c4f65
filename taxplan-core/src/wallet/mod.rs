//! Section-80 style deduction tracking.
//!
//! A [`DeductionWallet`] holds one user's sections for one financial year.
//! [`WalletBook`] keeps many wallets and serializes access per
//! (user, financial year).

pub mod book;
pub mod deduction_wallet;

pub use book::{WalletBook, WalletKey};
pub use deduction_wallet::{DeductionWallet, LimitPolicy, WalletError};
