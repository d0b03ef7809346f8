//! Wallet deposit and withdrawal form validation.

use thiserror::Error;

use evmarket_core::{MoneyError, Vnd};

/// Smallest deposit or withdrawal accepted.
pub const MIN_WALLET_MOVEMENT: Vnd = Vnd::new(100_000);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("Enter the amount as a whole number of dong.")]
    InvalidAmount,

    #[error("The minimum amount is {minimum}.")]
    BelowMinimum { minimum: Vnd },

    #[error("You can withdraw at most {balance}.")]
    ExceedsBalance { balance: Vnd },
}

impl From<MoneyError> for WalletError {
    fn from(_: MoneyError) -> Self {
        Self::InvalidAmount
    }
}

/// Validate a deposit amount.
///
/// # Errors
///
/// [`WalletError::InvalidAmount`] for non-integer input,
/// [`WalletError::BelowMinimum`] under [`MIN_WALLET_MOVEMENT`].
pub fn validate_deposit(input: &str) -> Result<Vnd, WalletError> {
    let amount = Vnd::parse(input)?;
    if amount < MIN_WALLET_MOVEMENT {
        return Err(WalletError::BelowMinimum {
            minimum: MIN_WALLET_MOVEMENT,
        });
    }
    Ok(amount)
}

/// Validate a withdrawal amount against the current balance.
///
/// # Errors
///
/// As [`validate_deposit`], plus [`WalletError::ExceedsBalance`].
pub fn validate_withdraw(input: &str, balance: Vnd) -> Result<Vnd, WalletError> {
    let amount = validate_deposit(input)?;
    if amount > balance {
        return Err(WalletError::ExceedsBalance { balance });
    }
    Ok(amount)
}
