//! Status enums for marketplace entities.
//!
//! Values mirror the strings the marketplace backend sends. Enums that the
//! backend may extend carry an `Unknown` catch-all so new states do not
//! break deserialization of whole documents.

use serde::{Deserialize, Serialize};

/// Lifecycle of an auction listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuctionStatus {
    /// Created but not yet open for bids.
    Pending,
    /// Open for bids.
    #[default]
    Active,
    /// Closed; no further bids are accepted.
    Ended,
    #[serde(other)]
    Unknown,
}

impl AuctionStatus {
    /// Whether bids can no longer be placed.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Ended)
    }
}

impl std::fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Upcoming"),
            Self::Active => write!(f, "Live"),
            Self::Ended => write!(f, "Ended"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Kind of wallet transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    Bid,
    #[serde(other)]
    Unknown,
}

impl TransactionKind {
    /// Whether the transaction credits the wallet.
    #[must_use]
    pub const fn is_credit(self) -> bool {
        matches!(self, Self::Deposit)
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deposit => write!(f, "Deposit"),
            Self::Withdraw => write!(f, "Withdrawal"),
            Self::Bid => write!(f, "Bid"),
            Self::Unknown => write!(f, "Other"),
        }
    }
}

/// Settlement state of a wallet transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    #[default]
    Pending,
    #[serde(other)]
    Failed,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "Completed"),
            Self::Pending => write!(f, "Processing"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Payment method chosen at checkout. The backend decides what each means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cod,
    /// Online payment (bank transfer / e-wallet redirect).
    Online,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cod => write!(f, "cod"),
            Self::Online => write!(f, "online"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cod" => Ok(Self::Cod),
            "online" => Ok(Self::Online),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// How an order originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Bought from a listing.
    #[default]
    Direct,
    /// Won at auction.
    Auction,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_auction_status_is_tolerated() {
        let status: AuctionStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(status, AuctionStatus::Unknown);
        let status: AuctionStatus = serde_json::from_str("\"ended\"").unwrap();
        assert!(status.is_closed());
    }

    #[test]
    fn test_transaction_kind_credit() {
        assert!(TransactionKind::Deposit.is_credit());
        assert!(!TransactionKind::Withdraw.is_credit());
        assert!(!TransactionKind::Bid.is_credit());
    }

    #[test]
    fn test_unrecognised_transaction_status_reads_as_failed() {
        let status: TransactionStatus = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(status, TransactionStatus::Failed);
    }

    #[test]
    fn test_payment_method_round_trip_through_form_value() {
        for method in [PaymentMethod::Cod, PaymentMethod::Online] {
            assert_eq!(method.to_string().parse::<PaymentMethod>().unwrap(), method);
        }
        assert!("card".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_order_type_wire_value() {
        assert_eq!(
            serde_json::to_string(&OrderType::Direct).unwrap(),
            "\"direct\""
        );
    }
}
