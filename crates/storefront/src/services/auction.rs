//! Bid validation.
//!
//! The backend settles auctions; these checks only stop bids that cannot
//! succeed before they are sent.

use thiserror::Error;

use evmarket_core::{MoneyError, Vnd};

use crate::marketplace::Auction;

/// Each bid must beat the current price by at least this much.
pub const BID_INCREMENT: Vnd = Vnd::new(100_000);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BidError {
    #[error("This auction has ended.")]
    AuctionEnded,

    #[error("Enter the bid as a whole number of dong.")]
    InvalidAmount,

    #[error("Your bid must be at least {minimum}.")]
    BelowMinimum { minimum: Vnd },

    #[error("Your wallet balance ({balance}) is not enough for this bid.")]
    InsufficientBalance { balance: Vnd },

    #[error("Bid amount is too large.")]
    Overflow,
}

impl From<MoneyError> for BidError {
    fn from(err: MoneyError) -> Self {
        match err {
            MoneyError::Overflow => Self::Overflow,
            MoneyError::Invalid(_) => Self::InvalidAmount,
        }
    }
}

/// Current price plus [`BID_INCREMENT`]. With no bids yet (or a current bid
/// of zero) the start price is the current price.
///
/// # Errors
///
/// [`MoneyError::Overflow`] if the minimum does not fit.
pub fn minimum_bid(auction: &Auction) -> Result<Vnd, MoneyError> {
    let current = auction
        .current_bid
        .filter(|bid| !bid.is_zero())
        .unwrap_or(auction.start_price);
    current.checked_add(BID_INCREMENT)
}

/// Check a bid typed by the customer.
///
/// # Errors
///
/// The first failing rule, in this order: auction ended, input not an
/// integer, below [`minimum_bid`], above the wallet balance.
pub fn validate_bid(auction: &Auction, input: &str, balance: Vnd) -> Result<Vnd, BidError> {
    if auction.status.is_closed() {
        return Err(BidError::AuctionEnded);
    }

    let amount = Vnd::parse(input)?;
    let minimum = minimum_bid(auction)?;
    if amount < minimum {
        return Err(BidError::BelowMinimum { minimum });
    }
    if amount > balance {
        return Err(BidError::InsufficientBalance { balance });
    }
    Ok(amount)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use evmarket_core::AuctionStatus;

    use super::*;

    fn auction(start: i64, current: Option<i64>, status: &str) -> Auction {
        let mut json = serde_json::json!({
            "_id": "a1",
            "start_price": start,
            "status": status,
        });
        if let Some(current) = current {
            json["current_bid"] = current.into();
        }
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_minimum_uses_start_price_without_bids() {
        assert_eq!(
            minimum_bid(&auction(5_000_000, None, "active")).unwrap(),
            Vnd::new(5_100_000)
        );
        assert_eq!(
            minimum_bid(&auction(5_000_000, Some(0), "active")).unwrap(),
            Vnd::new(5_100_000)
        );
        assert_eq!(
            minimum_bid(&auction(5_000_000, Some(6_000_000), "active")).unwrap(),
            Vnd::new(6_100_000)
        );
    }

    #[test]
    fn test_validate_bid_rules() {
        let live = auction(1_000_000, Some(2_000_000), "active");
        let balance = Vnd::new(3_000_000);

        assert_eq!(validate_bid(&live, "", balance), Err(BidError::InvalidAmount));
        assert_eq!(validate_bid(&live, "2.5e6", balance), Err(BidError::InvalidAmount));
        assert_eq!(
            validate_bid(&live, "2050000", balance),
            Err(BidError::BelowMinimum {
                minimum: Vnd::new(2_100_000)
            })
        );
        assert_eq!(
            validate_bid(&live, "3500000", balance),
            Err(BidError::InsufficientBalance { balance })
        );
        assert_eq!(validate_bid(&live, " 2100000 ", balance), Ok(Vnd::new(2_100_000)));
    }

    #[test]
    fn test_ended_auction_rejects_everything() {
        let ended = auction(1_000_000, None, "ended");
        assert_eq!(ended.status, AuctionStatus::Ended);
        assert_eq!(
            validate_bid(&ended, "9000000", Vnd::new(10_000_000)),
            Err(BidError::AuctionEnded)
        );
    }

    #[test]
    fn test_below_minimum_message_shows_amount() {
        let err = BidError::BelowMinimum {
            minimum: Vnd::new(2_100_000),
        };
        assert_eq!(err.to_string(), "Your bid must be at least 2.100.000 ₫.");
    }
}
