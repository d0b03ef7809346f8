//! Auction route handlers.
//!
//! Bids are checked locally (ended auction, minimum increment, wallet
//! balance) before being sent; the backend settles the auction.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use evmarket_core::{AuctionId, Vnd};

use super::{Layout, expire_on_unauthorized};
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::htmx::Triggers;
use crate::marketplace::{Auction, Bid, CustomerSession};
use crate::middleware::{OptionalCustomer, RequireCustomer};
use crate::services::auction::{minimum_bid, validate_bid};
use crate::state::AppState;

fn format_time(time: Option<DateTime<Utc>>) -> Option<String> {
    time.map(|t| t.format("%H:%M %d/%m/%Y").to_string())
}

/// Auction card display data.
#[derive(Clone)]
pub struct AuctionCardView {
    pub id: String,
    pub title: String,
    pub image: Option<String>,
    /// Highest bid so far, or the start price.
    pub current_price: Vnd,
    pub status: String,
    pub is_closed: bool,
    pub ends_at: Option<String>,
}

impl From<&Auction> for AuctionCardView {
    fn from(auction: &Auction) -> Self {
        Self {
            id: auction.id.to_string(),
            title: auction.title(),
            image: auction
                .product
                .as_ref()
                .and_then(|p| p.primary_image())
                .map(String::from),
            current_price: auction
                .current_bid
                .filter(|bid| !bid.is_zero())
                .unwrap_or(auction.start_price),
            status: auction.status.to_string(),
            is_closed: auction.status.is_closed(),
            ends_at: format_time(auction.end_date),
        }
    }
}

/// Bid history row.
#[derive(Clone)]
pub struct BidView {
    pub bidder: String,
    pub amount: Vnd,
    pub placed_at: Option<String>,
    pub is_winner: bool,
}

impl From<&Bid> for BidView {
    fn from(bid: &Bid) -> Self {
        Self {
            bidder: bid
                .user
                .as_ref()
                .map_or_else(|| "Anonymous".to_string(), |u| u.display_name()),
            amount: bid.bid_amount,
            placed_at: format_time(bid.timestamp),
            is_winner: bid.is_winner,
        }
    }
}

/// The bidding panel: price, history and the bid form.
#[derive(Clone)]
pub struct BidPanelView {
    pub auction: AuctionCardView,
    pub start_price: Vnd,
    pub deposit_required: Option<Vnd>,
    /// `None` if the minimum overflows; the form is hidden then.
    pub minimum_bid: Option<Vnd>,
    pub bids: Vec<BidView>,
    /// Wallet balance of the logged-in customer.
    pub balance: Option<Vnd>,
}

impl BidPanelView {
    fn new(auction: &Auction, bids: &[Bid], balance: Option<Vnd>) -> Self {
        let mut bids: Vec<&Bid> = bids.iter().collect();
        bids.sort_by(|a, b| b.bid_amount.cmp(&a.bid_amount));
        Self {
            auction: AuctionCardView::from(auction),
            start_price: auction.start_price,
            deposit_required: auction.deposit_required,
            minimum_bid: minimum_bid(auction).ok(),
            bids: bids.into_iter().map(BidView::from).collect(),
            balance,
        }
    }

    /// Whether the bid form is shown.
    #[must_use]
    pub fn can_bid(&self) -> bool {
        !self.auction.is_closed && self.minimum_bid.is_some()
    }
}

/// Auction listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "auctions/index.html")]
pub struct AuctionsIndexTemplate {
    pub layout: Layout,
    pub auctions: Vec<AuctionCardView>,
}

/// Auction detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "auctions/show.html")]
pub struct AuctionShowTemplate {
    pub layout: Layout,
    pub panel: BidPanelView,
    pub logged_in: bool,
}

/// Bid panel fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/bid_panel.html")]
pub struct BidPanelTemplate {
    pub panel: BidPanelView,
    pub logged_in: bool,
}

#[derive(Debug, Deserialize)]
pub struct BidForm {
    pub amount: String,
}

/// Balance for the panel; a failed lookup just hides it.
async fn balance_for(
    state: &AppState,
    session: &Session,
    customer: Option<&CustomerSession>,
) -> Option<Vnd> {
    let customer = customer?;
    match state.marketplace().wallet_balance(customer).await {
        Ok(balance) => Some(balance),
        Err(e) => {
            warn!(error = %e, "Could not load wallet balance");
            expire_on_unauthorized(session, &e).await;
            None
        }
    }
}

/// Display auction listing.
#[instrument(skip(state, customer))]
pub async fn index(
    State(state): State<AppState>,
    OptionalCustomer(customer): OptionalCustomer,
) -> Result<impl IntoResponse> {
    let auctions = state.marketplace().auctions(customer.as_ref()).await?;

    Ok(AuctionsIndexTemplate {
        layout: Layout::new(customer.as_ref()),
        auctions: auctions.iter().map(AuctionCardView::from).collect(),
    })
}

/// Display auction detail with bid history.
#[instrument(skip(state, session, customer))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = AuctionId::new(id);
    let auction = state.marketplace().auction(&id, customer.as_ref()).await?;
    let bids = state
        .marketplace()
        .bids(&id, customer.as_ref())
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Could not load bid history");
            Vec::new()
        });
    let balance = balance_for(&state, &session, customer.as_ref()).await;

    Ok(AuctionShowTemplate {
        layout: Layout::new(customer.as_ref()),
        panel: BidPanelView::new(&auction, &bids, balance),
        logged_in: customer.is_some(),
    })
}

/// Place a bid (HTMX). Returns the refreshed bid panel.
#[instrument(skip(state, session, customer))]
pub async fn bid(
    State(state): State<AppState>,
    session: Session,
    RequireCustomer(customer): RequireCustomer,
    Path(id): Path<String>,
    Form(form): Form<BidForm>,
) -> Result<Response> {
    let id = AuctionId::new(id);
    let client = state.marketplace();

    let auction = client.auction(&id, Some(&customer)).await?;
    let balance = match client.wallet_balance(&customer).await {
        Ok(balance) => balance,
        Err(e) => {
            expire_on_unauthorized(&session, &e).await;
            return Err(e.into());
        }
    };

    let amount = validate_bid(&auction, &form.amount, balance)?;

    if let Err(e) = client.place_bid(&customer, &id, amount).await {
        expire_on_unauthorized(&session, &e).await;
        return Err(e.into());
    }
    info!(auction_id = %id, amount = amount.amount(), "Bid placed");
    add_breadcrumb("auction", "Bid placed", Some(&[("auction_id", id.as_str())]));

    let auction = client.auction(&id, Some(&customer)).await.unwrap_or(auction);
    let bids = client.bids(&id, Some(&customer)).await.unwrap_or_default();
    let balance = client.wallet_balance(&customer).await.ok();

    Ok((
        Triggers::new().success(format!("Your bid of {amount} was placed.")),
        BidPanelTemplate {
            panel: BidPanelView::new(&auction, &bids, balance),
            logged_in: true,
        },
    )
        .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn auction(json: serde_json::Value) -> Auction {
        serde_json::from_value(json).unwrap()
    }

    fn bid(amount: i64, name: &str) -> Bid {
        serde_json::from_value(serde_json::json!({
            "bid_amount": amount,
            "user": { "username": name },
        }))
        .unwrap()
    }

    #[test]
    fn test_card_shows_start_price_without_bids() {
        let card = AuctionCardView::from(&auction(serde_json::json!({
            "_id": "a1",
            "start_price": 5_000_000,
            "current_bid": 0,
            "status": "active"
        })));
        assert_eq!(card.current_price, Vnd::new(5_000_000));
        assert_eq!(card.status, "Live");
        assert!(!card.is_closed);
        assert_eq!(card.title, "Auction a1");
    }

    #[test]
    fn test_panel_sorts_bids_and_computes_minimum() {
        let a = auction(serde_json::json!({
            "_id": "a1",
            "start_price": 5_000_000,
            "current_bid": 6_000_000,
            "status": "active"
        }));
        let bids = [bid(5_500_000, "an"), bid(6_000_000, "binh")];
        let panel = BidPanelView::new(&a, &bids, Some(Vnd::new(10_000_000)));

        assert_eq!(panel.minimum_bid, Some(Vnd::new(6_100_000)));
        assert_eq!(panel.bids.first().unwrap().bidder, "binh");
        assert!(panel.can_bid());
    }

    #[test]
    fn test_closed_auction_hides_form() {
        let a = auction(serde_json::json!({
            "_id": "a1",
            "start_price": 5_000_000,
            "status": "ended"
        }));
        let panel = BidPanelView::new(&a, &[], None);
        assert!(!panel.can_bid());
    }
}
