//! Wallet route handlers (requires login).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use evmarket_core::Vnd;

use super::{Layout, expire_on_unauthorized};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::htmx::Triggers;
use crate::marketplace::{CustomerSession, MarketplaceError, WalletTransaction};
use crate::middleware::RequireCustomer;
use crate::services::wallet::{MIN_WALLET_MOVEMENT, validate_deposit, validate_withdraw};
use crate::state::AppState;

/// Transaction history row.
#[derive(Clone)]
pub struct TransactionView {
    pub kind: String,
    /// Signed for display: `+` for credits, `-` for debits.
    pub sign: &'static str,
    pub amount: Vnd,
    pub status: String,
    pub created_at: Option<String>,
}

impl From<&WalletTransaction> for TransactionView {
    fn from(tx: &WalletTransaction) -> Self {
        Self {
            kind: tx.kind.to_string(),
            sign: if tx.kind.is_credit() { "+" } else { "-" },
            amount: tx.amount,
            status: tx.status.to_string(),
            created_at: tx
                .created_at
                .map(|t| t.format("%H:%M %d/%m/%Y").to_string()),
        }
    }
}

/// Balance plus history.
#[derive(Clone)]
pub struct WalletView {
    pub balance: Vnd,
    pub transactions: Vec<TransactionView>,
    pub minimum: Vnd,
}

/// Wallet page template.
#[derive(Template, WebTemplate)]
#[template(path = "wallet/show.html")]
pub struct WalletShowTemplate {
    pub layout: Layout,
    pub wallet: WalletView,
}

/// Balance and history fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/wallet_panel.html")]
pub struct WalletPanelTemplate {
    pub wallet: WalletView,
}

#[derive(Debug, Deserialize)]
pub struct AmountForm {
    pub amount: String,
}

async fn load_wallet(
    state: &AppState,
    session: &Session,
    customer: &CustomerSession,
) -> Result<WalletView> {
    let client = state.marketplace();
    let balance = match client.wallet_balance(customer).await {
        Ok(balance) => balance,
        Err(e) => return Err(expired(session, e).await),
    };
    let transactions = client.transactions(customer).await.unwrap_or_else(|e| {
        warn!(error = %e, "Could not load wallet transactions");
        Vec::new()
    });

    Ok(WalletView {
        balance,
        transactions: transactions.iter().map(TransactionView::from).collect(),
        minimum: MIN_WALLET_MOVEMENT,
    })
}

async fn expired(session: &Session, err: MarketplaceError) -> AppError {
    expire_on_unauthorized(session, &err).await;
    err.into()
}

/// Display wallet page.
#[instrument(skip(state, session, customer))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireCustomer(customer): RequireCustomer,
) -> Result<impl IntoResponse> {
    Ok(WalletShowTemplate {
        layout: Layout::new(Some(&customer)),
        wallet: load_wallet(&state, &session, &customer).await?,
    })
}

/// Deposit into the wallet (HTMX). Returns the refreshed panel.
#[instrument(skip(state, session, customer))]
pub async fn deposit(
    State(state): State<AppState>,
    session: Session,
    RequireCustomer(customer): RequireCustomer,
    Form(form): Form<AmountForm>,
) -> Result<Response> {
    let amount = validate_deposit(&form.amount)?;

    if let Err(e) = state.marketplace().deposit(&customer, amount).await {
        return Err(expired(&session, e).await);
    }
    info!(amount = amount.amount(), "Wallet deposit");
    add_breadcrumb("wallet", "Deposit", None);

    Ok((
        Triggers::new().success(format!("Deposited {amount}.")),
        WalletPanelTemplate {
            wallet: load_wallet(&state, &session, &customer).await?,
        },
    )
        .into_response())
}

/// Withdraw from the wallet (HTMX). Returns the refreshed panel.
#[instrument(skip(state, session, customer))]
pub async fn withdraw(
    State(state): State<AppState>,
    session: Session,
    RequireCustomer(customer): RequireCustomer,
    Form(form): Form<AmountForm>,
) -> Result<Response> {
    let balance = match state.marketplace().wallet_balance(&customer).await {
        Ok(balance) => balance,
        Err(e) => return Err(expired(&session, e).await),
    };
    let amount = validate_withdraw(&form.amount, balance)?;

    if let Err(e) = state.marketplace().withdraw(&customer, amount).await {
        return Err(expired(&session, e).await);
    }
    info!(amount = amount.amount(), "Wallet withdrawal");
    add_breadcrumb("wallet", "Withdraw", None);

    Ok((
        Triggers::new().success(format!("Withdrew {amount}.")),
        WalletPanelTemplate {
            wallet: load_wallet(&state, &session, &customer).await?,
        },
    )
        .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_view_sign() {
        let deposit: WalletTransaction = serde_json::from_value(serde_json::json!({
            "type": "deposit",
            "amount": 500_000,
            "status": "completed",
            "createdAt": "2026-01-05T08:30:00Z"
        }))
        .unwrap();
        let view = TransactionView::from(&deposit);
        assert_eq!(view.sign, "+");
        assert_eq!(view.created_at.as_deref(), Some("08:30 05/01/2026"));

        let bid: WalletTransaction = serde_json::from_value(serde_json::json!({
            "type": "bid",
            "amount": 200_000
        }))
        .unwrap();
        assert_eq!(TransactionView::from(&bid).sign, "-");
    }
}
