//! Callback route handlers

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::AuthError;
use crate::core_types::{Amount, IdentityId, TransactionId};
use crate::escrow::registry::StepReply;
use crate::http::AppState;
use crate::txn::error::TxnError;
use crate::txn::outcome::CompletionPayload;

/// Uniform JSON envelope for the non-step endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            data: Some(data),
            msg: None,
        }
    }

    pub fn error(code: i32, msg: &str) -> Self {
        Self {
            code,
            data: None,
            msg: Some(msg.to_string()),
        }
    }
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const INVALID_REQUEST: i32 = 20001;
    pub const NOT_AUTHORIZED: i32 = 20002;
    pub const DISPATCH_FAILED: i32 = 20003;
    pub const UNKNOWN_TRANSACTION: i32 = 20004;
    pub const STORE_ERROR: i32 = 20005;
    pub const ESCROW_CONFLICT: i32 = 20006;
    pub const TRANSPORT_ERROR: i32 = 20007;
}

fn map_error(e: &TxnError) -> (StatusCode, i32) {
    let status =
        StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let code = match e {
        TxnError::InvalidAmount => error_codes::INVALID_REQUEST,
        TxnError::SenderNotAuthorized => error_codes::NOT_AUTHORIZED,
        TxnError::DispatchFailed(_) => error_codes::DISPATCH_FAILED,
        TxnError::UnknownTransaction(_) => error_codes::UNKNOWN_TRANSACTION,
        TxnError::Store(_) => error_codes::STORE_ERROR,
        TxnError::Escrow(_) => error_codes::ESCROW_CONFLICT,
        TxnError::Transport(_) => error_codes::TRANSPORT_ERROR,
    };
    (status, code)
}

#[derive(Debug, Serialize)]
pub struct HealthInfo {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<ApiResponse<HealthInfo>> {
    Json(ApiResponse::success(HealthInfo {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /callback/transaction
pub async fn transaction_completed(
    State(state): State<AppState>,
    Json(payload): Json<CompletionPayload>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    match state.coordinator.on_transfer_completed(payload).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::success(()))),
        Err(e) => {
            let (status, code) = map_error(&e);
            (status, Json(ApiResponse::error(code, &e.to_string())))
        }
    }
}

/// Body of the asset step callbacks. `state` is the ledger's free-form
/// label for the step it thinks it is requesting (logged, not dispatched
/// on — the route already names the step); `buyer_balance` only rides on
/// consume.
#[derive(Debug, Deserialize)]
pub struct AssetStepRequest {
    pub txn_id: TransactionId,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub buyer_balance: Option<Amount>,
}

/// Step verdict. Always delivered with HTTP 200: the remote reads the
/// body, retrying on `"pending"` and treating anything else unsuccessful
/// as permanent.
#[derive(Debug, Serialize)]
pub struct StepAck {
    pub success: bool,
    pub message: String,
}

impl From<StepReply> for StepAck {
    fn from(reply: StepReply) -> Self {
        Self {
            success: reply.success,
            message: reply.message,
        }
    }
}

impl StepAck {
    fn refuse(message: String) -> Self {
        Self {
            success: false,
            message,
        }
    }
}

/// POST /callback/asset/enact
pub async fn asset_enact(
    State(state): State<AppState>,
    Json(req): Json<AssetStepRequest>,
) -> Json<StepAck> {
    debug!(txn_id = %req.txn_id, state = %req.state, "asset enact callback");
    match state.registry.enact(req.txn_id).await {
        Ok(reply) => Json(reply.into()),
        Err(e) => Json(StepAck::refuse(e.to_string())),
    }
}

/// POST /callback/asset/consume
pub async fn asset_consume(
    State(state): State<AppState>,
    Json(req): Json<AssetStepRequest>,
) -> Json<StepAck> {
    debug!(txn_id = %req.txn_id, state = %req.state, "asset consume callback");
    let Some(balance) = req.buyer_balance else {
        return Json(StepAck::refuse(
            "consume requires buyer_balance".to_string(),
        ));
    };
    match state.registry.consume(req.txn_id, balance).await {
        Ok(reply) => Json(reply.into()),
        Err(e) => Json(StepAck::refuse(e.to_string())),
    }
}

/// POST /callback/asset/cancel
pub async fn asset_cancel(
    State(state): State<AppState>,
    Json(req): Json<AssetStepRequest>,
) -> Json<StepAck> {
    debug!(txn_id = %req.txn_id, state = %req.state, "asset cancel callback");
    match state.registry.cancel(req.txn_id).await {
        Ok(reply) => Json(reply.into()),
        Err(e) => Json(StepAck::refuse(e.to_string())),
    }
}

/// Query half of GET /callback/authorize (the ledger's redirect target).
#[derive(Debug, Deserialize)]
pub struct AuthorizeReturn {
    pub identity: IdentityId,
    pub code: String,
}

pub async fn authorize_return(
    State(state): State<AppState>,
    Query(params): Query<AuthorizeReturn>,
) -> (StatusCode, Json<ApiResponse<String>>) {
    match state.auth.exchange_code(params.identity, &params.code).await {
        Ok(link) => (
            StatusCode::OK,
            Json(ApiResponse::success(format!(
                "Ledger account {} linked. You can close this window.",
                link.remote_account
            ))),
        ),
        Err(e @ AuthError::Exchange(_)) => (
            StatusCode::BAD_GATEWAY,
            Json(ApiResponse::error(
                error_codes::TRANSPORT_ERROR,
                &e.to_string(),
            )),
        ),
        Err(e @ AuthError::Store(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(error_codes::STORE_ERROR, &e.to_string())),
        ),
    }
}

/// POST /internal/mock/complete — drives the completion path without a
/// real ledger.
#[cfg(feature = "mock-api")]
pub async fn mock_complete(
    state: State<AppState>,
    payload: Json<CompletionPayload>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    transaction_completed(state, payload).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthFlow;
    use crate::config::LedgerConfig;
    use crate::core_types::TransactionId;
    use crate::escrow::asset::EscrowAsset;
    use crate::escrow::registry::{AssetRegistry, RETRY_MESSAGE};
    use crate::host::MockHost;
    use crate::ledger::MockLedger;
    use crate::link::cache::AccountLinkCache;
    use crate::login::LoginBalanceDedup;
    use crate::store::MemStore;
    use crate::txn::coordinator::TransactionCoordinator;
    use crate::txn::types::CallbackUrls;
    use std::sync::Arc;
    use uuid::Uuid;

    fn app_state() -> (AppState, Arc<MockHost>) {
        let store = Arc::new(MemStore::new());
        let links = Arc::new(AccountLinkCache::new(store.clone()));
        let host = Arc::new(MockHost::new());
        let registry = Arc::new(AssetRegistry::new(host.clone(), host.clone(), host.clone()));
        let ledger = Arc::new(MockLedger::new());
        let cfg = LedgerConfig::default();
        let auth = Arc::new(AuthFlow::new(
            &cfg,
            "http://127.0.0.1:7025",
            links.clone(),
            ledger.clone(),
        ));
        let coordinator = Arc::new(TransactionCoordinator::new(
            "app-test",
            CallbackUrls::from_base("http://127.0.0.1:7025"),
            links,
            registry.clone(),
            store,
            ledger,
            host.clone(),
            auth.clone(),
            Arc::new(LoginBalanceDedup::default()),
        ));
        (
            AppState {
                coordinator,
                registry,
                auth,
            },
            host,
        )
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        let Json(reply) = health().await;
        assert_eq!(reply.code, error_codes::SUCCESS);
        assert_eq!(reply.data.unwrap().status, "ok");
    }

    #[tokio::test]
    async fn test_completion_unknown_transaction_is_404() {
        let (state, _) = app_state();
        let payload = CompletionPayload {
            txn_id: TransactionId::new(),
            success: true,
            status: "queued".to_string(),
            reason: "success".to_string(),
            balance: Some(100),
            sender: None,
            recipient: None,
        };
        let (status, Json(reply)) = transaction_completed(State(state), Json(payload)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(reply.code, error_codes::UNKNOWN_TRANSACTION);
    }

    #[tokio::test]
    async fn test_asset_steps_reply_in_band_not_with_http_errors() {
        let (state, _) = app_state();
        let unknown = AssetStepRequest {
            txn_id: TransactionId::new(),
            state: "enact".to_string(),
            buyer_balance: None,
        };

        // Unknown id: refused in the body, never via status code
        let Json(ack) = asset_enact(State(state.clone()), Json(unknown)).await;
        assert!(!ack.success);
        assert_ne!(ack.message, RETRY_MESSAGE);
        assert!(ack.message.contains("no escrow asset"));
    }

    #[tokio::test]
    async fn test_asset_flow_through_handlers() {
        let (state, host) = app_state();
        let txn_id = TransactionId::new();
        let buyer = Uuid::new_v4();
        state
            .registry
            .create(EscrowAsset::ghost(txn_id, buyer, Uuid::new_v4(), 50))
            .unwrap();

        let Json(ack) = asset_enact(
            State(state.clone()),
            Json(AssetStepRequest {
                txn_id,
                state: "enact".to_string(),
                buyer_balance: None,
            }),
        )
        .await;
        assert!(ack.success);

        // Consume without a balance is refused gracefully
        let Json(ack) = asset_consume(
            State(state.clone()),
            Json(AssetStepRequest {
                txn_id,
                state: "consume".to_string(),
                buyer_balance: None,
            }),
        )
        .await;
        assert!(!ack.success);
        assert!(ack.message.contains("buyer_balance"));

        let Json(ack) = asset_consume(
            State(state.clone()),
            Json(AssetStepRequest {
                txn_id,
                state: "consume".to_string(),
                buyer_balance: Some(950),
            }),
        )
        .await;
        assert!(ack.success);
        assert_eq!(host.balances_for(buyer), vec![950]);

        // Late cancel after settlement: permanent refusal
        let Json(ack) = asset_cancel(
            State(state),
            Json(AssetStepRequest {
                txn_id,
                state: "cancel".to_string(),
                buyer_balance: None,
            }),
        )
        .await;
        assert!(!ack.success);
        assert_ne!(ack.message, RETRY_MESSAGE);
    }

    #[tokio::test]
    async fn test_authorize_return_links_account() {
        let (state, _) = app_state();
        let identity = Uuid::new_v4();
        let (status, Json(reply)) = authorize_return(
            State(state),
            Query(AuthorizeReturn {
                identity,
                code: "good-code".to_string(),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(reply.data.unwrap().contains("mock-account"));
    }

    #[tokio::test]
    async fn test_authorize_return_bad_code() {
        let (state, _) = app_state();
        let (status, Json(reply)) = authorize_return(
            State(state),
            Query(AuthorizeReturn {
                identity: Uuid::new_v4(),
                code: "bad-code".to_string(),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(reply.code, error_codes::TRANSPORT_ERROR);
    }
}
