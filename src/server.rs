//! Bounty Escrow Server
//!
//! HTTP surface for every escrow operation.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::error::EscrowError;
use crate::escrow::BountyEscrow;
use crate::events::EventRecord;
use crate::ledger::LedgerTotals;
use crate::types::{
    amount_string, Amount, Bounty, BountyId, BountyStatus, Identity, FEE_DENOMINATOR,
    MAX_CLAIM_DURATION_SECS, MAX_FEE_BPS,
};

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 500;

pub struct AppState {
    pub escrow: Arc<BountyEscrow>,
    pub started_at: std::time::Instant,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config", get(config_handler))
        .route("/bounties", post(deposit_handler).get(list_handler))
        .route("/bounties/:id", get(bounty_handler))
        .route("/bounties/:id/history", get(history_handler))
        .route("/bounties/:id/claim", post(claim_handler))
        .route("/bounties/:id/complete", post(complete_handler))
        .route("/bounties/:id/refund", post(refund_handler))
        .route("/withdraw", post(withdraw_handler))
        .route("/balances/:identity", get(balance_handler))
        .route("/pool", get(pool_handler))
        .route("/admin/fee", post(set_fee_handler))
        .route("/admin/owner", post(transfer_owner_handler))
        .route("/events", get(events_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Escrow(EscrowError),
    BadRequest(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        let err = match self {
            ApiError::Escrow(err) => err,
            ApiError::BadRequest(_) => return StatusCode::BAD_REQUEST,
        };
        match err {
            EscrowError::InvalidAmount
            | EscrowError::InvalidReference
            | EscrowError::SelfClaim
            | EscrowError::FeeTooHigh(_)
            | EscrowError::InvalidIdentity => StatusCode::BAD_REQUEST,
            EscrowError::NotAuthorized => StatusCode::FORBIDDEN,
            EscrowError::NotFound(_) => StatusCode::NOT_FOUND,
            EscrowError::NotOpen(_)
            | EscrowError::NotClaimed(_)
            | EscrowError::CannotRefund(_)
            | EscrowError::NothingToWithdraw => StatusCode::CONFLICT,
            EscrowError::TransferFailed(_) => StatusCode::BAD_GATEWAY,
            EscrowError::Storage(_) | EscrowError::Codec(_) | EscrowError::CorruptJournal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Escrow(err) => ErrorBody {
                error: err.code().to_string(),
                message: err.to_string(),
            },
            ApiError::BadRequest(message) => ErrorBody {
                error: "BadRequest".to_string(),
                message: message.clone(),
            },
        }
    }
}

impl From<EscrowError> for ApiError {
    fn from(err: EscrowError) -> Self {
        ApiError::Escrow(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.body();
        if status.is_server_error() {
            error!("Request failed: {}", body.message);
        }
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ============================================================================
// REQUESTS / RESPONSES
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CallerRequest {
    pub caller: Identity,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub caller: Identity,
    pub issue_reference: String,
    #[serde(with = "amount_string")]
    pub value: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DepositResponse {
    pub bounty_id: BountyId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompleteResponse {
    pub bounty_id: BountyId,
    #[serde(with = "amount_string")]
    pub payout: Amount,
    #[serde(with = "amount_string")]
    pub fee: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AmountResponse {
    pub identity: Identity,
    #[serde(with = "amount_string")]
    pub amount: Amount,
}

#[derive(Debug, Deserialize)]
pub struct SetFeeRequest {
    pub caller: Identity,
    pub fee_bps: u16,
}

#[derive(Debug, Deserialize)]
pub struct TransferOwnerRequest {
    pub caller: Identity,
    pub new_owner: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProtocolResponse {
    pub owner: Identity,
    pub fee_bps: u16,
    pub max_fee_bps: u16,
    #[serde(with = "amount_string")]
    pub fee_denominator: Amount,
    pub max_claim_duration_secs: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PoolResponse {
    #[serde(with = "amount_string")]
    pub pool_balance: Amount,
    pub totals: LedgerTotals,
    pub conserved: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BountyListResponse {
    pub bounties: Vec<Bounty>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub uptime_secs: u64,
    pub version: String,
    pub bounties: usize,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub after: Option<u64>,
    pub limit: Option<usize>,
}

fn page_size(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

// ============================================================================
// HANDLERS
// ============================================================================

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        uptime_secs: state.started_at.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        bounties: state.escrow.bounty_count(),
    })
}

async fn config_handler(State(state): State<Arc<AppState>>) -> Json<ProtocolResponse> {
    let protocol = state.escrow.protocol();
    Json(ProtocolResponse {
        owner: protocol.owner(),
        fee_bps: protocol.fee_bps(),
        max_fee_bps: MAX_FEE_BPS,
        fee_denominator: FEE_DENOMINATOR,
        max_claim_duration_secs: MAX_CLAIM_DURATION_SECS,
    })
}

async fn deposit_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DepositRequest>,
) -> Result<(StatusCode, Json<DepositResponse>), ApiError> {
    let bounty_id =
        state
            .escrow
            .deposit(&request.caller, &request.issue_reference, request.value)?;
    Ok((StatusCode::CREATED, Json(DepositResponse { bounty_id })))
}

async fn list_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<BountyListResponse> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<BountyStatus>)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let bounties = state
        .escrow
        .list_bounties(status, page_size(query.limit), query.offset.unwrap_or(0));
    Ok(Json(BountyListResponse { bounties }))
}

async fn bounty_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BountyId>,
) -> ApiResult<Bounty> {
    Ok(Json(state.escrow.get_bounty(id)?))
}

async fn history_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BountyId>,
) -> ApiResult<EventsResponse> {
    let events = state.escrow.bounty_history(id)?;
    Ok(Json(EventsResponse { events }))
}

async fn claim_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BountyId>,
    Json(request): Json<CallerRequest>,
) -> ApiResult<Bounty> {
    state.escrow.claim(&request.caller, id)?;
    Ok(Json(state.escrow.get_bounty(id)?))
}

async fn complete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BountyId>,
    Json(request): Json<CallerRequest>,
) -> ApiResult<CompleteResponse> {
    let (payout, fee) = state.escrow.complete(&request.caller, id)?;
    Ok(Json(CompleteResponse {
        bounty_id: id,
        payout,
        fee,
    }))
}

async fn refund_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BountyId>,
    Json(request): Json<CallerRequest>,
) -> ApiResult<Bounty> {
    state.escrow.refund(&request.caller, id)?;
    Ok(Json(state.escrow.get_bounty(id)?))
}

async fn withdraw_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CallerRequest>,
) -> ApiResult<AmountResponse> {
    let amount = state.escrow.withdraw(&request.caller)?;
    Ok(Json(AmountResponse {
        identity: request.caller,
        amount,
    }))
}

async fn balance_handler(
    State(state): State<Arc<AppState>>,
    Path(identity): Path<String>,
) -> ApiResult<AmountResponse> {
    let identity: Identity = identity.parse()?;
    Ok(Json(AmountResponse {
        identity,
        amount: state.escrow.pending_balance_of(&identity),
    }))
}

async fn pool_handler(State(state): State<Arc<AppState>>) -> Json<PoolResponse> {
    let totals = state.escrow.totals();
    Json(PoolResponse {
        pool_balance: totals.pool_balance(),
        totals,
        conserved: totals.is_conserved(),
    })
}

async fn set_fee_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetFeeRequest>,
) -> ApiResult<ProtocolResponse> {
    state.escrow.set_fee_bps(&request.caller, request.fee_bps)?;
    Ok(config_handler(State(state)).await)
}

async fn transfer_owner_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TransferOwnerRequest>,
) -> ApiResult<ProtocolResponse> {
    let new_owner: Identity = request.new_owner.parse()?;
    state.escrow.transfer_ownership(&request.caller, &new_owner)?;
    Ok(config_handler(State(state)).await)
}

async fn events_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<EventsResponse> {
    let events = state
        .escrow
        .events(query.after.unwrap_or(0), page_size(query.limit))?;
    Ok(Json(EventsResponse { events }))
}

/// Run the server
pub async fn run_server(host: &str, port: u16, escrow: Arc<BountyEscrow>) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        escrow,
        started_at: std::time::Instant::now(),
    });

    let app = create_router(state);
    let addr = format!("{}:{}", host, port);

    info!("Starting Bounty Escrow server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::escrow::ProtocolGenesis;
    use crate::storage::EventStore;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const OWNER: &str = "0x0000000000000000000000000000000000000001";
    const FUNDER: &str = "0x0000000000000000000000000000000000000002";
    const AGENT: &str = "0x0000000000000000000000000000000000000003";

    fn test_router() -> Router {
        let store = Arc::new(EventStore::in_memory().unwrap());
        let genesis = ProtocolGenesis {
            owner: OWNER.parse().unwrap(),
            fee_bps: 250,
        };
        let escrow =
            BountyEscrow::open(store, genesis, Arc::new(ManualClock::new(1_700_000_000))).unwrap();
        create_router(Arc::new(AppState {
            escrow: Arc::new(escrow),
            started_at: std::time::Instant::now(),
        }))
    }

    async fn json_request(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json");

        let body = match body {
            Some(json_body) => Body::from(serde_json::to_vec(&json_body).unwrap()),
            None => Body::empty(),
        };

        let response = router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_bounty_lifecycle_over_http() {
        let router = test_router();

        let (status, body) = json_request(
            &router,
            "POST",
            "/bounties",
            Some(json!({
                "caller": FUNDER,
                "issue_reference": "a/b#1",
                "value": "1000000000000000000"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["bounty_id"], 1);

        let (status, body) = json_request(
            &router,
            "POST",
            "/bounties/1/claim",
            Some(json!({ "caller": AGENT })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Claimed");
        assert_eq!(body["claimant"], AGENT);

        let (status, body) = json_request(
            &router,
            "POST",
            "/bounties/1/complete",
            Some(json!({ "caller": OWNER })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payout"], "975000000000000000");
        assert_eq!(body["fee"], "25000000000000000");

        let (_, body) = json_request(&router, "GET", &format!("/balances/{}", AGENT), None).await;
        assert_eq!(body["amount"], "975000000000000000");

        let (status, body) =
            json_request(&router, "POST", "/withdraw", Some(json!({ "caller": AGENT }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["amount"], "975000000000000000");

        let (_, body) = json_request(&router, "GET", "/pool", None).await;
        assert_eq!(body["pool_balance"], "25000000000000000");
        assert_eq!(body["conserved"], true);

        let (_, body) = json_request(&router, "GET", "/bounties/1/history", None).await;
        assert_eq!(body["events"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let router = test_router();

        let (status, body) = json_request(&router, "GET", "/bounties/7", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NotFound");

        let (status, body) = json_request(
            &router,
            "POST",
            "/bounties",
            Some(json!({ "caller": FUNDER, "issue_reference": "a/b#1", "value": "0" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidAmount");

        let (status, body) =
            json_request(&router, "POST", "/withdraw", Some(json!({ "caller": AGENT }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "NothingToWithdraw");

        let (status, body) = json_request(
            &router,
            "POST",
            "/admin/fee",
            Some(json!({ "caller": AGENT, "fee_bps": 100 })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "NotAuthorized");

        let (status, body) = json_request(&router, "GET", "/balances/not-an-address", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidIdentity");

        let (status, body) = json_request(&router, "GET", "/bounties?status=bogus", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BadRequest");
    }

    #[tokio::test]
    async fn test_admin_endpoints() {
        let router = test_router();

        let (status, body) = json_request(
            &router,
            "POST",
            "/admin/fee",
            Some(json!({ "caller": OWNER, "fee_bps": 1001 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "FeeTooHigh");

        let (status, body) = json_request(
            &router,
            "POST",
            "/admin/owner",
            Some(json!({
                "caller": OWNER,
                "new_owner": "0x0000000000000000000000000000000000000000"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidIdentity");

        let (status, body) = json_request(
            &router,
            "POST",
            "/admin/owner",
            Some(json!({ "caller": OWNER, "new_owner": AGENT })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["owner"], AGENT);

        let (_, body) = json_request(&router, "GET", "/config", None).await;
        assert_eq!(body["owner"], AGENT);
        assert_eq!(body["fee_bps"], 250);
        assert_eq!(body["max_claim_duration_secs"], 604_800);

        let (_, body) = json_request(&router, "GET", "/events?after=0&limit=10", None).await;
        let kinds: Vec<&str> = body["events"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["event"]["type"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, vec!["ProtocolInitialized", "OwnershipTransferred"]);
    }

    #[tokio::test]
    async fn test_list_and_health() {
        let router = test_router();
        for n in 1..=3 {
            json_request(
                &router,
                "POST",
                "/bounties",
                Some(json!({
                    "caller": FUNDER,
                    "issue_reference": format!("a/b#{}", n),
                    "value": "10"
                })),
            )
            .await;
        }
        json_request(
            &router,
            "POST",
            "/bounties/2/refund",
            Some(json!({ "caller": FUNDER })),
        )
        .await;

        let (_, body) = json_request(&router, "GET", "/bounties?status=open", None).await;
        let ids: Vec<u64> = body["bounties"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 3]);

        let (status, body) = json_request(&router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["healthy"], true);
        assert_eq!(body["bounties"], 3);
    }
}
