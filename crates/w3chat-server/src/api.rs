use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use w3chat_shared::{Address, GroupId, Page};
use w3chat_store::{CallResult, GroupInfo, GroupMessage, Ledger, PrivateMessage, ReadCall, User};

use crate::auth::Caller;
use crate::config::ServerConfig;
use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/stats", get(stats))
        .route("/users", post(register_user))
        .route("/profile/image", put(update_profile_image))
        .route("/users/:address", get(get_user_profile))
        .route("/users/:address/registered", get(is_user_registered))
        .route("/users/:address/groups", get(get_user_groups))
        .route("/names/:first_name", get(resolve_first_name))
        .route("/names/:first_name/available", get(is_first_name_available))
        .route("/private", post(send_private_message))
        .route("/private/:a/:b", get(get_private_messages))
        .route("/groups", post(create_group_chat))
        .route("/groups/:id", get(get_group_info))
        .route("/groups/:id/members", post(add_group_member))
        .route(
            "/groups/:id/messages",
            post(send_group_message).get(get_group_messages),
        )
        .route("/multicall", post(multicall))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfoResponse {
    name: String,
    network: String,
    version: &'static str,
    default_page_size: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    total_users: u64,
    group_count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    name: String,
    image_ref: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageRequest {
    image_ref: String,
}

#[derive(Serialize)]
struct RegisteredResponse {
    registered: bool,
}

#[derive(Serialize)]
struct GroupListResponse {
    groups: Vec<GroupId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveResponse {
    first_name: String,
    address: Option<Address>,
}

#[derive(Serialize)]
struct AvailabilityResponse {
    available: bool,
}

#[derive(Deserialize)]
struct PrivateMessageRequest {
    recipient: Address,
    content: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateGroupRequest {
    name: String,
    #[serde(default)]
    members: Vec<Address>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateGroupResponse {
    group_id: GroupId,
}

#[derive(Deserialize)]
struct AddMemberRequest {
    member: Address,
}

#[derive(Deserialize)]
struct GroupMessageRequest {
    content: String,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    offset: Option<u64>,
    limit: Option<u64>,
}

impl PageQuery {
    fn resolve(&self, default_limit: u64) -> Page {
        Page::new(self.offset.unwrap_or(0), self.limit.unwrap_or(default_limit))
    }
}

#[derive(Deserialize)]
struct MulticallRequest {
    calls: Vec<ReadCall>,
}

#[derive(Serialize)]
struct MulticallResponse {
    results: Vec<CallResult>,
}

#[derive(Serialize)]
struct MessagePage<T> {
    messages: Vec<T>,
    total: u64,
    offset: u64,
    limit: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

type ApiJson<T> = WithRejection<Json<T>, ServerError>;
type ApiPath<T> = WithRejection<Path<T>, ServerError>;
type ApiQuery<T> = WithRejection<Query<T>, ServerError>;

/// Run a ledger call on the blocking pool.
async fn with_ledger<T, F>(state: &AppState, f: F) -> Result<T, ServerError>
where
    F: FnOnce(&Ledger) -> w3chat_store::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let ledger = state.ledger.clone();
    Ok(tokio::task::spawn_blocking(move || f(&ledger)).await??)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        network: state.config.network.clone(),
        version: env!("CARGO_PKG_VERSION"),
        default_page_size: state.config.default_page_size,
    })
}

async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ServerError> {
    let (total_users, group_count) = with_ledger(&state, |ledger| {
        Ok((ledger.get_total_users()?, ledger.get_group_count()?))
    })
    .await?;
    Ok(Json(StatsResponse {
        total_users,
        group_count,
    }))
}

async fn register_user(
    State(state): State<AppState>,
    Caller(caller): Caller,
    WithRejection(Json(req), _): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ServerError> {
    let user = with_ledger(&state, move |ledger| {
        ledger.register_user(&caller, &req.name, &req.image_ref)?;
        ledger.get_user_profile(&caller)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_profile_image(
    State(state): State<AppState>,
    Caller(caller): Caller,
    WithRejection(Json(req), _): ApiJson<ImageRequest>,
) -> Result<StatusCode, ServerError> {
    with_ledger(&state, move |ledger| {
        ledger.update_profile_image(&caller, &req.image_ref)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_user_profile(
    State(state): State<AppState>,
    WithRejection(Path(address), _): ApiPath<Address>,
) -> Result<Json<User>, ServerError> {
    let user = with_ledger(&state, move |ledger| ledger.get_user_profile(&address)).await?;
    Ok(Json(user))
}

async fn is_user_registered(
    State(state): State<AppState>,
    WithRejection(Path(address), _): ApiPath<Address>,
) -> Result<Json<RegisteredResponse>, ServerError> {
    let registered = with_ledger(&state, move |ledger| ledger.is_user_registered(&address)).await?;
    Ok(Json(RegisteredResponse { registered }))
}

async fn get_user_groups(
    State(state): State<AppState>,
    WithRejection(Path(address), _): ApiPath<Address>,
) -> Result<Json<GroupListResponse>, ServerError> {
    let groups = with_ledger(&state, move |ledger| ledger.get_user_groups(&address)).await?;
    Ok(Json(GroupListResponse { groups }))
}

async fn resolve_first_name(
    State(state): State<AppState>,
    WithRejection(Path(first_name), _): ApiPath<String>,
) -> Result<Json<ResolveResponse>, ServerError> {
    let lookup = first_name.clone();
    let address = with_ledger(&state, move |ledger| ledger.resolve_first_name(&lookup)).await?;
    Ok(Json(ResolveResponse {
        first_name,
        address,
    }))
}

/// Anonymous lookups are allowed; a caller that already holds the name sees
/// it as available.
async fn is_first_name_available(
    State(state): State<AppState>,
    caller: Option<Caller>,
    WithRejection(Path(first_name), _): ApiPath<String>,
) -> Result<Json<AvailabilityResponse>, ServerError> {
    let caller = caller.map(|Caller(addr)| addr);
    let available = with_ledger(&state, move |ledger| {
        ledger.is_first_name_available(&first_name, caller.as_ref())
    })
    .await?;
    Ok(Json(AvailabilityResponse { available }))
}

async fn send_private_message(
    State(state): State<AppState>,
    Caller(caller): Caller,
    WithRejection(Json(req), _): ApiJson<PrivateMessageRequest>,
) -> Result<StatusCode, ServerError> {
    with_ledger(&state, move |ledger| {
        ledger.send_private_message(&caller, &req.recipient, &req.content)
    })
    .await?;
    Ok(StatusCode::CREATED)
}

async fn get_private_messages(
    State(state): State<AppState>,
    WithRejection(Path((a, b)), _): ApiPath<(Address, Address)>,
    WithRejection(Query(query), _): ApiQuery<PageQuery>,
) -> Result<Json<MessagePage<PrivateMessage>>, ServerError> {
    let page = query.resolve(state.config.default_page_size);
    let (messages, total) =
        with_ledger(&state, move |ledger| ledger.get_private_page(&a, &b, page)).await?;
    Ok(Json(MessagePage {
        messages,
        total,
        offset: page.offset,
        limit: page.limit,
    }))
}

async fn create_group_chat(
    State(state): State<AppState>,
    Caller(caller): Caller,
    WithRejection(Json(req), _): ApiJson<CreateGroupRequest>,
) -> Result<(StatusCode, Json<CreateGroupResponse>), ServerError> {
    let group_id = with_ledger(&state, move |ledger| {
        ledger.create_group_chat(&caller, &req.name, &req.members)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(CreateGroupResponse { group_id })))
}

async fn get_group_info(
    State(state): State<AppState>,
    WithRejection(Path(id), _): ApiPath<GroupId>,
) -> Result<Json<GroupInfo>, ServerError> {
    let info = with_ledger(&state, move |ledger| ledger.get_group_info(id)).await?;
    Ok(Json(info))
}

async fn add_group_member(
    State(state): State<AppState>,
    Caller(caller): Caller,
    WithRejection(Path(id), _): ApiPath<GroupId>,
    WithRejection(Json(req), _): ApiJson<AddMemberRequest>,
) -> Result<StatusCode, ServerError> {
    with_ledger(&state, move |ledger| {
        ledger.add_group_member(&caller, id, &req.member)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn send_group_message(
    State(state): State<AppState>,
    Caller(caller): Caller,
    WithRejection(Path(id), _): ApiPath<GroupId>,
    WithRejection(Json(req), _): ApiJson<GroupMessageRequest>,
) -> Result<StatusCode, ServerError> {
    with_ledger(&state, move |ledger| {
        ledger.send_group_message(&caller, id, &req.content)
    })
    .await?;
    Ok(StatusCode::CREATED)
}

async fn get_group_messages(
    State(state): State<AppState>,
    WithRejection(Path(id), _): ApiPath<GroupId>,
    WithRejection(Query(query), _): ApiQuery<PageQuery>,
) -> Result<Json<MessagePage<GroupMessage>>, ServerError> {
    let page = query.resolve(state.config.default_page_size);
    let (messages, total) =
        with_ledger(&state, move |ledger| ledger.get_group_page(id, page)).await?;
    Ok(Json(MessagePage {
        messages,
        total,
        offset: page.offset,
        limit: page.limit,
    }))
}

/// Answer a list of read calls from one snapshot of the ledger.
async fn multicall(
    State(state): State<AppState>,
    WithRejection(Json(req), _): ApiJson<MulticallRequest>,
) -> Result<Json<MulticallResponse>, ServerError> {
    let results = with_ledger(&state, move |ledger| ledger.batch_read(&req.calls)).await?;
    Ok(Json(MulticallResponse { results }))
}

/// Start the HTTP API server on the given address.
pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use w3chat_shared::constants::CALLER_HEADER;

    use super::*;

    fn test_state() -> AppState {
        AppState {
            ledger: Arc::new(Ledger::open_in_memory().unwrap()),
            config: Arc::new(ServerConfig::default()),
        }
    }

    fn test_app() -> Router {
        build_router(test_state())
    }

    fn addr() -> Address {
        Address(rand::random())
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        caller: Option<&Address>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(caller) = caller {
            builder = builder.header(CALLER_HEADER, caller.to_hex());
        }
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };

        let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn register(app: &Router, who: &Address, name: &str) {
        let (status, _) = call(
            app,
            Method::POST,
            "/users",
            Some(who),
            Some(json!({ "name": name, "imageRef": "QmAvatar" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_health_and_info() {
        let app = test_app();
        let (status, body) = call(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (_, info) = call(&app, Method::GET, "/info", None, None).await;
        assert_eq!(info["network"], "localhost");
        assert_eq!(info["defaultPageSize"], 50);
    }

    #[tokio::test]
    async fn test_registration_flow() {
        let app = test_app();
        let alice = addr();
        let bob = addr();

        let (status, body) = call(
            &app,
            Method::POST,
            "/users",
            Some(&alice),
            Some(json!({ "name": "Alice Smith", "imageRef": "QmA" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["firstName"], "Alice");
        assert_eq!(body["isRegistered"], true);

        let (status, body) = call(
            &app,
            Method::POST,
            "/users",
            Some(&alice),
            Some(json!({ "name": "Other", "imageRef": "QmA" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "AlreadyRegistered");

        let (status, body) = call(
            &app,
            Method::POST,
            "/users",
            Some(&bob),
            Some(json!({ "name": "alice Jones", "imageRef": "QmB" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "First name taken");

        let (_, stats) = call(&app, Method::GET, "/stats", None, None).await;
        assert_eq!(stats["totalUsers"], 1);
        assert_eq!(stats["groupCount"], 0);

        let uri = format!("/users/{}/registered", bob.to_hex());
        let (_, body) = call(&app, Method::GET, &uri, None, None).await;
        assert_eq!(body["registered"], false);

        let uri = format!("/users/{}", bob.to_hex());
        let (status, body) = call(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isRegistered"], false);
        assert_eq!(body["name"], "");
    }

    #[tokio::test]
    async fn test_missing_caller_is_unauthorized() {
        let app = test_app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/users",
            None,
            Some(json!({ "name": "Alice", "imageRef": "QmA" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_profile_image_update() {
        let app = test_app();
        let alice = addr();

        let body = json!({ "imageRef": "QmNew" });
        let (status, _) =
            call(&app, Method::PUT, "/profile/image", Some(&alice), Some(body.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        register(&app, &alice, "Alice").await;
        let (status, _) = call(&app, Method::PUT, "/profile/image", Some(&alice), Some(body)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let uri = format!("/users/{}", alice.to_hex());
        let (_, profile) = call(&app, Method::GET, &uri, None, None).await;
        assert_eq!(profile["imageRef"], "QmNew");
    }

    #[tokio::test]
    async fn test_first_name_lookup() {
        let app = test_app();
        let alice = addr();
        register(&app, &alice, "Alice Smith").await;

        let (_, body) = call(&app, Method::GET, "/names/ALICE", None, None).await;
        assert_eq!(body["address"], alice.to_hex());

        let (_, body) = call(&app, Method::GET, "/names/ALICE/available", None, None).await;
        assert_eq!(body["available"], false);

        let (_, body) =
            call(&app, Method::GET, "/names/ALICE/available", Some(&alice), None).await;
        assert_eq!(body["available"], true);

        let (_, body) = call(&app, Method::GET, "/names/bob", None, None).await;
        assert!(body["address"].is_null());
    }

    #[tokio::test]
    async fn test_private_thread_is_shared() {
        let app = test_app();
        let alice = addr();
        let bob = addr();
        register(&app, &alice, "Alice").await;
        register(&app, &bob, "Bob").await;

        let (status, _) = call(
            &app,
            Method::POST,
            "/private",
            Some(&alice),
            Some(json!({ "recipient": bob.to_hex(), "content": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        call(
            &app,
            Method::POST,
            "/private",
            Some(&bob),
            Some(json!({ "recipient": alice.to_hex(), "content": "hey" })),
        )
        .await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/private",
            Some(&alice),
            Some(json!({ "recipient": alice.to_hex(), "content": "me" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "SelfMessage");

        let uri = format!("/private/{}/{}", bob.to_hex(), alice.to_hex());
        let (_, page) = call(&app, Method::GET, &uri, None, None).await;
        assert_eq!(page["total"], 2);
        assert_eq!(page["limit"], 50);
        assert_eq!(page["messages"][0]["content"], "hi");
        assert_eq!(page["messages"][1]["sender"], bob.to_hex());

        let uri = format!("/private/{}/{}?offset=1&limit=5", alice.to_hex(), bob.to_hex());
        let (_, page) = call(&app, Method::GET, &uri, None, None).await;
        assert_eq!(page["messages"].as_array().unwrap().len(), 1);
        assert_eq!(page["messages"][0]["content"], "hey");
    }

    #[tokio::test]
    async fn test_group_lifecycle() {
        let app = test_app();
        let alice = addr();
        let bob = addr();
        let carol = addr();
        register(&app, &alice, "Alice").await;
        register(&app, &bob, "Bob").await;
        register(&app, &carol, "Carol").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/groups",
            Some(&alice),
            Some(json!({ "name": "Team", "members": [bob.to_hex()] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["groupId"], 1);

        let (_, info) = call(&app, Method::GET, "/groups/1", None, None).await;
        assert_eq!(info["admin"], alice.to_hex());
        assert_eq!(info["members"], json!([alice.to_hex(), bob.to_hex()]));

        let msg = json!({ "content": "hello team" });
        let (status, body) =
            call(&app, Method::POST, "/groups/1/messages", Some(&carol), Some(msg.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["kind"], "NotMember");

        let add = json!({ "member": carol.to_hex() });
        let (status, body) =
            call(&app, Method::POST, "/groups/1/members", Some(&bob), Some(add.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Only admin");

        let (status, _) =
            call(&app, Method::POST, "/groups/1/members", Some(&alice), Some(add.clone())).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) =
            call(&app, Method::POST, "/groups/1/members", Some(&alice), Some(add)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "AlreadyMember");

        let (status, _) =
            call(&app, Method::POST, "/groups/1/messages", Some(&carol), Some(msg)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, page) = call(&app, Method::GET, "/groups/1/messages?limit=10", None, None).await;
        assert_eq!(page["total"], 1);
        assert_eq!(page["messages"][0]["sender"], carol.to_hex());
        assert_eq!(page["messages"][0]["groupId"], 1);

        let uri = format!("/users/{}/groups", carol.to_hex());
        let (_, body) = call(&app, Method::GET, &uri, None, None).await;
        assert_eq!(body["groups"], json!([1]));
    }

    #[tokio::test]
    async fn test_unknown_group_is_not_found() {
        let app = test_app();
        let (status, body) = call(&app, Method::GET, "/groups/99", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "GroupNotFound");

        let (status, _) = call(&app, Method::GET, "/groups/99/messages", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_requests_get_json_errors() {
        let app = test_app();
        let alice = addr();

        let (status, body) = call(
            &app,
            Method::POST,
            "/users",
            Some(&alice),
            Some(json!({ "name": "Alice" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("imageRef"));

        let (status, body) = call(&app, Method::GET, "/users/0xnothex", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let uri = format!("/private/{}/{}?limit=-1", alice.to_hex(), addr().to_hex());
        let (status, body) = call(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = call(&app, Method::GET, "/groups/abc", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_multicall_reads_one_snapshot() {
        let app = test_app();
        let alice = addr();
        let bob = addr();
        register(&app, &alice, "Alice").await;
        register(&app, &bob, "Bob").await;
        call(
            &app,
            Method::POST,
            "/private",
            Some(&alice),
            Some(json!({ "recipient": bob.to_hex(), "content": "hi" })),
        )
        .await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/multicall",
            None,
            Some(json!({ "calls": [
                { "op": "totalUsers" },
                { "op": "userProfile", "address": bob.to_hex() },
                { "op": "privateMessages", "userA": bob.to_hex(), "userB": alice.to_hex() },
                { "op": "groupInfo", "groupId": 5 },
                { "op": "resolveFirstName", "firstName": "ALICE" },
            ] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(results[0]["value"], 2);
        assert_eq!(results[1]["value"]["name"], "Bob");
        assert_eq!(results[2]["value"][0]["content"], "hi");
        assert_eq!(results[3]["success"], false);
        assert_eq!(results[3]["error"], "Group not found: 5");
        assert_eq!(results[4]["value"], alice.to_hex());
    }

    #[tokio::test]
    async fn test_multicall_rejects_unknown_ops_and_oversized_batches() {
        let app = test_app();

        let (status, body) = call(
            &app,
            Method::POST,
            "/multicall",
            None,
            Some(json!({ "calls": [{ "op": "dropTables" }] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let calls = vec![json!({ "op": "groupCount" }); 65];
        let (status, body) = call(
            &app,
            Method::POST,
            "/multicall",
            None,
            Some(json!({ "calls": calls })),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["kind"], "BatchTooLarge");
    }

    #[tokio::test]
    async fn test_ledger_calls_run_off_the_async_worker() {
        let state = test_state();

        let worker = std::thread::current().id();
        let ran_on = with_ledger(&state, |_| Ok(std::thread::current().id()))
            .await
            .unwrap();
        assert_ne!(ran_on, worker);

        let err = with_ledger(&state, |_| -> w3chat_store::Result<()> { panic!("boom") })
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Internal(_)));
    }
}
