use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::instrument;

use super::{
    directory::{lookup_role, Notice, UserDirectory},
    dto::{ListQuery, ListResponse, MutationResponse, SetRoleRequest, ToggleBlockRequest},
    role::Role,
};
use crate::{auth::jwt::AuthUser, error::AppError, state::AppState};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/notices", get(take_notices))
        .route("/admin/notices/:id", delete(dismiss_notice))
        .route("/admin/users/:id/role", put(set_role))
        .route("/admin/users/:id/block", post(toggle_block))
}

fn staff_only() -> AppError {
    AppError::Forbidden("Admin access required".into())
}

/// The viewer's directory, refused to anyone whose stored role is not staff.
async fn staff_directory(state: &AppState, viewer_id: &str) -> Result<Arc<UserDirectory>, AppError> {
    state
        .directories
        .for_staff(viewer_id)
        .await
        .ok_or_else(staff_only)
}

/// Role check alone, for staff routes that do not need a directory.
pub(crate) async fn require_staff(state: &AppState, viewer_id: &str) -> Result<Role, AppError> {
    lookup_role(state.users.as_ref(), viewer_id)
        .await
        .filter(|role| role.is_staff())
        .ok_or_else(staff_only)
}

async fn listing(dir: &UserDirectory) -> ListResponse {
    let rows = dir.rows().await;
    ListResponse {
        loading: dir.is_loading().await,
        sort: dir.sort_state().await,
        search: dir.search().await,
        users: rows,
    }
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(viewer_id): AuthUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<ListResponse>, AppError> {
    let dir = staff_directory(&state, &viewer_id).await?;
    if q.refresh {
        dir.load().await;
    }
    if let Some(search) = q.search {
        dir.set_search(search).await;
    }
    if let Some(field) = q.sort {
        dir.select_sort(field).await;
    }
    Ok(Json(listing(&dir).await))
}

#[instrument(skip(state))]
pub async fn set_role(
    State(state): State<AppState>,
    AuthUser(viewer_id): AuthUser,
    Path(user_id): Path<String>,
    Json(body): Json<SetRoleRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    let dir = staff_directory(&state, &viewer_id).await?;
    let success = dir.set_role(&user_id, body.role).await;
    Ok(Json(MutationResponse {
        success,
        notices: dir.take_notices().await,
    }))
}

#[instrument(skip(state))]
pub async fn toggle_block(
    State(state): State<AppState>,
    AuthUser(viewer_id): AuthUser,
    Path(user_id): Path<String>,
    Json(body): Json<ToggleBlockRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    let dir = staff_directory(&state, &viewer_id).await?;
    let success = dir.toggle_blocked(&user_id, body.is_blocked).await;
    Ok(Json(MutationResponse {
        success,
        notices: dir.take_notices().await,
    }))
}

#[instrument(skip(state))]
pub async fn take_notices(
    State(state): State<AppState>,
    AuthUser(viewer_id): AuthUser,
) -> Result<Json<Vec<Notice>>, AppError> {
    let dir = staff_directory(&state, &viewer_id).await?;
    Ok(Json(dir.take_notices().await))
}

#[instrument(skip(state))]
pub async fn dismiss_notice(
    State(state): State<AppState>,
    AuthUser(viewer_id): AuthUser,
    Path(notice_id): Path<u64>,
) -> Result<StatusCode, AppError> {
    let dir = staff_directory(&state, &viewer_id).await?;
    if dir.dismiss(notice_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Notice not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        extract::FromRef,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{
        app::build_app,
        auth::jwt::JwtKeys,
        catalog::store::memory::MemoryCatalogStore,
        state::AppState,
        users::{
            record::UserRecord,
            role::Role,
            store::{
                memory::{MemoryUserStore, Write},
                UserStore,
            },
        },
    };

    fn setup() -> (AppState, Arc<MemoryUserStore>) {
        let users = Arc::new(MemoryUserStore::with_users(vec![
            UserRecord::new("u1", "b@x.com", Some(Role::Client)),
            UserRecord::new("u2", "a@x.com", Some(Role::Admin)),
            UserRecord::new("sa", "root@x.com", Some(Role::SuperAdmin)),
        ]));
        let state = AppState::fake(users.clone(), Arc::new(MemoryCatalogStore::default()));
        (state, users)
    }

    fn bearer(state: &AppState, user_id: &str) -> String {
        let token = JwtKeys::from_ref(state).sign_access(user_id).unwrap();
        format!("Bearer {token}")
    }

    async fn call(state: &AppState, req: Request<Body>) -> (StatusCode, Value) {
        let res = build_app(state.clone()).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(state: &AppState, uri: &str, viewer: &str) -> Request<Body> {
        Request::get(uri)
            .header("authorization", bearer(state, viewer))
            .body(Body::empty())
            .unwrap()
    }

    fn send_json(state: &AppState, method: &str, uri: &str, viewer: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", bearer(state, viewer))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn anonymous_is_unauthorized() {
        let (state, _) = setup();
        let req = Request::get("/api/v1/admin/users").body(Body::empty()).unwrap();
        let (status, _) = call(&state, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn clients_are_forbidden() {
        let (state, _) = setup();
        let (status, _) = call(&state, get(&state, "/api/v1/admin/users", "u1")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_lists_projection_with_capabilities() {
        let (state, _) = setup();
        let (status, body) = call(&state, get(&state, "/api/v1/admin/users?sort=role", "u2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sort"], json!({ "field": "role", "direction": "asc" }));
        let users = body["users"].as_array().unwrap();
        let ids: Vec<_> = users.iter().map(|u| u["id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["u1", "u2", "sa"]);
        assert_eq!(users[0]["capabilities"], json!({ "canEdit": false, "canBlock": true }));
        assert_eq!(users[1]["capabilities"], json!({ "canEdit": false, "canBlock": false }));
        assert_eq!(users[0]["displayLabel"], "Anonymous");

        // same field again flips direction, and the session remembers it
        let (_, body) = call(&state, get(&state, "/api/v1/admin/users?sort=role", "u2")).await;
        assert_eq!(body["sort"]["direction"], "desc");
    }

    #[tokio::test]
    async fn super_admin_changes_role() {
        let (state, users) = setup();
        let req = send_json(&state, "PUT", "/api/v1/admin/users/u1/role", "sa", json!({ "role": "admin" }));
        let (status, body) = call(&state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(users.writes(), [Write::Role("u1".into(), Role::Admin)]);

        let dir = state.directories.for_staff("sa").await.unwrap();
        assert_eq!(dir.record("u1").await.unwrap().role, Some(Role::Admin));
    }

    #[tokio::test]
    async fn admin_role_change_reports_notice() {
        let (state, users) = setup();
        let req = send_json(&state, "PUT", "/api/v1/admin/users/u1/role", "u2", json!({ "role": "admin" }));
        let (status, body) = call(&state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["notices"][0]["kind"], "permission_denied");
        assert!(users.writes().is_empty());
    }

    #[tokio::test]
    async fn admin_blocks_client() {
        let (state, users) = setup();
        let req = send_json(&state, "POST", "/api/v1/admin/users/u1/block", "u2", json!({ "isBlocked": false }));
        let (_, body) = call(&state, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(users.writes(), [Write::Blocked("u1".into(), true)]);

        let req = send_json(&state, "POST", "/api/v1/admin/users/u2/block", "u2", json!({ "isBlocked": false }));
        let (_, body) = call(&state, req).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["notices"][0]["kind"], "self_action_denied");
    }

    #[tokio::test]
    async fn demoted_admin_is_refused_on_next_request() {
        let (state, users) = setup();
        let (status, _) = call(&state, get(&state, "/api/v1/admin/users", "u2")).await;
        assert_eq!(status, StatusCode::OK);

        let req = send_json(&state, "PUT", "/api/v1/admin/users/u2/role", "sa", json!({ "role": "client" }));
        let (_, body) = call(&state, req).await;
        assert_eq!(body["success"], true);

        let req = send_json(&state, "POST", "/api/v1/admin/users/u1/block", "u2", json!({ "isBlocked": false }));
        let (status, _) = call(&state, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(!users.snapshot("u1").unwrap().is_blocked);
        assert_eq!(state.directories.active_count().await, 1);
    }

    #[tokio::test]
    async fn promoted_client_is_let_in() {
        let (state, _) = setup();
        let (status, _) = call(&state, get(&state, "/api/v1/admin/users", "u1")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(state.directories.active_count().await, 0);

        let req = send_json(&state, "PUT", "/api/v1/admin/users/u1/role", "sa", json!({ "role": "admin" }));
        call(&state, req).await;

        let (status, body) = call(&state, get(&state, "/api/v1/admin/users", "u1")).await;
        assert_eq!(status, StatusCode::OK);
        let me = body["users"].as_array().unwrap().iter().find(|u| u["id"] == "u1").unwrap();
        assert_eq!(me["capabilities"]["canBlock"], false);
    }

    #[tokio::test]
    async fn refresh_reloads_the_roster() {
        let (state, users) = setup();
        call(&state, get(&state, "/api/v1/admin/users", "sa")).await;
        users
            .create(&UserRecord::new("u9", "new@x.com", Some(Role::Client)))
            .await
            .unwrap();

        let (_, body) = call(&state, get(&state, "/api/v1/admin/users", "sa")).await;
        assert_eq!(body["users"].as_array().unwrap().len(), 3);

        let (_, body) = call(&state, get(&state, "/api/v1/admin/users?refresh=true", "sa")).await;
        let ids: Vec<_> = body["users"].as_array().unwrap().iter().map(|u| u["id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["u2", "u1", "u9", "sa"]);
    }

    #[tokio::test]
    async fn unknown_notice_is_not_found() {
        let (state, _) = setup();
        let req = Request::delete("/api/v1/admin/notices/99")
            .header("authorization", bearer(&state, "sa"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(&state, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
