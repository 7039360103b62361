use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::{service::GatewayService, types::AdmitResponse};
use crate::room::types::RoomQuery;
use crate::shared::{AppError, AppState};

/// HTTP handler for the admission gate
///
/// POST /room/join?roomId=<id>
/// The presented token travels in the Authorization Bearer header, the
/// automated-agent signal in User-Agent. On a new admission the response
/// carries the token the caller must re-present from then on.
#[instrument(name = "join_room", skip(state, headers))]
pub async fn join_room(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
    headers: HeaderMap,
) -> Result<Json<AdmitResponse>, AppError> {
    let presented = bearer_token(&headers);
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    let service = GatewayService::new(Arc::clone(&state.store));
    let admission = service
        .admit(&query.room_id, presented.as_deref(), user_agent)
        .await?;

    Ok(Json(AdmitResponse::from(admission)))
}

/// Extract the bearer token from the Authorization header, if any
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::types::AdmissionStatus;
    use crate::shared::test_utils::AppStateBuilder;
    use crate::store::models::RoomModel;
    use crate::store::{InMemoryRoomStore, RoomStore};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use std::time::Duration;
    use tower::ServiceExt; // for `oneshot`

    const BROWSER_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

    async fn app_with_room() -> (Router, String) {
        let store = Arc::new(InMemoryRoomStore::new());
        let room = RoomModel::new();
        store
            .create_room(&room, Duration::from_secs(300))
            .await
            .unwrap();

        let app_state = AppStateBuilder::new().with_store(store).build();
        let app = Router::new()
            .route("/room/join", axum::routing::post(join_room))
            .with_state(app_state);

        (app, room.id)
    }

    fn join_request(room_id: &str, token: Option<&str>, user_agent: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/room/join?roomId={}", room_id))
            .header("user-agent", user_agent);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn response_body(response: axum::response::Response) -> AdmitResponse {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_join_handler_issues_token() {
        let (app, room_id) = app_with_room().await;

        let response = app
            .oneshot(join_request(&room_id, None, BROWSER_UA))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let admit = response_body(response).await;
        assert_eq!(admit.status, AdmissionStatus::NewToken);
        assert!(admit.token.is_some());
    }

    #[tokio::test]
    async fn test_join_handler_reentry() {
        let (app, room_id) = app_with_room().await;

        let first = app
            .clone()
            .oneshot(join_request(&room_id, None, BROWSER_UA))
            .await
            .unwrap();
        let token = response_body(first).await.token.unwrap();

        let second = app
            .oneshot(join_request(&room_id, Some(&token), BROWSER_UA))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);

        let admit = response_body(second).await;
        assert_eq!(admit.status, AdmissionStatus::Existing);
        assert!(admit.token.is_none());
    }

    #[tokio::test]
    async fn test_join_handler_room_not_found() {
        let (app, _room_id) = app_with_room().await;

        let response = app
            .oneshot(join_request("nonexistent-room", None, BROWSER_UA))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_join_handler_room_full() {
        let (app, room_id) = app_with_room().await;

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(join_request(&room_id, None, BROWSER_UA))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(join_request(&room_id, None, BROWSER_UA))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_join_handler_agent_bypass() {
        let (app, room_id) = app_with_room().await;

        let response = app
            .oneshot(join_request(&room_id, None, "WhatsApp/2.23.20.0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let admit = response_body(response).await;
        assert_eq!(admit.status, AdmissionStatus::AgentBypass);
        assert!(admit.token.is_none());
    }

    #[tokio::test]
    async fn test_join_handler_missing_room_id() {
        let (app, _room_id) = app_with_room().await;

        let request = Request::builder()
            .method("POST")
            .uri("/room/join")
            .header("user-agent", BROWSER_UA)
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
