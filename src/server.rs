use crate::error::{StoreError, UploadError};
use crate::parser::parse_log;
use crate::store::RouteStore;
use crate::types::{to_feature_collection, RouteId, UploadReceipt};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn RouteStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn RouteStore>) -> Self {
        AppState { store }
    }
}

/// Errors surfaced at the HTTP boundary
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Bad Request: {0}")]
    BadRequest(&'static str),

    #[error("Document not found: {0}")]
    NotFound(RouteId),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(id),
            StoreError::InvalidId(id) => ApiError::NotFound(RouteId::new(id)),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Upload(UploadError::NoPayload) => "NoPayload",
            ApiError::Upload(UploadError::NoValidData { .. }) => "NoValidData",
            ApiError::Upload(UploadError::Internal(_)) | ApiError::Internal(_) => "InternalError",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::NotFound(_) => "NotFound",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Upload(UploadError::NoPayload)
            | ApiError::Upload(UploadError::NoValidData { .. })
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upload(UploadError::Internal(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{}", self);
        } else {
            log::warn!("{}", self);
        }

        let body = serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct UploadRequest {
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RouteQuery {
    #[serde(rename = "docId")]
    doc_id: Option<String>,
}

/// Route service with CORS restricted to `allowed_origin`
pub fn router(store: Arc<dyn RouteStore>, allowed_origin: &str) -> anyhow::Result<Router> {
    let origin = HeaderValue::from_str(allowed_origin)?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Ok(Router::new()
        .route("/uploadData", post(upload_handler))
        .route("/getRouteData", get(route_handler))
        .route("/getAllDocumentIds", get(list_handler))
        .layer(cors)
        .with_state(AppState::new(store)))
}

pub async fn serve(app: Router, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("Route service listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}

async fn upload_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<UploadReceipt>, ApiError> {
    let data = serde_json::from_slice::<UploadRequest>(&body)
        .ok()
        .and_then(|request| request.data)
        .filter(|data| !data.is_empty())
        .ok_or(UploadError::NoPayload)?;

    let batch = parse_log(&data)?;
    let id = state
        .store
        .create_route(&batch.points)
        .map_err(UploadError::from)?;

    log::info!("Data uploaded: route {} with {} point(s)", id, batch.points.len());
    Ok(Json(UploadReceipt {
        id,
        stored: batch.points.len(),
        discarded: batch.discarded,
    }))
}

async fn route_handler(
    State(state): State<AppState>,
    Query(query): Query<RouteQuery>,
) -> Result<Response, ApiError> {
    let id = query
        .doc_id
        .filter(|id| !id.is_empty())
        .map(RouteId::new)
        .ok_or(ApiError::BadRequest("No document ID provided"))?;

    let points = state.store.get_route(&id)?;
    log::debug!("Serving route {} ({} point(s))", id, points.len());
    Ok(Json(to_feature_collection(&points)).into_response())
}

async fn list_handler(State(state): State<AppState>) -> Result<Json<Vec<RouteId>>, ApiError> {
    Ok(Json(state.store.list_route_ids()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRouteStore;
    use crate::types::{points_from_features, RoutePoint};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use geojson::FeatureCollection;
    use serde_json::Value;
    use tower::ServiceExt;

    const ORIGIN: &str = "https://slopemap-13158.web.app";

    fn app() -> (Router, Arc<MemoryRouteStore>) {
        let store = Arc::new(MemoryRouteStore::new());
        let app = router(store.clone(), ORIGIN).unwrap();
        (app, store)
    }

    fn upload_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/uploadData")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_upload_stores_valid_lines() {
        let (app, store) = app();
        let body = serde_json::json!({
            "data": "garbage\n{\"latitude\":1,\"longitude\":2,\"pitch\":-3}\n"
        });

        let response = app.oneshot(upload_request(&body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let receipt: UploadReceipt = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(receipt.stored, 1);
        assert_eq!(receipt.discarded, 1);
        assert_eq!(
            store.get_route(&receipt.id).unwrap(),
            vec![RoutePoint::new(1.0, 2.0, 3.0)]
        );
    }

    #[tokio::test]
    async fn test_upload_without_payload() {
        for body in ["", "{}", "{\"data\":\"\"}", "not json"] {
            let (app, _) = app();
            let response = app.oneshot(upload_request(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await["error"], "NoPayload");
        }
    }

    #[tokio::test]
    async fn test_upload_without_valid_lines() {
        let (app, store) = app();
        let response = app
            .oneshot(upload_request(r#"{"data":"garbage\nnotjson"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "NoValidData");
        assert!(store.list_route_ids().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_get() {
        let (app, _) = app();
        let request = Request::builder()
            .uri("/uploadData")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_fetch_route_as_feature_collection() {
        let (app, store) = app();
        let points = vec![RoutePoint::new(47.0, 8.0, 0.5), RoutePoint::new(47.1, 8.1, 11.0)];
        let id = store.create_route(&points).unwrap();

        let request = Request::builder()
            .uri(format!("/getRouteData?docId={}", id))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["geometry"]["coordinates"], serde_json::json!([8.0, 47.0]));

        let collection: FeatureCollection = serde_json::from_value(json).unwrap();
        assert_eq!(points_from_features(&collection), points);
    }

    #[tokio::test]
    async fn test_fetch_route_errors() {
        let (app, _) = app();
        let missing_id = Request::builder()
            .uri("/getRouteData")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(missing_id).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let unknown = Request::builder()
            .uri("/getRouteData?docId=nope")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(unknown).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "NotFound");
    }

    #[tokio::test]
    async fn test_list_route_ids() {
        let (app, store) = app();
        let first = store.create_route(&[RoutePoint::new(1.0, 1.0, 1.0)]).unwrap();
        let second = store.create_route(&[RoutePoint::new(1.0, 1.0, 1.0)]).unwrap();

        let request = Request::builder()
            .uri("/getAllDocumentIds")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        let ids: Vec<RouteId> = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test]
    async fn test_cors_allows_only_configured_origin() {
        let (app, _) = app();
        let allowed = Request::builder()
            .uri("/getAllDocumentIds")
            .header("origin", ORIGIN)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(allowed).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            ORIGIN
        );

        let foreign = Request::builder()
            .uri("/getAllDocumentIds")
            .header("origin", "https://elsewhere.example")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(foreign).await.unwrap();
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[test]
    fn test_invalid_origin_is_rejected() {
        let store = Arc::new(MemoryRouteStore::new());
        assert!(router(store, "bad\norigin").is_err());
    }
}
