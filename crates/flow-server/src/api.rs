//! HTTP routes
//!
//! `/api/process-flows` stores whole flow documents; `/api/business-flows`
//! serves the read-only business-flow tree used for default naming.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use process_designer::{
    find_business_flow, placeable_templates, BusinessFlowDirectory, DesignerConfig, FlowDocument,
    PaletteTemplate, SharedFlowStore,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use crate::error::ApiError;

/// Shared state for Axum handlers
#[derive(Clone)]
pub struct AppState {
    pub store: SharedFlowStore,
    pub business_flows: BusinessFlowDirectory,
    pub designer: Arc<DesignerConfig>,
}

impl AppState {
    pub fn new(
        store: SharedFlowStore,
        business_flows: BusinessFlowDirectory,
        designer: DesignerConfig,
    ) -> Self {
        Self {
            store,
            business_flows,
            designer: Arc::new(designer),
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/process-flows",
            get(get_flows_handler)
                .post(create_flow_handler)
                .put(update_flow_handler)
                .delete(delete_flow_handler),
        )
        .route("/api/process-flows/:id/publish", post(publish_flow_handler))
        .route("/api/business-flows", get(business_flows_handler))
        .route("/api/designer-config", get(designer_config_handler))
        .route("/api/palette", get(palette_handler))
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowQuery {
    pub flow_id: Option<String>,
    pub business_flow_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BusinessFlowQuery {
    pub id: Option<String>,
}

fn document_from(payload: Result<Json<FlowDocument>, JsonRejection>) -> Result<FlowDocument, ApiError> {
    payload
        .map(|Json(document)| document)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

// --- Axum Handlers ---

pub async fn health_handler() -> &'static str {
    "ok"
}

/// One flow by `flowId`, the flows of a business flow, or every flow
pub async fn get_flows_handler(
    State(state): State<AppState>,
    Query(query): Query<FlowQuery>,
) -> Result<Response, ApiError> {
    let store = state.store.read().await;

    if let Some(flow_id) = query.flow_id {
        let flow = store
            .get(&flow_id)
            .ok_or_else(|| ApiError::NotFound("Process flow not found".into()))?;
        return Ok(Json(flow.clone()).into_response());
    }

    let flows = match query.business_flow_id {
        Some(business_flow_id) => store.by_business_flow(&business_flow_id),
        None => store.list(),
    };
    Ok(Json(serde_json::json!({ "flows": flows })).into_response())
}

pub async fn create_flow_handler(
    State(state): State<AppState>,
    payload: Result<Json<FlowDocument>, JsonRejection>,
) -> Result<(StatusCode, Json<FlowDocument>), ApiError> {
    let document = document_from(payload)?;
    let created = state.store.write().await.create(document).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_flow_handler(
    State(state): State<AppState>,
    payload: Result<Json<FlowDocument>, JsonRejection>,
) -> Result<Json<FlowDocument>, ApiError> {
    let document = document_from(payload)?;
    let updated = state.store.write().await.update(document).await?;
    Ok(Json(updated))
}

pub async fn delete_flow_handler(
    State(state): State<AppState>,
    Query(query): Query<FlowQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let flow_id = query
        .flow_id
        .ok_or_else(|| ApiError::BadRequest("Missing required parameter (flowId)".into()))?;

    let removed = state.store.write().await.remove(&flow_id).await?;
    if removed.is_none() {
        return Err(ApiError::NotFound("Process flow not found".into()));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn publish_flow_handler(
    State(state): State<AppState>,
    Path(flow_id): Path<String>,
) -> Result<Json<FlowDocument>, ApiError> {
    let published = state.store.write().await.publish(&flow_id).await?;
    Ok(Json(published))
}

/// One business flow (searched through the whole tree) or all of them
pub async fn business_flows_handler(
    State(state): State<AppState>,
    Query(query): Query<BusinessFlowQuery>,
) -> Result<Response, ApiError> {
    let flows = state.business_flows.load().await?;

    if let Some(id) = query.id {
        let flow = find_business_flow(&flows, &id)
            .ok_or_else(|| ApiError::NotFound("Business flow not found".into()))?;
        return Ok(Json(flow.clone()).into_response());
    }
    Ok(Json(serde_json::json!({ "businessFlows": flows })).into_response())
}

pub async fn designer_config_handler(State(state): State<AppState>) -> Json<DesignerConfig> {
    Json(state.designer.as_ref().clone())
}

/// Templates the palette offers for free placement
pub async fn palette_handler() -> Json<Vec<&'static PaletteTemplate>> {
    Json(placeable_templates().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use process_designer::{
        FlowMetadata, FlowStatus, FlowStore, IdGenerator, ProcessGraph, ProcessType,
    };
    use tempfile::TempDir;

    fn state(dir: &TempDir) -> AppState {
        AppState::new(
            FlowStore::new().into_shared(),
            BusinessFlowDirectory::in_dir(dir.path()),
            DesignerConfig::default(),
        )
    }

    fn document(name: &str, business_flow_id: Option<&str>) -> FlowDocument {
        let mut metadata = FlowMetadata::new(name, ProcessType::Approval);
        metadata.business_flow_id = business_flow_id.map(String::from);
        FlowDocument::new(ProcessGraph::initial(&IdGenerator::new()), metadata)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create(state: &AppState, name: &str, business_flow_id: Option<&str>) -> FlowDocument {
        let (status, Json(created)) = create_flow_handler(
            State(state.clone()),
            Ok(Json(document(name, business_flow_id))),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        created
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(health_handler().await, "ok");
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        let created = create(&state, "采购", Some("bf_1")).await;
        assert!(created.id().starts_with("flow_"));
        assert!(created.metadata.created_at.is_some());

        let response = get_flows_handler(
            State(state.clone()),
            Query(FlowQuery {
                flow_id: Some(created.id().to_string()),
                business_flow_id: None,
            }),
        )
        .await
        .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["metadata"]["name"], "采购");

        let missing = get_flows_handler(
            State(state),
            Query(FlowQuery {
                flow_id: Some("flow_0".into()),
                business_flow_id: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_filters_by_business_flow() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        create(&state, "a", Some("bf_1")).await;
        create(&state, "b", Some("bf_2")).await;

        let all = body_json(
            get_flows_handler(State(state.clone()), Query(FlowQuery::default()))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(all["flows"].as_array().unwrap().len(), 2);

        let filtered = body_json(
            get_flows_handler(
                State(state),
                Query(FlowQuery {
                    flow_id: None,
                    business_flow_id: Some("bf_2".into()),
                }),
            )
            .await
            .unwrap(),
        )
        .await;
        let flows = filtered["flows"].as_array().unwrap();
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0]["metadata"]["name"], "b");
    }

    #[tokio::test]
    async fn test_create_rejects_missing_name() {
        let dir = TempDir::new().unwrap();
        let error = create_flow_handler(State(state(&dir)), Ok(Json(document("", None))))
            .await
            .unwrap_err();
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_requires_known_id() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);

        let error = update_flow_handler(State(state.clone()), Ok(Json(document("x", None))))
            .await
            .unwrap_err();
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);

        let mut unknown = document("x", None);
        unknown.metadata.id = "flow_404".into();
        let error = update_flow_handler(State(state.clone()), Ok(Json(unknown)))
            .await
            .unwrap_err();
        assert_eq!(error.status(), StatusCode::NOT_FOUND);

        let mut created = create(&state, "v1", None).await;
        created.metadata.name = "v2".into();
        let Json(updated) = update_flow_handler(State(state), Ok(Json(created)))
            .await
            .unwrap();
        assert_eq!(updated.metadata.name, "v2");
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        let created = create(&state, "gone", None).await;

        let missing_param = delete_flow_handler(State(state.clone()), Query(FlowQuery::default()))
            .await
            .unwrap_err();
        assert_eq!(missing_param.status(), StatusCode::BAD_REQUEST);

        let query = || FlowQuery {
            flow_id: Some(created.id().to_string()),
            business_flow_id: None,
        };
        let Json(body) = delete_flow_handler(State(state.clone()), Query(query()))
            .await
            .unwrap();
        assert_eq!(body["success"], true);

        let again = delete_flow_handler(State(state), Query(query()))
            .await
            .unwrap_err();
        assert_eq!(again.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_path_like_ids_are_rejected() {
        let dir = TempDir::new().unwrap();
        let flows_dir = dir.path().join("process-flows");
        std::fs::create_dir_all(&flows_dir).unwrap();
        let business_flows = dir.path().join("businessFlow.json");
        std::fs::write(&business_flows, "[]").unwrap();

        let state = AppState::new(
            FlowStore::with_persistence(&flows_dir).into_shared(),
            BusinessFlowDirectory::in_dir(dir.path()),
            DesignerConfig::default(),
        );

        let mut escaping = document("覆盖", None);
        escaping.metadata.id = "../businessFlow".into();
        let error = create_flow_handler(State(state.clone()), Ok(Json(escaping)))
            .await
            .unwrap_err();
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(std::fs::read_to_string(&business_flows).unwrap(), "[]");

        let error = delete_flow_handler(
            State(state),
            Query(FlowQuery {
                flow_id: Some("../businessFlow".into()),
                business_flow_id: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert!(business_flows.exists());
    }

    #[tokio::test]
    async fn test_publish() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        let created = create(&state, "审批", None).await;

        let Json(published) = publish_flow_handler(State(state.clone()), Path(created.id().to_string()))
            .await
            .unwrap();
        assert_eq!(published.metadata.status, FlowStatus::Active);

        let error = publish_flow_handler(State(state), Path("flow_0".into()))
            .await
            .unwrap_err();
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_business_flows() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);

        let empty = body_json(
            business_flows_handler(State(state.clone()), Query(BusinessFlowQuery::default()))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(empty["businessFlows"], serde_json::json!([]));

        std::fs::write(
            dir.path().join("businessFlow.json"),
            r#"[{"id": "bf_1", "name": "销售", "children": [{"id": "bf_2", "name": "签约"}]}]"#,
        )
        .unwrap();

        let child = body_json(
            business_flows_handler(
                State(state.clone()),
                Query(BusinessFlowQuery {
                    id: Some("bf_2".into()),
                }),
            )
            .await
            .unwrap(),
        )
        .await;
        assert_eq!(child["name"], "签约");

        let missing = business_flows_handler(
            State(state),
            Query(BusinessFlowQuery {
                id: Some("bf_9".into()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_designer_config() {
        let dir = TempDir::new().unwrap();
        let Json(config) = designer_config_handler(State(state(&dir))).await;
        assert_eq!(config.layout.node_width, 180.0);
    }

    #[tokio::test]
    async fn test_palette_lists_placeable_templates() {
        let Json(templates) = palette_handler().await;
        let json = serde_json::to_value(&templates).unwrap();
        let ids: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["projectNode", "approvalNode"]);
        assert_eq!(json[1]["label"], "审批节点");
        assert!(json[0].get("role").is_none());
    }

    #[test]
    fn test_router_builds() {
        let dir = TempDir::new().unwrap();
        let _router = router(state(&dir));
    }
}
