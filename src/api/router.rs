//! API router assembly.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::endpoints;
use super::types::ApiContext;

/// Request body ceiling: a batch of uploads, each at most the per-file
/// limit enforced by intake.
const MAX_REQUEST_BYTES: usize = 256 * 1024 * 1024;

/// Build the API router.
///
/// Handlers use `State<ApiContext>` provided via `with_state`.
/// Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext) -> Router {
    Router::new()
        .route("/api/health", get(endpoints::health::check))
        .route("/api/proposals", get(endpoints::proposals::list))
        .route("/api/proposals/upload", post(endpoints::upload::upload))
        .route("/api/proposals/:id", patch(endpoints::proposals::update))
        .route(
            "/api/proposals/:id/process",
            post(endpoints::proposals::process),
        )
        .route(
            "/api/proposals/:id/retry",
            post(endpoints::proposals::retry),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::db::repository::get_proposal;
    use crate::db::sqlite::open_database;
    use crate::models::{ConfidenceLevel, ProposalStatus};
    use crate::pipeline::extraction::ExtractionModel;
    use crate::pipeline::testing::{sample_fields, workspace, StubModel};
    use crate::pipeline::{ExtractionQueue, Pipeline, QueueConfig};

    fn test_context(
        model: Arc<dyn ExtractionModel>,
    ) -> (tempfile::TempDir, ApiContext, Router) {
        let (dir, db_path, blob) = workspace();
        open_database(&db_path).unwrap();

        let pipeline = Arc::new(Pipeline::new(&db_path, blob.clone(), model));
        let queue = Arc::new(ExtractionQueue::start(pipeline.clone(), QueueConfig::default()));
        let ctx = ApiContext {
            db_path,
            blob,
            pipeline,
            queue,
        };
        let router = api_router(ctx.clone());
        (dir, ctx, router)
    }

    fn multipart_body(files: &[(&str, &str, &[u8])]) -> (String, Vec<u8>) {
        let boundary = "bidbox-test-boundary";
        let mut body = Vec::new();
        for (name, content_type, bytes) in files {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        (
            format!("multipart/form-data; boundary={boundary}"),
            body,
        )
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn upload_pdf(router: &Router, name: &str, content: &[u8]) -> serde_json::Value {
        let (content_type, body) = multipart_body(&[(name, "application/pdf", content)]);
        let request = Request::post("/api/proposals/upload")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        let (status, json) = send(router, request).await;
        assert_eq!(status, StatusCode::OK);
        json
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (_dir, _ctx, router) =
            test_context(Arc::new(StubModel::ok(sample_fields(ConfidenceLevel::High))));
        let (status, json) = send(
            &router,
            Request::get("/api/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn upload_then_duplicate() {
        let (_dir, _ctx, router) =
            test_context(Arc::new(StubModel::ok(sample_fields(ConfidenceLevel::High))));

        let first = upload_pdf(&router, "bid.pdf", b"%PDF-1.4 content").await;
        assert_eq!(first["results"][0]["status"], "SUCCESS");
        let id = first["results"][0]["id"].as_str().unwrap().to_string();

        let second = upload_pdf(&router, "bid-copy.pdf", b"%PDF-1.4 content").await;
        assert_eq!(second["results"][0]["status"], "DUPLICATE");
        assert_eq!(second["results"][0]["id"].as_str().unwrap(), id);
    }

    #[tokio::test]
    async fn upload_batch_isolates_bad_files() {
        let (_dir, _ctx, router) =
            test_context(Arc::new(StubModel::ok(sample_fields(ConfidenceLevel::High))));

        let (content_type, body) = multipart_body(&[
            ("notes.txt", "text/plain", b"plain text"),
            ("good.pdf", "application/pdf", b"%PDF-1.4 fine"),
        ]);
        let request = Request::post("/api/proposals/upload")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        let (status, json) = send(&router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["results"][0]["status"], "FAILED");
        assert_eq!(json["results"][1]["status"], "SUCCESS");
    }

    #[tokio::test]
    async fn empty_upload_is_bad_request() {
        let (_dir, _ctx, router) =
            test_context(Arc::new(StubModel::ok(sample_fields(ConfidenceLevel::High))));
        let (content_type, body) = multipart_body(&[]);
        let request = Request::post("/api/proposals/upload")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        let (status, _) = send(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_shows_pending_before_extraction() {
        let (_dir, _ctx, router) =
            test_context(Arc::new(StubModel::ok(sample_fields(ConfidenceLevel::High))));
        upload_pdf(&router, "bid.pdf", b"%PDF-1.4 pending").await;

        let (status, json) = send(
            &router,
            Request::get("/api/proposals").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["status"], "PENDING");
        assert_eq!(json[0]["overallConfidence"], "PENDING");
        assert_eq!(json[0]["reviewNeeded"], false);
    }

    #[tokio::test]
    async fn process_returns_flattened_data() {
        let (_dir, _ctx, router) =
            test_context(Arc::new(StubModel::ok(sample_fields(ConfidenceLevel::High))));
        let uploaded = upload_pdf(&router, "bid.pdf", b"%PDF-1.4 process me").await;
        let id = uploaded["results"][0]["id"].as_str().unwrap().to_string();

        let (status, json) = send(
            &router,
            Request::post(format!("/api/proposals/{id}/process"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["trade"], "Plumbing");
        assert_eq!(json["data"]["reviewNeeded"], false);
        assert_eq!(json["data"]["overallConfidence"], "HIGH");
        assert_eq!(json["data"]["fields"]["email"]["confidence"], "HIGH");

        // Dashboard now sees the completed proposal with derived view
        let (_, listed) = send(
            &router,
            Request::get("/api/proposals").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(listed[0]["status"], "COMPLETED");
        assert_eq!(listed[0]["overallConfidence"], "HIGH");
    }

    #[tokio::test]
    async fn process_unknown_proposal_reports_failure() {
        let (_dir, _ctx, router) =
            test_context(Arc::new(StubModel::ok(sample_fields(ConfidenceLevel::High))));
        let (status, json) = send(
            &router,
            Request::post(format!("/api/proposals/{}/process", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Proposal not found");
    }

    #[tokio::test]
    async fn failed_processing_supports_retry() {
        let (_dir, ctx, router) = test_context(Arc::new(StubModel::failing()));
        let uploaded = upload_pdf(&router, "bid.pdf", b"%PDF-1.4 will fail").await;
        let id = uploaded["results"][0]["id"].as_str().unwrap().to_string();
        let uuid = Uuid::parse_str(&id).unwrap();

        let (_, json) = send(
            &router,
            Request::post(format!("/api/proposals/{id}/process"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "AI processing failed");

        {
            let conn = open_database(&ctx.db_path).unwrap();
            let proposal = get_proposal(&conn, &uuid).unwrap().unwrap();
            assert_eq!(proposal.status, ProposalStatus::Failed);
        }

        let (status, json) = send(
            &router,
            Request::post(format!("/api/proposals/{id}/retry"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);

        let conn = open_database(&ctx.db_path).unwrap();
        let proposal = get_proposal(&conn, &uuid).unwrap().unwrap();
        assert_eq!(proposal.status, ProposalStatus::Pending);
    }

    #[tokio::test]
    async fn manual_update_overrides_field() {
        let (_dir, _ctx, router) =
            test_context(Arc::new(StubModel::ok(sample_fields(ConfidenceLevel::Low))));
        let uploaded = upload_pdf(&router, "bid.pdf", b"%PDF-1.4 override").await;
        let id = uploaded["results"][0]["id"].as_str().unwrap().to_string();

        send(
            &router,
            Request::post(format!("/api/proposals/{id}/process"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        let body = serde_json::json!({
            "fields": { "email": "corrected@example.test" },
            "approvalStatus": "APPROVED"
        });
        let (status, json) = send(
            &router,
            Request::patch(format!("/api/proposals/{id}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);

        let (_, listed) = send(
            &router,
            Request::get("/api/proposals?approval=APPROVED")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["email"], "corrected@example.test");
        assert_eq!(listed[0]["fields"]["email"]["confidence"], "HIGH");
        assert_eq!(listed[0]["approvalStatus"], "APPROVED");
    }

    #[tokio::test]
    async fn manual_update_unknown_field_rejected() {
        let (_dir, _ctx, router) =
            test_context(Arc::new(StubModel::ok(sample_fields(ConfidenceLevel::High))));
        let uploaded = upload_pdf(&router, "bid.pdf", b"%PDF-1.4 fields").await;
        let id = uploaded["results"][0]["id"].as_str().unwrap();

        let body = serde_json::json!({ "fields": { "faxNumber": "555" } });
        let (status, _) = send(
            &router,
            Request::patch(format!("/api/proposals/{id}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn retry_unknown_proposal_is_404() {
        let (_dir, _ctx, router) =
            test_context(Arc::new(StubModel::ok(sample_fields(ConfidenceLevel::High))));
        let (status, _) = send(
            &router,
            Request::post(format!("/api/proposals/{}/retry", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
