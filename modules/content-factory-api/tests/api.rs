use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use content_factory_api::{router, AppState};
use content_factory_common::{
    ContentStatus, FileConfig, NewCarousel, NewCarouselPlan, NewContentSource, PlanStatus, Platform,
    RunKind, RunStatus, Theme,
};
use content_factory_pipeline::testing::{post, MockAnalyzer, MockScraper, TestPipeline};
use content_factory_pipeline::{BlobStorage, PostKind, RunQueue};
use content_factory_store::ContentStore;

fn app(t: &TestPipeline) -> Router {
    let deps = t.deps();
    let queue = RunQueue::new(t.store.clone(), 16);
    router(Arc::new(AppState { deps, queue }))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(b) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(b.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn seed(t: &TestPipeline, n: u32, caption: &str) -> i64 {
    t.store
        .insert_content_if_new(NewContentSource {
            url: format!("https://www.instagram.com/reel/{n}/"),
            platform: Platform::Instagram,
            caption: Some(caption.into()),
            metadata: json!({"likes": n}),
        })
        .await
        .unwrap();
    t.store
        .list_content(&Default::default())
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.url.ends_with(&format!("/reel/{n}/")))
        .unwrap()
        .id
}

#[tokio::test]
async fn health_reports_service() {
    let t = TestPipeline::new();
    let (status, body) = call(&app(&t), Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "service": "Content Factory API"}));
}

#[tokio::test]
async fn accounts_can_be_created_listed_and_toggled() {
    let t = TestPipeline::new();
    let app = app(&t);

    let (status, created) = call(
        &app,
        Method::POST,
        "/api/accounts",
        Some(json!({"platform": "instagram", "username": "@wb_guru", "followers": 1200})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["username"], "wb_guru");
    assert_eq!(created["is_active"], true);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/accounts",
        Some(json!({"platform": "instagram", "username": "wb_guru"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/accounts",
        Some(json!({"platform": "instagram", "username": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = created["id"].as_i64().unwrap();
    let (status, updated) = call(
        &app,
        Method::PATCH,
        &format!("/api/accounts/{id}"),
        Some(json!({"is_active": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["is_active"], false);

    let (_, listed) = call(&app, Method::GET, "/api/accounts", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = call(
        &app,
        Method::PATCH,
        "/api/accounts/999",
        Some(json!({"is_active": true})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sources_are_classified() {
    let t = TestPipeline::new();
    let app = app(&t);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/sources",
        Some(json!({"url": "instagram.com/wb_guru/"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["kind"], "account");
    assert_eq!(body["username"], "wb_guru");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/sources",
        Some(json!({"url": "https://youtu.be/abc"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["kind"], "content");
    assert_eq!(body["platform"], "youtube");

    let (status, body) = call(&app, Method::POST, "/api/sources", Some(json!({"url": " "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("URL"));

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/sources",
        Some(json!({"url": "ftp://files.example.com/x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn content_is_filtered_and_archived() {
    let t = TestPipeline::new();
    let a = seed(&t, 1, "Как выйти в топ WB").await;
    let b = seed(&t, 2, "Рецепт пирога").await;
    t.store.record_score(a, 80.0).await.unwrap();
    let app = app(&t);

    let (status, body) = call(&app, Method::GET, "/api/content?status=scored", None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], a);

    let (_, body) = call(&app, Method::GET, "/api/content?search=%D1%82%D0%BE%D0%BF", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = call(&app, Method::GET, "/api/content?status=bogus", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, Method::GET, &format!("/api/content/{b}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");

    let (status, body) = call(&app, Method::GET, "/api/content/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, body) = call(&app, Method::POST, &format!("/api/content/{b}/archive"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "archived");

    let (status, _) = call(&app, Method::POST, &format!("/api/content/{b}/archive"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn approving_an_idea_queues_generation() {
    let t = TestPipeline::new();
    let scored = seed(&t, 1, "idea").await;
    let archived = seed(&t, 2, "old").await;
    t.store.record_score(scored, 75.0).await.unwrap();
    t.store
        .set_content_status(archived, ContentStatus::Archived)
        .await
        .unwrap();
    let app = app(&t);

    let (_, ideas) = call(&app, Method::GET, "/api/ideas", None).await;
    assert_eq!(ideas.as_array().unwrap().len(), 1);

    let (status, body) = call(&app, Method::POST, &format!("/api/ideas/{scored}/approve"), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "accepted");

    let run_id = body["run_id"].as_i64().unwrap();
    let run = t.store.get_run(run_id).await.unwrap().unwrap();
    assert_eq!(run.kind, RunKind::Generation);
    assert_eq!(run.status, RunStatus::Queued);
    assert_eq!(run.config, json!({"content_source_id": scored}));
    assert_eq!(
        t.store.get_content(scored).await.unwrap().unwrap().status,
        ContentStatus::Approved
    );

    let (status, _) = call(&app, Method::POST, &format!("/api/ideas/{archived}/approve"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(&app, Method::POST, "/api/ideas/404/approve", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn runs_are_created_and_polled() {
    let t = TestPipeline::new();
    let app = app(&t);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/runs",
        Some(json!({"kind": "discovery", "config": {"queries": ["wb"]}})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "queued");
    let run_id = body["run_id"].as_i64().unwrap();

    let (status, run) = call(&app, Method::GET, &format!("/api/runs/{run_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["kind"], "discovery");
    assert_eq!(run["config"]["queries"][0], "wb");

    call(&app, Method::POST, "/api/runs", Some(json!({"kind": "scoring"}))).await;
    let (_, runs) = call(&app, Method::GET, "/api/runs?kind=scoring", None).await;
    assert_eq!(runs.as_array().unwrap().len(), 1);

    let (status, _) = call(&app, Method::POST, "/api/runs", Some(json!({"kind": "publish"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/runs",
        Some(json!({"kind": "harvest", "config": [1, 2]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, Method::GET, "/api/runs/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn hashtag_parse_uses_scraper() {
    let scraper = MockScraper::new().on_hashtag(
        "wildberries",
        vec![
            post("https://www.instagram.com/reel/1/", PostKind::Reel, 5),
            post("https://www.instagram.com/p/2/", PostKind::Photo, 5),
        ],
    );
    let t = TestPipeline::new().with_scraper(scraper);
    let (status, body) = call(&app(&t), Method::POST, "/api/parse/instagram", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "success", "parsed": 1, "saved": 1, "hashtag": "wildberries"})
    );
}

#[tokio::test]
async fn scraping_without_token_is_unavailable() {
    let t = TestPipeline::new();
    let (status, body) = call(&app(&t), Method::POST, "/api/parse/instagram?hashtag=wb", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "APIFY_API_TOKEN is not configured");
}

#[tokio::test]
async fn analyze_scores_pending_or_reports_nothing_to_do() {
    let t = TestPipeline::new().with_analyzer(MockAnalyzer::new().default_score(64.0));
    let app = app(&t);

    let (status, body) = call(&app, Method::POST, "/api/analyze", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "message": "No pending items to analyze"}));

    seed(&t, 1, "a").await;
    seed(&t, 2, "b").await;
    let (_, body) = call(&app, Method::POST, "/api/analyze", None).await;
    assert_eq!(body, json!({"status": "success", "analyzed": 2}));

    let (_, stats) = call(&app, Method::GET, "/api/stats", None).await;
    assert_eq!(stats["content_total"], 2);
    assert_eq!(stats["content_by_status"]["scored"], 2);
    assert_eq!(stats["average_score"], 64.0);
}

#[tokio::test]
async fn carousel_download_serves_zip() {
    let t = TestPipeline::new();
    let plan = t
        .store
        .create_plan(NewCarouselPlan {
            source_id: None,
            title: "Скидки".into(),
            description: None,
            structure: json!({"title": "Скидки", "slides": []}),
            status: PlanStatus::Ready,
            theme: Theme::Dark,
        })
        .await
        .unwrap();
    let key = format!("carousels/carousel_{}.zip", plan.id);
    t.storage.put(&key, b"PK\x03\x04zip".to_vec()).await.unwrap();
    let carousel = t
        .store
        .create_carousel(NewCarousel {
            plan_id: plan.id,
            bundle_id: uuid::Uuid::new_v4(),
            zip_object_key: key,
            thumbnail_object_key: None,
            slide_count: 1,
        })
        .await
        .unwrap();
    let app = app(&t);

    let (status, listed) = call(&app, Method::GET, "/api/carousels", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed[0]["plan_title"], "Скидки");

    let (status, one) = call(&app, Method::GET, &format!("/api/carousels/{}", carousel.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["slide_count"], 1);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/carousels/{}/download", carousel.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        resp.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"carousel_{}.zip\"", carousel.id).as_str()
    );
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"PK\x03\x04zip");

    let (status, _) = call(&app, Method::GET, "/api/carousels/999/download", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mistyped_run_config_is_rejected_before_queueing() {
    let t = TestPipeline::new();
    let app = app(&t);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/runs",
        Some(json!({"kind": "scoring", "config": {"batch_size": "lots"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid scoring config"));
    assert!(t.store.list_runs(None, 50).await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_input_gets_json_errors() {
    let t = TestPipeline::new();
    let app = app(&t);

    let cases = [
        (Method::POST, "/api/runs", Some(json!({"kind": 5}))),
        (Method::GET, "/api/content/abc", None),
        (Method::GET, "/api/content?min_score=abc", None),
        (
            Method::POST,
            "/api/accounts",
            Some(json!({"platform": "myspace", "username": "wb_guru"})),
        ),
    ];
    for (method, uri, body) in cases {
        let (status, body) = call(&app, method, uri, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(
            body["error"].as_str().is_some_and(|e| !e.is_empty()),
            "{uri}: {body}"
        );
    }
}

#[tokio::test]
async fn source_urls_without_scheme_dedup_with_full_urls() {
    let t = TestPipeline::new();
    let app = app(&t);

    let (status, first) =
        call(&app, Method::POST, "/api/sources", Some(json!({"url": "vc.ru/x"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["url"], "https://vc.ru/x");

    let (status, second) = call(
        &app,
        Method::POST,
        "/api/sources",
        Some(json!({"url": "https://vc.ru/x"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["created"], false);

    let stored = t.store.list_content(&Default::default()).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].url, "https://vc.ru/x");
}

#[tokio::test]
async fn cors_allows_only_listed_origins() {
    let mut config = FileConfig::default();
    config.server.allowed_origins = vec!["http://localhost:5173".into(), "bad\norigin".into()];
    let t = TestPipeline::new().with_config(config);
    let app = app(&t);

    let request = |origin: &str| {
        Request::builder()
            .uri("/api/health")
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap()
    };

    let resp = app.clone().oneshot(request("http://localhost:5173")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );

    let resp = app.clone().oneshot(request("https://evil.example")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
