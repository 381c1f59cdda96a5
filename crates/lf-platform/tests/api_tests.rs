//! Platform API Integration Tests
//!
//! HTTP-level tests for the checkout flow, collaborator hooks, and error
//! mapping, run against an in-memory store.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use lf_entitlement::db;
use lf_entitlement::domain::{Chapter, Course};
use lf_entitlement::repository::{
    AccountRepository, ChapterAccessRepository, ChapterRepository, CourseRepository,
    LedgerRepository,
};
use lf_entitlement::{
    ChapterAccessCascade, EntitlementResolver, GrantEngine, IdentityLinker,
    ReconciliationScheduler, SeriesStatusService,
};
use lf_platform::api::{
    accounts_router, checkout_router, courses_router, ledger_router, reconciliation_router,
    AccountsState, CoursesState, LedgerState, ReconciliationState,
};

struct TestApp {
    app: Router,
    course_repo: Arc<CourseRepository>,
    chapter_repo: Arc<ChapterRepository>,
}

async fn test_app() -> TestApp {
    let pool = db::connect_in_memory().await.unwrap();
    db::init_schema(&pool).await.unwrap();

    let course_repo = Arc::new(CourseRepository::new(pool.clone()));
    let chapter_repo = Arc::new(ChapterRepository::new(pool.clone()));
    let account_repo = Arc::new(AccountRepository::new(pool.clone()));
    let ledger_repo = Arc::new(LedgerRepository::new(pool.clone()));
    let access_repo = Arc::new(ChapterAccessRepository::new(pool.clone()));

    let cascade = ChapterAccessCascade::new(
        IdentityLinker::new(account_repo.clone()),
        chapter_repo.clone(),
        access_repo.clone(),
    );
    let scheduler = Arc::new(ReconciliationScheduler::new(
        EntitlementResolver::new(course_repo.clone(), ledger_repo.clone()),
        GrantEngine::new(ledger_repo.clone()),
        cascade.clone(),
        course_repo.clone(),
        ledger_repo.clone(),
    ));

    let ledger_state = LedgerState {
        ledger_repo: ledger_repo.clone(),
        course_repo: course_repo.clone(),
        scheduler: scheduler.clone(),
    };
    let courses_state = CoursesState {
        course_repo: course_repo.clone(),
        chapter_repo: chapter_repo.clone(),
        scheduler: scheduler.clone(),
    };
    let accounts_state = AccountsState {
        account_repo,
        ledger_repo: ledger_repo.clone(),
        cascade,
    };
    let reconciliation_state = ReconciliationState {
        scheduler,
        status: SeriesStatusService::new(ledger_repo),
    };

    let app = Router::new()
        .nest("/api/checkout", checkout_router(ledger_state.clone()))
        .nest("/api/ledger", ledger_router(ledger_state))
        .nest("/api/courses", courses_router(courses_state))
        .nest("/api/accounts", accounts_router(accounts_state))
        .nest("/api/admin/reconciliation", reconciliation_router(reconciliation_state));

    TestApp { app, course_repo, chapter_repo }
}

async fn send_json(app: &Router, method: &str, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn send_get(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

mod checkout_tests {
    use super::*;

    #[tokio::test]
    async fn test_checkout_and_confirm_flow() {
        let harness = test_app().await;
        let course = Course::new("Paint Correction Part 1", 4900)
            .with_series("Paint Correction", 1)
            .with_published(true);
        harness.course_repo.insert(&course).await.unwrap();

        let (status, body) = send_json(
            &harness.app,
            "POST",
            "/api/checkout",
            serde_json::json!({
                "customerEmail": "jane@example.com",
                "courseId": course.id,
                "paymentMethod": "CARD"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "PENDING");
        let entry_id = body["id"].as_str().unwrap().to_string();

        // Same customer, same course: the pair constraint rejects it
        let (status, body) = send_json(
            &harness.app,
            "POST",
            "/api/checkout",
            serde_json::json!({
                "customerEmail": "jane@example.com",
                "courseId": course.id,
                "paymentMethod": "CARD"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "CONFLICT");

        let (status, body) = send_json(
            &harness.app,
            "POST",
            &format!("/api/ledger/{}/confirm", entry_id),
            serde_json::json!({}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "PAID");

        // Confirming twice violates the PENDING guard
        let (status, _) = send_json(
            &harness.app,
            "POST",
            &format!("/api/ledger/{}/confirm", entry_id),
            serde_json::json!({}),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_checkout_unknown_course() {
        let harness = test_app().await;
        let (status, body) = send_json(
            &harness.app,
            "POST",
            "/api/checkout",
            serde_json::json!({
                "customerEmail": "jane@example.com",
                "courseId": "missing",
                "paymentMethod": "CARD"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NOT_FOUND");
    }
}

mod course_tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_runs_backfill() {
        let harness = test_app().await;
        let part1 = Course::new("Detailing Basics Part 1", 4900)
            .with_series("Detailing Basics", 1)
            .with_published(true);
        harness.course_repo.insert(&part1).await.unwrap();

        // Existing holder of part 1
        let (status, body) = send_json(
            &harness.app,
            "POST",
            "/api/checkout",
            serde_json::json!({
                "customerEmail": "amy@example.com",
                "courseId": part1.id,
                "paymentMethod": "CARD"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let entry_id = body["id"].as_str().unwrap().to_string();
        let (status, _) = send_json(
            &harness.app,
            "POST",
            &format!("/api/ledger/{}/confirm", entry_id),
            serde_json::json!({}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // Publishing part 2 backfills amy without any action from her
        let (status, body) = send_json(
            &harness.app,
            "POST",
            "/api/courses",
            serde_json::json!({
                "title": "Detailing Basics Part 2",
                "priceCents": 4900,
                "seriesName": "Detailing Basics",
                "seriesPart": 2,
                "published": true
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let backfill = &body["backfill"];
        assert_eq!(backfill["customersProcessed"], 1);
        assert_eq!(backfill["grants"].as_array().unwrap().len(), 1);
        assert_eq!(backfill["grants"][0]["customerEmail"], "amy@example.com");
    }

    #[tokio::test]
    async fn test_series_course_requires_part() {
        let harness = test_app().await;
        let (status, body) = send_json(
            &harness.app,
            "POST",
            "/api/courses",
            serde_json::json!({
                "title": "Broken",
                "priceCents": 1000,
                "seriesName": "Some Series"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION");
    }
}

mod account_tests {
    use super::*;

    #[tokio::test]
    async fn test_account_creation_unlocks_purchases() {
        let harness = test_app().await;
        // Standalone course: the replayed cascade covers every PAID entry,
        // series-bound or not
        let course = Course::new("Interior Care Masterclass", 4900).with_published(true);
        harness.course_repo.insert(&course).await.unwrap();
        for position in 1..=3 {
            harness
                .chapter_repo
                .insert(&Chapter::new(&course.id, format!("Chapter {}", position), position))
                .await
                .unwrap();
        }

        // Guest buys and pays
        let (_, body) = send_json(
            &harness.app,
            "POST",
            "/api/checkout",
            serde_json::json!({
                "customerEmail": "guest@example.com",
                "courseId": course.id,
                "paymentMethod": "CARD"
            }),
        )
        .await;
        let entry_id = body["id"].as_str().unwrap().to_string();
        send_json(
            &harness.app,
            "POST",
            &format!("/api/ledger/{}/confirm", entry_id),
            serde_json::json!({}),
        )
        .await;

        let (status, body) = send_json(
            &harness.app,
            "POST",
            "/api/accounts",
            serde_json::json!({ "email": "guest@example.com", "displayName": "Guest" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["coursesProcessed"], 1);
        assert_eq!(body["chaptersUnlocked"], 3);
        assert!(body["unlockErrors"].as_array().unwrap().is_empty());

        // Duplicate account for the same email
        let (status, _) = send_json(
            &harness.app,
            "POST",
            "/api/accounts",
            serde_json::json!({ "email": "guest@example.com" }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}

mod admin_tests {
    use super::*;

    #[tokio::test]
    async fn test_repair_trigger_and_status() {
        let harness = test_app().await;
        let part1 = Course::new("Paint Correction Part 1", 4900)
            .with_series("Paint Correction", 1)
            .with_published(true);
        let part2 = Course::new("Paint Correction Part 2", 4900)
            .with_series("Paint Correction", 2)
            .with_published(true);
        harness.course_repo.insert(&part1).await.unwrap();
        harness.course_repo.insert(&part2).await.unwrap();

        let (_, body) = send_json(
            &harness.app,
            "POST",
            "/api/checkout",
            serde_json::json!({
                "customerEmail": "jane@example.com",
                "courseId": part1.id,
                "paymentMethod": "CARD"
            }),
        )
        .await;
        let entry_id = body["id"].as_str().unwrap().to_string();
        send_json(
            &harness.app,
            "POST",
            &format!("/api/ledger/{}/confirm", entry_id),
            serde_json::json!({}),
        )
        .await;

        let (status, body) = send_get(
            &harness.app,
            "/api/admin/reconciliation/status/jane@example.com",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let standings = body.as_array().unwrap();
        assert_eq!(standings.len(), 1);
        assert_eq!(standings[0]["seriesName"], "Paint Correction");
        assert_eq!(standings[0]["totalCourses"], 2);

        let (status, body) = send_json(
            &harness.app,
            "POST",
            "/api/admin/reconciliation/repair",
            serde_json::json!({}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["started"], true);

        let (status, _) = send_get(&harness.app, "/api/admin/reconciliation/repair").await;
        assert_eq!(status, StatusCode::OK);
    }
}
