//! OpenAPI Documentation
//!
//! Central OpenAPI specification for the platform APIs.

use utoipa::OpenApi;

/// Platform API OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "LearnForge Platform API",
        version = "1.0.0",
        description = "REST APIs for courses, purchases, accounts, and entitlement reconciliation"
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "checkout", description = "Checkout creation"),
        (name = "ledger", description = "Payment-gateway transition hooks"),
        (name = "courses", description = "Course and chapter management"),
        (name = "accounts", description = "Account management"),
        (name = "reconciliation", description = "Entitlement reconciliation administration")
    ),
    paths(
        // Checkout + ledger hooks
        super::ledger::create_checkout,
        super::ledger::get_ledger_entry,
        super::ledger::confirm_payment,
        super::ledger::fail_payment,
        super::ledger::cancel_payment,
        super::ledger::refund_payment,
        // Courses
        super::courses::create_course,
        super::courses::publish_course,
        super::courses::list_courses,
        super::courses::get_course,
        super::courses::create_chapter,
        super::courses::list_chapters,
        // Accounts
        super::accounts::create_account,
        super::accounts::get_account,
        // Reconciliation admin
        super::reconciliation::trigger_repair,
        super::reconciliation::repair_status,
        super::reconciliation::customer_status,
    ),
    components(schemas(
        super::common::ApiError,
        super::ledger::CheckoutRequest,
        super::ledger::LedgerEntryResponse,
        super::courses::CreateCourseRequest,
        super::courses::CourseResponse,
        super::courses::CourseWithBackfillResponse,
        super::courses::CreateChapterRequest,
        super::courses::ChapterResponse,
        super::accounts::CreateAccountRequest,
        super::accounts::AccountResponse,
        super::accounts::CreateAccountResponse,
        super::reconciliation::RepairStartedResponse,
        super::reconciliation::RepairStatusResponse,
    ))
)]
pub struct PlatformApiDoc;
