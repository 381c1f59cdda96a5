//! Courses API
//!
//! Course and chapter management. Creating or publishing a series-bound
//! course is the Mode B trigger: the new-course backfill runs before the
//! response returns and its report rides along in the payload.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use lf_entitlement::domain::{Chapter, Course};
use lf_entitlement::repository::{ChapterRepository, CourseRepository};
use lf_entitlement::{BackfillReport, EntitlementError, ReconciliationScheduler};

use crate::api::common::ApiFailure;

/// Courses service state
#[derive(Clone)]
pub struct CoursesState {
    pub course_repo: Arc<CourseRepository>,
    pub chapter_repo: Arc<ChapterRepository>,
    pub scheduler: Arc<ReconciliationScheduler>,
}

/// Course creation request DTO
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    pub title: String,
    pub price_cents: i64,
    pub series_name: Option<String>,
    pub series_part: Option<i64>,
    #[serde(default)]
    pub published: bool,
}

/// Course response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    pub id: String,
    pub title: String,
    pub price_cents: i64,
    pub published: bool,
    pub series_name: Option<String>,
    pub series_part: Option<i64>,
    pub created_at: String,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            title: course.title,
            price_cents: course.price_cents,
            published: course.published,
            series_name: course.series_name,
            series_part: course.series_part,
            created_at: course.created_at.to_rfc3339(),
        }
    }
}

/// Course plus the backfill report when publishing triggered one
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseWithBackfillResponse {
    pub course: CourseResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backfill: Option<BackfillReport>,
}

/// Chapter creation request DTO
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateChapterRequest {
    pub title: String,
    pub position: i64,
    #[serde(default)]
    pub default_unlocked: bool,
}

/// Chapter response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChapterResponse {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub position: i64,
    pub default_unlocked: bool,
}

impl From<Chapter> for ChapterResponse {
    fn from(chapter: Chapter) -> Self {
        Self {
            id: chapter.id,
            course_id: chapter.course_id,
            title: chapter.title,
            position: chapter.position,
            default_unlocked: chapter.default_unlocked,
        }
    }
}

/// Create a course; published series courses trigger the backfill
#[utoipa::path(
    post,
    path = "",
    tag = "courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 200, description = "Course created", body = CourseWithBackfillResponse),
        (status = 400, description = "Invalid series binding")
    )
)]
pub async fn create_course(
    State(state): State<CoursesState>,
    Json(request): Json<CreateCourseRequest>,
) -> Result<Json<CourseWithBackfillResponse>, ApiFailure> {
    if request.series_name.is_some() && request.series_part.is_none() {
        return Err(
            EntitlementError::validation("series courses require a part ordinal").into(),
        );
    }

    let mut course = Course::new(request.title, request.price_cents).with_published(request.published);
    if let (Some(series_name), Some(part)) = (request.series_name, request.series_part) {
        course = course.with_series(series_name, part);
    }
    state.course_repo.insert(&course).await?;

    let backfill = if course.published && course.is_series_course() {
        Some(state.scheduler.backfill_course(&course.id).await?)
    } else {
        None
    };

    Ok(Json(CourseWithBackfillResponse {
        course: course.into(),
        backfill,
    }))
}

/// Publish a course; series courses trigger the backfill
#[utoipa::path(
    post,
    path = "/{id}/publish",
    tag = "courses",
    params(("id" = String, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course published", body = CourseWithBackfillResponse),
        (status = 404, description = "Course not found")
    )
)]
pub async fn publish_course(
    State(state): State<CoursesState>,
    Path(id): Path<String>,
) -> Result<Json<CourseWithBackfillResponse>, ApiFailure> {
    let course = state.course_repo.publish(&id).await?;

    let backfill = if course.is_series_course() {
        Some(state.scheduler.backfill_course(&course.id).await?)
    } else {
        None
    };

    Ok(Json(CourseWithBackfillResponse {
        course: course.into(),
        backfill,
    }))
}

/// List courses
#[utoipa::path(
    get,
    path = "",
    tag = "courses",
    responses(
        (status = 200, description = "All courses", body = Vec<CourseResponse>)
    )
)]
pub async fn list_courses(
    State(state): State<CoursesState>,
) -> Result<Json<Vec<CourseResponse>>, ApiFailure> {
    let courses = state.course_repo.list().await?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}

/// Get a course
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "courses",
    params(("id" = String, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course found", body = CourseResponse),
        (status = 404, description = "Course not found")
    )
)]
pub async fn get_course(
    State(state): State<CoursesState>,
    Path(id): Path<String>,
) -> Result<Json<CourseResponse>, ApiFailure> {
    let course = state
        .course_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| EntitlementError::course_not_found(&id))?;
    Ok(Json(course.into()))
}

/// Add a chapter to a course
#[utoipa::path(
    post,
    path = "/{id}/chapters",
    tag = "courses",
    params(("id" = String, Path, description = "Course ID")),
    request_body = CreateChapterRequest,
    responses(
        (status = 200, description = "Chapter created", body = ChapterResponse),
        (status = 404, description = "Course not found")
    )
)]
pub async fn create_chapter(
    State(state): State<CoursesState>,
    Path(id): Path<String>,
    Json(request): Json<CreateChapterRequest>,
) -> Result<Json<ChapterResponse>, ApiFailure> {
    let course = state
        .course_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| EntitlementError::course_not_found(&id))?;

    let chapter = Chapter::new(&course.id, request.title, request.position)
        .with_default_unlocked(request.default_unlocked);
    state.chapter_repo.insert(&chapter).await?;

    Ok(Json(chapter.into()))
}

/// List the chapters of a course
#[utoipa::path(
    get,
    path = "/{id}/chapters",
    tag = "courses",
    params(("id" = String, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Chapters in position order", body = Vec<ChapterResponse>)
    )
)]
pub async fn list_chapters(
    State(state): State<CoursesState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ChapterResponse>>, ApiFailure> {
    let chapters = state.chapter_repo.list_for_course(&id).await?;
    Ok(Json(chapters.into_iter().map(Into::into).collect()))
}

/// Create courses router
pub fn courses_router(state: CoursesState) -> Router {
    Router::new()
        .route("/", post(create_course).get(list_courses))
        .route("/:id", get(get_course))
        .route("/:id/publish", post(publish_course))
        .route("/:id/chapters", post(create_chapter).get(list_chapters))
        .with_state(state)
}
