//! Classrooms, membership, ratings, attached tests, and lessons by classroom.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use lex_core::entities::{
    Account, Classroom, ClassroomRating, ClassroomStudent, Lesson, Test,
};
use lex_core::enums::Role;
use lex_core::responses::Page;
use lex_db::inputs::{NewClassroom, NewLesson};
use lex_db::repos::classroom::ClassroomFilter;
use lex_db::updates::classroom::ClassroomUpdate;

use crate::error::ApiResult;
use crate::extract::{AuthUser, JsonBody, PageQuery};
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/classrooms", post(create).get(list))
        .route(
            "/classrooms/:id",
            get(get_one).patch(update).delete(remove),
        )
        .route("/classrooms/:id/join", post(join))
        .route("/classrooms/:id/leave", post(leave))
        .route("/classrooms/:id/students", get(students))
        .route(
            "/classrooms/:id/ratings",
            get(ratings).post(rate).delete(unrate),
        )
        .route("/classrooms/:id/tests", get(tests).post(attach_test))
        .route("/classrooms/:id/tests/:test_id", delete(detach_test))
        .route("/classrooms/:id/lessons", get(lessons).post(create_lesson))
        .route("/me/classrooms", get(my_classrooms))
}

async fn create(
    State(state): State<SharedState>,
    user: AuthUser,
    JsonBody(input): JsonBody<NewClassroom>,
) -> ApiResult<(StatusCode, Json<Classroom>)> {
    user.require(&[Role::Teacher, Role::Admin])?;
    let classroom = state.svc.create_classroom(user.id(), input).await?;
    Ok((StatusCode::CREATED, Json(classroom)))
}

#[derive(Debug, Deserialize)]
struct ClassroomQuery {
    search: Option<String>,
    teacher_id: Option<String>,
}

async fn list(
    State(state): State<SharedState>,
    _user: AuthUser,
    Query(query): Query<ClassroomQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<Classroom>>> {
    let filter = ClassroomFilter {
        search: query.search,
        teacher_id: query.teacher_id,
    };
    let paging = state.paging(page.page, page.page_size);
    Ok(Json(state.svc.list_classrooms(filter, paging).await?))
}

async fn get_one(
    State(state): State<SharedState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Classroom>> {
    Ok(Json(state.svc.get_classroom(&id).await?))
}

async fn update(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<ClassroomUpdate>,
) -> ApiResult<Json<Classroom>> {
    Ok(Json(
        state
            .svc
            .update_classroom(user.identity(), &id, update)
            .await?,
    ))
}

async fn remove(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.svc.delete_classroom(user.identity(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn join(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<ClassroomStudent>)> {
    user.require(&[Role::Student])?;
    let membership = state.svc.join_classroom(user.id(), &id).await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

async fn leave(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.svc.leave_classroom(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn students(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<Account>>> {
    state.svc.ensure_classroom_owner(user.identity(), &id).await?;
    let paging = state.paging(page.page, page.page_size);
    Ok(Json(state.svc.list_classroom_students(&id, paging).await?))
}

async fn ratings(
    State(state): State<SharedState>,
    _user: AuthUser,
    Path(id): Path<String>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<ClassroomRating>>> {
    let paging = state.paging(page.page, page.page_size);
    Ok(Json(state.svc.list_ratings(&id, paging).await?))
}

#[derive(Debug, Deserialize)]
struct RateRequest {
    rating: i64,
    #[serde(default)]
    comment: Option<String>,
}

#[derive(Debug, Serialize)]
struct RatingResponse {
    rating: ClassroomRating,
    classroom: Classroom,
}

async fn rate(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<RateRequest>,
) -> ApiResult<Json<RatingResponse>> {
    user.require(&[Role::Student])?;
    let (rating, classroom) = state
        .svc
        .rate_classroom(user.id(), &id, req.rating, req.comment.as_deref())
        .await?;
    Ok(Json(RatingResponse { rating, classroom }))
}

async fn unrate(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Classroom>> {
    Ok(Json(state.svc.delete_rating(user.id(), &id).await?))
}

async fn tests(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Test>>> {
    Ok(Json(
        state.svc.list_classroom_tests(user.identity(), &id).await?,
    ))
}

#[derive(Debug, Deserialize)]
struct AttachRequest {
    test_id: String,
}

async fn attach_test(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<AttachRequest>,
) -> ApiResult<StatusCode> {
    state
        .svc
        .attach_test(user.identity(), &id, &req.test_id)
        .await?;
    Ok(StatusCode::CREATED)
}

async fn detach_test(
    State(state): State<SharedState>,
    user: AuthUser,
    Path((id, test_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state.svc.detach_test(user.identity(), &id, &test_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn lessons(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Lesson>>> {
    Ok(Json(state.svc.list_lessons(user.identity(), &id).await?))
}

async fn create_lesson(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<NewLesson>,
) -> ApiResult<(StatusCode, Json<Lesson>)> {
    let lesson = state
        .svc
        .create_lesson(user.identity(), &id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

/// Students see the classrooms they joined; teachers see the ones they run.
async fn my_classrooms(
    State(state): State<SharedState>,
    user: AuthUser,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<Classroom>>> {
    let paging = state.paging(page.page, page.page_size);
    let page = if user.identity().role == Role::Student {
        state.svc.list_student_classrooms(user.id(), paging).await?
    } else {
        let filter = ClassroomFilter {
            search: None,
            teacher_id: Some(user.id().to_string()),
        };
        state.svc.list_classrooms(filter, paging).await?
    };
    Ok(Json(page))
}
