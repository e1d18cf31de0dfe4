use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    AppState,
    entities::{movie, user},
    error::AppResult,
    extract::{ValidJson, ValidPath},
    models::{Message, ReviewCreated, ReviewIn, UserIn, UserWithReviews},
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/movies", get(list_movies))
        .route("/movie/{movie_id}", get(get_movie))
        .route("/users", get(list_users).post(create_user))
        .route("/user/{user_id}", get(get_user).put(update_user).delete(delete_user))
        .route("/reviews", axum::routing::post(create_review))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

pub async fn status() -> Json<Message> {
    Json(Message::new("OK"))
}

pub async fn list_movies(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<movie::Model>>> {
    Ok(Json(state.store.list_movies().await?))
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    ValidPath(movie_id): ValidPath<i32>,
) -> AppResult<Json<movie::Model>> {
    Ok(Json(state.store.get_movie(movie_id).await?))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidJson(user): ValidJson<UserIn>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let id = state.store.create_user(&user.username).await?;
    Ok((StatusCode::CREATED, Json(Message::new(format!("User created successfully with id: {id}")))))
}

pub async fn list_users(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<user::Model>>> {
    Ok(Json(state.store.list_users().await?))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    ValidPath(user_id): ValidPath<i32>,
) -> AppResult<Json<UserWithReviews>> {
    Ok(Json(state.store.get_user_with_reviews(user_id).await?))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    ValidPath(user_id): ValidPath<i32>,
) -> AppResult<Json<Message>> {
    state.store.delete_user(user_id).await?;
    Ok(Json(Message::new("User deleted")))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    ValidPath(user_id): ValidPath<i32>,
    ValidJson(user): ValidJson<UserIn>,
) -> AppResult<StatusCode> {
    state.store.update_user(user_id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_review(
    State(state): State<Arc<AppState>>,
    ValidJson(review): ValidJson<ReviewIn>,
) -> AppResult<(StatusCode, Json<ReviewCreated>)> {
    let id = state.store.create_review(&review).await?;
    Ok((StatusCode::CREATED, Json(ReviewCreated { message: "Review created successfully", id })))
}
