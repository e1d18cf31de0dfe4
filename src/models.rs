use chrono::NaiveDate;
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UserIn {
    #[validate(length(max = 50))]
    pub username: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewIn {
    pub user_id: i32,
    pub movie_id: i32,
    pub rating: i32,
    #[validate(length(max = 200))]
    pub review_text: String,
}

/// A review as it appears nested under its author.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, FromQueryResult)]
pub struct ReviewOut {
    pub rating: i32,
    pub review_text: String,
    pub review_date: NaiveDate,
    pub movie_title: String,
    pub movie_release_date: NaiveDate,
}

#[derive(Clone, Debug, Serialize)]
pub struct UserWithReviews {
    pub id: i32,
    pub username: String,
    pub reviews: Vec<ReviewOut>,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewCreated {
    pub message: &'static str,
    pub id: i32,
}
