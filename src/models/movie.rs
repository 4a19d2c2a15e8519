use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Нормализованная запись о фильме, ключ - внешний id (IMDb).
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub overview: String,
    pub poster_path: String,
    pub backdrop_path: String,
    pub release_date: String,
    pub original_language: String,
    pub tagline: String,
    pub genres: Vec<String>,
    pub casts: Vec<String>,
    pub vote_average: f64,
    pub runtime: i32,
}
