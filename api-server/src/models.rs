use chrono::NaiveDate;
use rocket_db_pools::sqlx::FromRow;
use serde::{Deserialize, Serialize};

use crate::auth::responses::Role;

// ===== User Directory Models =====

/// Profile record of a registered account. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub full_name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub role: Role,
}

/// Partial update applied to a user row; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.email.is_none() && self.role.is_none()
    }
}

// ===== Credential Store Models =====

/// Password hash owned one-to-one by a user.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Credential {
    pub id: i32,
    pub user_id: i32,
    pub password_hash: String,
}

// ===== Movie Catalogue Models =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub director: String,
    pub release_date: NaiveDate,
    pub rating: Option<i16>,
    pub genre: String,
    pub tags: Vec<String>,
    pub episode_id: Option<i32>,
    pub is_series: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMovie {
    pub title: String,
    pub description: String,
    pub director: String,
    pub release_date: NaiveDate,
    pub rating: Option<i16>,
    pub genre: String,
    pub tags: Vec<String>,
    pub episode_id: Option<i32>,
    pub is_series: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub director: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub rating: Option<i16>,
    pub genre: Option<String>,
    pub tags: Option<Vec<String>>,
    pub episode_id: Option<i32>,
    pub is_series: Option<bool>,
}

impl MovieChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.director.is_none()
            && self.release_date.is_none()
            && self.rating.is_none()
            && self.genre.is_none()
            && self.tags.is_none()
            && self.episode_id.is_none()
            && self.is_series.is_none()
    }

    /// Overlay the present fields onto an existing movie.
    pub fn apply_to(self, movie: &mut Movie) {
        if let Some(title) = self.title {
            movie.title = title;
        }
        if let Some(description) = self.description {
            movie.description = description;
        }
        if let Some(director) = self.director {
            movie.director = director;
        }
        if let Some(release_date) = self.release_date {
            movie.release_date = release_date;
        }
        if let Some(rating) = self.rating {
            movie.rating = Some(rating);
        }
        if let Some(genre) = self.genre {
            movie.genre = genre;
        }
        if let Some(tags) = self.tags {
            movie.tags = tags;
        }
        if let Some(episode_id) = self.episode_id {
            movie.episode_id = Some(episode_id);
        }
        if let Some(is_series) = self.is_series {
            movie.is_series = is_series;
        }
    }
}

/// Search criteria for the movie listing. Text fields match case-insensitive substrings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieFilter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub director: Option<String>,
    pub rating: Option<f64>,
    pub episode_id: Option<i32>,
    pub genre: Option<String>,
    pub tag: Option<String>,
}

impl MovieFilter {
    pub fn matches(&self, movie: &Movie) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            needle
                .as_ref()
                .map(|n| haystack.to_lowercase().contains(&n.to_lowercase()))
                .unwrap_or(true)
        }

        contains(&movie.title, &self.title)
            && contains(&movie.description, &self.description)
            && contains(&movie.director, &self.director)
            && contains(&movie.genre, &self.genre)
            && self
                .tag
                .as_ref()
                .map(|tag| {
                    let tag = tag.to_lowercase();
                    movie.tags.iter().any(|t| t.to_lowercase().contains(&tag))
                })
                .unwrap_or(true)
            && self
                .rating
                .map(|rating| movie.rating.map(f64::from) == Some(rating))
                .unwrap_or(true)
            && self
                .episode_id
                .map(|episode| movie.episode_id == Some(episode))
                .unwrap_or(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub const DEFAULT_PAGE: i64 = 1;
    pub const DEFAULT_LIMIT: i64 = 20;

    /// Rows to skip; saturates so huge page numbers just yield an empty page.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub count: i64,
    pub page: i64,
}
