//! Movie catalogue operations behind the `/movies` routes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::logging::LogContext;
use crate::models::{Movie, MovieChanges, MovieFilter, NewMovie, Page, Pagination};
use crate::store::MovieRepository;
use crate::validation::{self, Validated, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMovieRequest {
    pub title: String,
    pub description: String,
    pub director: String,
    pub release_date: String,
    #[serde(default)]
    pub rating: Option<i16>,
    #[serde(default)]
    pub episode_id: Option<i32>,
    pub genre: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_series: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateMovieRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_series: Option<bool>,
}

fn check_title(title: &str) -> Validated<()> {
    validation::check_length("title", title, 1, 255)
}

fn check_description(description: &str) -> Validated<()> {
    validation::check_length("description", description, 1, 1000)
}

fn check_director(director: &str) -> Validated<()> {
    validation::check_length("director", director, 1, 100)
}

fn check_genre(genre: &str) -> Validated<()> {
    validation::check_length("genre", genre, 2, 50)
}

fn check_rating(rating: i16) -> Validated<()> {
    if !(0..=10).contains(&rating) {
        return Err(ValidationError::new("rating must be between 0 and 10"));
    }
    Ok(())
}

fn check_episode_id(episode_id: i32) -> Validated<()> {
    if episode_id < 0 {
        return Err(ValidationError::new("episodeId must not be less than 0"));
    }
    Ok(())
}

fn check_tags(tags: &[String]) -> Validated<()> {
    if tags.is_empty() || tags.len() > 3 {
        return Err(ValidationError::new("tags must contain between 1 and 3 items"));
    }
    if tags.iter().any(|tag| !(1..=20).contains(&tag.chars().count())) {
        return Err(ValidationError::new(
            "each value in tags must be between 1 and 20 characters",
        ));
    }
    Ok(())
}

impl CreateMovieRequest {
    pub fn validate(self) -> Validated<NewMovie> {
        check_title(&self.title)?;
        check_description(&self.description)?;
        check_director(&self.director)?;
        let release_date = validation::parse_release_date(&self.release_date)?;
        if let Some(rating) = self.rating {
            check_rating(rating)?;
        }
        if let Some(episode_id) = self.episode_id {
            check_episode_id(episode_id)?;
        }
        check_genre(&self.genre)?;
        check_tags(&self.tags)?;

        Ok(NewMovie {
            title: self.title,
            description: self.description,
            director: self.director,
            release_date,
            rating: self.rating,
            genre: self.genre,
            tags: self.tags,
            episode_id: self.episode_id,
            is_series: self.is_series,
        })
    }
}

impl UpdateMovieRequest {
    pub fn validate(self) -> Validated<MovieChanges> {
        if let Some(title) = &self.title {
            check_title(title)?;
        }
        if let Some(description) = &self.description {
            check_description(description)?;
        }
        if let Some(director) = &self.director {
            check_director(director)?;
        }
        let release_date = self
            .release_date
            .as_deref()
            .map(validation::parse_release_date)
            .transpose()?;
        if let Some(rating) = self.rating {
            check_rating(rating)?;
        }
        if let Some(episode_id) = self.episode_id {
            check_episode_id(episode_id)?;
        }
        if let Some(genre) = &self.genre {
            check_genre(genre)?;
        }
        if let Some(tags) = &self.tags {
            check_tags(tags)?;
        }

        let changes = MovieChanges {
            title: self.title,
            description: self.description,
            director: self.director,
            release_date,
            rating: self.rating,
            genre: self.genre,
            tags: self.tags,
            episode_id: self.episode_id,
            is_series: self.is_series,
        };
        if changes.is_empty() {
            return Err(ValidationError::empty_body());
        }
        Ok(changes)
    }
}

pub struct MovieService {
    movies: Arc<dyn MovieRepository>,
    log: LogContext,
}

impl MovieService {
    pub fn new(movies: Arc<dyn MovieRepository>, log: LogContext) -> Self {
        Self { movies, log }
    }

    pub async fn create(&self, request: CreateMovieRequest) -> ApiResult<Movie> {
        let movie = request.validate()?;
        match self.movies.create(movie).await {
            Ok(created) => {
                self.log
                    .info(format_args!("movie {} created: {}", created.id, created.title));
                Ok(created)
            }
            Err(err) => {
                self.log.error(format_args!("creating movie failed: {err}"));
                Err(ApiError::Validation("Failed to create movie".into()))
            }
        }
    }

    pub async fn list(&self, filter: MovieFilter, pagination: Pagination) -> ApiResult<Page<Movie>> {
        match self.movies.find_all(&filter, pagination).await {
            Ok((data, count)) => Ok(Page {
                data,
                count,
                page: pagination.page,
            }),
            Err(err) => {
                self.log.error(format_args!("listing movies failed: {err}"));
                Err(ApiError::Validation("Failed to fetch movies".into()))
            }
        }
    }

    pub async fn get(&self, id: i32) -> ApiResult<Movie> {
        self.movies
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn update(&self, id: i32, request: UpdateMovieRequest) -> ApiResult<Movie> {
        let changes = request.validate()?;
        let updated = self.movies.update(id, changes).await?;
        match updated {
            Some(movie) => {
                self.log.info(format_args!("movie {id} updated"));
                Ok(movie)
            }
            None => Err(not_found(id)),
        }
    }

    pub async fn delete(&self, id: i32) -> ApiResult<()> {
        if !self.movies.delete(id).await? {
            return Err(not_found(id));
        }
        self.log.info(format_args!("movie {id} deleted"));
        Ok(())
    }
}

fn not_found(id: i32) -> ApiError {
    ApiError::NotFound(format!("Movie with ID {id} not found"))
}
