use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, delete, get, patch, post};

use crate::auth::{Authenticated, RequireAdmin, RequireUser};
use crate::error::ApiResult;
use crate::models::{Movie, MovieFilter, Page, Pagination};
use crate::movies::{CreateMovieRequest, MovieService, UpdateMovieRequest};
use crate::routes::helpers::parse_id;
use crate::validation::{self, Validated, ValidationError};

/// Query string accepted by the listing route. Values arrive as text so that
/// malformed numbers produce a field-specific message.
#[derive(Debug, Default, FromForm)]
pub struct MovieQuery {
    pub title: Option<String>,
    pub description: Option<String>,
    pub director: Option<String>,
    pub rating: Option<String>,
    #[field(name = "episodeId")]
    pub episode_id: Option<String>,
    pub genre: Option<String>,
    pub tag: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl MovieQuery {
    pub fn into_criteria(self) -> Validated<(MovieFilter, Pagination)> {
        let text = |field: &str, value: Option<String>, min: usize, max: usize| {
            value
                .map(|v| validation::check_length(field, &v, min, max).map(|_| v))
                .transpose()
        };

        let filter = MovieFilter {
            title: text("title", self.title, 1, 255)?,
            description: text("description", self.description, 1, 1000)?,
            director: text("director", self.director, 1, 100)?,
            genre: text("genre", self.genre, 2, 50)?,
            tag: text("tag", self.tag, 1, 20)?,
            rating: self
                .rating
                .map(|raw| parse_rating(&raw))
                .transpose()?,
            episode_id: self
                .episode_id
                .map(|raw| parse_unsigned("episodeId", &raw))
                .transpose()?,
        };

        let pagination = Pagination {
            page: positive("page", self.page, Pagination::DEFAULT_PAGE)?,
            limit: positive("limit", self.limit, Pagination::DEFAULT_LIMIT)?,
        };

        Ok((filter, pagination))
    }
}

fn parse_rating(raw: &str) -> Validated<f64> {
    let well_formed = !raw.is_empty()
        && raw.split_once('.').map_or(
            raw.chars().all(|c| c.is_ascii_digit()),
            |(int, frac)| {
                !int.is_empty()
                    && !frac.is_empty()
                    && int.chars().all(|c| c.is_ascii_digit())
                    && frac.chars().all(|c| c.is_ascii_digit())
            },
        );
    well_formed
        .then(|| raw.parse::<f64>().ok())
        .flatten()
        .ok_or_else(|| ValidationError::new("rating must be a valid number"))
}

fn parse_unsigned(field: &str, raw: &str) -> Validated<i32> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new(format!("{field} must be a valid number")));
    }
    raw.parse::<i32>()
        .map_err(|_| ValidationError::new(format!("{field} must be a valid number")))
}

fn positive(field: &str, raw: Option<String>, default: i64) -> Validated<i64> {
    match raw {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(value) if value >= 1 => Ok(value),
            _ => Err(ValidationError::new(format!(
                "{field} must be a positive integer"
            ))),
        },
    }
}

#[post("/movies", data = "<payload>")]
pub async fn create_movie(
    _admin: RequireAdmin,
    service: &State<MovieService>,
    payload: Json<CreateMovieRequest>,
) -> ApiResult<(Status, Json<Movie>)> {
    let movie = service.create(payload.into_inner()).await?;
    Ok((Status::Created, Json(movie)))
}

#[get("/movies?<query..>")]
pub async fn list_movies(
    _user: Authenticated,
    service: &State<MovieService>,
    query: MovieQuery,
) -> ApiResult<Json<Page<Movie>>> {
    let (filter, pagination) = query.into_criteria()?;
    Ok(Json(service.list(filter, pagination).await?))
}

#[get("/movies/<id>")]
pub async fn get_movie(
    _user: RequireUser,
    id: &str,
    service: &State<MovieService>,
) -> ApiResult<Json<Movie>> {
    let id = parse_id(id)?;
    Ok(Json(service.get(id).await?))
}

#[patch("/movies/<id>", data = "<payload>")]
pub async fn update_movie(
    _admin: RequireAdmin,
    id: &str,
    service: &State<MovieService>,
    payload: Json<UpdateMovieRequest>,
) -> ApiResult<Json<Movie>> {
    let id = parse_id(id)?;
    Ok(Json(service.update(id, payload.into_inner()).await?))
}

#[delete("/movies/<id>")]
pub async fn delete_movie(
    _admin: RequireAdmin,
    id: &str,
    service: &State<MovieService>,
) -> ApiResult<()> {
    let id = parse_id(id)?;
    service.delete(id).await
}
