use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::{Movie, OccupancyMap, Show, ShowStatus};
use crate::AppState;

// --- Запросы и ответы ---

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct AddShowRequest {
    #[validate(length(min = 1, message = "movieId is required"))]
    pub movie_id: String,
    #[validate(length(min = 1, message = "showsInput must not be empty"), nested)]
    pub shows_input: Vec<ShowInput>,
    #[validate(range(exclusive_min = 0.0, message = "showPrice must be positive"))]
    pub show_price: f64,
}

// Serialize нужен валидатору: `length` кладёт значение поля в параметры ошибки
#[derive(Debug, Default, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct ShowInput {
    #[validate(length(min = 1, message = "date is required"))]
    pub date: String,
    #[validate(length(min = 1, message = "each date needs at least one time"))]
    pub time: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowTime {
    pub time: DateTime<Utc>,
    pub show_id: Uuid,
}

/// Сеанс вместе с фильмом, для админки и списка броней.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowDetails {
    pub id: Uuid,
    pub movie: Movie,
    pub show_date_time: DateTime<Utc>,
    pub show_price: f64,
    pub occupied_seats: OccupancyMap,
    pub status: ShowStatus,
}

// --- Чистые функции ---

fn parse_time(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| AppError::Validation(format!("Invalid time `{value}`")))
}

/// Каждая пара (дата, время) превращается в отдельный сеанс с пустой картой мест.
/// Время трактуется как UTC.
pub fn expand_show_inputs(movie_id: &str, inputs: &[ShowInput], price: f64) -> Result<Vec<Show>> {
    let mut shows = Vec::new();
    for input in inputs {
        let date = NaiveDate::parse_from_str(input.date.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::Validation(format!("Invalid date `{}`", input.date)))?;
        for time in &input.time {
            let at = date.and_time(parse_time(time)?).and_utc();
            shows.push(Show::new(movie_id, at, price));
        }
    }
    Ok(shows)
}

/// Id фильмов в порядке их самого раннего сеанса.
pub fn distinct_movie_ids(shows: &[Show]) -> Vec<String> {
    let mut seen = HashSet::new();
    shows
        .iter()
        .filter(|show| seen.insert(show.movie.as_str()))
        .map(|show| show.movie.clone())
        .collect()
}

/// `YYYY-MM-DD` -> сеансы этого дня. Ключ есть, только если в этот день есть сеанс.
pub fn group_by_date(shows: &[Show]) -> BTreeMap<String, Vec<ShowTime>> {
    let mut grouped: BTreeMap<String, Vec<ShowTime>> = BTreeMap::new();
    for show in shows {
        let key = show.show_date_time.date_naive().format("%Y-%m-%d").to_string();
        grouped.entry(key).or_default().push(ShowTime {
            time: show.show_date_time,
            show_id: show.id,
        });
    }
    for times in grouped.values_mut() {
        times.sort_by_key(|t| t.time);
    }
    grouped
}

// --- Операции ---

/// Трендовые фильмы; при наличии Redis ответ кешируется целиком.
pub async fn now_playing(state: &AppState) -> Result<Vec<Movie>> {
    if let Some(movies) = state.cache.get_now_playing().await {
        return Ok(movies);
    }
    let movies = state.catalog.now_playing().await?;
    state.cache.store_now_playing(&movies).await;
    Ok(movies)
}

/// Фильм из хранилища; при первом обращении берётся из OMDb и сохраняется.
pub async fn resolve_movie(state: &AppState, movie_id: &str) -> Result<Movie> {
    if let Some(movie) = state.movies.get_movie(movie_id).await? {
        return Ok(movie);
    }

    let mut movie = match state.catalog.movie_details(movie_id).await {
        Ok(movie) => movie,
        Err(AppError::UpstreamNotFound(reason)) => {
            return Err(AppError::NotFound(format!("Movie not found: {reason}")));
        }
        Err(e) => return Err(e),
    };
    // Ключ - тот id, по которому на фильм ссылаются сеансы
    movie.id = movie_id.to_string();

    let movie = state.movies.insert_movie_if_absent(movie).await?;
    info!("New movie saved: {} ({})", movie.title, movie.id);
    Ok(movie)
}

pub async fn add_shows(state: &AppState, request: AddShowRequest) -> Result<usize> {
    request.validate()?;
    let movie_id = request.movie_id.trim();

    // Разбираем даты до похода во внешний API
    let shows = expand_show_inputs(movie_id, &request.shows_input, request.show_price)?;
    let movie = resolve_movie(state, movie_id).await?;

    let count = state.shows.insert_shows(shows).await?;
    info!("Added {} shows for {}", count, movie.title);
    Ok(count)
}

/// Фильмы с предстоящими сеансами без повторов, по самому раннему сеансу.
pub async fn list_upcoming(state: &AppState) -> Result<Vec<Movie>> {
    let shows = state.shows.upcoming_shows(Utc::now(), None).await?;

    let mut movies = Vec::new();
    for movie_id in distinct_movie_ids(&shows) {
        if let Some(movie) = state.movies.get_movie(&movie_id).await? {
            movies.push(movie);
        }
    }
    Ok(movies)
}

pub async fn shows_for_movie(
    state: &AppState,
    movie_id: &str,
) -> Result<(Movie, BTreeMap<String, Vec<ShowTime>>)> {
    let movie = state
        .movies
        .get_movie(movie_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Movie not found: {movie_id}")))?;

    let shows = state.shows.upcoming_shows(Utc::now(), Some(movie_id)).await?;
    Ok((movie, group_by_date(&shows)))
}

/// Подставляет фильмы в сеансы; сеансы без фильма отбрасываются.
pub async fn with_movies(state: &AppState, shows: Vec<Show>) -> Result<Vec<ShowDetails>> {
    let capacity = state.layout.capacity();
    let mut movies: HashMap<String, Option<Movie>> = HashMap::new();
    let mut details = Vec::with_capacity(shows.len());

    for show in shows {
        if !movies.contains_key(&show.movie) {
            let movie = state.movies.get_movie(&show.movie).await?;
            movies.insert(show.movie.clone(), movie);
        }
        let Some(Some(movie)) = movies.get(&show.movie) else {
            continue;
        };
        details.push(ShowDetails {
            id: show.id,
            movie: movie.clone(),
            status: show.status(capacity),
            show_date_time: show.show_date_time,
            show_price: show.show_price,
            occupied_seats: show.occupied_seats,
        });
    }
    Ok(details)
}

pub async fn admin_shows(state: &AppState) -> Result<Vec<ShowDetails>> {
    let shows = state.shows.upcoming_shows(Utc::now(), None).await?;
    with_movies(state, shows).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn input(date: &str, times: &[&str]) -> ShowInput {
        ShowInput {
            date: date.to_string(),
            time: times.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn one_show_per_date_time_pair() {
        let shows =
            expand_show_inputs("tt1", &[input("2024-01-01", &["18:00", "21:00"])], 9.5).unwrap();

        assert_eq!(shows.len(), 2);
        assert!(shows.iter().all(|s| s.occupied_seats.is_empty()));
        assert!(shows.iter().all(|s| s.movie == "tt1" && s.show_price == 9.5));
        assert_eq!(
            shows[1].show_date_time,
            Utc.with_ymd_and_hms(2024, 1, 1, 21, 0, 0).unwrap()
        );
        assert_ne!(shows[0].id, shows[1].id);
    }

    #[test]
    fn seconds_are_accepted_in_times() {
        let shows = expand_show_inputs("tt1", &[input("2030-02-03", &["09:15:30"])], 1.0).unwrap();
        assert_eq!(
            shows[0].show_date_time,
            Utc.with_ymd_and_hms(2030, 2, 3, 9, 15, 30).unwrap()
        );
    }

    #[test]
    fn malformed_dates_and_times_are_rejected() {
        assert!(matches!(
            expand_show_inputs("tt1", &[input("01/02/2024", &["18:00"])], 1.0),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            expand_show_inputs("tt1", &[input("2024-01-01", &["6pm"])], 1.0),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn request_validation_catches_missing_fields() {
        let empty = AddShowRequest::default();
        let errors = empty.validate().unwrap_err().to_string();
        assert!(errors.contains("movieId is required"));
        assert!(errors.contains("showPrice must be positive"));

        let no_times = AddShowRequest {
            movie_id: "tt1".into(),
            shows_input: vec![input("2024-01-01", &[])],
            show_price: 10.0,
        };
        assert!(no_times.validate().is_err());
    }

    #[test]
    fn show_list_length_and_nested_entries_are_validated() {
        let no_shows = AddShowRequest {
            movie_id: "tt1".into(),
            shows_input: vec![],
            show_price: 10.0,
        };
        let errors = no_shows.validate().unwrap_err().to_string();
        assert!(errors.contains("showsInput must not be empty"));

        let valid = AddShowRequest {
            movie_id: "tt1".into(),
            shows_input: vec![input("2024-01-01", &["18:00"]), input("2024-01-02", &["12:00"])],
            show_price: 10.0,
        };
        assert!(valid.validate().is_ok());
    }

    #[test]
    fn grouping_keys_by_calendar_date() {
        let day = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
        let shows = vec![
            Show::new("tt1", day + Duration::hours(21), 10.0),
            Show::new("tt1", day + Duration::hours(18), 10.0),
            Show::new("tt1", day + Duration::days(1) + Duration::hours(12), 10.0),
        ];
        let grouped = group_by_date(&shows);

        assert_eq!(grouped.keys().collect::<Vec<_>>(), vec!["2030-06-01", "2030-06-02"]);
        let first = &grouped["2030-06-01"];
        assert_eq!(first.len(), 2);
        assert!(first[0].time < first[1].time);
        assert_eq!(first[0].show_id, shows[1].id);
    }

    fn arb_shows() -> impl Strategy<Value = Vec<Show>> {
        let base = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        prop::collection::vec((0u8..5, 0i64..(60 * 24 * 14)), 0..40).prop_map(move |specs| {
            let mut shows: Vec<Show> = specs
                .into_iter()
                .map(|(movie, minutes)| {
                    Show::new(format!("tt{movie}"), base + Duration::minutes(minutes), 10.0)
                })
                .collect();
            shows.sort_by_key(|s| s.show_date_time);
            shows
        })
    }

    proptest! {
        #[test]
        fn distinct_ids_have_no_duplicates_and_follow_show_order(shows in arb_shows()) {
            let ids = distinct_movie_ids(&shows);
            let unique: HashSet<&String> = ids.iter().collect();
            prop_assert_eq!(unique.len(), ids.len());

            let first_seen: Vec<DateTime<Utc>> = ids
                .iter()
                .map(|id| shows.iter().find(|s| &s.movie == id).unwrap().show_date_time)
                .collect();
            prop_assert!(first_seen.windows(2).all(|w| w[0] <= w[1]));
        }

        #[test]
        fn grouping_keeps_every_show_and_no_empty_dates(shows in arb_shows()) {
            let grouped = group_by_date(&shows);
            prop_assert!(grouped.values().all(|times| !times.is_empty()));
            prop_assert_eq!(grouped.values().map(Vec::len).sum::<usize>(), shows.len());
            for (date, times) in &grouped {
                for t in times {
                    prop_assert_eq!(&t.time.date_naive().format("%Y-%m-%d").to_string(), date);
                }
            }
        }
    }
}
