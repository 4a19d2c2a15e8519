//! booking.rs
//!
//! Бронирование мест: проверка запроса, атомарный захват мест в хранилище,
//! отмена, отметка об оплате и сводка для админки.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::Booking;
use crate::services::shows::{self, ShowDetails};
use crate::AppState;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[validate(length(min = 1, message = "showId is required"))]
    pub show_id: String,
    #[validate(length(min = 1, message = "selectedSeats must not be empty"))]
    pub selected_seats: Vec<String>,
}

/// Бронь вместе с сеансом и фильмом сеанса.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    pub id: Uuid,
    pub user: String,
    pub show: Option<ShowDetails>,
    pub amount: f64,
    pub booked_seats: Vec<String>,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub total_bookings: usize,
    pub total_revenue: f64,
    pub active_shows: Vec<ShowDetails>,
    pub total_user: usize,
}

pub fn parse_id(value: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(value.trim()).map_err(|_| AppError::Validation(format!("Invalid {what} `{value}`")))
}

/// Нормализует метки мест и отсекает дубликаты и превышение лимита.
pub fn validate_seats(state: &AppState, seats: &[String]) -> Result<Vec<String>> {
    if seats.is_empty() {
        return Err(AppError::Validation("No seats selected".to_string()));
    }
    let max = state.config.booking.max_seats_per_booking;
    if seats.len() > max {
        return Err(AppError::Validation(format!("At most {max} seats per booking")));
    }

    let mut unique = HashSet::new();
    let mut normalized = Vec::with_capacity(seats.len());
    for seat in seats {
        let label = state.layout.normalize(seat)?;
        if !unique.insert(label.clone()) {
            return Err(AppError::Validation(format!("Seat {label} selected twice")));
        }
        normalized.push(label);
    }
    Ok(normalized)
}

/// Занимает `seats` на сеансе для `holder`. Из двух параллельных вызовов на одно место
/// успешен только один, второй получает `SeatConflict`.
pub async fn book_seats(state: &AppState, show_id: Uuid, seats: &[String], holder: &str) -> Result<Booking> {
    let seats = validate_seats(state, seats)?;

    let show = state
        .shows
        .get_show(show_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Show not found: {show_id}")))?;
    if !show.is_upcoming(Utc::now()) {
        return Err(AppError::Validation("Show has already started".to_string()));
    }

    let booking = state.shows.book_seats(show_id, &seats, holder).await?;
    info!(
        booking_id = %booking.id,
        show_id = %show_id,
        "Booked {} seats for {}",
        booking.booked_seats.len(),
        holder
    );
    Ok(booking)
}

pub async fn create_booking(state: &AppState, request: CreateBookingRequest, holder: &str) -> Result<Booking> {
    request.validate()?;
    let show_id = parse_id(&request.show_id, "showId")?;
    book_seats(state, show_id, &request.selected_seats, holder).await
}

pub async fn occupied_seats(state: &AppState, show_id: Uuid) -> Result<Vec<String>> {
    let show = state
        .shows
        .get_show(show_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Show not found: {show_id}")))?;
    Ok(show.occupied_seats.into_keys().collect())
}

async fn owned_booking(state: &AppState, booking_id: Uuid, holder: &str) -> Result<Booking> {
    let booking = state
        .shows
        .get_booking(booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking not found: {booking_id}")))?;
    if booking.user != holder {
        return Err(AppError::Forbidden);
    }
    Ok(booking)
}

/// Снимает собственную бронь пользователя и освобождает места.
pub async fn cancel(state: &AppState, booking_id: Uuid, holder: &str) -> Result<Booking> {
    owned_booking(state, booking_id, holder).await?;
    let booking = state
        .shows
        .release_booking(booking_id, false)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking not found: {booking_id}")))?;
    info!(booking_id = %booking_id, "Booking cancelled, {} seats released", booking.booked_seats.len());
    Ok(booking)
}

// Сам платёжный провайдер за пределами сервиса, здесь только фиксация факта оплаты
pub async fn pay(state: &AppState, booking_id: Uuid, holder: &str) -> Result<Booking> {
    let mut booking = owned_booking(state, booking_id, holder).await?;
    if !booking.is_paid {
        if !state.shows.mark_paid(booking_id).await? {
            return Err(AppError::NotFound(format!("Booking not found: {booking_id}")));
        }
        booking.is_paid = true;
        info!(booking_id = %booking_id, "Booking paid");
    }
    Ok(booking)
}

async fn with_shows(state: &AppState, bookings: Vec<Booking>) -> Result<Vec<BookingDetails>> {
    let mut details = Vec::with_capacity(bookings.len());
    for booking in bookings {
        let show = match state.shows.get_show(booking.show).await? {
            Some(show) => shows::with_movies(state, vec![show]).await?.pop(),
            None => None,
        };
        details.push(BookingDetails {
            id: booking.id,
            user: booking.user,
            show,
            amount: booking.amount,
            booked_seats: booking.booked_seats,
            is_paid: booking.is_paid,
            created_at: booking.created_at,
        });
    }
    Ok(details)
}

pub async fn user_bookings(state: &AppState, holder: &str) -> Result<Vec<BookingDetails>> {
    let bookings = state.shows.bookings(Some(holder)).await?;
    with_shows(state, bookings).await
}

pub async fn all_bookings(state: &AppState) -> Result<Vec<BookingDetails>> {
    let bookings = state.shows.bookings(None).await?;
    with_shows(state, bookings).await
}

pub async fn dashboard(state: &AppState) -> Result<DashboardData> {
    let bookings = state.shows.bookings(None).await?;
    let paid: Vec<&Booking> = bookings.iter().filter(|b| b.is_paid).collect();
    let users: HashSet<&str> = bookings.iter().map(|b| b.user.as_str()).collect();

    Ok(DashboardData {
        total_bookings: paid.len(),
        total_revenue: paid.iter().map(|b| b.amount).sum(),
        total_user: users.len(),
        active_shows: shows::admin_shows(state).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{Movie, Show};
    use chrono::Duration;
    use std::sync::Arc;

    fn movie() -> Movie {
        Movie {
            id: "tt0133093".to_string(),
            title: "The Matrix".to_string(),
            overview: String::new(),
            poster_path: String::new(),
            backdrop_path: String::new(),
            release_date: "31 Mar 1999".to_string(),
            original_language: "English".to_string(),
            tagline: String::new(),
            genres: vec!["Action".to_string()],
            casts: vec![],
            vote_average: 8.7,
            runtime: 136,
        }
    }

    async fn state_with_show(starts_in: Duration) -> (Arc<AppState>, Uuid) {
        let state = AppState::in_memory(Config::default()).unwrap();
        state.movies.insert_movie_if_absent(movie()).await.unwrap();
        let show = Show::new("tt0133093", Utc::now() + starts_in, 10.0);
        let id = show.id;
        state.shows.insert_shows(vec![show]).await.unwrap();
        (state, id)
    }

    fn seats(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn seat_labels_are_normalised_and_checked() {
        let state = AppState::in_memory(Config::default()).unwrap();

        assert_eq!(validate_seats(&state, &seats(&["a1", " b02 "])).unwrap(), seats(&["A1", "B2"]));
        assert!(matches!(validate_seats(&state, &[]), Err(AppError::Validation(_))));
        assert!(matches!(
            validate_seats(&state, &seats(&["A1", "a1"])),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_seats(&state, &seats(&["A1", "A2", "A3", "A4", "A5", "A6"])),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(validate_seats(&state, &seats(&["Z1"])), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn booking_charges_price_per_seat_and_conflicts_after() {
        let (state, show_id) = state_with_show(Duration::days(1)).await;

        let booking = book_seats(&state, show_id, &seats(&["A1", "A2"]), "alice").await.unwrap();
        assert_eq!(booking.amount, 20.0);
        assert!(!booking.is_paid);

        let err = book_seats(&state, show_id, &seats(&["a2", "A3"]), "bob").await.unwrap_err();
        match err {
            AppError::SeatConflict { seats } => assert_eq!(seats, vec!["A2".to_string()]),
            other => panic!("expected conflict, got {other:?}"),
        }
        // Неудачная попытка не должна занять A3
        assert_eq!(occupied_seats(&state, show_id).await.unwrap(), seats(&["A1", "A2"]));
    }

    #[tokio::test]
    async fn started_and_unknown_shows_cannot_be_booked() {
        let (state, show_id) = state_with_show(Duration::hours(-1)).await;

        assert!(matches!(
            book_seats(&state, show_id, &seats(&["A1"]), "alice").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            book_seats(&state, Uuid::new_v4(), &seats(&["A1"]), "alice").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn only_the_owner_may_cancel_or_pay() {
        let (state, show_id) = state_with_show(Duration::days(1)).await;
        let booking = book_seats(&state, show_id, &seats(&["C3"]), "alice").await.unwrap();

        assert!(matches!(cancel(&state, booking.id, "bob").await, Err(AppError::Forbidden)));
        assert!(matches!(pay(&state, booking.id, "bob").await, Err(AppError::Forbidden)));

        let paid = pay(&state, booking.id, "alice").await.unwrap();
        assert!(paid.is_paid);

        cancel(&state, booking.id, "alice").await.unwrap();
        assert!(occupied_seats(&state, show_id).await.unwrap().is_empty());
        assert!(matches!(cancel(&state, booking.id, "alice").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn dashboard_counts_paid_bookings_only() {
        let (state, show_id) = state_with_show(Duration::days(1)).await;
        let first = book_seats(&state, show_id, &seats(&["A1", "A2"]), "alice").await.unwrap();
        book_seats(&state, show_id, &seats(&["B1"]), "bob").await.unwrap();
        pay(&state, first.id, "alice").await.unwrap();

        let data = dashboard(&state).await.unwrap();
        assert_eq!(data.total_bookings, 1);
        assert_eq!(data.total_revenue, 20.0);
        assert_eq!(data.total_user, 2);
        assert_eq!(data.active_shows.len(), 1);
        assert_eq!(data.active_shows[0].movie.title, "The Matrix");

        let mine = user_bookings(&state, "bob").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].show.as_ref().map(|s| s.id), Some(show_id));
    }
}
