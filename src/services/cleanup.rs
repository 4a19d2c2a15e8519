use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::AppState;

/// Освобождает места неоплаченных бронирований, которые висят дольше `hold_minutes`.
pub struct CleanupService {
    state: Arc<AppState>,
}

impl CleanupService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Возвращает число снятых броней.
    pub async fn release_expired_holds(&self) -> usize {
        let hold_minutes = self.state.config.booking.hold_minutes;
        let Some(cutoff) = ChronoDuration::try_minutes(hold_minutes)
            .and_then(|hold| Utc::now().checked_sub_signed(hold))
        else {
            error!("Hold duration of {} minutes is out of range, skipping cleanup", hold_minutes);
            return 0;
        };

        let expired = match self.state.shows.expired_unpaid(cutoff).await {
            Ok(ids) => ids,
            Err(e) => {
                error!("Failed to load expired bookings: {}", e);
                return 0;
            }
        };
        if expired.is_empty() {
            return 0;
        }

        let mut released = 0;
        for booking_id in expired {
            match self.state.shows.release_booking(booking_id, true).await {
                Ok(Some(booking)) => {
                    released += 1;
                    info!(
                        booking_id = %booking_id,
                        "Unpaid booking expired, {} seats released",
                        booking.booked_seats.len()
                    );
                }
                // Уже отменено или оплачено параллельно
                Ok(None) => {}
                Err(e) => error!(booking_id = %booking_id, "Failed to release expired booking: {}", e),
            }
        }
        released
    }

    pub fn spawn(self) -> JoinHandle<()> {
        let period = Duration::from_secs(self.state.config.booking.cleanup_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.release_expired_holds().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{Movie, Show};

    fn movie(id: &str) -> Movie {
        Movie {
            id: id.to_string(),
            title: "Heat".to_string(),
            overview: String::new(),
            poster_path: String::new(),
            backdrop_path: String::new(),
            release_date: String::new(),
            original_language: String::new(),
            tagline: String::new(),
            genres: vec![],
            casts: vec![],
            vote_average: 0.0,
            runtime: 170,
        }
    }

    #[tokio::test]
    async fn stale_unpaid_holds_are_released_paid_ones_stay() {
        let mut config = Config::default();
        config.booking.hold_minutes = 0;
        let state = AppState::in_memory(config).unwrap();

        state.movies.insert_movie_if_absent(movie("tt0113277")).await.unwrap();
        let show = Show::new("tt0113277", Utc::now() + ChronoDuration::days(1), 12.0);
        let show_id = show.id;
        state.shows.insert_shows(vec![show]).await.unwrap();

        let unpaid = state.shows.book_seats(show_id, &["A1".to_string()], "u1").await.unwrap();
        let paid = state.shows.book_seats(show_id, &["A2".to_string()], "u2").await.unwrap();
        state.shows.mark_paid(paid.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let cleanup = CleanupService::new(state.clone());
        assert_eq!(cleanup.release_expired_holds().await, 1);

        assert!(state.shows.get_booking(unpaid.id).await.unwrap().is_none());
        let show = state.shows.get_show(show_id).await.unwrap().unwrap();
        assert_eq!(show.occupied_seats.keys().collect::<Vec<_>>(), vec!["A2"]);

        assert_eq!(cleanup.release_expired_holds().await, 0);
    }

    #[tokio::test]
    async fn out_of_range_hold_skips_cleanup_instead_of_panicking() {
        let mut config = Config::default();
        config.booking.hold_minutes = i64::MAX;
        let state = AppState::in_memory(config).unwrap();

        state.movies.insert_movie_if_absent(movie("tt0113277")).await.unwrap();
        let show = Show::new("tt0113277", Utc::now() + ChronoDuration::days(1), 12.0);
        let show_id = show.id;
        state.shows.insert_shows(vec![show]).await.unwrap();
        let booking = state.shows.book_seats(show_id, &["A1".to_string()], "u1").await.unwrap();

        assert_eq!(CleanupService::new(state.clone()).release_expired_holds().await, 0);
        assert!(state.shows.get_booking(booking.id).await.unwrap().is_some());
    }
}
