use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{MovieStore, ShowStore};
use crate::error::{AppError, Result};
use crate::models::{Booking, Movie, Show};

#[derive(Default)]
struct Inner {
    movies: HashMap<String, Movie>,
    shows: HashMap<Uuid, Show>,
    bookings: HashMap<Uuid, Booking>,
}

/// Одна блокировка на всё: захват мест и запись брони происходят вместе.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MovieStore for MemoryStore {
    async fn get_movie(&self, id: &str) -> Result<Option<Movie>> {
        Ok(self.inner.read().await.movies.get(id).cloned())
    }

    async fn insert_movie_if_absent(&self, movie: Movie) -> Result<Movie> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .movies
            .entry(movie.id.clone())
            .or_insert(movie)
            .clone())
    }
}

#[async_trait]
impl ShowStore for MemoryStore {
    async fn insert_shows(&self, shows: Vec<Show>) -> Result<usize> {
        let mut inner = self.inner.write().await;
        if let Some(orphan) = shows.iter().find(|s| !inner.movies.contains_key(&s.movie)) {
            return Err(AppError::NotFound(format!("Movie not found: {}", orphan.movie)));
        }

        let count = shows.len();
        for show in shows {
            inner.shows.insert(show.id, show);
        }
        Ok(count)
    }

    async fn get_show(&self, id: Uuid) -> Result<Option<Show>> {
        Ok(self.inner.read().await.shows.get(&id).cloned())
    }

    async fn upcoming_shows(&self, now: DateTime<Utc>, movie_id: Option<&str>) -> Result<Vec<Show>> {
        let inner = self.inner.read().await;
        let mut shows: Vec<Show> = inner
            .shows
            .values()
            .filter(|s| s.is_upcoming(now))
            .filter(|s| movie_id.map_or(true, |id| s.movie == id))
            .cloned()
            .collect();
        shows.sort_by_key(|s| (s.show_date_time, s.id));
        Ok(shows)
    }

    async fn book_seats(&self, show_id: Uuid, seats: &[String], holder: &str) -> Result<Booking> {
        let mut inner = self.inner.write().await;
        let show = inner
            .shows
            .get_mut(&show_id)
            .ok_or_else(|| AppError::NotFound(format!("Show not found: {show_id}")))?;

        show.claim_seats(seats, holder)?;
        let booking = Booking::new(holder, show_id, show.show_price, seats.to_vec());
        inner.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>> {
        Ok(self.inner.read().await.bookings.get(&id).cloned())
    }

    async fn bookings(&self, user: Option<&str>) -> Result<Vec<Booking>> {
        let inner = self.inner.read().await;
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| user.map_or(true, |u| b.user == u))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn release_booking(&self, id: Uuid, unpaid_only: bool) -> Result<Option<Booking>> {
        let mut inner = self.inner.write().await;
        match inner.bookings.get(&id) {
            Some(booking) if unpaid_only && booking.is_paid => return Ok(None),
            None => return Ok(None),
            Some(_) => {}
        }
        let Some(booking) = inner.bookings.remove(&id) else {
            return Ok(None);
        };
        if let Some(show) = inner.shows.get_mut(&booking.show) {
            show.release_seats(&booking.booked_seats);
        }
        Ok(Some(booking))
    }

    async fn mark_paid(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(match inner.bookings.get_mut(&id) {
            Some(booking) => {
                booking.is_paid = true;
                true
            }
            None => false,
        })
    }

    async fn expired_unpaid(&self, cutoff: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let inner = self.inner.read().await;
        Ok(inner
            .bookings
            .values()
            .filter(|b| !b.is_paid && b.created_at < cutoff)
            .map(|b| b.id)
            .collect())
    }
}
