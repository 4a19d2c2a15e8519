//! Хранилища фильмов, сеансов и бронирований.
//!
//! Две реализации с одинаковой семантикой:
//! - [`PgStore`]: PostgreSQL, бронирование мест через условный атомарный UPDATE;
//! - [`MemoryStore`]: in-memory, для разработки без базы и для тестов.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Booking, Movie, Show};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait MovieStore: Send + Sync {
    async fn get_movie(&self, id: &str) -> Result<Option<Movie>>;

    /// Идемпотентно по внешнему id: существующая запись возвращается без изменений.
    async fn insert_movie_if_absent(&self, movie: Movie) -> Result<Movie>;
}

#[async_trait]
pub trait ShowStore: Send + Sync {
    /// `NotFound`, если хотя бы один сеанс ссылается на неизвестный фильм; тогда не вставляется ничего.
    async fn insert_shows(&self, shows: Vec<Show>) -> Result<usize>;

    async fn get_show(&self, id: Uuid) -> Result<Option<Show>>;

    /// Сеансы начиная с `now`, по возрастанию времени.
    async fn upcoming_shows(&self, now: DateTime<Utc>, movie_id: Option<&str>) -> Result<Vec<Show>>;

    /// Атомарно занимает `seats` для `holder` и записывает бронь.
    /// Из параллельных вызовов на одно место выигрывает ровно один, остальные получают `SeatConflict`.
    async fn book_seats(&self, show_id: Uuid, seats: &[String], holder: &str) -> Result<Booking>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>>;

    /// Сначала новые.
    async fn bookings(&self, user: Option<&str>) -> Result<Vec<Booking>>;

    /// Освобождает места брони и удаляет её. `None`, если брони уже нет
    /// или задан `unpaid_only`, а бронь оплачена.
    async fn release_booking(&self, id: Uuid, unpaid_only: bool) -> Result<Option<Booking>>;

    async fn mark_paid(&self, id: Uuid) -> Result<bool>;

    async fn expired_unpaid(&self, cutoff: DateTime<Utc>) -> Result<Vec<Uuid>>;
}
