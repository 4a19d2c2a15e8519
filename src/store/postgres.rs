use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use super::{MovieStore, ShowStore};
use crate::error::{AppError, Result};
use crate::models::{Booking, Movie, OccupancyMap, Show};

const MOVIE_COLUMNS: &str = "id, title, overview, poster_path, backdrop_path, release_date, \
     original_language, tagline, genres, casts, vote_average, runtime";
const SHOW_COLUMNS: &str = "id, movie_id, show_date_time, show_price, occupied_seats";
const BOOKING_COLUMNS: &str = "id, user_id, show_id, amount, booked_seats, is_paid, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ShowRow {
    id: Uuid,
    movie_id: String,
    show_date_time: DateTime<Utc>,
    show_price: f64,
    occupied_seats: Json<OccupancyMap>,
}

impl From<ShowRow> for Show {
    fn from(row: ShowRow) -> Self {
        Show {
            id: row.id,
            movie: row.movie_id,
            show_date_time: row.show_date_time,
            show_price: row.show_price,
            occupied_seats: row.occupied_seats.0,
        }
    }
}

#[async_trait]
impl MovieStore for PgStore {
    async fn get_movie(&self, id: &str) -> Result<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn insert_movie_if_absent(&self, movie: Movie) -> Result<Movie> {
        // Запись никогда не обновляется: первый вставленный вариант остаётся навсегда
        sqlx::query(&format!(
            "INSERT INTO movies ({MOVIE_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             ON CONFLICT (id) DO NOTHING"
        ))
        .bind(&movie.id)
        .bind(&movie.title)
        .bind(&movie.overview)
        .bind(&movie.poster_path)
        .bind(&movie.backdrop_path)
        .bind(&movie.release_date)
        .bind(&movie.original_language)
        .bind(&movie.tagline)
        .bind(&movie.genres)
        .bind(&movie.casts)
        .bind(movie.vote_average)
        .bind(movie.runtime)
        .execute(&self.pool)
        .await?;

        self.get_movie(&movie.id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("movie {} vanished after insert", movie.id)))
    }
}

#[async_trait]
impl ShowStore for PgStore {
    async fn insert_shows(&self, shows: Vec<Show>) -> Result<usize> {
        if shows.is_empty() {
            return Ok(0);
        }

        let ids: Vec<Uuid> = shows.iter().map(|s| s.id).collect();
        let movies: Vec<String> = shows.iter().map(|s| s.movie.clone()).collect();
        let times: Vec<DateTime<Utc>> = shows.iter().map(|s| s.show_date_time).collect();
        let prices: Vec<f64> = shows.iter().map(|s| s.show_price).collect();

        // Один INSERT через UNNEST: либо все сеансы, либо ни одного
        let result = sqlx::query(
            "INSERT INTO shows (id, movie_id, show_date_time, show_price)
             SELECT * FROM UNNEST($1::uuid[], $2::text[], $3::timestamptz[], $4::float8[])",
        )
        .bind(&ids)
        .bind(&movies)
        .bind(&times)
        .bind(&prices)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() as usize),
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => Err(
                AppError::NotFound(format!("Movie not found: {}", movies[0])),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_show(&self, id: Uuid) -> Result<Option<Show>> {
        let row = sqlx::query_as::<_, ShowRow>(&format!(
            "SELECT {SHOW_COLUMNS} FROM shows WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Show::from))
    }

    async fn upcoming_shows(&self, now: DateTime<Utc>, movie_id: Option<&str>) -> Result<Vec<Show>> {
        let rows = sqlx::query_as::<_, ShowRow>(&format!(
            "SELECT {SHOW_COLUMNS} FROM shows
             WHERE show_date_time >= $1 AND ($2::text IS NULL OR movie_id = $2)
             ORDER BY show_date_time, id"
        ))
        .bind(now)
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Show::from).collect())
    }

    async fn book_seats(&self, show_id: Uuid, seats: &[String], holder: &str) -> Result<Booking> {
        let claim: OccupancyMap = seats
            .iter()
            .map(|seat| (seat.clone(), holder.to_string()))
            .collect();

        let mut tx = self.pool.begin().await?;

        // Условный UPDATE блокирует строку сеанса: конкурентная транзакция после нашего
        // коммита перечитает occupied_seats и не пройдёт проверку `?|`
        let price: Option<f64> = sqlx::query_scalar(
            "UPDATE shows
             SET occupied_seats = occupied_seats || $2
             WHERE id = $1 AND NOT (occupied_seats ?| $3)
             RETURNING show_price",
        )
        .bind(show_id)
        .bind(Json(&claim))
        .bind(seats)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(price) = price else {
            let current: Option<Json<OccupancyMap>> =
                sqlx::query_scalar("SELECT occupied_seats FROM shows WHERE id = $1")
                    .bind(show_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            let _ = tx.rollback().await;

            let Some(Json(occupied)) = current else {
                return Err(AppError::NotFound(format!("Show not found: {show_id}")));
            };
            let mut taken: Vec<String> = seats
                .iter()
                .filter(|seat| occupied.contains_key(seat.as_str()))
                .cloned()
                .collect();
            if taken.is_empty() {
                taken = seats.to_vec();
            }
            return Err(AppError::SeatConflict { seats: taken });
        };

        let booking = Booking::new(holder, show_id, price, seats.to_vec());
        sqlx::query(&format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(booking.id)
        .bind(&booking.user)
        .bind(booking.show)
        .bind(booking.amount)
        .bind(&booking.booked_seats)
        .bind(booking.is_paid)
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(booking)
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn bookings(&self, user: Option<&str>) -> Result<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE ($1::text IS NULL OR user_id = $1)
             ORDER BY created_at DESC"
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        Ok(bookings)
    }

    async fn release_booking(&self, id: Uuid, unpaid_only: bool) -> Result<Option<Booking>> {
        let mut tx = self.pool.begin().await?;

        let booking = sqlx::query_as::<_, Booking>(&format!(
            "DELETE FROM bookings WHERE id = $1 AND (NOT $2 OR is_paid = FALSE)
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id)
        .bind(unpaid_only)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(ref booking) = booking {
            sqlx::query("UPDATE shows SET occupied_seats = occupied_seats - $2::text[] WHERE id = $1")
                .bind(booking.show)
                .bind(&booking.booked_seats)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(booking)
    }

    async fn mark_paid(&self, id: Uuid) -> Result<bool> {
        let done = sqlx::query("UPDATE bookings SET is_paid = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn expired_unpaid(&self, cutoff: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM bookings WHERE is_paid = FALSE AND created_at < $1",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
