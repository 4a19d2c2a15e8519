use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Метка места -> id пользователя, занявшего его.
pub type OccupancyMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    pub id: Uuid,
    /// Внешний id фильма.
    pub movie: String,
    pub show_date_time: DateTime<Utc>,
    pub show_price: f64,
    pub occupied_seats: OccupancyMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowStatus {
    Scheduled,
    PartiallyBooked,
    FullyBooked,
}

impl Show {
    pub fn new(movie: impl Into<String>, show_date_time: DateTime<Utc>, show_price: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            movie: movie.into(),
            show_date_time,
            show_price,
            occupied_seats: OccupancyMap::new(),
        }
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.show_date_time >= now
    }

    /// Всё или ничего: либо все места свободны и занимаются, либо ничего не меняется.
    pub fn claim_seats(&mut self, seats: &[String], holder: &str) -> Result<()> {
        let taken: Vec<String> = seats
            .iter()
            .filter(|seat| self.occupied_seats.contains_key(seat.as_str()))
            .cloned()
            .collect();
        if !taken.is_empty() {
            return Err(AppError::SeatConflict { seats: taken });
        }

        for seat in seats {
            self.occupied_seats.insert(seat.clone(), holder.to_string());
        }
        Ok(())
    }

    pub fn release_seats(&mut self, seats: &[String]) {
        for seat in seats {
            self.occupied_seats.remove(seat);
        }
    }

    pub fn status(&self, capacity: usize) -> ShowStatus {
        match self.occupied_seats.len() {
            0 => ShowStatus::Scheduled,
            n if n >= capacity => ShowStatus::FullyBooked,
            _ => ShowStatus::PartiallyBooked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn show() -> Show {
        Show::new("tt0111161", Utc.with_ymd_and_hms(2030, 5, 1, 18, 0, 0).unwrap(), 12.5)
    }

    fn seats(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn new_show_has_empty_occupancy() {
        let show = show();
        assert!(show.occupied_seats.is_empty());
        assert_eq!(show.status(90), ShowStatus::Scheduled);
    }

    #[test]
    fn free_seats_are_claimed() {
        let mut show = show();
        show.claim_seats(&seats(&["A1", "A2"]), "user_1").unwrap();
        assert_eq!(show.occupied_seats.get("A1").map(String::as_str), Some("user_1"));
        assert_eq!(show.occupied_seats.len(), 2);
    }

    #[test]
    fn conflicting_claim_changes_nothing() {
        let mut show = show();
        show.claim_seats(&seats(&["A1"]), "user_1").unwrap();

        let err = show.claim_seats(&seats(&["A2", "A1"]), "user_2").unwrap_err();
        match err {
            AppError::SeatConflict { seats } => assert_eq!(seats, vec!["A1".to_string()]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!show.occupied_seats.contains_key("A2"));
        assert_eq!(show.occupied_seats.get("A1").map(String::as_str), Some("user_1"));
    }

    #[test]
    fn status_follows_fill_ratio() {
        let mut show = show();
        show.claim_seats(&seats(&["A1"]), "u").unwrap();
        assert_eq!(show.status(2), ShowStatus::PartiallyBooked);
        show.claim_seats(&seats(&["A2"]), "u").unwrap();
        assert_eq!(show.status(2), ShowStatus::FullyBooked);
        show.release_seats(&seats(&["A1", "A2"]));
        assert_eq!(show.status(2), ShowStatus::Scheduled);
    }
}
