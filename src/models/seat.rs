use std::collections::HashSet;

use crate::config::BookingConfig;
use crate::error::{AppError, Result};

/// Схема зала: ряды обозначены буквами, места номерами (`A1` .. `J9`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatLayout {
    rows: Vec<char>,
    seats_per_row: u32,
}

impl SeatLayout {
    pub fn new(rows: &str, seats_per_row: u32) -> Self {
        let mut letters: Vec<char> = rows
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        // Повтор буквы не добавляет ряд, порядок первых вхождений сохраняется
        let mut seen = HashSet::new();
        letters.retain(|c| seen.insert(*c));
        Self {
            rows: letters,
            seats_per_row,
        }
    }

    pub fn from_config(config: &BookingConfig) -> Self {
        Self::new(&config.seat_rows, config.seats_per_row)
    }

    pub fn capacity(&self) -> usize {
        self.rows.len() * self.seats_per_row as usize
    }

    /// Приводит метку места к каноническому виду (`b07` -> `B7`) или возвращает ошибку валидации
    pub fn normalize(&self, label: &str) -> Result<String> {
        let label = label.trim();
        let invalid = || AppError::Validation(format!("Invalid seat `{label}`"));

        let mut chars = label.chars();
        let row = chars.next().ok_or_else(invalid)?.to_ascii_uppercase();
        if !self.rows.contains(&row) {
            return Err(invalid());
        }

        let number: u32 = chars.as_str().parse().map_err(|_| invalid())?;
        if number == 0 || number > self.seats_per_row {
            return Err(invalid());
        }

        Ok(format!("{row}{number}"))
    }
}
