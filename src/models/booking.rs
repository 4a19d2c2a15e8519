use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    #[sqlx(rename = "user_id")]
    pub user: String,
    #[sqlx(rename = "show_id")]
    pub show: Uuid,
    pub amount: f64,
    pub booked_seats: Vec<String>,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(user: &str, show: Uuid, price: f64, seats: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user: user.to_string(),
            show,
            amount: price * seats.len() as f64,
            booked_seats: seats,
            is_paid: false,
            created_at: Utc::now(),
        }
    }
}
