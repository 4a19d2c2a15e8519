pub mod booking;
pub mod movie;
pub mod seat;
pub mod show;

pub use booking::Booking;
pub use movie::Movie;
pub use seat::SeatLayout;
pub use show::{OccupancyMap, Show, ShowStatus};
