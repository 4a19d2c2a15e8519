pub mod booking;
pub mod catalog;
pub mod circuit_breaker;
pub mod cleanup;
pub mod shows;
