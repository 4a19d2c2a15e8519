pub mod admin;
pub mod bookings;
pub mod shows;
pub mod user;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .nest("/show", shows::routes())
        .nest("/booking", bookings::routes())
        .nest("/user", user::routes())
        .nest("/admin", admin::routes())
}
