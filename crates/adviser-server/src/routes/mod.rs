// Export route modules
pub mod page;
pub mod render;
pub mod reply;

use crate::state::AppState;
use axum::Router;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(reply::routes(state))
        .merge(render::routes())
        .merge(page::routes())
}
