pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;
pub mod state;

pub use error::{ApiError, ErrorResponse};
pub use router::build_router;
pub use server::{GatewayServer, open_store};
pub use state::{AppState, SharedState};
