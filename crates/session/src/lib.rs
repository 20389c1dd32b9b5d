mod manager;
mod state;

pub use manager::{SessionConfig, SessionManager, TurnGuard};
pub use state::{SessionState, Turn};
