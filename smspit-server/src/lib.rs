//! SMSpit server library
//!
//! Captures outbound SMS sent by applications under test, keeps them in a
//! bounded in-memory store and pushes each capture to WebSocket subscribers.
//! Re-exported here so integration tests can drive a real server.

pub mod capture;
pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use capture::{
    CapturePipeline, SendRequest, SendResponse, TwilioSendRequest, TwilioSendResponse,
};
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use routes::{api_router, web_router};
pub use server::{shutdown_signal, Server};
pub use state::AppState;
