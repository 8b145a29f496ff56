//! HTTP server layer for WebPics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │        GET /  ·  POST /upload  ·  /login  ·  /admin  ·  ...     │
//! │                                                                 │
//! │  ┌───────────┐  ┌──────────────┐  ┌──────────┐  ┌────────────┐  │
//! │  │ handlers  │  │     auth     │  │  pages   │  │   routes   │  │
//! │  │(requests) │  │(session, ext)│  │  (HTML)  │  │  (router)  │  │
//! │  └───────────┘  └──────────────┘  └──────────┘  └────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod pages;
pub mod routes;

pub use auth::{
    AdminUser, AuthError, CurrentUser, MaybeUser, Session, SessionSigner, DEFAULT_SESSION_TTL,
    SESSION_COOKIE,
};
pub use handlers::{
    health_handler, AppState, ErrorResponse, HealthResponse, PageError, SessionResponse,
};
pub use routes::{create_router, RouterConfig, DEFAULT_MAX_UPLOAD_BYTES};
