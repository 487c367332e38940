//! NewsCheck Server
//!
//! HTTP front end for the fake-news classifier: input validation, URL text
//! extraction, prediction logging and metrics around the inference core.

pub mod cli;
pub mod config;
pub mod extract;
pub mod routes;
pub mod state;

pub use cli::Cli;
pub use config::{FetchConfig, ServerConfig};
pub use extract::{ParagraphExtractor, UrlTextFetcher};
pub use routes::create_router;
pub use state::AppState;
