//! # verso
//!
//! Client-side session control for a remote genetic algorithm that evolves a
//! population of strings toward a target phrase.
//!
//! The GA itself runs in an external HTTP service. This crate owns everything on
//! the client side of that boundary:
//!
//! - [`client`]: the [`GaService`](client::GaService) contract the controller
//!   talks to, plus the reqwest-backed [`HttpGaClient`](http::HttpGaClient)
//! - [`session`]: the [`SessionState`](session::SessionState) record and its
//!   lifecycle transitions
//! - [`controller`]: the polling loop that drives a session and reconciles each
//!   tick into state
//! - [`chart`]: fitness-history chart layout, painted by [`svg`] here and by a
//!   canvas painter in `verso_web`
//!
//! ## Quick Start
//!
//! ```no_run
//! # #[cfg(feature = "native")]
//! # async fn demo() -> Result<(), verso::SessionError> {
//! use std::time::Duration;
//! use verso::prelude::*;
//!
//! let client = HttpGaClient::new("http://localhost:8000");
//! let options = ControllerOptions::default().with_poll_interval(Duration::from_millis(100));
//! let controller = SessionController::new(client, TokioRuntime, options);
//!
//! controller.subscribe(|state| println!("generation {}", state.generation));
//! controller.start("to be or not to be", GaConfig::default()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `http` (default): reqwest client for the GA service
//! - `native`: tokio runtime adapter and the `verso-cli` binary

#[path = "core/types.rs"]
pub mod types;

#[path = "core/error.rs"]
pub mod error;

#[path = "core/client.rs"]
pub mod client;

#[cfg(feature = "http")]
#[path = "core/http.rs"]
pub mod http;

#[path = "core/session.rs"]
pub mod session;

#[path = "core/runtime.rs"]
pub mod runtime;

#[path = "core/controller.rs"]
pub mod controller;

#[path = "core/chart.rs"]
pub mod chart;

#[path = "core/svg.rs"]
pub mod svg;

#[path = "core/config.rs"]
pub mod config;

pub use error::{ClientError, SessionError};

pub mod prelude {
    pub use crate::chart::{ChartLayout, ChartScene};
    pub use crate::client::GaService;
    pub use crate::controller::{ControllerOptions, SessionController, TickOverlap};
    pub use crate::error::{ClientError, SessionError};
    #[cfg(feature = "http")]
    pub use crate::http::HttpGaClient;
    #[cfg(any(test, feature = "native"))]
    pub use crate::runtime::TokioRuntime;
    pub use crate::runtime::{PollLoop, Runtime};
    pub use crate::session::{Phase, SessionState};
    pub use crate::types::{GaConfig, HistoryEntry, Individual, Statistics};
}
