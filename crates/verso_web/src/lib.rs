//! Browser front-end for the GA session controller.
//!
//! Native builds only carry [`ui_model`], the form and display helpers the app
//! renders with, so they can be tested on the host. The Leptos app itself needs
//! `--features web` on a wasm32 target.

pub mod ui_model;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
mod web;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub use web::start;
