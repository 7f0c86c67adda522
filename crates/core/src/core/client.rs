//! The operations the session controller needs from a GA service.

use std::rc::Rc;

use crate::error::ClientError;
use crate::types::{EvolveResponse, HistoryEntry, Individual, InitializeRequest};

/// Request/response contract of the remote GA service.
///
/// Futures are not `Send`: the controller runs on a single-threaded
/// executor and the browser implementation wraps `fetch`.
#[allow(async_fn_in_trait)]
pub trait GaService {
    /// Start a fresh GA run and return its initial population.
    async fn initialize(&self, request: &InitializeRequest)
        -> Result<Vec<Individual>, ClientError>;

    /// Advance the run by `generations` (the controller always asks for one).
    async fn evolve(&self, generations: u32) -> Result<EvolveResponse, ClientError>;

    /// Full history, oldest generation first.
    async fn history(&self) -> Result<Vec<HistoryEntry>, ClientError>;

    /// Best individual seen so far in the run, if any.
    async fn best(&self) -> Result<Option<Individual>, ClientError>;

    async fn reset(&self) -> Result<(), ClientError>;

    async fn health(&self) -> Result<(), ClientError>;
}

impl<T: GaService> GaService for Rc<T> {
    async fn initialize(
        &self,
        request: &InitializeRequest,
    ) -> Result<Vec<Individual>, ClientError> {
        (**self).initialize(request).await
    }

    async fn evolve(&self, generations: u32) -> Result<EvolveResponse, ClientError> {
        (**self).evolve(generations).await
    }

    async fn history(&self) -> Result<Vec<HistoryEntry>, ClientError> {
        (**self).history().await
    }

    async fn best(&self) -> Result<Option<Individual>, ClientError> {
        (**self).best().await
    }

    async fn reset(&self) -> Result<(), ClientError> {
        (**self).reset().await
    }

    async fn health(&self) -> Result<(), ClientError> {
        (**self).health().await
    }
}
