use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{CollaboratorFailure, CoreError, CoreResult};
use crate::repository::StoreResult;

/// Point in time by which every collaborator call of a request must finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Some(Instant::now() + timeout),
        }
    }

    pub fn unbounded() -> Self {
        Self { at: None }
    }

    /// Run a collaborator call, turning both its failure and a missed deadline
    /// into [`CoreError::CollaboratorUnavailable`].
    pub async fn run<T, F>(&self, collaborator: &'static str, call: F) -> CoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        let outcome = match self.at {
            Some(at) => match tokio::time::timeout_at(at, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(collaborator, "collaborator call exceeded deadline");
                    return Err(CoreError::CollaboratorUnavailable {
                        collaborator,
                        failure: CollaboratorFailure::Timeout,
                    });
                }
            },
            None => call.await,
        };

        outcome.map_err(|e| {
            tracing::error!(collaborator, error = %e, "collaborator call failed");
            CoreError::CollaboratorUnavailable {
                collaborator,
                failure: CollaboratorFailure::Fault,
            }
        })
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::unbounded()
    }
}
