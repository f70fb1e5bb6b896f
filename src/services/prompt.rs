// src/services/prompt.rs

use async_trait::async_trait;

/// Blocking yes/no question put to the candidate before a manual submit.
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

/// The exam page shows the dialog itself and reports the answer in the
/// submit request.
#[derive(Debug, Clone, Copy)]
pub struct RequestConfirmation {
    confirmed: bool,
}

impl RequestConfirmation {
    pub fn new(confirmed: bool) -> Self {
        Self { confirmed }
    }
}

#[async_trait]
impl ConfirmationPrompt for RequestConfirmation {
    async fn confirm(&self, message: &str) -> bool {
        tracing::debug!(confirmed = self.confirmed, "Confirmation prompt: {}", message);
        self.confirmed
    }
}
