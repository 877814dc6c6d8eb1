//! Per-row processing
//!
//! The unit of failure containment: a failing row becomes a tagged
//! outcome, never an error that could stop the driver or disturb
//! previously accumulated results.

use crate::batch::RowOutcome;
use crate::client::CompletionBackend;
use crate::prompt;
use tracing::{debug, warn};

/// Compose the prompt for one row, invoke the completion backend, and
/// record the outcome.
pub async fn process_row(
    backend: &dyn CompletionBackend,
    model: &str,
    template: &str,
    value: &str,
    index: usize,
) -> RowOutcome {
    let composed = prompt::compose(template, value);
    debug!("Row {} prompt: {} chars", index, composed.len());

    match backend.complete(model, &composed).await {
        Ok(text) => RowOutcome::Ok(text),
        Err(e) => {
            let message = format!("API request failed on row {}: {}", index + 1, e);
            warn!("{}", message);
            RowOutcome::Failed { message }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CompletionError;
    use async_trait::async_trait;

    struct EchoBackend;

    #[async_trait]
    impl CompletionBackend for EchoBackend {
        async fn complete(
            &self,
            _model: &str,
            prompt: &str,
        ) -> Result<String, CompletionError> {
            Ok(format!("echo: {}", prompt))
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl CompletionBackend for FailingBackend {
        async fn complete(
            &self,
            _model: &str,
            _prompt: &str,
        ) -> Result<String, CompletionError> {
            Err(CompletionError::EmptyResponse)
        }
    }

    #[tokio::test]
    async fn test_successful_row() {
        let outcome = process_row(&EchoBackend, "m", "请总结", "合同条款一", 0).await;
        match outcome {
            RowOutcome::Ok(text) => {
                assert!(text.contains("请总结"));
                assert!(text.contains("合同条款一"));
            }
            other => panic!("Expected ok outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_row_carries_index_and_diagnostic() {
        let outcome = process_row(&FailingBackend, "m", "t", "v", 4).await;
        match outcome {
            RowOutcome::Failed { message } => {
                assert!(message.contains("row 5"));
                assert!(message.contains("empty response"));
            }
            other => panic!("Expected failed outcome, got {:?}", other),
        }
    }
}
