use crate::InferenceResponse;

/// Per-request UI flow: Idle -> Processing -> Displayed | Failed.
///
/// Only one request runs at a time; `start` is refused while one is in
/// flight and there is no queue.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestPhase {
    #[default]
    Idle,
    Processing,
    Displayed(InferenceResponse),
    Failed(String),
}

impl RequestPhase {
    pub fn start(&mut self) -> bool {
        if self.is_processing() {
            return false;
        }
        *self = RequestPhase::Processing;
        true
    }

    pub fn complete(&mut self, response: InferenceResponse) -> bool {
        if !self.is_processing() {
            return false;
        }
        *self = RequestPhase::Displayed(response);
        true
    }

    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if !self.is_processing() {
            return false;
        }
        *self = RequestPhase::Failed(message.into());
        true
    }

    /// Back to Idle, e.g. when a different image is chosen.
    pub fn reset(&mut self) -> bool {
        if self.is_processing() {
            return false;
        }
        *self = RequestPhase::Idle;
        true
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, RequestPhase::Processing)
    }

    pub fn response(&self) -> Option<&InferenceResponse> {
        match self {
            RequestPhase::Displayed(response) => Some(response),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RequestPhase::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> InferenceResponse {
        InferenceResponse {
            request_id: "r-1".into(),
            image_hash: "00".into(),
            width: 1,
            height: 1,
            outcomes: Vec::new(),
            elapsed_ms: 3,
            processed_at: "2024-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn happy_path_reaches_displayed() {
        let mut phase = RequestPhase::default();
        assert_eq!(phase, RequestPhase::Idle);
        assert!(phase.start());
        assert!(phase.is_processing());
        assert!(phase.complete(response()));
        assert_eq!(phase.response().map(|r| r.request_id.as_str()), Some("r-1"));
    }

    #[test]
    fn failure_is_shown_and_can_be_retried_manually() {
        let mut phase = RequestPhase::Idle;
        phase.start();
        assert!(phase.fail("Image could not be decoded"));
        assert_eq!(phase.error(), Some("Image could not be decoded"));
        assert!(phase.start());
    }

    #[test]
    fn no_second_request_while_processing() {
        let mut phase = RequestPhase::Idle;
        assert!(phase.start());
        assert!(!phase.start());
        assert!(!phase.reset());
        assert!(phase.is_processing());
    }

    #[test]
    fn completion_outside_processing_is_ignored() {
        let mut phase = RequestPhase::Idle;
        assert!(!phase.complete(response()));
        assert!(!phase.fail("late"));
        assert_eq!(phase, RequestPhase::Idle);
    }

    #[test]
    fn reset_clears_displayed_result() {
        let mut phase = RequestPhase::Processing;
        phase.complete(response());
        assert!(phase.reset());
        assert_eq!(phase, RequestPhase::Idle);
    }
}
