use std::fmt::Display;

use rouille::Response;

use crate::quiz::error::QuizError;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl From<QuizError> for ApiError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::NoSession => ApiError::NotFound(err.to_string()),

            QuizError::InvalidTransition { .. } | QuizError::SessionFinished => {
                ApiError::Conflict(err.to_string())
            }

            QuizError::InvalidVolume(_) => ApiError::BadRequest(err.to_string()),

            QuizError::AliasTable(_) | QuizError::Io(_) => {
                ApiError::Internal("internal server error".into())
            }
        }
    }
}

impl From<rouille::input::json::JsonError> for ApiError {
    fn from(err: rouille::input::json::JsonError) -> Self {
        ApiError::BadRequest(format!("invalid request body: {err}"))
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg) => write!(f, "{msg}"),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::BadRequest(_) => 400,
            ApiError::Conflict(_) => 409,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status_code();
        Response::text(self.to_string()).with_status_code(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::round::RoundPhase;

    #[test]
    fn test_quiz_errors_map_to_status_codes() {
        let cases = [
            (QuizError::NoSession, 404),
            (QuizError::SessionFinished, 409),
            (
                QuizError::InvalidTransition {
                    action: "submit",
                    phase: RoundPhase::Revealed,
                },
                409,
            ),
            (QuizError::InvalidVolume(2.0), 400),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_transition_message_names_phase() {
        let err = ApiError::from(QuizError::InvalidTransition {
            action: "pause",
            phase: RoundPhase::NotStarted,
        });

        assert_eq!(err.to_string(), "cannot pause while round is not started");
    }
}
