use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("no eligible recipients: grantor `{grantor}` may not give kudos to themselves")]
    NoEligibleRecipients { grantor: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl ApplicationError {
    /// Text safe to show a Slack user; internal detail stays in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::NoEligibleRecipients { .. }) => {
                "🚫 You can't give kudos to yourself."
            }
            Self::Persistence(_) => {
                "Your kudos could not be recorded right now. Please retry shortly."
            }
        }
    }
}
