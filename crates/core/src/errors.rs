use thiserror::Error;

use crate::domain::money::MoneyError;
use crate::lifecycle::OrderTransitionError;
use crate::pricing::CouponError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Coupon(#[from] CouponError),
    #[error(transparent)]
    Transition(#[from] OrderTransitionError),
    #[error(transparent)]
    Money(#[from] MoneyError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Coupon(error) => error.user_message(),
            Self::Transition(error) => error.user_message(),
            Self::Money(_) => "The amount entered is not valid.".to_owned(),
            Self::InvariantViolation(detail) => detail.clone(),
        }
    }
}

/// What a caller at the edge (CLI today) sees once a service call fails.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// Carries a message that is already safe to show.
    #[error("{0}")]
    NotFound(String),
    #[error("concurrent update conflict: {0}")]
    Conflict(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(_) => "domain_rejected",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Persistence(_) => "persistence",
            Self::Configuration(_) => "config_validation",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Domain(_) | Self::NotFound(_) | Self::Conflict(_) => 7,
            Self::Persistence(_) => 8,
            Self::Configuration(_) => 2,
        }
    }

    /// Domain rejections carry their own wording; infrastructure failures do
    /// not leak details.
    pub fn user_message(&self) -> String {
        match self {
            Self::Domain(error) => error.user_message(),
            Self::NotFound(message) => message.clone(),
            Self::Conflict(_) => {
                "The order was updated by someone else. Refresh and try again.".to_owned()
            }
            Self::Persistence(_) => {
                "The service is temporarily unavailable. Please retry shortly.".to_owned()
            }
            Self::Configuration(_) => "The service is misconfigured.".to_owned(),
        }
    }
}
