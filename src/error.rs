// src/error.rs - Error taxonomy shared by the API client, stores and pipelines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Shop rules that reject a user action without touching state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusinessRule {
    InvalidCoupon,
    DuplicateReview,
    OutOfStock,
    EmptyCart,
}

impl fmt::Display for BusinessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCoupon => write!(f, "invalid_coupon"),
            Self::DuplicateReview => write!(f, "duplicate_review"),
            Self::OutOfStock => write!(f, "out_of_stock"),
            Self::EmptyCart => write!(f, "empty_cart"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Configuration {
        key: Option<String>,
        validation_errors: Vec<String>,
    },
    Manager {
        manager_name: String,
        operation: ManagerOperation,
    },
    Event {
        event_type: Option<String>,
        subscriber_id: Option<Uuid>,
        operation: EventOperation,
    },
    /// Form input rejected before anything is sent
    Validation {
        field: Option<String>,
        rules: Vec<String>,
    },
    /// Transport failure, the request never produced a status
    Network {
        endpoint: Option<String>,
    },
    /// Non-success status not covered by a more specific kind
    Http {
        status_code: u16,
        endpoint: Option<String>,
    },
    Authentication {
        reason: String,
    },
    Authorization {
        resource: String,
        action: String,
    },
    NotFound {
        resource: Option<String>,
    },
    Server {
        status_code: u16,
        endpoint: Option<String>,
    },
    BusinessRule {
        rule: BusinessRule,
    },
    Application,
    Io,
    Serialization,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManagerOperation {
    Initialize,
    Shutdown,
    Refresh,
    Operation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventOperation {
    Publish,
    Subscribe,
    Unsubscribe,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Error {
    pub id: Uuid,
    pub kind: ErrorKind,
    pub message: String,
    pub severity: ErrorSeverity,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: crate::types::Metadata,
    pub causes: Vec<String>,
}

impl Error {
    /// Creates a new error with the specified kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            severity: ErrorSeverity::Medium,
            source: "unknown".to_string(),
            timestamp: Utc::now(),
            metadata: std::collections::HashMap::new(),
            causes: Vec::new(),
        }
    }

    /// Sets the error severity
    pub fn severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the error source
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Adds metadata to the error
    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Adds a cause to the error chain
    pub fn caused_by(mut self, cause: impl fmt::Display) -> Self {
        self.causes.push(cause.to_string());
        self
    }

    /// HTTP status carried by the error, `Some(0)` for transport failures
    pub fn status_code(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::Network { .. } => Some(0),
            ErrorKind::Http { status_code, .. } | ErrorKind::Server { status_code, .. } => {
                Some(*status_code)
            }
            ErrorKind::Authentication { .. } if self.metadata.contains_key("status") => Some(401),
            ErrorKind::Authorization { .. } if self.metadata.contains_key("status") => Some(403),
            ErrorKind::NotFound { .. } if self.metadata.contains_key("status") => Some(404),
            _ => None,
        }
    }

    /// Maps a failed API response onto the error taxonomy
    pub fn from_status(status: u16, endpoint: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let error = match status {
            0 => Self::network(endpoint, message),
            401 => Self::authentication(message),
            403 => Self::authorization(endpoint, "request", message),
            404 => Self::not_found(endpoint, message),
            s if s >= 500 => Self::new(
                ErrorKind::Server {
                    status_code: s,
                    endpoint: Some(endpoint.to_string()),
                },
                message,
            )
            .severity(ErrorSeverity::High),
            s => Self::new(
                ErrorKind::Http {
                    status_code: s,
                    endpoint: Some(endpoint.to_string()),
                },
                message,
            ),
        };

        error
            .source("api")
            .metadata("status", serde_json::Value::from(status))
            .metadata("endpoint", serde_json::Value::String(endpoint.to_string()))
    }

    /// Creates a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Configuration {
                key: None,
                validation_errors: Vec::new(),
            },
            message,
        )
        .severity(ErrorSeverity::High)
    }

    /// Creates a manager operation error
    pub fn manager(
        manager_name: impl Into<String>,
        operation: ManagerOperation,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorKind::Manager {
                manager_name: manager_name.into(),
                operation,
            },
            message,
        )
        .severity(ErrorSeverity::High)
    }

    /// Creates a validation error for a single field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorKind::Validation {
                field: Some(field.into()),
                rules: vec![message.clone()],
            },
            message,
        )
        .severity(ErrorSeverity::Low)
    }

    /// Creates a transport error
    pub fn network(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Network {
                endpoint: Some(endpoint.into()),
            },
            message,
        )
    }

    /// Creates an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        let msg = message.into();
        Self::new(ErrorKind::Authentication { reason: msg.clone() }, msg)
            .severity(ErrorSeverity::High)
    }

    /// Creates an authorization error
    pub fn authorization(
        resource: impl Into<String>,
        action: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorKind::Authorization {
                resource: resource.into(),
                action: action.into(),
            },
            message,
        )
        .severity(ErrorSeverity::High)
    }

    /// Creates a not-found error
    pub fn not_found(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::NotFound {
                resource: Some(resource.into()),
            },
            message,
        )
    }

    /// Creates a business rule rejection
    pub fn business(rule: BusinessRule, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BusinessRule { rule }, message).severity(ErrorSeverity::Low)
    }

    /// Creates a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}): {}",
            self.severity, self.source, self.id, self.message
        )
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::Io, err.to_string())
            .source("std::io::Error")
            .severity(ErrorSeverity::High)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(err.to_string()).source("serde_json")
    }
}

/// Extension trait for Results to add context
pub trait ResultExt<T> {
    /// Adds context to an error
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| Error::new(ErrorKind::Application, f()).caused_by(e))
    }
}
