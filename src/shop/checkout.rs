// src/shop/checkout.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::error::{Error, ErrorKind};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub phone: String,
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Card,
    Upi,
    Cod,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Card => "card",
            Self::Upi => "upi",
            Self::Cod => "cod",
        })
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" => Ok(Self::Card),
            "upi" => Ok(Self::Upi),
            "cod" => Ok(Self::Cod),
            other => Err(format!("unknown payment method '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum FieldError {
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },
    #[error("phone must be exactly 10 digits")]
    InvalidPhone,
    #[error("pincode must be 6 digits and cannot start with 0")]
    InvalidPincode,
}

impl FieldError {
    pub fn field(&self) -> &'static str {
        match self {
            Self::Required { field } | Self::TooShort { field, .. } => field,
            Self::InvalidPhone => "phone",
            Self::InvalidPincode => "pincode",
        }
    }
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

/// Every problem with the shipping form, in field order
pub fn validate_address(address: &Address) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let name = address.name.trim();
    if name.is_empty() {
        errors.push(FieldError::Required { field: "name" });
    } else if name.chars().count() < 2 {
        errors.push(FieldError::TooShort {
            field: "name",
            min: 2,
        });
    }

    if address.phone.is_empty() {
        errors.push(FieldError::Required { field: "phone" });
    } else if !is_digits(&address.phone, 10) {
        errors.push(FieldError::InvalidPhone);
    }

    for (field, value) in [
        ("line1", &address.line1),
        ("city", &address.city),
        ("state", &address.state),
    ] {
        if value.trim().is_empty() {
            errors.push(FieldError::Required { field });
        }
    }

    if address.pincode.is_empty() {
        errors.push(FieldError::Required { field: "pincode" });
    } else if !is_digits(&address.pincode, 6) || address.pincode.starts_with('0') {
        errors.push(FieldError::InvalidPincode);
    }

    errors
}

impl From<Vec<FieldError>> for Error {
    fn from(errors: Vec<FieldError>) -> Self {
        let rules: Vec<String> = errors.iter().map(ToString::to_string).collect();
        let message = rules
            .first()
            .cloned()
            .unwrap_or_else(|| "Invalid form".to_string());
        Error::new(
            ErrorKind::Validation {
                field: errors.first().map(|e| e.field().to_string()),
                rules,
            },
            message,
        )
        .severity(crate::error::ErrorSeverity::Low)
    }
}

#[cfg(test)]
pub(crate) fn sample_address() -> Address {
    Address {
        name: "Asha Rao".into(),
        phone: "9876543210".into(),
        line1: "12 MG Road".into(),
        line2: String::new(),
        city: "Pune".into(),
        state: "MH".into(),
        pincode: "411001".into(),
    }
}
