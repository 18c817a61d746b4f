use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::utils::errors::AppError;

/// Symbols accepted by the password complexity rule.
pub const PASSWORD_SYMBOLS: &str = "!@#$%^&*()-_=+[]{};:'\",.<>/?";

/// Password complexity: at least 8 characters with one uppercase letter,
/// one lowercase letter, one digit, and one symbol from [`PASSWORD_SYMBOLS`].
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let long_enough = password.len() >= 8;
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| PASSWORD_SYMBOLS.contains(c));

    if long_enough && has_upper && has_lower && has_digit && has_symbol {
        return Ok(());
    }

    let mut error = ValidationError::new("password_strength");
    error.message = Some(
        "password must be at least 8 characters and include an uppercase letter, \
         a lowercase letter, a digit, and a symbol"
            .into(),
    );
    Err(error)
}

/// JSON extractor that deserializes and validates the payload, reporting
/// every violated field.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                let error_msg = rejection.body_text();

                if error_msg.contains("missing field") {
                    let field = error_msg
                        .split("missing field `")
                        .nth(1)
                        .and_then(|s| s.split('`').next())
                        .unwrap_or("unknown");
                    return AppError::bad_request(format!("{} is required", field));
                }

                if error_msg.contains("invalid type") || error_msg.contains("unknown variant") {
                    return AppError::bad_request("Invalid field type in request");
                }

                if matches!(rejection, JsonRejection::MissingJsonContentType(_)) {
                    return AppError::bad_request(
                        "Missing 'Content-Type: application/json' header",
                    );
                }

                AppError::bad_request("Invalid request body")
            })?;

        value.validate().map_err(|errors| AppError::validation(&errors))?;

        Ok(ValidatedJson(value))
    }
}
