use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, TimeZone, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;

use crate::errors::ServiceError;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

pub(crate) fn default_page() -> u64 {
    1
}

pub(crate) fn default_per_page() -> u64 {
    20
}

/// Converts optional `YYYY-MM-DD` bounds into an inclusive datetime range.
/// Both bounds must be given together; the end bound covers its whole day.
pub fn parse_date_range(
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Result<Option<(DateTimeWithTimeZone, DateTimeWithTimeZone)>, ServiceError> {
    match (start_date, end_date) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => {
            let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").map_err(|e| {
                ServiceError::ValidationError(format!("Invalid start date format: {}", e))
            })?;
            let end = NaiveDate::parse_from_str(end, "%Y-%m-%d").map_err(|e| {
                ServiceError::ValidationError(format!("Invalid end date format: {}", e))
            })?;

            let start_datetime = start.and_hms_opt(0, 0, 0).ok_or_else(|| {
                ServiceError::ValidationError("Invalid start date time".to_string())
            })?;
            let end_datetime = end.and_hms_opt(23, 59, 59).ok_or_else(|| {
                ServiceError::ValidationError("Invalid end date time".to_string())
            })?;

            Ok(Some((
                Utc.from_utc_datetime(&start_datetime).into(),
                Utc.from_utc_datetime(&end_datetime).into(),
            )))
        }
        _ => Err(ServiceError::ValidationError(
            "start_date and end_date must be provided together".to_string(),
        )),
    }
}
