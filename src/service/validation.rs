//! Field validation for form and JSON input. Failures name the offending field.

use crate::error::AppError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

pub const NAME_MAX_LENGTH: usize = 100;
const INTEGER_REQUIRED: &str = "A valid integer is required.";
const FIELD_REQUIRED: &str = "This field is required.";

/// Parse a form-submitted coordinate.
pub fn coordinate(field: &str, raw: Option<&str>) -> Result<i32, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation(field, FIELD_REQUIRED))?;
    raw.parse::<i32>().map_err(|_| AppError::validation(field, INTEGER_REQUIRED))
}

/// Coordinate from a JSON body: an integer, or a string holding one.
pub fn json_coordinate(field: &str, value: Option<&Value>) -> Result<i32, AppError> {
    match value {
        None | Some(Value::Null) => Err(AppError::validation(field, FIELD_REQUIRED)),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| AppError::validation(field, INTEGER_REQUIRED)),
        Some(Value::String(s)) => coordinate(field, Some(s)),
        Some(_) => Err(AppError::validation(field, INTEGER_REQUIRED)),
    }
}

/// Coordinate that may be left out (PATCH).
pub fn optional_json_coordinate(field: &str, value: Option<&Value>) -> Result<Option<i32>, AppError> {
    match value {
        None => Ok(None),
        Some(_) => json_coordinate(field, value).map(Some),
    }
}

/// Required, non-blank text of at most `max` characters.
pub fn name(field: &str, raw: Option<&str>, max: usize) -> Result<String, AppError> {
    let value = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation(field, FIELD_REQUIRED))?;
    if value.chars().count() > max {
        return Err(AppError::validation(
            field,
            format!("Ensure this field has no more than {} characters.", max),
        ));
    }
    Ok(value.to_string())
}

pub fn json_text<'a>(field: &str, body: &'a Map<String, Value>) -> Result<Option<&'a str>, AppError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(AppError::validation(field, "Not a valid string.")),
    }
}

pub fn json_id(field: &str, body: &Map<String, Value>) -> Result<Option<i64>, AppError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| AppError::validation(field, "Incorrect type. Expected pk value.")),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AppError::validation(field, "Incorrect type. Expected pk value.")),
        Some(_) => Err(AppError::validation(field, "Incorrect type. Expected pk value.")),
    }
}

pub fn json_object(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

static USERNAME: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"^[\w.@+-]{1,150}$"));

pub fn username(raw: Option<&str>) -> Result<String, AppError> {
    let value = raw.map(str::trim).unwrap_or("");
    if value.is_empty() {
        return Err(AppError::validation("username", FIELD_REQUIRED));
    }
    let re = USERNAME
        .as_ref()
        .map_err(|e| AppError::Internal(format!("username pattern: {}", e)))?;
    if !re.is_match(value) {
        return Err(AppError::validation(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    Ok(value.to_string())
}

pub fn email(raw: Option<&str>) -> Result<String, AppError> {
    let value = raw.map(str::trim).unwrap_or("");
    if value.is_empty() {
        return Err(AppError::validation("email", FIELD_REQUIRED));
    }
    if !value.contains('@') || value.len() < 3 {
        return Err(AppError::validation("email", "Enter a valid email address."));
    }
    Ok(value.to_string())
}

/// Both password fields must be present and equal.
pub fn new_password<'a>(password1: Option<&'a str>, password2: Option<&str>) -> Result<&'a str, AppError> {
    let first = password1
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("password1", FIELD_REQUIRED))?;
    if first.chars().count() < 8 {
        return Err(AppError::validation(
            "password1",
            "This password is too short. It must contain at least 8 characters.",
        ));
    }
    if password2 != Some(first) {
        return Err(AppError::validation("password2", "The two password fields didn't match."));
    }
    Ok(first)
}
