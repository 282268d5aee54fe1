use chrono::NaiveDate;

use crate::error::{BookingError, PassengerIssue};
use crate::models::PassengerInput;
use crate::policy::BookingRules;

/// Field-level checks for one passenger. Returns the parsed date of birth, or
/// every problem found on this record.
pub fn validate_passenger(
    index: usize,
    input: &PassengerInput,
    rules: &BookingRules,
    today: NaiveDate,
) -> Result<NaiveDate, Vec<PassengerIssue>> {
    let mut issues = Vec::new();
    let mut issue = |field: &'static str, message: String| {
        issues.push(PassengerIssue { index, field, message });
    };

    if input.first_name.trim().is_empty() {
        issue("first_name", "must not be empty".to_string());
    }
    if input.last_name.trim().is_empty() {
        issue("last_name", "must not be empty".to_string());
    }
    if input.nationality.trim().is_empty() {
        issue("nationality", "must not be empty".to_string());
    }

    let passport = input.passport_number.expose();
    let len = passport.chars().count();
    if !passport.chars().all(|c| c.is_ascii_alphanumeric()) {
        issue("passport_number", "must contain only letters and digits".to_string());
    } else if len < rules.passport_min_len || len > rules.passport_max_len {
        issue(
            "passport_number",
            format!(
                "must be {} to {} characters long",
                rules.passport_min_len, rules.passport_max_len
            ),
        );
    }

    let dob = match NaiveDate::parse_from_str(input.date_of_birth.trim(), "%Y-%m-%d") {
        Ok(dob) if dob > today => {
            issue("date_of_birth", "must not be in the future".to_string());
            None
        }
        Ok(dob) => Some(dob),
        Err(_) => {
            issue("date_of_birth", "must be a date in YYYY-MM-DD format".to_string());
            None
        }
    };

    match dob {
        Some(dob) if issues.is_empty() => Ok(dob),
        _ => Err(issues),
    }
}

/// Validate a whole request. At least one passenger is required; issues of all
/// passengers are collected into a single error.
pub fn validate_passengers(
    inputs: &[PassengerInput],
    rules: &BookingRules,
    today: NaiveDate,
) -> Result<Vec<NaiveDate>, BookingError> {
    if inputs.is_empty() {
        return Err(BookingError::InvalidInput(
            "a booking needs at least one passenger".to_string(),
        ));
    }

    let mut dates = Vec::with_capacity(inputs.len());
    let mut issues = Vec::new();
    for (index, input) in inputs.iter().enumerate() {
        match validate_passenger(index, input, rules, today) {
            Ok(dob) => dates.push(dob),
            Err(mut found) => issues.append(&mut found),
        }
    }

    if issues.is_empty() {
        Ok(dates)
    } else {
        Err(BookingError::PassengerValidation(issues))
    }
}
