//! Validation utilities for the Rice Planting Advisor

use chrono::NaiveDate;
use validator::{Validate, ValidationErrors};

use crate::error::{EngineError, EngineResult};
use crate::models::{PlantingRequest, StageBoundary};

// ============================================================================
// Dates
// ============================================================================

/// Parse an ISO-8601 calendar date (`YYYY-MM-DD`)
pub fn parse_date(field: &str, value: &str) -> EngineResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        EngineError::input(field, format!("'{}' is not a valid YYYY-MM-DD date", value))
    })
}

// ============================================================================
// Stage Boundaries
// ============================================================================

/// Validate a full replacement set of stage boundaries.
///
/// The set must be non-empty, every range must run forwards, stages must
/// appear in strictly ascending growth order and date ranges must not
/// overlap.
pub fn validate_boundaries(boundaries: &[StageBoundary]) -> EngineResult<()> {
    if boundaries.is_empty() {
        return Err(EngineError::input(
            "boundaries",
            "At least one stage boundary is required",
        ));
    }

    for (index, boundary) in boundaries.iter().enumerate() {
        if boundary.start_date > boundary.end_date {
            return Err(EngineError::input(
                format!("boundaries[{}]", index),
                format!(
                    "{} starts on {} after it ends on {}",
                    boundary.stage, boundary.start_date, boundary.end_date
                ),
            ));
        }
    }

    for (index, pair) in boundaries.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.stage <= prev.stage {
            return Err(EngineError::input(
                format!("boundaries[{}]", index + 1),
                format!("{} cannot follow {}", next.stage, prev.stage),
            ));
        }
        if next.start_date <= prev.end_date {
            return Err(EngineError::input(
                format!("boundaries[{}]", index + 1),
                format!("{} overlaps {}", next.stage, prev.stage),
            ));
        }
    }

    Ok(())
}

// ============================================================================
// Requests
// ============================================================================

/// Validate a planting request's location and year
pub fn validate_planting_request(request: &PlantingRequest) -> EngineResult<()> {
    request.validate().map_err(validation_errors_to_input)
}

/// Flatten `validator` errors into a single input error naming the first field
pub fn validation_errors_to_input(errors: ValidationErrors) -> EngineError {
    let mut fields: Vec<String> = Vec::new();
    collect_fields("", &errors, &mut fields);
    fields.sort();

    let field = fields.first().cloned().unwrap_or_else(|| "request".to_string());
    EngineError::input(field, format!("Out of range or malformed: {}", fields.join(", ")))
}

fn collect_fields(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    use validator::ValidationErrorsKind;

    for (name, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", prefix, name)
        };
        match kind {
            ValidationErrorsKind::Field(_) => out.push(path),
            ValidationErrorsKind::Struct(inner) => collect_fields(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_fields(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}
