//! Date/datetime input normalization and display formatting (spec §4.4).
//!
//! Grounded on `baserowapi.models.fields.base_date_field.BaseDateField`
//! (`original_source/baserowapi/models/fields/base_date_field.py`): the
//! original tries a fixed list of `strptime` patterns in order and rejects
//! anything that doesn't match; this reimplements the same shape-sniffing
//! with `chrono` instead of a pattern list, since Rust has no direct
//! equivalent of Python's forgiving `strptime`.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};

/// `date_format` attribute: which of the three display patterns applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    Us,
    Eu,
    Iso,
}

/// `date_time_format` attribute: 12- or 24-hour display clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    Twelve,
    TwentyFour,
}

/// The date-family attributes shared by `date`, `last_modified`, and `created_on`.
#[derive(Debug, Clone, PartialEq)]
pub struct DateAttrs {
    pub format: DateFormat,
    pub include_time: bool,
    pub time_format: TimeFormat,
    pub show_tzinfo: bool,
    pub force_timezone: Option<String>,
}

impl Default for DateAttrs {
    fn default() -> Self {
        Self {
            format: DateFormat::Eu,
            include_time: true,
            time_format: TimeFormat::TwentyFour,
            show_tzinfo: false,
            force_timezone: None,
        }
    }
}

/// Split `YYYY-MM-DD` (already `/`-normalized) into zero-padded, four-digit-year parts.
fn normalize_date_part(date_part: &str, field: &str) -> Result<String> {
    let parts: Vec<&str> = date_part.split('-').collect();
    if parts.len() != 3 {
        return Err(Error::FieldValidation {
            field: field.to_string(),
            message: format!("'{date_part}' is not a recognized date shape"),
        });
    }
    let mut year = parts[0].to_string();
    if year.len() == 2 {
        year = format!("20{year}");
    }
    if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::FieldValidation {
            field: field.to_string(),
            message: format!("'{date_part}' has an unrecognized year"),
        });
    }
    let month: u32 = parts[1].parse().map_err(|_| Error::FieldValidation {
        field: field.to_string(),
        message: format!("'{date_part}' has an unrecognized month"),
    })?;
    let day: u32 = parts[2].parse().map_err(|_| Error::FieldValidation {
        field: field.to_string(),
        message: format!("'{date_part}' has an unrecognized day"),
    })?;
    NaiveDate::from_ymd_opt(year.parse().unwrap(), month, day).ok_or_else(|| {
        Error::FieldValidation {
            field: field.to_string(),
            message: format!("'{date_part}' is not a valid calendar date"),
        }
    })?;
    Ok(format!("{year}-{month:02}-{day:02}"))
}

/// Normalize a user-supplied date/datetime string into the wire shape for
/// `attrs` (spec §4.4): slashes become dashes, two-digit years expand, single
/// digit month/day are zero-padded, and time is appended or rejected
/// according to `attrs.include_time`.
pub fn normalize_date_input(raw: &str, attrs: &DateAttrs, field: &str) -> Result<String> {
    let raw = raw.replace('/', "-");
    match raw.split_once('T') {
        Some((date_part, time_part)) => {
            if !attrs.include_time {
                return Err(Error::FieldValidation {
                    field: field.to_string(),
                    message: format!("'{raw}' carries a time component but {field} has no time"),
                });
            }
            let date_part = normalize_date_part(date_part, field)?;
            validate_time_part(time_part, field)?;
            Ok(format!("{date_part}T{time_part}"))
        }
        None => {
            let date_part = normalize_date_part(&raw, field)?;
            if attrs.include_time {
                Ok(format!("{date_part}T00:00:00Z"))
            } else {
                Ok(date_part)
            }
        }
    }
}

/// Accept `HH:MM:SS[.fff][Z|±HH:MM]`, mirroring the ordered pattern attempts
/// in `base_date_field.py`.
fn validate_time_part(time_part: &str, field: &str) -> Result<()> {
    let candidate = format!("2000-01-01T{time_part}");
    let recognized = chrono::DateTime::parse_from_rfc3339(&candidate).is_ok()
        || NaiveDateTime::parse_from_str(&candidate, "%Y-%m-%dT%H:%M:%S%.fZ").is_ok()
        || NaiveDateTime::parse_from_str(&candidate, "%Y-%m-%dT%H:%M:%SZ").is_ok()
        || NaiveDateTime::parse_from_str(&candidate, "%Y-%m-%dT%H:%M:%S").is_ok();
    if recognized {
        Ok(())
    } else {
        Err(Error::FieldValidation {
            field: field.to_string(),
            message: format!("'{time_part}' is not a recognized time shape"),
        })
    }
}

/// Validate an already-normalized wire value (used when re-checking a
/// server echo or a formatted value, spec §8 idempotence law).
pub fn validate_normalized(value: &str, attrs: &DateAttrs, field: &str) -> Result<()> {
    if attrs.include_time {
        if chrono::DateTime::parse_from_rfc3339(value).is_err()
            && NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.fZ").is_err()
        {
            return Err(Error::FieldValidation {
                field: field.to_string(),
                message: format!("'{value}' is not a valid datetime"),
            });
        }
    } else if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
        return Err(Error::FieldValidation {
            field: field.to_string(),
            message: format!("'{value}' is not a valid date"),
        });
    }
    Ok(())
}

/// Render a normalized wire value for display per `attrs` (spec §4.4: US/EU/ISO
/// date pattern, 12/24-hour time pattern, optional timezone name).
///
/// A non-`Z` offset (e.g. `+02:00`) is converted to UTC before display rather
/// than discarded, so two cells holding the same instant in different offsets
/// render identically instead of one silently reading as its raw local clock
/// time.
pub fn format_display(value: &str, attrs: &DateAttrs, field: &str) -> Result<String> {
    if !attrs.include_time {
        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| Error::FieldValidation {
            field: field.to_string(),
            message: format!("'{value}' is not a valid date"),
        })?;
        return Ok(match attrs.format {
            DateFormat::Us => date.format("%m/%d/%Y").to_string(),
            DateFormat::Eu => date.format("%d/%m/%Y").to_string(),
            DateFormat::Iso => date.format("%Y-%m-%d").to_string(),
        });
    }

    let malformed = || Error::FieldValidation {
        field: field.to_string(),
        message: format!("'{value}' is not a valid datetime"),
    };
    let utc = match chrono::DateTime::parse_from_rfc3339(value) {
        Ok(dt) => dt.with_timezone(&chrono::Utc).naive_utc(),
        Err(_) => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map_err(|_| malformed())?,
    };
    let date_out = match attrs.format {
        DateFormat::Us => utc.format("%m/%d/%Y").to_string(),
        DateFormat::Eu => utc.format("%d/%m/%Y").to_string(),
        DateFormat::Iso => utc.format("%Y-%m-%d").to_string(),
    };
    let time_out = match attrs.time_format {
        TimeFormat::TwentyFour => utc.format("%H:%M").to_string(),
        TimeFormat::Twelve => utc.format("%I:%M %p").to_string(),
    };
    let mut out = format!("{date_out} {time_out}");
    if attrs.show_tzinfo {
        out.push(' ');
        out.push_str(attrs.force_timezone.as_deref().unwrap_or("UTC"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn slash_date_normalizes_with_appended_midnight_utc() {
        let attrs = DateAttrs {
            include_time: true,
            ..Default::default()
        };
        let out = normalize_date_input("2024/8/15", &attrs, "Created").unwrap();
        assert_eq!(out, "2024-08-15T00:00:00Z");
    }

    #[test]
    fn two_digit_year_expands_to_21st_century() {
        let attrs = DateAttrs {
            include_time: false,
            ..Default::default()
        };
        let out = normalize_date_input("24-1-5", &attrs, "Created").unwrap();
        assert_eq!(out, "2024-01-05");
    }

    #[test]
    fn time_rejected_when_field_has_no_time() {
        let attrs = DateAttrs {
            include_time: false,
            ..Default::default()
        };
        assert!(normalize_date_input("2024-08-15T00:00:00Z", &attrs, "Created").is_err());
    }

    #[test]
    fn full_datetime_with_fractional_seconds_passes_through() {
        let attrs = DateAttrs {
            include_time: true,
            ..Default::default()
        };
        let out = normalize_date_input("2024-08-15T10:30:00.123Z", &attrs, "Created").unwrap();
        assert_eq!(out, "2024-08-15T10:30:00.123Z");
    }

    #[test]
    fn display_converts_non_utc_offset_to_utc() {
        let attrs = DateAttrs {
            include_time: true,
            time_format: TimeFormat::TwentyFour,
            ..Default::default()
        };
        let offset = format_display("2024-08-15T10:30:00+02:00", &attrs, "Created").unwrap();
        let utc = format_display("2024-08-15T08:30:00Z", &attrs, "Created").unwrap();
        assert_eq!(offset, utc);
    }

    #[test]
    fn display_offset_can_roll_over_to_a_different_day() {
        let attrs = DateAttrs {
            include_time: true,
            format: DateFormat::Iso,
            time_format: TimeFormat::TwentyFour,
            ..Default::default()
        };
        let out = format_display("2024-08-15T23:30:00-02:00", &attrs, "Created").unwrap();
        assert_eq!(out, "2024-08-16 01:30");
    }
}
