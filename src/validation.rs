//! Explicit payload validation for bookings.
//!
//! Every check runs before anything touches the database, and all problems are
//! collected into a [`FieldErrors`] map instead of stopping at the first one.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::models::{BookingChanges, BookingPayload, NewBooking};

pub const ROOM_MAX_LENGTH: usize = 100;
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";
pub const BAD_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";

/// Field name to list of messages, serialized as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A fully validated booking, ready to be stored once its subscriber is known.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingDraft {
    /// Only set when the subscriber came from the payload.
    pub subscriber: Option<i32>,
    pub date_from: NaiveDate,
    pub date_to: Option<NaiveDate>,
    pub room: String,
    pub note: String,
}

impl BookingDraft {
    pub fn into_new_booking(self, subscriber_id: i32, now: NaiveDateTime) -> NewBooking {
        NewBooking {
            subscriber_id,
            date_from: self.date_from,
            date_to: self.date_to,
            room: self.room,
            note: self.note,
            created: now,
            updated: now,
        }
    }
}

/// Validates a creation payload.
///
/// With `subscriber_from_payload` unset the `subscriber` field is read-only and
/// ignored; otherwise it is required.
pub fn validate_new(
    payload: BookingPayload,
    subscriber_from_payload: bool,
) -> Result<BookingDraft, FieldErrors> {
    let mut errors = FieldErrors::default();

    let subscriber = if subscriber_from_payload {
        present(&mut errors, "subscriber", payload.subscriber, true, false).flatten()
    } else {
        None
    };
    let date_from = date(&mut errors, "date_from", payload.date_from, true, false).flatten();
    let date_to = date(&mut errors, "date_to", payload.date_to, false, true).flatten();
    let room = room(&mut errors, payload.room, true);
    let note = note(&mut errors, payload.note, true);

    match (date_from, room, note) {
        (Some(date_from), Some(room), Some(note)) if errors.is_empty() => Ok(BookingDraft {
            subscriber,
            date_from,
            date_to,
            room,
            note,
        }),
        _ => Err(errors),
    }
}

/// Validates an update payload. A full update (`partial == false`) requires the
/// same fields as creation; a partial one only checks what was sent. The
/// subscriber is never part of an update.
pub fn validate_changes(
    payload: BookingPayload,
    partial: bool,
) -> Result<BookingChanges, FieldErrors> {
    let required = !partial;
    let mut errors = FieldErrors::default();

    let changes = BookingChanges {
        date_from: date(&mut errors, "date_from", payload.date_from, required, false).flatten(),
        date_to: date(&mut errors, "date_to", payload.date_to, false, true),
        room: room(&mut errors, payload.room, required),
        note: note(&mut errors, payload.note, required),
        updated: None,
    };

    errors.into_result(changes)
}

/// Resolves presence rules for one field. Returns `None` when the field is
/// absent or rejected, `Some(None)` for an accepted `null`.
fn present<T>(
    errors: &mut FieldErrors,
    field: &'static str,
    raw: Option<Option<T>>,
    required: bool,
    nullable: bool,
) -> Option<Option<T>> {
    match raw {
        None => {
            if required {
                errors.add(field, REQUIRED);
            }
            None
        }
        Some(None) if nullable => Some(None),
        Some(None) => {
            errors.add(field, NOT_NULL);
            None
        }
        Some(Some(value)) => Some(Some(value)),
    }
}

fn date(
    errors: &mut FieldErrors,
    field: &'static str,
    raw: Option<Option<String>>,
    required: bool,
    nullable: bool,
) -> Option<Option<NaiveDate>> {
    match present(errors, field, raw, required, nullable)? {
        None => Some(None),
        Some(text) => match NaiveDate::parse_from_str(text.trim(), DATE_FORMAT) {
            Ok(date) => Some(Some(date)),
            Err(_) => {
                errors.add(field, BAD_DATE);
                None
            }
        },
    }
}

fn room(errors: &mut FieldErrors, raw: Option<Option<String>>, required: bool) -> Option<String> {
    let room = present(errors, "room", raw, required, false).flatten()?;
    let room = room.trim();

    if room.is_empty() {
        errors.add("room", NOT_BLANK);
        return None;
    }
    if room.chars().count() > ROOM_MAX_LENGTH {
        errors.add(
            "room",
            format!("Ensure this field has no more than {} characters.", ROOM_MAX_LENGTH),
        );
        return None;
    }

    Some(room.to_owned())
}

// Notes may be empty, but must be sent on creation.
fn note(errors: &mut FieldErrors, raw: Option<Option<String>>, required: bool) -> Option<String> {
    present(errors, "note", raw, required, false)
        .flatten()
        .map(|note| note.trim().to_owned())
}
