use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};

use crate::schema::{bookings, users};

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub username: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

/// A room booking. `subscriber` is the owning user and never changes after creation.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Booking {
    pub id: i32,
    #[serde(rename = "subscriber")]
    pub subscriber_id: i32,
    pub date_from: NaiveDate,
    pub date_to: Option<NaiveDate>,
    pub room: String,
    pub note: String,
    pub created: NaiveDateTime,
    pub updated: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bookings)]
pub struct NewBooking {
    pub subscriber_id: i32,
    pub date_from: NaiveDate,
    pub date_to: Option<NaiveDate>,
    pub room: String,
    pub note: String,
    pub created: NaiveDateTime,
    pub updated: NaiveDateTime,
}

/// Column updates for an existing booking. `None` leaves a column untouched;
/// `date_to: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = bookings)]
pub struct BookingChanges {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<Option<NaiveDate>>,
    pub room: Option<String>,
    pub note: Option<String>,
    pub updated: Option<NaiveDateTime>,
}

/// A booking joined with its subscriber's username.
#[derive(Debug, Clone)]
pub struct SubscribedBooking {
    pub booking: Booking,
    pub username: String,
}

impl fmt::Display for SubscribedBooking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.username, self.booking.room)
    }
}

// Request models for API

/// Incoming booking body. Every field keeps "absent" (`None`) apart from an
/// explicit JSON `null` (`Some(None)`) so validation can report each case.
/// Read-only fields such as `id`, `created` and `updated` are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingPayload {
    #[serde(default, deserialize_with = "nullable")]
    pub subscriber: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub date_from: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub date_to: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub room: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub note: Option<Option<String>>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_keeps_null_apart_from_absent() {
        let payload: BookingPayload =
            serde_json::from_str(r#"{"date_to": null, "room": "A1", "id": 7}"#).unwrap();

        assert_eq!(payload.date_to, Some(None));
        assert_eq!(payload.room, Some(Some("A1".to_string())));
        assert_eq!(payload.date_from, None);
        assert_eq!(payload.note, None);
        assert_eq!(payload.subscriber, None);
    }

    #[test]
    fn booking_serializes_subscriber_by_id() {
        let stamp = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let booking = Booking {
            id: 3,
            subscriber_id: 12,
            date_from: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            date_to: None,
            room: "Blue".to_string(),
            note: String::new(),
            created: stamp,
            updated: stamp,
        };

        let value = serde_json::to_value(&booking).unwrap();
        assert_eq!(value["subscriber"], 12);
        assert_eq!(value["date_from"], "2024-02-01");
        assert!(value["date_to"].is_null());
        assert!(value.get("subscriber_id").is_none());
    }

    #[test]
    fn subscribed_booking_displays_owner_and_room() {
        let stamp = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let entry = SubscribedBooking {
            booking: Booking {
                id: 1,
                subscriber_id: 1,
                date_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                date_to: None,
                room: "Room 4".to_string(),
                note: "standup".to_string(),
                created: stamp,
                updated: stamp,
            },
            username: "mina".to_string(),
        };

        assert_eq!(entry.to_string(), "mina Room 4");
    }
}
