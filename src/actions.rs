use chrono::{Duration, NaiveDateTime, SubsecRound, Utc};
use diesel::prelude::*;

use crate::models::{Booking, BookingChanges, NewBooking, SubscribedBooking, User};

/// Current time at the precision Postgres keeps for `TIMESTAMP` columns.
pub fn now_stamp() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(6)
}

/// `updated` must always move forward, even if the clock has not.
pub fn next_updated(previous: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

pub fn list_bookings(conn: &mut PgConnection) -> QueryResult<Vec<Booking>> {
    use crate::schema::bookings::dsl::{bookings, date_from};

    bookings
        .order(date_from.desc())
        .select(Booking::as_select())
        .load(conn)
}

pub fn get_booking_by_id(conn: &mut PgConnection, booking_id: i32) -> QueryResult<Booking> {
    use crate::schema::bookings::dsl::bookings;

    bookings
        .find(booking_id)
        .select(Booking::as_select())
        .first(conn)
}

pub fn get_booking_with_subscriber_name(
    conn: &mut PgConnection,
    booking_id: i32,
) -> QueryResult<SubscribedBooking> {
    use crate::schema::{bookings, users};

    let (booking, username): (Booking, String) = bookings::table
        .inner_join(users::table)
        .filter(bookings::id.eq(booking_id))
        .select((Booking::as_select(), users::username))
        .first(conn)?;

    Ok(SubscribedBooking { booking, username })
}

pub fn create_booking(conn: &mut PgConnection, new_booking: &NewBooking) -> QueryResult<Booking> {
    use crate::schema::bookings::dsl::bookings;

    conn.transaction(|conn| {
        diesel::insert_into(bookings)
            .values(new_booking)
            .returning(Booking::as_returning())
            .get_result(conn)
    })
}

/// Applies `changes` to `current`. Only columns present in `changes` are
/// written, plus the `updated` stamp.
pub fn update_booking(
    conn: &mut PgConnection,
    current: &Booking,
    mut changes: BookingChanges,
) -> QueryResult<Booking> {
    use crate::schema::bookings::dsl::bookings;

    changes.updated = Some(next_updated(current.updated, now_stamp()));

    conn.transaction(|conn| {
        diesel::update(bookings.find(current.id))
            .set(&changes)
            .returning(Booking::as_returning())
            .get_result(conn)
    })
}

pub fn delete_booking(conn: &mut PgConnection, booking_id: i32) -> QueryResult<()> {
    use crate::schema::bookings::dsl::bookings;

    conn.transaction(|conn| {
        match diesel::delete(bookings.find(booking_id)).execute(conn)? {
            0 => Err(diesel::result::Error::NotFound),
            _ => Ok(()),
        }
    })
}

pub fn user_exists(conn: &mut PgConnection, uid: i32) -> QueryResult<bool> {
    use crate::schema::users::dsl::users;

    diesel::select(diesel::dsl::exists(users.find(uid))).get_result(conn)
}

pub fn get_user_by_token(conn: &mut PgConnection, token: &str) -> QueryResult<Option<User>> {
    use crate::schema::{auth_tokens, users};

    auth_tokens::table
        .inner_join(users::table)
        .filter(auth_tokens::key.eq(token))
        .select(User::as_select())
        .first(conn)
        .optional()
}

/// Removes a user and their tokens. Users who still own bookings are
/// protected: the foreign key refuses the delete and nothing changes.
pub fn delete_user(conn: &mut PgConnection, uid: i32) -> QueryResult<()> {
    use crate::schema::users::dsl::users;

    conn.transaction(|conn| match diesel::delete(users.find(uid)).execute(conn)? {
        0 => Err(diesel::result::Error::NotFound),
        _ => Ok(()),
    })
}
