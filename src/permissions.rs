//! Owner-or-read-only access to single bookings.

use actix_web::http::Method;

use crate::auth::Caller;
use crate::error::ApiError;
use crate::models::Booking;

/// Methods that never modify a booking. The detail route answers GET and HEAD.
pub fn is_safe_method(method: &Method) -> bool {
    [Method::GET, Method::HEAD].contains(method)
}

/// Only the subscriber who made a booking may change or remove it.
pub fn can_write(caller: &Caller, booking: &Booking) -> bool {
    caller.id == booking.subscriber_id
}

/// Object-level check run by every detail handler once the booking is loaded.
pub fn check_object_permission(
    method: &Method,
    caller: &Caller,
    booking: &Booking,
) -> Result<(), ApiError> {
    if is_safe_method(method) || can_write(caller, booking) {
        Ok(())
    } else {
        log::warn!(
            "user {} denied {} on booking {} owned by {}",
            caller.username,
            method,
            booking.id,
            booking.subscriber_id
        );
        Err(ApiError::PermissionDenied)
    }
}
