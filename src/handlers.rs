use actix_web::{
    delete, get, http::Method, patch, post, put, route, web, HttpRequest, HttpResponse,
};

use crate::actions;
use crate::auth::RequestContext;
use crate::error::ApiError;
use crate::models::{Booking, BookingPayload, SubscribedBooking};
use crate::permissions;
use crate::validation::{self, FieldErrors, REQUIRED};
use crate::DbPool;

#[get("/bookings/")]
async fn list_bookings(pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let bookings = web::block(move || -> Result<Vec<Booking>, ApiError> {
        let mut conn = pool.get()?;
        Ok(actions::list_bookings(&mut conn)?)
    })
    .await??;

    Ok(HttpResponse::Ok().json(bookings))
}

/// Authenticated callers always book for themselves. Anonymous requests name
/// the subscriber in the payload.
#[post("/bookings/")]
async fn create_booking(
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    form: web::Json<BookingPayload>,
) -> Result<HttpResponse, ApiError> {
    let caller = ctx.caller().cloned();
    let draft = validation::validate_new(form.into_inner(), caller.is_none())?;

    let booking = web::block(move || -> Result<Booking, ApiError> {
        let mut conn = pool.get()?;

        let subscriber_id = match caller {
            Some(caller) => caller.id,
            None => {
                let mut errors = FieldErrors::default();
                let Some(id) = draft.subscriber else {
                    errors.add("subscriber", REQUIRED);
                    return Err(errors.into());
                };
                if !actions::user_exists(&mut conn, id)? {
                    errors.add(
                        "subscriber",
                        format!("Invalid pk \"{}\" - object does not exist.", id),
                    );
                    return Err(errors.into());
                }
                id
            }
        };

        let new_booking = draft.into_new_booking(subscriber_id, actions::now_stamp());
        Ok(actions::create_booking(&mut conn, &new_booking)?)
    })
    .await?
    .map_err(|e| {
        log::error!("Failed to create booking: {}", e);
        e
    })?;

    log::info!(
        "booking {} created for subscriber {} in room {}",
        booking.id,
        booking.subscriber_id,
        booking.room
    );

    Ok(HttpResponse::Created().json(booking))
}

#[route("/bookings/{booking_id}/", method = "GET", method = "HEAD")]
async fn retrieve_booking(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let caller = ctx.require_caller()?.clone();
    let booking_id = path.into_inner();

    let booking = web::block(move || -> Result<Booking, ApiError> {
        let mut conn = pool.get()?;
        Ok(actions::get_booking_by_id(&mut conn, booking_id)?)
    })
    .await??;

    permissions::check_object_permission(req.method(), &caller, &booking)?;

    Ok(HttpResponse::Ok().json(booking))
}

#[put("/bookings/{booking_id}/")]
async fn update_booking(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    path: web::Path<i32>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let method = req.method().clone();
    save_changes(method, pool, ctx, path.into_inner(), body, false).await
}

#[patch("/bookings/{booking_id}/")]
async fn partial_update_booking(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    path: web::Path<i32>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let method = req.method().clone();
    save_changes(method, pool, ctx, path.into_inner(), body, true).await
}

// Lookup (404) comes before ownership (403), which comes before decoding and
// validating the body (400).
async fn save_changes(
    method: Method,
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    booking_id: i32,
    body: web::Bytes,
    partial: bool,
) -> Result<HttpResponse, ApiError> {
    let caller = ctx.require_caller()?.clone();

    let booking = web::block(move || -> Result<Booking, ApiError> {
        let mut conn = pool.get()?;

        let current = actions::get_booking_by_id(&mut conn, booking_id)?;
        permissions::check_object_permission(&method, &caller, &current)?;

        let payload: BookingPayload = serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let changes = validation::validate_changes(payload, partial)?;
        Ok(actions::update_booking(&mut conn, &current, changes)?)
    })
    .await??;

    log::info!("booking {} updated", booking.id);

    Ok(HttpResponse::Ok().json(booking))
}

#[delete("/bookings/{booking_id}/")]
async fn destroy_booking(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    ctx: RequestContext,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let caller = ctx.require_caller()?.clone();
    let booking_id = path.into_inner();
    let method = req.method().clone();

    let removed = web::block(move || -> Result<SubscribedBooking, ApiError> {
        let mut conn = pool.get()?;

        let entry = actions::get_booking_with_subscriber_name(&mut conn, booking_id)?;
        permissions::check_object_permission(&method, &caller, &entry.booking)?;

        actions::delete_booking(&mut conn, booking_id)?;
        Ok(entry)
    })
    .await??;

    log::info!("booking {} deleted: {}", booking_id, removed);

    Ok(HttpResponse::NoContent().finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_bookings)
        .service(create_booking)
        .service(retrieve_booking)
        .service(update_booking)
        .service(partial_update_booking)
        .service(destroy_booking);
}
