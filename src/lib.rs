//! Room booking REST service: list/create and retrieve/update/delete of
//! bookings, with token authentication and owner-only writes.

pub mod actions;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod permissions;
pub mod schema;
pub mod validation;

use actix_web::{
    error::{InternalError, JsonPayloadError},
    web, HttpResponse,
};
use diesel::{prelude::*, r2d2};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::models::ApiResponse;

pub type DbPool = r2d2::Pool<r2d2::ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn initialize_db_pool(database_url: &str, max_size: u32) -> Result<DbPool, r2d2::PoolError> {
    let manager = r2d2::ConnectionManager::<PgConnection>::new(database_url);
    r2d2::Pool::builder().max_size(max_size).build(manager)
}

pub fn run_migrations(
    conn: &mut PgConnection,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    for version in conn.run_pending_migrations(MIGRATIONS)? {
        log::info!("applied migration {}", version);
    }
    Ok(())
}

/// Registers the booking routes along with the JSON body settings they rely on.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        let detail = err.to_string();
        let response = match err {
            JsonPayloadError::ContentType => {
                HttpResponse::UnsupportedMediaType().json(ApiResponse {
                    message: "Unsupported Media Type".to_string(),
                })
            }
            JsonPayloadError::Deserialize(ref err) => {
                HttpResponse::BadRequest().json(ApiResponse { message: err.to_string() })
            }
            _ => HttpResponse::BadRequest().json(ApiResponse { message: detail }),
        };
        InternalError::from_response(err, response).into()
    }));

    handlers::configure(cfg);
}
