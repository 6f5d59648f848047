use actix_web::{middleware, web, App, HttpServer};

use room_booking::config::Config;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env()?;

    // initialize DB pool outside of `HttpServer::new` so that it is shared across all workers
    let pool = room_booking::initialize_db_pool(&config.database_url, config.pool_size)?;

    if config.run_migrations {
        let mut conn = pool.get()?;
        room_booking::run_migrations(&mut conn).map_err(|e| anyhow::anyhow!(e))?;
    }

    log::info!("starting HTTP server at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .wrap(middleware::Logger::default())
            .configure(room_booking::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
