use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Once;

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use room_booking::actions;
use room_booking::models::{Booking, NewBooking, User};
use room_booking::DbPool;

static MIGRATE: Once = Once::new();
static NEXT_USER: AtomicU32 = AtomicU32::new(0);

/// Builds the service under test on top of `$pool`.
macro_rules! test_app {
    ($pool:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($pool.clone()))
                .configure(room_booking::configure),
        )
        .await
    };
}

/// Every connection handed out by the test pool sits inside a transaction that
/// is never committed.
#[derive(Debug)]
struct TestTransaction;

impl CustomizeConnection<PgConnection, r2d2::Error> for TestTransaction {
    fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), r2d2::Error> {
        conn.begin_test_transaction().map_err(r2d2::Error::QueryError)
    }
}

/// A single-connection pool against `TEST_DATABASE_URL`. The database tests are
/// `#[ignore]`d, so reaching this without the variable is a setup error.
pub fn test_pool() -> DbPool {
    let database_url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must point at a PostgreSQL database to run ignored tests");

    MIGRATE.call_once(|| {
        let mut conn = PgConnection::establish(&database_url)
            .expect("test database should accept connections");
        room_booking::run_migrations(&mut conn).expect("migrations should apply");
    });

    r2d2::Pool::builder()
        .max_size(1)
        .connection_customizer(Box::new(TestTransaction))
        .build(ConnectionManager::<PgConnection>::new(database_url))
        .expect("test pool should build")
}

pub struct Account {
    pub user: User,
    pub token: String,
}

impl Account {
    pub fn header(&self) -> (&'static str, String) {
        ("Authorization", format!("Token {}", self.token))
    }
}

/// Users and tokens are provisioned outside the service, so they are written
/// straight to the tables here.
pub fn account(pool: &DbPool, prefix: &str) -> Account {
    use room_booking::schema::{auth_tokens, users};

    let mut conn = pool.get().unwrap();
    let username = format!("{}_{}", prefix, NEXT_USER.fetch_add(1, Ordering::Relaxed));
    let user = diesel::insert_into(users::table)
        .values((users::username.eq(&username), users::is_active.eq(true)))
        .returning(User::as_returning())
        .get_result(&mut conn)
        .unwrap();

    let token = format!("{:x<40}", format!("t{}", user.id));
    diesel::insert_into(auth_tokens::table)
        .values((auth_tokens::key.eq(&token), auth_tokens::user_id.eq(user.id)))
        .execute(&mut conn)
        .unwrap();

    Account { user, token }
}

pub fn deactivate(pool: &DbPool, user: &User) {
    use room_booking::schema::users::dsl::{is_active, users};

    let mut conn = pool.get().unwrap();
    diesel::update(users.find(user.id))
        .set(is_active.eq(false))
        .execute(&mut conn)
        .unwrap();
}

pub fn date(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
}

pub fn insert_booking(pool: &DbPool, owner: &User, date_from: &str, room: &str) -> Booking {
    let mut conn = pool.get().unwrap();
    let now = actions::now_stamp();
    actions::create_booking(
        &mut conn,
        &NewBooking {
            subscriber_id: owner.id,
            date_from: date(date_from),
            date_to: None,
            room: room.to_string(),
            note: String::new(),
            created: now,
            updated: now,
        },
    )
    .unwrap()
}

pub fn fetch_booking(pool: &DbPool, booking_id: i32) -> Option<Booking> {
    let mut conn = pool.get().unwrap();
    actions::get_booking_by_id(&mut conn, booking_id)
        .optional()
        .unwrap()
}
