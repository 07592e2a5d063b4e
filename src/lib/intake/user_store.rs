use std::error::Error;

use log::{debug, info};
use sqlx::PgPool;

use super::models::Registration;

const MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// A trait, necessary for every entity that keeps completed registrations.
#[allow(async_fn_in_trait)]
pub trait UserStore {
    async fn save_user_data(&self, registration: &Registration) -> Result<(), sqlx::Error>;
}

/// Allows PgPool to insert registrations into the `users` table.
impl UserStore for PgPool {
    async fn save_user_data(&self, registration: &Registration) -> Result<(), sqlx::Error> {
        debug!("Adding user {} to db", registration.login);

        sqlx::query("INSERT INTO users (login, password, school, url) VALUES ($1, $2, $3, $4)")
            .bind(&registration.login)
            .bind(&registration.password)
            .bind(&registration.school)
            .bind(&registration.url)
            .execute(self)
            .await?;

        Ok(())
    }
}

pub async fn init_connection(database_url: &str) -> Result<PgPool, Box<dyn Error>> {
    info!("Connecting to users database");
    let pool = PgPool::connect(database_url).await?;

    MIGRATOR.run(&pool).await?;

    Ok(pool)
}
