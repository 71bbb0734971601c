//! Idempotent admin bootstrap. Safe to re-run: keyed on the admin email.
//!
//! Override the defaults with SEED_ADMIN_EMAIL / SEED_ADMIN_PASSWORD.

use sportspot::{
    auth::password::hash_password,
    config::AppConfig,
    domain::{Gender, Role},
    users::repo::{NewUser, User},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "seed=info,sportspot=info".to_string()),
        )
        .init();

    let admin_email =
        std::env::var("SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@sportspot.local".into());
    let admin_password =
        std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "Admin1234".into());

    let config = AppConfig::from_env()?;
    let db = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await?;

    if User::find_by_email(&db, &admin_email).await?.is_some() {
        tracing::info!(email = %admin_email, "admin user already exists, skipping");
        return Ok(());
    }

    let hash = hash_password(&admin_password)?;
    let user = User::create(
        &db,
        NewUser {
            email: &admin_email,
            password_hash: &hash,
            name: "SportSpot Admin",
            gender: Gender::Male,
            role: Role::Admin,
            phone: None,
            skill_level: None,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "created initial admin user");
    Ok(())
}
