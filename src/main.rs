use photoshare::{
    config::Config,
    db,
    photo::{repository::SqlitePhotoRepository, PhotoStorage},
    session::SessionSigner,
    user::{repository::SqliteUserRepository, UserService},
    AppState,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photoshare=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting photo sharing server");

    if let Err(e) = run().await {
        error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let pool = db::connect(&config.database.file).await?;
    let user_repository = Arc::new(SqliteUserRepository::new(pool.clone()));
    let photo_repository = Arc::new(SqlitePhotoRepository::new(pool));

    let password_policy = config.password_policy();
    info!(mode = %password_policy.mode(), "Password policy loaded");

    let app_state = AppState::new(
        user_repository,
        photo_repository,
        PhotoStorage::new(&config.photos.directory),
        SessionSigner::new(config.jwt.secret_key.clone(), config.session_timeout()),
        password_policy,
    );

    let seeded = UserService::new(
        app_state.user_repository.clone(),
        app_state.password_policy.clone(),
    )
    .seed_admin(&config.admin.default_login, &config.admin.default_password)
    .await?;
    if seeded {
        info!(login = %config.admin.default_login, "Default admin created");
    }

    let app = photoshare::router(app_state, config.max_upload_bytes());

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
