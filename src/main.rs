#![allow(clippy::result_large_err)]

use chrono::Utc;
use dotenvy::dotenv;
use pickup_buddy::{
    config::{database, settings},
    core::{report::format_schedule_summary, store::DbSubscriptionStore},
    errors::{Error, Result},
    state::Session,
};
use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Load .env file (non-fatal, env vars can be set externally)
    dotenv().ok();

    // 2. Load settings so the log filter default is known
    let app_settings = settings::load_settings(settings::DEFAULT_SETTINGS_PATH)?;

    // 3. Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&app_settings.log_filter)),
        )
        .init();
    info!("Settings loaded.");

    // 4. Connect and make sure tables exist
    let db = database::create_connection(&app_settings.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Work out whose schedule to show
    let user_id = env::args()
        .nth(1)
        .or_else(|| env::var("PICKUP_USER_ID").ok())
        .ok_or_else(|| Error::Config {
            message: "Pass a user id as the first argument or set PICKUP_USER_ID".to_string(),
        })?;

    // 6. Reconcile and print
    let offset = app_settings.service_offset()?;
    let now = Utc::now().with_timezone(&offset);
    let store = DbSubscriptionStore::new(db);
    let mut session = Session::start(&store, &user_id);

    match session.refresh(&now).await {
        Ok(reconciled) if reconciled.outcome.changed => info!(
            retired = reconciled.outcome.retired.len(),
            shifted = reconciled.outcome.shifted.len(),
            "Overrides reconciled"
        ),
        Ok(_) => {}
        Err(e) if e.is_persistence() => {
            warn!("Could not save reconciled overrides, will retry next run: {e}");
        }
        Err(e) => return Err(e),
    }

    println!("{}", format_schedule_summary(session.state().upcoming()));
    session.sign_out();
    Ok(())
}
