//! Classroom Tracker command-line entry point.
//!
//! Restores the persisted session against the hosted backend and prints the
//! signed-in teacher's classes.

use std::error::Error;
use std::sync::Arc;

use secrecy::ExposeSecret;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use classroom_tracker::adapters::storage::FileKeyValueStore;
use classroom_tracker::adapters::supabase::{
    SupabaseAuth, SupabaseClient, SupabaseConfig, SupabaseTableStore,
};
use classroom_tracker::application::AppContext;
use classroom_tracker::config::{AppConfig, LoggingConfig};
use classroom_tracker::ports::KeyValueStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_logging(&config.logging)?;

    tracing::info!(
        environment = ?config.environment,
        backend = %config.backend.url,
        "Starting classroom tracker"
    );

    let backend = SupabaseConfig::new(
        config.backend.url.clone(),
        config.backend.anon_key.expose_secret().clone(),
    )
    .with_timeout(config.backend.timeout())
    .with_refresh(
        config.session.refresh_margin(),
        config.session.auto_refresh_tick(),
    );
    let client = SupabaseClient::new(backend)?;

    let preferences: Arc<dyn KeyValueStore> =
        Arc::new(FileKeyValueStore::new(&config.storage.preferences_path));

    let mut auth = SupabaseAuth::new(client.clone());
    if config.session.persist_session {
        auth = auth.with_session_store(preferences.clone());
    }

    let mut context = AppContext::new(
        Arc::new(auth),
        Arc::new(SupabaseTableStore::new(client)),
        preferences,
    );
    let mut class_loads = context.collections().subscribe_class_loads();
    context.start(false).await;

    match context.session().current() {
        Some(session) => {
            // Session sync fetches the classes once the session is restored.
            let loaded = tokio::time::timeout(config.backend.timeout(), class_loads.changed());
            if !matches!(loaded.await, Ok(Ok(()))) {
                tracing::warn!("Class list not loaded in time");
            }
            let classes = context.collections().classes().await;

            println!("Signed in as {} <{}>", session.display_name(), session.email());
            println!("{} class(es)", classes.len());
            for class in classes {
                println!("  {:>3}. {}", class.sequence_number, class.name);
            }
        }
        None => println!("Not signed in"),
    }
    println!("Theme: {}", context.theme().current());

    context.shutdown();
    Ok(())
}

fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn Error>> {
    let filter = config.env_filter()?;

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false).compact())
            .try_init()?;
    }

    Ok(())
}
