use crate::components::calendar::{CalendarHandle, CalendarSync};
use crate::components::storage::{StorageActor, StorageActorHandle, TokenStorage};
use crate::components::{ComponentManager, SessionContext};
use crate::config::Config;
use crate::error::Error;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper_util=warn")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub async fn load_config() -> miette::Result<Arc<RwLock<Config>>> {
    match Config::load() {
        Ok(config) => Ok(Arc::new(RwLock::new(config))),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Handles the host keeps after bringing the subsystem up
pub struct Subsystem {
    pub components: Arc<ComponentManager>,
    pub storage: StorageActorHandle,
}

impl Subsystem {
    /// Calendar handle, once the component has initialized
    pub async fn calendar_handle(&self) -> Option<CalendarHandle> {
        let component = self.components.get_component_by_name("calendar_sync")?;
        let calendar = component.as_any().downcast_ref::<CalendarSync>()?;
        calendar.get_handle().await
    }

    /// Orderly shutdown of components and storage
    pub async fn shutdown(&self) -> miette::Result<()> {
        self.components.shutdown_all().await?;
        self.storage.shutdown().await?;
        Ok(())
    }
}

/// Bring the subsystem up for a signed-in session
pub async fn start_subsystem(
    config: Arc<RwLock<Config>>,
    session: SessionContext,
) -> miette::Result<Subsystem> {
    // Initialize component manager
    let mut component_manager = ComponentManager::new(Arc::clone(&config));

    // Initialize the storage actor
    let (mut storage_actor, storage_handle) = StorageActor::new(Arc::clone(&config));

    // Spawn storage actor task
    tokio::spawn(async move {
        storage_actor.run().await;
    });

    // Register the calendar component when enabled
    {
        let config_read = config.read().await;
        if config_read.is_component_enabled("calendar_sync") {
            component_manager.register(CalendarSync::new());
        }
    }

    let component_manager = Arc::new(component_manager);

    // Initialize components
    let storage: Arc<dyn TokenStorage> = Arc::new(storage_handle.clone());
    if let Err(e) = component_manager
        .init_all(&session, Arc::clone(&config), storage)
        .await
    {
        error!("Failed to initialize components: {:?}", e);
    }

    Ok(Subsystem {
        components: component_manager,
        storage: storage_handle,
    })
}
