use std::sync::Arc;

use tracing::info;

use crate::auth::AdminCredentials;
use crate::config::Settings;
use crate::drive::google::GoogleDriveClient;
use crate::drive::{not_configured, DriveClient};
use crate::error::ConsoleResult;
use crate::vector_store::memory::MemoryVectorStore;
use crate::vector_store::openai::OpenAIVectorStoreClient;
use crate::vector_store::VectorStoreClient;

/// Shared application state passed to all route handlers.
pub struct AppState {
    pub settings: Settings,
    pub credentials: AdminCredentials,
    pub vector_store: Arc<dyn VectorStoreClient>,
    pub drive: Option<Arc<dyn DriveClient>>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        vector_store: Arc<dyn VectorStoreClient>,
        drive: Option<Arc<dyn DriveClient>>,
    ) -> Self {
        let credentials = AdminCredentials {
            username: settings.admin_username.clone(),
            password_hash: settings.admin_password_hash.clone(),
        };
        Self {
            settings,
            credentials,
            vector_store,
            drive,
        }
    }

    /// Build the providers named in settings.
    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let vector_store: Arc<dyn VectorStoreClient> =
            match settings.vector_store_provider.as_str() {
                "memory" => Arc::new(MemoryVectorStore::new()),
                _ => Arc::new(OpenAIVectorStoreClient::from_settings(&settings)?),
            };
        info!("Vector store initialized: {}", vector_store.provider_name());

        let drive: Option<Arc<dyn DriveClient>> = match GoogleDriveClient::from_settings(&settings)? {
            Some(client) => Some(Arc::new(client)),
            None => {
                info!("Google Drive not configured, drive import disabled");
                None
            }
        };

        if settings.admin_password_hash.is_none() {
            tracing::warn!("ADMIN_PASSWORD_HASH is not set; nobody can log in");
        }

        Ok(Self::new(settings, vector_store, drive))
    }

    /// The drive client, or `NotConfiguredFailure` when drive import is off.
    pub fn drive(&self) -> ConsoleResult<&dyn DriveClient> {
        self.drive.as_deref().ok_or_else(not_configured)
    }
}
