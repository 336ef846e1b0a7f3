//! Application state - shared across all handlers.

use std::sync::Arc;

use scribe_core::ports::{PostRepository, UserRepository};
use scribe_core::service::PostService;
use scribe_infra::database::{DatabaseConfig, DatabaseConnections};
use scribe_infra::{InMemoryPostRepository, InMemoryUserRepository};

#[cfg(feature = "postgres")]
use scribe_infra::database::{PostgresPostRepository, PostgresUserRepository};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: PostService,
    pub users: Arc<dyn UserRepository>,
    pub db: Option<Arc<DatabaseConnections>>,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(db_config: Option<&DatabaseConfig>) -> Self {
        #[cfg(feature = "postgres")]
        {
            if let Some(config) = db_config {
                match DatabaseConnections::init(config).await {
                    Ok(connections) => {
                        let conn = Arc::new(connections);
                        let posts = Arc::new(PostgresPostRepository::new(conn.main.clone()));
                        let users = Arc::new(PostgresUserRepository::new(conn.main.clone()));
                        tracing::info!("Application state initialized (postgres)");
                        return Self::with_repositories(posts, users, Some(conn));
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to connect to database: {}. Using in-memory fallback.",
                            e
                        );
                    }
                }
            } else {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            }
        }

        #[cfg(not(feature = "postgres"))]
        {
            if db_config.is_some() {
                tracing::warn!("Built without postgres feature - ignoring DATABASE_URL");
            }
        }

        tracing::info!("Application state initialized (in-memory)");
        Self::in_memory()
    }

    /// State backed by in-memory repositories.
    pub fn in_memory() -> Self {
        Self::with_repositories(
            Arc::new(InMemoryPostRepository::new()),
            Arc::new(InMemoryUserRepository::new()),
            None,
        )
    }

    fn with_repositories(
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        db: Option<Arc<DatabaseConnections>>,
    ) -> Self {
        Self {
            posts: PostService::new(posts, users.clone()),
            users,
            db,
        }
    }
}
