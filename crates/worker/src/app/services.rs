//! Service wiring from configuration.
//!
//! In-memory stores by default; Postgres + Redis when
//! `USE_PERSISTENT_STORES=true` and the `redis` feature is enabled.

use std::sync::Arc;

use docforge_infra::generation::{Dispatcher, GenerationWorker, InMemoryJobQueue};
use docforge_infra::lock::{InMemoryLockManager, LockManager};
use docforge_infra::render::{Renderer, TextRenderer};
use docforge_infra::repository::{DocumentRepository, InMemoryDocumentRepository};
use docforge_infra::storage::{ArtifactStorage, FilesystemStorage};
use docforge_infra::{DocumentService, GeneratorConfig};

pub type SharedRepository = Arc<dyn DocumentRepository>;
pub type SharedLocks = Arc<dyn LockManager>;
pub type SharedWorker =
    GenerationWorker<SharedRepository, SharedLocks, Arc<dyn Renderer>, Arc<dyn ArtifactStorage>>;

pub struct Services {
    pub config: GeneratorConfig,
    pub queue: Arc<InMemoryJobQueue>,
    pub dispatcher: Arc<Dispatcher<SharedRepository, SharedLocks, Arc<InMemoryJobQueue>>>,
    pub worker: Arc<SharedWorker>,
    pub documents: DocumentService<SharedRepository>,
}

pub async fn build_services(config: GeneratorConfig) -> anyhow::Result<Services> {
    if config.use_persistent_stores {
        #[cfg(feature = "redis")]
        {
            return build_persistent_services(config).await;
        }
        #[cfg(not(feature = "redis"))]
        {
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but redis feature not enabled, falling back to in-memory"
            );
        }
    }

    Ok(build_in_memory_services(config))
}

fn build_in_memory_services(config: GeneratorConfig) -> Services {
    let repository: SharedRepository = Arc::new(InMemoryDocumentRepository::new());
    let locks: SharedLocks = Arc::new(InMemoryLockManager::new());
    tracing::info!("using in-memory document repository and locks");
    assemble(config, repository, locks)
}

#[cfg(feature = "redis")]
async fn build_persistent_services(config: GeneratorConfig) -> anyhow::Result<Services> {
    use anyhow::Context;
    use docforge_infra::lock::RedisLockManager;
    use docforge_infra::repository::PostgresDocumentRepository;

    let database_url = config
        .database_url
        .clone()
        .context("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")?;
    let redis_url = config.redis_url.clone().unwrap_or_else(|| {
        tracing::warn!("REDIS_URL not set; using redis://localhost:6379");
        "redis://localhost:6379".to_string()
    });

    let pool = sqlx::PgPool::connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;
    let postgres = PostgresDocumentRepository::new(pool, tokio::runtime::Handle::current());
    postgres
        .migrate()
        .await
        .context("failed to create document tables")?;

    let locks = RedisLockManager::new(&redis_url).context("failed to create Redis lock manager")?;

    tracing::info!("using Postgres document repository and Redis locks");
    Ok(assemble(config, Arc::new(postgres), Arc::new(locks)))
}

fn assemble(config: GeneratorConfig, repository: SharedRepository, locks: SharedLocks) -> Services {
    let queue = Arc::new(InMemoryJobQueue::new());
    let renderer: Arc<dyn Renderer> = Arc::new(TextRenderer);
    let storage: Arc<dyn ArtifactStorage> = Arc::new(FilesystemStorage::new(
        config.media_root.clone(),
        config.media_url.clone(),
    ));

    let dispatcher = Arc::new(Dispatcher::new(
        repository.clone(),
        locks.clone(),
        queue.clone(),
        config.dispatch_config(),
    ));
    let worker = Arc::new(
        GenerationWorker::new(repository.clone(), locks, renderer, storage)
            .with_lease_ttl(config.lock_ttl),
    );

    Services {
        config,
        queue,
        dispatcher,
        worker,
        documents: DocumentService::new(repository),
    }
}
