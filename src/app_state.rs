use std::sync::Arc;

use crate::{
    auth::IdentityService,
    blob::{BlobStore, LocalBlobStore},
    config::Config,
    graph::SocialGraph,
    services::{FeedService, ProfileService},
    store::EntityStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<EntityStore>,
    pub graph: SocialGraph,
    pub feed: FeedService,
    pub profiles: ProfileService,
    pub identity: Arc<IdentityService>,
    pub blobs: Arc<dyn BlobStore>,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = EntityStore::connect(&config.database.url, config.cache.capacity).await?;
        store.init().await?;
        let store = Arc::new(store);

        let blobs = LocalBlobStore::new(&config.uploads.dir, &config.uploads.public_prefix);
        blobs.ensure_root().await?;

        Ok(Self {
            graph: SocialGraph::new(store.clone()),
            feed: FeedService::new(store.clone()),
            profiles: ProfileService::new(store.clone()),
            identity: Arc::new(IdentityService::new(&config.auth.token_secret)),
            blobs: Arc::new(blobs),
            store,
            config,
        })
    }
}
