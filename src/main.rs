use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_classifier::{
    AppConfig, ClassifierSession, FsStore, RawImage,
    model::{HttpSource, ModelRegistry, tch_backend::TorchLoader},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: image_classifier <image-path>");
        std::process::exit(1);
    };

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!(base_url = %config.base_url, "loading model artifacts");

    let store = Arc::new(FsStore::new(config.cache_dir.clone()));
    let source = Arc::new(HttpSource::new(config.base_url.clone()));
    let registry = Arc::new(ModelRegistry::new(store, source));
    let loader = Arc::new(TorchLoader::new(registry, config.device));
    let session = ClassifierSession::new(loader, config.top_k);

    session.load_model().await?;

    let bytes = tokio::fs::read(&path).await?;
    let image = RawImage::decode(&bytes)?;

    if let Some(ranked) = session.classify_selection(image).await? {
        for scored in ranked {
            println!("{} : {}", scored.label, scored.score);
        }
    }

    Ok(())
}

fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
