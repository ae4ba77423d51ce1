use color_eyre::{eyre::eyre, Result};
use mx_ink_controls::config::AppConfig;
use mx_ink_controls::controller::event_collector::CollectorHandle;
use mx_ink_controls::controller::SemanticEvent;
use mx_ink_controls::host::{DeviceCatalog, InstanceId, Scene};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;
    info!(
        "Starting {} adapter instance(s), models from {}",
        config.controls.len(),
        config.cdn_root
    );

    let (semantic_tx, mut semantic_rx) = mpsc::channel::<SemanticEvent>(config.output_capacity);
    let (host_tx, host_rx) = mpsc::channel(1000);
    let cancel = CancellationToken::new();

    let mut scene = Scene::new(DeviceCatalog::default()).with_model_loads(true);
    for (index, controls) in config.controls.iter().enumerate() {
        let instance = InstanceId(index as u32);
        scene.spawn(instance, controls.clone(), &config.cdn_root, semantic_tx.clone())?;
        scene.activate(instance)?;
    }
    drop(semantic_tx);

    let consumer = tokio::spawn(async move {
        while let Some(event) = semantic_rx.recv().await {
            info!("{} from {}: {:?}", event.name(), event.source, event.payload);
        }
    });

    let collector = CollectorHandle::spawn(
        Some(config.collector.clone().into()),
        host_tx,
        cancel.clone(),
    )
    .await
    .map_err(|e| eyre!("Failed to spawn controller: {}", e))?;

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                interrupt.cancel();
            }
            Err(e) => warn!("Unable to listen for Ctrl-C: {}", e),
        }
    });

    let mut scene = scene.run(host_rx, cancel.clone()).await;
    cancel.cancel();
    scene.shutdown();
    drop(scene);

    tokio::task::spawn_blocking(move || collector.join()).await?;
    consumer.await?;
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    // RUST_LOG=debug surfaces the trigger's analog value
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
