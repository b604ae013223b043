//! `murmur start` -- full host startup.
//!
//! # Lifecycle
//!
//! ```text
//! 1. Discover modules under the modules root
//! 2. Merge module configs, root config, and user overrides
//! 3. Registration phase 1 (collect pipeline inputs)
//! 4. Build the pipeline and install it into the context
//! 5. Registration phase 2 (attach to the pipeline)
//! 6. Report what attached, then wait for Ctrl+C
//! ```

use std::sync::Arc;

use tracing::info;

use murmur_core::{Coordinator, ModuleSet, RegistrationContext};
use murmur_types::ModuleServerConfig;

use super::{load_host, HostOptions};

pub async fn run(options: &HostOptions) -> anyhow::Result<()> {
    let (records, config) = load_host(options)?;
    info!(
        modules = records.len(),
        root = %options.root_config_path.display(),
        "configuration merged"
    );

    for record in &records {
        match ModuleServerConfig::from_config(&config, &record.id) {
            Some(server) => info!(
                module = %record.id,
                order = record.manifest.order,
                endpoint = %server.base_url(),
                "module runs as a service"
            ),
            None => info!(
                module = %record.id,
                order = record.manifest.order,
                "module runs in-process"
            ),
        }
    }

    // In-process capability wiring goes here as modules gain native
    // implementations; an empty set still exercises the full handshake.
    let capabilities = ModuleSet::new();
    let coordinator = Coordinator::new(records, &capabilities);
    let mut ctx = RegistrationContext::new(Arc::new(config));
    let pipeline = coordinator.run_startup(&mut ctx);

    info!(
        retrieval = pipeline.retrieval().is_some(),
        web_handler = pipeline.web_handler().is_some(),
        "pipeline assembled"
    );

    info!("murmur host running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("received shutdown signal");
    Ok(())
}
