use argus::bootstrap::{default_registry, init_collectors};
use argus::config::{
    Configuration, get_config_base_path, print_config, should_print_config_and_exit,
};
use argus::logging::setup_logging;
use argus::scrape::scrape;
use std::io::Write;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let configuration = Configuration::load(get_config_base_path(std::env::args()))?;
    if should_print_config_and_exit(std::env::args()) {
        print_config(&configuration)?;
        return Ok(());
    }

    let _guard = setup_logging(&configuration.log)?;
    tracing::info!("Starting Argus");

    let registry = default_registry(&configuration)?;
    let collectors = init_collectors(&configuration, &registry)?;

    let families = scrape(&collectors, configuration.scrape.timeout()).await;
    let exposition = prometheus::TextEncoder::new().encode_to_string(&families)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(exposition.as_bytes())?;
    stdout.flush()?;

    tracing::info!(families = families.len(), "Scrape complete");
    Ok(())
}
