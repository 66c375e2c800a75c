use einvoicing_service::{config::Config, Application};
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG wins over the default filter when set.
    init_tracing("info,einvoicing_service=debug");

    let config = Config::load()?;
    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    Ok(())
}
