use anyhow::Context;
use tessview::ViewerConfig;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,tessview=info"),
    )
    .init();

    let config = ViewerConfig::from_env();
    log::info!("Loading {}", config.model_path().display());

    tessview::run(config).context("viewer terminated with an error")
}
