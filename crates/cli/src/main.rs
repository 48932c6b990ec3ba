#![deny(warnings)]

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use translate_relay_core::config::{
    resolve_string_with_default, RelayConfig, StdEnv, DEFAULT_CONFIG_PATH, DEFAULT_PROXIES_PATH,
    ENV_CONFIG_PATH, ENV_PROXIES_PATH,
};
use translate_relay_core::proxy::FileProxySource;
use translate_relay_core::record::{take_input, write_output};
use translate_relay_core::relay::{ChainDriver, LanguageChain};
use translate_relay_core::translate::GoogleTranslator;

#[derive(Parser, Debug)]
#[command(name = "translate-relay")]
#[command(about = "Relay text through a chain of languages over a racing proxy pool")]
struct Args {
    /// Input file; overwritten with the result when the chain completes.
    file: PathBuf,

    /// Comma-separated languages; the first one is the source language.
    languages: String,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    proxies: Option<String>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let env = StdEnv;
    let config_path =
        resolve_string_with_default(args.config, ENV_CONFIG_PATH, &env, DEFAULT_CONFIG_PATH);
    let proxies_path =
        resolve_string_with_default(args.proxies, ENV_PROXIES_PATH, &env, DEFAULT_PROXIES_PATH);

    let cfg = RelayConfig::load(Path::new(&config_path), &env)
        .with_context(|| format!("loading {config_path}"))?;
    let chain = LanguageChain::parse(&args.languages)?;

    tracing::info!(
        timeout_s = cfg.http_timeout.as_secs(),
        retries = cfg.http_retries,
        hop_attempts = ?cfg.hop_attempts,
        proxies = %proxies_path,
        "config loaded"
    );

    let text = take_input(&args.file).await?;

    let driver = ChainDriver::new(
        GoogleTranslator::new(cfg.http_timeout),
        FileProxySource::new(proxies_path),
        cfg,
    );
    let record = driver.run(&text, &chain).await?;

    tracing::info!(file = %args.file.display(), "done translating, saving");
    write_output(&args.file, &record).await?;

    Ok(())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}
