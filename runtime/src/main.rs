use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use travelers_map::cli::{self, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Output toggles travel through the environment, read by cli::output.
    if cli.json {
        std::env::set_var("TRAVELERS_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("TRAVELERS_QUIET", "1");
    }
    if cli.no_color {
        std::env::set_var("TRAVELERS_NO_COLOR", "1");
    }

    let directive = if cli.quiet {
        "travelers_map=warn"
    } else {
        "travelers_map=info"
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(directive.parse().context("invalid default log directive")?);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli::output::is_json() {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(cli::run(cli))
}
