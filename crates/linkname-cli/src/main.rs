use anyhow::anyhow;
use clap::CommandFactory;
use linkname_core::ErrorKind;
use linkname_gen::args::Cli;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let raw: Vec<String> = std::env::args().collect();
    let cli = Cli::parse_go_style(raw.clone());

    if let Err(e) = init_tracing(&cli) {
        eprintln!("linkname-gen: {:#}", e);
    }

    match linkname_gen::run(&cli, raw.into_iter().skip(1).collect()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            if err.kind() == ErrorKind::Usage {
                eprintln!("{}", Cli::command().render_usage());
            }
            ExitCode::from(err.exit_code())
        }
    }
}

fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.debug) // Show target module in debug mode
        .with_writer(std::io::stderr)
        .without_time()
        .try_init()
        .map_err(|e| anyhow!("initializing logging: {}", e))
}
