use std::path::PathBuf;

use clap::Parser;
use hashkv::{
    server::Server,
    telemetry::{initialize_fmt_subscriber, initialize_jaeger_subscriber},
};

#[derive(Debug, Parser)]
#[command(name = "hashkv-node")]
#[command(about = "hashkv storage node (tcp server)", long_about = None)]
struct Cli {
    #[arg(long)]
    config_path: PathBuf,
    #[arg(short, long, default_value = "false")]
    tracing_jaeger: bool,
    #[arg(long, default_value = "http://localhost:4317/v1/traces")]
    jaeger_endpoint: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    if args.tracing_jaeger {
        initialize_jaeger_subscriber(&args.jaeger_endpoint)?;
    } else {
        initialize_fmt_subscriber()?;
    }

    let mut server = Server::from_config(args.config_path).await?;
    server.run(tokio::signal::ctrl_c()).await?;

    Ok(())
}
