use anyhow::Result;
use clap::Parser;

mod args;
mod cmd;
mod io;
mod output;
mod settings;
mod sink;
mod telemetry;

fn main() -> Result<()> {
    let cli = args::Cli::parse();
    telemetry::init(cli.debug, cli.log_json);

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let result = runtime.block_on(cmd::dispatch(cli));
    // A pending stdin read cannot be cancelled.
    runtime.shutdown_background();
    result
}
