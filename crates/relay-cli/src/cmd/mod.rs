use anyhow::Result;

use crate::args::{Cli, Command};

mod catalog;
mod replay;
mod run;

pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        None => run::run(&cli.schemas, cli.run).await,
        Some(Command::Run(args)) => run::run(&cli.schemas, args).await,
        Some(Command::Replay { feed, configuration, summary }) => {
            replay::run(&cli.schemas, &feed, configuration.as_deref(), summary).await
        }
        Some(Command::Catalog) => catalog::run(&cli.schemas).await,
    }
}
