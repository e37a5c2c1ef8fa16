mod commands;
mod terminal;

use commands::{CommandLine, Commands, discover, health};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init(commands.verbose);

    match commands.command {
        Commands::Discover {
            subnet,
            config,
            export,
        } => {
            print::header("getting ready for discovery");
            let settings = commands::load_settings(config.as_deref(), commands.no_dns)?;
            discover::discover(subnet, export, settings).await
        }
        Commands::Health { config } => {
            print::header("checking the ecosystem");
            let settings = commands::load_settings(config.as_deref(), commands.no_dns)?;
            health::health(settings).await
        }
    }
}
