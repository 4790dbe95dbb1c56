use anyhow::Result;

use packetsleuth_cli::{agent, telemetry, AgentConfig, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    telemetry::init(cli.verbose);

    match cli.command {
        Some(Commands::Interfaces { all }) => agent::print_interfaces(all)?,
        None => {
            let config = AgentConfig::from_cli(&cli)?;
            agent::run(config).await?;
        }
    }

    Ok(())
}
