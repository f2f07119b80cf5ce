use std::io::{self, Read};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use sync_destination_protocol::{
    init_logging, ChangeEvent, DestinationConfig, DirectoryEntry, SyncDestination,
    SyncDestinationPlugin, TracingServerContext,
};
use sync_destination_sqs::{projector, SqsDestinationPlugin, QUEUE_ARGUMENT};

#[derive(Parser)]
#[command(about = "Amazon SQS sync destination plugin", version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the plugin name, description and configuration arguments as JSON
    Describe,
    /// Read a directory entry as JSON from stdin and print its document
    Project,
    /// Read a change event as JSON from stdin and publish it to a queue
    Publish {
        /// Name of the SQS queue to publish to
        #[arg(long)]
        queue: String,
    },
}

fn read_stdin() -> Result<String> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read input from stdin")?;
    Ok(input)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let plugin = SqsDestinationPlugin::new();

    match cli.command {
        Commands::Describe => {
            let description = json!({
                "name": plugin.name(),
                "key": plugin.key(),
                "description": plugin.description(),
                "config_arguments": plugin.config_arguments(),
            });
            serde_json::to_writer_pretty(io::stdout(), &description)?;
            println!();
        }
        Commands::Project => {
            let input = read_stdin()?;
            let entry: Option<DirectoryEntry> =
                serde_json::from_str(&input).context("Input is not a directory entry")?;

            match projector::project(entry.as_ref())? {
                Some(document) => println!("{document}"),
                // Emit explicit null to signal there is nothing to publish
                None => println!("null"),
            }
        }
        Commands::Publish { queue } => {
            let input = read_stdin()?;
            let change: ChangeEvent =
                serde_json::from_str(&input).context("Input is not a change event")?;

            let config = DestinationConfig::new().with_value(QUEUE_ARGUMENT, queue);
            let mut destination = plugin
                .initialize(&TracingServerContext, &config)
                .context("Failed to initialize destination")?;

            let published = destination
                .publish(&change)
                .with_context(|| format!("Failed to publish {} of '{}'", change.kind, change.dn()));
            destination.finalize();
            published?;
        }
    }

    Ok(())
}
