use anyhow::Result;
use clap::Parser;

mod cli;
mod config_cmds;
mod context;
mod key_cmds;
mod render;
mod search_cmds;

use cli::{Cli, Commands, ConfigCommands, KeyCommands, SearchCommands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for --format json.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    let format = cli.format;

    match cli.command {
        Commands::Key { cmd } => match cmd {
            KeyCommands::Set { key } => key_cmds::handle_key_set(key, format)?,
            KeyCommands::Clear => key_cmds::handle_key_clear(format)?,
            KeyCommands::Status => key_cmds::handle_key_status(format)?,
        },
        Commands::Search { cmd } => match cmd {
            SearchCommands::New {
                service_description,
                target_area,
                target_audience,
                service_url,
                attachments,
            } => {
                let input = search_cmds::build_brief_input(
                    service_description,
                    target_area,
                    target_audience,
                    service_url,
                    &attachments,
                )?;
                search_cmds::handle_search_new(input, format).await?;
            }
            SearchCommands::List => search_cmds::handle_search_list(format)?,
            SearchCommands::Show { id } => search_cmds::handle_search_show(&id, format)?,
            SearchCommands::Resume { id } => search_cmds::handle_search_resume(&id, format).await?,
            SearchCommands::Delete { id } => search_cmds::handle_search_delete(&id, format)?,
            SearchCommands::Email { id, lead } => {
                search_cmds::handle_search_email(&id, &lead, format)?
            }
        },
        Commands::Config { cmd } => match cmd {
            ConfigCommands::Show => config_cmds::handle_config_show(format)?,
            ConfigCommands::Init => config_cmds::handle_config_init()?,
            ConfigCommands::Path => config_cmds::handle_config_path()?,
        },
    }

    Ok(())
}
