use anyhow::Result;

use lea_config::LeaConfig;
use lea_core::OutputFormat;

pub(crate) fn handle_config_show(format: OutputFormat) -> Result<()> {
    let config = LeaConfig::load()?;

    match format {
        OutputFormat::Json => {
            let json_str = serde_json::to_string_pretty(&config)?;
            println!("{}", json_str);
        }
        OutputFormat::Text => {
            let toml_str = toml::to_string_pretty(&config)?;
            print!("{}", toml_str);
        }
    }
    Ok(())
}

pub(crate) fn handle_config_init() -> Result<()> {
    let path = LeaConfig::config_path()?;
    LeaConfig::save_default_template(&path)?;
    eprintln!("Generated config template at: {}", path.display());
    eprintln!("  Store your API key with `lea key set`.");
    Ok(())
}

pub(crate) fn handle_config_path() -> Result<()> {
    println!("{}", LeaConfig::config_path()?.display());
    Ok(())
}
