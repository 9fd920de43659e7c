use std::io::{BufRead, IsTerminal, Write};

use anyhow::{Result, bail};
use lea_core::OutputFormat;

use crate::context;

pub(crate) fn handle_key_set(key: Option<String>, format: OutputFormat) -> Result<()> {
    let key = match key {
        Some(key) => key,
        None => read_key_from_stdin()?,
    };

    let controller = context::open(None)?;
    controller.bootstrap();
    controller.submit_credential(&key)?;
    let hint = controller.credential_hint().unwrap_or_default();

    match format {
        OutputFormat::Json => {
            crate::render::print_json(&serde_json::json!({ "stored": true, "key": hint }))?
        }
        OutputFormat::Text => eprintln!("API key stored ({hint})."),
    }
    Ok(())
}

pub(crate) fn handle_key_clear(format: OutputFormat) -> Result<()> {
    let controller = context::open(None)?;
    controller.change_credential()?;
    match format {
        OutputFormat::Json => crate::render::print_json(&serde_json::json!({ "stored": false }))?,
        OutputFormat::Text => eprintln!("API key removed."),
    }
    Ok(())
}

pub(crate) fn handle_key_status(format: OutputFormat) -> Result<()> {
    let controller = context::open(None)?;
    let view = controller.bootstrap();
    let hint = controller.credential_hint();

    match format {
        OutputFormat::Json => crate::render::print_json(&serde_json::json!({
            "stored": hint.is_some(),
            "key": hint,
            "message": view.last_error,
        }))?,
        OutputFormat::Text => match (hint, view.last_error) {
            (Some(hint), _) => println!("API key: {hint}"),
            (None, Some(message)) => println!("{message}"),
            (None, None) => println!("No API key stored. Run `lea key set` to add one."),
        },
    }
    Ok(())
}

fn read_key_from_stdin() -> Result<String> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        eprint!("API key: ");
        std::io::stderr().flush()?;
    }
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    let key = line.trim().to_string();
    if key.is_empty() {
        bail!("API key cannot be empty.");
    }
    Ok(key)
}
