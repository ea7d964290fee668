mod config;
mod form;
mod record;
mod store;
mod ui;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

/// Edit a single contact file: name, address, phones, mails and comments.
/// Run without a path to start a new, unnamed contact.
#[derive(Parser, Debug)]
#[command(name = "onecard", version)]
struct Cli {
    /// Path to the contact file to open
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load()?;

    let mut app = ui::app::App::new(cli.file, &config);
    app.run()?;

    Ok(())
}
