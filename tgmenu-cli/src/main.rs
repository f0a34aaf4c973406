//! tgmenu CLI: runs the demo menu bot. Config from env and optional CLI args.

use anyhow::Result;
use clap::Parser;
use tgmenu_cli::{load_config, start_message, Cli, Commands};
use tgmenu_telegram::run_menu_bot;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { token } => {
            let config = load_config(token)?;
            run_menu_bot(config, start_message).await
        }
    }
}
