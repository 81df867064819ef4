use std::path::Path;

use anyhow::{bail, Context, Result};
use audit_sense::app::{demo_inputs, App};
use audit_sense::config::Config;
use audit_sense::models::{load_bag_from_toml, AuditReport};
use audit_sense::utils::logging;

const USAGE: &str = "usage: audit_sense [api | run <bag.toml>]";

#[tokio::main]
async fn main() -> Result<()> {
    // Optional .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    logging::init(config.verbose_logging);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let app = App::initialize(config).await?;

    match args.first().map(String::as_str) {
        Some("api") => app.run_server().await?,
        Some("run") => {
            let path = args.get(1).context(USAGE)?;
            logging::log_standalone_start(path);
            let inputs = load_bag_from_toml(Path::new(path)).await?;
            print_report(&app.run_standalone(&inputs).await?)?;
        }
        Some(other) => bail!("unknown command `{}`\n{}", other, USAGE),
        None => {
            logging::log_standalone_start("built-in demo bag");
            print_report(&app.run_standalone(&demo_inputs()).await?)?;
        }
    }

    Ok(())
}

fn print_report(report: &AuditReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
