use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sama_pay::config::{config_path, load_config, save_config_to, AppConfig};
use sama_pay::psp::{build_driver, build_transport, Driver};
use sama_pay::Invoice;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Sama payment gateway client", long_about = None)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Payment driver to use
    #[arg(long, global = true, default_value = "sama")]
    driver: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a config file with empty settings to fill in
    Init {
        /// Replace an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Open a transaction and print where to send the payer
    Purchase {
        /// Amount in the configured currency unit
        #[arg(long)]
        amount: i64,
        /// Buyer phone number
        #[arg(long)]
        mobile: Option<String>,
        /// Hosted payment page prefix; the transaction id is appended
        #[arg(long)]
        payment_link: String,
        /// Use this id as the invoice uuid instead of a generated one
        #[arg(long)]
        uuid: Option<String>,
        /// Print an auto-submitting HTML form instead of JSON
        #[arg(long)]
        html: bool,
    },
    /// Verify the pending payment and print the receipt
    Verify,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sama_pay=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let path = cli.config.clone().unwrap_or_else(config_path);

    match cli.command {
        Command::Init { force } => init(&path, force),
        Command::Purchase {
            amount,
            mobile,
            payment_link,
            uuid,
            html,
        } => {
            let mut invoice = Invoice::new(amount)
                .via(&cli.driver)
                .with_detail("payment_link", payment_link);
            if let Some(mobile) = mobile {
                invoice = invoice.with_detail("mobile", mobile);
            }
            if let Some(uuid) = uuid {
                invoice = invoice.with_uuid(uuid);
            }

            let mut driver = load_driver(&cli.driver, &path, invoice)?;
            let transaction_id = driver.purchase().await?;
            let form = driver.pay();

            if html {
                println!("{}", form.render());
            } else {
                let out = serde_json::json!({
                    "transaction_id": transaction_id,
                    "invoice": driver.invoice(),
                    "redirect": form.to_json(),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
            Ok(())
        }
        Command::Verify => {
            let driver = load_driver(&cli.driver, &path, Invoice::new(0).via(&cli.driver))?;
            let receipt = driver.verify().await?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
            Ok(())
        }
    }
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists, pass --force to replace it",
            path.display()
        );
    }
    save_config_to(path, &AppConfig::default())?;
    println!("{}", path.display());
    Ok(())
}

fn load_driver(name: &str, path: &Path, invoice: Invoice) -> Result<Box<dyn Driver>> {
    let config = load_config(Some(path))?;
    config
        .validate()
        .with_context(|| format!("fix the settings in {}", path.display()))?;

    let transport = build_transport(&config)?;
    Ok(build_driver(name, invoice, &config, transport)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sama_pay::config::load_config_from;

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        init(&path, false).unwrap();
        assert!(init(&path, false).is_err());
        init(&path, true).unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn cli_parses_purchase_arguments() {
        let cli = Cli::try_parse_from([
            "sama-pay",
            "--config",
            "/tmp/sama.json",
            "purchase",
            "--amount",
            "1500",
            "--payment-link",
            "https://pay.example/",
            "--mobile",
            "09120000000",
        ])
        .unwrap();

        assert_eq!(cli.driver, "sama");
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/sama.json")));
        match cli.command {
            Command::Purchase {
                amount,
                mobile,
                payment_link,
                html,
                ..
            } => {
                assert_eq!(amount, 1500);
                assert_eq!(mobile.as_deref(), Some("09120000000"));
                assert_eq!(payment_link, "https://pay.example/");
                assert!(!html);
            }
            _ => panic!("expected purchase command"),
        }
    }
}
