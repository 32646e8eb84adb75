use clap::Parser;
use fiatpay::application::processor::PaymentProcessor;
use fiatpay::config::ProcessorConfig;
use fiatpay::domain::account::AccountId;
use fiatpay::domain::money::{Currency, FiatAmount};
use fiatpay::infrastructure::in_memory::InMemoryGateway;
use fiatpay::interfaces::csv::command_reader::CommandReader;
use fiatpay::interfaces::csv::result_writer::ResultWriter;
use fiatpay::interfaces::runner::ScriptRunner;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Command script CSV file
    input: PathBuf,

    /// Account identifier at the gateway
    #[arg(long, default_value = "fiatpay-account")]
    account_id: String,

    /// Starting gateway balance, e.g. USD=100.00. Repeat for several currencies.
    #[arg(long = "balance", value_parser = parse_balance)]
    balances: Vec<FiatAmount>,

    /// Seconds between two balance polls
    #[arg(long, default_value_t = 30)]
    polling_interval_secs: u64,

    /// Make the simulated gateway reject every payment
    #[arg(long)]
    fail_payments: bool,
}

fn parse_balance(value: &str) -> std::result::Result<FiatAmount, String> {
    let (code, amount) = value
        .split_once('=')
        .ok_or_else(|| format!("expected CURRENCY=AMOUNT, got '{value}'"))?;
    let currency = Currency::new(code).map_err(|e| e.to_string())?;
    let amount: Decimal = amount
        .trim()
        .parse()
        .map_err(|e| format!("invalid amount '{amount}': {e}"))?;
    Ok(FiatAmount::new(amount, currency))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, stdout carries the results.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fiatpay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let account_id = AccountId::new(cli.account_id).into_diagnostic()?;
    let gateway = InMemoryGateway::new(account_id.clone());
    for balance in cli.balances {
        gateway.set_balance(balance).await;
    }
    if cli.fail_payments {
        gateway.fail_payments(Some("payments disabled")).await;
    }

    let config = ProcessorConfig::new(account_id)
        .with_polling_interval(Duration::from_secs(cli.polling_interval_secs));
    let handle = PaymentProcessor::start(config, Arc::new(gateway))
        .await
        .into_diagnostic()?;
    let runner = ScriptRunner::new(handle.clone());

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    let stdout = io::stdout();
    let mut writer = ResultWriter::new(stdout.lock());

    for command in reader.commands() {
        match command {
            Ok(command) => {
                let result = runner.execute(command).await;
                writer.write(&result).into_diagnostic()?;
            }
            Err(e) => {
                eprintln!("Error reading command: {}", e);
            }
        }
    }
    writer.flush().into_diagnostic()?;

    handle.stop().await.into_diagnostic()?;
    Ok(())
}
