use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use unifiedx::core::errors::ExchangeError;
use unifiedx::{ExchangeFactory, ExchangeType};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let exchange = args.next().unwrap_or_else(|| "kraken".to_string());
    let symbol = args.next().unwrap_or_else(|| "BTC/USDT".to_string());

    let exchange_type: ExchangeType = exchange.parse()?;
    let connector = ExchangeFactory::create_from_env(exchange_type.id())
        .with_context(|| format!("building the {} connector", exchange_type))?;

    match connector.fetch_status().await {
        Ok(status) => info!(exchange = %exchange_type, status = ?status.status, "Exchange status"),
        Err(ExchangeError::NotSupported(_)) => {
            let time = connector
                .fetch_time()
                .await
                .with_context(|| format!("fetching {} server time", exchange_type))?;
            info!(exchange = %exchange_type, server_time = time, "Exchange reachable");
        }
        Err(e) => warn!(exchange = %exchange_type, error = %e, "Status check failed"),
    }

    let ticker = connector
        .fetch_ticker(&symbol)
        .await
        .with_context(|| format!("fetching the {} ticker on {}", symbol, exchange_type))?;
    println!(
        "{} {}: last={} bid={} ask={}",
        exchange_type,
        ticker.symbol,
        display(ticker.last),
        display(ticker.bid),
        display(ticker.ask)
    );

    Ok(())
}

fn display(value: Option<rust_decimal::Decimal>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.normalize().to_string())
}
