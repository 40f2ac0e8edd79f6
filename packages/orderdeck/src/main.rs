use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::prelude::*;

mod config;
mod source;

use crate::config::{FileConfig, load_config};
use crate::source::OrderServiceSource;
use live_sync::LiveSync;
use order_api::{OrderServiceClient, OrderStatus};

#[derive(Parser)]
#[command(name = "deck")]
#[command(about = "Live order dashboard over the order service push channel")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Custom config directory (defaults to ~/.orderdeck)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow connection state, live activity and headline figures
    Watch,

    /// Fetch one snapshot of aggregates and recent orders, print, exit
    Overview,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_directive = if cli.debug {
        "orderdeck=debug,live_sync=debug,info"
    } else {
        "orderdeck=info,live_sync=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    let config_dir = cli.config_dir.unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".orderdeck")
    });
    let file_config: FileConfig = load_config(&config_dir)
        .extract()
        .context("failed to load configuration")?;

    match cli.command {
        Commands::Watch => run_watch(file_config).await,
        Commands::Overview => run_overview(file_config).await,
    }
}

fn api_client(config: &FileConfig) -> OrderServiceClient {
    let mut client = OrderServiceClient::new(config.api.base_url.clone());
    if let Some(token) = &config.api.bearer_token {
        client = client.with_bearer_token(token.clone());
    }
    client
}

/// Run the sync core and mirror its views to stdout until Ctrl-C.
async fn run_watch(config: FileConfig) -> Result<()> {
    let source = OrderServiceSource::new(api_client(&config));
    let sync = LiveSync::start(config.sync_config(), source)
        .context("failed to start live synchronization")?;

    let mut state = sync.connection_state();
    let mut render_tick = tokio::time::interval(Duration::from_millis(500));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut rendered_revision = 0u64;

    println!("realtime stream: {}", sync.current_state());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("realtime stream: {}", *state.borrow_and_update());
            }
            _ = render_tick.tick() => {
                if sync.revision() != rendered_revision {
                    rendered_revision = sync.revision();
                    render(&sync);
                }
            }
        }
    }

    info!("shutting down");
    sync.stop().await;
    Ok(())
}

/// Print the current views. Issues are logged by the core; the only thing
/// surfaced here is the most recent fetch failure, next to the (stale but
/// still rendered) data.
fn render(sync: &LiveSync) {
    println!();
    if let Some(analytics) = sync.analytics() {
        let fulfillment = if analytics.total_orders > 0 {
            analytics.count_for(OrderStatus::Delivered) * 100 / analytics.total_orders
        } else {
            0
        };
        println!(
            "orders {}   revenue ${:.2}   avg ${:.2}   fulfillment {}%",
            analytics.total_orders,
            analytics.total_revenue,
            analytics.average_order_value,
            fulfillment
        );
    }
    if let Some(error) = sync.last_fetch_error() {
        println!("last refresh failed: {error}");
    }

    let feed = sync.activity_feed();
    if !feed.is_empty() {
        println!("activity:");
        for entry in feed {
            println!(
                "  {}  #{} {} {}",
                entry.recorded_at.format("%H:%M:%S"),
                entry.order_id,
                entry.customer_name,
                entry.status
            );
        }
    }

    let recent = sync.recent_orders();
    if !recent.is_empty() {
        println!("recent orders:");
        for order in recent {
            println!(
                "  #{} {}  ${:.2}  {}",
                order.id, order.customer_name, order.total_price, order.status
            );
        }
    }
}

/// One-shot overview: the same two fetches the live core coalesces,
/// printed once.
async fn run_overview(config: FileConfig) -> Result<()> {
    let client = api_client(&config);
    let (analytics, recent) = tokio::try_join!(
        client.order_analytics(),
        client.recent_orders(config.views.snapshot_page_size),
    )
    .context("order service request failed")?;

    println!(
        "orders {}   revenue ${:.2}   avg ${:.2}",
        analytics.total_orders, analytics.total_revenue, analytics.average_order_value
    );
    for status in OrderStatus::ALL {
        let count = analytics.count_for(status);
        if count > 0 {
            println!("  {:<10} {}", status, count);
        }
    }
    if recent.is_empty() {
        println!("no recent orders");
    } else {
        println!("recent orders:");
        for order in recent {
            println!(
                "  #{} {}  {}  ${:.2}  {}",
                order.id,
                order.customer_name,
                order.product_description,
                order.total_price,
                order.status
            );
        }
    }
    Ok(())
}
