// bin/market.rs - Demo smartphone market
//
// Spawns a directory, a router, two seeded sellers and one buyer, runs a
// single negotiation for the criteria given on the command line, and
// reports the outcome.

use std::time::Duration;

use actix::prelude::*;
use anyhow::{Context as _, Result, bail};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use tradenet::{
    BuyerAgent, Directory, ItemRecord, Lookup, NegotiationCompleted, PeerId, Platform,
    RequestCriteria, Router, SMARTPHONE_MARKET, SellerAgent, SellerConfig, SessionOutcome,
    StartNegotiation, TracingConfig, TracingFormat, init_tracing,
};

/// Demo smartphone market
#[derive(Parser, Debug)]
#[command(name = "tradenet-market")]
#[command(version)]
#[command(about = "Run one buyer negotiation against two seeded sellers", long_about = None)]
struct Args {
    /// Substring of the item name to look for
    #[arg(long)]
    name: Option<String>,

    /// Maximum budget
    #[arg(long)]
    max_price: Option<f64>,

    /// Minimum storage capacity (GB)
    #[arg(long)]
    min_capacity: Option<u32>,

    /// Minimum processor speed (GHz)
    #[arg(long)]
    min_speed: Option<f64>,

    /// Required platform (ios, android, free-os)
    #[arg(long)]
    platform: Option<String>,

    /// Give up on the negotiation after this many milliseconds
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format (pretty, compact, json)
    #[arg(long, default_value = "pretty")]
    log_format: String,
}

impl Args {
    fn criteria(&self) -> Result<RequestCriteria> {
        let platform = match self.platform.as_deref() {
            None => None,
            Some("ios") => Some(Platform::Ios),
            Some("android") => Some(Platform::Android),
            Some("free-os") => Some(Platform::FreeOs),
            Some(other) => bail!("unknown platform '{other}'"),
        };

        Ok(RequestCriteria {
            name: self.name.clone(),
            min_capacity: self.min_capacity,
            min_speed: self.min_speed,
            platform,
            max_price: self.max_price,
        })
    }
}

/// Forwards the buyer's completion notification onto a channel main can
/// await.
struct OutcomeListener {
    tx: mpsc::UnboundedSender<NegotiationCompleted>,
}

impl Actor for OutcomeListener {
    type Context = Context<Self>;
}

impl Handler<NegotiationCompleted> for OutcomeListener {
    type Result = ();

    fn handle(&mut self, msg: NegotiationCompleted, _ctx: &mut Self::Context) {
        let _ = self.tx.send(msg);
    }
}

fn seed_stock() -> Vec<(&'static str, Vec<ItemRecord>)> {
    vec![
        (
            "north-shop",
            vec![
                ItemRecord::new("Galaxy S7", 450.0)
                    .with_capacity(64)
                    .with_speed(2.3)
                    .with_platform(Platform::Android),
                ItemRecord::new("iPhone 13", 900.0)
                    .with_capacity(128)
                    .with_speed(3.2)
                    .with_platform(Platform::Ios),
                ItemRecord::new("Fairphone 4", 580.0)
                    .with_capacity(256)
                    .with_speed(2.7)
                    .with_platform(Platform::FreeOs),
            ],
        ),
        (
            "south-shop",
            vec![
                ItemRecord::new("Galaxy S7", 420.0)
                    .with_capacity(64)
                    .with_speed(2.3)
                    .with_platform(Platform::Android),
                ItemRecord::new("Pixel 6", 650.0)
                    .with_capacity(128)
                    .with_speed(2.8)
                    .with_platform(Platform::Android),
            ],
        ),
    ]
}

async fn wait_until_advertised(
    directory: &Addr<Directory>,
    capability: &str,
    count: usize,
) -> Result<()> {
    for _ in 0..100 {
        let found = directory
            .send(Lookup {
                capability: capability.to_string(),
            })
            .await?;
        if found.len() >= count {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    bail!("sellers failed to advertise in time")
}

#[actix_rt::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(TracingConfig {
        filter: format!("{0},tradenet={0}", args.log_level),
        format: match args.log_format.as_str() {
            "json" => TracingFormat::Json,
            "compact" => TracingFormat::Compact,
            _ => TracingFormat::Pretty,
        },
        with_ansi: args.log_format != "json",
        ..TracingConfig::default()
    });

    let criteria = args.criteria()?;
    info!(version = tradenet::VERSION, "starting demo market");

    let router = Router::new().start();
    let directory = Directory::new().start();

    let seed = seed_stock();
    let seller_count = seed.len();
    for (name, stock) in seed {
        let config = SellerConfig {
            report_interval: Some(Duration::from_secs(20)),
            ..SellerConfig::default()
        };
        SellerAgent::new(PeerId::from(name), config, directory.clone(), router.clone())
            .with_catalog(stock.into_iter().collect())
            .start();
    }
    wait_until_advertised(&directory, SMARTPHONE_MARKET, seller_count).await?;

    let buyer = BuyerAgent::new(PeerId::from("walk-in-buyer"), directory, router).start();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let listener = OutcomeListener { tx }.start();

    let session = buyer
        .send(StartNegotiation {
            capability: SMARTPHONE_MARKET.to_string(),
            criteria: criteria.clone(),
            notify: Some(listener.recipient()),
            deadline: args.deadline_ms.map(Duration::from_millis),
        })
        .await?;
    info!(session = %session, criteria = ?criteria, "negotiation running");

    let completed = rx
        .recv()
        .await
        .context("buyer never reported an outcome")?;
    match completed.outcome {
        SessionOutcome::Purchased { item, seller } => {
            info!(item = %item.name, price = item.price, seller = %seller, "purchase settled");
        }
        SessionOutcome::Failed(reason) => {
            info!(reason = %reason, "no purchase");
        }
    }

    Ok(())
}
