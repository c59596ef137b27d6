use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use anyhow::anyhow;
use aside_cache::prelude::*;
use aside_cache::test::db;
use aside_cache::test::db::entity::shop;
use aside_cache::test::db::prelude::*;
use aside_cache::test::ShopService;
use clap::Parser;
use rand::Rng;
use sea_orm::ActiveValue;
use tokio::task::JoinSet;

/// Hammer a small shop catalogue through the cache and report how many reads reached the database.
#[derive(Debug, Clone, Parser)]
#[clap(about, version, author, name = "shop")]
struct Cli {
    /// Read policy: pass-through, mutex or logical-expiry.
    #[clap(long, short, env = "ASIDE_CACHE_STRATEGY", default_value_t = StrategyKind::Mutex)]
    strategy: StrategyKind,

    /// Number of concurrent readers.
    #[clap(long, short, env = "ASIDE_CACHE_READERS", default_value_t = 50)]
    readers: usize,

    /// Reads per reader.
    #[clap(long, env = "ASIDE_CACHE_ROUNDS", default_value_t = 20)]
    rounds: usize,

    /// Number of shops in the database.
    #[clap(long, env = "ASIDE_CACHE_SHOPS", default_value_t = 10)]
    shops: i64,

    /// Number of ids that are read but do not exist.
    #[clap(long, env = "ASIDE_CACHE_MISSING", default_value_t = 2)]
    missing: i64,

    /// Simulated database latency, in milliseconds.
    #[clap(long, env = "ASIDE_CACHE_DB_LATENCY", default_value_t = 100)]
    db_latency: u64,

    /// Pause between two reads of the same reader, in milliseconds.
    #[clap(long, env = "ASIDE_CACHE_PAUSE", default_value_t = 10)]
    pause: u64,

    /// Record TTL in milliseconds. Logical for logical-expiry, physical otherwise.
    #[clap(long, env = "ASIDE_CACHE_TTL", default_value_t = 100)]
    ttl: u64,

    /// Lock TTL, in milliseconds.
    #[clap(long, env = "ASIDE_CACHE_LOCK_TTL", default_value_t = 10_000)]
    lock_ttl: u64,

    /// Sleep between two lock attempts, in milliseconds.
    #[clap(long, env = "ASIDE_CACHE_RETRY_BACKOFF", default_value_t = 50)]
    retry_backoff: u64,

    /// Upper bound of random TTL extension, in milliseconds.
    #[clap(long, env = "ASIDE_CACHE_TTL_JITTER", default_value_t = 0)]
    ttl_jitter: u64,

    /// Background rebuild workers.
    #[clap(long, env = "ASIDE_CACHE_REBUILD_WORKERS", default_value_t = DEFAULT_REBUILD_WORKERS)]
    rebuild_workers: usize,

    /// Record encoding: json or postcard.
    #[clap(long, env = "ASIDE_CACHE_WIRE_FORMAT", default_value_t = WireFormat::Json)]
    wire_format: WireFormat,

    #[clap(long, env = "ASIDE_CACHE_DATABASE_URL", default_value = "sqlite::memory:")]
    database_url: String,
}

#[derive(Default)]
struct Tally {
    found:  AtomicUsize,
    absent: AtomicUsize,
    failed: AtomicUsize,
}

#[cfg(feature = "tracing")]
fn setup_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    tracing::info!("Tracing initialized");
    Ok(())
}

fn cache_config(cli: &Cli) -> anyhow::Result<CacheConfig> {
    let config = CacheConfig::builder()
        .lock_ttl(Duration::from_millis(cli.lock_ttl))
        .retry_backoff(Duration::from_millis(cli.retry_backoff))
        .ttl_jitter(Duration::from_millis(cli.ttl_jitter))
        .wire_format(cli.wire_format)
        .build()
        .map_err(|e| anyhow!("{e}"))?;
    config.validate()?;
    Ok(config)
}

async fn seed(service: &ShopService<MemoryStore>, cli: &Cli) -> anyhow::Result<()> {
    for id in 1..=cli.shops {
        service
            .add_shop(Shop {
                id,
                name: format!("Shop #{id}"),
                type_id: id % 3 + 1,
                address: format!("{id} Market St"),
                avg_price: 50 + id * 10,
                score: 40,
            })
            .await?;
    }

    if cli.strategy == StrategyKind::LogicalExpiry {
        for id in 1..=cli.shops {
            service.save_shop_to_cache(id, Duration::from_millis(cli.ttl)).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "tracing")]
    setup_tracing()?;

    let store = Arc::new(MemoryStore::builder().build().map_err(|e| anyhow!("{e}"))?);
    let client = CacheClient::builder()
        .store(store)
        .config(cache_config(&cli)?)
        .scheduler(Arc::new(RebuildScheduler::new(cli.rebuild_workers)))
        .build()
        .map_err(|e| anyhow!("{e}"))?;
    let client = Arc::new(client);

    let db = db::connect(&cli.database_url).await?;
    let service = ShopService::new(db, Arc::clone(&client))
        .with_load_delay(Duration::from_millis(cli.db_latency))
        .with_shop_ttl(Duration::from_millis(cli.ttl));
    seed(&service, &cli).await?;
    let service = Arc::new(service);

    let tally = Arc::new(Tally::default());
    let started = Instant::now();
    let mut readers = JoinSet::new();
    for _ in 0..cli.readers {
        let service = Arc::clone(&service);
        let tally = Arc::clone(&tally);
        let max_id = cli.shops + cli.missing;
        let (kind, rounds, pause) = (cli.strategy, cli.rounds, Duration::from_millis(cli.pause));
        readers.spawn(async move {
            for _ in 0..rounds {
                let id = rand::rng().random_range(1..=max_id);
                match service.query_by_id(id, kind).await {
                    Ok(Some(_)) => tally.found.fetch_add(1, Ordering::Relaxed),
                    Ok(None) => tally.absent.fetch_add(1, Ordering::Relaxed),
                    Err(err) => {
                        eprintln!("read of shop #{id} failed: {err}");
                        tally.failed.fetch_add(1, Ordering::Relaxed)
                    }
                };
                tokio::time::sleep(pause).await;
            }
        });
    }
    while let Some(joined) = readers.join_next().await {
        joined?;
    }
    let elapsed = started.elapsed();
    client.scheduler().wait_idle().await;

    println!("strategy:        {}", cli.strategy);
    println!("reads:           {}", cli.readers * cli.rounds);
    println!("  found:         {}", tally.found.load(Ordering::Relaxed));
    println!("  absent:        {}", tally.absent.load(Ordering::Relaxed));
    println!("  failed:        {}", tally.failed.load(Ordering::Relaxed));
    println!("database loads:  {}", service.loads());
    println!("elapsed:         {elapsed:.2?}");

    // Write path: update, then the next read picks the new row up.
    let renamed = service
        .update_shop(shop::ActiveModel {
            id: ActiveValue::Unchanged(1),
            name: ActiveValue::Set("Shop #1 (renamed)".to_string()),
            ..Default::default()
        })
        .await?;
    if cli.strategy != StrategyKind::LogicalExpiry {
        let reread = service.query_by_id(1, cli.strategy).await?;
        println!(
            "after update:    {:?} (expected {:?})",
            reread.map(|s| s.name),
            renamed.name
        );
    }

    client.close().await;
    Ok(())
}
