use std::process;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::{ArgEnum, Parser};
use config::{try_crit, try_info, Config, Context};
use orc20_core::clients::{Alerter, BitcoindClient, OrdClient, RedisCache};
use orc20_core::producer::upstream::UpstreamStore;
use orc20_core::{Coordinator, Producer};
use store_postgres::Store;

/// Which half of the pipeline this process runs: the Event Producer alone, or the full
/// Coordinator (which drives its own embedded Producer).
#[derive(Clone, Copy, Debug, ArgEnum)]
enum IndexerRole {
    Event,
    Data,
}

#[derive(Parser, Debug)]
#[clap(name = "orc20-indexer", author, version, about, long_about = None)]
enum Command {
    /// Runs the indexer in one of its two process roles.
    Run {
        #[clap(long, arg_enum)]
        indexer: IndexerRole,
    },
}

fn main() {
    let logger = hiro_system_kit::log::setup_logger();
    let _guard = hiro_system_kit::log::setup_global_logger(logger.clone());
    let ctx = Context {
        logger: Some(logger),
        tracer: false,
    };

    let cmd = Command::parse();
    let rt = tokio::runtime::Runtime::new().expect("unable to start tokio runtime");
    if let Err(e) = rt.block_on(run(cmd, &ctx)) {
        try_crit!(ctx, "{e}");
        std::thread::sleep(std::time::Duration::from_millis(500));
        process::exit(1);
    }
}

async fn run(cmd: Command, ctx: &Context) -> Result<(), String> {
    let config = Config::from_env()?;

    let mut migration_client = store_postgres::pg_connect(&config.pgsql).await?;
    store_postgres::migrations::migrate(&mut migration_client).await?;
    try_info!(ctx, "state store migrations applied");

    let store = Store::new(&config.pgsql)?;
    let bitcoind = BitcoindClient::new(&config.bitcoind);
    let ord = OrdClient::new(&config.ord);
    let upstream = UpstreamStore::new(&config.mysql);
    let redis = match RedisCache::new(&config.redis) {
        Ok(redis) => Some(redis),
        Err(e) => {
            try_info!(ctx, "redis cache disabled: {e}");
            None
        }
    };

    let Command::Run { indexer } = cmd;
    match indexer {
        IndexerRole::Event => {
            let producer = Producer::new(store, upstream, bitcoind, ord, redis);
            install_shutdown_handler(producer.stop_handle());
            let start = config.indexer.core_start_block_height as i64 - 1;
            producer.run(start, ctx).await
        }
        IndexerRole::Data => {
            let alerter = Alerter::new(&config.alert);
            let coordinator = Coordinator::new(
                store,
                config.pgsql.clone(),
                config.indexer.clone(),
                alerter,
                bitcoind,
                ord,
                upstream,
                redis,
            );
            install_shutdown_handler(coordinator.stop_handle());
            coordinator.run(ctx).await
        }
    }
}

/// Sets the shared stop flag on SIGINT/SIGTERM/SIGHUP so the current block or event finishes
/// before the process exits, instead of being cut off mid-write.
fn install_shutdown_handler(stop_flag: Arc<std::sync::atomic::AtomicBool>) {
    ctrlc::set_handler(move || {
        stop_flag.store(true, Ordering::SeqCst);
    })
    .expect("unable to install shutdown handler");
}
