use std::path::PathBuf;
use std::process::exit;
use std::thread;
use std::time::Duration;

use clap::Parser;
use log::{error, info};

use elastic_pool::{ElasticPool, PoolConfig, PoolError, Result, Shutdown};

/// Share of the run spent in the initial flood.
const FLOOD_SHARE: f64 = 0.1;
/// Share of the run after which the tail phase starts.
const TAIL_SHARE: f64 = 0.8;
/// Inter-arrival delay of the steady phase, in milliseconds.
const STEADY_DELAY_MS: f64 = 100.0;
/// Inter-arrival delay of the tail phase, in milliseconds.
const TAIL_DELAY_MS: f64 = 300.0;

#[derive(Parser)]
#[command(
    name = "elastic-pool-sim",
    version,
    about = "Replays a three-phase bursty load against an elastic pool"
)]
struct Cli {
    /// JSON pool configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Upper bound on live workers
    #[arg(long)]
    max_workers: Option<usize>,

    /// Workers added or removed per resize
    #[arg(long)]
    step_size: Option<usize>,

    /// Occupancy above which the pool expands
    #[arg(long)]
    expand_threshold: Option<f64>,

    /// Occupancy below which the pool reduces
    #[arg(long)]
    reduce_threshold: Option<f64>,

    /// Capacity of the task queue
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Number of tasks to submit
    #[arg(long, default_value_t = 1000)]
    tasks: usize,

    /// Multiplier applied to every delay and task duration
    #[arg(long, default_value_t = 0.05, value_name = "FACTOR")]
    time_scale: f64,

    /// Print the final statistics as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{}", e);
        exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    if !cli.time_scale.is_finite() || cli.time_scale < 0.0 {
        return Err(PoolError::InvalidConfig(format!(
            "time scale must be a finite non-negative number, got {}",
            cli.time_scale
        )));
    }
    info!("elastic-pool-sim {}", env!("CARGO_PKG_VERSION"));
    info!("Pool configuration: {:?}", config);

    let pool = ElasticPool::new(config)?;
    let scale = cli.time_scale;
    let flood_end = (cli.tasks as f64 * FLOOD_SHARE) as usize;
    let tail_start = (cli.tasks as f64 * TAIL_SHARE) as usize;

    for i in 0..cli.tasks {
        let delay_ms = if i < flood_end {
            i as f64
        } else if i > tail_start {
            TAIL_DELAY_MS
        } else {
            STEADY_DELAY_MS
        };
        thread::sleep(scaled(delay_ms, scale));

        let work = scaled(i as f64, scale);
        pool.submit(move || thread::sleep(work))?;
    }

    info!("All {} tasks submitted, waiting for the queue to drain", cli.tasks);
    while pool.pending_count() > 0 {
        info!("Pending tasks: {}", pool.pending_count());
        thread::sleep(Duration::from_millis(100));
    }
    pool.close(Shutdown::Drain);

    let stats = pool.stats();
    info!(
        "Done: {} completed, {} panicked, {} expansions, {} reductions",
        stats.completed_tasks, stats.panicked_tasks, stats.expansions, stats.reductions
    );
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Ok(())
}

/// Loads the config file if given and applies command-line overrides.
fn resolve_config(cli: &Cli) -> Result<PoolConfig> {
    let mut config = match &cli.config {
        Some(path) => PoolConfig::read_json_file(path)?,
        None => PoolConfig::default(),
    };

    if let Some(max_workers) = cli.max_workers {
        config.max_workers = max_workers;
    }
    if let Some(step_size) = cli.step_size {
        config.step_size = step_size;
    }
    if let Some(expand_threshold) = cli.expand_threshold {
        config.expand_threshold = expand_threshold;
    }
    if let Some(reduce_threshold) = cli.reduce_threshold {
        config.reduce_threshold = reduce_threshold;
    }
    if let Some(queue_capacity) = cli.queue_capacity {
        config.queue_capacity = queue_capacity;
    }

    config.validate()?;
    Ok(config)
}

fn scaled(ms: f64, scale: f64) -> Duration {
    Duration::from_secs_f64(ms * scale / 1000.0)
}
