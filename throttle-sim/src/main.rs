// ABOUTME: Simulates a fleet of workers sharing one lock backend and one queue.
// ABOUTME: Shows throttled jobs being run, reenqueued, or dropped per tenant.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use traffic_control::prelude::*;

// ============================================================================
// Fleet configuration
// ============================================================================

struct SimConfig {
    workers: usize,
    jobs: usize,
    tenants: usize,
    work: Duration,
    settings: ThrottleSettings,
}

impl SimConfig {
    /// Read the fleet shape from the environment (and `.env` if present).
    fn from_env() -> Result<Self> {
        let settings = match std::env::var("THROTTLE_SETTINGS") {
            Ok(path) => ThrottleSettings::from_file(&path)
                .with_context(|| format!("failed to load throttle settings from {}", path))?,
            Err(_) => ThrottleSettings {
                threshold: 2,
                period_ms: 200,
                drop: false,
                reenqueue_delay_ms: None,
                hold: LeaseHold::UntilComplete,
                on_backend_error: BackendErrorPolicy::Propagate,
            },
        };

        Ok(Self {
            workers: env_number("SIM_WORKERS", 6)?,
            jobs: env_number("SIM_JOBS", 24)?,
            tenants: env_number("SIM_TENANTS", 3)?.max(1),
            work: Duration::from_millis(env_number("SIM_WORK_MS", 50)? as u64),
            settings,
        })
    }
}

fn env_number(name: &str, default: usize) -> Result<usize> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("{} must be a number, got '{}'", name, value)),
        Err(_) => Ok(default),
    }
}

// ============================================================================
// Render job
// ============================================================================

/// Shared counters for the whole fleet.
#[derive(Default)]
struct Stats {
    performed: AtomicUsize,
    dropped: AtomicUsize,
    reenqueued: AtomicUsize,
}

impl Stats {
    fn settled(&self) -> usize {
        self.performed.load(Ordering::SeqCst) + self.dropped.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct RenderJob {
    id: usize,
    tenant: String,
    work: Duration,
}

#[async_trait]
impl Job for RenderJob {
    fn class_name(&self) -> &str {
        "RenderJob"
    }

    async fn perform(&self) -> Result<(), anyhow::Error> {
        info!(job = self.id, tenant = %self.tenant, "rendering");
        tokio::time::sleep(self.work).await;
        Ok(())
    }
}

// ============================================================================
// Workers
// ============================================================================

async fn worker(
    worker_id: usize,
    total: usize,
    throttle: Arc<Throttle<RenderJob>>,
    queue: Arc<MemoryQueue<RenderJob>>,
    stats: Arc<Stats>,
) -> Result<()> {
    while stats.settled() < total {
        let Ok(Some(job)) = tokio::time::timeout(Duration::from_millis(50), queue.recv()).await
        else {
            continue;
        };

        match throttle.perform(&job, queue.as_ref()).await {
            Ok(Outcome::Performed | Outcome::PerformedUnthrottled) => {
                stats.performed.fetch_add(1, Ordering::SeqCst);
            }
            Ok(Outcome::Dropped { .. }) => {
                stats.dropped.fetch_add(1, Ordering::SeqCst);
            }
            Ok(Outcome::Reenqueued { .. }) => {
                stats.reenqueued.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => {
                warn!(worker = worker_id, job = job.id, error = %e, "job failed");
                stats.dropped.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = SimConfig::from_env()?;
    let policy = config
        .settings
        .builder::<RenderJob>()
        .key(|job| job.tenant.clone())
        .build()
        .context("invalid throttle settings")?;

    info!(
        workers = config.workers,
        jobs = config.jobs,
        tenants = config.tenants,
        policy = ?policy,
        "starting fleet"
    );

    let backend: Arc<dyn LockBackend> = Arc::new(MemoryLockBackend::new());
    let throttle = Arc::new(Throttle::new(backend, policy));
    let queue = Arc::new(MemoryQueue::new());
    let stats = Arc::new(Stats::default());

    for id in 0..config.jobs {
        queue.push(RenderJob {
            id,
            tenant: format!("tenant-{}", id % config.tenants),
            work: config.work,
        });
    }

    let start = Instant::now();
    let mut handles = Vec::new();
    for worker_id in 0..config.workers {
        handles.push(tokio::spawn(worker(
            worker_id,
            config.jobs,
            throttle.clone(),
            queue.clone(),
            stats.clone(),
        )));
    }

    for handle in handles {
        handle.await??;
    }

    println!("Fleet settled in {:?}", start.elapsed());
    println!("  performed:  {}", stats.performed.load(Ordering::SeqCst));
    println!("  dropped:    {}", stats.dropped.load(Ordering::SeqCst));
    println!("  reenqueued: {}", stats.reenqueued.load(Ordering::SeqCst));

    Ok(())
}
