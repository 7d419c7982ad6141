use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use clap::Parser;
use miette::IntoDiagnostic;
use pager_worker::{
    init_pager, Blocking, FillBackend, HostScheduler, PagerConfig, Priority, RegisterKind,
    Scheduler, SystemClock, Task, TaskRef, TaskState, MAX_PRIORITY,
};
use tracing::Level;

mod backend;

use backend::{PageTable, SimAsync, SimBlocking};

/// Drive the demand-paging worker against a simulated fill backend.
#[derive(clap::Parser, Clone, Debug)]
struct Cli {
    /// Worker wakes at least this often even without a signal.
    #[arg(long, default_value_t = 500)]
    work_period_ms: u64,
    /// Baseline worker priority.
    #[arg(long, default_value_t = 100)]
    default_priority: u8,
    /// Fatal fill timeout, in clock ticks. Disabled if not given.
    #[arg(long)]
    timeout_ticks: Option<u64>,
    /// Length of one clock tick.
    #[arg(long, default_value_t = 10_000)]
    tick_us: u64,
    /// Fill synchronously on the worker thread.
    #[arg(long)]
    blocking: bool,
    #[arg(long, default_value = "channel")]
    register: RegisterKind,
    /// Number of faulting tasks.
    #[arg(long, default_value_t = 16)]
    tasks: usize,
    #[arg(long, default_value_t = 5)]
    fill_latency_ms: u64,
    /// Number of distinct pages the tasks fault on. Defaults to one per task.
    #[arg(long)]
    shared_pages: Option<usize>,
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> PagerConfig {
        PagerConfig::default()
            .with_work_period(Duration::from_millis(self.work_period_ms))
            .with_default_priority(Priority::new(self.default_priority))
            .with_timeout_ticks(self.timeout_ticks)
            .with_register(self.register)
    }

    fn level(&self) -> Level {
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

fn main() -> miette::Result<()> {
    let cli = Cli::try_parse().into_diagnostic()?;

    tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .without_time()
            .with_max_level(cli.level())
            .finish(),
    )
    .into_diagnostic()?;

    let config = cli.config();
    config.validate()?;

    let slots = cli.shared_pages.unwrap_or(cli.tasks).max(1);
    let mut pages = PageTable::default();
    // Spread priorities so the queue order differs from arrival order.
    let tasks = (0..cli.tasks)
        .map(|i| {
            let pri = 1 + (i * 37) % MAX_PRIORITY as usize;
            let task = Task::new(format!("sim{}", i), Priority::new(pri as u8));
            pages.assign(task.id(), i % slots);
            task
        })
        .collect::<Vec<_>>();

    let latency = Duration::from_millis(cli.fill_latency_ms);
    if cli.blocking {
        simulate(
            &cli,
            config,
            &tasks,
            &pages,
            Blocking(SimBlocking {
                pages: pages.clone(),
                latency,
            }),
        )
    } else {
        simulate(
            &cli,
            config,
            &tasks,
            &pages,
            SimAsync {
                pages: pages.clone(),
                latency,
            },
        )
    }
}

fn simulate<B: FillBackend + Send + 'static>(
    cli: &Cli,
    config: PagerConfig,
    tasks: &[TaskRef],
    pages: &PageTable,
    backend: B,
) -> miette::Result<()> {
    let sched = Arc::new(HostScheduler::new(config.default_priority));
    let clock = Arc::new(SystemClock::new(Duration::from_micros(cli.tick_us)));
    let mut worker = init_pager(config, sched.clone(), clock, backend)?;
    let handle = worker.handle().clone();

    let runner = std::thread::Builder::new()
        .name("pg-worker".into())
        .spawn(move || worker.run())
        .into_diagnostic()?;

    let start = Instant::now();
    for task in tasks {
        pager_worker::pg_miss(task)?;
    }
    tracing::info!(
        "{} faults injected ({} pages, {} mode)",
        tasks.len(),
        cli.shared_pages.unwrap_or(tasks.len()),
        if cli.blocking { "blocking" } else { "async" }
    );

    loop {
        if runner.is_finished() {
            let res = runner
                .join()
                .map_err(|_| miette::miette!("pager worker panicked"))?;
            return match res {
                Ok(never) => match never {},
                Err(fatal) => Err(fatal.into()),
            };
        }
        let done = tasks.iter().all(|t| t.state() == TaskState::Ready);
        if done && handle.is_quiescent() && handle.worker_priority() == config.default_priority {
            break;
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    tracing::info!(
        "all {} tasks resumed in {:?}, {} pages mapped",
        tasks.len(),
        start.elapsed(),
        pages.mapped_count()
    );
    tracing::info!("{}", handle.stats());
    for task in sched.take_ready() {
        tracing::debug!("{} resumed", task);
    }
    tracing::debug!(
        "worker priority history {:?}",
        sched.priority_history(sched.worker().id())
    );
    Ok(())
}
