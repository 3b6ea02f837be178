use clap::{
    Parser,
    Subcommand,
};
use rbcore::{
    command::{
        Command,
        PreparedCommandRegistry,
        SleepCommand,
    },
    job::Job,
    platform::{
        ConnectorOption,
        PlatformConnector,
        PlatformUrl,
    },
    task::Task,
};
use rbdb_sqlite::SqliteBackend;
use rbqueue::{
    client::{
        Client,
        WorkerRunner,
    },
    config::{
        DEFAULT_ADDR,
        ServerConfig,
        WorkerConfig,
        default_worker_name,
    },
    manager::JobManager,
    server::Server,
};
use std::{
    sync::Arc,
    time::Duration,
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
    #[clap(long, value_name = "ADDR", env = "RB_ADDR", default_value = DEFAULT_ADDR)]
    addr: String,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the queue.
    Serve {
        #[clap(long, value_name = "DATABASE_URL", env = "RB_DB_URL")]
        db_url: String,
        #[clap(long, value_name = "SECONDS", default_value = "5")]
        shutdown_grace: u64,
    },
    /// Take and run tasks until interrupted.
    Worker {
        #[clap(long, value_name = "NAME")]
        name: Option<String>,
        #[clap(long, value_name = "MILLISECONDS", default_value = "1000")]
        poll_interval: u64,
    },
    /// Submit a job of sleep tasks.
    #[command(arg_required_else_help = true)]
    Submit {
        count: usize,
        #[clap(long, value_name = "NAME", default_value = "job")]
        name: String,
        #[clap(long, value_name = "SECONDS", default_value = "1")]
        duration: f64,
        #[clap(long, value_name = "PRIORITY")]
        priority: Option<i64>,
    },
    /// Print the current jobs and workers.
    Status,
}

fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("received interrupt, shutting down"),
            Err(e) => log::error!("unable to listen for interrupt: {e}"),
        }
        cancel.cancel();
    });
    token
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    stderrlog::new()
        .module(module_path!())
        .module("rbcore")
        .module("rbdb_sqlite")
        .verbosity((args.verbose as usize) + 1)
        .timestamp(stderrlog::Timestamp::Second)
        .init()?;

    match args.command {
        Commands::Serve { db_url, shutdown_grace } => {
            let backend = SqliteBackend::connect_queue(
                ConnectorOption::from(db_url).auto_create_db(true)
            ).await?;
            let registry = Arc::new(PreparedCommandRegistry::with_defaults());
            let manager = Arc::new(JobManager::new(Arc::new(backend), registry));
            log::info!("queue backed by {}", manager.platform().url());
            let config = ServerConfig::new()
                .addr(args.addr)
                .shutdown_grace(Duration::from_secs(shutdown_grace));
            let server = Server::bind(config, manager).await?;
            let token = server.token();
            let interrupt = shutdown_token();
            tokio::spawn(async move {
                interrupt.cancelled().await;
                token.cancel();
            });
            server.run().await;
        }
        Commands::Worker { name, poll_interval } => {
            let config = WorkerConfig::new()
                .addr(args.addr)
                .name(name.unwrap_or_else(default_worker_name))
                .poll_interval(Duration::from_millis(poll_interval));
            let runner = WorkerRunner::new(
                config,
                Arc::new(PreparedCommandRegistry::with_defaults()),
            );
            runner.run(shutdown_token()).await?;
        }
        Commands::Submit { count, name, duration, priority } => {
            let command = SleepCommand::new(duration)?.serialize();
            let mut job = Job::new(name);
            if let Some(priority) = priority {
                job = job.with_priority(priority);
            }
            for _ in 0..count {
                let mut task = Task::new(command.clone());
                if let Some(priority) = priority {
                    task = task.with_priority(priority);
                }
                job.add_task(task);
            }
            let mut client = Client::connect(&args.addr).await?;
            let job = client.create_job(&job).await?;
            println!("job {} created with {} task(s)", job.id, job.tasks.len());
            client.close().await?;
        }
        Commands::Status => {
            let mut client = Client::connect(&args.addr).await?;
            let jobs = client.all_jobs().await?;
            let workers = client.all_workers().await?;
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                "jobs": jobs,
                "workers": workers,
            }))?);
            client.close().await?;
        }
    }

    Ok(())
}
