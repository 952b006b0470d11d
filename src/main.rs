use std::sync::Arc;

use anyhow::{Error, Result};
use clap::{Parser, Subcommand};
use notification_service::{
    api::{AppState, run_api_server},
    clients::{
        broker::MessageBroker,
        channels::{EmailChannel, InAppChannel, SmsChannel},
        database::{AuditStore, DatabaseClient},
        health::HealthChecker,
        rbmq::RabbitMqClient,
    },
    config::Config,
    dispatcher::ChannelDispatcher,
    intake::NotificationIntake,
    producer::QueueProducer,
    worker::QueueConsumer,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "notification_service", about = "Queue-backed notification delivery")]
struct Cli {
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Serve the HTTP intake API only
    Api,
    /// Run a single queue consumer only
    Worker,
    /// Run the API and one consumer in the same process
    All,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let mode = Cli::parse().mode.unwrap_or(Mode::All);
    let config = Config::load()?;

    info!(?mode, queue = %config.queue_name, max_retries = config.max_retries, "Configuration loaded");

    let broker: Arc<dyn MessageBroker> =
        Arc::new(RabbitMqClient::connect(&config.rabbitmq_url, &config.queue_name).await?);
    let store: Arc<dyn AuditStore> = Arc::new(DatabaseClient::connect(&config.database_url).await?);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                return;
            }
            info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    let api = async {
        if mode == Mode::Worker {
            return Ok(());
        }

        let state = Arc::new(AppState {
            intake: NotificationIntake::new(Arc::clone(&store), QueueProducer::new(Arc::clone(&broker))),
            health_checker: HealthChecker::new(Arc::clone(&broker), Arc::clone(&store)),
        });

        run_api_server(state, config.server_port, shutdown.clone()).await
    };

    let worker = async {
        if mode == Mode::Api {
            return Ok(());
        }

        let simulated_failure = config.simulated_failure();
        let dispatcher = ChannelDispatcher::new(
            Arc::new(EmailChannel::new(simulated_failure.clone())),
            Arc::new(SmsChannel::new(simulated_failure.clone())),
            Arc::new(InAppChannel::new(Arc::clone(&store), simulated_failure)),
        );

        let consumer = QueueConsumer::new(Arc::clone(&broker), dispatcher, config.retry_policy());
        let deliveries = broker.subscribe().await?;
        consumer.run(deliveries, shutdown.clone()).await?;

        Ok::<(), Error>(())
    };

    tokio::try_join!(api, worker)?;

    info!("Notification service stopped");
    Ok(())
}
