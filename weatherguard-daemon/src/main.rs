//! `weatherguard` binary

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use weatherguard_connectors::{
    AsyncConnector, ConnectionState, DiscoveryPublisher, MemoryConnector, MqttConfig,
    MqttConnector, SensorContext,
};
use weatherguard_core::{sensor::SimulatedSensor, time::SystemTime, CancellationFlag};
use weatherguard_daemon::{host, logging, Args, LoopError, LoopSummary, SectionConfig, TelemetryLoop};

/// How long the MQTT driver gets to flush `offline` and disconnect
const DRIVER_SHUTDOWN: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init().context("installing logger")?;

    let config = SectionConfig::load(&args.config, &args.section).with_context(|| {
        format!("loading [{}] from {}", args.section, args.config.display())
    })?;
    let host = host::host_identity(args.host_id.as_deref());
    let context = Arc::new(SensorContext::new(&config.topic, &host, &config.calibration));

    let cancel = CancellationFlag::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        info!("termination signal received");
        handler_flag.cancel();
    })
    .context("installing signal handler")?;

    info!(
        "weatherguard {} on {} publishing under {}/sensor/{}",
        weatherguard_daemon::VERSION,
        host,
        config.topic,
        host
    );

    if args.dry_run {
        let bus = MemoryConnector::new().with_echo();
        bus.set_state(ConnectionState::Connected);
        info!("dry run: messages are logged, not sent");
        return run_sensor(&args, &config, context, bus, &cancel).await;
    }

    let client_id = args
        .client_id
        .clone()
        .unwrap_or_else(|| host::default_client_id(&host));
    let mut mqtt = MqttConfig::new(&config.host, config.port, client_id)
        .last_will(&context.topics.availability);
    if let Some(credentials) = &config.credentials {
        mqtt = mqtt.credentials(&credentials.username, &credentials.password);
    }

    let (bus, driver) = MqttConnector::new(&mqtt).context("configuring MQTT client")?;
    let mut driver = driver.spawn();

    let result = run_sensor(&args, &config, context, bus.clone(), &cancel).await;

    if let Err(e) = bus.disconnect().await {
        warn!("mqtt disconnect failed: {e}");
    }
    if tokio::time::timeout(DRIVER_SHUTDOWN, &mut driver).await.is_err() {
        warn!("mqtt driver did not stop within {:?}; dropping connection", DRIVER_SHUTDOWN);
        driver.abort();
    }

    result
}

/// Announce, wait for the broker, then poll until cancelled
async fn run_sensor<C>(
    args: &Args,
    config: &SectionConfig,
    context: Arc<SensorContext>,
    bus: C,
    cancel: &CancellationFlag,
) -> anyhow::Result<()>
where
    C: AsyncConnector + Clone + 'static,
{
    let discovery = DiscoveryPublisher::new(Arc::clone(&context)).context("building discovery descriptors")?;
    let discovery_bus = bus.clone();
    let discovery_task = tokio::spawn(async move { discovery.run(&discovery_bus).await });

    let sensor = SimulatedSensor::new(config.address);
    let mut telemetry = TelemetryLoop::new(
        sensor,
        bus,
        context,
        config.calibration.clone(),
        config.mode,
    )
    .with_companion(discovery_task)
    .verbose(args.verbose);

    match drive(&mut telemetry, cancel).await {
        Ok(Some(summary)) => {
            info!(
                "stopped after {} polls: {} published, {} faults",
                summary.iterations, summary.published, summary.faults
            );
            Ok(())
        }
        Ok(None) => {
            info!("cancelled before the broker connected");
            telemetry.stop_companions().await;
            Ok(())
        }
        Err(e) => {
            telemetry.shutdown().await;
            Err(e).context("sensor loop stopped")
        }
    }
}

async fn drive<C>(
    telemetry: &mut TelemetryLoop<SimulatedSensor, C>,
    cancel: &CancellationFlag,
) -> Result<Option<LoopSummary>, LoopError>
where
    C: AsyncConnector,
{
    if !telemetry.wait_for_connection(cancel).await? {
        return Ok(None);
    }
    telemetry.start()?;
    telemetry.run(&SystemTime, cancel).await.map(Some)
}
