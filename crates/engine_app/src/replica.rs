//! Replica role: subscribe and apply.

use anyhow::Result;
use engine_net::{NatsConnection, ReplicationMessage, subjects};
use engine_sim::{CameraView, EngineConfig, TickDriver};
use futures::StreamExt;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

/// Fraction of the remaining distance kinematic bodies cover per tick.
const KINEMATIC_ALPHA: f32 = 0.5;

pub async fn run(conn: &NatsConnection, config: EngineConfig) -> Result<()> {
    let mut subscriber = conn.subscribe(subjects::REPLICATION).await?;
    let mut ticker = interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let dt = config.tick_seconds();
    let mut driver = TickDriver::new(config);
    let camera = CameraView::default();
    info!(subject = subjects::REPLICATION, "replica listening");

    let mut frames = 0u64;
    let mut failed_triples = 0usize;

    loop {
        tokio::select! {
            message = subscriber.next() => {
                let Some(message) = message else {
                    warn!("replication subscription closed");
                    break;
                };
                let parsed = match ReplicationMessage::parse(message.headers.as_ref(), &message.payload) {
                    Ok(parsed) => parsed,
                    Err(err) => {
                        warn!(error = %err, "ignoring message");
                        continue;
                    }
                };
                if let Some(report) = driver.receive(parsed) {
                    frames += 1;
                    failed_triples += report.failures.len();
                    debug!(
                        tick_id = report.tick_id,
                        applied = report.applied,
                        failed = report.failures.len(),
                        "applied frame"
                    );
                }
            }
            _ = ticker.tick() => {
                driver.physics_step(KINEMATIC_ALPHA);
                driver.update_avatars(dt, &camera);
                let dirty = driver.world.take_dirty_transforms();
                if !dirty.is_empty() {
                    debug!(count = dirty.len(), "transforms updated");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    info!(frames, failed_triples, entities = driver.world.entity_count(), "replica stopped");
    Ok(())
}
