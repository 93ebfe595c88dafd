//! Authority role: simulate and publish.

use std::time::Instant;

use anyhow::Result;
use engine_math::{Transform3D, Vec3};
use engine_net::{EntityDespawned, NatsConnection, ReplicationMessage, subjects};
use engine_sim::{CameraView, EngineConfig, TickDriver};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::scene;

pub async fn run(conn: &NatsConnection, config: EngineConfig, entities: usize) -> Result<()> {
    let mut ticker = interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let dt = config.tick_seconds();
    let max_ticks = config.max_ticks;
    let mut driver = TickDriver::new(config);

    let spawned = scene::populate(&mut driver, entities);
    for &entity in &spawned {
        if let Some(message) = driver.spawn_message(entity) {
            conn.publish_replication(subjects::REPLICATION, &ReplicationMessage::Spawned(message))
                .await?;
        }
    }
    info!(entities = spawned.len(), "scene spawned");

    let camera = CameraView::from_transform(
        &Transform3D::from_position(Vec3::new(0.0, 1.6, 4.0)),
        std::f32::consts::FRAC_PI_3,
        100.0,
    );
    let start = Instant::now();
    let mut ticks = 0u64;
    let mut dropped = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }

        scene::animate(&mut driver, start.elapsed().as_secs_f32());
        driver.physics_step(1.0);
        let tick_id = driver.tick_id();
        match driver.tick(dt, &camera) {
            Some(bytes) => {
                debug!(tick_id, bytes = bytes.len(), "publishing frame");
                let frame = ReplicationMessage::Frame { tick_id, bytes };
                if let Err(err) = conn.publish_replication(subjects::REPLICATION, &frame).await {
                    warn!(tick_id, error = %err, "failed to publish frame");
                }
            }
            None => dropped += 1,
        }

        ticks += 1;
        if max_ticks > 0 && ticks >= max_ticks {
            info!(ticks, "tick limit reached");
            break;
        }
    }

    for &entity in &spawned {
        driver.despawn(entity);
        let message = ReplicationMessage::Despawned(EntityDespawned { entity });
        conn.publish_replication(subjects::REPLICATION, &message).await?;
    }
    conn.flush().await;
    info!(ticks, dropped, "authority stopped");
    Ok(())
}
