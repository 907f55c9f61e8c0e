use chrono::{DateTime, Duration, Utc};
use pointpool_engine::PointsEngine;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// One settlement job per campaign week, fired at the week's end. Weeks
/// whose end has already passed at boot are settled immediately; the
/// engine tolerates re-delivery, so restarting mid-campaign is safe.
pub fn spawn_campaign_jobs(
    engine: Arc<PointsEngine>,
    start_time: DateTime<Utc>,
    weeks: u32,
) -> Vec<JoinHandle<()>> {
    let week = Duration::days(7);
    let mut handles = Vec::with_capacity(weeks as usize);

    for i in 0..weeks {
        let from = start_time + week * (i as i32);
        let to = from + week;
        let engine = engine.clone();

        handles.push(tokio::spawn(async move {
            let now = Utc::now();
            if to > now {
                let wait = (to - now).to_std().unwrap_or_default();
                info!(
                    epoch_start = %from,
                    epoch_end = %to,
                    wait_secs = wait.as_secs(),
                    "Campaign settlement scheduled"
                );
                tokio::time::sleep(wait).await;
            } else {
                warn!(
                    epoch_start = %from,
                    epoch_end = %to,
                    "Campaign week already over at boot, settling now"
                );
            }

            match engine.campaign.settle_epoch(from, to).await {
                Ok(settled) => {
                    info!(epoch_start = %from, epoch_end = %to, settled = settled, "Epoch settled")
                }
                Err(e) => {
                    error!(epoch_start = %from, epoch_end = %to, error = %e, "Epoch settlement failed")
                }
            }
        }));
    }

    handles
}
