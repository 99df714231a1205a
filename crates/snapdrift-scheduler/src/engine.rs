//! The scheduling and delivery engine.
//!
//! A single tokio task owns the [`EngineState`] and processes commands and
//! timer fires strictly one at a time, which is what enforces the no-overlap
//! rule: the next trigger is registered only after the current cycle has
//! completed, never as a recurring timer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use snapdrift_core::config::SchedulerConfig;
use snapdrift_delivery::{DeliveryClient, MediaRef};
use snapdrift_images::{ImageStore, ImageStoreError};

use crate::error::{Result, SchedulerError};
use crate::interval::{random_interval, validate_bounds};
use crate::selector::select_next;
use crate::store::ScheduleStore;

/// How often the post-delivery bookkeeping write is retried before the row
/// is flagged for manual reconciliation. The send itself is never repeated.
const MARK_SENT_ATTEMPTS: u32 = 3;

const COMMAND_BUFFER: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    /// No pending fire; waiting for an explicit start.
    Stopped,
    /// A future fire time is registered and persisted.
    Armed { next_fire: DateTime<Utc> },
    /// A send cycle is executing.
    Firing,
    /// Interval configuration was rejected at start.
    Disabled,
}

/// Snapshot reported to the dashboard/CLI.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub running: bool,
    pub next_fire: Option<DateTime<Utc>>,
}

/// Outcome of one successful fire cycle.
#[derive(Debug, Clone, Serialize)]
pub struct FireReport {
    pub image_id: i64,
    pub provider_id: String,
}

enum Command {
    Start(oneshot::Sender<Result<Status>>),
    Stop(oneshot::Sender<Status>),
    Status(oneshot::Sender<Status>),
    TriggerNow {
        image_id: Option<i64>,
        reply: oneshot::Sender<Result<FireReport>>,
    },
}

/// Cloneable handle for controlling a running [`Engine`].
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
}

impl EngineHandle {
    /// Arm the scheduler. Surfaces `Config` errors synchronously; already
    /// running is a no-op returning the current status.
    pub async fn start(&self) -> Result<Status> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(Command::Start(tx))
            .await
            .map_err(|_| SchedulerError::EngineGone)?;
        rx.await.map_err(|_| SchedulerError::EngineGone)?
    }

    /// Cancel the pending fire. An in-flight delivery is never interrupted —
    /// the command is processed after the current cycle settles.
    pub async fn stop(&self) -> Result<Status> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(Command::Stop(tx))
            .await
            .map_err(|_| SchedulerError::EngineGone)?;
        rx.await.map_err(|_| SchedulerError::EngineGone)
    }

    pub async fn status(&self) -> Result<Status> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(Command::Status(tx))
            .await
            .map_err(|_| SchedulerError::EngineGone)?;
        rx.await.map_err(|_| SchedulerError::EngineGone)
    }

    /// Run one fire cycle immediately, outside the schedule ("send test
    /// message"). With `image_id` the given image is sent regardless of its
    /// sent flag; otherwise the normal random selection applies. The interval
    /// is re-drawn only if the scheduler was already running.
    pub async fn trigger_now(&self, image_id: Option<i64>) -> Result<FireReport> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(Command::TriggerNow {
                image_id,
                reply: tx,
            })
            .await
            .map_err(|_| SchedulerError::EngineGone)?;
        rx.await.map_err(|_| SchedulerError::EngineGone)?
    }
}

pub struct Engine {
    config: SchedulerConfig,
    recipient: String,
    images: Arc<dyn ImageStore>,
    delivery: Arc<dyn DeliveryClient>,
    schedule: Arc<ScheduleStore>,
    rx: mpsc::Receiver<Command>,
    state: EngineState,
}

impl Engine {
    /// Build the engine, resuming any persisted schedule.
    ///
    /// A stored next-fire time re-arms for exactly that instant — redrawing
    /// on every restart would bias real intervals toward the minimum. A
    /// stored time in the past counts as due and fires immediately once the
    /// engine runs. No stored time means Stopped until an explicit start.
    pub fn new(
        config: SchedulerConfig,
        recipient: String,
        images: Arc<dyn ImageStore>,
        delivery: Arc<dyn DeliveryClient>,
        schedule: Arc<ScheduleStore>,
    ) -> Result<(Self, EngineHandle)> {
        let state = match schedule.get_next_fire()? {
            Some(next_fire) => {
                info!(%next_fire, "resuming persisted schedule");
                EngineState::Armed { next_fire }
            }
            None => EngineState::Stopped,
        };
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        Ok((
            Self {
                config,
                recipient,
                images,
                delivery,
                schedule,
                rx,
                state,
            },
            EngineHandle { tx },
        ))
    }

    /// Main loop. Exits when every [`EngineHandle`] has been dropped.
    pub async fn run(mut self) {
        info!(state = ?self.state, "scheduler engine started");
        loop {
            let armed_at = match &self.state {
                EngineState::Armed { next_fire } => Some(*next_fire),
                _ => None,
            };
            match armed_at {
                Some(at) => {
                    tokio::select! {
                        cmd = self.rx.recv() => match cmd {
                            Some(cmd) => self.handle_command(cmd).await,
                            None => break,
                        },
                        _ = tokio::time::sleep_until(deadline(at)) => self.fire().await,
                    }
                }
                None => match self.rx.recv().await {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => break,
                },
            }
        }
        info!("scheduler engine stopped (all handles dropped)");
    }

    // --- command handling --------------------------------------------------

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Start(reply) => {
                let res = self.start();
                let _ = reply.send(res);
            }
            Command::Stop(reply) => {
                self.stop();
                let _ = reply.send(self.status());
            }
            Command::Status(reply) => {
                let _ = reply.send(self.status());
            }
            Command::TriggerNow { image_id, reply } => {
                let was_armed = matches!(self.state, EngineState::Armed { .. });
                self.state = EngineState::Firing;
                let res = self.run_cycle(image_id).await;
                if let Err(e) = &res {
                    warn!(error = %e, "manual trigger failed");
                }
                if was_armed {
                    self.rearm();
                } else {
                    self.state = EngineState::Stopped;
                }
                let _ = reply.send(res);
            }
        }
    }

    fn start(&mut self) -> Result<Status> {
        match self.state {
            EngineState::Armed { .. } | EngineState::Firing => Ok(self.status()),
            EngineState::Stopped | EngineState::Disabled => {
                if let Err(e) = validate_bounds(
                    self.config.min_interval_hours,
                    self.config.max_interval_hours,
                ) {
                    error!(error = %e, "start rejected; scheduler disabled");
                    self.state = EngineState::Disabled;
                    return Err(e);
                }
                self.rearm();
                Ok(self.status())
            }
        }
    }

    fn stop(&mut self) {
        if matches!(self.state, EngineState::Stopped | EngineState::Disabled) {
            return;
        }
        // Clearing the stored time is the cancellation: the in-memory timer
        // dies with the state change, and a restart sees nothing to resume.
        if let Err(e) = self.schedule.cancel() {
            error!(error = %e, "failed to clear persisted schedule on stop");
        }
        self.state = EngineState::Stopped;
        info!("scheduler stopped");
    }

    fn status(&self) -> Status {
        match &self.state {
            EngineState::Armed { next_fire } => Status {
                running: true,
                next_fire: Some(*next_fire),
            },
            EngineState::Firing => Status {
                running: true,
                next_fire: None,
            },
            EngineState::Stopped | EngineState::Disabled => Status {
                running: false,
                next_fire: None,
            },
        }
    }

    // --- fire cycle --------------------------------------------------------

    /// Scheduled fire: run one cycle, log the outcome, always re-arm.
    /// No error escapes — the machine must never get stuck in `Firing`.
    async fn fire(&mut self) {
        self.state = EngineState::Firing;
        match self.run_cycle(None).await {
            Ok(report) => {
                info!(
                    image_id = report.image_id,
                    provider_id = %report.provider_id,
                    "fire cycle complete"
                );
            }
            Err(SchedulerError::NoEligibleImage) => {
                info!("no eligible image; skipping this cycle");
            }
            Err(SchedulerError::Delivery(e)) => {
                warn!(error = %e, "delivery failed; image remains eligible for the next fire");
            }
            Err(e) => {
                error!(error = %e, "fire cycle failed");
            }
        }
        self.rearm();
    }

    /// One send attempt: select (or fetch the override), deliver, book-keep.
    async fn run_cycle(&mut self, image_override: Option<i64>) -> Result<FireReport> {
        let image = match image_override {
            Some(id) => self
                .images
                .get(id)?
                .ok_or(SchedulerError::Images(ImageStoreError::NotFound { id }))?,
            None => select_next(self.images.as_ref(), self.config.auto_cycle)?,
        };

        let media = MediaRef {
            image_id: image.id,
            filename: image.filename.clone(),
        };
        let receipt = self
            .delivery
            .send(&self.recipient, &media, &image.description)
            .await?;

        // Delivery is confirmed from here on: failures below are bookkeeping
        // problems, not reasons to send again.
        self.mark_sent_with_retry(image.id, Utc::now());

        Ok(FireReport {
            image_id: image.id,
            provider_id: receipt.provider_id,
        })
    }

    fn mark_sent_with_retry(&self, image_id: i64, sent_at: DateTime<Utc>) {
        let mut last_err: Option<ImageStoreError> = None;
        for attempt in 1..=MARK_SENT_ATTEMPTS {
            match self.images.mark_sent(image_id, sent_at) {
                Ok(img) => {
                    info!(image_id, send_count = img.send_count, "image marked sent");
                    return;
                }
                Err(e) => {
                    warn!(image_id, attempt, error = %e, "mark_sent failed");
                    last_err = Some(e);
                }
            }
        }
        let e = SchedulerError::DataConsistency {
            image_id,
            detail: last_err.map(|e| e.to_string()).unwrap_or_default(),
        };
        error!(image_id, error = %e, "manual reconciliation required");
    }

    /// Draw a fresh interval, persist the fire time, transition to Armed.
    fn rearm(&mut self) {
        let interval = match random_interval(
            self.config.min_interval_hours,
            self.config.max_interval_hours,
        ) {
            Ok(d) => d,
            Err(e) => {
                // Unreachable after a successful start, but the machine must
                // not keep firing with bounds it cannot honour.
                error!(error = %e, "cannot compute next interval; scheduler disabled");
                self.state = EngineState::Disabled;
                return;
            }
        };
        let next_fire = Utc::now() + interval;
        if let Err(e) = self.schedule.set_next_fire(next_fire) {
            // The in-process timer still runs; only resumption after a
            // restart is at risk.
            error!(error = %e, "failed to persist next fire time");
        }
        info!(
            %next_fire,
            hours = interval.num_seconds() as f64 / 3600.0,
            "scheduler armed"
        );
        self.state = EngineState::Armed { next_fire };
    }
}

fn deadline(at: DateTime<Utc>) -> tokio::time::Instant {
    // A stored time in the past yields a zero wait: due fires run at once.
    let wait = (at - Utc::now()).to_std().unwrap_or(std::time::Duration::ZERO);
    tokio::time::Instant::now() + wait
}
