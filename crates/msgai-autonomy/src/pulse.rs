//! The autonomy pulse.
//!
//! A single scalar starts at [`UNITY`] and is multiplied by the configured
//! ratio on every beat. The beat is a spawned tokio task racing a
//! [`CancellationToken`]; readers hold an [`AutonomyHandle`] and never block
//! the task.

use crate::config::{AutonomyConfig, GrowthMode, UNITY};
use msgai_core::PowerSource;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// One growth step: the scalar that follows `origin` at `phase`.
pub fn step(origin: f64, phase: u64, config: &AutonomyConfig) -> f64 {
    let next = origin * config.factor(phase);
    match config.mode {
        GrowthMode::Cyclic if !next.is_finite() => UNITY,
        _ => next,
    }
}

/// Shared scalar cell. `f64` values are stored as their bit pattern.
#[derive(Debug)]
struct Scalar {
    origin: AtomicU64,
    phase: AtomicU64,
}

impl Scalar {
    fn new() -> Self {
        Self {
            origin: AtomicU64::new(UNITY.to_bits()),
            phase: AtomicU64::new(0),
        }
    }

    fn origin(&self) -> f64 {
        f64::from_bits(self.origin.load(Ordering::Acquire))
    }

    fn rebalance(&self, config: &AutonomyConfig) -> f64 {
        let phase = self.phase.fetch_add(1, Ordering::AcqRel) + 1;
        let mut prev = UNITY;
        let mut next = UNITY;
        // fetch_update only fails when the closure returns None
        let _ = self
            .origin
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                prev = f64::from_bits(bits);
                next = step(prev, phase, config);
                Some(next.to_bits())
            });
        if config.mode == GrowthMode::Cyclic && next == UNITY && prev > UNITY {
            debug!(phase, prev, "autonomy scalar overflowed, cycled back to unity");
        }
        next
    }
}

/// Cheap read handle on the scalar. This is what the ledger damps against.
#[derive(Clone, Debug)]
pub struct AutonomyHandle {
    scalar: Arc<Scalar>,
}

impl AutonomyHandle {
    pub fn power(&self) -> f64 {
        self.scalar.origin()
    }

    /// Number of beats applied so far.
    pub fn phase(&self) -> u64 {
        self.scalar.phase.load(Ordering::Acquire)
    }
}

impl PowerSource for AutonomyHandle {
    fn power(&self) -> f64 {
        AutonomyHandle::power(self)
    }
}

pub struct Autonomy {
    config: AutonomyConfig,
    handle: AutonomyHandle,
    beat: Option<(CancellationToken, JoinHandle<()>)>,
}

impl Default for Autonomy {
    fn default() -> Self {
        Self::new(AutonomyConfig::default())
    }
}

impl Autonomy {
    pub fn new(config: AutonomyConfig) -> Self {
        Self {
            config,
            handle: AutonomyHandle {
                scalar: Arc::new(Scalar::new()),
            },
            beat: None,
        }
    }

    pub fn config(&self) -> &AutonomyConfig {
        &self.config
    }

    pub fn handle(&self) -> AutonomyHandle {
        self.handle.clone()
    }

    /// Current scalar. No side effects.
    pub fn power(&self) -> f64 {
        self.handle.power()
    }

    pub fn current_value(&self) -> f64 {
        self.power()
    }

    pub fn phase(&self) -> u64 {
        self.handle.phase()
    }

    pub fn is_active(&self) -> bool {
        self.beat
            .as_ref()
            .is_some_and(|(cancel, task)| !cancel.is_cancelled() && !task.is_finished())
    }

    /// Apply one beat by hand. The timer calls the same step.
    pub fn rebalance(&self) -> f64 {
        self.handle.scalar.rebalance(&self.config)
    }

    /// Start the beat with a fresh token. See [`Autonomy::start_with`].
    pub fn start(&mut self) -> bool {
        self.start_with(CancellationToken::new())
    }

    /// Start the beat under `cancel`. Cancelling the token from outside stops
    /// the beat the same way [`Autonomy::stop`] does.
    ///
    /// Returns false without doing anything if the beat is already running
    /// or there is no tokio runtime to spawn on.
    pub fn start_with(&mut self, cancel: CancellationToken) -> bool {
        if self.is_active() {
            return false;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(rt) => rt,
            Err(e) => {
                warn!("autonomy not started: {}", e);
                return false;
            }
        };

        let scalar = self.handle.scalar.clone();
        let config = self.config.clone();
        let token = cancel.clone();
        let task = runtime.spawn(async move { run_beat(scalar, config, token).await });

        info!(
            beat_ms = self.config.beat().as_millis() as u64,
            ratio = self.config.ratio,
            mode = ?self.config.mode,
            "autonomy started"
        );
        self.beat = Some((cancel, task));
        true
    }

    /// Halt the beat. Returns false if it was not running.
    pub fn stop(&mut self) -> bool {
        match self.beat.take() {
            Some((cancel, _task)) => {
                cancel.cancel();
                info!(phase = self.phase(), power = self.power(), "autonomy stopped");
                true
            }
            None => false,
        }
    }
}

impl Drop for Autonomy {
    fn drop(&mut self) {
        if let Some((cancel, _)) = self.beat.take() {
            cancel.cancel();
        }
    }
}

async fn run_beat(scalar: Arc<Scalar>, config: AutonomyConfig, cancel: CancellationToken) {
    let mut beat = tokio::time::interval(config.beat());
    beat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately; the first beat lands one period in
    beat.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("autonomy beat cancelled");
                return;
            }
            _ = beat.tick() => {
                let power = scalar.rebalance(&config);
                trace!(power, "autonomy beat");
            }
        }
    }
}
