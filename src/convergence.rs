//! Contract convergence.
//!
//! After a trade the contract price is walked back toward the spot price in
//! fixed steps. Only one walk runs per instrument at a time, and a new walk
//! cannot start within the debounce window of the previous start. Requests
//! that hit either guard are dropped, not queued.
//!
//! The scheduler is clock-agnostic: callers pass `now` and drive `step`
//! whenever `next_step_at` comes due.

use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceParams {
    pub total_steps: u32,
    pub step_interval_ms: i64,
    pub debounce_ms: i64,
    /// Distance to target below which the walk snaps and stops.
    pub epsilon: f64,
}

impl Default for ConvergenceParams {
    fn default() -> Self {
        Self {
            total_steps: 15,
            step_interval_ms: 200,
            debounce_ms: 500,
            epsilon: 0.1,
        }
    }
}

/// One walk from the contract price at trigger time to the spot captured then.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceRun {
    pub steps_done: u32,
    pub target: f64,
    pub per_step_delta: f64,
    pub started_at: Timestamp,
    pub next_step_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ConvergencePhase {
    #[default]
    Idle,
    Converging(ConvergenceRun),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConvergenceTrigger {
    Started { target: f64, per_step_delta: f64 },
    /// Previous start was less than the debounce window ago.
    Debounced { since_last_start_ms: i64 },
    AlreadyConverging,
}

impl ConvergenceTrigger {
    pub fn started(&self) -> bool {
        matches!(self, ConvergenceTrigger::Started { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConvergenceStep {
    Adjusted { price: f64, steps_done: u32 },
    Finished { price: f64, steps_done: u32 },
    Idle,
}

#[derive(Debug, Clone)]
pub struct ConvergenceScheduler {
    params: ConvergenceParams,
    phase: ConvergencePhase,
    last_start: Option<Timestamp>,
}

impl ConvergenceScheduler {
    pub fn new(params: ConvergenceParams) -> Self {
        Self {
            params,
            phase: ConvergencePhase::Idle,
            last_start: None,
        }
    }

    pub fn params(&self) -> &ConvergenceParams {
        &self.params
    }

    pub fn phase(&self) -> &ConvergencePhase {
        &self.phase
    }

    pub fn is_converging(&self) -> bool {
        matches!(self.phase, ConvergencePhase::Converging(_))
    }

    pub fn last_start(&self) -> Option<Timestamp> {
        self.last_start
    }

    pub fn next_step_at(&self) -> Option<Timestamp> {
        match &self.phase {
            ConvergencePhase::Converging(run) => Some(run.next_step_at),
            ConvergencePhase::Idle => None,
        }
    }

    /// Start a walk from `contract` toward `spot`. The first step is due
    /// immediately (`next_step_at == now`).
    pub fn trigger(&mut self, now: Timestamp, contract: f64, spot: f64) -> ConvergenceTrigger {
        if self.is_converging() {
            return ConvergenceTrigger::AlreadyConverging;
        }

        if let Some(last) = self.last_start {
            let since = now.millis_since(last);
            if since < self.params.debounce_ms {
                return ConvergenceTrigger::Debounced {
                    since_last_start_ms: since,
                };
            }
        }

        let steps = self.params.total_steps.max(1);
        let per_step_delta = (contract - spot) / steps as f64;

        self.phase = ConvergencePhase::Converging(ConvergenceRun {
            steps_done: 0,
            target: spot,
            per_step_delta,
            started_at: now,
            next_step_at: now,
        });
        self.last_start = Some(now);

        ConvergenceTrigger::Started {
            target: spot,
            per_step_delta,
        }
    }

    /// Advance the walk given the live contract price. Termination is checked
    /// before moving: once the step budget is spent or the price is within
    /// epsilon, the price snaps to the captured target.
    pub fn step(&mut self, current: f64, now: Timestamp) -> ConvergenceStep {
        let ConvergencePhase::Converging(run) = &mut self.phase else {
            return ConvergenceStep::Idle;
        };

        if run.steps_done >= self.params.total_steps || (current - run.target).abs() < self.params.epsilon {
            let finished = ConvergenceStep::Finished {
                price: run.target,
                steps_done: run.steps_done,
            };
            self.phase = ConvergencePhase::Idle;
            return finished;
        }

        run.steps_done += 1;
        run.next_step_at = now.plus_millis(self.params.step_interval_ms);

        ConvergenceStep::Adjusted {
            price: current - run.per_step_delta,
            steps_done: run.steps_done,
        }
    }

    /// Cancel any walk in flight. The debounce window still counts from the
    /// cancelled start. Returns whether something was cancelled.
    pub fn reset(&mut self) -> bool {
        let was_converging = self.is_converging();
        self.phase = ConvergencePhase::Idle;
        was_converging
    }
}
