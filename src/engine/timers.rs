//! Timer-driven operations: series ticks, convergence steps, book redraws and
//! synthetic fills.

use super::core::Engine;
use super::results::TimerReport;
use crate::convergence::ConvergenceStep;
use crate::events::{
    ConvergenceFinishedEvent, ConvergenceRequestedEvent, EventPayload, OrderBookRegeneratedEvent,
};
use crate::instrument::TimerEvent;
use crate::types::{InstrumentId, Timestamp};

impl Engine {
    /// Advance the clock and fire everything that fell due.
    pub fn advance_time(&mut self, millis: i64) -> TimerReport {
        self.current_time = self.current_time.plus_millis(millis);
        self.run_due_timers()
    }

    /// Fire every timer due at or before the current time, across all
    /// instruments.
    pub fn run_due_timers(&mut self) -> TimerReport {
        let now = self.current_time;

        let mut ids: Vec<InstrumentId> = self.instruments.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        let mut report = TimerReport::default();
        for id in ids {
            let fired = match self.instruments.get_mut(&id) {
                Some(instrument) => instrument.poll_timers(now),
                None => continue,
            };
            for timer in fired {
                self.record_timer(&id, timer.at, &timer.event);
                report.fired.push((id.clone(), timer));
            }
        }
        report
    }

    /// Earliest pending deadline across all instruments.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.instruments.values().map(|instrument| instrument.next_deadline()).min()
    }

    // series ticks are too chatty for the log
    fn record_timer(&mut self, id: &InstrumentId, at: Timestamp, event: &TimerEvent) {
        let payload = match event {
            TimerEvent::SeriesTick(_) | TimerEvent::FillSkipped => return,
            TimerEvent::Convergence(ConvergenceStep::Finished { price, steps_done }) => {
                EventPayload::ConvergenceFinished(ConvergenceFinishedEvent {
                    price: *price,
                    steps_done: *steps_done,
                })
            }
            TimerEvent::Convergence(_) => return,
            TimerEvent::BookRegenerated { bid_levels, ask_levels } => {
                EventPayload::OrderBookRegenerated(OrderBookRegeneratedEvent {
                    bid_levels: *bid_levels,
                    ask_levels: *ask_levels,
                })
            }
            TimerEvent::Fill(outcome) => {
                self.emit_event_at(id.clone(), at, EventPayload::SyntheticFill(outcome.fill));
                EventPayload::ConvergenceRequested(ConvergenceRequestedEvent {
                    outcome: outcome.convergence,
                    from_fill: true,
                })
            }
        };
        self.emit_event_at(id.clone(), at, payload);
    }
}
