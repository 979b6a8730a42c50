//! Observer fanout and the scheduled-snapshot trigger mechanism (§4.5).
//!
//! A `Handler` gets called back once per book-affecting event plus a tick on
//! every message that advanced the clock. All methods default to no-ops, so
//! a recorder interested in one event kind only overrides that one method —
//! the same shape as the teacher's handler-by-capability dispatch, just
//! synchronous and in-process rather than over a pub-sub bus.

use crate::message::{Code, OrderRef, Price, Side, Symbol, Timestamp, Volume};
use crate::orderbook::BookSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddEvent {
    pub order_ref: OrderRef,
    pub side: Side,
    pub price: Price,
    pub shares: Volume,
    pub symbol: Symbol,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteEvent {
    pub order_ref: OrderRef,
    pub shares: Volume,
    pub match_number: crate::message::MatchNumber,
    /// Set for `OrderExecutedWithPrice`; the print price, which may differ
    /// from the order's resting price.
    pub execution_price: Option<Price>,
    pub printable: Option<bool>,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelEvent {
    pub order_ref: OrderRef,
    pub shares: Volume,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteEvent {
    pub order_ref: OrderRef,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceEvent {
    pub old_order_ref: OrderRef,
    pub new_order_ref: OrderRef,
    pub new_price: Price,
    pub new_shares: Volume,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeEvent {
    /// Zero for hidden executions (non-displayed liquidity).
    pub order_ref: OrderRef,
    pub side: Side,
    pub shares: Volume,
    pub symbol: Symbol,
    pub price: Price,
    pub match_number: crate::message::MatchNumber,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossEvent {
    pub symbol: Symbol,
    pub shares: u64,
    pub cross_price: Price,
    pub match_number: crate::message::MatchNumber,
    pub cross_type: Code,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChangeEvent {
    pub symbol: Symbol,
    pub status: crate::message::TradingStatus,
    pub timestamp: Timestamp,
}

/// Event-capability sink. Every method defaults to a no-op; implement only
/// the ones a given recorder cares about.
pub trait Handler {
    fn on_add(&mut self, _ev: &AddEvent) {}
    fn on_execute(&mut self, _ev: &ExecuteEvent) {}
    fn on_cancel(&mut self, _ev: &CancelEvent) {}
    fn on_delete(&mut self, _ev: &DeleteEvent) {}
    fn on_replace(&mut self, _ev: &ReplaceEvent) {}
    fn on_trade(&mut self, _ev: &TradeEvent) {}
    fn on_cross(&mut self, _ev: &CrossEvent) {}
    fn on_status_change(&mut self, _ev: &StatusChangeEvent) {}
    fn on_tick(&mut self, _timestamp: Timestamp) {}
    /// An order-keyed message referenced an order the book does not carry
    /// (typically: the feed started mid-day). Not a fatal error.
    fn on_stale_reference(&mut self, _order_ref: OrderRef) {}
    /// Any other book error the processor chose not to treat as stale-ref
    /// (duplicate add, over-execution, over-cancellation).
    fn on_error(&mut self, _err: &dyn std::error::Error) {}

    /// Wall-clock timestamps at which this handler wants a full snapshot.
    /// Must be sorted ascending; the processor walks it with a cursor and
    /// never re-reads earlier entries (§9).
    fn scheduled_snapshots(&self) -> &[Timestamp] {
        &[]
    }
    fn on_scheduled_snapshot(&mut self, _snapshot: &BookSnapshot) {}
}

/// A cursor into one handler's sorted scheduled-snapshot list. Advances
/// monotonically; never revisits a timestamp once passed.
struct SnapshotCursor {
    next_index: usize,
}

impl SnapshotCursor {
    fn new() -> Self {
        SnapshotCursor { next_index: 0 }
    }

    /// Returns every scheduled timestamp that `last_timestamp` has now
    /// reached or passed, advancing the cursor past them. If the feed skips
    /// several thresholds in one step (a gap), all of them are returned, in
    /// order, for the caller to fire with identical pre-mutation state.
    fn due(&mut self, schedule: &[Timestamp], last_timestamp: Timestamp) -> Vec<Timestamp> {
        let mut due = Vec::new();
        while self.next_index < schedule.len() && schedule[self.next_index] <= last_timestamp {
            due.push(schedule[self.next_index]);
            self.next_index += 1;
        }
        due
    }
}

/// Holds the ordered handler list and each handler's snapshot cursor. Owned
/// by the `Processor`; not exposed for direct mutation outside it.
pub struct HandlerDispatch<H> {
    handlers: Vec<H>,
    cursors: Vec<SnapshotCursor>,
}

impl<H: Handler> HandlerDispatch<H> {
    pub fn new() -> Self {
        HandlerDispatch {
            handlers: Vec::new(),
            cursors: Vec::new(),
        }
    }

    pub fn register(&mut self, handler: H) {
        self.handlers.push(handler);
        self.cursors.push(SnapshotCursor::new());
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn dispatch_add(&mut self, ev: &AddEvent) {
        for h in &mut self.handlers {
            h.on_add(ev);
        }
    }

    pub fn dispatch_execute(&mut self, ev: &ExecuteEvent) {
        for h in &mut self.handlers {
            h.on_execute(ev);
        }
    }

    pub fn dispatch_cancel(&mut self, ev: &CancelEvent) {
        for h in &mut self.handlers {
            h.on_cancel(ev);
        }
    }

    pub fn dispatch_delete(&mut self, ev: &DeleteEvent) {
        for h in &mut self.handlers {
            h.on_delete(ev);
        }
    }

    pub fn dispatch_replace(&mut self, ev: &ReplaceEvent) {
        for h in &mut self.handlers {
            h.on_replace(ev);
        }
    }

    pub fn dispatch_trade(&mut self, ev: &TradeEvent) {
        for h in &mut self.handlers {
            h.on_trade(ev);
        }
    }

    pub fn dispatch_cross(&mut self, ev: &CrossEvent) {
        for h in &mut self.handlers {
            h.on_cross(ev);
        }
    }

    pub fn dispatch_status_change(&mut self, ev: &StatusChangeEvent) {
        for h in &mut self.handlers {
            h.on_status_change(ev);
        }
    }

    pub fn dispatch_tick(&mut self, timestamp: Timestamp) {
        for h in &mut self.handlers {
            h.on_tick(timestamp);
        }
    }

    pub fn dispatch_stale_reference(&mut self, order_ref: OrderRef) {
        for h in &mut self.handlers {
            h.on_stale_reference(order_ref);
        }
    }

    pub fn dispatch_error(&mut self, err: &dyn std::error::Error) {
        for h in &mut self.handlers {
            h.on_error(err);
        }
    }

    /// Checks every handler's schedule against `last_timestamp` and fires
    /// any snapshots now due, calling `make_snapshot` lazily (at most once
    /// per due timestamp, never if nothing is due).
    pub fn check_scheduled_snapshots(
        &mut self,
        last_timestamp: Timestamp,
        mut make_snapshot: impl FnMut(Timestamp) -> BookSnapshot,
    ) {
        for (handler, cursor) in self.handlers.iter_mut().zip(self.cursors.iter_mut()) {
            let schedule = handler.scheduled_snapshots().to_vec();
            for due in cursor.due(&schedule, last_timestamp) {
                let snap = make_snapshot(due);
                handler.on_scheduled_snapshot(&snap);
            }
        }
    }
}

impl<H: Handler> Default for HandlerDispatch<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        adds: usize,
        schedule: Vec<Timestamp>,
        snapshots_seen: Vec<Timestamp>,
    }

    impl Handler for Recorder {
        fn on_add(&mut self, _ev: &AddEvent) {
            self.adds += 1;
        }

        fn scheduled_snapshots(&self) -> &[Timestamp] {
            &self.schedule
        }

        fn on_scheduled_snapshot(&mut self, snapshot: &BookSnapshot) {
            self.snapshots_seen.push(snapshot.as_of);
        }
    }

    #[test]
    fn due_returns_all_skipped_thresholds_in_order() {
        let schedule = vec![Timestamp(100), Timestamp(200), Timestamp(300)];
        let mut cursor = SnapshotCursor::new();
        let due = cursor.due(&schedule, Timestamp(250));
        assert_eq!(due, vec![Timestamp(100), Timestamp(200)]);
        // Nothing re-fires for the same last_timestamp.
        assert!(cursor.due(&schedule, Timestamp(250)).is_empty());
        let due2 = cursor.due(&schedule, Timestamp(300));
        assert_eq!(due2, vec![Timestamp(300)]);
    }

    #[test]
    fn dispatch_add_reaches_every_handler() {
        let mut dispatch: HandlerDispatch<Recorder> = HandlerDispatch::new();
        dispatch.register(Recorder::default());
        dispatch.register(Recorder::default());
        let ev = AddEvent {
            order_ref: OrderRef(1),
            side: Side::Bid,
            price: Price(1),
            shares: 1,
            symbol: Symbol::from_str_padded("AAPL"),
            timestamp: Timestamp(1),
        };
        dispatch.dispatch_add(&ev);
        for h in &dispatch.handlers {
            assert_eq!(h.adds, 1);
        }
    }
}
