//! Per-symbol, per-day state machine (§4.4): applies decoded messages to an
//! `OrderBook`, tracks `TradingStatus`, and dispatches typed events plus
//! scheduled snapshots to registered handlers.

use log::{debug, trace, warn};

use crate::handler::{
    AddEvent, CancelEvent, CrossEvent, DeleteEvent, ExecuteEvent, Handler, HandlerDispatch,
    ReplaceEvent, StatusChangeEvent, TradeEvent,
};
use crate::message::{Message, OrderRef, Symbol, Timestamp, TradingStatus};
use crate::orderbook::{BookError, OrderBook};

/// Maps an ITCH trading-state/halt-action byte to a `TradingStatus`.
/// Unrecognized codes leave the status unchanged — they're venue
/// extensions, not processor errors.
fn trading_status_from_code(code: u8) -> Option<TradingStatus> {
    match code {
        b'T' => Some(TradingStatus::Trading),
        b'H' | b'P' => Some(TradingStatus::Halted),
        b'Q' => Some(TradingStatus::QuoteOnly),
    _ => None,
    }
}

fn trading_status_from_system_event(code: u8) -> Option<TradingStatus> {
    match code {
        b'O' => Some(TradingStatus::PreTrade),
        b'Q' => Some(TradingStatus::Trading),
        b'M' => Some(TradingStatus::ClosingAuction),
        b'E' => Some(TradingStatus::PostTrade),
        b'C' => Some(TradingStatus::Closed),
        _ => None,
    }
}

/// Returns the order reference an order-keyed message mutates the book
/// through, for the purposes of stale-reference detection. `None` for
/// messages that are never order-keyed (adds are never "stale" — a
/// duplicate add is a different error entirely).
fn order_keyed_ref(msg: &Message) -> Option<OrderRef> {
    match *msg {
        Message::OrderExecuted { order_ref, .. }
        | Message::OrderExecutedWithPrice { order_ref, .. }
        | Message::OrderCancel { order_ref, .. }
        | Message::OrderDelete { order_ref, .. } => Some(order_ref),
        Message::OrderReplace { old_order_ref, .. } => Some(old_order_ref),
        _ => None,
    }
}

/// Builds a processor for one symbol. `strict` controls whether book
/// errors other than stale references (duplicate add, over-execution,
/// over-cancellation) halt processing or are merely reported to handlers
/// via `on_error` (§7).
pub struct Processor<H: Handler> {
    symbol: Symbol,
    book: OrderBook,
    status: TradingStatus,
    last_timestamp: Timestamp,
    seen_first_message: bool,
    dispatch: HandlerDispatch<H>,
    strict: bool,
}

impl<H: Handler> Processor<H> {
    pub fn new(symbol: Symbol) -> Self {
        Processor {
            symbol,
            book: OrderBook::new(symbol),
            status: TradingStatus::PreTrade,
            last_timestamp: Timestamp(0),
            seen_first_message: false,
            dispatch: HandlerDispatch::new(),
            strict: false,
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn register_handler(&mut self, handler: H) {
        self.dispatch.register(handler);
    }

    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    pub fn status(&self) -> TradingStatus {
        self.status
    }

    pub fn last_timestamp(&self) -> Timestamp {
        self.last_timestamp
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Applies one decoded message. Per §4.4: scheduled snapshots due at
    /// this message's timestamp fire first, against the book state left by
    /// the *previous* message (§4.5 — the threshold is the new message's
    /// timestamp, but the snapshot must not reflect it yet). Only then is
    /// the message itself filtered, applied, and dispatched.
    pub fn on_message(&mut self, msg: &Message) -> Result<(), BookError> {
        let incoming_ts = msg.timestamp();
        {
            let book = &self.book;
            self.dispatch
                .check_scheduled_snapshots(incoming_ts, |as_of| book.snapshot(as_of, None, true));
        }

        if let Some(sym) = msg.symbol() {
            if sym != self.symbol {
                return Ok(());
            }
        }

        if !self.seen_first_message {
            self.book.set_book_date(incoming_ts);
            self.seen_first_message = true;
        }

        self.update_trading_status(msg);
        self.apply_mutation(msg)?;

        if incoming_ts > self.last_timestamp {
            self.dispatch.dispatch_tick(incoming_ts);
        }
        self.last_timestamp = incoming_ts;

        Ok(())
    }

    fn update_trading_status(&mut self, msg: &Message) {
        match *msg {
            Message::SystemEvent { event_code, .. } => {
                if let Some(s) = trading_status_from_system_event(event_code) {
                    self.status = s;
                }
            }
            Message::StockTradingAction { trading_state, .. } => {
                if let Some(s) = trading_status_from_code(trading_state) {
                    self.set_status(s, msg.timestamp());
                }
            }
            Message::OperationalHalt { halt_action, .. } => {
                if let Some(s) = trading_status_from_code(halt_action) {
                    self.set_status(s, msg.timestamp());
                }
            }
            _ => {}
        }
    }

    fn set_status(&mut self, status: TradingStatus, timestamp: Timestamp) {
        if status != self.status {
            self.status = status;
            self.dispatch.dispatch_status_change(&StatusChangeEvent {
                symbol: self.symbol,
                status,
                timestamp,
            });
        }
    }

    /// Applies the book mutation dictated by `msg`, if any, and dispatches
    /// the corresponding handler event. Unknown order references on
    /// order-keyed messages are downgraded to a `StaleReference` warning
    /// (§7) rather than propagated. Other book errors are reported to
    /// handlers and, in strict mode, also returned to the caller.
    fn apply_mutation(&mut self, msg: &Message) -> Result<(), BookError> {
        if let Some(order_ref) = order_keyed_ref(msg) {
            if !self.book.contains(order_ref) {
                warn!("stale reference: {:?} not resident for {:?}", order_ref, msg.tag());
                self.dispatch.dispatch_stale_reference(order_ref);
                return Ok(());
            }
        }

        let result = match *msg {
            Message::AddOrder { timestamp, order_ref, side, shares, symbol, price } => {
                self.book.add_order(order_ref, side, price, shares).map(|()| {
                    trace!("add {:?} {:?}@{} x{}", order_ref, side, price, shares);
                    self.dispatch.dispatch_add(&AddEvent {
                        order_ref,
                        side,
                        price,
                        shares,
                        symbol,
                        timestamp,
                    });
                })
            }
            Message::AddOrderMpid { timestamp, order_ref, side, shares, symbol, price, .. } => {
                self.book.add_order(order_ref, side, price, shares).map(|()| {
                    self.dispatch.dispatch_add(&AddEvent {
                        order_ref,
                        side,
                        price,
                        shares,
                        symbol,
                        timestamp,
                    });
                })
            }
            Message::OrderExecuted { timestamp, order_ref, executed_shares, match_number } => {
                self.book.execute(order_ref, executed_shares).map(|()| {
                    self.dispatch.dispatch_execute(&ExecuteEvent {
                        order_ref,
                        shares: executed_shares,
                        match_number,
                        execution_price: None,
                        printable: None,
                        timestamp,
                    });
                })
            }
            Message::OrderExecutedWithPrice {
                timestamp,
                order_ref,
                executed_shares,
                match_number,
                printable,
                execution_price,
            } => self
                .book
                .execute_with_price(order_ref, executed_shares, printable, execution_price, match_number)
                .map(|()| {
                    self.dispatch.dispatch_execute(&ExecuteEvent {
                        order_ref,
                        shares: executed_shares,
                        match_number,
                        execution_price: Some(execution_price),
                        printable: Some(printable),
                        timestamp,
                    });
                }),
            Message::OrderCancel { timestamp, order_ref, cancelled_shares } => {
                self.book.cancel(order_ref, cancelled_shares).map(|()| {
                    self.dispatch.dispatch_cancel(&CancelEvent {
                        order_ref,
                        shares: cancelled_shares,
                        timestamp,
                    });
                })
            }
            Message::OrderDelete { timestamp, order_ref } => self.book.delete(order_ref).map(|()| {
                self.dispatch.dispatch_delete(&DeleteEvent { order_ref, timestamp });
            }),
            Message::OrderReplace { timestamp, old_order_ref, new_order_ref, new_shares, new_price } => self
                .book
                .replace(old_order_ref, new_order_ref, new_price, new_shares)
                .map(|()| {
                    self.dispatch.dispatch_replace(&ReplaceEvent {
                        old_order_ref,
                        new_order_ref,
                        new_price,
                        new_shares,
                        timestamp,
                    });
                }),
            Message::Trade { timestamp, order_ref, side, shares, symbol, price, match_number } => {
                debug!("trade {:?} {} shares @ {}", match_number, shares, price);
                self.dispatch.dispatch_trade(&TradeEvent {
                    order_ref,
                    side,
                    shares,
                    symbol,
                    price,
                    match_number,
                    timestamp,
                });
                Ok(())
            }
            Message::CrossTrade { timestamp, shares, symbol, cross_price, match_number, cross_type } => {
                self.dispatch.dispatch_cross(&CrossEvent {
                    symbol,
                    shares,
                    cross_price,
                    match_number,
                    cross_type,
                    timestamp,
                });
                Ok(())
            }
            Message::BrokenTrade { match_number, .. } => {
                debug!("broken trade {:?}", match_number);
                Ok(())
            }
            _ => Ok(()),
        };

        if let Err(err) = result {
            warn!("book error: {err}");
            self.dispatch.dispatch_error(&err);
            if self.strict {
                return Err(err);
            }
        }
        Ok(())
    }

    /// Flushes any end-of-day snapshots handlers still have scheduled and
    /// releases book resources. After `finalize`, the processor should not
    /// receive further messages.
    pub fn finalize(&mut self) {
        let book = &self.book;
        self.dispatch
            .check_scheduled_snapshots(Timestamp(u64::MAX), |as_of| book.snapshot(as_of, None, true));
    }
}
