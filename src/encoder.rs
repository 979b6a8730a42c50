//! `Message` -> bytes, and the symbol-filter passthrough encoder (§4.2).
//!
//! Always writes the 5.0-width wire form (4-byte order-size fields); a 4.1
//! consumer narrows them back down on decode (`TagLengthTable::for_version`).
//!
//! The passthrough encoder re-serializes a subset of a feed (one or more
//! symbols) while keeping the output replayable on its own: an order can
//! only be executed, cancelled, deleted, or replaced in the filtered output
//! if its original add was itself emitted, and a broken-trade record is only
//! emitted if the trade it refers to was. Two small tracking sets carry that
//! state across calls; the encoder itself stays stateless otherwise (§9).

use std::collections::HashSet;

use crate::message::{Message, MatchNumber, OrderRef, Symbol};

/// Length-prefixed framing: `u16` big-endian length, then tag + body. This
/// mirrors the decoder's `Framing::LengthPrefixed` and is the only framing
/// the encoder produces; a fixed-by-type consumer can simply skip the first
/// two bytes of each frame.
fn frame(tag: u8, body: &[u8]) -> Vec<u8> {
    let len = 1 + body.len();
    let mut out = Vec::with_capacity(2 + len);
    out.extend_from_slice(&(len as u16).to_be_bytes());
    out.push(tag);
    out.extend_from_slice(body);
    out
}

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn new() -> Self {
        Writer { buf: Vec::new() }
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn timestamp(&mut self, ts: crate::message::Timestamp) {
        let bytes = ts.0.to_be_bytes();
        self.buf.extend_from_slice(&bytes[2..]);
    }

    fn symbol(&mut self, s: Symbol) {
        self.buf.extend_from_slice(&s.0);
    }

    fn mpid(&mut self, m: crate::message::Mpid) {
        self.buf.extend_from_slice(&m.0);
    }

    fn price(&mut self, p: crate::message::Price) {
        self.u32(p.0);
    }

    fn side(&mut self, s: crate::message::Side) {
        self.u8(if s == crate::message::Side::Bid { b'B' } else { b'A' });
    }
}

fn encode_body(msg: &Message) -> Vec<u8> {
    let mut w = Writer::new();
    match *msg {
        Message::SystemEvent { timestamp, event_code } => {
            w.timestamp(timestamp);
            w.u8(event_code);
        }
        Message::StockDirectory {
            timestamp,
            symbol,
            market_category,
            financial_status,
            round_lot_size,
            round_lots_only,
        } => {
            w.timestamp(timestamp);
            w.symbol(symbol);
            w.u8(market_category);
            w.u8(financial_status);
            w.u32(round_lot_size);
            w.u8(round_lots_only as u8);
        }
        Message::StockTradingAction {
            timestamp,
            symbol,
            trading_state,
            reason,
        } => {
            w.timestamp(timestamp);
            w.symbol(symbol);
            w.u8(trading_state);
            w.buf.extend_from_slice(&reason);
        }
        Message::RegShoRestriction { timestamp, symbol, action } => {
            w.timestamp(timestamp);
            w.symbol(symbol);
            w.u8(action);
        }
        Message::MarketParticipantPosition {
            timestamp,
            mpid,
            symbol,
            primary_market_maker,
            market_maker_mode,
            participant_state,
        } => {
            w.timestamp(timestamp);
            w.mpid(mpid);
            w.symbol(symbol);
            w.u8(primary_market_maker as u8);
            w.u8(market_maker_mode);
            w.u8(participant_state);
        }
        Message::MwcbDeclineLevel { timestamp, level1, level2, level3 } => {
            w.timestamp(timestamp);
            w.price(level1);
            w.price(level2);
            w.price(level3);
        }
        Message::MwcbStatus { timestamp, breached_level } => {
            w.timestamp(timestamp);
            w.u8(breached_level);
        }
        Message::IpoQuotingPeriod {
            timestamp,
            symbol,
            release_time,
            release_qualifier,
            ipo_price,
        } => {
            w.timestamp(timestamp);
            w.symbol(symbol);
            w.u32(release_time);
            w.u8(release_qualifier);
            w.price(ipo_price);
        }
        Message::LuldAuctionCollar {
            timestamp,
            symbol,
            reference_price,
            upper_collar,
            lower_collar,
            extension,
        } => {
            w.timestamp(timestamp);
            w.symbol(symbol);
            w.price(reference_price);
            w.price(upper_collar);
            w.price(lower_collar);
            w.u8(extension);
        }
        Message::OperationalHalt {
            timestamp,
            symbol,
            market_code,
            halt_action,
        } => {
            w.timestamp(timestamp);
            w.symbol(symbol);
            w.u8(market_code);
            w.u8(halt_action);
        }
        Message::AddOrder {
            timestamp,
            order_ref,
            side,
            shares,
            symbol,
            price,
        } => {
            w.timestamp(timestamp);
            w.u64(order_ref.0);
            w.side(side);
            w.u32(shares);
            w.symbol(symbol);
            w.price(price);
        }
        Message::AddOrderMpid {
            timestamp,
            order_ref,
            side,
            shares,
            symbol,
            price,
            mpid,
        } => {
            w.timestamp(timestamp);
            w.u64(order_ref.0);
            w.side(side);
            w.u32(shares);
            w.symbol(symbol);
            w.price(price);
            w.mpid(mpid);
        }
        Message::OrderExecuted {
            timestamp,
            order_ref,
            executed_shares,
            match_number,
        } => {
            w.timestamp(timestamp);
            w.u64(order_ref.0);
            w.u32(executed_shares);
            w.u64(match_number.0);
        }
        Message::OrderExecutedWithPrice {
            timestamp,
            order_ref,
            executed_shares,
            match_number,
            printable,
            execution_price,
        } => {
            w.timestamp(timestamp);
            w.u64(order_ref.0);
            w.u32(executed_shares);
            w.u64(match_number.0);
            w.u8(printable as u8);
            w.price(execution_price);
        }
        Message::OrderCancel {
            timestamp,
            order_ref,
            cancelled_shares,
        } => {
            w.timestamp(timestamp);
            w.u64(order_ref.0);
            w.u32(cancelled_shares);
        }
        Message::OrderDelete { timestamp, order_ref } => {
            w.timestamp(timestamp);
            w.u64(order_ref.0);
        }
        Message::OrderReplace {
            timestamp,
            old_order_ref,
            new_order_ref,
            new_shares,
            new_price,
        } => {
            w.timestamp(timestamp);
            w.u64(old_order_ref.0);
            w.u64(new_order_ref.0);
            w.u32(new_shares);
            w.price(new_price);
        }
        Message::Trade {
            timestamp,
            order_ref,
            side,
            shares,
            symbol,
            price,
            match_number,
        } => {
            w.timestamp(timestamp);
            w.u64(order_ref.0);
            w.side(side);
            w.u32(shares);
            w.symbol(symbol);
            w.price(price);
            w.u64(match_number.0);
        }
        Message::CrossTrade {
            timestamp,
            shares,
            symbol,
            cross_price,
            match_number,
            cross_type,
        } => {
            w.timestamp(timestamp);
            w.u64(shares);
            w.symbol(symbol);
            w.price(cross_price);
            w.u64(match_number.0);
            w.u8(cross_type);
        }
        Message::BrokenTrade { timestamp, match_number } => {
            w.timestamp(timestamp);
            w.u64(match_number.0);
        }
        Message::Noii {
            timestamp,
            paired_shares,
            imbalance_shares,
            imbalance_direction,
            symbol,
            far_price,
            near_price,
            current_reference_price,
            cross_type,
            price_variation_indicator,
        } => {
            w.timestamp(timestamp);
            w.u64(paired_shares);
            w.u64(imbalance_shares);
            w.u8(imbalance_direction);
            w.symbol(symbol);
            w.price(far_price);
            w.price(near_price);
            w.price(current_reference_price);
            w.u8(cross_type);
            w.u8(price_variation_indicator);
        }
        Message::Rpi { timestamp, symbol, interest_flag } => {
            w.timestamp(timestamp);
            w.symbol(symbol);
            w.u8(interest_flag);
        }
        Message::DirectListingCapitalRaise {
            timestamp,
            symbol,
            open_eligibility_status,
            min_allowable_price,
            max_allowable_price,
            near_execution_price,
            near_execution_time,
            lower_price_range_collar,
            upper_price_range_collar,
        } => {
            w.timestamp(timestamp);
            w.symbol(symbol);
            w.u8(open_eligibility_status);
            w.price(min_allowable_price);
            w.price(max_allowable_price);
            w.price(near_execution_price);
            w.u64(near_execution_time);
            w.price(lower_price_range_collar);
            w.price(upper_price_range_collar);
        }
    }
    w.buf
}

/// Extracts the order reference a message keys its book mutation by, if any.
/// Used by the passthrough filter to decide whether a downstream message
/// refers to an order whose add was already emitted.
fn keyed_order_ref(msg: &Message) -> Option<OrderRef> {
    match *msg {
        Message::OrderExecuted { order_ref, .. }
        | Message::OrderExecutedWithPrice { order_ref, .. }
        | Message::OrderCancel { order_ref, .. }
        | Message::OrderDelete { order_ref, .. } => Some(order_ref),
        Message::OrderReplace { old_order_ref, .. } => Some(old_order_ref),
        _ => None,
    }
}

fn match_number_of(msg: &Message) -> Option<MatchNumber> {
    match *msg {
        Message::OrderExecuted { match_number, .. }
        | Message::OrderExecutedWithPrice { match_number, .. }
        | Message::Trade { match_number, .. }
        | Message::CrossTrade { match_number, .. } => Some(match_number),
        _ => None,
    }
}

fn referenced_match_number(msg: &Message) -> Option<MatchNumber> {
    match *msg {
        Message::BrokenTrade { match_number, .. } => Some(match_number),
        _ => None,
    }
}

/// Re-serializes `Message`s, optionally filtering to a set of symbols while
/// keeping the output feed self-consistent.
#[derive(Debug, Default)]
pub struct Encoder {
    emitted_refs: HashSet<OrderRef>,
    emitted_matches: HashSet<MatchNumber>,
}

impl Encoder {
    pub fn new() -> Self {
        Encoder {
            emitted_refs: HashSet::new(),
            emitted_matches: HashSet::new(),
        }
    }

    /// Encodes a message regardless of any filter, recording it as emitted so
    /// later order-keyed / broken-trade messages referring to it pass the
    /// filter too. Used both for unconditional re-serialization and as the
    /// emit step once `should_emit` has already said yes.
    pub fn encode_unconditionally(&mut self, msg: &Message) -> Vec<u8> {
        self.record_emission(msg);
        let tag = msg.tag().0;
        let body = encode_body(msg);
        frame(tag, &body)
    }

    fn record_emission(&mut self, msg: &Message) {
        match msg {
            Message::AddOrder { order_ref, .. } | Message::AddOrderMpid { order_ref, .. } => {
                self.emitted_refs.insert(*order_ref);
            }
            Message::OrderReplace { old_order_ref, new_order_ref, .. } => {
                self.emitted_refs.remove(old_order_ref);
                self.emitted_refs.insert(*new_order_ref);
            }
            _ => {}
        }
        if let Some(mn) = match_number_of(msg) {
            self.emitted_matches.insert(mn);
        }
    }

    /// Decides whether `msg` belongs in a feed filtered to `symbols`, per the
    /// passthrough rules in §4.2:
    /// - a symbol-keyed message passes iff its symbol is in the set;
    /// - an order-keyed message passes iff its order's original add passed;
    /// - a broken-trade message passes iff the trade it refers to passed;
    /// - system-wide messages (no symbol, no order ref) always pass.
    pub fn should_emit(&self, msg: &Message, symbols: &HashSet<Symbol>) -> bool {
        if let Some(sym) = msg.symbol() {
            return symbols.contains(&sym);
        }
        if let Some(order_ref) = keyed_order_ref(msg) {
            return self.emitted_refs.contains(&order_ref);
        }
        if let Some(mn) = referenced_match_number(msg) {
            return self.emitted_matches.contains(&mn);
        }
        true
    }

    /// Applies the symbol filter and encodes the message if it passes,
    /// returning `None` for messages the filtered feed should drop.
    pub fn encode_filtered(&mut self, msg: &Message, symbols: &HashSet<Symbol>) -> Option<Vec<u8>> {
        if !self.should_emit(msg, symbols) {
            return None;
        }
        Some(self.encode_unconditionally(msg))
    }
}
