//! Tagged message variants for the NASDAQ TotalView-ITCH 5.0 wire format.
//!
//! Every record on the wire starts with a one-byte ASCII tag followed by a
//! 6-byte nanosecond timestamp and then tag-specific fields. We model that as
//! a single sum type rather than a class hierarchy per tag: the decoder
//! pattern-matches on `Tag` to pick a reader, the processor pattern-matches
//! on `Message` to pick a book mutation.

use std::fmt;

/// Fixed-point price: wire value is the price times 10,000 (4 implied
/// decimals). Division only happens at presentation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(pub u32);

impl Price {
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:04}", self.0 / 10_000, self.0 % 10_000)
    }
}

/// Share count.
pub type Volume = u32;

/// Venue-assigned identifier, unique within a trading day, for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderRef(pub u64);

/// Venue-assigned identifier, unique per execution/trade print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatchNumber(pub u64);

/// Nanoseconds since midnight of the trading day. The wire format carries
/// this in 6 bytes; we zero-extend to 8 on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub u64);

/// 8-byte ASCII symbol, right-padded with spaces. Compared byte-wise, never
/// trimmed internally (trimming for display is the caller's concern).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(pub [u8; 8]);

impl Symbol {
    pub fn from_str_padded(s: &str) -> Self {
        let mut raw = [b' '; 8];
        let bytes = s.as_bytes();
        let n = bytes.len().min(8);
        raw[..n].copy_from_slice(&bytes[..n]);
        Symbol(raw)
    }

    pub fn trimmed(&self) -> &str {
        let end = self.0.iter().rposition(|b| *b != b' ').map_or(0, |i| i + 1);
        std::str::from_utf8(&self.0[..end]).unwrap_or("")
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.trimmed())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.trimmed())
    }
}

/// 4-byte ASCII Market Participant Identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mpid(pub [u8; 4]);

impl fmt::Debug for Mpid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mpid({:?})", std::str::from_utf8(&self.0).unwrap_or("?"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradingStatus {
    PreTrade,
    Trading,
    Halted,
    QuoteOnly,
    ClosingAuction,
    PostTrade,
    Closed,
}

/// The one-byte ASCII tag identifying a record's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub u8);

impl Tag {
    pub const SYSTEM_EVENT: Tag = Tag(b'S');
    pub const STOCK_DIRECTORY: Tag = Tag(b'R');
    pub const STOCK_TRADING_ACTION: Tag = Tag(b'H');
    pub const REG_SHO_RESTRICTION: Tag = Tag(b'Y');
    pub const MARKET_PARTICIPANT_POSITION: Tag = Tag(b'L');
    pub const MWCB_DECLINE_LEVEL: Tag = Tag(b'V');
    pub const MWCB_STATUS: Tag = Tag(b'W');
    pub const IPO_QUOTING_PERIOD: Tag = Tag(b'K');
    pub const LULD_AUCTION_COLLAR: Tag = Tag(b'J');
    pub const OPERATIONAL_HALT: Tag = Tag(b'h');
    pub const ADD_ORDER: Tag = Tag(b'A');
    pub const ADD_ORDER_MPID: Tag = Tag(b'F');
    pub const ORDER_EXECUTED: Tag = Tag(b'E');
    pub const ORDER_EXECUTED_WITH_PRICE: Tag = Tag(b'C');
    pub const ORDER_CANCEL: Tag = Tag(b'X');
    pub const ORDER_DELETE: Tag = Tag(b'D');
    pub const ORDER_REPLACE: Tag = Tag(b'U');
    pub const TRADE: Tag = Tag(b'P');
    pub const CROSS_TRADE: Tag = Tag(b'Q');
    pub const BROKEN_TRADE: Tag = Tag(b'B');
    pub const NOII: Tag = Tag(b'I');
    pub const RPI: Tag = Tag(b'N');
    pub const DIRECT_LISTING_CAPITAL_RAISE: Tag = Tag(b'O');
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0 as char)
    }
}

/// One ASCII byte, used for venue-defined enumerations (event codes, trading
/// states, cross types, ...) that don't warrant their own Rust enum because
/// the set of values is venue-documented and open to extension.
pub type Code = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossType {
    Opening,
    Closing,
    IpoOrHalted,
    Intraday,
}

impl CrossType {
    pub fn from_code(b: u8) -> Option<Self> {
        match b {
            b'O' => Some(CrossType::Opening),
            b'C' => Some(CrossType::Closing),
            b'H' => Some(CrossType::IpoOrHalted),
            b'I' => Some(CrossType::Intraday),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            CrossType::Opening => b'O',
            CrossType::Closing => b'C',
            CrossType::IpoOrHalted => b'H',
            CrossType::Intraday => b'I',
        }
    }
}

/// A decoded ITCH record. Variants carry only the fields that exist on the
/// wire for that tag (§4.1); system-wide messages carry no symbol, and
/// order-keyed messages carry no symbol either (the processor's own book
/// index, not the wire, associates an order reference with a symbol).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    SystemEvent {
        timestamp: Timestamp,
        event_code: Code,
    },
    StockDirectory {
        timestamp: Timestamp,
        symbol: Symbol,
        market_category: Code,
        financial_status: Code,
        round_lot_size: u32,
        round_lots_only: bool,
    },
    StockTradingAction {
        timestamp: Timestamp,
        symbol: Symbol,
        trading_state: Code,
        reason: [u8; 4],
    },
    RegShoRestriction {
        timestamp: Timestamp,
        symbol: Symbol,
        action: Code,
    },
    MarketParticipantPosition {
        timestamp: Timestamp,
        mpid: Mpid,
        symbol: Symbol,
        primary_market_maker: bool,
        market_maker_mode: Code,
        participant_state: Code,
    },
    MwcbDeclineLevel {
        timestamp: Timestamp,
        level1: Price,
        level2: Price,
        level3: Price,
    },
    MwcbStatus {
        timestamp: Timestamp,
        breached_level: Code,
    },
    IpoQuotingPeriod {
        timestamp: Timestamp,
        symbol: Symbol,
        release_time: u32,
        release_qualifier: Code,
        ipo_price: Price,
    },
    LuldAuctionCollar {
        timestamp: Timestamp,
        symbol: Symbol,
        reference_price: Price,
        upper_collar: Price,
        lower_collar: Price,
        extension: u8,
    },
    OperationalHalt {
        timestamp: Timestamp,
        symbol: Symbol,
        market_code: Code,
        halt_action: Code,
    },
    AddOrder {
        timestamp: Timestamp,
        order_ref: OrderRef,
        side: Side,
        shares: Volume,
        symbol: Symbol,
        price: Price,
    },
    AddOrderMpid {
        timestamp: Timestamp,
        order_ref: OrderRef,
        side: Side,
        shares: Volume,
        symbol: Symbol,
        price: Price,
        mpid: Mpid,
    },
    OrderExecuted {
        timestamp: Timestamp,
        order_ref: OrderRef,
        executed_shares: Volume,
        match_number: MatchNumber,
    },
    OrderExecutedWithPrice {
        timestamp: Timestamp,
        order_ref: OrderRef,
        executed_shares: Volume,
        match_number: MatchNumber,
        printable: bool,
        execution_price: Price,
    },
    OrderCancel {
        timestamp: Timestamp,
        order_ref: OrderRef,
        cancelled_shares: Volume,
    },
    OrderDelete {
        timestamp: Timestamp,
        order_ref: OrderRef,
    },
    OrderReplace {
        timestamp: Timestamp,
        old_order_ref: OrderRef,
        new_order_ref: OrderRef,
        new_shares: Volume,
        new_price: Price,
    },
    Trade {
        timestamp: Timestamp,
        /// Zero for hidden executions (non-displayed liquidity); the book
        /// is never mutated for this message regardless.
        order_ref: OrderRef,
        side: Side,
        shares: Volume,
        symbol: Symbol,
        price: Price,
        match_number: MatchNumber,
    },
    CrossTrade {
        timestamp: Timestamp,
        shares: u64,
        symbol: Symbol,
        cross_price: Price,
        match_number: MatchNumber,
        cross_type: Code,
    },
    BrokenTrade {
        timestamp: Timestamp,
        match_number: MatchNumber,
    },
    Noii {
        timestamp: Timestamp,
        paired_shares: u64,
        imbalance_shares: u64,
        imbalance_direction: Code,
        symbol: Symbol,
        far_price: Price,
        near_price: Price,
        current_reference_price: Price,
        cross_type: Code,
        price_variation_indicator: Code,
    },
    Rpi {
        timestamp: Timestamp,
        symbol: Symbol,
        interest_flag: Code,
    },
    DirectListingCapitalRaise {
        timestamp: Timestamp,
        symbol: Symbol,
        open_eligibility_status: Code,
        min_allowable_price: Price,
        max_allowable_price: Price,
        near_execution_price: Price,
        near_execution_time: u64,
        lower_price_range_collar: Price,
        upper_price_range_collar: Price,
    },
}

impl Message {
    pub fn tag(&self) -> Tag {
        match self {
            Message::SystemEvent { .. } => Tag::SYSTEM_EVENT,
            Message::StockDirectory { .. } => Tag::STOCK_DIRECTORY,
            Message::StockTradingAction { .. } => Tag::STOCK_TRADING_ACTION,
            Message::RegShoRestriction { .. } => Tag::REG_SHO_RESTRICTION,
            Message::MarketParticipantPosition { .. } => Tag::MARKET_PARTICIPANT_POSITION,
            Message::MwcbDeclineLevel { .. } => Tag::MWCB_DECLINE_LEVEL,
            Message::MwcbStatus { .. } => Tag::MWCB_STATUS,
            Message::IpoQuotingPeriod { .. } => Tag::IPO_QUOTING_PERIOD,
            Message::LuldAuctionCollar { .. } => Tag::LULD_AUCTION_COLLAR,
            Message::OperationalHalt { .. } => Tag::OPERATIONAL_HALT,
            Message::AddOrder { .. } => Tag::ADD_ORDER,
            Message::AddOrderMpid { .. } => Tag::ADD_ORDER_MPID,
            Message::OrderExecuted { .. } => Tag::ORDER_EXECUTED,
            Message::OrderExecutedWithPrice { .. } => Tag::ORDER_EXECUTED_WITH_PRICE,
            Message::OrderCancel { .. } => Tag::ORDER_CANCEL,
            Message::OrderDelete { .. } => Tag::ORDER_DELETE,
            Message::OrderReplace { .. } => Tag::ORDER_REPLACE,
            Message::Trade { .. } => Tag::TRADE,
            Message::CrossTrade { .. } => Tag::CROSS_TRADE,
            Message::BrokenTrade { .. } => Tag::BROKEN_TRADE,
            Message::Noii { .. } => Tag::NOII,
            Message::Rpi { .. } => Tag::RPI,
            Message::DirectListingCapitalRaise { .. } => Tag::DIRECT_LISTING_CAPITAL_RAISE,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            Message::SystemEvent { timestamp, .. }
            | Message::StockDirectory { timestamp, .. }
            | Message::StockTradingAction { timestamp, .. }
            | Message::RegShoRestriction { timestamp, .. }
            | Message::MarketParticipantPosition { timestamp, .. }
            | Message::MwcbDeclineLevel { timestamp, .. }
            | Message::MwcbStatus { timestamp, .. }
            | Message::IpoQuotingPeriod { timestamp, .. }
            | Message::LuldAuctionCollar { timestamp, .. }
            | Message::OperationalHalt { timestamp, .. }
            | Message::AddOrder { timestamp, .. }
            | Message::AddOrderMpid { timestamp, .. }
            | Message::OrderExecuted { timestamp, .. }
            | Message::OrderExecutedWithPrice { timestamp, .. }
            | Message::OrderCancel { timestamp, .. }
            | Message::OrderDelete { timestamp, .. }
            | Message::OrderReplace { timestamp, .. }
            | Message::Trade { timestamp, .. }
            | Message::CrossTrade { timestamp, .. }
            | Message::BrokenTrade { timestamp, .. }
            | Message::Noii { timestamp, .. }
            | Message::Rpi { timestamp, .. }
            | Message::DirectListingCapitalRaise { timestamp, .. } => *timestamp,
        }
    }

    /// The symbol carried directly on the wire for this message, if any.
    /// Order-keyed messages (`E`/`C`/`X`/`D`/`U`) and system-wide messages
    /// (`S`/`V`/`W`) carry none; the processor resolves those through the
    /// order index or skips the symbol filter entirely.
    pub fn symbol(&self) -> Option<Symbol> {
        match *self {
            Message::StockDirectory { symbol, .. }
            | Message::StockTradingAction { symbol, .. }
            | Message::RegShoRestriction { symbol, .. }
            | Message::MarketParticipantPosition { symbol, .. }
            | Message::IpoQuotingPeriod { symbol, .. }
            | Message::LuldAuctionCollar { symbol, .. }
            | Message::OperationalHalt { symbol, .. }
            | Message::AddOrder { symbol, .. }
            | Message::AddOrderMpid { symbol, .. }
            | Message::Trade { symbol, .. }
            | Message::CrossTrade { symbol, .. }
            | Message::Noii { symbol, .. }
            | Message::Rpi { symbol, .. }
            | Message::DirectListingCapitalRaise { symbol, .. } => Some(symbol),
            _ => None,
        }
    }
}
