//! Frame -> `Message`: a lazy, single-pass decoder over a byte source.
//!
//! Two framing modes are supported (§4.1): length-prefixed persisted feeds,
//! where a 16-bit big-endian length precedes each record, and fixed-by-type
//! raw venue streams, where the tag alone determines how many bytes follow.
//! Either way the first byte of the record is the ASCII type tag and
//! everything is big-endian.

use std::fmt;
use std::io::{self, Read};

use crate::message::{Code, CrossType, Message, Mpid, MatchNumber, OrderRef, Price, Side, Symbol, Tag, Timestamp};

/// Selects which venue wire-format revision's tag -> length table to use.
/// The 4.1 and 5.0 variants carry the same set of message kinds; a handful
/// of order-size fields are narrower in 4.1 (§9 open questions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItchVersion {
    V41,
    V50,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Each record is preceded by a `u16` big-endian length.
    LengthPrefixed,
    /// No length prefix; the tag alone determines the record's length.
    FixedByType,
}

/// Total on-wire length of a record for a given tag, tag byte included,
/// length prefix excluded. Built once per `ItchVersion` and consulted by
/// both framing modes.
#[derive(Debug, Clone)]
pub struct TagLengthTable {
    lengths: hashbrown::HashMap<u8, usize>,
}

impl TagLengthTable {
    /// Builds the full 23-tag table for `version`. Every tag exists in both
    /// 4.1 and 5.0; only the order-size field on the add/execute family is
    /// narrower pre-5.0 (2 bytes instead of 4), per §9.
    pub fn for_version(version: ItchVersion) -> Self {
        let mut lengths = hashbrown::HashMap::new();
        let shares_width = match version {
            ItchVersion::V41 => 2,
            ItchVersion::V50 => 4,
        };
        // timestamp(6) is common to every record; lengths below are
        // 1 (tag) + 6 (timestamp) + kind-specific fields.
        lengths.insert(Tag::SYSTEM_EVENT.0, 1 + 6 + 1);
        lengths.insert(Tag::ADD_ORDER.0, 1 + 6 + 8 + 1 + shares_width + 8 + 4);
        lengths.insert(Tag::ADD_ORDER_MPID.0, 1 + 6 + 8 + 1 + shares_width + 8 + 4 + 4);
        lengths.insert(Tag::ORDER_EXECUTED.0, 1 + 6 + 8 + shares_width + 8);
        lengths.insert(
            Tag::ORDER_EXECUTED_WITH_PRICE.0,
            1 + 6 + 8 + shares_width + 8 + 1 + 4,
        );
        lengths.insert(Tag::ORDER_CANCEL.0, 1 + 6 + 8 + 4);
        lengths.insert(Tag::ORDER_DELETE.0, 1 + 6 + 8);
        lengths.insert(Tag::ORDER_REPLACE.0, 1 + 6 + 8 + 8 + 4 + 4);
        lengths.insert(Tag::TRADE.0, 1 + 6 + 8 + 1 + 4 + 8 + 4 + 8);
        lengths.insert(Tag::BROKEN_TRADE.0, 1 + 6 + 8);
        lengths.insert(Tag::STOCK_DIRECTORY.0, 1 + 6 + 8 + 1 + 1 + 4 + 1);
        lengths.insert(Tag::STOCK_TRADING_ACTION.0, 1 + 6 + 8 + 1 + 4);
        lengths.insert(Tag::REG_SHO_RESTRICTION.0, 1 + 6 + 8 + 1);
        lengths.insert(Tag::MARKET_PARTICIPANT_POSITION.0, 1 + 6 + 4 + 8 + 1 + 1 + 1);
        lengths.insert(Tag::MWCB_DECLINE_LEVEL.0, 1 + 6 + 4 + 4 + 4);
        lengths.insert(Tag::MWCB_STATUS.0, 1 + 6 + 1);
        lengths.insert(Tag::IPO_QUOTING_PERIOD.0, 1 + 6 + 8 + 4 + 1 + 4);
        lengths.insert(Tag::LULD_AUCTION_COLLAR.0, 1 + 6 + 8 + 4 + 4 + 4 + 1);
        lengths.insert(Tag::OPERATIONAL_HALT.0, 1 + 6 + 8 + 1 + 1);
        lengths.insert(Tag::CROSS_TRADE.0, 1 + 6 + 8 + 8 + 4 + 8 + 1);
        lengths.insert(Tag::NOII.0, 1 + 6 + 8 + 8 + 1 + 8 + 4 + 4 + 4 + 1 + 1);
        lengths.insert(Tag::RPI.0, 1 + 6 + 8 + 1);
        lengths.insert(Tag::DIRECT_LISTING_CAPITAL_RAISE.0, 1 + 6 + 8 + 1 + 4 + 4 + 4 + 8 + 4 + 4);

        TagLengthTable { lengths }
    }

    #[inline]
    pub fn len_for(&self, tag: u8) -> Option<usize> {
        self.lengths.get(&tag).copied()
    }
}

#[derive(Debug)]
pub enum DecodeError {
    /// The byte source ended partway through a record.
    TruncatedStream,
    /// A tag with no known decoder.
    UnknownType(u8),
    /// The length-prefix framing disagreed with the tag's known length.
    LengthMismatch { expected: usize, actual: usize },
    /// The underlying byte source failed.
    Io(io::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::TruncatedStream => write!(f, "truncated stream: record ended mid-frame"),
            DecodeError::UnknownType(b) => write!(f, "unknown message type: {:?}", *b as char),
            DecodeError::LengthMismatch { expected, actual } => write!(
                f,
                "length mismatch: tag's known length is {expected}, frame declared {actual}"
            ),
            DecodeError::Io(e) => write!(f, "byte source error: {e}"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DecodeError {
    fn from(e: io::Error) -> Self {
        DecodeError::Io(e)
    }
}

/// Lazy, single-pass decoder: wraps a `Read` byte source and yields one
/// `Message` (or error) per record. Iteration stops permanently after the
/// first error, per §4.1 — ITCH has no resynchronization markers.
pub struct Decoder<R> {
    source: R,
    framing: Framing,
    version: ItchVersion,
    table: TagLengthTable,
    done: bool,
}

impl<R: Read> Decoder<R> {
    pub fn new(source: R, framing: Framing, version: ItchVersion) -> Self {
        Decoder {
            source,
            framing,
            version,
            table: TagLengthTable::for_version(version),
            done: false,
        }
    }

    pub fn from_config(source: R, cfg: crate::config::DecoderConfig) -> Self {
        Self::new(source, cfg.framing.into(), cfg.version.into())
    }

    fn read_exact_or_eof(&mut self, buf: &mut [u8]) -> Result<bool, DecodeError> {
        if buf.is_empty() {
            return Ok(true);
        }
        let mut filled = 0;
        while filled < buf.len() {
            match self.source.read(&mut buf[filled..]) {
                Ok(0) => {
                    return if filled == 0 {
                        Ok(false)
                    } else {
                        Err(DecodeError::TruncatedStream)
                    };
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DecodeError::Io(e)),
            }
        }
        Ok(true)
    }

    fn next_record(&mut self) -> Result<Option<Message>, DecodeError> {
        match self.framing {
            Framing::LengthPrefixed => {
                let mut len_buf = [0u8; 2];
                if !self.read_exact_or_eof(&mut len_buf)? {
                    return Ok(None);
                }
                let len = u16::from_be_bytes(len_buf) as usize;
                if len < 1 {
                    return Err(DecodeError::TruncatedStream);
                }
                let mut body = vec![0u8; len];
                if !self.read_exact_or_eof(&mut body)? {
                    return Err(DecodeError::TruncatedStream);
                }
                let tag = body[0];
                let expected = self
                    .table
                    .len_for(tag)
                    .ok_or(DecodeError::UnknownType(tag))?;
                if expected != len {
                    return Err(DecodeError::LengthMismatch {
                        expected,
                        actual: len,
                    });
                }
                decode_body(tag, &body[1..], self.version).map(Some)
            }
            Framing::FixedByType => {
                let mut tag_buf = [0u8; 1];
                if !self.read_exact_or_eof(&mut tag_buf)? {
                    return Ok(None);
                }
                let tag = tag_buf[0];
                let total = self
                    .table
                    .len_for(tag)
                    .ok_or(DecodeError::UnknownType(tag))?;
                let mut body = vec![0u8; total - 1];
                if !self.read_exact_or_eof(&mut body)? {
                    return Err(DecodeError::TruncatedStream);
                }
                decode_body(tag, &body, self.version).map(Some)
            }
        }
    }
}

impl<R: Read> Iterator for Decoder<R> {
    type Item = Result<Message, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(msg)) => Some(Ok(msg)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

// ---------------------------------------------------------------------
// Byte readers. All integers are big-endian; the 6-byte timestamp is
// zero-extended into a u64.
// ---------------------------------------------------------------------

struct Cursor<'a> {
    buf: &'a [u8],
    off: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, off: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.off + n > self.buf.len() {
            return Err(DecodeError::TruncatedStream);
        }
        let s = &self.buf[self.off..self.off + n];
        self.off += n;
        Ok(s)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn timestamp(&mut self) -> Result<Timestamp, DecodeError> {
        let b = self.take(6)?;
        let mut ext = [0u8; 8];
        ext[2..].copy_from_slice(b);
        Ok(Timestamp(u64::from_be_bytes(ext)))
    }

    fn symbol(&mut self) -> Result<Symbol, DecodeError> {
        Ok(Symbol(self.take(8)?.try_into().unwrap()))
    }

    fn mpid(&mut self) -> Result<Mpid, DecodeError> {
        Ok(Mpid(self.take(4)?.try_into().unwrap()))
    }

    fn price(&mut self) -> Result<Price, DecodeError> {
        Ok(Price(self.u32()?))
    }

    fn side(&mut self) -> Result<Side, DecodeError> {
        Ok(if self.u8()? == b'B' { Side::Bid } else { Side::Ask })
    }

    /// Order-size field on the add/execute family: 2 bytes pre-5.0, 4 bytes
    /// from 5.0 on (§9). Always widened to a `u32` for the in-memory model.
    fn shares(&mut self, version: ItchVersion) -> Result<u32, DecodeError> {
        match version {
            ItchVersion::V41 => Ok(self.u16()? as u32),
            ItchVersion::V50 => self.u32(),
        }
    }
}

fn decode_body(tag: u8, body: &[u8], version: ItchVersion) -> Result<Message, DecodeError> {
    let mut c = Cursor::new(body);
    let msg = match tag {
        t if t == Tag::SYSTEM_EVENT.0 => Message::SystemEvent {
            timestamp: c.timestamp()?,
            event_code: c.u8()?,
        },
        t if t == Tag::STOCK_DIRECTORY.0 => Message::StockDirectory {
            timestamp: c.timestamp()?,
            symbol: c.symbol()?,
            market_category: c.u8()?,
            financial_status: c.u8()?,
            round_lot_size: c.u32()?,
            round_lots_only: c.u8()? != 0,
        },
        t if t == Tag::STOCK_TRADING_ACTION.0 => Message::StockTradingAction {
            timestamp: c.timestamp()?,
            symbol: c.symbol()?,
            trading_state: c.u8()?,
            reason: c.take(4)?.try_into().unwrap(),
        },
        t if t == Tag::REG_SHO_RESTRICTION.0 => Message::RegShoRestriction {
            timestamp: c.timestamp()?,
            symbol: c.symbol()?,
            action: c.u8()?,
        },
        t if t == Tag::MARKET_PARTICIPANT_POSITION.0 => Message::MarketParticipantPosition {
            timestamp: c.timestamp()?,
            mpid: c.mpid()?,
            symbol: c.symbol()?,
            primary_market_maker: c.u8()? != 0,
            market_maker_mode: c.u8()?,
            participant_state: c.u8()?,
        },
        t if t == Tag::MWCB_DECLINE_LEVEL.0 => Message::MwcbDeclineLevel {
            timestamp: c.timestamp()?,
            level1: c.price()?,
            level2: c.price()?,
            level3: c.price()?,
        },
        t if t == Tag::MWCB_STATUS.0 => Message::MwcbStatus {
            timestamp: c.timestamp()?,
            breached_level: c.u8()?,
        },
        t if t == Tag::IPO_QUOTING_PERIOD.0 => Message::IpoQuotingPeriod {
            timestamp: c.timestamp()?,
            symbol: c.symbol()?,
            release_time: c.u32()?,
            release_qualifier: c.u8()?,
            ipo_price: c.price()?,
        },
        t if t == Tag::LULD_AUCTION_COLLAR.0 => Message::LuldAuctionCollar {
            timestamp: c.timestamp()?,
            symbol: c.symbol()?,
            reference_price: c.price()?,
            upper_collar: c.price()?,
            lower_collar: c.price()?,
            extension: c.u8()?,
        },
        t if t == Tag::OPERATIONAL_HALT.0 => Message::OperationalHalt {
            timestamp: c.timestamp()?,
            symbol: c.symbol()?,
            market_code: c.u8()?,
            halt_action: c.u8()?,
        },
        t if t == Tag::ADD_ORDER.0 => Message::AddOrder {
            timestamp: c.timestamp()?,
            order_ref: OrderRef(c.u64()?),
            side: c.side()?,
            shares: c.shares(version)?,
            symbol: c.symbol()?,
            price: c.price()?,
        },
        t if t == Tag::ADD_ORDER_MPID.0 => Message::AddOrderMpid {
            timestamp: c.timestamp()?,
            order_ref: OrderRef(c.u64()?),
            side: c.side()?,
            shares: c.shares(version)?,
            symbol: c.symbol()?,
            price: c.price()?,
            mpid: c.mpid()?,
        },
        t if t == Tag::ORDER_EXECUTED.0 => Message::OrderExecuted {
            timestamp: c.timestamp()?,
            order_ref: OrderRef(c.u64()?),
            executed_shares: c.shares(version)?,
            match_number: MatchNumber(c.u64()?),
        },
        t if t == Tag::ORDER_EXECUTED_WITH_PRICE.0 => Message::OrderExecutedWithPrice {
            timestamp: c.timestamp()?,
            order_ref: OrderRef(c.u64()?),
            executed_shares: c.shares(version)?,
            match_number: MatchNumber(c.u64()?),
            printable: c.u8()? != 0,
            execution_price: c.price()?,
        },
        t if t == Tag::ORDER_CANCEL.0 => Message::OrderCancel {
            timestamp: c.timestamp()?,
            order_ref: OrderRef(c.u64()?),
            cancelled_shares: c.u32()?,
        },
        t if t == Tag::ORDER_DELETE.0 => Message::OrderDelete {
            timestamp: c.timestamp()?,
            order_ref: OrderRef(c.u64()?),
        },
        t if t == Tag::ORDER_REPLACE.0 => Message::OrderReplace {
            timestamp: c.timestamp()?,
            old_order_ref: OrderRef(c.u64()?),
            new_order_ref: OrderRef(c.u64()?),
            new_shares: c.u32()?,
            new_price: c.price()?,
        },
        t if t == Tag::TRADE.0 => Message::Trade {
            timestamp: c.timestamp()?,
            order_ref: OrderRef(c.u64()?),
            side: c.side()?,
            shares: c.u32()?,
            symbol: c.symbol()?,
            price: c.price()?,
            match_number: MatchNumber(c.u64()?),
        },
        t if t == Tag::CROSS_TRADE.0 => Message::CrossTrade {
            timestamp: c.timestamp()?,
            shares: c.u64()?,
            symbol: c.symbol()?,
            cross_price: c.price()?,
            match_number: MatchNumber(c.u64()?),
            cross_type: c.u8()?,
        },
        t if t == Tag::BROKEN_TRADE.0 => Message::BrokenTrade {
            timestamp: c.timestamp()?,
            match_number: MatchNumber(c.u64()?),
        },
        t if t == Tag::NOII.0 => Message::Noii {
            timestamp: c.timestamp()?,
            paired_shares: c.u64()?,
            imbalance_shares: c.u64()?,
            imbalance_direction: c.u8()?,
            symbol: c.symbol()?,
            far_price: c.price()?,
            near_price: c.price()?,
            current_reference_price: c.price()?,
            cross_type: c.u8()?,
            price_variation_indicator: c.u8()?,
        },
        t if t == Tag::RPI.0 => Message::Rpi {
            timestamp: c.timestamp()?,
            symbol: c.symbol()?,
            interest_flag: c.u8()?,
        },
        t if t == Tag::DIRECT_LISTING_CAPITAL_RAISE.0 => Message::DirectListingCapitalRaise {
            timestamp: c.timestamp()?,
            symbol: c.symbol()?,
            open_eligibility_status: c.u8()?,
            min_allowable_price: c.price()?,
            max_allowable_price: c.price()?,
            near_execution_price: c.price()?,
            near_execution_time: c.u64()?,
            lower_price_range_collar: c.price()?,
            upper_price_range_collar: c.price()?,
        },
        other => return Err(DecodeError::UnknownType(other)),
    };
    Ok(msg)
}

/// Interprets a cross type byte for callers that want the typed form; kept
/// separate from decoding because unrecognized codes are venue extensions,
/// not decode errors (§4.1 lists cross type as a plain field).
pub fn cross_type_of(code: Code) -> Option<CrossType> {
    CrossType::from_code(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;

    fn roundtrip(msg: Message) {
        let mut enc = Encoder::new();
        let bytes = enc.encode_unconditionally(&msg);
        let mut dec = Decoder::new(&bytes[..], Framing::LengthPrefixed, ItchVersion::V50);
        let decoded = dec.next().unwrap().unwrap();
        assert_eq!(decoded, msg);
        assert!(dec.next().is_none());
    }

    #[test]
    fn add_order_roundtrips() {
        roundtrip(Message::AddOrder {
            timestamp: Timestamp(1000),
            order_ref: OrderRef(1),
            side: Side::Bid,
            shares: 500,
            symbol: Symbol::from_str_padded("AAPL"),
            price: Price(1_000_000),
        });
    }

    #[test]
    fn order_delete_roundtrips() {
        roundtrip(Message::OrderDelete {
            timestamp: Timestamp(42),
            order_ref: OrderRef(7),
        });
    }

    #[test]
    fn unknown_type_errors() {
        let bytes = [0u8, 3, b'Z', 1, 2];
        let mut dec = Decoder::new(&bytes[..], Framing::LengthPrefixed, ItchVersion::V50);
        match dec.next() {
            Some(Err(DecodeError::UnknownType(b'Z'))) => {}
            other => panic!("expected UnknownType, got {other:?}"),
        }
    }

    #[test]
    fn truncated_stream_errors() {
        let bytes = [0u8, 20, b'A', 1, 2, 3];
        let mut dec = Decoder::new(&bytes[..], Framing::LengthPrefixed, ItchVersion::V50);
        match dec.next() {
            Some(Err(DecodeError::TruncatedStream)) => {}
            other => panic!("expected TruncatedStream, got {other:?}"),
        }
    }

    #[test]
    fn length_mismatch_errors() {
        let mut enc = Encoder::new();
        let bytes = enc.encode_unconditionally(&Message::OrderDelete {
            timestamp: Timestamp(1),
            order_ref: OrderRef(1),
        });
        let mut tampered = bytes.clone();
        tampered[1] += 1; // corrupt the length prefix's low byte
        let mut dec = Decoder::new(&tampered[..], Framing::LengthPrefixed, ItchVersion::V50);
        match dec.next() {
            Some(Err(DecodeError::LengthMismatch { .. })) => {}
            other => panic!("expected LengthMismatch, got {other:?}"),
        }
    }

    #[test]
    fn v41_add_order_has_narrower_shares_field() {
        // Hand-built 4.1 record: tag 'A', 6-byte timestamp, 8-byte order ref,
        // side, a 2-byte share count (not 4), symbol, 4-byte price.
        let mut body = vec![b'A'];
        body.extend_from_slice(&[0, 0, 0, 0, 0, 1]); // timestamp = 1
        body.extend_from_slice(&7u64.to_be_bytes()); // order_ref = 7
        body.push(b'B'); // side
        body.extend_from_slice(&250u16.to_be_bytes()); // shares = 250, 2 bytes
        body.extend_from_slice(b"AAPL    "); // symbol, space-padded
        body.extend_from_slice(&1_000_000u32.to_be_bytes()); // price

        let mut framed = (body.len() as u16).to_be_bytes().to_vec();
        framed.extend_from_slice(&body);

        let mut dec = Decoder::new(&framed[..], Framing::LengthPrefixed, ItchVersion::V41);
        let msg = dec.next().unwrap().unwrap();
        match msg {
            Message::AddOrder { order_ref, shares, .. } => {
                assert_eq!(order_ref, OrderRef(7));
                assert_eq!(shares, 250);
            }
            other => panic!("expected AddOrder, got {other:?}"),
        }
        assert!(dec.next().is_none());
    }

    #[test]
    fn fixed_by_type_framing_has_no_prefix() {
        let msg = Message::OrderCancel {
            timestamp: Timestamp(99),
            order_ref: OrderRef(4),
            cancelled_shares: 10,
        };
        let mut enc = Encoder::new();
        let framed = enc.encode_unconditionally(&msg);
        // strip the 2-byte length prefix to get the fixed-by-type wire form
        let raw = &framed[2..];
        let mut dec = Decoder::new(raw, Framing::FixedByType, ItchVersion::V50);
        assert_eq!(dec.next().unwrap().unwrap(), msg);
    }
}
