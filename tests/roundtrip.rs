//! decode(encode(m)) == m for one representative of every message kind, and
//! encode(decode(b)) == b for a length-prefixed byte stream.

use itch_orderbook::decoder::{Decoder, Framing, ItchVersion};
use itch_orderbook::encoder::Encoder;
use itch_orderbook::message::{
    CrossType, MatchNumber, Message, Mpid, OrderRef, Price, Side, Symbol, Timestamp,
};

fn symbol(s: &str) -> Symbol {
    Symbol::from_str_padded(s)
}

fn decode_one(bytes: &[u8]) -> Message {
    let mut decoder = Decoder::new(bytes, Framing::LengthPrefixed, ItchVersion::V50);
    decoder.next().unwrap().unwrap()
}

fn representatives() -> Vec<Message> {
    vec![
        Message::SystemEvent { timestamp: Timestamp(1), event_code: b'O' },
        Message::StockDirectory {
            timestamp: Timestamp(1),
            symbol: symbol("AAPL"),
            market_category: b'Q',
            financial_status: b'N',
            round_lot_size: 100,
            round_lots_only: false,
        },
        Message::StockTradingAction {
            timestamp: Timestamp(1),
            symbol: symbol("AAPL"),
            trading_state: b'T',
            reason: *b"RSON",
        },
        Message::RegShoRestriction { timestamp: Timestamp(1), symbol: symbol("AAPL"), action: b'0' },
        Message::MarketParticipantPosition {
            timestamp: Timestamp(1),
            mpid: Mpid(*b"ABCD"),
            symbol: symbol("AAPL"),
            primary_market_maker: true,
            market_maker_mode: b'N',
            participant_state: b'A',
        },
        Message::MwcbDeclineLevel {
            timestamp: Timestamp(1),
            level1: Price(1),
            level2: Price(2),
            level3: Price(3),
        },
        Message::MwcbStatus { timestamp: Timestamp(1), breached_level: 1 },
        Message::IpoQuotingPeriod {
            timestamp: Timestamp(1),
            symbol: symbol("AAPL"),
            release_time: 1000,
            release_qualifier: b'A',
            ipo_price: Price(100_0000),
        },
        Message::LuldAuctionCollar {
            timestamp: Timestamp(1),
            symbol: symbol("AAPL"),
            reference_price: Price(100_0000),
            upper_collar: Price(110_0000),
            lower_collar: Price(90_0000),
            extension: 0,
        },
        Message::OperationalHalt {
            timestamp: Timestamp(1),
            symbol: symbol("AAPL"),
            market_code: b'Q',
            halt_action: b'H',
        },
        Message::AddOrder {
            timestamp: Timestamp(1),
            order_ref: OrderRef(1),
            side: Side::Bid,
            shares: 100,
            symbol: symbol("AAPL"),
            price: Price(1),
        },
        Message::AddOrderMpid {
            timestamp: Timestamp(1),
            order_ref: OrderRef(1),
            side: Side::Ask,
            shares: 100,
            symbol: symbol("AAPL"),
            price: Price(1),
            mpid: Mpid(*b"ABCD"),
        },
        Message::OrderExecuted {
            timestamp: Timestamp(1),
            order_ref: OrderRef(1),
            executed_shares: 10,
            match_number: MatchNumber(1),
        },
        Message::OrderExecutedWithPrice {
            timestamp: Timestamp(1),
            order_ref: OrderRef(1),
            executed_shares: 10,
            match_number: MatchNumber(1),
            printable: true,
            execution_price: Price(2),
        },
        Message::OrderCancel { timestamp: Timestamp(1), order_ref: OrderRef(1), cancelled_shares: 5 },
        Message::OrderDelete { timestamp: Timestamp(1), order_ref: OrderRef(1) },
        Message::OrderReplace {
            timestamp: Timestamp(1),
            old_order_ref: OrderRef(1),
            new_order_ref: OrderRef(2),
            new_shares: 50,
            new_price: Price(3),
        },
        Message::Trade {
            timestamp: Timestamp(1),
            order_ref: OrderRef(0),
            side: Side::Bid,
            shares: 10,
            symbol: symbol("AAPL"),
            price: Price(1),
            match_number: MatchNumber(9),
        },
        Message::CrossTrade {
            timestamp: Timestamp(1),
            shares: 1000,
            symbol: symbol("AAPL"),
            cross_price: Price(1),
            match_number: MatchNumber(1),
            cross_type: CrossType::Opening.code(),
        },
        Message::BrokenTrade { timestamp: Timestamp(1), match_number: MatchNumber(1) },
        Message::Noii {
            timestamp: Timestamp(1),
            paired_shares: 1,
            imbalance_shares: 2,
            imbalance_direction: b'B',
            symbol: symbol("AAPL"),
            far_price: Price(1),
            near_price: Price(2),
            current_reference_price: Price(3),
            cross_type: CrossType::Closing.code(),
            price_variation_indicator: b'L',
        },
        Message::Rpi { timestamp: Timestamp(1), symbol: symbol("AAPL"), interest_flag: b'B' },
        Message::DirectListingCapitalRaise {
            timestamp: Timestamp(1),
            symbol: symbol("AAPL"),
            open_eligibility_status: b'1',
            min_allowable_price: Price(1),
            max_allowable_price: Price(2),
            near_execution_price: Price(3),
            near_execution_time: 1000,
            lower_price_range_collar: Price(4),
            upper_price_range_collar: Price(5),
        },
    ]
}

#[test]
fn every_message_kind_roundtrips_through_decode_of_encode() {
    let mut encoder = Encoder::new();
    for msg in representatives() {
        let bytes = encoder.encode_unconditionally(&msg);
        let decoded = decode_one(&bytes);
        assert_eq!(decoded, msg, "roundtrip mismatch for tag {:?}", msg.tag());
    }
}

#[test]
fn encode_of_decode_reproduces_original_bytes() {
    let mut encoder = Encoder::new();
    for msg in representatives() {
        let original = encoder.encode_unconditionally(&msg);
        let decoded = decode_one(&original);
        let reencoded = encoder.encode_unconditionally(&decoded);
        assert_eq!(original, reencoded, "re-encode mismatch for tag {:?}", msg.tag());
    }
}
