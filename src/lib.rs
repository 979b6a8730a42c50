//! ITCH 5.0 limit order book reconstruction: decode a venue feed, replay it
//! through a per-symbol [`processor::Processor`], and query or observe the
//! resulting [`orderbook::OrderBook`] through [`handler::Handler`]s.
//!
//! ```
//! use itch_orderbook::config::DecoderConfig;
//! use itch_orderbook::decoder::Decoder;
//! use itch_orderbook::encoder::Encoder;
//! use itch_orderbook::handler::Handler;
//! use itch_orderbook::message::{Message, OrderRef, Price, Side, Symbol, Timestamp};
//! use itch_orderbook::processor::Processor;
//!
//! struct NullHandler;
//! impl Handler for NullHandler {}
//!
//! let _ = env_logger::try_init();
//!
//! let mut enc = Encoder::new();
//! let bytes = enc.encode_unconditionally(&Message::AddOrder {
//!     timestamp: Timestamp(1),
//!     order_ref: OrderRef(1),
//!     side: Side::Bid,
//!     shares: 100,
//!     symbol: Symbol::from_str_padded("AAPL"),
//!     price: Price(100_0000),
//! });
//!
//! let cfg = DecoderConfig::default();
//! let decoder = Decoder::from_config(&bytes[..], cfg);
//! let mut processor: Processor<NullHandler> = Processor::new(Symbol::from_str_padded("AAPL"));
//! for msg in decoder {
//!     processor.on_message(&msg.unwrap()).unwrap();
//! }
//! assert_eq!(processor.book().order_count(), 1);
//! ```

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod handler;
pub mod message;
pub mod orderbook;
pub mod processor;
