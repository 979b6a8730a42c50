//! Single-symbol limit order book.
//!
//! Orders live in a `slab::Slab` arena and are addressed by plain integer
//! handle; each price level is an intrusive doubly-linked FIFO threaded
//! through the arena nodes themselves, so removing from the middle of a
//! level (a partial cancel, an execution) never shifts anyone else. Levels
//! are kept in a `BTreeMap<Price, PriceLevel>` per side — bids iterate in
//! reverse (best bid is the highest price), asks iterate forward (best ask
//! is the lowest).
//!
//! This mirrors the arena-plus-BTreeMap design used for multi-instrument
//! books elsewhere in this codebase, narrowed to one symbol: a `Processor`
//! owns one `OrderBook` per symbol it reconstructs.

use std::collections::BTreeMap;
use std::fmt;

use hashbrown::HashMap;
use slab::Slab;

use crate::message::{OrderRef, Price, Side, Symbol, Timestamp, Volume};

pub type Handle = usize;

#[derive(Debug, Clone)]
struct OrderNode {
    order_ref: OrderRef,
    side: Side,
    price: Price,
    shares: Volume,
    prev: Option<Handle>,
    next: Option<Handle>,
}

#[derive(Debug, Default)]
struct PriceLevel {
    head: Option<Handle>,
    tail: Option<Handle>,
    total_shares: u64,
    count: usize,
}

impl PriceLevel {
    fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[derive(Debug)]
pub enum BookError {
    /// An `AddOrder`/`AddOrderMpid` referred to an order reference already
    /// resident in the book.
    DuplicateRef(OrderRef),
    /// An order-keyed message referred to a reference not in the book.
    UnknownRef(OrderRef),
    /// An execution or cancel reduced more shares than the order had left.
    OverExecuted {
        order_ref: OrderRef,
        requested: Volume,
        available: Volume,
    },
    OverCancelled {
        order_ref: OrderRef,
        requested: Volume,
        available: Volume,
    },
}

impl fmt::Display for BookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookError::DuplicateRef(r) => write!(f, "order reference {} already exists", r.0),
            BookError::UnknownRef(r) => write!(f, "order reference {} is not resident", r.0),
            BookError::OverExecuted { order_ref, requested, available } => write!(
                f,
                "order {} executed for {} shares but only {} were resting",
                order_ref.0, requested, available
            ),
            BookError::OverCancelled { order_ref, requested, available } => write!(
                f,
                "order {} cancelled for {} shares but only {} were resting",
                order_ref.0, requested, available
            ),
        }
    }
}

impl std::error::Error for BookError {}

/// A single order's resting detail, for level-detail walks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetail {
    pub order_ref: OrderRef,
    pub shares: Volume,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSnapshot {
    pub price: Price,
    pub total_shares: u64,
    pub order_count: usize,
    pub detail: Option<Vec<OrderDetail>>,
}

/// A full two-sided view of the book at some instant, used both for ad hoc
/// queries and for scheduled-snapshot delivery to handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSnapshot {
    pub symbol: Symbol,
    pub as_of: Timestamp,
    pub bids: Vec<LevelSnapshot>,
    pub asks: Vec<LevelSnapshot>,
}

/// Reconstructed two-sided book for one symbol as of the last message
/// applied to it.
pub struct OrderBook {
    symbol: Symbol,
    book_date: Option<Timestamp>,
    arena: Slab<OrderNode>,
    index: HashMap<OrderRef, Handle>,
    bids: BTreeMap<Price, PriceLevel>,
    asks: BTreeMap<Price, PriceLevel>,
}

impl OrderBook {
    pub fn new(symbol: Symbol) -> Self {
        OrderBook {
            symbol,
            book_date: None,
            arena: Slab::new(),
            index: HashMap::new(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }

    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    pub fn book_date(&self) -> Option<Timestamp> {
        self.book_date
    }

    pub fn set_book_date(&mut self, ts: Timestamp) {
        if self.book_date.is_none() {
            self.book_date = Some(ts);
        }
    }

    fn side_map(&mut self, side: Side) -> &mut BTreeMap<Price, PriceLevel> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    fn push_back(level: &mut PriceLevel, arena: &mut Slab<OrderNode>, handle: Handle) {
        arena[handle].prev = level.tail;
        arena[handle].next = None;
        if let Some(tail) = level.tail {
            arena[tail].next = Some(handle);
        } else {
            level.head = Some(handle);
        }
        level.tail = Some(handle);
        level.count += 1;
        level.total_shares += arena[handle].shares as u64;
    }

    fn unlink(level: &mut PriceLevel, arena: &mut Slab<OrderNode>, handle: Handle) {
        let (prev, next) = (arena[handle].prev, arena[handle].next);
        match prev {
            Some(p) => arena[p].next = next,
            None => level.head = next,
        }
        match next {
            Some(n) => arena[n].prev = prev,
            None => level.tail = prev,
        }
        level.count -= 1;
        level.total_shares -= arena[handle].shares as u64;
    }

    /// Inserts a new resting order. Errors if `order_ref` is already
    /// resident.
    pub fn add_order(
        &mut self,
        order_ref: OrderRef,
        side: Side,
        price: Price,
        shares: Volume,
    ) -> Result<(), BookError> {
        if self.index.contains_key(&order_ref) {
            return Err(BookError::DuplicateRef(order_ref));
        }
        let handle = self.arena.insert(OrderNode {
            order_ref,
            side,
            price,
            shares,
            prev: None,
            next: None,
        });
        self.index.insert(order_ref, handle);
        let arena = &mut self.arena;
        let level = self.side_map(side).entry(price).or_default();
        Self::push_back(level, arena, handle);
        Ok(())
    }

    fn locate(&self, order_ref: OrderRef) -> Result<Handle, BookError> {
        self.index
            .get(&order_ref)
            .copied()
            .ok_or(BookError::UnknownRef(order_ref))
    }

    fn remove_level_if_empty(&mut self, side: Side, price: Price) {
        let map = self.side_map(side);
        if map.get(&price).is_some_and(PriceLevel::is_empty) {
            map.remove(&price);
        }
    }

    /// Reduces an order's resting quantity by `shares` (an execution,
    /// printed or not). Errors if the order is unknown or over-executed.
    pub fn execute(&mut self, order_ref: OrderRef, shares: Volume) -> Result<(), BookError> {
        let handle = self.locate(order_ref)?;
        let (side, price, available) = {
            let node = &self.arena[handle];
            (node.side, node.price, node.shares)
        };
        if shares > available {
            return Err(BookError::OverExecuted {
                order_ref,
                requested: shares,
                available,
            });
        }
        self.arena[handle].shares -= shares;
        let remaining = self.arena[handle].shares;
        {
            let level = self.side_map(side).get_mut(&price).expect("level for resident order");
            level.total_shares -= shares as u64;
        }
        if remaining == 0 {
            let level = self.side_map(side).get_mut(&price).expect("level for resident order");
            let arena = &mut self.arena;
            Self::unlink(level, arena, handle);
            self.arena.remove(handle);
            self.index.remove(&order_ref);
            self.remove_level_if_empty(side, price);
        }
        Ok(())
    }

    /// As `execute`, for an execution that carries its own print price
    /// (`OrderExecutedWithPrice`). The print price and printability never
    /// alter the resting order's own price, so this is a thin pass-through
    /// that exists to give the printed-execution case its own named entry
    /// point; callers that want the print price/flag/match number for
    /// reporting hold onto them separately (`Processor` carries them on
    /// `ExecuteEvent`).
    pub fn execute_with_price(
        &mut self,
        order_ref: OrderRef,
        shares: Volume,
        _printable: bool,
        _price: Price,
        _match_number: crate::message::MatchNumber,
    ) -> Result<(), BookError> {
        self.execute(order_ref, shares)
    }

    /// Reduces an order's resting quantity without fully consuming it
    /// (a cancel). Errors if the order is unknown or over-cancelled.
    pub fn cancel(&mut self, order_ref: OrderRef, shares: Volume) -> Result<(), BookError> {
        let handle = self.locate(order_ref)?;
        let available = self.arena[handle].shares;
        if shares > available {
            return Err(BookError::OverCancelled {
                order_ref,
                requested: shares,
                available,
            });
        }
        self.arena[handle].shares -= shares;
        let (side, price) = (self.arena[handle].side, self.arena[handle].price);
        let level = self.side_map(side).get_mut(&price).expect("level for resident order");
        level.total_shares -= shares as u64;
        if self.arena[handle].shares == 0 {
            let arena = &mut self.arena;
            Self::unlink(level, arena, handle);
            self.arena.remove(handle);
            self.index.remove(&order_ref);
            self.remove_level_if_empty(side, price);
        }
        Ok(())
    }

    /// Removes an order entirely, regardless of remaining quantity. Errors
    /// if the order is unknown.
    pub fn delete(&mut self, order_ref: OrderRef) -> Result<(), BookError> {
        let handle = self.locate(order_ref)?;
        let (side, price) = (self.arena[handle].side, self.arena[handle].price);
        {
            let level = self.side_map(side).get_mut(&price).expect("level for resident order");
            let arena = &mut self.arena;
            Self::unlink(level, arena, handle);
        }
        self.arena.remove(handle);
        self.index.remove(&order_ref);
        self.remove_level_if_empty(side, price);
        Ok(())
    }

    /// Deletes `old_ref` and inserts `new_ref` at the new price/quantity,
    /// joining the back of its new level's FIFO queue — a replace loses
    /// its old place in time regardless of price.
    pub fn replace(
        &mut self,
        old_ref: OrderRef,
        new_ref: OrderRef,
        new_price: Price,
        new_shares: Volume,
    ) -> Result<(), BookError> {
        let handle = self.locate(old_ref)?;
        let side = self.arena[handle].side;
        self.delete(old_ref)?;
        self.add_order(new_ref, side, new_price, new_shares)
    }

    pub fn contains(&self, order_ref: OrderRef) -> bool {
        self.index.contains_key(&order_ref)
    }

    pub fn order_shares(&self, order_ref: OrderRef) -> Option<Volume> {
        self.index.get(&order_ref).map(|&h| self.arena[h].shares)
    }

    /// Best bid and best ask, if resting on either side.
    pub fn bbo(&self) -> (Option<LevelSnapshot>, Option<LevelSnapshot>) {
        let bid = self.bids.iter().next_back().map(|(p, l)| LevelSnapshot {
            price: *p,
            total_shares: l.total_shares,
            order_count: l.count,
            detail: None,
        });
        let ask = self.asks.iter().next().map(|(p, l)| LevelSnapshot {
            price: *p,
            total_shares: l.total_shares,
            order_count: l.count,
            detail: None,
        });
        (bid, ask)
    }

    /// The top `n` levels of `side`, best price first.
    pub fn top_n(&self, side: Side, n: usize) -> Vec<LevelSnapshot> {
        let to_snapshot = |(p, l): (&Price, &PriceLevel)| LevelSnapshot {
            price: *p,
            total_shares: l.total_shares,
            order_count: l.count,
            detail: None,
        };
        match side {
            Side::Bid => self.bids.iter().rev().take(n).map(to_snapshot).collect(),
            Side::Ask => self.asks.iter().take(n).map(to_snapshot).collect(),
        }
    }

    fn side_snapshot(&self, side: Side, max_depth: Option<usize>, with_detail: bool) -> Vec<LevelSnapshot> {
        let map = match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        };
        let levels: Box<dyn Iterator<Item = (&Price, &PriceLevel)>> = match side {
            Side::Bid => Box::new(map.iter().rev()),
            Side::Ask => Box::new(map.iter()),
        };
        let take = max_depth.unwrap_or(usize::MAX);
        levels
            .take(take)
            .map(|(p, l)| LevelSnapshot {
                price: *p,
                total_shares: l.total_shares,
                order_count: l.count,
                detail: with_detail.then(|| self.level_detail(side, *p)),
            })
            .collect()
    }

    /// A full two-sided snapshot, up to `max_depth` levels per side (`None`
    /// for the whole book), optionally including per-order detail.
    pub fn snapshot(&self, as_of: Timestamp, max_depth: Option<usize>, with_detail: bool) -> BookSnapshot {
        BookSnapshot {
            symbol: self.symbol,
            as_of,
            bids: self.side_snapshot(Side::Bid, max_depth, with_detail),
            asks: self.side_snapshot(Side::Ask, max_depth, with_detail),
        }
    }

    /// Resting orders at `price` on `side`, in FIFO (time priority) order.
    pub fn level_detail(&self, side: Side, price: Price) -> Vec<OrderDetail> {
        let map = match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        };
        let Some(level) = map.get(&price) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(level.count);
        let mut cur = level.head;
        while let Some(h) = cur {
            let node = &self.arena[h];
            out.push(OrderDetail {
                order_ref: node.order_ref,
                shares: node.shares,
            });
            cur = node.next;
        }
        out
    }

    pub fn order_count(&self) -> usize {
        self.index.len()
    }
}
