//! Property tests over arbitrary valid operation sequences (§8 universal
//! invariants), using randomly generated adds/executes/cancels/deletes
//! against a single book.

use proptest::prelude::*;

use itch_orderbook::message::{OrderRef, Price, Side, Symbol, Volume};
use itch_orderbook::orderbook::OrderBook;

fn aapl() -> Symbol {
    Symbol::from_str_padded("AAPL")
}

#[derive(Debug, Clone)]
enum Op {
    Add { order_ref: u64, side: Side, price: u32, shares: Volume },
    Reduce { order_ref: u64, shares: Volume, full: bool },
}

fn side_strategy() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Bid), Just(Side::Ask)]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..20, side_strategy(), 1u32..10, 1u32..1000).prop_map(
            |(order_ref, side, price, shares)| Op::Add { order_ref, side, price, shares }
        ),
        (1u64..20, 1u32..1000, any::<bool>())
            .prop_map(|(order_ref, shares, full)| Op::Reduce { order_ref, shares, full }),
    ]
}

proptest! {
    /// Add/execute/cancel sequences never leave an over-drawn order resting,
    /// and every order the book still reports is genuinely present in its
    /// level's FIFO queue.
    #[test]
    fn book_stays_internally_consistent(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let mut book = OrderBook::new(aapl());
        let mut live: std::collections::HashMap<u64, (Side, u32, Volume)> = std::collections::HashMap::new();

        for op in ops {
            match op {
                Op::Add { order_ref, side, price, shares } => {
                    let order_ref = OrderRef(order_ref);
                    let result = book.add_order(order_ref, side, Price(price), shares);
                    if live.contains_key(&order_ref.0) {
                        prop_assert!(result.is_err());
                    } else {
                        prop_assert!(result.is_ok());
                        live.insert(order_ref.0, (side, price, shares));
                    }
                }
                Op::Reduce { order_ref, shares, full } => {
                    let order_ref_ty = OrderRef(order_ref);
                    match live.get(&order_ref).copied() {
                        None => {
                            prop_assert!(book.execute(order_ref_ty, shares).is_err());
                        }
                        Some((_, _, available)) => {
                            let reduce_by = shares.min(available);
                            if full {
                                book.execute(order_ref_ty, reduce_by).unwrap();
                            } else {
                                book.cancel(order_ref_ty, reduce_by).unwrap();
                            }
                            let remaining = available - reduce_by;
                            if remaining == 0 {
                                live.remove(&order_ref);
                                prop_assert!(!book.contains(order_ref_ty));
                            } else {
                                live.get_mut(&order_ref).unwrap().2 = remaining;
                                prop_assert_eq!(book.order_shares(order_ref_ty), Some(remaining));
                            }
                        }
                    }
                }
            }
        }

        // invariant: every order the model still considers live is
        // resident, with the exact remaining volume, and vice versa.
        prop_assert_eq!(book.order_count(), live.len());
        for (&order_ref, &(_, _, shares)) in &live {
            prop_assert_eq!(book.order_shares(OrderRef(order_ref)), Some(shares));
        }
    }

    /// Deleting every live order after an arbitrary add/reduce sequence
    /// always leaves the book and its index empty.
    #[test]
    fn deleting_every_live_order_empties_the_book(ops in prop::collection::vec(op_strategy(), 0..100)) {
        let mut book = OrderBook::new(aapl());
        let mut live: std::collections::HashSet<u64> = std::collections::HashSet::new();

        for op in ops {
            match op {
                Op::Add { order_ref, side, price, shares } => {
                    if book.add_order(OrderRef(order_ref), side, Price(price), shares).is_ok() {
                        live.insert(order_ref);
                    }
                }
                Op::Reduce { order_ref, shares, full } => {
                    if let Some(available) = book.order_shares(OrderRef(order_ref)) {
                        let reduce_by = shares.min(available);
                        if full {
                            let _ = book.execute(OrderRef(order_ref), reduce_by);
                        } else {
                            let _ = book.cancel(OrderRef(order_ref), reduce_by);
                        }
                        if !book.contains(OrderRef(order_ref)) {
                            live.remove(&order_ref);
                        }
                    }
                }
            }
        }

        for order_ref in live.iter().copied().collect::<Vec<_>>() {
            book.delete(OrderRef(order_ref)).unwrap();
        }

        prop_assert_eq!(book.order_count(), 0);
        prop_assert!(book.bbo().0.is_none());
        prop_assert!(book.bbo().1.is_none());
    }
}

#[test]
fn replace_is_observationally_delete_then_add() {
    let mut replaced_via_op = OrderBook::new(aapl());
    replaced_via_op.add_order(OrderRef(1), Side::Bid, Price(10), 100).unwrap();
    replaced_via_op.replace(OrderRef(1), OrderRef(2), Price(20), 50).unwrap();

    let mut manual = OrderBook::new(aapl());
    manual.add_order(OrderRef(1), Side::Bid, Price(10), 100).unwrap();
    manual.delete(OrderRef(1)).unwrap();
    manual.add_order(OrderRef(2), Side::Bid, Price(20), 50).unwrap();

    assert_eq!(replaced_via_op.contains(OrderRef(1)), manual.contains(OrderRef(1)));
    assert_eq!(replaced_via_op.contains(OrderRef(2)), manual.contains(OrderRef(2)));
    assert_eq!(replaced_via_op.order_shares(OrderRef(2)), manual.order_shares(OrderRef(2)));
}

#[test]
fn full_depth_snapshot_is_ordered_best_price_first() {
    let mut book = OrderBook::new(aapl());
    book.add_order(OrderRef(1), Side::Bid, Price(10), 10).unwrap();
    book.add_order(OrderRef(2), Side::Bid, Price(30), 10).unwrap();
    book.add_order(OrderRef(3), Side::Bid, Price(20), 10).unwrap();
    book.add_order(OrderRef(4), Side::Ask, Price(50), 10).unwrap();
    book.add_order(OrderRef(5), Side::Ask, Price(40), 10).unwrap();

    let snap = book.snapshot(itch_orderbook::message::Timestamp(0), None, false);
    let bid_prices: Vec<u32> = snap.bids.iter().map(|l| l.price.raw()).collect();
    let ask_prices: Vec<u32> = snap.asks.iter().map(|l| l.price.raw()).collect();
    assert_eq!(bid_prices, vec![30, 20, 10]);
    assert_eq!(ask_prices, vec![40, 50]);
}
