use std::collections::BTreeSet;

use nhd_schemas::{ActivePosition, ClosedTradeRecord, FinalStatus, PendingOrder};
use uuid::Uuid;

/// Reason stamped on records synthesized for orders that vanished unfilled.
pub const CANCELLED_REASON: &str = "Cancelled / Expired";

/// Lifecycle identity of a derived position or order.
///
/// Ticketless entries fall back to `(symbol, layer)`. That is an approximation:
/// when an earlier ticketless layer disappears the later ones renumber, so the
/// record may name the wrong layer, though the count of transitions is right.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identity {
    Ticket { symbol: String, ticket: u64 },
    Slot { symbol: String, layer: Option<u32> },
}

impl Identity {
    pub fn of_position(p: &ActivePosition) -> Self {
        match p.ticket {
            Some(ticket) => Identity::Ticket {
                symbol: p.symbol.clone(),
                ticket,
            },
            None => Identity::Slot {
                symbol: p.symbol.clone(),
                layer: Some(p.layer),
            },
        }
    }

    pub fn of_order(o: &PendingOrder) -> Self {
        match o.ticket {
            Some(ticket) => Identity::Ticket {
                symbol: o.symbol.clone(),
                ticket,
            },
            None => Identity::Slot {
                symbol: o.symbol.clone(),
                layer: o.layer,
            },
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Identity::Ticket { symbol, .. } | Identity::Slot { symbol, .. } => symbol,
        }
    }
}

/// Tick-level inputs the detector stamps onto the records it creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionContext {
    pub closed_at_ms: i64,
    /// Display time for cancelled records.
    pub time: String,
}

/// Diff the previous derived collections against the current ones.
///
/// Returns closed positions (FILLED) followed by cancelled orders (CANCELLED).
/// Every previous item is examined exactly once and each identity yields at
/// most one record. Callers must only invoke this while the feed is live.
pub fn detect_transitions(
    prev_active: &[ActivePosition],
    prev_pending: &[PendingOrder],
    curr_active: &[ActivePosition],
    curr_pending: &[PendingOrder],
    ctx: &TransitionContext,
) -> Vec<ClosedTradeRecord> {
    let mut seen: BTreeSet<Identity> = BTreeSet::new();
    let mut out = Vec::new();

    for p in prev_active {
        if position_survives(p, curr_active) || !seen.insert(Identity::of_position(p)) {
            continue;
        }
        out.push(closed_record(p, ctx));
    }

    for o in prev_pending {
        if order_survives(o, curr_pending, curr_active) || !seen.insert(Identity::of_order(o)) {
            continue;
        }
        out.push(cancelled_record(o, ctx));
    }

    out
}

fn position_survives(p: &ActivePosition, curr_active: &[ActivePosition]) -> bool {
    match p.ticket {
        Some(t) => curr_active.iter().any(|c| c.ticket == Some(t)),
        None => curr_active
            .iter()
            .any(|c| c.symbol == p.symbol && c.layer == p.layer),
    }
}

/// An order survives if it is still resting or has moved to the active side.
fn order_survives(
    o: &PendingOrder,
    curr_pending: &[PendingOrder],
    curr_active: &[ActivePosition],
) -> bool {
    match o.ticket {
        // A ticketed order is only ever matched by its own ticket.
        Some(t) => {
            curr_pending.iter().any(|c| c.ticket == Some(t))
                || curr_active.iter().any(|c| c.ticket == Some(t))
        }
        None => {
            let still_resting = curr_pending.iter().any(|c| {
                c.symbol == o.symbol
                    && (o.is_watchlist_lock() || (c.ticket.is_none() && c.layer == o.layer))
            });
            still_resting || curr_active.iter().any(|c| c.symbol == o.symbol)
        }
    }
}

fn closed_record(p: &ActivePosition, ctx: &TransitionContext) -> ClosedTradeRecord {
    let mut rec = ClosedTradeRecord {
        id: Uuid::nil(),
        symbol: p.symbol.clone(),
        bias: p.bias,
        entry_price: p.entry_price,
        pnl: p.pnl,
        layer: p.layer,
        reason: p.reason.clone(),
        time: p.time.clone(),
        status: Some(p.status),
        ticket: p.ticket,
        volume: p.volume,
        final_status: FinalStatus::Filled,
        closed_at_ms: ctx.closed_at_ms,
    };
    rec.ensure_id();
    rec
}

fn cancelled_record(o: &PendingOrder, ctx: &TransitionContext) -> ClosedTradeRecord {
    let mut rec = ClosedTradeRecord {
        id: Uuid::nil(),
        symbol: o.symbol.clone(),
        bias: o.bias,
        entry_price: o.limit_price.unwrap_or(o.current_price),
        pnl: 0.0,
        layer: 0,
        reason: CANCELLED_REASON.to_string(),
        time: ctx.time.clone(),
        status: None,
        ticket: o.ticket,
        volume: o.volume,
        final_status: FinalStatus::Cancelled,
        closed_at_ms: ctx.closed_at_ms,
    };
    rec.ensure_id();
    rec
}
