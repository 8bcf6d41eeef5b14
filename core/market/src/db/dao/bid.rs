use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::db::dao::request::{mark_bidding, update_state_if};
use crate::db::model::{
    ActorId, Bid, BidId, BidState, RequestId, RequestState, UrgentRequest, BIDDABLE_STATES,
};
use crate::db::schema::market_bid::dsl;
use crate::db::schema::market_request::dsl as dsl_request;
use crate::db::{ConnType, DbError, DbResult};
use urgent_persistence::executor::{do_with_transaction, readonly_transaction, AsDao, PoolType};

#[derive(thiserror::Error, Debug)]
pub enum SaveBidError {
    #[error("Request [{0}] not found.")]
    RequestNotFound(RequestId),
    #[error("Request [{id}] no longer accepts bids (state {state}).")]
    RequestClosed { id: RequestId, state: RequestState },
    #[error("Provider [{provider_id}] already has bid [{bid_id}] on request [{request_id}].")]
    AlreadyBid {
        provider_id: ActorId,
        bid_id: BidId,
        request_id: RequestId,
    },
    #[error("Failed to save bid. Error: {0}.")]
    Internal(DbError),
}

impl<ErrorType: Into<DbError>> From<ErrorType> for SaveBidError {
    fn from(err: ErrorType) -> Self {
        SaveBidError::Internal(err.into())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum BidStateError {
    #[error("Bid [{0}] not found.")]
    NotFound(BidId),
    #[error("Can't transition bid [{id}] from state {from} to {to}.")]
    InvalidTransition {
        id: BidId,
        from: BidState,
        to: BidState,
    },
    #[error("Actor [{caller}] can't modify bid [{id}].")]
    Ownership { id: BidId, caller: ActorId },
    #[error("Bid database error: {0}.")]
    Db(DbError),
}

impl<ErrorType: Into<DbError>> From<ErrorType> for BidStateError {
    fn from(err: ErrorType) -> Self {
        BidStateError::Db(err.into())
    }
}

pub struct BidDao<'c> {
    pool: &'c PoolType,
}

impl<'c> AsDao<'c> for BidDao<'c> {
    fn as_dao(pool: &'c PoolType) -> Self {
        Self { pool }
    }
}

impl<'c> BidDao<'c> {
    /// Inserts a pending bid, flipping the request `Open` -> `Bidding` in the
    /// same transaction. Re-checks the request deadline first, so a bid
    /// landing after expiry fails even before the sweeper noticed.
    pub async fn submit(&self, bid: Bid, now: NaiveDateTime) -> Result<Bid, SaveBidError> {
        do_with_transaction(self.pool, move |conn| {
            let request: UrgentRequest = dsl_request::market_request
                .filter(dsl_request::id.eq(&bid.request_id))
                .first(conn)
                .optional()?
                .ok_or_else(|| SaveBidError::RequestNotFound(bid.request_id.clone()))?;

            if request.state.accepts_bids() && request.expires_at < now {
                update_state_if(conn, &request.id, RequestState::Expired, &BIDDABLE_STATES)?;
                reject_pending_bids(conn, &request.id, None)?;
                return Err(SaveBidError::RequestClosed {
                    id: request.id,
                    state: RequestState::Expired,
                });
            }
            if !request.state.accepts_bids() {
                return Err(SaveBidError::RequestClosed {
                    id: request.id,
                    state: request.state,
                });
            }

            // One live bid per provider per request; a withdrawn bid frees the slot.
            let existing: Option<BidId> = dsl::market_bid
                .filter(dsl::request_id.eq(&bid.request_id))
                .filter(dsl::provider_id.eq(&bid.provider_id))
                .filter(dsl::state.ne(BidState::Withdrawn))
                .select(dsl::id)
                .first(conn)
                .optional()?;
            if let Some(bid_id) = existing {
                return Err(SaveBidError::AlreadyBid {
                    provider_id: bid.provider_id.clone(),
                    bid_id,
                    request_id: bid.request_id.clone(),
                });
            }

            diesel::insert_into(dsl::market_bid)
                .values(&bid)
                .execute(conn)?;
            mark_bidding(conn, &bid.request_id)?;
            Ok(bid)
        })
        .await
    }

    pub async fn select(&self, id: &BidId) -> DbResult<Option<Bid>> {
        let id = id.clone();
        readonly_transaction(self.pool, move |conn| {
            Ok(dsl::market_bid
                .filter(dsl::id.eq(id))
                .first(conn)
                .optional()?)
        })
        .await
    }

    /// Bids visible to the requestor, oldest first. Withdrawn bids are
    /// hidden, rejected ones stay visible for the record.
    pub async fn list_for_request(&self, request_id: &RequestId) -> DbResult<Vec<Bid>> {
        let request_id = request_id.clone();
        readonly_transaction(self.pool, move |conn| {
            Ok(dsl::market_bid
                .filter(dsl::request_id.eq(request_id))
                .filter(dsl::state.ne(BidState::Withdrawn))
                .order(dsl::submitted_at.asc())
                .load(conn)?)
        })
        .await
    }

    pub async fn list_by_provider(&self, provider_id: ActorId) -> DbResult<Vec<Bid>> {
        readonly_transaction(self.pool, move |conn| {
            Ok(dsl::market_bid
                .filter(dsl::provider_id.eq(provider_id))
                .order(dsl::submitted_at.desc())
                .load(conn)?)
        })
        .await
    }

    /// Requestor declines a single bid without touching the request state.
    pub async fn reject(&self, id: &BidId, caller: &ActorId) -> Result<Bid, BidStateError> {
        let id = id.clone();
        let caller = caller.clone();
        do_with_transaction(self.pool, move |conn| {
            let bid: Bid = dsl::market_bid
                .filter(dsl::id.eq(&id))
                .first(conn)
                .optional()?
                .ok_or_else(|| BidStateError::NotFound(id.clone()))?;

            let requestor_id: ActorId = dsl_request::market_request
                .filter(dsl_request::id.eq(&bid.request_id))
                .select(dsl_request::requestor_id)
                .first(conn)?;
            if requestor_id != caller {
                return Err(BidStateError::Ownership {
                    id: id.clone(),
                    caller,
                });
            }

            update_bid_state(conn, &id, BidState::Rejected, bid.state)?;
            Ok(Bid {
                state: BidState::Rejected,
                ..bid
            })
        })
        .await
    }

    /// Provider retracts their own pending bid. The request stays in
    /// `Bidding` even when this was the last live bid.
    pub async fn withdraw(&self, id: &BidId, caller: &ActorId) -> Result<Bid, BidStateError> {
        let id = id.clone();
        let caller = caller.clone();
        do_with_transaction(self.pool, move |conn| {
            let bid: Bid = dsl::market_bid
                .filter(dsl::id.eq(&id))
                .first(conn)
                .optional()?
                .ok_or_else(|| BidStateError::NotFound(id.clone()))?;

            if bid.provider_id != caller {
                return Err(BidStateError::Ownership {
                    id: id.clone(),
                    caller,
                });
            }

            update_bid_state(conn, &id, BidState::Withdrawn, bid.state)?;
            Ok(Bid {
                state: BidState::Withdrawn,
                ..bid
            })
        })
        .await
    }
}

fn update_bid_state(
    conn: &ConnType,
    id: &BidId,
    to: BidState,
    from: BidState,
) -> Result<(), BidStateError> {
    let updated = diesel::update(
        dsl::market_bid
            .filter(dsl::id.eq(id))
            .filter(dsl::state.eq(BidState::Pending)),
    )
    .set(dsl::state.eq(to))
    .execute(conn)?;
    if updated == 0 {
        return Err(BidStateError::InvalidTransition {
            id: id.clone(),
            from,
            to,
        });
    }
    Ok(())
}

/// Mass rejection used when a request leaves the biddable states: losing
/// bids on acceptance, all pending bids on cancellation or expiry.
pub(super) fn reject_pending_bids(
    conn: &ConnType,
    request_id: &RequestId,
    except: Option<&BidId>,
) -> DbResult<()> {
    match except {
        Some(winner) => {
            diesel::update(
                dsl::market_bid
                    .filter(dsl::request_id.eq(request_id))
                    .filter(dsl::state.eq(BidState::Pending))
                    .filter(dsl::id.ne(winner)),
            )
            .set(dsl::state.eq(BidState::Rejected))
            .execute(conn)?;
        }
        None => {
            diesel::update(
                dsl::market_bid
                    .filter(dsl::request_id.eq(request_id))
                    .filter(dsl::state.eq(BidState::Pending)),
            )
            .set(dsl::state.eq(BidState::Rejected))
            .execute(conn)?;
        }
    }
    Ok(())
}
