use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::db::dao::bid::reject_pending_bids;
use crate::db::model::{
    ActorId, BidId, BidState, RequestId, RequestState, UrgentRequest, BIDDABLE_STATES,
};
use crate::db::schema::market_bid::dsl as dsl_bid;
use crate::db::schema::market_request::dsl;
use crate::db::{DbError, DbResult};
use urgent_persistence::executor::{do_with_transaction, readonly_transaction, AsDao, PoolType};

#[derive(thiserror::Error, Debug)]
pub enum RequestStateError {
    #[error("Request [{0}] not found.")]
    NotFound(RequestId),
    #[error("Can't transition request [{id}] from state {from} to {to}.")]
    InvalidTransition {
        id: RequestId,
        from: RequestState,
        to: RequestState,
    },
    #[error("Actor [{caller}] doesn't own request [{id}].")]
    Ownership { id: RequestId, caller: ActorId },
    #[error("Bid [{0}] not found for request [{1}].")]
    BidNotFound(BidId, RequestId),
    #[error("Bid [{bid_id}] is in state {state}; only pending bids can be accepted.")]
    BidNotPending { bid_id: BidId, state: BidState },
    #[error("Request database error: {0}.")]
    Db(DbError),
}

impl<ErrorType: Into<DbError>> From<ErrorType> for RequestStateError {
    fn from(err: ErrorType) -> Self {
        RequestStateError::Db(err.into())
    }
}

pub struct RequestDao<'c> {
    pool: &'c PoolType,
}

impl<'c> AsDao<'c> for RequestDao<'c> {
    fn as_dao(pool: &'c PoolType) -> Self {
        Self { pool }
    }
}

impl<'c> RequestDao<'c> {
    pub async fn create(&self, request: UrgentRequest) -> DbResult<()> {
        do_with_transaction(self.pool, move |conn| {
            diesel::insert_into(dsl::market_request)
                .values(&request)
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    /// Returns the request, lazily flipping it to `Expired` first when its
    /// deadline has passed. Callers therefore never observe an overdue
    /// request in a biddable state, even between sweeper runs.
    pub async fn select(
        &self,
        id: &RequestId,
        now: NaiveDateTime,
    ) -> Result<Option<UrgentRequest>, RequestStateError> {
        let id = id.clone();
        do_with_transaction(self.pool, move |conn| {
            let mut request: UrgentRequest = match dsl::market_request
                .filter(dsl::id.eq(&id))
                .first(conn)
                .optional()?
            {
                Some(request) => request,
                None => return Ok(None),
            };

            if request.state.accepts_bids() && request.expires_at < now {
                update_state_if(conn, &id, RequestState::Expired, &BIDDABLE_STATES)?;
                reject_pending_bids(conn, &id, None)?;
                request.state = RequestState::Expired;
            }
            Ok(Some(request))
        })
        .await
    }

    pub async fn list_by_requestor(&self, requestor_id: ActorId) -> DbResult<Vec<UrgentRequest>> {
        readonly_transaction(self.pool, move |conn| {
            Ok(dsl::market_request
                .filter(dsl::requestor_id.eq(requestor_id))
                .order(dsl::created_at.desc())
                .load(conn)?)
        })
        .await
    }

    /// Open and bidding requests, most urgent first, newest first within the
    /// same urgency. Overdue rows may still appear here until the sweeper
    /// runs; they are filtered by deadline instead of re-checking state.
    pub async fn list_active(&self, now: NaiveDateTime) -> DbResult<Vec<UrgentRequest>> {
        readonly_transaction(self.pool, move |conn| {
            Ok(dsl::market_request
                .filter(dsl::state.eq_any(BIDDABLE_STATES.to_vec()))
                .filter(dsl::expires_at.ge(now))
                .order((dsl::urgency.desc(), dsl::created_at.desc()))
                .load(conn)?)
        })
        .await
    }

    /// Accepts a bid on behalf of the requestor. The state guard in
    /// [`update_state_if`] is the serialization point: of two concurrent
    /// accepts (or an accept racing cancellation or expiry) exactly one
    /// update matches a biddable row.
    pub async fn accept_bid(
        &self,
        id: &RequestId,
        bid_id: &BidId,
        caller: &ActorId,
        now: NaiveDateTime,
    ) -> Result<UrgentRequest, RequestStateError> {
        let id = id.clone();
        let bid_id = bid_id.clone();
        let caller = caller.clone();
        do_with_transaction(self.pool, move |conn| {
            let request: UrgentRequest = dsl::market_request
                .filter(dsl::id.eq(&id))
                .first(conn)
                .optional()?
                .ok_or_else(|| RequestStateError::NotFound(id.clone()))?;

            if request.requestor_id != caller {
                return Err(RequestStateError::Ownership {
                    id: id.clone(),
                    caller,
                });
            }

            let (found_state, request_id): (BidState, RequestId) = dsl_bid::market_bid
                .filter(dsl_bid::id.eq(&bid_id))
                .select((dsl_bid::state, dsl_bid::request_id))
                .first(conn)
                .optional()?
                .ok_or_else(|| RequestStateError::BidNotFound(bid_id.clone(), id.clone()))?;
            if request_id != id {
                return Err(RequestStateError::BidNotFound(bid_id.clone(), id.clone()));
            }
            if found_state != BidState::Pending {
                return Err(RequestStateError::BidNotPending {
                    bid_id: bid_id.clone(),
                    state: found_state,
                });
            }

            let updated = diesel::update(
                dsl::market_request
                    .filter(dsl::id.eq(&id))
                    .filter(dsl::state.eq_any(BIDDABLE_STATES.to_vec()))
                    .filter(dsl::expires_at.ge(now)),
            )
            .set((
                dsl::state.eq(RequestState::Accepted),
                dsl::accepted_bid_id.eq(Some(&bid_id)),
                dsl::accepted_at.eq(Some(now)),
            ))
            .execute(conn)?;
            if updated == 0 {
                return Err(RequestStateError::InvalidTransition {
                    id: id.clone(),
                    from: request.state,
                    to: RequestState::Accepted,
                });
            }

            diesel::update(dsl_bid::market_bid.filter(dsl_bid::id.eq(&bid_id)))
                .set(dsl_bid::state.eq(BidState::Accepted))
                .execute(conn)?;
            reject_pending_bids(conn, &id, Some(&bid_id))?;

            Ok(dsl::market_request.filter(dsl::id.eq(&id)).first(conn)?)
        })
        .await
    }

    pub async fn cancel(
        &self,
        id: &RequestId,
        caller: &ActorId,
    ) -> Result<UrgentRequest, RequestStateError> {
        let id = id.clone();
        let caller = caller.clone();
        do_with_transaction(self.pool, move |conn| {
            let request: UrgentRequest = dsl::market_request
                .filter(dsl::id.eq(&id))
                .first(conn)
                .optional()?
                .ok_or_else(|| RequestStateError::NotFound(id.clone()))?;

            if request.requestor_id != caller {
                return Err(RequestStateError::Ownership {
                    id: id.clone(),
                    caller,
                });
            }

            if !update_state_if(conn, &id, RequestState::Cancelled, &BIDDABLE_STATES)? {
                return Err(RequestStateError::InvalidTransition {
                    id: id.clone(),
                    from: request.state,
                    to: RequestState::Cancelled,
                });
            }
            reject_pending_bids(conn, &id, None)?;

            Ok(dsl::market_request.filter(dsl::id.eq(&id)).first(conn)?)
        })
        .await
    }

    /// Sweeper entry point. Moves every overdue biddable request to
    /// `Expired` and rejects its pending bids; returns how many requests
    /// were expired. Safe to run concurrently with accepts thanks to the
    /// shared state guard.
    pub async fn expire_overdue(&self, now: NaiveDateTime) -> DbResult<usize> {
        do_with_transaction(self.pool, move |conn| {
            let overdue: Vec<RequestId> = dsl::market_request
                .filter(dsl::state.eq_any(BIDDABLE_STATES.to_vec()))
                .filter(dsl::expires_at.lt(now))
                .select(dsl::id)
                .load(conn)?;

            let mut expired = 0;
            for id in &overdue {
                if update_state_if(conn, id, RequestState::Expired, &BIDDABLE_STATES)? {
                    reject_pending_bids(conn, id, None)?;
                    expired += 1;
                }
            }
            Ok(expired)
        })
        .await
    }
}

/// Conditional state update; returns true iff the row was in one of
/// `from_states` and got moved to `to`.
pub(super) fn update_state_if(
    conn: &crate::db::ConnType,
    id: &RequestId,
    to: RequestState,
    from_states: &[RequestState],
) -> DbResult<bool> {
    let updated = diesel::update(
        dsl::market_request
            .filter(dsl::id.eq(id))
            .filter(dsl::state.eq_any(from_states.to_vec())),
    )
    .set(dsl::state.eq(to))
    .execute(conn)?;
    Ok(updated > 0)
}

/// First bid moves the request from `Open` to `Bidding`. A no-op for every
/// other state, including concurrent first bids.
pub(super) fn mark_bidding(conn: &crate::db::ConnType, id: &RequestId) -> DbResult<()> {
    update_state_if(conn, id, RequestState::Bidding, &[RequestState::Open])?;
    Ok(())
}
