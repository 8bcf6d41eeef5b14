use urgent_market::testing::*;
use urgent_market::{BidState, MarketError, RequestState};

#[tokio::test]
async fn first_bid_moves_request_to_bidding() {
    let mock = MockMarket::new("first_bid_moves_request_to_bidding");
    let requestor = actor("req-1");
    let request = mock
        .market
        .create_request(&requestor, sample_new_request())
        .await
        .unwrap();

    let bid = mock
        .market
        .submit_bid(&actor("prov-1"), &request.id, sample_bid(750))
        .await
        .unwrap();
    assert_eq!(bid.state, BidState::Pending);

    let details = mock.market.get_request_details(&request.id).await.unwrap();
    assert_eq!(details.request.state, RequestState::Bidding);

    // A second provider joins; the state doesn't change further.
    mock.market
        .submit_bid(&actor("prov-2"), &request.id, sample_bid(800))
        .await
        .unwrap();
    let details = mock.market.get_request_details(&request.id).await.unwrap();
    assert_eq!(details.request.state, RequestState::Bidding);
    assert_eq!(details.bids.len(), 2);
}

#[tokio::test]
async fn one_live_bid_per_provider() {
    let mock = MockMarket::new("one_live_bid_per_provider");
    let provider = actor("prov-1");
    let request = mock
        .market
        .create_request(&actor("req-1"), sample_new_request())
        .await
        .unwrap();

    mock.market
        .submit_bid(&provider, &request.id, sample_bid(750))
        .await
        .unwrap();
    let result = mock
        .market
        .submit_bid(&provider, &request.id, sample_bid(700))
        .await;
    assert!(matches!(result, Err(MarketError::Duplicate(_))));
}

#[tokio::test]
async fn withdrawing_frees_the_bid_slot() {
    let mock = MockMarket::new("withdrawing_frees_the_bid_slot");
    let provider = actor("prov-1");
    let request = mock
        .market
        .create_request(&actor("req-1"), sample_new_request())
        .await
        .unwrap();

    let bid = mock
        .market
        .submit_bid(&provider, &request.id, sample_bid(750))
        .await
        .unwrap();
    let withdrawn = mock.market.withdraw_bid(&provider, &bid.id).await.unwrap();
    assert_eq!(withdrawn.state, BidState::Withdrawn);

    // Withdrawn bids disappear from the requestor's view and free the slot.
    let details = mock.market.get_request_details(&request.id).await.unwrap();
    assert!(details.bids.is_empty());
    mock.market
        .submit_bid(&provider, &request.id, sample_bid(650))
        .await
        .unwrap();

    // Can't withdraw twice.
    let result = mock.market.withdraw_bid(&provider, &bid.id).await;
    assert!(matches!(result, Err(MarketError::InvalidState(_))));
}

#[tokio::test]
async fn acceptance_cascades_to_all_bids() {
    let mock = MockMarket::new("acceptance_cascades_to_all_bids");
    let requestor = actor("req-1");
    let request = mock
        .market
        .create_request(&requestor, sample_new_request())
        .await
        .unwrap();

    let winner = mock
        .market
        .submit_bid(&actor("prov-1"), &request.id, sample_bid(750))
        .await
        .unwrap();
    let loser = mock
        .market
        .submit_bid(&actor("prov-2"), &request.id, sample_bid(800))
        .await
        .unwrap();

    let accepted = mock
        .market
        .accept_bid(&requestor, &request.id, &winner.id)
        .await
        .unwrap();
    assert_eq!(accepted.state, RequestState::Accepted);
    assert_eq!(accepted.accepted_bid_id, Some(winner.id.clone()));
    assert!(accepted.accepted_at.is_some());

    let details = mock.market.get_request_details(&request.id).await.unwrap();
    for bid in &details.bids {
        let expected = if bid.id == winner.id {
            BidState::Accepted
        } else {
            BidState::Rejected
        };
        assert_eq!(bid.state, expected);
    }

    // The market is closed on that request.
    let result = mock
        .market
        .submit_bid(&actor("prov-3"), &request.id, sample_bid(500))
        .await;
    assert!(matches!(result, Err(MarketError::InvalidState(_))));
    let result = mock.market.withdraw_bid(&actor("prov-2"), &loser.id).await;
    assert!(matches!(result, Err(MarketError::InvalidState(_))));
    let result = mock
        .market
        .accept_bid(&requestor, &request.id, &loser.id)
        .await;
    assert!(matches!(result, Err(MarketError::InvalidState(_))));
}

#[tokio::test]
async fn requestor_can_reject_a_single_bid() {
    let mock = MockMarket::new("requestor_can_reject_a_single_bid");
    let requestor = actor("req-1");
    let request = mock
        .market
        .create_request(&requestor, sample_new_request())
        .await
        .unwrap();
    let bid = mock
        .market
        .submit_bid(&actor("prov-1"), &request.id, sample_bid(750))
        .await
        .unwrap();

    let result = mock.market.reject_bid(&actor("stranger"), &bid.id).await;
    assert!(matches!(result, Err(MarketError::Permission(_))));

    let rejected = mock.market.reject_bid(&requestor, &bid.id).await.unwrap();
    assert_eq!(rejected.state, BidState::Rejected);

    // Rejecting a bid leaves the request in play.
    let details = mock.market.get_request_details(&request.id).await.unwrap();
    assert_eq!(details.request.state, RequestState::Bidding);

    let result = mock
        .market
        .accept_bid(&requestor, &request.id, &bid.id)
        .await;
    assert!(matches!(result, Err(MarketError::InvalidState(_))));
}

#[tokio::test]
async fn accept_checks_ownership_and_bid_identity() {
    let mock = MockMarket::new("accept_checks_ownership_and_bid_identity");
    let requestor = actor("req-1");
    let request = mock
        .market
        .create_request(&requestor, sample_new_request())
        .await
        .unwrap();
    let other_request = mock
        .market
        .create_request(&actor("req-2"), sample_new_request())
        .await
        .unwrap();
    let bid = mock
        .market
        .submit_bid(&actor("prov-1"), &request.id, sample_bid(750))
        .await
        .unwrap();

    let result = mock
        .market
        .accept_bid(&actor("stranger"), &request.id, &bid.id)
        .await;
    assert!(matches!(result, Err(MarketError::Permission(_))));

    // A bid belonging to a different request doesn't count.
    let result = mock
        .market
        .accept_bid(&actor("req-2"), &other_request.id, &bid.id)
        .await;
    assert!(matches!(result, Err(MarketError::NotFound(_))));

    let result = mock
        .market
        .submit_bid(&actor("prov-1"), &request.id, sample_bid(0))
        .await;
    assert!(matches!(result, Err(MarketError::Validation(_))));
}

#[tokio::test]
async fn provider_sees_their_bid_history() {
    let mock = MockMarket::new("provider_sees_their_bid_history");
    let provider = actor("prov-1");
    let first = mock
        .market
        .create_request(&actor("req-1"), sample_new_request())
        .await
        .unwrap();
    let second = mock
        .market
        .create_request(&actor("req-2"), sample_new_request())
        .await
        .unwrap();

    mock.market
        .submit_bid(&provider, &first.id, sample_bid(700))
        .await
        .unwrap();
    mock.market
        .submit_bid(&provider, &second.id, sample_bid(900))
        .await
        .unwrap();

    let bids = mock.market.list_my_bids(&provider).await.unwrap();
    assert_eq!(bids.len(), 2);
}
