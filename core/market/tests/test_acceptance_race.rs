use urgent_market::testing::*;
use urgent_market::{BidState, MarketError, RequestState};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_accepts_pick_exactly_one_winner() {
    let mock = MockMarket::new("concurrent_accepts_pick_exactly_one_winner");
    let requestor = actor("req-1");
    let request = mock
        .market
        .create_request(&requestor, sample_new_request())
        .await
        .unwrap();
    let first = mock
        .market
        .submit_bid(&actor("prov-1"), &request.id, sample_bid(750))
        .await
        .unwrap();
    let second = mock
        .market
        .submit_bid(&actor("prov-2"), &request.id, sample_bid(800))
        .await
        .unwrap();

    let market_a = mock.market.clone();
    let market_b = mock.market.clone();
    let (req_a, req_b) = (requestor.clone(), requestor.clone());
    let (id_a, id_b) = (request.id.clone(), request.id.clone());
    let (bid_a, bid_b) = (first.id.clone(), second.id.clone());

    let (result_a, result_b) = tokio::join!(
        tokio::spawn(async move { market_a.accept_bid(&req_a, &id_a, &bid_a).await }),
        tokio::spawn(async move { market_b.accept_bid(&req_b, &id_b, &bid_b).await }),
    );
    let results = [result_a.unwrap(), result_b.unwrap()];

    let winners = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(winners, 1, "exactly one accept must win: {:?}", results);
    let loser = results.iter().find(|result| result.is_err()).unwrap();
    assert!(matches!(loser, Err(MarketError::InvalidState(_))));

    let details = mock.market.get_request_details(&request.id).await.unwrap();
    assert_eq!(details.request.state, RequestState::Accepted);
    let accepted_id = details.request.accepted_bid_id.clone().unwrap();
    for bid in &details.bids {
        let expected = if bid.id == accepted_id {
            BidState::Accepted
        } else {
            BidState::Rejected
        };
        assert_eq!(bid.state, expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn accept_and_cancel_cannot_both_win() {
    let mock = MockMarket::new("accept_and_cancel_cannot_both_win");
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

    let market_a = mock.market.clone();
    let market_b = mock.market.clone();
    let (req_a, req_b) = (requestor.clone(), requestor.clone());
    let (id_a, id_b) = (request.id.clone(), request.id.clone());
    let bid_id = bid.id.clone();

    let (accept, cancel) = tokio::join!(
        tokio::spawn(async move { market_a.accept_bid(&req_a, &id_a, &bid_id).await }),
        tokio::spawn(async move { market_b.cancel_request(&req_b, &id_b).await }),
    );
    let accept = accept.unwrap();
    let cancel = cancel.unwrap();

    assert!(
        accept.is_ok() != cancel.is_ok(),
        "exactly one of accept/cancel must win: accept={:?} cancel={:?}",
        accept,
        cancel
    );

    let details = mock.market.get_request_details(&request.id).await.unwrap();
    match details.request.state {
        RequestState::Accepted => {
            assert_eq!(details.request.accepted_bid_id, Some(bid.id.clone()));
            assert_eq!(details.bids[0].state, BidState::Accepted);
        }
        RequestState::Cancelled => {
            assert_eq!(details.request.accepted_bid_id, None);
            assert_eq!(details.bids[0].state, BidState::Rejected);
        }
        state => panic!("unexpected terminal state {}", state),
    }
}
