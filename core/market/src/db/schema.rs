table! {
    market_request (id) {
        id -> Text,
        requestor_id -> Text,
        category -> Text,
        title -> Text,
        description -> Text,
        urgency -> Integer,
        location -> Text,
        latitude -> Nullable<Double>,
        longitude -> Nullable<Double>,
        budget_min -> Text,
        budget_max -> Text,
        state -> Integer,
        accepted_bid_id -> Nullable<Text>,
        created_at -> Timestamp,
        expires_at -> Timestamp,
        accepted_at -> Nullable<Timestamp>,
    }
}

table! {
    market_bid (id) {
        id -> Text,
        request_id -> Text,
        provider_id -> Text,
        price -> Text,
        message -> Nullable<Text>,
        state -> Integer,
        submitted_at -> Timestamp,
    }
}

table! {
    market_provider (id) {
        id -> Text,
        categories -> Text,
        latitude -> Nullable<Double>,
        longitude -> Nullable<Double>,
        active -> Bool,
        verified -> Bool,
        pricing -> Text,
    }
}

table! {
    market_notification (id) {
        id -> Integer,
        provider_id -> Text,
        request_id -> Text,
        category -> Text,
        urgency -> Integer,
        budget_min -> Text,
        budget_max -> Text,
        message -> Text,
        is_read -> Bool,
        created_at -> Timestamp,
    }
}

allow_tables_to_appear_in_same_query!(market_request, market_bid);
allow_tables_to_appear_in_same_query!(market_request, market_notification);

joinable!(market_bid -> market_request (request_id));
joinable!(market_notification -> market_request (request_id));
