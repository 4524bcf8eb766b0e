//! REST client and WebSocket transport against local servers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use market_data::{
    BitkubClient, Config, MarketDataApi, MarketDataError, OrderBooks, PriceLevel, RestClient,
    TradingPair,
};

type Requests = Arc<Mutex<Vec<HashMap<String, String>>>>;

async fn symbols() -> Json<Value> {
    Json(json!({
        "error": 0,
        "result": [
            { "id": 7, "symbol": "THB_BTC", "info": "Thai Baht to Bitcoin" },
            { "id": 8, "symbol": "THB_ETH", "info": "Thai Baht to Ethereum" }
        ]
    }))
}

async fn books(
    State(requests): State<Requests>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let sym = params.get("sym").cloned().unwrap_or_default();
    requests.lock().unwrap().push(params);

    match sym.as_str() {
        "thb_btc" => Json(json!({
            "error": 0,
            "result": {
                "bids": [["1", 1529453033, 997.5, 10000, 0.09975], ["2", 1529453034, 99, 9900, 0.01]],
                "asks": [["680", 1529491094, 997.5, 10100, 0.09975]]
            }
        })),
        _ => Json(json!({ "error": 11, "result": { "bids": [], "asks": [] } })),
    }
}

/// Serve the REST endpoints on an ephemeral port
async fn rest_server() -> (String, Requests) {
    let requests = Requests::default();
    let app = Router::new()
        .route("/api/market/symbols", get(symbols))
        .route("/api/market/books", get(books))
        .with_state(requests.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), requests)
}

/// Accept one WebSocket client, send `messages`, then hold the connection open
async fn ws_server(messages: Vec<&'static str>) -> (String, mpsc::UnboundedReceiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        for message in messages {
            ws.send(Message::Text(message.to_string())).await.unwrap();
        }
        while let Some(Ok(frame)) = ws.next().await {
            if frame.is_close() {
                break;
            }
        }
        let _ = closed_tx.send(());
    });

    (format!("ws://{addr}/websocket-api"), closed_rx)
}

#[tokio::test]
async fn list_pairs_normalizes_directory() {
    let (base_url, _) = rest_server().await;
    let rest = RestClient::new(&base_url);

    let symbols = rest.market_symbols().await.unwrap();
    let btc = &symbols[&TradingPair::new("BTC", "THB")];
    assert_eq!(btc.id, 7);
    assert_eq!(btc.symbol.to_string(), "BTC_THB");
    assert_eq!(btc.info, "Thai Baht to Bitcoin");
    assert!(symbols.contains_key(&TradingPair::new("ETH", "THB")));
}

#[tokio::test]
async fn order_book_uses_exchange_symbol_and_limit() {
    let (base_url, requests) = rest_server().await;
    let rest = RestClient::new(&base_url);
    let btc = TradingPair::new("BTC", "THB");

    let book = rest.order_book(&btc, Some(5)).await.unwrap();
    assert_eq!(
        book.bids,
        vec![
            PriceLevel::new(dec!(10000), dec!(0.09975)),
            PriceLevel::new(dec!(9900), dec!(0.01)),
        ]
    );
    assert_eq!(book.asks, vec![PriceLevel::new(dec!(10100), dec!(0.09975))]);

    rest.order_book(&btc, None).await.unwrap();

    let requests = requests.lock().unwrap();
    assert_eq!(requests[0].get("sym").map(String::as_str), Some("thb_btc"));
    assert_eq!(requests[0].get("lmt").map(String::as_str), Some("5"));
    assert!(!requests[1].contains_key("lmt"));
}

#[tokio::test]
async fn order_book_api_error_names_pair() {
    let (base_url, _) = rest_server().await;
    let rest = RestClient::new(&base_url);

    match rest.order_book(&TradingPair::new("ETH", "THB"), None).await {
        Err(MarketDataError::Api { pair, code }) => {
            assert_eq!(pair.to_string(), "ETH_THB");
            assert_eq!(code, 11);
        }
        other => panic!("Expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_directory_is_rest_error() {
    let rest = RestClient::new("http://127.0.0.1:9");
    assert!(matches!(
        rest.market_symbols().await,
        Err(MarketDataError::RestApiError(_))
    ));
}

#[tokio::test]
async fn streams_order_book_over_websocket() {
    let (base_url, _) = rest_server().await;
    let (ws_base_url, mut closed) = ws_server(vec![
        r#"{"event":"tradeschanged","pairing_id":7,"data":[[],[["1",1,5000,10000,0.5],["2",1,2999.7,9999,0.3]],[["3",1,1000,10001,0.1]]]}"#,
        r#"{"event":"bidschanged","pairing_id":7,"data":[[10000,0]]}"#,
    ])
    .await;

    let config = Config {
        base_url,
        ws_base_url,
        ..Config::default()
    };
    let client = BitkubClient::new(&config).unwrap();

    let (tx, mut updates) = mpsc::unbounded_channel::<OrderBooks>();
    let btc = TradingPair::new("BTC", "THB");
    let handle = client
        .subscribe(&[btc.clone()], move |books| {
            let _ = tx.send(books);
        })
        .await
        .unwrap();

    let wait = Duration::from_secs(5);
    let first = timeout(wait, updates.recv()).await.unwrap().unwrap();
    assert_eq!(first[&btc].bids.len(), 2);

    let second = timeout(wait, updates.recv()).await.unwrap().unwrap();
    assert_eq!(second[&btc].bids, vec![PriceLevel::new(dec!(9999), dec!(0.3))]);
    assert_eq!(client.metrics().active_connections.get(), 1);

    client.unsubscribe(&handle).await;
    timeout(wait, closed.recv()).await.unwrap();
    assert_eq!(client.metrics().active_connections.get(), 0);
}
