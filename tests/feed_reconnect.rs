use blink::application::ingestion::{FeedSupervisor, FixedDelay};
use blink::domain::errors::FeedError;
use blink::domain::feed::{FeedState, FeedStatus};
use blink::domain::ports::TradeFeed;
use blink::domain::repositories::TradeRepository;
use blink::infrastructure::coinbase::CoinbaseTradeFeed;
use blink::infrastructure::mock::InMemoryTradeRepository;
use blink::infrastructure::observability::Metrics;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

const PAIR: &str = "BTC-USD";

fn match_frame(second: u32, price: &str) -> Message {
    Message::text(
        serde_json::json!({
            "type": "match",
            "product_id": PAIR,
            "time": format!("2024-05-01T12:00:{:02}.000000Z", second),
            "price": price,
            "size": "0.01",
        })
        .to_string(),
    )
}

/// First connection delivers three trades and closes. The second one replays
/// the last two and adds two new ones, then stays open.
async fn spawn_exchange() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let subscribe = ws.next().await.unwrap().unwrap();
        assert!(subscribe.to_text().unwrap().contains("\"matches\""));
        ws.send(Message::text(r#"{"type":"subscriptions","channels":[]}"#))
            .await
            .unwrap();
        for (s, p) in [(0, "100.0"), (1, "100.5"), (2, "101.0")] {
            ws.send(match_frame(s, p)).await.unwrap();
        }
        ws.close(None).await.unwrap();

        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.next().await.unwrap().unwrap();
        for (s, p) in [(1, "999.0"), (2, "999.0"), (3, "101.5"), (4, "102.0")] {
            ws.send(match_frame(s, p)).await.unwrap();
        }
        // Hold the connection until the client goes away
        while let Some(Ok(_)) = ws.next().await {}
    });

    format!("ws://{}", addr)
}

#[tokio::test]
async fn test_reconnect_does_not_duplicate_trades() {
    let url = spawn_exchange().await;
    let repo = Arc::new(InMemoryTradeRepository::new());
    let metrics = Metrics::new().unwrap();

    let feed = Arc::new(CoinbaseTradeFeed::new(
        url,
        PAIR.to_string(),
        Duration::from_secs(30),
        Duration::from_secs(30),
        repo.clone(),
        metrics.clone(),
    ));
    let supervisor = FeedSupervisor::new(
        feed,
        Box::new(FixedDelay::new(Duration::from_millis(50))),
        metrics.clone(),
    );
    let task = tokio::spawn(async move { supervisor.run().await });

    let filled = tokio::time::timeout(Duration::from_secs(10), async {
        while repo.count().await.unwrap() < 5 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(filled.is_ok(), "feed never delivered five trades");

    // Give the tail of the second session time to settle
    tokio::time::sleep(Duration::from_millis(100)).await;
    task.abort();

    let trades = repo.all().await.unwrap();
    let prices: Vec<f64> = trades.iter().map(|t| t.price).collect();
    assert_eq!(prices, vec![100.0, 100.5, 101.0, 101.5, 102.0]);

    assert!(metrics.feed_reconnects_total.get() >= 1);
    let duplicates = metrics
        .trades_ingested_total
        .with_label_values(&["feed", "duplicate"])
        .get();
    assert_eq!(duplicates, 2);
}

fn feed(
    url: String,
    ping_interval: Duration,
    ping_timeout: Duration,
    repo: Arc<InMemoryTradeRepository>,
    metrics: Metrics,
) -> CoinbaseTradeFeed {
    CoinbaseTradeFeed::new(
        url,
        PAIR.to_string(),
        ping_interval,
        ping_timeout,
        repo,
        metrics,
    )
}

#[tokio::test]
async fn test_unanswered_ping_fails_session_at_timeout() {
    // Completes the handshake, then never reads: pings are never answered
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let _ws = accept_async(stream).await.unwrap();
        std::future::pending::<()>().await;
    });

    let feed = feed(
        url,
        Duration::from_secs(1),
        Duration::from_millis(300),
        Arc::new(InMemoryTradeRepository::new()),
        Metrics::new().unwrap(),
    );
    let status = FeedStatus::new();

    let started = Instant::now();
    let result = tokio::time::timeout(Duration::from_secs(5), feed.run_session(&status))
        .await
        .expect("session should end on its own");
    let took = started.elapsed();

    let err = result.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<FeedError>(),
        Some(FeedError::KeepaliveTimeout { timeout }) if *timeout == Duration::from_millis(300)
    ));
    // First ping at 1s, deadline 300ms later; the next ping tick (2s) must not matter
    assert!(took >= Duration::from_millis(1250), "ended after {:?}", took);
    assert!(took < Duration::from_millis(1900), "ended after {:?}", took);
    assert_eq!(status.current(), FeedState::Subscribed);
}

#[tokio::test]
async fn test_failed_insert_keeps_session_open() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let (resume_tx, resume_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.next().await.unwrap().unwrap();
        for (s, p) in [(0, "100.0"), (1, "100.5")] {
            ws.send(match_frame(s, p)).await.unwrap();
        }
        resume_rx.await.unwrap();
        for (s, p) in [(2, "101.0"), (3, "101.5")] {
            ws.send(match_frame(s, p)).await.unwrap();
        }
        while let Some(Ok(_)) = ws.next().await {}
    });

    let repo = Arc::new(InMemoryTradeRepository::new());
    repo.set_fail_inserts(true);
    let metrics = Metrics::new().unwrap();
    let supervisor = FeedSupervisor::new(
        Arc::new(feed(
            url,
            Duration::from_secs(30),
            Duration::from_secs(30),
            repo.clone(),
            metrics.clone(),
        )),
        Box::new(FixedDelay::new(Duration::from_millis(50))),
        metrics.clone(),
    );
    let task = tokio::spawn(async move { supervisor.run().await });

    let failed = metrics
        .trades_ingested_total
        .with_label_values(&["feed", "failed"]);
    let outage = tokio::time::timeout(Duration::from_secs(10), async {
        while failed.get() < 2 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(outage.is_ok(), "failed inserts were never counted");

    repo.set_fail_inserts(false);
    resume_tx.send(()).unwrap();

    let recovered = tokio::time::timeout(Duration::from_secs(10), async {
        while repo.count().await.unwrap() < 2 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(recovered.is_ok(), "later frames never stored");
    task.abort();

    let prices: Vec<f64> = repo.all().await.unwrap().iter().map(|t| t.price).collect();
    assert_eq!(prices, vec![101.0, 101.5]);
    assert_eq!(failed.get(), 2);
    assert_eq!(metrics.feed_reconnects_total.get(), 0);
}
