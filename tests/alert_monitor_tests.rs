use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use mongodb::bson::{self, oid::ObjectId, Bson, Decimal128};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tradejournal::{
    error::{NotifyError, StoreError},
    models::{PendingAlert, PriceAlert, Stock, User},
    services::{
        alert_monitor::{run_tick, spawn_price_alert_monitor},
        alert_store::{decode_documents, AlertStore, STOCKS},
        notifier::{Category, Channel, NotificationGateway},
    },
};

#[derive(Default)]
struct MemStore {
    alerts: Mutex<Vec<PriceAlert>>,
    stocks: Mutex<HashMap<ObjectId, Stock>>,
    users: Mutex<HashMap<ObjectId, User>>,
    fail_marks: AtomicUsize,
    panics: AtomicUsize,
}

impl MemStore {
    fn set_price(&self, stock_id: ObjectId, price: Decimal) {
        self.stocks.lock().unwrap().get_mut(&stock_id).unwrap().price = price;
    }

    fn is_triggered(&self, alert_id: ObjectId) -> bool {
        self.alerts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == alert_id)
            .map(|a| a.is_triggered)
            .unwrap()
    }
}

#[async_trait]
impl AlertStore for MemStore {
    async fn list_untriggered_alerts_with_stock_and_user(&self) -> Result<Vec<PendingAlert>, StoreError> {
        if self.panics.load(Ordering::SeqCst) > 0 {
            self.panics.fetch_sub(1, Ordering::SeqCst);
            panic!("store blew up");
        }

        let stocks = self.stocks.lock().unwrap();
        let users = self.users.lock().unwrap();

        Ok(self
            .alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| !a.is_triggered)
            .map(|a| PendingAlert {
                alert: a.clone(),
                stock: stocks.get(&a.stock_id).cloned(),
                user: users.get(&a.user_id).cloned(),
            })
            .collect())
    }

    async fn mark_triggered(&self, alert_id: ObjectId) -> Result<bool, StoreError> {
        if self.fail_marks.load(Ordering::SeqCst) > 0 {
            self.fail_marks.fetch_sub(1, Ordering::SeqCst);
            return Err(StoreError::Backend("write rejected".to_string()));
        }

        let mut alerts = self.alerts.lock().unwrap();
        match alerts.iter_mut().find(|a| a.id == alert_id && !a.is_triggered) {
            Some(a) => {
                a.is_triggered = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
struct RecordingGateway {
    published: Mutex<Vec<(String, String, Category)>>,
    fail: bool,
}

impl RecordingGateway {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<(String, String, Category)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationGateway for RecordingGateway {
    async fn subscribe(&self, _channel: Channel, destination: &str) -> Result<String, NotifyError> {
        Ok(format!("arn:test:{destination}"))
    }

    async fn unsubscribe(&self, _subscription: &str) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn publish(&self, message: &str, subject: &str, category: Category) -> Result<(), NotifyError> {
        self.published
            .lock()
            .unwrap()
            .push((message.to_string(), subject.to_string(), category));

        if self.fail {
            return Err(NotifyError::Sns("throttled".to_string()));
        }
        Ok(())
    }
}

fn user(email_enabled: bool, sms_enabled: bool) -> User {
    User {
        id: ObjectId::new(),
        username: "trader".to_string(),
        email: Some("trader@example.com".to_string()),
        phone_number: Some("+15551234567".to_string()),
        email_notifications_enabled: email_enabled,
        sms_notifications_enabled: sms_enabled,
        email_subscription_arn: None,
        sms_subscription_arn: None,
    }
}

/// Seeds one stock, one user and one alert; returns (stock_id, alert_id).
fn seed(store: &MemStore, u: User, price: i64, target: i64, above: bool) -> (ObjectId, ObjectId) {
    let stock = Stock {
        id: ObjectId::new(),
        symbol: "ACME".to_string(),
        name: "Acme Corp".to_string(),
        price: Decimal::from(price),
    };
    let alert = PriceAlert {
        id: ObjectId::new(),
        user_id: u.id,
        stock_id: stock.id,
        target_price: Decimal::from(target),
        is_above_target: above,
        is_triggered: false,
        triggered_at: None,
        created_at: 0,
    };

    let ids = (stock.id, alert.id);
    store.stocks.lock().unwrap().insert(stock.id, stock);
    store.users.lock().unwrap().insert(u.id, u);
    store.alerts.lock().unwrap().push(alert);
    ids
}

#[tokio::test]
async fn above_alert_fires_once_when_price_crosses_target() {
    let store = MemStore::default();
    let gateway = RecordingGateway::default();
    let (stock_id, alert_id) = seed(&store, user(true, false), 95, 100, true);

    run_tick(&store, &gateway).await.unwrap();
    assert!(!store.is_triggered(alert_id));

    store.set_price(stock_id, Decimal::from(99));
    run_tick(&store, &gateway).await.unwrap();
    assert!(!store.is_triggered(alert_id));
    assert!(gateway.calls().is_empty());

    store.set_price(stock_id, Decimal::from(101));
    let report = run_tick(&store, &gateway).await.unwrap();
    assert_eq!(report.triggered, 1);
    assert!(store.is_triggered(alert_id));

    // still above target: nothing more happens
    let report = run_tick(&store, &gateway).await.unwrap();
    assert_eq!(report.triggered, 0);

    let calls = gateway.calls();
    assert_eq!(calls.len(), 1);
    let (message, subject, category) = &calls[0];
    assert_eq!(*category, Category::Alert);
    assert!(subject.contains("ACME"));
    assert!(message.contains("ACME"));
    assert!(message.contains("$100"));
    assert!(message.contains("$101"));
}

#[tokio::test]
async fn below_alert_fires_at_exact_target() {
    let store = MemStore::default();
    let gateway = RecordingGateway::default();
    let (stock_id, alert_id) = seed(&store, user(true, false), 60, 50, false);

    run_tick(&store, &gateway).await.unwrap();
    assert!(!store.is_triggered(alert_id));

    store.set_price(stock_id, Decimal::from(50));
    run_tick(&store, &gateway).await.unwrap();
    assert!(store.is_triggered(alert_id));

    let calls = gateway.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].0.contains("fallen below"));
}

#[tokio::test]
async fn predicate_holds_across_price_range() {
    for price in 90..=110 {
        for above in [true, false] {
            let store = MemStore::default();
            let gateway = RecordingGateway::default();
            let (_, alert_id) = seed(&store, user(false, false), price, 100, above);

            run_tick(&store, &gateway).await.unwrap();

            let expected = if above { price >= 100 } else { price <= 100 };
            assert_eq!(store.is_triggered(alert_id), expected, "price {price}, above {above}");
        }
    }
}

#[tokio::test]
async fn user_without_channels_is_triggered_silently() {
    let store = MemStore::default();
    let gateway = RecordingGateway::default();
    let (_, alert_id) = seed(&store, user(false, false), 120, 100, true);

    let report = run_tick(&store, &gateway).await.unwrap();

    assert!(store.is_triggered(alert_id));
    assert_eq!(report.notified, 0);
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn enabled_channel_without_destination_sends_nothing() {
    let store = MemStore::default();
    let gateway = RecordingGateway::default();
    let mut u = user(true, true);
    u.email = None;
    u.phone_number = Some(String::new());
    let (_, alert_id) = seed(&store, u, 120, 100, true);

    run_tick(&store, &gateway).await.unwrap();

    assert!(store.is_triggered(alert_id));
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn sms_only_user_is_notified() {
    let store = MemStore::default();
    let gateway = RecordingGateway::default();
    seed(&store, user(false, true), 120, 100, true);

    let report = run_tick(&store, &gateway).await.unwrap();

    assert_eq!(report.notified, 1);
    assert_eq!(gateway.calls().len(), 1);
}

#[tokio::test]
async fn publish_failure_keeps_alert_triggered_and_is_not_retried() {
    let store = MemStore::default();
    let gateway = RecordingGateway::failing();
    let (_, first) = seed(&store, user(true, false), 120, 100, true);
    let (_, second) = seed(&store, user(true, false), 120, 100, true);

    let report = run_tick(&store, &gateway).await.unwrap();
    assert_eq!(report.triggered, 2);
    assert_eq!(report.notify_failed, 2);
    assert!(store.is_triggered(first));
    assert!(store.is_triggered(second));

    let report = run_tick(&store, &gateway).await.unwrap();
    assert_eq!(report.triggered, 0);
    assert_eq!(gateway.calls().len(), 2);
}

#[tokio::test]
async fn missing_stock_or_user_is_skipped() {
    let store = MemStore::default();
    let gateway = RecordingGateway::default();
    let (stock_id, no_stock) = seed(&store, user(true, false), 120, 100, true);
    store.stocks.lock().unwrap().remove(&stock_id);

    let u = user(true, false);
    let user_id = u.id;
    let (_, no_user) = seed(&store, u, 120, 100, true);
    store.users.lock().unwrap().remove(&user_id);

    let report = run_tick(&store, &gateway).await.unwrap();

    assert_eq!(report.skipped, 2);
    assert_eq!(report.evaluated, 0);
    assert!(!store.is_triggered(no_stock));
    assert!(!store.is_triggered(no_user));
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn corrupt_stock_record_only_skips_its_own_alert() {
    let store = MemStore::default();
    let gateway = RecordingGateway::default();
    let (good_stock, fires) = seed(&store, user(true, false), 120, 100, true);
    let (bad_stock, stuck) = seed(&store, user(true, false), 120, 100, true);

    // The feed wrote one price as a native Mongo decimal
    let stocks: Vec<Stock> = store.stocks.lock().unwrap().drain().map(|(_, s)| s).collect();
    let docs = stocks
        .iter()
        .map(|s| {
            let mut d = bson::to_document(s).unwrap();
            if s.id == bad_stock {
                d.insert("price", Bson::Decimal128(Decimal128::from_bytes([0u8; 16])));
            }
            d
        })
        .collect();

    let decoded: Vec<Stock> = decode_documents(docs, STOCKS);
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].id, good_stock);
    store.stocks.lock().unwrap().extend(decoded.into_iter().map(|s| (s.id, s)));

    let report = run_tick(&store, &gateway).await.unwrap();

    assert_eq!(report.triggered, 1);
    assert_eq!(report.skipped, 1);
    assert!(store.is_triggered(fires));
    assert!(!store.is_triggered(stuck));
    assert_eq!(gateway.calls().len(), 1);
}

#[tokio::test]
async fn failed_mark_leaves_alert_pending_for_next_tick() {
    let store = MemStore::default();
    let gateway = RecordingGateway::default();
    let (_, alert_id) = seed(&store, user(true, false), 120, 100, true);
    store.fail_marks.store(1, Ordering::SeqCst);

    let report = run_tick(&store, &gateway).await.unwrap();
    assert_eq!(report.mark_failed, 1);
    assert!(!store.is_triggered(alert_id));
    assert!(gateway.calls().is_empty());

    let report = run_tick(&store, &gateway).await.unwrap();
    assert_eq!(report.triggered, 1);
    assert!(store.is_triggered(alert_id));
    assert_eq!(gateway.calls().len(), 1);
}

/// A store that always reports the alert as already taken, as when another
/// evaluator instance wins the conditional update.
struct LostRaceStore(MemStore);

#[async_trait]
impl AlertStore for LostRaceStore {
    async fn list_untriggered_alerts_with_stock_and_user(&self) -> Result<Vec<PendingAlert>, StoreError> {
        self.0.list_untriggered_alerts_with_stock_and_user().await
    }

    async fn mark_triggered(&self, _alert_id: ObjectId) -> Result<bool, StoreError> {
        Ok(false)
    }
}

#[tokio::test]
async fn lost_conditional_update_does_not_notify() {
    let inner = MemStore::default();
    seed(&inner, user(true, false), 120, 100, true);
    let store = LostRaceStore(inner);
    let gateway = RecordingGateway::default();

    let report = run_tick(&store, &gateway).await.unwrap();

    assert_eq!(report.triggered, 0);
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn monitor_survives_panicking_tick_and_stops_on_cancel() {
    let store = Arc::new(MemStore::default());
    let gateway = Arc::new(RecordingGateway::default());
    let (_, alert_id) = seed(&store, user(true, false), 120, 100, true);
    store.panics.store(1, Ordering::SeqCst);

    let shutdown = CancellationToken::new();
    let handle = spawn_price_alert_monitor(
        store.clone(),
        gateway.clone(),
        Duration::from_millis(10),
        shutdown.clone(),
    );

    let mut fired = false;
    for _ in 0..100 {
        if store.is_triggered(alert_id) {
            fired = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(fired, "alert should fire on a tick after the panicking one");

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("monitor should stop promptly")
        .expect("monitor task should exit cleanly");

    assert_eq!(gateway.calls().len(), 1);
}
