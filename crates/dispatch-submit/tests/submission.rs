use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use dispatch_core::{
    ImageTransport, LineItem, OrderDraft, OrderId, OrderPayload, OrderStatus,
    OrderStore, PendingImage, PersistedOrder, UploadedImage, Violation,
};
use dispatch_submit::{
    CancelFlag, ImageStatus, SubmitError, SubmitEvent, SubmitOutcome, SubmitState, Submitter,
};
use rust_decimal::Decimal;
use time::{Date, OffsetDateTime};
use tokio::sync::mpsc;

#[derive(Default)]
struct FakeStore {
    orders: Mutex<HashMap<String, PersistedOrder>>,
    fail: bool,
    updates: Mutex<usize>,
}

impl FakeStore {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn insert(&self, id: &str, status: OrderStatus, payload: OrderPayload) {
        let now = OffsetDateTime::now_utc();
        self.orders.lock().unwrap().insert(
            id.to_string(),
            PersistedOrder {
                id: OrderId::new(id),
                status,
                payload,
                created_at: now,
                updated_at: now,
            },
        );
    }

    fn payload(&self, id: &OrderId) -> Option<OrderPayload> {
        self.orders
            .lock()
            .unwrap()
            .get(id.as_str())
            .map(|o| o.payload.clone())
    }
}

#[async_trait]
impl OrderStore for FakeStore {
    async fn create_order(&self, payload: &OrderPayload) -> anyhow::Result<OrderId> {
        if self.fail {
            return Err(anyhow!("store unavailable"));
        }
        let id = format!("order-{}", self.orders.lock().unwrap().len() + 1);
        self.insert(&id, OrderStatus::Pending, payload.clone());
        Ok(OrderId::new(id))
    }

    async fn update_order(&self, id: &OrderId, payload: &OrderPayload) -> anyhow::Result<()> {
        if self.fail {
            return Err(anyhow!("store unavailable"));
        }
        *self.updates.lock().unwrap() += 1;
        let mut orders = self.orders.lock().unwrap();
        let order = orders
            .get_mut(id.as_str())
            .ok_or_else(|| anyhow!("no order {id}"))?;
        order.payload = payload.clone();
        Ok(())
    }

    async fn get_order(&self, id: &OrderId) -> anyhow::Result<Option<PersistedOrder>> {
        Ok(self.orders.lock().unwrap().get(id.as_str()).cloned())
    }
}

#[derive(Default)]
struct FakeTransport {
    failing: HashSet<String>,
    calls: Mutex<Vec<(usize, String)>>,
    cancel_after_first: Option<CancelFlag>,
}

impl FakeTransport {
    fn failing_on(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<(usize, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageTransport for FakeTransport {
    async fn upload_item_image(
        &self,
        order_id: &OrderId,
        item_index: usize,
        image: &PendingImage,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> anyhow::Result<UploadedImage> {
        let name = image.file_name();
        self.calls.lock().unwrap().push((item_index, name.clone()));
        if let Some(flag) = &self.cancel_after_first {
            flag.cancel();
        }
        on_progress(0);
        on_progress(50);
        // Out of order report that must not move progress backwards
        on_progress(30);
        if self.failing.contains(&name) {
            return Err(anyhow!("connection reset"));
        }
        on_progress(100);
        Ok(UploadedImage {
            url: format!("https://cdn.test/{order_id}/{name}"),
        })
    }
}

fn date() -> Date {
    Date::from_calendar_date(2026, time::Month::October, 16).unwrap()
}

fn draft_with_images(per_item: &[&[&str]]) -> OrderDraft {
    let mut draft = OrderDraft::new(date());
    draft.set_logistics_company(Some("lc-1".into()));
    draft.set_box_count(2);
    for (index, names) in per_item.iter().enumerate() {
        let items = draft.items_mut();
        items
            .insert(LineItem::new(
                format!("item {index}"),
                format!("IT-{index}"),
                "shirts",
                Decimal::from(10),
                5,
            ))
            .unwrap();
        for name in *names {
            items
                .add_pending_image(index, PendingImage::new(format!("/photos/{name}")))
                .unwrap();
        }
    }
    draft
}

fn submitter(store: &Arc<FakeStore>, transport: &Arc<FakeTransport>) -> Submitter {
    Submitter::new(store.clone(), transport.clone())
}

#[tokio::test]
async fn test_partial_upload_failure_keeps_order() {
    let store = Arc::new(FakeStore::default());
    let transport = Arc::new(FakeTransport::failing_on(&["b.jpg"]));
    let mut draft = draft_with_images(&[&["a.jpg", "b.jpg", "c.jpg"]]);

    let mut submitter = submitter(&store, &transport);
    let report = submitter.submit(&mut draft, None).await.unwrap();

    assert_eq!(report.outcome, SubmitOutcome::SucceededWithWarnings);
    assert_eq!(report.uploaded_count(), 2);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.failures[0].file_name, "b.jpg");
    assert!(report.failures[0].reason.contains("connection reset"));
    assert_eq!(submitter.state(), SubmitState::DoneWithWarnings);

    // Uploaded URLs are written back, the failed image stays pending
    let stored = store.payload(&report.order_id).unwrap();
    assert_eq!(stored.items[0].images.len(), 2);
    let images = draft.items().images_at(0);
    assert!(images[1].is_pending());
    assert!(!images[0].is_pending() && !images[2].is_pending());
}

#[tokio::test]
async fn test_persistence_failure_uploads_nothing() {
    let store = Arc::new(FakeStore::failing());
    let transport = Arc::new(FakeTransport::default());
    let mut draft = draft_with_images(&[&["a.jpg"]]);

    let mut submitter = submitter(&store, &transport);
    let err = submitter.submit(&mut draft, None).await.unwrap_err();

    assert!(matches!(err, SubmitError::PersistenceFailed(_)));
    assert!(err.is_retryable());
    assert!(transport.calls().is_empty());
    assert_eq!(submitter.state(), SubmitState::Failed);
}

#[tokio::test]
async fn test_validation_reports_every_violation() {
    let store = Arc::new(FakeStore::default());
    let transport = Arc::new(FakeTransport::default());
    let mut draft = OrderDraft::new(date());

    let mut submitter = submitter(&store, &transport);
    let err = submitter.submit(&mut draft, None).await.unwrap_err();

    let violations = err.violations();
    assert_eq!(violations.len(), 3);
    assert!(violations.contains(&Violation::NoLineItems));
    assert!(violations.contains(&Violation::LogisticsCompanyRequired));
    assert!(store.orders.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_uploads_run_in_item_then_image_order() {
    let store = Arc::new(FakeStore::default());
    let transport = Arc::new(FakeTransport::default());
    let mut draft = draft_with_images(&[&["a1.jpg", "a2.jpg"], &[], &["c1.jpg"]]);

    let report = submitter(&store, &transport)
        .submit(&mut draft, None)
        .await
        .unwrap();

    assert_eq!(report.outcome, SubmitOutcome::Success);
    assert_eq!(
        transport.calls(),
        vec![
            (0, "a1.jpg".to_string()),
            (0, "a2.jpg".to_string()),
            (2, "c1.jpg".to_string()),
        ]
    );
    assert!(draft.pending_uploads().is_empty());
}

#[tokio::test]
async fn test_progress_is_monotonic_and_completes() {
    let store = Arc::new(FakeStore::default());
    let transport = Arc::new(FakeTransport::default());
    let mut draft = draft_with_images(&[&["a.jpg", "b.jpg"]]);
    let (tx, mut rx) = mpsc::unbounded_channel();

    submitter(&store, &transport)
        .with_events(tx)
        .submit(&mut draft, None)
        .await
        .unwrap();

    let mut overall = Vec::new();
    let mut image_progress: HashMap<usize, Vec<u8>> = HashMap::new();
    let mut states = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event {
            SubmitEvent::Progress { percent } => overall.push(percent),
            SubmitEvent::Image {
                image_index,
                status: ImageStatus::Uploading | ImageStatus::Success,
                progress,
                ..
            } => image_progress.entry(image_index).or_default().push(progress),
            SubmitEvent::State { state } => states.push(state),
            SubmitEvent::Image { .. } => {}
        }
    }

    assert!(overall.windows(2).all(|w| w[0] <= w[1]), "{overall:?}");
    assert_eq!(overall.first(), Some(&20.0));
    assert_eq!(overall.last(), Some(&100.0));
    for progress in image_progress.values() {
        assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{progress:?}");
        assert_eq!(progress.last(), Some(&100));
    }
    assert_eq!(states.first(), Some(&SubmitState::Validating));
    assert_eq!(states.last(), Some(&SubmitState::Done));
}

#[tokio::test]
async fn test_cancel_skips_remaining_uploads() {
    let store = Arc::new(FakeStore::default());
    let cancel = CancelFlag::new();
    let transport = Arc::new(FakeTransport {
        cancel_after_first: Some(cancel.clone()),
        ..FakeTransport::default()
    });
    let mut draft = draft_with_images(&[&["a.jpg", "b.jpg", "c.jpg"]]);

    let report = submitter(&store, &transport)
        .with_cancel(cancel)
        .submit(&mut draft, None)
        .await
        .unwrap();

    // The upload in flight finishes, the rest never start
    assert_eq!(transport.calls().len(), 1);
    assert_eq!(report.uploaded_count(), 1);
    assert_eq!(report.skipped, 2);
    assert!(report.cancelled);
    assert_eq!(report.outcome, SubmitOutcome::SucceededWithWarnings);
    assert_eq!(draft.pending_uploads().len(), 2);
}

#[tokio::test]
async fn test_retry_uploads_only_pending_images() {
    let store = Arc::new(FakeStore::default());
    let flaky = Arc::new(FakeTransport::failing_on(&["b.jpg"]));
    let mut draft = draft_with_images(&[&["a.jpg", "b.jpg"]]);

    let first = submitter(&store, &flaky)
        .submit(&mut draft, None)
        .await
        .unwrap();
    assert_eq!(first.failed_count(), 1);

    let healthy = Arc::new(FakeTransport::default());
    let second = submitter(&store, &healthy)
        .retry_uploads(&first.order_id, &mut draft)
        .await
        .unwrap();

    assert_eq!(second.outcome, SubmitOutcome::Success);
    assert_eq!(healthy.calls(), vec![(0, "b.jpg".to_string())]);
    let stored = store.payload(&first.order_id).unwrap();
    assert_eq!(stored.items[0].images.len(), 2);
}

#[tokio::test]
async fn test_retry_unknown_order() {
    let store = Arc::new(FakeStore::default());
    let transport = Arc::new(FakeTransport::default());
    let mut draft = draft_with_images(&[&["a.jpg"]]);

    let err = submitter(&store, &transport)
        .retry_uploads(&OrderId::new("missing"), &mut draft)
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::OrderNotFound(_)));
}

#[tokio::test]
async fn test_update_refuses_locked_order() {
    let store = Arc::new(FakeStore::default());
    let transport = Arc::new(FakeTransport::default());
    let mut draft = draft_with_images(&[&[]]);
    store.insert("order-9", OrderStatus::Approved, draft.to_payload());

    let err = submitter(&store, &transport)
        .submit(&mut draft, Some(&OrderId::new("order-9")))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SubmitError::NotEditable {
            status: OrderStatus::Approved,
            ..
        }
    ));
    assert_eq!(*store.updates.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_update_existing_order_without_images() {
    let store = Arc::new(FakeStore::default());
    let transport = Arc::new(FakeTransport::default());
    let mut draft = draft_with_images(&[&[]]);
    store.insert("order-3", OrderStatus::Pending, draft.to_payload());
    draft.set_box_count(7);

    let report = submitter(&store, &transport)
        .submit(&mut draft, Some(&OrderId::new("order-3")))
        .await
        .unwrap();

    assert_eq!(report.order_id.as_str(), "order-3");
    assert_eq!(report.outcome, SubmitOutcome::Success);
    assert_eq!(store.payload(&report.order_id).unwrap().box_count, 7);
}
