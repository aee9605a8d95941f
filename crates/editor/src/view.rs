use crate::error::EditorError;
use crate::format::format_number;
use api_client::{ApiError, ProductApi};
use core_types::{Product, ProductField, ProductPatch, ProductQuery};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Quiet period after the last keystroke before a field is saved.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    /// Holds the message shown next to the retry action.
    Failed(String),
}

/// Saves are debounced per product and field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SaveKey {
    pub id: i32,
    pub field: ProductField,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved(SaveKey),
    Failed {
        key: SaveKey,
        error: String,
        /// Whether the field went back to its last saved value.
        rolled_back: bool,
    },
}

struct SaveReport {
    key: SaveKey,
    generation: u64,
    result: Result<Product, ApiError>,
}

struct PendingSave {
    generation: u64,
    /// Dropping or firing this ends the task while it still waits out the debounce.
    cancel: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// The editable price list.
///
/// Edits land in the local rows at once. Each (product, field) pair gets its
/// own timer task; a new keystroke cancels the old timer and starts another.
/// A request that already left is never cancelled: it runs to completion and
/// reports like any other save, and generations tell stale reports apart.
/// Finished saves report back over a channel and are applied by
/// [`process_outcomes`](Self::process_outcomes) or [`flush`](Self::flush).
pub struct PriceListView {
    api: Arc<dyn ProductApi>,
    debounce: Duration,
    state: LoadState,
    rows: Vec<Product>,
    /// Last values the server acknowledged, used for rollback.
    confirmed: HashMap<i32, Product>,
    selected: Option<i32>,
    pending: HashMap<SaveKey, PendingSave>,
    /// Replaced saves whose request may still be in flight.
    superseded: Vec<JoinHandle<()>>,
    generation: u64,
    reports_tx: mpsc::UnboundedSender<SaveReport>,
    reports_rx: mpsc::UnboundedReceiver<SaveReport>,
}

impl PriceListView {
    pub fn new(api: Arc<dyn ProductApi>) -> Self {
        Self::with_debounce(api, SAVE_DEBOUNCE)
    }

    pub fn with_debounce(api: Arc<dyn ProductApi>, debounce: Duration) -> Self {
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        Self {
            api,
            debounce,
            state: LoadState::Loading,
            rows: Vec::new(),
            confirmed: HashMap::new(),
            selected: None,
            pending: HashMap::new(),
            superseded: Vec::new(),
            generation: 0,
            reports_tx,
            reports_rx,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn products(&self) -> &[Product] {
        &self.rows
    }

    pub fn product(&self, id: i32) -> Option<&Product> {
        self.rows.iter().find(|p| p.id == id)
    }

    pub fn selected(&self) -> Option<i32> {
        self.selected
    }

    /// Number of debounced saves that have not reported back yet.
    pub fn pending_saves(&self) -> usize {
        self.pending.len()
    }

    /// Fetches the first page of products. Calling it again is the retry action.
    ///
    /// Outstanding saves are flushed first so the fresh rows include them.
    pub async fn load(&mut self) -> &LoadState {
        if !self.pending.is_empty() || !self.superseded.is_empty() {
            self.flush().await;
        }
        self.state = LoadState::Loading;

        match self.api.list_products(&ProductQuery::default()).await {
            Ok(list) => {
                self.confirmed = list
                    .products
                    .iter()
                    .map(|p| (p.id, p.clone()))
                    .collect();
                self.rows = list.products;
                if self.selected.is_some_and(|id| !self.confirmed.contains_key(&id)) {
                    self.selected = None;
                }
                tracing::info!(count = self.rows.len(), total = list.total, "Products loaded.");
                self.state = LoadState::Ready;
            }
            Err(err) => {
                tracing::error!(error = %err, "Error loading products.");
                let message = match err {
                    ApiError::Server { .. } => "Failed to load products",
                    _ => "Failed to connect to server",
                };
                self.state = LoadState::Failed(message.to_string());
            }
        }
        &self.state
    }

    /// A keystroke in an edit box: update the row now, save after the quiet period.
    pub fn input(&mut self, id: i32, field: ProductField, raw: &str) -> Result<(), EditorError> {
        let patch = self.apply_local(id, field, raw)?;
        let key = SaveKey { id, field };
        self.cancel(key);
        let generation = self.next_generation();

        let api = Arc::clone(&self.api);
        let reports = self.reports_tx.clone();
        let delay = self.debounce;
        let (cancel, cancelled) = oneshot::channel();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancelled => return,
            }
            let result = api.update_product(key.id, &patch).await;
            // The receiver is gone only when the view was dropped.
            let _ = reports.send(SaveReport {
                key,
                generation,
                result,
            });
        });

        self.pending.insert(
            key,
            PendingSave {
                generation,
                cancel,
                handle,
            },
        );
        Ok(())
    }

    /// Enter in an edit box: drop the pending timer and save right away.
    pub async fn enter(
        &mut self,
        id: i32,
        field: ProductField,
        raw: &str,
    ) -> Result<SaveOutcome, EditorError> {
        let patch = self.apply_local(id, field, raw)?;
        let key = SaveKey { id, field };
        self.cancel(key);
        let generation = self.next_generation();

        let result = self.api.update_product(id, &patch).await;
        Ok(self.settle(SaveReport {
            key,
            generation,
            result,
        }))
    }

    /// The text an edit box shows once it loses focus.
    pub fn blur(&self, id: i32, field: ProductField) -> Result<String, EditorError> {
        let row = self.product(id).ok_or(EditorError::UnknownProduct(id))?;
        Ok(match field {
            ProductField::InPrice => format_number(row.in_price),
            ProductField::Price => format_number(row.price),
            ProductField::InStock => format_number(Decimal::from(row.in_stock)),
            _ => row.field_text(field),
        })
    }

    /// Toggles the selection arrow of a row and returns the new selection.
    pub fn select(&mut self, id: i32) -> Option<i32> {
        self.selected = if self.selected == Some(id) {
            None
        } else {
            Some(id)
        };
        self.selected
    }

    /// Applies the saves that have finished so far.
    pub fn process_outcomes(&mut self) -> Vec<SaveOutcome> {
        self.superseded.retain(|handle| !handle.is_finished());
        let mut outcomes = Vec::new();
        while let Ok(report) = self.reports_rx.try_recv() {
            outcomes.push(self.settle(report));
        }
        outcomes
    }

    /// Waits for every pending and in-flight save, then applies their outcomes.
    pub async fn flush(&mut self) -> Vec<SaveOutcome> {
        let mut superseded = std::mem::take(&mut self.superseded);
        let handles = superseded
            .iter_mut()
            .chain(self.pending.values_mut().map(|save| &mut save.handle));
        for handle in handles {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    tracing::error!(error = %err, "Save task panicked.");
                }
            }
        }
        let outcomes = self.process_outcomes();
        // Only saves whose task died without reporting are left.
        self.pending.clear();
        outcomes
    }

    fn apply_local(
        &mut self,
        id: i32,
        field: ProductField,
        raw: &str,
    ) -> Result<ProductPatch, EditorError> {
        let row = self
            .rows
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(EditorError::UnknownProduct(id))?;
        let patch = ProductPatch::from_input(field, raw)?;
        row.merge_patch(&patch);
        Ok(patch)
    }

    /// Stops the timer of `key`. A request already sent keeps running.
    fn cancel(&mut self, key: SaveKey) {
        if let Some(save) = self.pending.remove(&key) {
            let _ = save.cancel.send(());
            self.superseded.push(save.handle);
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn settle(&mut self, report: SaveReport) -> SaveOutcome {
        let key = report.key;
        let newer_pending = match self.pending.get(&key) {
            Some(save) if save.generation == report.generation => {
                self.pending.remove(&key);
                false
            }
            Some(save) => save.generation > report.generation,
            None => false,
        };

        match report.result {
            Ok(product) => {
                if let Some(row) = self.rows.iter_mut().find(|p| p.id == product.id) {
                    row.updated_at = product.updated_at;
                }
                self.confirmed.insert(product.id, product);
                SaveOutcome::Saved(key)
            }
            Err(err) => {
                tracing::error!(id = key.id, field = %key.field, error = %err, "Failed to update product.");
                let rolled_back = !newer_pending && self.rollback(key);
                SaveOutcome::Failed {
                    key,
                    error: err.to_string(),
                    rolled_back,
                }
            }
        }
    }

    fn rollback(&mut self, key: SaveKey) -> bool {
        let Some(confirmed) = self.confirmed.get(&key.id) else {
            return false;
        };
        let Some(row) = self.rows.iter_mut().find(|p| p.id == key.id) else {
            return false;
        };
        row.copy_field_from(confirmed, key.field);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::ProductList;
    use async_trait::async_trait;
    use chrono::Utc;
    use core_types::{BulkItemResult, BulkUpdateItem, HealthReport, NewProduct};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockApi {
        rows: Mutex<Vec<Product>>,
        saves: Mutex<Vec<(i32, ProductPatch)>>,
        fail_saves: AtomicBool,
        /// Time a successful save takes to answer after it has committed.
        save_latency: Mutex<Duration>,
        list_failure: Mutex<Option<ApiError>>,
    }

    impl MockApi {
        fn with_rows(rows: Vec<Product>) -> Arc<Self> {
            Arc::new(Self {
                rows: Mutex::new(rows),
                ..Self::default()
            })
        }

        fn saves(&self) -> Vec<(i32, ProductPatch)> {
            self.saves.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProductApi for MockApi {
        async fn list_products(&self, _query: &ProductQuery) -> Result<ProductList, ApiError> {
            if let Some(err) = self.list_failure.lock().unwrap().take() {
                return Err(err);
            }
            let products = self.rows.lock().unwrap().clone();
            Ok(ProductList {
                total: products.len() as i64,
                products,
                limit: 50,
                offset: 0,
            })
        }

        async fn get_product(&self, _id: i32) -> Result<Product, ApiError> {
            unreachable!()
        }

        async fn create_product(&self, _product: &NewProduct) -> Result<Product, ApiError> {
            unreachable!()
        }

        async fn update_product(&self, id: i32, patch: &ProductPatch) -> Result<Product, ApiError> {
            self.saves.lock().unwrap().push((id, patch.clone()));
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(ApiError::Server {
                    status: 500,
                    message: "Failed to update product".into(),
                    details: Vec::new(),
                });
            }
            let changes = patch.clone().validate().map_err(|e| ApiError::Server {
                status: 400,
                message: "Validation failed".into(),
                details: e.into_errors(),
            })?;
            let saved = {
                let mut rows = self.rows.lock().unwrap();
                let row = rows.iter_mut().find(|p| p.id == id).unwrap();
                row.apply(&changes);
                row.clone()
            };
            let latency = *self.save_latency.lock().unwrap();
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            Ok(saved)
        }

        async fn delete_product(&self, _id: i32) -> Result<(), ApiError> {
            unreachable!()
        }

        async fn bulk_update(
            &self,
            _items: &[BulkUpdateItem],
        ) -> Result<Vec<BulkItemResult>, ApiError> {
            unreachable!()
        }

        async fn health(&self) -> Result<HealthReport, ApiError> {
            Ok(HealthReport::healthy())
        }
    }

    fn product(id: i32, article_no: &str) -> Product {
        let now = Utc::now();
        Product {
            id,
            article_no: article_no.into(),
            product_service: "Widget".into(),
            in_price: dec!(50.00),
            price: dec!(100.00),
            unit: "pieces".into(),
            in_stock: 4,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn loaded(api: &Arc<MockApi>) -> PriceListView {
        let mut view = PriceListView::new(api.clone());
        assert_eq!(view.load().await, &LoadState::Ready);
        view
    }

    #[tokio::test(start_paused = true)]
    async fn keystrokes_within_the_quiet_period_make_one_save() {
        let api = MockApi::with_rows(vec![product(1, "A")]);
        let mut view = loaded(&api).await;

        view.input(1, ProductField::Price, "1").unwrap();
        tokio::time::sleep(Duration::from_millis(700)).await;
        view.input(1, ProductField::Price, "12").unwrap();
        tokio::time::sleep(Duration::from_millis(700)).await;
        view.input(1, ProductField::Price, "123").unwrap();
        assert!(api.saves().is_empty());
        assert_eq!(view.product(1).unwrap().price, dec!(123));

        let outcomes = view.flush().await;
        assert_eq!(
            outcomes,
            vec![SaveOutcome::Saved(SaveKey {
                id: 1,
                field: ProductField::Price
            })]
        );
        assert_eq!(api.saves(), vec![(1, ProductPatch::new().price(dec!(123)))]);
        assert_eq!(view.pending_saves(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn save_fires_after_the_quiet_period() {
        let api = MockApi::with_rows(vec![product(1, "A")]);
        let mut view = loaded(&api).await;

        view.input(1, ProductField::Unit, "kg").unwrap();
        tokio::time::sleep(Duration::from_millis(799)).await;
        assert!(api.saves().is_empty());
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(api.saves().len(), 1);

        let outcomes = view.process_outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(view.pending_saves(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn different_fields_and_products_save_independently() {
        let api = MockApi::with_rows(vec![product(1, "A"), product(2, "B")]);
        let mut view = loaded(&api).await;

        view.input(1, ProductField::Price, "5").unwrap();
        view.input(1, ProductField::Unit, "kg").unwrap();
        view.input(2, ProductField::Price, "7").unwrap();
        assert_eq!(view.pending_saves(), 3);

        let outcomes = view.flush().await;
        assert_eq!(outcomes.len(), 3);
        let mut saves = api.saves();
        saves.sort_by_key(|(id, patch)| (*id, patch.unit.is_some()));
        assert_eq!(
            saves,
            vec![
                (1, ProductPatch::new().price(dec!(5))),
                (1, ProductPatch::new().unit("kg")),
                (2, ProductPatch::new().price(dec!(7))),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn enter_cancels_the_timer_and_saves_at_once() {
        let api = MockApi::with_rows(vec![product(1, "A")]);
        let mut view = loaded(&api).await;

        view.input(1, ProductField::InStock, "5").unwrap();
        let outcome = view.enter(1, ProductField::InStock, "7").await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Saved(_)));
        assert_eq!(api.saves(), vec![(1, ProductPatch::new().in_stock(7))]);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(api.saves().len(), 1);
        assert!(view.flush().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn numeric_input_keeps_digits_only() {
        let api = MockApi::with_rows(vec![product(1, "A")]);
        let mut view = loaded(&api).await;

        view.input(1, ProductField::InStock, "1 2a").unwrap();
        assert_eq!(view.product(1).unwrap().in_stock, 12);

        view.input(1, ProductField::Price, "kr 1 234 567").unwrap();
        assert_eq!(view.blur(1, ProductField::Price).unwrap(), "1\u{a0}234\u{a0}567");

        view.input(1, ProductField::InPrice, "").unwrap();
        assert_eq!(view.blur(1, ProductField::InPrice).unwrap(), "");
        assert_eq!(view.blur(1, ProductField::ArticleNo).unwrap(), "A");
        view.flush().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_rolls_back_to_the_saved_value() {
        let api = MockApi::with_rows(vec![product(1, "A")]);
        let mut view = loaded(&api).await;
        api.fail_saves.store(true, Ordering::SeqCst);

        view.input(1, ProductField::Price, "250").unwrap();
        let outcomes = view.flush().await;

        assert!(matches!(
            outcomes.as_slice(),
            [SaveOutcome::Failed { rolled_back: true, .. }]
        ));
        assert_eq!(view.product(1).unwrap().price, dec!(100.00));
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_text_is_rolled_back_too() {
        let api = MockApi::with_rows(vec![product(1, "A")]);
        let mut view = loaded(&api).await;

        let outcome = view.enter(1, ProductField::ArticleNo, "  ").await.unwrap();
        let SaveOutcome::Failed { error, rolled_back, .. } = outcome else {
            panic!("blank article number was accepted");
        };
        assert_eq!(error, "Validation failed");
        assert!(rolled_back);
        assert_eq!(view.product(1).unwrap().article_no, "A");
    }

    #[tokio::test(start_paused = true)]
    async fn failure_does_not_undo_a_newer_edit() {
        let api = MockApi::with_rows(vec![product(1, "A")]);
        let mut view = loaded(&api).await;
        api.fail_saves.store(true, Ordering::SeqCst);

        view.input(1, ProductField::Price, "1").unwrap();
        tokio::time::sleep(Duration::from_millis(801)).await;
        view.input(1, ProductField::Price, "2").unwrap();

        let outcomes = view.process_outcomes();
        assert!(matches!(
            outcomes.as_slice(),
            [SaveOutcome::Failed { rolled_back: false, .. }]
        ));
        assert_eq!(view.product(1).unwrap().price, dec!(2));
        assert_eq!(view.pending_saves(), 1);

        api.fail_saves.store(false, Ordering::SeqCst);
        let outcomes = view.flush().await;
        assert!(matches!(outcomes.as_slice(), [SaveOutcome::Saved(_)]));
        assert_eq!(view.product(1).unwrap().price, dec!(2));
    }

    #[tokio::test(start_paused = true)]
    async fn a_new_keystroke_does_not_cancel_a_save_in_flight() {
        let api = MockApi::with_rows(vec![product(1, "A")]);
        *api.save_latency.lock().unwrap() = Duration::from_millis(500);
        let mut view = loaded(&api).await;

        view.input(1, ProductField::Price, "200").unwrap();
        // The first save has committed and is waiting for its answer.
        tokio::time::sleep(Duration::from_millis(900)).await;
        api.fail_saves.store(true, Ordering::SeqCst);
        view.input(1, ProductField::Price, "300").unwrap();
        assert_eq!(view.product(1).unwrap().price, dec!(300));

        let outcomes = view.flush().await;
        let key = SaveKey {
            id: 1,
            field: ProductField::Price,
        };
        assert!(matches!(
            outcomes.as_slice(),
            [
                SaveOutcome::Saved(saved),
                SaveOutcome::Failed { key: failed, rolled_back: true, .. },
            ] if *saved == key && *failed == key
        ));
        assert_eq!(api.saves().len(), 2);
        assert_eq!(api.rows.lock().unwrap()[0].price, dec!(200));
        assert_eq!(view.product(1).unwrap().price, dec!(200));
        assert_eq!(view.pending_saves(), 0);
    }

    #[tokio::test]
    async fn load_failures_offer_a_retry() {
        let api = MockApi::with_rows(vec![product(1, "A")]);
        *api.list_failure.lock().unwrap() = Some(ApiError::Server {
            status: 500,
            message: "Failed to fetch products".into(),
            details: Vec::new(),
        });
        let mut view = PriceListView::new(api.clone());
        assert_eq!(
            view.load().await,
            &LoadState::Failed("Failed to load products".into())
        );
        assert!(view.products().is_empty());

        assert_eq!(view.load().await, &LoadState::Ready);
        assert_eq!(view.products().len(), 1);

        *api.list_failure.lock().unwrap() =
            Some(ApiError::Deserialization("unexpected end of input".into()));
        assert_eq!(
            view.load().await,
            &LoadState::Failed("Failed to connect to server".into())
        );
    }

    #[tokio::test]
    async fn select_toggles_a_single_row() {
        let api = MockApi::with_rows(vec![product(1, "A"), product(2, "B")]);
        let mut view = loaded(&api).await;

        assert_eq!(view.select(1), Some(1));
        assert_eq!(view.select(2), Some(2));
        assert_eq!(view.select(2), None);
        assert_eq!(view.selected(), None);
    }

    #[tokio::test]
    async fn unknown_rows_are_rejected() {
        let api = MockApi::with_rows(vec![product(1, "A")]);
        let mut view = loaded(&api).await;

        assert!(matches!(
            view.input(9, ProductField::Price, "1"),
            Err(EditorError::UnknownProduct(9))
        ));
        assert!(matches!(
            view.blur(9, ProductField::Price),
            Err(EditorError::UnknownProduct(9))
        ));
        assert!(matches!(
            view.input(1, ProductField::InStock, "99999999999"),
            Err(EditorError::Input(_))
        ));
        assert_eq!(view.pending_saves(), 0);
    }
}
