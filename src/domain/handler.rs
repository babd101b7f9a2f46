use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::event::{OrderDelivered, OrderPaid, OrderPlaced, ReviewAdded};
use crate::domain::event_bus::{EventHandler, HandlerError};
use crate::domain::port::{Logger, ProductRepository};

/// 通知ハンドラー
/// 注文ライフサイクルの各イベントを受信して通知を送信する
#[derive(Clone)]
pub struct NotificationHandler {
    logger: Arc<dyn Logger>,
}

impl NotificationHandler {
    /// 新しい通知ハンドラーを作成
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }

    /// 通知メッセージを送信
    /// 実際の実装では外部通知サービス（メールなど）を呼び出し、
    /// ここではログ出力で代用する
    async fn send_notification(
        &self,
        message: &str,
        correlation_id: Uuid,
    ) -> Result<(), HandlerError> {
        let mut context = HashMap::new();
        context.insert("recipient".to_string(), "customer".to_string());

        self.logger.info(
            "NotificationHandler",
            message,
            Some(correlation_id),
            Some(context),
        );

        Ok(())
    }
}

#[async_trait]
impl EventHandler<OrderPlaced> for NotificationHandler {
    async fn handle(&self, event: OrderPlaced) -> Result<(), HandlerError> {
        let message = format!(
            "ご注文を受け付けました。注文ID: {}, 合計金額: {} {}",
            event.order_id,
            event.total_price.amount(),
            event.total_price.currency()
        );

        self.send_notification(&message, event.metadata.correlation_id)
            .await
    }
}

#[async_trait]
impl EventHandler<OrderPaid> for NotificationHandler {
    async fn handle(&self, event: OrderPaid) -> Result<(), HandlerError> {
        let message = format!(
            "お支払いを確認しました。注文ID: {}, レシートID: {}",
            event.order_id, event.receipt_id
        );

        self.send_notification(&message, event.metadata.correlation_id)
            .await
    }
}

#[async_trait]
impl EventHandler<OrderDelivered> for NotificationHandler {
    async fn handle(&self, event: OrderDelivered) -> Result<(), HandlerError> {
        let message = format!("ご注文の配達が完了しました。注文ID: {}", event.order_id);

        self.send_notification(&message, event.metadata.correlation_id)
            .await
    }
}

#[async_trait]
impl EventHandler<ReviewAdded> for NotificationHandler {
    async fn handle(&self, event: ReviewAdded) -> Result<(), HandlerError> {
        let message = format!(
            "レビューが投稿されました。商品ID: {}, 評価: {}",
            event.product_id, event.rating
        );

        self.send_notification(&message, event.metadata.correlation_id)
            .await
    }
}

/// 在庫低下アラートハンドラー
/// OrderPlacedイベントを受信し、残り在庫が閾値以下になった商品を警告する
pub struct LowStockAlertHandler {
    product_repository: Arc<dyn ProductRepository>,
    logger: Arc<dyn Logger>,
    threshold: u32,
}

impl LowStockAlertHandler {
    /// 新しい在庫低下アラートハンドラーを作成
    ///
    /// # Arguments
    /// * `product_repository` - 商品リポジトリ
    /// * `logger` - ロガー
    /// * `threshold` - この在庫数以下で警告を出す
    pub fn new(
        product_repository: Arc<dyn ProductRepository>,
        logger: Arc<dyn Logger>,
        threshold: u32,
    ) -> Self {
        Self {
            product_repository,
            logger,
            threshold,
        }
    }
}

#[async_trait]
impl EventHandler<OrderPlaced> for LowStockAlertHandler {
    async fn handle(&self, event: OrderPlaced) -> Result<(), HandlerError> {
        for line in &event.lines {
            let product = self
                .product_repository
                .find_by_id(line.product_id())
                .await
                .map_err(|e| HandlerError::RepositoryError(format!("商品取得エラー: {}", e)))?;

            let Some(product) = product else {
                // 注文後にカタログ側で削除された場合はスキップ
                continue;
            };

            if product.count_in_stock() <= self.threshold {
                let mut context = HashMap::new();
                context.insert("product_id".to_string(), product.id().to_string());
                context.insert(
                    "count_in_stock".to_string(),
                    product.count_in_stock().to_string(),
                );
                context.insert("threshold".to_string(), self.threshold.to_string());

                self.logger.warn(
                    "LowStockAlertHandler",
                    &format!(
                        "在庫が残りわずかです: {} (残り{}個)",
                        product.name(),
                        product.count_in_stock()
                    ),
                    Some(event.metadata.correlation_id),
                    Some(context),
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        Money, OrderId, OrderLine, Product, ProductId, RatingSummary, Review, UserId,
    };
    use crate::domain::port::RepositoryError;
    use rust_decimal_macros::dec;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Mutex;

    // テスト用のモックロガー
    // 警告メッセージを記録して検証できるようにする
    #[derive(Clone)]
    struct RecordingLogger {
        warnings: Arc<StdMutex<Vec<String>>>,
        infos: Arc<StdMutex<Vec<String>>>,
    }

    impl RecordingLogger {
        fn new() -> Self {
            Self {
                warnings: Arc::new(StdMutex::new(Vec::new())),
                infos: Arc::new(StdMutex::new(Vec::new())),
            }
        }

        fn warnings(&self) -> Vec<String> {
            self.warnings.lock().unwrap().clone()
        }

        fn infos(&self) -> Vec<String> {
            self.infos.lock().unwrap().clone()
        }
    }

    impl Logger for RecordingLogger {
        fn debug(
            &self,
            _component: &str,
            _message: &str,
            _correlation_id: Option<Uuid>,
            _context: Option<HashMap<String, String>>,
        ) {
        }

        fn info(
            &self,
            _component: &str,
            message: &str,
            _correlation_id: Option<Uuid>,
            _context: Option<HashMap<String, String>>,
        ) {
            self.infos.lock().unwrap().push(message.to_string());
        }

        fn warn(
            &self,
            _component: &str,
            message: &str,
            _correlation_id: Option<Uuid>,
            _context: Option<HashMap<String, String>>,
        ) {
            self.warnings.lock().unwrap().push(message.to_string());
        }

        fn error(
            &self,
            _component: &str,
            _message: &str,
            _correlation_id: Option<Uuid>,
            _context: Option<HashMap<String, String>>,
        ) {
        }
    }

    // テスト用のモック商品リポジトリ
    struct MockProductRepository {
        products: Mutex<std::collections::HashMap<ProductId, Product>>,
    }

    impl MockProductRepository {
        fn new() -> Self {
            Self {
                products: Mutex::new(std::collections::HashMap::new()),
            }
        }

        async fn insert(&self, product: Product) {
            let mut products = self.products.lock().await;
            products.insert(product.id(), product);
        }
    }

    #[async_trait]
    impl ProductRepository for MockProductRepository {
        async fn save(&self, product: &Product) -> Result<(), RepositoryError> {
            let mut products = self.products.lock().await;
            products.insert(product.id(), product.clone());
            Ok(())
        }

        async fn find_by_id(
            &self,
            product_id: ProductId,
        ) -> Result<Option<Product>, RepositoryError> {
            let products = self.products.lock().await;
            Ok(products.get(&product_id).cloned())
        }

        async fn find_all(&self) -> Result<Vec<Product>, RepositoryError> {
            let products = self.products.lock().await;
            Ok(products.values().cloned().collect())
        }

        async fn reserve_stock(
            &self,
            product_id: ProductId,
            quantity: u32,
        ) -> Result<Option<u32>, RepositoryError> {
            let mut products = self.products.lock().await;
            let product = products
                .get_mut(&product_id)
                .ok_or_else(|| RepositoryError::FetchFailed("product missing".to_string()))?;
            match product.reserve(quantity) {
                Ok(remaining) => Ok(Some(remaining)),
                Err(_) => Ok(None),
            }
        }

        async fn release_stock(
            &self,
            product_id: ProductId,
            quantity: u32,
        ) -> Result<u32, RepositoryError> {
            let mut products = self.products.lock().await;
            let product = products
                .get_mut(&product_id)
                .ok_or_else(|| RepositoryError::FetchFailed("product missing".to_string()))?;
            product
                .release(quantity)
                .map_err(|e| RepositoryError::OperationFailed(e.to_string()))
        }

        async fn add_review(
            &self,
            _product_id: ProductId,
            _review: &Review,
        ) -> Result<Option<RatingSummary>, RepositoryError> {
            unimplemented!("not used by these tests")
        }
    }

    fn placed_order_event(product: &Product, quantity: u32) -> OrderPlaced {
        let line = OrderLine::new(
            product.id(),
            product.name().to_string(),
            product.image().to_string(),
            quantity,
            product.price(),
        )
        .unwrap();
        OrderPlaced::new(
            OrderId::new(),
            UserId::new(),
            vec![line],
            Money::usd(dec!(100.00)),
        )
    }

    fn sample_product(stock: u32) -> Product {
        Product::new(
            ProductId::new(),
            "テスト商品".to_string(),
            "/images/item.jpg".to_string(),
            Money::usd(dec!(10.00)),
            stock,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_notification_handler_order_placed() {
        let logger = Arc::new(RecordingLogger::new());
        let handler = NotificationHandler::new(logger.clone());

        let product = sample_product(10);
        let event = placed_order_event(&product, 2);

        let result = handler.handle(event).await;
        assert!(result.is_ok());
        assert_eq!(logger.infos().len(), 1);
    }

    #[tokio::test]
    async fn test_notification_handler_order_paid() {
        let logger = Arc::new(RecordingLogger::new());
        let handler = NotificationHandler::new(logger.clone());

        let event = OrderPaid::new(
            OrderId::new(),
            UserId::new(),
            "CAPTURE-001".to_string(),
            Money::usd(dec!(272.50)),
        );

        let result = handler.handle(event).await;
        assert!(result.is_ok());
        assert!(logger.infos()[0].contains("CAPTURE-001"));
    }

    #[tokio::test]
    async fn test_notification_handler_order_delivered() {
        let logger = Arc::new(RecordingLogger::new());
        let handler = NotificationHandler::new(logger.clone());

        let event = OrderDelivered::new(OrderId::new());

        let result = handler.handle(event).await;
        assert!(result.is_ok());
        assert_eq!(logger.infos().len(), 1);
    }

    #[tokio::test]
    async fn test_low_stock_alert_emitted_below_threshold() {
        let repo = Arc::new(MockProductRepository::new());
        let logger = Arc::new(RecordingLogger::new());
        let handler = LowStockAlertHandler::new(repo.clone(), logger.clone(), 3);

        // 残り在庫2個の商品
        let product = sample_product(2);
        repo.insert(product.clone()).await;

        let event = placed_order_event(&product, 1);
        handler.handle(event).await.unwrap();

        let warnings = logger.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("テスト商品"));
    }

    #[tokio::test]
    async fn test_low_stock_alert_not_emitted_above_threshold() {
        let repo = Arc::new(MockProductRepository::new());
        let logger = Arc::new(RecordingLogger::new());
        let handler = LowStockAlertHandler::new(repo.clone(), logger.clone(), 3);

        let product = sample_product(50);
        repo.insert(product.clone()).await;

        let event = placed_order_event(&product, 1);
        handler.handle(event).await.unwrap();

        assert!(logger.warnings().is_empty());
    }

    #[tokio::test]
    async fn test_low_stock_alert_skips_missing_products() {
        let repo = Arc::new(MockProductRepository::new());
        let logger = Arc::new(RecordingLogger::new());
        let handler = LowStockAlertHandler::new(repo, logger.clone(), 3);

        // リポジトリに存在しない商品のイベント
        let product = sample_product(1);
        let event = placed_order_event(&product, 1);

        let result = handler.handle(event).await;
        assert!(result.is_ok());
        assert!(logger.warnings().is_empty());
    }
}
