use crate::application::ApplicationError;
use crate::domain::error::DomainError;
use crate::domain::event::DomainEvent;
use crate::domain::model::{
    Money, Order, OrderId, OrderLine, PaymentReceipt, Product, ProductId, RatingSummary, Review,
    ShippingAddress, UserId,
};
use crate::domain::port::{
    EventBus, Logger, OrderRepository, ProductRepository, SalesSummary,
};
use crate::domain::pricing::PricingPolicy;
use crate::domain::service::StockReservationService;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// 認証済みの呼び出し元
/// 認証コラボレーターが検証済みの識別子と管理者フラグを供給する。
/// このコアは資格情報を再検証せず、この識別子を信頼する
#[derive(Debug, Clone, Copy)]
pub struct Requester {
    /// 検証済みのユーザーID
    pub user_id: UserId,
    /// 管理者かどうか
    pub is_admin: bool,
}

impl Requester {
    /// 指定された注文にアクセスできるか（所有者または管理者）
    pub fn can_access(&self, order: &Order) -> bool {
        self.is_admin || order.user_id() == self.user_id
    }
}

/// 注文明細の指定
/// クライアントのカートから送信される(商品, 数量)ペア。
/// 価格はサーバー側で現在の商品価格からスナップショットされる
#[derive(Debug, Clone)]
pub struct OrderItemCommand {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// 注文作成コマンド
/// カートの内容を一括で注文に変換するための入力
#[derive(Debug, Clone)]
pub struct PlaceOrderCommand {
    pub items: Vec<OrderItemCommand>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    /// クライアントが表示していた合計金額（参考値）。
    /// サーバー計算が常に正となり、この値は比較・ログ出力にのみ使用される
    pub client_total: Option<Money>,
}

/// チェックアウトサービス
/// カート検証 → 在庫予約 → 注文作成 → 支払い確認 → 配達確認の
/// 制御フローを順序付ける
pub struct CheckoutService {
    order_repository: Arc<dyn OrderRepository>,
    product_repository: Arc<dyn ProductRepository>,
    stock_service: StockReservationService,
    pricing_policy: PricingPolicy,
    event_bus: Arc<dyn EventBus>,
    logger: Arc<dyn Logger>,
}

impl CheckoutService {
    /// 新しいチェックアウトサービスを作成
    pub fn new(
        order_repository: Arc<dyn OrderRepository>,
        product_repository: Arc<dyn ProductRepository>,
        pricing_policy: PricingPolicy,
        event_bus: Arc<dyn EventBus>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let stock_service = StockReservationService::new(product_repository.clone());
        Self {
            order_repository,
            product_repository,
            stock_service,
            pricing_policy,
            event_bus,
            logger,
        }
    }

    /// イベントに相関IDを設定するヘルパー関数
    fn set_correlation_id_to_event(mut event: DomainEvent, correlation_id: Uuid) -> DomainEvent {
        match &mut event {
            DomainEvent::OrderPlaced(ref mut e) => e.metadata.correlation_id = correlation_id,
            DomainEvent::OrderPaid(ref mut e) => e.metadata.correlation_id = correlation_id,
            DomainEvent::OrderDelivered(ref mut e) => e.metadata.correlation_id = correlation_id,
            DomainEvent::ReviewAdded(ref mut e) => e.metadata.correlation_id = correlation_id,
        }
        event
    }

    /// ドメインイベントを発行する
    /// 発行の失敗は確定済みの状態変更を巻き戻さない（ログに記録して続行）
    async fn publish_events(&self, events: Vec<DomainEvent>, correlation_id: Uuid) {
        for event in events {
            let event = Self::set_correlation_id_to_event(event, correlation_id);
            if let Err(e) = self.event_bus.publish(event).await {
                self.logger.error(
                    "CheckoutService",
                    &format!("イベント発行に失敗: {}", e),
                    Some(correlation_id),
                    None,
                );
            }
        }
    }

    /// カートの内容から新しい注文を作成
    ///
    /// 1. 明細が空でないことを検証（EmptyOrder）
    /// 2. 同一商品の明細をマージし、現在の商品情報から
    ///    価格・名前・画像のスナップショットを作成
    /// 3. 各明細の在庫を予約（失敗時は予約済み分を補償解放して
    ///    InsufficientStockを伝播）
    /// 4. サーバー側で価格を再計算（クライアント送信の合計は無視）
    /// 5. Created状態の注文を永続化
    ///
    /// # Returns
    /// * `Ok(Order)` - 作成された注文
    pub async fn place_order(
        &self,
        requester: Requester,
        command: PlaceOrderCommand,
    ) -> Result<Order, ApplicationError> {
        if command.items.is_empty() {
            return Err(DomainError::EmptyOrder.into());
        }

        let correlation_id = Uuid::new_v4();

        // 同一商品の明細をマージしながらスナップショットを構築
        let mut lines: Vec<OrderLine> = Vec::new();
        for item in &command.items {
            if let Some(existing) = lines
                .iter_mut()
                .find(|line| line.product_id() == item.product_id)
            {
                existing.increase_quantity(item.quantity)?;
                continue;
            }

            let product = self
                .product_repository
                .find_by_id(item.product_id)
                .await?
                .ok_or_else(|| {
                    ApplicationError::NotFound(format!(
                        "商品が見つかりません: {}",
                        item.product_id
                    ))
                })?;

            lines.push(OrderLine::new(
                product.id(),
                product.name().to_string(),
                product.image().to_string(),
                item.quantity,
                product.price(),
            )?);
        }

        // 在庫を予約（部分失敗時はサービス内で補償解放済み）
        self.stock_service.reserve_for_lines(&lines).await?;

        // サーバー側の価格計算が正。クライアント値との差異は記録のみ
        let pricing = match self.pricing_policy.price(&lines) {
            Ok(pricing) => pricing,
            Err(e) => {
                self.release_with_logging(&lines, correlation_id).await;
                return Err(e.into());
            }
        };

        if let Some(client_total) = command.client_total {
            if client_total != pricing.total_price() {
                let mut context = HashMap::new();
                context.insert(
                    "client_total".to_string(),
                    client_total.amount().to_string(),
                );
                context.insert(
                    "server_total".to_string(),
                    pricing.total_price().amount().to_string(),
                );
                self.logger.warn(
                    "CheckoutService",
                    "クライアント送信の合計金額がサーバー計算と一致しません。サーバー値で上書きします",
                    Some(correlation_id),
                    Some(context),
                );
            }
        }

        let order_id = self.order_repository.next_identity();
        let mut order = match Order::place(
            order_id,
            requester.user_id,
            lines.clone(),
            command.shipping_address,
            command.payment_method,
            pricing,
        ) {
            Ok(order) => order,
            Err(e) => {
                self.release_with_logging(&lines, correlation_id).await;
                return Err(e.into());
            }
        };

        if let Err(save_err) = self.order_repository.save(&order).await {
            self.release_with_logging(&lines, correlation_id).await;
            return Err(save_err.into());
        }

        let events = order.take_domain_events();
        self.publish_events(events, correlation_id).await;

        Ok(order)
    }

    /// 予約済み在庫を解放し、失敗はログに記録する
    /// 予約後の後続ステップが失敗した場合の補償処理
    async fn release_with_logging(&self, lines: &[OrderLine], correlation_id: Uuid) {
        if let Err(release_err) = self.stock_service.release_for_lines(lines).await {
            self.logger.error(
                "CheckoutService",
                &format!("在庫の補償解放に失敗: {}", release_err),
                Some(correlation_id),
                None,
            );
        }
    }

    /// 注文を支払い済みにマーク
    ///
    /// 外部決済プロセッサーのキャプチャレシートを検証してから状態遷移する:
    /// - レシートのステータスが成功であること（PaymentRejected）
    /// - キャプチャ金額が注文合計と一致すること（PaymentAmountMismatch）
    /// - まだ支払われていないこと（AlreadyPaid、リトライは何も変更しない）
    pub async fn pay_order(
        &self,
        order_id: OrderId,
        requester: Requester,
        receipt: PaymentReceipt,
    ) -> Result<Order, ApplicationError> {
        let mut order = self
            .order_repository
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| {
                ApplicationError::NotFound(format!("注文が見つかりません: {}", order_id))
            })?;

        if !requester.can_access(&order) {
            return Err(ApplicationError::Forbidden(
                "この注文への支払い確認を行う権限がありません".to_string(),
            ));
        }

        if !receipt.is_successful() {
            return Err(DomainError::PaymentRejected(receipt.status().to_string()).into());
        }

        if receipt.amount() != order.pricing().total_price() {
            return Err(DomainError::PaymentAmountMismatch.into());
        }

        order.mark_paid(receipt)?;
        self.order_repository.save(&order).await?;

        let correlation_id = Uuid::new_v4();
        let events = order.take_domain_events();
        self.publish_events(events, correlation_id).await;

        Ok(order)
    }

    /// 注文を配達完了にマーク
    /// 管理者限定の操作（認可はRESTバウンダリで実施される）
    pub async fn mark_delivered(&self, order_id: OrderId) -> Result<Order, ApplicationError> {
        let mut order = self
            .order_repository
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| {
                ApplicationError::NotFound(format!("注文が見つかりません: {}", order_id))
            })?;

        order.mark_delivered()?;
        self.order_repository.save(&order).await?;

        let correlation_id = Uuid::new_v4();
        let events = order.take_domain_events();
        self.publish_events(events, correlation_id).await;

        Ok(order)
    }

    /// 注文IDで注文を取得
    /// 所有者または管理者のみ読み取り可能
    ///
    /// # Returns
    /// * `Ok(Some(Order))` - 注文が見つかった
    /// * `Ok(None)` - 注文が見つからなかった
    /// * `Err(ApplicationError::Forbidden)` - アクセス権がない
    pub async fn get_order(
        &self,
        order_id: OrderId,
        requester: Requester,
    ) -> Result<Option<Order>, ApplicationError> {
        let order = self.order_repository.find_by_id(order_id).await?;

        match order {
            Some(order) if !requester.can_access(&order) => Err(ApplicationError::Forbidden(
                "この注文を閲覧する権限がありません".to_string(),
            )),
            other => Ok(other),
        }
    }

    /// 呼び出し元自身の注文を取得
    /// 作成日時の降順で並べて返す
    pub async fn list_my_orders(&self, requester: Requester) -> Result<Vec<Order>, ApplicationError> {
        self.order_repository
            .find_by_user(requester.user_id)
            .await
            .map_err(ApplicationError::from)
    }

    /// 支払い済み注文の売上集計を取得（管理者限定の導出リード）
    pub async fn total_sales(&self) -> Result<SalesSummary, ApplicationError> {
        self.order_repository
            .paid_sales_summary()
            .await
            .map_err(ApplicationError::from)
    }
}

/// レビューサービス
/// レビューの追加と評価集計の一貫性を担当する
pub struct ReviewService {
    product_repository: Arc<dyn ProductRepository>,
    event_bus: Arc<dyn EventBus>,
    logger: Arc<dyn Logger>,
}

impl ReviewService {
    /// 新しいレビューサービスを作成
    pub fn new(
        product_repository: Arc<dyn ProductRepository>,
        event_bus: Arc<dyn EventBus>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            product_repository,
            event_bus,
            logger,
        }
    }

    /// 商品にレビューを追加
    ///
    /// レビューの追記と評価集計（平均・件数）の再計算は
    /// リポジトリ層で1つのアトミックな更新として実行される
    ///
    /// # Returns
    /// * `Ok(RatingSummary)` - 更新後の集計値
    /// * `Err(DomainError::InvalidRating)` - 評価値が1〜5の範囲外
    /// * `Err(DomainError::DuplicateReview)` - 同一ユーザーの重複レビュー
    pub async fn add_review(
        &self,
        product_id: ProductId,
        requester: Requester,
        reviewer_name: String,
        rating: u8,
        comment: String,
    ) -> Result<RatingSummary, ApplicationError> {
        let review = Review::new(requester.user_id, reviewer_name, rating, comment)?;

        // 商品の存在確認
        self.product_repository
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| {
                ApplicationError::NotFound(format!("商品が見つかりません: {}", product_id))
            })?;

        let summary = self
            .product_repository
            .add_review(product_id, &review)
            .await?
            .ok_or(DomainError::DuplicateReview)?;

        let correlation_id = Uuid::new_v4();
        let event = crate::domain::event::ReviewAdded::new(
            product_id,
            requester.user_id,
            review.rating(),
        );
        let event = CheckoutService::set_correlation_id_to_event(
            DomainEvent::ReviewAdded(event),
            correlation_id,
        );
        if let Err(e) = self.event_bus.publish(event).await {
            self.logger.error(
                "ReviewService",
                &format!("イベント発行に失敗: {}", e),
                Some(correlation_id),
                None,
            );
        }

        Ok(summary)
    }
}

/// カタログサービス
/// 商品の登録と読み取り。本来のカタログ管理は外部コラボレーターであり、
/// ここではこのコアが必要とする最小限の操作のみを提供する
pub struct CatalogService {
    product_repository: Arc<dyn ProductRepository>,
}

impl CatalogService {
    /// 新しいカタログサービスを作成
    pub fn new(product_repository: Arc<dyn ProductRepository>) -> Self {
        Self { product_repository }
    }

    /// 新しい商品を登録
    pub async fn create_product(
        &self,
        name: String,
        image: String,
        price: Money,
        count_in_stock: u32,
    ) -> Result<Product, ApplicationError> {
        let product = Product::new(ProductId::new(), name, image, price, count_in_stock)?;
        self.product_repository.save(&product).await?;
        Ok(product)
    }

    /// 商品IDで商品を取得（レビュー込み）
    pub async fn get_product(
        &self,
        product_id: ProductId,
    ) -> Result<Option<Product>, ApplicationError> {
        self.product_repository
            .find_by_id(product_id)
            .await
            .map_err(ApplicationError::from)
    }

    /// すべての商品を取得
    pub async fn list_products(&self) -> Result<Vec<Product>, ApplicationError> {
        self.product_repository
            .find_all()
            .await
            .map_err(ApplicationError::from)
    }
}
