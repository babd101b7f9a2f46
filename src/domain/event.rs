use crate::domain::model::{Money, OrderId, OrderLine, ProductId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// イベントメタデータ
/// イベントの一意識別子と、リクエスト単位の処理を追跡する相関IDを保持する
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// イベントの一意識別子
    pub event_id: Uuid,
    /// 相関ID（同一リクエストに由来するイベントとログを紐付ける）
    pub correlation_id: Uuid,
    /// イベント発生日時
    pub occurred_at: DateTime<Utc>,
}

impl EventMetadata {
    /// 新しいメタデータを作成
    /// 相関IDは発行時に上書きされるまでイベントIDと同じ値を持つ
    pub fn new() -> Self {
        let event_id = Uuid::new_v4();
        Self {
            event_id,
            correlation_id: event_id,
            occurred_at: Utc::now(),
        }
    }
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// ドメインイベント列挙型
/// ビジネス上の重要なイベントを表現する
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// 注文が作成された（在庫予約済み）
    OrderPlaced(OrderPlaced),
    /// 注文の支払いが確認された
    OrderPaid(OrderPaid),
    /// 注文が配達完了した
    OrderDelivered(OrderDelivered),
    /// 商品にレビューが追加された
    ReviewAdded(ReviewAdded),
}

impl DomainEvent {
    /// イベントメタデータへの参照を取得
    pub fn metadata(&self) -> &EventMetadata {
        match self {
            DomainEvent::OrderPlaced(e) => &e.metadata,
            DomainEvent::OrderPaid(e) => &e.metadata,
            DomainEvent::OrderDelivered(e) => &e.metadata,
            DomainEvent::ReviewAdded(e) => &e.metadata,
        }
    }

    /// イベント種別名を取得
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::OrderPlaced(_) => "OrderPlaced",
            DomainEvent::OrderPaid(_) => "OrderPaid",
            DomainEvent::OrderDelivered(_) => "OrderDelivered",
            DomainEvent::ReviewAdded(_) => "ReviewAdded",
        }
    }
}

/// 注文作成イベント
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlaced {
    /// 注文ID
    pub order_id: OrderId,
    /// 注文者のユーザーID
    pub user_id: UserId,
    /// 注文明細のリスト（在庫予約済み）
    pub lines: Vec<OrderLine>,
    /// 合計金額
    pub total_price: Money,
    /// イベントメタデータ
    pub metadata: EventMetadata,
}

impl OrderPlaced {
    /// 新しい注文作成イベントを作成
    pub fn new(order_id: OrderId, user_id: UserId, lines: Vec<OrderLine>, total_price: Money) -> Self {
        Self {
            order_id,
            user_id,
            lines,
            total_price,
            metadata: EventMetadata::new(),
        }
    }
}

/// 支払い確認イベント
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPaid {
    /// 注文ID
    pub order_id: OrderId,
    /// 注文者のユーザーID
    pub user_id: UserId,
    /// 決済レシートID
    pub receipt_id: String,
    /// 支払い金額
    pub total_price: Money,
    /// イベントメタデータ
    pub metadata: EventMetadata,
}

impl OrderPaid {
    /// 新しい支払い確認イベントを作成
    pub fn new(order_id: OrderId, user_id: UserId, receipt_id: String, total_price: Money) -> Self {
        Self {
            order_id,
            user_id,
            receipt_id,
            total_price,
            metadata: EventMetadata::new(),
        }
    }
}

/// 配達完了イベント
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDelivered {
    /// 注文ID
    pub order_id: OrderId,
    /// イベントメタデータ
    pub metadata: EventMetadata,
}

impl OrderDelivered {
    /// 新しい配達完了イベントを作成
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            metadata: EventMetadata::new(),
        }
    }
}

/// レビュー追加イベント
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewAdded {
    /// 商品ID
    pub product_id: ProductId,
    /// レビュー投稿者のユーザーID
    pub reviewer_id: UserId,
    /// 評価値（1〜5）
    pub rating: u8,
    /// イベントメタデータ
    pub metadata: EventMetadata,
}

impl ReviewAdded {
    /// 新しいレビュー追加イベントを作成
    pub fn new(product_id: ProductId, reviewer_id: UserId, rating: u8) -> Self {
        Self {
            product_id,
            reviewer_id,
            rating,
            metadata: EventMetadata::new(),
        }
    }
}
