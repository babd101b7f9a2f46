// 出力ポート
// ドメイン層が外部に依存する機能をトレイトとして定義
// アダプター層でこれらのトレイトを実装する

use crate::domain::event::DomainEvent;
use crate::domain::model::{
    Money, Order, OrderId, Product, ProductId, RatingSummary, Review, UserId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

/// ログレベル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// ロガートレイト
/// ログ出力を抽象化するポート
pub trait Logger: Send + Sync {
    /// デバッグレベルのログを出力
    fn debug(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// 情報レベルのログを出力
    fn info(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// 警告レベルのログを出力
    fn warn(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// エラーレベルのログを出力
    fn error(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );
}

/// リポジトリエラー型
/// リポジトリ操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::enum_variant_names)]
pub enum RepositoryError {
    /// データベース接続に失敗
    ConnectionFailed(String),
    /// 操作に失敗
    OperationFailed(String),
    /// データの取得に失敗
    FetchFailed(String),
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            RepositoryError::OperationFailed(msg) => write!(f, "Operation failed: {}", msg),
            RepositoryError::FetchFailed(msg) => write!(f, "Fetch failed: {}", msg),
        }
    }
}

impl std::error::Error for RepositoryError {}

/// 売上集計
/// 支払い済み注文に対する導出リード
#[derive(Debug, Clone, PartialEq)]
pub struct SalesSummary {
    /// 支払い済み注文の件数
    pub order_count: u64,
    /// 支払い済み注文の合計売上
    pub total_sales: Money,
}

/// 注文リポジトリトレイト
/// 注文集約の永続化を抽象化する
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// 注文を保存する
    ///
    /// # Returns
    /// * `Ok(())` - 保存成功
    /// * `Err(RepositoryError)` - 保存失敗
    async fn save(&self, order: &Order) -> Result<(), RepositoryError>;

    /// 注文IDで注文を検索する
    ///
    /// # Returns
    /// * `Ok(Some(Order))` - 注文が見つかった
    /// * `Ok(None)` - 注文が見つからなかった
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// 指定されたユーザーの注文を取得する
    /// 作成日時の降順で並べて返す
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// 支払い済み注文の売上集計を取得する
    async fn paid_sales_summary(&self) -> Result<SalesSummary, RepositoryError>;

    /// 新しい一意の注文IDを生成する
    fn next_identity(&self) -> OrderId;
}

/// 商品リポジトリトレイト
/// 商品集約の永続化と、在庫・評価に対するアトミックな更新を抽象化する
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// 商品を保存する（カタログ情報のみ。評価集計はadd_review経由で更新される）
    async fn save(&self, product: &Product) -> Result<(), RepositoryError>;

    /// 商品IDで商品を検索する（レビュー込み）
    ///
    /// # Returns
    /// * `Ok(Some(Product))` - 商品が見つかった
    /// * `Ok(None)` - 商品が見つからなかった
    async fn find_by_id(&self, product_id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// すべての商品を取得する
    async fn find_all(&self) -> Result<Vec<Product>, RepositoryError>;

    /// 在庫を予約する
    /// 条件付き減算を1つのアトミックなステップとして実行する。
    /// 読み取りと書き込みを分離してはならない（並行予約に対する整合性保証）
    ///
    /// # Returns
    /// * `Ok(Some(u32))` - 予約成功、予約後の在庫数
    /// * `Ok(None)` - 在庫不足（減算は行われない）
    async fn reserve_stock(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<u32>, RepositoryError>;

    /// 在庫を解放する（予約の補償ロールバック用のアトミックな加算）
    ///
    /// # Returns
    /// * `Ok(u32)` - 解放後の在庫数
    async fn release_stock(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<u32, RepositoryError>;

    /// レビューを追加し、評価集計を再計算する
    /// レビューの追記と集計（平均評価・レビュー数）の更新は
    /// 1つのアトミックな単位として永続化される。並行する読み取りが
    /// 集計とレビュー数の不整合を観測してはならない
    ///
    /// # Returns
    /// * `Ok(Some(RatingSummary))` - 追加成功、更新後の集計値
    /// * `Ok(None)` - 同一ユーザーによる重複レビュー（何も変更されない）
    async fn add_review(
        &self,
        product_id: ProductId,
        review: &Review,
    ) -> Result<Option<RatingSummary>, RepositoryError>;
}

/// イベントバスエラー
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event publishing failed: {0}")]
    PublishingFailed(String),
}

/// イベントバストレイト
/// イベントの発行と配信を管理するポート
#[async_trait]
pub trait EventBus: Send + Sync {
    /// イベントを発行し、登録されたハンドラーに配信
    async fn publish(&self, event: DomainEvent) -> Result<(), EventBusError>;
}
