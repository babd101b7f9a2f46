use crate::domain::error::DomainError;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// 注文の一意識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(Uuid);

impl OrderId {
    /// 新しい一意のOrderIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから OrderId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からOrderIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

/// 商品の一意識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(Uuid);

impl ProductId {
    /// 新しい一意のProductIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから ProductId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からProductIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::new()
    }
}

/// ユーザーの一意識別子
/// 認証コラボレーターが検証済みの識別子を供給する
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// 新しい一意のUserIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから UserId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からUserIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

/// 通貨
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    /// 米ドル
    #[allow(clippy::upper_case_acronyms)]
    USD,
}

/// 金額を表す値オブジェクト
/// 通貨精度は小数点以下2桁、丸めは四捨五入（round-half-up）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// 金額と通貨から作成
    pub fn new(amount: Decimal, currency: String) -> Result<Self, DomainError> {
        let currency = match currency.as_str() {
            "USD" => Currency::USD,
            _ => {
                return Err(DomainError::InvalidValue(format!(
                    "サポートされていない通貨: {}",
                    currency
                )))
            }
        };
        Ok(Self { amount, currency })
    }

    /// 米ドルの金額を作成
    pub fn usd(amount: Decimal) -> Self {
        Self {
            amount,
            currency: Currency::USD,
        }
    }

    /// ゼロ金額を作成
    pub fn zero() -> Self {
        Self::usd(Decimal::ZERO)
    }

    /// 金額を取得
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// 通貨を文字列として取得
    pub fn currency(&self) -> String {
        match self.currency {
            Currency::USD => "USD".to_string(),
        }
    }

    /// 金額を加算
    pub fn add(&self, other: &Money) -> Result<Money, DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch);
        }
        Ok(Money {
            amount: self.amount + other.amount,
            currency: self.currency,
        })
    }

    /// 金額を乗算
    pub fn multiply(&self, factor: u32) -> Money {
        Money {
            amount: self.amount * Decimal::from(factor),
            currency: self.currency,
        }
    }

    /// 比率を掛けた金額を計算（税率の適用など）
    pub fn scale(&self, rate: Decimal) -> Money {
        Money {
            amount: self.amount * rate,
            currency: self.currency,
        }
    }

    /// 通貨精度（小数点以下2桁）に丸める
    /// 丸めは四捨五入（midpointは0から遠ざける方向）
    pub fn round_to_cents(&self) -> Money {
        Money {
            amount: self
                .amount
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            currency: self.currency,
        }
    }

    /// 金額が負かどうか
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

/// 注文明細を表す値オブジェクト
/// 単価・商品名・画像は注文作成時点のスナップショットであり、
/// その後の商品情報の変更から切り離される
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    product_id: ProductId,
    name: String,
    image: String,
    quantity: u32,
    unit_price: Money,
}

impl OrderLine {
    /// 新しい注文明細を作成
    /// 数量は1以上である必要がある
    pub fn new(
        product_id: ProductId,
        name: String,
        image: String,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity);
        }
        Ok(Self {
            product_id,
            name,
            image,
            quantity,
            unit_price,
        })
    }

    /// 商品IDを取得
    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    /// 商品名スナップショットを取得
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 商品画像スナップショットを取得
    pub fn image(&self) -> &str {
        &self.image
    }

    /// 数量を取得
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// 単価スナップショットを取得
    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// 小計を計算（単価 × 数量）
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }

    /// 数量を増加させる（カート内で同じ商品が重複した場合のマージ用）
    pub fn increase_quantity(&mut self, additional_quantity: u32) -> Result<(), DomainError> {
        if additional_quantity == 0 {
            return Err(DomainError::InvalidQuantity);
        }
        self.quantity += additional_quantity;
        Ok(())
    }
}

/// 配送先住所を表す値オブジェクト
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    address: String,
    city: String,
    postal_code: String,
    country: String,
}

impl ShippingAddress {
    /// 新しい配送先住所を作成
    /// すべてのフィールドが空でない必要がある
    pub fn new(
        address: String,
        city: String,
        postal_code: String,
        country: String,
    ) -> Result<Self, DomainError> {
        if address.trim().is_empty() {
            return Err(DomainError::InvalidAddress(
                "住所は空にできません".to_string(),
            ));
        }
        if city.trim().is_empty() {
            return Err(DomainError::InvalidAddress(
                "市区町村は空にできません".to_string(),
            ));
        }
        if postal_code.trim().is_empty() {
            return Err(DomainError::InvalidAddress(
                "郵便番号は空にできません".to_string(),
            ));
        }
        if country.trim().is_empty() {
            return Err(DomainError::InvalidAddress(
                "国名は空にできません".to_string(),
            ));
        }

        Ok(Self {
            address,
            city,
            postal_code,
            country,
        })
    }

    /// 住所を取得
    pub fn address(&self) -> &str {
        &self.address
    }

    /// 市区町村を取得
    pub fn city(&self) -> &str {
        &self.city
    }

    /// 郵便番号を取得
    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    /// 国名を取得
    pub fn country(&self) -> &str {
        &self.country
    }
}

/// 注文のステータス
/// 前進のみの状態遷移: Created → Paid → Delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// 作成済み（支払い待ち）
    Created,
    /// 支払い済み
    Paid,
    /// 配達完了（終端状態）
    Delivered,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status_str = match self {
            OrderStatus::Created => "Created",
            OrderStatus::Paid => "Paid",
            OrderStatus::Delivered => "Delivered",
        };
        write!(f, "{}", status_str)
    }
}

impl OrderStatus {
    /// 文字列からOrderStatusを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "Created" => Ok(OrderStatus::Created),
            "Paid" => Ok(OrderStatus::Paid),
            "Delivered" => Ok(OrderStatus::Delivered),
            _ => Err(DomainError::InvalidValue(format!(
                "無効な注文ステータス: {}",
                s
            ))),
        }
    }
}

/// 商品レビューを表す値オブジェクト
/// 商品に所有され、追記のみ（更新・削除なし）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    reviewer_id: UserId,
    reviewer_name: String,
    rating: u8,
    comment: String,
    created_at: DateTime<Utc>,
}

impl Review {
    /// 新しいレビューを作成
    /// 評価値は1〜5の範囲内である必要がある
    pub fn new(
        reviewer_id: UserId,
        reviewer_name: String,
        rating: u8,
        comment: String,
    ) -> Result<Self, DomainError> {
        if !(1..=5).contains(&rating) {
            return Err(DomainError::InvalidRating);
        }
        Ok(Self {
            reviewer_id,
            reviewer_name,
            rating,
            comment,
            created_at: Utc::now(),
        })
    }

    /// データベースから取得したデータでレビューを再構築
    pub fn reconstruct(
        reviewer_id: UserId,
        reviewer_name: String,
        rating: u8,
        comment: String,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if !(1..=5).contains(&rating) {
            return Err(DomainError::InvalidRating);
        }
        Ok(Self {
            reviewer_id,
            reviewer_name,
            rating,
            comment,
            created_at,
        })
    }

    /// レビュー投稿者のIDを取得
    pub fn reviewer_id(&self) -> UserId {
        self.reviewer_id
    }

    /// レビュー投稿者の表示名スナップショットを取得
    pub fn reviewer_name(&self) -> &str {
        &self.reviewer_name
    }

    /// 評価値を取得
    pub fn rating(&self) -> u8 {
        self.rating
    }

    /// コメントを取得
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// 投稿日時を取得
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// 決済キャプチャレシートを表す値オブジェクト
/// 外部決済プロセッサーが返す不透明な支払い証明
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    receipt_id: String,
    status: String,
    amount: Money,
    payer_email: Option<String>,
}

impl PaymentReceipt {
    /// 新しいレシートを作成
    pub fn new(
        receipt_id: String,
        status: String,
        amount: Money,
        payer_email: Option<String>,
    ) -> Self {
        Self {
            receipt_id,
            status,
            amount,
            payer_email,
        }
    }

    /// レシートIDを取得
    pub fn receipt_id(&self) -> &str {
        &self.receipt_id
    }

    /// 決済ステータスを取得
    pub fn status(&self) -> &str {
        &self.status
    }

    /// キャプチャされた金額を取得
    pub fn amount(&self) -> Money {
        self.amount
    }

    /// 支払い者のメールアドレスを取得
    pub fn payer_email(&self) -> Option<&str> {
        self.payer_email.as_deref()
    }

    /// 決済が成功ステータスかどうか
    pub fn is_successful(&self) -> bool {
        self.status.eq_ignore_ascii_case("completed")
    }
}
