use crate::domain::error::DomainError;
use crate::domain::event::{DomainEvent, OrderDelivered, OrderPaid, OrderPlaced};
use crate::domain::model::{OrderId, OrderLine, OrderStatus, PaymentReceipt, ShippingAddress, UserId};
use crate::domain::pricing::OrderPricing;
use chrono::{DateTime, Utc};

/// Order集約
/// 注文のライフサイクル（Created → Paid → Delivered）を管理し、
/// ビジネスルールを適用する。すべての遷移は前進のみで冪等ガード付き
#[derive(Debug, Clone)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    lines: Vec<OrderLine>,
    shipping_address: ShippingAddress,
    payment_method: String,
    pricing: OrderPricing,
    status: OrderStatus,
    payment_receipt: Option<PaymentReceipt>,
    paid_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    domain_events: Vec<DomainEvent>,
}

impl Order {
    /// 新しい注文を作成
    /// 初期ステータスはCreated
    /// 事前条件:
    /// - 注文明細が1つ以上
    /// - 価格はサーバー側で再計算済みのスナップショット
    pub fn place(
        id: OrderId,
        user_id: UserId,
        lines: Vec<OrderLine>,
        shipping_address: ShippingAddress,
        payment_method: String,
        pricing: OrderPricing,
    ) -> Result<Self, DomainError> {
        if lines.is_empty() {
            return Err(DomainError::EmptyOrder);
        }

        let mut order = Self {
            id,
            user_id,
            lines,
            shipping_address,
            payment_method,
            pricing,
            status: OrderStatus::Created,
            payment_receipt: None,
            paid_at: None,
            delivered_at: None,
            created_at: Utc::now(),
            domain_events: Vec::new(),
        };

        let event = OrderPlaced::new(
            order.id,
            order.user_id,
            order.lines.clone(),
            order.pricing.total_price(),
        );
        order.domain_events.push(DomainEvent::OrderPlaced(event));

        Ok(order)
    }

    /// データベースから取得したデータで注文を再構築
    /// リポジトリでの使用を想定
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: OrderId,
        user_id: UserId,
        lines: Vec<OrderLine>,
        shipping_address: ShippingAddress,
        payment_method: String,
        pricing: OrderPricing,
        status: OrderStatus,
        payment_receipt: Option<PaymentReceipt>,
        paid_at: Option<DateTime<Utc>>,
        delivered_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            id,
            user_id,
            lines,
            shipping_address,
            payment_method,
            pricing,
            status,
            payment_receipt,
            paid_at,
            delivered_at,
            created_at,
            domain_events: Vec::new(),
        })
    }

    /// 注文IDを取得
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// 注文者のユーザーIDを取得
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// 注文明細のリストを取得
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// 配送先住所を取得
    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    /// 支払い方法を取得
    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    /// 価格スナップショットを取得
    pub fn pricing(&self) -> &OrderPricing {
        &self.pricing
    }

    /// 注文ステータスを取得
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// 支払い済みかどうか
    pub fn is_paid(&self) -> bool {
        matches!(self.status, OrderStatus::Paid | OrderStatus::Delivered)
    }

    /// 配達完了かどうか
    pub fn is_delivered(&self) -> bool {
        self.status == OrderStatus::Delivered
    }

    /// 決済レシートを取得（支払い済みの場合のみSome）
    pub fn payment_receipt(&self) -> Option<&PaymentReceipt> {
        self.payment_receipt.as_ref()
    }

    /// 支払い日時を取得（支払い済みの場合のみSome）
    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    /// 配達完了日時を取得（配達完了の場合のみSome）
    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    /// 注文作成日時を取得
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// ドメインイベントを取得してクリア
    pub fn take_domain_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.domain_events)
    }

    /// 注文を支払い済みにマーク
    /// 事前条件:
    /// - まだ支払われていないこと（冪等ガード: 支払い確認のリトライは
    ///   2回目以降AlreadyPaidで拒否され、初回の記録は変更されない）
    pub fn mark_paid(&mut self, receipt: PaymentReceipt) -> Result<(), DomainError> {
        if self.is_paid() {
            return Err(DomainError::AlreadyPaid);
        }

        self.status = OrderStatus::Paid;
        self.paid_at = Some(Utc::now());
        self.payment_receipt = Some(receipt.clone());

        let event = OrderPaid::new(
            self.id,
            self.user_id,
            receipt.receipt_id().to_string(),
            self.pricing.total_price(),
        );
        self.domain_events.push(DomainEvent::OrderPaid(event));

        Ok(())
    }

    /// 注文を配達完了にマーク
    /// 事前条件:
    /// - 支払い済みであること（未払いの注文は配達完了にできない）
    /// - まだ配達完了でないこと
    pub fn mark_delivered(&mut self) -> Result<(), DomainError> {
        if self.is_delivered() {
            return Err(DomainError::AlreadyDelivered);
        }
        if !self.is_paid() {
            return Err(DomainError::NotPaid);
        }

        self.status = OrderStatus::Delivered;
        self.delivered_at = Some(Utc::now());

        let event = OrderDelivered::new(self.id);
        self.domain_events.push(DomainEvent::OrderDelivered(event));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Money, ProductId};
    use crate::domain::pricing::{PricingPolicy, ShippingPolicy};
    use rust_decimal_macros::dec;

    fn sample_line(price: Money, quantity: u32) -> OrderLine {
        OrderLine::new(
            ProductId::new(),
            "テスト商品".to_string(),
            "/images/sample.jpg".to_string(),
            quantity,
            price,
        )
        .unwrap()
    }

    fn sample_address() -> ShippingAddress {
        ShippingAddress::new(
            "123 Main St".to_string(),
            "Springfield".to_string(),
            "12345".to_string(),
            "USA".to_string(),
        )
        .unwrap()
    }

    fn sample_pricing(lines: &[OrderLine]) -> OrderPricing {
        let policy = PricingPolicy::new(
            ShippingPolicy::flat(Money::usd(dec!(10.00))),
            dec!(0.05),
        );
        policy.price(lines).unwrap()
    }

    fn sample_receipt(total: Money) -> PaymentReceipt {
        PaymentReceipt::new(
            "CAPTURE-001".to_string(),
            "COMPLETED".to_string(),
            total,
            Some("buyer@example.com".to_string()),
        )
    }

    fn placed_order() -> Order {
        let lines = vec![sample_line(Money::usd(dec!(100.00)), 2)];
        let pricing = sample_pricing(&lines);
        Order::place(
            OrderId::new(),
            UserId::new(),
            lines,
            sample_address(),
            "PayPal".to_string(),
            pricing,
        )
        .unwrap()
    }

    #[test]
    fn test_place_order_has_created_status() {
        let mut order = placed_order();

        assert_eq!(order.status(), OrderStatus::Created);
        assert!(!order.is_paid());
        assert!(!order.is_delivered());
        assert!(order.paid_at().is_none());
        assert!(order.payment_receipt().is_none());
        assert!(order.delivered_at().is_none());

        // OrderPlacedイベントが生成されていることを確認
        let events = order.take_domain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DomainEvent::OrderPlaced(_)));
    }

    #[test]
    fn test_place_order_without_lines_fails() {
        let lines = vec![sample_line(Money::usd(dec!(100.00)), 1)];
        let pricing = sample_pricing(&lines);
        let result = Order::place(
            OrderId::new(),
            UserId::new(),
            vec![],
            sample_address(),
            "PayPal".to_string(),
            pricing,
        );
        assert_eq!(result.unwrap_err(), DomainError::EmptyOrder);
    }

    #[test]
    fn test_pricing_snapshot_totals_reconcile() {
        let order = placed_order();
        let pricing = order.pricing();
        let expected = pricing
            .items_price()
            .add(&pricing.shipping_price())
            .unwrap()
            .add(&pricing.tax_price())
            .unwrap();
        assert_eq!(pricing.total_price(), expected);
    }

    #[test]
    fn test_mark_paid_success() {
        let mut order = placed_order();
        order.take_domain_events();

        let receipt = sample_receipt(order.pricing().total_price());
        let result = order.mark_paid(receipt);

        assert!(result.is_ok());
        assert_eq!(order.status(), OrderStatus::Paid);
        assert!(order.is_paid());
        assert!(order.paid_at().is_some());
        assert_eq!(
            order.payment_receipt().unwrap().receipt_id(),
            "CAPTURE-001"
        );

        let events = order.take_domain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DomainEvent::OrderPaid(_)));
    }

    #[test]
    fn test_mark_paid_twice_fails_and_preserves_first_receipt() {
        let mut order = placed_order();
        let total = order.pricing().total_price();

        order.mark_paid(sample_receipt(total)).unwrap();
        let first_paid_at = order.paid_at().unwrap();

        let retry = PaymentReceipt::new(
            "CAPTURE-002".to_string(),
            "COMPLETED".to_string(),
            total,
            None,
        );
        let result = order.mark_paid(retry);

        assert_eq!(result.unwrap_err(), DomainError::AlreadyPaid);
        // 初回の支払い記録が変更されていないことを確認
        assert_eq!(order.paid_at().unwrap(), first_paid_at);
        assert_eq!(
            order.payment_receipt().unwrap().receipt_id(),
            "CAPTURE-001"
        );
    }

    #[test]
    fn test_mark_delivered_before_payment_fails() {
        let mut order = placed_order();

        let result = order.mark_delivered();

        assert_eq!(result.unwrap_err(), DomainError::NotPaid);
        assert!(!order.is_delivered());
        assert!(order.delivered_at().is_none());
    }

    #[test]
    fn test_mark_delivered_success() {
        let mut order = placed_order();
        let total = order.pricing().total_price();
        order.mark_paid(sample_receipt(total)).unwrap();
        order.take_domain_events();

        let result = order.mark_delivered();

        assert!(result.is_ok());
        assert_eq!(order.status(), OrderStatus::Delivered);
        assert!(order.is_paid());
        assert!(order.delivered_at().is_some());

        let events = order.take_domain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DomainEvent::OrderDelivered(_)));
    }

    #[test]
    fn test_mark_delivered_twice_fails() {
        let mut order = placed_order();
        let total = order.pricing().total_price();
        order.mark_paid(sample_receipt(total)).unwrap();
        order.mark_delivered().unwrap();
        let first_delivered_at = order.delivered_at().unwrap();

        let result = order.mark_delivered();

        assert_eq!(result.unwrap_err(), DomainError::AlreadyDelivered);
        assert_eq!(order.delivered_at().unwrap(), first_delivered_at);
    }

    #[test]
    fn test_paid_order_cannot_regress() {
        let mut order = placed_order();
        let total = order.pricing().total_price();
        order.mark_paid(sample_receipt(total)).unwrap();

        // 支払い済みの注文は配達完了にのみ遷移できる
        assert_eq!(order.mark_paid(sample_receipt(total)).unwrap_err(), DomainError::AlreadyPaid);
        assert!(order.mark_delivered().is_ok());
        assert_eq!(order.status(), OrderStatus::Delivered);
    }
}
