// 価格計算機
// 注文明細の集合から項目別合計を導出する純粋関数。
// 送料・税率のポリシーは設定として注入され、計算機にハードコードされない

use crate::domain::error::DomainError;
use crate::domain::model::{Money, OrderLine};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 送料ポリシー
/// 固定額に加えて、小計が閾値以上なら送料無料にできる
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShippingPolicy {
    flat_fee: Money,
    free_threshold: Option<Money>,
}

impl ShippingPolicy {
    /// 固定送料のポリシーを作成
    pub fn flat(flat_fee: Money) -> Self {
        Self {
            flat_fee,
            free_threshold: None,
        }
    }

    /// 閾値以上で送料無料になるポリシーを作成
    pub fn flat_with_free_threshold(flat_fee: Money, free_threshold: Money) -> Self {
        Self {
            flat_fee,
            free_threshold: Some(free_threshold),
        }
    }

    /// 小計に対する送料を計算
    pub fn shipping_for(&self, items_price: &Money) -> Money {
        match self.free_threshold {
            Some(threshold) if items_price.amount() >= threshold.amount() => Money::zero(),
            _ => self.flat_fee,
        }
    }
}

/// 価格ポリシー
/// 注文作成時にサーバー側で必ず再実行され、その結果が正となる。
/// クライアント送信の合計金額は決して信用しない
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingPolicy {
    shipping: ShippingPolicy,
    tax_rate: Decimal,
}

impl PricingPolicy {
    /// 新しい価格ポリシーを作成
    ///
    /// # Arguments
    /// * `shipping` - 送料ポリシー
    /// * `tax_rate` - 税率（例: 0.05 = 5%）
    pub fn new(shipping: ShippingPolicy, tax_rate: Decimal) -> Self {
        Self { shipping, tax_rate }
    }

    /// 注文明細の集合から項目別合計を計算
    ///
    /// - `items_price` = Σ(数量 × 単価)、小数点以下2桁に四捨五入
    /// - `shipping_price` = 送料ポリシーによる決定論的な値
    /// - `tax_price` = items_price × 税率、小数点以下2桁に四捨五入
    /// - `total_price` = items_price + shipping_price + tax_price（厳密に一致）
    pub fn price(&self, lines: &[OrderLine]) -> Result<OrderPricing, DomainError> {
        let mut items_price = Money::zero();
        for line in lines {
            items_price = items_price.add(&line.subtotal())?;
        }
        let items_price = items_price.round_to_cents();

        let shipping_price = self.shipping.shipping_for(&items_price).round_to_cents();
        let tax_price = items_price.scale(self.tax_rate).round_to_cents();

        let total_price = items_price.add(&shipping_price)?.add(&tax_price)?;

        OrderPricing::new(items_price, shipping_price, tax_price, total_price)
    }
}

/// 注文の価格スナップショット
/// 不変条件: total_price == items_price + shipping_price + tax_price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderPricing {
    items_price: Money,
    shipping_price: Money,
    tax_price: Money,
    total_price: Money,
}

impl OrderPricing {
    /// 項目別合計から価格スナップショットを作成
    /// 合計の整合性が取れていない場合は失敗する
    pub fn new(
        items_price: Money,
        shipping_price: Money,
        tax_price: Money,
        total_price: Money,
    ) -> Result<Self, DomainError> {
        let expected = items_price.add(&shipping_price)?.add(&tax_price)?;
        if expected != total_price {
            return Err(DomainError::InvalidValue(
                "合計金額が項目別合計の和と一致しません".to_string(),
            ));
        }
        Ok(Self {
            items_price,
            shipping_price,
            tax_price,
            total_price,
        })
    }

    /// 商品小計を取得
    pub fn items_price(&self) -> Money {
        self.items_price
    }

    /// 送料を取得
    pub fn shipping_price(&self) -> Money {
        self.shipping_price
    }

    /// 税額を取得
    pub fn tax_price(&self) -> Money {
        self.tax_price
    }

    /// 合計金額を取得
    pub fn total_price(&self) -> Money {
        self.total_price
    }
}
