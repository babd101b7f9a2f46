use crate::domain::model::{Order, Product, RatingSummary, Review};
use crate::domain::port::SalesSummary;
use rust_decimal::Decimal;
use serde::Serialize;

/// 注文明細用のレスポンスDTO
#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: String,
    pub name: String,
    pub image: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub currency: String,
}

/// 配送先住所用のレスポンスDTO
#[derive(Serialize)]
pub struct ShippingAddressResponse {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// 決済レシート用のレスポンスDTO
#[derive(Serialize)]
pub struct PaymentReceiptResponse {
    pub receipt_id: String,
    pub status: String,
    pub amount: Decimal,
    pub payer_email: Option<String>,
}

/// 注文詳細用のレスポンスDTO
#[derive(Serialize)]
pub struct OrderDetailResponse {
    pub order_id: String,
    pub user_id: String,
    pub status: String,
    pub order_lines: Vec<OrderLineResponse>,
    pub shipping_address: ShippingAddressResponse,
    pub payment_method: String,
    pub items_price: Decimal,
    pub shipping_price: Decimal,
    pub tax_price: Decimal,
    pub total_price: Decimal,
    pub currency: String,
    pub is_paid: bool,
    pub paid_at: Option<String>,
    pub payment_receipt: Option<PaymentReceiptResponse>,
    pub is_delivered: bool,
    pub delivered_at: Option<String>,
    pub created_at: String,
}

/// 注文一覧用のレスポンスDTO
#[derive(Serialize)]
pub struct OrderSummaryResponse {
    pub order_id: String,
    pub status: String,
    pub total_price: Decimal,
    pub currency: String,
    pub is_paid: bool,
    pub is_delivered: bool,
    pub created_at: String,
}

/// レビュー用のレスポンスDTO
#[derive(Serialize)]
pub struct ReviewResponse {
    pub reviewer_id: String,
    pub reviewer_name: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: String,
}

/// 商品用のレスポンスDTO
#[derive(Serialize)]
pub struct ProductResponse {
    pub product_id: String,
    pub name: String,
    pub image: String,
    pub price: Decimal,
    pub currency: String,
    pub count_in_stock: u32,
    pub rating: Decimal,
    pub num_reviews: u32,
    pub reviews: Vec<ReviewResponse>,
}

/// レビュー投稿結果用のレスポンスDTO
/// 更新後の評価集計を返す
#[derive(Serialize)]
pub struct ReviewCreatedResponse {
    pub rating: Decimal,
    pub num_reviews: u32,
}

/// 売上集計用のレスポンスDTO（管理者用）
#[derive(Serialize)]
pub struct SalesSummaryResponse {
    pub order_count: u64,
    pub total_sales: Decimal,
    pub currency: String,
}

impl OrderLineResponse {
    /// ドメインオブジェクトからOrderLineResponseを作成
    pub fn from_line(line: &crate::domain::model::OrderLine) -> Self {
        Self {
            product_id: line.product_id().to_string(),
            name: line.name().to_string(),
            image: line.image().to_string(),
            quantity: line.quantity(),
            unit_price: line.unit_price().amount(),
            subtotal: line.subtotal().amount(),
            currency: line.unit_price().currency(),
        }
    }
}

impl OrderDetailResponse {
    /// ドメインオブジェクトからOrderDetailResponseを作成
    pub fn from_order(order: &Order) -> Self {
        let order_lines = order
            .lines()
            .iter()
            .map(OrderLineResponse::from_line)
            .collect();

        let shipping_address = ShippingAddressResponse {
            address: order.shipping_address().address().to_string(),
            city: order.shipping_address().city().to_string(),
            postal_code: order.shipping_address().postal_code().to_string(),
            country: order.shipping_address().country().to_string(),
        };

        let payment_receipt = order.payment_receipt().map(|receipt| PaymentReceiptResponse {
            receipt_id: receipt.receipt_id().to_string(),
            status: receipt.status().to_string(),
            amount: receipt.amount().amount(),
            payer_email: receipt.payer_email().map(|s| s.to_string()),
        });

        Self {
            order_id: order.id().to_string(),
            user_id: order.user_id().to_string(),
            status: order.status().to_string(),
            order_lines,
            shipping_address,
            payment_method: order.payment_method().to_string(),
            items_price: order.pricing().items_price().amount(),
            shipping_price: order.pricing().shipping_price().amount(),
            tax_price: order.pricing().tax_price().amount(),
            total_price: order.pricing().total_price().amount(),
            currency: order.pricing().total_price().currency(),
            is_paid: order.is_paid(),
            paid_at: order.paid_at().map(|t| t.to_rfc3339()),
            payment_receipt,
            is_delivered: order.is_delivered(),
            delivered_at: order.delivered_at().map(|t| t.to_rfc3339()),
            created_at: order.created_at().to_rfc3339(),
        }
    }
}

impl OrderSummaryResponse {
    /// ドメインオブジェクトからOrderSummaryResponseを作成
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id().to_string(),
            status: order.status().to_string(),
            total_price: order.pricing().total_price().amount(),
            currency: order.pricing().total_price().currency(),
            is_paid: order.is_paid(),
            is_delivered: order.is_delivered(),
            created_at: order.created_at().to_rfc3339(),
        }
    }
}

impl ReviewResponse {
    /// ドメインオブジェクトからReviewResponseを作成
    pub fn from_review(review: &Review) -> Self {
        Self {
            reviewer_id: review.reviewer_id().to_string(),
            reviewer_name: review.reviewer_name().to_string(),
            rating: review.rating(),
            comment: review.comment().to_string(),
            created_at: review.created_at().to_rfc3339(),
        }
    }
}

impl ProductResponse {
    /// ドメインオブジェクトからProductResponseを作成
    pub fn from_product(product: &Product) -> Self {
        Self {
            product_id: product.id().to_string(),
            name: product.name().to_string(),
            image: product.image().to_string(),
            price: product.price().amount(),
            currency: product.price().currency(),
            count_in_stock: product.count_in_stock(),
            rating: product.rating(),
            num_reviews: product.num_reviews(),
            reviews: product
                .reviews()
                .iter()
                .map(ReviewResponse::from_review)
                .collect(),
        }
    }
}

impl ReviewCreatedResponse {
    /// 集計値からReviewCreatedResponseを作成
    pub fn from_summary(summary: &RatingSummary) -> Self {
        Self {
            rating: summary.rating(),
            num_reviews: summary.num_reviews(),
        }
    }
}

impl SalesSummaryResponse {
    /// 集計値からSalesSummaryResponseを作成
    pub fn from_summary(summary: &SalesSummary) -> Self {
        Self {
            order_count: summary.order_count,
            total_sales: summary.total_sales.amount(),
            currency: summary.total_sales.currency(),
        }
    }
}
