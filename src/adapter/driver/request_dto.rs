use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 注文明細のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
}

/// 配送先住所のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct ShippingAddressRequest {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// 注文作成用のリクエストDTO
/// カートの内容を一括で送信する
#[derive(Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub order_items: Vec<OrderItemRequest>,
    pub shipping_address: ShippingAddressRequest,
    pub payment_method: String,
    /// クライアントが表示していた合計金額（参考値、サーバー計算が常に正）
    pub client_total: Option<Decimal>,
}

/// 支払い確認用のリクエストDTO
/// 外部決済プロセッサーのキャプチャレシートを送信する
#[derive(Serialize, Deserialize)]
pub struct PayOrderRequest {
    pub receipt_id: String,
    pub status: String,
    pub amount: Decimal,
    pub payer_email: Option<String>,
}

/// レビュー投稿用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct AddReviewRequest {
    pub reviewer_name: String,
    pub rating: u8,
    pub comment: String,
}

/// 商品登録用のリクエストDTO（管理者用）
#[derive(Serialize, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub image: String,
    pub price: Decimal,
    pub count_in_stock: u32,
}
