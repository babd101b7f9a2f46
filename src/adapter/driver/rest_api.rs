use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use uuid::Uuid;

use crate::adapter::driver::auth::AuthenticatedUser;
use crate::adapter::driver::request_dto::{
    AddReviewRequest, CreateProductRequest, PayOrderRequest, PlaceOrderRequest,
};
use crate::adapter::driver::response_dto::{
    OrderDetailResponse, OrderSummaryResponse, ProductResponse, ReviewCreatedResponse,
    SalesSummaryResponse,
};
use crate::application::service::{
    CatalogService, CheckoutService, OrderItemCommand, PlaceOrderCommand, ReviewService,
};
use crate::application::ApplicationError;
use crate::domain::model::{Money, OrderId, PaymentReceipt, ProductId, ShippingAddress};

/// APIエラーレスポンス
/// クライアントが失敗の種類（リトライ／リダイレクト／何もしない）を
/// 判別できるよう、安定したエラーコードを含める
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

/// アプリケーションサービスを含む状態
#[derive(Clone)]
pub struct AppState {
    pub checkout_service: Arc<CheckoutService>,
    pub review_service: Arc<ReviewService>,
    pub catalog_service: Arc<CatalogService>,
}

/// REST APIルーターを作成
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/orders", post(create_order))
        .route("/orders/mine", get(get_my_orders))
        .route("/orders/total-sales", get(get_total_sales))
        .route("/orders/:order_id", get(get_order_by_id))
        .route("/orders/:order_id/pay", post(pay_order))
        .route("/orders/:order_id/deliver", post(deliver_order))
        .route("/products", post(create_product))
        .route("/products", get(get_products))
        .route("/products/:product_id", get(get_product_by_id))
        .route("/products/:product_id/reviews", post(add_review))
}

// ヘルスチェックエンドポイント
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "storefront-order-management",
        "version": "0.1.0"
    }))
}

// 管理者権限を要求するガード
fn require_admin(auth: &AuthenticatedUser) -> Result<(), (StatusCode, Json<ApiError>)> {
    if auth.is_admin {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            Json(ApiError {
                error: "管理者権限が必要です".to_string(),
                code: "FORBIDDEN".to_string(),
            }),
        ))
    }
}

// 注文作成エンドポイント
async fn create_order(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderDetailResponse>), (StatusCode, Json<ApiError>)> {
    let shipping_address = match ShippingAddress::new(
        request.shipping_address.address,
        request.shipping_address.city,
        request.shipping_address.postal_code,
        request.shipping_address.country,
    ) {
        Ok(addr) => addr,
        Err(err) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ApiError {
                    error: format!("Invalid shipping address: {}", err),
                    code: "INVALID_ADDRESS".to_string(),
                }),
            ))
        }
    };

    let items = request
        .order_items
        .iter()
        .map(|item| OrderItemCommand {
            product_id: ProductId::from_uuid(item.product_id),
            quantity: item.quantity,
        })
        .collect();

    let command = PlaceOrderCommand {
        items,
        shipping_address,
        payment_method: request.payment_method,
        client_total: request.client_total.map(Money::usd),
    };

    match state
        .checkout_service
        .place_order(auth.requester(), command)
        .await
    {
        Ok(order) => Ok((
            StatusCode::CREATED,
            Json(OrderDetailResponse::from_order(&order)),
        )),
        Err(err) => Err(map_application_error(err)),
    }
}

// 自分の注文一覧取得エンドポイント
async fn get_my_orders(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<Vec<OrderSummaryResponse>>, (StatusCode, Json<ApiError>)> {
    match state.checkout_service.list_my_orders(auth.requester()).await {
        Ok(orders) => {
            let response = orders.iter().map(OrderSummaryResponse::from_order).collect();
            Ok(Json(response))
        }
        Err(err) => Err(map_application_error(err)),
    }
}

// 売上集計取得エンドポイント（管理者用）
async fn get_total_sales(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<SalesSummaryResponse>, (StatusCode, Json<ApiError>)> {
    require_admin(&auth)?;

    match state.checkout_service.total_sales().await {
        Ok(summary) => Ok(Json(SalesSummaryResponse::from_summary(&summary))),
        Err(err) => Err(map_application_error(err)),
    }
}

// 注文詳細取得エンドポイント（所有者または管理者）
async fn get_order_by_id(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderDetailResponse>, (StatusCode, Json<ApiError>)> {
    let order_id = OrderId::from_uuid(order_id);

    match state
        .checkout_service
        .get_order(order_id, auth.requester())
        .await
    {
        Ok(Some(order)) => Ok(Json(OrderDetailResponse::from_order(&order))),
        Ok(None) => Err(order_not_found()),
        Err(err) => Err(map_application_error(err)),
    }
}

// 支払い確認エンドポイント
// 外部決済プロセッサーのキャプチャレシートを受け取り、注文を支払い済みにする
async fn pay_order(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<PayOrderRequest>,
) -> Result<Json<OrderDetailResponse>, (StatusCode, Json<ApiError>)> {
    let order_id = OrderId::from_uuid(order_id);
    let receipt = PaymentReceipt::new(
        request.receipt_id,
        request.status,
        Money::usd(request.amount),
        request.payer_email,
    );

    match state
        .checkout_service
        .pay_order(order_id, auth.requester(), receipt)
        .await
    {
        Ok(order) => Ok(Json(OrderDetailResponse::from_order(&order))),
        Err(ApplicationError::NotFound(_)) => Err(order_not_found()),
        Err(err) => Err(map_application_error(err)),
    }
}

// 配達完了エンドポイント（管理者用）
async fn deliver_order(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderDetailResponse>, (StatusCode, Json<ApiError>)> {
    require_admin(&auth)?;

    let order_id = OrderId::from_uuid(order_id);

    match state.checkout_service.mark_delivered(order_id).await {
        Ok(order) => Ok(Json(OrderDetailResponse::from_order(&order))),
        Err(ApplicationError::NotFound(_)) => Err(order_not_found()),
        Err(err) => Err(map_application_error(err)),
    }
}

// 商品登録エンドポイント（管理者用）
// カタログ管理は外部コラボレーターであり、ここでは最小限の登録のみを提供する
async fn create_product(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), (StatusCode, Json<ApiError>)> {
    require_admin(&auth)?;

    match state
        .catalog_service
        .create_product(
            request.name,
            request.image,
            Money::usd(request.price),
            request.count_in_stock,
        )
        .await
    {
        Ok(product) => Ok((
            StatusCode::CREATED,
            Json(ProductResponse::from_product(&product)),
        )),
        Err(err) => Err(map_application_error(err)),
    }
}

// 商品一覧取得エンドポイント
async fn get_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductResponse>>, (StatusCode, Json<ApiError>)> {
    match state.catalog_service.list_products().await {
        Ok(products) => {
            let response = products.iter().map(ProductResponse::from_product).collect();
            Ok(Json(response))
        }
        Err(err) => Err(map_application_error(err)),
    }
}

// 商品詳細取得エンドポイント（レビュー込み）
async fn get_product_by_id(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ProductResponse>, (StatusCode, Json<ApiError>)> {
    let product_id = ProductId::from_uuid(product_id);

    match state.catalog_service.get_product(product_id).await {
        Ok(Some(product)) => Ok(Json(ProductResponse::from_product(&product))),
        Ok(None) => Err(product_not_found()),
        Err(err) => Err(map_application_error(err)),
    }
}

// レビュー投稿エンドポイント
async fn add_review(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(product_id): Path<Uuid>,
    Json(request): Json<AddReviewRequest>,
) -> Result<(StatusCode, Json<ReviewCreatedResponse>), (StatusCode, Json<ApiError>)> {
    let product_id = ProductId::from_uuid(product_id);

    match state
        .review_service
        .add_review(
            product_id,
            auth.requester(),
            request.reviewer_name,
            request.rating,
            request.comment,
        )
        .await
    {
        Ok(summary) => Ok((
            StatusCode::CREATED,
            Json(ReviewCreatedResponse::from_summary(&summary)),
        )),
        Err(ApplicationError::NotFound(_)) => Err(product_not_found()),
        Err(err) => Err(map_application_error(err)),
    }
}

fn order_not_found() -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError {
            error: "指定された注文が見つかりません".to_string(),
            code: "ORDER_NOT_FOUND".to_string(),
        }),
    )
}

fn product_not_found() -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError {
            error: "指定された商品が見つかりません".to_string(),
            code: "PRODUCT_NOT_FOUND".to_string(),
        }),
    )
}

// アプリケーションエラーをHTTPエラーにマッピング
fn map_application_error(err: ApplicationError) -> (StatusCode, Json<ApiError>) {
    match err {
        ApplicationError::DomainError(domain_err) => map_domain_error(domain_err),
        ApplicationError::RepositoryError(repo_err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError {
                error: format!("{}", repo_err),
                code: "REPOSITORY_ERROR".to_string(),
            }),
        ),
        ApplicationError::EventPublishingFailed(msg) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError {
                error: msg,
                code: "PUBLISHER_ERROR".to_string(),
            }),
        ),
        ApplicationError::NotFound(msg) => (
            StatusCode::NOT_FOUND,
            Json(ApiError {
                error: msg,
                code: "NOT_FOUND".to_string(),
            }),
        ),
        ApplicationError::Forbidden(msg) => (
            StatusCode::FORBIDDEN,
            Json(ApiError {
                error: msg,
                code: "FORBIDDEN".to_string(),
            }),
        ),
    }
}

// ドメインエラーを適切なHTTPステータスコードとエラーコードにマッピング
// 「注文できない」（在庫）／「支払えない」（プロセッサー）／
// 「確認できない」（処理済み）をエラーコードで判別できるようにする
fn map_domain_error(domain_err: crate::domain::error::DomainError) -> (StatusCode, Json<ApiError>) {
    use crate::domain::error::DomainError;

    match domain_err {
        DomainError::EmptyOrder => (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "注文明細が空です。少なくとも1つの商品を追加してください".to_string(),
                code: "EMPTY_ORDER".to_string(),
            }),
        ),
        DomainError::InsufficientStock => (
            StatusCode::CONFLICT,
            Json(ApiError {
                error: "在庫不足です".to_string(),
                code: "INSUFFICIENT_STOCK".to_string(),
            }),
        ),
        DomainError::InvalidQuantity => (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "無効な数量です".to_string(),
                code: "INVALID_QUANTITY".to_string(),
            }),
        ),
        DomainError::InvalidRating => (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "評価値は1〜5の範囲で指定してください".to_string(),
                code: "INVALID_RATING".to_string(),
            }),
        ),
        DomainError::DuplicateReview => (
            StatusCode::CONFLICT,
            Json(ApiError {
                error: "この商品には既にレビューを投稿済みです".to_string(),
                code: "DUPLICATE_REVIEW".to_string(),
            }),
        ),
        DomainError::AlreadyPaid => (
            StatusCode::CONFLICT,
            Json(ApiError {
                error: "この注文は既に支払い済みです".to_string(),
                code: "ALREADY_PAID".to_string(),
            }),
        ),
        DomainError::AlreadyDelivered => (
            StatusCode::CONFLICT,
            Json(ApiError {
                error: "この注文は既に配達完了です".to_string(),
                code: "ALREADY_DELIVERED".to_string(),
            }),
        ),
        DomainError::NotPaid => (
            StatusCode::CONFLICT,
            Json(ApiError {
                error: "未払いの注文は配達完了にできません".to_string(),
                code: "NOT_PAID".to_string(),
            }),
        ),
        DomainError::PaymentRejected(status) => (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: format!("決済が完了していません: {}", status),
                code: "PAYMENT_REJECTED".to_string(),
            }),
        ),
        DomainError::PaymentAmountMismatch => (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "決済金額が注文合計と一致しません".to_string(),
                code: "PAYMENT_AMOUNT_MISMATCH".to_string(),
            }),
        ),
        DomainError::PriceMismatch => (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "合計金額がサーバー計算と一致しません".to_string(),
                code: "PRICE_MISMATCH".to_string(),
            }),
        ),
        DomainError::InvalidAddress(msg) => (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: msg,
                code: "INVALID_ADDRESS".to_string(),
            }),
        ),
        DomainError::CurrencyMismatch => (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "通貨が一致しません".to_string(),
                code: "CURRENCY_MISMATCH".to_string(),
            }),
        ),
        DomainError::InvalidValue(msg) => (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: msg,
                code: "INVALID_VALUE".to_string(),
            }),
        ),
        DomainError::RepositoryError(msg) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError {
                error: msg,
                code: "REPOSITORY_ERROR".to_string(),
            }),
        ),
    }
}
