use storefront_order_management::adapter::driven::{
    ConsoleLogger, EventBusConfig, InMemoryEventBus, MySqlOrderRepository, MySqlProductRepository,
};
use storefront_order_management::adapter::driver::rest_api::{create_router, AppState};
use storefront_order_management::adapter::{
    DatabaseConfig, DatabaseMigration, PricingConfig, ServerConfig,
};
use storefront_order_management::application::service::{
    CatalogService, CheckoutService, ReviewService,
};
use storefront_order_management::domain::handler::{LowStockAlertHandler, NotificationHandler};
use storefront_order_management::domain::port::{EventBus, Logger, OrderRepository, ProductRepository};

use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== ストアフロント注文管理システム REST API ===");
    println!();

    // .envファイルから環境変数を読み込む
    dotenvy::dotenv().ok();

    // 設定を読み込む
    let database_config = DatabaseConfig::from_env()?;
    let pricing_config = PricingConfig::from_env()?;
    let server_config = ServerConfig::from_env()?;
    println!(
        "データベース設定を読み込みました: {}:{}",
        database_config.host, database_config.port
    );

    // 接続プールを作成
    let pool = MySqlPoolOptions::new()
        .max_connections(database_config.max_connections)
        .connect(&database_config.connection_string())
        .await?;
    println!("データベース接続プールを作成しました");

    // マイグレーションを実行
    let migration = DatabaseMigration::new(pool.clone());
    migration.run().await?;

    // リポジトリとロガーを作成
    let order_repository: Arc<dyn OrderRepository> =
        Arc::new(MySqlOrderRepository::new(pool.clone()));
    let product_repository: Arc<dyn ProductRepository> =
        Arc::new(MySqlProductRepository::new(pool.clone()));
    let logger: Arc<dyn Logger> = Arc::new(ConsoleLogger::new());

    // イベントバスを作成し、ハンドラーを登録
    let event_bus = Arc::new(InMemoryEventBus::new(EventBusConfig::default()));

    let notification_handler = NotificationHandler::new(logger.clone());
    event_bus
        .subscribe_order_placed(notification_handler.clone())
        .await?;
    event_bus
        .subscribe_order_paid(notification_handler.clone())
        .await?;
    event_bus
        .subscribe_order_delivered(notification_handler.clone())
        .await?;
    event_bus
        .subscribe_review_added(notification_handler)
        .await?;

    let low_stock_handler = LowStockAlertHandler::new(
        product_repository.clone(),
        logger.clone(),
        server_config.low_stock_threshold,
    );
    event_bus.subscribe_order_placed(low_stock_handler).await?;

    println!("イベントハンドラーを登録しました");

    // アプリケーションサービスを作成
    let event_bus: Arc<dyn EventBus> = event_bus;
    let checkout_service = CheckoutService::new(
        order_repository.clone(),
        product_repository.clone(),
        pricing_config.policy(),
        event_bus.clone(),
        logger.clone(),
    );
    let review_service = ReviewService::new(
        product_repository.clone(),
        event_bus.clone(),
        logger.clone(),
    );
    let catalog_service = CatalogService::new(product_repository.clone());

    // アプリケーション状態を作成
    let app_state = AppState {
        checkout_service: Arc::new(checkout_service),
        review_service: Arc::new(review_service),
        catalog_service: Arc::new(catalog_service),
    };

    // REST APIルーターを作成
    let app = create_router()
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // サーバーを起動
    let listener = tokio::net::TcpListener::bind(&server_config.bind_addr).await?;
    println!(
        "REST APIサーバーが起動しました: http://{}",
        server_config.bind_addr
    );
    println!("API仕様:");
    println!("  POST /orders - 注文作成（カートの内容を一括送信）");
    println!("  GET  /orders/mine - 自分の注文一覧取得");
    println!("  GET  /orders/total-sales - 売上集計（管理者）");
    println!("  GET  /orders/:id - 注文詳細取得（所有者または管理者）");
    println!("  POST /orders/:id/pay - 支払い確認（キャプチャレシート送信）");
    println!("  POST /orders/:id/deliver - 配達完了（管理者）");
    println!("  POST /products - 商品登録（管理者）");
    println!("  GET  /products - 商品一覧取得");
    println!("  GET  /products/:id - 商品詳細取得");
    println!("  POST /products/:id/reviews - レビュー投稿");
    println!();

    axum::serve(listener, app).await?;

    Ok(())
}
