// 駆動される側アダプター（リポジトリ実装など）

mod console_logger;
mod event_bus;
mod order_repository;
mod product_repository;

pub use console_logger::ConsoleLogger;
pub use event_bus::{EventBusConfig, InMemoryEventBus};
pub use order_repository::MySqlOrderRepository;
pub use product_repository::MySqlProductRepository;
