use crate::domain::event::DomainEvent;
use async_trait::async_trait;

/// イベントハンドラーエラー
#[derive(Debug, Clone, thiserror::Error)]
pub enum HandlerError {
    #[error("Handler processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Repository error: {0}")]
    RepositoryError(String),
    #[error("Domain error: {0}")]
    DomainError(String),
    #[error("Transient error (retryable): {0}")]
    TransientError(String),
    #[error("Permanent error (not retryable): {0}")]
    PermanentError(String),
}

/// イベントハンドラートレイト
/// 特定のイベントタイプを処理するハンドラーを定義
#[async_trait]
pub trait EventHandler<E>: Send + Sync {
    async fn handle(&self, event: E) -> Result<(), HandlerError>;
}

/// 型消去されたイベントハンドラー
/// 異なるイベントタイプのハンドラーを統一的に扱うため
#[async_trait]
pub trait DynEventHandler: Send + Sync {
    async fn handle_event(&self, event: &DomainEvent) -> Result<(), HandlerError>;
    fn can_handle(&self, event: &DomainEvent) -> bool;
    fn handler_name(&self) -> &str;
}

/// OrderPlaced用のハンドラーラッパー
pub struct OrderPlacedHandlerWrapper<H>
where
    H: EventHandler<crate::domain::event::OrderPlaced>,
{
    handler: H,
    name: String,
}

impl<H> OrderPlacedHandlerWrapper<H>
where
    H: EventHandler<crate::domain::event::OrderPlaced>,
{
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            name: "OrderPlacedHandler".to_string(),
        }
    }

    pub fn with_name(handler: H, name: String) -> Self {
        Self { handler, name }
    }
}

#[async_trait]
impl<H> DynEventHandler for OrderPlacedHandlerWrapper<H>
where
    H: EventHandler<crate::domain::event::OrderPlaced>,
{
    async fn handle_event(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        match event {
            DomainEvent::OrderPlaced(e) => self.handler.handle(e.clone()).await,
            _ => Err(HandlerError::ProcessingFailed(
                "Event type mismatch".to_string(),
            )),
        }
    }

    fn can_handle(&self, event: &DomainEvent) -> bool {
        matches!(event, DomainEvent::OrderPlaced(_))
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

/// OrderPaid用のハンドラーラッパー
pub struct OrderPaidHandlerWrapper<H>
where
    H: EventHandler<crate::domain::event::OrderPaid>,
{
    handler: H,
    name: String,
}

impl<H> OrderPaidHandlerWrapper<H>
where
    H: EventHandler<crate::domain::event::OrderPaid>,
{
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            name: "OrderPaidHandler".to_string(),
        }
    }

    pub fn with_name(handler: H, name: String) -> Self {
        Self { handler, name }
    }
}

#[async_trait]
impl<H> DynEventHandler for OrderPaidHandlerWrapper<H>
where
    H: EventHandler<crate::domain::event::OrderPaid>,
{
    async fn handle_event(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        match event {
            DomainEvent::OrderPaid(e) => self.handler.handle(e.clone()).await,
            _ => Err(HandlerError::ProcessingFailed(
                "Event type mismatch".to_string(),
            )),
        }
    }

    fn can_handle(&self, event: &DomainEvent) -> bool {
        matches!(event, DomainEvent::OrderPaid(_))
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

/// OrderDelivered用のハンドラーラッパー
pub struct OrderDeliveredHandlerWrapper<H>
where
    H: EventHandler<crate::domain::event::OrderDelivered>,
{
    handler: H,
    name: String,
}

impl<H> OrderDeliveredHandlerWrapper<H>
where
    H: EventHandler<crate::domain::event::OrderDelivered>,
{
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            name: "OrderDeliveredHandler".to_string(),
        }
    }

    pub fn with_name(handler: H, name: String) -> Self {
        Self { handler, name }
    }
}

#[async_trait]
impl<H> DynEventHandler for OrderDeliveredHandlerWrapper<H>
where
    H: EventHandler<crate::domain::event::OrderDelivered>,
{
    async fn handle_event(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        match event {
            DomainEvent::OrderDelivered(e) => self.handler.handle(e.clone()).await,
            _ => Err(HandlerError::ProcessingFailed(
                "Event type mismatch".to_string(),
            )),
        }
    }

    fn can_handle(&self, event: &DomainEvent) -> bool {
        matches!(event, DomainEvent::OrderDelivered(_))
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

/// ReviewAdded用のハンドラーラッパー
pub struct ReviewAddedHandlerWrapper<H>
where
    H: EventHandler<crate::domain::event::ReviewAdded>,
{
    handler: H,
    name: String,
}

impl<H> ReviewAddedHandlerWrapper<H>
where
    H: EventHandler<crate::domain::event::ReviewAdded>,
{
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            name: "ReviewAddedHandler".to_string(),
        }
    }

    pub fn with_name(handler: H, name: String) -> Self {
        Self { handler, name }
    }
}

#[async_trait]
impl<H> DynEventHandler for ReviewAddedHandlerWrapper<H>
where
    H: EventHandler<crate::domain::event::ReviewAdded>,
{
    async fn handle_event(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        match event {
            DomainEvent::ReviewAdded(e) => self.handler.handle(e.clone()).await,
            _ => Err(HandlerError::ProcessingFailed(
                "Event type mismatch".to_string(),
            )),
        }
    }

    fn can_handle(&self, event: &DomainEvent) -> bool {
        matches!(event, DomainEvent::ReviewAdded(_))
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}
