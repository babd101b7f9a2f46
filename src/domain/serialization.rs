use crate::domain::event::DomainEvent;

/// シリアライゼーションエラー
#[derive(Debug, Clone, thiserror::Error)]
pub enum SerializationError {
    #[error("Event serialization failed: {0}")]
    SerializationFailed(String),
    #[error("Event deserialization failed: {0}")]
    DeserializationFailed(String),
}

/// イベントシリアライザー
/// ドメインイベントのJSONシリアライゼーションを担当する。
/// イベントバスは発行前に往復変換を検証し、配信不能なイベントを早期に検出する
#[derive(Debug, Clone, Default)]
pub struct EventSerializer;

impl EventSerializer {
    /// 新しいシリアライザーを作成
    pub fn new() -> Self {
        Self
    }

    /// イベントをJSON文字列にシリアライズ
    pub fn serialize_event(&self, event: &DomainEvent) -> Result<String, SerializationError> {
        serde_json::to_string(event)
            .map_err(|e| SerializationError::SerializationFailed(e.to_string()))
    }

    /// JSON文字列からイベントをデシリアライズ
    pub fn deserialize_event(&self, json: &str) -> Result<DomainEvent, SerializationError> {
        serde_json::from_str(json)
            .map_err(|e| SerializationError::DeserializationFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::{OrderDelivered, OrderPlaced, ReviewAdded};
    use crate::domain::model::{Money, OrderId, OrderLine, ProductId, UserId};
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_placed_round_trip() {
        let serializer = EventSerializer::new();
        let line = OrderLine::new(
            ProductId::new(),
            "商品".to_string(),
            "/images/item.jpg".to_string(),
            2,
            Money::usd(dec!(100.00)),
        )
        .unwrap();
        let event = OrderPlaced::new(
            OrderId::new(),
            UserId::new(),
            vec![line],
            Money::usd(dec!(272.50)),
        );
        let original = DomainEvent::OrderPlaced(event);

        let json = serializer.serialize_event(&original).unwrap();
        let restored = serializer.deserialize_event(&json).unwrap();

        assert_eq!(restored.event_type(), "OrderPlaced");
        assert_eq!(restored.metadata().event_id, original.metadata().event_id);
    }

    #[test]
    fn test_order_delivered_round_trip() {
        let serializer = EventSerializer::new();
        let original = DomainEvent::OrderDelivered(OrderDelivered::new(OrderId::new()));

        let json = serializer.serialize_event(&original).unwrap();
        let restored = serializer.deserialize_event(&json).unwrap();

        assert_eq!(restored.event_type(), "OrderDelivered");
    }

    #[test]
    fn test_review_added_round_trip() {
        let serializer = EventSerializer::new();
        let original =
            DomainEvent::ReviewAdded(ReviewAdded::new(ProductId::new(), UserId::new(), 4));

        let json = serializer.serialize_event(&original).unwrap();
        let restored = serializer.deserialize_event(&json).unwrap();

        match restored {
            DomainEvent::ReviewAdded(e) => assert_eq!(e.rating, 4),
            other => panic!("Expected ReviewAdded, got {}", other.event_type()),
        }
    }

    #[test]
    fn test_deserialize_invalid_json_fails() {
        let serializer = EventSerializer::new();
        let result = serializer.deserialize_event("{not json");
        assert!(matches!(
            result,
            Err(SerializationError::DeserializationFailed(_))
        ));
    }
}
