/// ドメイン層のエラー型
/// ビジネスルール違反を表現する
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 注文明細が空の状態で注文を作成しようとした
    EmptyOrder,
    /// 在庫不足
    InsufficientStock,
    /// 無効な数量（例: 0以下の数量）
    InvalidQuantity,
    /// 無効な評価値（1〜5の範囲外）
    InvalidRating,
    /// 同じユーザーによる同一商品への重複レビュー
    DuplicateReview,
    /// 既に支払い済みの注文に対する支払い確認
    AlreadyPaid,
    /// 既に配達完了の注文に対する配達確認
    AlreadyDelivered,
    /// 未払いの注文を配達完了にしようとした
    NotPaid,
    /// 決済プロセッサーが成功ステータス以外のレシートを返した
    PaymentRejected(String),
    /// レシートの決済金額が注文合計と一致しない
    PaymentAmountMismatch,
    /// クライアント送信の合計金額がサーバー計算と一致しない
    /// （現状はサーバー値で上書きするため未使用。厳格モード用に予約）
    PriceMismatch,
    /// 無効な配送先住所（例: 必須フィールドが空）
    InvalidAddress(String),
    /// 通貨の不一致
    CurrencyMismatch,
    /// 無効な値
    InvalidValue(String),
    /// リポジトリ操作の失敗（ドメインサービス内で発生）
    RepositoryError(String),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::EmptyOrder => write!(f, "Order has no line items"),
            DomainError::InsufficientStock => write!(f, "Insufficient stock"),
            DomainError::InvalidQuantity => write!(f, "Invalid quantity"),
            DomainError::InvalidRating => write!(f, "Rating must be between 1 and 5"),
            DomainError::DuplicateReview => write!(f, "Product already reviewed by this user"),
            DomainError::AlreadyPaid => write!(f, "Order is already paid"),
            DomainError::AlreadyDelivered => write!(f, "Order is already delivered"),
            DomainError::NotPaid => write!(f, "Order is not paid yet"),
            DomainError::PaymentRejected(status) => {
                write!(f, "Payment capture was not successful: {}", status)
            }
            DomainError::PaymentAmountMismatch => {
                write!(f, "Captured amount does not match the order total")
            }
            DomainError::PriceMismatch => {
                write!(f, "Client submitted total does not match the server total")
            }
            DomainError::InvalidAddress(msg) => write!(f, "Invalid address: {}", msg),
            DomainError::CurrencyMismatch => write!(f, "Currency mismatch"),
            DomainError::InvalidValue(msg) => write!(f, "Invalid value: {}", msg),
            DomainError::RepositoryError(msg) => write!(f, "Repository error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
