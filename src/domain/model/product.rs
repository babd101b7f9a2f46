use crate::domain::error::DomainError;
use crate::domain::model::{Money, ProductId, Review, UserId};
use rust_decimal::{Decimal, RoundingStrategy};

/// 評価の集計値
/// レビュー集合から導出される平均評価とレビュー数のペア。
/// 常にレビュー集合と整合した状態で保存される
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    rating: Decimal,
    num_reviews: u32,
}

impl RatingSummary {
    /// レビューが存在しない状態の集計値
    pub fn empty() -> Self {
        Self {
            rating: Decimal::ZERO,
            num_reviews: 0,
        }
    }

    /// 評価値のリストから集計値を再計算する
    /// 平均は毎回レビュー集合全体から計算し直す（逐次加算による誤差蓄積を避ける）
    pub fn from_ratings(ratings: &[u8]) -> Self {
        if ratings.is_empty() {
            return Self::empty();
        }
        let sum: Decimal = ratings.iter().map(|r| Decimal::from(*r)).sum();
        let mean = (sum / Decimal::from(ratings.len() as u32))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Self {
            rating: mean,
            num_reviews: ratings.len() as u32,
        }
    }

    /// レビュー集合から集計値を再計算する
    pub fn from_reviews(reviews: &[Review]) -> Self {
        let ratings: Vec<u8> = reviews.iter().map(|r| r.rating()).collect();
        Self::from_ratings(&ratings)
    }

    /// 平均評価を取得（0〜5、小数点以下2桁）
    pub fn rating(&self) -> Decimal {
        self.rating
    }

    /// レビュー数を取得
    pub fn num_reviews(&self) -> u32 {
        self.num_reviews
    }
}

/// Product集約
/// 商品の在庫数と、レビュー集合から導出される評価集計を管理する。
/// カタログ情報（名前・価格・画像）は外部のカタログ管理が更新し、
/// この集約は在庫と評価のフィールドのみを変更する
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    id: ProductId,
    name: String,
    image: String,
    price: Money,
    count_in_stock: u32,
    rating: Decimal,
    num_reviews: u32,
    reviews: Vec<Review>,
}

impl Product {
    /// 新しい商品を作成
    /// 価格は0以上である必要がある
    pub fn new(
        id: ProductId,
        name: String,
        image: String,
        price: Money,
        count_in_stock: u32,
    ) -> Result<Self, DomainError> {
        if price.is_negative() {
            return Err(DomainError::InvalidValue(
                "商品価格は0以上である必要があります".to_string(),
            ));
        }
        Ok(Self {
            id,
            name,
            image,
            price,
            count_in_stock,
            rating: Decimal::ZERO,
            num_reviews: 0,
            reviews: Vec::new(),
        })
    }

    /// データベースから取得したデータで商品を再構築
    /// リポジトリでの使用を想定
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: ProductId,
        name: String,
        image: String,
        price: Money,
        count_in_stock: u32,
        rating: Decimal,
        num_reviews: u32,
        reviews: Vec<Review>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            id,
            name,
            image,
            price,
            count_in_stock,
            rating,
            num_reviews,
            reviews,
        })
    }

    /// 商品IDを取得
    pub fn id(&self) -> ProductId {
        self.id
    }

    /// 商品名を取得
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 商品画像のパスを取得
    pub fn image(&self) -> &str {
        &self.image
    }

    /// 現在価格を取得
    pub fn price(&self) -> Money {
        self.price
    }

    /// 在庫数を取得
    pub fn count_in_stock(&self) -> u32 {
        self.count_in_stock
    }

    /// 平均評価を取得
    pub fn rating(&self) -> Decimal {
        self.rating
    }

    /// レビュー数を取得
    pub fn num_reviews(&self) -> u32 {
        self.num_reviews
    }

    /// レビューのリストを取得
    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    /// 指定された数量の在庫が利用可能かチェック
    pub fn has_available_stock(&self, quantity: u32) -> bool {
        self.count_in_stock >= quantity
    }

    /// 在庫を予約する（注文作成時のアトミックな減算）
    ///
    /// # Returns
    /// * `Ok(u32)` - 予約後の在庫数
    /// * `Err(DomainError::InsufficientStock)` - 在庫不足
    pub fn reserve(&mut self, quantity: u32) -> Result<u32, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity);
        }
        if !self.has_available_stock(quantity) {
            return Err(DomainError::InsufficientStock);
        }
        self.count_in_stock -= quantity;
        Ok(self.count_in_stock)
    }

    /// 在庫を解放する（予約の補償ロールバック用）
    ///
    /// # Returns
    /// * `Ok(u32)` - 解放後の在庫数
    pub fn release(&mut self, quantity: u32) -> Result<u32, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity);
        }
        self.count_in_stock += quantity;
        Ok(self.count_in_stock)
    }

    /// レビューを追加し、評価集計を再計算する
    /// レビューの追加と集計の更新は1つのアトミックな更新として永続化される
    ///
    /// # Returns
    /// * `Ok(RatingSummary)` - 更新後の集計値
    /// * `Err(DomainError::DuplicateReview)` - 同一ユーザーの重複レビュー
    pub fn add_review(&mut self, review: Review) -> Result<RatingSummary, DomainError> {
        if self.has_review_by(review.reviewer_id()) {
            return Err(DomainError::DuplicateReview);
        }

        self.reviews.push(review);
        let summary = RatingSummary::from_reviews(&self.reviews);
        self.rating = summary.rating();
        self.num_reviews = summary.num_reviews();

        Ok(summary)
    }

    /// 指定されたユーザーのレビューが既に存在するかチェック
    pub fn has_review_by(&self, reviewer_id: UserId) -> bool {
        self.reviews
            .iter()
            .any(|review| review.reviewer_id() == reviewer_id)
    }

    /// 現在のレビュー集合から導出される集計値
    pub fn rating_summary(&self) -> RatingSummary {
        RatingSummary::from_reviews(&self.reviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_product(count_in_stock: u32) -> Product {
        Product::new(
            ProductId::new(),
            "ワイヤレスキーボード".to_string(),
            "/images/keyboard.jpg".to_string(),
            Money::usd(dec!(49.99)),
            count_in_stock,
        )
        .unwrap()
    }

    fn sample_review(rating: u8) -> Review {
        Review::new(
            UserId::new(),
            "テストユーザー".to_string(),
            rating,
            "コメント".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_product_creation() {
        let product = sample_product(10);
        assert_eq!(product.count_in_stock(), 10);
        assert_eq!(product.rating(), Decimal::ZERO);
        assert_eq!(product.num_reviews(), 0);
        assert!(product.reviews().is_empty());
    }

    #[test]
    fn test_product_negative_price_rejected() {
        let result = Product::new(
            ProductId::new(),
            "不正な商品".to_string(),
            "/images/bad.jpg".to_string(),
            Money::usd(dec!(-1.00)),
            0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_reserve_success() {
        let mut product = sample_product(10);
        let remaining = product.reserve(4).unwrap();
        assert_eq!(remaining, 6);
        assert_eq!(product.count_in_stock(), 6);
    }

    #[test]
    fn test_reserve_insufficient_stock() {
        let mut product = sample_product(3);
        let result = product.reserve(5);
        assert_eq!(result.unwrap_err(), DomainError::InsufficientStock);
        assert_eq!(product.count_in_stock(), 3); // 在庫数は変わらない
    }

    #[test]
    fn test_reserve_exact_quantity() {
        let mut product = sample_product(5);
        let remaining = product.reserve(5).unwrap();
        assert_eq!(remaining, 0);
        // 在庫0からの追加予約は失敗する
        assert!(product.reserve(1).is_err());
    }

    #[test]
    fn test_release() {
        let mut product = sample_product(2);
        let count = product.release(3).unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn test_has_available_stock() {
        let product = sample_product(10);
        assert!(product.has_available_stock(10));
        assert!(!product.has_available_stock(11));
    }

    #[test]
    fn test_add_review_updates_aggregate() {
        let mut product = sample_product(10);

        let summary = product.add_review(sample_review(4)).unwrap();
        assert_eq!(summary.rating(), dec!(4.00));
        assert_eq!(summary.num_reviews(), 1);

        let summary = product.add_review(sample_review(5)).unwrap();
        assert_eq!(summary.rating(), dec!(4.50));
        assert_eq!(summary.num_reviews(), 2);

        // 集計値は常に保存済みレビュー集合の平均と一致する
        assert_eq!(product.rating(), product.rating_summary().rating());
        assert_eq!(product.num_reviews(), product.reviews().len() as u32);
    }

    #[test]
    fn test_duplicate_review_rejected_and_aggregate_unchanged() {
        let mut product = sample_product(10);
        let reviewer = UserId::new();
        let first = Review::new(reviewer, "ユーザーA".to_string(), 5, "最高".to_string()).unwrap();
        product.add_review(first).unwrap();

        let rating_before = product.rating();
        let count_before = product.num_reviews();

        let second = Review::new(reviewer, "ユーザーA".to_string(), 1, "やっぱり微妙".to_string())
            .unwrap();
        let result = product.add_review(second);

        assert_eq!(result.unwrap_err(), DomainError::DuplicateReview);
        assert_eq!(product.rating(), rating_before);
        assert_eq!(product.num_reviews(), count_before);
        assert_eq!(product.reviews().len(), 1);
    }

    #[test]
    fn test_rating_mean_recomputed_from_full_set() {
        let summary = RatingSummary::from_ratings(&[1, 2, 3, 4, 5]);
        assert_eq!(summary.rating(), dec!(3.00));
        assert_eq!(summary.num_reviews(), 5);

        // 丸めは四捨五入（2/3 = 0.67）
        let summary = RatingSummary::from_ratings(&[1, 2, 5]);
        assert_eq!(summary.rating(), dec!(2.67));
    }

    #[test]
    fn test_rating_summary_empty() {
        let summary = RatingSummary::from_ratings(&[]);
        assert_eq!(summary.rating(), Decimal::ZERO);
        assert_eq!(summary.num_reviews(), 0);
    }
}
