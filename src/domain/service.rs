// ドメインサービス
// 複数の集約にまたがるビジネスロジックを実装

use crate::domain::error::DomainError;
use crate::domain::model::{OrderLine, ProductId};
use crate::domain::port::ProductRepository;
use std::sync::Arc;

/// 在庫予約サービス
/// 注文作成時の複数明細にわたる在庫予約と、部分失敗時の補償ロールバックを担当。
/// 個々の予約はリポジトリ層のアトミックな条件付き減算に委譲する
pub struct StockReservationService {
    product_repository: Arc<dyn ProductRepository>,
}

impl StockReservationService {
    /// 新しい在庫予約サービスを作成
    ///
    /// # Arguments
    /// * `product_repository` - 商品リポジトリ
    pub fn new(product_repository: Arc<dyn ProductRepository>) -> Self {
        Self { product_repository }
    }

    /// 注文の全明細の在庫を予約する
    /// いずれかの明細で在庫が不足した場合、それまでに予約済みの明細を
    /// すべて解放（補償ロールバック）してからInsufficientStockを返す
    ///
    /// # Returns
    /// * `Ok(())` - 全明細の予約成功
    /// * `Err(DomainError::InsufficientStock)` - 在庫不足（予約は残らない）
    pub async fn reserve_for_lines(&self, lines: &[OrderLine]) -> Result<(), DomainError> {
        let mut reserved: Vec<(ProductId, u32)> = Vec::new();

        for line in lines {
            match self
                .product_repository
                .reserve_stock(line.product_id(), line.quantity())
                .await
            {
                Ok(Some(_remaining)) => {
                    reserved.push((line.product_id(), line.quantity()));
                }
                Ok(None) => {
                    // 在庫不足 - 予約済みの明細を補償解放
                    self.release_reserved(&reserved).await?;
                    return Err(DomainError::InsufficientStock);
                }
                Err(e) => {
                    self.release_reserved(&reserved).await?;
                    return Err(DomainError::RepositoryError(format!(
                        "在庫の予約に失敗: {}",
                        e
                    )));
                }
            }
        }

        Ok(())
    }

    /// 注文の全明細の在庫を解放する（注文の永続化に失敗した場合の補償など）
    pub async fn release_for_lines(&self, lines: &[OrderLine]) -> Result<(), DomainError> {
        let reserved: Vec<(ProductId, u32)> = lines
            .iter()
            .map(|line| (line.product_id(), line.quantity()))
            .collect();
        self.release_reserved(&reserved).await
    }

    /// 予約済みの(商品ID, 数量)ペアをすべて解放する
    async fn release_reserved(
        &self,
        reserved: &[(ProductId, u32)],
    ) -> Result<(), DomainError> {
        for (product_id, quantity) in reserved {
            self.product_repository
                .release_stock(*product_id, *quantity)
                .await
                .map_err(|e| {
                    DomainError::RepositoryError(format!("在庫の補償解放に失敗: {}", e))
                })?;
        }
        Ok(())
    }
}
