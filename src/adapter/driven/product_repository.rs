use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{Money, Product, ProductId, RatingSummary, Review, UserId};
use crate::domain::port::{ProductRepository, RepositoryError};
use async_trait::async_trait;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{MySql, Pool, Row};

/// MySQL商品リポジトリ
/// 商品集約の永続化と、在庫・評価に対するアトミックな更新を実装する
#[derive(Clone)]
pub struct MySqlProductRepository {
    pool: Pool<MySql>,
}

impl MySqlProductRepository {
    /// 新しいMySQL商品リポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// JOINされた行の集合から1つの商品集約を再構築する
    fn product_from_rows(rows: &[sqlx::mysql::MySqlRow]) -> Result<Product, RepositoryError> {
        let first_row = rows
            .first()
            .ok_or_else(|| RepositoryError::FetchFailed("商品の行がありません".to_string()))?;

        let product_id = ProductId::from_string(first_row.get("id")).map_err(|e| {
            RepositoryError::FetchFailed(format!("商品IDの解析に失敗しました: {}", e))
        })?;

        let currency: String = first_row.get("currency");
        let price = Money::new(first_row.get::<Decimal, _>("price"), currency).map_err(|e| {
            RepositoryError::FetchFailed(format!("金額の構築に失敗しました: {}", e))
        })?;

        // レビューを再構築（投稿日時の昇順でJOINされている）
        let mut reviews = Vec::new();
        for row in rows {
            if let (Some(reviewer_id_str), Some(reviewer_name), Some(rating), Some(comment)) = (
                row.get::<Option<String>, _>("reviewer_id"),
                row.get::<Option<String>, _>("reviewer_name"),
                row.get::<Option<u8>, _>("review_rating"),
                row.get::<Option<String>, _>("review_comment"),
            ) {
                let reviewer_id = UserId::from_string(&reviewer_id_str).map_err(|e| {
                    RepositoryError::FetchFailed(format!(
                        "レビュー投稿者IDの解析に失敗しました: {}",
                        e
                    ))
                })?;

                let created_at: Option<DateTime<Utc>> = row.get("review_created_at");
                let created_at = created_at.ok_or_else(|| {
                    RepositoryError::FetchFailed("レビューの投稿日時がありません".to_string())
                })?;

                let review =
                    Review::reconstruct(reviewer_id, reviewer_name, rating, comment, created_at)
                        .map_err(|e| {
                            RepositoryError::FetchFailed(format!(
                                "レビューの再構築に失敗しました: {}",
                                e
                            ))
                        })?;

                reviews.push(review);
            }
        }

        Product::reconstruct(
            product_id,
            first_row.get("name"),
            first_row.get("image"),
            price,
            first_row.get::<u32, _>("count_in_stock"),
            first_row.get::<Decimal, _>("rating"),
            first_row.get::<u32, _>("num_reviews"),
            reviews,
        )
        .map_err(|e| {
            RepositoryError::FetchFailed(format!("商品集約の再構築に失敗しました: {}", e))
        })
    }

    /// JOINされた結果から複数の商品を再構築する
    /// 行の出現順（クエリのORDER BY）を保ったままグループ化する
    fn products_from_rows(
        rows: Vec<sqlx::mysql::MySqlRow>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let mut grouped: Vec<(String, Vec<sqlx::mysql::MySqlRow>)> = Vec::new();
        for row in rows {
            let product_id: String = row.get("id");
            match grouped.iter_mut().find(|(id, _)| *id == product_id) {
                Some((_, group)) => group.push(row),
                None => grouped.push((product_id, vec![row])),
            }
        }

        let mut products = Vec::new();
        for (_, group) in &grouped {
            products.push(Self::product_from_rows(group)?);
        }

        Ok(products)
    }
}

/// JOIN付きの商品取得クエリの共通SELECT句
const PRODUCT_SELECT: &str = r#"
    SELECT
        p.id, p.name, p.image, p.price, p.currency,
        p.count_in_stock, p.rating, p.num_reviews, p.created_at,
        r.reviewer_id, r.reviewer_name,
        r.rating AS review_rating,
        r.comment AS review_comment,
        r.created_at AS review_created_at
    FROM products p
    LEFT JOIN reviews r ON p.id = r.product_id
"#;

#[async_trait]
impl ProductRepository for MySqlProductRepository {
    async fn save(&self, product: &Product) -> Result<(), RepositoryError> {
        // 商品データをproductsテーブルにUPSERT
        // 評価集計（rating / num_reviews）はadd_reviewのアトミックな更新だけが
        // 書き込むため、更新句に含めない
        sqlx::query(
            r#"
            INSERT INTO products (id, name, image, price, currency, count_in_stock, rating, num_reviews)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                name = VALUES(name),
                image = VALUES(image),
                price = VALUES(price),
                currency = VALUES(currency),
                count_in_stock = VALUES(count_in_stock)
            "#,
        )
        .bind(product.id().to_string())
        .bind(product.name())
        .bind(product.image())
        .bind(product.price().amount())
        .bind(product.price().currency())
        .bind(product.count_in_stock())
        .bind(product.rating())
        .bind(product.num_reviews())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("商品の保存に失敗しました: {}", e)))
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn find_by_id(&self, product_id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let query = format!(
            "{} WHERE p.id = ? ORDER BY r.created_at ASC",
            PRODUCT_SELECT
        );
        let rows = sqlx::query(&query)
            .bind(product_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("商品の取得に失敗しました: {}", e)))
            .map_err(RepositoryError::from)?;

        if rows.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self::product_from_rows(&rows)?))
    }

    async fn find_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let query = format!(
            "{} ORDER BY p.created_at DESC, p.id, r.created_at ASC",
            PRODUCT_SELECT
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DatabaseError::QueryError(format!("商品一覧の取得に失敗しました: {}", e))
            })
            .map_err(RepositoryError::from)?;

        Self::products_from_rows(rows)
    }

    async fn reserve_stock(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<u32>, RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| {
                DatabaseError::ConnectionError(format!(
                    "トランザクション開始に失敗しました: {}",
                    e
                ))
            })
            .map_err(RepositoryError::from)?;

        // 条件付き減算を1つのUPDATE文で実行する。
        // 読み取り→チェック→書き込みを分離すると並行予約で在庫が負になり得る
        let result = sqlx::query(
            r#"
            UPDATE products
            SET count_in_stock = count_in_stock - ?
            WHERE id = ? AND count_in_stock >= ?
            "#,
        )
        .bind(quantity)
        .bind(product_id.to_string())
        .bind(quantity)
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("在庫の予約に失敗しました: {}", e)))
        .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            // 在庫不足（存在しない商品も在庫0と同様に扱う）
            return Ok(None);
        }

        let row = sqlx::query("SELECT count_in_stock FROM products WHERE id = ?")
            .bind(product_id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("在庫数の取得に失敗しました: {}", e)))
            .map_err(RepositoryError::from)?;

        tx.commit()
            .await
            .map_err(|e| {
                DatabaseError::QueryError(format!(
                    "トランザクションのコミットに失敗しました: {}",
                    e
                ))
            })
            .map_err(RepositoryError::from)?;

        Ok(Some(row.get::<u32, _>("count_in_stock")))
    }

    async fn release_stock(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<u32, RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| {
                DatabaseError::ConnectionError(format!(
                    "トランザクション開始に失敗しました: {}",
                    e
                ))
            })
            .map_err(RepositoryError::from)?;

        let result = sqlx::query(
            "UPDATE products SET count_in_stock = count_in_stock + ? WHERE id = ?",
        )
        .bind(quantity)
        .bind(product_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("在庫の解放に失敗しました: {}", e)))
        .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::FetchFailed(format!(
                "商品が見つかりません: {}",
                product_id
            )));
        }

        let row = sqlx::query("SELECT count_in_stock FROM products WHERE id = ?")
            .bind(product_id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("在庫数の取得に失敗しました: {}", e)))
            .map_err(RepositoryError::from)?;

        tx.commit()
            .await
            .map_err(|e| {
                DatabaseError::QueryError(format!(
                    "トランザクションのコミットに失敗しました: {}",
                    e
                ))
            })
            .map_err(RepositoryError::from)?;

        Ok(row.get::<u32, _>("count_in_stock"))
    }

    async fn add_review(
        &self,
        product_id: ProductId,
        review: &Review,
    ) -> Result<Option<RatingSummary>, RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| {
                DatabaseError::ConnectionError(format!(
                    "トランザクション開始に失敗しました: {}",
                    e
                ))
            })
            .map_err(RepositoryError::from)?;

        // 商品行をロックして同一商品への並行レビューを直列化する。
        // レビューの追記と集計の更新が1つのアトミックな単位になる
        let locked = sqlx::query("SELECT id FROM products WHERE id = ? FOR UPDATE")
            .bind(product_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("商品のロックに失敗しました: {}", e)))
            .map_err(RepositoryError::from)?;

        if locked.is_none() {
            return Err(RepositoryError::FetchFailed(format!(
                "商品が見つかりません: {}",
                product_id
            )));
        }

        // (product_id, reviewer_id)の一意キーが重複レビューを排除する
        let insert_result = sqlx::query(
            r#"
            INSERT INTO reviews (product_id, reviewer_id, reviewer_name, rating, comment, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(product_id.to_string())
        .bind(review.reviewer_id().to_string())
        .bind(review.reviewer_name())
        .bind(review.rating())
        .bind(review.comment())
        .bind(review.created_at())
        .execute(&mut *tx)
        .await;

        if let Err(e) = insert_result {
            if e.as_database_error()
                .map_or(false, |db_err| db_err.is_unique_violation())
            {
                // 重複レビュー。集計は変更されない
                return Ok(None);
            }
            return Err(RepositoryError::from(DatabaseError::QueryError(format!(
                "レビューの保存に失敗しました: {}",
                e
            ))));
        }

        // 集計は保存済みレビュー集合全体から再計算する
        let rating_rows = sqlx::query("SELECT rating FROM reviews WHERE product_id = ?")
            .bind(product_id.to_string())
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| {
                DatabaseError::QueryError(format!("レビューの取得に失敗しました: {}", e))
            })
            .map_err(RepositoryError::from)?;

        let ratings: Vec<u8> = rating_rows
            .iter()
            .map(|row| row.get::<u8, _>("rating"))
            .collect();
        let summary = RatingSummary::from_ratings(&ratings);

        sqlx::query("UPDATE products SET rating = ?, num_reviews = ? WHERE id = ?")
            .bind(summary.rating())
            .bind(summary.num_reviews())
            .bind(product_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DatabaseError::QueryError(format!("評価集計の更新に失敗しました: {}", e))
            })
            .map_err(RepositoryError::from)?;

        tx.commit()
            .await
            .map_err(|e| {
                DatabaseError::QueryError(format!(
                    "トランザクションのコミットに失敗しました: {}",
                    e
                ))
            })
            .map_err(RepositoryError::from)?;

        Ok(Some(summary))
    }
}
