use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{
    Money, Order, OrderId, OrderLine, OrderStatus, PaymentReceipt, ProductId, ShippingAddress,
    UserId,
};
use crate::domain::port::{OrderRepository, RepositoryError, SalesSummary};
use crate::domain::pricing::OrderPricing;
use async_trait::async_trait;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{MySql, Pool, Row};

/// MySQL注文リポジトリ
/// MySQLデータベースを使用して注文集約を永続化する
pub struct MySqlOrderRepository {
    pool: Pool<MySql>,
}

impl MySqlOrderRepository {
    /// 新しいMySQL注文リポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// JOINされた行の集合から1つの注文集約を再構築する
    /// すべての行が同じ注文に属している前提
    fn order_from_rows(rows: &[sqlx::mysql::MySqlRow]) -> Result<Order, RepositoryError> {
        let first_row = rows
            .first()
            .ok_or_else(|| RepositoryError::FetchFailed("注文の行がありません".to_string()))?;

        let order_id = OrderId::from_string(first_row.get("id")).map_err(|e| {
            RepositoryError::FetchFailed(format!("注文IDの解析に失敗しました: {}", e))
        })?;

        let user_id = UserId::from_string(first_row.get("user_id")).map_err(|e| {
            RepositoryError::FetchFailed(format!("ユーザーIDの解析に失敗しました: {}", e))
        })?;

        let status = OrderStatus::from_string(first_row.get("status")).map_err(|e| {
            RepositoryError::FetchFailed(format!("注文ステータスの解析に失敗しました: {}", e))
        })?;

        let shipping_address = ShippingAddress::new(
            first_row.get("address"),
            first_row.get("city"),
            first_row.get("postal_code"),
            first_row.get("country"),
        )
        .map_err(|e| {
            RepositoryError::FetchFailed(format!("配送先住所の構築に失敗しました: {}", e))
        })?;

        let currency: String = first_row.get("currency");
        let money_from = |amount: Decimal| -> Result<Money, RepositoryError> {
            Money::new(amount, currency.clone()).map_err(|e| {
                RepositoryError::FetchFailed(format!("金額の構築に失敗しました: {}", e))
            })
        };

        let pricing = OrderPricing::new(
            money_from(first_row.get("items_price"))?,
            money_from(first_row.get("shipping_price"))?,
            money_from(first_row.get("tax_price"))?,
            money_from(first_row.get("total_price"))?,
        )
        .map_err(|e| {
            RepositoryError::FetchFailed(format!("価格スナップショットの再構築に失敗しました: {}", e))
        })?;

        // 決済レシートを再構築（支払い済みの場合のみ）
        let payment_receipt = match first_row.get::<Option<String>, _>("receipt_id") {
            Some(receipt_id) => {
                let receipt_status: Option<String> = first_row.get("receipt_status");
                let receipt_amount: Option<Decimal> = first_row.get("receipt_amount");
                let payer_email: Option<String> = first_row.get("payer_email");

                let status = receipt_status.ok_or_else(|| {
                    RepositoryError::FetchFailed("レシートのステータスがありません".to_string())
                })?;
                let amount = receipt_amount.ok_or_else(|| {
                    RepositoryError::FetchFailed("レシートの金額がありません".to_string())
                })?;

                Some(PaymentReceipt::new(
                    receipt_id,
                    status,
                    money_from(amount)?,
                    payer_email,
                ))
            }
            None => None,
        };

        // 注文明細を再構築
        let mut lines = Vec::new();
        for row in rows {
            if let (Some(product_id_str), Some(name), Some(image), Some(quantity), Some(amount)) = (
                row.get::<Option<String>, _>("line_product_id"),
                row.get::<Option<String>, _>("line_name"),
                row.get::<Option<String>, _>("line_image"),
                row.get::<Option<u32>, _>("line_quantity"),
                row.get::<Option<Decimal>, _>("line_unit_price"),
            ) {
                let product_id = ProductId::from_string(&product_id_str).map_err(|e| {
                    RepositoryError::FetchFailed(format!("商品IDの解析に失敗しました: {}", e))
                })?;

                let line_currency: Option<String> = row.get("line_currency");
                let unit_price = Money::new(
                    amount,
                    line_currency.unwrap_or_else(|| currency.clone()),
                )
                .map_err(|e| {
                    RepositoryError::FetchFailed(format!("金額の構築に失敗しました: {}", e))
                })?;

                let line = OrderLine::new(product_id, name, image, quantity, unit_price)
                    .map_err(|e| {
                        RepositoryError::FetchFailed(format!(
                            "注文明細の構築に失敗しました: {}",
                            e
                        ))
                    })?;

                lines.push(line);
            }
        }

        let paid_at: Option<DateTime<Utc>> = first_row.get("paid_at");
        let delivered_at: Option<DateTime<Utc>> = first_row.get("delivered_at");
        let created_at: DateTime<Utc> = first_row.get("created_at");

        Order::reconstruct(
            order_id,
            user_id,
            lines,
            shipping_address,
            first_row.get("payment_method"),
            pricing,
            status,
            payment_receipt,
            paid_at,
            delivered_at,
            created_at,
        )
        .map_err(|e| {
            RepositoryError::FetchFailed(format!("注文集約の再構築に失敗しました: {}", e))
        })
    }

    /// JOINされた結果から複数の注文を再構築する
    /// 行の出現順（クエリのORDER BY）を保ったままグループ化する
    fn orders_from_rows(rows: Vec<sqlx::mysql::MySqlRow>) -> Result<Vec<Order>, RepositoryError> {
        let mut grouped: Vec<(String, Vec<sqlx::mysql::MySqlRow>)> = Vec::new();
        for row in rows {
            let order_id: String = row.get("id");
            match grouped.iter_mut().find(|(id, _)| *id == order_id) {
                Some((_, group)) => group.push(row),
                None => grouped.push((order_id, vec![row])),
            }
        }

        let mut orders = Vec::new();
        for (_, group) in &grouped {
            orders.push(Self::order_from_rows(group)?);
        }

        Ok(orders)
    }
}

/// JOIN付きの注文取得クエリの共通SELECT句
const ORDER_SELECT: &str = r#"
    SELECT
        o.id, o.user_id, o.status, o.payment_method,
        o.address, o.city, o.postal_code, o.country,
        o.items_price, o.shipping_price, o.tax_price, o.total_price, o.currency,
        o.receipt_id, o.receipt_status, o.receipt_amount, o.payer_email,
        o.paid_at, o.delivered_at, o.created_at,
        ol.product_id AS line_product_id,
        ol.name AS line_name,
        ol.image AS line_image,
        ol.quantity AS line_quantity,
        ol.unit_price AS line_unit_price,
        ol.currency AS line_currency
    FROM orders o
    LEFT JOIN order_lines ol ON o.id = ol.order_id
"#;

#[async_trait]
impl OrderRepository for MySqlOrderRepository {
    async fn save(&self, order: &Order) -> Result<(), RepositoryError> {
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

        let receipt = order.payment_receipt();
        let (receipt_id, receipt_status, receipt_amount, payer_email) = match receipt {
            Some(r) => (
                Some(r.receipt_id().to_string()),
                Some(r.status().to_string()),
                Some(r.amount().amount()),
                r.payer_email().map(|s| s.to_string()),
            ),
            None => (None, None, None, None),
        };

        // 注文データをordersテーブルにUPSERT
        // 明細と価格スナップショットは作成後不変のため、
        // 更新句はライフサイクル関連のフィールドのみに限定する
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, status, payment_method,
                address, city, postal_code, country,
                items_price, shipping_price, tax_price, total_price, currency,
                receipt_id, receipt_status, receipt_amount, payer_email,
                paid_at, delivered_at, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                status = VALUES(status),
                receipt_id = VALUES(receipt_id),
                receipt_status = VALUES(receipt_status),
                receipt_amount = VALUES(receipt_amount),
                payer_email = VALUES(payer_email),
                paid_at = VALUES(paid_at),
                delivered_at = VALUES(delivered_at)
            "#,
        )
        .bind(order.id().to_string())
        .bind(order.user_id().to_string())
        .bind(order.status().to_string())
        .bind(order.payment_method())
        .bind(order.shipping_address().address())
        .bind(order.shipping_address().city())
        .bind(order.shipping_address().postal_code())
        .bind(order.shipping_address().country())
        .bind(order.pricing().items_price().amount())
        .bind(order.pricing().shipping_price().amount())
        .bind(order.pricing().tax_price().amount())
        .bind(order.pricing().total_price().amount())
        .bind(order.pricing().total_price().currency())
        .bind(receipt_id)
        .bind(receipt_status)
        .bind(receipt_amount)
        .bind(payer_email)
        .bind(order.paid_at())
        .bind(order.delivered_at())
        .bind(order.created_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("注文の保存に失敗しました: {}", e)))
        .map_err(RepositoryError::from)?;

        // 既存の注文明細を削除してから挿入し直す
        sqlx::query("DELETE FROM order_lines WHERE order_id = ?")
            .bind(order.id().to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DatabaseError::QueryError(format!("注文明細の削除に失敗しました: {}", e))
            })
            .map_err(RepositoryError::from)?;

        for line in order.lines() {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, product_id, name, image, quantity, unit_price, currency)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(order.id().to_string())
            .bind(line.product_id().to_string())
            .bind(line.name())
            .bind(line.image())
            .bind(line.quantity())
            .bind(line.unit_price().amount())
            .bind(line.unit_price().currency())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DatabaseError::QueryError(format!("注文明細の保存に失敗しました: {}", e))
            })
            .map_err(RepositoryError::from)?;
        }

        tx.commit()
            .await
            .map_err(|e| {
                DatabaseError::QueryError(format!(
                    "トランザクションのコミットに失敗しました: {}",
                    e
                ))
            })
            .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let query = format!("{} WHERE o.id = ?", ORDER_SELECT);
        let rows = sqlx::query(&query)
            .bind(order_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("注文の取得に失敗しました: {}", e)))
            .map_err(RepositoryError::from)?;

        if rows.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self::order_from_rows(&rows)?))
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let query = format!(
            "{} WHERE o.user_id = ? ORDER BY o.created_at DESC, o.id",
            ORDER_SELECT
        );
        let rows = sqlx::query(&query)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DatabaseError::QueryError(format!("注文一覧の取得に失敗しました: {}", e))
            })
            .map_err(RepositoryError::from)?;

        Self::orders_from_rows(rows)
    }

    async fn paid_sales_summary(&self) -> Result<SalesSummary, RepositoryError> {
        // 支払い済み（Paid以降）の注文に対する導出リード
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS order_count, COALESCE(SUM(total_price), 0) AS total_sales
            FROM orders
            WHERE status IN ('Paid', 'Delivered')
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("売上集計の取得に失敗しました: {}", e)))
        .map_err(RepositoryError::from)?;

        let order_count: i64 = row.get("order_count");
        let total_sales: Decimal = row.get("total_sales");

        Ok(SalesSummary {
            order_count: order_count as u64,
            total_sales: Money::usd(total_sales),
        })
    }

    fn next_identity(&self) -> OrderId {
        OrderId::new()
    }
}
