use crate::db::queries;
use crate::error::AppError;
use crate::models::{Delivery, DeliveryFilter, DeliveryInput, NewArticle, ReconciliationReport};
use crate::service::conformity::resolve_conformity;
use crate::service::reconciliation::{aggregate_deliveries, check_capacity};
use sqlx::{PgConnection, PgPool};

/// 到货单服务: 提交、修改、删除、查询、对账
pub struct DeliveryService {
    pool: PgPool,
}

impl DeliveryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 提交到货单
    ///
    /// 1. 校验必填字段
    /// 2. 由明细推导整单合格状态
    /// 3. 有采购单号时, 在事务内锁定该单号并做超量校验
    /// 4. 写入表头和明细后提交
    pub async fn submit(&self, input: DeliveryInput) -> Result<Delivery, AppError> {
        let delivery = input.validate().map_err(AppError::Validation)?;
        let conformite = resolve_conformity(delivery.articles.iter().map(|a| a.conformite.as_str()));

        let mut tx = self.pool.begin().await?;
        if let Some(num_bc) = &delivery.num_bc {
            queries::lock_order_reference(&mut *tx, num_bc).await?;
            ensure_capacity(&mut *tx, num_bc, None, &delivery.articles).await?;
        }

        let delivery_id = queries::insert_delivery(&mut *tx, &delivery, conformite).await?;
        queries::insert_articles(&mut *tx, delivery_id, &delivery.articles).await?;
        tx.commit().await?;

        tracing::info!(
            "到货单 {} 已登记: numBC={:?}, {} 条明细, conformite={}",
            delivery_id,
            delivery.num_bc,
            delivery.articles.len(),
            conformite
        );
        self.get(delivery_id).await
    }

    /// 整单替换 (明细全部重写, 合格状态重新推导, 超量校验排除本单)
    pub async fn update(&self, delivery_id: i64, input: DeliveryInput) -> Result<Delivery, AppError> {
        let delivery = input.validate().map_err(AppError::Validation)?;
        let conformite = resolve_conformity(delivery.articles.iter().map(|a| a.conformite.as_str()));

        let mut tx = self.pool.begin().await?;
        if queries::get_delivery(&mut *tx, delivery_id).await?.is_none() {
            return Err(not_found(delivery_id));
        }
        if let Some(num_bc) = &delivery.num_bc {
            queries::lock_order_reference(&mut *tx, num_bc).await?;
            ensure_capacity(&mut *tx, num_bc, Some(delivery_id), &delivery.articles).await?;
        }

        queries::update_delivery(&mut *tx, delivery_id, &delivery, conformite).await?;
        queries::delete_delivery_articles(&mut *tx, delivery_id).await?;
        queries::insert_articles(&mut *tx, delivery_id, &delivery.articles).await?;
        tx.commit().await?;

        tracing::info!("到货单 {} 已修改: conformite={}", delivery_id, conformite);
        self.get(delivery_id).await
    }

    pub async fn delete(&self, delivery_id: i64) -> Result<(), AppError> {
        let affected = queries::delete_delivery(&self.pool, delivery_id).await?;
        if affected == 0 {
            return Err(not_found(delivery_id));
        }
        tracing::info!("到货单 {} 已删除", delivery_id);
        Ok(())
    }

    pub async fn get(&self, delivery_id: i64) -> Result<Delivery, AppError> {
        let ids = [delivery_id];
        let (delivery, articles) = futures::try_join!(
            queries::get_delivery(&self.pool, delivery_id),
            queries::list_delivery_articles(&self.pool, &ids),
        )?;
        let mut delivery = delivery.ok_or_else(|| not_found(delivery_id))?;
        delivery.articles = articles;
        Ok(delivery)
    }

    pub async fn list(&self, filter: &DeliveryFilter) -> Result<Vec<Delivery>, AppError> {
        let mut deliveries = queries::list_deliveries(&self.pool, filter).await?;
        let ids: Vec<i64> = deliveries.iter().map(|d| d.id).collect();
        let articles = queries::list_delivery_articles(&self.pool, &ids).await?;
        queries::attach_articles(&mut deliveries, articles);
        Ok(deliveries)
    }

    /// 某采购单号的对账报告
    pub async fn report(&self, num_bc: &str) -> Result<ReconciliationReport, AppError> {
        let mut deliveries = queries::list_deliveries_by_num_bc(&self.pool, num_bc, None).await?;
        let ids: Vec<i64> = deliveries.iter().map(|d| d.id).collect();
        let articles = queries::list_delivery_articles(&self.pool, &ids).await?;
        queries::attach_articles(&mut deliveries, articles);

        let rapport = aggregate_deliveries(num_bc, &deliveries).into_values().collect();
        Ok(ReconciliationReport {
            livraisons: deliveries,
            rapport,
        })
    }
}

fn not_found(delivery_id: i64) -> AppError {
    AppError::NotFound(format!("delivery {} not found", delivery_id))
}

/// 超量校验 (调用方需已持有该单号的锁)
///
/// 采购单不存在时视为没有额度限制。
async fn ensure_capacity(
    conn: &mut PgConnection,
    num_bc: &str,
    exclude_id: Option<i64>,
    incoming: &[NewArticle],
) -> Result<(), AppError> {
    let Some(order) = queries::find_order_by_num_bc(&mut *conn, num_bc).await? else {
        tracing::debug!("numBC {} 无对应采购单, 跳过超量校验", num_bc);
        return Ok(());
    };
    let order_lines = queries::list_order_lines(&mut *conn, &[order.id]).await?;

    let mut prior = queries::list_deliveries_by_num_bc(&mut *conn, num_bc, exclude_id).await?;
    let ids: Vec<i64> = prior.iter().map(|d| d.id).collect();
    let articles = queries::list_delivery_articles(&mut *conn, &ids).await?;
    queries::attach_articles(&mut prior, articles);
    let aggregated = aggregate_deliveries(num_bc, &prior);

    check_capacity(&order_lines, &aggregated, incoming).map_err(|violations| {
        tracing::warn!("numBC {} 到货超量, 拒绝 {} 条明细", num_bc, violations.len());
        AppError::CapacityExceeded(violations)
    })
}
