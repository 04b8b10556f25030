use crate::models::{Delivery, DeliveryArticle, DeliveryFilter, NewArticle, NewDelivery, NewOrder, Order, OrderLine, OrderUpdate};
use sqlx::{Executor, PgConnection, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use std::time::Duration;

const INSERT_TIMEOUT: Duration = Duration::from_secs(30);

const DELIVERY_SELECT: &str = r#"
    SELECT l.id,
           l.fournisseur_id,
           f.name AS fournisseur_nom,
           l.service_id,
           s.name AS service_nom,
           l.date_livraison,
           l.heure_arrivee,
           l.num_bc,
           l.num_bl,
           l.type_livraison,
           l.temp_frais,
           l.temp_congele,
           l.conformite,
           l.remarques,
           l.created_at
    FROM livraisons l
    LEFT JOIN fournisseurs f ON f.id = l.fournisseur_id
    LEFT JOIN services s ON s.id = l.service_id
"#;

// ---------------------------------------------------------------------------
// 采购单
// ---------------------------------------------------------------------------

/// 查询采购单列表 (可按是否已完成过滤，新单在前)
pub async fn list_orders(pool: &PgPool, fulfilled: Option<bool>) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(
        r#"
        SELECT id, num_bc, fournisseur_id, service_id, destination, fulfilled, created_at
        FROM orders
        WHERE ($1::BOOLEAN IS NULL OR fulfilled = $1)
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(fulfilled)
    .fetch_all(pool)
    .await
}

pub async fn get_order<'e, E>(executor: E, order_id: i64) -> Result<Option<Order>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Order>(
        r#"
        SELECT id, num_bc, fournisseur_id, service_id, destination, fulfilled, created_at
        FROM orders
        WHERE id = $1
        "#,
    )
    .bind(order_id)
    .fetch_optional(executor)
    .await
}

/// 按采购单号查询 (同号多单时取最早的一张)
pub async fn find_order_by_num_bc<'e, E>(executor: E, num_bc: &str) -> Result<Option<Order>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Order>(
        r#"
        SELECT id, num_bc, fournisseur_id, service_id, destination, fulfilled, created_at
        FROM orders
        WHERE num_bc = $1
        ORDER BY id ASC
        LIMIT 1
        "#,
    )
    .bind(num_bc)
    .fetch_optional(executor)
    .await
}

/// 批量查询采购单明细 (按行号排序)
pub async fn list_order_lines<'e, E>(executor: E, order_ids: &[i64]) -> Result<Vec<OrderLine>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, OrderLine>(
        r#"
        SELECT order_id, name, reference, quantite
        FROM order_lines
        WHERE order_id = ANY($1)
        ORDER BY order_id, line_no
        "#,
    )
    .bind(order_ids)
    .fetch_all(executor)
    .await
}

pub async fn insert_order(conn: &mut PgConnection, order: &NewOrder) -> Result<i64, sqlx::Error> {
    let order_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO orders (num_bc, fournisseur_id, service_id, destination)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&order.num_bc)
    .bind(order.fournisseur_id)
    .bind(order.service_id)
    .bind(&order.destination)
    .fetch_one(&mut *conn)
    .await?;

    insert_order_lines(conn, order_id, &order.items).await?;
    Ok(order_id)
}

/// 修改采购单表头 (未提供的字段保持原值)，返回受影响行数
pub async fn update_order(conn: &mut PgConnection, order_id: i64, update: &OrderUpdate) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET num_bc = COALESCE($2, num_bc),
            fournisseur_id = COALESCE($3, fournisseur_id),
            service_id = COALESCE($4, service_id),
            destination = COALESCE($5, destination),
            fulfilled = COALESCE($6, fulfilled)
        WHERE id = $1
        "#,
    )
    .bind(order_id)
    .bind(&update.num_bc)
    .bind(update.fournisseur_id)
    .bind(update.service_id)
    .bind(&update.destination)
    .bind(update.fulfilled)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// 替换采购单明细
pub async fn replace_order_lines(conn: &mut PgConnection, order_id: i64, lines: &[OrderLine]) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM order_lines WHERE order_id = $1")
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
    insert_order_lines(conn, order_id, lines).await
}

async fn insert_order_lines(conn: &mut PgConnection, order_id: i64, lines: &[OrderLine]) -> Result<(), sqlx::Error> {
    if lines.is_empty() {
        return Ok(());
    }

    let mut query_builder = QueryBuilder::<Postgres>::new("INSERT INTO order_lines (order_id, line_no, name, reference, quantite) ");
    query_builder.push_values(lines.iter().enumerate(), |mut b, (idx, line)| {
        b.push_bind(order_id)
            .push_bind(idx as i32)
            .push_bind(&line.name)
            .push_bind(&line.reference)
            .push_bind(line.quantite.clone());
    });
    query_builder.build().execute(conn).await?;
    Ok(())
}

pub async fn delete_order<'e, E>(executor: E, order_id: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(order_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// 把明细挂到对应采购单上
pub fn attach_order_lines(orders: &mut [Order], lines: Vec<OrderLine>) {
    let index: HashMap<i64, usize> = orders.iter().enumerate().map(|(idx, o)| (o.id, idx)).collect();
    for line in lines {
        if let Some(&idx) = index.get(&line.order_id) {
            orders[idx].items.push(line);
        }
    }
}

// ---------------------------------------------------------------------------
// 到货单
// ---------------------------------------------------------------------------

/// 按条件查询到货单 (日期、到达时间倒序)
pub async fn list_deliveries(pool: &PgPool, filter: &DeliveryFilter) -> Result<Vec<Delivery>, sqlx::Error> {
    let mut query_builder = QueryBuilder::<Postgres>::new(DELIVERY_SELECT);
    query_builder.push(" WHERE TRUE");

    if let (Some(debut), Some(fin)) = (filter.date_debut, filter.date_fin) {
        query_builder
            .push(" AND l.date_livraison BETWEEN ")
            .push_bind(debut)
            .push(" AND ")
            .push_bind(fin);
    }
    if let Some(fournisseur_id) = filter.fournisseur_id {
        query_builder.push(" AND l.fournisseur_id = ").push_bind(fournisseur_id);
    }
    if let Some(service_id) = filter.service_id {
        query_builder.push(" AND l.service_id = ").push_bind(service_id);
    }
    if let Some(conformite) = &filter.conformite {
        query_builder.push(" AND l.conformite = ").push_bind(conformite.clone());
    }
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", q);
        query_builder
            .push(" AND (l.remarques ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR l.num_bc ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR l.num_bl ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR f.name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(num_bcs) = &filter.num_bcs {
        query_builder.push(" AND l.num_bc = ANY(").push_bind(num_bcs.clone()).push(")");
    }

    query_builder.push(" ORDER BY l.date_livraison DESC, l.heure_arrivee DESC, l.id DESC");
    query_builder.build_query_as::<Delivery>().fetch_all(pool).await
}

pub async fn get_delivery<'e, E>(executor: E, delivery_id: i64) -> Result<Option<Delivery>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!("{} WHERE l.id = $1", DELIVERY_SELECT);
    sqlx::query_as::<_, Delivery>(&sql)
        .bind(delivery_id)
        .fetch_optional(executor)
        .await
}

/// 查询某采购单号下的到货单 (按创建顺序)，可排除一张正在修改的单
pub async fn list_deliveries_by_num_bc<'e, E>(
    executor: E,
    num_bc: &str,
    exclude_id: Option<i64>,
) -> Result<Vec<Delivery>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        "{} WHERE l.num_bc = $1 AND ($2::BIGINT IS NULL OR l.id <> $2) ORDER BY l.id ASC",
        DELIVERY_SELECT
    );
    sqlx::query_as::<_, Delivery>(&sql)
        .bind(num_bc)
        .bind(exclude_id)
        .fetch_all(executor)
        .await
}

/// 批量查询到货明细 (到货单顺序 + 行号顺序)
pub async fn list_delivery_articles<'e, E>(executor: E, delivery_ids: &[i64]) -> Result<Vec<DeliveryArticle>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, DeliveryArticle>(
        r#"
        SELECT id, livraison_id, nom, reference, quantite, conformite, remarques
        FROM livraison_articles
        WHERE livraison_id = ANY($1)
        ORDER BY livraison_id, line_no
        "#,
    )
    .bind(delivery_ids)
    .fetch_all(executor)
    .await
}

/// 把明细挂到对应到货单上
pub fn attach_articles(deliveries: &mut [Delivery], articles: Vec<DeliveryArticle>) {
    let index: HashMap<i64, usize> = deliveries.iter().enumerate().map(|(idx, d)| (d.id, idx)).collect();
    for article in articles {
        if let Some(&idx) = index.get(&article.livraison_id) {
            deliveries[idx].articles.push(article);
        }
    }
}

/// 对采购单号加事务级咨询锁，同一单号的提交串行执行，提交或回滚时自动释放
pub async fn lock_order_reference(conn: &mut PgConnection, num_bc: &str) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(num_bc)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn insert_delivery(conn: &mut PgConnection, delivery: &NewDelivery, conformite: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO livraisons (
            fournisseur_id, service_id, date_livraison, heure_arrivee,
            num_bc, num_bl, type_livraison, temp_frais, temp_congele,
            conformite, remarques
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING id
        "#,
    )
    .bind(delivery.fournisseur_id)
    .bind(delivery.service_id)
    .bind(delivery.date_livraison)
    .bind(&delivery.heure_arrivee)
    .bind(&delivery.num_bc)
    .bind(&delivery.num_bl)
    .bind(&delivery.type_livraison)
    .bind(delivery.temp_frais)
    .bind(delivery.temp_congele)
    .bind(conformite)
    .bind(&delivery.remarques)
    .fetch_one(conn)
    .await
}

/// 修改到货单表头，返回受影响行数
pub async fn update_delivery(
    conn: &mut PgConnection,
    delivery_id: i64,
    delivery: &NewDelivery,
    conformite: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE livraisons
        SET fournisseur_id = $2,
            service_id = $3,
            date_livraison = $4,
            heure_arrivee = $5,
            num_bc = $6,
            num_bl = $7,
            type_livraison = $8,
            temp_frais = $9,
            temp_congele = $10,
            conformite = $11,
            remarques = $12
        WHERE id = $1
        "#,
    )
    .bind(delivery_id)
    .bind(delivery.fournisseur_id)
    .bind(delivery.service_id)
    .bind(delivery.date_livraison)
    .bind(&delivery.heure_arrivee)
    .bind(&delivery.num_bc)
    .bind(&delivery.num_bl)
    .bind(&delivery.type_livraison)
    .bind(delivery.temp_frais)
    .bind(delivery.temp_congele)
    .bind(conformite)
    .bind(&delivery.remarques)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete_delivery_articles(conn: &mut PgConnection, delivery_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM livraison_articles WHERE livraison_id = $1")
        .bind(delivery_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn delete_delivery<'e, E>(executor: E, delivery_id: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM livraisons WHERE id = $1")
        .bind(delivery_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// 批量插入到货明细
pub async fn insert_articles(conn: &mut PgConnection, delivery_id: i64, articles: &[NewArticle]) -> Result<(), sqlx::Error> {
    if articles.is_empty() {
        return Ok(());
    }

    tracing::debug!("开始构建批量插入语句, {} 条明细", articles.len());
    let start_time = std::time::Instant::now();

    let mut query_builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO livraison_articles (
            livraison_id, line_no, nom, reference, quantite, conformite, remarques
        ) ",
    );

    query_builder.push_values(articles.iter().enumerate(), |mut b, (idx, article)| {
        b.push_bind(delivery_id)
            .push_bind(idx as i32)
            .push_bind(&article.nom)
            .push_bind(&article.reference)
            .push_bind(article.quantite.clone())
            .push_bind(&article.conformite)
            .push_bind(&article.remarques);
    });

    // 超时控制: 30秒
    let execute_result = tokio::time::timeout(INSERT_TIMEOUT, query_builder.build().execute(conn)).await;

    match execute_result {
        Ok(Ok(result)) => {
            tracing::debug!("✓ INSERT执行成功, 影响 {} 行, 耗时: {:?}", result.rows_affected(), start_time.elapsed());
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::error!("✗ INSERT执行失败, 耗时: {:?}, 错误: {:?}", start_time.elapsed(), e);
            Err(e)
        }
        Err(_) => {
            tracing::error!("✗ INSERT操作超时 (>30秒)!");
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::Utc;

    fn order(id: i64) -> Order {
        Order {
            id,
            num_bc: format!("BC-{}", id),
            fournisseur_id: 1,
            service_id: 1,
            destination: None,
            fulfilled: false,
            created_at: Utc::now(),
            items: Vec::new(),
        }
    }

    fn line(order_id: i64, reference: &str) -> OrderLine {
        OrderLine {
            order_id,
            ..OrderLine::new("Article", reference, BigDecimal::from(1))
        }
    }

    #[test]
    fn lines_land_on_their_order_in_sequence() {
        let mut orders = vec![order(7), order(3)];
        let lines = vec![line(3, "A"), line(7, "B"), line(3, "C"), line(99, "X")];
        attach_order_lines(&mut orders, lines);

        let refs = |o: &Order| o.items.iter().map(|l| l.reference.clone()).collect::<Vec<_>>();
        assert_eq!(refs(&orders[0]), vec!["B"]);
        assert_eq!(refs(&orders[1]), vec!["A", "C"]);
    }
}
