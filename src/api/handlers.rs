use super::AppState;
use crate::auth::{Action, AuthUser, Resource};
use crate::error::AppError;
use crate::models::{Delivery, DeliveryFilter, DeliveryInput};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::str::FromStr;

/// 到货单列表查询参数 (空字符串视为未提供)
#[derive(Debug, Default, Deserialize)]
pub struct DeliveryQuery {
    #[serde(rename = "rapportBC")]
    pub rapport_bc: Option<String>,
    #[serde(rename = "dateDebut")]
    pub date_debut: Option<String>,
    #[serde(rename = "dateFin")]
    pub date_fin: Option<String>,
    #[serde(rename = "fournisseurId")]
    pub fournisseur_id: Option<String>,
    #[serde(rename = "serviceId")]
    pub service_id: Option<String>,
    pub conformite: Option<String>,
    pub q: Option<String>,
    #[serde(rename = "numBCs")]
    pub num_bcs: Option<String>,
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// 解析可选查询参数, 非法值返回 400
pub(crate) fn parse_param<T: FromStr>(name: &str, value: Option<String>) -> Result<Option<T>, AppError> {
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("invalid value for {}: {}", name, raw))),
    }
}

impl DeliveryQuery {
    pub fn into_filter(self) -> Result<DeliveryFilter, AppError> {
        Ok(DeliveryFilter {
            date_debut: parse_param("dateDebut", self.date_debut)?,
            date_fin: parse_param("dateFin", self.date_fin)?,
            fournisseur_id: parse_param("fournisseurId", self.fournisseur_id)?,
            service_id: parse_param("serviceId", self.service_id)?,
            conformite: non_empty(self.conformite),
            q: non_empty(self.q),
            num_bcs: non_empty(self.num_bcs).map(|raw| DeliveryFilter::parse_num_bcs(&raw)),
        })
    }
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 到货单列表, 或 `?rapportBC=` 时返回对账报告
pub async fn list_deliveries(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DeliveryQuery>,
) -> Result<Response, AppError> {
    state.policy.authorize(&user, Resource::Deliveries, Action::Read)?;

    if let Some(num_bc) = non_empty(query.rapport_bc.clone()) {
        let report = state.deliveries.report(&num_bc).await?;
        return Ok(Json(report).into_response());
    }

    let filter = query.into_filter()?;
    let deliveries = state.deliveries.list(&filter).await?;
    Ok(Json(deliveries).into_response())
}

pub async fn create_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<DeliveryInput>,
) -> Result<(StatusCode, Json<Delivery>), AppError> {
    state.policy.authorize(&user, Resource::Deliveries, Action::Write)?;
    let delivery = state.deliveries.submit(input).await?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

pub async fn get_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    Path(delivery_id): Path<i64>,
) -> Result<Json<Delivery>, AppError> {
    state.policy.authorize(&user, Resource::Deliveries, Action::Read)?;
    Ok(Json(state.deliveries.get(delivery_id).await?))
}

pub async fn update_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    Path(delivery_id): Path<i64>,
    Json(input): Json<DeliveryInput>,
) -> Result<Json<Delivery>, AppError> {
    state.policy.authorize(&user, Resource::Deliveries, Action::Write)?;
    Ok(Json(state.deliveries.update(delivery_id, input).await?))
}

pub async fn delete_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    Path(delivery_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.policy.authorize(&user, Resource::Deliveries, Action::Write)?;
    state.deliveries.delete(delivery_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn blank_params_are_ignored() {
        let query = DeliveryQuery {
            fournisseur_id: Some("".to_string()),
            q: Some("   ".to_string()),
            ..Default::default()
        };
        let filter = query.into_filter().unwrap();
        assert!(filter.fournisseur_id.is_none());
        assert!(filter.q.is_none());
    }

    #[test]
    fn params_are_parsed() {
        let query = DeliveryQuery {
            date_debut: Some("2024-03-01".to_string()),
            date_fin: Some("2024-03-31".to_string()),
            service_id: Some("4".to_string()),
            num_bcs: Some(r#"["BC-1","BC-2"]"#.to_string()),
            ..Default::default()
        };
        let filter = query.into_filter().unwrap();
        assert_eq!(filter.date_debut, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(filter.service_id, Some(4));
        assert_eq!(filter.num_bcs, Some(vec!["BC-1".to_string(), "BC-2".to_string()]));
    }

    #[test]
    fn bad_number_is_rejected() {
        let query = DeliveryQuery {
            fournisseur_id: Some("abc".to_string()),
            ..Default::default()
        };
        assert!(matches!(query.into_filter(), Err(AppError::BadRequest(_))));
    }
}
