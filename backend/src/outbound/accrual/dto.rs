//! DTOs for decoding accrual service responses.
//!
//! The adapter decodes into this transport DTO first, then validates each
//! field into domain values in one pass.

use serde::Deserialize;

use crate::domain::OrderNumber;
use crate::domain::Points;
use crate::domain::ports::{AccrualReport, ExternalAccrualStatus};

#[derive(Debug, Deserialize)]
pub(super) struct AccrualResponseDto {
    pub(super) order: String,
    pub(super) status: String,
    #[serde(default)]
    pub(super) accrual: Option<f64>,
}

impl AccrualResponseDto {
    pub(super) fn into_domain_report(self) -> Result<AccrualReport, String> {
        let order = OrderNumber::new(self.order.as_str())
            .map_err(|error| format!("order {:?}: {error}", self.order))?;
        let status = ExternalAccrualStatus::parse(&self.status)
            .ok_or_else(|| format!("order {order}: unknown status {:?}", self.status))?;
        let accrual = match self.accrual {
            Some(amount) => Points::from_decimal(amount)
                .map_err(|error| format!("order {order}: accrual {amount}: {error}"))?,
            None => Points::ZERO,
        };

        Ok(AccrualReport {
            order,
            status,
            accrual,
        })
    }
}
