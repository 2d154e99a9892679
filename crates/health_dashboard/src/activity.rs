//! Display records and the fixed set of metric slots the dashboard shows.

use health_store_client::{HealthStoreError, MetricType, Quantity, Unit};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::format::{NumberLocale, format_raw_double};

/// One tile on the dashboard. Built once and replaced wholesale.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct Activity {
    id: u32,
    title: String,
    subtitle: String,
    image: String,
    amount: String,
}

impl Activity {
    pub fn new(
        id: u32,
        title: impl Into<String>,
        subtitle: impl Into<String>,
        image: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            subtitle: subtitle.into(),
            image: image.into(),
            amount: amount.into(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn subtitle(&self) -> &str {
        &self.subtitle
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AmountStyle {
    /// Default double rendering, no rounding or grouping.
    RawDouble,
    /// Zero fraction digits, locale grouping.
    RoundedDecimal,
}

/// Static description of how one metric becomes an [`Activity`].
#[derive(Debug, PartialEq, Eq)]
pub struct MetricSlot {
    pub metric: MetricType,
    pub key: &'static str,
    pub id: u32,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub image: &'static str,
    pub unit: Unit,
    pub amount_style: AmountStyle,
}

pub const TODAY_STEPS: MetricSlot = MetricSlot {
    metric: MetricType::StepCount,
    key: "todaySteps",
    id: 0,
    title: "Today's steps",
    subtitle: "Goal: 10,000",
    image: "figure.walk",
    unit: Unit::Count,
    amount_style: AmountStyle::RawDouble,
};

pub const TODAY_CALORIES: MetricSlot = MetricSlot {
    metric: MetricType::ActiveEnergyBurned,
    key: "todayCalories",
    id: 1,
    title: "Today's calories",
    subtitle: "Goal: 650",
    image: "flame",
    unit: Unit::Kilocalorie,
    amount_style: AmountStyle::RoundedDecimal,
};

impl MetricSlot {
    pub fn for_metric(metric: MetricType) -> &'static MetricSlot {
        match metric {
            MetricType::StepCount => &TODAY_STEPS,
            MetricType::ActiveEnergyBurned => &TODAY_CALORIES,
        }
    }

    pub fn format_amount(&self, value: f64, locale: &NumberLocale) -> String {
        match self.amount_style {
            AmountStyle::RawDouble => format_raw_double(value),
            AmountStyle::RoundedDecimal => locale.format_rounded(value),
        }
    }

    /// Convert `quantity` to this slot's unit and build its display record.
    pub fn activity(
        &self,
        quantity: &Quantity,
        locale: &NumberLocale,
    ) -> Result<Activity, HealthStoreError> {
        let value = quantity.value_in(self.unit)?;
        Ok(Activity::new(
            self.id,
            self.title,
            self.subtitle,
            self.image,
            self.format_amount(value, locale),
        ))
    }
}
