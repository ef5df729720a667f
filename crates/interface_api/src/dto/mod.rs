//! Request and response types

pub mod billing;
pub mod contract;
pub mod metering;
pub mod pricing;

use rust_decimal::Decimal;
use serde::Serialize;

use core_kernel::Money;

fn default_currency() -> String {
    "VND".to_string()
}

/// A monetary amount on the wire
#[derive(Debug, Serialize)]
pub struct MoneyDto {
    pub amount: Decimal,
    pub currency: String,
}

impl From<Money> for MoneyDto {
    fn from(money: Money) -> Self {
        Self {
            amount: money.amount(),
            currency: money.currency().code().to_string(),
        }
    }
}
