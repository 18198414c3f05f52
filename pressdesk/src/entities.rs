//! The business records the shop works with. Field names are camelCase on
//! the wire and every struct tolerates records written by older versions
//! (missing fields come back as defaults).

use chrono::NaiveDate;

/// Anything stored in a document slice under a string id.
pub trait Record {
    fn id(&self) -> &str;
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ProductionStatus {
    #[default]
    Pending,
    Printing,
    Finishing,
    Done,
    Delivered,
}

impl ProductionStatus {
    pub fn is_delivered(self) -> bool {
        self == ProductionStatus::Delivered
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderItem {
    pub product_id: String,
    pub description: String,
    pub quantity: u32,
    pub unit_price: f64,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Order {
    pub id: String,
    pub number: u32,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub production_status: ProductionStatus,
    pub date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub carrier_id: Option<String>,
    pub paid: bool,
    pub account_id: Option<String>,
    pub notes: String,
}

impl Order {
    /// Sum of item quantities times unit prices.
    pub fn total(&self) -> f64 {
        self.items
            .iter()
            .map(|item| f64::from(item.quantity) * item.unit_price)
            .sum()
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub code: String,
    pub price: f64,
    pub unit_cost: f64,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub notes: String,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Supply {
    pub id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub reorder_level: f64,
    pub unit_cost: f64,
}

impl Supply {
    pub fn needs_reorder(&self) -> bool {
        self.quantity <= self.reorder_level
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub category: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub account_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BankAccount {
    pub id: String,
    pub name: String,
    pub opening_balance: f64,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Carrier {
    pub id: String,
    pub name: String,
    /// Template with a `{code}` placeholder for the tracking number.
    pub tracking_url: String,
}

impl Carrier {
    /// Fill the template's `{code}` placeholder with a tracking number.
    pub fn tracking_link(&self, code: &str) -> String {
        self.tracking_url.replace("{code}", code)
    }
}

/// Shop identity shown on printed documents. The logo is a data-URL blob and
/// is stripped before cloud sync to stay under the payload ceiling.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanySettings {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub logo: Option<String>,
}

macro_rules! impl_record {
    ($($ty:ty),* $(,)?) => {
        $(impl Record for $ty {
            fn id(&self) -> &str {
                &self.id
            }
        })*
    };
}

impl_record!(Order, Product, Customer, Supply, Expense, BankAccount, Carrier);
