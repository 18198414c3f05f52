//! The single persisted/synced aggregate: every entity collection, the
//! company settings, and the UI-adjacent fields that stay on the device.
//!
//! `Document` is what the local slot stores; `DocumentPatch` is what travels
//! and what old local records load as. Applying a patch replaces whole
//! slices, never individual records: reconciliation is last-writer-wins at
//! document granularity.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use im::Vector;

use crate::entities::{
    BankAccount, Carrier, CompanySettings, Customer, Expense, Order, Product, Supply,
};

/// Orders are only pruned from sync payloads once the collection grows past
/// this size.
pub const ORDER_SYNC_SOFT_CAP: usize = 50;

/// Delivered orders older than this many days are dropped from sync payloads.
pub const DELIVERED_RETENTION_DAYS: i64 = 60;

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|start| date >= start) && self.end.is_none_or(|end| date <= end)
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Document {
    pub orders: Vector<Order>,
    pub products: Vector<Product>,
    pub customers: Vector<Customer>,
    pub supplies: Vector<Supply>,
    pub expenses: Vector<Expense>,
    pub accounts: Vector<BankAccount>,
    pub carriers: Vector<Carrier>,
    pub settings: CompanySettings,

    // UI state: persisted locally, stripped before cloud sync
    pub active_view: String,
    pub date_range: DateRange,
    pub hide_values: bool,
}

impl Document {
    /// The document a fresh install starts from.
    pub fn seed() -> Self {
        Self {
            active_view: "orders".to_string(),
            ..Self::default()
        }
    }
}

/// A partial document: exactly the fields a payload defines. Absent fields
/// leave the current document untouched when applied.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orders: Option<Vector<Order>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vector<Product>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customers: Option<Vector<Customer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplies: Option<Vector<Supply>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expenses: Option<Vector<Expense>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accounts: Option<Vector<BankAccount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carriers: Option<Vector<Carrier>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<CompanySettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_values: Option<bool>,
}

impl DocumentPatch {
    /// Snapshot of every entity slice, logo intact, no pruning. Used for
    /// manual backups.
    pub fn full(document: &Document) -> Self {
        Self {
            orders: Some(document.orders.clone()),
            products: Some(document.products.clone()),
            customers: Some(document.customers.clone()),
            supplies: Some(document.supplies.clone()),
            expenses: Some(document.expenses.clone()),
            accounts: Some(document.accounts.clone()),
            carriers: Some(document.carriers.clone()),
            settings: Some(document.settings.clone()),
            active_view: None,
            date_range: None,
            hide_values: None,
        }
    }
}

/// Once the collection is over the soft cap, delivered orders older than the
/// retention window are dropped. Open orders survive regardless of age.
fn prune_orders_for_sync(orders: &Vector<Order>, today: NaiveDate) -> Vector<Order> {
    if orders.len() <= ORDER_SYNC_SOFT_CAP {
        return orders.clone();
    }

    let cutoff = today - Duration::days(DELIVERED_RETENTION_DAYS);
    orders
        .iter()
        .filter(|order| !(order.production_status.is_delivered() && order.date < cutoff))
        .cloned()
        .collect()
}

impl lockstep::SyncDocument for Document {
    type Patch = DocumentPatch;

    fn prepare_for_sync(&self, now: DateTime<Utc>) -> DocumentPatch {
        let mut settings = self.settings.clone();
        settings.logo = None;

        DocumentPatch {
            orders: Some(prune_orders_for_sync(&self.orders, now.date_naive())),
            settings: Some(settings),
            ..DocumentPatch::full(self)
        }
    }

    fn apply_patch(&mut self, patch: DocumentPatch) {
        if let Some(orders) = patch.orders {
            self.orders = orders;
        }
        if let Some(products) = patch.products {
            self.products = products;
        }
        if let Some(customers) = patch.customers {
            self.customers = customers;
        }
        if let Some(supplies) = patch.supplies {
            self.supplies = supplies;
        }
        if let Some(expenses) = patch.expenses {
            self.expenses = expenses;
        }
        if let Some(accounts) = patch.accounts {
            self.accounts = accounts;
        }
        if let Some(carriers) = patch.carriers {
            self.carriers = carriers;
        }
        if let Some(settings) = patch.settings {
            self.settings = settings;
        }
        if let Some(active_view) = patch.active_view {
            self.active_view = active_view;
        }
        if let Some(date_range) = patch.date_range {
            self.date_range = date_range;
        }
        if let Some(hide_values) = patch.hide_values {
            self.hide_values = hide_values;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ProductionStatus;
    use chrono::TimeZone;
    use lockstep::SyncDocument;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
    }

    fn order(id: &str, status: ProductionStatus, age_days: i64) -> Order {
        Order {
            id: id.to_string(),
            production_status: status,
            date: today() - Duration::days(age_days),
            ..Order::default()
        }
    }

    #[test]
    fn test_small_order_collections_are_never_pruned() {
        let mut doc = Document::seed();
        for i in 0..ORDER_SYNC_SOFT_CAP {
            doc.orders.push_back(order(
                &format!("o{i}"),
                ProductionStatus::Delivered,
                400,
            ));
        }

        let patch = doc.prepare_for_sync(now());
        assert_eq!(patch.orders.unwrap().len(), ORDER_SYNC_SOFT_CAP);
    }

    #[test]
    fn test_pruning_drops_only_old_delivered_orders() {
        let mut doc = Document::seed();
        // 30 delivered-and-old, 20 delivered-but-recent, 10 pending-and-old
        for i in 0..30 {
            doc.orders
                .push_back(order(&format!("old{i}"), ProductionStatus::Delivered, 90));
        }
        for i in 0..20 {
            doc.orders
                .push_back(order(&format!("new{i}"), ProductionStatus::Delivered, 10));
        }
        for i in 0..10 {
            doc.orders
                .push_back(order(&format!("open{i}"), ProductionStatus::Pending, 400));
        }

        let patch = doc.prepare_for_sync(now());
        let orders = patch.orders.unwrap();

        assert_eq!(orders.len(), 30);
        assert!(!orders.iter().any(|o| {
            o.production_status.is_delivered()
                && o.date < today() - Duration::days(DELIVERED_RETENTION_DAYS)
        }));
        // non-delivered orders survive regardless of age
        assert_eq!(
            orders
                .iter()
                .filter(|o| o.production_status == ProductionStatus::Pending)
                .count(),
            10
        );
    }

    #[test]
    fn test_sync_payload_strips_logo_and_ui_state() {
        let mut doc = Document::seed();
        doc.settings.logo = Some("data:image/png;base64,AAAA".to_string());
        doc.active_view = "finance".to_string();
        doc.hide_values = true;
        doc.date_range = DateRange {
            start: Some(today()),
            end: None,
        };

        let patch = doc.prepare_for_sync(now());

        assert_eq!(patch.settings.unwrap().logo, None);
        assert_eq!(patch.active_view, None);
        assert_eq!(patch.date_range, None);
        assert_eq!(patch.hide_values, None);
        // the local copy keeps its logo
        assert!(doc.settings.logo.is_some());
    }

    #[test]
    fn test_encode_decode_round_trips_entity_collections() {
        let mut doc = Document::seed();
        doc.customers.push_back(Customer {
            id: "c1".to_string(),
            name: "João Araújo".to_string(),
            address: "Rua das Açucenas, 12 – São Gonçalo".to_string(),
            ..Customer::default()
        });
        doc.orders.push_back(Order {
            id: "o1".to_string(),
            notes: "caixa nº 3, cuidado ⚠".to_string(),
            ..Order::default()
        });

        let patch = doc.prepare_for_sync(now());
        let encoded = lockstep::encode(&patch).unwrap();
        let decoded: DocumentPatch = lockstep::decode(&encoded).unwrap();

        assert_eq!(decoded.customers, patch.customers);
        assert_eq!(decoded.orders, patch.orders);
    }

    #[test]
    fn test_patch_without_a_field_leaves_that_slice_untouched() {
        let mut doc = Document::seed();
        doc.supplies.push_back(Supply {
            id: "s1".to_string(),
            name: "vinil branco".to_string(),
            ..Supply::default()
        });

        let patch = DocumentPatch {
            customers: Some(Vector::from(vec![Customer {
                id: "c1".to_string(),
                ..Customer::default()
            }])),
            ..DocumentPatch::default()
        };
        doc.apply_patch(patch);

        assert_eq!(doc.supplies.len(), 1);
        assert_eq!(doc.customers.len(), 1);
    }

    #[test]
    fn test_old_local_record_loads_with_absent_fields() {
        // written before carriers or hideValues existed
        let json = r#"{"orders":[],"settings":{"name":"Gráfica Sol"}}"#;
        let patch: DocumentPatch = serde_json::from_str(json).unwrap();

        assert!(patch.orders.is_some());
        assert_eq!(patch.settings.as_ref().unwrap().name, "Gráfica Sol");
        assert_eq!(patch.carriers, None);
        assert_eq!(patch.hide_values, None);
    }
}
