//! State layer for Pressdesk, a one-page management dashboard for a small
//! print/customization shop: orders, production stages, customers, products,
//! supplies, accounts, and a simple ledger.
//!
//! Everything lives in one [`Document`] that is persisted on the device and,
//! when a sync key is configured, mirrored to a shared key-value slot through
//! the `lockstep` engine. Rendering, PDF output, and CSV export sit on top of
//! this crate and only ever read snapshots.

pub mod backup;
pub mod document;
pub mod entities;
pub mod state;
pub mod stats;

pub use document::{DateRange, Document, DocumentPatch};
pub use entities::{
    BankAccount, Carrier, CompanySettings, Customer, Expense, Order, OrderItem, Product,
    ProductionStatus, Record, Supply,
};
pub use state::Dashboard;
pub use stats::{
    FinancialSummary, account_balance, financial_summary, open_orders_by_status,
    supplies_to_reorder,
};
