//! Derived views over the document: period filters and financial aggregates.
//! Everything here is a pure function of the current snapshot, recomputed on
//! read, never persisted, and never part of sync payloads.

use std::collections::BTreeMap;

use im::Vector;

use crate::document::{DateRange, Document};
use crate::entities::{Order, ProductionStatus, Supply};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FinancialSummary {
    /// Paid order totals inside the period.
    pub revenue: f64,
    /// Expense totals inside the period.
    pub expenses: f64,
    pub net: f64,
}

pub fn orders_in_range<'a>(
    orders: &'a Vector<Order>,
    range: &'a DateRange,
) -> impl Iterator<Item = &'a Order> {
    orders.iter().filter(|order| range.contains(order.date))
}

pub fn financial_summary(document: &Document, range: &DateRange) -> FinancialSummary {
    let revenue: f64 = orders_in_range(&document.orders, range)
        .filter(|order| order.paid)
        .map(Order::total)
        .sum();

    let expenses: f64 = document
        .expenses
        .iter()
        .filter(|expense| range.contains(expense.date))
        .map(|expense| expense.amount)
        .sum();

    FinancialSummary {
        revenue,
        expenses,
        net: revenue - expenses,
    }
}

/// Opening balance plus paid order income minus expenses, for one account.
pub fn account_balance(document: &Document, account_id: &str) -> f64 {
    let opening = document
        .accounts
        .iter()
        .find(|account| account.id == account_id)
        .map(|account| account.opening_balance)
        .unwrap_or(0.0);

    let income: f64 = document
        .orders
        .iter()
        .filter(|order| order.paid && order.account_id.as_deref() == Some(account_id))
        .map(Order::total)
        .sum();

    let spent: f64 = document
        .expenses
        .iter()
        .filter(|expense| expense.account_id.as_deref() == Some(account_id))
        .map(|expense| expense.amount)
        .sum();

    opening + income - spent
}

/// How many not-yet-delivered orders sit in each production stage.
pub fn open_orders_by_status(orders: &Vector<Order>) -> BTreeMap<ProductionStatus, usize> {
    let mut counts = BTreeMap::new();
    for order in orders {
        if !order.production_status.is_delivered() {
            *counts.entry(order.production_status).or_insert(0) += 1;
        }
    }
    counts
}

/// Supplies at or below their reorder level, in document order.
pub fn supplies_to_reorder(document: &Document) -> impl Iterator<Item = &Supply> {
    document
        .supplies
        .iter()
        .filter(|supply| supply.needs_reorder())
}
