//! Spending summary: totals overall and for today, grouped by category and
//! payment method.

use chrono::NaiveDate;
use fynmate_core::{Category, PaymentMethod, TransactionRecord};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category: Category,
    pub total: u64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentTotal {
    pub payment_method: PaymentMethod,
    pub total: u64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: u64,
    pub count: usize,
    pub today: NaiveDate,
    pub today_total: u64,
    pub today_count: usize,
    /// Largest total first
    pub by_category: Vec<CategoryTotal>,
    pub by_payment: Vec<PaymentTotal>,
}

pub fn summarize<'a, I>(records: I, today: NaiveDate) -> Summary
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    let mut total = 0u64;
    let mut count = 0usize;
    let mut today_total = 0u64;
    let mut today_count = 0usize;
    let mut cats: HashMap<Category, (u64, usize)> = HashMap::new();
    let mut pays: HashMap<PaymentMethod, (u64, usize)> = HashMap::new();

    for r in records {
        total = total.saturating_add(r.amount);
        count += 1;
        if r.created_on() == today {
            today_total = today_total.saturating_add(r.amount);
            today_count += 1;
        }

        let c = cats.entry(r.category).or_default();
        c.0 = c.0.saturating_add(r.amount);
        c.1 += 1;

        let p = pays.entry(r.payment_method).or_default();
        p.0 = p.0.saturating_add(r.amount);
        p.1 += 1;
    }

    let mut by_category: Vec<CategoryTotal> = cats
        .into_iter()
        .map(|(category, (total, count))| CategoryTotal {
            category,
            total,
            count,
        })
        .collect();
    // ties broken by catalog order so output is stable
    by_category.sort_by(|a, b| b.total.cmp(&a.total).then(a.category.cmp(&b.category)));

    let mut by_payment: Vec<PaymentTotal> = pays
        .into_iter()
        .map(|(payment_method, (total, count))| PaymentTotal {
            payment_method,
            total,
            count,
        })
        .collect();
    by_payment.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then(a.payment_method.cmp(&b.payment_method))
    });

    Summary {
        total,
        count,
        today,
        today_total,
        today_count,
        by_category,
        by_payment,
    }
}
