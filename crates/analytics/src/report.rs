//! Merchant analytics rollups.
//!
//! Everything here is a pure function of a merchant's order records and a
//! [`Window`]. Orders outside the window are ignored.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use common::{CustomerId, MerchantId};
use domain::{Money, OrderStatus, OutcomeBucket, ProductId};
use serde::Serialize;

use crate::view::OrderRecord;
use crate::window::Window;

pub const TOP_PRODUCTS_LIMIT: usize = 10;

/// One local calendar day of a merchant's orders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub total_orders: u64,
    pub completed_orders: u64,
    pub canceled_orders: u64,
    pub rejected_orders: u64,
    /// Orders still moving through the lifecycle.
    pub pending_orders: u64,
    /// Sum of `prices.total` over completed orders.
    pub total_revenue: Money,
    /// `total_revenue / completed_orders`, zero without completions.
    pub average_order_value: Money,
    pub new_customers: u64,
    pub returning_customers: u64,
}

impl DailyBucket {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_orders: 0,
            completed_orders: 0,
            canceled_orders: 0,
            rejected_orders: 0,
            pending_orders: 0,
            total_revenue: Money::zero(),
            average_order_value: Money::zero(),
            new_customers: 0,
            returning_customers: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantStats {
    pub total_orders: u64,
    pub completed_orders: u64,
    pub canceled_orders: u64,
    pub rejected_orders: u64,
    pub pending_orders: u64,
    pub total_revenue: Money,
    /// `completed_orders / total_orders`, in `0.0..=1.0`.
    pub completion_rate: f64,
    /// `canceled_orders / total_orders`, in `0.0..=1.0`.
    pub cancel_rate: f64,
    pub average_order_value: Money,
    /// Percent change in revenue from the first half of the window's days to
    /// the second half.
    pub revenue_trend: f64,
    /// Percent change in order count, split the same way.
    pub orders_trend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopProduct {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u64,
    pub revenue: Money,
    /// Completed orders containing the product.
    pub order_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerInsights {
    /// Distinct customers in the window.
    pub total_customers: u64,
    /// Orders that were a customer's first in the window.
    pub new_customers: u64,
    /// Orders from a customer already seen earlier in the window.
    pub returning_customers: u64,
    /// Share of distinct customers with more than one order, in percent.
    pub repeat_customer_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourCount {
    pub hour: u32,
    pub order_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantAnalytics {
    pub merchant_id: MerchantId,
    pub days: u32,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub daily_data: Vec<DailyBucket>,
    pub stats: MerchantStats,
    pub top_products: Vec<TopProduct>,
    pub customer_insights: CustomerInsights,
    pub order_status_breakdown: Vec<StatusCount>,
    pub peak_hours: Vec<HourCount>,
}

/// Builds the full report for one merchant.
pub fn merchant_analytics(
    merchant_id: MerchantId,
    orders: &[OrderRecord],
    window: &Window,
) -> MerchantAnalytics {
    let in_window = orders_in_window(orders, window);
    let daily_data = bucket_days(&in_window, window);
    let stats = merchant_stats(&daily_data);

    MerchantAnalytics {
        merchant_id,
        days: window.days(),
        window_start: window.first_day(),
        window_end: window.last_day(),
        stats,
        top_products: top_products(&in_window, TOP_PRODUCTS_LIMIT),
        customer_insights: customer_insights(&in_window),
        order_status_breakdown: status_breakdown(&in_window),
        peak_hours: peak_hours(&in_window, window),
        daily_data,
    }
}

/// Orders inside the window, oldest first.
fn orders_in_window<'a>(orders: &'a [OrderRecord], window: &Window) -> Vec<&'a OrderRecord> {
    let mut found: Vec<_> = orders
        .iter()
        .filter(|o| window.contains(o.created_at))
        .collect();
    found.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.order_id.cmp(&b.order_id))
    });
    found
}

/// One bucket per window day, oldest to newest.
///
/// Customers are "new" the first time they appear in the scan and
/// "returning" after that. Orders placed before the window are not
/// consulted, so a regular whose first order in the window falls mid-window
/// still counts as new on that day.
pub fn daily_buckets(orders: &[OrderRecord], window: &Window) -> Vec<DailyBucket> {
    bucket_days(&orders_in_window(orders, window), window)
}

fn bucket_days(orders: &[&OrderRecord], window: &Window) -> Vec<DailyBucket> {
    let mut buckets: Vec<_> = window.dates().map(DailyBucket::empty).collect();
    let mut seen: HashSet<CustomerId> = HashSet::new();

    for order in orders {
        let Some(index) = window.day_index(order.created_at) else {
            continue;
        };
        let bucket = &mut buckets[index];
        bucket.total_orders += 1;

        match order.status.bucket() {
            OutcomeBucket::Completed => {
                bucket.completed_orders += 1;
                bucket.total_revenue += order.prices.total;
            }
            OutcomeBucket::Canceled => bucket.canceled_orders += 1,
            OutcomeBucket::Rejected => bucket.rejected_orders += 1,
            OutcomeBucket::Pending => bucket.pending_orders += 1,
        }

        if seen.insert(order.customer_id) {
            bucket.new_customers += 1;
        } else {
            bucket.returning_customers += 1;
        }
    }

    for bucket in &mut buckets {
        bucket.average_order_value = bucket.total_revenue.average_over(bucket.completed_orders);
    }
    buckets
}

/// Window totals plus first-half versus second-half trends.
pub fn merchant_stats(buckets: &[DailyBucket]) -> MerchantStats {
    let sum = |f: fn(&DailyBucket) -> u64| buckets.iter().map(f).sum::<u64>();
    let total_orders = sum(|b| b.total_orders);
    let completed_orders = sum(|b| b.completed_orders);
    let canceled_orders = sum(|b| b.canceled_orders);
    let total_revenue: Money = buckets.iter().map(|b| b.total_revenue).sum();

    let (previous, recent) = buckets.split_at(buckets.len() / 2);
    let revenue = |days: &[DailyBucket]| days.iter().map(|b| b.total_revenue.cents()).sum::<i64>() as f64;
    let orders = |days: &[DailyBucket]| days.iter().map(|b| b.total_orders).sum::<u64>() as f64;

    MerchantStats {
        total_orders,
        completed_orders,
        canceled_orders,
        rejected_orders: sum(|b| b.rejected_orders),
        pending_orders: sum(|b| b.pending_orders),
        total_revenue,
        completion_rate: ratio(completed_orders, total_orders),
        cancel_rate: ratio(canceled_orders, total_orders),
        average_order_value: total_revenue.average_over(completed_orders),
        revenue_trend: percent_change(revenue(recent), revenue(previous)),
        orders_trend: percent_change(orders(recent), orders(previous)),
    }
}

/// `(recent - previous) / previous * 100`, zero when `previous` is zero.
pub fn percent_change(recent: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (recent - previous) / previous * 100.0
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Best sellers among completed orders, by revenue. Ties go to the lower
/// product id.
fn top_products(orders: &[&OrderRecord], limit: usize) -> Vec<TopProduct> {
    let mut products: HashMap<ProductId, TopProduct> = HashMap::new();

    for order in orders.iter().filter(|o| o.status == OrderStatus::Completed) {
        let mut counted: HashSet<&ProductId> = HashSet::new();
        for item in &order.items {
            let entry = products
                .entry(item.product_id.clone())
                .or_insert_with(|| TopProduct {
                    product_id: item.product_id.clone(),
                    product_name: item.product_name.clone(),
                    quantity: 0,
                    revenue: Money::zero(),
                    order_count: 0,
                });
            entry.quantity += u64::from(item.quantity);
            entry.revenue += item.line_total();
            if counted.insert(&item.product_id) {
                entry.order_count += 1;
            }
        }
    }

    let mut ranked: Vec<_> = products.into_values().collect();
    ranked.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    ranked.truncate(limit);
    ranked
}

fn customer_insights(orders: &[&OrderRecord]) -> CustomerInsights {
    let mut per_customer: HashMap<CustomerId, u64> = HashMap::new();
    for order in orders {
        *per_customer.entry(order.customer_id).or_default() += 1;
    }

    let total_customers = per_customer.len() as u64;
    let order_count = orders.len() as u64;
    let repeaters = per_customer.values().filter(|n| **n > 1).count() as u64;

    CustomerInsights {
        total_customers,
        new_customers: total_customers,
        returning_customers: order_count - total_customers,
        repeat_customer_rate: ratio(repeaters, total_customers) * 100.0,
    }
}

/// Order count for every status, zeros included.
fn status_breakdown(orders: &[&OrderRecord]) -> Vec<StatusCount> {
    OrderStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: orders.iter().filter(|o| o.status == status).count() as u64,
        })
        .collect()
}

/// All 24 local hours, busiest first, then by hour.
fn peak_hours(orders: &[&OrderRecord], window: &Window) -> Vec<HourCount> {
    let mut counts = [0u64; 24];
    for order in orders {
        counts[window.local_hour(order.created_at) as usize] += 1;
    }

    let mut hours: Vec<_> = (0u32..24)
        .map(|hour| HourCount {
            hour,
            order_count: counts[hour as usize],
        })
        .collect();
    hours.sort_by(|a, b| b.order_count.cmp(&a.order_count).then(a.hour.cmp(&b.hour)));
    hours
}
