//! Benchmark for the sales pipeline
//!
//! Measures:
//! - Fact table build (validate + join) on synthetic tables
//! - Sequential vs parallel evaluation of the standard metric set

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use ecommerce_metrics::{build_from_sources, AnalysisConfig, SalesAnalyzer, SourceTables};
use polars::prelude::*;
use std::hint::black_box;

const STATES: [&str; 8] = ["SP", "RJ", "MG", "RS", "PR", "SC", "BA", "DF"];
const CATEGORIES: [&str; 6] = ["toys", "garden", "books", "health", "sports", "audio"];

/// Synthetic dataset: `n_orders` orders with 1-4 items over two years
fn synthetic_sources(n_orders: usize) -> SourceTables {
    let n_products = 200;
    let n_customers = n_orders / 2 + 1;

    let mut order_id = Vec::with_capacity(n_orders);
    let mut customer_id = Vec::with_capacity(n_orders);
    let mut status = Vec::with_capacity(n_orders);
    let mut purchased = Vec::with_capacity(n_orders);
    let mut delivered: Vec<Option<String>> = Vec::with_capacity(n_orders);
    let mut estimated = Vec::with_capacity(n_orders);

    let mut item_order = Vec::new();
    let mut item_seq = Vec::new();
    let mut item_product = Vec::new();
    let mut item_price = Vec::new();
    let mut item_freight = Vec::new();

    let mut review_id = Vec::new();
    let mut review_order = Vec::new();
    let mut review_score = Vec::new();

    for i in 0..n_orders {
        let id = format!("order-{:08}", i);
        let year = 2022 + (i % 2) as i32;
        let month = i % 12 + 1;
        let day = i % 20 + 1;
        let delivered_day = day + i % 9;

        order_id.push(id.clone());
        customer_id.push(format!("cust-{}", i % n_customers));
        status.push(if i % 17 == 0 { "canceled" } else { "delivered" });
        purchased.push(format!("{}-{:02}-{:02} 10:00:00", year, month, day));
        delivered.push((i % 17 != 0).then(|| format!("{}-{:02}-{:02} 18:00:00", year, month, delivered_day)));
        estimated.push(format!("{}-{:02}-{:02} 00:00:00", year, month, day + 7));

        for seq in 1..=(i % 4 + 1) {
            item_order.push(id.clone());
            item_seq.push(seq as i64);
            item_product.push(format!("prod-{}", (i * 31 + seq) % n_products));
            item_price.push(5.0 + ((i * 13 + seq * 7) % 400) as f64);
            item_freight.push(3.0 + (seq % 5) as f64);
        }

        if i % 5 != 0 {
            review_id.push(format!("rev-{}", i));
            review_order.push(id);
            review_score.push((i % 5 + 1) as i64);
        }
    }

    let product_ids: Vec<String> = (0..n_products).map(|p| format!("prod-{}", p)).collect();
    let product_categories: Vec<&str> = (0..n_products).map(|p| CATEGORIES[p % CATEGORIES.len()]).collect();
    let customer_ids: Vec<String> = (0..n_customers).map(|c| format!("cust-{}", c)).collect();
    let customer_states: Vec<&str> = (0..n_customers).map(|c| STATES[c % STATES.len()]).collect();
    let customer_zips: Vec<i64> = (0..n_customers).map(|c| 1000 + c as i64).collect();

    SourceTables {
        orders: df![
            "order_id" => order_id,
            "customer_id" => customer_id,
            "order_status" => status,
            "order_purchase_timestamp" => purchased,
            "order_delivered_customer_date" => delivered,
            "order_estimated_delivery_date" => estimated,
        ]
        .expect("orders frame"),
        order_items: df![
            "order_id" => item_order,
            "order_item_id" => item_seq,
            "product_id" => item_product,
            "price" => item_price,
            "freight_value" => item_freight,
        ]
        .expect("items frame"),
        products: df![
            "product_id" => product_ids,
            "product_category_name" => product_categories,
        ]
        .expect("products frame"),
        customers: df![
            "customer_id" => customer_ids,
            "customer_state" => customer_states,
            "customer_zip_code_prefix" => customer_zips,
        ]
        .expect("customers frame"),
        reviews: df![
            "review_id" => review_id,
            "order_id" => review_order,
            "review_score" => review_score,
        ]
        .expect("reviews frame"),
        payments: None,
    }
}

fn bench_fact_build(c: &mut Criterion) {
    let sources = synthetic_sources(20_000);
    c.bench_function("fact_build_20k_orders", |b| {
        b.iter_batched(
            || sources.clone(),
            |sources| build_from_sources(black_box(&sources)).expect("build"),
            BatchSize::LargeInput,
        )
    });
}

fn bench_metrics(c: &mut Criterion) {
    let analyzer = SalesAnalyzer::new(&synthetic_sources(20_000)).expect("analyzer");
    let config = AnalysisConfig::new(2023);

    let mut group = c.benchmark_group("standard_metrics_20k_orders");
    group.bench_function("sequential", |b| {
        b.iter(|| analyzer.analyze(black_box(&config)).expect("analyze"))
    });
    group.bench_function("parallel", |b| {
        b.iter(|| analyzer.analyze_parallel(black_box(&config)).expect("analyze"))
    });
    group.finish();
}

criterion_group!(benches, bench_fact_build, bench_metrics);
criterion_main!(benches);
