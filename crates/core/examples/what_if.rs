//! What-If Analysis
//!
//! Run with: cargo run --example what_if
//! Set RUST_LOG=lineage_core=trace to see dispatch and scope events.
//!
//! This example demonstrates:
//! - Building a small pricing model from leaves
//! - Changing an input and re-resolving the result
//! - Precedence-correct expressions and dependency sets
//! - ASCII, DOT and JSON views of a snapshot
//! - Scope conditions on leaves built inside a scope

use lineage_core::{scope, Entity, EntityError, RenderOptions};
use num_rational::Rational64;
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), EntityError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== What-If Pricing Model ===\n");

    // ========================================================================
    // 1. Model
    // ========================================================================

    println!("1. Building the model");
    println!("---------------------");

    let units = Entity::builder("units", Rational64::from_integer(120))
        .description("Units sold")
        .arbitrary("source", json!("forecast"))
        .build()?;
    let price = Entity::builder("price", Rational64::new(199, 10))
        .value_state("floor", Rational64::from_integer(15))
        .build()?;
    let cost = Entity::leaf("cost", Rational64::new(121, 10))?;

    let margin = price.minus(&cost)?;
    let profit = units.times(&margin)?.described("Profit")?;

    println!("Expression:   {}", profit.dependency_expression());
    println!("Depends on:   {:?}", profit.dependency_names());
    println!("Profit:       {}\n", profit.resolve()?);

    // ========================================================================
    // 2. What if?
    // ========================================================================

    println!("2. What if the price drops to 17.50?");
    println!("-------------------------------------");

    price.reset(Rational64::new(35, 2))?;
    println!("Profit:       {}", profit.resolve()?);

    let viable = profit.greater_than(&Entity::leaf("target", Rational64::from_integer(500))?)?;
    println!("Beats target: {}\n", viable.resolve()?);

    // ========================================================================
    // 3. Snapshot
    // ========================================================================

    println!("3. ASCII Rendering");
    println!("------------------");
    let graph = profit.build_graph()?;
    println!("{}\n", graph);

    println!("Without metadata, two levels deep:");
    println!(
        "{}\n",
        graph.render_with(&RenderOptions::new().with_metadata(false).with_max_depth(1))
    );

    println!("4. DOT Export (for Graphviz)");
    println!("----------------------------");
    println!("```dot");
    println!("{}", graph.render_dot());
    println!("```\n");

    println!("5. JSON Export");
    println!("--------------");
    match graph.to_json() {
        Ok(text) => println!("{}\n", text),
        Err(err) => println!("serialization failed: {}\n", err),
    }

    // ========================================================================
    // 6. Scopes
    // ========================================================================

    println!("6. Scope Conditions");
    println!("-------------------");

    let promo = Entity::leaf("promo_active", true)?;
    let discount = scope::with_condition(&promo, || {
        Entity::leaf("discount", Rational64::new(1, 10))
    })?;
    let discounted = price.minus(&price.times(&discount)?)?;

    println!("Expression:   {}", discounted.dependency_expression());
    println!("Price:        {}", discounted.resolve()?);
    println!("{}", discounted.build_graph()?);

    Ok(())
}
