//! Cost - model pricing and per-call cost calculation
//!
//! # Module Structure
//!
//! - `pricing`: price constants, [`ModelPricing`], [`PriceTable`] and [`CostBreakdown`]
//!
//! Accumulated cost lives in the router's statistics, not here.

mod pricing;


pub use pricing::*;
