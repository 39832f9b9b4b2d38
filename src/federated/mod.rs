//! Federated aggregation.
//!
//! Combines independently trained modules without centralizing data:
//! - Unweighted FedAvg over named parameter tensors
//! - Differential-privacy noise calibrated by epsilon

pub mod aggregator;

pub use aggregator::FederatedAggregator;
