//! Pure transforms from raw Kubernetes objects to reporting records.
//!
//! Nothing in here talks to the cluster or reads the clock; callers pass "now".

pub mod age;
pub mod cluster;
pub mod metrics;
pub mod node;
pub mod pod;
pub mod quantity;

pub use cluster::summarize_cluster;
pub use metrics::aggregate_metrics;
pub use node::summarize_node;
pub use pod::{assemble_pod_detail, summarize_pod};
