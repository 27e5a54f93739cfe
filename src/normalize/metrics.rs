use tracing::{debug, warn};

use crate::error::QuantityError;
use crate::models::k8s::PodUsage;
use crate::models::views::PodMetrics;

use super::quantity::{parse_cpu_millicores, parse_memory_mebibytes};

/// One [`PodMetrics`] per pod in the usage listing.
pub fn aggregate_metrics(usage: &[PodUsage]) -> Vec<PodMetrics> {
    usage.iter().map(aggregate_pod_usage).collect()
}

/// Sum the usage of every container of a pod.
///
/// Samples are summed unrounded and truncated once at the end. A sample
/// that fails to parse counts as zero.
pub fn aggregate_pod_usage(pod: &PodUsage) -> PodMetrics {
    let pod_name = &pod.metadata.name;
    let mut cpu: f64 = 0.0;
    let mut memory: f64 = 0.0;

    for c in &pod.containers {
        cpu += sample_or_zero(parse_cpu_millicores(&c.usage.cpu), pod_name, &c.name);
        memory += sample_or_zero(parse_memory_mebibytes(&c.usage.memory), pod_name, &c.name);
    }

    let cpu_millicores = cpu.floor() as u64;
    let memory_mb = memory.floor() as u64;

    PodMetrics {
        pod: pod_name.clone(),
        cpu: format!("{}m", cpu_millicores),
        cpu_millicores,
        memory: format!("{}Mi", memory_mb),
        memory_mb,
    }
}

fn sample_or_zero(sample: Result<f64, QuantityError>, pod: &str, container: &str) -> f64 {
    match sample {
        Ok(v) => v,
        Err(e @ QuantityError::UnknownUnit { .. }) => {
            warn!("pod {} container {}: {}, counting as zero", pod, container, e);
            0.0
        }
        Err(e) => {
            debug!("pod {} container {}: {}, counting as zero", pod, container, e);
            0.0
        }
    }
}
