use crate::protocol::{HealthResponse, Response};
use crate::state::WorkerState;
use serde_json::json;

pub fn build_health(state: &WorkerState) -> Response {
    let model_loaded = state.engine.is_initialized();

    Response::Health(HealthResponse {
        status: if model_loaded {
            "healthy"
        } else {
            "not_initialized"
        },
        model_loaded,
        device: state.engine.device().as_str(),
        stats: state.engine.stats().clone(),
        memory_usage: get_memory_info(),
    })
}

#[cfg(target_os = "linux")]
fn get_memory_info() -> serde_json::Value {
    let pid = std::process::id();

    match std::fs::read_to_string(format!("/proc/{}/status", pid)) {
        Ok(status) => {
            let mut rss_mb = None;
            let mut vms_mb = None;

            for line in status.lines() {
                if line.starts_with("VmRSS:") {
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        rss_mb = kb_str.parse::<f64>().ok().map(|kb| kb / 1024.0);
                    }
                } else if line.starts_with("VmSize:") {
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        vms_mb = kb_str.parse::<f64>().ok().map(|kb| kb / 1024.0);
                    }
                }
            }

            match (rss_mb, vms_mb) {
                (Some(rss), Some(vms)) => json!({
                    "rss_mb": rss,
                    "vms_mb": vms
                }),
                _ => json!({ "error": "Memory fields missing from process status" }),
            }
        }
        Err(e) => json!({ "error": format!("Failed to read process status: {}", e) }),
    }
}

#[cfg(not(target_os = "linux"))]
fn get_memory_info() -> serde_json::Value {
    json!({ "error": "Memory info not available on this platform" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;

    #[test]
    fn test_health_before_initialization() {
        let state = WorkerState::new(WorkerConfig::default());
        let value = serde_json::to_value(build_health(&state)).unwrap();

        assert_eq!(value["status"], "not_initialized");
        assert_eq!(value["model_loaded"], false);
        assert!(value["device"] == "cpu" || value["device"] == "cuda");
        assert_eq!(value["stats"]["total_processed"], 0);
        assert_eq!(value["stats"]["errors"], 0);
    }

    #[test]
    fn test_memory_info_shape() {
        let info = get_memory_info();
        let has_measurements = info.get("rss_mb").is_some() && info.get("vms_mb").is_some();
        let has_error = info.get("error").is_some();
        assert!(has_measurements || has_error);
    }
}
