//! Claim builders matching the synthetic node shapes.

use capgrid_core::claim::{
    CapacityRequest, CounterRequest, DeviceClaim, QuantityRequest, RequestKind,
};
use capgrid_core::quantity::Quantity;

fn q(s: &str) -> Quantity {
    s.parse().expect("static quantity literal")
}

fn counter_request(resource: &str, request: i64) -> CapacityRequest {
    CapacityRequest {
        resource: resource.to_string(),
        kind: RequestKind::Counter(CounterRequest { request }),
    }
}

fn quantity_request(resource: &str, request: &str) -> CapacityRequest {
    CapacityRequest {
        resource: resource.to_string(),
        kind: RequestKind::Quantity(QuantityRequest { request: q(request) }),
    }
}

/// The pod-level claim: one pod slot and one container slot from the
/// primary pool.
pub fn claim_pod() -> DeviceClaim {
    DeviceClaim {
        name: "pod".to_string(),
        driver: None,
        constraints: None,
        requests: vec![
            counter_request("pods", 1),
            counter_request("containers", 1),
        ],
    }
}

/// A container-level claim for CPU and memory. Either may be `None` for
/// containers without an explicit request.
pub fn claim_container(cpu: Option<&str>, memory: Option<&str>) -> DeviceClaim {
    let mut requests = Vec::new();
    if let Some(cpu) = cpu {
        requests.push(quantity_request("cpu", cpu));
    }
    if let Some(memory) = memory {
        requests.push(quantity_request("memory", memory));
    }
    DeviceClaim {
        name: "container".to_string(),
        driver: None,
        constraints: None,
        requests,
    }
}

/// A claim for a foozer card: cores, memory, and optionally virtual
/// interfaces, restricted to the foozer driver.
pub fn claim_foozer(name: &str, cores: &str, memory: &str, interfaces: i64) -> DeviceClaim {
    let mut requests = vec![
        quantity_request("example.com/foozer/cores", cores),
        quantity_request("example.com/foozer/memory", memory),
    ];
    if interfaces > 0 {
        requests.push(counter_request("example.com/foozer/interfaces", interfaces));
    }
    DeviceClaim {
        name: name.to_string(),
        driver: Some("example.com/foozer".to_string()),
        constraints: None,
        requests,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pod_claim_requests_slots() {
        let claim = claim_pod();
        assert_eq!(claim.driver, None);
        assert_eq!(claim.requests.len(), 2);
        assert_eq!(claim.requests[0].resource, "pods");
        assert_eq!(claim.requests[1].resource, "containers");
    }

    #[test]
    fn container_claim_omits_missing_resources() {
        assert!(claim_container(None, None).requests.is_empty());
        let cpu_only = claim_container(Some("250m"), None);
        assert_eq!(cpu_only.requests.len(), 1);
        assert_eq!(cpu_only.requests[0].resource, "cpu");
    }

    #[test]
    fn foozer_claim_filters_by_driver() {
        let claim = claim_foozer("foozer", "1", "2Gi", 1);
        assert_eq!(claim.driver.as_deref(), Some("example.com/foozer"));
        assert_eq!(claim.requests.len(), 3);

        let no_ifaces = claim_foozer("foozer", "1", "2Gi", 0);
        assert_eq!(no_ifaces.requests.len(), 2);
    }
}
