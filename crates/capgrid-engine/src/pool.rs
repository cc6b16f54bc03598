//! The pool allocator: a device claim against one pool.
//!
//! Filters by driver, filters devices by the claim's constraint
//! expression, runs the device allocator on the survivors, and picks the
//! best-scoring device. Devices that fail keep a per-device
//! `failure_reason` so the result is a complete diagnostic.

use capgrid_core::attribute::merge_attributes;
use capgrid_core::capacity::DevicePool;
use capgrid_core::claim::DeviceClaim;
use capgrid_core::result::{DeviceResult, PoolResult};
use tracing::debug;

use crate::device::{allocate_device, reduce_device};
use crate::error::CommitError;

/// Evaluate `claim` against every device in `pool` and select the best.
pub fn allocate_pool(pool: &DevicePool, claim: &DeviceClaim) -> PoolResult {
    let mut result = PoolResult {
        pool_name: pool.name.clone(),
        device_results: Vec::with_capacity(pool.devices.len()),
        best: None,
        failure_reason: None,
    };

    if let Some(driver) = claim.driver.as_deref() {
        // An empty driver filter matches any pool.
        if !driver.is_empty() && driver != pool.driver {
            result.failure_reason = Some(format!(
                "pool driver {:?} mismatch claim driver {:?}",
                pool.driver, driver
            ));
            return result;
        }
    }

    let mut best: Option<usize> = None;
    for device in &pool.devices {
        let mut device_result = DeviceResult {
            device_name: device.name.clone(),
            capacity_results: Vec::new(),
            score: 0,
            failure_reason: None,
        };

        let attributes = merge_attributes(&pool.attributes, &device.attributes);
        match capgrid_constraint::evaluate(claim.constraints.as_deref(), &attributes) {
            Err(err) => {
                device_result.failure_reason =
                    Some(format!("error evaluating against constraints: {err}"));
            }
            Ok(false) => {
                device_result.failure_reason = Some("does not meet constraints".to_string());
            }
            Ok(true) => match allocate_device(device, claim) {
                Err(err) => device_result.failure_reason = Some(err.to_string()),
                Ok(capacities) => {
                    // TODO(scoring): penalize topology splits instead of
                    // scoring every satisfiable device the same.
                    device_result.score = 100;
                    device_result.capacity_results = capacities;
                }
            },
        }

        debug!(
            pool = %pool.name,
            device = %device.name,
            score = device_result.score,
            reason = device_result.failure_reason.as_deref().unwrap_or(""),
            "evaluated device"
        );

        result.device_results.push(device_result);
        let idx = result.device_results.len() - 1;
        let candidate = &result.device_results[idx];
        let improves = match best {
            None => candidate.success(),
            Some(b) => candidate.success() && result.device_results[b].score < candidate.score,
        };
        if improves {
            best = Some(idx);
        }
    }

    result.best = best;
    if best.is_none() {
        result.failure_reason = Some("no devices in pool with sufficient capacity".to_string());
    }

    result
}

/// Commit a pool result's reductions to the winning device. The result
/// must come from [`allocate_pool`] on this same pool.
pub fn reduce_pool(pool: &mut DevicePool, result: &PoolResult) -> Result<(), CommitError> {
    if pool.name != result.pool_name {
        return Err(CommitError::PoolMismatch {
            pool: pool.name.clone(),
            result_pool: result.pool_name.clone(),
        });
    }

    let Some(best) = result.best else {
        return Err(CommitError::Unsatisfied {
            pool: pool.name.clone(),
        });
    };

    if pool.devices.len() != result.device_results.len() {
        return Err(CommitError::DeviceCountMismatch {
            pool: pool.name.clone(),
        });
    }

    reduce_device(
        &mut pool.devices[best],
        &result.device_results[best].capacity_results,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use capgrid_core::attribute::{Attribute, AttributeValue};
    use capgrid_core::capacity::{Capacity, CapacityKind, CounterCapacity, Device};
    use capgrid_core::claim::{CapacityRequest, CounterRequest, RequestKind};

    fn counter_device(name: &str, vfs: i64, model: &str) -> Device {
        Device {
            name: name.to_string(),
            attributes: vec![Attribute {
                name: "model".to_string(),
                value: AttributeValue::StringValue(model.to_string()),
            }],
            capacities: vec![Capacity {
                name: "vfs".to_string(),
                topologies: vec![],
                kind: CapacityKind::Counter(CounterCapacity { capacity: vfs }),
            }],
        }
    }

    fn foozer_pool() -> DevicePool {
        DevicePool {
            name: "foozer-1000-01".to_string(),
            driver: "example.com/foozer".to_string(),
            attributes: vec![],
            devices: vec![
                counter_device("dev-foo-0", 0, "foozer-1000"),
                counter_device("dev-foo-1", 16, "foozer-1000"),
                counter_device("dev-foo-2", 16, "foozer-4000"),
            ],
        }
    }

    fn vfs_claim(driver: Option<&str>, constraints: Option<&str>, request: i64) -> DeviceClaim {
        DeviceClaim {
            name: "vfs".to_string(),
            driver: driver.map(str::to_string),
            constraints: constraints.map(str::to_string),
            requests: vec![CapacityRequest {
                resource: "vfs".to_string(),
                kind: RequestKind::Counter(CounterRequest { request }),
            }],
        }
    }

    #[test]
    fn driver_mismatch_skips_the_pool() {
        let pool = foozer_pool();
        let result = allocate_pool(&pool, &vfs_claim(Some("kubelet"), None, 1));
        assert!(!result.success());
        assert_eq!(
            result.failure_reason.as_deref(),
            Some("pool driver \"example.com/foozer\" mismatch claim driver \"kubelet\"")
        );
        assert!(result.device_results.is_empty());
    }

    #[test]
    fn empty_driver_matches_any_pool() {
        let pool = foozer_pool();
        for claim in [vfs_claim(None, None, 1), vfs_claim(Some(""), None, 1)] {
            let result = allocate_pool(&pool, &claim);
            assert!(result.success(), "claim {:?}", claim.driver);
        }
    }

    #[test]
    fn first_satisfiable_device_wins_ties() {
        let pool = foozer_pool();
        let result = allocate_pool(&pool, &vfs_claim(Some("example.com/foozer"), None, 1));
        // dev-foo-0 has nothing left; dev-foo-1 and dev-foo-2 both score
        // 100 and the earlier one is kept.
        assert_eq!(result.best, Some(1));
        assert_eq!(result.device_results.len(), 3);
        assert!(result.device_results[0]
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("insufficient capacity"));
    }

    #[test]
    fn constraints_filter_devices_without_aborting_the_pool() {
        let pool = foozer_pool();
        let result = allocate_pool(
            &pool,
            &vfs_claim(None, Some(r#"device.model == "foozer-4000""#), 1),
        );
        assert_eq!(result.best, Some(2));
        assert_eq!(
            result.device_results[1].failure_reason.as_deref(),
            Some("does not meet constraints")
        );
    }

    #[test]
    fn constraint_errors_are_reported_per_device() {
        let pool = foozer_pool();
        let result = allocate_pool(
            &pool,
            &vfs_claim(None, Some(r#"device.nonexistent == "x""#), 1),
        );
        assert!(!result.success());
        for dr in &result.device_results {
            let reason = dr.failure_reason.as_deref().unwrap();
            assert!(reason.starts_with("error evaluating against constraints:"));
            assert!(reason.contains("device.nonexistent"));
        }
    }

    #[test]
    fn exhausted_pool_reports_no_devices() {
        let pool = foozer_pool();
        let result = allocate_pool(&pool, &vfs_claim(None, None, 64));
        assert!(!result.success());
        assert_eq!(
            result.failure_reason.as_deref(),
            Some("no devices in pool with sufficient capacity")
        );
    }

    #[test]
    fn reduce_pool_commits_to_the_winning_device() {
        let mut pool = foozer_pool();
        let result = allocate_pool(&pool, &vfs_claim(None, None, 10));
        reduce_pool(&mut pool, &result).unwrap();
        match &pool.devices[1].capacities[0].kind {
            CapacityKind::Counter(c) => assert_eq!(c.capacity, 6),
            other => panic!("wrong kind: {other:?}"),
        }
        // losing devices untouched
        match &pool.devices[2].capacities[0].kind {
            CapacityKind::Counter(c) => assert_eq!(c.capacity, 16),
            other => panic!("wrong kind: {other:?}"),
        }
    }

    #[test]
    fn reduce_pool_rejects_foreign_results() {
        let mut pool = foozer_pool();
        let result = allocate_pool(&pool, &vfs_claim(None, None, 1));

        let mut other = pool.clone();
        other.name = "other".to_string();
        assert!(matches!(
            reduce_pool(&mut other, &result),
            Err(CommitError::PoolMismatch { .. })
        ));
    }

    #[test]
    fn reduce_pool_rejects_unsatisfied_results() {
        let mut pool = foozer_pool();
        let result = allocate_pool(&pool, &vfs_claim(None, None, 64));
        assert!(matches!(
            reduce_pool(&mut pool, &result),
            Err(CommitError::Unsatisfied { .. })
        ));
    }
}
