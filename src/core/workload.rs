//! Random workload generation for a fresh simulation run.

use rand::Rng;

use crate::config::SimulationConfig;
use crate::core::state::{Resource, SimulationState, Task, Thread};

/// Build a fresh state from `config`: idle threads `1..=thread_count`, free
/// resources `Resource A`, `Resource B`, ... and `task_count` random tasks.
///
/// The configuration is assumed valid; call [`SimulationConfig::validate`] first.
pub fn generate<R: Rng>(config: &SimulationConfig, rng: &mut R) -> SimulationState {
    let threads = (1..=config.thread_count as u64).map(Thread::idle).collect();
    let resources: Vec<Resource> = (0..config.resource_count)
        .map(|idx| Resource::new(Resource::letter_name(idx)))
        .collect();

    let workload = &config.workload;
    let low = workload.min_task_duration.max(1);
    let high = workload.max_task_duration.max(low);
    let tasks = (1..=config.task_count as u64)
        .map(|id| {
            let duration = rng.random_range(low..=high);
            let needs_resource = !resources.is_empty()
                && rng.random_bool(workload.resource_probability.clamp(0.0, 1.0));
            let resource_id = if needs_resource {
                let idx = rng.random_range(0..resources.len());
                Some(resources[idx].id.clone())
            } else {
                None
            };
            let priority = config.priority_distribution.pick(rng.random_range(0..100));
            Task::new(id, duration, resource_id, priority)
        })
        .collect();

    SimulationState::from_parts(threads, tasks, resources)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::config::{PriorityDistribution, WorkloadProfile};
    use crate::util::serde::Priority;

    #[test]
    fn test_shape_matches_config() {
        let cfg = SimulationConfig::new()
            .with_thread_count(8)
            .with_task_count(40)
            .with_resource_count(3);
        let state = generate(&cfg, &mut StdRng::seed_from_u64(1));

        assert_eq!(state.threads.len(), 8);
        assert_eq!(state.next_thread_id, 9);
        assert_eq!(state.tasks.len(), 40);
        let names: Vec<_> = state.resources.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(names, vec!["Resource A", "Resource B", "Resource C"]);
        assert!(state.resources.iter().all(|r| r.is_free() && r.queue.is_empty()));
        assert!(state.tasks.iter().all(|t| (10..=49).contains(&t.duration) && t.remaining == t.duration));
        assert_eq!(state.tick, 0);
        assert_eq!(state.completed_tasks, 0);
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_no_resources_means_no_resource_tasks() {
        let cfg = SimulationConfig::new()
            .with_resource_count(0)
            .with_workload(WorkloadProfile {
                resource_probability: 1.0,
                ..WorkloadProfile::default()
            });
        let state = generate(&cfg, &mut StdRng::seed_from_u64(2));
        assert!(state.tasks.iter().all(|t| t.resource_id.is_none()));
    }

    #[test]
    fn test_certain_resource_probability() {
        let cfg = SimulationConfig::new()
            .with_task_count(50)
            .with_workload(WorkloadProfile {
                resource_probability: 1.0,
                ..WorkloadProfile::default()
            });
        let state = generate(&cfg, &mut StdRng::seed_from_u64(3));
        assert!(state.tasks.iter().all(|t| t
            .resource_id
            .as_deref()
            .is_some_and(|rid| state.resource(rid).is_some())));
    }

    #[test]
    fn test_distribution_respected() {
        let cfg = SimulationConfig::new()
            .with_task_count(100)
            .with_priority_distribution(PriorityDistribution::new(100, 0, 0));
        let state = generate(&cfg, &mut StdRng::seed_from_u64(4));
        assert!(state.tasks.iter().all(|t| t.priority == Priority::High));
    }

    #[test]
    fn test_seed_is_deterministic() {
        let cfg = SimulationConfig::new().with_task_count(30);
        let a = generate(&cfg, &mut StdRng::seed_from_u64(11));
        let b = generate(&cfg, &mut StdRng::seed_from_u64(11));
        assert_eq!(a.tasks, b.tasks);
        assert_ne!(a.run_id, b.run_id);
    }
}
