//! Simulation Scenario Tests
//!
//! End-to-end protocol behaviour on a simulated group.
//!
//! ## Test Scopes
//! - **Bootstrap**: Introducer plus one joiner.
//! - **Convergence**: Sequential joins end in identical views with fresh heartbeats.
//! - **Crash Detection**: A silent node is evicted everywhere once its heartbeat lag hits the bound.
//! - **Lossy Network**: Gossip repetition absorbs message loss.

#[cfg(test)]
mod tests {
    use crate::membership::config::MembershipConfig;
    use crate::membership::types::{NodeIdentity, NodeStatus};
    use crate::simulation::{Simulation, SimulationConfig};
    use crate::transport::NetworkConfig;

    fn sim(nodes: usize, fail_timeout_ticks: u64) -> Simulation {
        let membership = MembershipConfig {
            fail_timeout_ticks,
            ..MembershipConfig::default()
        };
        Simulation::new(SimulationConfig {
            nodes,
            membership,
            network: NetworkConfig::default(),
        })
        .expect("valid simulation")
    }

    fn id(i: usize) -> NodeIdentity {
        Simulation::identity_of(i)
    }

    // ============================================================
    // SETUP TESTS
    // ============================================================

    #[test]
    fn test_empty_simulation_is_rejected() {
        let result = Simulation::new(SimulationConfig {
            nodes: 0,
            ..SimulationConfig::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_first_node_is_introducer() {
        let sim = sim(3, 10);

        assert_eq!(sim.identities(), vec![id(1), id(2), id(3)]);
        assert_eq!(sim.runtime(&id(2)).unwrap().introducer(), id(1));
    }

    #[test]
    fn test_joiner_without_introducer_fails() {
        let mut sim = sim(2, 10);

        // Introducer never started, so it is not on the network
        let status = sim.start_node(id(2)).unwrap();

        assert_eq!(status, NodeStatus::Failed);
        sim.run(5);
        assert_eq!(sim.runtime(&id(2)).unwrap().heartbeat(), 0);
    }

    // ============================================================
    // BOOTSTRAP TESTS
    // ============================================================

    #[test]
    fn test_bootstrap_two_nodes() {
        let mut sim = sim(2, 10);
        sim.start_all().unwrap();

        assert_eq!(sim.runtime(&id(1)).unwrap().status(), NodeStatus::InGroup);
        assert_eq!(sim.runtime(&id(2)).unwrap().status(), NodeStatus::Joining);

        sim.step();

        for node in [id(1), id(2)] {
            let runtime = sim.runtime(&node).unwrap();
            assert_eq!(runtime.status(), NodeStatus::InGroup);
            assert!(runtime.contains(&id(1)));
            assert!(runtime.contains(&id(2)));
        }
        assert!(sim.is_converged());
    }

    // ============================================================
    // CONVERGENCE TESTS
    // ============================================================

    #[test]
    fn test_sequential_joins_converge() {
        let mut sim = sim(3, 10);

        sim.start_node(id(1)).unwrap();
        sim.run(2);
        sim.start_node(id(2)).unwrap();
        sim.run(2);
        sim.start_node(id(3)).unwrap();
        sim.run(5);

        assert!(sim.is_converged());
        assert_eq!(sim.live_identities(), vec![id(1), id(2), id(3)]);

        // Every view of every node trails that node's own heartbeat by at most one round
        for observer in sim.identities() {
            let view = sim.runtime(&observer).unwrap().members();
            for entry in view {
                let own = sim.runtime(&entry.identity).unwrap().heartbeat();
                assert!(
                    own - entry.heartbeat <= 1,
                    "{} sees {} at {} but it is at {}",
                    observer,
                    entry.identity,
                    entry.heartbeat,
                    own
                );
            }
        }
    }

    #[test]
    fn test_larger_group_converges() {
        let mut sim = sim(8, 10);
        sim.start_all().unwrap();

        sim.run(3);

        assert!(sim.is_converged());
        for node in sim.identities() {
            assert_eq!(sim.runtime(&node).unwrap().members().len(), 8);
        }
    }

    // ============================================================
    // CRASH DETECTION TESTS
    // ============================================================

    #[test]
    fn test_crashed_node_is_evicted() {
        let timeout = 3;
        let mut sim = sim(3, timeout);
        sim.start_all().unwrap();
        sim.run(3);
        assert!(sim.is_converged());

        sim.crash(id(2)).unwrap();

        // Within the bound the silent node is still tolerated
        sim.run(timeout);
        assert!(sim.runtime(&id(1)).unwrap().contains(&id(2)));
        assert!(sim.runtime(&id(3)).unwrap().contains(&id(2)));

        sim.run(2 * timeout + 2);

        for survivor in [id(1), id(3)] {
            let runtime = sim.runtime(&survivor).unwrap();
            assert!(!runtime.contains(&id(2)), "{} still lists the crashed node", survivor);
            assert_eq!(runtime.members().len(), 2);
        }
        assert_eq!(sim.live_identities(), vec![id(1), id(3)]);
        assert!(sim.is_converged());
    }

    #[test]
    fn test_eviction_tracks_heartbeat_gap() {
        let timeout = 4;
        let mut sim = sim(2, timeout);
        sim.start_all().unwrap();
        sim.run(2);

        sim.crash(id(2)).unwrap();
        // Let the observer consume whatever the victim sent before dying
        sim.step();
        let last_known = sim
            .runtime(&id(1))
            .unwrap()
            .members()
            .iter()
            .find(|e| e.identity == id(2))
            .map(|e| e.heartbeat)
            .unwrap();

        loop {
            let observer = sim.runtime(&id(1)).unwrap();
            let gap = observer.heartbeat() - last_known;
            if gap >= 2 * timeout {
                assert!(!observer.contains(&id(2)));
                break;
            }
            assert!(observer.contains(&id(2)), "evicted early at gap {}", gap);
            sim.step();
        }
    }

    #[test]
    fn test_graceful_shutdown_is_detected_like_a_crash() {
        let mut sim = sim(3, 2);
        sim.start_all().unwrap();
        sim.run(2);

        sim.shutdown(id(3)).unwrap();
        assert_eq!(sim.runtime(&id(3)).unwrap().status(), NodeStatus::Stopped);

        sim.run(8);
        assert!(!sim.runtime(&id(1)).unwrap().contains(&id(3)));
        assert!(!sim.runtime(&id(2)).unwrap().contains(&id(3)));
    }

    // ============================================================
    // LOSSY NETWORK TESTS
    // ============================================================

    #[test]
    fn test_lossy_network_still_converges() {
        let mut sim = Simulation::new(SimulationConfig {
            nodes: 5,
            membership: MembershipConfig::default(),
            network: NetworkConfig {
                drop_probability: 0.05,
                seed: 7,
                ..NetworkConfig::default()
            },
        })
        .unwrap();
        sim.start_all().unwrap();

        sim.run(40);

        assert!(sim.live_identities().contains(&id(1)));
        assert!(sim.is_converged());
        assert!(sim.stats(&id(1)).dropped > 0 || sim.stats(&id(2)).dropped > 0);
    }
}
