// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Scenario Tests

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use cyberwheel_sim::detectors::{Alert, DetectorGraphConfig, DetectorHandler, HostRef};
    use cyberwheel_sim::network::{FirewallRule, HostType, PortSelector, ProtoSelector};
    use cyberwheel_sim::red::{ArtAgent, DfsImpact, KillChainPhase, ServerDowntime, TechniqueCatalog};
    use cyberwheel_sim::types::Protocol;
    use cyberwheel_sim::{seeded_rng, EnvConfig, Network, NetworkConfig, Simulation};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn example_network(seed: u64) -> Network {
        let config = NetworkConfig::example().expect("test: example config");
        Network::from_config(&config, &mut seeded_rng(seed)).expect("test: example network")
    }

    fn action_index(sim: &Simulation, name: &str) -> i64 {
        (0..sim.action_space_size() as i64)
            .find(|i| sim.blue_agent().action_name(*i).as_deref() == Some(name))
            .expect("test: action present")
    }

    // =====================================================================
    // Network invariants
    // =====================================================================

    #[test]
    fn test_isolate_then_reconnect_restores_every_edge() {
        let mut net = example_network(1);
        let before = net.edges();
        for host in net.host_names() {
            net.isolate(&host).expect("test: isolate");
            assert_eq!(net.neighbors(&host).count(), 0, "{host} still has edges");
            net.reconnect(&host).expect("test: reconnect");
            assert_eq!(net.edges(), before, "{host} round trip changed the graph");
        }
    }

    #[test]
    fn test_decoy_create_and_remove_returns_the_address() {
        let mut net = example_network(2);
        let mut rng = seeded_rng(2);
        let available = |n: &Network| n.subnet("server_subnet").map(|s| s.pool.available()).expect("test: subnet");
        let start = available(&net);

        net.create_decoy("bait", "server_subnet", HostType::new("decoy_server", "linux"), &mut rng)
            .expect("test: create");
        assert_eq!(available(&net), start - 1);
        assert_eq!(net.num_decoys(), 1);

        net.remove_decoy("bait").expect("test: remove");
        assert_eq!(available(&net), start);
        assert_eq!(net.num_decoys(), 0);
        assert!(!net.contains("bait"));
    }

    #[test]
    fn test_firewall_verdict_is_stable_and_most_specific() {
        let mut net = example_network(3);
        let s0 = net.host_mut("s0").expect("test: s0");
        s0.firewall_rules = Some(vec![
            FirewallRule::allow("ssh", "user_subnet", PortSelector::Port(22), ProtoSelector::Proto(Protocol::Tcp)),
            FirewallRule::deny("block-h1", "h1", PortSelector::All, ProtoSelector::All),
        ]);

        for _ in 0..5 {
            assert!(net.is_traffic_allowed("h0", "s0", Some(22), "tcp").expect("test: verdict"));
            assert!(!net.is_traffic_allowed("h0", "s0", Some(80), "tcp").expect("test: verdict"));
            assert!(!net.is_traffic_allowed("h1", "s0", Some(22), "tcp").expect("test: verdict"));
        }
        // no rules on s1
        assert!(net.is_traffic_allowed("h1", "s1", Some(445), "tcp").expect("test: verdict"));
    }

    // =====================================================================
    // Attacker scenarios
    // =====================================================================

    #[test]
    fn test_dfs_attacker_impacts_its_entry_host() {
        init_tracing();
        let mut net = example_network(4);
        let mut rng = seeded_rng(4);
        let catalog = TechniqueCatalog::builtin().expect("test: catalog");
        let mut red = ArtAgent::new("h0", &net, None, Box::new(DfsImpact), catalog).expect("test: agent");

        let phases: Vec<Option<KillChainPhase>> =
            (0..5).map(|_| red.act(&mut net, &mut rng).expect("test: act")).collect();
        assert_eq!(
            phases,
            vec![
                Some(KillChainPhase::PingSweep),
                Some(KillChainPhase::PortScan),
                Some(KillChainPhase::Discovery),
                Some(KillChainPhase::PrivilegeEscalation),
                Some(KillChainPhase::Impact),
            ]
        );
        let h0 = red.history().host("h0").expect("test: h0 known");
        assert!(h0.impacted);
        assert_eq!(h0.last_step, 2);
        assert_eq!(net.is_compromised("h0"), Some(true));
    }

    #[test]
    fn test_attacker_on_isolated_host_cannot_move() {
        let mut net = example_network(5);
        let mut rng = seeded_rng(5);
        let catalog = TechniqueCatalog::builtin().expect("test: catalog");
        let mut red = ArtAgent::new("h1", &net, None, Box::new(ServerDowntime), catalog).expect("test: agent");

        red.run_action(&mut net, "h1", &mut rng).expect("test: sweep");
        red.run_action(&mut net, "h0", &mut rng).expect("test: scan");
        net.isolate("h1").expect("test: isolate");

        let moved = red.run_action(&mut net, "h0", &mut rng).expect("test: move");
        assert_eq!(moved.phase, Some(KillChainPhase::LateralMovement));
        assert!(!moved.attack_success);
        assert_eq!(red.current_host(), "h1");
    }

    // =====================================================================
    // Detectors
    // =====================================================================

    fn alert_to(dst: HostRef) -> Alert {
        let mut alert = Alert::new(Some(HostRef::new("h0")), vec![dst]);
        alert.add_technique("T1021");
        alert
    }

    #[test]
    fn test_perfect_detector_is_identity() {
        let mut handler =
            DetectorHandler::from_config(&DetectorGraphConfig::builtin("perfect").expect("test: config"))
                .expect("test: graph");
        let mut rng = seeded_rng(6);
        let alerts = vec![alert_to(HostRef::new("s0")), alert_to(HostRef::new("d1"))];
        assert_eq!(handler.obs(&alerts, &mut rng), alerts);
    }

    #[test]
    fn test_decoy_detector_only_sees_decoy_traffic() {
        let mut handler =
            DetectorHandler::from_config(&DetectorGraphConfig::builtin("decoy").expect("test: config"))
                .expect("test: graph");
        let mut rng = seeded_rng(7);
        let bait = HostRef {
            decoy: true,
            ..HostRef::new("bait")
        };

        assert!(handler.obs(&[alert_to(HostRef::new("s0"))], &mut rng).is_empty());
        handler.reset();

        let seen = handler.obs(&[alert_to(bait.clone())], &mut rng);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].dst_hosts, vec![bait]);
        assert!(seen[0].techniques.contains("T1021"));
    }

    // =====================================================================
    // Environment
    // =====================================================================

    #[test]
    fn test_reset_clears_decoys_and_restores_graph() {
        init_tracing();
        let net = example_network(8);
        let edges = net.edges();
        let hosts: BTreeSet<String> = net.host_names().into_iter().collect();
        let mut sim = Simulation::new(
            net,
            EnvConfig {
                seed: Some(8),
                ..EnvConfig::default()
            },
        )
        .expect("test: simulation");
        sim.reset(None).expect("test: reset");

        let deploy = action_index(&sim, "deploy_decoy_server");
        let isolate = action_index(&sim, "isolate_host");
        sim.step(deploy).expect("test: deploy");
        assert_eq!(sim.network().num_decoys(), 1);
        sim.step(isolate).expect("test: isolate");
        assert!(!sim.network().isolated_hosts().is_empty());

        for _ in 0..2 {
            let obs = sim.reset(None).expect("test: reset");
            assert!(obs.iter().all(|v| *v == 0.0));
            assert_eq!(sim.network().num_decoys(), 0);
            assert!(sim.network().isolated_hosts().is_empty());
            assert_eq!(sim.network().edges(), edges);
            let now: BTreeSet<String> = sim.network().host_names().into_iter().collect();
            assert_eq!(now, hosts);
            assert_eq!(sim.current_step(), 0);
        }
    }

    #[test]
    fn test_same_seed_same_episode() {
        let run = || {
            let mut sim = Simulation::new(
                example_network(9),
                EnvConfig {
                    seed: Some(9),
                    evaluation: true,
                    max_steps: 12,
                    ..EnvConfig::default()
                },
            )
            .expect("test: simulation");
            sim.reset(Some(9)).expect("test: reset");
            let size = sim.action_space_size() as i64;
            (0..12)
                .map(|i| sim.step((i * 7) % size).expect("test: step"))
                .collect::<Vec<_>>()
        };

        let first = run();
        let second = run();
        assert_eq!(first, second);
        assert!(first.last().is_some_and(|r| r.done));
        assert!(first.iter().all(|r| r.observation.len() == 12));
    }

    #[test]
    fn test_observation_history_is_sticky() {
        let mut sim = Simulation::new(
            example_network(10),
            EnvConfig {
                seed: Some(10),
                strategy: "dfs_impact".parse().expect("test: strategy"),
                ..EnvConfig::default()
            },
        )
        .expect("test: simulation");
        sim.reset(None).expect("test: reset");
        let nothing = action_index(&sim, "nothing");

        let mut previous = vec![0.0_f32; sim.observation_size()];
        for _ in 0..10 {
            let result = sim.step(nothing).expect("test: step");
            let half = result.observation.len() / 2;
            for i in half..result.observation.len() {
                assert!(result.observation[i] >= previous[i], "history slot {i} cleared");
                assert!(result.observation[i] >= result.observation[i - half]);
            }
            previous = result.observation;
        }
        // the perfect detector reports every attacker action against a real host
        assert!(previous.iter().any(|v| *v == 1.0));
    }
}
