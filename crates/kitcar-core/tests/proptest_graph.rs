//! Property-based tests for the part graph.
//!
//! Random sequences of attach / detach / vehicle / destroy operations are
//! applied to a pool of parts; the structural invariants must hold after
//! every single operation.

use kitcar_core::graph::PartGraph;
use kitcar_core::id::PartId;
use kitcar_core::mount::SocketRef;
use kitcar_core::test_utils::*;
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

#[derive(Debug, Clone)]
enum Op {
    Attach { socket: usize, candidate: usize },
    DetachSocket(usize),
    DetachPart(usize),
    CreateVehicle(usize),
    DissolveVehicle(usize),
    Destroy(usize),
    StoreAndRespawn(usize),
}

fn arb_ops(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(
        prop_oneof![
            4 => (0..64usize, 0..64usize)
                .prop_map(|(socket, candidate)| Op::Attach { socket, candidate }),
            1 => (0..64usize).prop_map(Op::DetachSocket),
            1 => (0..64usize).prop_map(Op::DetachPart),
            1 => (0..64usize).prop_map(Op::CreateVehicle),
            1 => (0..8usize).prop_map(Op::DissolveVehicle),
            1 => (0..64usize).prop_map(Op::Destroy),
            1 => (0..64usize).prop_map(Op::StoreAndRespawn),
        ],
        1..=max_ops,
    )
}

fn pool(rig: &mut Rig) -> Vec<PartId> {
    let names = [
        "test_chassis",
        "test_chassis",
        "test_engine",
        "test_engine",
        "test_gearbox",
        "test_gearbox",
        "test_gearbox",
        "test_wheel",
        "test_wheel",
        "test_tank",
        "test_tank",
    ];
    names.iter().map(|n| rig.spawn(n)).collect()
}

fn live_parts(graph: &PartGraph) -> Vec<PartId> {
    graph.iter().map(|(id, _)| id).collect()
}

fn all_sockets(graph: &PartGraph) -> Vec<SocketRef> {
    graph
        .iter()
        .flat_map(|(id, part)| {
            part.sockets()
                .iter()
                .map(move |m| SocketRef::new(id, m.socket().clone()))
        })
        .collect()
}

fn pick<T: Clone>(items: &[T], index: usize) -> Option<T> {
    (!items.is_empty()).then(|| items[index % items.len()].clone())
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Connection symmetry, socket occupancy, owner and membership
    /// invariants hold after every operation.
    #[test]
    fn invariants_hold_after_every_operation(ops in arb_ops(40)) {
        let mut rig = Rig::new();
        pool(&mut rig);

        for op in ops {
            let parts = live_parts(&rig.graph);
            let vehicles: Vec<_> = rig.graph.vehicles().map(|(id, _)| id).collect();
            match op {
                Op::Attach { socket, candidate } => {
                    let (Some(s), Some(c)) = (pick(&all_sockets(&rig.graph), socket), pick(&parts, candidate)) else {
                        continue;
                    };
                    let expected = rig.graph.is_compatible(&s, c);
                    let attached = rig.graph.try_attach(&s, c);
                    prop_assert_eq!(attached, expected);
                    if attached {
                        let owner = rig.graph.get(s.part).unwrap();
                        prop_assert_eq!(owner.mount_point(&s.socket).unwrap().attached(), Some(c));
                        prop_assert_eq!(rig.graph.get(c).unwrap().owner(), owner.owner());
                    }
                }
                Op::DetachSocket(i) => {
                    if let Some(s) = pick(&all_sockets(&rig.graph), i) {
                        let child = rig.graph.detach(&s);
                        if let Some(child) = child {
                            prop_assert!(rig.graph.get(child).unwrap().owner().is_none());
                        }
                    }
                }
                Op::DetachPart(i) => {
                    if let Some(p) = pick(&parts, i) {
                        rig.graph.detach_part(p);
                        prop_assert!(rig.graph.parent_of(p).is_none());
                    }
                }
                Op::CreateVehicle(i) => {
                    if let Some(p) = pick(&parts, i) {
                        let _ = rig.graph.create_vehicle(p);
                    }
                }
                Op::DissolveVehicle(i) => {
                    if let Some(v) = pick(&vehicles, i) {
                        rig.graph.dissolve_vehicle(v).unwrap();
                    }
                }
                Op::Destroy(i) => {
                    if let Some(p) = pick(&parts, i) {
                        let _ = rig.graph.destroy_part(p);
                    }
                }
                Op::StoreAndRespawn(i) => {
                    if let Some(p) = pick(&parts, i) {
                        let before = rig.graph.get(p).unwrap().state().cloned();
                        if let Ok(stored) = rig.graph.store_part(p) {
                            let back = rig.spawner.respawn_stored(&mut rig.graph, &stored).unwrap();
                            prop_assert_eq!(rig.graph.get(back).unwrap().state().cloned(), before);
                        }
                    }
                }
            }

            let violations = rig.graph.validate();
            prop_assert!(violations.is_empty(), "violations: {:?}", violations);
        }
    }

    /// Detaching and re-attaching to the same socket restores the same
    /// connections and leaves the state untouched.
    #[test]
    fn detach_reattach_round_trip(wear in 0.0f64..1.0, fuel in 0.0f64..5.0) {
        let mut rig = Rig::new();
        let chassis = rig.spawn("test_chassis");
        let engine = rig.spawn("test_engine");
        let v = rig.graph.create_vehicle(chassis).unwrap();
        let bay = SocketRef::new(chassis, "engine_bay");
        prop_assert!(rig.graph.try_attach(&bay, engine));

        *rig.fuel_mut(engine) = fixed(fuel);
        rig.graph.get_mut(engine).unwrap().state_mut().unwrap().set_wear(fixed(wear));

        let connections_before = rig.graph.get(engine).unwrap().connections().clone();
        let state_before = rig.graph.get(engine).unwrap().state().unwrap().clone();
        let bytes_before = bitcode::serialize(&state_before).unwrap();

        prop_assert_eq!(rig.graph.detach(&bay), Some(engine));
        prop_assert!(rig.graph.try_attach(&bay, engine));

        let inst = rig.graph.get(engine).unwrap();
        prop_assert_eq!(inst.connections(), &connections_before);
        prop_assert_eq!(inst.owner(), Some(v));
        prop_assert_eq!(bitcode::serialize(inst.state().unwrap()).unwrap(), bytes_before);
    }
}
