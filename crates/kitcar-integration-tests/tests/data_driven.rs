//! A car assembled entirely from data files.

use std::fs;
use std::path::{Path, PathBuf};

use kitcar_core::fixed::Fixed64;
use kitcar_core::graph::PartGraph;
use kitcar_core::id::sockets;
use kitcar_core::mount::SocketRef;
use kitcar_core::sim::{NoPhysics, Simulation};
use kitcar_core::spawn::Spawner;
use kitcar_data::load_vehicle_data;
use kitcar_drivetrain::{DrivetrainGraphExt, register_drivetrain};

const PARTS: &str = r#"[
    (
        name: "hatchback_frame",
        sockets: [
            (id: "engine_bay", accepts: [engine], position: (0.0, 0.35, 1.1)),
            (id: "tank_bay", accepts: [fuel_tank], requires: [fluid_source], position: (0.0, 0.2, -1.4)),
        ],
        params: Chassis,
    ),
    (
        name: "inline4",
        durability: 90.0,
        sockets: [
            (id: "output", requires: [torque_receiver]),
            (id: "fuel_line", accepts: [fuel_tank], requires: [fluid_source]),
        ],
        params: Engine((
            torque_curve: [(500.0, 60.0), (1000.0, 90.0), (4000.0, 140.0), (6500.0, 100.0)],
            idle_rpm: 900.0,
            stall_rpm: 450.0,
            max_rpm: 6800.0,
            inertia: 0.2,
            friction_torque: 18.0,
            starter_torque: 45.0,
            fuel_capacity: 2.0,
            oil_capacity: 4.0,
            coolant_capacity: 6.0,
            fuel_consumption: 0.00002,
            fuel_feed_rate: 0.5,
            heat_rate: 1.0,
            cooling_rate: 0.05,
        )),
    ),
    (
        name: "five_speed",
        plug: "input",
        sockets: [(id: "output", requires: [torque_receiver])],
        params: Gearbox((
            forward_ratios: [3.6, 2.1, 1.4, 1.0, 0.8],
            reverse_ratio: -3.5,
            final_drive: 4.1,
            efficiency: 0.92,
            shift_duration: 0.1,
            friction_torque: 1.5,
        )),
    ),
    (
        name: "road_wheel",
        params: Wheel((radius: 0.31, rolling_resistance: 5.0, max_brake_torque: 900.0)),
    ),
    (
        name: "jerrycan",
        params: FuelTank((capacity: 20.0)),
    ),
]"#;

const SIM: &str = r#"(dt: 0.01, max_steps_per_advance: 4)"#;

fn make_data_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "kitcar_integration_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("parts.ron"), PARTS).unwrap();
    fs::write(dir.join("sim.ron"), SIM).unwrap();
    dir
}

fn cleanup(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn loaded_car_idles_and_drives() {
    let dir = make_data_dir("drive");
    let data = load_vehicle_data(&dir).unwrap();
    assert_eq!(data.registry.len(), 5);
    assert_eq!(data.sim.dt, Fixed64::from_num(0.01));

    let mut spawner = Spawner::new(data.registry.clone());
    register_drivetrain(&mut spawner);
    let mut graph = PartGraph::new();
    let spawn = |graph: &mut PartGraph, name: &str| {
        spawner.spawn_by_name(graph, name, None).unwrap()
    };

    let chassis = spawn(&mut graph, "hatchback_frame");
    let engine = spawn(&mut graph, "inline4");
    let gearbox = spawn(&mut graph, "five_speed");
    let wheel = spawn(&mut graph, "road_wheel");
    let tank = spawn(&mut graph, "jerrycan");
    let v = graph.create_vehicle(chassis).unwrap();
    assert!(graph.try_attach(&SocketRef::new(chassis, "engine_bay"), engine));
    assert!(graph.try_attach(&SocketRef::new(engine, sockets::OUTPUT), gearbox));
    assert!(graph.try_attach(&SocketRef::new(gearbox, sockets::OUTPUT), wheel));
    assert!(graph.try_attach(&SocketRef::new(engine, sockets::FUEL_LINE), tank));
    assert_eq!(
        graph.get(engine).unwrap().state().unwrap().durability(),
        Fixed64::from_num(90)
    );

    let mut sim = Simulation::new(data.sim.clone());
    graph
        .set_intent(v, Fixed64::ZERO, Fixed64::ZERO, Fixed64::ZERO, 0, true)
        .unwrap();
    // Slow frames: each is capped at four 10 ms steps.
    for _ in 0..150 {
        let result = sim.advance(&mut graph, &mut NoPhysics, Fixed64::from_num(0.1));
        assert!(result.dropped_time);
    }
    assert!(graph.engine_rpm(engine).unwrap() >= Fixed64::from_num(450));

    graph
        .set_intent(v, Fixed64::from_num(0.5), Fixed64::ZERO, Fixed64::ZERO, 1, true)
        .unwrap();
    for _ in 0..100 {
        sim.advance(&mut graph, &mut NoPhysics, Fixed64::from_num(0.04));
    }
    let drive = graph.wheel_drive_torque(wheel).unwrap();
    assert!(drive.torque > Fixed64::ZERO);
    assert!(drive.rpm > Fixed64::ZERO);
    assert!(graph.validate().is_empty());

    cleanup(&dir);
}
