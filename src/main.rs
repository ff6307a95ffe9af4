use std::time::Instant;

use clap::{Arg, Command};
use serde::Serialize;

use avalanche_simulator::{
    run, AvalancheSolver, FlowDiagnostics, RunConfig, Scene, Visualizer, STAT_STOPPED,
};

#[derive(Serialize)]
struct SnapshotRecord {
    time: f64,
    stats: FlowDiagnostics,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("Avalanche Simulator")
        .version("0.1.0")
        .about("2D depth-averaged gravity mass-flow simulator with modified Voellmy rheology")
        .arg(
            Arg::new("scene")
                .short('s')
                .long("scene")
                .value_name("SCENE_NUMBER")
                .help("Scene to simulate (0=Column Collapse, 1=Inclined Slab, 2=Valley Runout)")
                .default_value("1"),
        )
        .arg(
            Arg::new("max-steps")
                .short('n')
                .long("max-steps")
                .value_name("STEPS")
                .help("Largest admissible step counter")
                .default_value("2000"),
        )
        .arg(
            Arg::new("max-time")
                .short('t')
                .long("max-time")
                .value_name("SECONDS")
                .help("Simulated-time cap in seconds")
                .default_value("120"),
        )
        .arg(
            Arg::new("dt-max")
                .long("dt-max")
                .value_name("SECONDS")
                .help("Upper bound for a single time step")
                .default_value("0.5"),
        )
        .arg(
            Arg::new("cfl")
                .long("cfl")
                .value_name("NUMBER")
                .help("CFL number in (0, 1]")
                .default_value("0.7"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT_DIR")
                .help("Output directory for snapshots and metrics")
                .default_value("output"),
        )
        .arg(
            Arg::new("snapshot-every")
                .long("snapshot-every")
                .value_name("STEPS")
                .help("Record a snapshot every N steps (0 = never)")
                .default_value("50"),
        )
        .get_matches();

    let scene_nr: usize = matches.get_one::<String>("scene").unwrap().parse()?;
    let max_steps: u64 = matches.get_one::<String>("max-steps").unwrap().parse()?;
    let max_time: f64 = matches.get_one::<String>("max-time").unwrap().parse()?;
    let dt_max: f64 = matches.get_one::<String>("dt-max").unwrap().parse()?;
    let cfl: f64 = matches.get_one::<String>("cfl").unwrap().parse()?;
    let snapshot_every: u64 = matches.get_one::<String>("snapshot-every").unwrap().parse()?;
    let output_dir = matches.get_one::<String>("output").unwrap();

    std::fs::create_dir_all(output_dir)?;

    let scene = Scene::from_number(scene_nr)?;
    let (ny, nx) = scene.terrain.shape();

    println!("🏔️  Starting 2D avalanche simulator");
    println!("Scene: {} ({})", scene_nr, scene.name);
    println!("Grid size: {}x{}", ny, nx);
    println!(
        "Cell size: {:.2} x {:.2} m",
        scene.terrain.dx(),
        scene.terrain.dy()
    );
    println!("Output: {}", output_dir);

    let mut solver = AvalancheSolver::new(scene.terrain, scene.h0, scene.params)?;
    let initial = solver.diagnostics();
    println!("Release volume: {:.1} m^3", initial.total_volume);

    let config = RunConfig {
        max_steps: Some(max_steps),
        max_time,
        dt_max,
        cfl: Some(cfl),
        output_every: if snapshot_every > 0 {
            Some(snapshot_every)
        } else {
            None
        },
    };

    let start_time = Instant::now();
    let outcome = run(&mut solver, &config, None)?;
    let wall = start_time.elapsed();

    let height = (900 * ny as u32 / nx as u32).max(100);
    let visualizer = Visualizer::new(900, height);

    let mut records = Vec::new();
    for (nr, snapshot) in outcome.snapshots.iter().enumerate() {
        records.push(SnapshotRecord {
            time: snapshot.time,
            stats: snapshot.stats.clone(),
        });
        println!(
            "t = {:6.1} s: volume {:.1} m^3, max h {:.2} m, max speed {:.2} m/s",
            snapshot.time,
            snapshot.stats.total_volume,
            snapshot.stats.max_thickness,
            snapshot.stats.max_speed
        );
        visualizer.save_thickness_field(
            solver.terrain(),
            &snapshot.thickness,
            format!("{}/thickness_{:04}.png", output_dir, nr),
        )?;
    }

    visualizer.save_thickness_field(
        solver.terrain(),
        solver.thickness(),
        format!("{}/thickness_final.png", output_dir),
    )?;
    visualizer.save_status_field(
        solver.terrain(),
        solver.thickness(),
        solver.status(),
        format!("{}/status_final.png", output_dir),
    )?;

    let json = serde_json::to_string_pretty(&records)?;
    std::fs::write(format!("{}/metrics.json", output_dir), json)?;

    let final_stats = solver.diagnostics();
    let stopped = solver
        .status()
        .iter()
        .filter(|s| **s == STAT_STOPPED)
        .count();
    let total_cells = ny * nx;

    println!("🎉 Simulation completed!");
    println!(
        "Steps: {}, simulated time: {:.1} s, wall time: {:.2} s",
        outcome.steps,
        outcome.time,
        wall.as_secs_f64()
    );
    println!(
        "Final volume: {:.1} m^3 (released {:.1} m^3)",
        final_stats.total_volume, initial.total_volume
    );
    println!(
        "Stopped cells: {}/{} ({:.1} %)",
        stopped,
        total_cells,
        100.0 * stopped as f64 / total_cells as f64
    );
    println!("Output saved to: {}", output_dir);

    Ok(())
}
