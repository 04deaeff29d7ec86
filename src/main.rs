use bevy::log::LogPlugin;
use bevy::prelude::*;

use charlie::config::load_game_config;
use charlie::controller::AvatarController;
use charlie::plugin::AvatarPlugin;
use charlie::simulation::{run_simulation, SimulationRequest};
use charlie::tilemap::TileGrid;

/// Stops the headless app after a fixed number of avatar frames.
#[derive(Resource)]
struct FrameBudget(u64);

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let config = load_game_config();

    if let Some(path) = flag_value(&args, "--simulate") {
        let request = match read_json::<SimulationRequest>(path) {
            Ok(request) => request,
            Err(e) => {
                eprintln!("[Charlie sim] {e}");
                std::process::exit(2);
            }
        };
        let result = run_simulation(&request, &config);
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("[Charlie sim] Failed to serialise result: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let level = match flag_value(&args, "--level") {
        Some(path) => match read_json::<TileGrid>(path) {
            Ok(level) => level,
            Err(e) => {
                eprintln!("[Charlie tiles] {e}");
                std::process::exit(2);
            }
        },
        None => TileGrid::test_level(),
    };
    let frames = flag_value(&args, "--frames")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(600);

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(LogPlugin::default())
        .add_plugins(AvatarPlugin::new(config).with_level(level))
        .insert_resource(FrameBudget(frames))
        .add_systems(Last, stop_after_budget);
    info!("[Charlie avatar] Starting headless for {frames} frames");

    if app.run().is_error() {
        std::process::exit(1);
    }
}

fn stop_after_budget(
    budget: Res<FrameBudget>,
    controller: Res<AvatarController>,
    mut exit: EventWriter<AppExit>,
) {
    if controller.frame() >= budget.0 {
        let avatar = controller.avatar();
        info!(
            "[Charlie avatar] Stopped at frame {} in {} at ({:.1}, {:.1})",
            controller.frame(),
            avatar.state.kind,
            avatar.position.x,
            avatar.position.y
        );
        exit.send(AppExit::Success);
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, String> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read {path}: {e}"))?;
    serde_json::from_str(&contents).map_err(|e| format!("Failed to parse {path}: {e}"))
}
