use bevy::log::{Level, LogPlugin};
use clap::Parser;
use flowstep::cli::{self, Args};
use flowstep::prelude::*;
use flowstep::IntegrationPlugin;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();

    if args.list_methods {
        cli::handle_list_methods();
        return ExitCode::SUCCESS;
    }

    let config = match cli::load_and_apply_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut app = App::new();
    app.add_plugins((
        LogPlugin {
            level: if args.verbose { Level::DEBUG } else { Level::INFO },
            ..default()
        },
        IntegrationPlugin::new(config.clone()),
    ));
    app.finish();
    app.cleanup();

    for _ in 0..config.demo.steps {
        app.update();
    }

    let stats = *app.world().resource::<StepStats>();
    info!(
        "Ran {} steps: {} active, {} spawned, {} despawned, {} rejected, {} failed",
        stats.steps, stats.active, stats.spawned, stats.despawned, stats.rejected, stats.failed
    );

    if stats.failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
