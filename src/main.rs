//! Standalone board viewer: loads an optional TOML configuration and
//! opens a window running the simulation.

use galton::{BoardConfig, Viewer};

fn main() {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => match BoardConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("failed to load config {path}: {e}");
                std::process::exit(1);
            }
        },
        None => BoardConfig::default(),
    };

    if let Err(e) = Viewer::builder().with_config(config).build().run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}
