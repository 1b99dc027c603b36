mod app;
mod cli;
mod glsl;

use clap::Parser;
use glium::winit::event_loop::EventLoop;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app::Sandbox;
use crate::cli::{Cli, DEFAULT_LOG_FILTER};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cli.into_config();
    tracing::info!(
        kernel = ?config.fragment_kernel,
        width = config.width,
        height = config.height,
        "starting shaderunner"
    );

    let event_loop = EventLoop::new()?;
    let mut sandbox = Sandbox::new(&event_loop, config)?;
    event_loop.run_app(&mut sandbox)?;
    sandbox.finish()
}
