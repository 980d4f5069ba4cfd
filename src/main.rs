mod wpt_controllers;
mod wpt_html;
mod wpt_models;
mod wpt_resolver;
mod wpt_views;

use anyhow::Context;
use clap::Parser;
use wpt_controllers::{Cli, WPTControllers};

fn main() -> anyhow::Result<()> {
    // Set up panic hook for better error messages
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("\n{}", "═".repeat(70));
        eprintln!("❌ APPLICATION PANIC");
        eprintln!("{}", "═".repeat(70));
        eprintln!("\n{}", panic_info);
        eprintln!("\n💡 Report this issue if it persists");
        eprintln!("\n{}", "═".repeat(70));
    }));

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();

    WPTControllers::run(&cli).context("waypoint tracker failed")
}
