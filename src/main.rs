#![cfg_attr(not(target_os = "macos"), allow(dead_code))]

mod config;
mod error;
mod shaders;
mod utils;

#[cfg(target_os = "macos")]
mod app;
#[cfg(target_os = "macos")]
mod compute;
#[cfg(target_os = "macos")]
mod program;
#[cfg(target_os = "macos")]
mod texture;

use std::process::ExitCode;

use env_logger::Env;
use log::error;

use crate::config::Config;
use crate::error::{Error, Result};

fn run() -> Result<()> {
    let config = Config::from_args(std::env::args().skip(1))?;

    #[cfg(target_os = "macos")]
    return app::run(config);

    #[cfg(not(target_os = "macos"))]
    {
        let _ = config;
        Err(Error::Unsupported)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Help(usage)) => {
            println!("{usage}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
