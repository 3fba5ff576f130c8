use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;

use commands::{config, deploy};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "bpdeploy")]
#[command(version = VERSION)]
#[command(about = "Fetch a blueprint repository and deploy its manifest with wskdeploy")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Clone a blueprint (if needed), write .wskprops and run wskdeploy
    Deploy(deploy::DeployArgs),
    /// Manage global bpdeploy configuration
    Config(config::ConfigArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs {};

    let (envelope, exit_code) = commands::run_json(cli.command, &global);

    if let Err(err) = output::print_envelope(&envelope) {
        eprintln!("{}", err);
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
