use clap::Parser;

use live_posterizer::cli::{self, Args, Command};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let result = match &args.command {
        Some(Command::ListCameras) => {
            cli::list_cameras();
            Ok(())
        }
        Some(Command::Config { action }) => {
            cli::handle_config_action(action.clone(), args.config.as_deref())
        }
        Some(Command::Render { input, output }) => cli::run_render(&args, input, output),
        None => cli::run_live(&args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
