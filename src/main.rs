use clap::Parser;
use beadtree::cli::commands::Cli;
use beadtree::cli::handlers;

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        // No subcommand → launch TUI
        None => handlers::resolve_start(cli.project_dir.as_deref())
            .and_then(|start| beadtree::tui::run(&start)),
        Some(_) => handlers::dispatch(cli),
    };
    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
