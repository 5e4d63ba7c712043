use clap::Parser;
use foldervault::cli::commands::lock::LockOptions;
use foldervault::cli::{commands, output, Cli, Commands};

fn main() {
    let cli = Cli::parse();
    foldervault::logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Lock {
            ref path,
            ref cover,
            max_attempts,
            wait,
            conceal,
            hidden,
        } => {
            let opts = LockOptions {
                cover: cover.clone(),
                max_attempts,
                wait,
                conceal,
                hidden,
            };
            commands::lock::execute(&cli, path, &opts)
        }
        Commands::Unlock { ref path } => commands::unlock::execute(&cli, path),
        Commands::Passwd { ref path } => commands::passwd::execute(&cli, path),
        Commands::Peek { ref path, ref to } => commands::peek::execute(&cli, path, to),
        Commands::List => commands::list::execute(&cli),
        Commands::Status { ref path } => commands::status::execute(&cli, path),
        Commands::Audit { last, ref since } => {
            commands::audit_cmd::execute(&cli, last, since.as_deref())
        }
        Commands::Completions { ref shell } => commands::completions::execute(shell),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
