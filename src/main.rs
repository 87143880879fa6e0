use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = taskmark::cli::Cli::parse();

    match cli.command.clone() {
        taskmark::cli::CliCommand::Mcp(args) => {
            let config = taskmark::mcp::ServerConfig {
                data_dir: cli.data_dir.clone(),
                log_filter: args.log_filter.clone(),
            };
            taskmark::mcp::run_server_blocking(config)?;
        }
        command => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            taskmark::commands::execute(&cli, command, &mut handle)?;
        }
    }

    Ok(())
}
