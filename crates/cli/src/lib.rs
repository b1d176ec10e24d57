pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "showroom",
    about = "Showroom operator CLI",
    long_about = "Operate the Showroom catalog: terminal chat agent, migrations, and demo seeding.",
    after_help = "Examples:\n  showroom migrate\n  showroom seed\n  showroom chat --provider auto"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Chat with the car-search assistant in the terminal")]
    Chat {
        #[arg(long, default_value = "deterministic", help = "Generation provider: deterministic, ollama, or auto")]
        provider: String,
        #[arg(long, help = "Ollama server URL (ollama/auto providers)")]
        ollama_url: Option<String>,
        #[arg(long, help = "Model name (ollama/auto providers)")]
        model: Option<String>,
    },
    #[command(about = "Apply pending database migrations")]
    Migrate,
    #[command(about = "Load the deterministic demo catalog (runs migrations first)")]
    Seed,
    #[command(about = "Validate config, database connectivity, and generator readiness")]
    Doctor,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Chat { provider, ollama_url, model } => {
            commands::chat::run(&provider, ollama_url, model).await
        }
        Command::Migrate => commands::migrate::run().await,
        Command::Seed => commands::seed::run().await,
        Command::Doctor => commands::doctor::run().await,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::Cli;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn chat_flags_parse() {
        use clap::Parser;

        let cli = Cli::try_parse_from([
            "showroom",
            "chat",
            "--provider",
            "auto",
            "--ollama-url",
            "http://localhost:11434",
            "--model",
            "llama3.1:8b",
        ])
        .expect("chat flags should parse");

        match cli.command {
            super::Command::Chat { provider, ollama_url, model } => {
                assert_eq!(provider, "auto");
                assert_eq!(ollama_url.as_deref(), Some("http://localhost:11434"));
                assert_eq!(model.as_deref(), Some("llama3.1:8b"));
            }
            other => panic!("expected chat, parsed {other:?}"),
        }
    }
}
