use market_reasoning_agent::{
    session::{Turn, GOODBYE},
    ChatSession, Config,
};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;

    info!(data = %config.data_path.display(), "Stock reasoning chatbot starting");

    let session = match ChatSession::from_config(&config).await {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Cannot start chat session");
            eprintln!("Failed to load market data: {}", e);
            return Err(Box::new(e) as Box<dyn std::error::Error>);
        }
    };

    println!("📊 Stock Reasoning Chatbot (type 'exit' to quit)");

    let mut stdout = io::stdout();
    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        stdout.write_all(b"\nYou: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match session.turn(&line).await {
            Ok(Turn::Exit) => {
                println!("Bot: {}", GOODBYE);
                break;
            }
            Ok(Turn::Reply(answer)) => println!("Bot: {}", answer),
            Err(e) => {
                error!(error = %e, "Question could not be answered");
                println!("Bot: ⚠️ {}", e);
            }
        }
    }

    Ok(())
}
