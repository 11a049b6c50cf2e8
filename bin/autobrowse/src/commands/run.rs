use autobrowse_agent::build_orchestrator;
use autobrowse_core::{Config, Error, Paths};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::info;

pub async fn execute(task: Option<String>) -> anyhow::Result<()> {
    let paths = Paths::new();
    paths.ensure_dirs()?;
    let config = Config::load_or_default(&paths)?;

    let mut orchestrator = build_orchestrator(&config, &paths)?;

    // Ctrl+C aborts the task in flight between planner turns.
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    orchestrator.set_shutdown(shutdown_rx);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    if let Some(task) = task {
        let executed = orchestrator.run_task(&task).await?;
        println!("{}", executed);
        return Ok(());
    }

    // Interactive mode: one task per line, print the code that ran, repeat.
    println!("autobrowse interactive mode (Ctrl+C to exit)");
    println!("Console: {}", config.console.uri);
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("Enter a browsing task: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let task = line.trim();
        if task.is_empty() {
            continue;
        }

        match orchestrator.run_task(task).await {
            Ok(executed) => {
                println!("Final code executed:");
                println!("{}", executed);
                println!("=====================================");
            }
            Err(Error::Aborted(_)) => {
                info!("Task aborted");
                break;
            }
            Err(e) => {
                eprintln!("Task failed: {}", e);
            }
        }
    }

    Ok(())
}
