use std::env;
use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use vax_sched::cli::{App, Flow, GREETING};
use vax_sched::store::Store;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    // Optional state file; without one the session is in-memory only.
    let store = match env::args().nth(1) {
        Some(path) => Store::at(path),
        None => Store::ephemeral(),
    };

    let mut app = match App::load(store) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("failed to load state: {e}");
            std::process::exit(1);
        }
    };

    println!("\n{GREETING}\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(_) => {
                println!("Please try again!");
                continue;
            }
        };

        match app.handle_line(&line) {
            Flow::Reply(reply) => {
                if !reply.is_empty() {
                    println!("{reply}");
                }
            }
            Flow::Quit(reply) => {
                println!("{reply}");
                break;
            }
        }
    }
}
