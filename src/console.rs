//! Terminal front end for the client driver
//!
//! Reads typed lines on a dedicated OS thread (a blocking stdin read cannot
//! be cancelled, so it must not live on the runtime) and prints whatever
//! the driver reports.

use std::io::{self, BufRead, Write};
use std::thread;

use tokio::sync::mpsc;
use tracing::debug;

use crate::client::{ClientDriver, ClientEvent};
use crate::config::ClientConfig;
use crate::error::ChatError;

/// Lines buffered between the stdin thread and the send loop
const INPUT_BUFFER_SIZE: usize = 16;

/// Ask for a username on stdin. Blocks the calling thread.
pub fn prompt_username() -> io::Result<String> {
    print!("Enter your username: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Connect, then pump stdin into the driver and driver events to stdout
pub async fn run_client(config: ClientConfig) -> Result<(), ChatError> {
    let driver = ClientDriver::connect(&config).await?;
    println!("* Connected to {}", config.addr);

    let (input_tx, input_rx) = mpsc::channel(INPUT_BUFFER_SIZE);
    let (events_tx, mut events_rx) = mpsc::channel(INPUT_BUFFER_SIZE);

    spawn_stdin_reader(input_tx);

    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            render(&event);
        }
    });

    let result = driver.run(input_rx, events_tx).await;
    let _ = printer.await;
    result
}

fn spawn_stdin_reader(input: mpsc::Sender<String>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if input.blocking_send(line).is_err() {
                break;
            }
        }
        debug!("Stdin reader finished");
    });
}

fn render(event: &ClientEvent) {
    match event {
        ClientEvent::Line(line) => println!("{}", line),
        ClientEvent::Status(status) => println!("* {}", status),
        ClientEvent::Disconnected => println!("* Disconnected from server"),
    }
}
