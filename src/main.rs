use std::env;
use std::process;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

use ringlet::{Config, RingNode};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: ringlet <config.json>");
        process::exit(1);
    };

    let config = match Config::load(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    let nickname = config.nickname.clone();

    let mut node = match RingNode::new(config).await {
        Ok(node) => node,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    let handle = node.handle();

    if let Some(mut deliveries) = node.deliveries() {
        tokio::spawn(async move {
            while let Some(delivery) = deliveries.recv().await {
                println!("<- {}: {}", delivery.origin, delivery.message);
            }
        });
    }

    let node_task = tokio::spawn(node.run());

    println!("[{}] commands: start | send <destination> <message> | quit", nickname);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            // EOF or a broken stdin both end the session.
            Ok(None) | Err(_) => break,
        };
        let command = line.trim();

        if command == "quit" {
            break;
        } else if command == "start" {
            if let Err(e) = handle.start().await {
                eprintln!("{}", e);
            }
        } else if let Some(rest) = command.strip_prefix("send ") {
            match rest.split_once(' ') {
                Some((destination, message)) if !message.trim().is_empty() => {
                    match handle.send(destination, message) {
                        Ok(()) => println!("queued for {}", destination),
                        Err(e) => eprintln!("{}", e),
                    }
                }
                _ => println!("usage: send <destination> <message>"),
            }
        } else if !command.is_empty() {
            println!("unknown command: {}", command);
        }
    }

    handle.shutdown();
    match node_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("node stopped with error: {}", e),
        Err(e) => error!("node task failed: {}", e),
    }
}
