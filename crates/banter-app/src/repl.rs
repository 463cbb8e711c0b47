//! Interactive chat loop.

use std::io::Write as _;
use std::path::Path;

use tokio::io::AsyncBufReadExt;
use tracing::debug;

use banter_ai::content::{is_supported, Attachment};
use banter_ai::session::SessionStore;
use banter_ai::{ChatClient, ModelSettings, Reply, Role};
use banter_common::BanterError;

const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

const HELP: &str = "\
commands:
  /new            start a new chat
  /list           list chats, newest first
  /switch <n>     switch to the n-th listed chat
  /attach <path>  queue a file (.pdf .jpeg .png .webp) for the next message
  /help           show this help
  /quit           exit";

pub async fn run(
    store: &mut SessionStore,
    client: &dyn ChatClient,
    settings: &ModelSettings,
    stream: bool,
) -> Result<(), BanterError> {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut pending: Vec<Attachment> = Vec::new();

    println!("{HELP}\n");
    list_sessions(store);

    loop {
        print_prompt(store, &pending)?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "/quit" | "/exit" => break,
            "/help" => println!("{HELP}"),
            "/new" => {
                store.create_session();
                if let Err(e) = store.persist().await {
                    eprintln!("warning: could not persist new chat: {e}");
                }
                println!("started {}", active_name(store));
            }
            "/list" => list_sessions(store),
            _ if line.starts_with("/switch") => switch(store, line),
            _ if line.starts_with("/attach") => attach(&mut pending, line),
            _ if line.starts_with('/') => eprintln!("unknown command, try /help"),
            prompt => {
                send(store, client, settings, stream, prompt, &pending).await;
                pending.clear();
            }
        }
    }

    Ok(())
}

fn print_prompt(store: &SessionStore, pending: &[Attachment]) -> Result<(), BanterError> {
    let name = active_name(store);
    if pending.is_empty() {
        print!("{name}> ");
    } else {
        print!("{name} [+{} file(s)]> ", pending.len());
    }
    std::io::stdout().flush()?;
    Ok(())
}

fn active_name(store: &SessionStore) -> String {
    store
        .active()
        .map(|session| session.name().to_string())
        .unwrap_or_else(|| "banter".to_string())
}

fn list_sessions(store: &SessionStore) {
    let active = store.active_id();
    for (index, session) in store.sessions().iter().enumerate() {
        let marker = if Some(session.id()) == active { "*" } else { " " };
        println!(
            "{marker} {:>2}. {} ({} turns)",
            index + 1,
            session.name(),
            session.turns().len()
        );
    }
}

fn switch(store: &mut SessionStore, line: &str) {
    let Some(index) = line
        .strip_prefix("/switch")
        .and_then(|rest| rest.trim().parse::<usize>().ok())
        .filter(|n| *n >= 1)
    else {
        eprintln!("usage: /switch <n>");
        return;
    };

    let Some(id) = store.sessions().get(index - 1).map(|s| s.id()) else {
        eprintln!("no chat numbered {index}, see /list");
        return;
    };

    match store.switch_session(id) {
        Ok(turns) => {
            println!("-- {} --", active_name(store));
            for turn in &turns {
                let label = match turn.role {
                    Role::User => "you",
                    Role::Assistant => "claude",
                };
                let attachments = turn.content.attachment_count();
                if attachments > 0 {
                    println!("{label}: [{attachments} attachment(s)] {}", turn.content.text());
                } else {
                    println!("{label}: {}", turn.content.text());
                }
            }
        }
        Err(e) => eprintln!("error: {e}"),
    }
}

fn attach(pending: &mut Vec<Attachment>, line: &str) {
    let path_arg = line.strip_prefix("/attach").map(str::trim).unwrap_or("");
    if path_arg.is_empty() {
        eprintln!("usage: /attach <path>");
        return;
    }

    let path = Path::new(path_arg);
    let Some(filename) = path.file_name().map(|f| f.to_string_lossy().to_string()) else {
        eprintln!("not a file path: {path_arg}");
        return;
    };

    // A bad extension only rejects this file, not the rest of the turn.
    if !is_supported(&filename) {
        eprintln!("unsupported attachment type: {filename} (accepted: .pdf .jpeg .png .webp)");
        return;
    }

    match std::fs::read(path) {
        Ok(bytes) => {
            debug!(file = %filename, size = bytes.len(), "queued attachment");
            println!("queued {filename}");
            pending.push(Attachment::new(filename, bytes));
        }
        Err(e) => eprintln!("could not read {path_arg}: {e}"),
    }
}

async fn send(
    store: &mut SessionStore,
    client: &dyn ChatClient,
    settings: &ModelSettings,
    stream: bool,
    prompt: &str,
    files: &[Attachment],
) {
    let result = if stream {
        store
            .run_turn_streaming(client, settings, prompt, files, |fragment| {
                print!("{fragment}");
                let _ = std::io::stdout().flush();
            })
            .await
            .map(|reply| {
                println!();
                reply
            })
    } else {
        store
            .run_turn(client, settings, prompt, files)
            .await
            .map(|reply| {
                print_batch_reply(&reply);
                reply
            })
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
    }
}

fn print_batch_reply(reply: &Reply) {
    if let Some(thinking) = &reply.thinking {
        println!("{DIM}{thinking}{RESET}\n");
    }
    println!("{}", reply.text);
}
