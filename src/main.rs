//! CANOPY - Interactive Shell
//! A small REPL over a canopy store. Keys are typed as `:`-separated paths.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use canopy::store::path::SEPARATOR;
use canopy::{Config, Store};

fn segments(path: &str) -> Vec<&str> {
    path.split(SEPARATOR).collect()
}

fn print_value(value: &[u8]) {
    match std::str::from_utf8(value) {
        Ok(s) => println!("  \"{}\"", s),
        Err(_) => println!("  <binary data, {} bytes>", value.len()),
    }
}

fn main() {
    env_logger::init();

    let data_dir = std::env::args().nth(1).unwrap_or_else(|| "./data".to_string());

    println!();
    println!("  canopy - hierarchical TTL key-value store");
    println!();
    println!("  Commands:");
    println!("    set <path> <value>         - Store a value");
    println!("    setex <path> <ms> <value>  - Store a value that expires");
    println!("    get <path>                 - Retrieve a value");
    println!("    has <path>                 - Check whether a path exists");
    println!("    del <path>                 - Delete a path");
    println!("    tree [prefix]              - List entries under a prefix");
    println!("    deltree [prefix]           - Delete entries under a prefix");
    println!("    sweep                      - Remove expired entries now");
    println!("    info                       - Show store metrics");
    println!("    exit                       - Close the store");
    println!();

    let store = match Store::open(Config::new(&data_dir)) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("[ERROR] Failed to open store at {}: {}", data_dir, err);
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("canopy> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break, // EOF
            Ok(_) => {}
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        match parts[0].to_lowercase().as_str() {
            "set" | "put" => {
                if parts.len() < 3 {
                    println!("  Usage: set <path> <value>");
                    continue;
                }
                let value = parts[2..].join(" ");
                match store.set(&segments(parts[1]), value.as_bytes()) {
                    Ok(()) => println!("  OK"),
                    Err(e) => println!("  ERROR: {}", e),
                }
            }
            "setex" => {
                let ttl = parts.get(2).and_then(|ms| ms.parse::<u64>().ok());
                let (Some(ttl), true) = (ttl, parts.len() >= 4) else {
                    println!("  Usage: setex <path> <ms> <value>");
                    continue;
                };
                let value = parts[3..].join(" ");
                let ttl = Duration::from_millis(ttl);
                match store.set_with_ttl(&segments(parts[1]), value.as_bytes(), ttl) {
                    Ok(()) => println!("  OK (expires in {:?})", ttl),
                    Err(e) => println!("  ERROR: {}", e),
                }
            }
            "get" => {
                if parts.len() < 2 {
                    println!("  Usage: get <path>");
                    continue;
                }
                match store.get(&segments(parts[1])) {
                    Ok(value) => print_value(&value),
                    Err(e) if e.is_not_found() => println!("  (nil)"),
                    Err(e) => println!("  ERROR: {}", e),
                }
            }
            "has" => {
                if parts.len() < 2 {
                    println!("  Usage: has <path>");
                    continue;
                }
                match store.has(&segments(parts[1])) {
                    Ok(exists) => println!("  {}", exists),
                    Err(e) => println!("  ERROR: {}", e),
                }
            }
            "del" | "delete" => {
                if parts.len() < 2 {
                    println!("  Usage: del <path>");
                    continue;
                }
                match store.delete(&segments(parts[1])) {
                    Ok(()) => println!("  OK (deleted)"),
                    Err(e) => println!("  ERROR: {}", e),
                }
            }
            "tree" | "scan" => {
                let prefix = parts.get(1).map(|p| segments(p)).unwrap_or_default();
                match store.get_tree_entries(&prefix) {
                    Ok(entries) if entries.is_empty() => println!("  (empty)"),
                    Ok(entries) => {
                        for entry in &entries {
                            println!(
                                "  {} -> {}",
                                entry.key_str(),
                                String::from_utf8_lossy(&entry.value)
                            );
                        }
                        println!("  ({} entries)", entries.len());
                    }
                    Err(e) => println!("  ERROR: {}", e),
                }
            }
            "deltree" => {
                let prefix = parts.get(1).map(|p| segments(p)).unwrap_or_default();
                match store.delete_tree(&prefix) {
                    Ok(removed) => println!("  OK ({} deleted)", removed),
                    Err(e) => println!("  ERROR: {}", e),
                }
            }
            "sweep" => match store.sweep() {
                Ok(removed) => println!("  OK ({} expired entries removed)", removed),
                Err(e) => println!("  ERROR: {}", e),
            },
            "info" | "stats" => {
                println!("{}", store.metrics().report());
            }
            "exit" | "quit" | "q" => {
                println!("  Shutting down canopy...");
                break;
            }
            _ => {
                println!("  Unknown command: '{}'. Type 'exit' to quit.", parts[0]);
            }
        }
    }

    if let Err(err) = store.close() {
        eprintln!("[ERROR] Failed to close store: {}", err);
        std::process::exit(1);
    }
}
