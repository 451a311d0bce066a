//! Interactive ranking of tables caught in a dependency cycle.

use std::collections::BTreeSet;
use std::io::{self, BufRead, IsTerminal, Write};

use dataforge_core::error::{DataForgeError, Result};
use dataforge_core::graph::cycle::OrderingSource;

/// Asks on stdin which cycle member to fill first, second, and so on.
#[derive(Debug, Default)]
pub struct PromptOrder;

impl PromptOrder {
    pub fn new() -> Self {
        Self
    }
}

impl OrderingSource for PromptOrder {
    fn resolve_order(&mut self, candidates: &BTreeSet<String>) -> Result<Vec<String>> {
        let names: Vec<&String> = candidates.iter().collect();
        if !io::stdin().is_terminal() {
            return Err(DataForgeError::Configuration {
                message: format!(
                    "the dependency graph has a cycle through [{}] and stdin is not a terminal; \
                     pass --cycle-order or set [graph] cycle_order in dataforge.toml",
                    join(&names)
                ),
            });
        }

        eprintln!("\nThese tables reference each other in a cycle:");
        for (i, name) in names.iter().enumerate() {
            eprintln!("  {}. {}", i + 1, name);
        }
        eprintln!("Tables filled earlier get NULL for references to tables filled later.");

        let stdin = io::stdin();
        loop {
            eprint!("Fill order (numbers or names, comma-separated): ");
            let _ = io::stderr().flush();

            let mut line = String::new();
            let read = stdin.lock().read_line(&mut line).map_err(|e| DataForgeError::Output {
                message: "reading the cycle order from stdin".to_string(),
                source: e,
            })?;
            if read == 0 {
                return Err(DataForgeError::Configuration {
                    message: "no cycle order given".to_string(),
                });
            }

            match parse_ranking(&line, &names) {
                Ok(order) => return Ok(order),
                Err(msg) => eprintln!("  {}", msg),
            }
        }
    }
}

/// Turn "2, users, 3" into table names; every candidate exactly once.
fn parse_ranking(line: &str, names: &[&String]) -> std::result::Result<Vec<String>, String> {
    let mut order: Vec<String> = Vec::with_capacity(names.len());
    for token in line.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let name = match token.parse::<usize>() {
            Ok(n) if (1..=names.len()).contains(&n) => names[n - 1].to_string(),
            Ok(n) => return Err(format!("{} is not between 1 and {}", n, names.len())),
            Err(_) => match names.iter().find(|c| c.as_str() == token) {
                Some(c) => c.to_string(),
                None => return Err(format!("'{}' is not one of the listed tables", token)),
            },
        };
        if order.contains(&name) {
            return Err(format!("'{}' is listed twice", name));
        }
        order.push(name);
    }

    if order.len() != names.len() {
        return Err(format!("rank all {} tables", names.len()));
    }
    Ok(order)
}

fn join(names: &[&String]) -> String {
    names
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
