//! Line-oriented console commands.

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// `<category> [intensity]`; the category is validated at ingress
    Stimulus {
        category: String,
        intensity: Option<f32>,
    },
    Status,
    Help,
    Quit,
    Empty,
}

pub const HELP: &str = "\
Commands:
  <category> [intensity]   queue a stimulus (shock, decay, recovery, ambient_noise, idle)
  status                   print the latest condition snapshot as JSON
  help                     show this message
  quit                     stop the organism and exit";

pub fn parse_line(line: &str) -> Result<ConsoleCommand, String> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(ConsoleCommand::Empty);
    };

    let command = match head.to_ascii_lowercase().as_str() {
        "status" => ConsoleCommand::Status,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        _ => {
            let intensity = match parts.next() {
                Some(raw) => Some(
                    raw.parse::<f32>()
                        .map_err(|_| format!("invalid intensity: {raw}"))?,
                ),
                None => None,
            };
            ConsoleCommand::Stimulus {
                category: head.to_string(),
                intensity,
            }
        }
    };

    if let Some(extra) = parts.next() {
        return Err(format!("unexpected argument: {extra}"));
    }
    Ok(command)
}
