//! Line commands typed at the prompt, mapped onto surface inputs and flows.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { email: String, password: String },
    Register { name: String, email: String, password: String },
    ShowLogin,
    ShowRegister,
    Balance,
    OpenTransfer,
    CancelTransfer,
    Send { recipient: String, amount: String },
    Logout,
    Show,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  login <email> <password>
  register <name> <email> <password>
  tab login | tab register
  balance
  transfer                open the send-money form
  send <recipient> <amount>
  cancel                  close the send-money form
  logout
  show | help | quit";

pub fn parse(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(Command::Show);
    };
    let args: Vec<&str> = parts.collect();
    let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("login", [email, password]) => Command::Login {
            email: (*email).to_string(),
            password: (*password).to_string(),
        },
        // Names may contain spaces; email and password are the last two words.
        ("register", [name @ .., email, password]) if !name.is_empty() => Command::Register {
            name: name.join(" "),
            email: (*email).to_string(),
            password: (*password).to_string(),
        },
        ("tab", ["login"]) => Command::ShowLogin,
        ("tab", ["register"]) => Command::ShowRegister,
        ("balance", []) => Command::Balance,
        ("transfer", []) => Command::OpenTransfer,
        ("cancel", []) => Command::CancelTransfer,
        // Raw text is handed over untouched; the gateway does the coercion.
        ("send", [recipient, amount]) => Command::Send {
            recipient: (*recipient).to_string(),
            amount: (*amount).to_string(),
        },
        ("send", [recipient]) => Command::Send {
            recipient: (*recipient).to_string(),
            amount: String::new(),
        },
        ("logout", []) => Command::Logout,
        ("show", []) => Command::Show,
        ("help", []) | ("?", []) => Command::Help,
        ("quit", []) | ("exit", []) => Command::Quit,
        _ => return Err(format!("unrecognized command '{}'; try 'help'", line.trim())),
    };
    Ok(command)
}
