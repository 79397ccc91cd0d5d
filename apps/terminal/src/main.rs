use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{load_settings, InputField, MemorySurface, WalletApp};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod commands;
mod render;

use commands::Command;

#[derive(Parser, Debug)]
#[command(about = "Terminal client for the wallet transfer service")]
struct Args {
    /// Base url of the transfer api, e.g. http://localhost:5050/api
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    session_file: Option<PathBuf>,
    /// Keep the session in memory only.
    #[arg(long)]
    ephemeral: bool,
    #[arg(long)]
    dismiss_ms: Option<u64>,
}

fn default_session_file() -> Option<PathBuf> {
    dirs::data_local_dir().map(|base| base.join("wallet_client").join("session.json"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(api_url) = args.api_url {
        settings.api_url = api_url;
    }
    if let Some(dismiss_ms) = args.dismiss_ms {
        settings.banner_dismiss_ms = dismiss_ms;
    }
    if args.ephemeral {
        settings.session_file = None;
    } else if let Some(path) = args.session_file {
        settings.session_file = Some(path);
    } else if settings.session_file.is_none() {
        settings.session_file = default_session_file();
    }
    tracing::info!(
        "terminal: api_url={} session_file={:?}",
        settings.api_url,
        settings.session_file
    );

    let app = WalletApp::from_settings(&settings, MemorySurface::new())
        .context("failed to start wallet client")?;

    println!("{}", commands::HELP);
    print_view(&app).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = match commands::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        dispatch(&app, command).await;
        print_view(&app).await;
    }

    Ok(())
}

async fn dispatch(app: &Arc<WalletApp<MemorySurface>>, command: Command) {
    let navigation = match command {
        Command::Login { email, password } => {
            app.with_surface(|surface| {
                surface.fill(InputField::LoginEmail, email);
                surface.fill(InputField::LoginPassword, password);
            })
            .await;
            app.login().await;
            Ok(())
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            app.with_surface(|surface| {
                surface.fill(InputField::RegisterName, name);
                surface.fill(InputField::RegisterEmail, email);
                surface.fill(InputField::RegisterPassword, password);
            })
            .await;
            app.register().await;
            Ok(())
        }
        Command::Send { recipient, amount } => {
            app.with_surface(|surface| {
                surface.fill(InputField::RecipientId, recipient);
                surface.fill(InputField::SendAmount, amount);
            })
            .await;
            app.send_money().await;
            Ok(())
        }
        Command::Balance => {
            app.check_balance().await;
            Ok(())
        }
        Command::Logout => {
            app.logout().await;
            Ok(())
        }
        Command::ShowLogin => app.show_login().await,
        Command::ShowRegister => app.show_register().await,
        Command::OpenTransfer => app.show_send_money().await,
        Command::CancelTransfer => app.hide_send_money().await,
        Command::Help => {
            println!("{}", commands::HELP);
            Ok(())
        }
        Command::Show | Command::Quit => Ok(()),
    };
    if let Err(err) = navigation {
        println!("not available here: {err}");
    }
}

async fn print_view(app: &WalletApp<MemorySurface>) {
    let rendered = app
        .with_surface(|surface| {
            let rendered = render::render(surface);
            surface.take_alerts();
            rendered
        })
        .await;
    print!("{rendered}");
}
