//! Interactive session: one command per stdin line, every event printed to
//! stdout as a JSON line.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use guardian_core::devices::{
    LocationSource, LocationUpdate, LoggingCamera, RecognizerEvent, ScriptedLocation,
    SpeechOutput, SpeechRecognizer, Subscription,
};
use guardian_core::runtime::{Command, Devices, Runtime};
use guardian_core::{Config, DeviceError, GuardianApp, NewContact, Oracles};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};

const HELP: &str = "\
commands:
  trigger | sos                      start the SOS countdown
  cancel                             stand down and return to SAFE
  silent | community | voice         toggle a setting
  say <phrase>                       speak to the voice listener
  ask <text>                         talk to the assistant
  contact add <name> <phone> <relation...>
  contact rm <id>
  contacts | log | status            show current state
  havens | havens clear              search for or clear safe havens
  decoy | hangup                     start or end a decoy call
  quit";

#[derive(Args)]
pub struct RunArgs {
    /// Ignore any configured API key and use the offline fallbacks
    #[arg(long)]
    pub offline: bool,
}

/// Which part of the dashboard to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Status,
    Contacts,
    Log,
}

#[derive(Debug)]
enum Line {
    Empty,
    Help,
    Quit,
    Show(View),
    Send(Command),
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let oracles = if args.offline {
        Oracles::offline()
    } else {
        super::oracles(&config)
    };
    super::async_runtime()?.block_on(session(config, oracles))
}

async fn session(config: Config, oracles: Oracles) -> Result<(), Box<dyn std::error::Error>> {
    let location: Arc<dyn LocationSource> = match config.location.sample() {
        Some(sample) => Arc::new(ScriptedLocation::new(vec![(
            Duration::ZERO,
            LocationUpdate::Fix(sample),
        )])),
        None => Arc::new(ScriptedLocation::unavailable("position unavailable")),
    };
    let devices = Devices {
        speech: Arc::new(StderrSpeech),
        camera: Arc::new(LoggingCamera::default()),
        recognizer: Some(Arc::new(KeyboardMic)),
        location: Some(location),
    };

    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (ev_tx, mut ev_rx) = mpsc::unbounded_channel();
    let runtime = Runtime::new(GuardianApp::from_config(&config), devices, oracles);
    let driver = tokio::spawn(runtime.run(cmd_rx, ev_tx));
    let printer = tokio::spawn(async move {
        while let Some(event) = ev_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "could not encode event"),
            }
        }
    });

    if config.voice.enabled {
        cmd_tx.send(Command::ToggleVoice).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Ok(Line::Empty) => {}
            Ok(Line::Help) => eprintln!("{HELP}"),
            Ok(Line::Quit) => break,
            Ok(Line::Show(view)) => {
                let (tx, rx) = oneshot::channel();
                cmd_tx.send(Command::Dashboard(tx)).await?;
                let dashboard = rx.await?;
                let json = match view {
                    View::Status => serde_json::to_string(&dashboard)?,
                    View::Contacts => serde_json::to_string(&dashboard.contacts)?,
                    View::Log => serde_json::to_string(&dashboard.log)?,
                };
                println!("{json}");
            }
            Ok(Line::Send(cmd)) => cmd_tx.send(cmd).await?,
            Err(usage) => eprintln!("{usage}"),
        }
    }

    drop(cmd_tx);
    driver.await?;
    printer.await?;
    Ok(())
}

fn parse_line(line: &str) -> Result<Line, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let cmd = match word.to_lowercase().as_str() {
        "" => return Ok(Line::Empty),
        "help" | "?" => return Ok(Line::Help),
        "quit" | "exit" => return Ok(Line::Quit),
        "status" => return Ok(Line::Show(View::Status)),
        "contacts" => return Ok(Line::Show(View::Contacts)),
        "log" => return Ok(Line::Show(View::Log)),
        "say" if rest.is_empty() => return Err("usage: say <phrase>".into()),
        "say" => Command::Heard(rest.to_string()),
        "trigger" | "sos" => Command::Trigger,
        "cancel" => Command::Cancel,
        "silent" => Command::ToggleSilent,
        "community" => Command::ToggleCommunity,
        "voice" => Command::ToggleVoice,
        "ask" => Command::Ask(rest.to_string()),
        "havens" if rest == "clear" => Command::ClearHavens,
        "havens" => Command::SearchHavens,
        "decoy" => Command::StartDecoy,
        "hangup" => Command::EndDecoy,
        "snapshot" => Command::Snapshot,
        "contact" => parse_contact(rest)?,
        other => return Err(format!("unknown command: {other} (try 'help')")),
    };
    Ok(Line::Send(cmd))
}

fn parse_contact(args: &str) -> Result<Command, String> {
    let mut parts = args.split_whitespace();
    match parts.next() {
        Some("add") => {
            let name = parts.next();
            let phone = parts.next();
            let relation = parts.collect::<Vec<_>>().join(" ");
            match (name, phone) {
                (Some(name), Some(phone)) if !relation.is_empty() => {
                    Ok(Command::AddContact(NewContact::new(name, phone, relation)))
                }
                _ => Err("usage: contact add <name> <phone> <relation...>".into()),
            }
        }
        Some("rm") => match parts.next() {
            Some(id) => Ok(Command::RemoveContact(id.to_string())),
            None => Err("usage: contact rm <id>".into()),
        },
        _ => Err("usage: contact add|rm ...".into()),
    }
}

/// Speech goes to stderr so stdout stays JSON.
struct StderrSpeech;

impl SpeechOutput for StderrSpeech {
    fn speak(&self, text: &str) -> Result<(), DeviceError> {
        eprintln!("[speech] {text}");
        Ok(())
    }
}

/// The keyboard stands in for the microphone: `say` lines reach the runtime
/// as `Command::Heard`, so a listening session only has to stay open.
struct KeyboardMic;

impl SpeechRecognizer for KeyboardMic {
    fn listen(&self) -> Subscription<RecognizerEvent> {
        Subscription::spawn(|tx| async move { tx.closed().await })
    }
}
