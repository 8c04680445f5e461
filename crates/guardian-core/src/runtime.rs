//! Async driver around [`GuardianApp`].
//!
//! One task owns the app. Commands, device streams, oracle completions and
//! the one-second timers are multiplexed with `tokio::select!`; every input
//! becomes a controller call, and the returned effects are executed against
//! the devices here. Oracle round-trips run on spawned tasks and report back
//! through a channel, so the loop never waits on the network.

use std::collections::VecDeque;
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::app::{Dashboard, GuardianApp};
use crate::assistant::{resolve_turn, TurnResolution};
use crate::contacts::NewContact;
use crate::devices::{
    CameraCapture, DeviceKind, LocationSource, LocationUpdate, LoggingCamera, RecognizerEvent,
    SpeechOutput, SpeechRecognizer, Subscription, TracingSpeech,
};
use crate::error::DeviceError;
use crate::events::{Effect, Event};
use crate::oracle::{havens_or_empty, Oracles, SafeHaven};

const ONE_SECOND: Duration = Duration::from_secs(1);

/// User-level commands accepted by the runtime.
#[derive(Debug)]
pub enum Command {
    Trigger,
    Cancel,
    ToggleSilent,
    ToggleCommunity,
    ToggleVoice,
    /// A phrase picked up by the listener; only acted on in voice mode.
    Heard(String),
    Ask(String),
    AddContact(NewContact),
    RemoveContact(String),
    SearchHavens,
    ClearHavens,
    StartDecoy,
    EndDecoy,
    Snapshot,
    Dashboard(oneshot::Sender<Dashboard>),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Trigger => "trigger",
            Command::Cancel => "cancel",
            Command::ToggleSilent => "silent",
            Command::ToggleCommunity => "community",
            Command::ToggleVoice => "voice",
            Command::Heard(_) => "say",
            Command::Ask(_) => "ask",
            Command::AddContact(_) => "contact add",
            Command::RemoveContact(_) => "contact rm",
            Command::SearchHavens => "havens",
            Command::ClearHavens => "havens clear",
            Command::StartDecoy => "decoy",
            Command::EndDecoy => "hangup",
            Command::Snapshot => "snapshot",
            Command::Dashboard(_) => "status",
        }
    }
}

/// Device backends. Missing recognizer or location source means the
/// platform lacks that capability.
pub struct Devices {
    pub speech: Arc<dyn SpeechOutput>,
    pub camera: Arc<dyn CameraCapture>,
    pub recognizer: Option<Arc<dyn SpeechRecognizer>>,
    pub location: Option<Arc<dyn LocationSource>>,
}

impl Default for Devices {
    fn default() -> Self {
        Self {
            speech: Arc::new(TracingSpeech),
            camera: Arc::new(LoggingCamera::default()),
            recognizer: None,
            location: None,
        }
    }
}

enum Completion {
    Turn(TurnResolution),
    Havens { seq: u64, havens: Vec<SafeHaven> },
}

enum Input {
    Command(Command),
    Closed,
    CountdownTick,
    DecoyTick,
    Location(Option<LocationUpdate>),
    Recognizer(Option<RecognizerEvent>),
    Completed(Completion),
}

pub struct Runtime {
    app: GuardianApp,
    devices: Devices,
    oracles: Oracles,
    listening: Option<Subscription<RecognizerEvent>>,
    countdown: Option<Interval>,
    /// Epoch the countdown interval was armed for.
    armed_epoch: Option<u64>,
    decoy: Option<Interval>,
}

impl Runtime {
    pub fn new(app: GuardianApp, devices: Devices, oracles: Oracles) -> Self {
        Self {
            app,
            devices,
            oracles,
            listening: None,
            countdown: None,
            armed_epoch: None,
            decoy: None,
        }
    }

    /// Drive the app until the command channel closes. Returns the final
    /// state after releasing every device.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        events: mpsc::UnboundedSender<Event>,
    ) -> GuardianApp {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
        let mut location = self.devices.location.as_ref().map(|source| source.subscribe());

        let _ = events.send(self.app.snapshot());

        loop {
            let input = tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => Input::Command(cmd),
                    None => Input::Closed,
                },
                _ = next_tick(&mut self.countdown) => Input::CountdownTick,
                _ = next_tick(&mut self.decoy) => Input::DecoyTick,
                update = next_item(&mut location) => Input::Location(update),
                heard = next_item(&mut self.listening) => Input::Recognizer(heard),
                Some(done) = done_rx.recv() => Input::Completed(done),
            };

            let effects = match input {
                Input::Closed => break,
                Input::Command(cmd) => self.handle(cmd, &done_tx),
                Input::CountdownTick => self.app.tick(),
                Input::DecoyTick => {
                    self.app.tick_decoy();
                    Vec::new()
                }
                Input::Location(Some(update)) => self.app.on_location(update),
                Input::Location(None) => {
                    location = None;
                    Vec::new()
                }
                Input::Recognizer(Some(event)) => self.app.on_recognizer(event),
                Input::Recognizer(None) => {
                    self.listening = None;
                    if self.app.voice_enabled() {
                        self.app.device_failed(DeviceKind::Voice, "speech recognition stopped")
                    } else {
                        Vec::new()
                    }
                }
                Input::Completed(Completion::Turn(resolution)) => self.app.finish_turn(resolution),
                Input::Completed(Completion::Havens { seq, havens }) => {
                    self.app.finish_haven_search(seq, havens)
                }
            };

            self.apply(effects, &events);
            self.sync_timers();
        }

        if let Some(mut sub) = location.take() {
            sub.cancel();
        }
        if let Some(mut sub) = self.listening.take() {
            sub.cancel();
        }
        if self.app.engine().camera_active() {
            self.devices.camera.stop();
        }
        tracing::debug!(epoch = self.app.epoch(), "runtime stopped");
        self.app
    }

    fn handle(&mut self, cmd: Command, done: &mpsc::UnboundedSender<Completion>) -> Vec<Effect> {
        let name = cmd.name();
        match cmd {
            Command::Trigger => self.app.trigger(),
            Command::Cancel => self.app.cancel(),
            Command::ToggleSilent => self.app.toggle_silent(),
            Command::ToggleCommunity => self.app.toggle_community(),
            Command::ToggleVoice => self.app.toggle_voice(),
            Command::Heard(phrase) if self.app.voice_enabled() => {
                self.app.on_recognizer(RecognizerEvent::Transcript(phrase))
            }
            Command::Heard(_) => rejected(name, "voice mode is off"),
            Command::Ask(text) => match self.app.begin_turn(&text) {
                Some(turn) => {
                    let oracles = self.oracles.clone();
                    let label = self.app.location_label();
                    let done = done.clone();
                    tokio::spawn(async move {
                        let resolution = resolve_turn(
                            turn,
                            oracles.assessor.as_ref(),
                            oracles.guidance.as_ref(),
                            &label,
                        )
                        .await;
                        let _ = done.send(Completion::Turn(resolution));
                    });
                    Vec::new()
                }
                None if self.app.assistant().is_loading() => rejected(name, "assistant is busy"),
                None => rejected(name, "message is empty"),
            },
            Command::AddContact(contact) => match self.app.add_contact(contact) {
                Ok(effects) => effects,
                Err(e) => rejected(name, &e.to_string()),
            },
            Command::RemoveContact(id) if self.app.contacts().get(&id).is_none() => {
                rejected(name, &format!("no contact with id {id}"))
            }
            Command::RemoveContact(id) => self.app.remove_contact(&id),
            Command::SearchHavens => match self.app.begin_haven_search() {
                Some(request) => {
                    let search = self.oracles.havens.clone();
                    let done = done.clone();
                    tokio::spawn(async move {
                        let havens =
                            havens_or_empty(search.as_ref(), request.latitude, request.longitude)
                                .await;
                        let _ = done.send(Completion::Havens {
                            seq: request.seq,
                            havens,
                        });
                    });
                    Vec::new()
                }
                None if self.app.location().is_none() => rejected(name, "no location fix yet"),
                None => rejected(name, "search already in progress"),
            },
            Command::ClearHavens => self.app.clear_havens(),
            Command::StartDecoy => self.app.start_decoy(),
            Command::EndDecoy => self.app.end_decoy(),
            Command::Snapshot => vec![Effect::publish(self.app.snapshot())],
            Command::Dashboard(reply) => {
                let _ = reply.send(self.app.dashboard());
                Vec::new()
            }
        }
    }

    /// Execute effects in order. Device failures feed back into the app and
    /// their follow-up effects run in the same pass.
    fn apply(&mut self, effects: Vec<Effect>, events: &mpsc::UnboundedSender<Event>) {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Publish { event } => {
                    let _ = events.send(event);
                }
                Effect::Speak { text } => {
                    if let Err(e) = self.devices.speech.speak(&text) {
                        queue.extend(self.app.device_failed(DeviceKind::Speech, &e.to_string()));
                    }
                }
                Effect::StartCamera => {
                    if let Err(e) = self.devices.camera.start() {
                        queue.extend(self.app.device_failed(DeviceKind::Camera, &e.to_string()));
                    }
                }
                Effect::StopCamera => self.devices.camera.stop(),
                Effect::StartListening => match &self.devices.recognizer {
                    Some(recognizer) => {
                        if let Some(mut old) = self.listening.take() {
                            old.cancel();
                        }
                        self.listening = Some(recognizer.listen());
                    }
                    None => {
                        let e = DeviceError::Unavailable("speech recognition".into());
                        queue.extend(self.app.device_failed(DeviceKind::Voice, &e.to_string()));
                    }
                },
                Effect::StopListening => {
                    if let Some(mut sub) = self.listening.take() {
                        sub.cancel();
                    }
                }
            }
        }

        for effect in self.app.take_log_events() {
            if let Effect::Publish { event } = effect {
                let _ = events.send(event);
            }
        }
    }

    /// Keep exactly one countdown interval alive per emergency epoch, and a
    /// decoy clock only while a call is showing.
    fn sync_timers(&mut self) {
        if self.app.countdown().is_some() {
            let epoch = self.app.epoch();
            if self.armed_epoch != Some(epoch) {
                self.countdown = Some(second_interval());
                self.armed_epoch = Some(epoch);
            }
        } else {
            self.countdown = None;
            self.armed_epoch = None;
        }

        match (self.app.decoy().is_some(), self.decoy.is_some()) {
            (true, false) => self.decoy = Some(second_interval()),
            (false, true) => self.decoy = None,
            _ => {}
        }
    }
}

fn rejected(command: &str, reason: &str) -> Vec<Effect> {
    tracing::debug!(command, reason, "command rejected");
    vec![Effect::publish(Event::CommandRejected {
        command: command.to_string(),
        reason: reason.to_string(),
    })]
}

/// First tick one second from now, not immediately.
fn second_interval() -> Interval {
    let mut interval = time::interval_at(Instant::now() + ONE_SECOND, ONE_SECOND);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

async fn next_item<T>(sub: &mut Option<Subscription<T>>) -> Option<T> {
    match sub {
        Some(sub) => sub.next().await,
        None => pending().await,
    }
}
