//! Interactive focus session.
//!
//! Reads one command per line from stdin while ticks arrive from a tokio
//! interval. Events are printed as JSON lines on stdout; the countdown is
//! rendered as the terminal title.
//!
//! Session calls may block on the audio thread, so the loop runs them
//! through [`off_runtime`] to keep the tick and stdin tasks moving.

use std::io::{IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Args;
use focuspace_core::audio::{AudioBackend, AudioSessionManager, AudioSettings};
use focuspace_core::session::{Confirm, SelectOutcome, SessionOrchestrator, SessionParts};
use focuspace_core::timer::{TickOutcome, TokioTicks};
use focuspace_core::{
    Config, Event, MemoryProfileStore, PreferenceSync, ProfileStore, SqliteProfileStore,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tracing::{info, warn};

const HELP: &str = "\
commands:
  t, toggle           start or pause
  r, reset            restart the current phase
  d, duration ID      switch duration preset
  m, track ID         switch background music
  b, background URL   switch background image
  e, effect ID        switch visual effect
  mute | unmute       silence all sounds
  s, status           print the session state
  q, quit             leave the session";

#[derive(Args)]
pub struct RunArgs {
    /// User whose preferences are loaded and saved
    #[arg(long)]
    pub user: Option<String>,
    /// Duration preset to start with
    #[arg(long)]
    pub duration: Option<String>,
    /// Background music track to start with
    #[arg(long)]
    pub track: Option<String>,
}

/// Answers confirmation prompts from a flag the session loop sets.
///
/// A prompt first comes back declined and is remembered; the loop asks the
/// user and, on "y", repeats the action with the flag raised.
#[derive(Clone, Default)]
struct PendingConfirm {
    approved: Arc<AtomicBool>,
    asked: Arc<Mutex<Option<String>>>,
}

impl PendingConfirm {
    fn take_question(&self) -> Option<String> {
        self.asked.lock().ok().and_then(|mut q| q.take())
    }

    fn approve<T>(&self, action: impl FnOnce() -> T) -> T {
        self.approved.store(true, Ordering::SeqCst);
        let result = action();
        self.approved.store(false, Ordering::SeqCst);
        result
    }
}

impl Confirm for PendingConfirm {
    fn confirm(&mut self, message: &str) -> bool {
        if self.approved.load(Ordering::SeqCst) {
            return true;
        }
        if let Ok(mut asked) = self.asked.lock() {
            *asked = Some(message.to_string());
        }
        false
    }
}

/// Actions waiting for a yes/no answer.
enum Pending {
    Duration(String),
    Leave,
}

enum Flow {
    Continue,
    Quit,
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(session_loop(args, config));
    // A pending stdin read would otherwise keep the runtime alive.
    runtime.shutdown_background();
    result
}

fn audio_backend(config: &Config) -> Box<dyn AudioBackend> {
    #[cfg(feature = "rodio")]
    {
        Box::new(focuspace_core::audio::RodioBackend::new(&config.audio.asset_root))
    }
    #[cfg(not(feature = "rodio"))]
    {
        info!(asset_root = %config.audio.asset_root, "built without audio output, sounds are silent");
        Box::new(focuspace_core::audio::SilentBackend::new())
    }
}

fn profile_store(user: Option<&str>) -> Box<dyn ProfileStore> {
    if user.is_none() {
        return Box::new(MemoryProfileStore::new());
    }
    match SqliteProfileStore::open() {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!(error = %e, "preferences unavailable, changes will not be saved");
            Box::new(MemoryProfileStore::new())
        }
    }
}

async fn session_loop(args: RunArgs, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let period = Duration::from_millis(config.timer.tick_interval_ms.max(1));
    let (ticks, mut tick_rx) = TokioTicks::new(Handle::current(), period);
    let confirm = PendingConfirm::default();

    let parts = SessionParts {
        ticks: Box::new(ticks),
        audio: AudioSessionManager::new(audio_backend(&config), AudioSettings::from(&config.audio)),
        prefs: PreferenceSync::new(profile_store(args.user.as_deref()), args.user.clone()),
        confirm: Box::new(confirm.clone()),
    };
    let mut session = SessionOrchestrator::mount(&config, parts);
    let notices = session.audio_notices();

    if let Some(id) = args.duration.as_deref() {
        report(&off_runtime(|| session.select_duration(id)))?;
    }
    if let Some(id) = args.track.as_deref() {
        report(&off_runtime(|| session.select_track(id)))?;
    }

    eprintln!("{HELP}");
    render(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending: Option<Pending> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let flow = off_runtime(|| match pending.take() {
                    Some(action) => answer(&mut session, &confirm, action, &line),
                    None => command(&mut session, &confirm, &mut pending, &line),
                })?;
                if let Flow::Quit = flow {
                    break;
                }
            }
            Some(id) = tick_rx.recv() => {
                let outcome = off_runtime(|| session.on_tick(id));
                if let TickOutcome::PhaseEnded { .. } = outcome {
                    if let Some(event) = outcome.into_event() {
                        emit(&event)?;
                    }
                }
                if outcome != TickOutcome::Stale {
                    render(&session);
                }
            }
            _ = notices.notified() => {
                off_runtime(|| session.pump_audio());
            }
        }
    }

    info!("session closed");
    off_runtime(|| drop(session));
    Ok(())
}

/// Run blocking session work without stalling the runtime's other tasks.
fn off_runtime<T>(work: impl FnOnce() -> T) -> T {
    tokio::task::block_in_place(work)
}

fn command(
    session: &mut SessionOrchestrator,
    confirm: &PendingConfirm,
    pending: &mut Option<Pending>,
    line: &str,
) -> Result<Flow, Box<dyn std::error::Error>> {
    let line = line.trim();
    let (cmd, arg) = match line.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (line, ""),
    };

    match cmd {
        "" => {}
        "t" | "toggle" => emit(&session.toggle())?,
        "r" | "reset" => emit(&session.reset())?,
        "d" | "duration" => {
            let outcome = session.select_duration(arg);
            if let SelectOutcome::Declined = outcome {
                if let Some(question) = confirm.take_question() {
                    eprintln!("{question} [y/N]");
                    *pending = Some(Pending::Duration(arg.to_string()));
                    return Ok(Flow::Continue);
                }
            }
            report(&outcome)?;
        }
        "m" | "track" => report(&session.select_track(arg))?,
        "b" | "background" => report(&session.select_background(arg))?,
        "e" | "effect" => report(&session.select_effect(arg))?,
        "mute" => session.set_muted(true),
        "unmute" => session.set_muted(false),
        "s" | "status" => println!("{}", serde_json::to_string(&session.view())?),
        "q" | "quit" => {
            if session.request_leave() {
                return Ok(Flow::Quit);
            }
            if let Some(question) = confirm.take_question() {
                eprintln!("{question} [y/N]");
                *pending = Some(Pending::Leave);
            }
        }
        "h" | "help" | "?" => eprintln!("{HELP}"),
        other => eprintln!("unknown command: {other} (try 'help')"),
    }
    render(session);
    Ok(Flow::Continue)
}

fn answer(
    session: &mut SessionOrchestrator,
    confirm: &PendingConfirm,
    action: Pending,
    line: &str,
) -> Result<Flow, Box<dyn std::error::Error>> {
    let yes = matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes");
    if !yes {
        eprintln!("kept the current session");
        return Ok(Flow::Continue);
    }
    match action {
        Pending::Duration(id) => {
            let outcome = confirm.approve(|| session.select_duration(&id));
            report(&outcome)?;
            render(session);
            Ok(Flow::Continue)
        }
        Pending::Leave => Ok(Flow::Quit),
    }
}

fn emit(event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}

fn report(outcome: &SelectOutcome) -> Result<(), Box<dyn std::error::Error>> {
    match outcome {
        SelectOutcome::Changed(event) => emit(event)?,
        SelectOutcome::Unchanged => eprintln!("already selected"),
        SelectOutcome::Declined => eprintln!("kept the current session"),
        SelectOutcome::Rejected(e) => eprintln!("rejected: {e}"),
    }
    Ok(())
}

/// Show the countdown as the terminal title.
fn render(session: &SessionOrchestrator) {
    let mut stderr = std::io::stderr();
    if !stderr.is_terminal() {
        return;
    }
    let view = session.view();
    let _ = write!(
        stderr,
        "\x1b]0;{}\x07\r{} {}  ",
        view.title,
        view.clock,
        view.phase.activity_label()
    );
    let _ = stderr.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn blocking_wait_lets_spawned_tasks_run() {
        let (tx, rx) = mpsc::channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            tx.send("loaded").unwrap();
        });

        let reply = off_runtime(|| rx.recv_timeout(Duration::from_secs(5)));
        assert_eq!(reply, Ok("loaded"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn track_end_is_applied_before_the_next_tick() {
        let backend = focuspace_core::audio::MemoryBackend::new();
        let parts = SessionParts {
            ticks: Box::new(focuspace_core::timer::ManualTicks::new()),
            audio: AudioSessionManager::new(Box::new(backend.clone()), AudioSettings::default()),
            prefs: PreferenceSync::new(Box::new(MemoryProfileStore::new()), None),
            confirm: Box::new(PendingConfirm::default()),
        };
        let mut session = SessionOrchestrator::mount(&Config::default(), parts);
        let notices = session.audio_notices();
        session.toggle();

        let first = session.audio().handle().unwrap();
        let finisher = backend.clone();
        tokio::spawn(async move {
            finisher.finish(first);
        });
        tokio::time::timeout(Duration::from_secs(5), notices.notified())
            .await
            .expect("track end signalled");

        assert_eq!(off_runtime(|| session.pump_audio()), 1);
        assert_eq!(session.audio().current_index(), 1);
        assert_ne!(session.audio().handle(), Some(first));
    }
}
