use std::{
    io,
    sync::mpsc::{self, RecvTimeoutError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use breach_defence_core::{
    DefenderId, PlacementError, Ruleset, TickOutcome, WaveNumber, WaveStartError, WorldPoint,
};
use log::{debug, info, warn};
use thiserror::Error;

use crate::simulation::{Simulation, SimulationObserver};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Failure to bring a clock up.
#[derive(Debug, Error)]
pub enum ClockError {
    /// The operating system refused to spawn the clock thread.
    #[error("failed to spawn the clock thread")]
    Spawn(#[source] io::Error),
}

/// Failure of a command sent through a [`ClockHandle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The world rejected the placement.
    #[error("placement rejected: {0}")]
    Placement(#[from] PlacementError),
    /// The world rejected the wave.
    #[error("wave rejected: {0}")]
    WaveStart(#[from] WaveStartError),
    /// The clock no longer runs.
    #[error("the clock is stopped")]
    Stopped,
}

enum ClockCommand {
    Place {
        slot: WorldPoint,
        reply: mpsc::Sender<Result<DefenderId, PlacementError>>,
    },
    StartWave {
        reply: mpsc::Sender<Result<WaveNumber, WaveStartError>>,
    },
    Stop,
}

/// Fixed-interval driver that runs a simulation on its own thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clock {
    interval: Duration,
}

impl Clock {
    /// Creates a clock ticking at the provided interval, at least one millisecond.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
        }
    }

    /// Creates a clock ticking at the interval configured in the rules.
    #[must_use]
    pub fn from_rules(rules: &Ruleset) -> Self {
        Self::new(rules.tick_interval())
    }

    /// Interval between two ticks.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Moves the simulation onto a dedicated thread and starts ticking.
    ///
    /// The first tick runs one interval after the call returns.
    pub fn start<O>(self, simulation: Simulation, observer: O) -> Result<ClockHandle, ClockError>
    where
        O: SimulationObserver + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let interval = self.interval;
        let thread = thread::Builder::new()
            .name("breach-defence-clock".into())
            .spawn(move || run_clock(simulation, observer, &receiver, interval))
            .map_err(ClockError::Spawn)?;

        info!("clock started with a {interval:?} interval");
        Ok(ClockHandle {
            sender,
            thread: Some(thread),
        })
    }
}

/// Handle to a running clock.
///
/// Commands sent through the handle are applied at the start of the next tick.
/// Dropping the handle stops the clock.
#[derive(Debug)]
pub struct ClockHandle {
    sender: mpsc::Sender<ClockCommand>,
    thread: Option<JoinHandle<Simulation>>,
}

impl ClockHandle {
    /// Requests a defender at the slot matching the coordinate.
    ///
    /// Blocks until the clock applied the request.
    pub fn place_defender(&self, slot: WorldPoint) -> Result<DefenderId, CommandError> {
        let (reply, response) = mpsc::channel();
        self.sender
            .send(ClockCommand::Place { slot, reply })
            .map_err(|_| CommandError::Stopped)?;
        let result = response.recv().map_err(|_| CommandError::Stopped)?;
        result.map_err(CommandError::from)
    }

    /// Requests the next wave right away. Blocks until the clock applied it.
    pub fn start_wave(&self) -> Result<WaveNumber, CommandError> {
        let (reply, response) = mpsc::channel();
        self.sender
            .send(ClockCommand::StartWave { reply })
            .map_err(|_| CommandError::Stopped)?;
        let result = response.recv().map_err(|_| CommandError::Stopped)?;
        result.map_err(CommandError::from)
    }

    /// Reports whether the clock thread is still alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Stops ticking, cancels any pending escalation and returns the halted
    /// simulation. Later calls return `None`.
    pub fn stop(&mut self) -> Option<Simulation> {
        let thread = self.thread.take()?;
        let _ = self.sender.send(ClockCommand::Stop);
        match thread.join() {
            Ok(simulation) => {
                info!("clock stopped");
                Some(simulation)
            }
            Err(_) => {
                warn!("clock thread panicked");
                None
            }
        }
    }
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

impl std::fmt::Debug for ClockCommand {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Place { slot, .. } => formatter
                .debug_struct("Place")
                .field("slot", slot)
                .finish_non_exhaustive(),
            Self::StartWave { .. } => formatter.debug_struct("StartWave").finish_non_exhaustive(),
            Self::Stop => formatter.write_str("Stop"),
        }
    }
}

fn run_clock<O: SimulationObserver>(
    mut simulation: Simulation,
    mut observer: O,
    receiver: &mpsc::Receiver<ClockCommand>,
    interval: Duration,
) -> Simulation {
    let mut next_tick = Instant::now() + interval;
    let mut queued = Vec::new();
    let mut ticking = true;

    loop {
        let received = if ticking {
            next_command(receiver, next_tick, Instant::now())
        } else {
            receiver
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected)
        };

        match received {
            Ok(ClockCommand::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(command) if ticking => queued.push(command),
            Ok(command) => apply_command(&mut simulation, command),
            Err(RecvTimeoutError::Timeout) => {
                for command in queued.drain(..) {
                    apply_command(&mut simulation, command);
                }
                ticking = tick(&mut simulation, &mut observer);
                next_tick = schedule_next(next_tick, interval, Instant::now());
            }
        }
    }

    simulation.halt();
    simulation
}

/// Waits for a command until the deadline. An overdue deadline reports a
/// timeout without reading the queue.
fn next_command(
    receiver: &mpsc::Receiver<ClockCommand>,
    deadline: Instant,
    now: Instant,
) -> Result<ClockCommand, RecvTimeoutError> {
    let remaining = deadline.saturating_duration_since(now);
    if remaining.is_zero() {
        return Err(RecvTimeoutError::Timeout);
    }
    receiver.recv_timeout(remaining)
}

/// Runs one tick and reports whether the clock should keep ticking.
fn tick<O: SimulationObserver>(simulation: &mut Simulation, observer: &mut O) -> bool {
    let Some(report) = simulation.step() else {
        return false;
    };

    observer.on_snapshot(&report.snapshot);
    if report.outcome == TickOutcome::Escalate {
        info!("escalated at tick {}", report.tick);
        observer.on_escalate(report.snapshot.level);
        return false;
    }
    true
}

fn apply_command(simulation: &mut Simulation, command: ClockCommand) {
    debug!("applying queued {command:?}");
    match command {
        ClockCommand::Place { slot, reply } => {
            let _ = reply.send(simulation.place_defender(slot));
        }
        ClockCommand::StartWave { reply } => {
            let _ = reply.send(simulation.start_wave());
        }
        ClockCommand::Stop => {}
    }
}

/// Advances the deadline by one interval, resetting it when the clock fell
/// more than two intervals behind.
fn schedule_next(previous: Instant, interval: Duration, now: Instant) -> Instant {
    let next = previous + interval;
    if now.saturating_duration_since(next) > interval * 2 {
        debug!("clock fell behind, resetting schedule");
        now
    } else {
        next
    }
}
