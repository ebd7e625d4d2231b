use breach_defence_core::{
    Credits, DefenderId, DefenderProfile, Event, LevelNumber, LevelPhase, LevelProfile,
    LossPolicy, PlacementError, Ruleset, SimulationConfig, TickOutcome, WaveNumber, WaveProfile,
    WaveStartError, WorldPoint,
};
use breach_defence_runtime::{Simulation, TickReport};
use breach_defence_world::query;

const SLOT: WorldPoint = WorldPoint::new(100.0, 10.0);
const FAR_SLOT: WorldPoint = WorldPoint::new(100.0, 80.0);

fn level(lives: u32, wave: WaveProfile) -> LevelProfile {
    LevelProfile {
        starting_lives: lives,
        starting_currency: 100,
        kill_reward: 10,
        defender: DefenderProfile {
            cost: 50,
            damage: 25,
            range: 500.0,
            cooldown_ticks: 1,
        },
        wave,
    }
}

fn wave(speed: f32, max_health: u32) -> WaveProfile {
    WaveProfile {
        size: 1,
        speed,
        max_health,
        leader_speed_multiplier: 1.0,
    }
}

fn config(levels: Vec<LevelProfile>) -> SimulationConfig {
    SimulationConfig {
        tick_interval_ms: 10,
        tick_scale: 0.1,
        wave_interval_ticks: 1_000,
        escalation_delay_ticks: 0,
        loss_policy: LossPolicy::LivesBased,
        path: vec![
            WorldPoint::new(0.0, 0.0),
            WorldPoint::new(100.0, 0.0),
            WorldPoint::new(200.0, 0.0),
        ],
        slots: vec![SLOT, FAR_SLOT],
        levels,
    }
}

fn rules(config: SimulationConfig) -> Ruleset {
    config.validate().expect("valid rules")
}

fn count(reports: &[TickReport], matches: impl Fn(&Event) -> bool) -> usize {
    reports
        .iter()
        .flat_map(|report| report.events.iter())
        .filter(|event| matches(event))
        .count()
}

fn step(simulation: &mut Simulation) -> TickReport {
    simulation.step().expect("simulation still running")
}

#[test]
fn two_shots_kill_and_pay_the_reward() {
    let mut simulation = Simulation::new(rules(config(vec![level(5, wave(1.0, 50))])));
    assert_eq!(simulation.place_defender(SLOT), Ok(DefenderId::new(0)));
    assert_eq!(simulation.snapshot().currency, Credits::new(50));
    assert_eq!(simulation.start_wave(), Ok(WaveNumber::new(1)));

    let reports = vec![step(&mut simulation), step(&mut simulation)];

    assert_eq!(
        count(&reports, |event| matches!(event, Event::EnemyDamaged { .. })),
        2
    );
    assert_eq!(
        count(&reports, |event| matches!(event, Event::EnemyKilled { .. })),
        1
    );
    let snapshot = &reports[1].snapshot;
    assert_eq!(snapshot.currency, Credits::new(60));
    assert!(snapshot.enemies.is_empty());
    assert!(reports[1].events.contains(&Event::WaveCleared {
        wave: WaveNumber::new(1)
    }));
    assert!(!query::wave_status(simulation.world()).in_progress);
}

#[test]
fn undefended_enemy_breaches_after_path_length_over_speed_ticks() {
    let mut config = config(vec![level(5, wave(0.25, 50))]);
    config.tick_scale = 1.0;
    let mut simulation = Simulation::new(rules(config));
    assert_eq!(simulation.start_wave(), Ok(WaveNumber::new(1)));

    let mut reports = Vec::new();
    for _ in 0..7 {
        reports.push(step(&mut simulation));
    }
    assert_eq!(
        count(&reports, |event| matches!(event, Event::EnemyBreached { .. })),
        0
    );
    assert_eq!(reports[6].snapshot.enemies.len(), 1);

    let eighth = step(&mut simulation);
    assert_eq!(eighth.tick, 8);
    assert_eq!(
        count(std::slice::from_ref(&eighth), |event| matches!(
            event,
            Event::EnemyBreached { .. }
        )),
        1
    );
    assert_eq!(eighth.snapshot.lives, 4);
    assert!(eighth.snapshot.enemies.is_empty());
}

fn first_breach_tick(simulation: &mut Simulation, limit: u64) -> Option<u64> {
    while let Some(report) = simulation.step() {
        if report
            .events
            .iter()
            .any(|event| matches!(event, Event::EnemyBreached { .. }))
        {
            return Some(report.tick);
        }
        if report.tick >= limit {
            break;
        }
    }
    None
}

#[test]
fn breach_tick_holds_for_inexact_decimal_steps() {
    // (speed, tick scale, segments, ticks until the breach)
    let cases = [
        (0.4, 0.1, 5, 125),
        (1.0, 0.1, 5, 50),
        (0.3, 1.0, 3, 10),
        (0.1, 1.0, 3, 30),
        (0.7, 1.0, 7, 10),
        (0.35, 0.2, 4, 58),
    ];

    for (speed, tick_scale, segments, expected) in cases {
        let mut config = config(vec![level(5, wave(speed, 50))]);
        config.tick_scale = tick_scale;
        config.path = (0..=segments)
            .map(|index| WorldPoint::new(index as f32 * 100.0, 0.0))
            .collect();
        config.slots = Vec::new();
        let mut simulation = Simulation::new(rules(config));
        assert_eq!(
            query::path(simulation.world()).length(),
            segments as f32
        );
        assert_eq!(simulation.start_wave(), Ok(WaveNumber::new(1)));

        assert_eq!(
            first_breach_tick(&mut simulation, expected + 5),
            Some(expected),
            "speed {speed} scale {tick_scale} over {segments} segments"
        );
    }
}

#[test]
fn default_balance_breaches_on_schedule() {
    let mut config = SimulationConfig::default();
    config.levels[0].wave.size = 1;
    config.levels[0].wave.leader_speed_multiplier = 1.0;
    config.slots = Vec::new();
    let mut simulation = Simulation::new(rules(config));
    assert_eq!(simulation.start_wave(), Ok(WaveNumber::new(1)));

    // speed 0.4 at tick scale 0.1 over five segments
    assert_eq!(first_breach_tick(&mut simulation, 200), Some(125));
}

#[test]
fn occupied_slot_rejects_placement_without_charge() {
    let mut simulation = Simulation::new(rules(config(vec![level(5, wave(1.0, 50))])));
    assert!(simulation.place_defender(SLOT).is_ok());
    let before = simulation.snapshot().currency;

    assert_eq!(
        simulation.place_defender(SLOT),
        Err(PlacementError::Occupied)
    );
    assert_eq!(simulation.snapshot().currency, before);
    assert_eq!(simulation.snapshot().defenders.len(), 1);
}

#[test]
fn unaffordable_or_unknown_placements_are_rejected() {
    let mut config = config(vec![level(5, wave(1.0, 50))]);
    let spare = WorldPoint::new(300.0, 10.0);
    config.slots.push(spare);
    let mut simulation = Simulation::new(rules(config));
    assert!(simulation.place_defender(SLOT).is_ok());
    assert!(simulation.place_defender(FAR_SLOT).is_ok());

    assert_eq!(
        simulation.place_defender(spare),
        Err(PlacementError::InsufficientFunds)
    );
    assert_eq!(
        simulation.place_defender(WorldPoint::new(0.0, 0.0)),
        Err(PlacementError::UnknownSlot)
    );
    assert_eq!(simulation.snapshot().currency, Credits::new(0));
    assert_eq!(simulation.snapshot().defenders.len(), 2);
}

#[test]
fn start_wave_refuses_to_overlap() {
    let mut simulation = Simulation::new(rules(config(vec![level(5, wave(0.1, 50))])));
    assert_eq!(simulation.start_wave(), Ok(WaveNumber::new(1)));
    assert_eq!(
        simulation.start_wave(),
        Err(WaveStartError::WaveInProgress)
    );
    let _ = step(&mut simulation);
    assert_eq!(
        simulation.start_wave(),
        Err(WaveStartError::WaveInProgress)
    );
    assert_eq!(simulation.snapshot().enemies.len(), 1);
}

#[test]
fn losing_level_one_starts_level_two_on_the_next_tick() {
    let mut levels = vec![level(1, wave(5.0, 50)), level(3, wave(1.0, 80))];
    levels[1].starting_currency = 150;
    let mut config = config(levels);
    config.slots = vec![WorldPoint::new(100.0, 1_000.0)];
    let mut simulation = Simulation::new(rules(config));
    assert!(simulation
        .place_defender(WorldPoint::new(100.0, 1_000.0))
        .is_ok());
    assert_eq!(simulation.start_wave(), Ok(WaveNumber::new(1)));

    let mut breach_tick = None;
    while breach_tick.is_none() {
        let report = step(&mut simulation);
        if report
            .events
            .iter()
            .any(|event| matches!(event, Event::EnemyBreached { .. }))
        {
            assert_eq!(
                report.snapshot.phase,
                LevelPhase::LevelClear(LevelNumber::FIRST)
            );
            assert_eq!(report.snapshot.lives, 0);
            breach_tick = Some(report.tick);
        }
        assert!(report.tick < 50, "enemy never breached");
    }

    let next = step(&mut simulation);
    let second = LevelNumber::new(2);
    assert_eq!(Some(next.tick), breach_tick.map(|tick| tick + 1));
    assert_eq!(next.outcome, TickOutcome::LevelUp(second));
    assert_eq!(next.snapshot.level, second);
    assert_eq!(next.snapshot.phase, LevelPhase::Active(second));
    assert_eq!(next.snapshot.lives, 3);
    assert_eq!(next.snapshot.currency, Credits::new(150));
    assert_eq!(next.snapshot.wave, WaveNumber::new(0));
    assert!(next.snapshot.enemies.is_empty());
    assert!(next.snapshot.defenders.is_empty());
}

fn campaign(policy: LossPolicy, escalation_delay_ticks: u32) -> Simulation {
    let mut config = config(vec![level(1, wave(5.0, 50)), level(1, wave(5.0, 50))]);
    config.wave_interval_ticks = 0;
    config.escalation_delay_ticks = escalation_delay_ticks;
    Simulation::new(rules(config).with_loss_policy(policy))
}

#[test]
fn final_defeat_escalates_once_after_the_defeat_window() {
    let delay = 3;
    let mut simulation = campaign(LossPolicy::LivesBased, delay);

    let mut defeat_tick = None;
    let mut escalations = Vec::new();
    while let Some(report) = simulation.step() {
        if report
            .events
            .iter()
            .any(|event| matches!(event, Event::DefeatStarted { .. }))
        {
            defeat_tick = Some(report.tick);
        }
        if report.outcome == TickOutcome::Escalate {
            assert!(report.snapshot.terminal);
            escalations.push(report.tick);
        }
        assert!(report.tick < 500, "campaign never escalated");
    }

    let defeat_tick = defeat_tick.expect("final level lost");
    assert_eq!(escalations, vec![defeat_tick + 1 + u64::from(delay)]);
    assert!(simulation.is_escalated());
    assert_eq!(simulation.snapshot().level, LevelNumber::new(2));
    assert!(simulation.step().is_none());
}

#[test]
fn halting_during_the_defeat_window_cancels_escalation() {
    let mut simulation = campaign(LossPolicy::LivesBased, 10);

    loop {
        let report = step(&mut simulation);
        if matches!(report.snapshot.phase, LevelPhase::Defeated(_)) {
            break;
        }
        assert!(report.tick < 500, "final level never lost");
    }
    let _ = step(&mut simulation);

    simulation.halt();
    assert!(simulation.step().is_none());
    assert!(!simulation.is_escalated());
    assert_eq!(
        simulation.snapshot().phase,
        LevelPhase::Defeated(LevelNumber::new(2))
    );
}

#[test]
fn immediate_policy_escalates_on_the_breach_tick() {
    let mut simulation = campaign(LossPolicy::ImmediateEscalation, 10);

    let report = loop {
        let report = step(&mut simulation);
        if report.outcome != TickOutcome::Continuing {
            break report;
        }
        assert!(report.tick < 100, "never escalated");
    };

    assert_eq!(report.outcome, TickOutcome::Escalate);
    assert!(report
        .events
        .iter()
        .any(|event| matches!(event, Event::EnemyBreached { .. })));
    assert_eq!(report.snapshot.level, LevelNumber::FIRST);
    assert!(simulation.step().is_none());
}

fn replay() -> Vec<TickReport> {
    let rules = SimulationConfig::default()
        .validate()
        .expect("default rules");
    let slots = rules.slots().to_vec();
    let mut simulation = Simulation::new(rules);
    let mut reports = Vec::new();

    for _ in 0..600 {
        let level_started = reports
            .last()
            .map_or(true, |report: &TickReport| {
                matches!(report.outcome, TickOutcome::LevelUp(_))
            });
        if level_started {
            for slot in &slots {
                let _ = simulation.place_defender(*slot);
            }
        }

        let Some(report) = simulation.step() else {
            break;
        };

        let status = query::wave_status(simulation.world());
        if status.enemies_alive > 0 {
            assert!(status.in_progress, "enemies alive outside a wave");
        }
        let spawned = report
            .events
            .iter()
            .filter(|event| matches!(event, Event::WaveSpawned { .. }))
            .count();
        assert!(spawned <= 1, "two waves spawned in one tick");

        reports.push(report);
    }
    reports
}

#[test]
fn deterministic_replay_produces_identical_reports() {
    let first = replay();
    let second = replay();

    assert!(!first.is_empty());
    assert_eq!(first, second, "replay diverged between runs");
    assert!(
        count(&first, |event| matches!(event, Event::EnemyKilled { .. })) > 0,
        "defenders never scored"
    );
}
