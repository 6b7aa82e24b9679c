use std::sync::Arc;

use police_maze_core::{
    AnimationMode, Command, EntityStore, Event, FlagId, ItemId, MazeRules, ScalarStore, SoundId,
    TrackIndex, VariableId, Vector3,
};
use police_maze_system_track::{
    AddMode, Program, Siblings, Track, TrackError, TrackFault, TrackLoadError, TrackSetup,
};
use police_maze_world::{self as world, query, World};

const FRAME_MS: u64 = 66;
const SCORE: VariableId = VariableId::new(9);

struct Rig {
    world: World,
    pool: Vec<Track>,
    rules: MazeRules,
}

impl Rig {
    fn new(slots: usize) -> Self {
        Self {
            world: World::new(),
            pool: (0..slots).map(|_| Track::new()).collect(),
            rules: MazeRules::default(),
        }
    }

    fn place(&mut self, item: i32, target: bool, maze_enemy: bool) {
        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::PlaceItem {
                item: ItemId::new(item),
                position: Vector3::ZERO,
                facing: 0,
                target,
                obstacle: false,
                maze_enemy,
            },
            &mut events,
        );
    }

    fn attach(&mut self, slot: usize, item: i32, steps: u32, words: &[i32], active: bool) {
        let setup = TrackSetup {
            item: ItemId::new(item),
            start: Vector3::ZERO,
            end: Vector3::new(100.0, 0.0, 0.0),
            step_count: steps,
            active,
        };
        let program = Arc::new(Program::decode(words).expect("program decodes"));
        self.pool[slot]
            .add(setup, program, AddMode::Fresh)
            .expect("track attaches");
        self.pool[slot].resync_clock(query::now_ms(&self.world));
    }

    fn advance_clock(&mut self, ms: u64) {
        let mut events = Vec::new();
        world::apply(&mut self.world, world::frame(ms), &mut events);
    }

    fn frame(&mut self) -> Vec<Result<bool, TrackFault>> {
        self.frame_after(FRAME_MS)
    }

    fn frame_after(&mut self, ms: u64) -> Vec<Result<bool, TrackFault>> {
        self.advance_clock(ms);
        let mut results = Vec::with_capacity(self.pool.len());
        for index in 0..self.pool.len() {
            let (track, mut siblings) =
                Siblings::split(&mut self.pool, index).expect("slot exists");
            results.push(track.tick(&mut self.world, &self.rules, &mut siblings));
        }
        results
    }

    fn track(&self, slot: usize) -> &Track {
        &self.pool[slot]
    }

    fn position(&self, item: i32) -> Vector3 {
        self.world.position(ItemId::new(item)).expect("item placed")
    }

    fn facing(&self, item: i32) -> i32 {
        self.world.facing(ItemId::new(item)).expect("item placed")
    }
}

#[test]
fn move_then_restart_loops_the_cursor_not_the_path() {
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.attach(0, 1, 5, &[-2, 4, -4], true);

    let expected = [
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(25.0, 0.0, 0.0),
        Vector3::new(50.0, 0.0, 0.0),
        Vector3::new(75.0, 0.0, 0.0),
        Vector3::new(100.0, 0.0, 0.0),
    ];
    assert_eq!(rig.track(0).waypoints(), &expected);

    let _ = rig.frame();
    assert!(rig.track(0).is_moving());
    assert_eq!(rig.track(0).cursor(), 2);
    assert_eq!(rig.track(0).waypoint_index(), 0);

    for step in 1..=4 {
        let _ = rig.frame();
        assert_eq!(rig.track(0).waypoint_index(), step);
        assert_eq!(rig.position(1), expected[step]);
    }
    assert!(!rig.track(0).is_moving());

    let _ = rig.frame();
    assert_eq!(rig.track(0).cursor(), 2, "restart re-issued the move");
    assert_eq!(rig.track(0).waypoint_index(), 4, "restart keeps the waypoint");
    assert_eq!(rig.track(0).waypoint_target(), Some(4));
}

#[test]
fn move_steps_one_waypoint_per_update_without_overshoot() {
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.attach(0, 1, 10, &[-1, 9, -2, 2, -3, 1_000_000], true);

    let _ = rig.frame();
    assert_eq!(rig.track(0).waypoint_index(), 9);
    assert_eq!(rig.position(1), rig.track(0).waypoints()[9]);

    let mut previous = 9;
    while rig.track(0).is_moving() {
        let _ = rig.frame();
        let index = rig.track(0).waypoint_index();
        assert_eq!(previous - index, 1);
        assert_eq!(rig.position(1), rig.track(0).waypoints()[index]);
        previous = index;
    }
    assert_eq!(previous, 2);

    let _ = rig.frame();
    assert!(rig.track(0).is_waiting());
    assert_eq!(rig.track(0).waypoint_index(), 2);
}

#[test]
fn moves_reregister_item_bounds() {
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.attach(0, 1, 3, &[-2, 2, -3, 1_000_000], true);

    for _ in 0..3 {
        let _ = rig.frame();
    }

    let item = query::item(&rig.world, ItemId::new(1)).expect("placed");
    assert_eq!(item.registrations(), 2);
    let events = rig.world.drain_events();
    assert!(events.contains(&Event::ItemBoundsRegistered {
        item: ItemId::new(1)
    }));
}

#[test]
fn rotation_converges_on_target_without_oscillating() {
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.attach(0, 1, 1, &[-6, 100, 30, -3, 1_000_000], true);

    let _ = rig.frame();
    let mut distance = 100;
    let mut facings = Vec::new();
    while rig.track(0).is_rotating() {
        let _ = rig.frame();
        let facing = rig.facing(1);
        let remaining = (100 - facing).abs();
        assert!(remaining < distance, "distance must shrink every update");
        distance = remaining;
        facings.push(facing);
    }

    assert_eq!(facings, vec![30, 60, 90, 100]);
    assert!(rig.track(0).is_waiting(), "program resumes once rotation ends");
}

#[test]
fn negative_rotation_clamps_from_below() {
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.attach(0, 1, 1, &[-6, -100, -40, -3, 1_000_000], true);

    let mut facings = Vec::new();
    for _ in 0..4 {
        let _ = rig.frame();
        facings.push(rig.facing(1));
    }
    assert_eq!(facings, vec![0, -40, -80, -100]);
    assert!(!rig.track(0).is_rotating());
}

#[test]
fn zero_rotation_delta_stops_immediately() {
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.attach(0, 1, 1, &[-6, 50, 0, -3, 1_000_000], true);

    let _ = rig.frame();
    assert!(rig.track(0).is_rotating());
    let _ = rig.frame();
    assert!(!rig.track(0).is_rotating());
    assert_eq!(rig.facing(1), 0);
}

#[test]
fn leave_scores_only_innocent_targets() {
    let cases = [(true, false, 1), (true, true, 0), (false, false, 0)];
    for (target, enemy, expected) in cases {
        let mut rig = Rig::new(1);
        rig.place(1, target, enemy);
        rig.attach(0, 1, 1, &[-25, -3, 1_000_000], true);

        let _ = rig.frame();
        assert_eq!(
            rig.world.variable(SCORE),
            expected,
            "target {target} enemy {enemy}"
        );
    }
}

#[test]
fn shot_from_target_hurts_player_and_costs_a_point() {
    let mut rig = Rig::new(1);
    rig.place(1, true, true);
    rig.attach(0, 1, 1, &[-24, 27, 0, -20, 3, -3, 1_000_000], true);

    let _ = rig.frame();
    assert_eq!(rig.world.variable(SCORE), -1);
    assert!(!rig.world.flag(FlagId::new(3)), "shoot suspends the update");
    assert!(!query::player_walking(&rig.world));
    assert_eq!(query::player_animation(&rig.world), Some(AnimationMode::new(21)));
    assert_eq!(query::cursor_jitters(&rig.world), 1);

    let events = rig.world.drain_events();
    assert_eq!(
        events[0],
        Event::SoundPlayed {
            sound: SoundId::new(27),
            volume: 90,
        }
    );
    assert!(events.iter().any(|event| matches!(
        event,
        Event::SoundPlayed { sound, volume: 100 }
            if *sound == SoundId::new(9900) || *sound == SoundId::new(9905)
    )));

    let _ = rig.frame();
    assert!(rig.world.flag(FlagId::new(3)));
}

#[test]
fn shot_uses_combat_reaction_when_weapon_drawn() {
    let mut rig = Rig::new(1);
    rig.place(1, true, true);
    let mut events = Vec::new();
    world::apply(
        &mut rig.world,
        Command::SetCombatMode { enabled: true },
        &mut events,
    );
    rig.attach(0, 1, 1, &[-24, 27, 0, -3, 1_000_000], true);

    let _ = rig.frame();
    assert_eq!(query::player_animation(&rig.world), Some(AnimationMode::new(22)));
}

#[test]
fn shot_from_non_target_is_harmless() {
    let mut rig = Rig::new(1);
    rig.place(1, false, true);
    rig.attach(0, 1, 1, &[-24, 27, 0, -3, 1_000_000], true);

    let _ = rig.frame();
    assert_eq!(rig.world.variable(SCORE), 0);
    assert!(query::player_walking(&rig.world));
    assert!(rig.world.drain_events().is_empty());
}

#[test]
fn bookkeeping_instructions_update_host_state() {
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.place(2, false, true);
    #[rustfmt::skip]
    let words = [
        -16, 5, 10,  // variable_set
        -19, 5,      // variable_dec
        -18, 5, 10,  // variable_inc
        -18, 5, 10,  // variable_inc capped
        -16, 6, 4,
        -17, 6,      // variable_reset
        -20, 7,      // flag_set
        -20, 8,
        -21, 8,      // flag_reset
        -22, 1,      // enemy_set
        -23, 2,      // enemy_reset
        -8, 1,       // obstacle_set
        -15, 2, 1,   // target_set
        -5, 384,     // facing
        -10, 33, 60, // play_sound
        -3, 1_000_000,
    ];
    rig.attach(0, 1, 1, &words, true);

    let _ = rig.frame();
    assert_eq!(rig.world.variable(VariableId::new(5)), 10);
    assert_eq!(rig.world.variable(VariableId::new(6)), 0);
    assert!(rig.world.flag(FlagId::new(7)));
    assert!(!rig.world.flag(FlagId::new(8)));
    assert!(rig.world.is_maze_enemy(ItemId::new(1)));
    assert!(!rig.world.is_maze_enemy(ItemId::new(2)));
    assert!(rig.world.is_obstacle(ItemId::new(1)));
    assert!(rig.world.is_target(ItemId::new(2)));
    assert_eq!(rig.facing(1), 384);
    assert_eq!(
        rig.world.drain_events(),
        vec![Event::SoundPlayed {
            sound: SoundId::new(33),
            volume: 60,
        }]
    );
}

#[test]
fn activate_pauses_once_counter_reaches_limit() {
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.attach(0, 1, 1, &[-26, 11, 2, -18, 11, 2, -3, 0, -4], true);

    let _ = rig.frame();
    let _ = rig.frame();
    assert!(!rig.track(0).is_paused());
    let _ = rig.frame();
    assert!(rig.track(0).is_paused());
    assert_eq!(rig.world.variable(VariableId::new(11)), 2);
}

#[test]
fn waits_drain_by_update_time() {
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.attach(0, 1, 1, &[-3, 200, -20, 1, -3, 1_000_000], true);

    let _ = rig.frame();
    assert!(rig.track(0).is_waiting());
    for _ in 0..3 {
        let _ = rig.frame();
        assert!(!rig.world.flag(FlagId::new(1)));
    }
    let _ = rig.frame();
    assert!(rig.world.flag(FlagId::new(1)));
}

#[test]
fn stalls_do_not_skip_waits() {
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.attach(0, 1, 1, &[-3, 500, -20, 1, -3, 1_000_000], true);

    let _ = rig.frame();
    let _ = rig.frame_after(60_000);
    assert!(rig.track(0).is_waiting());
    assert_eq!(rig.track(0).wait_remaining_ms(), 500 - 66);
    assert!(!rig.world.flag(FlagId::new(1)));
}

#[test]
fn updates_are_throttled_independent_of_frame_rate() {
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.attach(0, 1, 20, &[-2, 19, -3, 1_000_000], true);

    let _ = rig.frame();
    for _ in 0..8 {
        let _ = rig.frame_after(16);
    }
    assert_eq!(rig.track(0).waypoint_index(), 1);
}

#[test]
fn waypoint_progress_follows_wall_time_at_any_frame_length() {
    let progress = |frame_ms: u64| {
        let mut rig = Rig::new(1);
        rig.place(1, false, false);
        rig.attach(0, 1, 100, &[-2, 99, -3, 1_000_000], true);
        for _ in 0..1_320 / frame_ms {
            let _ = rig.frame_after(frame_ms);
        }
        rig.track(0).waypoint_index()
    };

    // Twenty updates in 1320 ms: one issues the move, nineteen step.
    assert_eq!(progress(FRAME_MS), 19);
    for frame_ms in [10, 20, 24, 30, 33, 40, 44, 60] {
        assert_eq!(progress(frame_ms), 19, "{frame_ms} ms frames");
    }
}

#[test]
fn waits_last_the_same_wall_time_at_any_frame_length() {
    let flag_frame = |frame_ms: u64| {
        let mut rig = Rig::new(1);
        rig.place(1, false, false);
        rig.attach(0, 1, 1, &[-3, 660, -20, 1, -3, 1_000_000], true);
        (1..=200)
            .find(|_| {
                let _ = rig.frame_after(frame_ms);
                rig.world.flag(FlagId::new(1))
            })
            .map(|frames| frames * frame_ms)
    };

    // The wait starts on the 66 ms update and drains one quantum per update.
    assert_eq!(flag_frame(FRAME_MS), Some(66 * 11));
    assert_eq!(flag_frame(33), Some(66 * 11));
    assert_eq!(flag_frame(22), Some(66 * 11));
}

#[test]
fn random_waits_stay_inside_bounds() {
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.attach(0, 1, 1, &[-7, 300, 900, -4], true);

    for _ in 0..50 {
        let _ = rig.frame();
        if rig.track(0).is_waiting() {
            let remaining = rig.track(0).wait_remaining_ms();
            assert!(remaining <= 900);
        }
    }
}

#[test]
fn spinning_items_hold_their_program() {
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.attach(0, 1, 1, &[-20, 1, -3, 1_000_000], true);
    let mut events = Vec::new();
    world::apply(
        &mut rig.world,
        Command::SetSpinning {
            item: ItemId::new(1),
            spinning: true,
        },
        &mut events,
    );

    assert_eq!(rig.frame(), vec![Ok(true)]);
    assert!(!rig.world.flag(FlagId::new(1)));

    world::apply(
        &mut rig.world,
        Command::SetSpinning {
            item: ItemId::new(1),
            spinning: false,
        },
        &mut events,
    );
    let _ = rig.frame();
    assert!(rig.world.flag(FlagId::new(1)));
}

#[test]
fn inactive_tracks_wait_to_be_unpaused() {
    let mut rig = Rig::new(2);
    rig.place(1, false, false);
    rig.place(2, false, false);
    rig.attach(0, 1, 1, &[-3, 200, -11, 1, -3, 1_000_000], true);
    rig.attach(1, 2, 1, &[-20, 4, -3, 1_000_000], false);

    for _ in 0..4 {
        let _ = rig.frame();
    }
    assert!(rig.track(1).is_paused());
    assert!(!rig.world.flag(FlagId::new(4)));

    let _ = rig.frame();
    assert!(!rig.track(1).is_paused(), "sibling unpaused in pool order");
    assert!(rig.world.flag(FlagId::new(4)), "later slot runs in the same pass");
}

#[test]
fn self_pause_stops_interpretation() {
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.attach(0, 1, 1, &[-12, 0, -20, 2, -3, 1_000_000], true);

    let _ = rig.frame();
    assert!(rig.track(0).is_paused());
    assert!(!rig.world.flag(FlagId::new(2)));
}

#[test]
fn one_of_two_unpauses_candidates_uniformly() {
    let counts = sample_branching(&[-13, 1, 2, -3, 0, -4], 3, 2_000);
    assert_eq!(counts[0] + counts[1], 2_000);
    for count in counts {
        assert!((900..=1_100).contains(&count), "count {count}");
    }
}

#[test]
fn one_of_three_unpauses_candidates_uniformly() {
    let counts = sample_branching(&[-14, 1, 2, 3, -3, 0, -4], 4, 3_000);
    assert_eq!(counts.iter().sum::<usize>(), 3_000);
    for count in counts {
        assert!((880..=1_120).contains(&count), "count {count}");
    }
}

fn sample_branching(words: &[i32], slots: usize, draws: usize) -> Vec<usize> {
    let mut rig = Rig::new(slots);
    rig.place(1, false, false);
    rig.attach(0, 1, 1, words, true);

    let mut counts = vec![0; slots - 1];
    for _ in 0..draws {
        for sibling in &mut rig.pool[1..] {
            sibling.set_paused(true);
        }
        let _ = rig.frame();
        let unpaused: Vec<_> = (1..slots)
            .filter(|slot| !rig.track(*slot).is_paused())
            .collect();
        assert_eq!(unpaused.len(), 1, "exactly one candidate per draw");
        counts[unpaused[0] - 1] += 1;
    }
    counts
}

#[test]
fn running_off_the_program_end_faults_and_pauses() {
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.attach(0, 1, 1, &[-20, 1], true);

    assert_eq!(
        rig.frame(),
        vec![Err(TrackFault::CursorOutOfProgram { cursor: 2 })]
    );
    assert!(rig.track(0).is_paused());
}

#[test]
fn programs_that_never_suspend_are_halted() {
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.attach(0, 1, 1, &[-20, 1, -4], true);

    assert_eq!(
        rig.frame(),
        vec![Err(TrackFault::RunawayProgram { executed: 256 })]
    );
    assert!(rig.track(0).is_paused());
}

#[test]
fn restored_tracks_need_a_program() {
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.attach(0, 1, 1, &[-3, 1_000_000], true);

    let snapshot = rig.track(0).snapshot();
    rig.pool[0] = Track::from_snapshot(&snapshot).expect("restores");
    rig.pool[0].set_paused(false);
    rig.pool[0].resync_clock(query::now_ms(&rig.world));

    assert_eq!(rig.frame(), vec![Err(TrackFault::MissingProgram)]);
}

#[test]
fn reattach_keeps_restored_progress() {
    let words = [-2, 4, -3, 1_000_000];
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.attach(0, 1, 5, &words, true);
    for _ in 0..3 {
        let _ = rig.frame();
    }

    let snapshot = rig.track(0).snapshot();
    let mut restored = Track::from_snapshot(&snapshot).expect("restores");
    let setup = TrackSetup {
        item: ItemId::new(1),
        start: Vector3::new(-50.0, 0.0, 0.0),
        end: Vector3::ZERO,
        step_count: 5,
        active: false,
    };
    restored
        .add(
            setup,
            Arc::new(Program::decode(&words).expect("decodes")),
            AddMode::Reattach,
        )
        .expect("reattaches");

    assert_eq!(restored.snapshot(), snapshot);
    assert!(restored.is_present());
}

#[test]
fn add_rejects_out_of_range_operands() {
    let program = |words: &[i32]| Arc::new(Program::decode(words).expect("decodes"));
    let setup = |step_count| TrackSetup {
        item: ItemId::new(1),
        start: Vector3::ZERO,
        end: Vector3::ZERO,
        step_count,
        active: true,
    };
    let mut track = Track::new();

    assert_eq!(
        track.add(setup(5), program(&[-4, -2, 5]), AddMode::Fresh),
        Err(TrackError::WaypointOutOfRange {
            offset: 1,
            waypoint: 5,
            count: 5,
        })
    );
    assert_eq!(
        track.add(setup(5), program(&[-12, 64]), AddMode::Fresh),
        Err(TrackError::TrackOutOfRange {
            offset: 0,
            track: TrackIndex::new(64),
        })
    );
    assert_eq!(
        track.add(setup(0), program(&[-4]), AddMode::Fresh),
        Err(TrackError::InvalidStepCount(0))
    );
    assert_eq!(
        track.add(setup(101), program(&[-4]), AddMode::Fresh),
        Err(TrackError::InvalidStepCount(101))
    );
    assert!(!track.is_present());
}

#[test]
fn reattach_rejects_a_different_item() {
    let mut track = Track::new();
    let setup = TrackSetup {
        item: ItemId::new(7),
        start: Vector3::ZERO,
        end: Vector3::ZERO,
        step_count: 1,
        active: true,
    };
    let program = Arc::new(Program::decode(&[-4]).expect("decodes"));
    assert_eq!(
        track.add(setup, program, AddMode::Reattach),
        Err(TrackError::ItemMismatch {
            restored: ItemId::new(-1),
            requested: ItemId::new(7),
        })
    );
}

#[test]
fn reattach_rejects_a_different_path_length() {
    let words = [-2, 4, -3, 1_000_000];
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.attach(0, 1, 5, &words, true);
    let _ = rig.frame();

    let snapshot = rig.track(0).snapshot();
    let mut restored = Track::from_snapshot(&snapshot).expect("restores");
    let setup = TrackSetup {
        item: ItemId::new(1),
        start: Vector3::ZERO,
        end: Vector3::new(100.0, 0.0, 0.0),
        step_count: 8,
        active: true,
    };
    assert_eq!(
        restored.add(
            setup,
            Arc::new(Program::decode(&words).expect("decodes")),
            AddMode::Reattach,
        ),
        Err(TrackError::StepCountMismatch {
            restored: 5,
            requested: 8,
        })
    );
    assert_eq!(restored.snapshot(), snapshot);
}

#[test]
fn single_track_streams_round_trip_mid_move() {
    let mut rig = Rig::new(1);
    rig.place(1, false, false);
    rig.attach(0, 1, 8, &[-3, 90, -2, 7, -6, 300, 45, -4], true);
    for _ in 0..4 {
        let _ = rig.frame();
    }
    assert!(rig.track(0).is_moving());

    let mut stream = Vec::new();
    rig.track(0).save(&mut stream).expect("track saves");
    let mut loaded = Track::new();
    loaded.load(stream.as_slice()).expect("track loads");
    assert_eq!(loaded.snapshot(), rig.track(0).snapshot());
    assert!(loaded.program().is_none());
}

#[test]
fn rejected_track_streams_leave_the_slot_untouched() {
    let mut track = Track::new();
    let before = track.snapshot();

    let error = track.load(&[9_u8][..]).expect_err("truncated stream");
    assert!(matches!(error, TrackLoadError::Codec(_)));

    let mut invalid = before.clone();
    invalid.waypoint_count = 3;
    let forged = bincode::serialize(&invalid).expect("record serializes");
    let error = track.load(forged.as_slice()).expect_err("inconsistent record");
    assert!(matches!(error, TrackLoadError::Invalid(_)));
    assert_eq!(track.snapshot(), before);
}
