//! End-to-end match behavior through the public `MatchState` API.

use std::sync::Arc;
use std::time::{Duration, Instant};

use miniclans::economy::{
    footprints_overlap, BaseSettings, BaseSnapshot, Catalog, GameError, MatchSnapshot,
};
use miniclans::shared::{Action, BuildingRecord, GridPos, Vec2};
use miniclans::{event_channel, MatchEvent, MatchState, RemotePolicy, Side};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn new_match() -> (MatchState, Instant) {
    let now = Instant::now();
    let state =
        MatchState::new_at(Arc::new(Catalog::standard()), BaseSettings::default(), now).unwrap();
    (state, now)
}

fn record(kind: &str, x: i32, y: i32) -> BuildingRecord {
    BuildingRecord {
        kind: kind.to_string(),
        position: GridPos::new(x, y),
        level: 1,
        hp: 500.0,
    }
}

#[test]
fn test_goldmine_pays_for_itself_in_ten_seconds() {
    let (mut state, now) = new_match();

    assert!(state.start_placing("GOLDMINE"));
    assert!(state.place_building(GridPos::new(0, 0)));
    assert_eq!(state.player().gold(), 900.0);
    assert_eq!(state.player().buildings().len(), 2);

    state.tick_at(0.0, now + Duration::from_secs(10));
    assert!((state.player().gold() - 1000.0).abs() < 1e-6);
}

#[test]
fn test_deploy_debits_elixir() {
    let (mut state, _) = new_match();
    assert!(state.deploy_troop(Vec2::new(3.0, 3.0)));
    assert_eq!(state.player().elixir(), 950.0);
    assert_eq!(state.player_troops().len(), 1);
    assert_eq!(state.player_troops()[0].kind().name, "BARBARIAN");
}

#[test]
fn test_unknown_remote_kind_leaves_opponent_untouched() {
    let (mut state, _) = new_match();
    let action = Action::PlaceBuilding {
        building: record("WIZARD_TOWER", 0, 0),
    };

    assert_eq!(
        state.apply_remote(&action),
        Err(GameError::UnknownKind("WIZARD_TOWER".to_string()))
    );
    assert_eq!(state.opponent().buildings().len(), 1);
    assert_eq!(state.opponent().buildings()[0].kind().name, "TOWNHALL");
}

#[test]
fn test_remote_building_keeps_record_hp() {
    let (mut state, _) = new_match();
    let mut damaged = record("CANNON", 0, 0);
    damaged.level = 2;
    damaged.hp = 123.0;
    state.apply_remote(&Action::PlaceBuilding { building: damaged }).unwrap();

    let cannon = &state.opponent().buildings()[1];
    assert_eq!(cannon.level(), 2);
    assert_eq!(cannon.hp(), 123.0);
    assert!(cannon.max_hp() > 600.0);
}

#[test]
fn test_troop_without_targets_stays_idle() {
    let (mut state, now) = new_match();
    let empty = BaseSnapshot {
        buildings: Vec::new(),
        gold: 1000.0,
        elixir: 1000.0,
    };
    let snapshot = MatchSnapshot {
        player_base: state.player().to_snapshot(),
        opponent_base: empty,
    };
    state.restore(&snapshot).unwrap();

    let start = Vec2::new(3.0, 4.0);
    assert!(state.deploy_troop(start));
    for _ in 0..50 {
        state.tick_at(0.1, now);
    }

    let troop = &state.player_troops()[0];
    assert_eq!(troop.position(), start);
    assert_eq!(troop.target(), None);
    assert_eq!(troop.hp(), 100.0);
}

#[test]
fn test_troop_on_top_of_building_attacks_without_moving() {
    let (mut state, now) = new_match();
    state.ingest_remote_building(&record("GOLDMINE", 2, 2)).unwrap();

    let start = Vec2::new(2.0, 2.0);
    assert!(state.deploy_troop(start));
    state.tick_at(1.0, now);

    assert_eq!(state.player_troops()[0].position(), start);
    assert_eq!(state.player_troops()[0].target(), Some(1));
    assert_eq!(state.opponent().buildings()[1].hp(), 485.0);
}

#[test]
fn test_raid_levels_the_opponent_base() {
    let (tx, rx) = event_channel(4096);
    let (state, now) = new_match();
    let mut state = state.with_events(tx);
    state.ingest_remote_building(&record("GOLDMINE", 0, 0)).unwrap();

    for _ in 0..10 {
        assert!(state.deploy_troop(Vec2::new(1.0, 1.0)));
    }
    // Ten barbarians at 150 dps: the mine, then the 2000 hp town hall.
    for _ in 0..400 {
        state.tick_at(0.1, now);
    }

    assert!(state.opponent().buildings().iter().all(|b| b.is_destroyed()));
    let destroyed: Vec<usize> = rx
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            MatchEvent::BuildingDestroyed {
                side: Side::Opponent,
                index,
            } => Some(index),
            _ => None,
        })
        .collect();
    assert_eq!(destroyed, vec![1, 0]);
    assert!(state.player_troops().iter().all(|t| t.target().is_none() || t.target() == Some(0)));
}

#[test]
fn test_remote_troops_attack_player_base() {
    let (mut state, now) = new_match();
    assert!(state.start_placing("GOLDMINE"));
    assert!(state.place_building(GridPos::new(0, 0)));
    state
        .apply_remote(&Action::DeployTroop {
            position: Vec2::new(0.0, 0.0),
            troop_type: "BARBARIAN".to_string(),
        })
        .unwrap();

    state.tick_at(1.0, now);
    assert_eq!(state.player().buildings()[1].hp(), 485.0);
    assert_eq!(state.opponent().buildings()[0].hp(), 2000.0);
}

#[test]
fn test_upgrade_raises_level_and_heals() {
    let (mut state, _) = new_match();
    let before = state.player().buildings()[0].max_hp();
    state.upgrade_building(0).unwrap();

    let hall = &state.player().buildings()[0];
    assert_eq!(hall.level(), 2);
    assert!(hall.max_hp() > before);
    assert_eq!(hall.hp(), hall.max_hp());
    assert_eq!(state.player().gold(), 1000.0);
    assert!(matches!(state.upgrade_building(9), Err(GameError::BuildingNotFound(9))));
}

#[test]
fn test_snapshot_file_round_trip() {
    let path = std::env::temp_dir().join(format!("miniclans_match_{}.json", std::process::id()));
    let (mut state, _) = new_match();
    assert!(state.start_placing("ELIXIR"));
    assert!(state.place_building(GridPos::new(12, 12)));
    state.ingest_remote_building(&record("CANNON", 1, 1)).unwrap();
    state.save(&path).unwrap();

    let (mut restored, _) = new_match();
    assert!(restored.load(&path).unwrap());
    assert_eq!(restored.snapshot(), state.snapshot());
    std::fs::remove_file(&path).unwrap();

    assert!(!restored.load(&path).unwrap());
}

#[test]
fn test_far_off_grid_remote_building() {
    let line = br#"{"action":"place_building","building":{"type":"GOLDMINE","position":[2147483647,0],"level":1,"hp":500.0}}"#;
    let action = miniclans::networking::codec::decode(line).unwrap();

    let (state, _) = new_match();
    let mut validating = state.with_policy(RemotePolicy::Validating);
    assert!(matches!(
        validating.apply_remote(&action),
        Err(GameError::InvalidPlacement { x: i32::MAX, y: 0, .. })
    ));
    assert_eq!(validating.opponent().buildings().len(), 1);

    // Trusting keeps it; later overlap checks against it must still hold up.
    let (mut trusting, now) = new_match();
    trusting.apply_remote(&action).unwrap();
    assert!(trusting.opponent().can_place(GridPos::new(0, 0), 2));
    assert!(!trusting.opponent().can_place(GridPos::new(i32::MAX - 1, 0), 2));
    assert!(trusting.deploy_troop(Vec2::new(0.0, 0.0)));
    trusting.tick_at(0.1, now);
    assert_eq!(trusting.player_troops().len(), 1);
}

#[test]
fn test_random_play_keeps_invariants() {
    const KINDS: [&str; 5] = ["GOLDMINE", "ELIXIR", "CANNON", "STORAGE", "TOWNHALL"];
    const TROOPS: [&str; 2] = ["BARBARIAN", "ARCHER"];

    for seed in 0..20 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (state, start) = new_match();
        let mut state = state.with_policy(RemotePolicy::Validating);
        let mut now = start;

        for _ in 0..300 {
            match rng.gen_range(0..6) {
                0 => {
                    if state.start_placing(KINDS[rng.gen_range(0..KINDS.len())]) {
                        let _ = state.place_building(GridPos::new(
                            rng.gen_range(-2..17),
                            rng.gen_range(-2..17),
                        ));
                    }
                }
                1 => {
                    state.select_troop(TROOPS[rng.gen_range(0..TROOPS.len())]).unwrap();
                    let _ = state.deploy_troop(Vec2::new(
                        rng.gen_range(0.0..15.0),
                        rng.gen_range(0.0..15.0),
                    ));
                }
                2 => {
                    let _ = state.upgrade_building(rng.gen_range(0..8));
                }
                3 => {
                    let kind = KINDS[rng.gen_range(0..KINDS.len())];
                    let _ = state.ingest_remote_building(&record(
                        kind,
                        rng.gen_range(-2..17),
                        rng.gen_range(-2..17),
                    ));
                }
                4 => {
                    let _ = state.ingest_remote_troop(
                        Vec2::new(rng.gen_range(-3.0..18.0), rng.gen_range(-3.0..18.0)),
                        TROOPS[rng.gen_range(0..TROOPS.len())],
                    );
                }
                _ => {
                    now += Duration::from_millis(rng.gen_range(0..500));
                    state.tick_at(rng.gen_range(0.0..0.1), now);
                }
            }

            assert!(state.player().gold() >= 0.0, "seed {seed}");
            assert!(state.player().elixir() >= 0.0, "seed {seed}");
            assert!(state.player_troops().iter().all(|t| !t.is_dead()));
            assert!(state.opponent_troops().iter().all(|t| !t.is_dead()));
        }

        for base in [state.player(), state.opponent()] {
            let buildings = base.buildings();
            for (i, a) in buildings.iter().enumerate() {
                let p = a.position();
                assert!(p.x >= 0 && p.y >= 0, "seed {seed}");
                assert!(p.x + a.size() <= 15 && p.y + a.size() <= 15, "seed {seed}");
                assert!(a.hp() <= a.max_hp(), "seed {seed}");
                for b in &buildings[i + 1..] {
                    assert!(
                        !footprints_overlap(p, a.size(), b.position(), b.size()),
                        "seed {seed}: {:?} overlaps {:?}",
                        p,
                        b.position()
                    );
                }
            }
        }
    }
}
