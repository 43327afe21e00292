//! # Match State
//!
//! Everything one peer knows about a match: its own base, a mirror of the
//! opponent's base, and the two troop rosters.
//!
//! ## Who Attacks What
//!
//! ```text
//!   player_troops ────────> opponent base     (deployed locally)
//!   opponent_troops ──────> player base       (announced by the peer)
//!   player defenses ──────> opponent_troops
//!   opponent defenses ────> player_troops
//! ```
//!
//! ## Tick Order
//!
//! 1. player base accrual, then opponent base accrual
//! 2. player troops, oldest first
//! 3. opponent troops, oldest first
//! 4. player defenses, then opponent defenses
//! 5. troops at zero hit points leave their roster
//!
//! The order is fixed, but the two peers simulate independently and may
//! drift apart. Nothing here tries to reconcile them.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use miniclans_economy::{
    Base, BaseSettings, BuildingKind, Catalog, GameError, GameResult, MatchSnapshot,
    PlacementError, TroopKind,
};
use miniclans_shared::constants::DEFAULT_TROOP;
use miniclans_shared::{Action, BuildingRecord, GridPos, Vec2};

use crate::events::{EventSender, MatchEvent, Side};
use crate::gameplay::{self, Battery, Troop, TroopStep};

/// How actions from the peer are checked before they are applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemotePolicy {
    /// Apply whatever the peer sends. Only unknown kinds are refused.
    #[default]
    Trusting,
    /// Also refuse placements that leave the grid or overlap, and troops
    /// deployed off the grid.
    Validating,
}

/// Authoritative local state of a match.
pub struct MatchState {
    catalog: Arc<Catalog>,
    settings: BaseSettings,
    player: Base,
    opponent: Base,
    player_troops: Vec<Troop>,
    opponent_troops: Vec<Troop>,
    placing: Option<Arc<BuildingKind>>,
    selected_troop: Arc<TroopKind>,
    player_battery: Battery,
    opponent_battery: Battery,
    policy: RemotePolicy,
    defenses: bool,
    events: Option<EventSender>,
}

impl MatchState {
    /// Starts a match with two fresh bases.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` if the catalog lacks the town hall or the
    /// default troop.
    pub fn new(catalog: Arc<Catalog>, settings: BaseSettings) -> GameResult<Self> {
        Self::new_at(catalog, settings, Instant::now())
    }

    /// Starts a match with resource accrual anchored at `now`.
    ///
    /// # Errors
    ///
    /// Same as [`MatchState::new`].
    pub fn new_at(catalog: Arc<Catalog>, settings: BaseSettings, now: Instant) -> GameResult<Self> {
        let player = Base::new(&catalog, settings, now)?;
        let opponent = Base::new(&catalog, settings, now)?;
        let selected_troop = catalog.troop(DEFAULT_TROOP)?;

        Ok(Self {
            catalog,
            settings,
            player,
            opponent,
            player_troops: Vec::with_capacity(64),
            opponent_troops: Vec::with_capacity(64),
            placing: None,
            selected_troop,
            player_battery: Battery::new(),
            opponent_battery: Battery::new(),
            policy: RemotePolicy::default(),
            defenses: false,
            events: None,
        })
    }

    /// Sets how peer actions are checked.
    #[must_use]
    pub fn with_policy(mut self, policy: RemotePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Lets cannons shoot at enemy troops. Off by default.
    #[must_use]
    pub fn with_defenses(mut self, enabled: bool) -> Self {
        self.defenses = enabled;
        self
    }

    /// Emits match events to `sender` from now on.
    #[must_use]
    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The local player's base.
    #[must_use]
    pub const fn player(&self) -> &Base {
        &self.player
    }

    /// The mirrored opponent base.
    #[must_use]
    pub const fn opponent(&self) -> &Base {
        &self.opponent
    }

    /// Troops deployed by the local player.
    #[must_use]
    pub fn player_troops(&self) -> &[Troop] {
        &self.player_troops
    }

    /// Troops deployed by the peer.
    #[must_use]
    pub fn opponent_troops(&self) -> &[Troop] {
        &self.opponent_troops
    }

    /// The kind catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Building kind awaiting placement, if any.
    #[must_use]
    pub fn placing(&self) -> Option<&BuildingKind> {
        self.placing.as_deref()
    }

    /// Troop kind used by `deploy_troop`.
    #[must_use]
    pub fn selected_troop(&self) -> &TroopKind {
        &self.selected_troop
    }

    /// Current remote policy.
    #[must_use]
    pub const fn policy(&self) -> RemotePolicy {
        self.policy
    }

    /// Whether cannons fire during `tick_at`.
    #[must_use]
    pub const fn defenses(&self) -> bool {
        self.defenses
    }

    // =========================================================================
    // Local intents
    // =========================================================================

    /// Selects a building kind for placement if the player can afford it.
    ///
    /// Returns false, leaving any previous selection alone, for unknown or
    /// unaffordable kinds.
    pub fn start_placing(&mut self, kind: &str) -> bool {
        let kind = match self.catalog.building(kind) {
            Ok(kind) => kind,
            Err(e) => {
                tracing::debug!(error = %e, "cannot start placing");
                return false;
            }
        };
        if !self.player.can_afford(kind.as_ref()) {
            tracing::debug!(kind = %kind.name, "cannot afford building");
            return false;
        }
        self.placing = Some(kind);
        true
    }

    /// Drops the building selection.
    pub fn cancel_placing(&mut self) {
        self.placing = None;
    }

    /// Buys and places the selected building at `position`.
    ///
    /// Returns false and changes nothing if no building is selected, the
    /// spot is invalid, or the player cannot pay. On success the selection
    /// is cleared; announcing the placement to the peer is the caller's job.
    pub fn place_building(&mut self, position: GridPos) -> bool {
        let Some(kind) = self.placing.clone() else {
            tracing::debug!("no building selected");
            return false;
        };

        let placed = self
            .player
            .check_placement(position, kind.size)
            .and_then(|()| self.player.purchase(kind.as_ref()));
        if let Err(e) = placed {
            tracing::debug!(error = %e, kind = %kind.name, "placement refused");
            return false;
        }

        self.player.add_building(Arc::clone(&kind), position, 1);
        self.placing = None;
        let index = self.player.buildings().len() - 1;
        tracing::debug!(kind = %kind.name, x = position.x, y = position.y, "building placed");
        self.emit(MatchEvent::BuildingPlaced {
            side: Side::Player,
            index,
            kind: kind.name.clone(),
            position,
        });
        true
    }

    /// Selects the troop kind used by `deploy_troop`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` and keeps the current selection for names that
    /// are not troops.
    pub fn select_troop(&mut self, kind: &str) -> GameResult<()> {
        self.selected_troop = self.catalog.troop(kind)?;
        Ok(())
    }

    /// Pays for and deploys the selected troop at `position`.
    ///
    /// Returns false and changes nothing if the elixir does not cover it.
    pub fn deploy_troop(&mut self, position: Vec2) -> bool {
        let kind = Arc::clone(&self.selected_troop);
        if let Err(e) = self.player.purchase(kind.as_ref()) {
            tracing::debug!(error = %e, kind = %kind.name, "deploy refused");
            return false;
        }

        self.emit(MatchEvent::TroopDeployed {
            side: Side::Player,
            kind: kind.name.clone(),
            position,
        });
        self.player_troops.push(Troop::new(kind, position));
        true
    }

    /// Upgrades one of the player's buildings. Upgrades are free.
    ///
    /// # Errors
    ///
    /// Returns `BuildingNotFound` or `MaxLevelReached`.
    pub fn upgrade_building(&mut self, index: usize) -> GameResult<()> {
        self.player.upgrade(index)?;
        let level = self.player.buildings()[index].level();
        self.emit(MatchEvent::BuildingUpgraded {
            side: Side::Player,
            index,
            level,
        });
        Ok(())
    }

    // =========================================================================
    // Remote actions
    // =========================================================================

    /// Mirrors a building the peer placed in its own base.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` for kinds missing from the catalog and, under
    /// the validating policy, `InvalidPlacement` for illegal spots. The
    /// opponent base is unchanged on error.
    pub fn ingest_remote_building(&mut self, record: &BuildingRecord) -> GameResult<()> {
        let kind = self.catalog.building(&record.kind)?;
        if self.policy == RemotePolicy::Validating {
            self.opponent.check_placement(record.position, kind.size)?;
        }

        self.opponent.add_building_record(record, &self.catalog)?;
        let index = self.opponent.buildings().len() - 1;
        tracing::debug!(kind = %record.kind, x = record.position.x, y = record.position.y, "remote building");
        self.emit(MatchEvent::BuildingPlaced {
            side: Side::Opponent,
            index,
            kind: record.kind.clone(),
            position: record.position,
        });
        Ok(())
    }

    /// Adds a troop the peer deployed against the player's base.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` for kinds missing from the catalog and, under
    /// the validating policy, `InvalidPlacement` for points off the grid.
    pub fn ingest_remote_troop(&mut self, position: Vec2, kind: &str) -> GameResult<()> {
        let kind = self.catalog.troop(kind)?;
        if self.policy == RemotePolicy::Validating && !self.on_grid(position) {
            // Float to cell truncation is the intent here.
            #[allow(clippy::cast_possible_truncation)]
            let (x, y) = (position.x.floor() as i32, position.y.floor() as i32);
            return Err(GameError::InvalidPlacement {
                x,
                y,
                reason: PlacementError::OutOfBounds {
                    width: self.settings.grid_width,
                    height: self.settings.grid_height,
                },
            });
        }

        tracing::debug!(kind = %kind.name, x = position.x, y = position.y, "remote troop");
        self.emit(MatchEvent::TroopDeployed {
            side: Side::Opponent,
            kind: kind.name.clone(),
            position,
        });
        self.opponent_troops.push(Troop::new(kind, position));
        Ok(())
    }

    /// Applies one decoded wire action.
    ///
    /// # Errors
    ///
    /// Returns the ingest error; the rejection is also logged and emitted.
    pub fn apply_remote(&mut self, action: &Action) -> GameResult<()> {
        let result = match action {
            Action::PlaceBuilding { building } => self.ingest_remote_building(building),
            Action::DeployTroop {
                position,
                troop_type,
            } => self.ingest_remote_troop(*position, troop_type),
            Action::ReadyToAttack => {
                tracing::info!("peer is ready to attack");
                self.emit(MatchEvent::PeerReady);
                Ok(())
            }
        };

        if let Err(e) = &result {
            tracing::warn!(action = action.name(), error = %e, "remote action rejected");
            self.emit(MatchEvent::RemoteActionRejected {
                action: action.name(),
                reason: e.to_string(),
            });
        }
        result
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    /// Advances the match by `dt` seconds, accruing up to now.
    pub fn tick(&mut self, dt: f32) {
        self.tick_at(dt, Instant::now());
    }

    /// Advances the match by `dt` seconds, accruing up to `now`.
    pub fn tick_at(&mut self, dt: f32, now: Instant) {
        self.player.accrue_resources(now);
        self.opponent.accrue_resources(now);

        let events = self.events.as_ref();
        advance_roster(&mut self.player_troops, dt, &mut self.opponent, Side::Opponent, events);
        advance_roster(&mut self.opponent_troops, dt, &mut self.player, Side::Player, events);

        if self.defenses {
            self.player_battery
                .fire(dt, self.player.buildings(), &mut self.opponent_troops);
            self.opponent_battery
                .fire(dt, self.opponent.buildings(), &mut self.player_troops);
        }

        drop_dead(&mut self.player_troops, Side::Player, events);
        drop_dead(&mut self.opponent_troops, Side::Opponent, events);
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Both bases as a snapshot. Troops are not included.
    #[must_use]
    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            player_base: self.player.to_snapshot(),
            opponent_base: self.opponent.to_snapshot(),
        }
    }

    /// Replaces both bases with a snapshot and clears rosters and selections.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` and leaves the match unchanged if the snapshot
    /// names a kind the catalog lacks.
    pub fn restore(&mut self, snapshot: &MatchSnapshot) -> GameResult<()> {
        let now = Instant::now();
        let player = Base::from_snapshot(&snapshot.player_base, &self.catalog, self.settings, now)?;
        let opponent =
            Base::from_snapshot(&snapshot.opponent_base, &self.catalog, self.settings, now)?;

        self.player = player;
        self.opponent = opponent;
        self.player_troops.clear();
        self.opponent_troops.clear();
        self.placing = None;
        self.player_battery.reset();
        self.opponent_battery.reset();
        Ok(())
    }

    /// Writes the snapshot to `path`.
    ///
    /// # Errors
    ///
    /// Returns `Snapshot` if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> GameResult<()> {
        self.snapshot().save(path)
    }

    /// Loads and restores a snapshot. Returns false if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns `Snapshot` for unreadable files and `UnknownKind` for
    /// snapshots naming unknown kinds.
    pub fn load(&mut self, path: impl AsRef<Path>) -> GameResult<bool> {
        match MatchSnapshot::load(path)? {
            Some(snapshot) => {
                self.restore(&snapshot)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn on_grid(&self, p: Vec2) -> bool {
        #[allow(clippy::cast_precision_loss)]
        let (w, h) = (self.settings.grid_width as f32, self.settings.grid_height as f32);
        p.x.is_finite() && p.y.is_finite() && p.x >= 0.0 && p.y >= 0.0 && p.x <= w && p.y <= h
    }

    fn emit(&self, event: MatchEvent) {
        if let Some(events) = &self.events {
            events.send(event);
        }
    }
}

impl std::fmt::Debug for MatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchState")
            .field("player_buildings", &self.player.buildings().len())
            .field("opponent_buildings", &self.opponent.buildings().len())
            .field("player_troops", &self.player_troops.len())
            .field("opponent_troops", &self.opponent_troops.len())
            .field("policy", &self.policy)
            .field("defenses", &self.defenses)
            .finish_non_exhaustive()
    }
}

/// Runs every troop of a roster against the base it attacks.
fn advance_roster(
    troops: &mut [Troop],
    dt: f32,
    target_base: &mut Base,
    target_side: Side,
    events: Option<&EventSender>,
) {
    for troop in troops.iter_mut() {
        if let TroopStep::Attacked {
            target,
            destroyed: true,
        } = gameplay::update(troop, dt, target_base.buildings_mut())
        {
            tracing::debug!(side = ?target_side, index = target, "building destroyed");
            if let Some(events) = events {
                events.send(MatchEvent::BuildingDestroyed {
                    side: target_side,
                    index: target,
                });
            }
        }
    }
}

/// Removes dead troops, keeping the survivors in order.
fn drop_dead(troops: &mut Vec<Troop>, side: Side, events: Option<&EventSender>) {
    troops.retain(|troop| {
        if !troop.is_dead() {
            return true;
        }
        if let Some(events) = events {
            events.send(MatchEvent::TroopDied {
                side,
                kind: troop.kind().name.clone(),
                position: troop.position(),
            });
        }
        false
    });
}
