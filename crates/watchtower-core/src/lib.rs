//! Wandering-agent world driven by the watchtower index.
//!
//! Agents drift around a bounded world with a random walk, and every move is
//! fed through a [`TowerGrid`]. Each agent's listener keeps a [`VisibleSet`]
//! of what it can currently see, plus running enter/leave counters that the
//! world folds into per-tick summaries.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, trace};
use watchtower_index::{
    AoiListener, Entity, EntityId, GridConfig, GridError, Neighbor, Position, TowerGrid,
    VisibleSet,
};

/// Simulation tick counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Tick(pub u64);

impl Tick {
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Velocity in world units per tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    #[must_use]
    pub const fn new(vx: f32, vy: f32) -> Self {
        Self { vx, vy }
    }

    #[must_use]
    pub fn speed(&self) -> f32 {
        self.vx.hypot(self.vy)
    }

    /// Scale down to `max` if faster.
    #[must_use]
    pub fn limited(self, max: f32) -> Self {
        let speed = self.speed();
        if speed <= max || speed == 0.0 {
            return self;
        }
        let scale = max / speed;
        Self::new(self.vx * scale, self.vy * scale)
    }
}

/// Payload carried by every agent in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentData {
    pub velocity: Velocity,
}

/// Listener that mirrors an agent's visible neighbors and counts changes.
#[derive(Debug, Clone, Default)]
pub struct NeighborTracker {
    visible: VisibleSet,
    enters: u64,
    leaves: u64,
}

impl NeighborTracker {
    #[must_use]
    pub fn visible(&self) -> &VisibleSet {
        &self.visible
    }

    /// Enter notifications received so far.
    #[must_use]
    pub const fn enters(&self) -> u64 {
        self.enters
    }

    /// Leave notifications received so far.
    #[must_use]
    pub const fn leaves(&self) -> u64 {
        self.leaves
    }
}

impl AoiListener<AgentData> for NeighborTracker {
    fn on_enter(&mut self, other: Neighbor<'_, AgentData>) {
        self.enters += 1;
        self.visible.on_enter(other);
    }

    fn on_leave(&mut self, other: Neighbor<'_, AgentData>) {
        self.leaves += 1;
        self.visible.on_leave(other);
    }
}

/// Errors that can occur when constructing or stepping a world.
#[derive(Debug, Error)]
pub enum WorldStateError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// The index refused an operation.
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Static configuration for a simulated world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World bounds and cell size.
    pub grid: GridConfig,
    /// Number of agents spawned by [`World::populate`].
    pub agent_count: usize,
    /// Smallest interest radius handed out to agents.
    pub min_radius: f32,
    /// Largest interest radius handed out to agents.
    pub max_radius: f32,
    /// Upper bound on agent speed, in world units per tick.
    pub max_speed: f32,
    /// Fraction of `max_speed` added as random steering each tick.
    pub wander_strength: f32,
    /// Optional RNG seed for reproducible worlds.
    pub rng_seed: Option<u64>,
    /// Maximum number of recent tick summaries retained in-memory.
    pub history_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            agent_count: 256,
            min_radius: 30.0,
            max_radius: 90.0,
            max_speed: 6.0,
            wander_strength: 0.25,
            rng_seed: None,
            history_capacity: 256,
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<(), WorldStateError> {
        self.grid.validate()?;
        if !self.min_radius.is_finite() || self.min_radius < 0.0 {
            return Err(WorldStateError::InvalidConfig(
                "min_radius must be finite and non-negative",
            ));
        }
        if !self.max_radius.is_finite() || self.max_radius < self.min_radius {
            return Err(WorldStateError::InvalidConfig(
                "max_radius must be finite and at least min_radius",
            ));
        }
        if !self.max_speed.is_finite() || self.max_speed < 0.0 {
            return Err(WorldStateError::InvalidConfig(
                "max_speed must be finite and non-negative",
            ));
        }
        if !self.wander_strength.is_finite() || self.wander_strength < 0.0 {
            return Err(WorldStateError::InvalidConfig(
                "wander_strength must be finite and non-negative",
            ));
        }
        if self.history_capacity == 0 {
            return Err(WorldStateError::InvalidConfig(
                "history_capacity must be non-zero",
            ));
        }
        Ok(())
    }

    /// Returns the configured RNG seed, generating one from entropy if absent.
    fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

/// Aggregated visibility churn for a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSummary {
    pub tick: Tick,
    pub agents: usize,
    pub enters: u64,
    pub leaves: u64,
    /// Sum of every agent's visible-set size after the tick.
    pub visible_pairs: usize,
}

/// A bounded world of wandering agents.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    grid: TowerGrid<AgentData, NeighborTracker>,
    agents: Vec<EntityId>,
    rng: SmallRng,
    tick: Tick,
    history: VecDeque<TickSummary>,
}

impl World {
    pub fn new(config: WorldConfig) -> Result<Self, WorldStateError> {
        config.validate()?;
        let grid = TowerGrid::new(config.grid)?;
        let rng = config.seeded_rng();
        info!(
            cols = grid.layout().cols(),
            rows = grid.layout().rows(),
            seed = ?config.rng_seed,
            "world created"
        );
        Ok(Self {
            history: VecDeque::with_capacity(config.history_capacity),
            config,
            grid,
            agents: Vec::new(),
            rng,
            tick: Tick::zero(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    #[must_use]
    pub fn grid(&self) -> &TowerGrid<AgentData, NeighborTracker> {
        &self.grid
    }

    #[must_use]
    pub fn tick(&self) -> Tick {
        self.tick
    }

    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Agent handles in spawn order (modulo despawn swaps).
    pub fn agents(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.agents.iter().copied()
    }

    /// Recent tick summaries, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &TickSummary> + '_ {
        self.history.iter()
    }

    #[must_use]
    pub fn tracker(&self, id: EntityId) -> Option<&NeighborTracker> {
        self.grid.listener(id)
    }

    /// Entities currently visible to `id`.
    #[must_use]
    pub fn visible_from(&self, id: EntityId) -> Option<&VisibleSet> {
        self.tracker(id).map(NeighborTracker::visible)
    }

    /// Place one agent at `position`.
    pub fn spawn_agent(
        &mut self,
        position: Position,
        radius: f32,
        velocity: Velocity,
    ) -> Result<EntityId, WorldStateError> {
        let entity = Entity::new(radius, AgentData { velocity }, NeighborTracker::default());
        let id = self.grid.enter(entity, position)?;
        self.agents.push(id);
        Ok(id)
    }

    /// Spawn `config.agent_count` agents at uniformly random positions.
    pub fn populate(&mut self) -> Result<(), WorldStateError> {
        let bounds = self.config.grid;
        for _ in 0..self.config.agent_count {
            let position = Position::new(
                self.rng.random_range(bounds.min_x..=bounds.max_x),
                self.rng.random_range(bounds.min_y..=bounds.max_y),
            );
            let radius = if self.config.max_radius > self.config.min_radius {
                self.rng
                    .random_range(self.config.min_radius..self.config.max_radius)
            } else {
                self.config.min_radius
            };
            let heading = self.rng.random_range(0.0..std::f32::consts::TAU);
            let speed = self.rng.random_range(0.0..=self.config.max_speed);
            let velocity = Velocity::new(heading.cos() * speed, heading.sin() * speed);
            self.spawn_agent(position, radius, velocity)?;
        }
        debug!(agents = self.agents.len(), "world populated");
        Ok(())
    }

    /// Remove `id` from the world, returning its payload.
    pub fn despawn(&mut self, id: EntityId) -> Result<AgentData, WorldStateError> {
        let entity = self.grid.leave(id)?;
        if let Some(index) = self.agents.iter().position(|&agent| agent == id) {
            self.agents.swap_remove(index);
        }
        Ok(entity.payload)
    }

    /// Advance every agent by one random-walk step.
    pub fn step(&mut self) -> Result<TickSummary, WorldStateError> {
        let (enters_before, leaves_before) = self.churn_totals();
        let bounds = self.config.grid;
        let steer = self.config.max_speed * self.config.wander_strength;

        for index in 0..self.agents.len() {
            let id = self.agents[index];
            let (Some(position), Some(agent)) = (self.grid.position(id), self.grid.payload(id))
            else {
                continue;
            };
            let mut velocity = agent.velocity;
            if steer > 0.0 {
                velocity.vx += self.rng.random_range(-steer..=steer);
                velocity.vy += self.rng.random_range(-steer..=steer);
            }
            velocity = velocity.limited(self.config.max_speed);

            let (x, vx) = reflect(position.x + velocity.vx, velocity.vx, bounds.min_x, bounds.max_x);
            let (y, vy) = reflect(position.y + velocity.vy, velocity.vy, bounds.min_y, bounds.max_y);
            if let Some(agent) = self.grid.payload_mut(id) {
                agent.velocity = Velocity::new(vx, vy);
            }
            self.grid.moved(id, Position::new(x, y))?;
        }

        self.tick = self.tick.next();
        let (enters_after, leaves_after) = self.churn_totals();
        let summary = TickSummary {
            tick: self.tick,
            agents: self.agents.len(),
            enters: enters_after - enters_before,
            leaves: leaves_after - leaves_before,
            visible_pairs: self
                .agents
                .iter()
                .filter_map(|&id| self.grid.listener(id))
                .map(|tracker| tracker.visible().len())
                .sum(),
        };
        trace!(
            tick = summary.tick.0,
            enters = summary.enters,
            leaves = summary.leaves,
            "tick complete"
        );
        if self.history.len() == self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(summary);
        Ok(summary)
    }

    fn churn_totals(&self) -> (u64, u64) {
        self.agents
            .iter()
            .filter_map(|&id| self.grid.listener(id))
            .fold((0, 0), |(enters, leaves), tracker| {
                (enters + tracker.enters(), leaves + tracker.leaves())
            })
    }
}

/// Bounce `value` back inside `[min, max]`, flipping `velocity` on contact.
fn reflect(value: f32, velocity: f32, min: f32, max: f32) -> (f32, f32) {
    if value < min {
        ((min + (min - value)).min(max), velocity.abs())
    } else if value > max {
        ((max - (value - max)).max(min), -velocity.abs())
    } else {
        (value, velocity)
    }
}
