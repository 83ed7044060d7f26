//! Fixed-step battle loop.

use std::path::Path;

use contraption_core::{
    ArenaLayout, BodyCategory, BodyHandle, BodySpec, ConstraintSpec, FrameRenderer, PhysicsWorld,
    Scene, SceneBody, SceneSpring, Shape, Team,
};
use contraption_system_assembler::{Assembler, BodyGraph};
use contraption_system_builder::BuildGrid;
use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{
    config::SimulationConfig,
    debris::DebrisSpawner,
    error::SimulationError,
    frames::{FrameSink, FrameStore},
    welds::{break_stretched_welds, ActiveWeld},
};

/// Lifecycle of a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulationState {
    /// Steps remain and nobody has lost.
    Running,
    /// A player touched the ground; the other team won.
    WonByContact(Team),
    /// Every step ran without a winner.
    Exhausted,
}

/// Final result of a completed battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulationOutcome {
    /// The opponent's player touched the ground.
    WonByContact {
        /// Team whose player stayed off the ground.
        winner: Team,
        /// Zero-based step during which the losing contact started.
        step: u32,
    },
    /// The battle ran its full length.
    Exhausted,
}

impl SimulationOutcome {
    /// Winning team, if any.
    #[must_use]
    pub const fn winner(&self) -> Option<Team> {
        match self {
            Self::WonByContact { winner, .. } => Some(*winner),
            Self::Exhausted => None,
        }
    }

    /// Short announcement of the result.
    #[must_use]
    pub fn headline(&self) -> String {
        match self {
            Self::WonByContact { winner, .. } => format!("{} Team Wins!", winner.label()),
            Self::Exhausted => String::from("Battle finished!"),
        }
    }
}

/// Summary of a completed battle.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationReport {
    /// How the battle ended.
    pub outcome: SimulationOutcome,
    /// Frame files written, including the victory overlay.
    pub frames_written: u32,
    /// Physics steps executed.
    pub steps_executed: u32,
    /// Welds broken, indexed by [`Team::index`].
    pub welds_broken: [u32; 2],
    /// Debris bodies spawned.
    pub debris_spawned: u32,
    /// Simulated seconds covered by the captured frames.
    pub captured_secs: f32,
}

impl SimulationReport {
    /// Welds broken on `team`'s contraption.
    #[must_use]
    pub const fn welds_broken_for(&self, team: Team) -> u32 {
        self.welds_broken[team.index()]
    }
}

#[derive(Clone, Copy, Debug)]
struct TrackedBody {
    handle: BodyHandle,
    category: BodyCategory,
    team: Option<Team>,
    shape: Shape,
}

#[derive(Clone, Copy, Debug)]
struct TrackedSpring {
    a: BodyHandle,
    b: BodyHandle,
}

#[derive(Debug, Default)]
struct Contraption {
    player: Option<BodyHandle>,
    wheels: Vec<BodyHandle>,
    welds: Vec<ActiveWeld>,
}

/// Mutable state of one battle in progress.
struct Battle<W> {
    world: W,
    bodies: Vec<TrackedBody>,
    springs: Vec<TrackedSpring>,
    teams: [Contraption; 2],
    ground: BodyHandle,
    state: SimulationState,
}

impl<W: PhysicsWorld> Battle<W> {
    fn new(mut world: W, layout: &ArenaLayout) -> Result<Self, SimulationError> {
        let ground_spec = BodySpec::new(
            Shape::Rect {
                width: layout.width,
                height: layout.ground_height,
            },
            Vec2::new(layout.center_x(), layout.height - layout.ground_height / 2.0),
            BodyCategory::Ground,
        );
        let ground = world.add_body(&ground_spec)?;
        let mut battle = Self {
            world,
            bodies: Vec::new(),
            springs: Vec::new(),
            teams: [Contraption::default(), Contraption::default()],
            ground,
            state: SimulationState::Running,
        };
        battle.track(ground, &ground_spec, None);

        let wall_shape = Shape::Rect {
            width: layout.ground_height,
            height: layout.height,
        };
        let half = layout.ground_height / 2.0;
        for x in [-half, layout.width + half] {
            let spec = BodySpec::new(
                wall_shape,
                Vec2::new(x, layout.height / 2.0),
                BodyCategory::Wall,
            );
            let handle = battle.world.add_body(&spec)?;
            battle.track(handle, &spec, None);
        }
        Ok(battle)
    }

    fn track(&mut self, handle: BodyHandle, spec: &BodySpec, team: Option<Team>) {
        self.bodies.push(TrackedBody {
            handle,
            category: spec.category,
            team,
            shape: spec.shape,
        });
    }

    fn instantiate(
        &mut self,
        graph: &BodyGraph,
        config: &SimulationConfig,
    ) -> Result<(), SimulationError> {
        let team = graph.team;
        let mut handles = Vec::with_capacity(graph.bodies.len());
        for body in &graph.bodies {
            let spec = BodySpec::new(body.shape, body.position, body.category);
            let handle = self.world.add_body(&spec)?;
            self.track(handle, &spec, Some(team));
            handles.push(handle);
        }

        let contraption = &mut self.teams[team.index()];
        contraption.player = graph.player().map(|id| handles[id.index()]);

        for weld in &graph.welds {
            let (a, b) = (handles[weld.a.index()], handles[weld.b.index()]);
            let handle = self.world.add_constraint(&ConstraintSpec::Weld {
                a,
                b,
                anchor_a: weld.anchor_a,
                anchor_b: weld.anchor_b,
            })?;
            contraption.welds.push(ActiveWeld {
                handle,
                a,
                b,
                anchor_a: weld.anchor_a,
                anchor_b: weld.anchor_b,
            });
        }

        for spring in &graph.springs {
            let (a, b) = (handles[spring.a.index()], handles[spring.b.index()]);
            let _ = self.world.add_constraint(&ConstraintSpec::Spring {
                a,
                b,
                rest_length: spring.rest_length,
                stiffness: config.spring_stiffness,
                damping: config.spring_damping,
            })?;
            self.springs.push(TrackedSpring { a, b });
        }

        for drive in &graph.wheels {
            let wheel = handles[drive.wheel.index()];
            contraption.wheels.push(wheel);
            if let Some(anchor) = drive.anchor {
                let _ = self.world.add_constraint(&ConstraintSpec::Pin {
                    a: handles[anchor.body.index()],
                    b: wheel,
                    anchor_a: anchor.anchor,
                    anchor_b: Vec2::ZERO,
                })?;
            }
        }
        Ok(())
    }

    fn drive_wheels(&mut self, torque: f32) -> Result<(), SimulationError> {
        for team in Team::ALL {
            let signed = match team {
                Team::Green => torque,
                Team::Purple => -torque,
            };
            for &wheel in &self.teams[team.index()].wheels {
                self.world.apply_torque(wheel, signed)?;
            }
        }
        Ok(())
    }

    fn break_welds(&mut self, threshold: f32, tally: &mut [u32; 2]) -> Result<(), SimulationError> {
        for team in Team::ALL {
            let welds = &mut self.teams[team.index()].welds;
            tally[team.index()] += break_stretched_welds(&mut self.world, welds, threshold)?;
        }
        Ok(())
    }

    fn detect_ground_contact(&mut self) {
        let contacts = self.world.drain_contact_starts();
        if self.state != SimulationState::Running {
            return;
        }
        let ground = self.ground;
        for contact in contacts {
            if !contact.involves(ground) {
                continue;
            }
            let loser = Team::ALL.into_iter().find(|team| {
                self.teams[team.index()]
                    .player
                    .is_some_and(|player| contact.involves(player))
            });
            if let Some(loser) = loser {
                self.state = SimulationState::WonByContact(loser.opponent());
                return;
            }
        }
    }

    fn scene(&self) -> Result<Scene, SimulationError> {
        let mut scene = Scene::default();
        for body in &self.bodies {
            scene.bodies.push(SceneBody::new(
                body.category,
                body.team,
                body.shape,
                self.world.pose(body.handle)?,
            ));
        }
        for spring in &self.springs {
            let from = self.world.pose(spring.a)?;
            let to = self.world.pose(spring.b)?;
            scene.springs.push(SceneSpring::new(from.position, to.position));
        }
        Ok(scene)
    }
}

/// Runs a full battle between two confirmed contraptions.
///
/// One frame is rendered, written to `frame_dir` and handed to `sink` per
/// step. When a player touches the ground the battle stops after that step's
/// frame and one extra victory frame follows.
pub fn run_simulation<W, R, S>(
    green: &BuildGrid,
    purple: &BuildGrid,
    world: W,
    renderer: &mut R,
    config: &SimulationConfig,
    frame_dir: &Path,
    mut sink: S,
) -> Result<SimulationReport, SimulationError>
where
    W: PhysicsWorld,
    R: FrameRenderer + ?Sized,
    S: FrameSink,
{
    config.validate()?;
    for (team, grid) in [(Team::Green, green), (Team::Purple, purple)] {
        if grid.validate_for_battle().is_err() {
            return Err(SimulationError::MissingPlayer { team: team.label() });
        }
    }

    let assembler = Assembler::with_layout(config.layout);
    let mut battle = Battle::new(world, &config.layout)?;
    battle.instantiate(
        &assembler.assemble(green, Team::Green, -config.team_offset),
        config,
    )?;
    battle.instantiate(
        &assembler.assemble(purple, Team::Purple, config.team_offset),
        config,
    )?;

    let rng = match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let mut spawner =
        DebrisSpawner::new(config.debris.clone(), config.debris_interval_steps(), rng);
    let mut store = FrameStore::new(frame_dir);

    let total_steps = config.total_steps();
    let dt = config.timestep();
    let threshold = config.weld_break_distance();
    let mut welds_broken = [0; 2];
    let mut debris_spawned = 0;
    let mut steps_executed = 0;
    let mut last_frame = None;

    log::info!(
        "battle started: {total_steps} steps at {} fps, {} bodies",
        config.frame_rate,
        battle.bodies.len()
    );

    for step in 0..total_steps {
        battle.drive_wheels(config.wheel_torque)?;
        battle.break_welds(threshold, &mut welds_broken)?;

        if spawner.is_due(step) {
            let fraction = step as f32 * dt / config.duration_secs;
            let spec = spawner.next(fraction, &config.layout);
            let handle = battle.world.add_body(&spec)?;
            battle.track(handle, &spec, None);
            debris_spawned += 1;
            log::debug!(
                "debris spawned at x={:.1} with mass {:.1}",
                spec.position.x,
                spec.mass.unwrap_or_default()
            );
        }

        battle.world.step(dt)?;
        steps_executed += 1;
        battle.detect_ground_contact();

        let frame = renderer.render(&battle.scene()?)?;
        let _ = store.write(&frame)?;
        sink.deliver(&frame, step as f32 / total_steps as f32)?;
        last_frame = Some(frame);

        if let SimulationState::WonByContact(winner) = battle.state {
            log::info!("{} player touched the ground on step {step}", winner.opponent().label());
            break;
        }
    }

    if battle.state == SimulationState::Running {
        battle.state = SimulationState::Exhausted;
    }
    let outcome = match battle.state {
        SimulationState::WonByContact(winner) => {
            if let Some(last) = &last_frame {
                let overlay = renderer.victory_overlay(last, winner)?;
                let _ = store.write(&overlay)?;
                sink.deliver(&overlay, 1.0)?;
            }
            SimulationOutcome::WonByContact {
                winner,
                step: steps_executed - 1,
            }
        }
        SimulationState::Running | SimulationState::Exhausted => SimulationOutcome::Exhausted,
    };

    let report = SimulationReport {
        outcome,
        frames_written: store.written(),
        steps_executed,
        welds_broken,
        debris_spawned,
        captured_secs: store.written() as f32 / config.frame_rate as f32,
    };
    log::info!(
        "{} after {} steps, {} frames, welds broken green={} purple={}",
        outcome.headline(),
        report.steps_executed,
        report.frames_written,
        welds_broken[0],
        welds_broken[1]
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headline_names_the_winner() {
        let outcome = SimulationOutcome::WonByContact {
            winner: Team::Purple,
            step: 4,
        };
        assert_eq!(outcome.headline(), "Purple Team Wins!");
        assert_eq!(outcome.winner(), Some(Team::Purple));
        assert_eq!(SimulationOutcome::Exhausted.headline(), "Battle finished!");
        assert_eq!(SimulationOutcome::Exhausted.winner(), None);
    }
}
