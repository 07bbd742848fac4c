//! Scene Lifecycle Controller
//!
//! Moves every scene towards its target state one command at a time.
//!
//! ```text
//!             subscribe        map          assign          show
//! Published ───────────► Subscribed ──► Mapped ──► MappedAndAssigned ──► Rendered
//!           ◄─────────── ▲            │        ◄── unmap ───┘  ◄──── hide ──┘
//!             unsubscribe└──── unmap ─┘
//! ```
//!
//! At most one command per scene is in flight. Target changes made while a
//! command is outstanding are picked up once its result arrives. A completed
//! unmap always continues with unsubscribe, even when the target is
//! `Subscribed`; the scene then subscribes again from `Published`.
//!
//! Results that do not match the outstanding command are protocol desyncs:
//! they are logged and dropped, never fatal.

use rustc_hash::FxHashMap;
use tessera_core::{
    DisplayAssignment, Event, EventDispatcher, RendererSceneState, SceneId, SceneState,
};

use crate::command::{CommandKind, CommandQueue, CommandResult, SceneCommand, SceneCommandExecutor};
use crate::settings::LifecycleSettings;

#[derive(Debug, Clone, Default)]
struct SceneRow {
    current: SceneState,
    target: SceneState,
    in_flight: Option<CommandKind>,
    /// Assignment the owner asked for, cached until the scene can take it.
    assignment: Option<DisplayAssignment>,
    /// Assignment sent with the outstanding assign command.
    requested: Option<DisplayAssignment>,
    /// Assignment last confirmed by the executor.
    applied: Option<DisplayAssignment>,
    reassign_pending: bool,
    unsubscribe_after_unmap: bool,
}

#[derive(Debug)]
pub struct SceneLifecycleController<E = CommandQueue> {
    rows: FxHashMap<SceneId, SceneRow>,
    executor: E,
    settings: LifecycleSettings,
}

impl Default for SceneLifecycleController<CommandQueue> {
    fn default() -> Self {
        Self::new(CommandQueue::new(), LifecycleSettings::default())
    }
}

impl<E: SceneCommandExecutor> SceneLifecycleController<E> {
    pub fn new(executor: E, settings: LifecycleSettings) -> Self {
        Self {
            rows: FxHashMap::default(),
            executor,
            settings,
        }
    }

    // ========================================================================
    // Owner input
    // ========================================================================

    /// The scene became available. Resets it to `Published` with no target
    /// beyond that; a cached display assignment is kept.
    pub fn scene_published(&mut self, scene: SceneId, events: &mut EventDispatcher) {
        let row = self.rows.entry(scene).or_default();
        if row.current != SceneState::Unpublished {
            log::warn!("{scene} published again while {:?}, resetting", row.current);
        }
        let changed = row.current != SceneState::Published;
        row.current = SceneState::Published;
        row.target = SceneState::Published;
        row.in_flight = None;
        row.requested = None;
        row.applied = None;
        row.reassign_pending = false;
        row.unsubscribe_after_unmap = false;
        if changed {
            events.push(Event::SceneStateChanged {
                scene,
                state: SceneState::Published,
            });
        }
    }

    /// The scene went away. Forces current and target to `Unpublished`;
    /// results for a command still in flight will be ignored. The owner's
    /// display assignment stays cached for the next publication.
    pub fn scene_unpublished(&mut self, scene: SceneId, events: &mut EventDispatcher) {
        let row = self.rows.entry(scene).or_default();
        let changed = row.current != SceneState::Unpublished;
        *row = SceneRow {
            assignment: row.assignment,
            ..SceneRow::default()
        };
        if changed {
            log::debug!("{scene} unpublished");
            events.push(Event::SceneStateChanged {
                scene,
                state: SceneState::Unpublished,
            });
        }
    }

    /// Sets the state the scene should converge to and issues the next
    /// command if none is outstanding.
    ///
    /// Accepts either an internal [`SceneState`] or a [`RendererSceneState`].
    /// Targets below `Published` are clamped: a scene cannot be unpublished
    /// from this side.
    pub fn set_target_state(&mut self, scene: SceneId, target: impl Into<SceneState>) {
        let target = target.into().max(SceneState::Published);
        let row = self.rows.entry(scene).or_default();
        if row.current == SceneState::Unpublished {
            log::debug!("{scene} is not published, target {target:?} waits for publication");
        }
        if row.target != target {
            log::trace!("{scene} target {:?} -> {target:?}", row.target);
            row.target = target;
        }
        self.evaluate(scene);
    }

    /// Sets the display buffer and render order of a scene.
    ///
    /// Applied immediately (as a new assign) when the scene is already
    /// assigned, otherwise cached and used once the scene gets mapped.
    pub fn set_display_buffer_assignment(&mut self, scene: SceneId, assignment: DisplayAssignment) {
        let row = self.rows.entry(scene).or_default();
        row.assignment = Some(assignment);
        if row.current >= SceneState::MappedAndAssigned {
            row.reassign_pending = row.applied != Some(assignment);
            self.evaluate(scene);
        } else {
            log::debug!("{scene} not assigned yet, caching {assignment:?}");
        }
    }

    // ========================================================================
    // Executor input
    // ========================================================================

    /// Consumes one result reported by the executor.
    pub fn process_event(
        &mut self,
        scene: SceneId,
        kind: CommandKind,
        result: CommandResult,
        events: &mut EventDispatcher,
    ) {
        let Some(row) = self
            .rows
            .get_mut(&scene)
            .filter(|row| row.current != SceneState::Unpublished)
        else {
            log::warn!("Ignoring {kind:?} {result:?} for unpublished {scene}");
            return;
        };

        if result == CommandResult::Indirect {
            let state = kind.resulting_state();
            log::debug!("{scene} moved to {state:?} indirectly ({kind:?})");
            if state <= SceneState::Subscribed {
                row.applied = None;
                row.reassign_pending = false;
            }
            if kind == CommandKind::Unsubscribe {
                row.unsubscribe_after_unmap = false;
            }
            if row.current != state {
                row.current = state;
                events.push(Event::SceneStateChanged { scene, state });
            }
            return;
        }

        if row.in_flight != Some(kind) {
            log::warn!(
                "Unexpected {kind:?} {result:?} for {scene} (in flight: {:?}), ignoring",
                row.in_flight
            );
            return;
        }
        row.in_flight = None;

        if result == CommandResult::Failed {
            log::debug!("{kind:?} failed for {scene}, retrying towards {:?}", row.target);
            row.requested = None;
            if kind == CommandKind::Assign && row.current >= SceneState::MappedAndAssigned {
                row.reassign_pending = Some(desired_assignment(row, &self.settings)) != row.applied;
            }
            self.evaluate(scene);
            return;
        }

        if !kind.completes_from(row.current) {
            log::warn!("{kind:?} completed for {scene} while {:?}, ignoring", row.current);
            self.evaluate(scene);
            return;
        }

        match kind {
            CommandKind::Assign => {
                let assignment = row.requested.take();
                row.applied = assignment;
                if let Some(assignment) = assignment {
                    events.push(Event::SceneAssigned { scene, assignment });
                }
                row.reassign_pending = Some(desired_assignment(row, &self.settings)) != row.applied;
            }
            CommandKind::Unmap => {
                row.applied = None;
                row.reassign_pending = false;
                row.unsubscribe_after_unmap = true;
            }
            CommandKind::Unsubscribe => row.unsubscribe_after_unmap = false,
            _ => {}
        }

        let state = kind.resulting_state();
        if row.current != state && !(kind == CommandKind::Assign && row.current > state) {
            log::trace!("{scene} {:?} -> {state:?}", row.current);
            row.current = state;
            events.push(Event::SceneStateChanged { scene, state });
        }
        self.evaluate(scene);
    }

    // ========================================================================
    // State machine
    // ========================================================================

    /// Issues the next command towards the target, unless one is in flight.
    fn evaluate(&mut self, scene: SceneId) {
        let Some(row) = self.rows.get_mut(&scene) else {
            return;
        };
        if row.in_flight.is_some() {
            return;
        }
        let Some(command) = next_command(scene, row, &self.settings) else {
            return;
        };

        log::debug!("{scene}: issuing {command:?} ({:?} -> {:?})", row.current, row.target);
        row.in_flight = Some(command.kind());
        if let SceneCommand::Assign { assignment, .. } = command {
            row.requested = Some(assignment);
            row.reassign_pending = false;
        }
        command.issue(&mut self.executor);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[must_use]
    pub fn current_state(&self, scene: SceneId) -> SceneState {
        self.rows.get(&scene).map_or_else(SceneState::default, |row| row.current)
    }

    #[must_use]
    pub fn target_state(&self, scene: SceneId) -> SceneState {
        self.rows.get(&scene).map_or_else(SceneState::default, |row| row.target)
    }

    /// Coarse state of the scene as the owner sees it.
    #[must_use]
    pub fn renderer_state(&self, scene: SceneId) -> RendererSceneState {
        self.current_state(scene).renderer_state()
    }

    #[must_use]
    pub fn in_flight(&self, scene: SceneId) -> Option<CommandKind> {
        self.rows.get(&scene).and_then(|row| row.in_flight)
    }

    /// Assignment last confirmed by the executor.
    #[must_use]
    pub fn assignment(&self, scene: SceneId) -> Option<DisplayAssignment> {
        self.rows.get(&scene).and_then(|row| row.applied)
    }

    /// `true` once the scene sits at its target with nothing outstanding.
    #[must_use]
    pub fn has_reached_target(&self, scene: SceneId) -> bool {
        self.rows.get(&scene).is_none_or(|row| {
            row.in_flight.is_none() && row.current == row.target && !row.reassign_pending
        })
    }

    /// Scenes the controller has a row for.
    pub fn scenes(&self) -> impl Iterator<Item = SceneId> + '_ {
        self.rows.keys().copied()
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }
}

fn desired_assignment(row: &SceneRow, settings: &LifecycleSettings) -> DisplayAssignment {
    row.assignment.unwrap_or(settings.default_assignment)
}

fn next_command(
    scene: SceneId,
    row: &SceneRow,
    settings: &LifecycleSettings,
) -> Option<SceneCommand> {
    let target = row.target;
    match row.current {
        SceneState::Unpublished => None,
        SceneState::Published => {
            (target >= SceneState::Subscribed).then_some(SceneCommand::Subscribe(scene))
        }
        SceneState::Subscribed => {
            if row.unsubscribe_after_unmap || target <= SceneState::Published {
                Some(SceneCommand::Unsubscribe(scene))
            } else if target >= SceneState::Mapped {
                Some(SceneCommand::Map(scene))
            } else {
                None
            }
        }
        SceneState::Mapped => {
            if target >= SceneState::MappedAndAssigned {
                Some(assign(scene, row, settings))
            } else if target <= SceneState::Subscribed {
                Some(SceneCommand::Unmap(scene))
            } else {
                None
            }
        }
        SceneState::MappedAndAssigned => {
            if target <= SceneState::Subscribed {
                Some(SceneCommand::Unmap(scene))
            } else if row.reassign_pending {
                Some(assign(scene, row, settings))
            } else if target == SceneState::Rendered {
                Some(SceneCommand::Show(scene))
            } else {
                None
            }
        }
        SceneState::Rendered => {
            if target < SceneState::Rendered {
                Some(SceneCommand::Hide(scene))
            } else if row.reassign_pending {
                Some(assign(scene, row, settings))
            } else {
                None
            }
        }
    }
}

fn assign(scene: SceneId, row: &SceneRow, settings: &LifecycleSettings) -> SceneCommand {
    SceneCommand::Assign {
        scene,
        assignment: desired_assignment(row, settings),
    }
}
