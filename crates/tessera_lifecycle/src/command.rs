//! Commands sent to the executor and the results it reports back.

use tessera_core::{DisplayAssignment, DisplayBufferId, SceneId, SceneState};

/// Kind of a lifecycle command, also used to tag executor results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Subscribe,
    Unsubscribe,
    Map,
    Unmap,
    Assign,
    Show,
    Hide,
}

impl CommandKind {
    /// State a scene ends up in when this command completes.
    #[must_use]
    pub const fn resulting_state(self) -> SceneState {
        match self {
            Self::Subscribe | Self::Unmap => SceneState::Subscribed,
            Self::Unsubscribe => SceneState::Published,
            Self::Map => SceneState::Mapped,
            Self::Assign | Self::Hide => SceneState::MappedAndAssigned,
            Self::Show => SceneState::Rendered,
        }
    }

    /// `true` if a completion of this command is consistent with the scene
    /// currently being in `state`.
    #[must_use]
    pub const fn completes_from(self, state: SceneState) -> bool {
        match self {
            Self::Subscribe => matches!(state, SceneState::Published),
            Self::Unsubscribe | Self::Map => matches!(state, SceneState::Subscribed),
            Self::Unmap => matches!(state, SceneState::Mapped | SceneState::MappedAndAssigned),
            Self::Assign => matches!(
                state,
                SceneState::Mapped | SceneState::MappedAndAssigned | SceneState::Rendered
            ),
            Self::Show => matches!(state, SceneState::MappedAndAssigned),
            Self::Hide => matches!(state, SceneState::Rendered),
        }
    }
}

/// Outcome of a command as reported by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandResult {
    /// The outstanding command completed.
    Ok,
    /// The outstanding command failed; the scene did not move.
    Failed,
    /// The scene moved for a reason other than an outstanding command.
    Indirect,
}

/// One request to the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    Subscribe(SceneId),
    Unsubscribe(SceneId),
    Map(SceneId),
    Unmap(SceneId),
    Assign {
        scene: SceneId,
        assignment: DisplayAssignment,
    },
    Show(SceneId),
    Hide(SceneId),
}

impl SceneCommand {
    #[must_use]
    pub const fn scene(&self) -> SceneId {
        match *self {
            Self::Subscribe(scene)
            | Self::Unsubscribe(scene)
            | Self::Map(scene)
            | Self::Unmap(scene)
            | Self::Assign { scene, .. }
            | Self::Show(scene)
            | Self::Hide(scene) => scene,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::Subscribe(_) => CommandKind::Subscribe,
            Self::Unsubscribe(_) => CommandKind::Unsubscribe,
            Self::Map(_) => CommandKind::Map,
            Self::Unmap(_) => CommandKind::Unmap,
            Self::Assign { .. } => CommandKind::Assign,
            Self::Show(_) => CommandKind::Show,
            Self::Hide(_) => CommandKind::Hide,
        }
    }

    /// Forwards the command to the matching executor request.
    pub fn issue<E: SceneCommandExecutor + ?Sized>(self, executor: &mut E) {
        match self {
            Self::Subscribe(scene) => executor.request_subscribe(scene),
            Self::Unsubscribe(scene) => executor.request_unsubscribe(scene),
            Self::Map(scene) => executor.request_map(scene),
            Self::Unmap(scene) => executor.request_unmap(scene),
            Self::Assign { scene, assignment } => {
                executor.request_assign(scene, assignment.buffer, assignment.render_order);
            }
            Self::Show(scene) => executor.request_show(scene),
            Self::Hide(scene) => executor.request_hide(scene),
        }
    }
}

/// The component that performs lifecycle commands.
///
/// Requests return immediately. Their outcome is reported later through
/// [`crate::SceneLifecycleController::process_event`].
pub trait SceneCommandExecutor {
    fn request_subscribe(&mut self, scene: SceneId);
    fn request_map(&mut self, scene: SceneId);
    fn request_assign(&mut self, scene: SceneId, buffer: DisplayBufferId, render_order: i32);
    fn request_show(&mut self, scene: SceneId);
    fn request_hide(&mut self, scene: SceneId);
    fn request_unmap(&mut self, scene: SceneId);
    fn request_unsubscribe(&mut self, scene: SceneId);
}

/// Executor that only records requests, in issue order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandQueue {
    commands: Vec<SceneCommand>,
}

impl CommandQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every queued command and empties the queue.
    pub fn drain(&mut self) -> Vec<SceneCommand> {
        std::mem::take(&mut self.commands)
    }

    #[must_use]
    pub fn pending(&self) -> &[SceneCommand] {
        &self.commands
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl SceneCommandExecutor for CommandQueue {
    fn request_subscribe(&mut self, scene: SceneId) {
        self.commands.push(SceneCommand::Subscribe(scene));
    }

    fn request_map(&mut self, scene: SceneId) {
        self.commands.push(SceneCommand::Map(scene));
    }

    fn request_assign(&mut self, scene: SceneId, buffer: DisplayBufferId, render_order: i32) {
        self.commands.push(SceneCommand::Assign {
            scene,
            assignment: DisplayAssignment::new(buffer, render_order),
        });
    }

    fn request_show(&mut self, scene: SceneId) {
        self.commands.push(SceneCommand::Show(scene));
    }

    fn request_hide(&mut self, scene: SceneId) {
        self.commands.push(SceneCommand::Hide(scene));
    }

    fn request_unmap(&mut self, scene: SceneId) {
        self.commands.push(SceneCommand::Unmap(scene));
    }

    fn request_unsubscribe(&mut self, scene: SceneId) {
        self.commands.push(SceneCommand::Unsubscribe(scene));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_goes_through_matching_request() {
        let mut queue = CommandQueue::new();
        let scene = SceneId(3);
        let commands = [
            SceneCommand::Subscribe(scene),
            SceneCommand::Map(scene),
            SceneCommand::Assign {
                scene,
                assignment: DisplayAssignment::new(DisplayBufferId(2), 7),
            },
            SceneCommand::Show(scene),
            SceneCommand::Hide(scene),
            SceneCommand::Unmap(scene),
            SceneCommand::Unsubscribe(scene),
        ];
        for command in commands {
            command.issue(&mut queue);
        }
        assert_eq!(queue.drain(), commands);
        assert!(queue.is_empty());
    }

    #[test]
    fn unmap_completes_from_both_mapped_states() {
        assert!(CommandKind::Unmap.completes_from(SceneState::Mapped));
        assert!(CommandKind::Unmap.completes_from(SceneState::MappedAndAssigned));
        assert!(!CommandKind::Unmap.completes_from(SceneState::Rendered));
        assert_eq!(CommandKind::Unmap.resulting_state(), SceneState::Subscribed);
    }
}
