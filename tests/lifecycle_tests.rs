//! Scene lifecycle tests
//!
//! Tests for:
//! - The publish → subscribe → map → assign → show walk
//! - The hide → unmap → unsubscribe walk back down
//! - Failure retry and protocol desync handling
//! - Display assignment caching and reassignment
//! - Properties: at most one command in flight, unmap always followed by
//!   unsubscribe, convergence to any target

use proptest::prelude::*;
use tessera::{
    CommandKind, CommandQueue, CommandResult, DisplayAssignment, DisplayBufferId, Event,
    EventDispatcher, LifecycleSettings, RendererSceneState, SceneCommand, SceneId,
    SceneLifecycleController, SceneState,
};

// ============================================================================
// Helper
// ============================================================================

const SCENE: SceneId = SceneId(1);

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn published() -> (SceneLifecycleController, EventDispatcher) {
    init_logger();
    let mut controller = SceneLifecycleController::default();
    let mut events = EventDispatcher::new();
    controller.scene_published(SCENE, &mut events);
    events.drain();
    (controller, events)
}

/// Answers every issued command with `Ok` until the controller goes quiet.
/// Returns the commands in issue order.
fn drive(
    controller: &mut SceneLifecycleController,
    events: &mut EventDispatcher,
) -> Vec<SceneCommand> {
    let mut issued = Vec::new();
    for _ in 0..32 {
        let commands = controller.executor_mut().drain();
        if commands.is_empty() {
            break;
        }
        for command in commands {
            controller.process_event(command.scene(), command.kind(), CommandResult::Ok, events);
            issued.push(command);
        }
    }
    issued
}

fn state_changes(events: Vec<Event>) -> Vec<SceneState> {
    events
        .into_iter()
        .filter_map(|event| match event {
            Event::SceneStateChanged { state, .. } => Some(state),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Walk-through scenarios
// ============================================================================

#[test]
fn published_scene_subscribes_when_target_raised() {
    let (mut controller, _) = published();

    controller.set_target_state(SCENE, RendererSceneState::Ready);

    assert_eq!(controller.executor().pending(), &[SceneCommand::Subscribe(SCENE)]);
    assert_eq!(controller.in_flight(SCENE), Some(CommandKind::Subscribe));
}

#[test]
fn subscribe_ok_issues_map() {
    let (mut controller, mut events) = published();
    controller.set_target_state(SCENE, RendererSceneState::Ready);
    controller.executor_mut().drain();

    controller.process_event(SCENE, CommandKind::Subscribe, CommandResult::Ok, &mut events);

    assert_eq!(controller.current_state(SCENE), SceneState::Subscribed);
    assert_eq!(controller.executor_mut().drain(), vec![SceneCommand::Map(SCENE)]);
    assert_eq!(state_changes(events.drain()), vec![SceneState::Subscribed]);
}

#[test]
fn map_ok_assigns_then_shows() {
    let (mut controller, mut events) = published();
    controller.set_target_state(SCENE, RendererSceneState::Rendered);

    let issued = drive(&mut controller, &mut events);

    assert_eq!(
        issued,
        vec![
            SceneCommand::Subscribe(SCENE),
            SceneCommand::Map(SCENE),
            SceneCommand::Assign {
                scene: SCENE,
                assignment: DisplayAssignment::default()
            },
            SceneCommand::Show(SCENE),
        ]
    );
    assert_eq!(controller.current_state(SCENE), SceneState::Rendered);
    assert_eq!(controller.renderer_state(SCENE), RendererSceneState::Rendered);
    assert_eq!(
        events.drain(),
        vec![
            Event::SceneStateChanged {
                scene: SCENE,
                state: SceneState::Subscribed
            },
            Event::SceneStateChanged {
                scene: SCENE,
                state: SceneState::Mapped
            },
            Event::SceneAssigned {
                scene: SCENE,
                assignment: DisplayAssignment::default()
            },
            Event::SceneStateChanged {
                scene: SCENE,
                state: SceneState::MappedAndAssigned
            },
            Event::SceneStateChanged {
                scene: SCENE,
                state: SceneState::Rendered
            },
        ]
    );
}

#[test]
fn hide_unmap_unsubscribe_when_released() {
    let (mut controller, mut events) = published();
    controller.set_target_state(SCENE, RendererSceneState::Rendered);
    drive(&mut controller, &mut events);
    events.drain();

    controller.set_target_state(SCENE, RendererSceneState::Available);
    let issued = drive(&mut controller, &mut events);

    assert_eq!(
        issued,
        vec![
            SceneCommand::Hide(SCENE),
            SceneCommand::Unmap(SCENE),
            SceneCommand::Unsubscribe(SCENE),
        ]
    );
    assert_eq!(
        state_changes(events.drain()),
        vec![
            SceneState::MappedAndAssigned,
            SceneState::Subscribed,
            SceneState::Published
        ]
    );
    assert!(controller.has_reached_target(SCENE));
    assert_eq!(controller.assignment(SCENE), None);
}

#[test]
fn unmap_continues_with_unsubscribe_even_when_subscribed_is_the_target() {
    let (mut controller, mut events) = published();
    controller.set_target_state(SCENE, RendererSceneState::Ready);
    drive(&mut controller, &mut events);

    controller.set_target_state(SCENE, SceneState::Subscribed);
    let issued = drive(&mut controller, &mut events);

    assert_eq!(
        issued,
        vec![
            SceneCommand::Unmap(SCENE),
            SceneCommand::Unsubscribe(SCENE),
            SceneCommand::Subscribe(SCENE),
        ]
    );
    assert_eq!(controller.current_state(SCENE), SceneState::Subscribed);
}

// ============================================================================
// Failures & desyncs
// ============================================================================

#[test]
fn failed_map_is_retried_until_it_succeeds() {
    let (mut controller, mut events) = published();
    controller.set_target_state(SCENE, RendererSceneState::Ready);
    controller.executor_mut().drain();
    controller.process_event(SCENE, CommandKind::Subscribe, CommandResult::Ok, &mut events);
    controller.executor_mut().drain();

    for _ in 0..3 {
        controller.process_event(SCENE, CommandKind::Map, CommandResult::Failed, &mut events);
        assert_eq!(controller.current_state(SCENE), SceneState::Subscribed);
        assert_eq!(controller.executor_mut().drain(), vec![SceneCommand::Map(SCENE)]);
    }

    controller.process_event(SCENE, CommandKind::Map, CommandResult::Ok, &mut events);
    drive(&mut controller, &mut events);
    assert_eq!(controller.current_state(SCENE), SceneState::MappedAndAssigned);
}

#[test]
fn duplicate_ok_is_ignored() {
    let (mut controller, mut events) = published();
    controller.set_target_state(SCENE, RendererSceneState::Ready);
    controller.process_event(SCENE, CommandKind::Subscribe, CommandResult::Ok, &mut events);
    controller.executor_mut().drain();
    events.drain();

    controller.process_event(SCENE, CommandKind::Subscribe, CommandResult::Ok, &mut events);

    assert_eq!(controller.current_state(SCENE), SceneState::Subscribed);
    assert_eq!(controller.in_flight(SCENE), Some(CommandKind::Map));
    assert!(controller.executor().is_empty());
    assert!(events.is_empty());
}

#[test]
fn indirect_unsubscribe_drops_back_without_new_commands() {
    let (mut controller, mut events) = published();
    controller.set_target_state(SCENE, RendererSceneState::Available);
    controller.process_event(SCENE, CommandKind::Subscribe, CommandResult::Indirect, &mut events);
    controller.process_event(SCENE, CommandKind::Unsubscribe, CommandResult::Indirect, &mut events);

    assert_eq!(controller.current_state(SCENE), SceneState::Published);
    assert!(controller.executor().is_empty());
    assert_eq!(
        state_changes(events.drain()),
        vec![SceneState::Subscribed, SceneState::Published]
    );
}

// ============================================================================
// Display assignment
// ============================================================================

#[test]
fn default_assignment_comes_from_settings() {
    init_logger();
    let assignment = DisplayAssignment::new(DisplayBufferId(3), 10);
    let mut controller = SceneLifecycleController::new(
        CommandQueue::new(),
        LifecycleSettings {
            default_assignment: assignment,
        },
    );
    let mut events = EventDispatcher::new();
    controller.scene_published(SCENE, &mut events);
    controller.set_target_state(SCENE, RendererSceneState::Ready);

    let issued = drive(&mut controller, &mut events);

    assert!(issued.contains(&SceneCommand::Assign { scene: SCENE, assignment }));
    assert_eq!(controller.assignment(SCENE), Some(assignment));
}

#[test]
fn reassignment_while_rendered_keeps_scene_rendered() {
    let (mut controller, mut events) = published();
    controller.set_target_state(SCENE, RendererSceneState::Rendered);
    drive(&mut controller, &mut events);
    events.drain();

    let moved = DisplayAssignment::new(DisplayBufferId(7), 2);
    controller.set_display_buffer_assignment(SCENE, moved);
    let issued = drive(&mut controller, &mut events);

    assert_eq!(issued, vec![SceneCommand::Assign { scene: SCENE, assignment: moved }]);
    assert_eq!(controller.current_state(SCENE), SceneState::Rendered);
    assert_eq!(
        events.drain(),
        vec![Event::SceneAssigned {
            scene: SCENE,
            assignment: moved
        }]
    );
}

#[test]
fn assignment_changed_during_assign_is_sent_again() {
    let (mut controller, mut events) = published();
    controller.set_target_state(SCENE, RendererSceneState::Ready);
    controller.process_event(SCENE, CommandKind::Subscribe, CommandResult::Ok, &mut events);
    controller.process_event(SCENE, CommandKind::Map, CommandResult::Ok, &mut events);
    controller.executor_mut().drain();
    assert_eq!(controller.in_flight(SCENE), Some(CommandKind::Assign));

    let moved = DisplayAssignment::new(DisplayBufferId(2), 0);
    controller.set_display_buffer_assignment(SCENE, moved);
    assert!(controller.executor().is_empty());

    controller.process_event(SCENE, CommandKind::Assign, CommandResult::Ok, &mut events);
    assert_eq!(
        controller.executor_mut().drain(),
        vec![SceneCommand::Assign { scene: SCENE, assignment: moved }]
    );
}

#[test]
fn failed_reassignment_is_retried() {
    let (mut controller, mut events) = published();
    controller.set_target_state(SCENE, RendererSceneState::Ready);
    drive(&mut controller, &mut events);

    let moved = DisplayAssignment::new(DisplayBufferId(4), 1);
    controller.set_display_buffer_assignment(SCENE, moved);
    controller.executor_mut().drain();
    controller.process_event(SCENE, CommandKind::Assign, CommandResult::Failed, &mut events);

    assert_eq!(
        controller.executor_mut().drain(),
        vec![SceneCommand::Assign { scene: SCENE, assignment: moved }]
    );
}

// ============================================================================
// Properties
// ============================================================================

#[derive(Debug, Clone)]
enum Step {
    Target(RendererSceneState),
    Answer(bool),
    Stray(CommandKind, bool),
}

fn renderer_state() -> impl Strategy<Value = RendererSceneState> {
    prop_oneof![
        Just(RendererSceneState::Unavailable),
        Just(RendererSceneState::Available),
        Just(RendererSceneState::Ready),
        Just(RendererSceneState::Rendered),
    ]
}

fn command_kind() -> impl Strategy<Value = CommandKind> {
    prop_oneof![
        Just(CommandKind::Subscribe),
        Just(CommandKind::Unsubscribe),
        Just(CommandKind::Map),
        Just(CommandKind::Unmap),
        Just(CommandKind::Assign),
        Just(CommandKind::Show),
        Just(CommandKind::Hide),
    ]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        2 => renderer_state().prop_map(Step::Target),
        5 => any::<bool>().prop_map(Step::Answer),
        1 => (command_kind(), any::<bool>()).prop_map(|(kind, ok)| Step::Stray(kind, ok)),
    ]
}

fn result_of(ok: bool) -> CommandResult {
    if ok { CommandResult::Ok } else { CommandResult::Failed }
}

proptest! {
    #[test]
    fn at_most_one_command_in_flight(steps in prop::collection::vec(step(), 1..80)) {
        let (mut controller, mut events) = published();
        let mut outstanding: Option<SceneCommand> = None;

        for step in steps {
            let answered = match step {
                Step::Target(target) => {
                    controller.set_target_state(SCENE, target);
                    None
                }
                Step::Answer(ok) => outstanding.map(|command| (command.kind(), ok)),
                Step::Stray(kind, ok) => Some((kind, ok)),
            };
            if let Some((kind, ok)) = answered {
                controller.process_event(SCENE, kind, result_of(ok), &mut events);
                if outstanding.is_some_and(|command| command.kind() == kind) {
                    outstanding = None;
                }
            }

            let issued = controller.executor_mut().drain();
            prop_assert!(issued.len() <= 1);
            if let Some(command) = issued.first() {
                prop_assert!(
                    outstanding.is_none(),
                    "{command:?} issued while {outstanding:?} outstanding"
                );
                outstanding = Some(*command);
            }
            prop_assert_eq!(controller.in_flight(SCENE), outstanding.map(|command| command.kind()));
        }
    }

    #[test]
    fn completed_unmap_is_followed_by_unsubscribe(
        answers in prop::collection::vec(any::<bool>(), 1..60),
        targets in prop::collection::vec(renderer_state(), 1..8),
    ) {
        let (mut controller, mut events) = published();
        let mut targets = targets.into_iter().cycle();
        controller.set_target_state(SCENE, RendererSceneState::Rendered);

        for ok in answers {
            let Some(command) = controller.executor_mut().drain().pop() else {
                if let Some(target) = targets.next() {
                    controller.set_target_state(SCENE, target);
                }
                continue;
            };
            controller.process_event(SCENE, command.kind(), result_of(ok), &mut events);
            let next = controller.executor().pending().to_vec();
            if command.kind() == CommandKind::Unmap && ok {
                prop_assert_eq!(next, vec![SceneCommand::Unsubscribe(SCENE)]);
            }
        }
    }

    #[test]
    fn converges_to_any_target_and_stays_there(
        targets in prop::collection::vec(renderer_state(), 1..10),
    ) {
        let (mut controller, mut events) = published();
        for target in targets {
            controller.set_target_state(SCENE, target);
            drive(&mut controller, &mut events);

            prop_assert!(controller.has_reached_target(SCENE));
            prop_assert_eq!(controller.current_state(SCENE), SceneState::from(target));

            controller.set_target_state(SCENE, target);
            prop_assert!(controller.executor().is_empty());
        }
    }
}
