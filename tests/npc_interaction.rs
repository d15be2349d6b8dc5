/// Integration tests for the interaction trigger: target selection, placeholder
/// expansion and routing between chat and the command executor.
mod common;

use common::{interactable, setup, PLAYER};
use humannpc::npc::headless::ChatLine;
use humannpc::npc::{Actor, Dispatch, InteractionOutcome, NpcToggle, Vec3};

fn alice_at(position: Vec3) -> Actor {
    Actor::new(PLAYER, "Alice", position)
}

#[test]
fn say_goes_to_chat_and_everything_else_to_executor() {
    let (mut manager, _temp) = setup();
    let id = interactable(
        &mut manager,
        "Merchant",
        Vec3::new(10.0, 0.0, 10.0),
        &[
            "say Welcome, {player.name}!",
            "inventory.giveto {player.id} wood 10",
            "chat.say I am {npc.name}",
        ],
    );
    let speaker = manager.store().get(&id).unwrap().speaker_id();

    let outcome = manager.interact(&alice_at(Vec3::new(11.0, 0.0, 10.0)));
    assert!(outcome.consumed());
    assert_eq!(
        outcome,
        InteractionOutcome::Executed {
            record_id: id.clone(),
            dispatched: vec![
                Dispatch::Say("Welcome, Alice!".to_string()),
                Dispatch::Command(format!("inventory.giveto {} wood 10", PLAYER)),
                Dispatch::Say("I am Merchant".to_string()),
            ],
        }
    );

    let host = manager.host();
    assert_eq!(
        host.chat,
        vec![
            ChatLine {
                speaker_name: "Merchant".to_string(),
                speaker_id: speaker,
                message: "Welcome, Alice!".to_string(),
            },
            ChatLine {
                speaker_name: "Merchant".to_string(),
                speaker_id: speaker,
                message: "I am Merchant".to_string(),
            },
        ]
    );
    assert_eq!(host.executed, vec![format!("inventory.giveto {} wood 10", PLAYER)]);
}

#[test]
fn first_record_in_store_order_wins_over_nearer_one() {
    let (mut manager, _temp) = setup();
    let far = interactable(&mut manager, "Far", Vec3::new(0.0, 0.0, 2.5), &["say far"]);
    interactable(&mut manager, "Near", Vec3::new(0.0, 0.0, 0.5), &["say near"]);

    let outcome = manager.interact(&alice_at(Vec3::default()));
    assert_eq!(outcome.record_id(), Some(far.as_str()));
    assert_eq!(manager.host().chat.len(), 1);
    assert_eq!(manager.host().chat[0].message, "far");
}

#[test]
fn out_of_range_or_disabled_is_ignored() {
    let (mut manager, _temp) = setup();
    let id = interactable(&mut manager, "Hermit", Vec3::new(50.0, 0.0, 0.0), &["say go away"]);

    let outcome = manager.interact(&alice_at(Vec3::default()));
    assert_eq!(outcome, InteractionOutcome::Ignored);
    assert!(!outcome.consumed());

    manager.toggle(&id, NpcToggle::Interaction).unwrap();
    let outcome = manager.interact(&alice_at(Vec3::new(50.0, 0.0, 1.0)));
    assert_eq!(outcome, InteractionOutcome::Ignored);
    assert!(manager.host().chat.is_empty());
}

#[test]
fn interaction_distance_is_per_record() {
    let (mut manager, _temp) = setup();
    let id = interactable(&mut manager, "Tall", Vec3::default(), &["say hi"]);
    let actor = alice_at(Vec3::new(5.0, 0.0, 0.0));
    assert_eq!(manager.interact(&actor), InteractionOutcome::Ignored);

    manager.update_property(&id, "interactdist", "6").unwrap();
    assert!(manager.interact(&actor).consumed());
}

#[test]
fn destroyed_instance_is_not_a_target() {
    let (mut manager, _temp) = setup();
    let id = interactable(&mut manager, "Corpse", Vec3::default(), &["say boo"]);
    let instance = manager.store().get(&id).unwrap().live_instance.unwrap();
    manager.host_mut().kill(instance);

    assert_eq!(manager.interact(&alice_at(Vec3::default())), InteractionOutcome::Ignored);
}

#[test]
fn moved_instance_is_matched_where_it_stands() {
    let (mut manager, _temp) = setup();
    let id = interactable(&mut manager, "Wanderer", Vec3::default(), &["say here"]);
    let instance = manager.store().get(&id).unwrap().live_instance.unwrap();
    manager.host_mut().move_instance(instance, Vec3::new(100.0, 0.0, 0.0));

    assert_eq!(manager.interact(&alice_at(Vec3::default())), InteractionOutcome::Ignored);
    assert!(manager.interact(&alice_at(Vec3::new(99.0, 0.0, 0.0))).consumed());
}

#[test]
fn no_commands_acknowledges_with_a_reply() {
    let (mut manager, _temp) = setup();
    let id = interactable(&mut manager, "Idle", Vec3::default(), &[]);

    let outcome = manager.interact(&alice_at(Vec3::default()));
    assert_eq!(outcome, InteractionOutcome::Acknowledged { record_id: id });
    assert_eq!(
        manager.host().replies,
        vec![(
            PLAYER.to_string(),
            "Interacted with Idle (No commands configured)".to_string()
        )]
    );
}

#[test]
fn empty_commands_and_empty_says_are_skipped() {
    let (mut manager, _temp) = setup();
    interactable(&mut manager, "Sparse", Vec3::default(), &["", "say ", "status"]);

    let outcome = manager.interact(&alice_at(Vec3::default()));
    match outcome {
        InteractionOutcome::Executed { dispatched, .. } => {
            assert_eq!(dispatched, vec![Dispatch::Command("status".to_string())]);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(manager.host().chat.is_empty());
}

#[test]
fn substituted_values_are_not_rescanned() {
    let (mut manager, _temp) = setup();
    interactable(&mut manager, "Echo", Vec3::default(), &["say {player.name}"]);

    let actor = Actor::new(PLAYER, "{npc.name}", Vec3::default());
    manager.interact(&actor);
    assert_eq!(manager.host().chat[0].message, "{npc.name}");
}

#[test]
fn edited_command_replaces_in_place_and_persists() {
    let (mut manager, temp) = setup();
    let id = interactable(
        &mut manager,
        "Clerk",
        Vec3::default(),
        &["say first", "say second"],
    );

    assert!(manager.update_command(&id, 1, "say {npc.name} here").unwrap());
    let reopened = humannpc::npc::NpcStore::open(temp.path().join("npcs.json")).unwrap();
    assert_eq!(
        reopened.get(&id).unwrap().interaction_commands,
        vec!["say first", "say {npc.name} here"]
    );

    let outcome = manager.interact(&alice_at(Vec3::default()));
    assert_eq!(
        outcome,
        InteractionOutcome::Executed {
            record_id: id,
            dispatched: vec![
                Dispatch::Say("first".to_string()),
                Dispatch::Say("Clerk here".to_string()),
            ],
        }
    );
}

#[test]
fn editing_past_the_end_changes_nothing() {
    let (mut manager, _temp) = setup();
    let id = interactable(&mut manager, "Clerk", Vec3::default(), &["say only"]);

    assert!(!manager.update_command(&id, 1, "say extra").unwrap());
    assert!(!manager.update_command(&id, 7, "say extra").unwrap());
    assert_eq!(
        manager.store().get(&id).unwrap().interaction_commands,
        vec!["say only"]
    );
    assert!(manager.update_command("no-such-id", 0, "say x").is_err());
}
