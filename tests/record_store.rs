/// Integration tests for the JSON-backed NPC record store.
use humannpc::npc::{InstanceId, NpcField, NpcRecord, NpcStore, Vec3};
use tempfile::TempDir;

fn open(temp: &TempDir) -> NpcStore {
    NpcStore::open(temp.path().join("npcs.json")).unwrap()
}

#[test]
fn records_survive_reopen_in_order() {
    let temp = TempDir::new().unwrap();
    let mut store = open(&temp);
    let a = store
        .create("Zed", Vec3::new(1.0, 2.0, 3.0), Vec3::default())
        .unwrap();
    let b = store.create("Amy", Vec3::default(), Vec3::default()).unwrap();
    store
        .update(&b, |r| r.interaction_commands.push("say hi".to_string()))
        .unwrap();

    let reopened = open(&temp);
    let ids: Vec<&str> = reopened.list_all().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![a.as_str(), b.as_str()]);
    assert_eq!(reopened.get(&a).unwrap().position, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(reopened.get(&b).unwrap().interaction_commands, vec!["say hi"]);
}

#[test]
fn every_field_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let mut store = open(&temp);
    let id = store
        .create("Quartermaster", Vec3::new(-12.5, 3.0, 880.25), Vec3::new(0.0, 270.0, 0.0))
        .unwrap();
    store
        .update(&id, |r| {
            r.health = 42.5;
            r.hostile = true;
            r.always_hostile = true;
            r.invulnerable = true;
            r.lootable = false;
            r.radius = 7.0;
            r.attack_distance = 12.0;
            r.max_distance = 90.0;
            r.speed = 1.25;
            r.damage_amount = 33.0;
            r.damage_distance = 2.5;
            r.damage_interval = 0.75;
            r.respawn = false;
            r.respawn_delay_seconds = 300.0;
            r.kit_name = "officer".to_string();
            r.hello_messages = vec!["hi".to_string(), "hello".to_string()];
            r.bye_messages = vec!["bye".to_string()];
            r.use_messages = vec!["using".to_string()];
            r.hurt_messages = vec!["ouch".to_string()];
            r.kill_messages = vec!["got you".to_string()];
            r.allow_interaction = true;
            r.interaction_distance = 6.5;
            r.interaction_text = "Press E to trade".to_string();
            r.interaction_commands = vec![
                "say Welcome {player.name}".to_string(),
                "inventory.giveto {player.id} rifle.ak 1".to_string(),
            ];
            r.live_instance = Some(InstanceId(4));
        })
        .unwrap();

    let mut original = store.get(&id).unwrap().clone();
    original.live_instance = None;
    let reopened = open(&temp);
    assert_eq!(reopened.get(&id).unwrap(), &original);
}

#[test]
fn non_finite_numbers_are_rejected_and_the_file_stays_loadable() {
    let temp = TempDir::new().unwrap();
    let mut store = open(&temp);
    let a = store.create("Bystander", Vec3::default(), Vec3::default()).unwrap();
    let b = store.create("Target", Vec3::default(), Vec3::default()).unwrap();

    for (property, value) in [
        ("health", "NaN"),
        ("interactdist", "inf"),
        ("speed", "-inf"),
        ("respawntime", "nan"),
        ("position", "1,NaN,2"),
    ] {
        let field = NpcField::parse(property, value).unwrap();
        assert_eq!(field, None, "{} = {}", property, value);
        store.update_field(&b, field).unwrap();
    }

    let reopened = open(&temp);
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.get(&a).unwrap().name, "Bystander");
    let target = reopened.get(&b).unwrap();
    assert_eq!(target.health, 100.0);
    assert_eq!(target.interaction_distance, 3.0);
    assert_eq!(target.position, Vec3::default());
}

#[test]
fn document_is_a_map_keyed_by_id_with_camel_case_fields() {
    let temp = TempDir::new().unwrap();
    let mut store = open(&temp);
    let id = store.create("Guard", Vec3::default(), Vec3::default()).unwrap();

    let raw = std::fs::read_to_string(store.path()).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let entry = &doc[&id];
    assert_eq!(entry["name"], "Guard");
    assert_eq!(entry["allowInteraction"], false);
    assert_eq!(entry["interactionText"], "Press E to interact");
    assert!(entry.get("liveInstance").is_none());
}

#[test]
fn live_instance_is_not_persisted() {
    let temp = TempDir::new().unwrap();
    let mut store = open(&temp);
    let mut record = NpcRecord::new("fixed-id", "Bound", Vec3::default(), Vec3::default());
    record.live_instance = Some(InstanceId(9));
    store.put(record).unwrap();

    let reopened = open(&temp);
    assert_eq!(reopened.get("fixed-id").unwrap().live_instance, None);
}

#[test]
fn missing_or_corrupt_file_starts_empty() {
    let temp = TempDir::new().unwrap();
    assert!(open(&temp).is_empty());

    std::fs::write(temp.path().join("npcs.json"), "{ not json").unwrap();
    let store = open(&temp);
    assert!(store.is_empty());
}

#[test]
fn map_key_wins_over_embedded_id() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("npcs.json"),
        r#"{ "outer": { "id": "inner", "name": "Keyed" } }"#,
    )
    .unwrap();
    let store = open(&temp);
    let record = store.get("outer").unwrap();
    assert_eq!(record.id, "outer");
    assert_eq!(record.name, "Keyed");
    assert_eq!(record.health, 100.0);
}

#[test]
fn unparseable_number_keeps_old_value() {
    let temp = TempDir::new().unwrap();
    let mut store = open(&temp);
    let id = store.create("Tank", Vec3::default(), Vec3::default()).unwrap();

    let field = NpcField::parse("health", "lots").unwrap();
    assert_eq!(field, None);
    store.update_field(&id, field).unwrap();
    assert_eq!(store.get(&id).unwrap().health, 100.0);

    let field = NpcField::parse("Health", "250").unwrap();
    store.update_field(&id, field).unwrap();
    assert_eq!(open(&temp).get(&id).unwrap().health, 250.0);
}

#[test]
fn find_prefers_exact_id_over_name_substring() {
    let temp = TempDir::new().unwrap();
    let mut store = open(&temp);
    let first = store
        .create("holds other id", Vec3::default(), Vec3::default())
        .unwrap();
    let second = store.create("Plain", Vec3::default(), Vec3::default()).unwrap();
    store
        .update(&first, |r| r.name = format!("alias of {}", second))
        .unwrap();

    assert_eq!(store.find_by_id_or_name(&second).unwrap().id, second);
    assert_eq!(store.find_by_id_or_name("alias").unwrap().id, first);
    assert!(store.find_by_id_or_name("nobody").is_none());
}

#[test]
fn delete_removes_and_persists() {
    let temp = TempDir::new().unwrap();
    let mut store = open(&temp);
    let id = store.create("Temp", Vec3::default(), Vec3::default()).unwrap();
    assert!(store.delete(&id).unwrap());
    assert!(!store.delete(&id).unwrap());
    assert!(open(&temp).get(&id).is_err());
}
