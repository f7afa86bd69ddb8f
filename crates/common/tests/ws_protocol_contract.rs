use coiisy_common::protocol::ws::{ClientMessage, EventKind, ServerMessage};

fn load_contract() -> serde_json::Value {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../contracts/chat-protocol.json");
    let content = std::fs::read_to_string(path).expect("contract file should be readable");
    serde_json::from_str(&content).expect("contract file should be valid JSON")
}

fn string_list<'a>(contract: &'a serde_json::Value, key: &str) -> Vec<&'a str> {
    contract[key]
        .as_array()
        .unwrap_or_else(|| panic!("{key} should be an array"))
        .iter()
        .map(|v| v.as_str().expect("entry should be a string"))
        .collect()
}

#[test]
fn event_kinds_match_contract() {
    let contract = load_contract();
    let actual: Vec<&str> = EventKind::ALL.iter().map(|kind| kind.as_str()).collect();
    assert_eq!(actual, string_list(&contract, "event_kinds"));
}

#[test]
fn client_samples_roundtrip_exactly() {
    let contract = load_contract();
    let expected_types = string_list(&contract, "client_message_types");

    let samples = contract["client_samples"].as_array().expect("client_samples array");
    assert_eq!(samples.len(), expected_types.len());
    for (sample, expected_type) in samples.iter().zip(expected_types) {
        let message: ClientMessage =
            serde_json::from_value(sample.clone()).expect("client sample should parse");
        assert_eq!(message.message_type(), expected_type);
        assert_eq!(message.session_id(), "room-1");
        assert_eq!(&serde_json::to_value(&message).unwrap(), sample);
    }
}

#[test]
fn server_samples_parse_into_their_event_kind() {
    let contract = load_contract();
    let expected_types = string_list(&contract, "server_message_types");

    let samples = contract["server_samples"].as_array().expect("server_samples array");
    assert_eq!(samples.len(), expected_types.len());
    for (sample, expected_type) in samples.iter().zip(expected_types) {
        let message: ServerMessage =
            serde_json::from_value(sample.clone()).expect("server sample should parse");
        assert_eq!(message.kind().as_str(), expected_type);
        assert_eq!(sample["type"], expected_type);
    }
}

#[test]
fn every_server_type_is_a_subscribable_event() {
    let contract = load_contract();
    let kinds = string_list(&contract, "event_kinds");
    for server_type in string_list(&contract, "server_message_types") {
        assert!(kinds.contains(&server_type), "{server_type} has no event kind");
    }
}
