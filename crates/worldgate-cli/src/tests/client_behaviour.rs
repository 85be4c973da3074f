//! Client request encoding and response mapping against a fake gateway.

use std::ffi::OsString;
use std::net::TcpListener;
use std::process::ExitCode;

use rstest::rstest;
use serde_json::{Map, Value, json};

use super::support::FakeGateway;
use crate::{Client, ClientError, run};

const TOKEN: &str = "secret";

fn client_for(gateway: &FakeGateway) -> Client {
    Client::new("127.0.0.1", gateway.port(), TOKEN)
}

fn success(data: Value) -> Value {
    json!({"success": true, "data": data})
}

fn failure(message: &str) -> Value {
    json!({"success": false, "error": message, "data": null})
}

#[rstest]
fn send_writes_one_request_line() {
    let mut gateway = FakeGateway::replying(&success(json!("minecraft:stone"))).expect("spawn");

    let block = client_for(&gateway).getblock(1, 64, -3).expect("getblock");

    assert_eq!(block, "minecraft:stone");
    assert_eq!(
        gateway.take_request().expect("request"),
        json!({"token": TOKEN, "action": "getblock", "params": {"x": 1, "y": 64, "z": -3}})
    );
}

#[rstest]
fn setblock_forwards_state_and_tile_data() {
    let mut gateway = FakeGateway::replying(&success(json!(1))).expect("spawn");
    let state: Map<String, Value> = [(String::from("facing"), json!("north"))].into_iter().collect();
    let nbt: Map<String, Value> = [(String::from("Items"), json!([]))].into_iter().collect();

    let changed = client_for(&gateway)
        .setblock_with(0, 70, 0, "chest", Some(state), Some(nbt))
        .expect("setblock");

    assert_eq!(changed, 1);
    let request = gateway.take_request().expect("request");
    assert_eq!(request["params"]["block_state"], json!({"facing": "north"}));
    assert_eq!(request["params"]["nbt"], json!({"Items": []}));
}

#[rstest]
fn clone_region_names_destination_axes() {
    let mut gateway = FakeGateway::replying(&success(json!(8))).expect("spawn");

    let copied = client_for(&gateway)
        .clone_region([0, 0, 0], [1, 1, 1], [10, 20, 30])
        .expect("clone");

    assert_eq!(copied, 8);
    let params = &gateway.take_request().expect("request")["params"];
    assert_eq!(params["dest_x"], json!(10));
    assert_eq!(params["dest_y"], json!(20));
    assert_eq!(params["dest_z"], json!(30));
    assert_eq!(params["x2"], json!(1));
}

#[rstest]
fn teleport_sends_facing_only_when_given() {
    let mut gateway = FakeGateway::replying(&success(json!(true))).expect("spawn");

    assert!(
        client_for(&gateway)
            .teleport("Steve", [0.5, 65.0, 0.5], None)
            .expect("teleport")
    );

    let params = &gateway.take_request().expect("request")["params"];
    assert!(params.get("yaw").is_none());
    assert_eq!(params["x"], json!(0.5));
}

#[rstest]
fn getpos_decodes_three_axes() {
    let gateway = FakeGateway::replying(&success(json!([1, 65, -2]))).expect("spawn");

    assert_eq!(client_for(&gateway).getpos("Alex").expect("getpos"), [1, 65, -2]);
}

#[rstest]
#[case(json!([1, 2]))]
#[case(json!("here"))]
fn getpos_rejects_malformed_positions(#[case] data: Value) {
    let gateway = FakeGateway::replying(&success(data)).expect("spawn");

    let error = client_for(&gateway).getpos("Alex").expect_err("malformed");

    assert!(
        matches!(error, ClientError::UnexpectedData { action: "getpos", .. }),
        "{error:?}"
    );
}

#[rstest]
fn invalid_token_is_an_authentication_error() {
    let gateway = FakeGateway::replying(&failure("Invalid token")).expect("spawn");

    let error = client_for(&gateway).kill("all").expect_err("rejected");

    assert!(matches!(error, ClientError::Authentication { .. }), "{error:?}");
}

#[rstest]
fn other_failures_are_command_errors() {
    let gateway = FakeGateway::replying(&failure("Player not found: Herobrine")).expect("spawn");

    let error = client_for(&gateway)
        .gamemode("Herobrine", "creative")
        .expect_err("rejected");

    match error {
        ClientError::Command { message } => assert_eq!(message, "Player not found: Herobrine"),
        other => panic!("expected command error, got {other:?}"),
    }
}

#[rstest]
fn silent_close_is_reported() {
    let gateway = FakeGateway::spawn(None).expect("spawn");

    let error = client_for(&gateway).weather("rain", None).expect_err("closed");

    assert!(matches!(error, ClientError::Closed), "{error:?}");
}

#[rstest]
fn garbage_reply_is_a_protocol_error() {
    let gateway = FakeGateway::spawn(Some(String::from("not json\n"))).expect("spawn");

    let error = client_for(&gateway).time("query", None).expect_err("garbage");

    assert!(matches!(error, ClientError::Protocol(_)), "{error:?}");
}

#[rstest]
fn refused_connection_names_the_address() {
    let port = TcpListener::bind(("127.0.0.1", 0))
        .and_then(|listener| listener.local_addr())
        .expect("reserve port")
        .port();

    let error = Client::new("127.0.0.1", port, TOKEN)
        .summon("zombie", [0.0, 64.0, 0.0])
        .expect_err("refused");

    match error {
        ClientError::Connect { address, .. } => assert_eq!(address, format!("127.0.0.1:{port}")),
        other => panic!("expected connect error, got {other:?}"),
    }
}

fn run_cli(args: &[&str]) -> (ExitCode, String, String) {
    let args: Vec<OsString> = std::iter::once("worldgate")
        .chain(args.iter().copied())
        .map(OsString::from)
        .collect();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = run(args, &mut stdout, &mut stderr);
    (
        code,
        String::from_utf8(stdout).expect("utf8 stdout"),
        String::from_utf8(stderr).expect("utf8 stderr"),
    )
}

#[rstest]
fn run_prints_data_and_forwards_params() {
    let mut gateway = FakeGateway::replying(&success(json!(27))).expect("spawn");
    let port = gateway.port().to_string();

    let (code, stdout, stderr) = run_cli(&[
        "--port", port.as_str(), "--token", TOKEN, "fill", "x1=0", "y1=0", "z1=0", "x2=2", "y2=2",
        "z2=2", "block=stone",
    ]);

    assert_eq!(code, ExitCode::SUCCESS, "{stderr}");
    assert_eq!(stdout.trim(), "27");
    let request = gateway.take_request().expect("request");
    assert_eq!(request["action"], json!("fill"));
    assert_eq!(request["params"]["block"], json!("stone"));
    assert_eq!(request["params"]["x2"], json!(2));
}

#[rstest]
fn run_reports_failures_on_stderr() {
    let gateway = FakeGateway::replying(&failure("Unknown action: fly")).expect("spawn");
    let port = gateway.port().to_string();

    let (code, stdout, stderr) = run_cli(&["--port", port.as_str(), "fly"]);

    assert_eq!(code, ExitCode::FAILURE);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Unknown action: fly"), "{stderr}");
}
