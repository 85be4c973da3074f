//! Many sessions against one simulation thread.

use std::io::Write;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rstest::rstest;
use serde_json::json;

use crate::world::{BlockPos, Material, World};

use super::support::{self, Harness, TEST_TOKEN};

const CLIENTS: i32 = 8;
const REQUESTS_PER_CLIENT: i32 = 12;

#[rstest]
fn concurrent_writes_are_never_lost() {
    let (harness, address) = Harness::running();

    let clients: Vec<_> = (0..CLIENTS)
        .map(|client| {
            thread::spawn(move || {
                for step in 0..REQUESTS_PER_CLIENT {
                    let response = support::request(
                        address,
                        TEST_TOKEN,
                        "setblock",
                        json!({"x": client, "y": 100, "z": step, "block": "stone"}),
                    );
                    assert!(response.success, "{response:?}");
                }
            })
        })
        .collect();
    for client in clients {
        client.join().expect("client thread");
    }

    harness.gateway.stop().expect("stop");
    let placed = harness
        .gateway
        .with_world(|world| {
            (0..CLIENTS)
                .flat_map(|x| (0..REQUESTS_PER_CLIENT).map(move |z| BlockPos::new(x, 100, z)))
                .filter(|pos| world.block(*pos).material == Material::Stone)
                .count()
        })
        .expect("world returned after stop");
    let expected = usize::try_from(CLIENTS * REQUESTS_PER_CLIENT).expect("small count");
    assert_eq!(placed, expected);
}

#[rstest]
fn racing_writes_to_one_cell_leave_one_of_the_written_values() {
    let (harness, address) = Harness::running();
    let materials = ["stone", "dirt", "glass", "oak_planks"];

    let writers: Vec<_> = materials
        .iter()
        .map(|material| {
            let material = (*material).to_owned();
            thread::spawn(move || {
                for _ in 0..10 {
                    let response = support::request(
                        address,
                        TEST_TOKEN,
                        "setblock",
                        json!({"x": 0, "y": 90, "z": 0, "block": material}),
                    );
                    assert!(response.success, "{response:?}");
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().expect("writer thread");
    }

    let read = support::request(address, TEST_TOKEN, "getblock", json!({"x": 0, "y": 90, "z": 0}));
    let id = read.data.as_str().expect("block id").to_owned();
    assert!(
        materials
            .iter()
            .any(|material| id == format!("minecraft:{material}")),
        "unexpected block {id}"
    );
    drop(harness);
}

#[rstest]
fn each_client_reads_its_own_writes() {
    let (_harness, address) = Harness::running();

    let clients: Vec<_> = (0..4)
        .map(|client| {
            thread::spawn(move || {
                for (step, block) in ["stone", "dirt", "glass"].into_iter().enumerate() {
                    let z = i64::try_from(step).expect("small step");
                    let written = support::request(
                        address,
                        TEST_TOKEN,
                        "setblock",
                        json!({"x": client, "y": 80, "z": z, "block": block}),
                    );
                    assert!(written.success, "{written:?}");
                    let read = support::request(
                        address,
                        TEST_TOKEN,
                        "getblock",
                        json!({"x": client, "y": 80, "z": z}),
                    );
                    assert_eq!(read.data, json!(format!("minecraft:{block}")));
                }
            })
        })
        .collect();
    for client in clients {
        client.join().expect("client thread");
    }
}

#[rstest]
fn saturated_pool_holds_new_sessions_until_a_worker_frees() {
    let mut config = support::test_config();
    config.max_connections = 1;
    config.read_timeout_ms = 10_000;
    let harness = Harness::new(config);
    let address = harness.gateway.start().expect("start");

    let mut idle = TcpStream::connect(address).expect("idle connection");
    thread::sleep(Duration::from_millis(200));

    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    let waiting = thread::spawn(move || {
        let response = support::request(address, TEST_TOKEN, "time", json!({"action": "query"}));
        done_tx.send(response).expect("report response");
    });

    assert!(
        done_rx.recv_timeout(Duration::from_millis(400)).is_err(),
        "second session must wait for the only worker"
    );

    idle.write_all(b"\n").expect("finish idle session");
    drop(idle);
    let response = done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("second session served once the worker freed");
    assert!(response.success, "{response:?}");
    waiting.join().expect("waiting client");
}

#[rstest]
fn concurrent_regeneration_leaves_store_and_memory_in_agreement() {
    let (harness, address) = Harness::running();
    let gateway = Arc::clone(&harness.gateway);

    let rotators: Vec<_> = (0..4)
        .map(|_| {
            let gateway = Arc::clone(&gateway);
            thread::spawn(move || {
                for _ in 0..10 {
                    gateway.regenerate_token().expect("regenerate");
                }
            })
        })
        .collect();
    for rotator in rotators {
        rotator.join().expect("rotator thread");
    }

    let current = gateway.token();
    assert_eq!(harness.store.stored().as_deref(), Some(&*current));
    assert_eq!(harness.store.persisted().len(), 40);
    let response = support::request(address, &current, "time", json!({"action": "query"}));
    assert!(response.success, "{response:?}");
}
