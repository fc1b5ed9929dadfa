//! Handle allocation properties over arbitrary operation sequences.

mod common;

use common::{Fired, scripted_client};
use proptest::prelude::*;
use webmux::transport::NativeHandle;
use webmux::{Opcode, SocketId};

/// One step of an arbitrary caller session.
#[derive(Debug, Clone)]
enum Op {
    SubmitHttp,
    ConnectWs,
    DiscardOldestHttp,
    DisconnectOldestWs,
    DeliverMessage,
    Update,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::SubmitHttp),
        Just(Op::ConnectWs),
        Just(Op::DiscardOldestHttp),
        Just(Op::DisconnectOldestWs),
        Just(Op::DeliverMessage),
        Just(Op::Update),
    ]
}

proptest! {
    /// Handles issued by a client are strictly increasing and never reused,
    /// across all entity kinds, for any sequence of create/remove/update
    /// operations.
    #[test]
    fn handles_strictly_increase(ops in proptest::collection::vec(op_strategy(), 1..120)) {
        let (mut client, script, recorder) = scripted_client();
        let mut issued: Vec<i32> = Vec::new();
        let mut live_ws: Vec<(SocketId, NativeHandle)> = Vec::new();

        for op in ops {
            match op {
                Op::SubmitHttp => {
                    let id = client.http_get("https://example.com/").expect("submit");
                    issued.push(id.get());
                }
                Op::ConnectWs => {
                    let id = client.ws_connect("wss://example.com/feed").expect("connect");
                    issued.push(id.get());
                    live_ws.push((id, script.last_started()));
                }
                Op::DiscardOldestHttp => {
                    let oldest = client.http_ids().next();
                    if let Some(id) = oldest {
                        client.http_discard(id).expect("discard");
                    }
                }
                Op::DisconnectOldestWs => {
                    let oldest = client.ws_ids().next();
                    if let Some(id) = oldest {
                        client.ws_disconnect(id).expect("disconnect");
                        live_ws.retain(|(ws, _)| *ws != id);
                    }
                }
                Op::DeliverMessage => {
                    if let Some((_, native)) = live_ws.first() {
                        script.push_message(*native, Opcode::Text, b"m");
                    }
                }
                Op::Update => {
                    client.update().expect("update");
                    for fired in recorder.take() {
                        if let Fired::Message(_, message, _) = fired {
                            issued.push(message.get());
                        }
                    }
                }
            }
        }

        // Strictly increasing implies cross-kind uniqueness too.
        prop_assert!(
            issued.windows(2).all(|w| w[0] < w[1]),
            "handles not strictly increasing: {issued:?}"
        );
        prop_assert!(issued.iter().all(|&raw| raw > 0));
    }
}

#[test]
fn handles_shared_across_kinds() {
    let (mut client, script, recorder) = scripted_client();

    let request = client.http_get("https://example.com/").expect("submit");
    let socket = client.ws_connect("wss://example.com/feed").expect("connect");
    let native = script.last_started();

    script.push_message(native, Opcode::Text, b"m");
    client.update().expect("update");
    let message = recorder
        .take()
        .into_iter()
        .find_map(|f| match f {
            Fired::Message(_, message, _) => Some(message),
            _ => None,
        })
        .expect("message delivered");

    assert_eq!(request.get(), 1);
    assert_eq!(socket.get(), 2);
    assert_eq!(message.get(), 3);
}
