//! Shared test fixtures: a recording delegate and client construction.

use std::cell::RefCell;
use std::rc::Rc;

use webmux::transport::ScriptedEngine;
use webmux::{Client, Delegate, MessageId, RequestId, SocketId, Status};

/// One recorded delegate callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fired {
    Response(RequestId, Option<u16>, usize),
    Connect(SocketId),
    Disconnect(SocketId),
    Message(SocketId, MessageId, usize),
}

/// Delegate that records every callback in order.
#[derive(Default, Clone)]
pub struct Recorder {
    fired: Rc<RefCell<Vec<Fired>>>,
}

impl Recorder {
    /// Returns and clears everything recorded so far.
    pub fn take(&self) -> Vec<Fired> {
        std::mem::take(&mut self.fired.borrow_mut())
    }
}

impl Delegate for Recorder {
    fn on_http_response(
        &mut self,
        _client: &mut Client,
        request: RequestId,
        status: Status,
        body_len: usize,
    ) {
        self.fired
            .borrow_mut()
            .push(Fired::Response(request, status.code(), body_len));
    }

    fn on_ws_connect(&mut self, _client: &mut Client, socket: SocketId) {
        self.fired.borrow_mut().push(Fired::Connect(socket));
    }

    fn on_ws_disconnect(&mut self, _client: &mut Client, socket: SocketId) {
        self.fired.borrow_mut().push(Fired::Disconnect(socket));
    }

    fn on_ws_message(
        &mut self,
        _client: &mut Client,
        socket: SocketId,
        message: MessageId,
        len: usize,
    ) {
        self.fired
            .borrow_mut()
            .push(Fired::Message(socket, message, len));
    }
}

/// Builds a client wired to a fresh scripted engine and recorder.
pub fn scripted_client() -> (Client, ScriptedEngine, Recorder) {
    init_tracing();
    let script = ScriptedEngine::new();
    let recorder = Recorder::default();
    let client = Client::builder()
        .engine(Box::new(script.clone()))
        .delegate(Box::new(recorder.clone()))
        .build()
        .expect("client builds");
    (client, script, recorder)
}

/// Installs the test log subscriber once; respects `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
