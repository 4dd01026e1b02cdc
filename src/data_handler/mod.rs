use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use portable_atomic::AtomicBool;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::signaling::{SignalMessage, SignalingChannel};

pub type OnDataMessageHdlrFn = Box<
    dyn (FnMut(serde_json::Value) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

/// DataHandler relays application messages to the remote peer over the
/// signaling channel.
pub struct DataHandler {
    signaling: Arc<SignalingChannel>,
    is_closed: AtomicBool,
    on_message_handler: ArcSwapOption<Mutex<OnDataMessageHdlrFn>>,
    log_target: String,
}

impl DataHandler {
    pub(crate) fn new(signaling: Arc<SignalingChannel>, log_target: &str) -> Self {
        DataHandler {
            signaling,
            is_closed: AtomicBool::new(false),
            on_message_handler: ArcSwapOption::empty(),
            log_target: format!("{log_target}::data"),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.is_closed.load(Ordering::SeqCst)
    }

    /// on_message sets an event handler which is invoked with every message
    /// the remote peer sent.
    pub fn on_message(&self, f: OnDataMessageHdlrFn) {
        self.on_message_handler.store(Some(Arc::new(Mutex::new(f))));
    }

    /// send delivers `payload` to the remote peer's DataHandler.
    pub async fn send(&self, payload: serde_json::Value) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        log::debug!(target: self.log_target.as_str(), "send data");
        self.signaling.send(&SignalMessage::Data { payload }).await
    }

    pub(crate) async fn handle_remote_data(&self, payload: serde_json::Value) {
        if self.is_closed() {
            log::debug!(target: self.log_target.as_str(), "discard data after close");
            return;
        }

        if let Some(handler) = &*self.on_message_handler.load() {
            let mut f = handler.lock().await;
            f(payload).await;
        } else {
            log::trace!(target: self.log_target.as_str(), "no data handler, discard {payload}");
        }
    }

    pub(crate) fn close(&self) {
        if !self.is_closed.swap(true, Ordering::SeqCst) {
            log::debug!(target: self.log_target.as_str(), "close");
        }
    }
}
