use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{RTCRtpSendParameters, TrackIndex};
use crate::error::{Error, Result};
use crate::stats::StatsReport;
use crate::track::MediaStreamTrack;

/// ParametersTransform rewrites a sender's parameters in place of the caller,
/// between the coordinator's read and commit.
pub type ParametersTransform =
    Box<dyn (FnOnce(RTCRtpSendParameters) -> RTCRtpSendParameters) + Send + Sync>;

/// Completion settles the operation a directive was raised for.
///
/// It is consumed by `resolve`, `reject` or `settle`, so a directive can be
/// completed at most once. Dropping it unsettled fails the waiting handle
/// with `ErrDirectiveDropped`.
pub struct Completion<T> {
    tx: oneshot::Sender<Result<T>>,
}

impl<T> Completion<T> {
    pub(crate) fn new() -> (Self, oneshot::Receiver<Result<T>>) {
        let (tx, rx) = oneshot::channel();
        (Completion { tx }, rx)
    }

    pub fn resolve(self, value: T) {
        self.settle(Ok(value));
    }

    pub fn reject(self, err: Error) {
        self.settle(Err(err));
    }

    pub fn settle(self, result: Result<T>) {
        // the handle may have stopped waiting
        let _ = self.tx.send(result);
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion").finish_non_exhaustive()
    }
}

/// Directive is a one-shot request from a track handle to its coordinator.
pub enum Directive {
    Replace {
        track_index: TrackIndex,
        track: Arc<dyn MediaStreamTrack>,
        done: Completion<()>,
    },
    End {
        track_index: TrackIndex,
        done: Completion<()>,
    },
    GetParameters {
        track_index: TrackIndex,
        done: Completion<RTCRtpSendParameters>,
    },
    UpdateParameters {
        track_index: TrackIndex,
        transform: ParametersTransform,
        done: Completion<()>,
    },
    SenderStats {
        track_index: TrackIndex,
        done: Completion<StatsReport>,
    },
    ReceiverStats {
        track_index: TrackIndex,
        done: Completion<StatsReport>,
    },
}

impl Directive {
    pub fn track_index(&self) -> TrackIndex {
        match self {
            Directive::Replace { track_index, .. }
            | Directive::End { track_index, .. }
            | Directive::GetParameters { track_index, .. }
            | Directive::UpdateParameters { track_index, .. }
            | Directive::SenderStats { track_index, .. }
            | Directive::ReceiverStats { track_index, .. } => *track_index,
        }
    }

    /// reject fails the directive without executing it.
    pub fn reject(self, err: Error) {
        match self {
            Directive::Replace { done, .. }
            | Directive::End { done, .. }
            | Directive::UpdateParameters { done, .. } => done.reject(err),
            Directive::GetParameters { done, .. } => done.reject(err),
            Directive::SenderStats { done, .. } | Directive::ReceiverStats { done, .. } => {
                done.reject(err)
            }
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Directive::Replace { .. } => "replace",
            Directive::End { .. } => "end",
            Directive::GetParameters { .. } => "get_parameters",
            Directive::UpdateParameters { .. } => "update_parameters",
            Directive::SenderStats { .. } => "sender_stats",
            Directive::ReceiverStats { .. } => "receiver_stats",
        };
        write!(f, "{}({})", s, self.track_index())
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Directive::{self}")
    }
}

/// DirectiveHandler is the coordinator side of the directive protocol.
///
/// Every directive handed to `handle_directive` must be settled exactly once,
/// either before returning or later from a task the handler owns.
#[async_trait]
pub trait DirectiveHandler: Send + Sync {
    async fn handle_directive(&self, directive: Directive);
}

/// raise hands a directive to the coordinator and waits for its completion.
pub(crate) async fn raise<T>(
    handler: &Arc<dyn DirectiveHandler>,
    directive: impl FnOnce(Completion<T>) -> Directive,
) -> Result<T> {
    let (done, rx) = Completion::new();
    handler.handle_directive(directive(done)).await;
    rx.await.map_err(|_| Error::ErrDirectiveDropped)?
}
