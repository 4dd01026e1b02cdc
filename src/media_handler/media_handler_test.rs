use portable_atomic::AtomicUsize;

use super::*;
use crate::data_channel::data_channel_init::RTCDataChannelInit;
use crate::engine::mock_engine::{MockDataChannel, MockEngine};
use crate::track::track_kind::RTPCodecType;
use crate::track::track_static::TrackStatic;
use crate::track::is_same_track;

async fn new_media_handler() -> (MediaHandler, Arc<MockEngine>, Arc<MockDataChannel>) {
    let engine = MockEngine::new("local");
    let data_channel = engine
        .create_data_channel("signaling", Some(RTCDataChannelInit::pre_negotiated(0)))
        .await
        .unwrap();
    let signaling = Arc::new(SignalingChannel::new(
        data_channel,
        "simple_p2p::signaling",
    ));
    let handler = MediaHandler::new(
        Arc::clone(&engine) as Arc<dyn PeerConnectionEngine>,
        signaling,
        "simple_p2p",
    );
    let mock_channel = engine.data_channel().unwrap();
    (handler, engine, mock_channel)
}

fn new_track(id: &str, kind: RTPCodecType) -> Arc<dyn MediaStreamTrack> {
    Arc::new(TrackStatic::new(id, kind))
}

#[tokio::test]
async fn test_add_track_assigns_indices() {
    let (handler, engine, _) = new_media_handler().await;

    let audio = handler
        .add_track(new_track("mic", RTPCodecType::Audio))
        .await
        .unwrap();
    let video = handler
        .add_track(new_track("cam", RTPCodecType::Video))
        .await
        .unwrap();

    assert_eq!(audio.track_index(), 0);
    assert_eq!(video.track_index(), 1);
    assert_eq!(audio.kind(), RTPCodecType::Audio);
    assert_eq!(
        engine.calls()[1..],
        ["add_track(0)".to_owned(), "add_track(1)".to_owned()]
    );

    let senders = handler.senders().await;
    assert_eq!(senders.len(), 2);
    assert_eq!(senders[0].track().id(), "mic");
    assert!(handler.sender(1).await.is_some());
    assert!(handler.sender(2).await.is_none());
}

#[tokio::test]
async fn test_add_track_invalid() {
    let (handler, engine, _) = new_media_handler().await;

    let ended = Arc::new(TrackStatic::new("ended", RTPCodecType::Audio));
    ended.stop();

    let tests = vec![
        ended as Arc<dyn MediaStreamTrack>,
        new_track("kindless", RTPCodecType::Unspecified),
    ];

    for track in tests {
        assert!(
            matches!(handler.add_track(track).await, Err(Error::ErrInvalidTrack)),
            "testCase: invalid track must be rejected"
        );
    }
    assert_eq!(engine.call_count("add_track"), 0);
}

#[tokio::test]
async fn test_replace_through_engine() {
    let (handler, engine, data_channel) = new_media_handler().await;
    data_channel.open().await;

    let sender = handler
        .add_track(new_track("cam", RTPCodecType::Video))
        .await
        .unwrap();
    let next = new_track("screen", RTPCodecType::Video);
    sender.replace(Arc::clone(&next)).await.unwrap();

    assert!(is_same_track(&sender.track(), &next));
    let engine_track = engine.sender_track(RTCRtpSenderId(0)).unwrap();
    assert!(is_same_track(&engine_track, &next));
    assert_eq!(
        data_channel.sent(),
        vec![r#"{"kind":"media","action":"replace","trackIndex":0}"#.to_owned()]
    );
}

#[tokio::test]
async fn test_replace_engine_failure() {
    let (handler, engine, _) = new_media_handler().await;
    engine.fail_on("replace_track");

    let sender = handler
        .add_track(new_track("cam", RTPCodecType::Video))
        .await
        .unwrap();
    let current = sender.track();

    let result = sender.replace(new_track("screen", RTPCodecType::Video)).await;
    assert!(matches!(result, Err(Error::ErrEngine(_))));
    assert!(is_same_track(&sender.track(), &current));
}

#[tokio::test]
async fn test_replace_without_signaling() {
    let (handler, engine, data_channel) = new_media_handler().await;

    let sender = handler
        .add_track(new_track("mic", RTPCodecType::Audio))
        .await
        .unwrap();

    // the remote notification fails but the local replace stands
    sender
        .replace(new_track("mic-2", RTPCodecType::Audio))
        .await
        .unwrap();
    assert_eq!(sender.track().id(), "mic-2");
    assert_eq!(engine.call_count("replace_track"), 1);
    assert!(data_channel.sent().is_empty());
}

#[tokio::test]
async fn test_end_removes_sender() {
    let (handler, engine, data_channel) = new_media_handler().await;
    data_channel.open().await;

    let sender = handler
        .add_track(new_track("mic", RTPCodecType::Audio))
        .await
        .unwrap();
    sender.end().await.unwrap();

    assert!(sender.ended());
    assert!(handler.sender(0).await.is_none());
    assert_eq!(engine.call_count("remove_track"), 1);
    assert_eq!(
        data_channel.sent(),
        vec![r#"{"kind":"media","action":"end","trackIndex":0}"#.to_owned()]
    );
}

#[tokio::test]
async fn test_update_parameters_through_engine() {
    let (handler, engine, _) = new_media_handler().await;

    let sender = handler
        .add_track(new_track("cam", RTPCodecType::Video))
        .await
        .unwrap();
    sender
        .update_parameters(|mut params| {
            params.encodings[0].scale_resolution_down_by = Some(2.0);
            params
        })
        .await
        .unwrap();

    let params = sender.get_parameters().await.unwrap();
    assert_eq!(params.encodings[0].scale_resolution_down_by, Some(2.0));
    assert_eq!(engine.call_count("set_parameters"), 1);
    assert_eq!(engine.call_count("get_parameters"), 2);
}

#[tokio::test]
async fn test_stats_selectors() {
    let (handler, _engine, _) = new_media_handler().await;

    let sender = handler
        .add_track(new_track("cam", RTPCodecType::Video))
        .await
        .unwrap();
    let report = sender.get_stats().await.unwrap();
    assert!(report.get("OT0").is_some());

    handler
        .handle_remote_track(RemoteTrack {
            track: new_track("remote-cam", RTPCodecType::Video),
            receiver_id: RTCRtpReceiverId(5),
            track_index: 4,
        })
        .await;
    let receiver = handler.receiver(4).await.unwrap();
    let report = receiver.get_stats().await.unwrap();
    assert!(report.get("IT5").is_some());
}

#[tokio::test]
async fn test_unknown_track_index() {
    let (handler, engine, _) = new_media_handler().await;

    let stray = MediaSender::new(
        9,
        new_track("stray", RTPCodecType::Audio),
        handler.directive_handler(),
        "simple_p2p::sender",
    );
    assert!(matches!(
        stray.get_stats().await,
        Err(Error::ErrUnknownTrackIndex)
    ));
    assert!(matches!(stray.end().await, Err(Error::ErrUnknownTrackIndex)));
    assert!(!stray.ended());
    assert_eq!(engine.call_count("get_stats"), 0);
}

#[tokio::test]
async fn test_remote_track_and_control() {
    let (handler, _engine, _) = new_media_handler().await;

    let received = Arc::new(AtomicUsize::new(0));
    let replaced = Arc::new(AtomicUsize::new(0));
    let (received2, replaced2) = (Arc::clone(&received), Arc::clone(&replaced));
    handler.on_receiver(Box::new(move |receiver: Arc<MediaReceiver>| {
        received2.fetch_add(1, Ordering::SeqCst);
        let replaced3 = Arc::clone(&replaced2);
        receiver.on_replace(Box::new(move || {
            replaced3.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {})
        }));
        Box::pin(async {})
    }));

    handler
        .handle_remote_track(RemoteTrack {
            track: new_track("remote-mic", RTPCodecType::Audio),
            receiver_id: RTCRtpReceiverId(0),
            track_index: 0,
        })
        .await;
    assert_eq!(received.load(Ordering::SeqCst), 1);

    handler.handle_remote_control(MediaAction::Replace, 0).await;
    assert_eq!(replaced.load(Ordering::SeqCst), 1);

    // unknown indices are ignored
    handler.handle_remote_control(MediaAction::Replace, 7).await;
    handler.handle_remote_control(MediaAction::End, 7).await;

    let receiver = handler.receiver(0).await.unwrap();
    handler.handle_remote_control(MediaAction::End, 0).await;
    assert!(receiver.ended());
    assert!(handler.receiver(0).await.is_none());
    assert!(matches!(
        receiver.get_stats().await,
        Err(Error::ErrAlreadyEnded)
    ));
}

#[tokio::test]
async fn test_close_ends_handles() {
    let (handler, engine, _) = new_media_handler().await;

    let sender = handler
        .add_track(new_track("mic", RTPCodecType::Audio))
        .await
        .unwrap();
    handler
        .handle_remote_track(RemoteTrack {
            track: new_track("remote-mic", RTPCodecType::Audio),
            receiver_id: RTCRtpReceiverId(0),
            track_index: 0,
        })
        .await;
    let receiver = handler.receiver(0).await.unwrap();

    handler.close().await;

    assert!(handler.is_closed());
    assert!(sender.ended());
    assert!(receiver.ended());
    assert!(handler.senders().await.is_empty());
    assert!(handler.receivers().await.is_empty());
    assert!(matches!(sender.end().await, Err(Error::ErrAlreadyEnded)));
    assert!(matches!(
        handler.add_track(new_track("cam", RTPCodecType::Video)).await,
        Err(Error::ErrConnectionClosed)
    ));
    assert_eq!(engine.call_count("remove_track"), 0);
}
