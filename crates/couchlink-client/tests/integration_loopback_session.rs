use std::sync::Arc;
use std::time::Duration;

use couchlink_client::{
    ClientConfig, ClientEvent, ConsoleClient, CustomData, DeviceState, LoopbackRelay, MasterPolicy,
    SCREEN_DEVICE_ID, SessionHandler,
};
use tokio::sync::mpsc;
use tokio::time::timeout;

struct ClientHarness {
    client: Arc<ConsoleClient<Arc<LoopbackRelay>>>,
    relay: Arc<LoopbackRelay>,
    app_rx: mpsc::Receiver<ClientEvent>,
}

fn spawn_client(config: ClientConfig) -> ClientHarness {
    let (relay, event_rx) = LoopbackRelay::new(256);
    let relay = Arc::new(relay);
    let (app_tx, app_rx) = mpsc::channel(256);
    let client = Arc::new(ConsoleClient::new(config, relay.clone()));

    let mut handler = SessionHandler::new(client.clone(), event_rx, app_tx);
    tokio::spawn(async move {
        handler.run().await;
    });

    ClientHarness {
        client,
        relay,
        app_rx,
    }
}

async fn recv_event(rx: &mut mpsc::Receiver<ClientEvent>) -> ClientEvent {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

async fn drain_until(
    rx: &mut mpsc::Receiver<ClientEvent>,
    mut pred: impl FnMut(&ClientEvent) -> bool,
) -> Vec<ClientEvent> {
    let mut seen = Vec::new();
    loop {
        let event = recv_event(rx).await;
        let done = pred(&event);
        seen.push(event);
        if done {
            return seen;
        }
    }
}

#[tokio::test]
async fn screen_session_tracks_controllers_and_slots() {
    let config = ClientConfig::screen().with_master_policy(MasterPolicy::PremiumFirst);
    let mut h = spawn_client(config);

    h.relay.connect_screen(DeviceState::new("screen"));
    let p1 = h.relay.connect_controller(DeviceState::new("phone-1").with_nickname("Ada"));
    h.relay.ready("123 456", SCREEN_DEVICE_ID, None);

    let events = drain_until(&mut h.app_rx, |e| matches!(e, ClientEvent::Connected(_))).await;
    assert_eq!(
        events,
        vec![
            ClientEvent::Ready {
                join_code: "123 456".to_string()
            },
            ClientEvent::Connected(p1),
        ]
    );

    let p2 = h
        .relay
        .connect_controller(DeviceState::new("phone-2").with_premium(true));
    drain_until(&mut h.app_rx, |e| *e == ClientEvent::Premium(p2)).await;

    assert_eq!(h.client.controller_ids(), vec![p1, p2]);
    assert_eq!(h.client.master_controller_id(), Some(p2));
    assert_eq!(h.client.nickname(p1).as_deref(), Some("Ada"));
    assert_eq!(h.client.nickname(p2), Some(format!("Guest {p2}")));

    let assigned = h.client.set_active_players_from_controllers(4).unwrap();
    assert_eq!(assigned, vec![p1, p2]);
    let events = drain_until(&mut h.app_rx, |e| {
        matches!(e, ClientEvent::ActivePlayersChanged { .. })
    })
    .await;
    // The screen itself never holds a player slot.
    assert_eq!(
        events.last(),
        Some(&ClientEvent::ActivePlayersChanged {
            player_number: None
        })
    );
    assert_eq!(h.client.player_number_to_device(1), Some(p2));

    assert!(h.relay.disconnect(p1));
    drain_until(&mut h.app_rx, |e| *e == ClientEvent::Disconnected(p1)).await;
    assert!(h.client.device(p1).is_none());
    assert_eq!(h.client.master_controller_id(), Some(p2));
    // Slots only change on reassignment.
    assert_eq!(h.client.device_to_player_number(p1), Some(0));

    assert!(h.relay.reconnect(p1));
    drain_until(&mut h.app_rx, |e| *e == ClientEvent::Connected(p1)).await;
    assert_eq!(h.client.uid(p1).as_deref(), Some("phone-1"));
    assert_eq!(h.client.controller_ids(), vec![p2, p1]);
}

#[tokio::test]
async fn controller_custom_state_is_confirmed_by_echo() {
    let mut h = spawn_client(ClientConfig::controller().with_time_sync(true));

    h.relay.connect_screen(DeviceState::new("screen"));
    let me = h.relay.connect_controller(DeviceState::new("my-phone"));
    h.relay.ready("777", me, Some(1_500));
    drain_until(&mut h.app_rx, |e| matches!(e, ClientEvent::Connected(_))).await;

    assert_eq!(h.client.device_id(), Some(me));
    assert_eq!(h.client.server_time_at(10_000), Some(11_500));
    assert!(h.client.server_time().is_some());

    h.client.set_own_custom_value(&("ready", 3u8)).unwrap();
    let events = drain_until(&mut h.app_rx, |e| {
        matches!(e, ClientEvent::CustomStateChanged { .. })
    })
    .await;
    match events.last() {
        Some(ClientEvent::CustomStateChanged {
            device_id,
            data: Some(data),
        }) => {
            assert_eq!(*device_id, me);
            let decoded: (String, u8) = data.decode().unwrap();
            assert_eq!(decoded, ("ready".to_string(), 3));
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(h.client.custom_state(me).is_some());
}

#[tokio::test]
async fn controller_learns_player_number_and_messages() {
    let mut h = spawn_client(ClientConfig::controller());

    h.relay.connect_screen(DeviceState::new("screen"));
    let other = h.relay.connect_controller(DeviceState::new("other"));
    let me = h.relay.connect_controller(DeviceState::new("me"));
    h.relay.ready("42", me, None);
    drain_until(&mut h.app_rx, |e| *e == ClientEvent::Connected(other)).await;

    assert!(h.client.set_active_players(&[Some(me)]).is_err());

    // The screen's assignment reaches us through the relay.
    h.relay.push_active_players(&[Some(other), None, Some(me)]);
    let events = drain_until(&mut h.app_rx, |e| {
        matches!(e, ClientEvent::ActivePlayersChanged { .. })
    })
    .await;
    assert_eq!(
        events.last(),
        Some(&ClientEvent::ActivePlayersChanged {
            player_number: Some(1)
        })
    );
    assert_eq!(h.client.own_player_number(), Some(1));

    let hello = CustomData::from_bytes(b"hi".to_vec());
    h.relay.deliver(SCREEN_DEVICE_ID, hello.clone());
    let event = recv_event(&mut h.app_rx).await;
    assert_eq!(
        event,
        ClientEvent::Message {
            from: SCREEN_DEVICE_ID,
            data: hello.clone()
        }
    );

    h.client.message(SCREEN_DEVICE_ID, hello.clone()).unwrap();
    h.client.broadcast(hello.clone()).unwrap();
    let outbox = h.client.relay().take_outbox();
    let targets: Vec<_> = outbox.into_iter().map(|(to, _)| to).collect();
    assert_eq!(targets, vec![SCREEN_DEVICE_ID, SCREEN_DEVICE_ID, other]);
}
