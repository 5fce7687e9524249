use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use roomchat::client::{
    ChannelEvent, ConnectionState, ContactBook, HistoryError, HistoryOutcome, LogStatus,
    Membership, Room, ServerEvent, SessionDriver, SessionError, SessionUpdate, UiCommand,
};
use roomchat::websockets::EventName;

mod utils;

use utils::mocks::{at, message_at};
use utils::*;

fn bodies(harness: &SessionHarness) -> Vec<String> {
    harness
        .session
        .log()
        .iter()
        .map(|m| m.body.clone())
        .collect()
}

// ============================================================================
// RoomSession
// ============================================================================

#[tokio::test]
async fn test_join_then_join_leaves_only_second_rooms_history() {
    let history = MockHistoryApi::new()
        .with_room("a", vec![message_at("x", "from a", 1)])
        .with_room("b", vec![message_at("y", "from b", 2)]);
    let mut harness = SessionHarness::new("alice", history);

    harness.session.join(Room::new("a")).await.unwrap();
    let outcome = harness.session.join(Room::new("b")).await.unwrap();

    assert_eq!(outcome, HistoryOutcome::Applied);
    assert_eq!(bodies(&harness), vec!["from b"]);
    assert_eq!(harness.session.current_room(), Some(&Room::new("b")));
    assert_eq!(
        harness.channel.events(),
        vec![EventName::Join, EventName::LeaveRoom, EventName::Join]
    );
}

#[tokio::test]
async fn test_stale_history_is_discarded() {
    let mut harness = SessionHarness::new("alice", MockHistoryApi::new());

    let ticket_a = harness
        .session
        .begin_join(Room::new("a"))
        .await
        .unwrap()
        .unwrap();
    let ticket_b = harness
        .session
        .begin_join(Room::new("b"))
        .await
        .unwrap()
        .unwrap();

    // A's result arrives after the switch to B, before and after B's own
    assert_eq!(
        harness
            .session
            .complete_history(&ticket_a, Ok(vec![message_at("x", "from a", 1)])),
        HistoryOutcome::Stale
    );
    assert_eq!(harness.session.log_status(), &LogStatus::Loading);

    assert_eq!(
        harness
            .session
            .complete_history(&ticket_b, Ok(vec![message_at("y", "from b", 2)])),
        HistoryOutcome::Applied
    );
    assert_eq!(
        harness
            .session
            .complete_history(&ticket_a, Ok(vec![message_at("x", "late a", 3)])),
        HistoryOutcome::Stale
    );

    assert_eq!(bodies(&harness), vec!["from b"]);
}

#[tokio::test]
async fn test_history_failure_shows_placeholder() {
    let history = MockHistoryApi::new().failing_room("general");
    let mut harness = SessionHarness::new("alice", history);

    let outcome = harness.session.join(Room::new("general")).await.unwrap();

    assert!(matches!(outcome, HistoryOutcome::Failed(_)));
    assert_eq!(
        harness.session.log_status().placeholder(),
        Some("Error loading messages")
    );
    assert!(harness.session.log().is_empty());
    assert_eq!(harness.session.membership(), Membership::Pending);
}

#[rstest]
#[case("")]
#[case("   ")]
#[case("\n\t ")]
#[tokio::test]
async fn test_blank_send_never_emits(#[case] text: &str) {
    let mut harness = SessionHarness::new("alice", MockHistoryApi::new());
    harness.session.join(Room::new("general")).await.unwrap();
    let emitted = harness.channel.frames().len();

    let result = harness.session.send(text).await;

    assert_eq!(result, Err(SessionError::EmptyMessage));
    assert_eq!(harness.channel.frames().len(), emitted);
}

#[tokio::test]
async fn test_send_without_room_or_transport() {
    let mut harness = SessionHarness::new("alice", MockHistoryApi::new());
    assert_eq!(
        harness.session.send("hi").await,
        Err(SessionError::NoCurrentRoom)
    );

    harness.session.join(Room::new("general")).await.unwrap();
    harness.channel.set_connected(false);
    assert!(matches!(
        harness.session.send("hi").await,
        Err(SessionError::Transport(_))
    ));
}

#[tokio::test]
async fn test_message_for_other_room_never_enters_log() {
    let mut harness = SessionHarness::new("alice", MockHistoryApi::new());
    harness.session.join(Room::new("general")).await.unwrap();

    harness.session.receive(ServerEvent::Message {
        message: message_at("bob", "elsewhere", 1),
        room: Some("random".into()),
    });

    assert!(harness.session.log().is_empty());
}

#[tokio::test]
async fn test_sent_message_appears_once_when_reflected() {
    let mut harness = SessionHarness::new("alice", MockHistoryApi::new());
    harness.session.join(Room::new("general")).await.unwrap();

    harness.session.send("  hello  ").await.unwrap();
    assert!(harness.session.log().is_empty(), "no optimistic append");

    let sent = harness.channel.data_of(EventName::SendMessage);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["text"], "hello");
    assert_eq!(sent[0]["room"], "general");

    // The server reflects it back to every member, the sender included
    harness.session.receive(ServerEvent::Message {
        message: message_at("alice", "hello", 5),
        room: Some("general".into()),
    });

    assert_eq!(harness.session.log().len(), 1);
    assert_eq!(harness.session.log()[0].sender, "alice");
}

#[tokio::test]
async fn test_alice_in_general_sees_bobs_messages_in_order() {
    let mut harness = SessionHarness::new("alice", MockHistoryApi::new());
    harness.session.join(Room::new("general")).await.unwrap();

    for (body, minute) in [("hi", 1), ("hello", 2)] {
        harness.session.receive(ServerEvent::Message {
            message: message_at("bob", body, minute),
            room: Some("general".into()),
        });
    }

    let log = harness.session.log();
    assert_eq!(log.len(), 2);
    assert_eq!((log[0].body.as_str(), log[0].timestamp), ("hi", at(1)));
    assert_eq!((log[1].body.as_str(), log[1].timestamp), ("hello", at(2)));
}

#[tokio::test]
async fn test_joined_ack_confirms_membership() {
    let mut harness = SessionHarness::new("alice", MockHistoryApi::new());
    let _ticket = harness
        .session
        .begin_join(Room::new("general"))
        .await
        .unwrap();
    assert_eq!(harness.session.membership(), Membership::Pending);

    harness.session.receive(ServerEvent::Joined {
        room: Some("general".into()),
    });

    assert_eq!(harness.session.membership(), Membership::Confirmed);
}

// ============================================================================
// ContactBook
// ============================================================================

#[tokio::test]
async fn test_duplicate_contact_issues_no_request() {
    let history = Arc::new(MockHistoryApi::new().with_contacts(&["bob"]));
    let mut book = ContactBook::new("alice", history.clone());
    book.load().await.unwrap();

    let result = book.add("bob", Some("token")).await;

    assert_eq!(result, Err(SessionError::DuplicateContact));
    assert_eq!(result.unwrap_err().to_string(), "Contact already exists");
    assert_eq!(history.add_calls(), 0);
}

#[tokio::test]
async fn test_rejected_contact_leaves_list_unchanged() {
    let history = Arc::new(
        MockHistoryApi::new()
            .with_contacts(&["bob"])
            .rejecting_adds("banned word"),
    );
    let mut book = ContactBook::new("alice", history.clone());
    book.load().await.unwrap();

    let err = book.add("carol", Some("token")).await.unwrap_err();

    assert_eq!(err.to_string(), "banned word");
    assert_eq!(book.contacts().to_vec(), vec!["bob".to_string()]);
    assert_eq!(history.add_calls(), 1);
}

#[tokio::test]
async fn test_failed_contact_load_keeps_previous_list() {
    let history = Arc::new(MockHistoryApi::new().failing_contacts());
    let mut book = ContactBook::new("alice", history);

    let result = book.load().await;

    assert!(matches!(
        result,
        Err(SessionError::Request(HistoryError::Transport { .. }))
    ));
    assert!(book.contacts().is_empty());
}

// ============================================================================
// SessionDriver
// ============================================================================

struct DriverHarness {
    events: mpsc::UnboundedSender<ChannelEvent>,
    commands: mpsc::UnboundedSender<UiCommand>,
    updates: mpsc::UnboundedReceiver<SessionUpdate>,
    channel: Arc<MockChannel>,
    task: tokio::task::JoinHandle<SessionDriver>,
}

impl DriverHarness {
    fn start(history: MockHistoryApi) -> Self {
        let harness = SessionHarness::new("alice", history);
        let contacts = ContactBook::new("alice", harness.history.clone());

        let (events, events_rx) = mpsc::unbounded_channel();
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates) = mpsc::unbounded_channel();

        let driver = SessionDriver::new(
            harness.session,
            contacts,
            Room::new("general"),
            events_rx,
            commands_rx,
            updates_tx,
        )
        .with_csrf_token(Some("token".into()));

        Self {
            events,
            commands,
            updates,
            channel: harness.channel,
            task: tokio::spawn(driver.run()),
        }
    }

    /// Waits for the first update matching `predicate`
    async fn wait_for(&mut self, predicate: impl Fn(&SessionUpdate) -> bool) -> SessionUpdate {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let update = self.updates.recv().await.expect("driver stopped");
                if predicate(&update) {
                    return update;
                }
            }
        })
        .await
        .expect("timed out waiting for update")
    }

    async fn stop(self) -> SessionDriver {
        self.commands.send(UiCommand::Quit).unwrap();
        self.task.await.unwrap()
    }
}

fn is_ready_log(update: &SessionUpdate) -> bool {
    matches!(
        update,
        SessionUpdate::LogReplaced {
            status: LogStatus::Ready,
            ..
        }
    )
}

#[tokio::test]
async fn test_driver_joins_default_room_on_connect() {
    let history = MockHistoryApi::new().with_room("general", vec![message_at("bob", "hi", 1)]);
    let mut driver = DriverHarness::start(history);

    driver.events.send(ChannelEvent::Connected).unwrap();

    match driver.wait_for(is_ready_log).await {
        SessionUpdate::LogReplaced { messages, .. } => {
            assert_eq!(messages, vec![message_at("bob", "hi", 1)])
        }
        other => panic!("unexpected update: {other:?}"),
    }
    assert_eq!(driver.channel.data_of(EventName::Join)[0]["room"], "general");
    driver.stop().await;
}

#[tokio::test]
async fn test_driver_discards_superseded_fetch() {
    let history = MockHistoryApi::new()
        .with_room("slow", vec![message_at("x", "slow room", 1)])
        .with_delay("slow", Duration::from_millis(200))
        .with_room("fast", vec![message_at("y", "fast room", 2)]);
    let mut driver = DriverHarness::start(history);
    driver.events.send(ChannelEvent::Connected).unwrap();
    driver.wait_for(is_ready_log).await;

    driver.commands.send(UiCommand::Join("slow".into())).unwrap();
    driver.commands.send(UiCommand::Join("fast".into())).unwrap();
    driver.wait_for(is_ready_log).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let driver = driver.stop().await;
    let log: Vec<&str> = driver
        .session()
        .log()
        .iter()
        .map(|m| m.body.as_str())
        .collect();
    assert_eq!(log, vec!["fast room"]);
    assert_eq!(driver.session().current_room(), Some(&Room::new("fast")));
}

#[tokio::test]
async fn test_driver_rejoins_after_reconnect() {
    let mut driver = DriverHarness::start(MockHistoryApi::new());
    driver.events.send(ChannelEvent::Connected).unwrap();
    driver.wait_for(is_ready_log).await;
    driver.commands.send(UiCommand::Join("random".into())).unwrap();
    driver.wait_for(is_ready_log).await;

    driver.events.send(ChannelEvent::Disconnected).unwrap();
    driver.events.send(ChannelEvent::Connected).unwrap();
    driver.wait_for(is_ready_log).await;

    let joins = driver.channel.data_of(EventName::Join);
    let rooms: Vec<&str> = joins.iter().filter_map(|j| j["room"].as_str()).collect();
    assert_eq!(rooms, vec!["general", "random", "random"]);
    driver.stop().await;
}

#[tokio::test]
async fn test_driver_reports_reconnecting_state() {
    let mut driver = DriverHarness::start(MockHistoryApi::new());
    driver.events.send(ChannelEvent::Connected).unwrap();
    driver.wait_for(is_ready_log).await;

    driver.events.send(ChannelEvent::Disconnected).unwrap();
    driver.events.send(ChannelEvent::Reconnecting).unwrap();
    assert_eq!(
        driver
            .wait_for(|u| matches!(u, SessionUpdate::ConnectionChanged(ConnectionState::Connecting)))
            .await,
        SessionUpdate::ConnectionChanged(ConnectionState::Connecting)
    );

    driver.commands.send(UiCommand::Send("hi".into())).unwrap();
    assert_eq!(
        driver
            .wait_for(|u| matches!(u, SessionUpdate::Notice(_)))
            .await,
        SessionUpdate::Notice(SessionError::TransportUnavailable.to_string())
    );

    let driver = driver.stop().await;
    assert_eq!(driver.session().connection_state(), ConnectionState::Connecting);
    assert_eq!(driver.session().membership(), Membership::Pending);
}

#[tokio::test]
async fn test_driver_surfaces_notices() {
    let history = MockHistoryApi::new().rejecting_adds("banned word");
    let mut driver = DriverHarness::start(history);

    driver.commands.send(UiCommand::Send("hi".into())).unwrap();
    assert_eq!(
        driver
            .wait_for(|u| matches!(u, SessionUpdate::Notice(_)))
            .await,
        SessionUpdate::Notice(SessionError::NoCurrentRoom.to_string())
    );

    driver
        .commands
        .send(UiCommand::AddContact("carol".into()))
        .unwrap();
    assert_eq!(
        driver
            .wait_for(|u| matches!(u, SessionUpdate::Notice(_)))
            .await,
        SessionUpdate::Notice("banned word".into())
    );

    let driver = driver.stop().await;
    assert!(driver.contacts().contacts().is_empty());
}

#[tokio::test]
async fn test_driver_keeps_live_message_when_fetch_lands_after_snapshot() {
    let history = MockHistoryApi::new()
        .with_room("general", vec![message_at("bob", "hi", 1)])
        .with_delay("general", Duration::from_millis(100));
    let mut driver = DriverHarness::start(history);
    driver.events.send(ChannelEvent::Connected).unwrap();

    driver
        .events
        .send(ChannelEvent::Server(ServerEvent::History {
            room: Some("general".into()),
            messages: vec![message_at("bob", "hi", 1)],
        }))
        .unwrap();
    driver.wait_for(is_ready_log).await;
    driver
        .events
        .send(ChannelEvent::Server(ServerEvent::Message {
            message: message_at("alice", "hello", 2),
            room: Some("general".into()),
        }))
        .unwrap();
    driver
        .wait_for(|u| matches!(u, SessionUpdate::MessageAppended(_)))
        .await;
    tokio::time::sleep(Duration::from_millis(250)).await;

    let driver = driver.stop().await;
    let log: Vec<&str> = driver
        .session()
        .log()
        .iter()
        .map(|m| m.body.as_str())
        .collect();
    assert_eq!(log, vec!["hi", "hello"]);
    assert_eq!(driver.session().membership(), Membership::Confirmed);
}

#[tokio::test]
async fn test_driver_reports_failed_history() {
    let history = MockHistoryApi::new().failing_room("general");
    let mut driver = DriverHarness::start(history);

    driver.events.send(ChannelEvent::Connected).unwrap();

    let update = driver
        .wait_for(|u| {
            matches!(
                u,
                SessionUpdate::LogReplaced {
                    status: LogStatus::Failed(_),
                    ..
                }
            )
        })
        .await;
    match update {
        SessionUpdate::LogReplaced { messages, status } => {
            assert!(messages.is_empty());
            assert_eq!(status.placeholder(), Some(LogStatus::PLACEHOLDER));
        }
        other => panic!("unexpected update: {other:?}"),
    }
    driver.stop().await;
}
