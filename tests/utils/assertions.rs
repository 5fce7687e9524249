//! Test assertion helpers - fluent API for verifying delivered frames
#![allow(dead_code)] // Test utilities may not all be used in every test

use serde_json::Value;

use roomchat::websockets::{EventName, WireFrame};

use super::setup::TestSetup;

// ============================================================================
// Assertion Helpers
// ============================================================================

pub struct FrameAssertion<'a> {
    setup: &'a TestSetup,
    connections: Vec<&'a str>,
}

impl<'a> FrameAssertion<'a> {
    pub fn for_connections(setup: &'a TestSetup, connections: Vec<&'a str>) -> Self {
        Self { setup, connections }
    }

    /// Assert every connection received a frame with this event (consumes it)
    pub async fn received_event(self, expected: EventName) -> FrameContent {
        let mut frames = vec![];

        for connection in &self.connections {
            let text = self
                .setup
                .mock_conn_manager
                .consume_event_for(connection, expected)
                .await
                .unwrap_or_else(|| panic!("{connection} should have received a {expected} frame"));
            frames.push(WireFrame::parse(&text).unwrap());
        }

        let first = &frames[0].data;
        for (i, frame) in frames.iter().enumerate().skip(1) {
            assert_eq!(
                &frame.data, first,
                "{} payload differs from {}",
                self.connections[i], self.connections[0]
            );
        }

        FrameContent {
            data: first.clone(),
        }
    }

    /// Assert the connections have nothing left to read
    pub async fn received_no_frames(self) {
        for connection in &self.connections {
            let frames = self.setup.mock_conn_manager.get_messages_for(connection).await;
            assert!(
                frames.is_empty(),
                "{connection} should not have received any frames, got {frames:?}"
            );
        }
    }
}

// ============================================================================
// Frame Content Assertions
// ============================================================================

pub struct FrameContent {
    pub data: Value,
}

impl FrameContent {
    /// Assert the frame is a plain-text system notification
    pub fn with_system_text(self, expected: &str) -> Self {
        assert_eq!(self.data, Value::String(expected.to_string()));
        self
    }

    pub fn with_sender(self, expected: &str) -> Self {
        assert_eq!(self.data["sender"], expected);
        self
    }

    pub fn with_body(self, expected: &str) -> Self {
        assert_eq!(self.data["body"], expected);
        self
    }

    pub fn with_room(self, expected: &str) -> Self {
        assert_eq!(self.data["room"], expected);
        self
    }

    /// Bodies of a `message_history` snapshot, in order
    pub fn history_bodies(&self) -> Vec<String> {
        self.data["messages"]
            .as_array()
            .expect("message_history carries a messages array")
            .iter()
            .map(|m| m["body"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}
