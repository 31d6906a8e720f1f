use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub company: String,
    pub role: String,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutreachKind {
    Initial,
    FollowUp,
}

impl OutreachKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutreachKind::Initial => "initial",
            OutreachKind::FollowUp => "follow_up",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initial" => Some(OutreachKind::Initial),
            "follow_up" => Some(OutreachKind::FollowUp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachEvent {
    pub id: i64,
    pub application_id: i64,
    pub channel: String,
    pub kind: OutreachKind,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Acknowledgement,
    Rejection,
    Interview,
    Offer,
}

impl ResponseKind {
    /// A terminal response ends the application's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResponseKind::Rejection | ResponseKind::Offer)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Acknowledgement => "acknowledgement",
            ResponseKind::Rejection => "rejection",
            ResponseKind::Interview => "interview",
            ResponseKind::Offer => "offer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "acknowledgement" | "ack" => Some(ResponseKind::Acknowledgement),
            "rejection" => Some(ResponseKind::Rejection),
            "interview" => Some(ResponseKind::Interview),
            "offer" => Some(ResponseKind::Offer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEvent {
    pub id: i64,
    pub application_id: i64,
    pub channel: Option<String>, // channel the response arrived through, when known
    pub kind: ResponseKind,
    pub at: DateTime<Utc>,
}

/// The three record kinds the store holds, as one tagged variant.
/// Anything that walks an interleaved event log matches on this exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Application(Application),
    Outreach(OutreachEvent),
    Response(ResponseEvent),
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::Application(a) => a.applied_at,
            Event::Outreach(o) => o.at,
            Event::Response(r) => r.at,
        }
    }
}

/// Full event set for one application, as read from the store.
#[derive(Debug, Clone)]
pub struct ApplicationEvents {
    pub application: Application,
    pub outreach: Vec<OutreachEvent>,
    pub responses: Vec<ResponseEvent>,
}

impl ApplicationEvents {
    /// Every record for this application interleaved in time order.
    pub fn timeline(&self) -> Vec<Event> {
        let mut events: Vec<Event> =
            std::iter::once(Event::Application(self.application.clone()))
                .chain(self.outreach.iter().cloned().map(Event::Outreach))
                .chain(self.responses.iter().cloned().map(Event::Response))
                .collect();
        events.sort_by_key(|e| e.at());
        events
    }
}

/// Full event set for one channel, aggregated across applications.
#[derive(Debug, Clone)]
pub struct ChannelEvents {
    pub channel: String,
    pub outreach: Vec<OutreachEvent>,
    pub responses: Vec<ResponseEvent>,
}
