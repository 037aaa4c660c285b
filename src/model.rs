//! UI-agnostic record types
//!
//! Plain display records shared by the views, the generation client and the
//! one-shot CLI commands. Nothing here is persisted.

use serde::{Deserialize, Serialize};

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Model,
}

/// A chat message in the research assistant conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    #[serde(default)]
    pub is_streaming: bool,
}

impl ChatMessage {
    pub fn user(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sender: Sender::User,
            text: text.into(),
            is_streaming: false,
        }
    }

    pub fn model(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sender: Sender::Model,
            text: text.into(),
            is_streaming: false,
        }
    }
}

/// One entry of the structured news response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub uri: String,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoiaStatus {
    Submitted,
    InProgress,
    Completed,
    Denied,
}

impl FoiaStatus {
    pub fn label(&self) -> &'static str {
        match self {
            FoiaStatus::Submitted => "Submitted",
            FoiaStatus::InProgress => "In Progress",
            FoiaStatus::Completed => "Completed",
            FoiaStatus::Denied => "Denied",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoiaRequest {
    pub id: String,
    pub subject: String,
    pub status: FoiaStatus,
    pub date: String,
}

/// A document that has been run through the analyzer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UfoFile {
    pub id: String,
    pub name: String,
    pub description: String,
    pub added: String,
}

pub fn seed_foia_requests() -> Vec<FoiaRequest> {
    vec![
        FoiaRequest {
            id: "FOIA-001".to_string(),
            subject: "Project Blue Book - Unidentified Aerial Phenomena Sightings".to_string(),
            status: FoiaStatus::Completed,
            date: "2023-10-26".to_string(),
        },
        FoiaRequest {
            id: "FOIA-002".to_string(),
            subject: "AATIP Program Funding and Research Data".to_string(),
            status: FoiaStatus::InProgress,
            date: "2024-01-15".to_string(),
        },
    ]
}

pub fn seed_files() -> Vec<UfoFile> {
    vec![
        UfoFile {
            id: "FILE-001".to_string(),
            name: "Gimbal_Incident_Report.pdf".to_string(),
            description: "Leaked report detailing the 2004 USS Nimitz encounter. Key entities: USS Nimitz, USS Princeton, F/A-18 Super Hornets. Connects to \"Tic Tac\" phenomena.".to_string(),
            added: "2023-05-12".to_string(),
        },
        UfoFile {
            id: "FILE-002".to_string(),
            name: "Varginha_Witness_Testimonies.txt".to_string(),
            description: "Collection of transcribed witness accounts from the 1996 Brazil incident. Details non-human biologic entities and military response.".to_string(),
            added: "2023-08-22".to_string(),
        },
    ]
}
