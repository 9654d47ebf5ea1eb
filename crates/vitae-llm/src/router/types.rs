//! Core routing types
//!
//! This module contains the closed [`ProviderId`] registry key, the
//! open [`TaskType`] key and [`ModelTarget`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Provider Id
// ============================================================================

/// Backend a request can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Anthropic Claude
    Anthropic,
    /// OpenAI
    OpenAi,
    /// Google Gemini
    Gemini,
    /// Groq (OpenAI-compatible inference)
    Groq,
}

impl ProviderId {
    /// Every known provider
    pub const ALL: [ProviderId; 4] = [Self::Anthropic, Self::OpenAi, Self::Gemini, Self::Groq];

    /// Canonical lowercase name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Groq => "groq",
        }
    }

    /// Environment variable holding this provider's API key
    #[must_use]
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Config(format!("unknown provider '{s}'")))
    }
}

// ============================================================================
// Task Type
// ============================================================================

/// Kind of request, used only to look up a routing policy
///
/// Any string is accepted. Keys without a dedicated policy resolve to the
/// routing table's default entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskType(Cow<'static, str>);

impl TaskType {
    /// Rewrite the profile summary
    pub const IMPROVE_SUMMARY: TaskType = TaskType::from_static("improve_summary");
    /// Rewrite an experience entry
    pub const IMPROVE_EXPERIENCE: TaskType = TaskType::from_static("improve_experience");
    /// Suggest skills for a profile
    pub const SUGGEST_SKILLS: TaskType = TaskType::from_static("suggest_skills");
    /// Extract structured fields from a job posting
    pub const PARSE_JOB: TaskType = TaskType::from_static("parse_job");
    /// Score a résumé against a job posting
    pub const SCORE_RESUME: TaskType = TaskType::from_static("score_resume");
    /// Draft a cover letter
    pub const COVER_LETTER: TaskType = TaskType::from_static("cover_letter");
    /// Translate résumé content
    pub const TRANSLATE: TaskType = TaskType::from_static("translate");
    /// Free-form assistant chat
    pub const CHAT: TaskType = TaskType::from_static("chat");

    /// Task key known at compile time
    #[must_use]
    pub const fn from_static(key: &'static str) -> Self {
        Self(Cow::Borrowed(key))
    }

    /// Task key
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for TaskType {
    fn from(key: &'static str) -> Self {
        Self::from_static(key)
    }
}

impl From<String> for TaskType {
    fn from(key: String) -> Self {
        Self(Cow::Owned(key))
    }
}

// ============================================================================
// Model Target
// ============================================================================

/// A provider together with the abstract model key to ask it for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTarget {
    /// Backend
    pub provider: ProviderId,
    /// Abstract model key, translated by the adapter
    pub model: String,
}

impl ModelTarget {
    /// Create a target
    #[must_use]
    pub fn new(provider: ProviderId, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

impl fmt::Display for ModelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}
