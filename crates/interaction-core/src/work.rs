//! Work requests and the interactions created for them
//!
//! A [`Work`] carries the routing metadata a contact-center backend needs to
//! pick an agent (context, topic, locale, strategy, required services and
//! preferred resources) and owns the interactions created for that request.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::InteractionConfig;
use crate::error::InteractionResult;
use crate::interaction::Interaction;
use crate::media::MediaController;
use crate::signaling::SignalingChannel;
use crate::types::{InteractionId, InteractionKind};

/// A service the routing engine must match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    /// Attribute name to accepted values, e.g. `"Language" -> ["English"]`
    pub attributes: HashMap<String, Vec<String>>,
    pub priority: Option<u32>,
    pub rank: Option<u32>,
    /// Number of resources to allocate
    pub resource_count: Option<u32>,
    pub min_proficiency: Option<u32>,
    pub max_proficiency: Option<u32>,
}

impl Service {
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.entry(name.into()).or_default().push(value.into());
        self
    }
}

/// A specific resource (agent) preferred for the request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resource {
    pub native_resource_id: String,
    pub source_name: Option<String>,
    pub attributes: HashMap<String, Vec<String>>,
}

impl Resource {
    pub fn new(native_resource_id: impl Into<String>) -> Self {
        Self {
            native_resource_id: native_resource_id.into(),
            ..Self::default()
        }
    }
}

/// One work request and its interactions
#[derive(Debug, Clone)]
pub struct Work {
    id: Uuid,
    created_at: DateTime<Utc>,
    pub work_request_id: Option<String>,
    pub context: Option<String>,
    pub topic: Option<String>,
    pub locale: Option<String>,
    pub routing_strategy: Option<String>,
    pub services: Vec<Service>,
    pub resources: Vec<Resource>,
    audio_config: InteractionConfig,
    video_config: InteractionConfig,
    interactions: Arc<DashMap<InteractionId, Interaction>>,
}

impl Default for Work {
    fn default() -> Self {
        Self::new()
    }
}

impl Work {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            work_request_id: None,
            context: None,
            topic: None,
            locale: None,
            routing_strategy: None,
            services: Vec::new(),
            resources: Vec::new(),
            audio_config: InteractionConfig::audio(),
            video_config: InteractionConfig::video(),
            interactions: Arc::new(DashMap::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_routing_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.routing_strategy = Some(strategy.into());
        self
    }

    pub fn with_service(mut self, service: Service) -> Self {
        self.services.push(service);
        self
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Template for audio interactions; its kind is forced to audio
    pub fn with_audio_config(mut self, config: InteractionConfig) -> Self {
        self.audio_config = InteractionConfig {
            kind: InteractionKind::Audio,
            ..config
        };
        self
    }

    /// Template for video interactions; its kind is forced to video
    pub fn with_video_config(mut self, config: InteractionConfig) -> Self {
        self.video_config = InteractionConfig {
            kind: InteractionKind::Video,
            ..config
        };
        self
    }

    /// Create and track an audio interaction
    pub fn create_audio_interaction(
        &self,
        media: Arc<dyn MediaController>,
        signaling: Arc<dyn SignalingChannel>,
    ) -> InteractionResult<Interaction> {
        self.create_interaction(self.audio_config.clone(), media, signaling)
    }

    /// Create and track a video interaction
    pub fn create_video_interaction(
        &self,
        media: Arc<dyn MediaController>,
        signaling: Arc<dyn SignalingChannel>,
    ) -> InteractionResult<Interaction> {
        self.create_interaction(self.video_config.clone(), media, signaling)
    }

    fn create_interaction(
        &self,
        config: InteractionConfig,
        media: Arc<dyn MediaController>,
        signaling: Arc<dyn SignalingChannel>,
    ) -> InteractionResult<Interaction> {
        let interaction = Interaction::new(config, media, signaling)?;
        self.interactions.insert(interaction.id(), interaction.clone());
        debug!(
            "Work {} created {:?} interaction {}",
            self.id,
            interaction.kind(),
            interaction.id()
        );
        Ok(interaction)
    }

    pub fn get(&self, id: &InteractionId) -> Option<Interaction> {
        self.interactions.get(id).map(|entry| entry.value().clone())
    }

    /// All tracked interactions
    pub fn interactions(&self) -> Vec<Interaction> {
        self.interactions.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Interactions that have not reached a terminal state
    pub fn active_count(&self) -> usize {
        self.interactions
            .iter()
            .filter(|entry| !entry.value().state().is_terminal())
            .count()
    }

    /// Stop tracking an interaction without ending it
    pub fn remove(&self, id: &InteractionId) -> Option<Interaction> {
        self.interactions.remove(id).map(|(_, interaction)| interaction)
    }

    /// End every interaction that has not ended yet; returns how many were asked to end
    pub fn end_all(&self) -> usize {
        let mut ended = 0;
        for interaction in self.interactions() {
            if !interaction.state().is_terminal() && interaction.end().is_ok() {
                ended += 1;
            }
        }
        info!("Work {} ended {} interaction(s)", self.id, ended);
        ended
    }

    /// Discard and stop tracking every interaction
    pub fn discard_all(&self) {
        for interaction in self.interactions() {
            if let Err(e) = interaction.discard() {
                debug!("Work {} discard of {} failed: {}", self.id, interaction.id(), e);
            }
        }
        self.interactions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_metadata_builders() {
        let work = Work::new()
            .with_context("billing question")
            .with_topic("billing")
            .with_locale("en_US")
            .with_routing_strategy("Most Idle")
            .with_service(
                Service::default()
                    .with_attribute("Language", "English")
                    .with_attribute("Language", "French"),
            )
            .with_resource(Resource::new("agent-1001"));

        assert_eq!(work.topic.as_deref(), Some("billing"));
        assert_eq!(work.services[0].attributes["Language"], vec!["English", "French"]);
        assert_eq!(work.resources[0].native_resource_id, "agent-1001");
        assert!(work.interactions().is_empty());
    }

    #[test]
    fn test_templates_keep_their_kind() {
        let work = Work::new()
            .with_audio_config(InteractionConfig::video())
            .with_video_config(InteractionConfig::audio().with_destination("sip:video@example.com"));

        assert_eq!(work.audio_config.kind, InteractionKind::Audio);
        assert_eq!(work.video_config.kind, InteractionKind::Video);
        assert_eq!(
            work.video_config.destination_address.as_deref(),
            Some("sip:video@example.com")
        );
    }
}
