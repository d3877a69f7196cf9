//! The part factory.
//!
//! A [`Spawner`] turns a definition (plus an optional state template) into a
//! bound part in a [`PartGraph`]. Behaviors are registered per
//! [`PartType`]; the spawner checks the template's shape before the part
//! ever sees it, and always clones the template.

use crate::behavior::PartBehavior;
use crate::definition::{DefinitionRegistry, PartDefinition};
use crate::event::GraphEvent;
use crate::graph::PartGraph;
use crate::id::{DefinitionId, PartId, PartType};
use crate::part::{PartError, PartInstance};
use crate::state::RuntimeState;
use crate::store::StoredPart;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds the behavior for a freshly spawned part.
pub type BehaviorFactory = fn(&PartDefinition) -> Box<dyn PartBehavior>;

#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("unknown definition id {0:?}")]
    UnknownDefinition(DefinitionId),
    #[error("unknown definition name '{0}'")]
    UnknownName(String),
    #[error("template state is for a {found} part, definition is a {expected}")]
    TemplateMismatch { expected: PartType, found: PartType },
    #[error("no behavior registered for {0} parts")]
    NoBehavior(PartType),
    #[error("spawned part {part:?} failed to bind")]
    Bind {
        part: PartId,
        #[source]
        source: PartError,
    },
}

#[derive(Debug)]
pub struct Spawner {
    registry: DefinitionRegistry,
    factories: HashMap<PartType, BehaviorFactory>,
}

impl Spawner {
    pub fn new(registry: DefinitionRegistry) -> Self {
        Self {
            registry,
            factories: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    /// Register the behavior factory for a part type, replacing any earlier
    /// one.
    pub fn register_behavior(&mut self, part_type: PartType, factory: BehaviorFactory) {
        self.factories.insert(part_type, factory);
    }

    pub fn has_behavior(&self, part_type: PartType) -> bool {
        self.factories.contains_key(&part_type)
    }

    /// Spawn a bound part from a definition.
    ///
    /// The runtime state is `template` cloned, or the definition's defaults.
    pub fn spawn(
        &self,
        graph: &mut PartGraph,
        definition: DefinitionId,
        template: Option<&RuntimeState>,
    ) -> Result<PartId, SpawnError> {
        let def = self
            .registry
            .get(definition)
            .ok_or(SpawnError::UnknownDefinition(definition))?;
        self.spawn_from(graph, def.clone(), template)
    }

    pub fn spawn_by_name(
        &self,
        graph: &mut PartGraph,
        name: &str,
        template: Option<&RuntimeState>,
    ) -> Result<PartId, SpawnError> {
        let def = self
            .registry
            .by_name(name)
            .ok_or_else(|| SpawnError::UnknownName(name.to_string()))?;
        self.spawn_from(graph, def.clone(), template)
    }

    /// Bring a stored part back into the world with its stored state.
    pub fn respawn_stored(
        &self,
        graph: &mut PartGraph,
        stored: &StoredPart,
    ) -> Result<PartId, SpawnError> {
        self.spawn(graph, stored.definition, Some(&stored.state))
    }

    fn spawn_from(
        &self,
        graph: &mut PartGraph,
        def: Arc<PartDefinition>,
        template: Option<&RuntimeState>,
    ) -> Result<PartId, SpawnError> {
        if let Some(found) = template.map(|t| t.part_type()).filter(|t| *t != def.part_type) {
            return Err(SpawnError::TemplateMismatch {
                expected: def.part_type,
                found,
            });
        }
        let factory = self
            .factories
            .get(&def.part_type)
            .ok_or(SpawnError::NoBehavior(def.part_type))?;

        let state = match template {
            Some(t) => t.clone(),
            None => RuntimeState::from_definition(&def),
        };
        let definition_id = def.id;
        let part = graph.insert(PartInstance::new(factory(&def)));
        graph
            .bind(part, state, def)
            .map_err(|source| SpawnError::Bind { part, source })?;

        tracing::debug!(?part, ?definition_id, "part spawned");
        graph.events.push(GraphEvent::PartSpawned {
            part,
            definition: definition_id,
        });
        Ok(part)
    }
}
