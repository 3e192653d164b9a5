//! Interpreter - Execute Effects using a Provider
//!
//! The Interpreter executes Effects contained in a Plan in order,
//! collecting the results. This is where side effects actually occur.
//! References are resolved just before each Effect runs, using values
//! produced by the Effects that ran earlier.

use crate::dependency::{Bindings, resolve_resource};
use crate::effect::Effect;
use crate::plan::Plan;
use crate::provider::{Provider, ProviderError, ProviderResult};
use crate::resource::{ResourceId, State, Value};

/// Result of executing each Effect
#[derive(Debug)]
pub enum EffectOutcome {
    /// Data source read succeeded
    Read { state: State },
    /// Create succeeded
    Created { state: State },
    /// Update succeeded
    Updated { state: State },
    /// Delete followed by create succeeded
    Replaced { state: State },
    /// Delete succeeded
    Deleted { id: ResourceId },
    /// Skipped (e.g., dry-run)
    Skipped { id: ResourceId, reason: String },
}

impl EffectOutcome {
    /// State the resource ended up in, if it still exists
    pub fn state(&self) -> Option<&State> {
        match self {
            EffectOutcome::Read { state }
            | EffectOutcome::Created { state }
            | EffectOutcome::Updated { state }
            | EffectOutcome::Replaced { state } => Some(state),
            EffectOutcome::Deleted { .. } | EffectOutcome::Skipped { .. } => None,
        }
    }
}

/// Result of executing the entire Plan
#[derive(Debug)]
pub struct ApplyResult {
    pub outcomes: Vec<Result<EffectOutcome, ProviderError>>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl ApplyResult {
    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }
}

/// Interpreter configuration
#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    /// If true, skip actual side effects
    pub dry_run: bool,
    /// Continue on error
    pub continue_on_error: bool,
}

/// Interpreter that executes Effects using a Provider
pub struct Interpreter<P: Provider> {
    provider: P,
    config: InterpreterConfig,
}

impl<P: Provider> Interpreter<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            config: InterpreterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Execute a Plan, interpreting all Effects and causing side effects
    ///
    /// `bindings` starts with the values known before apply (usually the
    /// recorded state) and is updated after every successful Effect.
    pub async fn apply(&self, plan: &Plan, bindings: &mut Bindings) -> ApplyResult {
        let mut outcomes = Vec::new();
        let mut success_count = 0;
        let mut failure_count = 0;

        for effect in plan.effects() {
            log::info!("{}", effect);
            let result = self
                .execute_effect(effect, bindings)
                .await
                .map_err(|e| {
                    if e.resource_id.is_some() {
                        e
                    } else {
                        e.for_resource(effect.resource_id().clone())
                    }
                });

            match &result {
                Ok(outcome) => {
                    success_count += 1;
                    record_binding(effect, outcome, bindings);
                }
                Err(e) => {
                    log::error!("{} failed: {}", effect, e);
                    failure_count += 1;
                    if !self.config.continue_on_error {
                        outcomes.push(result);
                        break;
                    }
                }
            }

            outcomes.push(result);
        }

        ApplyResult {
            outcomes,
            success_count,
            failure_count,
        }
    }

    /// Execute a single Effect
    async fn execute_effect(
        &self,
        effect: &Effect,
        bindings: &Bindings,
    ) -> ProviderResult<EffectOutcome> {
        if self.config.dry_run {
            return Ok(EffectOutcome::Skipped {
                id: effect.resource_id().clone(),
                reason: "dry-run mode".to_string(),
            });
        }

        match effect {
            Effect::Read(resource) => {
                let resource = resolve_resource(resource, bindings);
                let state = self.provider.read_data_source(&resource).await?;
                Ok(EffectOutcome::Read { state })
            }
            Effect::Create(resource) => {
                let resource = resolve_resource(resource, bindings);
                let state = self.provider.create(&resource).await?;
                Ok(EffectOutcome::Created { state })
            }
            Effect::Update { id, from, to, .. } => {
                let identifier = from.identifier.as_deref().ok_or_else(|| {
                    ProviderError::new("cannot update a resource without an identifier")
                })?;
                let to = resolve_resource(to, bindings);
                let state = self.provider.update(id, identifier, from, &to).await?;
                Ok(EffectOutcome::Updated { state })
            }
            Effect::Replace { id, from, to, .. } => {
                if let Some(identifier) = from.identifier.as_deref() {
                    self.provider.delete(id, identifier).await?;
                }
                let to = resolve_resource(to, bindings);
                let state = self.provider.create(&to).await?;
                Ok(EffectOutcome::Replaced { state })
            }
            Effect::Delete { id, identifier } => {
                self.provider.delete(id, identifier).await?;
                Ok(EffectOutcome::Deleted { id: id.clone() })
            }
        }
    }
}

/// Make the values produced by an Effect visible to later references
fn record_binding(effect: &Effect, outcome: &EffectOutcome, bindings: &mut Bindings) {
    let binding = match effect {
        Effect::Read(resource) => resource.binding(),
        _ => effect.resource_id().address(),
    };

    match outcome.state() {
        Some(state) => {
            let mut attrs = state.attributes.clone();
            if let Some(identifier) = &state.identifier {
                attrs
                    .entry("id".to_string())
                    .or_insert_with(|| Value::String(identifier.clone()));
            }
            bindings.insert(binding, attrs);
        }
        None => {
            if matches!(outcome, EffectOutcome::Deleted { .. }) {
                bindings.remove(&binding);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::tests::MockProvider;
    use crate::resource::Resource;

    #[tokio::test]
    async fn apply_empty_plan() {
        let interpreter = Interpreter::new(MockProvider::default());
        let plan = Plan::new();
        let result = interpreter.apply(&plan, &mut Bindings::new()).await;

        assert!(result.is_success());
        assert_eq!(result.success_count, 0);
    }

    #[tokio::test]
    async fn apply_create_effect() {
        let interpreter = Interpreter::new(MockProvider::default());
        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("test", "example")));

        let mut bindings = Bindings::new();
        let result = interpreter.apply(&plan, &mut bindings).await;

        assert!(result.is_success());
        assert_eq!(result.success_count, 1);
        assert_eq!(
            bindings["test.example"].get("id"),
            Some(&Value::String("/mock/example".to_string()))
        );
    }

    #[tokio::test]
    async fn references_resolve_from_earlier_effects() {
        let interpreter = Interpreter::new(MockProvider::default());
        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("azurerm_dns_zone", "main")));
        plan.add(Effect::Create(
            Resource::new("azurerm_dns_a_record", "www").with_attribute(
                "dns_zone_id",
                Value::ResourceRef("azurerm_dns_zone.main".to_string(), "id".to_string()),
            ),
        ));

        let result = interpreter.apply(&plan, &mut Bindings::new()).await;
        assert!(result.is_success());

        let record = result.outcomes[1].as_ref().unwrap().state().unwrap();
        assert_eq!(
            record.attributes.get("dns_zone_id"),
            Some(&Value::String("/mock/main".to_string()))
        );
    }

    #[tokio::test]
    async fn replace_deletes_before_create() {
        let provider = MockProvider::default();
        let interpreter = Interpreter::new(provider);
        let id = ResourceId::new("azurerm_dns_a_record", "www");
        let mut plan = Plan::new();
        plan.add(Effect::Replace {
            id: id.clone(),
            from: State::existing(id.clone(), Default::default()).with_identifier("/old"),
            to: Resource::new("azurerm_dns_a_record", "www"),
            forced: vec!["name".to_string()],
        });

        let result = interpreter.apply(&plan, &mut Bindings::new()).await;
        assert!(result.is_success());
        assert_eq!(
            *interpreter.provider().calls.lock().unwrap(),
            vec![
                "delete azurerm_dns_a_record.www".to_string(),
                "create azurerm_dns_a_record.www".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn update_without_identifier_fails_and_stops() {
        let interpreter = Interpreter::new(MockProvider::default());
        let id = ResourceId::new("azurerm_dns_a_record", "www");
        let mut plan = Plan::new();
        plan.add(Effect::Update {
            id: id.clone(),
            from: State::existing(id.clone(), Default::default()),
            to: Resource::new("azurerm_dns_a_record", "www"),
            changed: vec!["ttl".to_string()],
        });
        plan.add(Effect::Create(Resource::new("test", "never")));

        let result = interpreter.apply(&plan, &mut Bindings::new()).await;
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.outcomes.len(), 1);
        let err = result.outcomes[0].as_ref().unwrap_err();
        assert_eq!(err.resource_id, Some(id));
    }

    #[tokio::test]
    async fn dry_run_skips_effects() {
        let config = InterpreterConfig {
            dry_run: true,
            ..Default::default()
        };
        let interpreter = Interpreter::new(MockProvider::default()).with_config(config);
        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("test", "example")));

        let result = interpreter.apply(&plan, &mut Bindings::new()).await;

        assert!(result.is_success());
        assert!(matches!(
            result.outcomes[0],
            Ok(EffectOutcome::Skipped { .. })
        ));
        assert!(interpreter.provider().calls.lock().unwrap().is_empty());
    }
}
