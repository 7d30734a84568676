//! Scripted scenarios played against a runtime.
//!
//! A scenario is a TOML file listing characters and a sequence of steps. Time
//! is driven by `advance` steps only, so a scenario is reproducible.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, info};

use vitals_core::{
    AttributeKind, AttributeSet, ChangeEvent, CharacterId, EffectHandle, FamilyDefaults, ModOp,
    ModificationRequest, StatFamily, Tick, Ticket, VitalsConfig, VitalsError,
};
use vitals_runtime::{CharacterStatus, Runtime, RuntimeConfig, RuntimeError, Topic};

const BUILTIN: &str = include_str!("../scenarios/default.toml");

/// Values are compared with this tolerance in `expect` steps.
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    pub characters: Vec<CharacterSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CharacterSpec {
    pub id: u32,
    #[serde(default)]
    pub name: Option<String>,
    pub health: Option<FamilyDefaults>,
    pub mana: Option<FamilyDefaults>,
    pub stamina: Option<FamilyDefaults>,
}

impl CharacterSpec {
    /// Explicit attribute set, or `None` to spawn from the configured
    /// defaults.
    fn attributes(&self, config: &VitalsConfig) -> Option<AttributeSet> {
        let families = [
            (StatFamily::Health, self.health),
            (StatFamily::Mana, self.mana),
            (StatFamily::Stamina, self.stamina),
        ];
        if families.iter().all(|(_, values)| values.is_none()) {
            return None;
        }

        let builder = families.into_iter().fold(
            AttributeSet::builder().policy(config.rescale_policy),
            |builder, (family, values)| match values {
                Some(values) => builder.family(family, values),
                None => builder,
            },
        );
        Some(builder.build())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "do", rename_all = "snake_case")]
pub enum Step {
    Activate {
        target: u32,
    },
    Deactivate {
        target: u32,
    },
    Rearm {
        target: u32,
    },
    Submit {
        target: u32,
        attribute: String,
        op: ModOp,
        magnitude: f64,
        #[serde(default)]
        source: u64,
    },
    Enqueue {
        target: u32,
        attribute: String,
        op: ModOp,
        magnitude: f64,
        #[serde(default)]
        source: u64,
        arrival: u64,
        #[serde(default)]
        label: Option<String>,
    },
    Withdraw {
        label: String,
    },
    Flush {
        target: u32,
    },
    /// Advance one character, or all of them when `target` is omitted.
    Advance {
        #[serde(default)]
        target: Option<u32>,
        millis: u64,
    },
    Expect {
        target: u32,
        attribute: String,
        value: f64,
    },
}

/// What one step did.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub step: Step,
    pub changes: Vec<ChangeEvent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CharacterReport {
    pub name: Option<String>,
    pub status: CharacterStatus,
    /// Hex SHA-256 of the final snapshot.
    pub digest: String,
    pub replica_consistent: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub steps: Vec<StepReport>,
    pub characters: Vec<CharacterReport>,
    /// Attribute events seen on the bus.
    pub published: usize,
}

impl Scenario {
    pub fn parse(source: &str) -> Result<Self> {
        toml::from_str(source).context("Failed to parse scenario TOML")
    }

    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Plays every step and returns the report.
    ///
    /// Regen runs only on `advance` steps and replication is always on, so
    /// the report can verify every replica.
    pub async fn run(&self, config: RuntimeConfig) -> Result<ScenarioReport> {
        let config = RuntimeConfig {
            regen_enabled: false,
            replicate: true,
            event_buffer_size: config.event_buffer_size.max(4096),
            ..config
        };

        let mut builder = Runtime::builder().config(config.clone());
        for spec in &self.characters {
            let id = CharacterId(spec.id);
            builder = match spec.attributes(&config.vitals) {
                Some(attributes) => builder.character_with(id, attributes),
                None => builder.character(id),
            };
        }
        let runtime = builder.build().await.context("Failed to start runtime")?;
        let mut feed = runtime.subscribe(Topic::Attributes);

        info!(scenario = %self.name, steps = self.steps.len(), "playing scenario");

        let mut player = Player {
            runtime: &runtime,
            tickets: HashMap::new(),
        };
        let mut steps = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            let mut report = player
                .play(step)
                .await
                .with_context(|| format!("step {index} ({step:?}) failed"))?;
            report.index = index;
            steps.push(report);
        }

        let mut published = 0;
        loop {
            match feed.try_recv() {
                Ok(_) => published += 1,
                Err(TryRecvError::Lagged(skipped)) => published += skipped as usize,
                Err(_) => break,
            }
        }

        let mut characters = Vec::with_capacity(self.characters.len());
        for spec in &self.characters {
            let id = CharacterId(spec.id);
            let status = runtime.handle(id)?.status().await?;
            let replica_consistent = match runtime.mirror(id)? {
                Some(mirror) => mirror.is_consistent_with(&status.snapshot),
                None => false,
            };
            characters.push(CharacterReport {
                name: spec.name.clone(),
                digest: hex::encode(status.snapshot.digest()),
                status,
                replica_consistent,
            });
        }

        runtime.shutdown().await?;

        Ok(ScenarioReport {
            scenario: self.name.clone(),
            steps,
            characters,
            published,
        })
    }
}

struct Player<'a> {
    runtime: &'a Runtime,
    tickets: HashMap<String, (CharacterId, Ticket)>,
}

impl Player<'_> {
    async fn play(&mut self, step: &Step) -> Result<StepReport> {
        let mut report = StepReport {
            index: 0,
            step: step.clone(),
            changes: Vec::new(),
            rejected: Vec::new(),
        };

        match step {
            Step::Activate { target } => self.handle(*target)?.activate().await?,
            Step::Deactivate { target } => self.handle(*target)?.deactivate().await?,
            Step::Rearm { target } => {
                let armed = self.handle(*target)?.rearm().await?;
                debug!(character = *target, armed, "rearm");
            }
            Step::Submit {
                target,
                attribute,
                op,
                magnitude,
                source,
            } => {
                let submitted = match ModificationRequest::named(
                    attribute,
                    *op,
                    *magnitude,
                    EffectHandle(*source),
                ) {
                    Ok(request) => self.runtime.route(CharacterId(*target), request).await,
                    Err(error) => Err(RuntimeError::Modify(error)),
                };
                match submitted {
                    Ok(changes) => report.changes.extend(changes),
                    Err(RuntimeError::Modify(error)) => {
                        report.rejected.push(format!("{}: {error}", error.error_code()));
                    }
                    Err(error) => return Err(error.into()),
                }
            }
            Step::Enqueue {
                target,
                attribute,
                op,
                magnitude,
                source,
                arrival,
                label,
            } => {
                let request =
                    ModificationRequest::named(attribute, *op, *magnitude, EffectHandle(*source))?;
                let id = CharacterId(*target);
                let ticket = self
                    .runtime
                    .route_queued(id, request, Tick(*arrival))
                    .await?;
                if let Some(label) = label {
                    self.tickets.insert(label.clone(), (id, ticket));
                }
            }
            Step::Withdraw { label } => {
                let Some((id, ticket)) = self.tickets.get(label).copied() else {
                    bail!("no queued request labelled `{label}`");
                };
                if !self.runtime.handle(id)?.withdraw(ticket).await? {
                    report.rejected.push(format!("`{label}` was already applied"));
                }
            }
            Step::Flush { target } => {
                let outcome = self.handle(*target)?.flush().await?;
                report.changes = outcome.events;
                report.rejected = outcome
                    .rejected
                    .iter()
                    .map(|(_, error)| format!("{}: {error}", error.error_code()))
                    .collect();
            }
            Step::Advance { target, millis } => {
                let elapsed = Duration::from_millis(*millis);
                let targets: Vec<CharacterId> = match target {
                    Some(target) => vec![CharacterId(*target)],
                    None => self.runtime.characters().collect(),
                };
                for id in targets {
                    let events = self.runtime.handle(id)?.advance(elapsed).await?;
                    report.changes.extend(events);
                }
            }
            Step::Expect {
                target,
                attribute,
                value,
            } => {
                let kind = AttributeKind::parse(attribute)?;
                let snapshot = self.handle(*target)?.snapshot().await?;
                let Some(actual) = snapshot.current(kind) else {
                    bail!("character {target} does not own {kind}");
                };
                if (actual - value).abs() > EPSILON {
                    bail!("expected {kind} of character {target} to be {value}, found {actual}");
                }
            }
        }

        Ok(report)
    }

    fn handle(&self, target: u32) -> Result<vitals_runtime::CharacterHandle> {
        Ok(self.runtime.handle(CharacterId(target))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_config() -> RuntimeConfig {
        RuntimeConfig::default()
    }

    #[tokio::test]
    async fn builtin_scenario_passes() {
        let scenario = Scenario::builtin().unwrap();
        let report = scenario.run(manual_config()).await.unwrap();

        assert_eq!(report.steps.len(), scenario.steps.len());
        assert!(report.characters.iter().all(|c| c.replica_consistent));

        let goblin = &report.characters[1];
        assert_eq!(goblin.status.snapshot.current(AttributeKind::Health), Some(10.0));
        assert_eq!(goblin.digest.len(), 64);

        let refused = report.steps.iter().find(|s| !s.rejected.is_empty()).unwrap();
        assert!(refused.rejected[0].starts_with("UNKNOWN_ATTRIBUTE"));
        assert!(report.published > 0);
    }

    #[tokio::test]
    async fn failed_expectation_aborts() {
        let scenario = Scenario::parse(
            r#"
[[characters]]
id = 7
health = { max = 10.0 }

[[steps]]
do = "expect"
target = 7
attribute = "health"
value = 9.0
"#,
        )
        .unwrap();

        let err = scenario.run(manual_config()).await.unwrap_err();
        assert!(format!("{err:#}").contains("expected health of character 7"));
    }

    #[tokio::test]
    async fn scenario_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("duel.toml");
        std::fs::write(
            &path,
            r#"
name = "duel"

[[characters]]
id = 1
stamina = { max = 100.0, current = 20.0, regen = 10.0 }

[[steps]]
do = "activate"
target = 1

[[steps]]
do = "advance"
target = 1
millis = 2500

[[steps]]
do = "expect"
target = 1
attribute = "stamina"
value = 40.0
"#,
        )
        .unwrap();

        let report = Scenario::load(&path).unwrap().run(manual_config()).await.unwrap();
        assert_eq!(report.scenario, "duel");
        assert_eq!(report.steps[1].changes.len(), 2);
    }

    #[test]
    fn unknown_step_is_a_parse_error() {
        let err = Scenario::parse(
            r#"
[[characters]]
id = 1

[[steps]]
do = "teleport"
target = 1
"#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse scenario TOML"));
    }
}
