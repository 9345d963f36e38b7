pub mod compile;
pub mod evaluate;
pub mod filter;
pub mod matching;

use std::fs;
use std::io::{self, Read};
use std::sync::Arc;

use anyhow::{Context, Result};
use octofhir_permission::{
    FhirAuthorizationEngine, FhirJsonModel, FhirPathEngineEvaluator, PermissionConfig,
    PermissionContext, PermissionEvaluator, StaticPermissionService,
};
use serde_json::Value;

/// Everything a command needs to talk to the engine.
pub struct Session {
    pub config: PermissionConfig,
    pub context: PermissionContext,
    pub service: Arc<StaticPermissionService>,
    pub path_evaluator: Arc<FhirPathEngineEvaluator>,
    pub evaluator: Arc<PermissionEvaluator>,
}

impl Session {
    pub fn open(
        config_path: Option<&str>,
        permissions_path: &str,
        user_id: &str,
        token: &str,
    ) -> Result<Self> {
        let config = load_config(config_path)?;
        let service = StaticPermissionService::from_file(permissions_path)
            .with_context(|| format!("Failed to load permissions: {permissions_path}"))?;
        tracing::debug!(
            permissions = permissions_path,
            count = service.permissions().len(),
            user_id,
            "Opened permission session"
        );

        let path_evaluator = Arc::new(
            FhirPathEngineEvaluator::from_config(&config.fhir)
                .context("Failed to initialize FHIRPath engine")?,
        );
        let evaluator = PermissionEvaluator::new(
            config.clone(),
            Arc::new(FhirJsonModel::from_config(&config.document)),
            path_evaluator.clone(),
        );

        Ok(Self {
            path_evaluator,
            evaluator: Arc::new(evaluator),
            config,
            context: PermissionContext::new(user_id, token),
            service: Arc::new(service),
        })
    }

    pub fn engine(&self) -> FhirAuthorizationEngine {
        FhirAuthorizationEngine::new(self.service.clone(), self.evaluator.clone())
    }
}

pub fn load_config(path: Option<&str>) -> Result<PermissionConfig> {
    match path {
        Some(path) => PermissionConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {path}")),
        None => Ok(PermissionConfig::default()),
    }
}

pub fn read_document(file: Option<&str>) -> Result<Value> {
    let content = match file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))?
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            buf
        }
    };
    serde_json::from_str(&content).context("Invalid JSON")
}
