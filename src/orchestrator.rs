//! Run orchestration
//!
//! Validates inputs, installs the SDK packages they call for, then creates
//! or reuses the AVD. The first failure ends the run.

use std::sync::Arc;

use anyhow::Result;
use avd_runner_android_toolchain::{SdkInstallRequest, SdkInstaller};
use avd_runner_core::{ActionInputs, CommandRunner, EmulatorConfig, RunnerEnvironment};
use avd_runner_emulator_bridge::{AvdConfig, AvdManager, HardwareOverrides};
use tracing::{info, info_span};

/// Composes the validator, SDK installer and AVD manager for one run
pub struct Orchestrator<R> {
    env: RunnerEnvironment,
    runner: Arc<R>,
}

impl<R: CommandRunner> Orchestrator<R> {
    pub fn new(env: RunnerEnvironment, runner: Arc<R>) -> Self {
        Self { env, runner }
    }

    pub fn environment(&self) -> &RunnerEnvironment {
        &self.env
    }

    /// Execute every stage in order and return the resolved configuration
    pub async fn run(&self, inputs: &ActionInputs) -> Result<EmulatorConfig> {
        let config = info_span!("configure").in_scope(|| inputs.resolve())?;

        SdkInstaller::new(&self.env, self.runner.clone())
            .install(&SdkInstallRequest::from(&config))
            .await?;

        AvdManager::new(&self.env, self.runner.clone())
            .with_write_mode(config.config_write_mode)
            .ensure_avd(&AvdConfig::from(&config), &HardwareOverrides::from(&config))
            .await?;

        info!("AVD {} is ready in {:?}", config.avd_name, self.env.avd_home);
        Ok(config)
    }
}
