use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::{
    config::StorytellerConfig,
    error::Result,
    gpu::{device_label, select_device},
    model::{LoadModel, ModelLoader},
};

use super::storyteller::Storyteller;

/// Builder for constructing a Storyteller instance
pub struct StorytellerBuilder {
    config: Option<StorytellerConfig>,
    seed: Option<u64>,
}

impl StorytellerBuilder {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            config: None,
            seed: None,
        }
    }

    /// Set the storyteller configuration
    pub fn with_config(mut self, config: StorytellerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Make template selection reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate the configuration, pick the device and load the model.
    ///
    /// Any error returned here is fatal: the model could not be made ready.
    pub fn build<L: LoadModel>(self, loader: &L) -> Result<Storyteller<L::Model>> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let device = select_device(config.model.force_cpu)?;
        info!(
            device = device_label(&device),
            model_id = %config.model.model_id,
            "Starting storyteller"
        );

        let model = ModelLoader::new(config.model.clone()).load(loader, &device)?;

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Storyteller::new(model, device, &config, rng))
    }
}

impl Default for StorytellerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
