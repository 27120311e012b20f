//! PKCS#15 token binding
//!
//! A [`Token`] ties a card to the PKCS#15 application on it: where the
//! application directory lives, which algorithm references the token info
//! declares, and how lost authentication is recovered. The public
//! operations in [`crate::ops`] are methods on it.

use std::sync::Arc;

use crate::card::Card;
use crate::config::CryptoConfig;
use crate::object::Path;
use crate::pin_cache::{PinCache, PinRevalidator};
use crate::sec::SupportedAlgorithm;

pub struct Token {
    pub(crate) card: Card,
    pub(crate) app_df: Option<Path>,
    pub(crate) supported_algos: Vec<SupportedAlgorithm>,
    pub(crate) revalidator: Arc<dyn PinRevalidator>,
    pub(crate) config: CryptoConfig,
}

impl Token {
    /// Bind `card` with a PIN cache built from `config`
    pub fn new(card: Card, config: CryptoConfig) -> Self {
        let revalidator = Arc::new(PinCache::new(&config));
        Self {
            card,
            app_df: None,
            supported_algos: Vec::new(),
            revalidator,
            config,
        }
    }

    /// Path of the PKCS#15 application directory
    pub fn with_app_df(mut self, path: Path) -> Self {
        self.app_df = Some(path);
        self
    }

    /// Supported-algorithm table from the token info
    pub fn with_supported_algos(mut self, algos: Vec<SupportedAlgorithm>) -> Self {
        self.supported_algos = algos;
        self
    }

    pub fn with_revalidator(mut self, revalidator: Arc<dyn PinRevalidator>) -> Self {
        self.revalidator = revalidator;
        self
    }

    pub fn card(&self) -> &Card {
        &self.card
    }

    pub fn app_df(&self) -> Option<&Path> {
        self.app_df.as_ref()
    }

    pub fn config(&self) -> &CryptoConfig {
        &self.config
    }
}
