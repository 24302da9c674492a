//! Engine configuration.
//!
//! Settings are layered: built-in defaults, then an optional `fundme.toml`,
//! then `FUNDME_*` environment variables (`FUNDME_NETWORK`,
//! `FUNDME_ARTIFACTS_DIR`, `FUNDME_GENERATION`, `FUNDME_ADDRESS_TYPE`,
//! `FUNDME_SIGNING_SCHEME`, `FUNDME_PLATFORM_WIF`).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use fundme_script::{AddressCodec, CashAddrCodec, Network};
use fundme_transaction::SigningScheme;

use crate::artifact::ArtifactSet;
use crate::error::ContractError;
use crate::factory::{ContractAddressType, ContractFactory};
use crate::platform::PlatformKey;
use crate::types::{CampaignInfo, ContractGeneration};

/// Default configuration file, looked up in the working directory.
pub const CONFIG_FILE: &str = "fundme.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "FUNDME";

/// Contract engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Network new campaigns are created on.
    pub network: Network,
    /// Directory holding one artifact directory per generation (`v1/`, `v2/`).
    pub artifacts_dir: PathBuf,
    /// Generation new campaigns are created with.
    pub generation: ContractGeneration,
    /// P2SH form of contract locking bytecode.
    pub address_type: ContractAddressType,
    /// Scheme the platform key signs with.
    pub signing_scheme: SigningScheme,
    /// Platform private key, WIF encoded.
    pub platform_wif: String,
}

impl EngineConfig {
    /// Load from `fundme.toml` (if present) and `FUNDME_*` variables.
    pub fn load() -> Result<Self, ContractError> {
        Self::load_from(Path::new(CONFIG_FILE), ENV_PREFIX)
    }

    /// Load from `file` (if present) and variables under `env_prefix`.
    pub fn load_from(file: &Path, env_prefix: &str) -> Result<Self, ContractError> {
        let settings = Config::builder()
            .set_default("network", "mainnet")?
            .set_default("artifacts_dir", "artifacts")?
            .set_default("generation", "capped")?
            .set_default("address_type", "p2sh32")?
            .set_default("signing_scheme", "schnorr")?
            .set_default("platform_wif", "")?
            .add_source(File::from(file).required(false))
            .add_source(Environment::with_prefix(env_prefix))
            .build()?;
        let config: EngineConfig = settings.try_deserialize()?;
        config.validate()?;
        tracing::debug!(
            network = ?config.network,
            generation = ?config.generation,
            artifacts_dir = %config.artifacts_dir.display(),
            "loaded engine config"
        );
        Ok(config)
    }

    /// Check the settings that cannot be checked by deserialization.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.platform_wif.trim().is_empty() {
            return Err(ContractError::Config(format!(
                "platform_wif is not set; configure it in {} or {}_PLATFORM_WIF",
                CONFIG_FILE, ENV_PREFIX
            )));
        }
        self.platform_key().map(|_| ())
    }

    /// The platform signing key.
    pub fn platform_key(&self) -> Result<PlatformKey, ContractError> {
        PlatformKey::from_wif(self.platform_wif.trim(), self.signing_scheme)
    }

    /// Directory of the artifacts for `generation`.
    pub fn artifacts_path(&self, generation: ContractGeneration) -> PathBuf {
        self.artifacts_dir.join(generation.dir_name())
    }

    /// Load the artifacts for `generation`.
    pub fn artifact_set(&self, generation: ContractGeneration) -> Result<ArtifactSet, ContractError> {
        ArtifactSet::load_dir(&self.artifacts_path(generation), generation)
    }

    /// A factory for `generation`.
    pub fn factory(&self, generation: ContractGeneration) -> Result<ContractFactory, ContractError> {
        Ok(ContractFactory::new(
            self.artifact_set(generation)?,
            self.address_type,
        ))
    }

    /// Parameters of a new campaign, stamped with the configured network
    /// and the contract version of the configured generation.
    ///
    /// # Returns
    /// The campaign parameters, or a `Script` error if `payout_address` is
    /// not an address on the configured network.
    pub fn new_campaign(
        &self,
        payout_address: &str,
        goal_satoshis: u64,
        expires_at_unix: u32,
    ) -> Result<CampaignInfo, ContractError> {
        CashAddrCodec.to_locking_bytecode_on(payout_address, self.network)?;
        Ok(CampaignInfo {
            payout_address: payout_address.to_string(),
            goal_satoshis,
            expires_at_unix,
            network: self.network,
            version: self.generation.version(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const WIF: &str = "cNGwGSc7KRrTmdLUZ54fiSXWbhLNDc2Eg5zNucgQxyQCzuQ5YRDq";

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fundme.toml");
        fs::write(
            &path,
            format!(
                "network = \"chipnet\"\ngeneration = \"uncapped\"\nplatform_wif = \"{}\"\n",
                WIF
            ),
        )
        .expect("write");

        let config = EngineConfig::load_from(&path, "FUNDME_TEST_FILE").expect("load");
        assert_eq!(config.network, Network::Chipnet);
        assert_eq!(config.generation, ContractGeneration::Uncapped);
        assert_eq!(config.address_type, ContractAddressType::P2sh32);
        assert_eq!(config.signing_scheme, SigningScheme::Schnorr);
        assert_eq!(config.artifacts_path(ContractGeneration::Capped), PathBuf::from("artifacts/v2"));
        assert_eq!(
            hex::encode(config.platform_key().expect("key").key_hash()),
            "c0a3c167a28cabb9fbb495affa0761e6e74ac60d"
        );
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fundme.toml");
        fs::write(&path, format!("platform_wif = \"{}\"\naddress_type = \"p2sh32\"\n", WIF))
            .expect("write");
        std::env::set_var("FUNDMEENVTEST_ADDRESS_TYPE", "p2sh20");
        let config = EngineConfig::load_from(&path, "FUNDMEENVTEST");
        std::env::remove_var("FUNDMEENVTEST_ADDRESS_TYPE");
        assert_eq!(config.expect("load").address_type, ContractAddressType::P2sh20);
    }

    #[test]
    fn test_missing_or_bad_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            EngineConfig::load_from(&missing, "FUNDME_TEST_MISSING"),
            Err(ContractError::Config(_))
        ));

        let path = dir.path().join("fundme.toml");
        fs::write(&path, "platform_wif = \"not-a-key\"\n").expect("write");
        assert!(matches!(
            EngineConfig::load_from(&path, "FUNDME_TEST_BAD"),
            Err(ContractError::Config(_))
        ));

        fs::write(&path, format!("platform_wif = \"{}\"\nnetwork = \"moonnet\"\n", WIF)).expect("write");
        assert!(EngineConfig::load_from(&path, "FUNDME_TEST_BAD").is_err());
    }

    #[test]
    fn test_factory_from_fixture_artifacts() {
        let config = EngineConfig {
            network: Network::Regtest,
            artifacts_dir: crate::tests::fixtures::artifacts_dir(),
            generation: ContractGeneration::Capped,
            address_type: ContractAddressType::P2sh20,
            signing_scheme: SigningScheme::Ecdsa,
            platform_wif: WIF.into(),
        };
        config.validate().expect("valid");
        let factory = config.factory(ContractGeneration::Uncapped).expect("factory");
        assert_eq!(factory.generation(), ContractGeneration::Uncapped);
        assert!(config.factory(ContractGeneration::Capped).is_ok());
    }

    #[test]
    fn test_new_campaign_follows_network_and_generation() {
        let payout = crate::tests::fixtures::PAYOUT_ADDRESS;
        let mut config = EngineConfig {
            network: Network::Chipnet,
            artifacts_dir: crate::tests::fixtures::artifacts_dir(),
            generation: ContractGeneration::Uncapped,
            address_type: ContractAddressType::P2sh32,
            signing_scheme: SigningScheme::Schnorr,
            platform_wif: WIF.into(),
        };
        let info = config.new_campaign(payout, 5000, 1_750_000_000).expect("campaign");
        assert_eq!((info.network, info.version), (Network::Chipnet, 1));
        assert_eq!(info.generation().expect("generation"), ContractGeneration::Uncapped);
        let factory = config.factory(info.generation().expect("generation")).expect("factory");
        let key_hash = config.platform_key().expect("key").key_hash();
        assert!(factory.campaign(&info, key_hash).is_ok());

        config.generation = ContractGeneration::Capped;
        assert_eq!(config.new_campaign(payout, 5000, 1_750_000_000).expect("campaign").version, 2);

        // a chipnet payout address on a mainnet engine
        config.network = Network::Mainnet;
        assert!(matches!(
            config.new_campaign(payout, 5000, 1_750_000_000),
            Err(ContractError::Script(fundme_script::ScriptError::WrongNetwork { .. }))
        ));
    }
}
