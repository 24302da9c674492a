//! Contract factory.
//!
//! Builds immutable contract instances for one contract generation from
//! campaign parameters. Addresses are converted to locking bytecode through
//! an [`AddressCodec`] and must belong to the campaign's network; all other
//! arguments are frozen as given.

pub mod contract;
pub mod variants;

pub use contract::{
    ConstructorArg, ContractAddressType, ContractInstance, ContractUnlocker, FunctionArg,
};
pub use variants::{
    ExitContract, ExitParams, MainContract, MainParams, PledgeContract, PledgeParams, StartParams,
};

use fundme_primitives::chainhash::Hash;
use fundme_script::{AddressCodec, CashAddrCodec, Network, Script};

use crate::artifact::{ArtifactSet, ContractKind};
use crate::error::ContractError;
use crate::types::{CampaignInfo, ContractGeneration, PledgeType};

/// The Main and Exit contracts of one campaign.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignContracts {
    /// Main contract.
    pub main: MainContract,
    /// Exit contract.
    pub exit: ExitContract,
    /// Network every address paid to must belong to.
    pub network: Network,
}

/// Builds contracts of one generation.
#[derive(Debug, Clone)]
pub struct ContractFactory<C: AddressCodec = CashAddrCodec> {
    artifacts: ArtifactSet,
    address_type: ContractAddressType,
    codec: C,
}

impl ContractFactory<CashAddrCodec> {
    /// A factory converting addresses as CashAddr.
    pub fn new(artifacts: ArtifactSet, address_type: ContractAddressType) -> Self {
        Self::with_codec(artifacts, address_type, CashAddrCodec)
    }
}

fn int_arg(name: &str, value: u64) -> Result<ConstructorArg, ContractError> {
    i64::try_from(value)
        .map(ConstructorArg::Int)
        .map_err(|_| ContractError::Artifact(format!("{} {} does not fit a script number", name, value)))
}

impl<C: AddressCodec> ContractFactory<C> {
    /// A factory with a custom address codec.
    pub fn with_codec(artifacts: ArtifactSet, address_type: ContractAddressType, codec: C) -> Self {
        ContractFactory {
            artifacts,
            address_type,
            codec,
        }
    }

    /// The generation this factory builds.
    pub fn generation(&self) -> ContractGeneration {
        self.artifacts.generation
    }

    /// The locking bytecode `address` pays to.
    ///
    /// # Returns
    /// The bytecode, or a `Script` error if the address does not parse or
    /// is not an address on `network`.
    pub fn locking_bytecode(&self, address: &str, network: Network) -> Result<Script, ContractError> {
        Ok(self.codec.to_locking_bytecode_on(address, network)?)
    }

    fn instance(
        &self,
        kind: ContractKind,
        args: &[ConstructorArg],
    ) -> Result<ContractInstance, ContractError> {
        ContractInstance::new(
            self.artifacts.get(kind)?,
            self.artifacts.generation,
            args,
            self.address_type,
        )
    }

    fn check_generation(&self, info: &CampaignInfo) -> Result<(), ContractError> {
        let generation = info.generation()?;
        if generation != self.generation() {
            return Err(ContractError::Config(format!(
                "campaign version {} needs {:?} contracts, factory builds {:?}",
                info.version,
                generation,
                self.generation()
            )));
        }
        Ok(())
    }

    /// Build the Main contract of a campaign.
    ///
    /// # Arguments
    /// * `info` - The campaign parameters.
    /// * `platform_key_hash` - Hash160 of the platform public key.
    pub fn main(
        &self,
        info: &CampaignInfo,
        platform_key_hash: [u8; 20],
    ) -> Result<MainContract, ContractError> {
        self.check_generation(info)?;
        let params = MainParams {
            platform_key_hash,
            goal_satoshis: info.goal_satoshis,
            expires_at_unix: info.expires_at_unix,
            payout_bytecode: self.locking_bytecode(&info.payout_address, info.network)?,
        };
        let instance = self.instance(
            ContractKind::Main,
            &[
                ConstructorArg::Bytes(platform_key_hash.to_vec()),
                int_arg("goal", params.goal_satoshis)?,
                ConstructorArg::Int(i64::from(params.expires_at_unix)),
                ConstructorArg::Bytes(params.payout_bytecode.to_bytes().to_vec()),
            ],
        )?;
        Ok(MainContract { params, instance })
    }

    /// Build the Exit contract of a campaign.
    pub fn exit(
        &self,
        info: &CampaignInfo,
        platform_key_hash: [u8; 20],
    ) -> Result<ExitContract, ContractError> {
        self.check_generation(info)?;
        let params = ExitParams {
            platform_key_hash,
            expires_at_unix: info.expires_at_unix,
        };
        let instance = self.instance(
            ContractKind::Exit,
            &[
                ConstructorArg::Bytes(platform_key_hash.to_vec()),
                ConstructorArg::Int(i64::from(params.expires_at_unix)),
            ],
        )?;
        Ok(ExitContract { params, instance })
    }

    /// Build both campaign contracts.
    pub fn campaign(
        &self,
        info: &CampaignInfo,
        platform_key_hash: [u8; 20],
    ) -> Result<CampaignContracts, ContractError> {
        Ok(CampaignContracts {
            main: self.main(info, platform_key_hash)?,
            exit: self.exit(info, platform_key_hash)?,
            network: info.network,
        })
    }

    fn start_like(
        &self,
        kind: ContractKind,
        info: &CampaignInfo,
        campaign: &CampaignContracts,
        refund_address: &str,
    ) -> Result<(StartParams, ContractInstance), ContractError> {
        let params = StartParams {
            main_bytecode: campaign.main.instance.locking_bytecode().clone(),
            exit_bytecode: campaign.exit.instance.locking_bytecode().clone(),
            refund_bytecode: self.locking_bytecode(refund_address, campaign.network)?,
            goal_satoshis: match self.generation() {
                ContractGeneration::Capped => Some(info.goal_satoshis),
                ContractGeneration::Uncapped => None,
            },
        };
        let mut args = vec![
            ConstructorArg::Bytes(params.main_bytecode.to_bytes().to_vec()),
            ConstructorArg::Bytes(params.exit_bytecode.to_bytes().to_vec()),
            ConstructorArg::Bytes(params.refund_bytecode.to_bytes().to_vec()),
        ];
        if let Some(goal) = params.goal_satoshis {
            args.push(int_arg("goal", goal)?);
        }
        let instance = self.instance(kind, &args)?;
        Ok((params, instance))
    }

    /// Build the Start contract a pledger pays into.
    pub fn start(
        &self,
        info: &CampaignInfo,
        campaign: &CampaignContracts,
        refund_address: &str,
    ) -> Result<PledgeContract, ContractError> {
        let (params, instance) = self.start_like(ContractKind::Start, info, campaign, refund_address)?;
        Ok(PledgeContract::Start { params, instance })
    }

    /// Build the Donation contract a donor pays into.
    pub fn donation(
        &self,
        info: &CampaignInfo,
        campaign: &CampaignContracts,
        refund_address: &str,
    ) -> Result<PledgeContract, ContractError> {
        let (params, instance) =
            self.start_like(ContractKind::Donation, info, campaign, refund_address)?;
        Ok(PledgeContract::Donation { params, instance })
    }

    /// Build the Pledge contract for a campaign with a known category.
    pub fn pledge(
        &self,
        campaign: &CampaignContracts,
        refund_address: &str,
        category: Hash,
    ) -> Result<PledgeContract, ContractError> {
        let params = PledgeParams {
            refund_bytecode: self.locking_bytecode(refund_address, campaign.network)?,
            category,
            exit_bytecode: campaign.exit.instance.locking_bytecode().clone(),
        };
        let instance = self.instance(
            ContractKind::Pledge,
            &[
                ConstructorArg::Bytes(params.refund_bytecode.to_bytes().to_vec()),
                ConstructorArg::Bytes(params.category.as_bytes().to_vec()),
                ConstructorArg::Bytes(params.exit_bytecode.to_bytes().to_vec()),
            ],
        )?;
        Ok(PledgeContract::Pledge { params, instance })
    }

    /// Build the contract a pledge of `pledge_type` waits at.
    ///
    /// # Arguments
    /// * `category` - The campaign category, required for `Started` pledges.
    pub fn pledge_contract(
        &self,
        pledge_type: PledgeType,
        info: &CampaignInfo,
        campaign: &CampaignContracts,
        refund_address: &str,
        category: Option<Hash>,
    ) -> Result<PledgeContract, ContractError> {
        match pledge_type {
            PledgeType::Starting => self.start(info, campaign, refund_address),
            PledgeType::Donation => self.donation(info, campaign, refund_address),
            PledgeType::Started => {
                let category = category.ok_or_else(|| {
                    ContractError::MissingCampaign(
                        "a started pledge requires an existing campaign category".into(),
                    )
                })?;
                self.pledge(campaign, refund_address, category)
            }
        }
    }
}
