//! Contract artifacts.
//!
//! An artifact is the compiled form of one contract: its constructor
//! signature, its ABI and its bytecode as ASM. Artifacts come in sets, one
//! per contract generation, and are validated once when loaded so the rest
//! of the engine can rely on every entry point being present.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use fundme_script::Script;

use crate::error::ContractError;
use crate::types::ContractGeneration;

/// One named, typed parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiInput {
    /// Parameter name.
    pub name: String,
    /// Parameter type: `int`, `bool`, `bytes`, `bytesN`, `pubkey` or `sig`.
    #[serde(rename = "type")]
    pub kind: String,
}

/// One contract function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiFunction {
    /// Function name.
    pub name: String,
    /// Function parameters, in declaration order.
    pub inputs: Vec<AbiInput>,
}

/// A compiled contract as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Contract name.
    pub contract_name: String,
    /// Constructor parameters, in declaration order.
    pub constructor_inputs: Vec<AbiInput>,
    /// Contract functions, in selector order.
    pub abi: Vec<AbiFunction>,
    /// Contract bytecode as ASM, without constructor arguments.
    pub bytecode: String,
    /// Compiler metadata, kept opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler: Option<serde_json::Value>,
}

/// The five contract kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    /// Holds the campaign funds and the minting token.
    Main,
    /// Holds pledge receipts.
    Exit,
    /// Receives pledges for a campaign that may not exist yet.
    Start,
    /// Receives donations.
    Donation,
    /// Receives pledges for an existing campaign.
    Pledge,
}

impl ContractKind {
    /// File name of this kind's artifact inside a generation directory.
    pub fn file_name(self) -> &'static str {
        match self {
            ContractKind::Main => "main.json",
            ContractKind::Exit => "exit.json",
            ContractKind::Start => "start.json",
            ContractKind::Donation => "donation.json",
            ContractKind::Pledge => "pledge.json",
        }
    }

    /// Number of constructor parameters in `generation`.
    pub fn constructor_arity(self, generation: ContractGeneration) -> usize {
        match (self, generation) {
            (ContractKind::Main, _) => 4,
            (ContractKind::Exit, _) => 2,
            (ContractKind::Start | ContractKind::Donation, ContractGeneration::Capped) => 4,
            (ContractKind::Start | ContractKind::Donation, ContractGeneration::Uncapped) => 3,
            (ContractKind::Pledge, _) => 3,
        }
    }

    /// The functions this kind must expose, with their argument counts.
    pub fn required_functions(self) -> &'static [(&'static str, usize)] {
        match self {
            ContractKind::Main => &[
                ("pledge", 2),
                ("refund", 2),
                ("refundAfterExpiration", 0),
                ("payout", 0),
            ],
            ContractKind::Exit => &[("refund", 2), ("refundAfterExpiration", 0)],
            ContractKind::Start | ContractKind::Donation => &[
                ("forwardToGenesis", 0),
                ("forwardToNewCampaign", 0),
                ("forwardToCampaign", 0),
                ("cancel", 0),
            ],
            ContractKind::Pledge => &[("forwardToCampaign", 0), ("cancel", 0)],
        }
    }
}

impl std::fmt::Display for ContractKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// An artifact that passed validation, with its bytecode assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledArtifact {
    /// The contract kind.
    pub kind: ContractKind,
    /// The artifact as loaded.
    pub artifact: Artifact,
    /// The assembled bytecode.
    pub bytecode: Script,
}

impl CompiledArtifact {
    /// Validate `artifact` as `kind` for `generation` and assemble it.
    pub fn compile(
        kind: ContractKind,
        generation: ContractGeneration,
        artifact: Artifact,
    ) -> Result<Self, ContractError> {
        let name = &artifact.contract_name;
        let arity = kind.constructor_arity(generation);
        if artifact.constructor_inputs.len() != arity {
            return Err(ContractError::Artifact(format!(
                "{} ({}) takes {} constructor arguments, {:?} contracts take {}",
                name,
                kind,
                artifact.constructor_inputs.len(),
                generation,
                arity
            )));
        }
        for (function, args) in kind.required_functions() {
            match artifact.abi.iter().find(|f| f.name == *function) {
                Some(f) if f.inputs.len() == *args => {}
                Some(f) => {
                    return Err(ContractError::Artifact(format!(
                        "{}.{} takes {} arguments, expected {}",
                        name,
                        function,
                        f.inputs.len(),
                        args
                    )))
                }
                None => {
                    return Err(ContractError::Artifact(format!(
                        "{} ({}) does not expose {}",
                        name, kind, function
                    )))
                }
            }
        }
        let bytecode = Script::from_asm(&artifact.bytecode)
            .map_err(|e| ContractError::Artifact(format!("{} bytecode: {}", name, e)))?;
        Ok(CompiledArtifact {
            kind,
            artifact,
            bytecode,
        })
    }

    /// Selector index of `function` in the ABI.
    pub fn function_index(&self, function: &str) -> Result<usize, ContractError> {
        self.artifact
            .abi
            .iter()
            .position(|f| f.name == function)
            .ok_or_else(|| {
                ContractError::Artifact(format!(
                    "{} does not expose {}",
                    self.artifact.contract_name, function
                ))
            })
    }
}

/// Every artifact of one contract generation.
///
/// The Donation contract only exists from the capped generation on.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSet {
    /// The generation these artifacts implement.
    pub generation: ContractGeneration,
    /// Main contract.
    pub main: CompiledArtifact,
    /// Exit contract.
    pub exit: CompiledArtifact,
    /// Start contract.
    pub start: CompiledArtifact,
    /// Donation contract, absent in the uncapped generation.
    pub donation: Option<CompiledArtifact>,
    /// Pledge contract.
    pub pledge: CompiledArtifact,
}

impl ArtifactSet {
    /// Build a set from in-memory JSON documents.
    ///
    /// # Arguments
    /// * `generation` - The generation the artifacts implement.
    /// * `main`, `exit`, `start`, `pledge` - Artifact JSON.
    /// * `donation` - Donation artifact JSON, required for the capped generation.
    pub fn from_json(
        generation: ContractGeneration,
        main: &str,
        exit: &str,
        start: &str,
        donation: Option<&str>,
        pledge: &str,
    ) -> Result<Self, ContractError> {
        let compile = |kind: ContractKind, json: &str| {
            let artifact: Artifact = serde_json::from_str(json)
                .map_err(|e| ContractError::Artifact(format!("{}: {}", kind.file_name(), e)))?;
            CompiledArtifact::compile(kind, generation, artifact)
        };
        let donation = match (donation, generation) {
            (Some(json), _) => Some(compile(ContractKind::Donation, json)?),
            (None, ContractGeneration::Uncapped) => None,
            (None, ContractGeneration::Capped) => {
                return Err(ContractError::Artifact(
                    "capped generation requires a Donation artifact".into(),
                ))
            }
        };
        Ok(ArtifactSet {
            generation,
            main: compile(ContractKind::Main, main)?,
            exit: compile(ContractKind::Exit, exit)?,
            start: compile(ContractKind::Start, start)?,
            donation,
            pledge: compile(ContractKind::Pledge, pledge)?,
        })
    }

    /// Load a set from a generation directory holding `main.json`,
    /// `exit.json`, `start.json`, `pledge.json` and, when present,
    /// `donation.json`.
    pub fn load_dir(dir: &Path, generation: ContractGeneration) -> Result<Self, ContractError> {
        let read = |kind: ContractKind| {
            let path = dir.join(kind.file_name());
            fs::read_to_string(&path)
                .map_err(|e| ContractError::Artifact(format!("{}: {}", path.display(), e)))
        };
        let donation_path = dir.join(ContractKind::Donation.file_name());
        let donation = if donation_path.exists() {
            Some(read(ContractKind::Donation)?)
        } else {
            None
        };
        tracing::debug!(dir = %dir.display(), ?generation, "loading contract artifacts");
        Self::from_json(
            generation,
            &read(ContractKind::Main)?,
            &read(ContractKind::Exit)?,
            &read(ContractKind::Start)?,
            donation.as_deref(),
            &read(ContractKind::Pledge)?,
        )
    }

    /// The artifact of `kind`.
    pub fn get(&self, kind: ContractKind) -> Result<&CompiledArtifact, ContractError> {
        match kind {
            ContractKind::Main => Ok(&self.main),
            ContractKind::Exit => Ok(&self.exit),
            ContractKind::Start => Ok(&self.start),
            ContractKind::Pledge => Ok(&self.pledge),
            ContractKind::Donation => self.donation.as_ref().ok_or_else(|| {
                ContractError::Artifact(format!(
                    "no Donation contract in the {:?} generation",
                    self.generation
                ))
            }),
        }
    }
}
