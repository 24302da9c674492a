//! Contract instances.
//!
//! A contract instance is an artifact with its constructor arguments
//! applied. The arguments are pushed in reverse declaration order ahead of
//! the artifact bytecode to form the redeem script, which the locking
//! bytecode commits to by hash (P2SH32 by default).

use serde::{Deserialize, Serialize};

use fundme_primitives::ec::PrivateKey;
use fundme_script::{Address, Network, Script};
use fundme_transaction::sighash::SIGHASH_ALL_FORKID;
use fundme_transaction::signature::{transaction_signature, SigningScheme};
use fundme_transaction::template::UnlockingScriptTemplate;
use fundme_transaction::transaction::Transaction;
use fundme_transaction::TransactionError;

use crate::artifact::{AbiInput, CompiledArtifact, ContractKind};
use crate::error::ContractError;
use crate::types::ContractGeneration;

/// Which P2SH form contract locking bytecode takes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractAddressType {
    /// `OP_HASH160 <hash160(redeem)> OP_EQUAL`.
    P2sh20,
    /// `OP_HASH256 <sha256d(redeem)> OP_EQUAL`.
    #[default]
    P2sh32,
}

/// A typed constructor argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructorArg {
    /// An `int` parameter, encoded as a minimal script number.
    Int(i64),
    /// A `bool` parameter.
    Bool(bool),
    /// Any byte-typed parameter (`bytes`, `bytesN`, `pubkey`, `sig`).
    Bytes(Vec<u8>),
}

impl ConstructorArg {
    fn check(&self, input: &AbiInput) -> Result<(), ContractError> {
        let mismatch = || {
            ContractError::Artifact(format!(
                "argument {} of type {} given {:?}",
                input.name, input.kind, self
            ))
        };
        match (self, input.kind.as_str()) {
            (ConstructorArg::Int(_), "int") => Ok(()),
            (ConstructorArg::Bool(_), "bool") => Ok(()),
            (ConstructorArg::Bytes(_), "bytes" | "pubkey" | "sig" | "datasig") => Ok(()),
            (ConstructorArg::Bytes(bytes), kind) => match kind.strip_prefix("bytes") {
                Some(len) if len.parse::<usize>().ok() == Some(bytes.len()) => Ok(()),
                _ => Err(mismatch()),
            },
            _ => Err(mismatch()),
        }
    }

    fn push_onto(&self, script: &mut Script) -> Result<(), ContractError> {
        match self {
            ConstructorArg::Int(value) => script.append_number(*value)?,
            ConstructorArg::Bool(true) => script.append_push_data(&[0x01])?,
            ConstructorArg::Bool(false) => script.append_push_data(&[])?,
            ConstructorArg::Bytes(bytes) => script.append_push_data(bytes)?,
        }
        Ok(())
    }
}

/// An artifact with constructor arguments applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractInstance {
    artifact: CompiledArtifact,
    generation: ContractGeneration,
    redeem_script: Script,
    locking_bytecode: Script,
}

impl ContractInstance {
    /// Apply constructor arguments to an artifact.
    ///
    /// # Arguments
    /// * `artifact` - The validated artifact.
    /// * `generation` - The generation the artifact belongs to.
    /// * `args` - Constructor arguments in declaration order.
    /// * `address_type` - P2SH20 or P2SH32 locking bytecode.
    ///
    /// # Returns
    /// The instance, or an `Artifact` error if the arguments do not match
    /// the constructor signature.
    pub fn new(
        artifact: &CompiledArtifact,
        generation: ContractGeneration,
        args: &[ConstructorArg],
        address_type: ContractAddressType,
    ) -> Result<Self, ContractError> {
        let inputs = &artifact.artifact.constructor_inputs;
        if args.len() != inputs.len() {
            return Err(ContractError::Artifact(format!(
                "{} takes {} constructor arguments, given {}",
                artifact.artifact.contract_name,
                inputs.len(),
                args.len()
            )));
        }
        for (arg, input) in args.iter().zip(inputs) {
            arg.check(input)?;
        }

        let mut redeem_script = Script::new();
        for arg in args.iter().rev() {
            arg.push_onto(&mut redeem_script)?;
        }
        redeem_script.append_script(&artifact.bytecode);

        let locking_bytecode = match address_type {
            ContractAddressType::P2sh20 => Script::p2sh20_for(&redeem_script),
            ContractAddressType::P2sh32 => Script::p2sh32_for(&redeem_script),
        };

        Ok(ContractInstance {
            artifact: artifact.clone(),
            generation,
            redeem_script,
            locking_bytecode,
        })
    }

    /// The contract kind.
    pub fn kind(&self) -> ContractKind {
        self.artifact.kind
    }

    /// The generation this instance was built from.
    pub fn generation(&self) -> ContractGeneration {
        self.generation
    }

    /// Constructor arguments followed by the artifact bytecode.
    pub fn redeem_script(&self) -> &Script {
        &self.redeem_script
    }

    /// The P2SH locking bytecode outputs pay to.
    pub fn locking_bytecode(&self) -> &Script {
        &self.locking_bytecode
    }

    /// The CashAddr address of this contract.
    pub fn address(&self, network: Network, token_aware: bool) -> Result<Address, ContractError> {
        Ok(Address::from_locking_bytecode(&self.locking_bytecode, network, token_aware)?)
    }

    /// An unlocker calling `function` with `args` (declaration order).
    pub fn unlocker(
        &self,
        function: &str,
        args: Vec<FunctionArg>,
    ) -> Result<ContractUnlocker, ContractError> {
        let index = self.artifact.function_index(function)?;
        let expected = self.artifact.artifact.abi[index].inputs.len();
        if args.len() != expected {
            return Err(ContractError::Artifact(format!(
                "{}.{} takes {} arguments, given {}",
                self.artifact.artifact.contract_name,
                function,
                expected,
                args.len()
            )));
        }
        let selector = (self.artifact.artifact.abi.len() > 1).then_some(index as i64);
        Ok(ContractUnlocker {
            redeem_script: self.redeem_script.clone(),
            selector,
            args,
            sighash_flag: SIGHASH_ALL_FORKID,
        })
    }
}

/// A function-call argument, resolved when the input is signed.
#[derive(Clone)]
pub enum FunctionArg {
    /// Raw bytes, e.g. a public key.
    Bytes(Vec<u8>),
    /// A transaction signature by `key` over the input being unlocked.
    Signature {
        /// The signing key.
        key: PrivateKey,
        /// ECDSA or Schnorr.
        scheme: SigningScheme,
    },
}

impl std::fmt::Debug for FunctionArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FunctionArg::Bytes(bytes) => write!(f, "Bytes({})", hex::encode(bytes)),
            FunctionArg::Signature { scheme, .. } => write!(f, "Signature({:?})", scheme),
        }
    }
}

/// Unlocking template for one contract function call.
///
/// Produces `<args reversed> [<selector>] <redeem script>`. Signature
/// arguments sign the FORKID digest with the redeem script as scriptCode.
#[derive(Debug)]
pub struct ContractUnlocker {
    redeem_script: Script,
    selector: Option<i64>,
    args: Vec<FunctionArg>,
    sighash_flag: u32,
}

impl UnlockingScriptTemplate for ContractUnlocker {
    fn sign(&self, tx: &Transaction, input_index: u32) -> Result<Script, TransactionError> {
        let mut cached: Option<[u8; 32]> = None;
        let mut script = Script::new();
        for arg in self.args.iter().rev() {
            match arg {
                FunctionArg::Bytes(bytes) => script.append_push_data(bytes)?,
                FunctionArg::Signature { key, scheme } => {
                    let digest = match cached {
                        Some(digest) => digest,
                        None => *cached.insert(tx.calc_input_signature_hash(
                            input_index as usize,
                            Some(self.redeem_script.to_bytes()),
                            self.sighash_flag,
                        )?),
                    };
                    let sig = transaction_signature(key, &digest, *scheme, self.sighash_flag)?;
                    script.append_push_data(&sig)?;
                }
            }
        }
        if let Some(selector) = self.selector {
            script.append_number(selector)?;
        }
        script.append_push_data(self.redeem_script.to_bytes())?;
        Ok(script)
    }

    fn estimate_length(&self, _tx: &Transaction, _input_index: u32) -> u32 {
        let args: usize = self
            .args
            .iter()
            .map(|arg| match arg {
                FunctionArg::Bytes(bytes) => bytes.len() + 1,
                FunctionArg::Signature { .. } => 74,
            })
            .sum();
        (args + 2 + self.redeem_script.len() + 3) as u32
    }
}
