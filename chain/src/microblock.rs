//! Microblock assembly and sealing.
//!
//! A [`Microblock`] is an open shell: sections may be appended and the gas
//! may be set. [`Microblock::seal`] binds the fee payer, signs the body and
//! consumes the shell, returning a [`SealedMicroblock`] whose content can no
//! longer change. The sealed hash is Blake2b-256 over the signed body
//! followed by the signature bytes.

use ledgerdesk_crypto::{blake2b_256_multi, sign_message};
use ledgerdesk_types::{AccountId, Hash, PrivateSignatureKey, Signature, SignatureScheme, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ChainError;
use crate::provider::VirtualBlockchainState;
use crate::section::Section;

/// The kind of chain a microblock is appended to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VirtualBlockchainKind {
    Account,
    ValidatorNode,
    Organization,
    Application,
}

impl fmt::Display for VirtualBlockchainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Account => "account",
            Self::ValidatorNode => "validator-node",
            Self::Organization => "organization",
            Self::Application => "application",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroblockHeader {
    pub kind: VirtualBlockchainKind,
    /// 1 for a genesis microblock.
    pub height: u64,
    /// Head of the chain this block extends; absent at genesis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<Hash>,
    pub timestamp: Timestamp,
    pub gas: u64,
}

/// An unsealed microblock.
#[derive(Clone, Debug)]
pub struct Microblock {
    header: MicroblockHeader,
    sections: Vec<Section>,
}

impl Microblock {
    /// First block of a new chain. Its sealed hash becomes the chain id.
    pub fn genesis(kind: VirtualBlockchainKind) -> Self {
        Self {
            header: MicroblockHeader {
                kind,
                height: 1,
                previous_hash: None,
                timestamp: Timestamp::now(),
                gas: 0,
            },
            sections: Vec::new(),
        }
    }

    /// A block appended after `head`, which sits at `head_height`.
    pub fn continuation(kind: VirtualBlockchainKind, head: Hash, head_height: u64) -> Self {
        Self {
            header: MicroblockHeader {
                kind,
                height: head_height + 1,
                previous_hash: Some(head),
                timestamp: Timestamp::now(),
                gas: 0,
            },
            sections: Vec::new(),
        }
    }

    /// Continue a chain loaded from the provider.
    pub fn after(state: &VirtualBlockchainState) -> Self {
        Self::continuation(state.kind, state.head, state.height)
    }

    pub fn add_section(&mut self, section: Section) -> &mut Self {
        self.sections.push(section);
        self
    }

    pub fn add_sections(&mut self, sections: impl IntoIterator<Item = Section>) -> &mut Self {
        self.sections.extend(sections);
        self
    }

    pub fn set_gas(&mut self, gas: u64) {
        self.header.gas = gas;
    }

    pub fn header(&self) -> &MicroblockHeader {
        &self.header
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn is_genesis(&self) -> bool {
        self.header.previous_hash.is_none()
    }

    /// Encoded size of the section list, used by size-based fee formulas.
    pub fn sections_size(&self) -> Result<usize, ChainError> {
        Ok(serde_json::to_vec(&self.sections)?.len())
    }

    /// Bind the fee payer and sign. The signature covers header, sections,
    /// fee payer and scheme.
    pub fn seal(
        self,
        key: &PrivateSignatureKey,
        fees_payer: AccountId,
    ) -> Result<SealedMicroblock, ChainError> {
        let scheme = key.scheme();
        let body = SignedBody {
            header: &self.header,
            sections: &self.sections,
            fees_payer: &fees_payer,
            signature_scheme: scheme,
        };
        let body_bytes = serde_json::to_vec(&body)?;
        let signature = sign_message(&body_bytes, key)?;
        let hash = Hash::new(blake2b_256_multi(&[&body_bytes, signature.as_bytes()]));

        tracing::debug!(
            kind = %self.header.kind,
            height = self.header.height,
            sections = self.sections.len(),
            gas = self.header.gas,
            hash = %hash,
            "microblock sealed"
        );

        Ok(SealedMicroblock {
            header: self.header,
            sections: self.sections,
            fees_payer,
            signature_scheme: scheme,
            signature,
            hash,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignedBody<'a> {
    header: &'a MicroblockHeader,
    sections: &'a [Section],
    fees_payer: &'a AccountId,
    signature_scheme: SignatureScheme,
}

/// A signed, immutable microblock ready for publication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedMicroblock {
    header: MicroblockHeader,
    sections: Vec<Section>,
    fees_payer: AccountId,
    signature_scheme: SignatureScheme,
    signature: Signature,
    hash: Hash,
}

impl SealedMicroblock {
    pub fn header(&self) -> &MicroblockHeader {
        &self.header
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn fees_payer(&self) -> &AccountId {
        &self.fees_payer
    }

    pub fn signature_scheme(&self) -> SignatureScheme {
        self.signature_scheme
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// The exact bytes the signature was produced over.
    pub fn signed_bytes(&self) -> Result<Vec<u8>, ChainError> {
        let body = SignedBody {
            header: &self.header,
            sections: &self.sections,
            fees_payer: &self.fees_payer,
            signature_scheme: self.signature_scheme,
        };
        Ok(serde_json::to_vec(&body)?)
    }
}
