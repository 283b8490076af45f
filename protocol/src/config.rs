//! # Protocol Configuration & Constants
//!
//! Every magic number in the credential core lives here. If you're hardcoding
//! a modulus or a chunk size somewhere else, move it here.
//!
//! Most of these values are consensus-critical in the weakest sense: they
//! are baked into the Circom circuits and the on-chain verifier, so changing
//! one means regenerating proving keys and re-issuing every credential.

// ---------------------------------------------------------------------------
// Field Moduli
// ---------------------------------------------------------------------------

/// BN254 scalar field order `r`. Every [`crate::field::FieldElement`] lives
/// in `[0, r)`, and BabyJubJub is defined over this field.
pub const SCALAR_FIELD_MODULUS: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

/// BN254 base field order `q`. G1/G2 coordinates of Groth16 proofs live here,
/// which is why the codec negates Y modulo `q` and not modulo `r`.
pub const BASE_FIELD_MODULUS: &str =
    "21888242871839275222246405745257275088696311157297823662689037894645226208583";

/// Width in bytes of one canonical field element on the wire.
pub const FIELD_ELEMENT_BYTES: usize = 32;

// ---------------------------------------------------------------------------
// Poseidon
// ---------------------------------------------------------------------------

/// Number of full S-box rounds, split evenly before and after the partial rounds.
pub const POSEIDON_FULL_ROUNDS: usize = 8;

/// Partial rounds per state width, indexed by `t - 2` (circomlib table).
pub const POSEIDON_PARTIAL_ROUNDS: [usize; 16] =
    [56, 57, 56, 60, 60, 63, 64, 63, 60, 66, 60, 65, 70, 60, 64, 68];

/// Maximum number of inputs accepted by a single Poseidon hash (`t = 17`).
pub const POSEIDON_MAX_INPUTS: usize = 16;

/// Widest state for which `light-poseidon` ships circomlib parameters.
/// Wider states are derived with the Grain LFSR.
pub const POSEIDON_TABULATED_MAX_WIDTH: usize = 13;

/// Bytes absorbed per field element by the byte sponge. 31 bytes always fit
/// below the 254-bit modulus.
pub const SPONGE_CHUNK_SIZE: usize = 31;

/// Lanes in one byte-sponge frame.
pub const HASH_BYTES_FRAME_SIZE: usize = 16;

/// Upper bound (exclusive) for Poseidon cipher nonces: `2^128`.
pub const CIPHER_NONCE_BITS: u32 = 128;

// ---------------------------------------------------------------------------
// Sparse Merkle Tree / Claims Tree
// ---------------------------------------------------------------------------

/// Bits in the key decomposition used to walk the SMT.
pub const SMT_KEY_BITS: usize = 256;

/// Default fixed depth for claims-tree proofs handed to circuits. 2^10 claim
/// slots is far more than any credential schema we issue.
pub const DEFAULT_CLAIMS_TREE_DEPTH: usize = 10;

/// Claim values whose UTF-8 encoding is longer than this are hashed instead
/// of being packed into a single field element.
pub const MAX_INLINE_CLAIM_BYTES: usize = 32;

/// Separator used when flattening nested claims into paths.
pub const CLAIM_PATH_SEPARATOR: char = '.';

// ---------------------------------------------------------------------------
// Multibase / Multicodec
// ---------------------------------------------------------------------------

/// Multibase prefix for base58btc.
pub const MULTIBASE_BASE58BTC_PREFIX: char = 'z';

/// Multicodec varint header for Ed25519 public keys (0xed).
pub const MULTICODEC_ED25519_PUB: [u8; 2] = [0xed, 0x01];

/// Multicodec varint header for Ed25519 private keys (0x1300).
pub const MULTICODEC_ED25519_PRIV: [u8; 2] = [0x80, 0x26];

// ---------------------------------------------------------------------------
// Verification Methods & Proof Types
// ---------------------------------------------------------------------------

/// Verification method type for BabyJubJub issuer keys.
pub const BJJ_VERIFICATION_KEY_TYPE: &str = "BJJVerificationKey2021";

/// Verification method type for Ed25519 holder keys.
pub const ED25519_VERIFICATION_KEY_TYPE: &str = "Ed25519VerificationKey2020";

/// Proof type attached to credentials signed over a claims-tree root.
pub const BJJ_PROOF_TYPE: &str = "BJJSignature2021";

/// Proof type attached to presentations signed by the holder.
pub const ED25519_PROOF_TYPE: &str = "Ed25519Signature2020";

/// Proof purpose for issuer assertions.
pub const PROOF_PURPOSE_ASSERTION: &str = "assertionMethod";

/// Proof purpose for holder authentication.
pub const PROOF_PURPOSE_AUTHENTICATION: &str = "authentication";

/// W3C credentials JSON-LD context.
pub const CREDENTIALS_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// Credential type every issued credential carries.
pub const VERIFIABLE_CREDENTIAL_TYPE: &str = "VerifiableCredential";

/// Presentation type every presentation carries.
pub const VERIFIABLE_PRESENTATION_TYPE: &str = "VerifiablePresentation";

/// Key in a disclosed credential subject that carries per-field Merkle proofs.
pub const FIELD_PROOF_KEY: &str = "@proof";

// ---------------------------------------------------------------------------
// Groth16 Wire Layout
// ---------------------------------------------------------------------------

/// Encoded G1 point: `x ∥ y`, 32 bytes each, big-endian.
pub const G1_BYTES: usize = 64;

/// Encoded G2 point: `x.c1 ∥ x.c0 ∥ y.c1 ∥ y.c0`, 32 bytes each.
pub const G2_BYTES: usize = 128;

/// Encoded proof: `A (negated) ∥ B ∥ C`.
pub const PROOF_BYTES: usize = G1_BYTES + G2_BYTES + G1_BYTES;

/// Fixed prefix of an encoded verifying key before the IC points.
pub const VK_PREFIX_BYTES: usize = G1_BYTES + 3 * G2_BYTES;
