// Key management

use crate::core::{Hash256, PubKeyHash, hash160};
use crate::error::{LedgerError, Result};
use crate::wallet::Address;
use p256::ecdsa::signature::hazmat::PrehashSigner;
use p256::ecdsa::{Signature, SigningKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Curve name recorded in wallet files
pub const CURVE_NAME: &str = "P-256";

/// ECDSA P-256 key pair
#[derive(Clone)]
pub struct KeyPair {
    pub signing_key: SigningKey,
    /// Uncompressed X || Y, 32 bytes each
    pub public_key: Vec<u8>,
    pub address: Address,
}

impl KeyPair {
    /// Generate a new key pair
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Create from secret scalar bytes
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let signing_key = SigningKey::from_slice(bytes)
            .map_err(|e| LedgerError::InvalidKey(format!("Invalid secret key: {}", e)))?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let point = signing_key.verifying_key().as_affine().to_encoded_point(false);
        // Drop the SEC1 0x04 tag
        let public_key = point.as_bytes()[1..].to_vec();
        let address = Address::from_pubkey(&public_key);

        Self {
            signing_key,
            public_key,
            address,
        }
    }

    /// Get public key bytes
    pub fn pubkey_bytes(&self) -> &[u8] {
        &self.public_key
    }

    /// Get pubkey hash
    pub fn pubkey_hash(&self) -> PubKeyHash {
        hash160(&self.public_key)
    }

    /// Sign a 32-byte digest, returning r || s
    pub fn sign_digest(&self, digest: &Hash256) -> Result<Vec<u8>> {
        let signature: Signature = self
            .signing_key
            .sign_prehash(digest.as_bytes())
            .map_err(|e| LedgerError::InvalidKey(format!("Signing failed: {}", e)))?;
        Ok(signature.to_bytes().to_vec())
    }

    fn secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Durable home of the keystore's opaque blob
pub trait WalletStore {
    /// Read the stored blob, `None` if nothing has been saved yet
    fn read(&self) -> Result<Option<Vec<u8>>>;
    fn write(&self, blob: &[u8]) -> Result<()>;
}

/// Wallet blob kept in a file
pub struct FileWalletStore {
    path: PathBuf,
}

impl FileWalletStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl WalletStore for FileWalletStore {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(&self.path)?))
    }

    fn write(&self, blob: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, blob)?;
        Ok(())
    }
}

/// Wallet blob kept in memory (for testing)
#[derive(Default)]
pub struct MemoryWalletStore {
    blob: RefCell<Option<Vec<u8>>>,
}

impl MemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WalletStore for MemoryWalletStore {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.blob.borrow().clone())
    }

    fn write(&self, blob: &[u8]) -> Result<()> {
        *self.blob.borrow_mut() = Some(blob.to_vec());
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct StoredKey {
    address: Address,
    secret_key: String,
}

#[derive(Serialize, Deserialize)]
struct StoredKeystore {
    curve: String,
    default_address: Option<Address>,
    keys: Vec<StoredKey>,
}

/// Keystore - manages multiple key pairs by address
#[derive(Debug, Default)]
pub struct Keystore {
    keys: HashMap<Address, KeyPair>,
    default_address: Option<Address>,
}

impl Keystore {
    /// Create an empty keystore
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the keystore from `store`; empty if nothing was saved yet
    pub fn load(store: &dyn WalletStore) -> Result<Self> {
        let Some(blob) = store.read()? else {
            return Ok(Self::new());
        };

        let data: StoredKeystore = serde_json::from_slice(&blob)
            .map_err(|e| LedgerError::Serialization(format!("Failed to decode keystore: {}", e)))?;

        if data.curve != CURVE_NAME {
            return Err(LedgerError::Serialization(format!(
                "Unsupported curve in keystore: {}",
                data.curve
            )));
        }

        let mut keys = HashMap::new();
        for stored in data.keys {
            let secret = hex::decode(&stored.secret_key)
                .map_err(|e| LedgerError::Serialization(format!("Invalid secret key hex: {}", e)))?;
            let keypair = KeyPair::from_secret_bytes(&secret)?;
            if keypair.address != stored.address {
                return Err(LedgerError::Serialization(format!(
                    "Keystore entry {} does not match its key",
                    stored.address
                )));
            }
            keys.insert(stored.address, keypair);
        }

        log::debug!("Loaded {} keys from keystore", keys.len());
        Ok(Self {
            keys,
            default_address: data.default_address,
        })
    }

    /// Persist every key pair to `store`
    pub fn save(&self, store: &dyn WalletStore) -> Result<()> {
        let mut keys: Vec<StoredKey> = self
            .keys
            .values()
            .map(|kp| StoredKey {
                address: kp.address.clone(),
                secret_key: kp.secret_hex(),
            })
            .collect();
        keys.sort_by(|a, b| a.address.cmp(&b.address));

        let data = StoredKeystore {
            curve: CURVE_NAME.to_string(),
            default_address: self.default_address.clone(),
            keys,
        };

        let json = serde_json::to_vec_pretty(&data)
            .map_err(|e| LedgerError::Serialization(format!("Failed to encode keystore: {}", e)))?;
        store.write(&json)
    }

    /// Generate a key pair, add it, and persist the keystore
    pub fn create(&mut self, store: &dyn WalletStore) -> Result<Address> {
        let address = self.new_address();
        self.save(store)?;
        log::info!("Created wallet {}", address);
        Ok(address)
    }

    /// Generate a new address (in memory only)
    pub fn new_address(&mut self) -> Address {
        let keypair = KeyPair::generate();
        let address = keypair.address.clone();

        // Set as default if first address
        if self.default_address.is_none() {
            self.default_address = Some(address.clone());
        }

        self.keys.insert(address.clone(), keypair);
        address
    }

    /// Get key pair for address
    pub fn get_keypair(&self, address: &Address) -> Option<&KeyPair> {
        self.keys.get(address)
    }

    /// Key pair for address, or `UnknownAddress`
    pub fn require_keypair(&self, address: &Address) -> Result<&KeyPair> {
        self.get_keypair(address)
            .ok_or_else(|| LedgerError::UnknownAddress(address.to_string()))
    }

    /// All addresses, sorted
    pub fn list_addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self.keys.keys().cloned().collect();
        addresses.sort();
        addresses
    }

    pub fn default_address(&self) -> Option<&Address> {
        self.default_address.as_ref()
    }

    /// Count addresses
    pub fn count(&self) -> usize {
        self.keys.len()
    }
}
