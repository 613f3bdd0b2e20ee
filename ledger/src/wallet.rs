//! Wallet registry interface.
//!
//! The block layer never owns wallet state; it resolves signer public
//! keys and the local node identity through the [`WalletResolver`] trait.
//! [`InMemoryWalletRegistry`] is the backing used by the gateway, the
//! demo binary, and tests.

use std::collections::HashMap;

use crate::address::address_from_public_key;
use crate::crypto::NodeKeypair;

/// A registry entry for one wallet.
///
/// The public key is `None` until the wallet has revealed it on-chain;
/// until then signatures from that wallet must carry the key inline.
#[derive(Clone, Debug)]
pub struct Wallet {
    pub id: Vec<u8>,
    pub public_key: Option<Vec<u8>>,
}

/// Resolves wallet public keys and exposes the local node identity.
pub trait WalletResolver: Send + Sync {
    /// Fetches the wallet registered under `address`, if any.
    fn get_wallet(&self, address: &[u8]) -> Option<Wallet>;

    /// The local node's wallet address.
    fn primary_address(&self) -> Vec<u8>;

    /// The local node's signing public key.
    fn primary_public_key(&self) -> Vec<u8>;

    /// The local node's signing private key.
    fn primary_private_key(&self) -> Vec<u8>;
}

/// In-memory implementation of [`WalletResolver`].
pub struct InMemoryWalletRegistry {
    wallets: HashMap<Vec<u8>, Wallet>,
    primary_address: Vec<u8>,
    primary_public_key: Vec<u8>,
    primary_private_key: Vec<u8>,
}

impl InMemoryWalletRegistry {
    /// Creates a registry whose primary identity is `keys`.
    ///
    /// The primary wallet starts without a registered public key, the
    /// state of a node that has not yet revealed its key on-chain.
    pub fn with_primary(keys: NodeKeypair) -> Self {
        let address = address_from_public_key(&keys.public_key);
        let mut wallets = HashMap::new();
        wallets.insert(
            address.clone(),
            Wallet {
                id: address.clone(),
                public_key: None,
            },
        );
        Self {
            wallets,
            primary_address: address,
            primary_public_key: keys.public_key,
            primary_private_key: keys.secret_key,
        }
    }

    /// Registers or replaces a wallet entry.
    pub fn insert_wallet(&mut self, wallet: Wallet) {
        self.wallets.insert(wallet.id.clone(), wallet);
    }

    /// Records the primary wallet's public key in the registry.
    pub fn register_primary_public_key(&mut self) {
        let entry = Wallet {
            id: self.primary_address.clone(),
            public_key: Some(self.primary_public_key.clone()),
        };
        self.wallets.insert(self.primary_address.clone(), entry);
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}

impl WalletResolver for InMemoryWalletRegistry {
    fn get_wallet(&self, address: &[u8]) -> Option<Wallet> {
        self.wallets.get(address).cloned()
    }

    fn primary_address(&self) -> Vec<u8> {
        self.primary_address.clone()
    }

    fn primary_public_key(&self) -> Vec<u8> {
        self.primary_public_key.clone()
    }

    fn primary_private_key(&self) -> Vec<u8> {
        self.primary_private_key.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_keypair;

    #[test]
    fn primary_identity_is_derived_from_the_keypair() {
        let keys = generate_keypair();
        let expected_address = address_from_public_key(&keys.public_key);
        let expected_pk = keys.public_key.clone();

        let registry = InMemoryWalletRegistry::with_primary(keys);
        assert_eq!(registry.primary_address(), expected_address);
        assert_eq!(registry.primary_public_key(), expected_pk);
    }

    #[test]
    fn primary_wallet_starts_without_a_registered_key() {
        let registry = InMemoryWalletRegistry::with_primary(generate_keypair());
        let wallet = registry
            .get_wallet(&registry.primary_address())
            .expect("primary wallet exists");
        assert!(wallet.public_key.is_none());
    }

    #[test]
    fn register_primary_public_key_flips_the_entry() {
        let mut registry = InMemoryWalletRegistry::with_primary(generate_keypair());
        registry.register_primary_public_key();
        let wallet = registry
            .get_wallet(&registry.primary_address())
            .expect("primary wallet exists");
        assert_eq!(wallet.public_key, Some(registry.primary_public_key()));
    }

    #[test]
    fn unknown_addresses_resolve_to_none() {
        let registry = InMemoryWalletRegistry::with_primary(generate_keypair());
        assert!(registry.get_wallet(&[0u8; 36]).is_none());
    }

    #[test]
    fn insert_wallet_makes_it_resolvable() {
        let mut registry = InMemoryWalletRegistry::with_primary(generate_keypair());
        let id = vec![9u8; 36];
        registry.insert_wallet(Wallet {
            id: id.clone(),
            public_key: Some(vec![1, 2, 3]),
        });

        let wallet = registry.get_wallet(&id).expect("wallet present");
        assert_eq!(wallet.public_key, Some(vec![1, 2, 3]));
    }
}
