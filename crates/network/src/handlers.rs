//! # Message Handler Registry
//!
//! Maps each inbound opcode to the one handler that owns it.
//!
//! # Architecture
//!
//! The registry stores a small copyable key per opcode rather than the
//! handler itself. The owner of the handlers matches on the key, so handlers
//! stay concrete types with plain `&mut self` access.
//!
//! # Performance
//!
//! - O(1) dispatch via direct HashMap lookup
//! - No dynamic dispatch
//!
//! # Example
//!
//! ```
//! use athena_network::HandlerRegistry;
//!
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! enum Owner { Login, Npc }
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register(Owner::Login, "login", &[0x0069, 0x006a]).unwrap();
//! registry.register(Owner::Npc, "npc", &[0x00b4]).unwrap();
//!
//! assert_eq!(registry.route(0x00b4), Some(Owner::Npc));
//! assert!(registry.register(Owner::Npc, "npc-again", &[0x0069]).is_err());
//! ```

use athena_core::{ClientError, Result};
use std::collections::HashMap;

/// Opcode to handler routing table
///
/// # Purpose
/// Guarantees every opcode has at most one owner. Registration fails instead
/// of silently replacing an earlier claim.
#[derive(Debug, Clone)]
pub struct HandlerRegistry<K> {
    /// Map from opcode to owning handler key and name
    routes: HashMap<u16, (K, &'static str)>,
    /// Registered handler names, in registration order
    handlers: Vec<&'static str>,
}

impl<K: Copy> HandlerRegistry<K> {
    /// Create an empty registry
    #[inline]
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            handlers: Vec::new(),
        }
    }

    /// Register a handler for a set of opcodes
    ///
    /// # Arguments
    /// * `key` - Value returned by [`route`](Self::route) for these opcodes
    /// * `name` - Handler name for logs and errors
    /// * `opcodes` - Every opcode the handler consumes
    ///
    /// # Errors
    /// `DuplicateOpcode` if any opcode is already claimed, or listed twice.
    /// Nothing is registered in that case.
    pub fn register(&mut self, key: K, name: &'static str, opcodes: &[u16]) -> Result<()> {
        for (i, &opcode) in opcodes.iter().enumerate() {
            if let Some(&(_, existing)) = self.routes.get(&opcode) {
                return Err(ClientError::DuplicateOpcode {
                    opcode,
                    existing,
                    duplicate: name,
                });
            }
            if opcodes[..i].contains(&opcode) {
                return Err(ClientError::DuplicateOpcode {
                    opcode,
                    existing: name,
                    duplicate: name,
                });
            }
        }

        for &opcode in opcodes {
            self.routes.insert(opcode, (key, name));
        }
        self.handlers.push(name);

        tracing::debug!("Registered {} handler for {} opcodes", name, opcodes.len());
        Ok(())
    }

    /// Owner of an opcode
    #[inline]
    pub fn route(&self, opcode: u16) -> Option<K> {
        self.routes.get(&opcode).map(|(key, _)| *key)
    }

    /// Name of the handler owning an opcode
    pub fn handler_name(&self, opcode: u16) -> Option<&'static str> {
        self.routes.get(&opcode).map(|(_, name)| *name)
    }

    #[inline]
    pub fn has_handler(&self, opcode: u16) -> bool {
        self.routes.contains_key(&opcode)
    }

    /// Number of registered handlers
    #[inline]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Number of routed opcodes
    #[inline]
    pub fn opcode_count(&self) -> usize {
        self.routes.len()
    }
}

impl<K: Copy> Default for HandlerRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_routes() {
        let mut registry = HandlerRegistry::new();
        registry.register(1u8, "login", &[0x0069, 0x006a]).unwrap();
        registry.register(2u8, "game", &[0x007f]).unwrap();

        assert_eq!(registry.route(0x006a), Some(1));
        assert_eq!(registry.route(0x007f), Some(2));
        assert_eq!(registry.route(0x1234), None);
        assert_eq!(registry.handler_name(0x0069), Some("login"));
        assert!(registry.has_handler(0x007f));
        assert_eq!(registry.handler_count(), 2);
        assert_eq!(registry.opcode_count(), 3);
    }

    #[test]
    fn test_duplicate_across_handlers_rejected() {
        let mut registry = HandlerRegistry::new();
        registry.register(1u8, "npc", &[0x00b4]).unwrap();

        let err = registry.register(2u8, "shop", &[0x00c6, 0x00b4]).unwrap_err();
        match err {
            ClientError::DuplicateOpcode {
                opcode,
                existing,
                duplicate,
            } => {
                assert_eq!(opcode, 0x00b4);
                assert_eq!(existing, "npc");
                assert_eq!(duplicate, "shop");
            }
            other => panic!("unexpected error {:?}", other),
        }

        // The failed registration left nothing behind
        assert!(!registry.has_handler(0x00c6));
        assert_eq!(registry.handler_count(), 1);
    }

    #[test]
    fn test_duplicate_within_one_list_rejected() {
        let mut registry = HandlerRegistry::new();
        assert!(matches!(
            registry.register(1u8, "skill", &[0x010f, 0x0110, 0x010f]),
            Err(ClientError::DuplicateOpcode { opcode: 0x010f, .. })
        ));
        assert_eq!(registry.opcode_count(), 0);
    }
}
