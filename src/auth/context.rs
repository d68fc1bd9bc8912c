// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Collaborators shared by the credential issuer and the authenticator.

use std::sync::Arc;

use super::directory::UserDirectory;
use super::protector::Protector;
use super::token::TokenSigner;
use crate::config::SessionSettings;
use crate::storage::{AuditHook, TokenStore};

/// Everything one sign-in or one request check needs.
///
/// Cheap to share: wrap it in an `Arc` once at startup.
pub struct AuthContext {
    pub directory: Arc<dyn UserDirectory>,
    pub store: Arc<dyn TokenStore>,
    pub protector: Arc<dyn Protector>,
    pub audit: Arc<dyn AuditHook>,
    pub signer: TokenSigner,
    pub settings: SessionSettings,
}

impl AuthContext {
    pub fn new(
        settings: SessionSettings,
        directory: Arc<dyn UserDirectory>,
        store: Arc<dyn TokenStore>,
        protector: Arc<dyn Protector>,
        audit: Arc<dyn AuditHook>,
    ) -> Self {
        Self {
            signer: TokenSigner::new(&settings),
            directory,
            store,
            protector,
            audit,
            settings,
        }
    }
}
