// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential encryption for the Regroup migration engine.
//!
//! Stored OAuth access/refresh tokens are sealed with AES-256-GCM under a
//! single key loaded from a hex-encoded key file. Ciphertext blobs carry
//! their nonce as a 12-byte prefix so each blob is self-contained.

pub mod cipher;

pub use cipher::CredentialCipher;
