// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Pulse.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Error types for the update-check engine

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("version id {0} not found")]
    NotFound(i64),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
